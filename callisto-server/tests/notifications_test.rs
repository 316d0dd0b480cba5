//! Email notification admin endpoints

use reqwest::{Client, Method};
use serde_json::{Value, json};

mod common;

fn example(sites: &[u32]) -> Value {
    json!({
        "name": "example email",
        "subject": "example email",
        "body": "example email",
        "sites": sites,
    })
}

#[tokio::test]
async fn test_duplicate_name_on_site_rejected() {
    let server = common::TestServer::start().await;

    let response = server
        .admin(Method::POST, "/notifications")
        .json(&example(&[1]))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 201);
    let created: Value = response.json().await.unwrap();

    let response = server
        .admin(Method::POST, "/notifications")
        .json(&example(&[1]))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 400);
    let body: Value = response.json().await.unwrap();
    assert!(body["fields"]["name"].is_array());

    let listed: Vec<Value> = server
        .admin(Method::GET, "/notifications?site_id=1")
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0]["id"], created["id"]);
}

#[tokio::test]
async fn test_add_site_conflict_keeps_email() {
    let server = common::TestServer::start().await;

    let mut ids = Vec::new();
    for site in [1, 2] {
        let created: Value = server
            .admin(Method::POST, "/notifications")
            .json(&example(&[site]))
            .send()
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        ids.push(created["id"].as_u64().unwrap());
    }

    let response = server
        .admin(Method::POST, &format!("/notifications/{}/sites", ids[0]))
        .json(&json!({ "site_id": 2 }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 400);

    let original: Value = server
        .admin(Method::GET, &format!("/notifications/{}", ids[0]))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(original["sites"], json!([1]));

    let response = server
        .admin(Method::POST, &format!("/notifications/{}/sites", ids[0]))
        .json(&json!({ "site_id": 3 }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 200);
    let updated: Value = response.json().await.unwrap();
    assert_eq!(updated["sites"], json!([1, 3]));
}

#[tokio::test]
async fn test_unknown_notification() {
    let server = common::TestServer::start().await;
    let response = server
        .admin(Method::GET, "/notifications/999")
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 404);
}

#[tokio::test]
async fn test_admin_routes_need_token() {
    let server = common::TestServer::start().await;
    let client = Client::new();

    let response = client
        .post(format!("{}/notifications", server.url))
        .json(&example(&[1]))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 401);
    let body: Value = response.json().await.unwrap();
    assert!(body["error"].as_str().unwrap().contains("X-Admin-Token"));

    let response = client
        .get(format!("{}/notifications?site_id=1", server.url))
        .header("X-Admin-Token", "guess")
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 401);

    let listed: Vec<Value> = server
        .admin(Method::GET, "/notifications?site_id=1")
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert!(listed.is_empty());
}
