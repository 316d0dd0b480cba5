#![allow(dead_code)]

use callisto_core::SiteProfile;
use callisto_crypto::KdfParams;
use callisto_server::config::{Config, FixtureConfig};
use callisto_server::state::AppState;
use reqwest::{Client, RequestBuilder};
use serde_json::{Value, json};
use std::net::SocketAddr;
use tokio::net::TcpListener;
use uuid::Uuid;

pub const COORDINATOR: &str = "coordinator@example.edu";
pub const ADMIN_TOKEN: &str = "test-admin-token";

pub struct TestServer {
    pub url: String,
    pub addr: SocketAddr,
    pub state: AppState,
    // fixtures live here until the server is dropped
    _dir: tempfile::TempDir,
}

impl TestServer {
    pub async fn start() -> Self {
        let dir = tempfile::tempdir().unwrap();
        let pages = dir.path().join("pages.json");
        std::fs::write(&pages, pages_fixture().to_string()).unwrap();

        let config = Config {
            port: 0, // OS assigns port
            kdf: KdfParams::insecure_for_tests(),
            sites: vec![SiteProfile {
                id: 1,
                coordinator_emails: vec![COORDINATOR.into()],
                coordinator_public_key: None,
            }],
            fixtures: FixtureConfig {
                pages: Some(pages.to_string_lossy().into_owned()),
                notifications: None,
            },
            admin_token: Some(ADMIN_TOKEN.into()),
            ..Default::default()
        };

        let state = AppState::new(&config).await.unwrap();
        let app = callisto_server::routes::router(state.clone());

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        // Give server a moment to start
        tokio::time::sleep(tokio::time::Duration::from_millis(100)).await;

        Self {
            url: format!("http://{addr}"),
            addr,
            state,
            _dir: dir,
        }
    }

    /// Client request carrying the admin token
    pub fn admin(&self, method: reqwest::Method, path: &str) -> RequestBuilder {
        Client::new()
            .request(method, format!("{}{path}", self.url))
            .header("X-Admin-Token", ADMIN_TOKEN)
    }

    /// Names of queued emails, oldest first
    pub fn sent(&self) -> Vec<String> {
        self.state
            .outbox
            .outbox()
            .into_iter()
            .map(|email| email.name)
            .collect()
    }
}

/// A report owner talking to the server with one passphrase
pub struct Owner {
    pub account: Uuid,
    pub key: String,
    client: Client,
    url: String,
}

impl Owner {
    pub fn new(server: &TestServer, key: &str) -> Self {
        Self {
            account: Uuid::new_v4(),
            key: key.into(),
            client: Client::new(),
            url: server.url.clone(),
        }
    }

    pub fn get(&self, path: &str) -> RequestBuilder {
        self.sign(self.client.get(format!("{}{path}", self.url)))
    }

    pub fn post(&self, path: &str) -> RequestBuilder {
        self.sign(self.client.post(format!("{}{path}", self.url)))
    }

    pub fn delete(&self, path: &str) -> RequestBuilder {
        self.sign(self.client.delete(format!("{}{path}", self.url)))
    }

    fn sign(&self, request: RequestBuilder) -> RequestBuilder {
        request
            .header("X-Account-Id", self.account.to_string())
            .header("X-Report-Key", &self.key)
    }

    /// Create a report and return its id
    pub async fn create_report(&self) -> String {
        let response = self
            .post("/reports")
            .json(&json!({ "key": self.key, "key_confirmation": self.key }))
            .send()
            .await
            .expect("Failed to send request");
        assert_eq!(response.status(), 201);
        let body: Value = response.json().await.expect("Failed to parse JSON");
        body["id"].as_str().unwrap().to_string()
    }
}

/// Two pages on site 1: free text, then a radio question
pub fn pages_fixture() -> Value {
    json!([
        {
            "id": 1,
            "position": 0,
            "sites": [1],
            "questions": [
                { "id": 1, "text": "What happened?", "type": "SingleLineText", "max_length": 100 }
            ]
        },
        {
            "id": 2,
            "position": 1,
            "sites": [1],
            "questions": [
                {
                    "id": 2,
                    "text": "Did you tell anyone?",
                    "type": "RadioButton",
                    "choices": [
                        { "id": 1, "text": "Yes", "position": 0 },
                        { "id": 2, "text": "No", "position": 1 }
                    ]
                }
            ]
        }
    ])
}
