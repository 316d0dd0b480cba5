//! Email notification uniqueness across sites

mod common;

use callisto_core::notification::NewEmailNotification;
use callisto_core::CoreError;
use common::Harness;

fn example(sites: Vec<u32>) -> NewEmailNotification {
    NewEmailNotification {
        name: "example email".into(),
        subject: "example email".into(),
        body: "example email".into(),
        sites,
    }
}

#[tokio::test]
async fn test_validation_error_does_not_delete_email() {
    let h = Harness::new();
    let notifications = &h.services.notifications;
    for site in 1..10 {
        notifications.create(example(vec![site])).await.unwrap();
    }

    let on_site_1 = notifications.on_site(1).await.unwrap();
    assert_eq!(on_site_1.len(), 1);
    let original = on_site_1[0].clone();

    let err = notifications.add_site(original.id, 2).await;
    assert!(matches!(err, Err(CoreError::Validation(_))));

    assert_eq!(notifications.get(original.id).await.unwrap(), original);
    assert_eq!(notifications.on_site(2).await.unwrap().len(), 1);
}

#[tokio::test]
async fn test_duplicate_emails_not_allowed_on_same_site() {
    let h = Harness::new();
    let notifications = &h.services.notifications;
    notifications.create(example(vec![1])).await.unwrap();
    for _ in 0..3 {
        assert!(notifications.create(example(vec![1])).await.is_err());
    }
    assert_eq!(notifications.on_site(1).await.unwrap().len(), 1);
}

#[tokio::test]
async fn test_name_required() {
    let h = Harness::new();
    let blank = NewEmailNotification {
        name: " ".into(),
        ..Default::default()
    };
    assert!(matches!(
        h.services.notifications.create(blank).await,
        Err(CoreError::Validation(_))
    ));
}
