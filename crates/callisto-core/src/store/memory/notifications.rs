//! In-memory email notification store

use std::collections::BTreeMap;
use std::sync::RwLock;

use async_trait::async_trait;

use crate::error::{CoreError, CoreResult};
use crate::notification::{check_unique_on_sites, EmailNotification, NewEmailNotification};
use crate::store::NotificationStore;

#[derive(Default)]
struct Inner {
    notifications: BTreeMap<u64, EmailNotification>,
    next_id: u64,
}

impl Inner {
    fn all(&self) -> Vec<EmailNotification> {
        self.notifications.values().cloned().collect()
    }
}

#[derive(Default)]
pub struct InMemoryNotificationStore {
    inner: RwLock<Inner>,
}

impl InMemoryNotificationStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl NotificationStore for InMemoryNotificationStore {
    async fn create(&self, new: NewEmailNotification) -> CoreResult<EmailNotification> {
        let mut inner = self.inner.write().unwrap();
        let mut sites = new.sites;
        sites.sort_unstable();
        sites.dedup();
        check_unique_on_sites(&new.name, &sites, &inner.all(), None)?;

        inner.next_id += 1;
        let notification = EmailNotification {
            id: inner.next_id,
            name: new.name,
            subject: new.subject,
            body: new.body,
            sites,
        };
        inner
            .notifications
            .insert(notification.id, notification.clone());
        Ok(notification)
    }

    async fn get(&self, id: u64) -> CoreResult<EmailNotification> {
        self.inner
            .read()
            .unwrap()
            .notifications
            .get(&id)
            .cloned()
            .ok_or_else(|| CoreError::NotFound(format!("email notification {id}")))
    }

    async fn add_site(&self, id: u64, site_id: u32) -> CoreResult<EmailNotification> {
        let mut inner = self.inner.write().unwrap();
        let all = inner.all();
        let notification = inner
            .notifications
            .get_mut(&id)
            .ok_or_else(|| CoreError::NotFound(format!("email notification {id}")))?;

        if !notification.sites.contains(&site_id) {
            check_unique_on_sites(&notification.name, &[site_id], &all, Some(id))?;
            notification.sites.push(site_id);
            notification.sites.sort_unstable();
        }
        Ok(notification.clone())
    }

    async fn on_site(&self, site_id: u32) -> CoreResult<Vec<EmailNotification>> {
        Ok(self
            .inner
            .read()
            .unwrap()
            .notifications
            .values()
            .filter(|n| n.sites.contains(&site_id))
            .cloned()
            .collect())
    }

    async fn find(&self, name: &str, site_id: u32) -> CoreResult<Option<EmailNotification>> {
        Ok(self
            .inner
            .read()
            .unwrap()
            .notifications
            .values()
            .find(|n| n.name == name && n.sites.contains(&site_id))
            .cloned())
    }
}
