//! Outbound notifications and per-site email templates

mod outbox;

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::{CoreError, CoreResult};
use crate::matching::MatchReport;
use crate::record::ReportRecord;
use crate::report::Report;
use crate::store::NotificationStore;

pub use outbox::{
    OutboundEmail, OutboxNotifier, MATCH_CONFIRMATION, MATCH_DELIVERY, MATCH_NOTIFICATION,
    REPORT_DELIVERY, SUBMIT_CONFIRMATION,
};

/// Delivery collaborator, called after the state change it reports has committed
#[async_trait]
pub trait Notifier: Send + Sync {
    /// Send the named per-site template to the given addresses
    async fn send_confirmation(
        &self,
        email_type: &str,
        to_addresses: &[String],
        site_id: u32,
    ) -> CoreResult<()>;

    async fn send_report_to_authority(
        &self,
        report: &Report,
        record: &ReportRecord,
        site_id: u32,
        to_addresses: &[String],
        public_key: Option<&str>,
    ) -> CoreResult<()>;

    async fn send_matching_report_to_authority(
        &self,
        matches: &[MatchReport],
        identifier: &str,
        to_addresses: &[String],
        public_key: Option<&str>,
    ) -> CoreResult<()>;

    /// Tell the owner of `match_report` that it matched
    async fn send_match_notification(&self, match_report: &MatchReport) -> CoreResult<()>;
}

/// Log a collaborator failure; the operation that triggered it stands
pub(crate) fn fire_and_forget(what: &str, result: CoreResult<()>) {
    if let Err(e) = result {
        tracing::warn!(notification = what, error = %e, "notification failed");
    }
}

/// A named, per-site email template
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmailNotification {
    pub id: u64,
    pub name: String,
    pub subject: String,
    pub body: String,
    #[serde(default)]
    pub sites: Vec<u32>,
}

impl EmailNotification {
    /// Render subject and body, substituting `{{ key }}` placeholders
    pub fn render(&self, context: &BTreeMap<&str, String>) -> (String, String) {
        (
            render_template(&self.subject, context),
            render_template(&self.body, context),
        )
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct NewEmailNotification {
    pub name: String,
    #[serde(default)]
    pub subject: String,
    #[serde(default)]
    pub body: String,
    #[serde(default)]
    pub sites: Vec<u32>,
}

/// Check that `name` is free on every one of `sites`.
///
/// `existing` is every stored notification; `except` skips the record being
/// edited.
pub fn check_unique_on_sites(
    name: &str,
    sites: &[u32],
    existing: &[EmailNotification],
    except: Option<u64>,
) -> CoreResult<()> {
    let taken: Vec<u32> = existing
        .iter()
        .filter(|other| Some(other.id) != except && other.name == name)
        .flat_map(|other| other.sites.iter().copied())
        .filter(|site| sites.contains(site))
        .collect();

    match taken.first() {
        None => Ok(()),
        Some(site) => Err(CoreError::validation(
            "name",
            format!("Email notification '{name}' already exists on site {site}."),
        )),
    }
}

/// Unknown placeholders render empty
fn render_template(template: &str, context: &BTreeMap<&str, String>) -> String {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;
    while let Some(start) = rest.find("{{") {
        out.push_str(&rest[..start]);
        let after = &rest[start + 2..];
        match after.find("}}") {
            Some(end) => {
                let key = after[..end].trim();
                if let Some(value) = context.get(key) {
                    out.push_str(value);
                }
                rest = &after[end + 2..];
            }
            None => {
                out.push_str(&rest[start..]);
                rest = "";
            }
        }
    }
    out.push_str(rest);
    out
}

/// Email template management
#[derive(Clone)]
pub struct EmailNotifications {
    store: Arc<dyn NotificationStore>,
}

impl EmailNotifications {
    pub fn new(store: Arc<dyn NotificationStore>) -> Self {
        Self { store }
    }

    pub async fn create(&self, new: NewEmailNotification) -> CoreResult<EmailNotification> {
        if new.name.trim().is_empty() {
            return Err(CoreError::validation("name", "This field is required."));
        }
        let created = self.store.create(new).await?;
        tracing::info!(notification = created.id, name = %created.name, "email notification created");
        Ok(created)
    }

    pub async fn add_site(&self, id: u64, site_id: u32) -> CoreResult<EmailNotification> {
        self.store.add_site(id, site_id).await
    }

    pub async fn on_site(&self, site_id: u32) -> CoreResult<Vec<EmailNotification>> {
        self.store.on_site(site_id).await
    }

    pub async fn get(&self, id: u64) -> CoreResult<EmailNotification> {
        self.store.get(id).await
    }
}
