//! Template-rendering notifier that queues messages in memory

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use serde::Serialize;

use super::{EmailNotification, Notifier};
use crate::error::CoreResult;
use crate::export::PlainTextExporter;
use crate::matching::MatchReport;
use crate::record::ReportRecord;
use crate::report::Report;
use crate::store::{NotificationStore, PageStore, ReportStore};

pub const SUBMIT_CONFIRMATION: &str = "submit_confirmation";
pub const MATCH_CONFIRMATION: &str = "match_confirmation";
pub const REPORT_DELIVERY: &str = "report_delivery";
pub const MATCH_DELIVERY: &str = "match_delivery";
pub const MATCH_NOTIFICATION: &str = "match_notification";

/// A rendered message waiting for a transport
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OutboundEmail {
    pub name: String,
    pub to: Vec<String>,
    pub subject: String,
    pub body: String,
    pub site_id: u32,
    /// Coordinator key the transport must encrypt to, when the site has one
    pub encrypted_for: Option<String>,
}

/// Renders per-site templates and appends the result to an outbox.
///
/// Sites without a template for a message fall back to a built-in default.
pub struct OutboxNotifier {
    templates: Arc<dyn NotificationStore>,
    reports: Arc<dyn ReportStore>,
    pages: Arc<dyn PageStore>,
    outbox: Mutex<Vec<OutboundEmail>>,
}

impl OutboxNotifier {
    pub fn new(
        templates: Arc<dyn NotificationStore>,
        reports: Arc<dyn ReportStore>,
        pages: Arc<dyn PageStore>,
    ) -> Self {
        Self {
            templates,
            reports,
            pages,
            outbox: Mutex::new(Vec::new()),
        }
    }

    /// Everything queued so far
    pub fn outbox(&self) -> Vec<OutboundEmail> {
        self.outbox.lock().unwrap().clone()
    }

    /// Remove and return everything queued
    pub fn drain(&self) -> Vec<OutboundEmail> {
        std::mem::take(&mut *self.outbox.lock().unwrap())
    }

    async fn template(&self, name: &str, site_id: u32) -> CoreResult<EmailNotification> {
        Ok(self
            .templates
            .find(name, site_id)
            .await?
            .unwrap_or_else(|| default_template(name)))
    }

    async fn queue(
        &self,
        name: &str,
        to: &[String],
        site_id: u32,
        context: BTreeMap<&str, String>,
        encrypted_for: Option<&str>,
    ) -> CoreResult<()> {
        if to.is_empty() {
            tracing::debug!(notification = name, site_id, "no recipients, skipped");
            return Ok(());
        }
        let (subject, body) = self.template(name, site_id).await?.render(&context);
        self.outbox.lock().unwrap().push(OutboundEmail {
            name: name.to_string(),
            to: to.to_vec(),
            subject,
            body,
            site_id,
            encrypted_for: encrypted_for.map(str::to_string),
        });
        tracing::info!(notification = name, site_id, recipients = to.len(), "email queued");
        Ok(())
    }
}

#[async_trait]
impl Notifier for OutboxNotifier {
    async fn send_confirmation(
        &self,
        email_type: &str,
        to_addresses: &[String],
        site_id: u32,
    ) -> CoreResult<()> {
        self.queue(email_type, to_addresses, site_id, BTreeMap::new(), None)
            .await
    }

    async fn send_report_to_authority(
        &self,
        report: &Report,
        record: &ReportRecord,
        site_id: u32,
        to_addresses: &[String],
        public_key: Option<&str>,
    ) -> CoreResult<()> {
        let pages = self.pages.pages_for_site(site_id).await?;
        let context = BTreeMap::from([
            ("report_id", report.id.to_string()),
            ("submitted_at", report.submitted_at.unwrap_or_default().to_string()),
            ("report", PlainTextExporter.render_text(report, record, &pages)),
        ]);
        self.queue(REPORT_DELIVERY, to_addresses, site_id, context, public_key)
            .await
    }

    async fn send_matching_report_to_authority(
        &self,
        matches: &[MatchReport],
        identifier: &str,
        to_addresses: &[String],
        public_key: Option<&str>,
    ) -> CoreResult<()> {
        let Some(newest) = matches.iter().max_by_key(|row| row.order_key()) else {
            return Ok(());
        };
        let listing = matches
            .iter()
            .map(|row| format!("- report {} (entered {})", row.report_id, row.created_at))
            .collect::<Vec<_>>()
            .join("\n");
        let context = BTreeMap::from([
            ("identifier", identifier.to_string()),
            ("match_count", matches.len().to_string()),
            ("matches", listing),
        ]);
        self.queue(MATCH_DELIVERY, to_addresses, newest.site_id, context, public_key)
            .await
    }

    async fn send_match_notification(&self, match_report: &MatchReport) -> CoreResult<()> {
        let report = self.reports.get(&match_report.report_id).await?;
        let Some(email) = report.contact.contact_email else {
            tracing::debug!(report = %report.id, "no contact email for match notification");
            return Ok(());
        };
        let context = BTreeMap::from([(
            "contact_name",
            report.contact.contact_name.unwrap_or_default(),
        )]);
        self.queue(
            MATCH_NOTIFICATION,
            &[email],
            match_report.site_id,
            context,
            None,
        )
        .await
    }
}

fn default_template(name: &str) -> EmailNotification {
    let (subject, body) = match name {
        SUBMIT_CONFIRMATION => (
            "Your report has been submitted",
            "Your report was delivered to your coordinator.",
        ),
        MATCH_CONFIRMATION => (
            "Your matching entry was received",
            "We will let you know if another report names the same person.",
        ),
        REPORT_DELIVERY => (
            "New report {{ report_id }}",
            "A report was submitted at {{ submitted_at }}.\n\n{{ report }}",
        ),
        MATCH_DELIVERY => (
            "Matching reports found",
            "{{ match_count }} reports name {{ identifier }}:\n{{ matches }}",
        ),
        MATCH_NOTIFICATION => (
            "Your report has been matched",
            "Hello {{ contact_name }}, another report names the same person as yours.",
        ),
        _ => ("Notification", ""),
    };
    EmailNotification {
        id: 0,
        name: name.to_string(),
        subject: subject.to_string(),
        body: body.to_string(),
        sites: Vec::new(),
    }
}
