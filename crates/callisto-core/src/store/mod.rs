//! Persistence seams
//!
//! Every backend implements the same async traits. Site scoping is an
//! explicit argument, never ambient state.

use async_trait::async_trait;
use uuid::Uuid;

use crate::audit::AuditEvent;
use crate::error::CoreResult;
use crate::matching::MatchReport;
use crate::notification::{EmailNotification, NewEmailNotification};
use crate::report::Report;
use crate::wizard::Page;

pub mod memory;

#[cfg(feature = "sqlite")]
pub mod sqlite;

/// Report rows, ciphertext included
#[async_trait]
pub trait ReportStore: Send + Sync {
    /// Store a new report. Fails with `Conflict` if the id is taken.
    async fn insert(&self, report: &Report) -> CoreResult<()>;

    async fn get(&self, id: &Uuid) -> CoreResult<Report>;

    /// Replace a report, provided nobody saved it since it was read.
    ///
    /// `report.version` is the version the caller read. On success the stored
    /// copy carries `version + 1` and is returned; otherwise `Conflict`.
    async fn save(&self, report: &Report) -> CoreResult<Report>;

    async fn delete(&self, id: &Uuid) -> CoreResult<()>;

    /// Dashboard listing, oldest first
    async fn list_for_owner(&self, owner: &Uuid, site_id: u32) -> CoreResult<Vec<Report>>;
}

/// Outcome of [`MatchStore::submit`]
#[derive(Debug, Clone)]
pub struct Submission {
    /// The stored row (the existing one when nothing was inserted)
    pub row: MatchReport,
    /// False when the report had already entered this identifier
    pub created: bool,
    /// Every row sharing the perpetrator key, in submission order
    pub group: Vec<MatchReport>,
}

/// Match entries keyed by perpetrator
#[async_trait]
pub trait MatchStore: Send + Sync {
    /// Insert a row and read back its group in one step.
    ///
    /// The store assigns `seq`. A report entering the same identifier twice
    /// gets its original row back.
    async fn submit(&self, row: MatchReport) -> CoreResult<Submission>;

    /// Ordered by `(created_at, seq)`
    async fn find_by_perpetrator(&self, perpetrator: &str) -> CoreResult<Vec<MatchReport>>;

    async fn list_for_report(&self, report_id: &Uuid) -> CoreResult<Vec<MatchReport>>;

    /// Mark every un-notified row of a group as notified and return those rows.
    ///
    /// Atomic: concurrent callers never claim the same row.
    async fn claim_unnotified(&self, perpetrator: &str) -> CoreResult<Vec<MatchReport>>;

    /// Perpetrator keys with at least one un-notified row
    async fn pending_perpetrators(&self) -> CoreResult<Vec<String>>;

    /// Remove a report's rows, returning how many went
    async fn delete_for_report(&self, report_id: &Uuid) -> CoreResult<usize>;
}

/// Wizard configuration
#[async_trait]
pub trait PageStore: Send + Sync {
    /// Pages on a site in wizard order
    async fn pages_for_site(&self, site_id: u32) -> CoreResult<Vec<Page>>;

    /// Insert or replace by page id
    async fn upsert(&self, page: Page) -> CoreResult<()>;
}

/// Email templates with per-site name uniqueness
#[async_trait]
pub trait NotificationStore: Send + Sync {
    /// Fails with `Validation` if the name is already used on one of the sites
    async fn create(&self, new: NewEmailNotification) -> CoreResult<EmailNotification>;

    async fn get(&self, id: u64) -> CoreResult<EmailNotification>;

    /// Attach a site. A name collision fails with `Validation` and changes nothing.
    async fn add_site(&self, id: u64, site_id: u32) -> CoreResult<EmailNotification>;

    async fn on_site(&self, site_id: u32) -> CoreResult<Vec<EmailNotification>>;

    async fn find(&self, name: &str, site_id: u32) -> CoreResult<Option<EmailNotification>>;
}

/// Append-only action trail
#[async_trait]
pub trait AuditStore: Send + Sync {
    async fn record(&self, event: AuditEvent) -> CoreResult<()>;

    /// Oldest first
    async fn for_report(&self, report_id: &Uuid) -> CoreResult<Vec<AuditEvent>>;
}
