//! callisto-core: encrypted reports, the reporting wizard and matching
//!
//! Services are plain structs over async store traits. Handlers call them
//! explicitly with the report passphrase on every operation; nothing here
//! caches a credential between calls.
//!
//! ## Features
//!
//! | Feature  | Description                    |
//! |----------|--------------------------------|
//! | (none)   | In-memory backends only        |
//! | `sqlite` | SQLite persistence             |
//!
//! ## Example
//!
//! ```rust,ignore
//! use callisto_core::{Backends, MatchPolicy, Services, StaticSiteSettings};
//! use callisto_crypto::{KdfParams, Passphrase};
//!
//! let services = Services::new(
//!     Backends::in_memory(),
//!     notifier,
//!     Arc::new(StaticSiteSettings::default()),
//!     KdfParams::default(),
//!     MatchPolicy::default(),
//! );
//!
//! let key = Passphrase::new("super secret");
//! let report = services.reports.create(owner, site_id).await?;
//! services.wizard.advance(&report.id, site_id, 0, answers, &key).await?;
//! services.reports.submit(&report.id, &key).await?;
//! ```

mod error;
mod gate;
mod record;
mod report;
mod services;
mod site;

pub mod audit;
pub mod export;
pub mod matching;
pub mod notification;
pub mod store;
pub mod wizard;

// Re-exports
pub use error::{CoreError, CoreResult, ValidationErrors};
pub use gate::{AccessGate, Unlocked};
pub use record::{Answers, ReportRecord};
pub use report::{ContactInfo, Report, ReportAggregate, ReportStatus};
pub use services::{Backends, Services};
pub use site::{SiteProfile, SiteSettings, StaticSiteSettings};

pub use audit::{AuditAction, AuditEvent, AuditTrail};
pub use export::{PlainTextExporter, ReportExporter};
pub use matching::{MatchPolicy, MatchReport, MatchingEngine};
pub use notification::{EmailNotification, EmailNotifications, Notifier, OutboxNotifier};
pub use wizard::{Page, PageView, Question, QuestionKind, StepOutcome, WizardEngine};

/// Current unix time in seconds
pub(crate) fn now() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}
