//! SQLite persistence backends
//!
//! Each store owns its connection. Pointing them all at one file is the
//! normal deployment.

mod audit;
mod matches;
mod notifications;
mod pages;
mod reports;
mod schema;

pub use audit::SqliteAuditStore;
pub use matches::SqliteMatchStore;
pub use notifications::SqliteNotificationStore;
pub use pages::SqlitePageStore;
pub use reports::SqliteReportStore;
pub use schema::{check_version, init_schema, SCHEMA_VERSION};
