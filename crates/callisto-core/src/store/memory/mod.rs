//! In-memory backends, used by tests and the default server configuration

mod audit;
mod matches;
mod notifications;
mod pages;
mod reports;

pub use audit::InMemoryAuditStore;
pub use matches::InMemoryMatchStore;
pub use notifications::InMemoryNotificationStore;
pub use pages::InMemoryPageStore;
pub use reports::InMemoryReportStore;
