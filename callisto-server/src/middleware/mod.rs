pub mod admin;
pub mod credentials;

pub use admin::require_admin;
pub use credentials::{extract_caller, extract_report_key, Caller};
