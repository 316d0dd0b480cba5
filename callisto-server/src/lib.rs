//! callisto-server: JSON API over callisto-core
//!
//! Thin axum handlers in front of the core services. Every protected call
//! carries the report passphrase in `X-Report-Key`; see [`middleware`].

pub mod config;
pub mod error;
pub mod middleware;
pub mod routes;
pub mod state;
