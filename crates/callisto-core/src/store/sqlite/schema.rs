//! SQLite schema definitions

use std::time::Duration;

use rusqlite::Connection;
use uuid::Uuid;

use crate::error::{CoreError, CoreResult};

pub const SCHEMA_VERSION: u32 = 2;

/// Open a connection (in memory when `path` is `None`) with the schema in place
pub(crate) fn connect(path: Option<&str>) -> CoreResult<Connection> {
    let conn = match path {
        Some(path) => Connection::open(path)?,
        None => Connection::open_in_memory()?,
    };
    // several stores may share one database file
    conn.busy_timeout(Duration::from_secs(5))?;
    conn.pragma_update(None, "foreign_keys", "ON")?;
    init_schema(&conn)?;
    Ok(conn)
}

/// Initialize the database schema
pub fn init_schema(conn: &Connection) -> CoreResult<()> {
    conn.execute_batch(
        r#"
        CREATE TABLE IF NOT EXISTS schema_version (
            version INTEGER PRIMARY KEY
        );

        CREATE TABLE IF NOT EXISTS reports (
            id TEXT PRIMARY KEY,
            owner TEXT NOT NULL,
            site_id INTEGER NOT NULL,
            encrypted_data BLOB NOT NULL,
            status TEXT NOT NULL,                  -- in_progress | submitted | withdrawn
            contact_name TEXT,
            contact_email TEXT,
            contact_phone TEXT,
            contact_notes TEXT,
            to_address TEXT NOT NULL,              -- JSON array
            created_at INTEGER NOT NULL,
            submitted_at INTEGER,
            version INTEGER NOT NULL
        );

        CREATE INDEX IF NOT EXISTS idx_reports_owner
            ON reports(owner, site_id);

        CREATE TABLE IF NOT EXISTS match_reports (
            seq INTEGER PRIMARY KEY AUTOINCREMENT,
            id TEXT NOT NULL UNIQUE,
            report_id TEXT NOT NULL,
            owner TEXT NOT NULL,
            site_id INTEGER NOT NULL,
            identifier TEXT NOT NULL,
            perpetrator TEXT NOT NULL,             -- base58 BLAKE3 of identifier
            created_at INTEGER NOT NULL,
            notified INTEGER NOT NULL DEFAULT 0,
            UNIQUE(report_id, perpetrator)
        );

        CREATE INDEX IF NOT EXISTS idx_match_reports_perpetrator
            ON match_reports(perpetrator);
        CREATE INDEX IF NOT EXISTS idx_match_reports_report
            ON match_reports(report_id);

        CREATE TABLE IF NOT EXISTS wizard_pages (
            id INTEGER PRIMARY KEY,
            page TEXT NOT NULL                     -- JSON Page
        );

        CREATE TABLE IF NOT EXISTS wizard_page_sites (
            page_id INTEGER NOT NULL REFERENCES wizard_pages(id) ON DELETE CASCADE,
            site_id INTEGER NOT NULL,
            PRIMARY KEY (page_id, site_id)
        );

        CREATE TABLE IF NOT EXISTS email_notifications (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            name TEXT NOT NULL,
            subject TEXT NOT NULL,
            body TEXT NOT NULL
        );

        -- name is copied here so uniqueness per site is a plain constraint
        CREATE TABLE IF NOT EXISTS email_notification_sites (
            notification_id INTEGER NOT NULL REFERENCES email_notifications(id) ON DELETE CASCADE,
            site_id INTEGER NOT NULL,
            name TEXT NOT NULL,
            PRIMARY KEY (notification_id, site_id),
            UNIQUE (site_id, name)
        );

        -- no foreign key: the trail outlives deleted reports
        CREATE TABLE IF NOT EXISTS audit_events (
            seq INTEGER PRIMARY KEY AUTOINCREMENT,
            report_id TEXT NOT NULL,
            owner TEXT NOT NULL,
            site_id INTEGER NOT NULL,
            action TEXT NOT NULL,
            at INTEGER NOT NULL
        );

        CREATE INDEX IF NOT EXISTS idx_audit_events_report
            ON audit_events(report_id);
    "#,
    )?;

    conn.execute(
        "INSERT OR REPLACE INTO schema_version (version) VALUES (?)",
        [SCHEMA_VERSION],
    )?;

    Ok(())
}

/// Check schema version
pub fn check_version(conn: &Connection) -> CoreResult<u32> {
    let version: u32 = conn
        .query_row("SELECT version FROM schema_version LIMIT 1", [], |row| {
            row.get(0)
        })
        .unwrap_or(0);
    Ok(version)
}

pub(crate) fn parse_uuid(s: &str) -> CoreResult<Uuid> {
    Uuid::parse_str(s).map_err(|e| CoreError::Storage(format!("bad uuid '{s}': {e}")))
}

pub(crate) fn json_err(e: serde_json::Error) -> CoreError {
    CoreError::Storage(e.to_string())
}
