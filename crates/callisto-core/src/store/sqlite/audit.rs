//! SQLite audit trail

use std::sync::Mutex;

use async_trait::async_trait;
use rusqlite::{params, Connection};
use uuid::Uuid;

use super::schema::{connect, parse_uuid};
use crate::audit::AuditEvent;
use crate::error::CoreResult;
use crate::store::AuditStore;

pub struct SqliteAuditStore {
    conn: Mutex<Connection>,
}

impl SqliteAuditStore {
    /// Open or create a database at the given path
    pub fn open(path: &str) -> CoreResult<Self> {
        Ok(Self {
            conn: Mutex::new(connect(Some(path))?),
        })
    }

    /// Create an in-memory database (for testing)
    pub fn in_memory() -> CoreResult<Self> {
        Ok(Self {
            conn: Mutex::new(connect(None)?),
        })
    }
}

#[async_trait]
impl AuditStore for SqliteAuditStore {
    async fn record(&self, event: AuditEvent) -> CoreResult<()> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            r#"INSERT INTO audit_events (report_id, owner, site_id, action, at)
               VALUES (?, ?, ?, ?, ?)"#,
            params![
                event.report_id.to_string(),
                event.owner.to_string(),
                event.site_id,
                event.action.as_str(),
                event.at as i64,
            ],
        )?;
        Ok(())
    }

    async fn for_report(&self, report_id: &Uuid) -> CoreResult<Vec<AuditEvent>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(
            r#"SELECT report_id, owner, site_id, action, at FROM audit_events
               WHERE report_id = ? ORDER BY seq"#,
        )?;
        let raw = stmt
            .query_map([report_id.to_string()], |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, u32>(2)?,
                    row.get::<_, String>(3)?,
                    row.get::<_, i64>(4)?,
                ))
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        raw.into_iter()
            .map(|(report_id, owner, site_id, action, at)| {
                Ok(AuditEvent {
                    report_id: parse_uuid(&report_id)?,
                    owner: parse_uuid(&owner)?,
                    site_id,
                    action: action.parse()?,
                    at: at as u64,
                })
            })
            .collect()
    }
}
