//! SQLite report store

use std::sync::Mutex;

use async_trait::async_trait;
use rusqlite::{params, Connection, OptionalExtension, Row};
use uuid::Uuid;

use super::schema::{connect, json_err, parse_uuid};
use crate::error::{CoreError, CoreResult};
use crate::report::{ContactInfo, Report};
use crate::store::ReportStore;

const COLUMNS: &str = "id, owner, site_id, encrypted_data, status, contact_name, contact_email, \
     contact_phone, contact_notes, to_address, created_at, submitted_at, version";

/// Column values as stored, before parsing
struct ReportRow {
    id: String,
    owner: String,
    site_id: u32,
    encrypted_data: Vec<u8>,
    status: String,
    contact: ContactInfo,
    to_address: String,
    created_at: i64,
    submitted_at: Option<i64>,
    version: i64,
}

impl ReportRow {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            owner: row.get(1)?,
            site_id: row.get(2)?,
            encrypted_data: row.get(3)?,
            status: row.get(4)?,
            contact: ContactInfo {
                contact_name: row.get(5)?,
                contact_email: row.get(6)?,
                contact_phone: row.get(7)?,
                contact_notes: row.get(8)?,
            },
            to_address: row.get(9)?,
            created_at: row.get(10)?,
            submitted_at: row.get(11)?,
            version: row.get(12)?,
        })
    }

    fn into_report(self) -> CoreResult<Report> {
        Ok(Report {
            id: parse_uuid(&self.id)?,
            owner: parse_uuid(&self.owner)?,
            site_id: self.site_id,
            encrypted_data: self.encrypted_data,
            status: self.status.parse()?,
            contact: self.contact,
            to_address: serde_json::from_str(&self.to_address).map_err(json_err)?,
            created_at: self.created_at as u64,
            submitted_at: self.submitted_at.map(|t| t as u64),
            version: self.version as u64,
        })
    }
}

pub struct SqliteReportStore {
    conn: Mutex<Connection>,
}

impl SqliteReportStore {
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

    fn fetch(conn: &Connection, id: &Uuid) -> CoreResult<Option<Report>> {
        conn.query_row(
            &format!("SELECT {COLUMNS} FROM reports WHERE id = ?"),
            [id.to_string()],
            ReportRow::from_row,
        )
        .optional()?
        .map(ReportRow::into_report)
        .transpose()
    }
}

#[async_trait]
impl ReportStore for SqliteReportStore {
    async fn insert(&self, report: &Report) -> CoreResult<()> {
        let to_address = serde_json::to_string(&report.to_address).map_err(json_err)?;
        let conn = self.conn.lock().unwrap();
        let result = conn.execute(
            &format!("INSERT INTO reports ({COLUMNS}) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)"),
            params![
                report.id.to_string(),
                report.owner.to_string(),
                report.site_id,
                report.encrypted_data,
                report.status.as_str(),
                report.contact.contact_name,
                report.contact.contact_email,
                report.contact.contact_phone,
                report.contact.contact_notes,
                to_address,
                report.created_at as i64,
                report.submitted_at.map(|t| t as i64),
                report.version as i64,
            ],
        );

        match result {
            Ok(_) => Ok(()),
            Err(rusqlite::Error::SqliteFailure(e, _))
                if e.code == rusqlite::ErrorCode::ConstraintViolation =>
            {
                Err(CoreError::Conflict(format!("report {} already exists", report.id)))
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn get(&self, id: &Uuid) -> CoreResult<Report> {
        let conn = self.conn.lock().unwrap();
        Self::fetch(&conn, id)?.ok_or_else(|| CoreError::NotFound(format!("report {id}")))
    }

    async fn save(&self, report: &Report) -> CoreResult<Report> {
        let to_address = serde_json::to_string(&report.to_address).map_err(json_err)?;
        let conn = self.conn.lock().unwrap();
        let updated = conn.execute(
            r#"UPDATE reports SET
                 encrypted_data = ?, status = ?, contact_name = ?, contact_email = ?,
                 contact_phone = ?, contact_notes = ?, to_address = ?, submitted_at = ?,
                 version = version + 1
               WHERE id = ? AND version = ?"#,
            params![
                report.encrypted_data,
                report.status.as_str(),
                report.contact.contact_name,
                report.contact.contact_email,
                report.contact.contact_phone,
                report.contact.contact_notes,
                to_address,
                report.submitted_at.map(|t| t as i64),
                report.id.to_string(),
                report.version as i64,
            ],
        )?;

        if updated == 0 {
            return match Self::fetch(&conn, &report.id)? {
                Some(_) => Err(CoreError::Conflict(format!(
                    "report {} changed since it was read",
                    report.id
                ))),
                None => Err(CoreError::NotFound(format!("report {}", report.id))),
            };
        }

        Self::fetch(&conn, &report.id)?
            .ok_or_else(|| CoreError::NotFound(format!("report {}", report.id)))
    }

    async fn delete(&self, id: &Uuid) -> CoreResult<()> {
        let conn = self.conn.lock().unwrap();
        let deleted = conn.execute("DELETE FROM reports WHERE id = ?", [id.to_string()])?;
        if deleted == 0 {
            return Err(CoreError::NotFound(format!("report {id}")));
        }
        Ok(())
    }

    async fn list_for_owner(&self, owner: &Uuid, site_id: u32) -> CoreResult<Vec<Report>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(&format!(
            "SELECT {COLUMNS} FROM reports WHERE owner = ? AND site_id = ? ORDER BY created_at, id"
        ))?;
        let rows = stmt
            .query_map(params![owner.to_string(), site_id], ReportRow::from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        rows.into_iter().map(ReportRow::into_report).collect()
    }
}
