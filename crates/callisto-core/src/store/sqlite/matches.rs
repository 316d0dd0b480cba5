//! SQLite match store

use std::sync::Mutex;

use async_trait::async_trait;
use rusqlite::{params, Connection, OptionalExtension, Row};
use uuid::Uuid;

use super::schema::{connect, parse_uuid};
use crate::error::CoreResult;
use crate::matching::MatchReport;
use crate::store::{MatchStore, Submission};

const COLUMNS: &str =
    "id, report_id, owner, site_id, identifier, perpetrator, created_at, seq, notified";

fn read_row(row: &Row<'_>) -> rusqlite::Result<(String, String, String, MatchReport)> {
    let id: String = row.get(0)?;
    let report_id: String = row.get(1)?;
    let owner: String = row.get(2)?;
    let created_at: i64 = row.get(6)?;
    let seq: i64 = row.get(7)?;
    let partial = MatchReport {
        id: Uuid::nil(),
        report_id: Uuid::nil(),
        owner: Uuid::nil(),
        site_id: row.get(3)?,
        identifier: row.get(4)?,
        perpetrator: row.get(5)?,
        created_at: created_at as u64,
        seq: seq as u64,
        notified: row.get(8)?,
    };
    Ok((id, report_id, owner, partial))
}

fn finish((id, report_id, owner, mut row): (String, String, String, MatchReport)) -> CoreResult<MatchReport> {
    row.id = parse_uuid(&id)?;
    row.report_id = parse_uuid(&report_id)?;
    row.owner = parse_uuid(&owner)?;
    Ok(row)
}

fn select(conn: &Connection, filter: &str, param: &str) -> CoreResult<Vec<MatchReport>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {COLUMNS} FROM match_reports WHERE {filter} ORDER BY created_at, seq"
    ))?;
    let rows = stmt
        .query_map([param], read_row)?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    rows.into_iter().map(finish).collect()
}

pub struct SqliteMatchStore {
    conn: Mutex<Connection>,
}

impl SqliteMatchStore {
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
impl MatchStore for SqliteMatchStore {
    async fn submit(&self, row: MatchReport) -> CoreResult<Submission> {
        let mut conn = self.conn.lock().unwrap();
        let tx = conn.transaction()?;

        let existing = tx
            .query_row(
                &format!(
                    "SELECT {COLUMNS} FROM match_reports WHERE report_id = ? AND perpetrator = ?"
                ),
                params![row.report_id.to_string(), row.perpetrator],
                read_row,
            )
            .optional()?
            .map(finish)
            .transpose()?;

        let created = existing.is_none();
        let row = match existing {
            Some(existing) => existing,
            None => {
                tx.execute(
                    r#"INSERT INTO match_reports
                       (id, report_id, owner, site_id, identifier, perpetrator, created_at, notified)
                       VALUES (?, ?, ?, ?, ?, ?, ?, ?)"#,
                    params![
                        row.id.to_string(),
                        row.report_id.to_string(),
                        row.owner.to_string(),
                        row.site_id,
                        row.identifier,
                        row.perpetrator,
                        row.created_at as i64,
                        row.notified,
                    ],
                )?;
                MatchReport {
                    seq: tx.last_insert_rowid() as u64,
                    ..row
                }
            }
        };

        let group = select(&tx, "perpetrator = ?", &row.perpetrator)?;
        tx.commit()?;

        Ok(Submission {
            row,
            created,
            group,
        })
    }

    async fn find_by_perpetrator(&self, perpetrator: &str) -> CoreResult<Vec<MatchReport>> {
        let conn = self.conn.lock().unwrap();
        select(&conn, "perpetrator = ?", perpetrator)
    }

    async fn list_for_report(&self, report_id: &Uuid) -> CoreResult<Vec<MatchReport>> {
        let conn = self.conn.lock().unwrap();
        select(&conn, "report_id = ?", &report_id.to_string())
    }

    async fn claim_unnotified(&self, perpetrator: &str) -> CoreResult<Vec<MatchReport>> {
        let mut conn = self.conn.lock().unwrap();
        let tx = conn.transaction()?;
        let claimed = select(&tx, "perpetrator = ? AND notified = 0", perpetrator)?;
        tx.execute(
            "UPDATE match_reports SET notified = 1 WHERE perpetrator = ? AND notified = 0",
            [perpetrator],
        )?;
        tx.commit()?;

        Ok(claimed
            .into_iter()
            .map(|row| MatchReport {
                notified: true,
                ..row
            })
            .collect())
    }

    async fn pending_perpetrators(&self) -> CoreResult<Vec<String>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(
            "SELECT DISTINCT perpetrator FROM match_reports WHERE notified = 0 ORDER BY perpetrator",
        )?;
        let keys = stmt
            .query_map([], |row| row.get(0))?
            .collect::<rusqlite::Result<Vec<String>>>()?;
        Ok(keys)
    }

    async fn delete_for_report(&self, report_id: &Uuid) -> CoreResult<usize> {
        let conn = self.conn.lock().unwrap();
        Ok(conn.execute(
            "DELETE FROM match_reports WHERE report_id = ?",
            [report_id.to_string()],
        )?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(report_id: Uuid, identifier: &str) -> MatchReport {
        MatchReport::new(report_id, Uuid::new_v4(), 1, identifier.into())
    }

    #[tokio::test]
    async fn test_sqlite_submit_and_claim() {
        let store = SqliteMatchStore::in_memory().unwrap();
        let report_id = Uuid::new_v4();

        let first = store.submit(row(report_id, "perp")).await.unwrap();
        let again = store.submit(row(report_id, "perp")).await.unwrap();
        let other = store.submit(row(Uuid::new_v4(), "perp")).await.unwrap();

        assert!(first.created);
        assert!(!again.created);
        assert_eq!(again.row, first.row);
        assert_eq!(other.group.len(), 2);
        assert_eq!(other.group[0].id, first.row.id);

        let key = first.row.perpetrator.clone();
        assert_eq!(store.pending_perpetrators().await.unwrap(), vec![key.clone()]);
        let claimed = store.claim_unnotified(&key).await.unwrap();
        assert_eq!(claimed.len(), 2);
        assert!(claimed.iter().all(|r| r.notified));
        assert!(store.claim_unnotified(&key).await.unwrap().is_empty());
        assert!(store
            .find_by_perpetrator(&key)
            .await
            .unwrap()
            .iter()
            .all(|r| r.notified));
    }

    #[tokio::test]
    async fn test_sqlite_delete_for_report() {
        let store = SqliteMatchStore::in_memory().unwrap();
        let report_id = Uuid::new_v4();
        store.submit(row(report_id, "one")).await.unwrap();
        store.submit(row(report_id, "two")).await.unwrap();

        assert_eq!(store.list_for_report(&report_id).await.unwrap().len(), 2);
        assert_eq!(store.delete_for_report(&report_id).await.unwrap(), 2);
        assert_eq!(store.delete_for_report(&report_id).await.unwrap(), 0);
    }
}
