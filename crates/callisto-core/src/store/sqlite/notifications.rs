//! SQLite email notification store

use std::sync::Mutex;

use async_trait::async_trait;
use rusqlite::{params, Connection, OptionalExtension};

use super::schema::connect;
use crate::error::{CoreError, CoreResult};
use crate::notification::{EmailNotification, NewEmailNotification};
use crate::store::NotificationStore;

fn collision(name: &str, site_id: u32) -> CoreError {
    CoreError::validation(
        "name",
        format!("Email notification '{name}' already exists on site {site_id}."),
    )
}

fn is_constraint(err: &rusqlite::Error) -> bool {
    matches!(
        err,
        rusqlite::Error::SqliteFailure(e, _) if e.code == rusqlite::ErrorCode::ConstraintViolation
    )
}

fn load(conn: &Connection, id: u64) -> CoreResult<Option<EmailNotification>> {
    let Some((name, subject, body)) = conn
        .query_row(
            "SELECT name, subject, body FROM email_notifications WHERE id = ?",
            [id as i64],
            |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, String>(2)?,
                ))
            },
        )
        .optional()?
    else {
        return Ok(None);
    };

    let mut stmt = conn.prepare(
        "SELECT site_id FROM email_notification_sites WHERE notification_id = ? ORDER BY site_id",
    )?;
    let sites = stmt
        .query_map([id as i64], |row| row.get(0))?
        .collect::<rusqlite::Result<Vec<u32>>>()?;

    Ok(Some(EmailNotification {
        id,
        name,
        subject,
        body,
        sites,
    }))
}

fn load_ids(
    conn: &Connection,
    sql: &str,
    params: impl rusqlite::Params,
) -> CoreResult<Vec<EmailNotification>> {
    let mut stmt = conn.prepare(sql)?;
    let ids = stmt
        .query_map(params, |row| row.get::<_, i64>(0))?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    let mut out = Vec::with_capacity(ids.len());
    for id in ids {
        if let Some(notification) = load(conn, id as u64)? {
            out.push(notification);
        }
    }
    Ok(out)
}

pub struct SqliteNotificationStore {
    conn: Mutex<Connection>,
}

impl SqliteNotificationStore {
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
impl NotificationStore for SqliteNotificationStore {
    async fn create(&self, new: NewEmailNotification) -> CoreResult<EmailNotification> {
        let mut conn = self.conn.lock().unwrap();
        let tx = conn.transaction()?;
        tx.execute(
            "INSERT INTO email_notifications (name, subject, body) VALUES (?, ?, ?)",
            params![new.name, new.subject, new.body],
        )?;
        let id = tx.last_insert_rowid();

        let mut sites = new.sites.clone();
        sites.sort_unstable();
        sites.dedup();
        for site_id in sites {
            let result = tx.execute(
                "INSERT INTO email_notification_sites (notification_id, site_id, name) VALUES (?, ?, ?)",
                params![id, site_id, new.name],
            );
            match result {
                Ok(_) => {}
                // dropping `tx` rolls back the notification row too
                Err(e) if is_constraint(&e) => return Err(collision(&new.name, site_id)),
                Err(e) => return Err(e.into()),
            }
        }

        let created = load(&tx, id as u64)?
            .ok_or_else(|| CoreError::Storage("notification vanished during create".into()))?;
        tx.commit()?;
        Ok(created)
    }

    async fn get(&self, id: u64) -> CoreResult<EmailNotification> {
        let conn = self.conn.lock().unwrap();
        load(&conn, id)?.ok_or_else(|| CoreError::NotFound(format!("email notification {id}")))
    }

    async fn add_site(&self, id: u64, site_id: u32) -> CoreResult<EmailNotification> {
        let conn = self.conn.lock().unwrap();
        let notification =
            load(&conn, id)?.ok_or_else(|| CoreError::NotFound(format!("email notification {id}")))?;
        if notification.sites.contains(&site_id) {
            return Ok(notification);
        }

        let result = conn.execute(
            "INSERT INTO email_notification_sites (notification_id, site_id, name) VALUES (?, ?, ?)",
            params![id as i64, site_id, notification.name],
        );
        match result {
            Ok(_) => {}
            Err(e) if is_constraint(&e) => return Err(collision(&notification.name, site_id)),
            Err(e) => return Err(e.into()),
        }

        load(&conn, id)?.ok_or_else(|| CoreError::NotFound(format!("email notification {id}")))
    }

    async fn on_site(&self, site_id: u32) -> CoreResult<Vec<EmailNotification>> {
        let conn = self.conn.lock().unwrap();
        load_ids(
            &conn,
            "SELECT notification_id FROM email_notification_sites WHERE site_id = ? ORDER BY notification_id",
            [site_id],
        )
    }

    async fn find(&self, name: &str, site_id: u32) -> CoreResult<Option<EmailNotification>> {
        let conn = self.conn.lock().unwrap();
        Ok(load_ids(
            &conn,
            "SELECT notification_id FROM email_notification_sites WHERE site_id = ? AND name = ?",
            params![site_id, name],
        )?
        .into_iter()
        .next())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn new(name: &str, sites: Vec<u32>) -> NewEmailNotification {
        NewEmailNotification {
            name: name.into(),
            subject: "example email".into(),
            body: "example email".into(),
            sites,
        }
    }

    #[tokio::test]
    async fn test_sqlite_unique_per_site() {
        let store = SqliteNotificationStore::in_memory().unwrap();
        let first = store.create(new("example email", vec![1])).await.unwrap();
        store.create(new("example email", vec![2])).await.unwrap();

        let dup = store.create(new("example email", vec![1])).await;
        assert!(matches!(dup, Err(CoreError::Validation(_))));
        assert_eq!(store.on_site(1).await.unwrap().len(), 1);

        let err = store.add_site(first.id, 2).await;
        assert!(matches!(err, Err(CoreError::Validation(_))));
        assert_eq!(store.get(first.id).await.unwrap(), first);
        assert_eq!(store.on_site(2).await.unwrap().len(), 1);

        let added = store.add_site(first.id, 3).await.unwrap();
        assert_eq!(added.sites, vec![1, 3]);
        assert_eq!(store.find("example email", 3).await.unwrap(), Some(added));
    }
}
