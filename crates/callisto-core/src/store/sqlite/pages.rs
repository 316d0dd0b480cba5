//! SQLite wizard page store

use std::sync::Mutex;

use async_trait::async_trait;
use rusqlite::{params, Connection};

use super::schema::{connect, json_err};
use crate::error::CoreResult;
use crate::store::PageStore;
use crate::wizard::{sort_pages, Page};

pub struct SqlitePageStore {
    conn: Mutex<Connection>,
}

impl SqlitePageStore {
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
impl PageStore for SqlitePageStore {
    async fn pages_for_site(&self, site_id: u32) -> CoreResult<Vec<Page>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(
            r#"SELECT p.page FROM wizard_pages p
               JOIN wizard_page_sites s ON s.page_id = p.id
               WHERE s.site_id = ?"#,
        )?;
        let raw = stmt
            .query_map([site_id], |row| row.get::<_, String>(0))?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        let pages = raw
            .iter()
            .map(|json| serde_json::from_str(json).map_err(json_err))
            .collect::<CoreResult<Vec<Page>>>()?;
        Ok(sort_pages(pages))
    }

    async fn upsert(&self, page: Page) -> CoreResult<()> {
        let json = serde_json::to_string(&page).map_err(json_err)?;
        let mut conn = self.conn.lock().unwrap();
        let tx = conn.transaction()?;
        tx.execute(
            "INSERT OR REPLACE INTO wizard_pages (id, page) VALUES (?, ?)",
            params![page.id as i64, json],
        )?;
        tx.execute(
            "DELETE FROM wizard_page_sites WHERE page_id = ?",
            [page.id as i64],
        )?;
        for site_id in &page.sites {
            tx.execute(
                "INSERT OR IGNORE INTO wizard_page_sites (page_id, site_id) VALUES (?, ?)",
                params![page.id as i64, site_id],
            )?;
        }
        tx.commit()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::wizard::{Question, QuestionKind};

    #[tokio::test]
    async fn test_sqlite_pages_roundtrip() {
        let store = SqlitePageStore::in_memory().unwrap();
        let page = Page {
            id: 1,
            position: 1,
            sites: vec![1, 2],
            questions: vec![Question {
                id: 4,
                text: "Who?".into(),
                position: 0,
                kind: QuestionKind::SingleLineText { max_length: 50 },
            }],
        };
        store.upsert(page.clone()).await.unwrap();
        store
            .upsert(Page {
                id: 2,
                position: 0,
                sites: vec![1],
                questions: vec![],
            })
            .await
            .unwrap();

        let site_1 = store.pages_for_site(1).await.unwrap();
        assert_eq!(site_1.iter().map(|p| p.id).collect::<Vec<_>>(), vec![2, 1]);
        assert_eq!(store.pages_for_site(2).await.unwrap(), vec![page.clone()]);

        store
            .upsert(Page {
                sites: vec![1],
                ..page
            })
            .await
            .unwrap();
        assert!(store.pages_for_site(2).await.unwrap().is_empty());
    }
}
