//! In-memory wizard page store

use std::collections::HashMap;
use std::sync::RwLock;

use async_trait::async_trait;

use crate::error::CoreResult;
use crate::store::PageStore;
use crate::wizard::{sort_pages, Page};

#[derive(Default)]
pub struct InMemoryPageStore {
    pages: RwLock<HashMap<u64, Page>>,
}

impl InMemoryPageStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_pages(pages: impl IntoIterator<Item = Page>) -> Self {
        Self {
            pages: RwLock::new(pages.into_iter().map(|p| (p.id, p)).collect()),
        }
    }
}

#[async_trait]
impl PageStore for InMemoryPageStore {
    async fn pages_for_site(&self, site_id: u32) -> CoreResult<Vec<Page>> {
        let pages: Vec<Page> = self
            .pages
            .read()
            .unwrap()
            .values()
            .filter(|p| p.is_on_site(site_id))
            .cloned()
            .collect();
        Ok(sort_pages(pages))
    }

    async fn upsert(&self, page: Page) -> CoreResult<()> {
        self.pages.write().unwrap().insert(page.id, page);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn page(id: u64, position: i32, sites: Vec<u32>) -> Page {
        Page {
            id,
            position,
            sites,
            questions: vec![],
        }
    }

    #[tokio::test]
    async fn test_pages_for_site_are_filtered_and_ordered() {
        let store = InMemoryPageStore::with_pages([
            page(1, 2, vec![1]),
            page(2, 1, vec![1, 2]),
            page(3, 1, vec![2]),
        ]);

        let ids: Vec<u64> = store
            .pages_for_site(1)
            .await
            .unwrap()
            .iter()
            .map(|p| p.id)
            .collect();
        assert_eq!(ids, vec![2, 1]);

        store.upsert(page(1, 0, vec![1])).await.unwrap();
        let first = &store.pages_for_site(1).await.unwrap()[0];
        assert_eq!(first.id, 1);
    }
}
