//! In-memory match store

use std::collections::BTreeSet;
use std::sync::RwLock;

use async_trait::async_trait;
use uuid::Uuid;

use crate::error::CoreResult;
use crate::matching::MatchReport;
use crate::store::{MatchStore, Submission};

#[derive(Default)]
struct Inner {
    rows: Vec<MatchReport>,
    next_seq: u64,
}

impl Inner {
    fn group(&self, perpetrator: &str) -> Vec<MatchReport> {
        let mut group: Vec<MatchReport> = self
            .rows
            .iter()
            .filter(|row| row.perpetrator == perpetrator)
            .cloned()
            .collect();
        group.sort_by_key(MatchReport::order_key);
        group
    }
}

/// Rows live behind one lock so insert-and-scan is a single step
#[derive(Default)]
pub struct InMemoryMatchStore {
    inner: RwLock<Inner>,
}

impl InMemoryMatchStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn row_count(&self) -> usize {
        self.inner.read().unwrap().rows.len()
    }
}

#[async_trait]
impl MatchStore for InMemoryMatchStore {
    async fn submit(&self, mut row: MatchReport) -> CoreResult<Submission> {
        let mut inner = self.inner.write().unwrap();

        let existing = inner
            .rows
            .iter()
            .find(|r| r.report_id == row.report_id && r.perpetrator == row.perpetrator)
            .cloned();
        let created = existing.is_none();
        let row = match existing {
            Some(existing) => existing,
            None => {
                inner.next_seq += 1;
                row.seq = inner.next_seq;
                inner.rows.push(row.clone());
                row
            }
        };

        let group = inner.group(&row.perpetrator);
        Ok(Submission {
            row,
            created,
            group,
        })
    }

    async fn find_by_perpetrator(&self, perpetrator: &str) -> CoreResult<Vec<MatchReport>> {
        Ok(self.inner.read().unwrap().group(perpetrator))
    }

    async fn list_for_report(&self, report_id: &Uuid) -> CoreResult<Vec<MatchReport>> {
        let mut rows: Vec<MatchReport> = self
            .inner
            .read()
            .unwrap()
            .rows
            .iter()
            .filter(|row| &row.report_id == report_id)
            .cloned()
            .collect();
        rows.sort_by_key(MatchReport::order_key);
        Ok(rows)
    }

    async fn claim_unnotified(&self, perpetrator: &str) -> CoreResult<Vec<MatchReport>> {
        let mut inner = self.inner.write().unwrap();
        let mut claimed = Vec::new();
        for row in inner
            .rows
            .iter_mut()
            .filter(|row| row.perpetrator == perpetrator && !row.notified)
        {
            row.notified = true;
            claimed.push(row.clone());
        }
        claimed.sort_by_key(MatchReport::order_key);
        Ok(claimed)
    }

    async fn pending_perpetrators(&self) -> CoreResult<Vec<String>> {
        let pending: BTreeSet<String> = self
            .inner
            .read()
            .unwrap()
            .rows
            .iter()
            .filter(|row| !row.notified)
            .map(|row| row.perpetrator.clone())
            .collect();
        Ok(pending.into_iter().collect())
    }

    async fn delete_for_report(&self, report_id: &Uuid) -> CoreResult<usize> {
        let mut inner = self.inner.write().unwrap();
        let before = inner.rows.len();
        inner.rows.retain(|row| &row.report_id != report_id);
        Ok(before - inner.rows.len())
    }
}
