//! In-memory report store

use std::collections::HashMap;
use std::sync::RwLock;

use async_trait::async_trait;
use uuid::Uuid;

use crate::error::{CoreError, CoreResult};
use crate::report::Report;
use crate::store::ReportStore;

#[derive(Default)]
pub struct InMemoryReportStore {
    reports: RwLock<HashMap<Uuid, Report>>,
}

impl InMemoryReportStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored reports
    pub fn report_count(&self) -> usize {
        self.reports.read().unwrap().len()
    }
}

#[async_trait]
impl ReportStore for InMemoryReportStore {
    async fn insert(&self, report: &Report) -> CoreResult<()> {
        let mut reports = self.reports.write().unwrap();
        if reports.contains_key(&report.id) {
            return Err(CoreError::Conflict(format!("report {} already exists", report.id)));
        }
        reports.insert(report.id, report.clone());
        Ok(())
    }

    async fn get(&self, id: &Uuid) -> CoreResult<Report> {
        self.reports
            .read()
            .unwrap()
            .get(id)
            .cloned()
            .ok_or_else(|| CoreError::NotFound(format!("report {id}")))
    }

    async fn save(&self, report: &Report) -> CoreResult<Report> {
        let mut reports = self.reports.write().unwrap();
        let stored = reports
            .get_mut(&report.id)
            .ok_or_else(|| CoreError::NotFound(format!("report {}", report.id)))?;

        if stored.version != report.version {
            return Err(CoreError::Conflict(format!(
                "report {} changed since it was read",
                report.id
            )));
        }

        let mut updated = report.clone();
        updated.version += 1;
        *stored = updated.clone();
        Ok(updated)
    }

    async fn delete(&self, id: &Uuid) -> CoreResult<()> {
        self.reports
            .write()
            .unwrap()
            .remove(id)
            .map(|_| ())
            .ok_or_else(|| CoreError::NotFound(format!("report {id}")))
    }

    async fn list_for_owner(&self, owner: &Uuid, site_id: u32) -> CoreResult<Vec<Report>> {
        let mut reports: Vec<Report> = self
            .reports
            .read()
            .unwrap()
            .values()
            .filter(|r| &r.owner == owner && r.site_id == site_id)
            .cloned()
            .collect();
        reports.sort_by_key(|r| (r.created_at, r.id));
        Ok(reports)
    }
}
