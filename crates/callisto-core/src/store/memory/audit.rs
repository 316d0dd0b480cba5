//! In-memory audit trail

use std::sync::RwLock;

use async_trait::async_trait;
use uuid::Uuid;

use crate::audit::AuditEvent;
use crate::error::CoreResult;
use crate::store::AuditStore;

#[derive(Default)]
pub struct InMemoryAuditStore {
    events: RwLock<Vec<AuditEvent>>,
}

impl InMemoryAuditStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl AuditStore for InMemoryAuditStore {
    async fn record(&self, event: AuditEvent) -> CoreResult<()> {
        self.events.write().unwrap().push(event);
        Ok(())
    }

    async fn for_report(&self, report_id: &Uuid) -> CoreResult<Vec<AuditEvent>> {
        Ok(self
            .events
            .read()
            .unwrap()
            .iter()
            .filter(|event| &event.report_id == report_id)
            .cloned()
            .collect())
    }
}
