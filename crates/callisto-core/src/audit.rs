//! Per-action evaluation trail
//!
//! One event per user action on a report, for measuring how the reporting
//! flow is used. Events carry ids, the site and the action kind only:
//! answers, contact details and identifiers never enter the trail.

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{CoreError, CoreResult};
use crate::report::Report;
use crate::store::AuditStore;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AuditAction {
    Create,
    Edit,
    ContactPrep,
    /// Submission to the authority
    Reporting,
    EnterMatching,
    MatchingWithdraw,
    Withdraw,
    Delete,
}

impl AuditAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            AuditAction::Create => "CREATE",
            AuditAction::Edit => "EDIT",
            AuditAction::ContactPrep => "CONTACT_PREP",
            AuditAction::Reporting => "REPORTING",
            AuditAction::EnterMatching => "ENTER_MATCHING",
            AuditAction::MatchingWithdraw => "MATCHING_WITHDRAW",
            AuditAction::Withdraw => "WITHDRAW",
            AuditAction::Delete => "DELETE",
        }
    }
}

impl fmt::Display for AuditAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AuditAction {
    type Err = CoreError;

    fn from_str(s: &str) -> CoreResult<Self> {
        Ok(match s {
            "CREATE" => AuditAction::Create,
            "EDIT" => AuditAction::Edit,
            "CONTACT_PREP" => AuditAction::ContactPrep,
            "REPORTING" => AuditAction::Reporting,
            "ENTER_MATCHING" => AuditAction::EnterMatching,
            "MATCHING_WITHDRAW" => AuditAction::MatchingWithdraw,
            "WITHDRAW" => AuditAction::Withdraw,
            "DELETE" => AuditAction::Delete,
            other => return Err(CoreError::Storage(format!("unknown audit action '{other}'"))),
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditEvent {
    pub report_id: Uuid,
    pub owner: Uuid,
    pub site_id: u32,
    pub action: AuditAction,
    pub at: u64,
}

impl AuditEvent {
    pub fn new(report: &Report, action: AuditAction) -> Self {
        Self {
            report_id: report.id,
            owner: report.owner,
            site_id: report.site_id,
            action,
            at: crate::now(),
        }
    }
}

/// Records actions after they commit
#[derive(Clone)]
pub struct AuditTrail {
    store: Arc<dyn AuditStore>,
}

impl AuditTrail {
    pub fn new(store: Arc<dyn AuditStore>) -> Self {
        Self { store }
    }

    /// A failed write is logged; the action it describes stands
    pub async fn record(&self, report: &Report, action: AuditAction) {
        let event = AuditEvent::new(report, action);
        tracing::info!(
            report = %event.report_id,
            site_id = event.site_id,
            action = action.as_str(),
            "report action"
        );
        if let Err(e) = self.store.record(event).await {
            tracing::warn!(action = action.as_str(), error = %e, "audit write failed");
        }
    }

    /// Oldest first
    pub async fn for_report(&self, report_id: &Uuid) -> CoreResult<Vec<AuditEvent>> {
        self.store.for_report(report_id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_action_names_roundtrip() {
        for action in [
            AuditAction::Create,
            AuditAction::Edit,
            AuditAction::ContactPrep,
            AuditAction::Reporting,
            AuditAction::EnterMatching,
            AuditAction::MatchingWithdraw,
            AuditAction::Withdraw,
            AuditAction::Delete,
        ] {
            assert_eq!(action.as_str().parse::<AuditAction>().unwrap(), action);
            assert_eq!(
                serde_json::to_value(action).unwrap(),
                serde_json::json!(action.as_str())
            );
        }
        assert!("SCHOOL_EMAIL".parse::<AuditAction>().is_err());
    }
}
