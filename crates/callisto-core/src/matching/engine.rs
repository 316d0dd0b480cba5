//! Match groups and the notification trigger

use std::collections::HashSet;
use std::sync::Arc;

use uuid::Uuid;

use super::identifier::{normalize, perpetrator_key};
use super::{MatchPolicy, MatchReport};
use crate::audit::{AuditAction, AuditTrail};
use crate::error::{CoreError, CoreResult};
use crate::notification::{fire_and_forget, Notifier};
use crate::report::ReportStatus;
use crate::site::SiteSettings;
use crate::store::{MatchStore, ReportStore};

#[derive(Clone)]
pub struct MatchingEngine {
    matches: Arc<dyn MatchStore>,
    reports: Arc<dyn ReportStore>,
    notifier: Arc<dyn Notifier>,
    sites: Arc<dyn SiteSettings>,
    audit: AuditTrail,
    policy: MatchPolicy,
}

impl MatchingEngine {
    pub fn new(
        matches: Arc<dyn MatchStore>,
        reports: Arc<dyn ReportStore>,
        notifier: Arc<dyn Notifier>,
        sites: Arc<dyn SiteSettings>,
        audit: AuditTrail,
        policy: MatchPolicy,
    ) -> Self {
        Self {
            matches,
            reports,
            notifier,
            sites,
            audit,
            policy,
        }
    }

    pub fn policy(&self) -> MatchPolicy {
        self.policy
    }

    /// Enter a perpetrator identifier for a report.
    ///
    /// Entering the same identifier again returns the existing row and sends
    /// nothing.
    pub async fn submit_identifier(
        &self,
        report_id: &Uuid,
        identifier: &str,
    ) -> CoreResult<MatchReport> {
        let report = self.reports.get(report_id).await?;
        ensure_not_withdrawn(report.status)?;

        let normalized = normalize(identifier)?;
        let row = MatchReport::new(report.id, report.owner, report.site_id, normalized);
        let submission = self.matches.submit(row).await?;
        if !submission.created {
            tracing::debug!(report = %report_id, "matching entry already present");
            return Ok(submission.row);
        }

        // a withdraw or delete that ran between the check above and the
        // insert has already dropped this report's rows; drop the new one too
        let report = match self.reports.get(report_id).await {
            Ok(current) if current.status != ReportStatus::Withdrawn => current,
            current => {
                self.matches.delete_for_report(report_id).await?;
                tracing::info!(report = %report_id, "matching entry discarded, report withdrawn");
                return Err(match current {
                    Ok(current) => withdrawn(current.status),
                    Err(e) => e,
                });
            }
        };
        tracing::info!(report = %report_id, group_size = submission.group.len(), "matching entry recorded");
        self.audit.record(&report, AuditAction::EnterMatching).await;

        if let Some(email) = &report.contact.contact_email {
            fire_and_forget(
                "send_confirmation",
                self.notifier
                    .send_confirmation(
                        "match_confirmation",
                        std::slice::from_ref(email),
                        report.site_id,
                    )
                    .await,
            );
        }

        if self.policy.immediate && self.is_match(&submission.group) {
            self.trigger(&submission.row.perpetrator).await?;
        }
        Ok(submission.row)
    }

    /// Rows sharing the identifier's normalized form, oldest first
    pub async fn find_matches(
        &self,
        identifier: &str,
        excluding: Option<&Uuid>,
    ) -> CoreResult<Vec<MatchReport>> {
        let perpetrator = perpetrator_key(&normalize(identifier)?);
        let mut rows = self.matches.find_by_perpetrator(&perpetrator).await?;
        if let Some(excluded) = excluding {
            rows.retain(|row| &row.report_id != excluded);
        }
        Ok(rows)
    }

    pub async fn entries_for_report(&self, report_id: &Uuid) -> CoreResult<Vec<MatchReport>> {
        self.matches.list_for_report(report_id).await
    }

    /// Take a report out of every group at its owner's request
    pub async fn withdraw(&self, report_id: &Uuid) -> CoreResult<usize> {
        let report = self.reports.get(report_id).await?;
        let removed = self.drop_entries(report_id).await?;
        self.audit.record(&report, AuditAction::MatchingWithdraw).await;
        Ok(removed)
    }

    /// Remove a report's rows as part of a report-level withdraw or delete
    pub(crate) async fn drop_entries(&self, report_id: &Uuid) -> CoreResult<usize> {
        let removed = self.matches.delete_for_report(report_id).await?;
        if removed > 0 {
            tracing::info!(report = %report_id, removed, "matching entries withdrawn");
        }
        Ok(removed)
    }

    /// Fire the trigger for every group with un-notified rows.
    ///
    /// Returns the number of rows newly matched.
    pub async fn run_pending(&self) -> CoreResult<usize> {
        let mut matched = 0;
        for perpetrator in self.matches.pending_perpetrators().await? {
            matched += self.trigger(&perpetrator).await?;
        }
        tracing::info!(matched, "pending matches processed");
        Ok(matched)
    }

    fn threshold(&self) -> usize {
        // a single owner never matches themselves
        self.policy.threshold.max(2)
    }

    fn is_match(&self, group: &[MatchReport]) -> bool {
        let owners: HashSet<Uuid> = group.iter().map(|row| row.owner).collect();
        owners.len() >= self.threshold()
    }

    /// Claim the group's un-notified rows and notify.
    ///
    /// The authority gets the whole group each time new rows join; each owner
    /// hears about a group at most once.
    async fn trigger(&self, perpetrator: &str) -> CoreResult<usize> {
        let group = self.matches.find_by_perpetrator(perpetrator).await?;
        if !self.is_match(&group) {
            return Ok(0);
        }
        let mut told: HashSet<Uuid> = group
            .iter()
            .filter(|row| row.notified)
            .map(|row| row.owner)
            .collect();

        let claimed = self.matches.claim_unnotified(perpetrator).await?;
        let Some(newest) = claimed.iter().max_by_key(|row| row.order_key()) else {
            return Ok(0);
        };

        let group = self.matches.find_by_perpetrator(perpetrator).await?;
        let to = self.sites.coordinator_emails(newest.site_id);
        let public_key = self.sites.coordinator_public_key(newest.site_id);
        fire_and_forget(
            "send_matching_report_to_authority",
            self.notifier
                .send_matching_report_to_authority(
                    &group,
                    &newest.identifier,
                    &to,
                    public_key.as_deref(),
                )
                .await,
        );

        for row in &claimed {
            if told.insert(row.owner) {
                fire_and_forget(
                    "send_match_notification",
                    self.notifier.send_match_notification(row).await,
                );
            }
        }

        tracing::info!(
            group_size = group.len(),
            newly_matched = claimed.len(),
            "match found"
        );
        Ok(claimed.len())
    }
}

fn withdrawn(status: ReportStatus) -> CoreError {
    CoreError::InvalidState {
        action: "enter matching for",
        status,
    }
}

fn ensure_not_withdrawn(status: ReportStatus) -> CoreResult<()> {
    if status == ReportStatus::Withdrawn {
        Err(withdrawn(status))
    } else {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;

    use crate::notification::OutboxNotifier;
    use crate::report::Report;
    use crate::site::StaticSiteSettings;
    use crate::store::memory::{
        InMemoryAuditStore, InMemoryMatchStore, InMemoryNotificationStore, InMemoryPageStore,
        InMemoryReportStore,
    };
    use crate::store::{AuditStore, Submission};

    /// Withdraws the report while the row is being inserted, the way a
    /// concurrent withdraw would land between the status check and the insert
    struct WithdrawDuringSubmit {
        inner: Arc<InMemoryMatchStore>,
        reports: Arc<InMemoryReportStore>,
    }

    #[async_trait]
    impl MatchStore for WithdrawDuringSubmit {
        async fn submit(&self, row: MatchReport) -> CoreResult<Submission> {
            let mut report = self.reports.get(&row.report_id).await?;
            report.status = ReportStatus::Withdrawn;
            self.reports.save(&report).await?;
            self.inner.delete_for_report(&row.report_id).await?;
            self.inner.submit(row).await
        }

        async fn find_by_perpetrator(&self, perpetrator: &str) -> CoreResult<Vec<MatchReport>> {
            self.inner.find_by_perpetrator(perpetrator).await
        }

        async fn list_for_report(&self, report_id: &Uuid) -> CoreResult<Vec<MatchReport>> {
            self.inner.list_for_report(report_id).await
        }

        async fn claim_unnotified(&self, perpetrator: &str) -> CoreResult<Vec<MatchReport>> {
            self.inner.claim_unnotified(perpetrator).await
        }

        async fn pending_perpetrators(&self) -> CoreResult<Vec<String>> {
            self.inner.pending_perpetrators().await
        }

        async fn delete_for_report(&self, report_id: &Uuid) -> CoreResult<usize> {
            self.inner.delete_for_report(report_id).await
        }
    }

    #[tokio::test]
    async fn test_withdraw_during_submit_leaves_no_entry() {
        let reports = Arc::new(InMemoryReportStore::new());
        let rows = Arc::new(InMemoryMatchStore::new());
        let outbox = Arc::new(OutboxNotifier::new(
            Arc::new(InMemoryNotificationStore::new()),
            reports.clone(),
            Arc::new(InMemoryPageStore::new()),
        ));
        let audit = Arc::new(InMemoryAuditStore::new());
        let engine = MatchingEngine::new(
            Arc::new(WithdrawDuringSubmit {
                inner: rows.clone(),
                reports: reports.clone(),
            }),
            reports.clone(),
            outbox.clone(),
            Arc::new(StaticSiteSettings::default()),
            AuditTrail::new(audit.clone()),
            MatchPolicy::default(),
        );

        let mut report = Report::new(Uuid::new_v4(), 1);
        report.status = ReportStatus::Submitted;
        report.contact.contact_email = Some("a@example.com".into());
        reports.insert(&report).await.unwrap();

        let err = engine
            .submit_identifier(&report.id, "@perp")
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            CoreError::InvalidState {
                status: ReportStatus::Withdrawn,
                ..
            }
        ));
        assert_eq!(rows.row_count(), 0);
        assert!(outbox.outbox().is_empty());
        assert!(audit.for_report(&report.id).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_deleted_report_entry_discarded() {
        let reports = Arc::new(InMemoryReportStore::new());
        let rows = Arc::new(InMemoryMatchStore::new());
        let outbox = Arc::new(OutboxNotifier::new(
            Arc::new(InMemoryNotificationStore::new()),
            reports.clone(),
            Arc::new(InMemoryPageStore::new()),
        ));

        /// Deletes the report mid-insert
        struct DeleteDuringSubmit {
            inner: Arc<InMemoryMatchStore>,
            reports: Arc<InMemoryReportStore>,
        }

        #[async_trait]
        impl MatchStore for DeleteDuringSubmit {
            async fn submit(&self, row: MatchReport) -> CoreResult<Submission> {
                self.reports.delete(&row.report_id).await?;
                self.inner.submit(row).await
            }
            async fn find_by_perpetrator(&self, p: &str) -> CoreResult<Vec<MatchReport>> {
                self.inner.find_by_perpetrator(p).await
            }
            async fn list_for_report(&self, id: &Uuid) -> CoreResult<Vec<MatchReport>> {
                self.inner.list_for_report(id).await
            }
            async fn claim_unnotified(&self, p: &str) -> CoreResult<Vec<MatchReport>> {
                self.inner.claim_unnotified(p).await
            }
            async fn pending_perpetrators(&self) -> CoreResult<Vec<String>> {
                self.inner.pending_perpetrators().await
            }
            async fn delete_for_report(&self, id: &Uuid) -> CoreResult<usize> {
                self.inner.delete_for_report(id).await
            }
        }

        let engine = MatchingEngine::new(
            Arc::new(DeleteDuringSubmit {
                inner: rows.clone(),
                reports: reports.clone(),
            }),
            reports.clone(),
            outbox.clone(),
            Arc::new(StaticSiteSettings::default()),
            AuditTrail::new(Arc::new(InMemoryAuditStore::new())),
            MatchPolicy::default(),
        );

        let report = Report::new(Uuid::new_v4(), 1);
        reports.insert(&report).await.unwrap();

        let err = engine
            .submit_identifier(&report.id, "@perp")
            .await
            .unwrap_err();
        assert!(matches!(err, CoreError::NotFound(_)));
        assert_eq!(rows.row_count(), 0);
        assert!(outbox.outbox().is_empty());
    }
}
