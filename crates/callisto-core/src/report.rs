//! Report aggregate: ciphertext, ownership and lifecycle

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use callisto_crypto::{KdfParams, Passphrase};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::audit::{AuditAction, AuditTrail};
use crate::error::{CoreError, CoreResult, ValidationErrors};
use crate::gate::{AccessGate, Unlocked};
use crate::matching::MatchingEngine;
use crate::notification::{fire_and_forget, Notifier};
use crate::record::{Answers, ReportRecord};
use crate::site::SiteSettings;
use crate::store::ReportStore;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReportStatus {
    InProgress,
    Submitted,
    Withdrawn,
}

impl ReportStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReportStatus::InProgress => "in_progress",
            ReportStatus::Submitted => "submitted",
            ReportStatus::Withdrawn => "withdrawn",
        }
    }
}

impl fmt::Display for ReportStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ReportStatus {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "in_progress" => Ok(ReportStatus::InProgress),
            "submitted" => Ok(ReportStatus::Submitted),
            "withdrawn" => Ok(ReportStatus::Withdrawn),
            other => Err(CoreError::Storage(format!("unknown report status '{other}'"))),
        }
    }
}

/// Plaintext contact details gathered by the prep step
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContactInfo {
    #[serde(default)]
    pub contact_name: Option<String>,
    #[serde(default)]
    pub contact_email: Option<String>,
    #[serde(default)]
    pub contact_phone: Option<String>,
    #[serde(default)]
    pub contact_notes: Option<String>,
}

impl ContactInfo {
    pub fn validate(&self) -> CoreResult<()> {
        let mut errors = ValidationErrors::default();
        if let Some(email) = self.contact_email.as_deref() {
            if !is_valid_email(email) {
                errors.add("contact_email", "Enter a valid email address.");
            }
        }
        if let Some(phone) = self.contact_phone.as_deref() {
            let digits = phone.chars().filter(|c| c.is_ascii_digit()).count();
            let allowed = phone
                .chars()
                .all(|c| c.is_ascii_digit() || " +-().".contains(c));
            if !allowed || digits < 7 {
                errors.add("contact_phone", "Enter a valid phone number.");
            }
        }
        errors.into_result()
    }
}

fn is_valid_email(email: &str) -> bool {
    let Some((local, domain)) = email.split_once('@') else {
        return false;
    };
    !local.is_empty()
        && !domain.contains('@')
        && !email.chars().any(char::is_whitespace)
        && domain.split('.').count() >= 2
        && domain.split('.').all(|label| !label.is_empty())
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Report {
    pub id: Uuid,
    pub owner: Uuid,
    pub site_id: u32,
    /// Envelope ciphertext; empty until the first write establishes a key
    #[serde(skip)]
    pub encrypted_data: Vec<u8>,
    pub status: ReportStatus,
    #[serde(flatten)]
    pub contact: ContactInfo,
    pub to_address: Vec<String>,
    pub created_at: u64,
    pub submitted_at: Option<u64>,
    /// Bumped by the store on every successful save
    pub version: u64,
}

impl Report {
    pub fn new(owner: Uuid, site_id: u32) -> Self {
        Self {
            id: Uuid::new_v4(),
            owner,
            site_id,
            encrypted_data: Vec::new(),
            status: ReportStatus::InProgress,
            contact: ContactInfo::default(),
            to_address: Vec::new(),
            created_at: crate::now(),
            submitted_at: None,
            version: 0,
        }
    }

    fn ensure(&self, action: &'static str, allowed: &[ReportStatus]) -> CoreResult<()> {
        if allowed.contains(&self.status) {
            Ok(())
        } else {
            Err(CoreError::InvalidState {
                action,
                status: self.status,
            })
        }
    }
}

/// Owns every mutation of a report's ciphertext and status
#[derive(Clone)]
pub struct ReportAggregate {
    reports: Arc<dyn ReportStore>,
    matching: MatchingEngine,
    notifier: Arc<dyn Notifier>,
    sites: Arc<dyn SiteSettings>,
    audit: AuditTrail,
    kdf: KdfParams,
}

impl ReportAggregate {
    pub fn new(
        reports: Arc<dyn ReportStore>,
        matching: MatchingEngine,
        notifier: Arc<dyn Notifier>,
        sites: Arc<dyn SiteSettings>,
        audit: AuditTrail,
        kdf: KdfParams,
    ) -> Self {
        Self {
            reports,
            matching,
            notifier,
            sites,
            audit,
            kdf,
        }
    }

    /// Start an empty in-progress report
    pub async fn create(&self, owner: Uuid, site_id: u32) -> CoreResult<Report> {
        let report = Report::new(owner, site_id);
        self.reports.insert(&report).await?;
        tracing::info!(report = %report.id, site_id, "report created");
        self.audit.record(&report, AuditAction::Create).await;
        Ok(report)
    }

    /// Metadata only; nothing is decrypted
    pub async fn get(&self, id: &Uuid) -> CoreResult<Report> {
        self.reports.get(id).await
    }

    pub async fn list_for_owner(&self, owner: &Uuid, site_id: u32) -> CoreResult<Vec<Report>> {
        self.reports.list_for_owner(owner, site_id).await
    }

    /// Merge `partial` into the encrypted record and re-encrypt it
    pub async fn update(
        &self,
        id: &Uuid,
        passphrase: &Passphrase,
        partial: Answers,
    ) -> CoreResult<Report> {
        let kdf = self.kdf;
        let report = self
            .write(id, |report| {
                report.ensure("update", &[ReportStatus::InProgress])?;
                let mut unlocked = AccessGate::open(report, passphrase)?;
                unlocked.record_mut().merge(partial.clone());
                report.encrypted_data = unlocked.seal(&kdf)?;
                Ok(())
            })
            .await?;
        self.audit.record(&report, AuditAction::Edit).await;
        Ok(report)
    }

    /// Prep step: store plaintext contact details
    pub async fn set_contact(
        &self,
        id: &Uuid,
        passphrase: &Passphrase,
        contact: ContactInfo,
    ) -> CoreResult<Report> {
        contact.validate()?;
        let kdf = self.kdf;
        let report = self
            .write(id, |report| {
                report.ensure(
                    "edit contact details of",
                    &[ReportStatus::InProgress, ReportStatus::Submitted],
                )?;
                let unlocked = AccessGate::open(report, passphrase)?;
                establish_key(report, &unlocked, &kdf)?;
                report.contact = contact.clone();
                Ok(())
            })
            .await?;
        self.audit.record(&report, AuditAction::ContactPrep).await;
        Ok(report)
    }

    /// Finalize the report and deliver it to the site's coordinators
    pub async fn submit(&self, id: &Uuid, passphrase: &Passphrase) -> CoreResult<Report> {
        let kdf = self.kdf;
        let mut record = None;
        let report = self
            .write(id, |report| {
                report.ensure("submit", &[ReportStatus::InProgress])?;
                let unlocked = AccessGate::open(report, passphrase)?;
                establish_key(report, &unlocked, &kdf)?;
                record = Some(unlocked.into_record());
                report.status = ReportStatus::Submitted;
                report.submitted_at = Some(crate::now());
                report.to_address = self.sites.coordinator_emails(report.site_id);
                Ok(())
            })
            .await?;
        tracing::info!(report = %report.id, "report submitted");
        self.audit.record(&report, AuditAction::Reporting).await;

        let record = record.unwrap_or_default();
        let public_key = self.sites.coordinator_public_key(report.site_id);
        fire_and_forget(
            "send_report_to_authority",
            self.notifier
                .send_report_to_authority(
                    &report,
                    &record,
                    report.site_id,
                    &report.to_address,
                    public_key.as_deref(),
                )
                .await,
        );
        if let Some(email) = &report.contact.contact_email {
            fire_and_forget(
                "send_confirmation",
                self.notifier
                    .send_confirmation(
                        "submit_confirmation",
                        std::slice::from_ref(email),
                        report.site_id,
                    )
                    .await,
            );
        }

        Ok(report)
    }

    /// Withdraw a submitted report. Idempotent.
    pub async fn withdraw(&self, id: &Uuid) -> CoreResult<Report> {
        let current = self.reports.get(id).await?;
        let report = if current.status == ReportStatus::Withdrawn {
            current
        } else {
            let report = self
                .write(id, |report| {
                    report.ensure("withdraw", &[ReportStatus::Submitted, ReportStatus::Withdrawn])?;
                    report.status = ReportStatus::Withdrawn;
                    Ok(())
                })
                .await?;
            self.audit.record(&report, AuditAction::Withdraw).await;
            report
        };

        self.matching.drop_entries(id).await?;
        tracing::info!(report = %id, "report withdrawn");
        Ok(report)
    }

    /// Permanently remove the report and its match entries
    pub async fn delete(&self, id: &Uuid, passphrase: &Passphrase) -> CoreResult<()> {
        let report = self.reports.get(id).await?;
        AccessGate::verify(&report, passphrase)?;

        // report first: if this fails the match entries are still intact
        self.reports.delete(id).await?;
        self.matching.drop_entries(id).await?;
        tracing::info!(report = %id, "report deleted");
        self.audit.record(&report, AuditAction::Delete).await;
        Ok(())
    }

    /// Read-only access to the plaintext record
    pub async fn decrypt(&self, id: &Uuid, passphrase: &Passphrase) -> CoreResult<ReportRecord> {
        let report = self.reports.get(id).await?;
        report.ensure(
            "view",
            &[ReportStatus::InProgress, ReportStatus::Submitted],
        )?;
        Ok(AccessGate::open(&report, passphrase)?.into_record())
    }

    /// Verify the passphrase for operations that never touch plaintext
    pub async fn authorize(&self, id: &Uuid, passphrase: &Passphrase) -> CoreResult<Report> {
        let report = self.reports.get(id).await?;
        AccessGate::verify(&report, passphrase)?;
        Ok(report)
    }

    /// Read-modify-write under optimistic versioning, retried once on conflict
    async fn write<F>(&self, id: &Uuid, mut mutate: F) -> CoreResult<Report>
    where
        F: FnMut(&mut Report) -> CoreResult<()> + Send,
    {
        let mut retried = false;
        loop {
            let mut report = self.reports.get(id).await?;
            mutate(&mut report)?;
            match self.reports.save(&report).await {
                Err(CoreError::Conflict(_)) if !retried => {
                    tracing::debug!(report = %id, "write conflict, retrying");
                    retried = true;
                }
                result => return result,
            }
        }
    }
}

/// A report with no ciphertext yet is keyed by the first passphrase that
/// writes to it
fn establish_key(report: &mut Report, unlocked: &Unlocked<'_>, kdf: &KdfParams) -> CoreResult<()> {
    if report.encrypted_data.is_empty() {
        report.encrypted_data = unlocked.seal(kdf)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;

    use crate::matching::{MatchPolicy, MatchReport};
    use crate::notification::OutboxNotifier;
    use crate::site::StaticSiteSettings;
    use crate::store::memory::{
        InMemoryAuditStore, InMemoryMatchStore, InMemoryNotificationStore, InMemoryPageStore,
        InMemoryReportStore,
    };
    use crate::store::MatchStore;

    /// Report store whose saves always lose the race or whose deletes fail
    #[derive(Default)]
    struct FlakyReportStore {
        inner: InMemoryReportStore,
        conflicts: bool,
        fail_delete: bool,
        saves: AtomicUsize,
    }

    #[async_trait]
    impl ReportStore for FlakyReportStore {
        async fn insert(&self, report: &Report) -> CoreResult<()> {
            self.inner.insert(report).await
        }

        async fn get(&self, id: &Uuid) -> CoreResult<Report> {
            self.inner.get(id).await
        }

        async fn save(&self, report: &Report) -> CoreResult<Report> {
            self.saves.fetch_add(1, Ordering::SeqCst);
            if self.conflicts {
                return Err(CoreError::Conflict(format!("report {}", report.id)));
            }
            self.inner.save(report).await
        }

        async fn delete(&self, id: &Uuid) -> CoreResult<()> {
            if self.fail_delete {
                return Err(CoreError::Storage("disk full".into()));
            }
            self.inner.delete(id).await
        }

        async fn list_for_owner(&self, owner: &Uuid, site_id: u32) -> CoreResult<Vec<Report>> {
            self.inner.list_for_owner(owner, site_id).await
        }
    }

    fn aggregate(
        reports: Arc<FlakyReportStore>,
        matches: Arc<InMemoryMatchStore>,
    ) -> ReportAggregate {
        let notifier = Arc::new(OutboxNotifier::new(
            Arc::new(InMemoryNotificationStore::new()),
            reports.clone(),
            Arc::new(InMemoryPageStore::new()),
        ));
        let sites = Arc::new(StaticSiteSettings::default());
        let audit = AuditTrail::new(Arc::new(InMemoryAuditStore::new()));
        let matching = MatchingEngine::new(
            matches,
            reports.clone(),
            notifier.clone(),
            sites.clone(),
            audit.clone(),
            MatchPolicy::default(),
        );
        ReportAggregate::new(
            reports,
            matching,
            notifier,
            sites,
            audit,
            KdfParams::insecure_for_tests(),
        )
    }

    #[tokio::test]
    async fn test_write_retries_once_then_conflicts() {
        let store = Arc::new(FlakyReportStore {
            conflicts: true,
            ..Default::default()
        });
        let reports = aggregate(store.clone(), Arc::new(InMemoryMatchStore::new()));
        let report = reports.create(Uuid::new_v4(), 1).await.unwrap();

        let key = Passphrase::new("super secret");
        let err = reports
            .update(&report.id, &key, Answers::new())
            .await
            .unwrap_err();
        assert!(matches!(err, CoreError::Conflict(_)));
        assert_eq!(store.saves.load(Ordering::SeqCst), 2);
        // nothing was stored, so the report is still unkeyed
        assert!(store.get(&report.id).await.unwrap().encrypted_data.is_empty());
    }

    #[tokio::test]
    async fn test_failed_delete_keeps_match_entries() {
        let store = Arc::new(FlakyReportStore {
            fail_delete: true,
            ..Default::default()
        });
        let matches = Arc::new(InMemoryMatchStore::new());
        let reports = aggregate(store.clone(), matches.clone());

        let key = Passphrase::new("super secret");
        let report = reports.create(Uuid::new_v4(), 1).await.unwrap();
        reports.submit(&report.id, &key).await.unwrap();
        matches
            .submit(MatchReport::new(
                report.id,
                report.owner,
                1,
                "facebook.com/perp".into(),
            ))
            .await
            .unwrap();

        let err = reports.delete(&report.id, &key).await.unwrap_err();
        assert!(matches!(err, CoreError::Storage(_)));
        assert_eq!(matches.row_count(), 1);
        assert!(reports.get(&report.id).await.is_ok());
    }

    #[test]
    fn test_status_roundtrip() {
        for status in [
            ReportStatus::InProgress,
            ReportStatus::Submitted,
            ReportStatus::Withdrawn,
        ] {
            assert_eq!(status.as_str().parse::<ReportStatus>().unwrap(), status);
        }
        assert!("deleted".parse::<ReportStatus>().is_err());
    }

    #[test]
    fn test_contact_validation() {
        let good = ContactInfo {
            contact_email: Some("test@example.com".into()),
            contact_phone: Some("555-555-5555".into()),
            ..Default::default()
        };
        assert!(good.validate().is_ok());

        for email in ["notanemail", "a@b", "a b@example.com", "@example.com", "a@@b.com"] {
            let bad = ContactInfo {
                contact_email: Some(email.into()),
                ..Default::default()
            };
            let Err(CoreError::Validation(errors)) = bad.validate() else {
                panic!("{email} accepted");
            };
            assert!(errors.get("contact_email").is_some());
        }

        let bad_phone = ContactInfo {
            contact_phone: Some("call me".into()),
            ..Default::default()
        };
        assert!(bad_phone.validate().is_err());
    }

    #[test]
    fn test_ensure_reports_status() {
        let mut report = Report::new(Uuid::new_v4(), 1);
        report.status = ReportStatus::Submitted;
        let err = report
            .ensure("update", &[ReportStatus::InProgress])
            .unwrap_err();
        assert_eq!(err.to_string(), "Cannot update a report that is submitted");
    }
}
