//! Wiring: stores in, services out

use std::sync::Arc;

use callisto_crypto::KdfParams;

use crate::audit::AuditTrail;
use crate::matching::{MatchPolicy, MatchingEngine};
use crate::notification::{EmailNotifications, Notifier};
use crate::report::ReportAggregate;
use crate::site::SiteSettings;
use crate::store::memory::{
    InMemoryAuditStore, InMemoryMatchStore, InMemoryNotificationStore, InMemoryPageStore,
    InMemoryReportStore,
};
use crate::store::{AuditStore, MatchStore, NotificationStore, PageStore, ReportStore};
use crate::wizard::WizardEngine;

/// One backend per store trait
#[derive(Clone)]
pub struct Backends {
    pub reports: Arc<dyn ReportStore>,
    pub matches: Arc<dyn MatchStore>,
    pub pages: Arc<dyn PageStore>,
    pub notifications: Arc<dyn NotificationStore>,
    pub audit: Arc<dyn AuditStore>,
}

impl Backends {
    pub fn in_memory() -> Self {
        Self {
            reports: Arc::new(InMemoryReportStore::new()),
            matches: Arc::new(InMemoryMatchStore::new()),
            pages: Arc::new(InMemoryPageStore::new()),
            notifications: Arc::new(InMemoryNotificationStore::new()),
            audit: Arc::new(InMemoryAuditStore::new()),
        }
    }

    /// All stores on one database file
    #[cfg(feature = "sqlite")]
    pub fn sqlite(path: &str) -> crate::CoreResult<Self> {
        use crate::store::sqlite::{
            SqliteAuditStore, SqliteMatchStore, SqliteNotificationStore, SqlitePageStore,
            SqliteReportStore,
        };

        Ok(Self {
            reports: Arc::new(SqliteReportStore::open(path)?),
            matches: Arc::new(SqliteMatchStore::open(path)?),
            pages: Arc::new(SqlitePageStore::open(path)?),
            notifications: Arc::new(SqliteNotificationStore::open(path)?),
            audit: Arc::new(SqliteAuditStore::open(path)?),
        })
    }
}

/// Everything a front end calls
#[derive(Clone)]
pub struct Services {
    pub reports: ReportAggregate,
    pub wizard: WizardEngine,
    pub matching: MatchingEngine,
    pub notifications: EmailNotifications,
    pub audit: AuditTrail,
    pub backends: Backends,
}

impl Services {
    pub fn new(
        backends: Backends,
        notifier: Arc<dyn Notifier>,
        sites: Arc<dyn SiteSettings>,
        kdf: KdfParams,
        policy: MatchPolicy,
    ) -> Self {
        let audit = AuditTrail::new(backends.audit.clone());
        let matching = MatchingEngine::new(
            backends.matches.clone(),
            backends.reports.clone(),
            notifier.clone(),
            sites.clone(),
            audit.clone(),
            policy,
        );
        let reports = ReportAggregate::new(
            backends.reports.clone(),
            matching.clone(),
            notifier,
            sites,
            audit.clone(),
            kdf,
        );
        let wizard = WizardEngine::new(backends.pages.clone(), reports.clone());
        let notifications = EmailNotifications::new(backends.notifications.clone());

        Self {
            reports,
            wizard,
            matching,
            notifications,
            audit,
            backends,
        }
    }
}
