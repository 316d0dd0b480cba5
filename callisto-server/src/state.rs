use crate::config::Config;
use callisto_core::notification::NewEmailNotification;
use callisto_core::store::{NotificationStore, PageStore};
use callisto_core::{
    Backends, CoreError, OutboxNotifier, Page, PlainTextExporter, ReportExporter, Services,
    StaticSiteSettings,
};
use std::sync::Arc;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub services: Services,
    /// Outgoing mail; a delivery worker drains it
    pub outbox: Arc<OutboxNotifier>,
    pub exporter: Arc<dyn ReportExporter>,
    pub config: Arc<Config>,
}

impl AppState {
    pub async fn new(config: &Config) -> anyhow::Result<Self> {
        config.kdf.validate()?;

        let backends = open_backends(config)?;
        load_fixtures(config, &backends).await?;

        let outbox = Arc::new(OutboxNotifier::new(
            backends.notifications.clone(),
            backends.reports.clone(),
            backends.pages.clone(),
        ));
        let sites = Arc::new(StaticSiteSettings::new(config.sites.clone()));
        let services = Services::new(
            backends,
            outbox.clone(),
            sites,
            config.kdf,
            config.matching,
        );

        Ok(Self {
            services,
            outbox,
            exporter: Arc::new(PlainTextExporter),
            config: Arc::new(config.clone()),
        })
    }
}

fn open_backends(config: &Config) -> anyhow::Result<Backends> {
    match config.storage.backend.as_str() {
        "memory" => Ok(Backends::in_memory()),
        #[cfg(feature = "sqlite")]
        "sqlite" => {
            let path = config
                .storage
                .sqlite_path
                .as_deref()
                .ok_or_else(|| anyhow::anyhow!("storage.sqlite_path is required for sqlite"))?;
            tracing::info!(path, "opening sqlite storage");
            Ok(Backends::sqlite(path)?)
        }
        other => anyhow::bail!("Unknown storage backend: {other}"),
    }
}

async fn load_fixtures(config: &Config, backends: &Backends) -> anyhow::Result<()> {
    if let Some(path) = &config.fixtures.pages {
        let raw = tokio::fs::read_to_string(path).await?;
        let pages: Vec<Page> = serde_json::from_str(&raw)?;
        let count = pages.len();
        for page in pages {
            backends.pages.upsert(page).await?;
        }
        tracing::info!(path = %path, count, "wizard pages loaded");
    }

    if let Some(path) = &config.fixtures.notifications {
        let raw = tokio::fs::read_to_string(path).await?;
        let notifications: Vec<NewEmailNotification> = serde_json::from_str(&raw)?;
        for new in notifications {
            let name = new.name.clone();
            match backends.notifications.create(new).await {
                Ok(created) => tracing::debug!(id = created.id, name = %name, "email notification loaded"),
                // already present from a previous start
                Err(CoreError::Validation(errors)) => {
                    tracing::warn!(name = %name, %errors, "email notification skipped")
                }
                Err(e) => return Err(e.into()),
            }
        }
    }

    Ok(())
}
