//! Per-site (tenant) settings lookup

use std::collections::HashMap;

use serde::Deserialize;

/// Deployment settings looked up by site id
pub trait SiteSettings: Send + Sync {
    fn coordinator_emails(&self, site_id: u32) -> Vec<String>;

    fn coordinator_public_key(&self, site_id: u32) -> Option<String>;
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct SiteProfile {
    pub id: u32,
    #[serde(default)]
    pub coordinator_emails: Vec<String>,
    #[serde(default)]
    pub coordinator_public_key: Option<String>,
}

/// Settings fixed at startup (from configuration)
#[derive(Debug, Default)]
pub struct StaticSiteSettings {
    sites: HashMap<u32, SiteProfile>,
}

impl StaticSiteSettings {
    pub fn new(profiles: impl IntoIterator<Item = SiteProfile>) -> Self {
        Self {
            sites: profiles.into_iter().map(|p| (p.id, p)).collect(),
        }
    }
}

impl SiteSettings for StaticSiteSettings {
    fn coordinator_emails(&self, site_id: u32) -> Vec<String> {
        self.sites
            .get(&site_id)
            .map(|p| p.coordinator_emails.clone())
            .unwrap_or_default()
    }

    fn coordinator_public_key(&self, site_id: u32) -> Option<String> {
        self.sites
            .get(&site_id)
            .and_then(|p| p.coordinator_public_key.clone())
    }
}
