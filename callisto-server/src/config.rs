use callisto_core::{MatchPolicy, SiteProfile};
use callisto_crypto::KdfParams;
use figment::{
    providers::{Env, Format, Toml},
    Figment,
};
use serde::Deserialize;

pub const DEFAULT_CONFIG_FILE: &str = "callisto-server.toml";

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,

    /// Site used when a request carries no `X-Site-Id`
    #[serde(default = "default_site_id")]
    pub default_site_id: u32,

    /// Argon2id cost for newly written records
    #[serde(default)]
    pub kdf: KdfParams,

    #[serde(default)]
    pub storage: StorageConfig,

    #[serde(default)]
    pub matching: MatchPolicy,

    #[serde(default)]
    pub sites: Vec<SiteProfile>,

    #[serde(default)]
    pub fixtures: FixtureConfig,

    /// Shared secret for the `/notifications` admin routes; unset disables them
    pub admin_token: Option<String>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct StorageConfig {
    #[serde(default = "default_backend")]
    pub backend: String, // "memory", "sqlite"
    pub sqlite_path: Option<String>,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            backend: default_backend(),
            sqlite_path: None,
        }
    }
}

/// JSON files loaded at startup
#[derive(Debug, Deserialize, Default, Clone)]
pub struct FixtureConfig {
    /// Array of wizard pages
    pub pages: Option<String>,
    /// Array of email notifications
    pub notifications: Option<String>,
}

fn default_host() -> String {
    "127.0.0.1".into()
}
fn default_port() -> u16 {
    7230
}
fn default_site_id() -> u32 {
    1
}
fn default_backend() -> String {
    "memory".into()
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            default_site_id: default_site_id(),
            kdf: KdfParams::default(),
            storage: StorageConfig::default(),
            matching: MatchPolicy::default(),
            sites: Vec::new(),
            fixtures: FixtureConfig::default(),
            admin_token: None,
        }
    }
}

impl Config {
    /// Merge the TOML file (if present) with `CALLISTO_*` environment variables
    pub fn load(path: Option<&str>) -> anyhow::Result<Self> {
        let config: Config = Figment::new()
            .merge(Toml::file(path.unwrap_or(DEFAULT_CONFIG_FILE)))
            .merge(Env::prefixed("CALLISTO_").split("__"))
            .extract()?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults_without_file() {
        let config = Config::load(Some("does-not-exist.toml")).unwrap();
        assert_eq!(config.default_site_id, 1);
        assert_eq!(config.storage.backend, "memory");
        assert!(config.matching.immediate);
        assert_eq!(config.matching.threshold, 2);
        assert!(config.admin_token.is_none());
    }

    #[test]
    fn test_toml_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"
port = 9000
admin_token = "s3cret"

[storage]
backend = "sqlite"
sqlite_path = "callisto.db"

[matching]
immediate = false

[[sites]]
id = 1
coordinator_emails = ["titleix@example.edu"]
"#
        )
        .unwrap();

        let config = Config::load(file.path().to_str()).unwrap();
        assert_eq!(config.port, 9000);
        assert_eq!(config.admin_token.as_deref(), Some("s3cret"));
        assert_eq!(config.storage.sqlite_path.as_deref(), Some("callisto.db"));
        assert!(!config.matching.immediate);
        assert_eq!(config.matching.threshold, 2);
        assert_eq!(config.sites[0].coordinator_emails, vec!["titleix@example.edu"]);
    }
}
