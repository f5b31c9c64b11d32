//! Pipeline configuration
//!
//! Defaults cover a standard portal deployment; a YAML file and `PORTAL_*`
//! environment variables layer on top. Every section falls back field by
//! field, so a config file only needs the values it changes.

use portal_charts_data::{Endpoint, DEFAULT_CACHE_TTL, DEFAULT_REQUEST_TIMEOUT};
use portal_charts_shared::SeriesKey;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PortalConfig {
    pub sources: SourcesConfig,
    pub cache: CacheConfig,
    pub stores: StoresConfig,
    pub render: RenderConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SourcesConfig {
    pub request_timeout_secs: u64,
    pub empresas: Vec<Endpoint>,
    pub usuarios: Vec<Endpoint>,
    pub eventos: Vec<Endpoint>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    pub ttl_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StoresConfig {
    pub primary_path: PathBuf,
    pub secondary_path: PathBuf,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderConfig {
    pub poll_interval_ms: u64,
    pub poll_attempts: u32,
}

/// The candidate chain every deployment starts from: the two historical
/// endpoints first, the aggregate dashboard endpoint as the last resort.
fn default_endpoints() -> Vec<Endpoint> {
    vec![
        Endpoint::historico("http://intranet.local/stats/historico.php"),
        Endpoint::historico("http://intranet.local/api/stats.php"),
        Endpoint::general("http://intranet.local/admin/ajax/dashboard.php"),
    ]
}

impl Default for SourcesConfig {
    fn default() -> Self {
        Self {
            request_timeout_secs: DEFAULT_REQUEST_TIMEOUT.as_secs(),
            empresas: default_endpoints(),
            usuarios: default_endpoints(),
            eventos: default_endpoints(),
        }
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            ttl_secs: DEFAULT_CACHE_TTL.as_secs(),
        }
    }
}

impl Default for StoresConfig {
    fn default() -> Self {
        Self {
            primary_path: PathBuf::from("state/chart_configs.json"),
            secondary_path: PathBuf::from("state/chart_configs_backup.json"),
        }
    }
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: 100,
            poll_attempts: 50,
        }
    }
}

impl RenderConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
}

impl SourcesConfig {
    pub fn endpoints_for(&self, key: SeriesKey) -> &[Endpoint] {
        match key {
            SeriesKey::Empresas => &self.empresas,
            SeriesKey::Usuarios => &self.usuarios,
            SeriesKey::Eventos => &self.eventos,
        }
    }
}

impl PortalConfig {
    pub fn from_file(path: &str) -> Result<Self, config::ConfigError> {
        let settings = config::Config::builder()
            .add_source(config::File::with_name(path))
            .add_source(config::Environment::with_prefix("PORTAL"))
            .build()?;

        settings.try_deserialize()
    }

    pub fn from_env() -> Result<Self, config::ConfigError> {
        // Pick up the conventional config file when it is present
        let default_config_path = "portal-charts.yaml";
        let settings = if std::path::Path::new(default_config_path).exists() {
            config::Config::builder()
                .add_source(config::File::with_name(default_config_path))
                .add_source(config::Environment::with_prefix("PORTAL"))
                .build()?
        } else {
            config::Config::builder()
                .add_source(config::Config::try_from(&PortalConfig::default())?)
                .add_source(config::Environment::with_prefix("PORTAL"))
                .build()?
        };

        settings.try_deserialize()
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.sources.request_timeout_secs)
    }

    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache.ttl_secs)
    }
}
