use std::path::PathBuf;
use std::time::Duration;

use terra_client::config::{DEFAULT_DATA_DIR, DEFAULT_SNAPSHOT_PATH, ResolverConfig};

pub const SERVER_PORT: u16 = 3000;
pub const DEFAULT_BACKEND_URL: &str = "http://localhost:3001";
pub const DEFAULT_REGIONS_PATH: &str = "config/regions.json";
/// Where the backend publishes the live metrics payload.
pub const BACKEND_METRICS_PATH: &str = "/api/terra-data";
pub const DEFAULT_UPSTREAM_HTTP_TIMEOUT_SECS: u64 = 10;
pub const DEFAULT_UPSTREAM_CONNECT_TIMEOUT_SECS: u64 = 3;

pub const METRICS_CACHE_CONTROL: &str = "public, max-age=300";
pub const LIVE_IMAGE_CACHE_CONTROL: &str = "public, max-age=86400";
pub const PLACEHOLDER_IMAGE_CACHE_CONTROL: &str = "public, max-age=3600";
pub const REGIONS_CACHE_CONTROL: &str = "public, max-age=300";

#[derive(Debug, Clone, PartialEq)]
pub struct ServerConfig {
    pub port: u16,
    pub backend_url: String,
    pub data_dir: PathBuf,
    pub snapshot_path: PathBuf,
    pub regions_path: PathBuf,
    pub upstream_timeout: Duration,
    pub upstream_connect_timeout: Duration,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: SERVER_PORT,
            backend_url: DEFAULT_BACKEND_URL.to_string(),
            data_dir: PathBuf::from(DEFAULT_DATA_DIR),
            snapshot_path: PathBuf::from(DEFAULT_SNAPSHOT_PATH),
            regions_path: PathBuf::from(DEFAULT_REGIONS_PATH),
            upstream_timeout: Duration::from_secs(DEFAULT_UPSTREAM_HTTP_TIMEOUT_SECS),
            upstream_connect_timeout: Duration::from_secs(DEFAULT_UPSTREAM_CONNECT_TIMEOUT_SECS),
        }
    }
}

impl ServerConfig {
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            port: env_positive::<u16>("SERVER_PORT").unwrap_or(defaults.port),
            backend_url: env_non_empty("BACKEND_URL")
                .map(|url| url.trim_end_matches('/').to_string())
                .unwrap_or(defaults.backend_url),
            data_dir: env_non_empty("TERRA_DATA_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.data_dir),
            snapshot_path: env_non_empty("TERRA_SNAPSHOT_PATH")
                .map(PathBuf::from)
                .unwrap_or(defaults.snapshot_path),
            regions_path: env_non_empty("TERRA_REGIONS_PATH")
                .map(PathBuf::from)
                .unwrap_or(defaults.regions_path),
            upstream_timeout: env_positive::<u64>("UPSTREAM_HTTP_TIMEOUT_SECS")
                .map(Duration::from_secs)
                .unwrap_or(defaults.upstream_timeout),
            upstream_connect_timeout: env_positive::<u64>("UPSTREAM_CONNECT_TIMEOUT_SECS")
                .map(Duration::from_secs)
                .unwrap_or(defaults.upstream_connect_timeout),
        }
    }

    /// The server resolves against the backend, not against itself.
    pub fn resolver_config(&self) -> ResolverConfig {
        ResolverConfig {
            api_base_url: self.backend_url.clone(),
            live_metrics_path: BACKEND_METRICS_PATH.to_string(),
            data_dir: self.data_dir.clone(),
            snapshot_path: self.snapshot_path.clone(),
            request_timeout: self.upstream_timeout,
            connect_timeout: self.upstream_connect_timeout,
        }
    }
}

fn env_non_empty(key: &str) -> Option<String> {
    std::env::var(key)
        .ok()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

fn env_positive<T>(key: &str) -> Option<T>
where
    T: std::str::FromStr + PartialOrd + Default,
{
    std::env::var(key)
        .ok()
        .and_then(|value| value.trim().parse::<T>().ok())
        .filter(|value| *value > T::default())
}
