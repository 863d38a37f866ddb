use std::path::PathBuf;
use std::time::Duration;

pub const BASE_INTERVAL_MS: u64 = 1000;
pub const MIN_SPEED: f64 = 0.5;
pub const MAX_SPEED: f64 = 3.0;
pub const DEFAULT_SPEED: f64 = 1.0;

pub const DEFAULT_API_BASE_URL: &str = "http://localhost:3000";
pub const DEFAULT_DATA_DIR: &str = "public";
pub const DEFAULT_SNAPSHOT_PATH: &str = "nasa-test/output/visualization_data.json";
pub const DEFAULT_LIVE_METRICS_PATH: &str = "/api/nasa-data";
pub const DEFAULT_PROVIDER_TIMEOUT_SECS: u64 = 10;
pub const DEFAULT_PROVIDER_CONNECT_TIMEOUT_SECS: u64 = 3;

pub const USER_AGENT: &str = concat!("terra-dashboard/", env!("CARGO_PKG_VERSION"));

/// Timer parameters for a dashboard's playback controller.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PlaybackSettings {
    pub base_interval: Duration,
    pub min_speed: f64,
    pub max_speed: f64,
    pub initial_speed: f64,
}

impl Default for PlaybackSettings {
    fn default() -> Self {
        Self {
            base_interval: Duration::from_millis(BASE_INTERVAL_MS),
            min_speed: MIN_SPEED,
            max_speed: MAX_SPEED,
            initial_speed: DEFAULT_SPEED,
        }
    }
}

impl PlaybackSettings {
    pub fn from_env() -> Self {
        let defaults = Self::default();
        let base_interval = env_positive::<u64>("PLAYBACK_BASE_INTERVAL_MS")
            .map(Duration::from_millis)
            .unwrap_or(defaults.base_interval);
        let min_speed = env_positive::<f64>("PLAYBACK_MIN_SPEED").unwrap_or(defaults.min_speed);
        let max_speed = env_positive::<f64>("PLAYBACK_MAX_SPEED")
            .filter(|max| *max >= min_speed)
            .unwrap_or(defaults.max_speed.max(min_speed));

        Self {
            base_interval,
            min_speed,
            max_speed,
            initial_speed: defaults.initial_speed.clamp(min_speed, max_speed),
        }
    }
}

/// Where each tier of the data resolver looks.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolverConfig {
    /// Base URL of the live API, without a trailing slash.
    pub api_base_url: String,
    /// Path of the live metrics endpoint under `api_base_url`.
    pub live_metrics_path: String,
    /// Root of the static files mirrored from the web bundle.
    pub data_dir: PathBuf,
    pub snapshot_path: PathBuf,
    pub request_timeout: Duration,
    pub connect_timeout: Duration,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            api_base_url: DEFAULT_API_BASE_URL.to_string(),
            live_metrics_path: DEFAULT_LIVE_METRICS_PATH.to_string(),
            data_dir: PathBuf::from(DEFAULT_DATA_DIR),
            snapshot_path: PathBuf::from(DEFAULT_SNAPSHOT_PATH),
            request_timeout: Duration::from_secs(DEFAULT_PROVIDER_TIMEOUT_SECS),
            connect_timeout: Duration::from_secs(DEFAULT_PROVIDER_CONNECT_TIMEOUT_SECS),
        }
    }
}

impl ResolverConfig {
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            api_base_url: env_non_empty("TERRA_API_BASE_URL")
                .map(|url| url.trim_end_matches('/').to_string())
                .unwrap_or(defaults.api_base_url),
            live_metrics_path: defaults.live_metrics_path,
            data_dir: env_non_empty("TERRA_DATA_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.data_dir),
            snapshot_path: env_non_empty("TERRA_SNAPSHOT_PATH")
                .map(PathBuf::from)
                .unwrap_or(defaults.snapshot_path),
            request_timeout: env_positive::<u64>("PROVIDER_TIMEOUT_SECS")
                .map(Duration::from_secs)
                .unwrap_or(defaults.request_timeout),
            connect_timeout: env_positive::<u64>("PROVIDER_CONNECT_TIMEOUT_SECS")
                .map(Duration::from_secs)
                .unwrap_or(defaults.connect_timeout),
        }
    }

    pub fn remote_url(&self, path: &str) -> String {
        if path.starts_with('/') {
            format!("{}{path}", self.api_base_url)
        } else {
            format!("{}/{path}", self.api_base_url)
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
