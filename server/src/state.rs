use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use bytes::Bytes;
use terra_client::{DataResolver, Tier};
use terra_shared::Region;
use tracing::warn;

use crate::config::ServerConfig;

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<ServerConfig>,
    pub resolver: Arc<DataResolver>,
    pub regions: Arc<Vec<Region>>,
    /// The catalogue serialized once at startup.
    pub regions_json: Arc<Bytes>,
    pub observability: Arc<ObservabilityCounters>,
}

#[derive(Debug, Default)]
pub struct ObservabilityCounters {
    nasa_data_requests_total: AtomicU64,
    nasa_data_live_total: AtomicU64,
    nasa_data_static_total: AtomicU64,
    nasa_data_synthesized_total: AtomicU64,
    modis_image_requests_total: AtomicU64,
    modis_image_placeholders_total: AtomicU64,
    invalid_requests_total: AtomicU64,
    not_modified_total: AtomicU64,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct ObservabilitySnapshot {
    pub nasa_data_requests_total: u64,
    pub nasa_data_live_total: u64,
    pub nasa_data_static_total: u64,
    pub nasa_data_synthesized_total: u64,
    pub modis_image_requests_total: u64,
    pub modis_image_placeholders_total: u64,
    pub invalid_requests_total: u64,
    pub not_modified_total: u64,
}

impl ObservabilityCounters {
    pub fn snapshot(&self) -> ObservabilitySnapshot {
        ObservabilitySnapshot {
            nasa_data_requests_total: self.nasa_data_requests_total.load(Ordering::Relaxed),
            nasa_data_live_total: self.nasa_data_live_total.load(Ordering::Relaxed),
            nasa_data_static_total: self.nasa_data_static_total.load(Ordering::Relaxed),
            nasa_data_synthesized_total: self.nasa_data_synthesized_total.load(Ordering::Relaxed),
            modis_image_requests_total: self.modis_image_requests_total.load(Ordering::Relaxed),
            modis_image_placeholders_total: self
                .modis_image_placeholders_total
                .load(Ordering::Relaxed),
            invalid_requests_total: self.invalid_requests_total.load(Ordering::Relaxed),
            not_modified_total: self.not_modified_total.load(Ordering::Relaxed),
        }
    }

    pub fn record_nasa_data_request(&self, tier: Tier) {
        self.nasa_data_requests_total
            .fetch_add(1, Ordering::Relaxed);
        let by_tier = match tier {
            Tier::Live => &self.nasa_data_live_total,
            Tier::StaticFallback => &self.nasa_data_static_total,
            Tier::Synthesized => &self.nasa_data_synthesized_total,
        };
        by_tier.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_modis_image_request(&self, tier: Tier) {
        self.modis_image_requests_total
            .fetch_add(1, Ordering::Relaxed);
        if tier == Tier::Synthesized {
            self.modis_image_placeholders_total
                .fetch_add(1, Ordering::Relaxed);
        }
    }

    pub fn record_invalid_request(&self) {
        self.invalid_requests_total.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_not_modified(&self) {
        self.not_modified_total.fetch_add(1, Ordering::Relaxed);
    }
}

impl AppState {
    pub fn new(config: ServerConfig, regions: Vec<Region>) -> Result<Self, reqwest::Error> {
        let resolver = DataResolver::new(config.resolver_config())?;
        let regions_json = serde_json::to_vec(&regions)
            .map(Bytes::from)
            .unwrap_or_else(|e| {
                warn!(error = %e, "failed to serialize region catalogue, serving an empty list");
                Bytes::from_static(b"[]")
            });

        Ok(Self {
            config: Arc::new(config),
            resolver: Arc::new(resolver),
            regions: Arc::new(regions),
            regions_json: Arc::new(regions_json),
            observability: Arc::new(ObservabilityCounters::default()),
        })
    }
}
