//! The four dataset kinds a dashboard needs, with their provider chains.
//!
//! | request | providers, in order |
//! |---|---|
//! | time series | `{api}/{path}` → `{data_dir}/{path}` → empty series |
//! | annotations | `{api}/{path}` → `{data_dir}/{path}` → empty set |
//! | live metrics | `{api}{live_metrics_path}` → snapshot file → all-unknown payload |
//! | year image | `{api}/api/modis-image?...` → generated PNG placeholder |

use bytes::Bytes;
use chrono::{NaiveDate, Utc};
use tracing::{error, warn};

use terra_shared::annotation::{Annotation, parse_feature_collection};
use terra_shared::layers::ImageryLayer;
use terra_shared::metrics::NasaData;
use terra_shared::normalize::normalize_series;
use terra_shared::region::Region;
use terra_shared::series::TimeDataPoint;

use crate::config::ResolverConfig;
use crate::placeholder;
use crate::resolver::{DatasetRequest, Fetched, Provider, ProviderDeclined};

fn site_providers(config: &ResolverConfig, path: &str) -> Vec<Provider> {
    vec![
        Provider::remote(config.remote_url(path)),
        Provider::StaticAsset {
            root: config.data_dir.clone(),
            relative: path.to_string(),
        },
    ]
}

/// A region's chart series, normalized into canonical channels.
#[derive(Debug, Clone, PartialEq)]
pub struct TimeSeriesRequest {
    pub path: String,
}

impl TimeSeriesRequest {
    pub fn for_region(region: &Region) -> Self {
        Self {
            path: region.chart_data_path(),
        }
    }
}

impl DatasetRequest for TimeSeriesRequest {
    type Output = Vec<TimeDataPoint>;

    fn kind(&self) -> &'static str {
        "time_series"
    }

    fn providers(&self, config: &ResolverConfig) -> Vec<Provider> {
        site_providers(config, &self.path)
    }

    fn decode(&self, fetched: Fetched) -> Result<Self::Output, ProviderDeclined> {
        let raw: serde_json::Value = serde_json::from_slice(&fetched.bytes)
            .map_err(|e| ProviderDeclined::Parse(e.to_string()))?;
        normalize_series(&raw).map_err(|e| ProviderDeclined::Parse(e.to_string()))
    }

    fn synthesize(&self) -> Self::Output {
        Vec::new()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct AnnotationsRequest {
    pub path: String,
}

impl AnnotationsRequest {
    pub fn for_region(region: &Region) -> Self {
        Self {
            path: region.annotations_path(),
        }
    }
}

impl DatasetRequest for AnnotationsRequest {
    type Output = Vec<Annotation>;

    fn kind(&self) -> &'static str {
        "annotations"
    }

    fn providers(&self, config: &ResolverConfig) -> Vec<Provider> {
        site_providers(config, &self.path)
    }

    fn decode(&self, fetched: Fetched) -> Result<Self::Output, ProviderDeclined> {
        let parsed = parse_feature_collection(&fetched.bytes)
            .map_err(|e| ProviderDeclined::Parse(e.to_string()))?;
        for skipped in &parsed.skipped {
            warn!(
                path = %self.path,
                index = skipped.index,
                reason = %skipped.reason,
                "Skipping malformed annotation feature"
            );
        }
        Ok(parsed.annotations)
    }

    fn synthesize(&self) -> Self::Output {
        Vec::new()
    }
}

/// The `/api/nasa-data` payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct LiveMetricsRequest;

impl DatasetRequest for LiveMetricsRequest {
    type Output = NasaData;

    fn kind(&self) -> &'static str {
        "live_metrics"
    }

    fn providers(&self, config: &ResolverConfig) -> Vec<Provider> {
        vec![
            Provider::remote(config.remote_url(&config.live_metrics_path)),
            Provider::File {
                path: config.snapshot_path.clone(),
            },
        ]
    }

    fn decode(&self, fetched: Fetched) -> Result<Self::Output, ProviderDeclined> {
        NasaData::from_json_slice(&fetched.bytes, Utc::now())
            .map_err(|e| ProviderDeclined::Parse(e.to_string()))
    }

    fn synthesize(&self) -> Self::Output {
        NasaData::unknown(Utc::now())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ImageBytes {
    pub bytes: Bytes,
    pub content_type: String,
}

pub const PLACEHOLDER_CONTENT_TYPE: &str = "image/png";
const DEFAULT_IMAGE_CONTENT_TYPE: &str = "image/jpeg";

/// One MODIS frame. There is no static tier: a missing frame becomes a
/// generated placeholder.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct YearImageRequest {
    pub layer: ImageryLayer,
    pub date: NaiveDate,
}

impl YearImageRequest {
    pub fn path(&self) -> String {
        format!(
            "/api/modis-image?date={}&layer={}",
            self.date.format("%Y-%m-%d"),
            self.layer.as_str()
        )
    }
}

impl DatasetRequest for YearImageRequest {
    type Output = ImageBytes;

    fn kind(&self) -> &'static str {
        "year_image"
    }

    fn providers(&self, config: &ResolverConfig) -> Vec<Provider> {
        vec![Provider::remote(config.remote_url(&self.path()))]
    }

    fn decode(&self, fetched: Fetched) -> Result<Self::Output, ProviderDeclined> {
        let content_type = match fetched.content_type {
            Some(ct) if ct.trim().to_ascii_lowercase().starts_with("image/") => ct,
            Some(ct) => return Err(ProviderDeclined::UnsupportedContent(ct)),
            None => DEFAULT_IMAGE_CONTENT_TYPE.to_string(),
        };
        Ok(ImageBytes {
            bytes: fetched.bytes,
            content_type,
        })
    }

    /// Empty bytes if encoding fails; callers treat that as "no image".
    fn synthesize(&self) -> Self::Output {
        let bytes = placeholder::render_png(self.layer).unwrap_or_else(|e| {
            error!(layer = self.layer.as_str(), error = %e, "Failed to render placeholder image");
            Bytes::new()
        });
        ImageBytes {
            bytes,
            content_type: PLACEHOLDER_CONTENT_TYPE.to_string(),
        }
    }

    fn empty_is_failure(&self) -> bool {
        true
    }

    fn is_empty(&self, output: &Self::Output) -> bool {
        output.bytes.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use axum::Router;
    use axum::http::{StatusCode, header};
    use axum::routing::get;
    use chrono::NaiveDate;
    use tempfile::{TempDir, tempdir};
    use terra_shared::layers::ImageryLayer;
    use terra_shared::metrics::{MetricValue, RiskLevel};

    use super::{
        AnnotationsRequest, LiveMetricsRequest, PLACEHOLDER_CONTENT_TYPE, TimeSeriesRequest,
        YearImageRequest,
    };
    use crate::config::ResolverConfig;
    use crate::resolver::{DataResolver, ProviderDeclined, Tier};
    use crate::test_support::{dead_backend, spawn_backend, write};

    fn resolver(api_base_url: String, dir: &TempDir) -> DataResolver {
        DataResolver::new(ResolverConfig {
            api_base_url,
            data_dir: dir.path().to_path_buf(),
            snapshot_path: dir.path().join("snapshot.json"),
            request_timeout: Duration::from_secs(2),
            connect_timeout: Duration::from_secs(1),
            ..ResolverConfig::default()
        })
        .expect("build resolver")
    }

    #[tokio::test]
    async fn live_metrics_fall_back_to_static_snapshot() {
        let dir = tempdir().expect("create temp dir");
        write(
            &dir,
            "snapshot.json",
            r#"{"metrics": {"chlorophyll": {"current": 18.4, "status": "warning", "unit": "μg/L"}}}"#,
        );
        let backend = spawn_backend(Router::new().route(
            "/api/nasa-data",
            get(|| async { (StatusCode::INTERNAL_SERVER_ERROR, "boom") }),
        ))
        .await;

        let resolved = resolver(backend, &dir).resolve(&LiveMetricsRequest).await;

        assert_eq!(resolved.provenance, Tier::StaticFallback);
        assert_eq!(
            resolved.payload.metrics.chlorophyll.current,
            MetricValue::Number(18.4)
        );
        assert_eq!(resolved.declined.len(), 1);
        assert_eq!(resolved.declined[0].reason, ProviderDeclined::Status(500));
    }

    #[tokio::test]
    async fn live_metrics_synthesize_unknown_when_everything_declines() {
        let dir = tempdir().expect("create temp dir");
        write(&dir, "snapshot.json", "{ not json");

        let resolved = resolver(dead_backend().await, &dir)
            .resolve(&LiveMetricsRequest)
            .await;

        assert_eq!(resolved.provenance, Tier::Synthesized);
        assert_eq!(resolved.payload.assessment.risk_level, RiskLevel::Unknown);
        assert_eq!(
            resolved.payload.metrics.oxygen.current,
            MetricValue::not_available()
        );
        assert_eq!(resolved.declined.len(), 2);
        assert!(matches!(
            resolved.declined[1].reason,
            ProviderDeclined::Parse(_)
        ));
    }

    #[tokio::test]
    async fn live_metrics_prefer_backend() {
        let dir = tempdir().expect("create temp dir");
        let backend = spawn_backend(Router::new().route(
            "/api/nasa-data",
            get(|| async {
                axum::Json(serde_json::json!({
                    "metrics": {"temperature": {"current": 26.1, "status": "normal", "unit": "°C"}},
                    "assessment": {"riskLevel": "MODERATE"}
                }))
            }),
        ))
        .await;

        let resolved = resolver(backend, &dir).resolve(&LiveMetricsRequest).await;
        assert_eq!(resolved.provenance, Tier::Live);
        assert!(resolved.declined.is_empty());
        assert_eq!(resolved.payload.assessment.risk_level, RiskLevel::Moderate);
    }

    #[tokio::test]
    async fn slow_provider_is_declined_by_timeout() {
        let dir = tempdir().expect("create temp dir");
        write(&dir, "snapshot.json", r#"{"metrics": {}}"#);
        let backend = spawn_backend(Router::new().route(
            "/api/nasa-data",
            get(|| async {
                tokio::time::sleep(Duration::from_secs(5)).await;
                "late"
            }),
        ))
        .await;

        let mut config = resolver(backend, &dir).config().clone();
        config.request_timeout = Duration::from_millis(200);
        let resolved = DataResolver::new(config)
            .expect("build resolver")
            .resolve(&LiveMetricsRequest)
            .await;

        assert_eq!(resolved.provenance, Tier::StaticFallback);
        assert!(matches!(
            resolved.declined[0].reason,
            ProviderDeclined::Timeout(_)
        ));
    }

    #[tokio::test]
    async fn time_series_reads_static_mirror_and_keeps_empty_series() {
        let dir = tempdir().expect("create temp dir");
        write(
            &dir,
            "data/kisumu/trends.json",
            r#"[{"year": 2001, "ndvi": 0.35}, {"year": 2000, "ndvi": 0.40}]"#,
        );
        write(&dir, "data/empty/trends.json", "[]");
        let backend = dead_backend().await;
        let resolver = resolver(backend, &dir);

        let resolved = resolver
            .resolve(&TimeSeriesRequest {
                path: "/data/kisumu/trends.json".to_string(),
            })
            .await;
        assert_eq!(resolved.provenance, Tier::StaticFallback);
        let years: Vec<_> = resolved.payload.iter().map(|p| p.year).collect();
        assert_eq!(years, vec![2000, 2001]);
        assert_eq!(resolved.payload[0].channel("chlorophyll"), Some(12.0));

        let empty = resolver
            .resolve(&TimeSeriesRequest {
                path: "/data/empty/trends.json".to_string(),
            })
            .await;
        assert_eq!(empty.provenance, Tier::StaticFallback);
        assert!(empty.payload.is_empty());
    }

    #[tokio::test]
    async fn half_valid_series_is_not_mixed_with_other_tiers() {
        let dir = tempdir().expect("create temp dir");
        write(
            &dir,
            "data/x/trends.json",
            r#"[{"year": 2000, "ndvi": 0.4}, {"ndvi": 0.5}]"#,
        );
        let resolved = resolver(dead_backend().await, &dir)
            .resolve(&TimeSeriesRequest {
                path: "/data/x/trends.json".to_string(),
            })
            .await;

        assert_eq!(resolved.provenance, Tier::Synthesized);
        assert!(resolved.payload.is_empty());
    }

    #[tokio::test]
    async fn traversal_paths_are_declined() {
        let dir = tempdir().expect("create temp dir");
        let resolved = resolver(dead_backend().await, &dir)
            .resolve(&AnnotationsRequest {
                path: "/../secrets.geojson".to_string(),
            })
            .await;

        assert_eq!(resolved.provenance, Tier::Synthesized);
        assert!(matches!(
            resolved.declined[1].reason,
            ProviderDeclined::InvalidPath(_)
        ));
    }

    #[tokio::test]
    async fn annotations_skip_bad_features() {
        let dir = tempdir().expect("create temp dir");
        write(
            &dir,
            "data/kisumu/annotations.geojson",
            r#"{"type": "FeatureCollection", "features": [
                {"geometry": {"type": "Point", "coordinates": [34.7, -0.1]},
                 "properties": {"id": "a", "type": "event", "title": "A", "date": "2004"}},
                {"geometry": {"type": "Point"},
                 "properties": {"id": "b", "type": "event", "title": "B", "date": "2005"}}
            ]}"#,
        );
        let resolved = resolver(dead_backend().await, &dir)
            .resolve(&AnnotationsRequest {
                path: "/data/kisumu/annotations.geojson".to_string(),
            })
            .await;

        assert_eq!(resolved.provenance, Tier::StaticFallback);
        assert_eq!(resolved.payload.len(), 1);
        assert_eq!(resolved.payload[0].id, "a");
    }

    #[tokio::test]
    async fn year_image_passes_through_backend_jpeg() {
        let dir = tempdir().expect("create temp dir");
        let backend = spawn_backend(Router::new().route(
            "/api/modis-image",
            get(|| async { ([(header::CONTENT_TYPE, "image/jpeg")], vec![0xFF, 0xD8, 0xFF]) }),
        ))
        .await;

        let request = YearImageRequest {
            layer: ImageryLayer::Chlorophyll,
            date: NaiveDate::from_ymd_opt(2010, 5, 1).expect("valid date"),
        };
        let resolved = resolver(backend, &dir).resolve(&request).await;

        assert_eq!(resolved.provenance, Tier::Live);
        assert_eq!(resolved.payload.content_type, "image/jpeg");
        assert_eq!(&resolved.payload.bytes[..], &[0xFF, 0xD8, 0xFF]);
    }

    #[tokio::test]
    async fn year_image_rejects_empty_and_non_image_bodies() {
        let dir = tempdir().expect("create temp dir");
        let empty_backend = spawn_backend(Router::new().route(
            "/api/modis-image",
            get(|| async { ([(header::CONTENT_TYPE, "image/jpeg")], Vec::<u8>::new()) }),
        ))
        .await;
        let html_backend = spawn_backend(Router::new().route(
            "/api/modis-image",
            get(|| async { axum::response::Html("<p>not an image</p>") }),
        ))
        .await;

        let request = YearImageRequest {
            layer: ImageryLayer::Temperature,
            date: NaiveDate::from_ymd_opt(2012, 5, 1).expect("valid date"),
        };

        let empty = resolver(empty_backend, &dir).resolve(&request).await;
        assert_eq!(empty.provenance, Tier::Synthesized);
        assert_eq!(empty.declined[0].reason, ProviderDeclined::Empty);
        assert_eq!(empty.payload.content_type, PLACEHOLDER_CONTENT_TYPE);
        assert!(!empty.payload.bytes.is_empty());

        let html = resolver(html_backend, &dir).resolve(&request).await;
        assert_eq!(html.provenance, Tier::Synthesized);
        assert!(matches!(
            html.declined[0].reason,
            ProviderDeclined::UnsupportedContent(_)
        ));
    }
}
