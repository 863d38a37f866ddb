use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;

use crate::normalize::{SeriesError, normalize_series};
use crate::series::TimeDataPoint;

pub const NOT_AVAILABLE: &str = "N/A";
pub const NO_DATA_TREND: &str = "NO DATA";
pub const DATA_NOT_AVAILABLE: &str = "Data not available";
pub const DEFAULT_DATA_SOURCE: &str = "NASA Terra Satellite Mission";
pub const DEFAULT_AFFECTED_POPULATION: &str = "30+ million people";

/// A metric's current value: a number, or a text sentinel such as `"N/A"`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MetricValue {
    Number(f64),
    Text(String),
}

impl MetricValue {
    pub fn not_available() -> Self {
        Self::Text(NOT_AVAILABLE.to_string())
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Number(n) => Some(*n),
            Self::Text(_) => None,
        }
    }
}

impl Default for MetricValue {
    fn default() -> Self {
        Self::not_available()
    }
}

/// Status label attached to a metric. Labels outside the known set are kept
/// verbatim so upstream data is re-served unchanged.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum MetricStatus {
    Normal,
    Warning,
    Critical,
    #[default]
    Unknown,
    Other(String),
}

impl MetricStatus {
    pub fn as_str(&self) -> &str {
        match self {
            Self::Normal => "normal",
            Self::Warning => "warning",
            Self::Critical => "critical",
            Self::Unknown => "unknown",
            Self::Other(label) => label,
        }
    }

    pub fn parse(raw: &str) -> Self {
        let trimmed = raw.trim();
        match trimmed.to_ascii_lowercase().as_str() {
            "normal" => Self::Normal,
            "warning" => Self::Warning,
            "critical" => Self::Critical,
            "unknown" | "" => Self::Unknown,
            _ => Self::Other(trimmed.to_string()),
        }
    }
}

impl Serialize for MetricStatus {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for MetricStatus {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = Option::<String>::deserialize(deserializer)?;
        Ok(raw.as_deref().map(Self::parse).unwrap_or_default())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RiskLevel {
    Low,
    Moderate,
    High,
    Critical,
    #[default]
    Unknown,
}

impl RiskLevel {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Low => "LOW",
            Self::Moderate => "MODERATE",
            Self::High => "HIGH",
            Self::Critical => "CRITICAL",
            Self::Unknown => "UNKNOWN",
        }
    }

    pub fn parse(raw: &str) -> Self {
        match raw.trim().to_ascii_uppercase().as_str() {
            "LOW" => Self::Low,
            "MODERATE" | "MEDIUM" => Self::Moderate,
            "HIGH" => Self::High,
            "CRITICAL" => Self::Critical,
            _ => Self::Unknown,
        }
    }
}

impl Serialize for RiskLevel {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for RiskLevel {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = Option::<String>::deserialize(deserializer)?;
        Ok(raw.as_deref().map(Self::parse).unwrap_or_default())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricReading {
    #[serde(default)]
    pub current: MetricValue,
    #[serde(default = "not_available_text")]
    pub trend: String,
    #[serde(default)]
    pub status: MetricStatus,
    #[serde(default)]
    pub unit: String,
}

impl MetricReading {
    pub fn unknown(unit: &str) -> Self {
        Self {
            current: MetricValue::not_available(),
            trend: NOT_AVAILABLE.to_string(),
            status: MetricStatus::Unknown,
            unit: unit.to_string(),
        }
    }
}

fn not_available_text() -> String {
    NOT_AVAILABLE.to_string()
}

fn unknown_chlorophyll() -> MetricReading {
    MetricReading::unknown("μg/L")
}

fn unknown_temperature() -> MetricReading {
    MetricReading::unknown("°C")
}

fn unknown_oxygen() -> MetricReading {
    MetricReading::unknown("mg/L")
}

fn unknown_algal_bloom() -> MetricReading {
    MetricReading::unknown("km²")
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NasaMetrics {
    #[serde(default = "unknown_chlorophyll")]
    pub chlorophyll: MetricReading,
    #[serde(default = "unknown_temperature")]
    pub temperature: MetricReading,
    #[serde(default = "unknown_oxygen")]
    pub oxygen: MetricReading,
    #[serde(default = "unknown_algal_bloom")]
    pub algal_bloom: MetricReading,
}

impl NasaMetrics {
    pub fn unknown() -> Self {
        Self {
            chlorophyll: unknown_chlorophyll(),
            temperature: unknown_temperature(),
            oxygen: unknown_oxygen(),
            algal_bloom: unknown_algal_bloom(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Assessment {
    #[serde(default)]
    pub risk_level: RiskLevel,
    #[serde(default = "no_data_trend")]
    pub trend: String,
    #[serde(default = "default_affected_population")]
    pub affected_population: String,
}

impl Default for Assessment {
    fn default() -> Self {
        Self {
            risk_level: RiskLevel::Unknown,
            trend: no_data_trend(),
            affected_population: default_affected_population(),
        }
    }
}

fn no_data_trend() -> String {
    NO_DATA_TREND.to_string()
}

fn default_affected_population() -> String {
    DEFAULT_AFFECTED_POPULATION.to_string()
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImpactSummary {
    #[serde(default = "data_not_available")]
    pub economic: Vec<String>,
    #[serde(default = "data_not_available")]
    pub human: Vec<String>,
    #[serde(default = "data_not_available")]
    pub environmental: Vec<String>,
}

impl Default for ImpactSummary {
    fn default() -> Self {
        Self {
            economic: data_not_available(),
            human: data_not_available(),
            environmental: data_not_available(),
        }
    }
}

fn data_not_available() -> Vec<String> {
    vec![DATA_NOT_AVAILABLE.to_string()]
}

fn default_data_source() -> String {
    DEFAULT_DATA_SOURCE.to_string()
}

/// Canonical live-metrics payload served by `/api/nasa-data`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NasaData {
    pub metrics: NasaMetrics,
    pub time_series: Vec<TimeDataPoint>,
    pub assessment: Assessment,
    pub impact: ImpactSummary,
    pub last_update: String,
    pub data_source: String,
}

/// Wire shape before the time series goes through normalization.
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawNasaData {
    metrics: NasaMetrics,
    #[serde(default)]
    time_series: Option<Value>,
    #[serde(default)]
    assessment: Assessment,
    #[serde(default)]
    impact: ImpactSummary,
    #[serde(default)]
    last_update: Option<String>,
    #[serde(default = "default_data_source")]
    data_source: String,
}

#[derive(Debug, thiserror::Error)]
pub enum MetricsError {
    #[error("invalid metrics payload: {0}")]
    Json(#[from] serde_json::Error),
    #[error("invalid metrics time series: {0}")]
    Series(#[from] SeriesError),
}

impl NasaData {
    /// Decode a provider payload. `metrics` is required; everything else
    /// falls back to its unknown form. `now` stamps payloads without a
    /// `lastUpdate`.
    pub fn from_json_slice(bytes: &[u8], now: DateTime<Utc>) -> Result<Self, MetricsError> {
        let raw: RawNasaData = serde_json::from_slice(bytes)?;
        let time_series = match raw.time_series {
            None | Some(Value::Null) => Vec::new(),
            Some(value) => normalize_series(&value)?,
        };

        Ok(Self {
            metrics: raw.metrics,
            time_series,
            assessment: raw.assessment,
            impact: raw.impact,
            last_update: raw
                .last_update
                .unwrap_or_else(|| now.to_rfc3339_opts(SecondsFormat::Millis, true)),
            data_source: raw.data_source,
        })
    }

    /// The synthesized tier: every number `"N/A"`, risk `UNKNOWN`.
    pub fn unknown(now: DateTime<Utc>) -> Self {
        Self {
            metrics: NasaMetrics::unknown(),
            time_series: Vec::new(),
            assessment: Assessment::default(),
            impact: ImpactSummary::default(),
            last_update: now.to_rfc3339_opts(SecondsFormat::Millis, true),
            data_source: default_data_source(),
        }
    }
}
