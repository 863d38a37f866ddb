use std::collections::HashSet;
use std::ops::RangeInclusive;

use serde::{Deserialize, Deserializer, Serialize};

/// Inclusive span of observation years for a region.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeRange {
    #[serde(deserialize_with = "deserialize_year")]
    pub start: i32,
    #[serde(deserialize_with = "deserialize_year")]
    pub end: i32,
}

impl TimeRange {
    /// Builds a range from two bounds, ordering them if they arrive inverted.
    pub const fn new(a: i32, b: i32) -> Self {
        if a <= b {
            Self { start: a, end: b }
        } else {
            Self { start: b, end: a }
        }
    }

    /// Nearest year inside the range.
    pub const fn clamp(&self, year: i32) -> i32 {
        if year < self.start {
            self.start
        } else if year > self.end {
            self.end
        } else {
            year
        }
    }

    pub const fn contains(&self, year: i32) -> bool {
        year >= self.start && year <= self.end
    }

    /// Number of year steps between the bounds (0 for a single-year range),
    /// saturating at `i32::MAX`.
    pub const fn span(&self) -> i32 {
        self.end.saturating_sub(self.start)
    }

    pub const fn is_single_year(&self) -> bool {
        self.start == self.end
    }

    pub fn years(&self) -> RangeInclusive<i32> {
        self.start..=self.end
    }

    /// Slider fill for `year`, 0..=100.
    pub fn progress_percent(&self, year: i32) -> f64 {
        let span = i64::from(self.end) - i64::from(self.start);
        if span <= 0 {
            return 0.0;
        }
        let offset = i64::from(self.clamp(year)) - i64::from(self.start);
        offset as f64 / span as f64 * 100.0
    }
}

/// Region config stores years either as numbers or as numeric strings (`"2000"`).
fn deserialize_year<'de, D>(deserializer: D) -> Result<i32, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum YearRepr {
        Number(i64),
        Text(String),
    }

    match YearRepr::deserialize(deserializer)? {
        YearRepr::Number(n) => i32::try_from(n).map_err(serde::de::Error::custom),
        YearRepr::Text(raw) => raw
            .trim()
            .parse::<i32>()
            .map_err(|e| serde::de::Error::custom(format!("invalid year `{raw}`: {e}"))),
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Story {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub impacts: Vec<String>,
}

/// Relative paths of the per-region static datasets.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegionDatasets {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub chart_data: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub annotations: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Region {
    pub slug: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    /// `[lon, lat]`
    pub center: [f64; 2],
    /// `[west, south, east, north]`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bounding_box: Option<[f64; 4]>,
    pub zoom: f64,
    #[serde(default)]
    pub instruments: Vec<String>,
    pub time_range: TimeRange,
    #[serde(default)]
    pub story: Story,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub chart_data: Option<String>,
    #[serde(default)]
    pub datasets: RegionDatasets,
}

impl Region {
    pub fn chart_data_path(&self) -> String {
        self.chart_data
            .clone()
            .or_else(|| self.datasets.chart_data.clone())
            .unwrap_or_else(|| format!("/data/{}/trends.json", self.slug))
    }

    pub fn annotations_path(&self) -> String {
        self.datasets
            .annotations
            .clone()
            .unwrap_or_else(|| format!("/data/{}/annotations.geojson", self.slug))
    }
}

#[derive(Debug, thiserror::Error)]
pub enum RegionError {
    #[error("invalid region catalogue: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("region `{slug}` has an inverted time range ({start} > {end})")]
    InvertedTimeRange { slug: String, start: i32, end: i32 },
    #[error("duplicate region slug `{0}`")]
    DuplicateSlug(String),
}

/// Parse the static region catalogue (a JSON array of regions).
pub fn parse_regions(json: &str) -> Result<Vec<Region>, RegionError> {
    let regions: Vec<Region> = serde_json::from_str(json)?;

    let mut seen = HashSet::new();
    for region in &regions {
        if region.time_range.start > region.time_range.end {
            return Err(RegionError::InvertedTimeRange {
                slug: region.slug.clone(),
                start: region.time_range.start,
                end: region.time_range.end,
            });
        }
        if !seen.insert(region.slug.as_str()) {
            return Err(RegionError::DuplicateSlug(region.slug.clone()));
        }
    }

    Ok(regions)
}

pub fn find_region<'a>(regions: &'a [Region], slug: &str) -> Option<&'a Region> {
    regions.iter().find(|region| region.slug == slug)
}
