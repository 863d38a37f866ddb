use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use crate::region::TimeRange;

pub const NDVI: &str = "ndvi";
pub const LST: &str = "lst";
pub const CHLOROPHYLL: &str = "chlorophyll";
pub const TEMPERATURE: &str = "temperature";
pub const OXYGEN: &str = "oxygen";

/// One observation in a region's time series.
///
/// Channels are open-ended: any named numeric measurement flattens into the
/// point's JSON object next to `date`/`year`/`month`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimeDataPoint {
    pub date: String,
    pub year: i32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub month: Option<u32>,
    #[serde(flatten)]
    pub channels: BTreeMap<String, f64>,
}

impl TimeDataPoint {
    pub fn new(year: i32) -> Self {
        Self {
            date: year.to_string(),
            year,
            month: None,
            channels: BTreeMap::new(),
        }
    }

    pub fn with_month(mut self, month: u32) -> Self {
        self.month = Some(month);
        self.date = format!("{}-{month:02}", self.year);
        self
    }

    pub fn with_channel(mut self, name: &str, value: f64) -> Self {
        self.channels.insert(name.to_string(), value);
        self
    }

    pub fn channel(&self, name: &str) -> Option<f64> {
        self.channels.get(name).copied()
    }
}

/// Union of channel names across the series, sorted.
pub fn channel_names(series: &[TimeDataPoint]) -> BTreeSet<String> {
    series
        .iter()
        .flat_map(|point| point.channels.keys().cloned())
        .collect()
}

pub fn is_chronological(series: &[TimeDataPoint]) -> bool {
    series.windows(2).all(|pair| pair[0].year <= pair[1].year)
}

/// Keeps points whose year falls inside `range`; returns the dropped points.
pub fn retain_in_range(series: &mut Vec<TimeDataPoint>, range: TimeRange) -> Vec<TimeDataPoint> {
    let (kept, dropped): (Vec<_>, Vec<_>) = std::mem::take(series)
        .into_iter()
        .partition(|point| range.contains(point.year));
    *series = kept;
    dropped
}
