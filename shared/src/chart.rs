use std::collections::BTreeMap;
use std::fmt;

use serde::{Serialize, Serializer};

use crate::metrics::NOT_AVAILABLE;
use crate::series::{TimeDataPoint, channel_names};

/// Mean of a channel over the matched points, or `"N/A"` when nothing matched.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ChannelSummary {
    Mean(f64),
    NotAvailable,
}

impl ChannelSummary {
    pub fn value(self) -> Option<f64> {
        match self {
            Self::Mean(v) => Some(v),
            Self::NotAvailable => None,
        }
    }
}

impl Serialize for ChannelSummary {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::Mean(v) => serializer.serialize_f64(*v),
            Self::NotAvailable => serializer.serialize_str(NOT_AVAILABLE),
        }
    }
}

impl fmt::Display for ChannelSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Mean(v) => write!(f, "{v:.2}"),
            Self::NotAvailable => f.write_str(NOT_AVAILABLE),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Correlation {
    pub year: i32,
    pub matches: Vec<TimeDataPoint>,
    pub summary: BTreeMap<String, ChannelSummary>,
}

/// Points recorded in `year` plus a per-channel mean over them.
///
/// The summary lists every channel seen anywhere in `series`, so the panel
/// keeps a stable set of rows as the year moves.
pub fn correlate(series: &[TimeDataPoint], year: i32) -> Correlation {
    let matches: Vec<TimeDataPoint> = series
        .iter()
        .filter(|point| point.year == year)
        .cloned()
        .collect();

    let summary = channel_names(series)
        .into_iter()
        .map(|channel| {
            let (sum, count) = matches
                .iter()
                .filter_map(|point| point.channel(&channel))
                .fold((0.0, 0usize), |(sum, count), v| (sum + v, count + 1));
            let value = if count == 0 {
                ChannelSummary::NotAvailable
            } else {
                ChannelSummary::Mean(sum / count as f64)
            };
            (channel, value)
        })
        .collect();

    Correlation {
        year,
        matches,
        summary,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Trend {
    Increasing,
    Decreasing,
    Steady,
    NoData,
}

impl Trend {
    pub const fn label(self) -> &'static str {
        match self {
            Self::Increasing => "increasing",
            Self::Decreasing => "decreasing",
            Self::Steady => "steady",
            Self::NoData => "No trend data",
        }
    }
}

/// Endpoint comparison of `channel` between the first and last points.
pub fn trend(series: &[TimeDataPoint], channel: &str) -> Trend {
    let [first, .., last] = series else {
        return Trend::NoData;
    };
    let (Some(first), Some(last)) = (first.channel(channel), last.channel(channel)) else {
        return Trend::NoData;
    };

    if last > first {
        Trend::Increasing
    } else if last < first {
        Trend::Decreasing
    } else {
        Trend::Steady
    }
}

pub fn trends(series: &[TimeDataPoint]) -> BTreeMap<String, Trend> {
    channel_names(series)
        .into_iter()
        .map(|channel| {
            let direction = trend(series, &channel);
            (channel, direction)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::{ChannelSummary, Trend, correlate, trend, trends};
    use crate::series::{LST, NDVI, TimeDataPoint};

    fn assert_close(actual: f64, expected: f64) {
        let diff = (actual - expected).abs();
        assert!(
            diff < 1e-9,
            "expected {expected}, got {actual} (diff: {diff})"
        );
    }

    fn two_year_series() -> Vec<TimeDataPoint> {
        vec![
            TimeDataPoint::new(2000)
                .with_channel(NDVI, 0.40)
                .with_channel(LST, 295.0),
            TimeDataPoint::new(2001)
                .with_channel(NDVI, 0.35)
                .with_channel(LST, 296.2),
        ]
    }

    #[test]
    fn correlates_single_year_and_reports_endpoint_trends() {
        let series = two_year_series();
        let correlation = correlate(&series, 2000);

        assert_eq!(correlation.matches.len(), 1);
        assert_eq!(correlation.summary[NDVI], ChannelSummary::Mean(0.40));
        assert_eq!(trend(&series, NDVI), Trend::Decreasing);
        assert_eq!(trend(&series, LST), Trend::Increasing);
    }

    #[test]
    fn empty_matches_summarise_as_not_available() {
        let series = two_year_series();
        let correlation = correlate(&series, 2015);

        assert!(correlation.matches.is_empty());
        assert_eq!(correlation.summary.len(), 2);
        assert!(
            correlation
                .summary
                .values()
                .all(|s| *s == ChannelSummary::NotAvailable)
        );

        let encoded = serde_json::to_value(&correlation.summary).expect("encode");
        assert_eq!(encoded["ndvi"], "N/A");
        assert_eq!(encoded["lst"], "N/A");
    }

    #[test]
    fn sub_year_points_are_averaged() {
        let series = vec![
            TimeDataPoint::new(2003).with_month(1).with_channel(NDVI, 0.2),
            TimeDataPoint::new(2003).with_month(7).with_channel(NDVI, 0.6),
            TimeDataPoint::new(2003).with_month(9).with_channel(LST, 300.0),
        ];
        let correlation = correlate(&series, 2003);

        assert_eq!(correlation.matches.len(), 3);
        let ndvi = correlation.summary[NDVI].value().expect("ndvi mean");
        assert_close(ndvi, 0.4);
        assert_eq!(correlation.summary[LST], ChannelSummary::Mean(300.0));
        assert_eq!(correlation.summary[NDVI].to_string(), "0.40");
    }

    #[test]
    fn trend_needs_two_points_with_the_channel() {
        assert_eq!(trend(&[], NDVI), Trend::NoData);
        assert_eq!(
            trend(&[TimeDataPoint::new(2000).with_channel(NDVI, 0.1)], NDVI),
            Trend::NoData
        );

        let gappy = vec![
            TimeDataPoint::new(2000).with_channel(NDVI, 0.1),
            TimeDataPoint::new(2001).with_channel(LST, 290.0),
        ];
        assert_eq!(trend(&gappy, NDVI), Trend::NoData);
        assert_eq!(Trend::NoData.label(), "No trend data");
    }

    #[test]
    fn equal_endpoints_are_steady() {
        let series = vec![
            TimeDataPoint::new(2000).with_channel(NDVI, 0.3),
            TimeDataPoint::new(2001).with_channel(NDVI, 0.9),
            TimeDataPoint::new(2002).with_channel(NDVI, 0.3),
        ];
        assert_eq!(trend(&series, NDVI), Trend::Steady);

        let all = trends(&two_year_series());
        assert_eq!(all[NDVI], Trend::Decreasing);
        assert_eq!(all[LST], Trend::Increasing);
    }
}
