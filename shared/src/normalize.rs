//! Maps raw provider time-series JSON into canonical [`TimeDataPoint`]s.
//!
//! Providers disagree on channel names and on which channels they carry.
//! Renames live in [`CHANNEL_ALIASES`]; channels filled in from another
//! channel live in [`CHANNEL_DERIVATIONS`]. Nothing downstream of this module
//! does its own fallback arithmetic.

use chrono::{DateTime, Datelike, NaiveDate};
use serde_json::{Map, Value};

use crate::series::{CHLOROPHYLL, LST, NDVI, OXYGEN, TEMPERATURE, TimeDataPoint};

const RESERVED_FIELDS: [&str; 3] = ["date", "year", "month"];

/// `(raw name, canonical channel)`
pub const CHANNEL_ALIASES: &[(&str, &str)] = &[
    ("mean_chla", CHLOROPHYLL),
    ("chla", CHLOROPHYLL),
    ("water_temperature", TEMPERATURE),
    ("dissolved_oxygen", OXYGEN),
    ("do", OXYGEN),
];

#[derive(Debug, Clone, Copy)]
pub struct ChannelDerivation {
    pub target: &'static str,
    pub source: &'static str,
    pub convert: fn(f64) -> f64,
    pub description: &'static str,
}

/// Applied in order, only when `target` is absent from the point.
pub const CHANNEL_DERIVATIONS: &[ChannelDerivation] = &[
    ChannelDerivation {
        target: CHLOROPHYLL,
        source: NDVI,
        convert: ndvi_to_chlorophyll,
        description: "chlorophyll proxy = ndvi * 30",
    },
    ChannelDerivation {
        target: TEMPERATURE,
        source: LST,
        convert: kelvin_to_celsius,
        description: "temperature (C) = lst (K) - 273.15",
    },
];

fn ndvi_to_chlorophyll(ndvi: f64) -> f64 {
    ndvi * 30.0
}

fn kelvin_to_celsius(kelvin: f64) -> f64 {
    kelvin - 273.15
}

#[derive(Debug, thiserror::Error, PartialEq)]
pub enum SeriesError {
    #[error("time series must be a JSON array")]
    NotAnArray,
    #[error("time series entry {index} is not an object")]
    NotAnObject { index: usize },
    #[error("time series entry {index} has no resolvable year (date: {date:?})")]
    MissingYear { index: usize, date: Option<String> },
    #[error("time series entry {index} has a non-finite `{channel}` value")]
    NonFiniteChannel { index: usize, channel: String },
}

/// Normalize a whole series. One bad entry fails the series so a provider
/// never hands over partially usable data.
pub fn normalize_series(raw: &Value) -> Result<Vec<TimeDataPoint>, SeriesError> {
    let entries = raw.as_array().ok_or(SeriesError::NotAnArray)?;

    let mut series = entries
        .iter()
        .enumerate()
        .map(|(index, entry)| {
            let object = entry
                .as_object()
                .ok_or(SeriesError::NotAnObject { index })?;
            normalize_point(index, object)
        })
        .collect::<Result<Vec<_>, _>>()?;

    // Vec::sort_by_key is stable, so same-(year, month) points keep input order.
    series.sort_by_key(|point| (point.year, point.month.unwrap_or(0)));
    Ok(series)
}

pub fn normalize_point(
    index: usize,
    object: &Map<String, Value>,
) -> Result<TimeDataPoint, SeriesError> {
    let raw_date = object.get("date").and_then(Value::as_str).map(str::trim);
    let date_parts = raw_date.and_then(parse_date_parts);

    let year = object
        .get("year")
        .and_then(value_as_i32)
        .or(date_parts.map(|(year, _)| year))
        .ok_or_else(|| SeriesError::MissingYear {
            index,
            date: raw_date.map(str::to_string),
        })?;

    let month = object
        .get("month")
        .and_then(value_as_i32)
        .and_then(|m| u32::try_from(m).ok())
        .filter(|m| (1..=12).contains(m))
        .or(date_parts.and_then(|(_, month)| month));

    let date = match raw_date {
        Some(date) if !date.is_empty() => date.to_string(),
        _ => match month {
            Some(month) => format!("{year}-{month:02}"),
            None => year.to_string(),
        },
    };

    let mut point = TimeDataPoint {
        date,
        year,
        month,
        channels: Default::default(),
    };

    for (key, value) in object {
        if RESERVED_FIELDS.contains(&key.as_str()) {
            continue;
        }
        let Some(number) = value.as_f64() else {
            continue;
        };
        let name = canonical_channel(key);
        // A canonical key always wins over an alias for the same channel.
        if name != key.as_str() && object.contains_key(name) {
            continue;
        }
        if !number.is_finite() {
            return Err(SeriesError::NonFiniteChannel {
                index,
                channel: name.to_string(),
            });
        }
        point.channels.insert(name.to_string(), number);
    }

    for derivation in CHANNEL_DERIVATIONS {
        if point.channels.contains_key(derivation.target) {
            continue;
        }
        if let Some(source) = point.channel(derivation.source) {
            let derived = (derivation.convert)(source);
            if !derived.is_finite() {
                return Err(SeriesError::NonFiniteChannel {
                    index,
                    channel: derivation.target.to_string(),
                });
            }
            point.channels.insert(derivation.target.to_string(), derived);
        }
    }

    Ok(point)
}

pub fn canonical_channel(name: &str) -> &str {
    CHANNEL_ALIASES
        .iter()
        .find(|(alias, _)| alias.eq_ignore_ascii_case(name))
        .map(|(_, canonical)| *canonical)
        .unwrap_or(name)
}

/// `(year, month)` from `YYYY`, `YYYY-MM`, `YYYY-MM-DD` or RFC 3339.
pub fn parse_date_parts(raw: &str) -> Option<(i32, Option<u32>)> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }

    if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
        return Some((ts.year(), Some(ts.month())));
    }
    if let Ok(date) = NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
        return Some((date.year(), Some(date.month())));
    }
    if let Ok(date) = NaiveDate::parse_from_str(&format!("{raw}-01"), "%Y-%m-%d") {
        return Some((date.year(), Some(date.month())));
    }
    if raw.len() == 4 {
        return raw.parse::<i32>().ok().map(|year| (year, None));
    }
    None
}

fn value_as_i32(value: &Value) -> Option<i32> {
    match value {
        Value::Number(n) => n
            .as_i64()
            .or_else(|| n.as_f64().filter(|f| f.fract() == 0.0).map(|f| f as i64))
            .and_then(|n| i32::try_from(n).ok()),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::{SeriesError, canonical_channel, normalize_series, parse_date_parts};

    fn assert_close(actual: f64, expected: f64) {
        let diff = (actual - expected).abs();
        assert!(
            diff < 1e-9,
            "expected {expected}, got {actual} (diff: {diff})"
        );
    }

    #[test]
    fn aliases_map_to_canonical_channels() {
        let series = normalize_series(&json!([
            {"date": "2004-07-01", "mean_chla": 12.5, "water_temperature": 25.1, "do": 6.2}
        ]))
        .expect("series should normalize");

        let point = &series[0];
        assert_eq!(point.year, 2004);
        assert_eq!(point.month, Some(7));
        assert_eq!(point.channel("chlorophyll"), Some(12.5));
        assert_eq!(point.channel("temperature"), Some(25.1));
        assert_eq!(point.channel("oxygen"), Some(6.2));
        assert!(point.channel("mean_chla").is_none());
    }

    #[test]
    fn derivations_fill_only_absent_targets() {
        let series = normalize_series(&json!([
            {"year": 2000, "ndvi": 0.4, "lst": 295.0},
            {"year": 2001, "ndvi": 0.5, "chlorophyll": 9.0}
        ]))
        .expect("series should normalize");

        let derived_chl = series[0].channel("chlorophyll").expect("derived chlorophyll");
        assert_close(derived_chl, 12.0);
        let derived_temp = series[0].channel("temperature").expect("derived temperature");
        assert_close(derived_temp, 21.85);

        assert_eq!(series[1].channel("chlorophyll"), Some(9.0));
        assert!(series[1].channel("temperature").is_none());
    }

    #[test]
    fn canonical_key_wins_over_alias() {
        let series = normalize_series(&json!([
            {"year": 2002, "chlorophyll": 3.0, "chla": 99.0}
        ]))
        .expect("series should normalize");
        assert_eq!(series[0].channel("chlorophyll"), Some(3.0));
    }

    #[test]
    fn sorts_by_year_then_month_keeping_ties_stable() {
        let series = normalize_series(&json!([
            {"year": 2003, "ndvi": 0.1},
            {"date": "2001-09", "ndvi": 0.2},
            {"date": "2001-03", "ndvi": 0.3},
            {"year": 2003, "ndvi": 0.4}
        ]))
        .expect("series should normalize");

        let order: Vec<_> = series
            .iter()
            .map(|p| (p.year, p.month, p.channel("ndvi")))
            .collect();
        assert_eq!(
            order,
            vec![
                (2001, Some(3), Some(0.3)),
                (2001, Some(9), Some(0.2)),
                (2003, None, Some(0.1)),
                (2003, None, Some(0.4)),
            ]
        );
    }

    #[test]
    fn one_bad_point_fails_the_series() {
        let err = normalize_series(&json!([
            {"year": 2000, "ndvi": 0.4},
            {"date": "sometime", "ndvi": 0.5}
        ]))
        .expect_err("second entry has no year");
        assert_eq!(
            err,
            SeriesError::MissingYear {
                index: 1,
                date: Some("sometime".to_string())
            }
        );

        assert_eq!(
            normalize_series(&json!({"year": 2000})),
            Err(SeriesError::NotAnArray)
        );
        assert_eq!(
            normalize_series(&json!([1])),
            Err(SeriesError::NotAnObject { index: 0 })
        );
    }

    #[test]
    fn synthesizes_date_and_ignores_text_fields() {
        let series = normalize_series(&json!([
            {"year": "2010", "month": 4, "ndvi": 0.3, "source": "MODIS"}
        ]))
        .expect("series should normalize");
        assert_eq!(series[0].date, "2010-04");
        assert_eq!(series[0].year, 2010);
        assert!(series[0].channels.get("source").is_none());
    }

    #[test]
    fn empty_series_is_valid() {
        assert_eq!(normalize_series(&json!([])), Ok(Vec::new()));
    }

    #[test]
    fn parses_supported_date_shapes() {
        assert_eq!(parse_date_parts("2005"), Some((2005, None)));
        assert_eq!(parse_date_parts("2005-06"), Some((2005, Some(6))));
        assert_eq!(parse_date_parts("2005-06-15"), Some((2005, Some(6))));
        assert_eq!(
            parse_date_parts("2005-06-15T10:00:00Z"),
            Some((2005, Some(6)))
        );
        assert_eq!(parse_date_parts("June"), None);
        assert_eq!(canonical_channel("DO"), "oxygen");
        assert_eq!(canonical_channel("ndvi"), "ndvi");
    }
}
