use std::collections::HashSet;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::normalize::parse_date_parts;

const EARTH_RADIUS_KM: f64 = 6371.0088;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AnnotationKind {
    Event,
    Milestone,
    /// Older datasets tag these as `impact`.
    #[serde(alias = "impact")]
    Observation,
}

impl AnnotationKind {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "event" => Some(Self::Event),
            "milestone" => Some(Self::Milestone),
            "observation" | "impact" => Some(Self::Observation),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Impact {
    Positive,
    Negative,
    #[default]
    Neutral,
}

impl Impact {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "positive" => Some(Self::Positive),
            "negative" => Some(Self::Negative),
            "neutral" => Some(Self::Neutral),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Annotation {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: AnnotationKind,
    pub title: String,
    pub description: String,
    pub date: String,
    /// `[lon, lat]`
    pub coordinates: [f64; 2],
    pub impact: Impact,
}

impl Annotation {
    pub fn year(&self) -> Option<i32> {
        parse_date_parts(&self.date).map(|(year, _)| year)
    }
}

/// A feature that could not be mapped to an [`Annotation`]. Parsing carries
/// on with the next feature.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("annotation feature {index}: {reason}")]
pub struct MalformedAnnotationFeature {
    pub index: usize,
    pub reason: String,
}

impl MalformedAnnotationFeature {
    fn new(index: usize, reason: impl Into<String>) -> Self {
        Self {
            index,
            reason: reason.into(),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum AnnotationError {
    #[error("invalid annotation JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("annotation document is not a FeatureCollection")]
    NotAFeatureCollection,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct ParsedAnnotations {
    pub annotations: Vec<Annotation>,
    pub skipped: Vec<MalformedAnnotationFeature>,
}

/// Parse a GeoJSON FeatureCollection of point annotations.
///
/// Only a broken document fails. Individual bad features land in
/// `skipped`, and so do later features reusing an earlier id.
pub fn parse_feature_collection(bytes: &[u8]) -> Result<ParsedAnnotations, AnnotationError> {
    let document: Value = serde_json::from_slice(bytes)?;
    if let Some(kind) = document.get("type").and_then(Value::as_str)
        && kind != "FeatureCollection"
    {
        return Err(AnnotationError::NotAFeatureCollection);
    }
    let features = document
        .get("features")
        .and_then(Value::as_array)
        .ok_or(AnnotationError::NotAFeatureCollection)?;

    let mut parsed = ParsedAnnotations::default();
    let mut seen_ids = HashSet::new();

    for (index, feature) in features.iter().enumerate() {
        match annotation_from_feature(index, feature) {
            Ok(annotation) => {
                if !seen_ids.insert(annotation.id.clone()) {
                    parsed.skipped.push(MalformedAnnotationFeature::new(
                        index,
                        format!("duplicate id `{}`", annotation.id),
                    ));
                    continue;
                }
                parsed.annotations.push(annotation);
            }
            Err(malformed) => parsed.skipped.push(malformed),
        }
    }

    Ok(parsed)
}

fn annotation_from_feature(
    index: usize,
    feature: &Value,
) -> Result<Annotation, MalformedAnnotationFeature> {
    let props = feature
        .get("properties")
        .and_then(Value::as_object)
        .ok_or_else(|| MalformedAnnotationFeature::new(index, "missing properties"))?;

    let id = match props.get("id") {
        Some(Value::String(s)) if !s.trim().is_empty() => s.trim().to_string(),
        Some(Value::Number(n)) => n.to_string(),
        _ => return Err(MalformedAnnotationFeature::new(index, "missing id")),
    };

    let kind_raw = props
        .get("type")
        .and_then(Value::as_str)
        .ok_or_else(|| MalformedAnnotationFeature::new(index, "missing type"))?;
    let kind = AnnotationKind::parse(kind_raw).ok_or_else(|| {
        MalformedAnnotationFeature::new(index, format!("unknown type `{kind_raw}`"))
    })?;

    let title = props
        .get("title")
        .and_then(Value::as_str)
        .ok_or_else(|| MalformedAnnotationFeature::new(index, "missing title"))?
        .to_string();
    let description = props
        .get("description")
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string();
    let date = props
        .get("date")
        .and_then(Value::as_str)
        .ok_or_else(|| MalformedAnnotationFeature::new(index, "missing date"))?
        .to_string();

    let impact = match props.get("impact").and_then(Value::as_str) {
        None => Impact::default(),
        Some(raw) => Impact::parse(raw).ok_or_else(|| {
            MalformedAnnotationFeature::new(index, format!("unknown impact `{raw}`"))
        })?,
    };

    let geometry = feature
        .get("geometry")
        .ok_or_else(|| MalformedAnnotationFeature::new(index, "missing geometry"))?;
    if let Some(geometry_type) = geometry.get("type").and_then(Value::as_str)
        && geometry_type != "Point"
    {
        return Err(MalformedAnnotationFeature::new(
            index,
            format!("unsupported geometry `{geometry_type}`"),
        ));
    }
    let coordinates = point_coordinates(geometry.get("coordinates"))
        .ok_or_else(|| MalformedAnnotationFeature::new(index, "missing or invalid coordinates"))?;

    Ok(Annotation {
        id,
        kind,
        title,
        description,
        date,
        coordinates,
        impact,
    })
}

fn point_coordinates(value: Option<&Value>) -> Option<[f64; 2]> {
    let pair = value?.as_array()?;
    let lon = pair.first()?.as_f64()?;
    let lat = pair.get(1)?.as_f64()?;
    if !(-180.0..=180.0).contains(&lon) || !(-90.0..=90.0).contains(&lat) {
        return None;
    }
    Some([lon, lat])
}

/// Great-circle distance between two `[lon, lat]` points.
pub fn distance_km(a: [f64; 2], b: [f64; 2]) -> f64 {
    let (lat_a, lat_b) = (a[1].to_radians(), b[1].to_radians());
    let dlat = lat_b - lat_a;
    let dlon = (b[0] - a[0]).to_radians();
    let h = (dlat / 2.0).sin().powi(2) + lat_a.cos() * lat_b.cos() * (dlon / 2.0).sin().powi(2);
    2.0 * EARTH_RADIUS_KM * h.sqrt().min(1.0).asin()
}

/// Load-once annotation set shared read-only by the map and the session.
/// Year correlation is left to callers via [`Annotation::year`].
#[derive(Debug, Clone, Default)]
pub struct AnnotationIndex {
    annotations: Arc<[Annotation]>,
}

impl AnnotationIndex {
    pub fn new(annotations: Vec<Annotation>) -> Self {
        Self {
            annotations: annotations.into(),
        }
    }

    pub fn all(&self) -> &[Annotation] {
        &self.annotations
    }

    pub fn len(&self) -> usize {
        self.annotations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.annotations.is_empty()
    }

    pub fn get(&self, id: &str) -> Option<&Annotation> {
        self.annotations.iter().find(|a| a.id == id)
    }

    /// Annotations within `radius_km` of `center`, nearest first.
    pub fn near(&self, center: [f64; 2], radius_km: f64) -> Vec<&Annotation> {
        if !radius_km.is_finite() || radius_km < 0.0 {
            return Vec::new();
        }
        let mut hits: Vec<(f64, &Annotation)> = self
            .annotations
            .iter()
            .map(|a| (distance_km(center, a.coordinates), a))
            .filter(|(d, _)| *d <= radius_km)
            .collect();
        hits.sort_by(|a, b| a.0.total_cmp(&b.0));
        hits.into_iter().map(|(_, a)| a).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::{
        AnnotationError, AnnotationIndex, AnnotationKind, Impact, distance_km,
        parse_feature_collection,
    };

    const THREE_FEATURES: &str = r#"{
        "type": "FeatureCollection",
        "features": [
            {
                "type": "Feature",
                "geometry": {"type": "Point", "coordinates": [34.75, -0.10]},
                "properties": {"id": "hyacinth-2004", "type": "event", "title": "Hyacinth bloom",
                               "description": "Mats cover the gulf", "date": "2004-06-01", "impact": "negative"}
            },
            {
                "type": "Feature",
                "geometry": {"type": "Point"},
                "properties": {"id": "broken", "type": "event", "title": "No coords", "date": "2006-01-01"}
            },
            {
                "type": "Feature",
                "geometry": {"type": "Point", "coordinates": [34.80, -0.05]},
                "properties": {"id": "cleanup-2010", "type": "impact", "title": "Cleanup",
                               "date": "2010-03-15", "impact": "positive"}
            }
        ]
    }"#;

    #[test]
    fn feature_without_coordinates_is_skipped() {
        let parsed = parse_feature_collection(THREE_FEATURES.as_bytes())
            .expect("collection should parse");

        assert_eq!(parsed.annotations.len(), 2);
        assert_eq!(parsed.skipped.len(), 1);
        assert_eq!(parsed.skipped[0].index, 1);

        let cleanup = &parsed.annotations[1];
        assert_eq!(cleanup.kind, AnnotationKind::Observation);
        assert_eq!(cleanup.impact, Impact::Positive);
        assert_eq!(cleanup.description, "");
        assert_eq!(cleanup.year(), Some(2010));
    }

    #[test]
    fn duplicate_ids_and_non_point_geometry_are_skipped() {
        let doc = r#"{"type":"FeatureCollection","features":[
            {"geometry":{"type":"Point","coordinates":[1,1]},"properties":{"id":"a","type":"milestone","title":"A","date":"2001"}},
            {"geometry":{"type":"Point","coordinates":[2,2]},"properties":{"id":"a","type":"milestone","title":"A again","date":"2002"}},
            {"geometry":{"type":"LineString","coordinates":[[1,1],[2,2]]},"properties":{"id":"b","type":"event","title":"B","date":"2003"}},
            {"geometry":{"type":"Point","coordinates":[3,3]},"properties":{"id":"c","type":"rumour","title":"C","date":"2003"}}
        ]}"#;
        let parsed = parse_feature_collection(doc.as_bytes()).expect("collection should parse");

        assert_eq!(parsed.annotations.len(), 1);
        assert_eq!(parsed.annotations[0].title, "A");
        let skipped: Vec<_> = parsed.skipped.iter().map(|s| s.index).collect();
        assert_eq!(skipped, vec![1, 2, 3]);
    }

    #[test]
    fn rejects_documents_that_are_not_collections() {
        assert!(matches!(
            parse_feature_collection(br#"{"type":"Feature"}"#),
            Err(AnnotationError::NotAFeatureCollection)
        ));
        assert!(matches!(
            parse_feature_collection(b"not json"),
            Err(AnnotationError::Json(_))
        ));
    }

    #[test]
    fn near_returns_nearest_first_within_radius() {
        let parsed = parse_feature_collection(THREE_FEATURES.as_bytes())
            .expect("collection should parse");
        let index = AnnotationIndex::new(parsed.annotations);

        let hits = index.near([34.80, -0.05], 20.0);
        let ids: Vec<_> = hits.iter().map(|a| a.id.as_str()).collect();
        assert_eq!(ids, vec!["cleanup-2010", "hyacinth-2004"]);

        assert!(index.near([0.0, 0.0], 50.0).is_empty());
        assert!(index.get("hyacinth-2004").is_some());
        assert_eq!(index.all().len(), 2);
    }

    #[test]
    fn distance_matches_known_arc() {
        // One degree of latitude is roughly 111.2 km.
        let d = distance_km([0.0, 0.0], [0.0, 1.0]);
        assert!((d - 111.2).abs() < 0.1, "got {d}");
        assert_eq!(distance_km([10.0, 10.0], [10.0, 10.0]), 0.0);
    }
}
