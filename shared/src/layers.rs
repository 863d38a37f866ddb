use std::collections::BTreeSet;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::colors::{
    CHLOROPHYLL_SCALE, ColorScale, DISSOLVED_OXYGEN_SCALE, LST_SCALE, NDVI_SCALE,
    WATER_TEMPERATURE_SCALE,
};
use crate::region::{Region, TimeRange};

pub const DEFAULT_LAYER_OPACITY: f64 = 0.7;

/// Logical raster layers the map can show for a given year.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LayerKind {
    Ndvi,
    Lst,
    Chlorophyll,
    Temperature,
    Oxygen,
}

impl LayerKind {
    pub const ALL: [Self; 5] = [
        Self::Ndvi,
        Self::Lst,
        Self::Chlorophyll,
        Self::Temperature,
        Self::Oxygen,
    ];

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Ndvi => "ndvi",
            Self::Lst => "lst",
            Self::Chlorophyll => "chlorophyll",
            Self::Temperature => "temperature",
            Self::Oxygen => "oxygen",
        }
    }

    pub const fn label(self) -> &'static str {
        match self {
            Self::Ndvi => "Vegetation (NDVI)",
            Self::Lst => "Land Surface Temperature",
            Self::Chlorophyll => "Chlorophyll-a",
            Self::Temperature => "Water Temperature",
            Self::Oxygen => "Dissolved Oxygen",
        }
    }

    pub const fn scale(self) -> ColorScale {
        match self {
            Self::Ndvi => NDVI_SCALE,
            Self::Lst => LST_SCALE,
            Self::Chlorophyll => CHLOROPHYLL_SCALE,
            Self::Temperature => WATER_TEMPERATURE_SCALE,
            Self::Oxygen => DISSOLVED_OXYGEN_SCALE,
        }
    }

    /// `{kind}_{year}`: distinct for every (kind, year) pair.
    pub fn source_id(self, year: i32) -> String {
        format!("{}_{year}", self.as_str())
    }

    pub fn parse(raw: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|kind| kind.as_str().eq_ignore_ascii_case(raw.trim()))
    }
}

/// Which layers the user has switched on.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LayerToggles(BTreeSet<LayerKind>);

impl Default for LayerToggles {
    fn default() -> Self {
        Self::from_kinds([LayerKind::Ndvi, LayerKind::Lst])
    }
}

impl LayerToggles {
    pub fn none() -> Self {
        Self(BTreeSet::new())
    }

    pub fn from_kinds(kinds: impl IntoIterator<Item = LayerKind>) -> Self {
        Self(kinds.into_iter().collect())
    }

    pub fn set(&mut self, kind: LayerKind, enabled: bool) -> bool {
        if enabled {
            self.0.insert(kind)
        } else {
            self.0.remove(&kind)
        }
    }

    /// Flip `kind`; returns whether it is now enabled.
    pub fn toggle(&mut self, kind: LayerKind) -> bool {
        if !self.0.remove(&kind) {
            self.0.insert(kind);
            return true;
        }
        false
    }

    pub fn is_enabled(&self, kind: LayerKind) -> bool {
        self.0.contains(&kind)
    }

    /// Enabled kinds in [`LayerKind::ALL`] order.
    pub fn enabled(&self) -> impl Iterator<Item = LayerKind> + '_ {
        self.0.iter().copied()
    }

    pub fn count(&self) -> usize {
        self.0.len()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LayerSpec {
    pub kind: LayerKind,
    pub source_id: String,
    pub tile_url: String,
    pub year: i32,
    pub opacity: f64,
    pub scale: ColorScale,
}

/// Tile sources for every enabled layer at `year`. Disabled layers are
/// absent from the output rather than emitted hidden.
pub fn derive_layers(region: &Region, year: i32, toggles: &LayerToggles) -> Vec<LayerSpec> {
    toggles
        .enabled()
        .map(|kind| {
            let source_id = kind.source_id(year);
            LayerSpec {
                kind,
                tile_url: format!("/tiles/{}/{source_id}/{{z}}/{{x}}/{{y}}.png", region.slug),
                source_id,
                year,
                opacity: DEFAULT_LAYER_OPACITY,
                scale: kind.scale(),
            }
        })
        .collect()
}

/// Layers with per-year MODIS imagery behind `/api/modis-image`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImageryLayer {
    Chlorophyll,
    Temperature,
}

impl ImageryLayer {
    pub const ALL: [Self; 2] = [Self::Chlorophyll, Self::Temperature];

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Chlorophyll => "chlorophyll",
            Self::Temperature => "temperature",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|layer| layer.as_str().eq_ignore_ascii_case(raw.trim()))
    }

    /// Fill color of the generated placeholder image.
    pub const fn placeholder_rgb(self) -> (u8, u8, u8) {
        match self {
            Self::Chlorophyll => (0xdc, 0x26, 0x26),
            Self::Temperature => (0xf5, 0x9e, 0x0b),
        }
    }
}

/// Imagery is captured for May 1st of every year.
pub fn imagery_date(year: i32) -> Option<NaiveDate> {
    NaiveDate::from_ymd_opt(year, 5, 1)
}

pub fn imagery_url(layer: ImageryLayer, year: i32) -> Option<String> {
    let date = imagery_date(year)?;
    Some(format!(
        "/api/modis-image?date={}&layer={}",
        date.format("%Y-%m-%d"),
        layer.as_str()
    ))
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ImageryFrame {
    pub year: i32,
    pub date: NaiveDate,
    pub url: String,
}

pub fn imagery_timeline(range: TimeRange, layer: ImageryLayer) -> Vec<ImageryFrame> {
    range
        .years()
        .filter_map(|year| {
            Some(ImageryFrame {
                year,
                date: imagery_date(year)?,
                url: imagery_url(layer, year)?,
            })
        })
        .collect()
}
