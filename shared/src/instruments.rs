use std::collections::BTreeSet;

use serde::Serialize;

/// One of the five instruments aboard Terra.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Instrument {
    pub name: &'static str,
    pub full_name: &'static str,
    pub description: &'static str,
    pub data_types: &'static [&'static str],
    pub resolution: &'static str,
    pub swath: &'static str,
    pub water_quality_use: &'static str,
}

pub static INSTRUMENTS: [Instrument; 5] = [
    Instrument {
        name: "MODIS",
        full_name: "Moderate Resolution Imaging Spectroradiometer",
        description: "Primary instrument for chlorophyll-a detection and water quality monitoring",
        data_types: &[
            "Chlorophyll-a",
            "Water Turbidity",
            "Algal Blooms",
            "Surface Reflectance",
        ],
        resolution: "250m-1km",
        swath: "2330km",
        water_quality_use: "Detects algal blooms through red/NIR band ratios",
    },
    Instrument {
        name: "ASTER",
        full_name: "Advanced Spaceborne Thermal Emission and Reflection Radiometer",
        description: "High-resolution water temperature monitoring for thermal stress assessment",
        data_types: &[
            "Water Temperature",
            "Thermal Anomalies",
            "Surface Kinetic Temperature",
        ],
        resolution: "90m thermal",
        swath: "60km",
        water_quality_use: "Monitors water temperature changes affecting oxygen levels",
    },
    Instrument {
        name: "MISR",
        full_name: "Multi-angle Imaging SpectroRadiometer",
        description: "Multi-angle observations for atmospheric correction and aerosol monitoring",
        data_types: &[
            "Atmospheric Correction",
            "Aerosol Optical Depth",
            "Haze Removal",
        ],
        resolution: "275m-1.1km",
        swath: "360km",
        water_quality_use: "Improves water quality retrievals through atmospheric correction",
    },
    Instrument {
        name: "CERES",
        full_name: "Clouds and Earth's Radiant Energy System",
        description: "Radiation budget measurements for climate impact assessment",
        data_types: &["Solar Radiation", "Cloud Effects", "Energy Balance"],
        resolution: "20km",
        swath: "Global",
        water_quality_use: "Assesses climate factors affecting lake ecosystems",
    },
    Instrument {
        name: "MOPITT",
        full_name: "Measurements of Pollution in the Troposphere",
        description: "Atmospheric pollution monitoring affecting water quality",
        data_types: &["Carbon Monoxide", "Atmospheric Pollution", "Air Quality"],
        resolution: "22km",
        swath: "640km",
        water_quality_use: "Tracks pollution sources contributing to nutrient loading",
    },
];

pub fn find_instrument(name: &str) -> Option<&'static Instrument> {
    INSTRUMENTS
        .iter()
        .find(|instrument| instrument.name.eq_ignore_ascii_case(name.trim()))
}

/// Instruments the user has highlighted in the sidebar.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InstrumentSelection(BTreeSet<&'static str>);

impl Default for InstrumentSelection {
    fn default() -> Self {
        Self(BTreeSet::from(["MODIS"]))
    }
}

impl InstrumentSelection {
    /// Flip `name`. Unknown names are ignored; returns whether the
    /// instrument is selected afterwards.
    pub fn toggle(&mut self, name: &str) -> bool {
        let Some(instrument) = find_instrument(name) else {
            return false;
        };
        if !self.0.remove(instrument.name) {
            self.0.insert(instrument.name);
            return true;
        }
        false
    }

    pub fn is_selected(&self, name: &str) -> bool {
        find_instrument(name).is_some_and(|instrument| self.0.contains(instrument.name))
    }

    pub fn count(&self) -> usize {
        self.0.len()
    }

    pub fn selected(&self) -> impl Iterator<Item = &'static Instrument> + '_ {
        INSTRUMENTS
            .iter()
            .filter(|instrument| self.0.contains(instrument.name))
    }
}
