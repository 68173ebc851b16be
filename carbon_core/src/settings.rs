//! # Settings
//!
//! Calculation settings stored alongside an inventory. Every field has a
//! default so older files without a settings block still load.

use serde::{Deserialize, Serialize};

use crate::errors::{CarbonError, CarbonResult};
use crate::units::UnitSystem;

/// How unrecognized phase-group names and unit kinds are treated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum NamePolicy {
    /// Unknown names contribute nothing (compatibility mode)
    #[default]
    Lenient,
    /// Unknown names are reported as errors
    Strict,
}

impl NamePolicy {
    pub fn parse(name: &str) -> Option<Self> {
        match name.trim().to_ascii_lowercase().as_str() {
            "lenient" => Some(NamePolicy::Lenient),
            "strict" => Some(NamePolicy::Strict),
            _ => None,
        }
    }
}

/// Envelope estimation parameters.
///
/// Emission factors are kgCO2e per m² of the corresponding envelope area.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EnvelopeFactors {
    /// Footprint width/depth ratio used to derive the perimeter
    #[serde(default = "default_aspect_ratio")]
    pub aspect_ratio: f64,

    /// Cladding factor (kgCO2e/m²)
    #[serde(default = "default_cladding")]
    pub cladding_kgco2_m2: f64,

    /// Facade factor, applied to the whole facade area (kgCO2e/m²)
    #[serde(default = "default_facade")]
    pub facade_kgco2_m2: f64,

    /// Roof factor (kgCO2e/m²)
    #[serde(default = "default_roof")]
    pub roof_kgco2_m2: f64,
}

fn default_aspect_ratio() -> f64 {
    2.0
}

fn default_cladding() -> f64 {
    8.8
}

fn default_facade() -> f64 {
    13.6
}

fn default_roof() -> f64 {
    7.7
}

impl Default for EnvelopeFactors {
    fn default() -> Self {
        EnvelopeFactors {
            aspect_ratio: default_aspect_ratio(),
            cladding_kgco2_m2: default_cladding(),
            facade_kgco2_m2: default_facade(),
            roof_kgco2_m2: default_roof(),
        }
    }
}

impl EnvelopeFactors {
    pub fn validate(&self) -> CarbonResult<()> {
        if !(self.aspect_ratio.is_finite() && self.aspect_ratio > 0.0) {
            return Err(CarbonError::invalid_geometry(
                "aspect_ratio",
                self.aspect_ratio.to_string(),
                "Aspect ratio must be positive",
            ));
        }
        for (field, value) in [
            ("cladding_kgco2_m2", self.cladding_kgco2_m2),
            ("facade_kgco2_m2", self.facade_kgco2_m2),
            ("roof_kgco2_m2", self.roof_kgco2_m2),
        ] {
            if !(value.is_finite() && value >= 0.0) {
                return Err(CarbonError::invalid_input(
                    field,
                    value.to_string(),
                    "Emission factor cannot be negative",
                ));
            }
        }
        Ok(())
    }
}

/// Inventory-wide calculation settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CarbonSettings {
    /// Preferred reporting unit system
    #[serde(default)]
    pub unit_system: UnitSystem,

    /// Treatment of unknown phase-group and unit-kind names
    #[serde(default)]
    pub name_policy: NamePolicy,

    /// Envelope estimation parameters
    #[serde(default)]
    pub envelope: EnvelopeFactors,

    /// Upper bound on worker threads for concurrent aggregation
    #[serde(default = "default_max_parallel_tasks")]
    pub max_parallel_tasks: usize,
}

fn default_max_parallel_tasks() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1)
}

impl Default for CarbonSettings {
    fn default() -> Self {
        CarbonSettings {
            unit_system: UnitSystem::default(),
            name_policy: NamePolicy::default(),
            envelope: EnvelopeFactors::default(),
            max_parallel_tasks: default_max_parallel_tasks(),
        }
    }
}

impl CarbonSettings {
    pub fn validate(&self) -> CarbonResult<()> {
        self.envelope.validate()?;
        if self.max_parallel_tasks == 0 {
            return Err(CarbonError::invalid_input(
                "max_parallel_tasks",
                "0",
                "At least one worker is required",
            ));
        }
        Ok(())
    }
}
