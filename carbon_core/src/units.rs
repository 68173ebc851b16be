//! # Units and Unit Conversion
//!
//! Metric/imperial conversion for the quantity kinds that appear in carbon
//! reporting, plus lightweight newtype wrappers for callers that want the
//! compiler to keep metric and imperial numbers apart.
//!
//! ## Conversion Factors
//!
//! Each quantity kind has exactly one multiplicative factor, imperial to
//! metric, held in the process-wide constant [`CONVERSION_FACTORS`] table.
//! The reverse direction divides by the same factor, so
//! `to_metric(to_imperial(x)) == x` up to floating-point rounding.
//!
//! | Kind             | Metric     | Imperial   |
//! |------------------|------------|------------|
//! | Area             | m²         | ft²        |
//! | Volume           | m³         | ft³        |
//! | Energy           | kWh        | kBtu       |
//! | Mass             | kg         | lb         |
//! | Density          | kg/m³      | lb/ft³     |
//! | Carbon mass      | kgCO2e     | lbCO2e     |
//! | Carbon intensity | kgCO2e/m²  | lbCO2e/ft² |
//!
//! ## Example
//!
//! ```rust
//! use carbon_core::units::{SquareFeet, SquareMeters, UnitConversionService};
//!
//! let area: SquareFeet = SquareMeters(100.0).into();
//! assert!((area.0 - 1076.39).abs() < 0.01);
//!
//! let service = UnitConversionService::new();
//! let mass = service.converter("mass").unwrap();
//! assert!((mass.to_metric(1.0) - 0.45359237).abs() < 1e-12);
//! assert!(service.converter("luminosity").is_none());
//! ```

use std::collections::HashMap;
use std::ops::{Add, Div, Mul, Sub};

use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};

use crate::errors::{CarbonError, CarbonResult};
use crate::settings::NamePolicy;

// ============================================================================
// Unit Systems
// ============================================================================

/// Measurement system a stored value is expressed in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum UnitSystem {
    #[default]
    Metric,
    Imperial,
}

impl UnitSystem {
    pub fn is_metric(&self) -> bool {
        matches!(self, UnitSystem::Metric)
    }

    /// The other system
    pub fn toggled(&self) -> Self {
        match self {
            UnitSystem::Metric => UnitSystem::Imperial,
            UnitSystem::Imperial => UnitSystem::Metric,
        }
    }

    /// Parse "metric"/"si" or "imperial"/"us" (case-insensitive)
    pub fn parse(name: &str) -> Option<Self> {
        match name.trim().to_ascii_lowercase().as_str() {
            "metric" | "si" => Some(UnitSystem::Metric),
            "imperial" | "us" => Some(UnitSystem::Imperial),
            _ => None,
        }
    }
}

impl std::fmt::Display for UnitSystem {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            UnitSystem::Metric => write!(f, "metric"),
            UnitSystem::Imperial => write!(f, "imperial"),
        }
    }
}

/// Display labels for every quantity kind in one unit system.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnitLabels {
    pub system: UnitSystem,
    pub area: String,
    pub volume: String,
    pub energy: String,
    pub mass: String,
    pub density: String,
    pub carbon: String,
}

impl UnitLabels {
    pub fn for_system(system: UnitSystem) -> Self {
        let label = |kind: QuantityKind| kind.unit_label(system).to_string();
        UnitLabels {
            system,
            area: label(QuantityKind::Area),
            volume: label(QuantityKind::Volume),
            energy: label(QuantityKind::Energy),
            mass: label(QuantityKind::Mass),
            density: label(QuantityKind::Density),
            carbon: label(QuantityKind::CarbonMass),
        }
    }

    /// Labels for the opposite unit system
    pub fn toggled(&self) -> Self {
        UnitLabels::for_system(self.system.toggled())
    }
}

impl Default for UnitLabels {
    fn default() -> Self {
        UnitLabels::for_system(UnitSystem::Metric)
    }
}

// ============================================================================
// Quantity Kinds and Factor Table
// ============================================================================

/// Physical quantity kinds with a metric/imperial conversion
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum QuantityKind {
    Area,
    Volume,
    Energy,
    Mass,
    Density,
    CarbonMass,
    CarbonIntensity,
}

impl QuantityKind {
    pub const ALL: [QuantityKind; 7] = [
        QuantityKind::Area,
        QuantityKind::Volume,
        QuantityKind::Energy,
        QuantityKind::Mass,
        QuantityKind::Density,
        QuantityKind::CarbonMass,
        QuantityKind::CarbonIntensity,
    ];

    /// Canonical lookup name
    pub fn name(&self) -> &'static str {
        match self {
            QuantityKind::Area => "area",
            QuantityKind::Volume => "volume",
            QuantityKind::Energy => "energy",
            QuantityKind::Mass => "mass",
            QuantityKind::Density => "density",
            QuantityKind::CarbonMass => "carbon",
            QuantityKind::CarbonIntensity => "carbon_intensity",
        }
    }

    pub fn unit_label(&self, system: UnitSystem) -> &'static str {
        match (self, system) {
            (QuantityKind::Area, UnitSystem::Metric) => "m2",
            (QuantityKind::Area, UnitSystem::Imperial) => "ft2",
            (QuantityKind::Volume, UnitSystem::Metric) => "m3",
            (QuantityKind::Volume, UnitSystem::Imperial) => "ft3",
            (QuantityKind::Energy, UnitSystem::Metric) => "kWh",
            (QuantityKind::Energy, UnitSystem::Imperial) => "kBtu",
            (QuantityKind::Mass, UnitSystem::Metric) => "kg",
            (QuantityKind::Mass, UnitSystem::Imperial) => "lb",
            (QuantityKind::Density, UnitSystem::Metric) => "kg/m3",
            (QuantityKind::Density, UnitSystem::Imperial) => "lb/ft3",
            (QuantityKind::CarbonMass, UnitSystem::Metric) => "kgco2",
            (QuantityKind::CarbonMass, UnitSystem::Imperial) => "lbco2",
            (QuantityKind::CarbonIntensity, UnitSystem::Metric) => "kgco2/m2",
            (QuantityKind::CarbonIntensity, UnitSystem::Imperial) => "lbco2/ft2",
        }
    }

    /// Imperial-to-metric factor, as listed in [`CONVERSION_FACTORS`]
    pub const fn factor(&self) -> f64 {
        match self {
            QuantityKind::Area => FT2_TO_M2,
            QuantityKind::Volume => FT3_TO_M3,
            QuantityKind::Energy => KBTU_TO_KWH,
            QuantityKind::Mass => LB_TO_KG,
            QuantityKind::Density => LB_FT3_TO_KG_M3,
            QuantityKind::CarbonMass => LB_TO_KG,
            QuantityKind::CarbonIntensity => LBCO2_FT2_TO_KGCO2_M2,
        }
    }
}

impl std::fmt::Display for QuantityKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// ft² → m² (1 ft = 0.3048 m exactly)
pub const FT2_TO_M2: f64 = 0.09290304;
/// ft³ → m³
pub const FT3_TO_M3: f64 = 0.028316846592;
/// kBtu → kWh (International Table Btu)
pub const KBTU_TO_KWH: f64 = 0.29307107017222;
/// lb → kg (international avoirdupois pound)
pub const LB_TO_KG: f64 = 0.45359237;
/// lb/ft³ → kg/m³
pub const LB_FT3_TO_KG_M3: f64 = LB_TO_KG / FT3_TO_M3;
/// lbCO2e/ft² → kgCO2e/m²
pub const LBCO2_FT2_TO_KGCO2_M2: f64 = LB_TO_KG / FT2_TO_M2;

/// Imperial-to-metric factor per quantity kind. Immutable for the life of
/// the process.
pub const CONVERSION_FACTORS: [(QuantityKind, f64); 7] = [
    (QuantityKind::Area, QuantityKind::Area.factor()),
    (QuantityKind::Volume, QuantityKind::Volume.factor()),
    (QuantityKind::Energy, QuantityKind::Energy.factor()),
    (QuantityKind::Mass, QuantityKind::Mass.factor()),
    (QuantityKind::Density, QuantityKind::Density.factor()),
    (QuantityKind::CarbonMass, QuantityKind::CarbonMass.factor()),
    (QuantityKind::CarbonIntensity, QuantityKind::CarbonIntensity.factor()),
];

static KIND_NAMES: Lazy<HashMap<&'static str, QuantityKind>> = Lazy::new(|| {
    let mut names = HashMap::new();
    for kind in QuantityKind::ALL {
        names.insert(kind.name(), kind);
    }
    names.insert("carbon_mass", QuantityKind::CarbonMass);
    names.insert("carbonmass", QuantityKind::CarbonMass);
    names.insert("carbonintensity", QuantityKind::CarbonIntensity);
    names
});

impl QuantityKind {
    /// Resolve a kind name ("area", "carbon", "carbon_mass", ...).
    pub fn from_name(name: &str) -> Option<Self> {
        KIND_NAMES.get(name.trim().to_ascii_lowercase().as_str()).copied()
    }
}

// ============================================================================
// Converters
// ============================================================================

/// Converter for one quantity kind.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct QuantityConverter {
    kind: QuantityKind,
    factor: f64,
}

impl QuantityConverter {
    pub fn new(kind: QuantityKind) -> Self {
        QuantityConverter {
            kind,
            factor: kind.factor(),
        }
    }

    pub fn kind(&self) -> QuantityKind {
        self.kind
    }

    /// Imperial value to metric
    pub fn to_metric(&self, value: f64) -> f64 {
        value * self.factor
    }

    /// Metric value to imperial
    pub fn to_imperial(&self, value: f64) -> f64 {
        value / self.factor
    }

    /// Convert between any two systems (identity when they match)
    pub fn convert(&self, value: f64, from: UnitSystem, to: UnitSystem) -> f64 {
        match (from, to) {
            (UnitSystem::Imperial, UnitSystem::Metric) => self.to_metric(value),
            (UnitSystem::Metric, UnitSystem::Imperial) => self.to_imperial(value),
            _ => value,
        }
    }
}

/// Resolves quantity-kind names to converters.
///
/// Under [`NamePolicy::Lenient`] an unknown name is simply absent; under
/// [`NamePolicy::Strict`] [`UnitConversionService::resolve`] reports it as
/// [`CarbonError::UnknownUnitKind`].
#[derive(Debug, Clone, Copy, Default)]
pub struct UnitConversionService {
    policy: NamePolicy,
}

impl UnitConversionService {
    pub fn new() -> Self {
        UnitConversionService::default()
    }

    pub fn with_policy(policy: NamePolicy) -> Self {
        UnitConversionService { policy }
    }

    /// Converter for `kind`, or `None` if the name is not recognized.
    pub fn converter(&self, kind: &str) -> Option<QuantityConverter> {
        QuantityKind::from_name(kind).map(QuantityConverter::new)
    }

    /// Like [`converter`](Self::converter) but honours the name policy.
    pub fn resolve(&self, kind: &str) -> CarbonResult<Option<QuantityConverter>> {
        match self.converter(kind) {
            Some(converter) => Ok(Some(converter)),
            None => match self.policy {
                NamePolicy::Lenient => {
                    tracing::warn!(kind, "unknown unit kind ignored");
                    Ok(None)
                }
                NamePolicy::Strict => Err(CarbonError::unknown_unit_kind(kind)),
            },
        }
    }
}

// ============================================================================
// Typed Quantities
// ============================================================================

macro_rules! quantity {
    ($(#[$doc:meta])* $name:ident) => {
        $(#[$doc])*
        #[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Default, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub f64);

        impl Add for $name {
            type Output = Self;
            fn add(self, rhs: Self) -> Self::Output {
                Self(self.0 + rhs.0)
            }
        }

        impl Sub for $name {
            type Output = Self;
            fn sub(self, rhs: Self) -> Self::Output {
                Self(self.0 - rhs.0)
            }
        }

        impl Mul<f64> for $name {
            type Output = Self;
            fn mul(self, rhs: f64) -> Self::Output {
                Self(self.0 * rhs)
            }
        }

        impl Div<f64> for $name {
            type Output = Self;
            fn div(self, rhs: f64) -> Self::Output {
                Self(self.0 / rhs)
            }
        }

        impl $name {
            /// Get the raw f64 value
            pub fn value(self) -> f64 {
                self.0
            }

            /// Create from raw f64 value
            pub fn new(value: f64) -> Self {
                Self(value)
            }
        }
    };
}

macro_rules! convertible {
    ($metric:ident, $imperial:ident, $kind:expr) => {
        impl From<$imperial> for $metric {
            fn from(v: $imperial) -> Self {
                $metric(QuantityConverter::new($kind).to_metric(v.0))
            }
        }

        impl From<$metric> for $imperial {
            fn from(v: $metric) -> Self {
                $imperial(QuantityConverter::new($kind).to_imperial(v.0))
            }
        }
    };
}

quantity!(/// Area in square meters
    SquareMeters);
quantity!(/// Area in square feet
    SquareFeet);
quantity!(/// Volume in cubic meters
    CubicMeters);
quantity!(/// Volume in cubic feet
    CubicFeet);
quantity!(/// Energy in kilowatt-hours
    KilowattHours);
quantity!(/// Energy in thousands of British thermal units
    KiloBtu);
quantity!(/// Mass in kilograms
    Kilograms);
quantity!(/// Mass in pounds
    Pounds);
quantity!(/// Density in kg/m³
    KgPerCubicMeter);
quantity!(/// Density in lb/ft³
    LbPerCubicFoot);
quantity!(/// Carbon mass in kgCO2e
    KgCo2e);
quantity!(/// Carbon mass in lbCO2e
    LbCo2e);
quantity!(/// Carbon intensity in kgCO2e/m²
    KgCo2ePerSqM);
quantity!(/// Carbon intensity in lbCO2e/ft²
    LbCo2ePerSqFt);

convertible!(SquareMeters, SquareFeet, QuantityKind::Area);
convertible!(CubicMeters, CubicFeet, QuantityKind::Volume);
convertible!(KilowattHours, KiloBtu, QuantityKind::Energy);
convertible!(Kilograms, Pounds, QuantityKind::Mass);
convertible!(KgPerCubicMeter, LbPerCubicFoot, QuantityKind::Density);
convertible!(KgCo2e, LbCo2e, QuantityKind::CarbonMass);
convertible!(KgCo2ePerSqM, LbCo2ePerSqFt, QuantityKind::CarbonIntensity);
