//! # Envelope Estimation
//!
//! Estimates embodied carbon of a building envelope from a handful of
//! geometric inputs instead of a material take-off.
//!
//! ## Method
//!
//! 1. Footprint as a rectangle of area `A` and aspect ratio `r`:
//!    `width = √(A·r)`, `depth = A / width`, `perimeter = 2(width + depth)`
//! 2. `facade = perimeter × floor-to-floor height × above-ground floors`
//! 3. `glazing = facade × WWR`, `cladding = facade × (1 − WWR)`,
//!    `roof = ground floor area`
//! 4. `embodied = cladding × f_cladding + facade × f_facade + roof × f_roof`
//!
//! The facade factor applies to the whole facade area, so glazed and clad
//! portions both carry it.
//!
//! ## Example
//!
//! ```rust
//! use carbon_core::envelope::{BuildingGeometry, EnvelopeAreas};
//! use carbon_core::settings::EnvelopeFactors;
//!
//! let geometry = BuildingGeometry {
//!     gross_floor_area: 3000.0,
//!     floor_to_floor_height: 4.0,
//!     ground_floor_area: 1000.0,
//!     window_to_wall_ratio: 0.4,
//!     above_ground_floor_count: 2,
//!     below_ground_floor_count: 1,
//! };
//!
//! let factors = EnvelopeFactors::default();
//! let areas = EnvelopeAreas::derive(&geometry, &factors).unwrap();
//! assert!((areas.perimeter - 134.164).abs() < 0.001);
//! assert_eq!(areas.roof_area, 1000.0);
//! ```

use serde::{Deserialize, Serialize};

use crate::errors::{CarbonError, CarbonResult};
use crate::settings::EnvelopeFactors;

/// Geometric inputs of a building (metric: m, m²).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BuildingGeometry {
    /// Gross floor area (m²)
    pub gross_floor_area: f64,

    /// Floor-to-floor height (m)
    pub floor_to_floor_height: f64,

    /// Ground floor footprint area (m²)
    pub ground_floor_area: f64,

    /// Window-to-wall ratio, 0.0 to 1.0
    pub window_to_wall_ratio: f64,

    /// Storeys above ground
    pub above_ground_floor_count: u32,

    /// Storeys below ground
    #[serde(default)]
    pub below_ground_floor_count: u32,
}

impl BuildingGeometry {
    /// Check the preconditions of envelope derivation.
    pub fn validate(&self) -> CarbonResult<()> {
        if !(self.ground_floor_area.is_finite() && self.ground_floor_area > 0.0) {
            return Err(CarbonError::invalid_geometry(
                "ground_floor_area",
                self.ground_floor_area.to_string(),
                "Ground floor area must be positive",
            ));
        }
        if !(self.floor_to_floor_height.is_finite() && self.floor_to_floor_height > 0.0) {
            return Err(CarbonError::invalid_geometry(
                "floor_to_floor_height",
                self.floor_to_floor_height.to_string(),
                "Floor-to-floor height must be positive",
            ));
        }
        if !(0.0..=1.0).contains(&self.window_to_wall_ratio) {
            return Err(CarbonError::invalid_geometry(
                "window_to_wall_ratio",
                self.window_to_wall_ratio.to_string(),
                "Window-to-wall ratio must be between 0 and 1",
            ));
        }
        if self.above_ground_floor_count == 0 {
            return Err(CarbonError::invalid_geometry(
                "above_ground_floor_count",
                "0",
                "At least one storey above ground is required",
            ));
        }
        if !(self.gross_floor_area.is_finite() && self.gross_floor_area >= 0.0) {
            return Err(CarbonError::invalid_geometry(
                "gross_floor_area",
                self.gross_floor_area.to_string(),
                "Gross floor area cannot be negative",
            ));
        }
        Ok(())
    }

    /// Ground floor area × total storey count
    pub fn calculate_gfa(&self) -> f64 {
        self.ground_floor_area
            * (self.above_ground_floor_count + self.below_ground_floor_count) as f64
    }
}

/// Perimeter of a rectangular footprint with the given area and aspect ratio.
pub fn footprint_perimeter(area: f64, aspect_ratio: f64) -> CarbonResult<f64> {
    if !(area.is_finite() && area > 0.0) {
        return Err(CarbonError::invalid_geometry(
            "ground_floor_area",
            area.to_string(),
            "Footprint area must be positive",
        ));
    }
    if !(aspect_ratio.is_finite() && aspect_ratio > 0.0) {
        return Err(CarbonError::invalid_geometry(
            "aspect_ratio",
            aspect_ratio.to_string(),
            "Aspect ratio must be positive",
        ));
    }
    let width = (area * aspect_ratio).sqrt();
    let depth = area / width;
    Ok(2.0 * (width + depth))
}

/// Envelope areas derived from [`BuildingGeometry`] (m, m²).
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct EnvelopeAreas {
    pub perimeter: f64,
    pub facade_area: f64,
    pub glazing_area: f64,
    pub cladding_area: f64,
    pub roof_area: f64,
}

impl EnvelopeAreas {
    pub fn derive(geometry: &BuildingGeometry, factors: &EnvelopeFactors) -> CarbonResult<Self> {
        geometry.validate()?;
        let perimeter = footprint_perimeter(geometry.ground_floor_area, factors.aspect_ratio)?;
        let facade_area =
            perimeter * geometry.floor_to_floor_height * geometry.above_ground_floor_count as f64;
        let wwr = geometry.window_to_wall_ratio;

        Ok(EnvelopeAreas {
            perimeter,
            facade_area,
            glazing_area: facade_area * wwr,
            cladding_area: facade_area * (1.0 - wwr),
            roof_area: geometry.ground_floor_area,
        })
    }

    /// Embodied carbon contributions per envelope element (kgCO2e)
    pub fn embodied_breakdown(&self, factors: &EnvelopeFactors) -> EmbodiedBreakdown {
        let cladding = self.cladding_area * factors.cladding_kgco2_m2;
        let facade = self.facade_area * factors.facade_kgco2_m2;
        let roof = self.roof_area * factors.roof_kgco2_m2;
        EmbodiedBreakdown {
            cladding,
            facade,
            roof,
            total: cladding + facade + roof,
        }
    }

    /// Total embodied carbon of the envelope (kgCO2e)
    pub fn embodied_carbon(&self, factors: &EnvelopeFactors) -> f64 {
        self.embodied_breakdown(factors).total
    }
}

/// Embodied carbon per envelope element (kgCO2e).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EmbodiedBreakdown {
    pub cladding: f64,
    pub facade: f64,
    pub roof: f64,
    pub total: f64,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn reference_geometry() -> BuildingGeometry {
        BuildingGeometry {
            gross_floor_area: 3000.0,
            floor_to_floor_height: 4.0,
            ground_floor_area: 1000.0,
            window_to_wall_ratio: 0.4,
            above_ground_floor_count: 2,
            below_ground_floor_count: 1,
        }
    }

    #[test]
    fn test_perimeter() {
        // width = √2000 = 44.721, depth = 22.361
        let p = footprint_perimeter(1000.0, 2.0).unwrap();
        assert!((p - 134.164).abs() < 0.001);

        // square footprint
        let p = footprint_perimeter(100.0, 1.0).unwrap();
        assert!((p - 40.0).abs() < 1e-9);
    }

    #[test]
    fn test_perimeter_preconditions() {
        assert!(footprint_perimeter(0.0, 2.0).unwrap_err().is_precondition_violation());
        assert!(footprint_perimeter(-10.0, 2.0).unwrap_err().is_precondition_violation());
        assert!(footprint_perimeter(1000.0, 0.0).unwrap_err().is_precondition_violation());
        assert!(footprint_perimeter(f64::NAN, 2.0).is_err());
    }

    #[test]
    fn test_derived_areas() {
        let areas = EnvelopeAreas::derive(&reference_geometry(), &EnvelopeFactors::default()).unwrap();
        assert!((areas.facade_area - 1073.313).abs() < 0.001);
        assert!((areas.glazing_area - 429.325).abs() < 0.001);
        assert!((areas.cladding_area - 643.988).abs() < 0.001);
        assert_eq!(areas.roof_area, 1000.0);
        assert!((areas.glazing_area + areas.cladding_area - areas.facade_area).abs() < 1e-9);
    }

    #[test]
    fn test_embodied_carbon() {
        let factors = EnvelopeFactors::default();
        let areas = EnvelopeAreas::derive(&reference_geometry(), &factors).unwrap();
        let breakdown = areas.embodied_breakdown(&factors);
        // 643.988 × 8.8 + 1073.313 × 13.6 + 1000 × 7.7
        assert!((breakdown.cladding - 5667.091).abs() < 0.01);
        assert!((breakdown.facade - 14597.052).abs() < 0.01);
        assert_eq!(breakdown.roof, 7700.0);
        assert!((areas.embodied_carbon(&factors) - 27964.142).abs() < 0.01);
    }

    #[test]
    fn test_invalid_geometry() {
        let factors = EnvelopeFactors::default();

        let mut g = reference_geometry();
        g.ground_floor_area = 0.0;
        let err = EnvelopeAreas::derive(&g, &factors).unwrap_err();
        assert_eq!(err.error_code(), "INVALID_GEOMETRY");

        let mut g = reference_geometry();
        g.window_to_wall_ratio = 1.5;
        assert!(EnvelopeAreas::derive(&g, &factors).is_err());

        let mut g = reference_geometry();
        g.floor_to_floor_height = -3.0;
        assert!(EnvelopeAreas::derive(&g, &factors).is_err());

        let mut g = reference_geometry();
        g.above_ground_floor_count = 0;
        assert!(EnvelopeAreas::derive(&g, &factors).is_err());
    }

    #[test]
    fn test_gfa() {
        let g = reference_geometry();
        assert_eq!(g.calculate_gfa(), 3000.0);
    }
}
