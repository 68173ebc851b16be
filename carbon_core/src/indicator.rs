//! # Phase Indicator
//!
//! Global-warming-potential values of one material for each of the 17
//! life-cycle modules, plus the unit system the numbers are expressed in.
//!
//! Values are stored as a fixed array in canonical order (A1..A5, B1..B7,
//! C1..C4, D) so that every bulk operation touches all 17 values in a single
//! assignment.
//!
//! ## JSON Example
//!
//! ```json
//! {
//!   "unit_system": "Metric",
//!   "values": [120.0, 4.0, 30.0, 6.0, 2.0, 0.0, 1.0, 0.0, 0.0, 0.0, 0.0, 0.0,
//!              1.5, 0.8, 2.0, 0.4, 3.0]
//! }
//! ```

use serde::{Deserialize, Serialize};

use crate::errors::{CarbonError, CarbonResult};
use crate::phases::{Phase, PhaseGroup, PhaseSelection};
use crate::units::{QuantityConverter, QuantityKind, UnitSystem};

/// Number of life-cycle modules tracked per material
pub const PHASE_COUNT: usize = 17;

/// Magnitude rescaling applied uniformly to all 17 values.
///
/// Each step is a factor of 1000, the gap between the carbon-mass magnitudes
/// used in reporting (g, kg, t CO2e).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RescaleMode {
    /// One step down in magnitude, e.g. kgCO2e to tCO2e
    DivideBy1000,
    /// One step up in magnitude, e.g. tCO2e to kgCO2e
    MultiplyBy1000,
    /// Two chained steps down, e.g. gCO2e to kgCO2e to tCO2e. The division is
    /// applied twice.
    DivideBy1000Twice,
}

impl RescaleMode {
    /// Legacy numeric option code (1, 2, 3)
    pub fn from_code(code: u8) -> Option<Self> {
        match code {
            1 => Some(RescaleMode::DivideBy1000),
            2 => Some(RescaleMode::MultiplyBy1000),
            3 => Some(RescaleMode::DivideBy1000Twice),
            _ => None,
        }
    }

    /// Apply the mode to a single value
    pub fn apply(&self, value: f64) -> f64 {
        match self {
            RescaleMode::DivideBy1000 => value / 1000.0,
            RescaleMode::MultiplyBy1000 => value * 1000.0,
            RescaleMode::DivideBy1000Twice => value / 1000.0 / 1000.0,
        }
    }

    /// The mode that undoes this one, where one exists
    pub fn inverse(&self) -> Option<Self> {
        match self {
            RescaleMode::DivideBy1000 => Some(RescaleMode::MultiplyBy1000),
            RescaleMode::MultiplyBy1000 => Some(RescaleMode::DivideBy1000),
            RescaleMode::DivideBy1000Twice => None,
        }
    }
}

/// Per-phase emission values of one material.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PhaseIndicator {
    /// Unit system the values are expressed in
    #[serde(default)]
    pub unit_system: UnitSystem,

    /// Values in canonical phase order (see [`Phase::ALL`])
    pub values: [f64; PHASE_COUNT],
}

impl Default for PhaseIndicator {
    fn default() -> Self {
        PhaseIndicator::zeroed(UnitSystem::Metric)
    }
}

impl PhaseIndicator {
    /// Indicator with every phase set to zero
    pub fn zeroed(unit_system: UnitSystem) -> Self {
        PhaseIndicator {
            unit_system,
            values: [0.0; PHASE_COUNT],
        }
    }

    /// Metric indicator from values in canonical order
    pub fn from_values(values: [f64; PHASE_COUNT]) -> Self {
        PhaseIndicator {
            unit_system: UnitSystem::Metric,
            values,
        }
    }

    /// Builder-style setter for a single phase
    pub fn with(mut self, phase: Phase, value: f64) -> Self {
        self.set_value(phase, value);
        self
    }

    pub fn value(&self, phase: Phase) -> f64 {
        self.values[phase.index()]
    }

    pub fn set_value(&mut self, phase: Phase, value: f64) {
        self.values[phase.index()] = value;
    }

    /// Check that every value is a finite, non-negative magnitude.
    pub fn validate(&self) -> CarbonResult<()> {
        for phase in Phase::ALL {
            let value = self.value(phase);
            if !value.is_finite() || value < 0.0 {
                return Err(CarbonError::invalid_input(
                    phase.code(),
                    value.to_string(),
                    "Phase values must be finite and non-negative",
                ));
            }
        }
        Ok(())
    }

    /// Sum of the values in one phase group
    pub fn group_total(&self, group: PhaseGroup) -> f64 {
        group.phases().map(|phase| self.value(phase)).sum()
    }

    /// A1 + A2 + A3 + A4 + A5
    pub fn sum_construction_phase(&self) -> f64 {
        self.group_total(PhaseGroup::Construction)
    }

    /// B1 through B7
    pub fn sum_use_phase(&self) -> f64 {
        self.group_total(PhaseGroup::Use)
    }

    /// C1 through C4
    pub fn sum_end_of_life_phase(&self) -> f64 {
        self.group_total(PhaseGroup::EndOfLife)
    }

    /// Module D
    pub fn recovery(&self) -> f64 {
        self.value(Phase::D)
    }

    /// Sum over the selected phase groups
    pub fn selected_total(&self, selection: &PhaseSelection) -> f64 {
        selection.groups().map(|group| self.group_total(group)).sum()
    }

    /// All three phase-group totals plus recovery
    pub fn whole_life_total(&self) -> f64 {
        self.sum_construction_phase()
            + self.sum_use_phase()
            + self.sum_end_of_life_phase()
            + self.recovery()
    }

    /// The 17 values in canonical order, for reporting and export
    pub fn all_phases(&self) -> Vec<f64> {
        self.values.to_vec()
    }

    /// Scale every value by `mode` and record `target` as the unit system.
    ///
    /// All 17 values are replaced in one assignment.
    pub fn rescale(&mut self, target: UnitSystem, mode: RescaleMode) {
        self.values = self.values.map(|value| mode.apply(value));
        self.unit_system = target;
    }

    /// Convert the values between lbCO2e and kgCO2e. No-op when the
    /// indicator is already in `target`.
    pub fn convert_unit_system(&mut self, target: UnitSystem) {
        if self.unit_system == target {
            return;
        }
        let converter = QuantityConverter::new(QuantityKind::CarbonMass);
        let from = self.unit_system;
        self.values = self.values.map(|value| converter.convert(value, from, target));
        self.unit_system = target;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> PhaseIndicator {
        let mut values = [0.0; PHASE_COUNT];
        for (i, v) in values.iter_mut().enumerate() {
            *v = (i + 1) as f64 * 1.25;
        }
        PhaseIndicator::from_values(values)
    }

    #[test]
    fn test_group_sums() {
        let ind = sample();
        // A1..A5 = 1.25 * (1+2+3+4+5)
        assert!((ind.sum_construction_phase() - 18.75).abs() < 1e-12);
        // B1..B7 = 1.25 * (6+..+12) = 1.25 * 63
        assert!((ind.sum_use_phase() - 78.75).abs() < 1e-12);
        // C1..C4 = 1.25 * (13+14+15+16)
        assert!((ind.sum_end_of_life_phase() - 72.5).abs() < 1e-12);
        assert_eq!(ind.recovery(), 21.25);
    }

    #[test]
    fn test_whole_life_total() {
        let ind = sample();
        let expected: f64 = ind.values.iter().sum();
        assert!((ind.whole_life_total() - expected).abs() < 1e-9);
    }

    #[test]
    fn test_all_phases_order() {
        let ind = PhaseIndicator::default()
            .with(Phase::A1, 1.0)
            .with(Phase::B6, 2.0)
            .with(Phase::D, 3.0);
        let all = ind.all_phases();
        assert_eq!(all.len(), 17);
        assert_eq!(all[0], 1.0);
        assert_eq!(all[10], 2.0);
        assert_eq!(all[16], 3.0);
    }

    #[test]
    fn test_rescale_inverse_restores_values() {
        let original = sample();
        let mut ind = original.clone();
        ind.rescale(UnitSystem::Metric, RescaleMode::DivideBy1000);
        assert_eq!(ind.value(Phase::A1), 0.00125);
        ind.rescale(UnitSystem::Metric, RescaleMode::MultiplyBy1000);
        assert_eq!(ind.values, original.values);
    }

    #[test]
    fn test_rescale_twice_divides_twice() {
        let mut ind = PhaseIndicator::default().with(Phase::A3, 5_000_000.0);
        ind.rescale(UnitSystem::Imperial, RescaleMode::DivideBy1000Twice);
        assert_eq!(ind.value(Phase::A3), 5.0);
        assert_eq!(ind.unit_system, UnitSystem::Imperial);
    }

    #[test]
    fn test_rescale_mode_codes() {
        assert_eq!(RescaleMode::from_code(1), Some(RescaleMode::DivideBy1000));
        assert_eq!(RescaleMode::from_code(3), Some(RescaleMode::DivideBy1000Twice));
        assert_eq!(RescaleMode::from_code(4), None);
        assert_eq!(RescaleMode::DivideBy1000.inverse(), Some(RescaleMode::MultiplyBy1000));
        assert_eq!(RescaleMode::DivideBy1000Twice.inverse(), None);
    }

    #[test]
    fn test_convert_unit_system() {
        let mut ind = PhaseIndicator::default().with(Phase::A1, 1.0);
        ind.convert_unit_system(UnitSystem::Imperial);
        assert!((ind.value(Phase::A1) - 2.20462).abs() < 1e-5);
        assert_eq!(ind.unit_system, UnitSystem::Imperial);

        ind.convert_unit_system(UnitSystem::Imperial);
        assert!((ind.value(Phase::A1) - 2.20462).abs() < 1e-5);

        ind.convert_unit_system(UnitSystem::Metric);
        assert!((ind.value(Phase::A1) - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_validate() {
        assert!(sample().validate().is_ok());
        let bad = PhaseIndicator::default().with(Phase::C2, -1.0);
        assert_eq!(bad.validate().unwrap_err().error_code(), "INVALID_INPUT");
        let nan = PhaseIndicator::default().with(Phase::B1, f64::NAN);
        assert!(nan.validate().is_err());
    }

    #[test]
    fn test_selected_total() {
        let ind = sample();
        let selection = PhaseSelection::none().with(PhaseGroup::Use).with(PhaseGroup::Recovery);
        assert!((ind.selected_total(&selection) - (78.75 + 21.25)).abs() < 1e-12);
        assert_eq!(ind.selected_total(&PhaseSelection::none()), 0.0);
    }

    #[test]
    fn test_serialization() {
        let ind = sample();
        let json = serde_json::to_string(&ind).unwrap();
        let roundtrip: PhaseIndicator = serde_json::from_str(&json).unwrap();
        assert_eq!(ind, roundtrip);
    }
}
