//! Material: a named product with its per-phase emission indicator.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{validate_name, EntityKind};
use crate::calculator::CarbonCalculator;
use crate::errors::{CarbonError, CarbonResult};
use crate::indicator::{PhaseIndicator, RescaleMode};
use crate::phases::PhaseSelection;
use crate::units::UnitSystem;

/// A building material.
///
/// The indicator is not optional: a material cannot be built without one,
/// and a stored material missing its indicator fails to load.
///
/// ## JSON Example
///
/// ```json
/// {
///   "id": "8f1c2e9a-5b0d-4c61-9f7e-2a3b4c5d6e7f",
///   "name": "Concrete C30/37",
///   "indicator": { "unit_system": "Metric", "values": [ ... 17 values ... ] },
///   "assembly_ids": []
/// }
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Material {
    pub id: Uuid,

    /// Unique across all materials
    pub name: String,

    indicator: PhaseIndicator,

    /// Assemblies referencing this material (navigational only)
    #[serde(default)]
    pub assembly_ids: BTreeSet<Uuid>,
}

impl Material {
    /// Create a material with a fresh id.
    pub fn new(name: impl Into<String>, indicator: PhaseIndicator) -> CarbonResult<Self> {
        Material::with_id(Uuid::new_v4(), name, indicator)
    }

    /// Create a material with a known id.
    pub fn with_id(id: Uuid, name: impl Into<String>, indicator: PhaseIndicator) -> CarbonResult<Self> {
        let name = name.into();
        validate_name(EntityKind::Material, &name)?;
        indicator.validate()?;
        Ok(Material {
            id,
            name,
            indicator,
            assembly_ids: BTreeSet::new(),
        })
    }

    /// Build a material from separately loaded parts, e.g. a material row and
    /// an indicator row that may be missing.
    pub fn from_loaded(id: Uuid, name: impl Into<String>, indicator: Option<PhaseIndicator>) -> CarbonResult<Self> {
        let name = name.into();
        match indicator {
            Some(indicator) => Material::with_id(id, name, indicator),
            None => Err(CarbonError::missing_indicator(name)),
        }
    }

    pub fn indicator(&self) -> &PhaseIndicator {
        &self.indicator
    }

    /// Direct access for field assignment
    pub fn indicator_mut(&mut self) -> &mut PhaseIndicator {
        &mut self.indicator
    }

    pub fn rescale(&mut self, target: UnitSystem, mode: RescaleMode) {
        self.indicator.rescale(target, mode);
    }

    /// Copy of this material with its indicator rescaled
    pub fn rescaled(&self, target: UnitSystem, mode: RescaleMode) -> Material {
        let mut copy = self.clone();
        copy.rescale(target, mode);
        copy
    }
}

impl CarbonCalculator for Material {
    fn compute_whole_life_carbon(&self) -> f64 {
        self.indicator.whole_life_total()
    }

    fn carbon_for_selection(&self, selection: &PhaseSelection) -> f64 {
        self.indicator.selected_total(selection)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::indicator::PHASE_COUNT;
    use crate::phases::Phase;

    fn concrete() -> Material {
        let mut values = [0.0; PHASE_COUNT];
        for (i, v) in values.iter_mut().enumerate() {
            *v = (i as f64) * 0.5 + 1.0;
        }
        Material::new("Concrete", PhaseIndicator::from_values(values)).unwrap()
    }

    #[test]
    fn test_zero_indicator_is_zero_carbon() {
        let m = Material::new("Air", PhaseIndicator::default()).unwrap();
        assert_eq!(m.compute_whole_life_carbon(), 0.0);
        assert_eq!(m.calculate_carbon_for_phase(&["construction", "use"]), 0.0);
    }

    #[test]
    fn test_phase_partition() {
        let m = concrete();
        let partial = m.calculate_carbon_for_phase(&["construction", "use", "endOfLife"]);
        let whole = m.compute_whole_life_carbon();
        assert!((partial + m.indicator().recovery() - whole).abs() < 1e-9);
    }

    #[test]
    fn test_unknown_phase_contributes_zero() {
        let m = concrete();
        let with_unknown = m.calculate_carbon_for_phase(&["use", "bogus"]);
        assert_eq!(with_unknown, m.indicator().sum_use_phase());
        assert_eq!(m.calculate_carbon_for_phase(&[]), 0.0);
    }

    #[test]
    fn test_duplicate_phase_counts_once() {
        let m = concrete();
        assert_eq!(
            m.calculate_carbon_for_phase(&["use", "use"]),
            m.indicator().sum_use_phase()
        );
    }

    #[test]
    fn test_missing_indicator() {
        let err = Material::from_loaded(Uuid::new_v4(), "Ghost", None).unwrap_err();
        assert_eq!(err, CarbonError::missing_indicator("Ghost"));

        let ok = Material::from_loaded(Uuid::new_v4(), "Real", Some(PhaseIndicator::default()));
        assert!(ok.is_ok());
    }

    #[test]
    fn test_missing_indicator_fails_to_deserialize() {
        let json = format!(r#"{{"id":"{}","name":"Ghost"}}"#, Uuid::new_v4());
        assert!(serde_json::from_str::<Material>(&json).is_err());
    }

    #[test]
    fn test_invalid_inputs() {
        assert!(Material::new("  ", PhaseIndicator::default()).is_err());
        let negative = PhaseIndicator::default().with(Phase::A2, -3.0);
        assert!(Material::new("Bad", negative).is_err());
    }

    #[test]
    fn test_rescaled_copy() {
        let m = Material::new("Steel", PhaseIndicator::default().with(Phase::A1, 2000.0)).unwrap();
        let t = m.rescaled(UnitSystem::Metric, RescaleMode::DivideBy1000);
        assert_eq!(t.indicator().value(Phase::A1), 2.0);
        assert_eq!(m.indicator().value(Phase::A1), 2000.0);
        assert_eq!(t.id, m.id);
    }

    #[test]
    fn test_serialization() {
        let m = concrete();
        let json = serde_json::to_string(&m).unwrap();
        let roundtrip: Material = serde_json::from_str(&json).unwrap();
        assert_eq!(m, roundtrip);
    }
}
