//! # Carbon Calculator Contract
//!
//! The two operations every level of the building hierarchy answers:
//! whole-life carbon and carbon for a selection of phase groups. Materials
//! read their indicator; assemblies and buildings sum over their children
//! through [`sum_over`], so the recursion is written once.
//!
//! Nothing is cached. Every call walks the live graph.
//!
//! ## Example
//!
//! ```rust
//! use std::sync::Arc;
//! use carbon_core::calculator::CarbonCalculator;
//! use carbon_core::entities::{Assembly, Material};
//! use carbon_core::indicator::PhaseIndicator;
//! use carbon_core::phases::Phase;
//!
//! let concrete = Material::new(
//!     "Concrete C30/37",
//!     PhaseIndicator::default().with(Phase::A1, 100.0).with(Phase::C3, 5.0),
//! ).unwrap();
//!
//! let slab = Assembly::new("Ground slab").unwrap().with_material(Arc::new(concrete));
//! assert_eq!(slab.compute_whole_life_carbon(), 105.0);
//! assert_eq!(slab.calculate_carbon_for_phase(&["construction"]), 100.0);
//! ```

use std::sync::Arc;

use serde::Serialize;

use crate::entities::{Assembly, Building, Material};
use crate::errors::CarbonResult;
use crate::phases::PhaseSelection;
use crate::settings::NamePolicy;

/// Whole-life and phase-filtered carbon of an entity and its descendants.
pub trait CarbonCalculator {
    /// Sum of all phase groups, recovery included
    fn compute_whole_life_carbon(&self) -> f64;

    /// Sum of the selected phase groups
    fn carbon_for_selection(&self, selection: &PhaseSelection) -> f64;

    /// Sum of the named phase groups. Unrecognized names contribute zero.
    fn calculate_carbon_for_phase(&self, phases: &[&str]) -> f64 {
        let selection = PhaseSelection::from_names(phases, NamePolicy::Lenient).unwrap_or_default();
        self.carbon_for_selection(&selection)
    }

    /// Sum of the named phase groups under an explicit name policy
    fn calculate_carbon_for_phase_with(&self, phases: &[&str], policy: NamePolicy) -> CarbonResult<f64> {
        let selection = PhaseSelection::from_names(phases, policy)?;
        Ok(self.carbon_for_selection(&selection))
    }
}

/// Envelope-based embodied carbon estimate.
///
/// Takes `&mut self` because the derived envelope areas are stored on the
/// entity.
pub trait EmbodiedCarbonCalculator {
    fn calculate_embodied_carbon(&mut self) -> CarbonResult<f64>;
}

/// Sum a capability over a collection of shared children.
pub fn sum_over<C, F>(children: &[Arc<C>], capability: F) -> f64
where
    F: Fn(&C) -> f64,
{
    children.iter().map(|child| capability(child.as_ref())).sum()
}

impl<T: CarbonCalculator + ?Sized> CarbonCalculator for Arc<T> {
    fn compute_whole_life_carbon(&self) -> f64 {
        self.as_ref().compute_whole_life_carbon()
    }

    fn carbon_for_selection(&self, selection: &PhaseSelection) -> f64 {
        self.as_ref().carbon_for_selection(selection)
    }
}

/// Any level of the hierarchy, for mixed collections.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type")]
pub enum CarbonEntity {
    Material(Arc<Material>),
    Assembly(Arc<Assembly>),
    Building(Arc<Building>),
}

impl CarbonEntity {
    pub fn name(&self) -> &str {
        match self {
            CarbonEntity::Material(m) => &m.name,
            CarbonEntity::Assembly(a) => &a.name,
            CarbonEntity::Building(b) => &b.name,
        }
    }

    pub fn entity_type(&self) -> &'static str {
        match self {
            CarbonEntity::Material(_) => "Material",
            CarbonEntity::Assembly(_) => "Assembly",
            CarbonEntity::Building(_) => "Building",
        }
    }
}

impl CarbonCalculator for CarbonEntity {
    fn compute_whole_life_carbon(&self) -> f64 {
        match self {
            CarbonEntity::Material(m) => m.compute_whole_life_carbon(),
            CarbonEntity::Assembly(a) => a.compute_whole_life_carbon(),
            CarbonEntity::Building(b) => b.compute_whole_life_carbon(),
        }
    }

    fn carbon_for_selection(&self, selection: &PhaseSelection) -> f64 {
        match self {
            CarbonEntity::Material(m) => m.carbon_for_selection(selection),
            CarbonEntity::Assembly(a) => a.carbon_for_selection(selection),
            CarbonEntity::Building(b) => b.carbon_for_selection(selection),
        }
    }
}

impl From<Material> for CarbonEntity {
    fn from(m: Material) -> Self {
        CarbonEntity::Material(Arc::new(m))
    }
}

impl From<Assembly> for CarbonEntity {
    fn from(a: Assembly) -> Self {
        CarbonEntity::Assembly(Arc::new(a))
    }
}

impl From<Building> for CarbonEntity {
    fn from(b: Building) -> Self {
        CarbonEntity::Building(Arc::new(b))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::indicator::PhaseIndicator;
    use crate::phases::Phase;

    fn material(name: &str, a1: f64, d: f64) -> Arc<Material> {
        Arc::new(
            Material::new(name, PhaseIndicator::default().with(Phase::A1, a1).with(Phase::D, d)).unwrap(),
        )
    }

    #[test]
    fn test_sum_over() {
        let children = vec![material("a", 1.0, 0.0), material("b", 2.0, 0.5)];
        assert_eq!(sum_over(&children, |m| m.compute_whole_life_carbon()), 3.5);
        let empty: Vec<Arc<Material>> = Vec::new();
        assert_eq!(sum_over(&empty, |m| m.compute_whole_life_carbon()), 0.0);
    }

    #[test]
    fn test_entity_dispatch() {
        let mat = material("steel", 10.0, 1.0);
        let assembly = Assembly::new("frame").unwrap().with_material(mat.clone());

        let entities = vec![CarbonEntity::Material(mat), CarbonEntity::from(assembly)];
        let total: f64 = entities.iter().map(|e| e.compute_whole_life_carbon()).sum();
        assert_eq!(total, 22.0);
        assert_eq!(entities[1].entity_type(), "Assembly");
        assert_eq!(entities[1].name(), "frame");
    }

    #[test]
    fn test_phase_policies() {
        let mat = material("timber", 4.0, 2.0);
        assert_eq!(mat.calculate_carbon_for_phase(&["construction", "operational"]), 4.0);
        assert!(mat
            .calculate_carbon_for_phase_with(&["construction", "operational"], NamePolicy::Strict)
            .is_err());
        assert_eq!(
            mat.calculate_carbon_for_phase_with(&["recovery"], NamePolicy::Strict).unwrap(),
            2.0
        );
    }

    #[test]
    fn test_arc_forwarding() {
        let mat = material("glass", 3.0, 0.0);
        fn total<T: CarbonCalculator>(t: &T) -> f64 {
            t.compute_whole_life_carbon()
        }
        assert_eq!(total(&mat), 3.0);
    }
}
