//! Assembly: a named build-up of shared materials.

use std::collections::BTreeSet;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{validate_name, EntityKind, Material};
use crate::calculator::{sum_over, CarbonCalculator};
use crate::errors::CarbonResult;
use crate::indicator::RescaleMode;
use crate::phases::PhaseSelection;
use crate::units::UnitSystem;

/// An assembly of materials (wall build-up, slab, roof, ...).
///
/// Its carbon is always the sum over its current materials.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Assembly {
    pub id: Uuid,

    /// Unique across all assemblies
    pub name: String,

    /// Materials, each held at most once
    #[serde(default)]
    materials: Vec<Arc<Material>>,

    /// Buildings referencing this assembly (navigational only)
    #[serde(default)]
    pub building_ids: BTreeSet<Uuid>,
}

impl Assembly {
    pub fn new(name: impl Into<String>) -> CarbonResult<Self> {
        Assembly::with_id(Uuid::new_v4(), name)
    }

    pub fn with_id(id: Uuid, name: impl Into<String>) -> CarbonResult<Self> {
        let name = name.into();
        validate_name(EntityKind::Assembly, &name)?;
        Ok(Assembly {
            id,
            name,
            materials: Vec::new(),
            building_ids: BTreeSet::new(),
        })
    }

    /// Builder-style [`add_material`](Self::add_material)
    pub fn with_material(mut self, material: Arc<Material>) -> Self {
        self.add_material(material);
        self
    }

    /// Attach a material. Returns false if it was already attached.
    pub fn add_material(&mut self, material: Arc<Material>) -> bool {
        if self.contains_material(material.id) {
            return false;
        }
        self.materials.push(material);
        true
    }

    /// Detach a material. The material itself lives on with its other holders.
    pub fn remove_material(&mut self, material_id: Uuid) -> Option<Arc<Material>> {
        let pos = self.materials.iter().position(|m| m.id == material_id)?;
        Some(self.materials.remove(pos))
    }

    pub fn contains_material(&self, material_id: Uuid) -> bool {
        self.materials.iter().any(|m| m.id == material_id)
    }

    pub fn materials(&self) -> &[Arc<Material>] {
        &self.materials
    }

    /// Copy of this assembly with every material's indicator rescaled.
    ///
    /// Other holders of the shared materials keep the original values.
    pub fn rescaled(&self, target: UnitSystem, mode: RescaleMode) -> Assembly {
        Assembly {
            id: self.id,
            name: self.name.clone(),
            materials: self
                .materials
                .iter()
                .map(|m| Arc::new(m.rescaled(target, mode)))
                .collect(),
            building_ids: self.building_ids.clone(),
        }
    }
}

impl CarbonCalculator for Assembly {
    fn compute_whole_life_carbon(&self) -> f64 {
        sum_over(&self.materials, |m| m.compute_whole_life_carbon())
    }

    fn carbon_for_selection(&self, selection: &PhaseSelection) -> f64 {
        sum_over(&self.materials, |m| m.carbon_for_selection(selection))
    }
}
