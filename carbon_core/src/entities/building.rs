//! Building: geometry, derived envelope areas and shared assemblies.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{validate_name, Assembly, EntityKind};
use crate::calculator::{sum_over, CarbonCalculator, EmbodiedCarbonCalculator};
use crate::envelope::{BuildingGeometry, EmbodiedBreakdown, EnvelopeAreas};
use crate::errors::{CarbonError, CarbonResult};
use crate::indicator::RescaleMode;
use crate::phases::PhaseSelection;
use crate::settings::EnvelopeFactors;
use crate::units::UnitSystem;

/// A building.
///
/// Envelope areas are not set directly: they are (re)derived from the
/// geometry by [`Building::derive_envelope_areas`] and overwritten on every
/// call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Building {
    pub id: Uuid,

    /// Unique across all buildings
    pub name: String,

    pub geometry: BuildingGeometry,

    /// Parameters for the envelope estimate
    #[serde(default)]
    pub envelope_factors: EnvelopeFactors,

    /// Last derived envelope areas
    #[serde(default)]
    envelope: Option<EnvelopeAreas>,

    /// Assemblies, each held at most once
    #[serde(default)]
    assemblies: Vec<Arc<Assembly>>,
}

impl Building {
    pub fn new(name: impl Into<String>, geometry: BuildingGeometry) -> CarbonResult<Self> {
        Building::with_id(Uuid::new_v4(), name, geometry)
    }

    pub fn with_id(id: Uuid, name: impl Into<String>, geometry: BuildingGeometry) -> CarbonResult<Self> {
        let name = name.into();
        validate_name(EntityKind::Building, &name)?;
        Ok(Building {
            id,
            name,
            geometry,
            envelope_factors: EnvelopeFactors::default(),
            envelope: None,
            assemblies: Vec::new(),
        })
    }

    pub fn with_envelope_factors(mut self, factors: EnvelopeFactors) -> Self {
        self.envelope_factors = factors;
        self
    }

    /// Restore previously derived areas (e.g. when loading a stored record)
    pub(crate) fn with_envelope(mut self, envelope: Option<EnvelopeAreas>) -> Self {
        self.envelope = envelope;
        self
    }

    /// Builder-style [`add_assembly`](Self::add_assembly)
    pub fn with_assembly(mut self, assembly: Arc<Assembly>) -> Self {
        self.add_assembly(assembly);
        self
    }

    /// Attach an assembly. Returns false if it was already attached.
    pub fn add_assembly(&mut self, assembly: Arc<Assembly>) -> bool {
        if self.assemblies.iter().any(|a| a.id == assembly.id) {
            return false;
        }
        self.assemblies.push(assembly);
        true
    }

    /// Detach an assembly without deleting it
    pub fn remove_assembly(&mut self, assembly_id: Uuid) -> Option<Arc<Assembly>> {
        let pos = self.assemblies.iter().position(|a| a.id == assembly_id)?;
        Some(self.assemblies.remove(pos))
    }

    pub fn assemblies(&self) -> &[Arc<Assembly>] {
        &self.assemblies
    }

    /// Areas from the last derivation, if any
    pub fn envelope(&self) -> Option<&EnvelopeAreas> {
        self.envelope.as_ref()
    }

    /// Ground floor area × total storeys
    pub fn calculate_gfa(&self) -> f64 {
        self.geometry.calculate_gfa()
    }

    /// Derive the envelope areas from the geometry and store them,
    /// replacing any earlier values.
    ///
    /// Fails with [`CarbonError::InvalidGeometry`] before touching the stored
    /// areas when the geometry or aspect ratio is not positive.
    pub fn derive_envelope_areas(&mut self) -> CarbonResult<&EnvelopeAreas> {
        let areas = EnvelopeAreas::derive(&self.geometry, &self.envelope_factors)?;
        tracing::debug!(
            building = %self.name,
            facade = areas.facade_area,
            roof = areas.roof_area,
            "envelope areas derived"
        );
        Ok(&*self.envelope.insert(areas))
    }

    /// Embodied carbon from the stored envelope areas. Reads only.
    pub fn estimate_embodied_carbon(&self) -> CarbonResult<f64> {
        Ok(self.embodied_breakdown()?.total)
    }

    /// Per-element embodied carbon from the stored envelope areas
    pub fn embodied_breakdown(&self) -> CarbonResult<EmbodiedBreakdown> {
        let areas = self.envelope.as_ref().ok_or_else(|| CarbonError::EnvelopeNotDerived {
            building: self.name.clone(),
        })?;
        Ok(areas.embodied_breakdown(&self.envelope_factors))
    }

    /// Copy of this building with every material indicator in its subtree
    /// rescaled
    pub fn rescaled(&self, target: UnitSystem, mode: RescaleMode) -> Building {
        let mut copy = self.clone();
        copy.assemblies = self
            .assemblies
            .iter()
            .map(|a| Arc::new(a.rescaled(target, mode)))
            .collect();
        copy
    }
}

impl CarbonCalculator for Building {
    fn compute_whole_life_carbon(&self) -> f64 {
        sum_over(&self.assemblies, |a| a.compute_whole_life_carbon())
    }

    fn carbon_for_selection(&self, selection: &PhaseSelection) -> f64 {
        sum_over(&self.assemblies, |a| a.carbon_for_selection(selection))
    }
}

impl EmbodiedCarbonCalculator for Building {
    /// [`derive_envelope_areas`](Building::derive_envelope_areas) followed by
    /// [`estimate_embodied_carbon`](Building::estimate_embodied_carbon).
    fn calculate_embodied_carbon(&mut self) -> CarbonResult<f64> {
        self.derive_envelope_areas()?;
        self.estimate_embodied_carbon()
    }
}
