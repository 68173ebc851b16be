//! # Inventory
//!
//! The `Inventory` is the root container for a carbon study: every material,
//! assembly and building, the links between them, and the study settings.
//! Inventories serialize to human-readable JSON (see [`crate::file_io`]).
//!
//! ## Structure
//!
//! ```text
//! Inventory
//! ├── meta: InventoryMetadata (schema version, name, timestamps)
//! ├── settings: CarbonSettings (unit system, name policy, envelope factors)
//! ├── materials: HashMap<Uuid, Material>
//! ├── assemblies: HashMap<Uuid, AssemblyRecord>
//! └── buildings: HashMap<Uuid, BuildingRecord>
//! ```
//!
//! Records hold ids, not objects. [`Inventory::hydrate_building`] and friends
//! build the shared calculator graph on demand; within one hydration a
//! material used by several assemblies is a single `Arc`.
//!
//! ## Example
//!
//! ```rust
//! use carbon_core::entities::EntityRef;
//! use carbon_core::indicator::PhaseIndicator;
//! use carbon_core::inventory::Inventory;
//! use carbon_core::phases::Phase;
//!
//! let mut inventory = Inventory::new("Riverside offices");
//! let brick = inventory
//!     .create_material("Brick", PhaseIndicator::default().with(Phase::A3, 20.0))
//!     .unwrap();
//! let wall = inventory.create_assembly("Cavity wall").unwrap();
//! inventory.attach_material(wall, brick).unwrap();
//!
//! assert_eq!(inventory.whole_life_carbon(EntityRef::assembly(wall)).unwrap(), 20.0);
//! ```

use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::calculator::{CarbonCalculator, EmbodiedCarbonCalculator};
use crate::entities::{validate_name, Assembly, Building, EntityKind, EntityRef, Material};
use crate::envelope::{BuildingGeometry, EnvelopeAreas};
use crate::errors::{CarbonError, CarbonResult};
use crate::indicator::PhaseIndicator;
use crate::phases::PhaseSelection;
use crate::settings::CarbonSettings;

/// Current schema version for inventory files
pub const SCHEMA_VERSION: &str = "0.1.0";

/// Root inventory container.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Inventory {
    pub meta: InventoryMetadata,

    #[serde(default)]
    pub settings: CarbonSettings,

    #[serde(default)]
    pub materials: HashMap<Uuid, Material>,

    #[serde(default)]
    pub assemblies: HashMap<Uuid, AssemblyRecord>,

    #[serde(default)]
    pub buildings: HashMap<Uuid, BuildingRecord>,
}

/// Inventory metadata stored in the file header.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InventoryMetadata {
    /// Schema version (for migration compatibility)
    pub version: String,

    /// Study or project name
    #[serde(default)]
    pub name: String,

    pub created: DateTime<Utc>,
    pub modified: DateTime<Utc>,
}

/// Stored assembly: materials by id, in attachment order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssemblyRecord {
    pub id: Uuid,
    pub name: String,

    #[serde(default)]
    pub material_ids: Vec<Uuid>,

    #[serde(default)]
    pub building_ids: BTreeSet<Uuid>,
}

/// Stored building: geometry, last derived envelope and assemblies by id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BuildingRecord {
    pub id: Uuid,
    pub name: String,
    pub geometry: BuildingGeometry,

    #[serde(default)]
    pub envelope: Option<EnvelopeAreas>,

    #[serde(default)]
    pub assembly_ids: Vec<Uuid>,
}

impl Inventory {
    /// Create a new empty inventory with default settings.
    pub fn new(name: impl Into<String>) -> Self {
        let now = Utc::now();
        Inventory {
            meta: InventoryMetadata {
                version: SCHEMA_VERSION.to_string(),
                name: name.into(),
                created: now,
                modified: now,
            },
            settings: CarbonSettings::default(),
            materials: HashMap::new(),
            assemblies: HashMap::new(),
            buildings: HashMap::new(),
        }
    }

    /// Update the modified timestamp.
    pub fn touch(&mut self) {
        self.meta.modified = Utc::now();
    }

    pub fn entity_count(&self) -> usize {
        self.materials.len() + self.assemblies.len() + self.buildings.len()
    }

    /// Check stored content against the rules the creation paths enforce:
    /// named entities with unique names per kind, valid indicators and
    /// geometry, links that resolve, and back-references that agree with
    /// them.
    pub fn validate(&self) -> CarbonResult<()> {
        let mut names = BTreeSet::new();
        for (key, material) in &self.materials {
            check_record(EntityKind::Material, *key, material.id, &material.name, &mut names)?;
            material.indicator().validate()?;
            for assembly_id in &material.assembly_ids {
                let linked = self
                    .assemblies
                    .get(assembly_id)
                    .is_some_and(|a| a.material_ids.contains(key));
                if !linked {
                    return Err(dangling(EntityKind::Material, &material.name, "assembly_ids", *assembly_id));
                }
            }
        }

        names.clear();
        for (key, record) in &self.assemblies {
            check_record(EntityKind::Assembly, *key, record.id, &record.name, &mut names)?;
            for material_id in &record.material_ids {
                let linked = self
                    .materials
                    .get(material_id)
                    .is_some_and(|m| m.assembly_ids.contains(key));
                if !linked {
                    return Err(dangling(EntityKind::Assembly, &record.name, "material_ids", *material_id));
                }
            }
            for building_id in &record.building_ids {
                let linked = self
                    .buildings
                    .get(building_id)
                    .is_some_and(|b| b.assembly_ids.contains(key));
                if !linked {
                    return Err(dangling(EntityKind::Assembly, &record.name, "building_ids", *building_id));
                }
            }
        }

        names.clear();
        for (key, record) in &self.buildings {
            check_record(EntityKind::Building, *key, record.id, &record.name, &mut names)?;
            record.geometry.validate()?;
            for assembly_id in &record.assembly_ids {
                let linked = self
                    .assemblies
                    .get(assembly_id)
                    .is_some_and(|a| a.building_ids.contains(key));
                if !linked {
                    return Err(dangling(EntityKind::Building, &record.name, "assembly_ids", *assembly_id));
                }
            }
        }
        Ok(())
    }

    // ---- creation -------------------------------------------------------

    /// Register a material. Names are unique across materials.
    pub fn create_material(&mut self, name: impl Into<String>, indicator: PhaseIndicator) -> CarbonResult<Uuid> {
        let name = name.into();
        if self.find_material(&name).is_some() {
            return Err(CarbonError::duplicate_name(EntityKind::Material.display_name(), name));
        }
        let material = Material::new(name, indicator)?;
        let id = material.id;
        tracing::info!(material = %material.name, %id, "material created");
        self.materials.insert(id, material);
        self.touch();
        Ok(id)
    }

    /// Register an empty assembly. Names are unique across assemblies.
    pub fn create_assembly(&mut self, name: impl Into<String>) -> CarbonResult<Uuid> {
        let name = name.into();
        validate_name(EntityKind::Assembly, &name)?;
        if self.find_assembly(&name).is_some() {
            return Err(CarbonError::duplicate_name(EntityKind::Assembly.display_name(), name));
        }
        let id = Uuid::new_v4();
        tracing::info!(assembly = %name, %id, "assembly created");
        self.assemblies.insert(
            id,
            AssemblyRecord {
                id,
                name,
                material_ids: Vec::new(),
                building_ids: BTreeSet::new(),
            },
        );
        self.touch();
        Ok(id)
    }

    /// Register a building. Names are unique across buildings and the
    /// geometry must satisfy the envelope preconditions.
    pub fn create_building(&mut self, name: impl Into<String>, geometry: BuildingGeometry) -> CarbonResult<Uuid> {
        let name = name.into();
        validate_name(EntityKind::Building, &name)?;
        if self.find_building(&name).is_some() {
            return Err(CarbonError::duplicate_name(EntityKind::Building.display_name(), name));
        }
        geometry.validate()?;
        let id = Uuid::new_v4();
        tracing::info!(building = %name, %id, "building created");
        self.buildings.insert(
            id,
            BuildingRecord {
                id,
                name,
                geometry,
                envelope: None,
                assembly_ids: Vec::new(),
            },
        );
        self.touch();
        Ok(id)
    }

    /// Replace a material's indicator.
    pub fn update_indicator(&mut self, material_id: Uuid, indicator: PhaseIndicator) -> CarbonResult<()> {
        indicator.validate()?;
        let material = self
            .materials
            .get_mut(&material_id)
            .ok_or_else(|| CarbonError::not_found(EntityKind::Material.display_name(), material_id))?;
        *material.indicator_mut() = indicator;
        tracing::info!(material = %material.name, "indicator updated");
        self.touch();
        Ok(())
    }

    /// Replace a building's geometry. Previously derived areas are dropped.
    pub fn update_geometry(&mut self, building_id: Uuid, geometry: BuildingGeometry) -> CarbonResult<()> {
        geometry.validate()?;
        let record = self.building_record_mut(building_id)?;
        record.geometry = geometry;
        record.envelope = None;
        self.touch();
        Ok(())
    }

    // ---- lookup ---------------------------------------------------------

    pub fn material(&self, id: Uuid) -> CarbonResult<&Material> {
        self.materials
            .get(&id)
            .ok_or_else(|| CarbonError::not_found(EntityKind::Material.display_name(), id))
    }

    pub fn assembly_record(&self, id: Uuid) -> CarbonResult<&AssemblyRecord> {
        self.assemblies
            .get(&id)
            .ok_or_else(|| CarbonError::not_found(EntityKind::Assembly.display_name(), id))
    }

    pub fn building_record(&self, id: Uuid) -> CarbonResult<&BuildingRecord> {
        self.buildings
            .get(&id)
            .ok_or_else(|| CarbonError::not_found(EntityKind::Building.display_name(), id))
    }

    fn assembly_record_mut(&mut self, id: Uuid) -> CarbonResult<&mut AssemblyRecord> {
        self.assemblies
            .get_mut(&id)
            .ok_or_else(|| CarbonError::not_found(EntityKind::Assembly.display_name(), id))
    }

    fn building_record_mut(&mut self, id: Uuid) -> CarbonResult<&mut BuildingRecord> {
        self.buildings
            .get_mut(&id)
            .ok_or_else(|| CarbonError::not_found(EntityKind::Building.display_name(), id))
    }

    pub fn find_material(&self, name: &str) -> Option<&Material> {
        self.materials.values().find(|m| m.name == name)
    }

    pub fn find_assembly(&self, name: &str) -> Option<&AssemblyRecord> {
        self.assemblies.values().find(|a| a.name == name)
    }

    pub fn find_building(&self, name: &str) -> Option<&BuildingRecord> {
        self.buildings.values().find(|b| b.name == name)
    }

    // ---- links ----------------------------------------------------------

    /// Attach a material to an assembly. Returns false if already attached.
    pub fn attach_material(&mut self, assembly_id: Uuid, material_id: Uuid) -> CarbonResult<bool> {
        self.material(material_id)?;
        let record = self.assembly_record_mut(assembly_id)?;
        if record.material_ids.contains(&material_id) {
            return Ok(false);
        }
        record.material_ids.push(material_id);
        if let Some(material) = self.materials.get_mut(&material_id) {
            material.assembly_ids.insert(assembly_id);
        }
        self.touch();
        Ok(true)
    }

    /// Detach a material from an assembly. The material is kept.
    pub fn detach_material(&mut self, assembly_id: Uuid, material_id: Uuid) -> CarbonResult<bool> {
        let record = self.assembly_record_mut(assembly_id)?;
        let before = record.material_ids.len();
        record.material_ids.retain(|id| *id != material_id);
        let removed = record.material_ids.len() != before;
        if let Some(material) = self.materials.get_mut(&material_id) {
            material.assembly_ids.remove(&assembly_id);
        }
        if removed {
            self.touch();
        }
        Ok(removed)
    }

    /// Attach an assembly to a building. Returns false if already attached.
    pub fn attach_assembly(&mut self, building_id: Uuid, assembly_id: Uuid) -> CarbonResult<bool> {
        self.assembly_record(assembly_id)?;
        let record = self.building_record_mut(building_id)?;
        if record.assembly_ids.contains(&assembly_id) {
            return Ok(false);
        }
        record.assembly_ids.push(assembly_id);
        if let Some(assembly) = self.assemblies.get_mut(&assembly_id) {
            assembly.building_ids.insert(building_id);
        }
        self.touch();
        Ok(true)
    }

    /// Detach an assembly from a building. The assembly is kept.
    pub fn detach_assembly(&mut self, building_id: Uuid, assembly_id: Uuid) -> CarbonResult<bool> {
        let record = self.building_record_mut(building_id)?;
        let before = record.assembly_ids.len();
        record.assembly_ids.retain(|id| *id != assembly_id);
        let removed = record.assembly_ids.len() != before;
        if let Some(assembly) = self.assemblies.get_mut(&assembly_id) {
            assembly.building_ids.remove(&building_id);
        }
        if removed {
            self.touch();
        }
        Ok(removed)
    }

    // ---- removal --------------------------------------------------------

    /// Delete a material and its indicator, detaching it from every assembly.
    pub fn remove_material(&mut self, id: Uuid) -> CarbonResult<Material> {
        let material = self
            .materials
            .remove(&id)
            .ok_or_else(|| CarbonError::not_found(EntityKind::Material.display_name(), id))?;
        for assembly_id in &material.assembly_ids {
            if let Some(record) = self.assemblies.get_mut(assembly_id) {
                record.material_ids.retain(|m| *m != id);
            }
        }
        tracing::info!(material = %material.name, "material removed");
        self.touch();
        Ok(material)
    }

    /// Delete an assembly. Its materials survive.
    pub fn remove_assembly(&mut self, id: Uuid) -> CarbonResult<AssemblyRecord> {
        let record = self
            .assemblies
            .remove(&id)
            .ok_or_else(|| CarbonError::not_found(EntityKind::Assembly.display_name(), id))?;
        for material_id in &record.material_ids {
            if let Some(material) = self.materials.get_mut(material_id) {
                material.assembly_ids.remove(&id);
            }
        }
        for building_id in &record.building_ids {
            if let Some(building) = self.buildings.get_mut(building_id) {
                building.assembly_ids.retain(|a| *a != id);
            }
        }
        tracing::info!(assembly = %record.name, "assembly removed");
        self.touch();
        Ok(record)
    }

    /// Delete a building. Its assemblies survive.
    pub fn remove_building(&mut self, id: Uuid) -> CarbonResult<BuildingRecord> {
        let record = self
            .buildings
            .remove(&id)
            .ok_or_else(|| CarbonError::not_found(EntityKind::Building.display_name(), id))?;
        for assembly_id in &record.assembly_ids {
            if let Some(assembly) = self.assemblies.get_mut(assembly_id) {
                assembly.building_ids.remove(&id);
            }
        }
        tracing::info!(building = %record.name, "building removed");
        self.touch();
        Ok(record)
    }

    // ---- hydration ------------------------------------------------------

    pub fn hydrate_material(&self, id: Uuid) -> CarbonResult<Arc<Material>> {
        Hydrator::new(self).material(id)
    }

    pub fn hydrate_assembly(&self, id: Uuid) -> CarbonResult<Arc<Assembly>> {
        Hydrator::new(self).assembly(id)
    }

    /// Fully hydrated building, carrying the inventory's envelope factors
    pub fn hydrate_building(&self, id: Uuid) -> CarbonResult<Building> {
        Hydrator::new(self).building(id)
    }

    /// Every building, sorted by name, sharing one graph of assemblies and
    /// materials.
    pub fn hydrate_buildings(&self) -> CarbonResult<Vec<Building>> {
        let mut records: Vec<&BuildingRecord> = self.buildings.values().collect();
        records.sort_by(|a, b| a.name.cmp(&b.name));

        let mut hydrator = Hydrator::new(self);
        records.into_iter().map(|r| hydrator.building(r.id)).collect()
    }

    // ---- calculations ---------------------------------------------------

    /// Whole-life carbon of any stored entity
    pub fn whole_life_carbon(&self, entity: EntityRef) -> CarbonResult<f64> {
        let total = match entity.kind {
            EntityKind::Material => self.hydrate_material(entity.id)?.compute_whole_life_carbon(),
            EntityKind::Assembly => self.hydrate_assembly(entity.id)?.compute_whole_life_carbon(),
            EntityKind::Building => self.hydrate_building(entity.id)?.compute_whole_life_carbon(),
        };
        tracing::debug!(kind = %entity.kind, id = %entity.id, total, "whole-life carbon");
        Ok(total)
    }

    /// Phase-filtered carbon of any stored entity, under the inventory's
    /// name policy
    pub fn carbon_for_phase<S: AsRef<str>>(&self, entity: EntityRef, phases: &[S]) -> CarbonResult<f64> {
        let selection = PhaseSelection::from_names(phases, self.settings.name_policy)?;
        let total = match entity.kind {
            EntityKind::Material => self.hydrate_material(entity.id)?.carbon_for_selection(&selection),
            EntityKind::Assembly => self.hydrate_assembly(entity.id)?.carbon_for_selection(&selection),
            EntityKind::Building => self.hydrate_building(entity.id)?.carbon_for_selection(&selection),
        };
        Ok(total)
    }

    /// Derive a building's envelope, store the areas on its record and
    /// return the embodied carbon estimate.
    pub fn calculate_embodied_carbon(&mut self, building_id: Uuid) -> CarbonResult<f64> {
        let mut building = self.hydrate_building(building_id)?;
        let embodied = building.calculate_embodied_carbon()?;
        self.store_envelope(&building)?;
        Ok(embodied)
    }

    /// Copy a hydrated building's derived areas back onto its record.
    pub fn store_envelope(&mut self, building: &Building) -> CarbonResult<()> {
        let record = self.building_record_mut(building.id)?;
        record.envelope = building.envelope().copied();
        self.touch();
        Ok(())
    }
}

impl Default for Inventory {
    fn default() -> Self {
        Inventory::new("")
    }
}

/// Key, name and uniqueness checks shared by every record kind
fn check_record<'a>(
    kind: EntityKind,
    key: Uuid,
    id: Uuid,
    name: &'a str,
    seen: &mut BTreeSet<&'a str>,
) -> CarbonResult<()> {
    if key != id {
        return Err(CarbonError::invalid_input(
            format!("{} id", kind.display_name().to_lowercase()),
            id.to_string(),
            format!("Stored under key {}", key),
        ));
    }
    if name.trim().is_empty() {
        return Err(CarbonError::missing_field(format!(
            "{} {} name",
            kind.display_name().to_lowercase(),
            id
        )));
    }
    if !seen.insert(name) {
        return Err(CarbonError::duplicate_name(kind.display_name(), name));
    }
    Ok(())
}

/// A link whose target is missing or does not link back
fn dangling(kind: EntityKind, name: &str, field: &str, target: Uuid) -> CarbonError {
    CarbonError::invalid_input(
        format!("{} '{}' {}", kind.display_name().to_lowercase(), name, field),
        target.to_string(),
        "Linked entity is missing or does not link back",
    )
}

/// Builds shared `Arc` graphs out of inventory records, one `Arc` per id.
struct Hydrator<'a> {
    inventory: &'a Inventory,
    materials: HashMap<Uuid, Arc<Material>>,
    assemblies: HashMap<Uuid, Arc<Assembly>>,
}

impl<'a> Hydrator<'a> {
    fn new(inventory: &'a Inventory) -> Self {
        Hydrator {
            inventory,
            materials: HashMap::new(),
            assemblies: HashMap::new(),
        }
    }

    fn material(&mut self, id: Uuid) -> CarbonResult<Arc<Material>> {
        if let Some(material) = self.materials.get(&id) {
            return Ok(material.clone());
        }
        let material = Arc::new(self.inventory.material(id)?.clone());
        self.materials.insert(id, material.clone());
        Ok(material)
    }

    fn assembly(&mut self, id: Uuid) -> CarbonResult<Arc<Assembly>> {
        if let Some(assembly) = self.assemblies.get(&id) {
            return Ok(assembly.clone());
        }
        let record = self.inventory.assembly_record(id)?;
        let mut assembly = Assembly::with_id(record.id, record.name.clone())?;
        for material_id in &record.material_ids {
            assembly.add_material(self.material(*material_id)?);
        }
        assembly.building_ids = record.building_ids.clone();

        let assembly = Arc::new(assembly);
        self.assemblies.insert(id, assembly.clone());
        Ok(assembly)
    }

    fn building(&mut self, id: Uuid) -> CarbonResult<Building> {
        let record = self.inventory.building_record(id)?;
        let mut building = Building::with_id(record.id, record.name.clone(), record.geometry)?
            .with_envelope_factors(self.inventory.settings.envelope)
            .with_envelope(record.envelope);
        for assembly_id in &record.assembly_ids {
            building.add_assembly(self.assembly(*assembly_id)?);
        }
        Ok(building)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::phases::Phase;
    use crate::settings::NamePolicy;

    fn geometry() -> BuildingGeometry {
        BuildingGeometry {
            gross_floor_area: 3000.0,
            floor_to_floor_height: 4.0,
            ground_floor_area: 1000.0,
            window_to_wall_ratio: 0.4,
            above_ground_floor_count: 2,
            below_ground_floor_count: 1,
        }
    }

    /// Two assemblies sharing one material, one building holding both.
    fn populated() -> (Inventory, Uuid, Uuid, Uuid, Uuid) {
        let mut inv = Inventory::new("Test");
        let concrete = inv
            .create_material(
                "Concrete",
                PhaseIndicator::default()
                    .with(Phase::A1, 100.0)
                    .with(Phase::B4, 10.0)
                    .with(Phase::C3, 5.0)
                    .with(Phase::D, 2.0),
            )
            .unwrap();
        let slab = inv.create_assembly("Slab").unwrap();
        let wall = inv.create_assembly("Wall").unwrap();
        inv.attach_material(slab, concrete).unwrap();
        inv.attach_material(wall, concrete).unwrap();
        let office = inv.create_building("Office", geometry()).unwrap();
        inv.attach_assembly(office, slab).unwrap();
        inv.attach_assembly(office, wall).unwrap();
        (inv, concrete, slab, wall, office)
    }

    #[test]
    fn test_new_inventory() {
        let inv = Inventory::new("Empty");
        assert_eq!(inv.meta.version, SCHEMA_VERSION);
        assert_eq!(inv.meta.name, "Empty");
        assert_eq!(inv.entity_count(), 0);
    }

    #[test]
    fn test_duplicate_names() {
        let (mut inv, ..) = populated();
        let err = inv.create_material("Concrete", PhaseIndicator::default()).unwrap_err();
        assert_eq!(err, CarbonError::duplicate_name("Material", "Concrete"));
        assert_eq!(inv.create_assembly("Slab").unwrap_err().error_code(), "DUPLICATE_NAME");
        assert_eq!(inv.create_building("Office", geometry()).unwrap_err().error_code(), "DUPLICATE_NAME");
        // the same name may be used across kinds
        assert!(inv.create_assembly("Concrete").is_ok());
    }

    #[test]
    fn test_invalid_inputs_rejected() {
        let mut inv = Inventory::new("Test");
        assert!(inv.create_assembly("").is_err());
        let mut g = geometry();
        g.ground_floor_area = 0.0;
        assert!(inv.create_building("Flat", g).unwrap_err().is_precondition_violation());
        assert_eq!(inv.entity_count(), 0);
    }

    #[test]
    fn test_back_references() {
        let (inv, concrete, slab, wall, office) = populated();
        let material = inv.material(concrete).unwrap();
        assert!(material.assembly_ids.contains(&slab));
        assert!(material.assembly_ids.contains(&wall));
        assert!(inv.assembly_record(slab).unwrap().building_ids.contains(&office));
    }

    #[test]
    fn test_attach_is_idempotent() {
        let (mut inv, concrete, slab, _, office) = populated();
        assert!(!inv.attach_material(slab, concrete).unwrap());
        assert!(!inv.attach_assembly(office, slab).unwrap());
        assert_eq!(inv.assembly_record(slab).unwrap().material_ids.len(), 1);
    }

    #[test]
    fn test_attach_missing_entity() {
        let (mut inv, _, slab, ..) = populated();
        let err = inv.attach_material(slab, Uuid::new_v4()).unwrap_err();
        assert_eq!(err.error_code(), "NOT_FOUND");
        assert!(inv.attach_assembly(Uuid::new_v4(), slab).is_err());
    }

    #[test]
    fn test_detach_keeps_entities() {
        let (mut inv, concrete, slab, wall, office) = populated();
        assert!(inv.detach_material(slab, concrete).unwrap());
        assert!(!inv.detach_material(slab, concrete).unwrap());
        assert!(inv.materials.contains_key(&concrete));
        assert!(!inv.material(concrete).unwrap().assembly_ids.contains(&slab));

        assert_eq!(inv.whole_life_carbon(EntityRef::assembly(slab)).unwrap(), 0.0);
        assert_eq!(inv.whole_life_carbon(EntityRef::assembly(wall)).unwrap(), 117.0);
        assert_eq!(inv.whole_life_carbon(EntityRef::building(office)).unwrap(), 117.0);
    }

    #[test]
    fn test_remove_material_detaches_everywhere() {
        let (mut inv, concrete, slab, wall, office) = populated();
        let removed = inv.remove_material(concrete).unwrap();
        assert_eq!(removed.name, "Concrete");
        assert!(inv.assembly_record(slab).unwrap().material_ids.is_empty());
        assert!(inv.assembly_record(wall).unwrap().material_ids.is_empty());
        assert_eq!(inv.whole_life_carbon(EntityRef::building(office)).unwrap(), 0.0);
        assert_eq!(
            inv.whole_life_carbon(EntityRef::material(concrete)).unwrap_err().error_code(),
            "NOT_FOUND"
        );
    }

    #[test]
    fn test_remove_assembly_and_building() {
        let (mut inv, concrete, slab, wall, office) = populated();
        inv.remove_assembly(slab).unwrap();
        assert_eq!(inv.building_record(office).unwrap().assembly_ids, vec![wall]);
        assert!(!inv.material(concrete).unwrap().assembly_ids.contains(&slab));

        inv.remove_building(office).unwrap();
        assert!(inv.assembly_record(wall).unwrap().building_ids.is_empty());
        assert!(inv.remove_building(office).is_err());
    }

    #[test]
    fn test_hydration_shares_materials() {
        let (inv, concrete, ..) = populated();
        let building = inv.hydrate_buildings().unwrap().remove(0);
        let first = &building.assemblies()[0].materials()[0];
        let second = &building.assemblies()[1].materials()[0];
        assert_eq!(first.id, concrete);
        assert!(Arc::ptr_eq(first, second));
    }

    #[test]
    fn test_hydrate_buildings_sorted() {
        let (mut inv, ..) = populated();
        inv.create_building("Annex", geometry()).unwrap();
        let names: Vec<String> = inv.hydrate_buildings().unwrap().into_iter().map(|b| b.name).collect();
        assert_eq!(names, vec!["Annex".to_string(), "Office".to_string()]);
    }

    #[test]
    fn test_whole_life_by_reference() {
        let (inv, concrete, slab, _, office) = populated();
        assert_eq!(inv.whole_life_carbon(EntityRef::material(concrete)).unwrap(), 117.0);
        assert_eq!(inv.whole_life_carbon(EntityRef::assembly(slab)).unwrap(), 117.0);
        assert_eq!(inv.whole_life_carbon(EntityRef::building(office)).unwrap(), 234.0);
        assert!(inv.whole_life_carbon(EntityRef::building(Uuid::new_v4())).is_err());
    }

    #[test]
    fn test_phase_by_reference_and_policy() {
        let (mut inv, _, _, _, office) = populated();
        let office_ref = EntityRef::building(office);
        assert_eq!(inv.carbon_for_phase(office_ref, &["construction"]).unwrap(), 200.0);
        assert_eq!(inv.carbon_for_phase(office_ref, &["use", "endOfLife", "unknown"]).unwrap(), 30.0);

        inv.settings.name_policy = NamePolicy::Strict;
        let err = inv.carbon_for_phase(office_ref, &["use", "unknown"]).unwrap_err();
        assert_eq!(err, CarbonError::unknown_phase("unknown"));
    }

    #[test]
    fn test_embodied_persists_areas() {
        let (mut inv, _, _, _, office) = populated();
        assert!(inv.building_record(office).unwrap().envelope.is_none());
        let ec = inv.calculate_embodied_carbon(office).unwrap();
        assert!((ec - 27964.142).abs() < 0.01);

        let stored = inv.building_record(office).unwrap().envelope.unwrap();
        assert_eq!(stored.roof_area, 1000.0);

        // the stored areas come back with the next hydration
        let building = inv.hydrate_building(office).unwrap();
        assert!((building.estimate_embodied_carbon().unwrap() - ec).abs() < 1e-9);
    }

    #[test]
    fn test_settings_factors_apply() {
        let (mut inv, _, _, _, office) = populated();
        inv.settings.envelope.roof_kgco2_m2 = 0.0;
        inv.settings.envelope.facade_kgco2_m2 = 0.0;
        inv.settings.envelope.cladding_kgco2_m2 = 0.0;
        assert_eq!(inv.calculate_embodied_carbon(office).unwrap(), 0.0);
    }

    #[test]
    fn test_update_geometry_clears_envelope() {
        let (mut inv, _, _, _, office) = populated();
        inv.calculate_embodied_carbon(office).unwrap();
        let mut g = geometry();
        g.above_ground_floor_count = 5;
        inv.update_geometry(office, g).unwrap();
        assert!(inv.building_record(office).unwrap().envelope.is_none());
        g.window_to_wall_ratio = 2.0;
        assert!(inv.update_geometry(office, g).is_err());
    }

    #[test]
    fn test_update_indicator() {
        let (mut inv, concrete, slab, ..) = populated();
        inv.update_indicator(concrete, PhaseIndicator::default().with(Phase::A2, 1.0)).unwrap();
        assert_eq!(inv.whole_life_carbon(EntityRef::assembly(slab)).unwrap(), 1.0);
        let bad = PhaseIndicator::default().with(Phase::A2, f64::NAN);
        assert!(inv.update_indicator(concrete, bad).is_err());
    }

    #[test]
    fn test_validate_accepts_built_inventory() {
        let (inv, ..) = populated();
        assert!(inv.validate().is_ok());
        assert!(Inventory::new("Empty").validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_duplicate_names() {
        let (mut inv, ..) = populated();
        let twin = Material::new("Concrete", PhaseIndicator::default()).unwrap();
        inv.materials.insert(twin.id, twin);
        assert_eq!(inv.validate().unwrap_err(), CarbonError::duplicate_name("Material", "Concrete"));
    }

    #[test]
    fn test_validate_rejects_blank_name() {
        let (mut inv, _, slab, ..) = populated();
        inv.assemblies.get_mut(&slab).unwrap().name = " ".to_string();
        assert_eq!(inv.validate().unwrap_err().error_code(), "MISSING_FIELD");
    }

    #[test]
    fn test_validate_rejects_dangling_links() {
        let (mut inv, _, slab, ..) = populated();
        inv.assemblies.get_mut(&slab).unwrap().material_ids.push(Uuid::new_v4());
        assert_eq!(inv.validate().unwrap_err().error_code(), "INVALID_INPUT");

        let (mut inv, _, _, _, office) = populated();
        inv.buildings.get_mut(&office).unwrap().assembly_ids.push(Uuid::new_v4());
        assert_eq!(inv.validate().unwrap_err().error_code(), "INVALID_INPUT");
    }

    #[test]
    fn test_validate_rejects_one_sided_links() {
        let (mut inv, concrete, slab, ..) = populated();
        inv.materials.get_mut(&concrete).unwrap().assembly_ids.remove(&slab);
        assert!(inv.validate().is_err());

        let (mut inv, _, _, wall, _) = populated();
        inv.assemblies.get_mut(&wall).unwrap().building_ids.clear();
        assert!(inv.validate().is_err());

        let (mut inv, _, _, _, office) = populated();
        inv.buildings.get_mut(&office).unwrap().assembly_ids.clear();
        assert!(inv.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_bad_indicator_and_geometry() {
        let (mut inv, concrete, ..) = populated();
        *inv.materials.get_mut(&concrete).unwrap().indicator_mut() = PhaseIndicator::default().with(Phase::A1, -500.0);
        assert_eq!(inv.validate().unwrap_err().error_code(), "INVALID_INPUT");

        let (mut inv, _, _, _, office) = populated();
        inv.buildings.get_mut(&office).unwrap().geometry.ground_floor_area = 0.0;
        assert!(inv.validate().unwrap_err().is_precondition_violation());
    }

    #[test]
    fn test_validate_rejects_mismatched_key() {
        let (mut inv, concrete, ..) = populated();
        let material = inv.materials.remove(&concrete).unwrap();
        inv.materials.insert(Uuid::new_v4(), material);
        assert!(inv.validate().is_err());
    }

    #[test]
    fn test_serialization_roundtrip() {
        let (inv, concrete, slab, _, office) = populated();
        let json = serde_json::to_string_pretty(&inv).unwrap();
        let loaded: Inventory = serde_json::from_str(&json).unwrap();
        assert_eq!(loaded.material(concrete).unwrap(), inv.material(concrete).unwrap());
        assert_eq!(loaded.assembly_record(slab).unwrap(), inv.assembly_record(slab).unwrap());
        assert_eq!(
            loaded.whole_life_carbon(EntityRef::building(office)).unwrap(),
            inv.whole_life_carbon(EntityRef::building(office)).unwrap()
        );
    }
}
