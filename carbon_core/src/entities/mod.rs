//! # Building Hierarchy
//!
//! Buildings own assemblies, assemblies own materials, and every material
//! owns exactly one [`PhaseIndicator`](crate::indicator::PhaseIndicator).
//!
//! ## Ownership
//!
//! - Assemblies and materials are shared (`Arc`) between any number of
//!   parents; detaching from one parent never deletes the child.
//! - Back-references (`Material::assembly_ids`, `Assembly::building_ids`) are
//!   navigational only. Carbon always flows down the tree, never up.
//!
//! ## Example
//!
//! ```rust
//! use std::sync::Arc;
//! use carbon_core::calculator::CarbonCalculator;
//! use carbon_core::entities::{Assembly, Building, Material};
//! use carbon_core::envelope::BuildingGeometry;
//! use carbon_core::indicator::PhaseIndicator;
//! use carbon_core::phases::Phase;
//!
//! let brick = Arc::new(Material::new("Brick", PhaseIndicator::default().with(Phase::A3, 40.0)).unwrap());
//! let wall = Arc::new(Assembly::new("Cavity wall").unwrap().with_material(brick));
//!
//! let geometry = BuildingGeometry {
//!     gross_floor_area: 2000.0,
//!     floor_to_floor_height: 3.5,
//!     ground_floor_area: 500.0,
//!     window_to_wall_ratio: 0.3,
//!     above_ground_floor_count: 4,
//!     below_ground_floor_count: 0,
//! };
//! let office = Building::new("Office", geometry).unwrap().with_assembly(wall.clone()).with_assembly(wall);
//! // the same assembly attached twice is held once
//! assert_eq!(office.compute_whole_life_carbon(), 40.0);
//! ```

pub mod assembly;
pub mod building;
pub mod material;

pub use assembly::Assembly;
pub use building::Building;
pub use material::Material;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::errors::{CarbonError, CarbonResult};

/// Level of the building hierarchy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EntityKind {
    Material,
    Assembly,
    Building,
}

impl EntityKind {
    pub fn display_name(&self) -> &'static str {
        match self {
            EntityKind::Material => "Material",
            EntityKind::Assembly => "Assembly",
            EntityKind::Building => "Building",
        }
    }
}

impl std::fmt::Display for EntityKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.display_name())
    }
}

/// Typed reference to an entity by id
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EntityRef {
    pub kind: EntityKind,
    pub id: Uuid,
}

impl EntityRef {
    pub fn material(id: Uuid) -> Self {
        EntityRef { kind: EntityKind::Material, id }
    }

    pub fn assembly(id: Uuid) -> Self {
        EntityRef { kind: EntityKind::Assembly, id }
    }

    pub fn building(id: Uuid) -> Self {
        EntityRef { kind: EntityKind::Building, id }
    }
}

/// Entity names must be non-empty once trimmed.
pub(crate) fn validate_name(kind: EntityKind, name: &str) -> CarbonResult<()> {
    if name.trim().is_empty() {
        return Err(CarbonError::invalid_input(
            format!("{} name", kind.display_name().to_lowercase()),
            format!("{:?}", name),
            "Name cannot be empty",
        ));
    }
    Ok(())
}
