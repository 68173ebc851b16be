//! # carbon_core - Whole-Life Carbon Aggregation Engine
//!
//! `carbon_core` computes life-cycle carbon emissions of buildings made of
//! assemblies made of materials. Each material carries a per-phase emission
//! breakdown (A1..D); everything above it is a sum.
//!
//! ## Design Philosophy
//!
//! - **Live graph**: Totals are recomputed from the current hierarchy on every
//!   call, never cached
//! - **JSON-First**: Entities, settings, results and errors serialize with serde
//! - **Rich Errors**: Structured error types, not just strings
//! - **No I/O in calculations**: Only [`file_io`] touches the filesystem
//!
//! ## Quick Start
//!
//! ```rust
//! use std::sync::Arc;
//! use carbon_core::calculator::CarbonCalculator;
//! use carbon_core::entities::{Assembly, Material};
//! use carbon_core::indicator::PhaseIndicator;
//! use carbon_core::phases::Phase;
//!
//! let glulam = Material::new(
//!     "Glulam",
//!     PhaseIndicator::default().with(Phase::A1, 55.0).with(Phase::C3, 8.0).with(Phase::D, 20.0),
//! ).unwrap();
//! let beam = Assembly::new("Primary beam").unwrap().with_material(Arc::new(glulam));
//!
//! assert_eq!(beam.compute_whole_life_carbon(), 83.0);
//! assert_eq!(beam.calculate_carbon_for_phase(&["construction", "endOfLife"]), 63.0);
//! ```
//!
//! ## Modules
//!
//! - [`phases`] - Life-cycle modules and phase groups
//! - [`indicator`] - Per-phase emission values of a material
//! - [`entities`] - Material, assembly and building
//! - [`calculator`] - The carbon calculator contract
//! - [`envelope`] - Geometry-based embodied carbon estimate
//! - [`units`] - Unit systems, conversion factors and type-safe wrappers
//! - [`orchestrator`] - Sequential and concurrent aggregation
//! - [`inventory`] - Registry of entities, links and settings
//! - [`settings`] - Calculation settings
//! - [`errors`] - Structured error types
//! - [`file_io`] - Inventory files with atomic saves

pub mod calculator;
pub mod entities;
pub mod envelope;
pub mod errors;
pub mod file_io;
pub mod indicator;
pub mod inventory;
pub mod orchestrator;
pub mod phases;
pub mod settings;
pub mod units;

// Re-export commonly used types at crate root for convenience
pub use calculator::{CarbonCalculator, CarbonEntity, EmbodiedCarbonCalculator};
pub use entities::{Assembly, Building, EntityKind, EntityRef, Material};
pub use errors::{CarbonError, CarbonResult};
pub use file_io::{load_inventory, save_inventory};
pub use indicator::{PhaseIndicator, RescaleMode};
pub use inventory::{Inventory, InventoryMetadata};
pub use orchestrator::CalculationService;
pub use settings::{CarbonSettings, NamePolicy};
