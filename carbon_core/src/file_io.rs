//! # File I/O Module
//!
//! Inventory file operations:
//! - **Atomic saves**: write to `.tmp`, fsync, rename over the target
//! - **Version validation**: refuse files written by an incompatible schema
//!
//! ## File Format
//!
//! Inventories are saved as pretty-printed JSON, conventionally with a
//! `.carbon.json` extension.
//!
//! ## Example
//!
//! ```rust,no_run
//! use carbon_core::file_io::{load_inventory, save_inventory};
//! use carbon_core::inventory::Inventory;
//! use std::path::Path;
//!
//! let inventory = Inventory::new("Riverside offices");
//! let path = Path::new("riverside.carbon.json");
//!
//! save_inventory(&inventory, path).unwrap();
//! let loaded = load_inventory(path).unwrap();
//! assert_eq!(loaded.meta.name, "Riverside offices");
//! ```

use std::fs::{self, File};
use std::io::{Read, Write};
use std::path::{Path, PathBuf};

use crate::errors::{CarbonError, CarbonResult};
use crate::inventory::{Inventory, SCHEMA_VERSION};

/// Temporary sibling used during an atomic save
fn tmp_path_for(path: &Path) -> PathBuf {
    let mut name = path.file_name().map(|n| n.to_os_string()).unwrap_or_default();
    name.push(".tmp");
    path.with_file_name(name)
}

/// Save an inventory with atomic write semantics.
///
/// The JSON is written to a temporary file next to `path`, synced to disk and
/// renamed over `path`, so an interrupted save never leaves a truncated file.
pub fn save_inventory(inventory: &Inventory, path: &Path) -> CarbonResult<()> {
    let json = serde_json::to_string_pretty(inventory).map_err(|e| CarbonError::SerializationError {
        reason: e.to_string(),
    })?;

    let tmp_path = tmp_path_for(path);

    let mut tmp_file = File::create(&tmp_path).map_err(|e| {
        CarbonError::file_error("create temp file", tmp_path.display().to_string(), e.to_string())
    })?;

    tmp_file.write_all(json.as_bytes()).map_err(|e| {
        CarbonError::file_error("write temp file", tmp_path.display().to_string(), e.to_string())
    })?;

    tmp_file.sync_all().map_err(|e| {
        CarbonError::file_error("sync temp file", tmp_path.display().to_string(), e.to_string())
    })?;

    fs::rename(&tmp_path, path).map_err(|e| {
        let _ = fs::remove_file(&tmp_path);
        CarbonError::file_error("rename to final", path.display().to_string(), e.to_string())
    })?;

    tracing::info!(
        path = %path.display(),
        materials = inventory.materials.len(),
        assemblies = inventory.assemblies.len(),
        buildings = inventory.buildings.len(),
        "inventory saved"
    );
    Ok(())
}

/// Load an inventory from a file.
///
/// # Returns
///
/// * `Err(CarbonError::FileError)` - I/O error
/// * `Err(CarbonError::SerializationError)` - invalid JSON, or a material
///   without its indicator
/// * `Err(CarbonError::VersionMismatch)` - incompatible schema version
/// * Any error from [`Inventory::validate`] - content the creation paths
///   would have rejected (duplicate names, invalid indicators, broken links)
pub fn load_inventory(path: &Path) -> CarbonResult<Inventory> {
    let mut file =
        File::open(path).map_err(|e| CarbonError::file_error("open", path.display().to_string(), e.to_string()))?;

    let mut contents = String::new();
    file.read_to_string(&mut contents)
        .map_err(|e| CarbonError::file_error("read", path.display().to_string(), e.to_string()))?;

    let inventory: Inventory = serde_json::from_str(&contents).map_err(|e| CarbonError::SerializationError {
        reason: format!("Invalid JSON in {}: {}", path.display(), e),
    })?;

    validate_version(&inventory.meta.version)?;
    inventory.settings.validate()?;
    inventory.validate()?;

    tracing::debug!(path = %path.display(), entities = inventory.entity_count(), "inventory loaded");
    Ok(inventory)
}

/// Validate that a file version is compatible with the current schema.
///
/// Major versions must match. While the schema is 0.x, a file with a newer
/// minor version is rejected too.
pub fn validate_version(file_version: &str) -> CarbonResult<()> {
    let mismatch = || CarbonError::VersionMismatch {
        file_version: file_version.to_string(),
        expected_version: SCHEMA_VERSION.to_string(),
    };

    let file_parts: Vec<u32> = file_version.split('.').filter_map(|p| p.parse().ok()).collect();
    let current_parts: Vec<u32> = SCHEMA_VERSION.split('.').filter_map(|p| p.parse().ok()).collect();

    if file_parts.is_empty() || current_parts.is_empty() {
        return Err(mismatch());
    }

    if file_parts[0] != current_parts[0] {
        return Err(mismatch());
    }

    if current_parts[0] == 0 && file_parts.len() > 1 && current_parts.len() > 1 && file_parts[1] > current_parts[1] {
        return Err(mismatch());
    }

    Ok(())
}
