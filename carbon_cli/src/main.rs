//! # carbon CLI
//!
//! Command-line front end for `carbon_core`: create, inspect and evaluate
//! inventory files.
//!
//! ```text
//! carbon init study.carbon.json
//! carbon summary study.carbon.json --json
//! carbon phases study.carbon.json --building "Office" --phase construction --phase use
//! carbon embodied study.carbon.json --save
//! carbon indicators study.carbon.json --material "Concrete C30/37"
//! carbon convert area 1000 --to imperial
//! ```
//!
//! Logging goes to stderr and is controlled with `RUST_LOG`.

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use serde::Serialize;
use tracing::info;
use tracing_subscriber::prelude::*;
use tracing_subscriber::EnvFilter;

use carbon_core::envelope::{BuildingGeometry, EmbodiedBreakdown, EnvelopeAreas};
use carbon_core::phases::{Phase, PhaseGroup, PhaseSelection};
use carbon_core::units::{QuantityKind, UnitConversionService, UnitSystem};
use carbon_core::{
    load_inventory, save_inventory, CalculationService, CarbonCalculator, CarbonError, CarbonResult, EntityKind,
    EntityRef, Inventory, NamePolicy, PhaseIndicator,
};

#[derive(Parser)]
#[command(name = "carbon")]
#[command(about = "Whole-life carbon calculations for building inventories", version)]
struct Cli {
    /// Name policy for phase groups and unit kinds (lenient or strict)
    #[arg(long, global = true, value_parser = parse_policy)]
    policy: Option<NamePolicy>,

    /// Maximum worker threads for concurrent aggregation
    #[arg(long, global = true)]
    max_tasks: Option<usize>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Write a sample inventory
    Init {
        file: PathBuf,

        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },

    /// Whole-life carbon per building with sequential and concurrent totals
    Summary {
        file: PathBuf,

        #[arg(long)]
        json: bool,
    },

    /// Carbon of one building for selected phase groups
    Phases {
        file: PathBuf,

        #[arg(long)]
        building: String,

        /// Phase group: construction, use, endOfLife or recovery (repeatable)
        #[arg(long = "phase", required = true)]
        phases: Vec<String>,
    },

    /// Envelope-based embodied carbon for every building
    Embodied {
        file: PathBuf,

        /// Store the derived envelope areas back into the file
        #[arg(long)]
        save: bool,

        #[arg(long)]
        json: bool,
    },

    /// The 17 phase values of one material
    Indicators {
        file: PathBuf,

        #[arg(long)]
        material: String,
    },

    /// Convert a value between metric and imperial
    Convert {
        /// Quantity kind: area, volume, energy, mass, density, carbon, carbon_intensity
        kind: String,

        value: f64,

        /// Target system: metric or imperial
        #[arg(long)]
        to: String,
    },
}

fn parse_policy(s: &str) -> Result<NamePolicy, String> {
    NamePolicy::parse(s).ok_or_else(|| format!("unknown policy '{}', expected lenient or strict", s))
}

fn init_tracing() {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("carbon_core=info,carbon_cli=info"));
    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

fn main() -> ExitCode {
    init_tracing();
    let cli = Cli::parse();

    match run(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error [{}]: {}", e.error_code(), e);
            ExitCode::FAILURE
        }
    }
}

fn run(cli: &Cli) -> CarbonResult<()> {
    match &cli.command {
        Command::Init { file, force } => init(file, *force),
        Command::Summary { file, json } => summary(&open(file, cli)?, *json),
        Command::Phases { file, building, phases } => phase_report(&open(file, cli)?, building, phases),
        Command::Embodied { file, save, json } => embodied(open(file, cli)?, file, *save, *json),
        Command::Indicators { file, material } => indicators(&open(file, cli)?, material),
        Command::Convert { kind, value, to } => convert(kind, *value, to, cli.policy.unwrap_or_default()),
    }
}

/// Load an inventory and apply per-run overrides
fn open(path: &Path, cli: &Cli) -> CarbonResult<Inventory> {
    let mut inventory = load_inventory(path)?;
    if let Some(policy) = cli.policy {
        inventory.settings.name_policy = policy;
    }
    if let Some(max_tasks) = cli.max_tasks {
        inventory.settings.max_parallel_tasks = max_tasks;
    }
    inventory.settings.validate()?;
    info!(path = %path.display(), entities = inventory.entity_count(), "inventory opened");
    Ok(inventory)
}

fn carbon_label(inventory: &Inventory) -> &'static str {
    QuantityKind::CarbonMass.unit_label(inventory.settings.unit_system)
}

// ---- init -------------------------------------------------------------

fn init(path: &Path, force: bool) -> CarbonResult<()> {
    if path.exists() && !force {
        return Err(CarbonError::file_error(
            "init",
            path.display().to_string(),
            "File already exists (use --force to overwrite)",
        ));
    }
    let inventory = sample_inventory()?;
    save_inventory(&inventory, path)?;
    println!(
        "Wrote sample inventory to {} ({} materials, {} assemblies, {} buildings)",
        path.display(),
        inventory.materials.len(),
        inventory.assemblies.len(),
        inventory.buildings.len()
    );
    Ok(())
}

fn sample_inventory() -> CarbonResult<Inventory> {
    let mut inv = Inventory::new("Sample study");

    let concrete = inv.create_material(
        "Concrete C30/37",
        PhaseIndicator::default()
            .with(Phase::A1, 240.0)
            .with(Phase::A2, 12.0)
            .with(Phase::A3, 18.0)
            .with(Phase::A4, 9.0)
            .with(Phase::A5, 6.5)
            .with(Phase::B4, 3.0)
            .with(Phase::C1, 2.5)
            .with(Phase::C2, 1.8)
            .with(Phase::C3, 4.0)
            .with(Phase::C4, 1.2)
            .with(Phase::D, 10.0),
    )?;
    let rebar = inv.create_material(
        "Reinforcing steel",
        PhaseIndicator::default()
            .with(Phase::A1, 1200.0)
            .with(Phase::A3, 150.0)
            .with(Phase::A4, 20.0)
            .with(Phase::C3, 15.0)
            .with(Phase::D, 400.0),
    )?;
    let glazing = inv.create_material(
        "Double glazing unit",
        PhaseIndicator::default()
            .with(Phase::A1, 85.0)
            .with(Phase::A3, 22.0)
            .with(Phase::B4, 40.0)
            .with(Phase::C4, 3.5),
    )?;
    let timber = inv.create_material(
        "Cross-laminated timber",
        PhaseIndicator::default()
            .with(Phase::A1, 60.0)
            .with(Phase::A3, 35.0)
            .with(Phase::A4, 8.0)
            .with(Phase::C3, 90.0)
            .with(Phase::D, 75.0),
    )?;

    let slab = inv.create_assembly("Ground slab")?;
    inv.attach_material(slab, concrete)?;
    inv.attach_material(slab, rebar)?;
    let facade = inv.create_assembly("Curtain wall")?;
    inv.attach_material(facade, glazing)?;
    let floor = inv.create_assembly("CLT floor")?;
    inv.attach_material(floor, timber)?;

    let office = inv.create_building(
        "Office",
        BuildingGeometry {
            gross_floor_area: 3000.0,
            floor_to_floor_height: 4.0,
            ground_floor_area: 1000.0,
            window_to_wall_ratio: 0.4,
            above_ground_floor_count: 2,
            below_ground_floor_count: 1,
        },
    )?;
    for assembly in [slab, facade, floor] {
        inv.attach_assembly(office, assembly)?;
    }

    let housing = inv.create_building(
        "Housing block",
        BuildingGeometry {
            gross_floor_area: 2400.0,
            floor_to_floor_height: 3.0,
            ground_floor_area: 400.0,
            window_to_wall_ratio: 0.25,
            above_ground_floor_count: 6,
            below_ground_floor_count: 0,
        },
    )?;
    inv.attach_assembly(housing, slab)?;
    inv.attach_assembly(housing, floor)?;

    Ok(inv)
}

// ---- summary ----------------------------------------------------------

#[derive(Serialize)]
struct BuildingSummary {
    name: String,
    gross_floor_area: f64,
    whole_life: f64,
    construction: f64,
    use_stage: f64,
    end_of_life: f64,
    recovery: f64,
}

#[derive(Serialize)]
struct SummaryReport {
    inventory: String,
    unit: &'static str,
    buildings: Vec<BuildingSummary>,
    total_sequential: f64,
    total_concurrent: f64,
}

fn group_total<T: CarbonCalculator>(entity: &T, group: PhaseGroup) -> f64 {
    entity.carbon_for_selection(&PhaseSelection::none().with(group))
}

fn summary_report(inventory: &Inventory, service: &CalculationService) -> CarbonResult<SummaryReport> {
    let buildings = inventory.hydrate_buildings()?;

    Ok(SummaryReport {
        inventory: inventory.meta.name.clone(),
        unit: carbon_label(inventory),
        buildings: buildings
            .iter()
            .map(|b| BuildingSummary {
                name: b.name.clone(),
                gross_floor_area: b.calculate_gfa(),
                whole_life: b.compute_whole_life_carbon(),
                construction: group_total(b, PhaseGroup::Construction),
                use_stage: group_total(b, PhaseGroup::Use),
                end_of_life: group_total(b, PhaseGroup::EndOfLife),
                recovery: group_total(b, PhaseGroup::Recovery),
            })
            .collect(),
        total_sequential: service.compute_whole_life_carbon_sync(&buildings),
        total_concurrent: service.compute_total_carbon_concurrent(&buildings)?,
    })
}

fn summary(inventory: &Inventory, json: bool) -> CarbonResult<()> {
    let service = CalculationService::from_settings(&inventory.settings)?;
    let report = summary_report(inventory, &service)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    println!("═══════════════════════════════════════");
    println!("  WHOLE-LIFE CARBON: {}", report.inventory);
    println!("═══════════════════════════════════════");
    for b in &report.buildings {
        println!();
        println!("{} (GFA {:.0} m2)", b.name, b.gross_floor_area);
        println!("  A1-A5 construction:  {:>14.2} {}", b.construction, report.unit);
        println!("  B1-B7 use:           {:>14.2} {}", b.use_stage, report.unit);
        println!("  C1-C4 end of life:   {:>14.2} {}", b.end_of_life, report.unit);
        println!("  D     recovery:      {:>14.2} {}", b.recovery, report.unit);
        println!("  Whole life:          {:>14.2} {}", b.whole_life, report.unit);
    }
    println!();
    println!("Total (sequential):    {:>14.2} {}", report.total_sequential, report.unit);
    println!(
        "Total (concurrent, {} workers): {:.2} {}",
        service.max_tasks(),
        report.total_concurrent,
        report.unit
    );
    Ok(())
}

// ---- phases -----------------------------------------------------------

fn phase_report(inventory: &Inventory, building: &str, phases: &[String]) -> CarbonResult<()> {
    let record = inventory
        .find_building(building)
        .ok_or_else(|| CarbonError::not_found(EntityKind::Building.display_name(), building))?;
    let total = inventory.carbon_for_phase(EntityRef::building(record.id), phases)?;
    let groups = selected_groups(phases);

    println!("{}", record.name);
    println!("  Phases: {}", if groups.is_empty() { "none".to_string() } else { groups.join(", ") });
    println!("  Carbon: {:.2} {}", total, carbon_label(inventory));
    Ok(())
}

/// Recognized groups in canonical order, each with its module range
fn selected_groups(phases: &[String]) -> Vec<String> {
    let selection: PhaseSelection = phases.iter().filter_map(|p| PhaseGroup::from_name(p)).collect();
    selection
        .groups()
        .map(|g| format!("{} ({})", g.name(), g.range()))
        .collect()
}

// ---- embodied ---------------------------------------------------------

#[derive(Serialize)]
struct EmbodiedEntry {
    name: String,
    areas: Option<EnvelopeAreas>,
    breakdown: EmbodiedBreakdown,
}

/// Embodied estimate for every building. With `store`, the derived areas are
/// written back onto the inventory records.
fn embodied_entries(inventory: &mut Inventory, store: bool) -> CarbonResult<(Vec<EmbodiedEntry>, f64)> {
    let service = CalculationService::from_settings(&inventory.settings)?;
    let mut buildings = inventory.hydrate_buildings()?;
    let total = service.compute_embodied_carbon_concurrent(&mut buildings)?;

    let entries = buildings
        .iter()
        .map(|b| -> CarbonResult<EmbodiedEntry> {
            Ok(EmbodiedEntry {
                name: b.name.clone(),
                areas: b.envelope().copied(),
                breakdown: b.embodied_breakdown()?,
            })
        })
        .collect::<CarbonResult<Vec<_>>>()?;

    if store {
        for building in &buildings {
            inventory.store_envelope(building)?;
        }
    }
    Ok((entries, total))
}

fn embodied(mut inventory: Inventory, path: &Path, save: bool, json: bool) -> CarbonResult<()> {
    let (entries, total) = embodied_entries(&mut inventory, save)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&entries)?);
    } else {
        for entry in &entries {
            println!("{}", entry.name);
            if let Some(areas) = &entry.areas {
                println!(
                    "  Perimeter {:.2} m, facade {:.2} m2 (glazing {:.2}, cladding {:.2}), roof {:.2} m2",
                    areas.perimeter, areas.facade_area, areas.glazing_area, areas.cladding_area, areas.roof_area
                );
            }
            println!(
                "  Cladding {:.2} + facade {:.2} + roof {:.2} = {:.2} kgCO2e",
                entry.breakdown.cladding, entry.breakdown.facade, entry.breakdown.roof, entry.breakdown.total
            );
        }
        println!();
        println!("Total embodied (envelope estimate): {:.2} kgCO2e", total);
    }

    if save {
        save_inventory(&inventory, path)?;
        println!("Envelope areas saved to {}", path.display());
    }
    Ok(())
}

// ---- indicators -------------------------------------------------------

fn indicators(inventory: &Inventory, material: &str) -> CarbonResult<()> {
    let material = inventory
        .find_material(material)
        .ok_or_else(|| CarbonError::not_found(EntityKind::Material.display_name(), material))?;
    let indicator = material.indicator();
    let unit = QuantityKind::CarbonMass.unit_label(indicator.unit_system);

    println!("{} ({})", material.name, indicator.unit_system);
    for phase in Phase::ALL {
        println!("  {:<3} {:<38} {:>12.3} {}", phase.code(), phase.description(), indicator.value(phase), unit);
    }
    println!();
    for group in PhaseGroup::ALL {
        println!("  {:<42} {:>12.3} {}", group.name(), indicator.group_total(group), unit);
    }
    println!("  {:<42} {:>12.3} {}", "whole life", material.compute_whole_life_carbon(), unit);
    Ok(())
}

// ---- convert ----------------------------------------------------------

#[derive(Debug, PartialEq)]
struct Conversion {
    from_label: &'static str,
    to_label: &'static str,
    value: f64,
}

/// Convert `value` into the `to` system from the opposite one. `None` when
/// the kind is unknown under the lenient policy.
fn conversion(kind: &str, value: f64, to: &str, policy: NamePolicy) -> CarbonResult<Option<Conversion>> {
    let target = UnitSystem::parse(to)
        .ok_or_else(|| CarbonError::invalid_input("to", to, "Expected 'metric' or 'imperial'"))?;

    let service = UnitConversionService::with_policy(policy);
    let Some(converter) = service.resolve(kind)? else {
        return Ok(None);
    };

    let source = target.toggled();
    Ok(Some(Conversion {
        from_label: converter.kind().unit_label(source),
        to_label: converter.kind().unit_label(target),
        value: converter.convert(value, source, target),
    }))
}

fn convert(kind: &str, value: f64, to: &str, policy: NamePolicy) -> CarbonResult<()> {
    match conversion(kind, value, to, policy)? {
        Some(c) => println!("{} {} = {:.6} {}", value, c.from_label, c.value, c.to_label),
        None => {
            let known: Vec<&str> = QuantityKind::ALL.iter().map(|k| k.name()).collect();
            println!("No converter for '{}'. Known kinds: {}", kind, known.join(", "));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_close(actual: f64, expected: f64) {
        assert!((actual - expected).abs() < 1e-6, "{} != {}", actual, expected);
    }

    #[test]
    fn test_sample_inventory_is_valid() {
        let inv = sample_inventory().unwrap();
        assert_eq!(inv.materials.len(), 4);
        assert_eq!(inv.assemblies.len(), 3);
        assert_eq!(inv.buildings.len(), 2);
        assert!(inv.validate().is_ok());
    }

    #[test]
    fn test_summary_report_totals() {
        let inv = sample_inventory().unwrap();
        let service = CalculationService::new(2).unwrap();
        let report = summary_report(&inv, &service).unwrap();

        let names: Vec<&str> = report.buildings.iter().map(|b| b.name.as_str()).collect();
        assert_eq!(names, vec!["Housing block", "Office"]);
        assert_eq!(report.unit, "kgco2");

        let office = &report.buildings[1];
        assert_close(office.whole_life, 2511.5);
        assert_close(office.construction, 1865.5);
        assert_close(
            office.construction + office.use_stage + office.end_of_life + office.recovery,
            office.whole_life,
        );
        assert_close(report.buildings[0].whole_life, 2361.0);

        assert_close(report.total_sequential, 4872.5);
        assert_eq!(report.total_concurrent, report.total_sequential);
    }

    #[test]
    fn test_selected_groups_canonical_order() {
        let phases = vec!["use".to_string(), "bogus".to_string(), "A1-A5".to_string()];
        assert_eq!(selected_groups(&phases), vec!["construction (A1-A5)", "use (B1-B7)"]);
        assert!(selected_groups(&["bogus".to_string()]).is_empty());
    }

    #[test]
    fn test_embodied_entries_store_areas_only_when_asked() {
        let mut inv = sample_inventory().unwrap();
        let (entries, total) = embodied_entries(&mut inv, false).unwrap();
        assert_eq!(entries.len(), 2);
        assert_close(total, entries.iter().map(|e| e.breakdown.total).sum());
        assert!(inv.buildings.values().all(|b| b.envelope.is_none()));

        let (entries, _) = embodied_entries(&mut inv, true).unwrap();
        let office = inv.find_building("Office").unwrap();
        let stored = office.envelope.unwrap();
        assert_eq!(stored.roof_area, 1000.0);
        assert_eq!(Some(stored), entries[1].areas);
        assert!((entries[1].breakdown.total - 27964.142).abs() < 0.01);
        assert!(inv.buildings.values().all(|b| b.envelope.is_some()));
    }

    #[test]
    fn test_conversion_direction() {
        let to_imperial = conversion("area", 1000.0, "imperial", NamePolicy::Lenient).unwrap().unwrap();
        assert_eq!((to_imperial.from_label, to_imperial.to_label), ("m2", "ft2"));
        assert!((to_imperial.value - 10763.9).abs() < 0.1);

        let to_metric = conversion("mass", 1.0, "metric", NamePolicy::Lenient).unwrap().unwrap();
        assert_eq!((to_metric.from_label, to_metric.to_label), ("lb", "kg"));
        assert_close(to_metric.value, 0.45359237);
    }

    #[test]
    fn test_conversion_errors() {
        assert_eq!(conversion("flux", 1.0, "metric", NamePolicy::Lenient).unwrap(), None);
        let err = conversion("flux", 1.0, "metric", NamePolicy::Strict).unwrap_err();
        assert_eq!(err.error_code(), "UNKNOWN_UNIT_KIND");
        let err = conversion("area", 1.0, "cubits", NamePolicy::Lenient).unwrap_err();
        assert_eq!(err.error_code(), "INVALID_INPUT");
    }
}
