//! Life-cycle phases per EN 15978
//!
//! The 17 life-cycle modules (A1–D) and the four phase groups they roll up
//! into. Phase groups are what callers select when asking for a partial
//! carbon total.
//!
//! # Example
//! ```
//! use carbon_core::phases::{Phase, PhaseGroup, PhaseSelection};
//! use carbon_core::settings::NamePolicy;
//!
//! assert_eq!(Phase::B6.group(), PhaseGroup::Use);
//!
//! let selection = PhaseSelection::from_names(&["construction", "use"], NamePolicy::Lenient).unwrap();
//! assert!(selection.contains(PhaseGroup::Construction));
//! assert!(!selection.contains(PhaseGroup::EndOfLife));
//! ```

use serde::{Deserialize, Serialize};

use crate::errors::{CarbonError, CarbonResult};
use crate::settings::NamePolicy;

/// Life-cycle module
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Phase {
    /// Raw material supply
    A1,
    /// Transport to manufacturer
    A2,
    /// Manufacturing
    A3,
    /// Transport to site
    A4,
    /// Construction and installation
    A5,
    /// Use
    B1,
    /// Maintenance
    B2,
    /// Repair
    B3,
    /// Replacement
    B4,
    /// Refurbishment
    B5,
    /// Operational energy use
    B6,
    /// Operational water use
    B7,
    /// Deconstruction and demolition
    C1,
    /// Transport to disposal
    C2,
    /// Waste processing
    C3,
    /// Disposal
    C4,
    /// Benefits and loads beyond the system boundary
    D,
}

impl Phase {
    /// All phases in canonical reporting order
    pub const ALL: [Phase; 17] = [
        Phase::A1,
        Phase::A2,
        Phase::A3,
        Phase::A4,
        Phase::A5,
        Phase::B1,
        Phase::B2,
        Phase::B3,
        Phase::B4,
        Phase::B5,
        Phase::B6,
        Phase::B7,
        Phase::C1,
        Phase::C2,
        Phase::C3,
        Phase::C4,
        Phase::D,
    ];

    /// Position in [`Phase::ALL`]
    pub fn index(&self) -> usize {
        *self as usize
    }

    pub fn code(&self) -> &'static str {
        match self {
            Phase::A1 => "A1",
            Phase::A2 => "A2",
            Phase::A3 => "A3",
            Phase::A4 => "A4",
            Phase::A5 => "A5",
            Phase::B1 => "B1",
            Phase::B2 => "B2",
            Phase::B3 => "B3",
            Phase::B4 => "B4",
            Phase::B5 => "B5",
            Phase::B6 => "B6",
            Phase::B7 => "B7",
            Phase::C1 => "C1",
            Phase::C2 => "C2",
            Phase::C3 => "C3",
            Phase::C4 => "C4",
            Phase::D => "D",
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            Phase::A1 => "Raw material supply",
            Phase::A2 => "Transport to manufacturer",
            Phase::A3 => "Manufacturing",
            Phase::A4 => "Transport to site",
            Phase::A5 => "Construction and installation",
            Phase::B1 => "Use",
            Phase::B2 => "Maintenance",
            Phase::B3 => "Repair",
            Phase::B4 => "Replacement",
            Phase::B5 => "Refurbishment",
            Phase::B6 => "Operational energy use",
            Phase::B7 => "Operational water use",
            Phase::C1 => "Deconstruction and demolition",
            Phase::C2 => "Transport to disposal",
            Phase::C3 => "Waste processing",
            Phase::C4 => "Disposal",
            Phase::D => "Benefits beyond the system boundary",
        }
    }

    pub fn group(&self) -> PhaseGroup {
        match self {
            Phase::A1 | Phase::A2 | Phase::A3 | Phase::A4 | Phase::A5 => PhaseGroup::Construction,
            Phase::B1
            | Phase::B2
            | Phase::B3
            | Phase::B4
            | Phase::B5
            | Phase::B6
            | Phase::B7 => PhaseGroup::Use,
            Phase::C1 | Phase::C2 | Phase::C3 | Phase::C4 => PhaseGroup::EndOfLife,
            Phase::D => PhaseGroup::Recovery,
        }
    }
}

impl std::fmt::Display for Phase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.code())
    }
}

/// Group of life-cycle modules
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum PhaseGroup {
    /// A1–A5
    Construction,
    /// B1–B7
    Use,
    /// C1–C4
    EndOfLife,
    /// D
    Recovery,
}

impl PhaseGroup {
    pub const ALL: [PhaseGroup; 4] = [
        PhaseGroup::Construction,
        PhaseGroup::Use,
        PhaseGroup::EndOfLife,
        PhaseGroup::Recovery,
    ];

    /// Canonical name accepted by [`PhaseGroup::from_name`]
    pub fn name(&self) -> &'static str {
        match self {
            PhaseGroup::Construction => "construction",
            PhaseGroup::Use => "use",
            PhaseGroup::EndOfLife => "endOfLife",
            PhaseGroup::Recovery => "recovery",
        }
    }

    /// Module range label (A1-A5, B1-B7, C1-C4, D)
    pub fn range(&self) -> &'static str {
        match self {
            PhaseGroup::Construction => "A1-A5",
            PhaseGroup::Use => "B1-B7",
            PhaseGroup::EndOfLife => "C1-C4",
            PhaseGroup::Recovery => "D",
        }
    }

    pub fn phases(&self) -> impl Iterator<Item = Phase> + '_ {
        Phase::ALL.into_iter().filter(move |p| p.group() == *self)
    }

    /// Parse a group name or module range, case-insensitive.
    pub fn from_name(name: &str) -> Option<Self> {
        let normalized: String = name
            .trim()
            .chars()
            .filter(|c| !matches!(c, '_' | '-' | ' '))
            .collect::<String>()
            .to_ascii_lowercase();
        match normalized.as_str() {
            "construction" | "a1a5" | "a1toa5" => Some(PhaseGroup::Construction),
            "use" | "b1b7" | "b1tob7" => Some(PhaseGroup::Use),
            "endoflife" | "eol" | "c1c4" | "c1toc4" => Some(PhaseGroup::EndOfLife),
            "recovery" | "d" => Some(PhaseGroup::Recovery),
            _ => None,
        }
    }
}

impl std::fmt::Display for PhaseGroup {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// A set of phase groups. Selecting a group twice has no extra effect.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct PhaseSelection {
    selected: [bool; 4],
}

impl PhaseSelection {
    pub fn none() -> Self {
        PhaseSelection::default()
    }

    pub fn all() -> Self {
        PhaseSelection { selected: [true; 4] }
    }

    pub fn with(mut self, group: PhaseGroup) -> Self {
        self.insert(group);
        self
    }

    pub fn insert(&mut self, group: PhaseGroup) {
        self.selected[group as usize] = true;
    }

    pub fn contains(&self, group: PhaseGroup) -> bool {
        self.selected[group as usize]
    }

    pub fn is_empty(&self) -> bool {
        !self.selected.iter().any(|s| *s)
    }

    pub fn groups(&self) -> impl Iterator<Item = PhaseGroup> + '_ {
        PhaseGroup::ALL.into_iter().filter(move |g| self.contains(*g))
    }

    /// Build a selection from group names.
    ///
    /// Unknown names are skipped under [`NamePolicy::Lenient`] and rejected
    /// with [`CarbonError::UnknownPhase`] under [`NamePolicy::Strict`].
    pub fn from_names<S: AsRef<str>>(names: &[S], policy: NamePolicy) -> CarbonResult<Self> {
        let mut selection = PhaseSelection::none();
        for name in names {
            let name = name.as_ref();
            match PhaseGroup::from_name(name) {
                Some(group) => selection.insert(group),
                None => match policy {
                    NamePolicy::Lenient => {
                        tracing::warn!(phase = name, "unknown phase group ignored");
                    }
                    NamePolicy::Strict => return Err(CarbonError::unknown_phase(name)),
                },
            }
        }
        Ok(selection)
    }
}

impl FromIterator<PhaseGroup> for PhaseSelection {
    fn from_iter<I: IntoIterator<Item = PhaseGroup>>(iter: I) -> Self {
        let mut selection = PhaseSelection::none();
        for group in iter {
            selection.insert(group);
        }
        selection
    }
}
