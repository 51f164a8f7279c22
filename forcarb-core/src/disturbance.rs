//! Disturbance Identification
//!
//! Raw disturbance event names arrive as strings, optionally carrying a
//! `"category:"` prefix (for example `"disturbance:fire"`). They are resolved
//! into a closed [`DisturbanceKind`] once, at the boundary, so that the rest
//! of the engine never matches on strings.

use serde::{Deserialize, Serialize};

/// Occurrence-tracking slot names, one per recognised disturbance family.
/// Slot 0 is the catch-all for names matching nothing below it.
pub const DISTURBANCE_SLOT_NAMES: [&str; crate::pools::NUM_DISTURBANCE_SLOTS] = [
    "none", "fire", "harvest", "wind", "bda", "drought", "defol", "other", "land use",
];

/// A resolved disturbance event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum DisturbanceKind {
    /// Wildfire at a severity class 0-5. Severity 0 events are recorded but
    /// move no carbon.
    Fire { severity: u8 },
    /// Timber harvest, with the prescription name when one was supplied.
    /// Rule lookup tries the prescription first and falls back to the
    /// generic `"Harvest"` table.
    Harvest { prescription: Option<String> },
    /// Any other disturbance, matched against the named rule tables.
    Named(String),
}

impl DisturbanceKind {
    /// Resolve a raw event name. A `"category:"` prefix is stripped before
    /// matching; fire and harvest are recognised case-insensitively and
    /// everything else keeps its (stripped) name for table lookup.
    pub fn from_event_name(raw: &str, severity: u8, prescription: Option<&str>) -> DisturbanceKind {
        let name = match raw.find(':') {
            Some(pos) if pos + 1 < raw.len() => &raw[pos + 1..],
            _ => raw,
        };
        if name.eq_ignore_ascii_case("fire") {
            DisturbanceKind::Fire { severity }
        } else if name.eq_ignore_ascii_case("harvest") {
            DisturbanceKind::Harvest {
                prescription: prescription.map(str::to_string),
            }
        } else {
            DisturbanceKind::Named(name.to_string())
        }
    }

    /// Occurrence-tracking slot for this resolved event.
    pub fn slot(&self) -> usize {
        match self {
            DisturbanceKind::Fire { .. } => 1,
            DisturbanceKind::Harvest { .. } => 2,
            DisturbanceKind::Named(name) => Self::slot_index(name),
        }
    }

    /// Occurrence-tracking slot for the raw (unstripped) event name.
    ///
    /// Slots are scanned from the most specific downwards so that a name
    /// such as `"land use"` is not claimed by an earlier entry; unmatched
    /// names land in slot 0.
    pub fn slot_index(raw: &str) -> usize {
        let lowered = raw.to_ascii_lowercase();
        for idx in (1..DISTURBANCE_SLOT_NAMES.len()).rev() {
            if lowered.contains(DISTURBANCE_SLOT_NAMES[idx]) {
                return idx;
            }
        }
        0
    }
}
