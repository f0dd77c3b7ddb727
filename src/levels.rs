//! Proficiency level taxonomy
//!
//! Ordered CEFR-style ladder used for progression display and module access
//! comparisons. Labels arrive from several historical sources (legacy cohort
//! names, stored profiles, defaults), so normalization has to be total: any
//! string maps to a canonical label.

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
/// Canonical Level Sequence
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum Level {
    #[default]
    A1,
    A2,
    #[serde(rename = "A2+")]
    A2Plus,
    B1,
    #[serde(rename = "B1+")]
    B1Plus,
    B2,
    #[serde(rename = "B2+")]
    B2Plus,
    C1,
    #[serde(rename = "C1+")]
    C1Plus,
    C2,
}

/// Fixed progression order, lowest to highest
pub const LEVEL_SEQUENCE: [Level; 10] = [
    Level::A1,
    Level::A2,
    Level::A2Plus,
    Level::B1,
    Level::B1Plus,
    Level::B2,
    Level::B2Plus,
    Level::C1,
    Level::C1Plus,
    Level::C2,
];

impl Level {
    pub fn as_str(&self) -> &'static str {
        match self {
            Level::A1 => "A1",
            Level::A2 => "A2",
            Level::A2Plus => "A2+",
            Level::B1 => "B1",
            Level::B1Plus => "B1+",
            Level::B2 => "B2",
            Level::B2Plus => "B2+",
            Level::C1 => "C1",
            Level::C1Plus => "C1+",
            Level::C2 => "C2",
        }
    }

    /// Position in the canonical sequence
    fn rank(self) -> usize {
        self as usize
    }

    /// Strict parser: canonical labels only, no legacy mapping
    pub fn from_canonical(raw: &str) -> Option<Level> {
        LEVEL_SEQUENCE.iter().copied().find(|l| l.as_str() == raw)
    }

    /// Legacy cohort names from the pre-CEFR labeling scheme
    fn from_legacy(raw: &str) -> Option<Level> {
        match raw {
            "Discoverer" => Some(Level::A1),
            "Pathfinder" => Some(Level::A2),
            "Communicator" => Some(Level::B1),
            "Connector" => Some(Level::B2),
            "Storyteller" => Some(Level::C1),
            _ => None,
        }
    }

    /// Total normalization: canonical label, legacy name, or the lowest
    /// level when unrecognized. Never fails.
    pub fn normalize(raw: &str) -> Level {
        let trimmed = raw.trim();
        Level::from_canonical(trimmed)
            .or_else(|| Level::from_legacy(trimmed))
            .unwrap_or_default()
    }

    /// The label immediately following this one, None at the top
    pub fn next(self) -> Option<Level> {
        LEVEL_SEQUENCE.get(self.rank() + 1).copied()
    }
}

impl std::fmt::Display for Level {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// ---------------------------------------------------------------------------
/// Access Comparison
// ---------------------------------------------------------------------------

/// Whether a user at `current` may enter content tagged `target`.
///
/// Fail-open: missing or unrecognized labels on either side grant access.
/// Deliberately uses the strict parser so legacy names stay permissive here
/// even though `normalize` would map them.
pub fn can_access_level(current: Option<&str>, target: Option<&str>) -> bool {
    let (Some(current), Some(target)) = (current, target) else {
        return true;
    };
    match (Level::from_canonical(current), Level::from_canonical(target)) {
        (Some(current), Some(target)) => target.rank() <= current.rank(),
        _ => true,
    }
}

// ---------------------------------------------------------------------------
/// Tests
// ---------------------------------------------------------------------------
