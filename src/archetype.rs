//! Fixed vocabulary of the engine: the two axes, the eight archetypes per
//! axis, and the ordered stages of the adaptive protocol.
//!
//! Archetypes are the eight trigrams in Fu Xi ("earlier heaven") order.
//! The same eight categories are used on both axes; a classified pair
//! (intrinsic, external) names one hexagram downstream.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Number of archetypes on every axis.
pub const ARCHETYPE_COUNT: usize = 8;

/// One of the two independent classification dimensions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Axis {
    /// Intrinsic motivation (inner trigram).
    Intrinsic,
    /// External behavior (outer trigram).
    External,
}

impl Axis {
    pub const ALL: [Axis; 2] = [Axis::Intrinsic, Axis::External];

    pub fn index(self) -> usize {
        self as usize
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Axis::Intrinsic => "intrinsic",
            Axis::External => "external",
        }
    }

    /// The axis that is not `self`.
    pub fn other(self) -> Axis {
        match self {
            Axis::Intrinsic => Axis::External,
            Axis::External => Axis::Intrinsic,
        }
    }
}

impl fmt::Display for Axis {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Axis {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "intrinsic" | "inner" | "motivation" => Ok(Axis::Intrinsic),
            "external" | "outer" | "behavior" | "behaviour" => Ok(Axis::External),
            other => Err(format!("unknown axis '{other}'")),
        }
    }
}

/// The eight archetypes, in the fixed order used by every coefficient row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Archetype {
    Qian,
    Dui,
    Li,
    Zhen,
    Xun,
    Kan,
    Gen,
    Kun,
}

impl Archetype {
    /// All archetypes in canonical order.
    pub const ALL: [Archetype; ARCHETYPE_COUNT] = [
        Archetype::Qian,
        Archetype::Dui,
        Archetype::Li,
        Archetype::Zhen,
        Archetype::Xun,
        Archetype::Kan,
        Archetype::Gen,
        Archetype::Kun,
    ];

    pub fn index(self) -> usize {
        self as usize
    }

    pub fn from_index(idx: usize) -> Option<Archetype> {
        Self::ALL.get(idx).copied()
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Archetype::Qian => "qian",
            Archetype::Dui => "dui",
            Archetype::Li => "li",
            Archetype::Zhen => "zhen",
            Archetype::Xun => "xun",
            Archetype::Kan => "kan",
            Archetype::Gen => "gen",
            Archetype::Kun => "kun",
        }
    }

    /// Natural image of the trigram, used in logs and reports.
    pub fn image(self) -> &'static str {
        match self {
            Archetype::Qian => "heaven",
            Archetype::Dui => "lake",
            Archetype::Li => "fire",
            Archetype::Zhen => "thunder",
            Archetype::Xun => "wind",
            Archetype::Kan => "water",
            Archetype::Gen => "mountain",
            Archetype::Kun => "earth",
        }
    }
}

impl fmt::Display for Archetype {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Archetype {
    type Err = String;

    /// Accepts the trigram name or its natural image, case-insensitive.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let needle = s.trim().to_ascii_lowercase();
        Archetype::ALL
            .iter()
            .copied()
            .find(|a| a.as_str() == needle || a.image() == needle)
            .ok_or_else(|| format!("unknown archetype '{}'", s.trim()))
    }
}

/// Phase of the adaptive protocol on one axis.
///
/// Ordered: an axis only ever moves forward through these.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Exploration,
    Discrimination,
    Confirmation,
    Completed,
}

impl Stage {
    /// The three stages that ask questions.
    pub const ACTIVE: [Stage; 3] = [Stage::Exploration, Stage::Discrimination, Stage::Confirmation];

    pub fn index(self) -> usize {
        self as usize
    }

    /// Successor stage; `Completed` is terminal.
    pub fn next(self) -> Stage {
        match self {
            Stage::Exploration => Stage::Discrimination,
            Stage::Discrimination => Stage::Confirmation,
            Stage::Confirmation | Stage::Completed => Stage::Completed,
        }
    }

    pub fn is_terminal(self) -> bool {
        self == Stage::Completed
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Stage::Exploration => "exploration",
            Stage::Discrimination => "discrimination",
            Stage::Confirmation => "confirmation",
            Stage::Completed => "completed",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Stage {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "exploration" | "explore" => Ok(Stage::Exploration),
            "discrimination" | "discriminate" => Ok(Stage::Discrimination),
            "confirmation" | "confirm" => Ok(Stage::Confirmation),
            other => Err(format!("unknown stage tag '{other}'")),
        }
    }
}
