//! Item catalog: the read-only question bank shared by every session.
//!
//! - `parse`: tolerant delimited-text parser (bad rows are skipped)
//! - `source`: where catalog text comes from (memory, file, HTTP)
//! - `loader`: one shared in-flight load with a built-in fallback
//! - `defaults`: the fallback catalog

pub mod defaults;
pub mod loader;
pub mod parse;
pub mod source;

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::archetype::{Archetype, Axis, Stage, ARCHETYPE_COUNT};

pub use loader::{CatalogLoader, CatalogOrigin, LoadedCatalog};
pub use parse::{
    parse_catalog, parse_catalog_with_delimiter, render_catalog, ParseReport, SkippedRow,
};
pub use source::{CatalogSource, FileCatalogSource, HttpCatalogSource, StaticCatalogSource};

/// Number of answer options on every item.
pub const OPTION_COUNT: usize = 4;

#[derive(Debug, thiserror::Error)]
pub enum CatalogError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("catalog endpoint returned status {0}")]
    Status(u16),
    #[error("catalog contained no usable items")]
    Empty,
}

// ---------------------------------------------------------------------
//  Items
// ---------------------------------------------------------------------

/// Bilingual display text.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct LocalizedText {
    pub en: String,
    pub zh: String,
}

impl LocalizedText {
    pub fn new(en: impl Into<String>, zh: impl Into<String>) -> Self {
        Self {
            en: en.into(),
            zh: zh.into(),
        }
    }
}

/// Identifier of one of the four answer options.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum OptionKey {
    A,
    B,
    C,
    D,
}

impl OptionKey {
    pub const ALL: [OptionKey; OPTION_COUNT] = [OptionKey::A, OptionKey::B, OptionKey::C, OptionKey::D];

    pub fn index(self) -> usize {
        self as usize
    }

    pub fn from_index(idx: usize) -> Option<OptionKey> {
        Self::ALL.get(idx).copied()
    }

    pub fn as_str(self) -> &'static str {
        match self {
            OptionKey::A => "A",
            OptionKey::B => "B",
            OptionKey::C => "C",
            OptionKey::D => "D",
        }
    }
}

impl fmt::Display for OptionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OptionKey {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "A" | "a" | "0" => Ok(OptionKey::A),
            "B" | "b" | "1" => Ok(OptionKey::B),
            "C" | "c" | "2" => Ok(OptionKey::C),
            "D" | "d" | "3" => Ok(OptionKey::D),
            other => Err(format!("unknown option '{other}'")),
        }
    }
}

/// One answer choice with its per-archetype impact coefficients.
///
/// `impacts[a]` approximates P(this option is chosen | archetype a).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ItemOption {
    pub key: OptionKey,
    pub text: LocalizedText,
    pub impacts: [f64; ARCHETYPE_COUNT],
}

impl ItemOption {
    pub fn impact(&self, archetype: Archetype) -> f64 {
        self.impacts[archetype.index()]
    }
}

/// An assessment question.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Item {
    pub id: String,
    pub axis: Axis,
    pub prompt: LocalizedText,
    pub options: [ItemOption; OPTION_COUNT],
    pub difficulty: f64,
    pub information_value: f64,
    /// Stage this item was written for, if any.
    pub stage: Option<Stage>,
    /// Archetypes this item is designed to tell apart. Empty when untargeted.
    pub targets: Vec<Archetype>,
}

impl Item {
    pub fn option(&self, key: OptionKey) -> &ItemOption {
        &self.options[key.index()]
    }

    pub fn targets_archetype(&self, archetype: Archetype) -> bool {
        self.targets.contains(&archetype)
    }

    /// True when some coefficient is zero, negative or non-finite.
    pub fn has_degenerate_impacts(&self) -> bool {
        self.options
            .iter()
            .flat_map(|o| o.impacts.iter())
            .any(|c| !c.is_finite() || *c <= 0.0)
    }
}

// ---------------------------------------------------------------------
//  Catalog
// ---------------------------------------------------------------------

#[derive(Debug, Clone, Default)]
pub struct Catalog {
    items: Vec<Item>,
    index: HashMap<String, usize>,
}

impl Catalog {
    /// Build a catalog; later duplicates of an id are dropped.
    pub fn new(items: Vec<Item>) -> Self {
        let mut kept = Vec::with_capacity(items.len());
        let mut index = HashMap::with_capacity(items.len());
        for item in items {
            if index.contains_key(&item.id) {
                tracing::warn!(item_id = %item.id, "duplicate catalog item dropped");
                continue;
            }
            index.insert(item.id.clone(), kept.len());
            kept.push(item);
        }
        Self { items: kept, index }
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn items(&self) -> &[Item] {
        &self.items
    }

    pub fn get(&self, id: &str) -> Option<&Item> {
        self.index.get(id).map(|&i| &self.items[i])
    }

    pub fn for_axis(&self, axis: Axis) -> impl Iterator<Item = &Item> {
        self.items.iter().filter(move |item| item.axis == axis)
    }

    pub fn axis_len(&self, axis: Axis) -> usize {
        self.for_axis(axis).count()
    }
}
