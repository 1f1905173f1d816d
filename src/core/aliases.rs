/// Alias and profession mapping tables consulted before fuzzy matching.

use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AliasError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("RON deserialization error: {0}")]
    Ron(#[from] ron::error::SpannedError),
}

/// Externally maintained translation of informal names into catalog names.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AliasTable {
    /// Profession -> template name, resolved with a level.
    #[serde(default)]
    pub professions: FxHashMap<String, String>,
    /// Creature name -> catalog name.
    #[serde(default)]
    pub creatures: FxHashMap<String, String>,
    /// Generic NPC type (e.g. "Guard") -> template name, resolved with a
    /// level, or a plain catalog name.
    #[serde(default)]
    pub generic_npcs: FxHashMap<String, String>,
    /// Item name -> catalog name.
    #[serde(default)]
    pub items: FxHashMap<String, String>,
}

impl AliasTable {
    /// Load an alias table from a RON file.
    pub fn load_from_ron(path: &Path) -> Result<AliasTable, AliasError> {
        let contents = std::fs::read_to_string(path)?;
        Self::parse_ron(&contents)
    }

    /// Parse an alias table from a RON string.
    pub fn parse_ron(input: &str) -> Result<AliasTable, AliasError> {
        Ok(ron::from_str(input)?)
    }

    /// Merge another table into this one. Entries from `other` override
    /// entries in `self` with the same key.
    pub fn merge(&mut self, other: AliasTable) {
        self.professions.extend(other.professions);
        self.creatures.extend(other.creatures);
        self.generic_npcs.extend(other.generic_npcs);
        self.items.extend(other.items);
    }

    pub fn profession(&self, name: &str) -> Option<&str> {
        self.professions.get(name).map(String::as_str)
    }

    pub fn creature(&self, name: &str) -> Option<&str> {
        self.creatures.get(name).map(String::as_str)
    }

    pub fn generic_npc(&self, name: &str) -> Option<&str> {
        self.generic_npcs.get(name).map(String::as_str)
    }

    pub fn item(&self, name: &str) -> Option<&str> {
        self.items.get(name).map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.professions.is_empty()
            && self.creatures.is_empty()
            && self.generic_npcs.is_empty()
            && self.items.is_empty()
    }
}
