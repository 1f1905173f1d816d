use serde::{Deserialize, Serialize};
use std::fmt;

use super::field::{Field, FieldMap, FieldValue};

/// Field holding an entry's level, for leveled templates.
pub const LEVEL_FIELD: &str = "level";
/// Field holding an NPC template's profession.
pub const PROFESSION_FIELD: &str = "profession";
/// Field holding a creature's group (e.g. "Animals").
pub const GROUP_FIELD: &str = "group";

/// The kind of an emitted module entity. Registry names are namespaced
/// by kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum EntityKind {
    Npc,
    Item,
    Parcel,
    Image,
    Story,
    Encounter,
}

impl EntityKind {
    pub const ALL: [EntityKind; 6] = [
        Self::Npc,
        Self::Item,
        Self::Parcel,
        Self::Image,
        Self::Story,
        Self::Encounter,
    ];

    /// Returns the tag string for this kind (e.g., "npc").
    pub fn tag(&self) -> &'static str {
        match self {
            Self::Npc => "npc",
            Self::Item => "item",
            Self::Parcel => "parcel",
            Self::Image => "image",
            Self::Story => "story",
            Self::Encounter => "encounter",
        }
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

/// Newtype wrapper for the identifier assigned to an emitted entity,
/// e.g. `id-00042`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct RecordId(pub String);

impl RecordId {
    /// Width of the zero-padded sequence number.
    pub const WIDTH: usize = 5;

    pub fn from_sequence(n: u32) -> Self {
        Self(format!("id-{:0width$}", n, width = Self::WIDTH))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A record from the reference catalog. Read-only once the catalog is built.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogEntry {
    pub name: String,
    /// Originating source; filled from the enclosing source file when loading.
    #[serde(default)]
    pub source: String,
    pub id: String,
    /// Source-specific reference locator. Custom entities have none.
    #[serde(default)]
    pub reference: Option<String>,
    #[serde(default)]
    pub fields: FieldMap,
}

impl CatalogEntry {
    pub fn new(name: impl Into<String>, source: impl Into<String>, id: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            source: source.into(),
            id: id.into(),
            reference: None,
            fields: FieldMap::new(),
        }
    }

    /// Builder-style helper used mostly by fixtures and tests.
    pub fn with_field(mut self, key: &str, value: FieldValue) -> Self {
        self.fields.insert(key.to_string(), Field::Value(value));
        self
    }

    pub fn with_reference(mut self, reference: impl Into<String>) -> Self {
        self.reference = Some(reference.into());
        self
    }

    /// Lowercased display name, the key used by every name index.
    pub fn key(&self) -> String {
        self.name.to_lowercase()
    }

    pub fn value(&self, field: &str) -> Option<&FieldValue> {
        self.fields.get(field).and_then(Field::as_value)
    }

    pub fn text(&self, field: &str) -> Option<&str> {
        self.value(field).map(|v| v.raw.as_str())
    }

    pub fn number(&self, field: &str) -> Option<i64> {
        self.value(field).and_then(FieldValue::as_i64)
    }

    pub fn level(&self) -> Option<i64> {
        self.number(LEVEL_FIELD)
    }

    pub fn profession(&self) -> Option<&str> {
        self.text(PROFESSION_FIELD).filter(|p| !p.is_empty())
    }

    pub fn group(&self) -> Option<&str> {
        self.text(GROUP_FIELD).filter(|g| !g.is_empty())
    }
}

/// Where a synthesized entity came from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Provenance {
    pub is_custom: bool,
    /// Display name of the base entry, used for downstream defaulting
    /// (e.g. picking default equipment by base template).
    pub based_on: String,
    pub based_on_source: String,
    pub based_on_reference: Option<String>,
}

/// A custom entity built from a catalog entry plus overrides. The entry is a
/// disjoint copy; the catalog is never aliased.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SynthesizedEntity {
    pub entry: CatalogEntry,
    pub provenance: Provenance,
}

impl SynthesizedEntity {
    pub fn name(&self) -> &str {
        &self.entry.name
    }

    pub fn is_custom(&self) -> bool {
        self.provenance.is_custom
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_entry() -> CatalogEntry {
        CatalogEntry::new("Animist Level 05", "Character Law", "id-00012")
            .with_reference("reference.npcs.animist05@Character Law")
            .with_field("profession", FieldValue::string("Animist"))
            .with_field("level", FieldValue::number("5"))
            .with_field("hits", FieldValue::number("34"))
    }

    #[test]
    fn entry_accessors() {
        let entry = make_entry();
        assert_eq!(entry.key(), "animist level 05");
        assert_eq!(entry.level(), Some(5));
        assert_eq!(entry.profession(), Some("Animist"));
        assert_eq!(entry.number("hits"), Some(34));
        assert_eq!(entry.group(), None);
        assert!(entry.text("missing").is_none());
    }

    #[test]
    fn kind_tags() {
        assert_eq!(EntityKind::Npc.tag(), "npc");
        assert_eq!(EntityKind::Parcel.tag(), "parcel");
        assert_eq!(EntityKind::Encounter.to_string(), "encounter");
        assert_eq!(EntityKind::ALL.len(), 6);
    }

    #[test]
    fn record_id_is_fixed_width() {
        assert_eq!(RecordId::from_sequence(1).as_str(), "id-00001");
        assert_eq!(RecordId::from_sequence(42).to_string(), "id-00042");
        assert_eq!(RecordId::from_sequence(123456).as_str(), "id-123456");
    }

    #[test]
    fn entry_ron_round_trip() {
        let entry = make_entry();
        let serialized = ron::to_string(&entry).unwrap();
        let deserialized: CatalogEntry = ron::from_str(&serialized).unwrap();
        assert_eq!(deserialized, entry);
    }

    #[test]
    fn entry_source_defaults_when_absent() {
        let entry: CatalogEntry = ron::from_str(r#"(name: "Wolf", id: "id-00003")"#).unwrap();
        assert_eq!(entry.source, "");
        assert!(entry.reference.is_none());
        assert!(entry.fields.is_empty());
    }
}
