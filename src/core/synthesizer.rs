/// Template synthesis: custom entities from a catalog entry plus typed
/// field overrides.

use indexmap::IndexMap;
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::core::catalog::CatalogIndex;
use crate::core::matcher::MatchResult;
use crate::schema::entity::{CatalogEntry, Provenance, SynthesizedEntity};
use crate::schema::field::{Field, FieldMap, FieldType, FieldValue, OverrideValue};

/// Fields that mirror the display name and are rewritten with it.
const IDENTITY_FIELDS: [&str; 2] = ["name", "nonid_name"];

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SynthesisError {
    #[error("cannot synthesize '{new_name}': base '{requested}' was not resolved")]
    UnresolvedBase { requested: String, new_name: String },
}

/// Declared type for fields an override creates from scratch.
///
/// This is a curated table, not a scan of the catalog. Extend it through
/// configuration when new numeric or text fields appear; anything not listed
/// is created as a plain string.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FieldTypeTable(pub FxHashMap<String, FieldType>);

impl FieldTypeTable {
    pub fn empty() -> Self {
        Self(FxHashMap::default())
    }

    pub fn insert(&mut self, field: impl Into<String>, field_type: FieldType) {
        self.0.insert(field.into(), field_type);
    }

    /// Declared type for `field`, defaulting to string.
    pub fn infer(&self, field: &str) -> FieldType {
        self.0.get(field).copied().unwrap_or(FieldType::String)
    }
}

impl Default for FieldTypeTable {
    fn default() -> Self {
        let mut table = Self::empty();
        // hit points, armor type, defensive bonus, level, movement rate, reach
        for field in ["hits", "hp", "at", "db", "level", "baserate", "reach", "outlook"] {
            table.insert(field, FieldType::Number);
        }
        for field in [
            "profession",
            "race",
            "group",
            "subgroup",
            "abilities",
            "description",
            "spells",
            "stats",
            "size",
        ] {
            table.insert(field, FieldType::String);
        }
        table
    }
}

/// Deterministic identifier for a custom entity.
pub fn custom_id(name: &str) -> String {
    format!("id-custom-{}", name.to_lowercase().replace(' ', "_"))
}

/// Builds custom entities. Never assigns registry identifiers; the caller
/// does that right after synthesis.
#[derive(Debug, Clone, Default)]
pub struct TemplateSynthesizer {
    field_types: FieldTypeTable,
}

impl TemplateSynthesizer {
    pub fn new(field_types: FieldTypeTable) -> Self {
        Self { field_types }
    }

    pub fn field_types(&self) -> &FieldTypeTable {
        &self.field_types
    }

    /// Deep-copy `base`, rewrite its identity as `new_name`, and merge the
    /// overrides. `base` is left untouched.
    pub fn synthesize(
        &self,
        base: &CatalogEntry,
        new_name: &str,
        overrides: &IndexMap<String, OverrideValue>,
    ) -> SynthesizedEntity {
        let mut entry = base.clone();
        entry.name = new_name.to_string();
        entry.id = custom_id(new_name);
        entry.reference = None;

        for field in IDENTITY_FIELDS {
            if let Some(Field::Value(value)) = entry.fields.get_mut(field) {
                value.raw = new_name.to_string();
            }
        }

        for (field, value) in overrides {
            self.apply_override(&mut entry.fields, field, value);
        }

        SynthesizedEntity {
            entry,
            provenance: Provenance {
                is_custom: true,
                based_on: base.name.clone(),
                based_on_source: base.source.clone(),
                based_on_reference: base.reference.clone(),
            },
        }
    }

    /// Synthesize from a match. Passing an unresolved match is a caller bug.
    pub fn synthesize_from_match(
        &self,
        base: &MatchResult<'_>,
        new_name: &str,
        overrides: &IndexMap<String, OverrideValue>,
    ) -> Result<SynthesizedEntity, SynthesisError> {
        match base.entry {
            Some(entry) if base.found => Ok(self.synthesize(entry, new_name, overrides)),
            _ => Err(SynthesisError::UnresolvedBase {
                requested: base.original_name.clone(),
                new_name: new_name.to_string(),
            }),
        }
    }

    /// Look `name` up in `catalog` and synthesize from it. `None` if the
    /// name is unknown.
    pub fn copy_for_modification(
        &self,
        catalog: &CatalogIndex,
        name: &str,
        preferred_source: Option<&str>,
        new_name: &str,
        overrides: &IndexMap<String, OverrideValue>,
    ) -> Option<SynthesizedEntity> {
        let base = catalog.find_by_name(name, preferred_source)?;
        Some(self.synthesize(base, new_name, overrides))
    }

    // An existing typed field keeps its declared type; only the value
    // changes. Anything else gets a fresh field typed from the table.
    fn apply_override(&self, fields: &mut FieldMap, field: &str, value: &OverrideValue) {
        let raw = value.to_string();
        match fields.get_mut(field) {
            Some(Field::Value(existing)) => existing.raw = raw,
            Some(slot @ Field::Group(_)) => {
                *slot = Field::Value(FieldValue::new(self.field_types.infer(field), raw));
            }
            None => {
                fields.insert(
                    field.to_string(),
                    Field::Value(FieldValue::new(self.field_types.infer(field), raw)),
                );
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::matcher::MatchMethod;

    fn warrior() -> CatalogEntry {
        let mut weapons = FieldMap::new();
        weapons.insert(
            "id-00001".to_string(),
            Field::Group(FieldMap::from([(
                "name".to_string(),
                Field::Value(FieldValue::string("Broadsword")),
            )])),
        );
        let mut entry = CatalogEntry::new("Warrior Level 15", "Character Law", "cl-15")
            .with_reference("reference.npcs.warrior15@Character Law")
            .with_field("name", FieldValue::string("Warrior Level 15"))
            .with_field("nonid_name", FieldValue::string("Warrior Level 15"))
            .with_field("profession", FieldValue::string("Warrior"))
            .with_field("level", FieldValue::number("15"))
            .with_field("hits", FieldValue::number("120"))
            .with_field("notes", FieldValue::new(FieldType::FormattedText, "<p>Veteran</p>"));
        entry.fields.insert("weapons".to_string(), Field::Group(weapons));
        entry
    }

    fn overrides(pairs: &[(&str, OverrideValue)]) -> IndexMap<String, OverrideValue> {
        pairs.iter().map(|(k, v)| (k.to_string(), v.clone())).collect()
    }

    #[test]
    fn identity_rewritten() {
        let synth = TemplateSynthesizer::default();
        let custom = synth.synthesize(&warrior(), "Skauril the Bold", &IndexMap::new());
        assert_eq!(custom.entry.name, "Skauril the Bold");
        assert_eq!(custom.entry.id, "id-custom-skauril_the_bold");
        assert!(custom.entry.reference.is_none());
        assert_eq!(custom.entry.text("name"), Some("Skauril the Bold"));
        assert_eq!(custom.entry.text("nonid_name"), Some("Skauril the Bold"));
        assert!(custom.is_custom());
        assert_eq!(custom.provenance.based_on, "Warrior Level 15");
        assert_eq!(custom.provenance.based_on_source, "Character Law");
        assert_eq!(
            custom.provenance.based_on_reference.as_deref(),
            Some("reference.npcs.warrior15@Character Law")
        );
    }

    #[test]
    fn existing_field_keeps_type() {
        let synth = TemplateSynthesizer::default();
        let custom = synth.synthesize(
            &warrior(),
            "Skauril",
            &overrides(&[
                ("hits", OverrideValue::Int(150)),
                ("notes", OverrideValue::Text("<p>Warlord</p>".to_string())),
            ]),
        );
        assert_eq!(custom.entry.value("hits").unwrap(), &FieldValue::number("150"));
        let notes = custom.entry.value("notes").unwrap();
        assert_eq!(notes.field_type, FieldType::FormattedText);
        assert_eq!(notes.raw, "<p>Warlord</p>");
    }

    #[test]
    fn new_fields_typed_from_table() {
        let synth = TemplateSynthesizer::default();
        let custom = synth.synthesize(
            &warrior(),
            "Skauril",
            &overrides(&[
                ("db", OverrideValue::Int(40)),
                ("race", OverrideValue::Text("Dunadan".to_string())),
                ("motto", OverrideValue::Text("Onward".to_string())),
            ]),
        );
        assert_eq!(custom.entry.value("db").unwrap().field_type, FieldType::Number);
        assert_eq!(custom.entry.value("race").unwrap().field_type, FieldType::String);
        assert_eq!(custom.entry.value("motto").unwrap().field_type, FieldType::String);
    }

    #[test]
    fn table_is_extensible() {
        let mut table = FieldTypeTable::default();
        table.insert("motto", FieldType::FormattedText);
        let synth = TemplateSynthesizer::new(table);
        let custom = synth.synthesize(
            &warrior(),
            "Skauril",
            &overrides(&[("motto", OverrideValue::Text("Onward".to_string()))]),
        );
        assert_eq!(
            custom.entry.value("motto").unwrap().field_type,
            FieldType::FormattedText
        );
    }

    #[test]
    fn group_override_becomes_typed_value() {
        let synth = TemplateSynthesizer::default();
        let custom = synth.synthesize(
            &warrior(),
            "Skauril",
            &overrides(&[("weapons", OverrideValue::Text("none".to_string()))]),
        );
        assert_eq!(custom.entry.value("weapons").unwrap(), &FieldValue::string("none"));
    }

    #[test]
    fn base_untouched_and_other_fields_identical() {
        let synth = TemplateSynthesizer::default();
        let base = warrior();
        let before = base.clone();
        let custom = synth.synthesize(&base, "Skauril", &overrides(&[("hits", OverrideValue::Int(150))]));
        assert_eq!(base, before);
        for (key, field) in &base.fields {
            if ["hits", "name", "nonid_name"].contains(&key.as_str()) {
                continue;
            }
            assert_eq!(custom.entry.fields.get(key), Some(field), "field {}", key);
        }
        // field order preserved
        let keys: Vec<&String> = custom.entry.fields.keys().collect();
        let base_keys: Vec<&String> = base.fields.keys().collect();
        assert_eq!(keys, base_keys);
    }

    #[test]
    fn unresolved_match_is_rejected() {
        let synth = TemplateSynthesizer::default();
        let missing = MatchResult::not_found("Dragon", None);
        assert_eq!(missing.method, MatchMethod::None);
        let err = synth
            .synthesize_from_match(&missing, "Smaug", &IndexMap::new())
            .unwrap_err();
        assert_eq!(
            err,
            SynthesisError::UnresolvedBase {
                requested: "Dragon".to_string(),
                new_name: "Smaug".to_string(),
            }
        );
    }

    #[test]
    fn copy_for_modification_uses_catalog() {
        use crate::core::catalog::{CatalogSource, SourcePriority};
        let catalog = CatalogIndex::build(
            vec![CatalogSource::new("Character Law", vec![warrior()])],
            SourcePriority::npcs(),
        );
        let synth = TemplateSynthesizer::default();
        let custom = synth
            .copy_for_modification(&catalog, "warrior level 15", None, "Skauril", &IndexMap::new())
            .unwrap();
        assert_eq!(custom.provenance.based_on, "Warrior Level 15");
        assert!(synth
            .copy_for_modification(&catalog, "Dragon", None, "Smaug", &IndexMap::new())
            .is_none());
    }
}
