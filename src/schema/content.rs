use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

use super::entity::EntityKind;
use super::field::OverrideValue;

#[derive(Debug, Error)]
pub enum ContentError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("RON deserialization error: {0}")]
    Ron(#[from] ron::error::SpannedError),
}

fn one() -> u32 {
    1
}

/// Author intent to derive a new entity from a catalog template.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CustomizationSpec {
    pub name: String,
    pub based_on: String,
    #[serde(default)]
    pub level: Option<u32>,
    #[serde(default)]
    pub modifications: IndexMap<String, OverrideValue>,
}

/// An NPC or item record: either a plain reference (`name`, optional
/// `level`) or, when `based_on` is present, a customization.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntitySpec {
    pub name: String,
    #[serde(default)]
    pub level: Option<u32>,
    #[serde(default)]
    pub based_on: Option<String>,
    #[serde(default)]
    pub modifications: IndexMap<String, OverrideValue>,
    #[serde(default)]
    pub count: Option<u32>,
}

impl EntitySpec {
    pub fn reference(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            level: None,
            based_on: None,
            modifications: IndexMap::new(),
            count: None,
        }
    }

    pub fn is_custom(&self) -> bool {
        self.based_on.is_some()
    }

    /// Returns the customization this record requests, if any.
    pub fn customization(&self) -> Option<CustomizationSpec> {
        self.based_on.as_ref().map(|based_on| CustomizationSpec {
            name: self.name.clone(),
            based_on: based_on.clone(),
            level: self.level,
            modifications: self.modifications.clone(),
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParcelItem {
    pub name: String,
    #[serde(default = "one")]
    pub count: u32,
}

/// A treasure bundle referencing module items by name.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParcelSpec {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub items: Vec<ParcelItem>,
    /// Coin denomination (e.g. "GP") to amount.
    #[serde(default)]
    pub coins: IndexMap<String, u32>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImageSpec {
    pub name: String,
    pub file: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Faction {
    #[default]
    Foe,
    Friend,
    Neutral,
}

impl Faction {
    pub fn tag(&self) -> &'static str {
        match self {
            Self::Foe => "foe",
            Self::Friend => "friend",
            Self::Neutral => "neutral",
        }
    }
}

/// One NPC row in an encounter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EncounterSlot {
    pub creature: String,
    #[serde(default)]
    pub level: Option<u32>,
    #[serde(default)]
    pub based_on: Option<String>,
    #[serde(default = "one")]
    pub count: u32,
    #[serde(default)]
    pub faction: Faction,
    /// Links the slot to a differently named NPC variant.
    #[serde(default)]
    pub display_name: Option<String>,
}

impl EncounterSlot {
    /// The NPC name this slot links to.
    pub fn link_name(&self) -> &str {
        self.display_name.as_deref().unwrap_or(&self.creature)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EncounterSpec {
    pub name: String,
    #[serde(default)]
    pub exp: u32,
    #[serde(default)]
    pub npcs: Vec<EncounterSlot>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TextStyle {
    Header,
    ReadAloud,
    GmNotes,
}

/// A block of a narrative passage: prose, or a named link to another entity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum StorySection {
    Text {
        style: TextStyle,
        text: String,
    },
    Link {
        kind: EntityKind,
        target: String,
        #[serde(default)]
        text: Option<String>,
    },
}

impl StorySection {
    /// Text shown for a link section, defaulting to "<Kind>: <target>".
    pub fn link_text(&self) -> Option<String> {
        match self {
            Self::Text { .. } => None,
            Self::Link { kind, target, text } => Some(
                text.clone()
                    .unwrap_or_else(|| format!("{}: {}", link_label(*kind), target)),
            ),
        }
    }
}

fn link_label(kind: EntityKind) -> &'static str {
    match kind {
        EntityKind::Npc => "NPC",
        EntityKind::Item => "Item",
        EntityKind::Parcel => "Treasure",
        EntityKind::Image => "Map",
        EntityKind::Story => "Story",
        EntityKind::Encounter => "Encounter",
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StorySpec {
    pub name: String,
    #[serde(default)]
    pub sections: Vec<StorySection>,
}

/// Parsed author content for one module, grouped by entity kind.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ModuleContent {
    #[serde(default)]
    pub npcs: Vec<EntitySpec>,
    #[serde(default)]
    pub items: Vec<EntitySpec>,
    #[serde(default)]
    pub parcels: Vec<ParcelSpec>,
    #[serde(default)]
    pub images: Vec<ImageSpec>,
    #[serde(default)]
    pub encounters: Vec<EncounterSpec>,
    #[serde(default)]
    pub stories: Vec<StorySpec>,
}

impl ModuleContent {
    /// Load module content from a RON file.
    pub fn load_from_ron(path: &Path) -> Result<ModuleContent, ContentError> {
        let contents = std::fs::read_to_string(path)?;
        Self::parse_ron(&contents)
    }

    /// Parse module content from a RON string.
    pub fn parse_ron(input: &str) -> Result<ModuleContent, ContentError> {
        Ok(ron::from_str(input)?)
    }

    /// Append another content set, e.g. when a module is split across files.
    pub fn merge(&mut self, other: ModuleContent) {
        self.npcs.extend(other.npcs);
        self.items.extend(other.items);
        self.parcels.extend(other.parcels);
        self.images.extend(other.images);
        self.encounters.extend(other.encounters);
        self.stories.extend(other.stories);
    }

    pub fn is_empty(&self) -> bool {
        self.npcs.is_empty()
            && self.items.is_empty()
            && self.parcels.is_empty()
            && self.images.is_empty()
            && self.encounters.is_empty()
            && self.stories.is_empty()
    }

    /// Whether an entity of `kind` with this display name is declared.
    pub fn declares(&self, kind: EntityKind, name: &str) -> bool {
        match kind {
            EntityKind::Npc => {
                self.npcs.iter().any(|n| n.name == name)
                    || self
                        .encounters
                        .iter()
                        .flat_map(|e| e.npcs.iter())
                        .any(|slot| slot.link_name() == name)
            }
            EntityKind::Item => self.items.iter().any(|i| i.name == name),
            EntityKind::Parcel => self.parcels.iter().any(|p| p.name == name),
            EntityKind::Image => self.images.iter().any(|i| i.name == name),
            EntityKind::Story => self.stories.iter().any(|s| s.name == name),
            EntityKind::Encounter => self.encounters.iter().any(|e| e.name == name),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const CONTENT: &str = r#"#![enable(implicit_some)]
(
    npcs: [
        (name: "Wolf"),
        (name: "Skauril", based_on: "Warrior", level: 15, modifications: { "hits": 150 }),
    ],
    items: [(name: "Broadsword", count: 2)],
    encounters: [
        (
            name: "Ambush at the Ford",
            exp: 250,
            npcs: [(creature: "Wolf", count: 3), (creature: "Skauril", faction: Neutral)],
        ),
    ],
    stories: [
        (
            name: "The Ford",
            sections: [
                Text(style: ReadAloud, text: "Water rushes over the stones."),
                Link(kind: Encounter, target: "Ambush at the Ford"),
            ],
        ),
    ],
)"#;

    #[test]
    fn parse_content() {
        let content = ModuleContent::parse_ron(CONTENT).unwrap();
        assert_eq!(content.npcs.len(), 2);
        assert!(!content.npcs[0].is_custom());
        assert!(content.npcs[1].is_custom());
        assert_eq!(content.npcs[1].level, Some(15));
        assert_eq!(content.items[0].count, Some(2));
        assert_eq!(content.encounters[0].npcs[0].count, 3);
        assert_eq!(content.encounters[0].npcs[0].faction, Faction::Foe);
        assert_eq!(content.encounters[0].npcs[1].faction, Faction::Neutral);
        assert!(content.parcels.is_empty());
    }

    #[test]
    fn customization_from_spec() {
        let content = ModuleContent::parse_ron(CONTENT).unwrap();
        assert!(content.npcs[0].customization().is_none());
        let custom = content.npcs[1].customization().unwrap();
        assert_eq!(custom.name, "Skauril");
        assert_eq!(custom.based_on, "Warrior");
        assert_eq!(custom.level, Some(15));
        assert_eq!(custom.modifications["hits"], OverrideValue::Int(150));
    }

    #[test]
    fn link_text_defaults() {
        let content = ModuleContent::parse_ron(CONTENT).unwrap();
        let sections = &content.stories[0].sections;
        assert_eq!(sections[0].link_text(), None);
        assert_eq!(
            sections[1].link_text().as_deref(),
            Some("Encounter: Ambush at the Ford")
        );
    }

    #[test]
    fn declares_by_kind() {
        let content = ModuleContent::parse_ron(CONTENT).unwrap();
        assert!(content.declares(EntityKind::Npc, "Skauril"));
        assert!(content.declares(EntityKind::Encounter, "Ambush at the Ford"));
        assert!(!content.declares(EntityKind::Item, "Skauril"));
        assert!(!content.declares(EntityKind::Image, "Map of the Ford"));
    }

    #[test]
    fn renamed_slot_declares_only_its_display_name() {
        let content = ModuleContent::parse_ron(
            r#"#![enable(implicit_some)]
            (encounters: [(name: "Den", npcs: [(creature: "Wolf", display_name: "Alpha Wolf")])])"#,
        )
        .unwrap();
        assert!(content.declares(EntityKind::Npc, "Alpha Wolf"));
        assert!(!content.declares(EntityKind::Npc, "Wolf"));
    }

    #[test]
    fn merge_appends() {
        let mut base = ModuleContent::parse_ron(CONTENT).unwrap();
        let extra = ModuleContent {
            images: vec![ImageSpec {
                name: "Ford Map".to_string(),
                file: "ford.jpg".to_string(),
            }],
            ..Default::default()
        };
        base.merge(extra);
        assert_eq!(base.images.len(), 1);
        assert_eq!(base.npcs.len(), 2);
        assert!(!base.is_empty());
        assert!(ModuleContent::default().is_empty());
    }
}
