/// Entity matcher: layered resolution of author-written names.
///
/// Strategies run in a fixed order and stop at the first confident hit:
/// exact catalog lookup, alias/profession tables, then fuzzy similarity.
/// "Not found" is an ordinary outcome reported through `MatchResult::found`.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::core::catalog::CatalogIndex;
use crate::core::library::ReferenceLibrary;
use crate::core::similarity::similarity;
use crate::core::synthesizer::{FieldTypeTable, SynthesisError, TemplateSynthesizer};
use crate::schema::content::CustomizationSpec;
use crate::schema::entity::{CatalogEntry, SynthesizedEntity};
use crate::schema::field::OverrideValue;

/// Thresholds and defaults for name resolution.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MatcherConfig {
    /// Level used for leveled templates when the author gave none.
    pub default_level: u32,
    /// Minimum similarity for a name to be offered as a suggestion.
    pub suggestion_threshold: f64,
    /// Minimum similarity for a fuzzy hit to be accepted outright.
    pub auto_accept_threshold: f64,
    pub max_suggestions: usize,
}

impl Default for MatcherConfig {
    fn default() -> Self {
        Self {
            // there is no level 4 template; 5 is the closest mid-range level
            default_level: 5,
            suggestion_threshold: 0.80,
            auto_accept_threshold: 0.90,
            max_suggestions: 5,
        }
    }
}

/// Which catalog and alias sub-tables a lookup uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MatchDomain {
    Npc,
    Item,
}

/// How a name was resolved.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MatchMethod {
    Exact,
    MappedProfession,
    MappedAlias,
    MappedGeneric,
    Fuzzy,
    None,
}

impl MatchMethod {
    pub fn tag(&self) -> &'static str {
        match self {
            Self::Exact => "exact",
            Self::MappedProfession => "mapped_profession",
            Self::MappedAlias => "mapped_alias",
            Self::MappedGeneric => "mapped_generic",
            Self::Fuzzy => "fuzzy",
            Self::None => "none",
        }
    }
}

/// Outcome of resolving one name.
#[derive(Debug, Clone, PartialEq)]
pub struct MatchResult<'a> {
    pub found: bool,
    pub entry: Option<&'a CatalogEntry>,
    pub method: MatchMethod,
    /// The name as the author wrote it.
    pub original_name: String,
    /// Display name of the resolved entry.
    pub matched_name: Option<String>,
    /// Best-first alternatives; only filled when nothing resolved.
    pub suggestions: Vec<String>,
    /// Level actually used for a leveled template.
    pub level_used: Option<u32>,
    /// Whether `level_used` is the configured default.
    pub level_defaulted: bool,
    pub fuzzy_score: Option<f64>,
}

impl<'a> MatchResult<'a> {
    pub fn not_found(name: &str, level: Option<u32>) -> Self {
        Self {
            found: false,
            entry: None,
            method: MatchMethod::None,
            original_name: name.to_string(),
            matched_name: None,
            suggestions: Vec::new(),
            level_used: level,
            level_defaulted: false,
            fuzzy_score: None,
        }
    }

    fn resolved(mut self, entry: &'a CatalogEntry, method: MatchMethod) -> Self {
        self.found = true;
        self.entry = Some(entry);
        self.method = method;
        self.matched_name = Some(entry.name.clone());
        self
    }
}

/// A custom entity together with how its base was resolved.
#[derive(Debug, Clone, PartialEq)]
pub struct CustomEntity {
    pub entity: SynthesizedEntity,
    /// Display name of the resolved base entry.
    pub based_on: String,
    pub method: MatchMethod,
    pub level_used: Option<u32>,
}

#[derive(Debug, Error, PartialEq)]
pub enum CustomizationError {
    #[error("could not find base template '{based_on}' for '{name}'")]
    BaseNotFound {
        name: String,
        based_on: String,
        suggestions: Vec<String>,
    },
    #[error(transparent)]
    Synthesis(#[from] SynthesisError),
}

impl CustomizationError {
    pub fn suggestions(&self) -> &[String] {
        match self {
            Self::BaseNotFound { suggestions, .. } => suggestions,
            Self::Synthesis(_) => &[],
        }
    }
}

/// Resolves names against a reference library. Holds no state between
/// calls; create one per run with that run's configuration.
#[derive(Debug, Clone)]
pub struct EntityMatcher<'a> {
    library: &'a ReferenceLibrary,
    config: MatcherConfig,
    synthesizer: TemplateSynthesizer,
}

impl<'a> EntityMatcher<'a> {
    pub fn new(library: &'a ReferenceLibrary, config: MatcherConfig, field_types: FieldTypeTable) -> Self {
        Self {
            library,
            config,
            synthesizer: TemplateSynthesizer::new(field_types),
        }
    }

    pub fn config(&self) -> &MatcherConfig {
        &self.config
    }

    pub fn synthesizer(&self) -> &TemplateSynthesizer {
        &self.synthesizer
    }

    pub fn library(&self) -> &'a ReferenceLibrary {
        self.library
    }

    pub fn match_npc(&self, name: &str, level: Option<u32>) -> MatchResult<'a> {
        self.match_name(MatchDomain::Npc, name, level)
    }

    pub fn match_item(&self, name: &str) -> MatchResult<'a> {
        self.match_name(MatchDomain::Item, name, None)
    }

    /// Resolve `name` in `domain`, trying exact, alias, then fuzzy matching.
    pub fn match_name(&self, domain: MatchDomain, name: &str, level: Option<u32>) -> MatchResult<'a> {
        let catalog = self.library.catalog(domain);
        let mut result = MatchResult::not_found(name, level);

        if let Some(entry) = catalog.find_by_name(name, None) {
            log::debug!("'{}' matched exactly", name);
            return result.resolved(entry, MatchMethod::Exact);
        }

        let mapped = match domain {
            MatchDomain::Npc => self.match_npc_aliases(catalog, name, level, &mut result),
            MatchDomain::Item => self
                .library
                .aliases
                .item(name)
                .and_then(|target| catalog.find_by_name(target, None))
                .map(|entry| (entry, MatchMethod::MappedAlias)),
        };
        if let Some((entry, method)) = mapped {
            log::debug!("'{}' resolved via {} to '{}'", name, method.tag(), entry.name);
            return result.resolved(entry, method);
        }

        self.match_fuzzy(catalog, result)
    }

    fn leveled(&self, level: Option<u32>) -> u32 {
        level.unwrap_or(self.config.default_level)
    }

    /// Record the level a leveled lookup actually resolved at.
    fn mark_level(&self, level: Option<u32>, lvl: u32, result: &mut MatchResult<'a>) {
        result.level_used = Some(lvl);
        result.level_defaulted = level.is_none();
    }

    fn match_npc_aliases(
        &self,
        catalog: &'a CatalogIndex,
        name: &str,
        level: Option<u32>,
        result: &mut MatchResult<'a>,
    ) -> Option<(&'a CatalogEntry, MatchMethod)> {
        let aliases = &self.library.aliases;
        let lvl = self.leveled(level);

        if let Some(template) = aliases.profession(name) {
            if let Some(entry) = catalog.find_by_profession_and_level(template, i64::from(lvl)) {
                self.mark_level(level, lvl, result);
                return Some((entry, MatchMethod::MappedProfession));
            }
        }

        if let Some(target) = aliases.creature(name) {
            if let Some(entry) = catalog.find_by_name(target, None) {
                return Some((entry, MatchMethod::MappedAlias));
            }
        }

        if let Some(template) = aliases.generic_npc(name) {
            if let Some(entry) = catalog.find_by_profession_and_level(template, i64::from(lvl)) {
                self.mark_level(level, lvl, result);
                return Some((entry, MatchMethod::MappedGeneric));
            }
            if let Some(entry) = catalog.find_by_name(template, None) {
                return Some((entry, MatchMethod::MappedGeneric));
            }
        }

        None
    }

    fn match_fuzzy(&self, catalog: &'a CatalogIndex, mut result: MatchResult<'a>) -> MatchResult<'a> {
        let mut candidates: Vec<(&String, f64)> = catalog
            .canonical_names()
            .iter()
            .map(|candidate| (candidate, similarity(&result.original_name, candidate)))
            .filter(|(_, score)| *score >= self.config.suggestion_threshold)
            .collect();
        // stable: equal scores stay in name order
        candidates.sort_by(|a, b| b.1.total_cmp(&a.1));

        if let Some(&(best, score)) = candidates.first() {
            if score >= self.config.auto_accept_threshold {
                if let Some(entry) = catalog.find_by_name(best, None) {
                    log::debug!(
                        "'{}' fuzzy-matched '{}' ({:.3})",
                        result.original_name,
                        entry.name,
                        score
                    );
                    result.fuzzy_score = Some(score);
                    return result.resolved(entry, MatchMethod::Fuzzy);
                }
            }
        }

        result.suggestions = candidates
            .iter()
            .take(self.config.max_suggestions)
            .filter_map(|(candidate, _)| catalog.find_by_name(candidate, None))
            .map(|entry| entry.name.clone())
            .collect();
        log::debug!(
            "'{}' not resolved; {} suggestion(s)",
            result.original_name,
            result.suggestions.len()
        );
        result
    }

    /// Resolve the base named by `spec` and synthesize the custom entity.
    pub fn create_custom(
        &self,
        domain: MatchDomain,
        spec: &CustomizationSpec,
    ) -> Result<CustomEntity, CustomizationError> {
        let level = match domain {
            MatchDomain::Npc => spec.level,
            MatchDomain::Item => None,
        };
        let base = self.match_name(domain, &spec.based_on, level);
        if !base.found {
            return Err(CustomizationError::BaseNotFound {
                name: spec.name.clone(),
                based_on: spec.based_on.clone(),
                suggestions: base.suggestions,
            });
        }

        let entity = self
            .synthesizer
            .synthesize_from_match(&base, &spec.name, &spec.modifications)?;
        log::debug!(
            "Created custom '{}' from '{}' via {}",
            spec.name,
            entity.provenance.based_on,
            base.method.tag()
        );
        Ok(CustomEntity {
            based_on: entity.provenance.based_on.clone(),
            entity,
            method: base.method,
            level_used: base.level_used,
        })
    }

    pub fn create_custom_npc(
        &self,
        name: &str,
        based_on: &str,
        level: Option<u32>,
        modifications: IndexMap<String, OverrideValue>,
    ) -> Result<CustomEntity, CustomizationError> {
        self.create_custom(
            MatchDomain::Npc,
            &CustomizationSpec {
                name: name.to_string(),
                based_on: based_on.to_string(),
                level,
                modifications,
            },
        )
    }

    pub fn create_custom_item(
        &self,
        name: &str,
        based_on: &str,
        modifications: IndexMap<String, OverrideValue>,
    ) -> Result<CustomEntity, CustomizationError> {
        self.create_custom(
            MatchDomain::Item,
            &CustomizationSpec {
                name: name.to_string(),
                based_on: based_on.to_string(),
                level: None,
                modifications,
            },
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::aliases::AliasTable;
    use crate::core::catalog::{CatalogSource, SourcePriority};
    use crate::schema::field::{FieldType, FieldValue};

    fn leveled(profession: &str, level: u32, hits: &str) -> CatalogEntry {
        let name = format!("{} Level {:02}", profession, level);
        CatalogEntry::new(name.clone(), "", format!("cl-{}-{}", profession, level))
            .with_field("name", FieldValue::string(name))
            .with_field("profession", FieldValue::string(profession))
            .with_field("level", FieldValue::number(level.to_string()))
            .with_field("hits", FieldValue::number(hits))
    }

    fn library() -> ReferenceLibrary {
        let npcs = CatalogIndex::build(
            vec![
                CatalogSource::new(
                    "Character Law",
                    vec![
                        leveled("Animist", 5, "34"),
                        leveled("Animist", 10, "61"),
                        leveled("Warrior", 15, "120"),
                        leveled("Ranger", 5, "45"),
                    ],
                ),
                CatalogSource::new(
                    "Creatures & Treasures",
                    vec![
                        CatalogEntry::new("Wolf", "", "ct-wolf"),
                        CatalogEntry::new("Basilisk", "", "ct-basilisk"),
                        CatalogEntry::new("Town Guard", "", "ct-guard"),
                    ],
                ),
            ],
            SourcePriority::npcs(),
        );
        let items = CatalogIndex::build(
            vec![CatalogSource::new(
                "Arms Law",
                vec![CatalogEntry::new("Broadsword", "", "al-broadsword")
                    .with_field("weight", FieldValue::number("4"))],
            )],
            SourcePriority::items(),
        );
        let aliases = AliasTable::parse_ron(
            r#"(
                professions: { "Animist": "Animist", "Fighter": "Warrior", "Warg": "Warrior" },
                creatures: { "Warg": "Wolf", "Ghost Wolf": "Spirit Wolf" },
                generic_npcs: { "Scout": "Ranger", "Guard": "Town Guard" },
                items: { "Sword": "Broadsword" },
            )"#,
        )
        .unwrap();
        ReferenceLibrary::new(npcs, items, aliases)
    }

    fn matcher(lib: &ReferenceLibrary) -> EntityMatcher<'_> {
        EntityMatcher::new(lib, MatcherConfig::default(), FieldTypeTable::default())
    }

    #[test]
    fn exact_match() {
        let lib = library();
        let m = matcher(&lib).match_npc("Wolf", None);
        assert!(m.found);
        assert_eq!(m.method, MatchMethod::Exact);
        assert_eq!(m.matched_name.as_deref(), Some("Wolf"));
        assert!(m.suggestions.is_empty());
    }

    #[test]
    fn exact_match_is_case_insensitive() {
        let lib = library();
        let m = matcher(&lib).match_npc("animist level 10", None);
        assert_eq!(m.method, MatchMethod::Exact);
        assert_eq!(m.matched_name.as_deref(), Some("Animist Level 10"));
    }

    #[test]
    fn profession_with_default_level() {
        let lib = library();
        let m = matcher(&lib).match_npc("Animist", None);
        assert!(m.found);
        assert_eq!(m.method, MatchMethod::MappedProfession);
        assert_eq!(m.level_used, Some(5));
        assert!(m.level_defaulted);
        assert_eq!(m.matched_name.as_deref(), Some("Animist Level 05"));
    }

    #[test]
    fn profession_with_explicit_level() {
        let lib = library();
        let m = matcher(&lib).match_npc("Animist", Some(10));
        assert_eq!(m.method, MatchMethod::MappedProfession);
        assert_eq!(m.level_used, Some(10));
        assert!(!m.level_defaulted);
        assert_eq!(m.matched_name.as_deref(), Some("Animist Level 10"));
    }

    #[test]
    fn profession_level_must_match_exactly() {
        let lib = library();
        let m = matcher(&lib).match_npc("Animist", Some(7));
        assert!(!m.found);
        assert_eq!(m.method, MatchMethod::None);
    }

    #[test]
    fn creature_alias() {
        let lib = library();
        let m = matcher(&lib).match_npc("Warg", None);
        assert_eq!(m.method, MatchMethod::MappedAlias);
        assert_eq!(m.matched_name.as_deref(), Some("Wolf"));
        assert_eq!(m.level_used, None);
    }

    #[test]
    fn missed_profession_does_not_claim_a_level() {
        let lib = library();
        // Warrior exists only at level 15, so the creature alias takes over
        let m = matcher(&lib).match_npc("Warg", None);
        assert_eq!(m.method, MatchMethod::MappedAlias);
        assert_eq!(m.level_used, None);
        assert!(!m.level_defaulted);

        let guard = matcher(&lib).match_npc("Guard", None);
        assert_eq!(guard.matched_name.as_deref(), Some("Town Guard"));
        assert!(!guard.level_defaulted);
    }

    #[test]
    fn dangling_alias_falls_through() {
        let lib = library();
        let m = matcher(&lib).match_npc("Ghost Wolf", None);
        assert_ne!(m.method, MatchMethod::MappedAlias);
    }

    #[test]
    fn generic_npc_by_profession_or_name() {
        let lib = library();
        let scout = matcher(&lib).match_npc("Scout", None);
        assert_eq!(scout.method, MatchMethod::MappedGeneric);
        assert_eq!(scout.matched_name.as_deref(), Some("Ranger Level 05"));
        assert_eq!(scout.level_used, Some(5));

        let guard = matcher(&lib).match_npc("Guard", Some(3));
        assert_eq!(guard.method, MatchMethod::MappedGeneric);
        assert_eq!(guard.matched_name.as_deref(), Some("Town Guard"));
    }

    #[test]
    fn fuzzy_auto_accept() {
        let lib = library();
        let m = matcher(&lib).match_npc("Basilisks", None);
        assert!(m.found);
        assert_eq!(m.method, MatchMethod::Fuzzy);
        assert_eq!(m.matched_name.as_deref(), Some("Basilisk"));
        assert!(m.fuzzy_score.unwrap() >= 0.90);
    }

    #[test]
    fn fuzzy_below_auto_accept_suggests() {
        // "wolfe" vs "wolf" scores 8/9
        let lib = library();
        let m = matcher(&lib).match_npc("Wolfe", None);
        assert!(!m.found);
        assert_eq!(m.method, MatchMethod::None);
        assert_eq!(m.suggestions, vec!["Wolf".to_string()]);
    }

    #[test]
    fn thresholds_are_configurable() {
        let lib = library();
        let config = MatcherConfig {
            auto_accept_threshold: 0.85,
            ..MatcherConfig::default()
        };
        let m = EntityMatcher::new(&lib, config, FieldTypeTable::default()).match_npc("Wolfe", None);
        assert!(m.found);
        assert_eq!(m.method, MatchMethod::Fuzzy);
    }

    #[test]
    fn nothing_close_enough() {
        let lib = library();
        let m = matcher(&lib).match_npc("Dragon", None);
        assert!(!m.found);
        assert_eq!(m.method, MatchMethod::None);
        assert!(m.suggestions.is_empty());
        assert!(m.entry.is_none());
    }

    #[test]
    fn suggestions_capped_and_ranked() {
        let lib = library();
        let config = MatcherConfig {
            suggestion_threshold: 0.5,
            auto_accept_threshold: 1.1,
            max_suggestions: 2,
            ..MatcherConfig::default()
        };
        let m = EntityMatcher::new(&lib, config, FieldTypeTable::default())
            .match_npc("Animist Level 0", None);
        assert!(!m.found);
        assert_eq!(m.suggestions.len(), 2);
        assert_eq!(m.suggestions[0], "Animist Level 05");
    }

    #[test]
    fn item_alias_and_domain_separation() {
        let lib = library();
        let m = matcher(&lib);
        let sword = m.match_item("Sword");
        assert_eq!(sword.method, MatchMethod::MappedAlias);
        assert_eq!(sword.matched_name.as_deref(), Some("Broadsword"));
        // NPC aliases are not consulted for items
        assert!(!m.match_item("Warg").found);
        assert!(!m.match_npc("Broadsword", None).found);
    }

    #[test]
    fn custom_npc_from_profession() {
        let lib = library();
        let custom = matcher(&lib)
            .create_custom_npc(
                "Skauril",
                "Fighter",
                Some(15),
                IndexMap::from([("hits".to_string(), OverrideValue::Int(150))]),
            )
            .unwrap();
        assert_eq!(custom.based_on, "Warrior Level 15");
        assert_eq!(custom.method, MatchMethod::MappedProfession);
        assert_eq!(custom.level_used, Some(15));
        let hits = custom.entity.entry.value("hits").unwrap();
        assert_eq!(hits.raw, "150");
        assert_eq!(hits.field_type, FieldType::Number);
    }

    #[test]
    fn custom_base_not_found_carries_suggestions() {
        let lib = library();
        let err = matcher(&lib)
            .create_custom_npc("Lupa", "Wolfe", None, IndexMap::new())
            .unwrap_err();
        assert!(matches!(err, CustomizationError::BaseNotFound { .. }));
        assert_eq!(err.suggestions(), &["Wolf".to_string()]);
    }

    #[test]
    fn custom_item() {
        let lib = library();
        let custom = matcher(&lib)
            .create_custom_item(
                "Orcbane",
                "Sword",
                IndexMap::from([("weight".to_string(), OverrideValue::Int(3))]),
            )
            .unwrap();
        assert_eq!(custom.based_on, "Broadsword");
        assert_eq!(custom.entity.entry.number("weight"), Some(3));
        assert_eq!(custom.entity.entry.id, "id-custom-orcbane");
    }

    #[test]
    fn method_tags() {
        assert_eq!(MatchMethod::MappedProfession.tag(), "mapped_profession");
        assert_eq!(MatchMethod::None.tag(), "none");
    }
}
