/// Pre-generation validation: enumerates every resolution failure and
/// dangling link in a content set before any output is produced.

use rustc_hash::FxHashSet;
use std::fmt;

use crate::core::matcher::{EntityMatcher, MatchDomain, MatchMethod, MatchResult};
use crate::schema::content::{EntitySpec, ModuleContent, StorySection};
use crate::schema::entity::EntityKind;

/// One problem found in the content, attributed to the record that has it.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidationIssue {
    pub kind: EntityKind,
    pub name: String,
    pub message: String,
    pub suggestions: Vec<String>,
}

impl fmt::Display for ValidationIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}: {}", self.kind, self.name, self.message)?;
        if !self.suggestions.is_empty() {
            write!(f, " (did you mean: {}?)", self.suggestions.join(", "))?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidationStats {
    pub records: usize,
    pub links: usize,
    pub exact: usize,
    pub mapped: usize,
    pub fuzzy: usize,
    pub custom: usize,
    pub unresolved: usize,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ValidationReport {
    pub errors: Vec<ValidationIssue>,
    pub warnings: Vec<ValidationIssue>,
    pub stats: ValidationStats,
}

impl ValidationReport {
    pub fn is_ok(&self) -> bool {
        self.errors.is_empty()
    }

    fn error(&mut self, kind: EntityKind, name: &str, message: String, suggestions: Vec<String>) {
        self.errors.push(ValidationIssue {
            kind,
            name: name.to_string(),
            message,
            suggestions,
        });
    }

    fn warn(&mut self, kind: EntityKind, name: &str, message: String) {
        self.warnings.push(ValidationIssue {
            kind,
            name: name.to_string(),
            message,
            suggestions: Vec::new(),
        });
    }
}

/// Checks a content set against the reference library. Never stops at the
/// first problem.
pub struct Validator<'m, 'a> {
    matcher: &'m EntityMatcher<'a>,
}

impl<'m, 'a> Validator<'m, 'a> {
    pub fn new(matcher: &'m EntityMatcher<'a>) -> Self {
        Self { matcher }
    }

    pub fn validate(&self, content: &ModuleContent) -> ValidationReport {
        let mut report = ValidationReport::default();

        self.check_duplicates(content, &mut report);
        // later duplicates are never generated, so only first declarations are checked
        let mut seen = FxHashSet::default();
        for spec in content.npcs.iter().filter(|s| seen.insert(s.name.as_str())) {
            self.check_entity(EntityKind::Npc, MatchDomain::Npc, spec, &mut report);
        }
        let mut seen = FxHashSet::default();
        for spec in content.items.iter().filter(|s| seen.insert(s.name.as_str())) {
            self.check_entity(EntityKind::Item, MatchDomain::Item, spec, &mut report);
        }
        self.check_encounters(content, &mut report);
        self.check_parcels(content, &mut report);
        self.check_stories(content, &mut report);

        log::info!(
            "Validation: {} record(s), {} link(s), {} error(s), {} warning(s)",
            report.stats.records,
            report.stats.links,
            report.errors.len(),
            report.warnings.len()
        );
        report
    }

    fn check_duplicates(&self, content: &ModuleContent, report: &mut ValidationReport) {
        let names: [(EntityKind, Vec<&str>); 6] = [
            (EntityKind::Npc, content.npcs.iter().map(|s| s.name.as_str()).collect()),
            (EntityKind::Item, content.items.iter().map(|s| s.name.as_str()).collect()),
            (EntityKind::Parcel, content.parcels.iter().map(|s| s.name.as_str()).collect()),
            (EntityKind::Image, content.images.iter().map(|s| s.name.as_str()).collect()),
            (EntityKind::Encounter, content.encounters.iter().map(|s| s.name.as_str()).collect()),
            (EntityKind::Story, content.stories.iter().map(|s| s.name.as_str()).collect()),
        ];
        for (kind, list) in names {
            let mut seen = FxHashSet::default();
            for name in list {
                if !seen.insert(name) {
                    report.warn(
                        kind,
                        name,
                        "declared more than once; only the first declaration is generated".to_string(),
                    );
                }
            }
        }
    }

    fn check_entity(
        &self,
        kind: EntityKind,
        domain: MatchDomain,
        spec: &EntitySpec,
        report: &mut ValidationReport,
    ) {
        report.stats.records += 1;
        let (requested, is_custom) = match &spec.based_on {
            Some(base) => (base.as_str(), true),
            None => (spec.name.as_str(), false),
        };
        let result = self.matcher.match_name(domain, requested, spec.level);
        self.record_match(kind, &spec.name, &result, is_custom, report);
    }

    fn record_match(
        &self,
        kind: EntityKind,
        name: &str,
        result: &MatchResult<'_>,
        is_custom: bool,
        report: &mut ValidationReport,
    ) {
        if !result.found {
            report.stats.unresolved += 1;
            let message = if is_custom {
                format!("base template '{}' not found", result.original_name)
            } else {
                format!("'{}' not found in the reference catalog", result.original_name)
            };
            report.error(kind, name, message, result.suggestions.clone());
            return;
        }

        if is_custom {
            report.stats.custom += 1;
        }
        match result.method {
            MatchMethod::Exact => report.stats.exact += 1,
            MatchMethod::MappedProfession | MatchMethod::MappedAlias | MatchMethod::MappedGeneric => {
                report.stats.mapped += 1
            }
            MatchMethod::Fuzzy => {
                report.stats.fuzzy += 1;
                report.warn(
                    kind,
                    name,
                    format!(
                        "'{}' fuzzy-matched to '{}' ({:.2})",
                        result.original_name,
                        result.matched_name.as_deref().unwrap_or_default(),
                        result.fuzzy_score.unwrap_or_default()
                    ),
                );
            }
            MatchMethod::None => {}
        }
        if result.level_defaulted {
            report.warn(
                kind,
                name,
                format!(
                    "no level given for '{}'; using level {}",
                    result.original_name,
                    result.level_used.unwrap_or_default()
                ),
            );
        }
    }

    fn check_encounters(&self, content: &ModuleContent, report: &mut ValidationReport) {
        let mut checked = FxHashSet::default();
        for encounter in &content.encounters {
            for slot in &encounter.npcs {
                report.stats.links += 1;
                let name = slot.link_name();
                if content.npcs.iter().any(|n| n.name == name) {
                    continue;
                }
                // each implied NPC is emitted once, so report it once
                if !checked.insert(name) {
                    continue;
                }
                report.stats.records += 1;
                let (requested, is_custom) = match &slot.based_on {
                    Some(base) => (base.as_str(), true),
                    None => (slot.creature.as_str(), slot.creature != name),
                };
                let result = self.matcher.match_npc(requested, slot.level);
                self.record_match(EntityKind::Npc, name, &result, is_custom, report);
            }
        }
    }

    fn check_parcels(&self, content: &ModuleContent, report: &mut ValidationReport) {
        for parcel in &content.parcels {
            for item in &parcel.items {
                report.stats.links += 1;
                if content.declares(EntityKind::Item, &item.name) {
                    continue;
                }
                if self.matcher.match_item(&item.name).found {
                    report.warn(
                        EntityKind::Parcel,
                        &parcel.name,
                        format!("item '{}' is in the catalog but not declared in the module", item.name),
                    );
                } else {
                    report.warn(
                        EntityKind::Parcel,
                        &parcel.name,
                        format!("item '{}' is not declared and not in the catalog", item.name),
                    );
                }
            }
        }
    }

    fn check_stories(&self, content: &ModuleContent, report: &mut ValidationReport) {
        for story in &content.stories {
            for section in &story.sections {
                let StorySection::Link { kind, target, .. } = section else {
                    continue;
                };
                report.stats.links += 1;
                if content.declares(*kind, target) {
                    continue;
                }
                let in_catalog = match kind {
                    EntityKind::Npc => self.matcher.match_npc(target, None).found,
                    EntityKind::Item => self.matcher.match_item(target).found,
                    _ => false,
                };
                if in_catalog {
                    report.warn(
                        EntityKind::Story,
                        &story.name,
                        format!("{} '{}' is in the catalog but not declared in the module", kind, target),
                    );
                } else {
                    report.error(
                        EntityKind::Story,
                        &story.name,
                        format!("link target {} '{}' does not exist", kind, target),
                        Vec::new(),
                    );
                }
            }
        }
    }
}
