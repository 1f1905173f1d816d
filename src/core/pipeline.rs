/// The module generation run: content records → resolved, registered and
/// cross-linked entities.
///
/// Phases run in a fixed order because the registry only knows about what
/// has been emitted so far: images, items, NPCs (content, then those implied
/// by encounter slots), parcels, encounters, stories, then the link pass.

use rustc_hash::FxHashSet;
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::core::catalog::SourceLoadWarning;
use crate::core::config::{ConfigError, GeneratorConfig};
use crate::core::library::{LibraryError, ReferenceLibrary};
use crate::core::links::{CrossReference, LinkEnd, LinkFallback, LinkReport, LinkResolver};
use crate::core::matcher::{CustomizationError, EntityMatcher, MatchDomain, MatchMethod};
use crate::core::registry::CrossRefRegistry;
use crate::core::validator::{ValidationReport, Validator};
use crate::schema::content::{
    ContentError, CustomizationSpec, EncounterSlot, EntitySpec, ModuleContent, ParcelItem, StorySection,
};
use crate::schema::entity::{CatalogEntry, EntityKind, Provenance, RecordId};
use crate::schema::field::{Field, FieldMap};

/// Field holding an NPC's weapon block.
pub const WEAPONS_FIELD: &str = "weapons";

#[derive(Debug, Error)]
pub enum GeneratorError {
    #[error("library error: {0}")]
    Library(#[from] LibraryError),
    #[error("config error: {0}")]
    Config(#[from] ConfigError),
    #[error("content error: {0}")]
    Content(#[from] ContentError),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("no reference catalog: set a catalog directory or supply a library")]
    NoCatalog,
}

/// An NPC or item resolved from the catalog, or synthesized from one.
#[derive(Debug, Clone, PartialEq)]
pub struct GeneratedEntity {
    pub id: RecordId,
    /// Display name as written in the module.
    pub name: String,
    pub entry: CatalogEntry,
    /// Set for custom entities.
    pub provenance: Option<Provenance>,
    pub method: MatchMethod,
    pub level_used: Option<u32>,
    pub count: u32,
}

impl GeneratedEntity {
    pub fn is_custom(&self) -> bool {
        self.provenance.as_ref().is_some_and(|p| p.is_custom)
    }

    /// Names of the weapons in this entity's weapon block, in block order.
    pub fn weapon_names(&self) -> Vec<&str> {
        weapon_names(&self.entry.fields)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct GeneratedImage {
    pub id: RecordId,
    pub name: String,
    pub file: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct GeneratedParcel {
    pub id: RecordId,
    pub name: String,
    pub description: Option<String>,
    pub items: Vec<ParcelItem>,
    pub coins: Vec<(String, u32)>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct GeneratedEncounter {
    pub id: RecordId,
    pub name: String,
    pub exp: u32,
    pub slots: Vec<EncounterSlot>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct GeneratedStory {
    pub id: RecordId,
    pub name: String,
    pub sections: Vec<StorySection>,
}

/// A record that could not be resolved and was left out of the output.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolutionFailure {
    pub kind: EntityKind,
    pub name: String,
    pub requested: String,
    pub suggestions: Vec<String>,
}

/// Everything one run produced, ready for a serialization layer.
#[derive(Debug, Clone, Default)]
pub struct GeneratedModule {
    pub images: Vec<GeneratedImage>,
    pub items: Vec<GeneratedEntity>,
    pub npcs: Vec<GeneratedEntity>,
    pub parcels: Vec<GeneratedParcel>,
    pub encounters: Vec<GeneratedEncounter>,
    pub stories: Vec<GeneratedStory>,
    pub registry: CrossRefRegistry,
    pub links: LinkReport,
    pub failures: Vec<ResolutionFailure>,
}

impl GeneratedModule {
    pub fn npc(&self, name: &str) -> Option<&GeneratedEntity> {
        self.npcs.iter().find(|n| n.name == name)
    }

    pub fn item(&self, name: &str) -> Option<&GeneratedEntity> {
        self.items.iter().find(|i| i.name == name)
    }

    pub fn id_of(&self, kind: EntityKind, name: &str) -> Option<&RecordId> {
        self.registry.resolve(kind, name)
    }
}

/// Drives generation runs against one reference library. Built via
/// `ModuleGenerator::builder()`.
pub struct ModuleGenerator {
    library: ReferenceLibrary,
    config: GeneratorConfig,
    load_warnings: Vec<SourceLoadWarning>,
}

/// Builder for constructing a `ModuleGenerator`.
#[derive(Default)]
pub struct ModuleGeneratorBuilder {
    catalog_dir: Option<PathBuf>,
    aliases_path: Option<PathBuf>,
    config_path: Option<PathBuf>,
    /// Directly provided library (for testing without files).
    library: Option<ReferenceLibrary>,
    /// Directly provided config (for testing without files).
    config: Option<GeneratorConfig>,
}

impl ModuleGenerator {
    pub fn builder() -> ModuleGeneratorBuilder {
        ModuleGeneratorBuilder::default()
    }

    pub fn library(&self) -> &ReferenceLibrary {
        &self.library
    }

    pub fn config(&self) -> &GeneratorConfig {
        &self.config
    }

    /// Catalog files skipped while loading.
    pub fn load_warnings(&self) -> &[SourceLoadWarning] {
        &self.load_warnings
    }

    /// A matcher for this run's library and configuration.
    pub fn matcher(&self) -> EntityMatcher<'_> {
        EntityMatcher::new(
            &self.library,
            self.config.matcher.clone(),
            self.config.field_types.clone(),
        )
    }

    pub fn validate(&self, content: &ModuleContent) -> ValidationReport {
        let matcher = self.matcher();
        Validator::new(&matcher).validate(content)
    }

    /// Run every phase over `content`. Unresolvable records are reported in
    /// `failures` and left out; unresolved links are reported in `links`.
    pub fn generate(&self, content: &ModuleContent) -> GeneratedModule {
        let mut run = Run {
            matcher: self.matcher(),
            registry: CrossRefRegistry::new(),
            links: LinkResolver::new(),
            claimed: FxHashSet::default(),
            out: GeneratedModule::default(),
        };

        run.emit_images(content);
        run.emit_items(content);
        run.emit_npcs(content);
        run.emit_parcels(content);
        run.emit_encounters(content);
        run.emit_stories(content);
        run.finish()
    }
}

/// Per-run state. Dropped at the end of `generate`.
struct Run<'a> {
    matcher: EntityMatcher<'a>,
    registry: CrossRefRegistry,
    links: LinkResolver,
    claimed: FxHashSet<(EntityKind, String)>,
    out: GeneratedModule,
}

impl<'a> Run<'a> {
    /// First declaration of a name wins; later ones are skipped before an
    /// id is allocated, so every emitted entity keeps its registry entry.
    fn claim(&mut self, kind: EntityKind, name: &str) -> bool {
        let fresh = self.claimed.insert((kind, name.to_string()));
        if !fresh {
            log::warn!("{} '{}' declared more than once; skipping the later declaration", kind, name);
        }
        fresh
    }

    fn emit_images(&mut self, content: &ModuleContent) {
        for image in &content.images {
            if !self.claim(EntityKind::Image, &image.name) {
                continue;
            }
            let id = self.registry.emit(EntityKind::Image, &image.name);
            self.out.images.push(GeneratedImage {
                id,
                name: image.name.clone(),
                file: image.file.clone(),
            });
        }
        log::info!("Images: {} emitted", self.out.images.len());
    }

    fn emit_items(&mut self, content: &ModuleContent) {
        for spec in &content.items {
            if !self.claim(EntityKind::Item, &spec.name) {
                continue;
            }
            if let Some(item) = self.resolve_entity(EntityKind::Item, spec) {
                self.out.items.push(item);
            }
        }
        log::info!("Items: {} emitted", self.out.items.len());
    }

    fn emit_npcs(&mut self, content: &ModuleContent) {
        for spec in &content.npcs {
            if !self.claim(EntityKind::Npc, &spec.name) {
                continue;
            }
            if let Some(npc) = self.resolve_entity(EntityKind::Npc, spec) {
                self.push_npc(npc);
            }
        }
        let declared = self.out.npcs.len();

        // unique NPCs implied by encounter slots
        let mut attempted: FxHashSet<&str> = content.npcs.iter().map(|n| n.name.as_str()).collect();
        for slot in content.encounters.iter().flat_map(|e| e.npcs.iter()) {
            let name = slot.link_name();
            if !attempted.insert(name) {
                continue;
            }
            let spec = EntitySpec {
                name: name.to_string(),
                level: slot.level,
                based_on: slot
                    .based_on
                    .clone()
                    .or_else(|| (slot.creature != name).then(|| slot.creature.clone())),
                modifications: Default::default(),
                count: None,
            };
            if let Some(npc) = self.resolve_entity(EntityKind::Npc, &spec) {
                self.push_npc(npc);
            }
        }
        log::info!(
            "NPCs: {} from content, {} from encounters",
            declared,
            self.out.npcs.len() - declared
        );
    }

    // weapons link to module items; the block stays embedded when absent
    fn push_npc(&mut self, npc: GeneratedEntity) {
        for weapon in npc.weapon_names() {
            self.links.defer(CrossReference::new(
                LinkEnd::new(EntityKind::Npc, npc.name.clone()),
                LinkEnd::new(EntityKind::Item, weapon),
                LinkFallback::Embed,
            ));
        }
        self.out.npcs.push(npc);
    }

    fn emit_parcels(&mut self, content: &ModuleContent) {
        for parcel in &content.parcels {
            if !self.claim(EntityKind::Parcel, &parcel.name) {
                continue;
            }
            let id = self.registry.allocate(EntityKind::Parcel);
            for item in &parcel.items {
                self.links.defer(CrossReference::new(
                    LinkEnd::new(EntityKind::Parcel, parcel.name.clone()),
                    LinkEnd::new(EntityKind::Item, item.name.clone()),
                    LinkFallback::Placeholder(item.name.clone()),
                ));
            }
            self.registry.register(EntityKind::Parcel, &parcel.name, id.clone());
            self.out.parcels.push(GeneratedParcel {
                id,
                name: parcel.name.clone(),
                description: parcel.description.clone(),
                items: parcel.items.clone(),
                coins: parcel.coins.iter().map(|(k, v)| (k.clone(), *v)).collect(),
            });
        }
        log::info!("Parcels: {} emitted", self.out.parcels.len());
    }

    fn emit_encounters(&mut self, content: &ModuleContent) {
        for encounter in &content.encounters {
            if !self.claim(EntityKind::Encounter, &encounter.name) {
                continue;
            }
            let id = self.registry.allocate(EntityKind::Encounter);
            for slot in &encounter.npcs {
                self.links.defer(CrossReference::new(
                    LinkEnd::new(EntityKind::Encounter, encounter.name.clone()),
                    LinkEnd::new(EntityKind::Npc, slot.link_name()),
                    LinkFallback::Placeholder(slot.link_name().to_string()),
                ));
            }
            self.registry.register(EntityKind::Encounter, &encounter.name, id.clone());
            self.out.encounters.push(GeneratedEncounter {
                id,
                name: encounter.name.clone(),
                exp: encounter.exp,
                slots: encounter.npcs.clone(),
            });
        }
        log::info!("Encounters: {} emitted", self.out.encounters.len());
    }

    fn emit_stories(&mut self, content: &ModuleContent) {
        for story in &content.stories {
            if !self.claim(EntityKind::Story, &story.name) {
                continue;
            }
            let id = self.registry.allocate(EntityKind::Story);
            for section in &story.sections {
                if let StorySection::Link { kind, target, .. } = section {
                    let text = section.link_text().unwrap_or_else(|| target.clone());
                    self.links.defer(CrossReference::new(
                        LinkEnd::new(EntityKind::Story, story.name.clone()),
                        LinkEnd::new(*kind, target.clone()),
                        LinkFallback::Placeholder(text),
                    ));
                }
            }
            self.registry.register(EntityKind::Story, &story.name, id.clone());
            self.out.stories.push(GeneratedStory {
                id,
                name: story.name.clone(),
                sections: story.sections.clone(),
            });
        }
        log::info!("Stories: {} emitted", self.out.stories.len());
    }

    fn finish(self) -> GeneratedModule {
        let mut out = self.out;
        out.links = self.links.resolve_all(&self.registry);
        out.registry = self.registry;
        if !out.failures.is_empty() {
            log::warn!("{} record(s) could not be resolved", out.failures.len());
        }
        out
    }

    /// Match or synthesize one NPC/item record, then allocate and register
    /// its id. Failures are recorded and yield `None`.
    fn resolve_entity(&mut self, kind: EntityKind, spec: &EntitySpec) -> Option<GeneratedEntity> {
        let domain = match kind {
            EntityKind::Item => MatchDomain::Item,
            _ => MatchDomain::Npc,
        };
        let level = match domain {
            MatchDomain::Npc => spec.level,
            MatchDomain::Item => None,
        };

        let resolved = match &spec.based_on {
            Some(based_on) => {
                let custom = CustomizationSpec {
                    name: spec.name.clone(),
                    based_on: based_on.clone(),
                    level,
                    modifications: spec.modifications.clone(),
                };
                match self.matcher.create_custom(domain, &custom) {
                    Ok(c) => Ok((c.entity.entry, Some(c.entity.provenance), c.method, c.level_used)),
                    Err(CustomizationError::BaseNotFound { suggestions, .. }) => Err((based_on.clone(), suggestions)),
                    Err(CustomizationError::Synthesis(e)) => {
                        log::warn!("{} '{}': {}", kind, spec.name, e);
                        Err((based_on.clone(), Vec::new()))
                    }
                }
            }
            None => {
                let result = self.matcher.match_name(domain, &spec.name, level);
                match result.entry {
                    Some(entry) if result.found => Ok((entry.clone(), None, result.method, result.level_used)),
                    _ => Err((spec.name.clone(), result.suggestions)),
                }
            }
        };

        match resolved {
            Ok((entry, provenance, method, level_used)) => {
                let id = self.registry.allocate(kind);
                self.registry.register(kind, &spec.name, id.clone());
                log::debug!("{} '{}' -> {} ({})", kind, spec.name, id, method.tag());
                Some(GeneratedEntity {
                    id,
                    name: spec.name.clone(),
                    entry,
                    provenance,
                    method,
                    level_used,
                    count: spec.count.unwrap_or(1),
                })
            }
            Err((requested, suggestions)) => {
                log::warn!(
                    "{} '{}' could not be resolved from '{}'{}",
                    kind,
                    spec.name,
                    requested,
                    if suggestions.is_empty() {
                        String::new()
                    } else {
                        format!(" (suggestions: {})", suggestions.join(", "))
                    }
                );
                self.out.failures.push(ResolutionFailure {
                    kind,
                    name: spec.name.clone(),
                    requested,
                    suggestions,
                });
                None
            }
        }
    }
}

fn weapon_names(fields: &FieldMap) -> Vec<&str> {
    let Some(Field::Group(weapons)) = fields.get(WEAPONS_FIELD) else {
        return Vec::new();
    };
    weapons
        .values()
        .filter_map(Field::as_group)
        .filter_map(|weapon| weapon.get("name")?.as_value())
        .map(|value| value.raw.as_str())
        .collect()
}

impl ModuleGeneratorBuilder {
    /// Directory holding `npcs/` and `items/` catalog sources.
    pub fn catalog_dir(mut self, path: impl AsRef<Path>) -> Self {
        self.catalog_dir = Some(path.as_ref().to_path_buf());
        self
    }

    pub fn aliases(mut self, path: impl AsRef<Path>) -> Self {
        self.aliases_path = Some(path.as_ref().to_path_buf());
        self
    }

    pub fn config(mut self, path: impl AsRef<Path>) -> Self {
        self.config_path = Some(path.as_ref().to_path_buf());
        self
    }

    /// Provide the library directly (for testing without files).
    pub fn with_library(mut self, library: ReferenceLibrary) -> Self {
        self.library = Some(library);
        self
    }

    /// Provide the config directly (for testing without files).
    pub fn with_config(mut self, config: GeneratorConfig) -> Self {
        self.config = Some(config);
        self
    }

    pub fn build(self) -> Result<ModuleGenerator, GeneratorError> {
        let config = match (self.config, &self.config_path) {
            (Some(config), _) => config,
            (None, Some(path)) => GeneratorConfig::load_from_ron(path)?,
            (None, None) => GeneratorConfig::default(),
        };
        config.validate()?;

        let mut load_warnings = Vec::new();
        let library = match (self.library, &self.catalog_dir) {
            (Some(library), _) => library,
            (None, Some(dir)) => {
                let (library, warnings) = ReferenceLibrary::load_from_dir(
                    dir,
                    config.npc_priority.clone(),
                    config.item_priority.clone(),
                    self.aliases_path.as_deref(),
                )?;
                load_warnings = warnings;
                library
            }
            (None, None) => return Err(GeneratorError::NoCatalog),
        };

        Ok(ModuleGenerator {
            library,
            config,
            load_warnings,
        })
    }
}

/// Load module content from a single RON file, or merge every `.ron` file
/// in a directory in file-name order.
pub fn load_content(path: &Path) -> Result<ModuleContent, GeneratorError> {
    if path.is_file() {
        return Ok(ModuleContent::load_from_ron(path)?);
    }
    let mut content = ModuleContent::default();
    load_ron_files_from_dir(path, |file| {
        content.merge(ModuleContent::load_from_ron(file)?);
        Ok(())
    })?;
    Ok(content)
}

/// Load all .ron files from a directory, calling `loader` for each.
fn load_ron_files_from_dir<F>(dir: &Path, mut loader: F) -> Result<(), GeneratorError>
where
    F: FnMut(&Path) -> Result<(), GeneratorError>,
{
    let mut paths = Vec::new();
    for entry in std::fs::read_dir(dir)? {
        let path = entry?.path();
        if path.extension().and_then(|s| s.to_str()) == Some("ron") {
            paths.push(path);
        }
    }
    paths.sort();
    for path in paths {
        loader(&path)?;
    }
    Ok(())
}
