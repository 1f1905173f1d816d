/// Reference library: the NPC and item catalogs plus the alias tables,
/// loaded once per run and shared read-only by matching and generation.

use std::path::Path;
use thiserror::Error;

use crate::core::aliases::{AliasError, AliasTable};
use crate::core::catalog::{load_sources_from_dir, CatalogError, CatalogIndex, SourceLoadWarning, SourcePriority};
use crate::core::matcher::MatchDomain;

#[derive(Debug, Error)]
pub enum LibraryError {
    #[error("catalog error: {0}")]
    Catalog(#[from] CatalogError),
    #[error("alias error: {0}")]
    Alias(#[from] AliasError),
}

#[derive(Debug, Clone)]
pub struct ReferenceLibrary {
    pub npcs: CatalogIndex,
    pub items: CatalogIndex,
    pub aliases: AliasTable,
}

impl ReferenceLibrary {
    pub fn new(npcs: CatalogIndex, items: CatalogIndex, aliases: AliasTable) -> Self {
        Self { npcs, items, aliases }
    }

    /// An empty library; every lookup misses.
    pub fn empty() -> Self {
        Self::new(
            CatalogIndex::build(Vec::new(), SourcePriority::npcs()),
            CatalogIndex::build(Vec::new(), SourcePriority::items()),
            AliasTable::default(),
        )
    }

    /// Load a library laid out as `<root>/npcs/*.ron`, `<root>/items/*.ron`.
    /// A missing sub-directory yields an empty catalog. Unreadable source
    /// files are skipped and returned as warnings.
    pub fn load_from_dir(
        root: &Path,
        npc_priority: SourcePriority,
        item_priority: SourcePriority,
        aliases: Option<&Path>,
    ) -> Result<(Self, Vec<SourceLoadWarning>), LibraryError> {
        let mut warnings = Vec::new();
        let npcs = load_catalog(&root.join("npcs"), npc_priority, &mut warnings)?;
        let items = load_catalog(&root.join("items"), item_priority, &mut warnings)?;
        let aliases = match aliases {
            Some(path) => AliasTable::load_from_ron(path)?,
            None => AliasTable::default(),
        };

        log::info!(
            "Reference library loaded: {} NPC entries, {} item entries, {} skipped file(s)",
            npcs.len(),
            items.len(),
            warnings.len()
        );
        Ok((Self::new(npcs, items, aliases), warnings))
    }

    pub fn catalog(&self, domain: MatchDomain) -> &CatalogIndex {
        match domain {
            MatchDomain::Npc => &self.npcs,
            MatchDomain::Item => &self.items,
        }
    }

    /// Whether `name` is a known creature, directly or through the alias table.
    pub fn creature_exists(&self, name: &str) -> bool {
        self.npcs.find_by_name(name, None).is_some()
            || self
                .aliases
                .creature(name)
                .is_some_and(|target| self.npcs.find_by_name(target, None).is_some())
    }
}

fn load_catalog(
    dir: &Path,
    priority: SourcePriority,
    warnings: &mut Vec<SourceLoadWarning>,
) -> Result<CatalogIndex, CatalogError> {
    if !dir.is_dir() {
        log::debug!("No catalog directory at {}", dir.display());
        return Ok(CatalogIndex::build(Vec::new(), priority));
    }
    let (sources, skipped) = load_sources_from_dir(dir)?;
    warnings.extend(skipped);
    Ok(CatalogIndex::build(sources, priority))
}
