/// Catalog index: multi-source reference data with priority-aware lookup.

use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::schema::entity::CatalogEntry;

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("RON deserialization error: {0}")]
    Ron(#[from] ron::error::SpannedError),
    #[error("catalog source has an empty source id")]
    MissingSourceId,
}

/// Ranked ordering of source ids. Lower rank wins a name collision;
/// sources not listed rank after every listed one.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SourcePriority(pub Vec<String>);

impl SourcePriority {
    /// Rank given to sources absent from the table.
    pub const UNRANKED: usize = 999;

    pub fn new<S: AsRef<str>>(sources: &[S]) -> Self {
        Self(sources.iter().map(|s| s.as_ref().to_string()).collect())
    }

    /// Priority for NPC and creature catalogs.
    pub fn npcs() -> Self {
        Self::new(&["Character Law", "Arms Law", "Spell Law", "Creatures & Treasures"])
    }

    /// Priority for item catalogs: weapon tables carry full combat stats.
    pub fn items() -> Self {
        Self::new(&["Arms Law", "Character Law", "Spell Law", "Creatures & Treasures"])
    }

    /// 1-based rank of a source.
    pub fn rank(&self, source: &str) -> usize {
        self.0
            .iter()
            .position(|s| s == source)
            .map(|i| i + 1)
            .unwrap_or(Self::UNRANKED)
    }
}

impl Default for SourcePriority {
    fn default() -> Self {
        Self::npcs()
    }
}

/// One source's worth of catalog entries, as stored on disk.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogSource {
    pub source: String,
    #[serde(default)]
    pub entries: Vec<CatalogEntry>,
}

impl CatalogSource {
    pub fn new(source: impl Into<String>, entries: Vec<CatalogEntry>) -> Self {
        let mut src = Self {
            source: source.into(),
            entries,
        };
        src.stamp_entries();
        src
    }

    /// Load a catalog source from a RON file.
    pub fn load_from_ron(path: &Path) -> Result<CatalogSource, CatalogError> {
        let contents = std::fs::read_to_string(path)?;
        Self::parse_ron(&contents)
    }

    /// Parse a catalog source from a RON string.
    pub fn parse_ron(input: &str) -> Result<CatalogSource, CatalogError> {
        let mut src: CatalogSource = ron::from_str(input)?;
        if src.source.trim().is_empty() {
            return Err(CatalogError::MissingSourceId);
        }
        src.stamp_entries();
        Ok(src)
    }

    // Entries inherit the enclosing source id.
    fn stamp_entries(&mut self) {
        for entry in &mut self.entries {
            entry.source = self.source.clone();
        }
    }
}

/// A catalog file that could not be loaded. Its entries are simply absent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceLoadWarning {
    pub path: PathBuf,
    pub message: String,
}

/// Load every `.ron` file in `dir` as a catalog source, in file-name order.
///
/// Malformed files are logged and skipped so the run continues with a
/// partial catalog. Only a missing or unreadable directory is an error.
pub fn load_sources_from_dir(
    dir: &Path,
) -> Result<(Vec<CatalogSource>, Vec<SourceLoadWarning>), CatalogError> {
    let mut paths = Vec::new();
    for entry in std::fs::read_dir(dir)? {
        let path = entry?.path();
        if path.extension().and_then(|s| s.to_str()) == Some("ron") {
            paths.push(path);
        }
    }
    paths.sort();

    let mut sources = Vec::new();
    let mut warnings = Vec::new();
    for path in paths {
        match CatalogSource::load_from_ron(&path) {
            Ok(src) => {
                log::debug!(
                    "Loaded catalog source '{}' ({} entries) from {}",
                    src.source,
                    src.entries.len(),
                    path.display()
                );
                sources.push(src);
            }
            Err(e) => {
                log::warn!("Skipping catalog source {}: {}", path.display(), e);
                warnings.push(SourceLoadWarning {
                    path,
                    message: e.to_string(),
                });
            }
        }
    }
    Ok((sources, warnings))
}

/// One source holding a name, for collision diagnostics.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceVersion {
    pub source: String,
    pub reference: Option<String>,
    pub rank: usize,
    pub is_default: bool,
}

/// Which sources contain a name and which one was chosen.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceInfo {
    pub name: String,
    pub sources: Vec<SourceVersion>,
}

impl SourceInfo {
    pub fn default_source(&self) -> Option<&SourceVersion> {
        self.sources.iter().find(|s| s.is_default)
    }
}

/// Read-only, priority-aware index over every loaded catalog entry.
#[derive(Debug, Clone, Default)]
pub struct CatalogIndex {
    entries: Vec<CatalogEntry>,
    priority: SourcePriority,
    /// name -> every version, source-priority order, ties by load order
    all_versions: FxHashMap<String, Vec<usize>>,
    /// name -> highest-priority version
    canonical: FxHashMap<String, usize>,
    /// canonical names, sorted, for deterministic scans
    canonical_names: Vec<String>,
    by_id: FxHashMap<String, usize>,
    by_profession: FxHashMap<String, Vec<usize>>,
    by_level: FxHashMap<i64, Vec<usize>>,
}

impl CatalogIndex {
    /// Build the index from sources in load order.
    ///
    /// Entries are reduced in (rank, load order) order, so the canonical
    /// entry for a name is the first one seen: the best-ranked source, and
    /// among equally ranked sources the earliest loaded.
    pub fn build(sources: Vec<CatalogSource>, priority: SourcePriority) -> CatalogIndex {
        let mut entries = Vec::new();
        for src in sources {
            entries.extend(src.entries);
        }

        let mut order: Vec<(usize, usize)> = entries
            .iter()
            .enumerate()
            .map(|(i, e)| (priority.rank(&e.source), i))
            .collect();
        order.sort();

        let mut index = CatalogIndex {
            priority,
            ..Default::default()
        };

        for &(_, i) in &order {
            let entry = &entries[i];
            if !entry.id.is_empty() {
                index.by_id.entry(entry.id.clone()).or_insert(i);
            }

            let key = entry.key();
            if key.is_empty() {
                continue;
            }
            index.all_versions.entry(key.clone()).or_default().push(i);
            index.canonical.entry(key).or_insert(i);
        }

        // Secondary indices keep load order.
        for (i, entry) in entries.iter().enumerate() {
            if let Some(profession) = entry.profession() {
                index
                    .by_profession
                    .entry(profession.to_string())
                    .or_default()
                    .push(i);
            }
            if let Some(level) = entry.level() {
                index.by_level.entry(level).or_default().push(i);
            }
        }

        index.canonical_names = index.canonical.keys().cloned().collect();
        index.canonical_names.sort();
        index.entries = entries;

        log::debug!(
            "Catalog index built: {} entries, {} distinct names",
            index.entries.len(),
            index.canonical_names.len()
        );
        index
    }

    pub fn priority(&self) -> &SourcePriority {
        &self.priority
    }

    /// Total number of loaded entries, counting every source version.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Lowercased canonical names, sorted.
    pub fn canonical_names(&self) -> &[String] {
        &self.canonical_names
    }

    /// Case-insensitive lookup. A preferred source that doesn't hold the
    /// name falls back to the canonical entry.
    pub fn find_by_name(&self, name: &str, preferred_source: Option<&str>) -> Option<&CatalogEntry> {
        let key = name.to_lowercase();
        if let Some(preferred) = preferred_source {
            let preferred_hit = self
                .all_versions
                .get(&key)
                .into_iter()
                .flatten()
                .map(|&i| &self.entries[i])
                .find(|e| e.source == preferred);
            if preferred_hit.is_some() {
                return preferred_hit;
            }
        }
        self.canonical.get(&key).map(|&i| &self.entries[i])
    }

    /// Every version of a name, best source first.
    pub fn find_all_by_name(&self, name: &str) -> Vec<&CatalogEntry> {
        self.all_versions
            .get(&name.to_lowercase())
            .map(|versions| versions.iter().map(|&i| &self.entries[i]).collect())
            .unwrap_or_default()
    }

    pub fn find_by_id(&self, id: &str) -> Option<&CatalogEntry> {
        self.by_id.get(id).map(|&i| &self.entries[i])
    }

    /// Reports every source holding `name` and marks the canonical pick.
    pub fn source_info(&self, name: &str) -> Option<SourceInfo> {
        let key = name.to_lowercase();
        let versions = self.all_versions.get(&key)?;
        let default = self.canonical.get(&key).copied();
        let sources = versions
            .iter()
            .map(|&i| {
                let entry = &self.entries[i];
                SourceVersion {
                    source: entry.source.clone(),
                    reference: entry.reference.clone(),
                    rank: self.priority.rank(&entry.source),
                    is_default: Some(i) == default,
                }
            })
            .collect();
        Some(SourceInfo {
            name: self.entries[versions[0]].name.clone(),
            sources,
        })
    }

    /// Substring search over canonical entries, in name order.
    pub fn search_by_name(&self, term: &str) -> Vec<&CatalogEntry> {
        let term = term.to_lowercase();
        self.canonical_names
            .iter()
            .filter(|name| name.contains(&term))
            .filter_map(|name| self.canonical.get(name))
            .map(|&i| &self.entries[i])
            .collect()
    }

    /// Leveled template lookup; the level must match exactly.
    pub fn find_by_profession_and_level(&self, profession: &str, level: i64) -> Option<&CatalogEntry> {
        self.by_profession
            .get(profession)?
            .iter()
            .map(|&i| &self.entries[i])
            .find(|e| e.level() == Some(level))
    }

    pub fn list_professions(&self) -> Vec<&str> {
        let mut professions: Vec<&str> = self.by_profession.keys().map(String::as_str).collect();
        professions.sort_unstable();
        professions
    }

    pub fn levels_for_profession(&self, profession: &str) -> Vec<i64> {
        let mut levels: Vec<i64> = self
            .by_profession
            .get(profession)
            .into_iter()
            .flatten()
            .filter_map(|&i| self.entries[i].level())
            .collect();
        levels.sort_unstable();
        levels.dedup();
        levels
    }

    pub fn all_at_level(&self, level: i64) -> Vec<&CatalogEntry> {
        self.by_level
            .get(&level)
            .map(|v| v.iter().map(|&i| &self.entries[i]).collect())
            .unwrap_or_default()
    }

    /// Canonical entries whose group matches, case-insensitively.
    pub fn search_by_group(&self, group: &str) -> Vec<&CatalogEntry> {
        let group = group.to_lowercase();
        self.canonical_names
            .iter()
            .filter_map(|name| self.canonical.get(name))
            .map(|&i| &self.entries[i])
            .filter(|e| e.group().map(str::to_lowercase).as_deref() == Some(group.as_str()))
            .collect()
    }
}
