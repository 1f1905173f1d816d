/// Cross-reference registry: per-run identifier allocation and
/// (kind, name) -> id resolution for emitted entities.

use rustc_hash::FxHashMap;

use crate::schema::entity::{EntityKind, RecordId};

/// One emitted entity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegistryEntry {
    pub kind: EntityKind,
    pub name: String,
    pub id: RecordId,
}

/// Run-scoped registry. Create a fresh one per generation run; counters
/// and registrations are never carried over.
#[derive(Debug, Clone, Default)]
pub struct CrossRefRegistry {
    counters: FxHashMap<EntityKind, u32>,
    names: FxHashMap<(EntityKind, String), usize>,
    entries: Vec<RegistryEntry>,
}

impl CrossRefRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Next sequential id for `kind`. Ids start at `id-00001`.
    pub fn allocate(&mut self, kind: EntityKind) -> RecordId {
        let counter = self.counters.entry(kind).or_insert(0);
        *counter += 1;
        RecordId::from_sequence(*counter)
    }

    /// Record `name` under `kind`. Call this once the entity is final, so a
    /// failed synthesis never claims a name. Re-registering a name keeps the
    /// latest id and returns the one it replaced.
    pub fn register(&mut self, kind: EntityKind, name: &str, id: RecordId) -> Option<RecordId> {
        let entry = RegistryEntry {
            kind,
            name: name.to_string(),
            id,
        };
        match self.names.get(&(kind, name.to_string())) {
            Some(&slot) => {
                let previous = std::mem::replace(&mut self.entries[slot], entry);
                log::warn!(
                    "{} '{}' registered twice ({} replaced by {})",
                    kind,
                    name,
                    previous.id,
                    self.entries[slot].id
                );
                Some(previous.id)
            }
            None => {
                self.names.insert((kind, name.to_string()), self.entries.len());
                self.entries.push(entry);
                None
            }
        }
    }

    /// Allocate and register in one step.
    pub fn emit(&mut self, kind: EntityKind, name: &str) -> RecordId {
        let id = self.allocate(kind);
        self.register(kind, name, id.clone());
        id
    }

    pub fn resolve(&self, kind: EntityKind, name: &str) -> Option<&RecordId> {
        self.names
            .get(&(kind, name.to_string()))
            .map(|&slot| &self.entries[slot].id)
    }

    pub fn contains(&self, kind: EntityKind, name: &str) -> bool {
        self.resolve(kind, name).is_some()
    }

    /// Registered entries in registration order.
    pub fn entries(&self) -> &[RegistryEntry] {
        &self.entries
    }

    pub fn entries_of(&self, kind: EntityKind) -> impl Iterator<Item = &RegistryEntry> {
        self.entries.iter().filter(move |e| e.kind == kind)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
