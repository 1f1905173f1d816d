/// Deferred cross-references between emitted entities.
///
/// Links are collected while entities are emitted and resolved against the
/// registry in a separate pass, after every emission phase has run.

use serde::{Deserialize, Serialize};

use crate::core::registry::CrossRefRegistry;
use crate::schema::entity::{EntityKind, RecordId};

/// What the consumer should do when a link target was never registered.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum LinkFallback {
    /// Drop the link.
    Omit,
    /// Show this text in place of the link.
    Placeholder(String),
    /// Keep the referenced data inline in the source record.
    Embed,
}

/// One end of a link: an entity kind and display name.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct LinkEnd {
    pub kind: EntityKind,
    pub name: String,
}

impl LinkEnd {
    pub fn new(kind: EntityKind, name: impl Into<String>) -> Self {
        Self {
            kind,
            name: name.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CrossReference {
    pub from: LinkEnd,
    pub target: LinkEnd,
    pub fallback: LinkFallback,
}

impl CrossReference {
    pub fn new(from: LinkEnd, target: LinkEnd, fallback: LinkFallback) -> Self {
        Self { from, target, fallback }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedLink {
    pub link: CrossReference,
    pub id: RecordId,
}

/// Outcome of the link pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LinkReport {
    pub resolved: Vec<ResolvedLink>,
    pub unresolved: Vec<CrossReference>,
}

impl LinkReport {
    pub fn is_complete(&self) -> bool {
        self.unresolved.is_empty()
    }

    pub fn len(&self) -> usize {
        self.resolved.len() + self.unresolved.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Id a link from `from` to `target` resolved to.
    pub fn target_id(&self, from: &LinkEnd, target: &LinkEnd) -> Option<&RecordId> {
        self.resolved
            .iter()
            .find(|r| &r.link.from == from && &r.link.target == target)
            .map(|r| &r.id)
    }

    /// Every link leaving `from`, resolved or not.
    pub fn links_from<'a>(&'a self, from: &'a LinkEnd) -> impl Iterator<Item = &'a CrossReference> + 'a {
        self.resolved
            .iter()
            .map(|r| &r.link)
            .chain(self.unresolved.iter())
            .filter(move |link| &link.from == from)
    }
}

/// Collects links during emission. Holds them until `resolve_all`.
#[derive(Debug, Clone, Default)]
pub struct LinkResolver {
    pending: Vec<CrossReference>,
}

impl LinkResolver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn defer(&mut self, link: CrossReference) {
        self.pending.push(link);
    }

    pub fn pending(&self) -> &[CrossReference] {
        &self.pending
    }

    /// Resolve every deferred link. Unresolved links are reported, never fatal.
    pub fn resolve_all(self, registry: &CrossRefRegistry) -> LinkReport {
        let mut report = LinkReport::default();
        for link in self.pending {
            match registry.resolve(link.target.kind, &link.target.name) {
                Some(id) => report.resolved.push(ResolvedLink { id: id.clone(), link }),
                None => {
                    log::warn!(
                        "Unresolved link from {} '{}' to {} '{}' ({:?})",
                        link.from.kind,
                        link.from.name,
                        link.target.kind,
                        link.target.name,
                        link.fallback
                    );
                    report.unresolved.push(link);
                }
            }
        }
        log::info!(
            "Link pass: {} resolved, {} unresolved",
            report.resolved.len(),
            report.unresolved.len()
        );
        report
    }
}
