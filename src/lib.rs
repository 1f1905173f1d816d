//! Module Forge: entity resolution for tabletop adventure modules.
//!
//! Indexes a multi-source reference catalog, resolves author-written names
//! into catalog entries (exact, alias, fuzzy), synthesizes customized
//! entities from catalog templates, and allocates the identifiers and
//! cross-references a serialization layer needs to emit a module.

pub mod core;
pub mod schema;
