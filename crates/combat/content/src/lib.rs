//! Data-driven combat content and loaders.
//!
//! This crate reads the static data the combat core consults through its
//! oracles:
//! - Spell catalogs and spell group stacking rules (RON)
//! - Combat configuration (TOML)
//!
//! Content is consumed by runtime oracles and never appears in unit state.

#[cfg(feature = "loaders")]
pub mod loaders;

#[cfg(feature = "loaders")]
pub use loaders::{ConfigLoader, ContentFactory, SpellCatalog, SpellGroupSpec, SpellLoader};
