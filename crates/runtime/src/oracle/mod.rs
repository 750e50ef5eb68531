//! Runtime wrappers around static combat content oracles.
//!
//! These implementations expose `combat-core` oracle traits and bundle them
//! into an [`OracleManager`] so the simulation can build
//! [`combat_core::CombatEnv`] snapshots on demand. The data is immutable at
//! runtime; dynamic state lives on the units of the [`combat_core::World`].
mod spells;

use std::sync::Arc;

use combat_core::env::{FacingEveryone, FactionIdHostility};
use combat_core::{CombatConfig, CombatEnv, FactionOracle, GeometryOracle, PcgRng};

pub use spells::SpellOracleImpl;

/// Manages all oracle implementations and provides unified access
#[derive(Clone)]
pub struct OracleManager {
    pub(crate) spells: Arc<SpellOracleImpl>,
    pub(crate) geometry: Arc<dyn GeometryOracle + Send + Sync>,
    pub(crate) factions: Arc<dyn FactionOracle + Send + Sync>,
    pub(crate) rng: PcgRng,
}

impl OracleManager {
    /// Creates a manager with every unit facing every other unit and
    /// hostility decided by faction id.
    pub fn new(spells: Arc<SpellOracleImpl>) -> Self {
        Self {
            spells,
            geometry: Arc::new(FacingEveryone),
            factions: Arc::new(FactionIdHostility),
            rng: PcgRng, // PcgRng is stateless
        }
    }

    #[must_use]
    pub fn with_geometry(mut self, geometry: Arc<dyn GeometryOracle + Send + Sync>) -> Self {
        self.geometry = geometry;
        self
    }

    #[must_use]
    pub fn with_factions(mut self, factions: Arc<dyn FactionOracle + Send + Sync>) -> Self {
        self.factions = factions;
        self
    }

    /// Converts the oracle manager into a CombatEnv for combat-core
    pub fn as_combat_env<'a>(&'a self, config: &'a CombatConfig) -> CombatEnv<'a> {
        CombatEnv::with_all(
            self.spells.as_ref(),
            &self.rng,
            self.geometry.as_ref(),
            self.factions.as_ref(),
            config,
        )
    }

    pub fn spells(&self) -> &SpellOracleImpl {
        &self.spells
    }
}

impl std::fmt::Debug for OracleManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OracleManager")
            .field("spells", &self.spells.len())
            .finish_non_exhaustive()
    }
}
