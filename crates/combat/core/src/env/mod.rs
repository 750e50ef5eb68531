//! Traits describing read-only data the combat core consumes.
//!
//! Oracles expose the spell catalog, deterministic randomness, positional
//! facts and hostility. [`CombatEnv`] bundles them together with the
//! [`CombatConfig`] so rules code can reach everything through one value.
mod error;
mod geometry;
mod rng;
mod spells;

pub use error::OracleError;
pub use geometry::{FacingEveryone, FactionIdHostility, FactionOracle, GeometryOracle};
pub use rng::{PcgRng, RngOracle, compute_seed, roll_context};
pub use spells::SpellOracle;

use crate::config::CombatConfig;
use crate::spell::SpellInfo;
use crate::types::SpellId;
use crate::unit::Unit;

/// Aggregates the read-only oracles used during combat resolution.
#[derive(Clone, Copy)]
pub struct CombatEnv<'a> {
    spells: Option<&'a dyn SpellOracle>,
    rng: Option<&'a dyn RngOracle>,
    geometry: Option<&'a dyn GeometryOracle>,
    factions: Option<&'a dyn FactionOracle>,
    config: &'a CombatConfig,
}

impl<'a> CombatEnv<'a> {
    pub fn new(config: &'a CombatConfig) -> Self {
        Self {
            spells: None,
            rng: None,
            geometry: None,
            factions: None,
            config,
        }
    }

    pub fn with_all(
        spells: &'a dyn SpellOracle,
        rng: &'a dyn RngOracle,
        geometry: &'a dyn GeometryOracle,
        factions: &'a dyn FactionOracle,
        config: &'a CombatConfig,
    ) -> Self {
        Self {
            spells: Some(spells),
            rng: Some(rng),
            geometry: Some(geometry),
            factions: Some(factions),
            config,
        }
    }

    #[must_use]
    pub fn with_spells(mut self, spells: &'a dyn SpellOracle) -> Self {
        self.spells = Some(spells);
        self
    }

    #[must_use]
    pub fn with_rng(mut self, rng: &'a dyn RngOracle) -> Self {
        self.rng = Some(rng);
        self
    }

    #[must_use]
    pub fn with_geometry(mut self, geometry: &'a dyn GeometryOracle) -> Self {
        self.geometry = Some(geometry);
        self
    }

    #[must_use]
    pub fn with_factions(mut self, factions: &'a dyn FactionOracle) -> Self {
        self.factions = Some(factions);
        self
    }

    /// Returns the SpellOracle, or an error if not available.
    ///
    /// # Errors
    ///
    /// Returns `OracleError::SpellsNotAvailable` if no spell oracle was provided.
    pub fn spells(&self) -> Result<&'a dyn SpellOracle, OracleError> {
        self.spells.ok_or(OracleError::SpellsNotAvailable)
    }

    /// Returns the RngOracle, or an error if not available.
    ///
    /// # Errors
    ///
    /// Returns `OracleError::RngNotAvailable` if no rng oracle was provided.
    pub fn rng(&self) -> Result<&'a dyn RngOracle, OracleError> {
        self.rng.ok_or(OracleError::RngNotAvailable)
    }

    /// Returns the GeometryOracle, or an error if not available.
    ///
    /// # Errors
    ///
    /// Returns `OracleError::GeometryNotAvailable` if no geometry oracle was provided.
    pub fn geometry(&self) -> Result<&'a dyn GeometryOracle, OracleError> {
        self.geometry.ok_or(OracleError::GeometryNotAvailable)
    }

    /// Returns the FactionOracle, or an error if not available.
    ///
    /// # Errors
    ///
    /// Returns `OracleError::FactionsNotAvailable` if no faction oracle was provided.
    pub fn factions(&self) -> Result<&'a dyn FactionOracle, OracleError> {
        self.factions.ok_or(OracleError::FactionsNotAvailable)
    }

    pub fn config(&self) -> &'a CombatConfig {
        self.config
    }

    /// Looks up a spell descriptor.
    ///
    /// # Errors
    ///
    /// Fails when the spell oracle is missing or does not know `id`.
    pub fn spell(&self, id: SpellId) -> Result<&'a SpellInfo, OracleError> {
        self.spells()?
            .spell(id)
            .ok_or(OracleError::SpellNotFound(id))
    }

    /// Frontal-arc check, defaulting to "in front" without a geometry oracle.
    pub fn in_frontal_arc(&self, victim: &Unit, attacker: &Unit) -> bool {
        self.geometry()
            .map_or_else(|_| FacingEveryone.in_frontal_arc(victim, attacker), |g| {
                g.in_frontal_arc(victim, attacker)
            })
    }

    /// Hostility check, defaulting to faction-id comparison without an oracle.
    pub fn is_hostile(&self, a: &Unit, b: &Unit) -> bool {
        self.factions()
            .map_or_else(|_| FactionIdHostility.is_hostile(a, b), |f| f.is_hostile(a, b))
    }
}

impl std::fmt::Debug for CombatEnv<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CombatEnv")
            .field("spells", &self.spells.is_some())
            .field("rng", &self.rng.is_some())
            .field("geometry", &self.geometry.is_some())
            .field("factions", &self.factions.is_some())
            .field("config", self.config)
            .finish()
    }
}
