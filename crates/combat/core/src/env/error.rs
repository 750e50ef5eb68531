//! Oracle access errors.

use crate::error::{CombatError, ErrorSeverity};
use crate::types::SpellId;

/// Errors that occur when accessing oracle data.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum OracleError {
    /// SpellOracle is not available in the environment.
    #[error("SpellOracle not available")]
    SpellsNotAvailable,

    /// RngOracle is not available in the environment.
    #[error("RngOracle not available")]
    RngNotAvailable,

    /// GeometryOracle is not available in the environment.
    #[error("GeometryOracle not available")]
    GeometryNotAvailable,

    /// FactionOracle is not available in the environment.
    #[error("FactionOracle not available")]
    FactionsNotAvailable,

    /// Spell descriptor was not found by id.
    #[error("spell descriptor {0} not found")]
    SpellNotFound(SpellId),
}

impl CombatError for OracleError {
    fn severity(&self) -> ErrorSeverity {
        use OracleError::*;
        match self {
            SpellsNotAvailable | RngNotAvailable => ErrorSeverity::Fatal,
            // Geometry and factions have defaults; callers fall back.
            GeometryNotAvailable | FactionsNotAvailable => ErrorSeverity::Recoverable,
            SpellNotFound(_) => ErrorSeverity::Validation,
        }
    }

    fn error_code(&self) -> &'static str {
        use OracleError::*;
        match self {
            SpellsNotAvailable => "ORACLE_SPELLS_NOT_AVAILABLE",
            RngNotAvailable => "ORACLE_RNG_NOT_AVAILABLE",
            GeometryNotAvailable => "ORACLE_GEOMETRY_NOT_AVAILABLE",
            FactionsNotAvailable => "ORACLE_FACTIONS_NOT_AVAILABLE",
            SpellNotFound(_) => "ORACLE_SPELL_NOT_FOUND",
        }
    }
}
