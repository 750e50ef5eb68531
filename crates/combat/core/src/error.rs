//! Error infrastructure for combat-core.
//!
//! Normal-path failures (unknown spell, dead target, immunity, a losing
//! stacking comparison) are returned as values and logged at debug level by
//! the caller. Broken invariants are not errors: they panic.
//!
//! Domain errors live next to the code that raises them in spirit, but are
//! collected here because aura application and spell casting share most of
//! their refusal reasons.

use crate::env::OracleError;
use crate::spell::CastSlot;
use crate::types::{SpellId, UnitId};

/// Severity level of an error, used for categorization and recovery strategies.
///
/// - **Recoverable**: the same request may succeed later (target immune right now)
/// - **Validation**: the request itself was invalid (unknown spell id)
/// - **Internal**: unexpected state inconsistency worth investigating
/// - **Fatal**: a required oracle is missing
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ErrorSeverity {
    Recoverable,
    Validation,
    Internal,
    Fatal,
}

impl ErrorSeverity {
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Recoverable => "recoverable",
            Self::Validation => "validation",
            Self::Internal => "internal",
            Self::Fatal => "fatal",
        }
    }

    pub const fn is_recoverable(&self) -> bool {
        matches!(self, Self::Recoverable)
    }

    pub const fn is_internal(&self) -> bool {
        matches!(self, Self::Internal | Self::Fatal)
    }
}

/// Common trait for all combat-core errors.
pub trait CombatError: core::fmt::Display + core::fmt::Debug {
    /// Returns the severity level of this error.
    fn severity(&self) -> ErrorSeverity;

    /// Returns a stable identifier for this error variant.
    fn error_code(&self) -> &'static str {
        core::any::type_name::<Self>()
    }
}

/// Reasons an aura was not applied.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum AuraError {
    #[error("spell {0} is not in the spell catalog")]
    UnknownSpell(SpellId),

    #[error("unit {0} does not exist")]
    UnitNotFound(UnitId),

    #[error("target {target} is dead and {spell} does not persist through death")]
    TargetDead { target: UnitId, spell: SpellId },

    #[error("{0} has no aura effects in the requested effect mask")]
    NoAuraEffects(SpellId),

    #[error("target {target} is immune to {spell}")]
    Immune { target: UnitId, spell: SpellId },

    #[error("{spell} lost a stacking comparison against {winner}")]
    Superseded { spell: SpellId, winner: SpellId },

    #[error("diminishing returns reduced {spell} on {target} to zero duration")]
    Diminished { target: UnitId, spell: SpellId },

    #[error("unit {0} already holds the maximum number of auras")]
    TooManyAuras(UnitId),

    #[error(transparent)]
    Oracle(#[from] OracleError),
}

impl CombatError for AuraError {
    fn severity(&self) -> ErrorSeverity {
        use AuraError::*;
        match self {
            UnknownSpell(_) | UnitNotFound(_) | NoAuraEffects(_) => ErrorSeverity::Validation,
            TargetDead { .. } | Immune { .. } | Superseded { .. } | Diminished { .. } => {
                ErrorSeverity::Recoverable
            }
            TooManyAuras(_) => ErrorSeverity::Internal,
            Oracle(e) => e.severity(),
        }
    }

    fn error_code(&self) -> &'static str {
        use AuraError::*;
        match self {
            UnknownSpell(_) => "AURA_UNKNOWN_SPELL",
            UnitNotFound(_) => "AURA_UNIT_NOT_FOUND",
            TargetDead { .. } => "AURA_TARGET_DEAD",
            NoAuraEffects(_) => "AURA_NO_EFFECTS",
            Immune { .. } => "AURA_TARGET_IMMUNE",
            Superseded { .. } => "AURA_SUPERSEDED",
            Diminished { .. } => "AURA_DIMINISHED",
            TooManyAuras(_) => "AURA_LIMIT_REACHED",
            Oracle(e) => e.error_code(),
        }
    }
}

/// Reasons a cast request did nothing.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum CastError {
    #[error("spell {0} is not in the spell catalog")]
    UnknownSpell(SpellId),

    #[error("caster {0} does not exist")]
    CasterNotFound(UnitId),

    #[error("target {0} does not exist")]
    TargetNotFound(UnitId),

    #[error("caster {0} is dead")]
    CasterDead(UnitId),

    #[error("caster {caster} is already casting in the {slot:?} slot")]
    AlreadyCasting { caster: UnitId, slot: CastSlot },

    #[error("caster {caster} has no {slot:?} cast in progress")]
    NotCasting { caster: UnitId, slot: CastSlot },

    #[error("caster {caster} is not casting {spell}")]
    NotCastingSpell { caster: UnitId, spell: SpellId },

    #[error(transparent)]
    Oracle(#[from] OracleError),
}

impl CombatError for CastError {
    fn severity(&self) -> ErrorSeverity {
        use CastError::*;
        match self {
            UnknownSpell(_) | CasterNotFound(_) | TargetNotFound(_) => ErrorSeverity::Validation,
            CasterDead(_) | AlreadyCasting { .. } | NotCasting { .. } | NotCastingSpell { .. } => {
                ErrorSeverity::Recoverable
            }
            Oracle(e) => e.severity(),
        }
    }

    fn error_code(&self) -> &'static str {
        use CastError::*;
        match self {
            UnknownSpell(_) => "CAST_UNKNOWN_SPELL",
            CasterNotFound(_) => "CAST_CASTER_NOT_FOUND",
            TargetNotFound(_) => "CAST_TARGET_NOT_FOUND",
            CasterDead(_) => "CAST_CASTER_DEAD",
            AlreadyCasting { .. } => "CAST_ALREADY_CASTING",
            NotCasting { .. } => "CAST_NOT_CASTING",
            NotCastingSpell { .. } => "CAST_NOT_CASTING_SPELL",
            Oracle(e) => e.error_code(),
        }
    }
}
