//! Unified error type surfaced by the simulation API.
//!
//! Wraps combat refusals and content failures so callers can bubble them up
//! with consistent context.
use combat_core::{AuraError, CastError, CombatError, ErrorSeverity, SpellId, UnitId};
use thiserror::Error;

pub type Result<T> = std::result::Result<T, RuntimeError>;

#[derive(Debug, Error)]
pub enum RuntimeError {
    #[error("unit {0} is not in the world")]
    UnknownUnit(UnitId),

    #[error("unit {0} is already in the world")]
    DuplicateUnit(UnitId),

    #[error("{spell} is on cooldown for {caster} ({remaining_ms} ms left)")]
    SpellOnCooldown {
        spell: SpellId,
        caster: UnitId,
        remaining_ms: u64,
    },

    #[error("simulation requires oracles to be configured before building")]
    MissingOracles,

    #[error("tick length must be greater than zero")]
    ZeroTick,

    #[error(transparent)]
    Cast(#[from] CastError),

    #[error(transparent)]
    Aura(#[from] AuraError),

    #[error("failed to load combat content")]
    Content(#[source] Box<dyn std::error::Error + Send + Sync + 'static>),

    #[error("failed to export combat log")]
    Export(#[source] std::io::Error),
}

impl CombatError for RuntimeError {
    fn severity(&self) -> ErrorSeverity {
        use RuntimeError::*;
        match self {
            UnknownUnit(_) | DuplicateUnit(_) | ZeroTick => ErrorSeverity::Validation,
            SpellOnCooldown { .. } => ErrorSeverity::Recoverable,
            MissingOracles | Content(_) => ErrorSeverity::Fatal,
            Export(_) => ErrorSeverity::Internal,
            Cast(e) => e.severity(),
            Aura(e) => e.severity(),
        }
    }

    fn error_code(&self) -> &'static str {
        use RuntimeError::*;
        match self {
            UnknownUnit(_) => "RUNTIME_UNKNOWN_UNIT",
            DuplicateUnit(_) => "RUNTIME_DUPLICATE_UNIT",
            SpellOnCooldown { .. } => "RUNTIME_SPELL_ON_COOLDOWN",
            MissingOracles => "RUNTIME_MISSING_ORACLES",
            ZeroTick => "RUNTIME_ZERO_TICK",
            Content(_) => "RUNTIME_CONTENT",
            Export(_) => "RUNTIME_EXPORT",
            Cast(e) => e.error_code(),
            Aura(e) => e.error_code(),
        }
    }
}
