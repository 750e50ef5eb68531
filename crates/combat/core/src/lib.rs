//! Deterministic combat resolution for units, spells and auras.
//!
//! `combat-core` owns the rules: how auras are applied, stacked and removed,
//! how diminishing returns shorten crowd control, how procs react to combat
//! events, and how a hit travels from the attack table through modifiers and
//! mitigation to a committed health change. It performs no I/O. Spell data,
//! randomness, positions and hostility come from the oracles in [`env`];
//! threat, cooldowns, the combat log and behavioural hooks are reached
//! through the collaborator traits in [`collab`].
//!
//! Every mutation runs through a [`CombatContext`] borrowed for one call.
pub mod aura;
pub mod collab;
pub mod combat;
pub mod config;
pub mod diminishing;
pub mod env;
pub mod error;
pub mod immunity;
pub mod log;
pub mod proc;
pub mod schedule;
pub mod spell;
pub mod types;
pub mod unit;
pub mod world;

#[cfg(any(test, feature = "test-utils"))]
pub mod testing;

pub use aura::{
    Aura, AuraApplication, AuraApplyRequest, AuraEffect, AuraRemoveMode, AuraType, apply_aura,
    remove_aura,
};
pub use collab::{CombatHooks, Collaborators, NoopHooks, SpellHistory, ThreatManager};
pub use combat::{DamageInfo, HealInfo, HitSource, MeleeHitOutcome, SpellMissInfo};
pub use config::CombatConfig;
pub use diminishing::{DiminishingGroup, DiminishingLevel, DiminishingReturnType};
pub use env::{
    CombatEnv, FactionOracle, GeometryOracle, OracleError, PcgRng, RngOracle, SpellOracle,
};
pub use error::{AuraError, CastError, CombatError, ErrorSeverity};
pub use immunity::{ImmunityKind, SpellImmunityTable};
pub use log::{CombatLogEntry, CombatLogSink, DiscardLog};
pub use proc::{ProcFlags, ProcHit, ProcRequest, SpellProcEntry};
pub use spell::{
    CastOutcome, CastRequest, CastSlot, SpellAttributes, SpellEffectInfo, SpellEffectKind,
    SpellInfo,
};
pub use types::{
    AuraId, DamageEffectType, ItemId, Mechanic, SchoolMask, SpellId, Timestamp, UnitId,
    WeaponAttackType,
};
pub use unit::{AuraState, DeathState, Unit, UnitStateFlags, UnitStats};
pub use world::{CombatContext, World};
