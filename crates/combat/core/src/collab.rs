//! Mutable collaborators the combat core calls out to.
//!
//! Oracles in [`crate::env`] are read-only. The traits here receive
//! notifications and may keep their own state: threat lists, cooldowns, the
//! combat log and behavioural hooks.

use crate::log::CombatLogSink;
use crate::spell::SpellInfo;
use crate::types::{DamageEffectType, ItemId, SpellId, UnitId};
use crate::unit::Unit;

/// Threat bookkeeping owned by the AI layer.
pub trait ThreatManager {
    /// `source` generated `amount` threat on `victim`'s threat list.
    fn add_threat(&mut self, victim: UnitId, source: UnitId, amount: f32, spell: Option<SpellId>);

    /// `helper` assisted `beneficiary`; enemies of the beneficiary should
    /// notice the helper.
    fn assist_threat(
        &mut self,
        beneficiary: UnitId,
        helper: UnitId,
        amount: f32,
        spell: Option<SpellId>,
    );

    /// Drops every threat entry involving `unit`.
    fn clear(&mut self, unit: UnitId);
}

/// Spell cooldown bookkeeping.
pub trait SpellHistory {
    /// Starts a cooldown. An `infinite` cooldown lasts until
    /// [`SpellHistory::send_cooldown_event`] arrives for the same spell.
    fn start_cooldown(&mut self, spell: SpellId, item: Option<ItemId>, caster: UnitId, infinite: bool);

    fn send_cooldown_event(&mut self, spell: SpellId, caster: UnitId);
}

/// Behavioural extension points. Every method defaults to a no-op.
#[allow(unused_variables)]
pub trait CombatHooks {
    /// Victim-side adjustment before damage is committed.
    fn damage_taken(
        &mut self,
        victim: &Unit,
        attacker: Option<&Unit>,
        amount: &mut u32,
        effect_type: DamageEffectType,
        spell: Option<SpellId>,
    ) {
    }

    /// Attacker-side adjustment before damage is committed.
    fn damage_dealt(
        &mut self,
        attacker: &Unit,
        victim: &Unit,
        amount: &mut u32,
        effect_type: DamageEffectType,
        spell: Option<SpellId>,
    ) {
    }

    /// Last word on crit chance, applied before clamping.
    fn crit_chance(
        &mut self,
        attacker: &Unit,
        victim: &Unit,
        spell: Option<&SpellInfo>,
        chance: &mut f32,
    ) {
    }

    /// Multiplier on crit damage after the built-in bonus.
    fn crit_damage_multiplier(&mut self, attacker: &Unit, spell: Option<&SpellInfo>) -> f32 {
        1.0
    }

    /// Flat damage added to a crit after the multiplier.
    fn crit_flat_bonus(&mut self, attacker: &Unit, spell: Option<&SpellInfo>) -> i32 {
        0
    }

    fn on_death(&mut self, victim: UnitId, killer: Option<UnitId>) {}

    /// A durability roll succeeded for `unit`.
    fn durability_loss(&mut self, unit: UnitId, pct: f32) {}
}

/// Hooks that do nothing.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoopHooks;

impl CombatHooks for NoopHooks {}

/// Mutable collaborators borrowed for the duration of one combat call.
pub struct Collaborators<'a> {
    pub threat: &'a mut dyn ThreatManager,
    pub history: &'a mut dyn SpellHistory,
    pub log: &'a mut dyn CombatLogSink,
    pub hooks: &'a mut dyn CombatHooks,
}

impl<'a> Collaborators<'a> {
    pub fn new(
        threat: &'a mut dyn ThreatManager,
        history: &'a mut dyn SpellHistory,
        log: &'a mut dyn CombatLogSink,
        hooks: &'a mut dyn CombatHooks,
    ) -> Self {
        Self {
            threat,
            history,
            log,
            hooks,
        }
    }
}

impl std::fmt::Debug for Collaborators<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Collaborators").finish_non_exhaustive()
    }
}
