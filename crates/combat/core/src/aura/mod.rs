//! Aura lifecycle: creation, stacking, effect application and removal.
//!
//! An [`Aura`] is owned by the unit it is attached to. Its binding to that
//! unit is an [`AuraApplication`], which records which effect slots are
//! currently applied and, once removal starts, the [`AuraRemoveMode`]. From
//! that moment the application is frozen: any attempt to apply another slot
//! panics.
mod handlers;
mod manager;
mod query;
mod types;

pub use manager::{
    AuraApplyRequest, apply_aura, dispel, remove_all_auras, remove_aura, remove_auras_by_spell,
    remove_auras_by_type, remove_auras_on_death, remove_auras_with_interrupt_flags,
    remove_auras_with_mechanic, update_auras,
};
pub use query::ModifierTotals;
pub(crate) use manager::modify_stack_amount;
pub(crate) use query::misc_school;
pub use types::{AuraType, ignore_result};

use std::collections::BTreeSet;

use crate::config::CombatConfig;
use crate::diminishing::DiminishingGroup;
use crate::spell::{EffectMask, SpellGroupStackRule};
use crate::types::{AuraId, ItemId, Mechanic, SpellId, Timestamp, UnitId};

/// Why an aura is being removed.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum AuraRemoveMode {
    /// Still active.
    None,
    Default,
    Interrupt,
    /// Removed by its owner.
    Cancel,
    /// Dispelled, broken, or exhausted by someone else's action.
    EnemySpell,
    Expire,
    Death,
}

/// One live effect slot of an aura.
#[derive(Clone, Debug, PartialEq)]
pub struct AuraEffect {
    pub slot: usize,
    pub aura_type: AuraType,
    /// Per-stack amount before scaling.
    pub base_amount: i32,
    amount: i32,
    pub misc_value: i32,
    pub misc_value_b: i32,
    pub mechanic: Mechanic,
    pub amplitude_ms: u32,
    periodic_timer_ms: i64,
    tick_number: u32,
    pub bonus_coefficient: f32,
    pub trigger_spell: Option<SpellId>,
}

impl AuraEffect {
    pub(crate) fn new(slot: usize, aura_type: AuraType, base_amount: i32) -> Self {
        Self {
            slot,
            aura_type,
            base_amount,
            amount: base_amount,
            misc_value: 0,
            misc_value_b: 0,
            mechanic: Mechanic::None,
            amplitude_ms: 0,
            periodic_timer_ms: 0,
            tick_number: 0,
            bonus_coefficient: 0.0,
            trigger_spell: None,
        }
    }

    #[inline]
    pub fn amount(&self) -> i32 {
        self.amount
    }

    pub fn tick_number(&self) -> u32 {
        self.tick_number
    }

    pub fn is_periodic(&self) -> bool {
        self.aura_type.is_periodic() && self.amplitude_ms > 0
    }

    fn reset_periodic(&mut self) {
        self.periodic_timer_ms = self.amplitude_ms as i64;
        self.tick_number = 0;
    }
}

/// One effect instance produced by one cast, attached to its owner.
#[derive(Clone, Debug)]
pub struct Aura {
    pub id: AuraId,
    pub spell: SpellId,
    pub caster: Option<UnitId>,
    pub owner: UnitId,
    pub cast_item: Option<ItemId>,
    effects: [Option<AuraEffect>; CombatConfig::MAX_SPELL_EFFECTS],
    effect_mask: EffectMask,
    duration_ms: i32,
    max_duration_ms: i32,
    stack: u32,
    charges: u32,
    pub single_target: bool,
    pub positive: bool,
    pub dr_group: DiminishingGroup,
    /// Stack group and its rule, copied from the catalog at creation.
    pub stack_group: Option<(u32, SpellGroupStackRule)>,
    pub applied_at: Timestamp,
    applications: BTreeSet<UnitId>,
    proc_cooldown_until: Option<Timestamp>,
    removing: bool,
}

impl Aura {
    pub(crate) fn new(id: AuraId, spell: SpellId, owner: UnitId, caster: Option<UnitId>) -> Self {
        Self {
            id,
            spell,
            caster,
            owner,
            cast_item: None,
            effects: Default::default(),
            effect_mask: EffectMask::NONE,
            duration_ms: 0,
            max_duration_ms: 0,
            stack: 1,
            charges: 0,
            single_target: false,
            positive: true,
            dr_group: DiminishingGroup::None,
            stack_group: None,
            applied_at: Timestamp::ZERO,
            applications: BTreeSet::new(),
            proc_cooldown_until: None,
            removing: false,
        }
    }

    fn assert_mutable(&self) {
        assert!(
            !self.removing,
            "{} on {} mutated after its removal started",
            self.id, self.owner
        );
    }

    pub(crate) fn set_effect(&mut self, effect: AuraEffect) {
        self.assert_mutable();
        let slot = effect.slot;
        self.effect_mask = self.effect_mask.union(EffectMask::slot(slot));
        self.effects[slot] = Some(effect);
    }

    pub fn effects(&self) -> impl Iterator<Item = &AuraEffect> {
        self.effects.iter().flatten()
    }

    pub fn effect(&self, slot: usize) -> Option<&AuraEffect> {
        self.effects.get(slot).and_then(Option::as_ref)
    }

    pub fn effect_mask(&self) -> EffectMask {
        self.effect_mask
    }

    /// Sets the scaled amount of one slot.
    pub(crate) fn set_effect_amount(&mut self, slot: usize, amount: i32) {
        self.assert_mutable();
        if let Some(effect) = self.effects.get_mut(slot).and_then(Option::as_mut) {
            effect.amount = amount;
        }
    }

    /// Replaces the per-stack amount of one slot; call `recalculate_amounts` after.
    pub(crate) fn set_base_amount(&mut self, slot: usize, base_amount: i32) {
        self.assert_mutable();
        if let Some(effect) = self.effects.get_mut(slot).and_then(Option::as_mut) {
            effect.base_amount = base_amount;
        }
    }

    /// Rescales every slot to `base_amount * stack`.
    pub(crate) fn recalculate_amounts(&mut self) {
        self.assert_mutable();
        let stack = self.stack as i32;
        for effect in self.effects.iter_mut().flatten() {
            effect.amount = effect.base_amount.saturating_mul(stack);
        }
    }

    /// Largest absolute amount over all slots; used by stacking comparisons.
    pub fn max_abs_amount(&self) -> i32 {
        self.effects().map(|e| e.amount.saturating_abs()).max().unwrap_or(0)
    }

    pub fn duration(&self) -> i32 {
        self.duration_ms
    }

    pub fn max_duration(&self) -> i32 {
        self.max_duration_ms
    }

    pub fn is_permanent(&self) -> bool {
        self.max_duration_ms < 0
    }

    pub(crate) fn set_max_duration(&mut self, duration_ms: i32) {
        self.assert_mutable();
        self.max_duration_ms = duration_ms;
        self.duration_ms = duration_ms;
    }

    pub(crate) fn refresh_duration(&mut self) {
        self.assert_mutable();
        self.duration_ms = self.max_duration_ms;
        for effect in self.effects.iter_mut().flatten() {
            effect.reset_periodic();
        }
    }

    /// Cuts the remaining duration, used when a channel is delayed.
    pub(crate) fn shorten_duration(&mut self, delay_ms: i32) {
        self.assert_mutable();
        if !self.is_permanent() {
            self.duration_ms = self.duration_ms.saturating_sub(delay_ms).max(0);
        }
    }

    /// Counts down; returns true when the aura has run out.
    pub(crate) fn advance_duration(&mut self, diff_ms: u64) -> bool {
        if self.is_permanent() {
            return false;
        }
        let diff = i32::try_from(diff_ms).unwrap_or(i32::MAX);
        self.duration_ms = self.duration_ms.saturating_sub(diff).max(0);
        self.duration_ms == 0
    }

    pub fn stack(&self) -> u32 {
        self.stack
    }

    pub(crate) fn set_stack(&mut self, stack: u32) {
        self.assert_mutable();
        self.stack = stack.max(1);
        self.recalculate_amounts();
    }

    pub fn charges(&self) -> u32 {
        self.charges
    }

    pub(crate) fn set_charges(&mut self, charges: u32) {
        self.assert_mutable();
        self.charges = charges;
    }

    pub fn is_on_proc_cooldown(&self, now: Timestamp) -> bool {
        self.proc_cooldown_until.is_some_and(|until| now < until)
    }

    pub(crate) fn start_proc_cooldown(&mut self, until: Timestamp) {
        self.proc_cooldown_until = Some(until);
    }

    pub fn applications(&self) -> impl Iterator<Item = UnitId> + '_ {
        self.applications.iter().copied()
    }

    pub(crate) fn add_application(&mut self, target: UnitId) {
        self.assert_mutable();
        let inserted = self.applications.insert(target);
        assert!(inserted, "{} already applied to {}", self.id, target);
    }

    pub(crate) fn remove_application(&mut self, target: UnitId) {
        self.applications.remove(&target);
    }

    pub fn is_removing(&self) -> bool {
        self.removing
    }

    pub(crate) fn mark_removing(&mut self) {
        self.removing = true;
    }

    /// Moves the periodic timer of one slot and returns how many ticks are due.
    pub(crate) fn advance_periodic(&mut self, slot: usize, diff_ms: u64) -> u32 {
        let Some(effect) = self.effects.get_mut(slot).and_then(Option::as_mut) else {
            return 0;
        };
        if !effect.is_periodic() {
            return 0;
        }
        effect.periodic_timer_ms -= diff_ms as i64;
        let mut ticks = 0;
        while effect.periodic_timer_ms <= 0 {
            effect.periodic_timer_ms += effect.amplitude_ms as i64;
            effect.tick_number += 1;
            ticks += 1;
        }
        ticks
    }
}

/// Binding of an aura to one target.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AuraApplication {
    aura: AuraId,
    target: UnitId,
    positive: bool,
    effects_applied: EffectMask,
    remove_mode: AuraRemoveMode,
}

impl AuraApplication {
    pub(crate) fn new(aura: AuraId, target: UnitId, positive: bool) -> Self {
        Self {
            aura,
            target,
            positive,
            effects_applied: EffectMask::NONE,
            remove_mode: AuraRemoveMode::None,
        }
    }

    pub fn aura(&self) -> AuraId {
        self.aura
    }

    pub fn target(&self) -> UnitId {
        self.target
    }

    pub fn is_positive(&self) -> bool {
        self.positive
    }

    pub fn effect_mask(&self) -> EffectMask {
        self.effects_applied
    }

    pub fn has_effect(&self, slot: usize) -> bool {
        self.effects_applied.has(slot)
    }

    pub fn remove_mode(&self) -> AuraRemoveMode {
        self.remove_mode
    }

    /// Marks a slot applied.
    ///
    /// # Panics
    ///
    /// Panics once a remove mode has been set.
    pub(crate) fn set_effect_applied(&mut self, slot: usize) {
        assert_eq!(
            self.remove_mode,
            AuraRemoveMode::None,
            "{} on {} gained an effect after removal started",
            self.aura,
            self.target
        );
        self.effects_applied = self.effects_applied.union(EffectMask::slot(slot));
    }

    pub(crate) fn clear_effect(&mut self, slot: usize) {
        self.effects_applied = self.effects_applied.without(EffectMask::slot(slot));
    }

    /// Sets the remove mode exactly once.
    ///
    /// # Panics
    ///
    /// Panics if a mode was already set or `mode` is `None`.
    pub(crate) fn set_remove_mode(&mut self, mode: AuraRemoveMode) {
        assert_ne!(mode, AuraRemoveMode::None, "remove mode must be a real reason");
        assert_eq!(
            self.remove_mode,
            AuraRemoveMode::None,
            "{} on {} removed twice",
            self.aura,
            self.target
        );
        self.remove_mode = mode;
    }
}
