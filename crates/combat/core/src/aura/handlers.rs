//! Apply/remove and periodic handlers, one match arm per aura type.
//!
//! Modifier auras have no arm here; the damage pipeline reads them on demand.

use tracing::trace;

use super::manager::{remove_auras_with_interrupt_flags, remove_auras_with_mechanic, remove_harmful_auras_by_school};
use super::{AuraEffect, AuraType};
use crate::combat::{self, HitSource};
use crate::immunity::ImmunityKind;
use crate::proc::{self, ProcFlags, ProcRequest, ProcSpellContext, ProcSpellPhase, ProcSpellType};
use crate::spell::{self, AuraInterruptFlags, CastSlot, SpellAttributes, SpellInfo};
use crate::types::{AuraId, MechanicMask, SchoolMask, SpellId, Stat, UnitId};
use crate::unit::{Unit, UnitStateFlags};
use crate::world::CombatContext;

/// Why a handler runs.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum HandleMode {
    /// The slot is being applied or removed for real.
    Real,
    /// Only the amount changes (stack or refresh); side effects such as
    /// interrupts and immunity sweeps are skipped.
    ChangeAmount,
}

/// Copy of one slot together with its aura's spell, caster and stack.
fn snapshot(
    ctx: &CombatContext<'_>,
    owner: UnitId,
    id: AuraId,
    slot: usize,
) -> Option<(AuraEffect, SpellId, Option<UnitId>, u32)> {
    let aura = ctx.world.unit(owner)?.aura(id)?;
    let effect = aura.effect(slot)?.clone();
    Some((effect, aura.spell, aura.caster, aura.stack()))
}

pub(crate) fn handle_effect(
    ctx: &mut CombatContext<'_>,
    owner: UnitId,
    id: AuraId,
    slot: usize,
    mode: HandleMode,
    apply: bool,
) {
    let Some((effect, spell, _, _)) = snapshot(ctx, owner, id, slot) else {
        return;
    };
    trace!(target: "combat::aura", aura = %id, slot, aura_type = ?effect.aura_type, apply, ?mode, "effect handler");

    match effect.aura_type {
        t if t.unit_state().is_some() => {
            if mode == HandleMode::Real {
                crowd_control(ctx, owner, spell, t, apply);
            }
        }
        AuraType::ModIncreaseHealth => {
            if let Some(unit) = ctx.world.unit_mut(owner) {
                change_max_health(unit, effect.amount(), apply);
            }
        }
        AuraType::ModStat => {
            if let Some(unit) = ctx.world.unit_mut(owner) {
                change_stat(unit, effect.misc_value, effect.amount(), apply);
            }
        }
        AuraType::SchoolImmunity
        | AuraType::DamageImmunity
        | AuraType::MechanicImmunity
        | AuraType::DispelImmunity
        | AuraType::EffectImmunity
        | AuraType::StateImmunity => {
            if mode == HandleMode::Real {
                immunity(ctx, owner, spell, &effect, apply);
            }
        }
        _ => {}
    }
}

/// Rebuilds the aura-driven unit state bits from the applied slots.
pub(crate) fn recompute_unit_state(unit: &mut Unit) {
    let mut state = UnitStateFlags::empty();
    for (id, app) in &unit.applied_auras {
        let Some(aura) = unit.owned_auras.get(id) else {
            continue;
        };
        for effect in aura.effects().filter(|e| app.has_effect(e.slot)) {
            if let Some(flag) = effect.aura_type.unit_state() {
                state |= flag;
            }
        }
    }
    unit.state = (unit.state - UnitStateFlags::AURA_DRIVEN) | state;
}

fn crowd_control(ctx: &mut CombatContext<'_>, owner: UnitId, spell: SpellId, aura_type: AuraType, apply: bool) {
    if let Some(unit) = ctx.world.unit_mut(owner) {
        recompute_unit_state(unit);
    }
    if !apply {
        return;
    }

    match aura_type {
        AuraType::ModStun | AuraType::ModFear | AuraType::ModConfuse => {
            for slot in [CastSlot::Generic, CastSlot::Channeled] {
                let _ = spell::interrupt_spell(ctx, owner, slot);
            }
            if aura_type == AuraType::ModStun {
                remove_auras_with_interrupt_flags(ctx, owner, AuraInterruptFlags::STUN, Some(spell));
            }
        }
        AuraType::ModSilence => {
            for slot in [CastSlot::Generic, CastSlot::Channeled] {
                let casting = ctx
                    .world
                    .unit(owner)
                    .and_then(|u| u.current_cast(slot))
                    .map(|cast| cast.request.spell);
                let magical = casting
                    .and_then(|id| ctx.spell(id))
                    .is_some_and(|s| !s.school_mask.is_physical_only());
                if magical {
                    let _ = spell::interrupt_spell(ctx, owner, slot);
                }
            }
        }
        _ => {}
    }
}

fn change_max_health(unit: &mut Unit, amount: i32, apply: bool) {
    let alive = unit.is_alive();
    let amount = amount as i64;
    let current = unit.health.current as i64;
    let maximum = unit.health.maximum as i64;

    let (current, maximum) = if apply {
        let maximum = (maximum + amount).max(1);
        let current = if alive { (current + amount).clamp(1, maximum) } else { current };
        (current, maximum)
    } else {
        let current = match (alive, current > amount) {
            (false, _) => current,
            (true, true) => current - amount,
            (true, false) => 1,
        };
        let maximum = (maximum - amount).max(1);
        (current.min(maximum), maximum)
    };
    unit.health.current = current.clamp(0, u32::MAX as i64) as u32;
    unit.health.maximum = maximum.clamp(1, u32::MAX as i64) as u32;
}

fn change_stat(unit: &mut Unit, misc_value: i32, amount: i32, apply: bool) {
    let delta = if apply { amount } else { -amount };
    match misc_value {
        -1 => {
            for value in &mut unit.stats.primary {
                *value = value.saturating_add(delta);
            }
        }
        index => {
            if let Some(stat) = Stat::from_index(index) {
                let value = &mut unit.stats.primary[stat.index()];
                *value = value.saturating_add(delta);
            }
        }
    }
}

fn immunity(ctx: &mut CombatContext<'_>, owner: UnitId, spell: SpellId, effect: &AuraEffect, apply: bool) {
    let kind = match effect.aura_type {
        AuraType::SchoolImmunity => ImmunityKind::School,
        AuraType::DamageImmunity => ImmunityKind::Damage,
        AuraType::MechanicImmunity => ImmunityKind::Mechanic,
        AuraType::DispelImmunity => ImmunityKind::Dispel,
        AuraType::EffectImmunity => ImmunityKind::Effect,
        AuraType::StateImmunity => ImmunityKind::State,
        _ => return,
    };
    let value = effect.misc_value.max(0) as u32;
    if let Some(unit) = ctx.world.unit_mut(owner) {
        if apply {
            unit.immunities.add(kind, value, spell);
        } else {
            unit.immunities.remove(kind, value, spell);
        }
    }
    if !apply {
        return;
    }

    match kind {
        ImmunityKind::Mechanic if value < 64 => {
            remove_auras_with_mechanic(
                ctx,
                owner,
                MechanicMask(1 << value),
                Some(spell),
                super::AuraRemoveMode::Default,
            );
        }
        ImmunityKind::School => {
            remove_harmful_auras_by_school(ctx, owner, SchoolMask::from_bits_truncate(value as u8), spell);
        }
        _ => {}
    }
}

// ============================================================================
// Periodic ticks
// ============================================================================

/// Fires one tick of a periodic slot.
pub(crate) fn periodic_tick(ctx: &mut CombatContext<'_>, owner: UnitId, id: AuraId, slot: usize) {
    let Some((effect, spell_id, caster, stack)) = snapshot(ctx, owner, id, slot) else {
        return;
    };
    if !ctx.world.unit(owner).is_some_and(Unit::is_alive) {
        return;
    }
    let Some(spell) = ctx.spell(spell_id) else {
        return;
    };
    // a caster that left the world no longer contributes bonuses
    let caster = caster.filter(|c| ctx.world.contains(*c));
    let amount = effect.amount().max(0) as u32;
    trace!(target: "combat::aura", aura = %id, slot, tick = effect.tick_number(), amount, "periodic tick");

    match effect.aura_type {
        AuraType::PeriodicDamage => {
            let source = periodic_source(caster, owner, spell, &effect, stack)
                .with_crit(spell.has_attribute(SpellAttributes::PERIODIC_CAN_CRIT));
            let Some(info) = combat::damage_unit(ctx, &source, amount) else {
                return;
            };
            let request = periodic_procs(caster, owner, spell, ProcFlags::DEAL_HARMFUL_PERIODIC, ProcFlags::TAKE_HARMFUL_PERIODIC)
                .with_spell_type(ProcSpellType::DAMAGE)
                .with_hit_mask(info.hit_mask)
                .with_damage(info);
            proc::dispatch(ctx, request);
        }
        AuraType::PeriodicHeal => {
            let source = periodic_source(caster, owner, spell, &effect, stack)
                .with_crit(spell.has_attribute(SpellAttributes::PERIODIC_CAN_CRIT));
            let Some(heal) = combat::heal_unit(ctx, &source, amount) else {
                return;
            };
            let hit = if heal.critical {
                proc::ProcHit::CRITICAL
            } else {
                proc::ProcHit::NORMAL
            };
            let request = periodic_procs(caster, owner, spell, ProcFlags::DEAL_HELPFUL_PERIODIC, ProcFlags::TAKE_HELPFUL_PERIODIC)
                .with_spell_type(ProcSpellType::HEAL)
                .with_hit_mask(hit)
                .with_heal(heal);
            proc::dispatch(ctx, request);
        }
        AuraType::PeriodicEnergize => {
            combat::energize(ctx, caster, owner, Some(spell.id), amount);
        }
        _ => {}
    }
}

fn periodic_source<'s>(
    caster: Option<UnitId>,
    owner: UnitId,
    spell: &'s SpellInfo,
    effect: &AuraEffect,
    stack: u32,
) -> HitSource<'s> {
    HitSource::spell(caster, owner, spell, crate::types::DamageEffectType::Periodic)
        .with_coefficient(effect.bonus_coefficient)
        .with_stacks(stack)
        .with_mechanic(effect.mechanic)
}

/// Proc request for a tick; without a caster only the owner's side reacts.
fn periodic_procs(
    caster: Option<UnitId>,
    owner: UnitId,
    spell: &SpellInfo,
    deal: ProcFlags,
    take: ProcFlags,
) -> ProcRequest {
    let (actor, actor_mask) = match caster {
        Some(caster) => (caster, deal),
        None => (owner, ProcFlags::empty()),
    };
    ProcRequest::new(actor, Some(owner), actor_mask, take)
        .with_phase(ProcSpellPhase::HIT)
        .with_spell(ProcSpellContext::new(spell))
}
