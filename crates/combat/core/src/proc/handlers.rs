//! Per-aura-type proc predicates and proc effects.

use tracing::{debug, trace};

use super::types::ProcEventInfo;
use crate::aura::{self, Aura, AuraEffect, AuraRemoveMode, AuraType};
use crate::combat::{self, HitSource};
use crate::spell::{self, CastRequest};
use crate::types::{AuraId, DamageEffectType, SpellId, UnitId};
use crate::world::CombatContext;

/// Whether one applied slot reacts to the event.
pub(super) fn check_effect_proc(aura: &Aura, effect: &AuraEffect, event: &ProcEventInfo) -> bool {
    match effect.aura_type {
        t if t.is_breakable_crowd_control() => event
            .damage
            .as_ref()
            .is_some_and(|d| d.amount > 0 && d.spell != Some(aura.spell)),
        AuraType::ProcTriggerSpell | AuraType::ProcTriggerSpellWithValue => effect.trigger_spell.is_some(),
        AuraType::ProcTriggerDamage => event.proc_target.is_some(),
        _ => true,
    }
}

/// Fires one slot of a proccing aura.
pub(super) fn fire_effect(ctx: &mut CombatContext<'_>, owner: UnitId, id: AuraId, slot: usize, event: &ProcEventInfo) {
    let Some((effect, aura_spell)) = ctx
        .world
        .unit(owner)
        .and_then(|u| u.aura(id))
        .and_then(|a| a.effect(slot).map(|e| (e.clone(), a.spell)))
    else {
        return;
    };

    match effect.aura_type {
        t if t.is_breakable_crowd_control() => {
            break_crowd_control(ctx, owner, id, slot, effect.amount(), event.damage_amount());
        }
        AuraType::ProcTriggerSpell => {
            if let Some(trigger) = effect.trigger_spell {
                trigger_spell(ctx, owner, aura_spell, trigger, event.proc_target, None);
            }
        }
        AuraType::ProcTriggerSpellWithValue => {
            if let Some(trigger) = effect.trigger_spell {
                trigger_spell(ctx, owner, aura_spell, trigger, event.proc_target, Some(effect.amount()));
            }
        }
        AuraType::ProcTriggerDamage => {
            let (Some(target), Some(spell)) = (event.proc_target, ctx.spell(aura_spell)) else {
                return;
            };
            let source = HitSource::spell(Some(owner), target, spell, DamageEffectType::Proc).with_crit(false);
            combat::damage_unit(ctx, &source, effect.amount().max(0) as u32);
        }
        other => {
            trace!(target: "combat::proc", aura = %id, slot, aura_type = ?other, "proc without effect handler");
        }
    }
}

/// Damage eats into the crowd-control threshold; a zero threshold breaks on
/// any damage.
fn break_crowd_control(ctx: &mut CombatContext<'_>, owner: UnitId, id: AuraId, slot: usize, threshold: i32, damage: u32) {
    let remaining = threshold as i64 - damage as i64;
    if threshold <= 0 || remaining <= 0 {
        debug!(target: "combat::proc", aura = %id, %owner, damage, "crowd control broken by damage");
        aura::remove_aura(ctx, owner, id, AuraRemoveMode::EnemySpell);
        return;
    }
    if let Some(aura) = ctx.world.unit_mut(owner).and_then(|u| u.aura_mut(id)) {
        aura.set_effect_amount(slot, remaining as i32);
    }
}

fn trigger_spell(
    ctx: &mut CombatContext<'_>,
    owner: UnitId,
    aura_spell: SpellId,
    trigger: SpellId,
    proc_target: Option<UnitId>,
    value: Option<i32>,
) {
    let Some(info) = ctx.spell(trigger) else {
        return;
    };
    let target = if info.is_positive() {
        owner
    } else if let Some(target) = proc_target {
        target
    } else {
        debug!(target: "combat::proc", spell = %trigger, %owner, "harmful trigger without a target");
        return;
    };
    let mut request = CastRequest::new(owner, trigger, target).triggered_by(Some(aura_spell));
    if let Some(value) = value {
        request = request.with_base_points(0, value);
    }
    if let Err(error) = spell::cast_spell(ctx, request) {
        debug!(target: "combat::proc", spell = %trigger, %error, "triggered spell failed");
    }
}
