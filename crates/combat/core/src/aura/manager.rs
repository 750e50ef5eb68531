//! Aura application, refresh, stacking and removal.
//!
//! Every entry point here takes the whole [`CombatContext`]: effect handlers
//! may remove other auras, interrupt casts or deal damage, so nothing holds a
//! borrow of a unit across a handler call. Bulk removals work on a snapshot of
//! aura ids and re-check each one before removing it.

use tracing::{debug, trace};

use super::{Aura, AuraApplication, AuraEffect, AuraRemoveMode, AuraType, handlers};
use crate::config::CombatConfig;
use crate::env::{OracleError, roll_context};
use crate::error::AuraError;
use crate::immunity::{is_immune_to_effect, is_immune_to_spell};
use crate::log::CombatLogEntry;
use crate::spell::{
    AuraInterruptFlags, EffectMask, SpellAttributes, SpellGroupStackRule, SpellInfo,
};
use crate::types::{AuraId, DispelType, ItemId, MechanicMask, SpellId, UnitId};
use crate::unit::SingleTargetRef;
use crate::world::CombatContext;

/// Everything needed to put one spell's auras on one target.
#[derive(Clone, Debug, PartialEq)]
pub struct AuraApplyRequest {
    pub spell: SpellId,
    pub target: UnitId,
    pub caster: Option<UnitId>,
    /// Slots to apply; intersected with the spell's aura slots.
    pub effect_mask: EffectMask,
    /// Overrides the catalog duration (already diminished, for example).
    pub duration_ms: Option<i32>,
    pub cast_item: Option<ItemId>,
    pub base_points: [Option<i32>; CombatConfig::MAX_SPELL_EFFECTS],
}

impl AuraApplyRequest {
    pub fn new(spell: SpellId, target: UnitId, caster: Option<UnitId>) -> Self {
        Self {
            spell,
            target,
            caster,
            effect_mask: EffectMask::ALL,
            duration_ms: None,
            cast_item: None,
            base_points: [None; CombatConfig::MAX_SPELL_EFFECTS],
        }
    }

    #[must_use]
    pub fn with_effect_mask(mut self, mask: EffectMask) -> Self {
        self.effect_mask = mask;
        self
    }

    #[must_use]
    pub fn with_duration(mut self, duration_ms: i32) -> Self {
        self.duration_ms = Some(duration_ms);
        self
    }

    #[must_use]
    pub fn with_cast_item(mut self, item: Option<ItemId>) -> Self {
        self.cast_item = item;
        self
    }

    #[must_use]
    pub fn with_base_points(mut self, slot: usize, value: i32) -> Self {
        if let Some(points) = self.base_points.get_mut(slot) {
            *points = Some(value);
        }
        self
    }
}

/// Result of comparing a new aura against one already on the target.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum StackVerdict {
    Coexist,
    RemoveOld,
    RemoveNew,
}

// ============================================================================
// Application
// ============================================================================

/// Applies, refreshes or stacks the auras of `req.spell` on `req.target`.
///
/// # Errors
///
/// Returns the refusal reason when nothing was applied. A refresh of an
/// existing aura is a success and returns that aura's id.
pub fn apply_aura(ctx: &mut CombatContext<'_>, req: &AuraApplyRequest) -> Result<AuraId, AuraError> {
    let spell = match ctx.env.spell(req.spell) {
        Ok(spell) => spell,
        Err(OracleError::SpellNotFound(id)) => return Err(AuraError::UnknownSpell(id)),
        Err(error) => return Err(error.into()),
    };
    let target = ctx
        .world
        .unit(req.target)
        .ok_or(AuraError::UnitNotFound(req.target))?;

    if !target.is_alive() && !spell.is_death_persistent() {
        return Err(AuraError::TargetDead {
            target: req.target,
            spell: spell.id,
        });
    }

    let requested = req.effect_mask.intersect(spell.aura_effect_mask());
    if requested.is_empty() {
        return Err(AuraError::NoAuraEffects(spell.id));
    }

    let immune = AuraError::Immune {
        target: req.target,
        spell: spell.id,
    };
    if is_immune_to_spell(target, spell) {
        return Err(immune);
    }
    let mask = (0..spell.effects.len())
        .filter(|&slot| requested.has(slot) && !is_immune_to_effect(target, spell, slot))
        .fold(EffectMask::NONE, |mask, slot| mask.union(EffectMask::slot(slot)));
    if mask.is_empty() {
        return Err(immune);
    }

    if !spell.is_multi_instance() {
        let caster_filter = if spell.is_caster_agnostic() { None } else { req.caster };
        let existing = target
            .find_aura(spell.id, caster_filter)
            .filter(|aura| !aura.is_removing())
            .map(|aura| aura.id);
        if let Some(existing) = existing {
            refresh_aura(ctx, req, spell, existing);
            return Ok(existing);
        }
    }

    if target.owned_auras.len() >= CombatConfig::MAX_AURAS_PER_UNIT {
        return Err(AuraError::TooManyAuras(req.target));
    }

    let id = ctx.world.next_aura_id();
    let aura = build_aura(ctx, req, spell, id, mask);

    let losers = match stacking_losers(ctx, &aura, spell) {
        Ok(losers) => losers,
        Err(winner) => {
            debug!(
                target: "combat::aura",
                spell = %spell.id,
                %winner,
                target_unit = %req.target,
                "new aura lost its stacking comparison"
            );
            return Err(AuraError::Superseded {
                spell: spell.id,
                winner,
            });
        }
    };
    for loser in losers {
        remove_aura(ctx, req.target, loser, AuraRemoveMode::Default);
    }

    if spell.is_single_target() {
        if let Some(caster) = req.caster {
            remove_previous_single_target(ctx, caster, spell);
        }
    }

    // removals above may have cascaded into the target
    let Some(unit) = ctx.world.unit_mut(req.target) else {
        return Err(AuraError::UnitNotFound(req.target));
    };
    unit.owned_auras.insert(id, aura);
    if spell.is_single_target() {
        if let Some(caster) = req.caster.and_then(|c| ctx.world.unit_mut(c)) {
            caster.single_target_auras.push(SingleTargetRef {
                target: req.target,
                aura: id,
            });
        }
    }

    apply_application(ctx, req.target, id, spell);
    Ok(id)
}

fn build_aura(
    ctx: &mut CombatContext<'_>,
    req: &AuraApplyRequest,
    spell: &SpellInfo,
    id: AuraId,
    mask: EffectMask,
) -> Aura {
    let mut aura = Aura::new(id, spell.id, req.target, req.caster);
    aura.cast_item = req.cast_item;
    aura.single_target = spell.is_single_target();
    aura.positive = spell.is_positive();
    aura.dr_group = spell.diminishing_group();
    aura.stack_group = spell
        .stack_group
        .map(|group| (group, ctx.env.spells().map_or(SpellGroupStackRule::Default, |s| s.group_rule(group))));
    aura.applied_at = ctx.now();

    for (slot, info) in spell.effects.iter().enumerate() {
        let Some(aura_type) = info.aura_type().filter(|_| mask.has(slot)) else {
            continue;
        };
        let base = effect_amount(ctx, spell, slot, req.base_points[slot], req.caster, req.target);
        let mut effect = AuraEffect::new(slot, aura_type, base);
        effect.misc_value = info.misc_value;
        effect.misc_value_b = info.misc_value_b;
        effect.mechanic = spell.effect_mechanic(slot);
        effect.amplitude_ms = info.amplitude_ms;
        effect.bonus_coefficient = info.bonus_coefficient;
        effect.trigger_spell = info.trigger_spell;
        effect.reset_periodic();
        aura.set_effect(effect);
    }

    aura.set_max_duration(req.duration_ms.unwrap_or(spell.duration_ms));
    aura.set_charges(spell.proc_charges);
    aura
}

/// Per-stack amount of one slot: base points (or the override) plus the die
/// roll, plus caster spell power for absorb shields.
fn effect_amount(
    ctx: &mut CombatContext<'_>,
    spell: &SpellInfo,
    slot: usize,
    base_override: Option<i32>,
    caster: Option<UnitId>,
    target: UnitId,
) -> i32 {
    let Some(info) = spell.effect(slot) else {
        return 0;
    };
    let mut amount = base_override.unwrap_or(info.base_points);
    if base_override.is_none() && info.die_sides > 0 {
        let roller = caster.unwrap_or(target);
        amount += ctx.roll_range(roller, roll_context::DAMAGE_VARIANCE, 1, info.die_sides) as i32;
    }
    if matches!(
        info.aura_type(),
        Some(AuraType::SchoolAbsorb | AuraType::SchoolHealAbsorb)
    ) && info.bonus_coefficient > 0.0
    {
        let power = caster
            .and_then(|c| ctx.world.unit(c))
            .map_or(0, |c| c.stats.spell_power);
        amount += (power as f32 * info.bonus_coefficient) as i32;
    }
    amount
}

/// Same spell reapplied: new amounts, full duration, one more stack, fresh charges.
fn refresh_aura(ctx: &mut CombatContext<'_>, req: &AuraApplyRequest, spell: &SpellInfo, id: AuraId) {
    let Some(aura) = ctx.world.unit(req.target).and_then(|u| u.aura(id)) else {
        return;
    };
    let slots: Vec<usize> = aura.effects().map(|e| e.slot).collect();
    let bases: Vec<(usize, i32)> = slots
        .into_iter()
        .map(|slot| {
            let base = effect_amount(ctx, spell, slot, req.base_points[slot], req.caster, req.target);
            (slot, base)
        })
        .collect();
    let duration = req.duration_ms.unwrap_or(spell.duration_ms);
    let cap = spell.stack_cap();

    change_amounts(ctx, req.target, id, |aura| {
        for &(slot, base) in &bases {
            aura.set_base_amount(slot, base);
        }
        aura.set_max_duration(duration);
        aura.refresh_duration();
        aura.set_stack((aura.stack() + 1).min(cap));
        aura.set_charges(spell.proc_charges);
    });

    let stack = ctx
        .world
        .unit(req.target)
        .and_then(|u| u.aura(id))
        .map_or(1, Aura::stack);
    ctx.collab.log.record(CombatLogEntry::AuraApplied {
        target: req.target,
        caster: req.caster,
        spell: spell.id,
        aura: id,
        stack,
    });
    trace!(target: "combat::aura", aura = %id, stack, "aura refreshed");
}

/// Runs `change` on an aura with its amount-dependent effects unapplied
/// around the change, so handlers see the old amount go and the new arrive.
pub(crate) fn change_amounts<F>(ctx: &mut CombatContext<'_>, owner: UnitId, id: AuraId, change: F)
where
    F: FnOnce(&mut Aura),
{
    let applied = ctx
        .world
        .unit(owner)
        .and_then(|u| u.application(id))
        .map_or(EffectMask::NONE, AuraApplication::effect_mask);

    for slot in 0..CombatConfig::MAX_SPELL_EFFECTS {
        if applied.has(slot) {
            handlers::handle_effect(ctx, owner, id, slot, handlers::HandleMode::ChangeAmount, false);
        }
    }
    match ctx.world.unit_mut(owner).and_then(|u| u.aura_mut(id)) {
        Some(aura) if !aura.is_removing() => change(aura),
        _ => return,
    }
    for slot in 0..CombatConfig::MAX_SPELL_EFFECTS {
        if applied.has(slot) {
            handlers::handle_effect(ctx, owner, id, slot, handlers::HandleMode::ChangeAmount, true);
        }
    }
}

/// Moves an aura's stack by `delta`; a stack reaching zero removes the aura.
/// Returns true if the aura is still there afterwards.
pub(crate) fn modify_stack_amount(
    ctx: &mut CombatContext<'_>,
    owner: UnitId,
    id: AuraId,
    delta: i32,
    mode: AuraRemoveMode,
) -> bool {
    let Some(stack) = ctx
        .world
        .unit(owner)
        .and_then(|u| u.aura(id))
        .filter(|a| !a.is_removing())
        .map(Aura::stack)
    else {
        return false;
    };
    let next = stack as i64 + delta as i64;
    if next <= 0 {
        remove_aura(ctx, owner, id, mode);
        return false;
    }
    change_amounts(ctx, owner, id, |aura| aura.set_stack(next as u32));
    true
}

fn stacking_losers(
    ctx: &CombatContext<'_>,
    new: &Aura,
    new_spell: &SpellInfo,
) -> Result<Vec<AuraId>, SpellId> {
    let Some(unit) = ctx.world.unit(new.owner) else {
        return Ok(Vec::new());
    };
    let mut losers = Vec::new();
    for id in unit.applied_auras.keys() {
        let Some(old) = unit.aura(*id).filter(|a| !a.is_removing()) else {
            continue;
        };
        match stack_verdict(new, new_spell, old) {
            StackVerdict::Coexist => {}
            StackVerdict::RemoveOld => losers.push(old.id),
            StackVerdict::RemoveNew => return Err(old.spell),
        }
    }
    Ok(losers)
}

fn stack_verdict(new: &Aura, new_spell: &SpellInfo, old: &Aura) -> StackVerdict {
    if old.spell == new.spell {
        return if old.caster != new.caster && new_spell.is_caster_agnostic() {
            StackVerdict::RemoveOld
        } else {
            StackVerdict::Coexist
        };
    }

    let (Some((new_group, rule)), Some((old_group, _))) = (new.stack_group, old.stack_group) else {
        return StackVerdict::Coexist;
    };
    if new_group != old_group {
        return StackVerdict::Coexist;
    }
    match rule {
        SpellGroupStackRule::Default => StackVerdict::Coexist,
        SpellGroupStackRule::Exclusive => StackVerdict::RemoveOld,
        SpellGroupStackRule::ExclusiveFromSameCaster => {
            if old.caster == new.caster {
                StackVerdict::RemoveOld
            } else {
                StackVerdict::Coexist
            }
        }
        SpellGroupStackRule::ExclusiveSameEffect | SpellGroupStackRule::ExclusiveHighest => {
            let new_key = (new.max_abs_amount(), new.effect_mask().count());
            let old_key = (old.max_abs_amount(), old.effect_mask().count());
            // full tie: the newer one wins
            if new_key >= old_key {
                StackVerdict::RemoveOld
            } else {
                StackVerdict::RemoveNew
            }
        }
    }
}

fn remove_previous_single_target(ctx: &mut CombatContext<'_>, caster: UnitId, spell: &SpellInfo) {
    let Some(tracked) = ctx.world.unit(caster).map(|u| u.single_target_auras.clone()) else {
        return;
    };
    for entry in tracked {
        let previous_spell = ctx
            .world
            .unit(entry.target)
            .and_then(|u| u.aura(entry.aura))
            .map(|a| a.spell);
        let Some(previous_spell) = previous_spell else {
            continue;
        };
        let same_group = spell.single_target_group.is_some()
            && ctx
                .env
                .spell(previous_spell)
                .is_ok_and(|s| s.single_target_group == spell.single_target_group);
        if previous_spell == spell.id || same_group {
            remove_aura(ctx, entry.target, entry.aura, AuraRemoveMode::Default);
        }
    }
}

fn apply_application(ctx: &mut CombatContext<'_>, target: UnitId, id: AuraId, spell: &SpellInfo) {
    let now = ctx.now();
    let Some(unit) = ctx.world.unit_mut(target) else {
        return;
    };
    let Some(aura) = unit.owned_auras.get_mut(&id) else {
        return;
    };
    aura.add_application(target);
    let (mask, positive, caster, dr_group, cast_item, stack) = (
        aura.effect_mask(),
        aura.positive,
        aura.caster,
        aura.dr_group,
        aura.cast_item,
        aura.stack(),
    );
    unit.applied_auras
        .insert(id, AuraApplication::new(id, target, positive));

    for slot in 0..CombatConfig::MAX_SPELL_EFFECTS {
        if !mask.has(slot) {
            continue;
        }
        // a handler of an earlier slot may already have removed the aura
        let Some(app) = ctx
            .world
            .unit_mut(target)
            .and_then(|u| u.applied_auras.get_mut(&id))
        else {
            return;
        };
        app.set_effect_applied(slot);
        handlers::handle_effect(ctx, target, id, slot, handlers::HandleMode::Real, true);
    }

    let Some(unit) = ctx.world.unit_mut(target) else {
        return;
    };
    if !unit.applied_auras.contains_key(&id) {
        return;
    }
    if let Some(state) = spell.aura_state {
        unit.aura_state.set(state, true);
    }
    unit.diminishing.apply_diminishing(dr_group, true, now);

    if spell.has_attribute(SpellAttributes::COOLDOWN_ON_AURA_REMOVE) {
        if let Some(caster) = caster {
            ctx.collab
                .history
                .start_cooldown(spell.id, cast_item, caster, true);
        }
    }

    ctx.collab.log.record(CombatLogEntry::AuraApplied {
        target,
        caster,
        spell: spell.id,
        aura: id,
        stack,
    });
    debug!(
        target: "combat::aura",
        aura = %id,
        spell = %spell.id,
        target_unit = %target,
        effects = mask.0,
        "aura applied"
    );
}

// ============================================================================
// Removal
// ============================================================================

/// Removes one aura from its owner. Returns false if it was already gone or
/// already being removed.
///
/// # Panics
///
/// Panics if a slot is still applied after unapplying, or if the caster's
/// single-target record points at a different owner.
pub fn remove_aura(ctx: &mut CombatContext<'_>, owner: UnitId, id: AuraId, mode: AuraRemoveMode) -> bool {
    let now = ctx.now();
    let Some(unit) = ctx.world.unit_mut(owner) else {
        return false;
    };
    let Some(aura) = unit.owned_auras.get_mut(&id) else {
        return false;
    };
    if aura.is_removing() {
        return false;
    }
    aura.mark_removing();
    aura.remove_application(owner);
    let (spell_id, caster, dr_group, single_target) =
        (aura.spell, aura.caster, aura.dr_group, aura.single_target);
    let application = unit.applied_auras.remove(&id);

    if let Some(mut app) = application {
        app.set_remove_mode(mode);
        for slot in 0..CombatConfig::MAX_SPELL_EFFECTS {
            if app.has_effect(slot) {
                app.clear_effect(slot);
                handlers::handle_effect(ctx, owner, id, slot, handlers::HandleMode::Real, false);
            }
        }
        assert!(
            app.effect_mask().is_empty(),
            "{id} on {owner} still has applied effects after removal"
        );

        let spell = ctx.env.spell(spell_id).ok();
        if let Some(unit) = ctx.world.unit_mut(owner) {
            handlers::recompute_unit_state(unit);
            if let Some(state) = spell.and_then(|s| s.aura_state) {
                let env = ctx.env;
                let still_held = unit.applied_auras.keys().any(|other| {
                    unit.aura(*other)
                        .and_then(|a| env.spell(a.spell).ok())
                        .is_some_and(|s| s.aura_state == Some(state))
                });
                unit.aura_state.set(state, still_held);
            }
            unit.diminishing.apply_diminishing(dr_group, false, now);
        }

        if spell.is_some_and(|s| s.has_attribute(SpellAttributes::COOLDOWN_ON_AURA_REMOVE)) {
            if let Some(caster) = caster {
                ctx.collab.history.send_cooldown_event(spell_id, caster);
            }
        }

        ctx.collab.log.record(CombatLogEntry::AuraRemoved {
            target: owner,
            spell: spell_id,
            aura: id,
            mode,
        });
    }

    if single_target {
        if let Some(caster_unit) = caster.and_then(|c| ctx.world.unit_mut(c)) {
            if let Some(pos) = caster_unit
                .single_target_auras
                .iter()
                .position(|r| r.aura == id)
            {
                let tracked = caster_unit.single_target_auras.remove(pos);
                assert_eq!(
                    tracked.target, owner,
                    "single-target record of {id} points at the wrong owner"
                );
            }
        }
    }

    if let Some(unit) = ctx.world.unit_mut(owner) {
        unit.owned_auras.remove(&id);
    }
    debug!(target: "combat::aura", aura = %id, spell = %spell_id, owner = %owner, ?mode, "aura removed");
    true
}

/// Removes every live aura on `owner` accepted by `filter`. Returns how many went.
fn remove_matching<F>(ctx: &mut CombatContext<'_>, owner: UnitId, mode: AuraRemoveMode, mut filter: F) -> usize
where
    F: FnMut(&Aura, &SpellInfo) -> bool,
{
    let env = ctx.env;
    let Some(unit) = ctx.world.unit(owner) else {
        return 0;
    };
    let snapshot: Vec<AuraId> = unit
        .owned_auras
        .values()
        .filter(|aura| !aura.is_removing())
        .filter(|aura| env.spell(aura.spell).is_ok_and(|spell| filter(aura, spell)))
        .map(|aura| aura.id)
        .collect();

    snapshot
        .into_iter()
        .filter(|&id| remove_aura(ctx, owner, id, mode))
        .count()
}

/// Removes auras of `spell`, optionally only those cast by `caster`.
pub fn remove_auras_by_spell(
    ctx: &mut CombatContext<'_>,
    owner: UnitId,
    spell: SpellId,
    caster: Option<UnitId>,
    mode: AuraRemoveMode,
) -> usize {
    remove_matching(ctx, owner, mode, |aura, _| {
        aura.spell == spell && (caster.is_none() || aura.caster == caster)
    })
}

/// Removes auras that break on any of `flags`, sparing auras of `except`.
pub fn remove_auras_with_interrupt_flags(
    ctx: &mut CombatContext<'_>,
    owner: UnitId,
    flags: AuraInterruptFlags,
    except: Option<SpellId>,
) -> usize {
    remove_matching(ctx, owner, AuraRemoveMode::Interrupt, |aura, spell| {
        Some(aura.spell) != except && spell.aura_interrupt_flags.intersects(flags)
    })
}

/// Removes auras whose spell or applied slots carry a mechanic in `mechanics`.
pub fn remove_auras_with_mechanic(
    ctx: &mut CombatContext<'_>,
    owner: UnitId,
    mechanics: MechanicMask,
    except: Option<SpellId>,
    mode: AuraRemoveMode,
) -> usize {
    remove_matching(ctx, owner, mode, |aura, spell| {
        Some(aura.spell) != except && spell.mechanic_mask(aura.effect_mask()).intersects(mechanics)
    })
}

/// Removes auras with at least one slot of `aura_type`.
pub fn remove_auras_by_type(
    ctx: &mut CombatContext<'_>,
    owner: UnitId,
    aura_type: AuraType,
    except: Option<AuraId>,
    mode: AuraRemoveMode,
) -> usize {
    remove_matching(ctx, owner, mode, |aura, _| {
        Some(aura.id) != except && aura.effects().any(|e| e.aura_type == aura_type)
    })
}

/// Removes harmful auras of any school in `schools`; used by school immunity.
pub(crate) fn remove_harmful_auras_by_school(
    ctx: &mut CombatContext<'_>,
    owner: UnitId,
    schools: crate::types::SchoolMask,
    except: SpellId,
) -> usize {
    remove_matching(ctx, owner, AuraRemoveMode::EnemySpell, |aura, spell| {
        aura.spell != except
            && !aura.positive
            && spell.school_mask.intersects(schools)
            && !spell.has_attribute(SpellAttributes::UNAFFECTED_BY_SCHOOL_IMMUNE)
    })
}

/// Dispels up to `count` stacks of `dispel_type` auras from `target`.
///
/// A hostile dispeller strips beneficial auras, anyone else harmful ones.
/// Each unit of `count` takes one stack; the last stack removes the aura.
/// Returns the number of stacks dispelled.
pub fn dispel(
    ctx: &mut CombatContext<'_>,
    target: UnitId,
    dispel_type: DispelType,
    count: u32,
    dispeller: Option<UnitId>,
) -> u32 {
    if dispel_type == DispelType::None || count == 0 {
        return 0;
    }
    let env = ctx.env;
    let Some(unit) = ctx.world.unit(target) else {
        return 0;
    };
    let hostile = dispeller
        .and_then(|d| ctx.world.unit(d))
        .is_some_and(|d| env.is_hostile(d, unit));

    let candidates: Vec<AuraId> = unit
        .applied_auras
        .keys()
        .filter_map(|id| unit.aura(*id))
        .filter(|aura| !aura.is_removing() && aura.positive == hostile)
        .filter(|aura| env.spell(aura.spell).is_ok_and(|s| s.dispel == dispel_type))
        .map(|aura| aura.id)
        .collect();

    let mut dispelled = 0;
    'auras: for id in candidates {
        while dispelled < count {
            let alive = ctx
                .world
                .unit(target)
                .and_then(|u| u.aura(id))
                .is_some_and(|a| !a.is_removing());
            if !alive {
                continue 'auras;
            }
            dispelled += 1;
            if !modify_stack_amount(ctx, target, id, -1, AuraRemoveMode::EnemySpell) {
                continue 'auras;
            }
        }
        break;
    }
    debug!(target: "combat::aura", target_unit = %target, ?dispel_type, dispelled, "dispel resolved");
    dispelled
}

/// Strips everything that does not persist through death.
pub fn remove_auras_on_death(ctx: &mut CombatContext<'_>, owner: UnitId) -> usize {
    remove_matching(ctx, owner, AuraRemoveMode::Death, |_, spell| {
        !spell.is_death_persistent()
    })
}

/// Strips every aura, e.g. when the unit leaves the world.
pub fn remove_all_auras(ctx: &mut CombatContext<'_>, owner: UnitId, mode: AuraRemoveMode) -> usize {
    let snapshot: Vec<AuraId> = ctx
        .world
        .unit(owner)
        .map(|u| u.owned_auras.keys().copied().collect())
        .unwrap_or_default();
    snapshot
        .into_iter()
        .filter(|&id| remove_aura(ctx, owner, id, mode))
        .count()
}

// ============================================================================
// Update
// ============================================================================

/// Ticks periodic effects, then counts durations down and expires auras.
/// Ticks due within the remaining duration fire before the aura expires.
pub fn update_auras(ctx: &mut CombatContext<'_>, owner: UnitId, diff_ms: u64) {
    let snapshot: Vec<AuraId> = ctx
        .world
        .unit(owner)
        .map(|u| u.applied_auras.keys().copied().collect())
        .unwrap_or_default();

    for id in snapshot {
        let Some(aura) = ctx
            .world
            .unit_mut(owner)
            .and_then(|u| u.aura_mut(id))
            .filter(|a| !a.is_removing())
        else {
            continue;
        };
        let step = if aura.is_permanent() {
            diff_ms
        } else {
            diff_ms.min(aura.duration().max(0) as u64)
        };

        for slot in 0..CombatConfig::MAX_SPELL_EFFECTS {
            let ticks = ctx
                .world
                .unit_mut(owner)
                .and_then(|u| u.aura_mut(id))
                .filter(|a| !a.is_removing())
                .map_or(0, |a| a.advance_periodic(slot, step));
            for _ in 0..ticks {
                let applied = ctx
                    .world
                    .unit(owner)
                    .and_then(|u| u.application(id))
                    .is_some_and(|app| app.has_effect(slot));
                if !applied {
                    break;
                }
                handlers::periodic_tick(ctx, owner, id, slot);
            }
        }

        let expired = ctx
            .world
            .unit_mut(owner)
            .and_then(|u| u.aura_mut(id))
            .filter(|a| !a.is_removing())
            .is_some_and(|a| a.advance_duration(diff_ms));
        if expired {
            remove_aura(ctx, owner, id, AuraRemoveMode::Expire);
        }
    }
}
