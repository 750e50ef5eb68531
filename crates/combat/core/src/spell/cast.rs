//! Casting: timed casts, channels, instant resolution and interruption.
//!
//! A unit holds at most one cast per [`CastSlot`]. Timed casts count down in
//! [`update_casts`] and resolve through the same path as instant casts; a
//! spell with a launch delay is parked in the world's event queue and
//! resolved by [`execute_spell`] when it comes due.

use tracing::{debug, trace};

use super::{AuraInterruptFlags, CastInterruptFlags, CastSlot, EffectMask, EffectTarget, SpellAttributes, SpellEffectKind, SpellInfo};
use crate::aura::{self, AuraApplyRequest, AuraRemoveMode};
use crate::combat::{self, DamageInfo, HealInfo, HitSource, MeleeHitOutcome, SpellMissInfo};
use crate::config::CombatConfig;
use crate::diminishing::{self, DiminishingGroup};
use crate::env::{OracleError, roll_context};
use crate::error::{AuraError, CastError, CombatError};
use crate::immunity::is_immune_to_effect;
use crate::log::CombatLogEntry;
use crate::proc::{self, ProcHit, ProcRequest, ProcSpellContext, ProcSpellPhase, ProcSpellType};
use crate::schedule::DelayedEffect;
use crate::types::{AuraId, DamageEffectType, DispelType, ItemId, SpellId, Timestamp, UnitId, WeaponAttackType};
use crate::unit::{Unit, UnitStateFlags};
use crate::world::CombatContext;

/// One request to cast a spell.
#[derive(Clone, Debug, PartialEq)]
pub struct CastRequest {
    pub caster: UnitId,
    pub spell: SpellId,
    pub target: UnitId,
    /// Skips cast time, cooldown and cast-interrupt checks.
    pub triggered: bool,
    /// Aura whose proc produced this cast.
    pub triggered_by: Option<SpellId>,
    pub cast_item: Option<ItemId>,
    pub base_points: [Option<i32>; CombatConfig::MAX_SPELL_EFFECTS],
}

impl CastRequest {
    pub fn new(caster: UnitId, spell: SpellId, target: UnitId) -> Self {
        Self {
            caster,
            spell,
            target,
            triggered: false,
            triggered_by: None,
            cast_item: None,
            base_points: [None; CombatConfig::MAX_SPELL_EFFECTS],
        }
    }

    #[must_use]
    pub fn triggered(mut self) -> Self {
        self.triggered = true;
        self
    }

    /// Marks the cast as produced by the proc of `aura_spell`.
    #[must_use]
    pub fn triggered_by(mut self, aura_spell: Option<SpellId>) -> Self {
        self.triggered |= aura_spell.is_some();
        self.triggered_by = aura_spell;
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

/// A cast in progress.
#[derive(Clone, Debug, PartialEq)]
pub struct CurrentCast {
    pub request: CastRequest,
    pub slot: CastSlot,
    pub started_at: Timestamp,
    /// Full cast or channel time.
    pub duration_ms: i32,
    /// Time left until completion.
    pub remaining_ms: i32,
    pub pushbacks: u8,
}

/// What [`cast_spell`] did with a request.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CastOutcome {
    /// Resolved on the spot with this hit result.
    Resolved(SpellMissInfo),
    /// A timed cast or channel now occupies `slot`.
    Started { slot: CastSlot, duration_ms: i32 },
    /// Cast finished; effects land at `at`.
    Launched { at: Timestamp },
}

/// Resolves the descriptor and checks that both units can take part.
fn validate<'a>(ctx: &CombatContext<'a>, request: &CastRequest) -> Result<&'a SpellInfo, CastError> {
    let spell = match ctx.env.spell(request.spell) {
        Ok(spell) => spell,
        Err(OracleError::SpellNotFound(id)) => return Err(CastError::UnknownSpell(id)),
        Err(error) => return Err(error.into()),
    };
    let caster = ctx
        .world
        .unit(request.caster)
        .ok_or(CastError::CasterNotFound(request.caster))?;
    if !caster.is_alive() {
        return Err(CastError::CasterDead(request.caster));
    }
    if !ctx.world.contains(request.target) {
        return Err(CastError::TargetNotFound(request.target));
    }
    Ok(spell)
}

// ============================================================================
// Entry points
// ============================================================================

/// Casts a spell: timed spells start casting, everything else resolves now
/// (or after its launch delay).
///
/// # Errors
///
/// Unknown spell, missing or dead caster, missing target, or a busy slot.
pub fn cast_spell(ctx: &mut CombatContext<'_>, request: CastRequest) -> Result<CastOutcome, CastError> {
    let spell = validate(ctx, &request)?;
    if !request.triggered && (spell.cast_time_ms > 0 || spell.is_channeled()) {
        return prepare_cast(ctx, request);
    }
    Ok(finish_cast(ctx, request, spell))
}

/// Puts a timed cast or a channel into its slot.
///
/// A channel resolves its effects when it starts and then holds the slot for
/// the spell's duration.
///
/// # Errors
///
/// Same as [`cast_spell`], plus [`CastError::AlreadyCasting`].
pub fn prepare_cast(ctx: &mut CombatContext<'_>, request: CastRequest) -> Result<CastOutcome, CastError> {
    let spell = validate(ctx, &request)?;
    let slot = if spell.is_channeled() {
        CastSlot::Channeled
    } else {
        CastSlot::Generic
    };
    let caster = request.caster;
    if ctx.world.unit(caster).is_some_and(|u| u.casts.contains_key(&slot)) {
        return Err(CastError::AlreadyCasting { caster, slot });
    }

    let duration_ms = if spell.is_channeled() {
        spell.duration_ms.max(0)
    } else {
        i32::try_from(spell.cast_time_ms).unwrap_or(i32::MAX)
    };
    if !request.triggered {
        aura::remove_auras_with_interrupt_flags(ctx, caster, AuraInterruptFlags::CAST, Some(spell.id));
    }
    let now = ctx.now();
    if let Some(unit) = ctx.world.unit_mut(caster) {
        unit.casts.insert(
            slot,
            CurrentCast {
                request: request.clone(),
                slot,
                started_at: now,
                duration_ms,
                remaining_ms: duration_ms,
                pushbacks: 0,
            },
        );
    }
    debug!(target: "combat::spell", %caster, spell = %spell.id, ?slot, duration_ms, "cast started");

    if slot == CastSlot::Channeled {
        start_cooldown(ctx, &request, spell);
        if let Err(error) = execute_spell(ctx, &request) {
            debug!(target: "combat::spell", spell = %spell.id, %error, "channel effects failed");
        }
    }
    Ok(CastOutcome::Started { slot, duration_ms })
}

/// Cooldown, cast-interrupt auras, then either immediate resolution or a
/// delayed launch.
fn finish_cast(ctx: &mut CombatContext<'_>, request: CastRequest, spell: &SpellInfo) -> CastOutcome {
    start_cooldown(ctx, &request, spell);
    if !request.triggered {
        aura::remove_auras_with_interrupt_flags(ctx, request.caster, AuraInterruptFlags::CAST, Some(spell.id));
    }

    if spell.launch_delay_ms > 0 {
        let at = ctx.now() + u64::from(spell.launch_delay_ms);
        trace!(target: "combat::spell", spell = %spell.id, %at, "spell launched");
        ctx.world.events.push(at, DelayedEffect::LaunchSpell(request));
        return CastOutcome::Launched { at };
    }
    match execute_spell(ctx, &request) {
        Ok(result) => CastOutcome::Resolved(result),
        Err(error) => {
            debug!(target: "combat::spell", spell = %spell.id, %error, "spell did not resolve");
            CastOutcome::Resolved(SpellMissInfo::Evade)
        }
    }
}

fn start_cooldown(ctx: &mut CombatContext<'_>, request: &CastRequest, spell: &SpellInfo) {
    // auras that start their cooldown on removal hold an infinite one while applied
    if request.triggered || spell.has_attribute(SpellAttributes::COOLDOWN_ON_AURA_REMOVE) {
        return;
    }
    ctx.collab
        .history
        .start_cooldown(spell.id, request.cast_item, request.caster, false);
}

/// Cancels the cast in `slot`. A cancelled channel takes its auras with it.
///
/// # Errors
///
/// [`CastError::NotCasting`] when the slot is empty.
pub fn interrupt_spell(ctx: &mut CombatContext<'_>, unit: UnitId, slot: CastSlot) -> Result<(), CastError> {
    let cast = ctx
        .world
        .unit_mut(unit)
        .and_then(|u| u.casts.remove(&slot))
        .ok_or(CastError::NotCasting { caster: unit, slot })?;

    if slot == CastSlot::Channeled {
        let request = &cast.request;
        aura::remove_auras_by_spell(ctx, request.target, request.spell, Some(unit), AuraRemoveMode::Interrupt);
        if request.target != unit {
            aura::remove_auras_by_spell(ctx, unit, request.spell, Some(unit), AuraRemoveMode::Interrupt);
        }
    }
    debug!(target: "combat::spell", %unit, spell = %cast.request.spell, ?slot, "cast interrupted");
    Ok(())
}

/// Cancels whichever slot is casting `spell`.
///
/// # Errors
///
/// [`CastError::NotCastingSpell`] when no slot holds that spell.
pub fn interrupt_spell_by_id(ctx: &mut CombatContext<'_>, unit: UnitId, spell: SpellId) -> Result<CastSlot, CastError> {
    let slot = ctx
        .world
        .unit(unit)
        .and_then(|u| u.casts.values().find(|c| c.request.spell == spell).map(|c| c.slot))
        .ok_or(CastError::NotCastingSpell { caster: unit, spell })?;
    interrupt_spell(ctx, unit, slot)?;
    Ok(slot)
}

/// Slots with a cast in progress, in slot order.
pub fn active_slots(unit: &Unit) -> Vec<CastSlot> {
    unit.casts.keys().copied().collect()
}

/// Counts casts down and completes the ones that are due.
pub(crate) fn update_casts(ctx: &mut CombatContext<'_>, id: UnitId, diff_ms: u64) {
    let Some(slots) = ctx.world.unit(id).map(active_slots) else {
        return;
    };
    let diff = i32::try_from(diff_ms).unwrap_or(i32::MAX);

    for slot in slots {
        let Some(cast) = ctx.world.unit_mut(id).and_then(|u| u.casts.get_mut(&slot)) else {
            continue;
        };
        cast.remaining_ms = cast.remaining_ms.saturating_sub(diff);
        if cast.remaining_ms > 0 {
            continue;
        }
        let Some(cast) = ctx.world.unit_mut(id).and_then(|u| u.casts.remove(&slot)) else {
            continue;
        };
        match slot {
            CastSlot::Channeled => {
                debug!(target: "combat::spell", unit = %id, spell = %cast.request.spell, "channel finished");
            }
            _ => complete_cast(ctx, cast.request),
        }
    }
}

fn complete_cast(ctx: &mut CombatContext<'_>, request: CastRequest) {
    let spell = match validate(ctx, &request) {
        Ok(spell) => spell,
        Err(error) => {
            debug!(target: "combat::spell", spell = %request.spell, %error, "completed cast dropped");
            return;
        }
    };
    debug!(target: "combat::spell", caster = %request.caster, spell = %spell.id, "cast completed");
    finish_cast(ctx, request, spell);
}

/// Reaction of the victim's casts to a direct hit: abort, push back or
/// shorten a channel.
pub(crate) fn on_damage_taken(ctx: &mut CombatContext<'_>, victim: UnitId) {
    let config = ctx.config();
    let env = ctx.env;

    let casting = ctx
        .world
        .unit(victim)
        .and_then(|u| u.current_cast(CastSlot::Generic))
        .map(|c| c.request.spell);
    if let Some(casting) = casting {
        let flags = env.spell(casting).map_or(CastInterruptFlags::empty(), |s| s.interrupt_flags);
        if flags.contains(CastInterruptFlags::ABORT_ON_DAMAGE) {
            let _ = interrupt_spell(ctx, victim, CastSlot::Generic);
        } else if flags.contains(CastInterruptFlags::PUSHBACK) {
            if let Some(cast) = ctx.world.unit_mut(victim).and_then(|u| u.casts.get_mut(&CastSlot::Generic)) {
                if cast.pushbacks < config.max_cast_pushbacks {
                    cast.pushbacks += 1;
                    cast.remaining_ms = (cast.remaining_ms + config.cast_pushback_ms).min(cast.duration_ms);
                    trace!(target: "combat::spell", %victim, remaining = cast.remaining_ms, "cast pushed back");
                }
            }
        }
    }

    let Some(channel) = ctx.world.unit(victim).and_then(|u| u.current_cast(CastSlot::Channeled)) else {
        return;
    };
    let Ok(spell) = env.spell(channel.request.spell) else {
        return;
    };
    let (target, duration_ms) = (channel.request.target, channel.duration_ms);
    if spell
        .channel_interrupt_flags
        .intersects(AuraInterruptFlags::TAKE_DAMAGE | AuraInterruptFlags::DIRECT_DAMAGE)
    {
        let _ = interrupt_spell(ctx, victim, CastSlot::Channeled);
        return;
    }
    if !spell.interrupt_flags.contains(CastInterruptFlags::PUSHBACK) {
        return;
    }
    let delay = (duration_ms as f32 * config.channel_delay_pct / 100.0) as i32;
    if let Some(channel) = ctx.world.unit_mut(victim).and_then(|u| u.casts.get_mut(&CastSlot::Channeled)) {
        channel.remaining_ms = (channel.remaining_ms - delay).max(0);
    }
    for owner in [target, victim] {
        let auras: Vec<AuraId> = ctx
            .world
            .unit(owner)
            .map(|u| {
                u.owned_auras()
                    .filter(|a| a.spell == spell.id && a.caster == Some(victim) && !a.is_removing())
                    .map(|a| a.id)
                    .collect()
            })
            .unwrap_or_default();
        for id in auras {
            if let Some(aura) = ctx.world.unit_mut(owner).and_then(|u| u.aura_mut(id)) {
                aura.shorten_duration(delay);
            }
        }
        if target == victim {
            break;
        }
    }
    trace!(target: "combat::spell", %victim, delay, "channel delayed");
}

// ============================================================================
// Resolution
// ============================================================================

/// Resolves a spell against its target: hit roll, every effect slot, then
/// hit-phase procs.
///
/// # Errors
///
/// Unknown spell or missing units. A miss is not an error; it is returned as
/// the hit result.
pub fn execute_spell(ctx: &mut CombatContext<'_>, request: &CastRequest) -> Result<SpellMissInfo, CastError> {
    let spell = match ctx.env.spell(request.spell) {
        Ok(spell) => spell,
        Err(OracleError::SpellNotFound(id)) => return Err(CastError::UnknownSpell(id)),
        Err(error) => return Err(error.into()),
    };
    let caster = ctx
        .world
        .unit(request.caster)
        .cloned()
        .ok_or(CastError::CasterNotFound(request.caster))?;
    let target = ctx
        .world
        .unit(request.target)
        .cloned()
        .ok_or(CastError::TargetNotFound(request.target))?;

    let no_proc = spell.has_attribute(SpellAttributes::DISABLE_PROC);
    if no_proc {
        set_cant_proc(ctx, caster.id, true);
    }
    let result = resolve(ctx, request, spell, &caster, &target);
    if no_proc {
        set_cant_proc(ctx, caster.id, false);
    }
    Ok(result)
}

fn set_cant_proc(ctx: &mut CombatContext<'_>, unit: UnitId, on: bool) {
    if let Some(unit) = ctx.world.unit_mut(unit) {
        if on {
            unit.cant_proc += 1;
        } else {
            unit.cant_proc -= 1;
        }
    }
}

/// Everything one landed (or missed) spell produced for procs.
#[derive(Default)]
struct Landed {
    hit_mask: ProcHit,
    damage: Option<DamageInfo>,
    heal: Option<HealInfo>,
}

fn resolve(
    ctx: &mut CombatContext<'_>,
    request: &CastRequest,
    spell: &SpellInfo,
    caster: &Unit,
    target: &Unit,
) -> SpellMissInfo {
    let positive = spell.is_positive();
    let hostile = ctx.env.is_hostile(caster, target);
    let result = if spell.has_attribute(SpellAttributes::IGNORE_HIT_RESULT) {
        SpellMissInfo::None
    } else {
        combat::spell_hit_result(ctx, caster, target, spell)
    };
    if !positive && hostile {
        combat::engage(ctx, Some(caster.id), target.id);
    }

    let mut landed = Landed::default();
    if result.lands() {
        landed.hit_mask |= result.proc_hit();
        apply_effects(ctx, request, spell, result == SpellMissInfo::Block, &mut landed);
        if !positive && hostile {
            aura::remove_auras_with_interrupt_flags(ctx, target.id, AuraInterruptFlags::HOSTILE_ACTION, Some(spell.id));
        }
    } else {
        ctx.collab.log.record(CombatLogEntry::Miss {
            attacker: caster.id,
            victim: target.id,
            spell: Some(spell.id),
            result,
        });
        debug!(target: "combat::spell", caster = %caster.id, target_unit = %target.id, spell = %spell.id, ?result, "spell missed");
        landed.hit_mask = result.proc_hit();
    }

    let (deal, take) = proc::spell_proc_flags(spell, positive);
    let spell_type = match (&landed.damage, &landed.heal) {
        (Some(_), _) => ProcSpellType::DAMAGE,
        (None, Some(_)) => ProcSpellType::HEAL,
        (None, None) => ProcSpellType::NO_DMG_HEAL,
    };
    let mut context = ProcSpellContext::new(spell)
        .triggered_by(request.triggered_by)
        .with_cast_item(request.cast_item);
    context.triggered = request.triggered;

    let mut event = ProcRequest::new(caster.id, Some(target.id), deal, take)
        .with_phase(ProcSpellPhase::HIT)
        .with_spell_type(spell_type)
        .with_hit_mask(landed.hit_mask)
        .with_spell(context);
    if let Some(damage) = landed.damage {
        event = event.with_damage(damage);
    }
    if let Some(heal) = landed.heal {
        event = event.with_heal(heal);
    }
    proc::dispatch(ctx, event);
    result
}

/// Per-slot base value: override or catalog points plus the die roll.
fn slot_base(ctx: &mut CombatContext<'_>, request: &CastRequest, spell: &SpellInfo, slot: usize) -> i32 {
    let Some(effect) = spell.effect(slot) else {
        return 0;
    };
    if let Some(value) = request.base_points[slot] {
        return value;
    }
    let mut amount = effect.base_points;
    if effect.die_sides > 0 {
        amount += ctx.roll_range(request.caster, roll_context::DAMAGE_VARIANCE, 1, effect.die_sides) as i32;
    }
    amount
}

fn apply_effects(ctx: &mut CombatContext<'_>, request: &CastRequest, spell: &SpellInfo, blocked: bool, landed: &mut Landed) {
    let mut aura_masks = [(request.target, EffectMask::NONE), (request.caster, EffectMask::NONE)];

    for (slot, effect) in spell.effects.iter().enumerate() {
        let effect_target = match effect.target {
            EffectTarget::Target => request.target,
            EffectTarget::Caster => request.caster,
        };
        let immune = ctx
            .world
            .unit(effect_target)
            .is_none_or(|u| is_immune_to_effect(u, spell, slot));
        if immune {
            trace!(target: "combat::spell", spell = %spell.id, slot, unit = %effect_target, "effect slot immune");
            continue;
        }

        match effect.kind {
            SpellEffectKind::SchoolDamage | SpellEffectKind::WeaponDamage => {
                let mut base = slot_base(ctx, request, spell, slot).max(0) as u32;
                let (effect_type, coefficient) = if effect.kind == SpellEffectKind::WeaponDamage {
                    base += weapon_roll(ctx, request.caster, spell.attack_type);
                    (DamageEffectType::Direct, 1.0)
                } else {
                    (DamageEffectType::SpellDirect, effect.bonus_coefficient)
                };
                let source = HitSource::spell(Some(request.caster), effect_target, spell, effect_type)
                    .with_coefficient(coefficient)
                    .with_mechanic(effect.mechanic)
                    .with_blocked(blocked);
                if let Some(info) = combat::damage_unit(ctx, &source, base) {
                    landed.hit_mask |= info.hit_mask;
                    landed.damage = Some(info);
                }
            }
            SpellEffectKind::Heal => {
                let base = slot_base(ctx, request, spell, slot).max(0) as u32;
                let source = HitSource::spell(Some(request.caster), effect_target, spell, DamageEffectType::SpellDirect)
                    .with_coefficient(effect.bonus_coefficient);
                if let Some(heal) = combat::heal_unit(ctx, &source, base) {
                    landed.hit_mask |= if heal.critical { ProcHit::CRITICAL } else { ProcHit::NORMAL };
                    landed.heal = Some(heal);
                }
            }
            SpellEffectKind::ApplyAura(_) => {
                let index = usize::from(effect_target != request.target);
                aura_masks[index].1 = aura_masks[index].1.union(EffectMask::slot(slot));
            }
            SpellEffectKind::Energize => {
                let amount = slot_base(ctx, request, spell, slot).max(0) as u32;
                combat::energize(ctx, Some(request.caster), effect_target, Some(spell.id), amount);
            }
            SpellEffectKind::TriggerSpell => {
                if let Some(trigger) = effect.trigger_spell {
                    let nested = CastRequest::new(request.caster, trigger, effect_target).triggered();
                    if let Err(error) = cast_spell(ctx, nested) {
                        debug!(target: "combat::spell", spell = %trigger, %error, "triggered spell failed");
                    }
                }
            }
            SpellEffectKind::Dispel => {
                let count = slot_base(ctx, request, spell, slot).max(0) as u32;
                let dispel_type = DispelType::from_index(effect.misc_value).unwrap_or(DispelType::None);
                aura::dispel(ctx, effect_target, dispel_type, count, Some(request.caster));
            }
            SpellEffectKind::InterruptCast => {
                for cast_slot in [CastSlot::Generic, CastSlot::Channeled] {
                    if interrupt_spell(ctx, effect_target, cast_slot).is_ok() {
                        landed.hit_mask |= ProcHit::INTERRUPT;
                    }
                }
            }
            SpellEffectKind::Dummy => {
                trace!(target: "combat::spell", spell = %spell.id, slot, "dummy effect");
            }
        }
    }

    for (unit, mask) in aura_masks {
        if !mask.is_empty() {
            apply_spell_auras(ctx, request, spell, unit, mask);
        }
    }
}

fn weapon_roll(ctx: &mut CombatContext<'_>, caster: UnitId, attack_type: WeaponAttackType) -> u32 {
    let Some((min, max)) = ctx
        .world
        .unit(caster)
        .map(|u| (u.stats.weapon_min_damage, u.stats.weapon_max_damage))
    else {
        return 0;
    };
    let damage = ctx.roll_range(caster, roll_context::DAMAGE_VARIANCE, min, max.max(min));
    if attack_type == WeaponAttackType::OffAttack {
        damage / 2
    } else {
        damage
    }
}

/// Applies the aura slots of `spell` on `target` with diminishing returns.
fn apply_spell_auras(
    ctx: &mut CombatContext<'_>,
    request: &CastRequest,
    spell: &SpellInfo,
    target: UnitId,
    mask: EffectMask,
) -> Option<AuraId> {
    let config = ctx.config();
    let now = ctx.now();
    let group = spell.diminishing_group();
    let caster_controlled = ctx.world.unit(request.caster).is_some_and(|u| u.player_controlled);
    let target_unit = ctx.world.unit(target)?;

    let mut duration = spell.duration_ms;
    let level = target_unit.diminishing().level(group, now, config.dr_reset_ms);
    if !diminishing::apply_to_duration(spell, &mut duration, caster_controlled, target_unit, level, config.dr_pvp_duration_limit_ms) {
        let error = AuraError::Diminished { target, spell: spell.id };
        debug!(target: "combat::spell", code = error.error_code(), %error, "aura not applied");
        return None;
    }
    let eligible = group != DiminishingGroup::None && diminishing::is_diminishing_eligible(group, target_unit);

    let mut aura_request = AuraApplyRequest::new(spell.id, target, Some(request.caster))
        .with_effect_mask(mask)
        .with_duration(duration)
        .with_cast_item(request.cast_item);
    for (slot, points) in request.base_points.iter().enumerate() {
        if let Some(points) = points {
            aura_request = aura_request.with_base_points(slot, *points);
        }
    }

    match aura::apply_aura(ctx, &aura_request) {
        Ok(id) => {
            if eligible {
                if let Some(unit) = ctx.world.unit_mut(target) {
                    unit.diminishing.increment(group, now, config.dr_reset_ms);
                }
            }
            Some(id)
        }
        Err(error) => {
            debug!(
                target: "combat::spell",
                spell = %spell.id,
                target_unit = %target,
                code = error.error_code(),
                severity = ?error.severity(),
                %error,
                "aura not applied"
            );
            None
        }
    }
}

// ============================================================================
// Melee
// ============================================================================

/// One white swing from `attacker` at `victim`.
///
/// Returns `None` when the swing cannot happen: a unit is missing or dead, or
/// the attacker is pacified or under crowd control.
pub fn attacker_state_update(
    ctx: &mut CombatContext<'_>,
    attacker: UnitId,
    victim: UnitId,
    attack_type: WeaponAttackType,
) -> Option<MeleeHitOutcome> {
    let attacker_unit = ctx.world.unit(attacker).filter(|u| u.is_alive())?.clone();
    let victim_unit = ctx.world.unit(victim).filter(|u| u.is_alive())?.clone();
    if attacker_unit.has_unit_state(UnitStateFlags::PACIFIED | UnitStateFlags::CONTROLLED) {
        return None;
    }
    aura::remove_auras_with_interrupt_flags(ctx, attacker, AuraInterruptFlags::MELEE_ATTACK, None);

    let outcome = combat::roll_melee_outcome(ctx, &attacker_unit, &victim_unit, attack_type);
    combat::engage(ctx, Some(attacker), victim);

    let mut hit_mask = outcome.proc_hit();
    let mut damage = None;
    if outcome.lands() {
        let base = weapon_roll(ctx, attacker, attack_type);
        let source = HitSource::melee(attacker, victim, attack_type, outcome);
        if let Some(info) = combat::damage_unit(ctx, &source, base) {
            hit_mask |= info.hit_mask;
            damage = Some(info);
        }
    } else {
        ctx.collab.log.record(CombatLogEntry::Miss {
            attacker,
            victim,
            spell: None,
            result: swing_miss_info(outcome),
        });
    }
    trace!(target: "combat::spell", %attacker, %victim, ?outcome, "melee swing");

    let (deal, take) = proc::melee_proc_flags(attack_type);
    let mut event = ProcRequest::new(attacker, Some(victim), deal, take).with_hit_mask(hit_mask);
    if let Some(damage) = damage {
        event = event.with_damage(damage);
    }
    proc::dispatch(ctx, event);
    Some(outcome)
}

fn swing_miss_info(outcome: MeleeHitOutcome) -> SpellMissInfo {
    match outcome {
        MeleeHitOutcome::Evade => SpellMissInfo::Evade,
        MeleeHitOutcome::Dodge => SpellMissInfo::Dodge,
        MeleeHitOutcome::Parry => SpellMissInfo::Parry,
        MeleeHitOutcome::Block => SpellMissInfo::Block,
        _ => SpellMissInfo::Miss,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aura::AuraType;
    use crate::testing::{Harness, SpellBuilder};
    use crate::types::{Mechanic, SchoolMask};
    use crate::world;

    const FIREBALL: SpellId = SpellId(1);
    const STUN: SpellId = SpellId(2);
    const ARROW: SpellId = SpellId(3);
    const DRAIN: SpellId = SpellId(4);

    fn harness() -> Harness {
        let mut h = Harness::new();
        h.add_spell(
            SpellBuilder::new(FIREBALL)
                .school(SchoolMask::FIRE)
                .magic()
                .attributes(SpellAttributes::IGNORE_HIT_RESULT)
                .cast_time(2_000)
                .interrupt_flags(CastInterruptFlags::PUSHBACK)
                .school_damage(40)
                .build(),
        );
        h.add_spell(
            SpellBuilder::new(STUN)
                .melee()
                .attributes(SpellAttributes::IGNORE_HIT_RESULT)
                .duration(4_000)
                .aura(AuraType::ModStun, 0)
                .mechanic(Mechanic::Stun)
                .build(),
        );
        h.add_spell(
            SpellBuilder::new(ARROW)
                .magic()
                .attributes(SpellAttributes::IGNORE_HIT_RESULT)
                .launch_delay(1_000)
                .school_damage(10)
                .build(),
        );
        h.add_spell(
            SpellBuilder::new(DRAIN)
                .magic()
                .attributes(SpellAttributes::IGNORE_HIT_RESULT)
                .channeled(3_000)
                .aura(AuraType::PeriodicDamage, 5)
                .amplitude(1_000)
                .build(),
        );
        h
    }

    fn pair(h: &mut Harness) -> (UnitId, UnitId) {
        let caster = h.spawn(Unit::player(UnitId(1)).with_faction(1));
        let target = h.spawn(Unit::creature(UnitId(2)).with_faction(2).with_health(1_000, 1_000));
        (caster, target)
    }

    #[test]
    fn timed_cast_resolves_after_cast_time() {
        let mut h = harness();
        let (caster, target) = pair(&mut h);

        let outcome = cast_spell(&mut h.ctx(), CastRequest::new(caster, FIREBALL, target)).expect("cast starts");
        assert_eq!(
            outcome,
            CastOutcome::Started {
                slot: CastSlot::Generic,
                duration_ms: 2_000
            }
        );
        world::update(&mut h.ctx(), 1_999);
        assert_eq!(h.world.unit(target).map(|u| u.health.current), Some(1_000));
        world::update(&mut h.ctx(), 1);
        assert_eq!(h.world.unit(target).map(|u| u.health.current), Some(960));
        assert!(h.world.unit(caster).is_some_and(|u| u.current_cast(CastSlot::Generic).is_none()));
        assert_eq!(h.history.started.len(), 1);
    }

    #[test]
    fn second_cast_in_busy_slot_is_refused() {
        let mut h = harness();
        let (caster, target) = pair(&mut h);
        cast_spell(&mut h.ctx(), CastRequest::new(caster, FIREBALL, target)).expect("cast starts");
        let error = cast_spell(&mut h.ctx(), CastRequest::new(caster, FIREBALL, target)).unwrap_err();
        assert_eq!(
            error,
            CastError::AlreadyCasting {
                caster,
                slot: CastSlot::Generic
            }
        );
    }

    #[test]
    fn pushback_is_capped() {
        let mut h = harness();
        let (caster, attacker) = pair(&mut h);
        cast_spell(&mut h.ctx(), CastRequest::new(caster, FIREBALL, attacker)).expect("cast starts");
        world::update(&mut h.ctx(), 1_500);

        for _ in 0..4 {
            on_damage_taken(&mut h.ctx(), caster);
        }
        let cast = h
            .world
            .unit(caster)
            .and_then(|u| u.current_cast(CastSlot::Generic))
            .expect("still casting");
        assert_eq!(cast.pushbacks, 2);
        assert_eq!(cast.remaining_ms, 1_500);
    }

    #[test]
    fn interrupt_by_id_requires_matching_cast() {
        let mut h = harness();
        let (caster, target) = pair(&mut h);
        let error = interrupt_spell_by_id(&mut h.ctx(), caster, FIREBALL).unwrap_err();
        assert_eq!(error, CastError::NotCastingSpell { caster, spell: FIREBALL });

        cast_spell(&mut h.ctx(), CastRequest::new(caster, FIREBALL, target)).expect("cast starts");
        assert_eq!(interrupt_spell_by_id(&mut h.ctx(), caster, FIREBALL), Ok(CastSlot::Generic));
        world::update(&mut h.ctx(), 5_000);
        assert_eq!(h.world.unit(target).map(|u| u.health.current), Some(1_000));
    }

    #[test]
    fn stun_durations_diminish_to_immunity() {
        let mut h = harness();
        let caster = h.spawn(Unit::player(UnitId(1)).with_faction(1));
        let target = h.spawn(Unit::player(UnitId(2)).with_faction(2));

        let mut durations = Vec::new();
        for _ in 0..4 {
            cast_spell(&mut h.ctx(), CastRequest::new(caster, STUN, target)).expect("stun resolves");
            let duration = h
                .world
                .unit(target)
                .and_then(|u| u.find_aura(STUN, Some(caster)))
                .map(|a| a.max_duration());
            durations.push(duration);
            aura::remove_auras_by_spell(&mut h.ctx(), target, STUN, None, AuraRemoveMode::Cancel);
        }
        assert_eq!(durations, vec![Some(4_000), Some(2_000), Some(1_000), None]);
    }

    #[test]
    fn launch_delay_defers_effects() {
        let mut h = harness();
        let (caster, target) = pair(&mut h);
        let outcome = cast_spell(&mut h.ctx(), CastRequest::new(caster, ARROW, target)).expect("launches");
        assert!(matches!(outcome, CastOutcome::Launched { .. }));
        assert_eq!(h.world.pending_events(), 1);

        world::update(&mut h.ctx(), 1_000);
        assert_eq!(h.world.pending_events(), 0);
        assert_eq!(h.world.unit(target).map(|u| u.health.current), Some(990));
    }

    #[test]
    fn interrupted_channel_removes_its_aura() {
        let mut h = harness();
        let (caster, target) = pair(&mut h);
        cast_spell(&mut h.ctx(), CastRequest::new(caster, DRAIN, target)).expect("channel starts");
        assert!(h.world.unit(target).is_some_and(|u| u.has_aura(DRAIN)));

        interrupt_spell(&mut h.ctx(), caster, CastSlot::Channeled).expect("channel interrupted");
        assert!(h.world.unit(target).is_some_and(|u| !u.has_aura(DRAIN)));
        assert!(h.world.unit(caster).is_some_and(|u| !u.is_casting_non_melee()));
    }

    #[test]
    fn spell_hit_roll_on_a_boundary_takes_the_lower_outcome() {
        const STRIKE: SpellId = SpellId(5);
        let mut h = harness();
        h.add_spell(SpellBuilder::new(STRIKE).melee().school_damage(20).build());
        let caster = h.spawn(Unit::player(UnitId(1)).with_faction(1));
        let mut victim = Unit::creature(UnitId(2)).with_faction(2).with_health(1_000, 1_000);
        victim.stats.dodge_chance = 10.0;
        victim.stats.can_parry = false;
        let victim = h.spawn(victim);

        // 5% miss then 10% dodge: Miss covers 0..=500, Dodge 501..=1500
        for (roll, expected) in [(500, SpellMissInfo::Miss), (1_500, SpellMissInfo::Dodge)] {
            h.rng.script(&[roll]);
            cast_spell(&mut h.ctx(), CastRequest::new(caster, STRIKE, victim)).expect("strike resolves");
            assert_eq!(h.rng.pending(), 0);
            assert!(
                matches!(h.log.last(), Some(CombatLogEntry::Miss { result, .. }) if *result == expected),
                "roll {roll} should give {expected:?}"
            );
        }
        assert_eq!(h.world.unit(victim).map(|u| u.health.current), Some(1_000));

        h.rng.script(&[1_501]);
        cast_spell(&mut h.ctx(), CastRequest::new(caster, STRIKE, victim)).expect("strike resolves");
        assert!(h.world.unit(victim).is_some_and(|u| u.health.current < 1_000));
    }

    #[test]
    fn scripted_swing_roll_selects_outcome() {
        let mut h = harness();
        let attacker = h.spawn(Unit::player(UnitId(1)).with_faction(1));
        let victim = h.spawn(Unit::creature(UnitId(2)).with_faction(2));

        h.rng.script(&[9_999]);
        let outcome = attacker_state_update(&mut h.ctx(), attacker, victim, WeaponAttackType::BaseAttack);
        assert_eq!(outcome, Some(MeleeHitOutcome::Normal));

        h.rng.script(&[0]);
        let outcome = attacker_state_update(&mut h.ctx(), attacker, victim, WeaponAttackType::BaseAttack);
        assert_eq!(outcome, Some(MeleeHitOutcome::Miss));
        assert!(h.log.iter().any(|e| matches!(e, CombatLogEntry::Miss { result: SpellMissInfo::Miss, .. })));
    }
}
