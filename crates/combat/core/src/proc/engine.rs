use tracing::{debug, trace};

use super::handlers::{check_effect_proc, fire_effect};
use super::types::{
    ProcAttributes, ProcEventInfo, ProcFlags, ProcHit, ProcSpellContext, ProcSpellPhase,
    ProcSpellType, SpellProcEntry,
};
use crate::aura::{self, Aura, AuraRemoveMode};
use crate::combat::{DamageInfo, HealInfo};
use crate::config::CombatConfig;
use crate::env::roll_context;
use crate::spell::{EffectMask, SpellAttributes, SpellInfo};
use crate::types::{AuraId, DamageClass, Timestamp, UnitId, WeaponAttackType};
use crate::unit::{AuraState, Unit};
use crate::world::CombatContext;

/// One combat event handed to [`dispatch`].
#[derive(Clone, Debug)]
pub struct ProcRequest {
    pub actor: UnitId,
    pub action_target: Option<UnitId>,
    /// Event flags seen by the actor's auras.
    pub actor_mask: ProcFlags,
    /// Event flags seen by the action target's auras.
    pub target_mask: ProcFlags,
    pub spell_type: ProcSpellType,
    pub phase: ProcSpellPhase,
    pub hit_mask: ProcHit,
    pub spell: Option<ProcSpellContext>,
    pub damage: Option<DamageInfo>,
    pub heal: Option<HealInfo>,
}

impl ProcRequest {
    pub fn new(
        actor: UnitId,
        action_target: Option<UnitId>,
        actor_mask: ProcFlags,
        target_mask: ProcFlags,
    ) -> Self {
        Self {
            actor,
            action_target,
            actor_mask,
            target_mask,
            spell_type: ProcSpellType::empty(),
            phase: ProcSpellPhase::empty(),
            hit_mask: ProcHit::empty(),
            spell: None,
            damage: None,
            heal: None,
        }
    }

    #[must_use]
    pub fn with_spell_type(mut self, spell_type: ProcSpellType) -> Self {
        self.spell_type = spell_type;
        self
    }

    #[must_use]
    pub fn with_phase(mut self, phase: ProcSpellPhase) -> Self {
        self.phase = phase;
        self
    }

    #[must_use]
    pub fn with_hit_mask(mut self, hit_mask: ProcHit) -> Self {
        self.hit_mask |= hit_mask;
        self
    }

    #[must_use]
    pub fn with_spell(mut self, spell: ProcSpellContext) -> Self {
        self.spell = Some(spell);
        self
    }

    #[must_use]
    pub fn with_damage(mut self, damage: DamageInfo) -> Self {
        self.damage = Some(damage);
        self
    }

    #[must_use]
    pub fn with_heal(mut self, heal: HealInfo) -> Self {
        self.heal = Some(heal);
        self
    }

    fn event(&self, proc_target: Option<UnitId>, type_mask: ProcFlags) -> ProcEventInfo {
        ProcEventInfo {
            actor: self.actor,
            action_target: self.action_target,
            proc_target,
            type_mask,
            spell_type_mask: self.spell_type,
            spell_phase_mask: self.phase,
            hit_mask: self.hit_mask,
            spell: self.spell,
            damage: self.damage.clone(),
            heal: self.heal.clone(),
        }
    }
}

/// Deal/take flags for a landed spell, chosen by damage class and intent.
pub fn spell_proc_flags(spell: &SpellInfo, positive: bool) -> (ProcFlags, ProcFlags) {
    match spell.damage_class {
        DamageClass::Melee => (ProcFlags::DEAL_MELEE_ABILITY, ProcFlags::TAKE_MELEE_ABILITY),
        DamageClass::Ranged => (ProcFlags::DEAL_RANGED_ABILITY, ProcFlags::TAKE_RANGED_ABILITY),
        _ if positive => (ProcFlags::DEAL_HELPFUL_SPELL, ProcFlags::TAKE_HELPFUL_SPELL),
        _ => (ProcFlags::DEAL_HARMFUL_SPELL, ProcFlags::TAKE_HARMFUL_SPELL),
    }
}

/// Deal/take flags for a white swing.
pub fn melee_proc_flags(attack_type: WeaponAttackType) -> (ProcFlags, ProcFlags) {
    match attack_type {
        WeaponAttackType::RangedAttack => (ProcFlags::DEAL_RANGED_ATTACK, ProcFlags::TAKE_RANGED_ATTACK),
        _ => (ProcFlags::DEAL_MELEE_SWING, ProcFlags::TAKE_MELEE_SWING),
    }
}

/// Lets both sides of an event react: actor first, then the action target.
pub fn dispatch(ctx: &mut CombatContext<'_>, req: ProcRequest) {
    if let Some(spell) = req.spell.and_then(|s| ctx.spell(s.spell)) {
        if spell.has_attribute(SpellAttributes::CANT_TRIGGER_PROC) {
            trace!(target: "combat::proc", spell = %spell.id, "spell cannot trigger procs");
            return;
        }
    }

    let mut target_mask = req.target_mask;
    if req.damage.as_ref().is_some_and(|d| d.amount > 0) {
        target_mask |= ProcFlags::TAKE_ANY_DAMAGE;
    }

    if !req.actor_mask.is_empty() {
        let event = req.event(req.action_target, req.actor_mask);
        process_side(ctx, req.actor, &event);
    }
    if let Some(target) = req.action_target.filter(|_| !target_mask.is_empty()) {
        update_reactive_states(ctx, target, req.hit_mask);
        let event = req.event(Some(req.actor), target_mask);
        process_side(ctx, target, &event);
    }
}

/// Dodging, parrying or blocking opens the `Defense` window.
fn update_reactive_states(ctx: &mut CombatContext<'_>, target: UnitId, hit_mask: ProcHit) {
    if !hit_mask.intersects(ProcHit::DODGE | ProcHit::PARRY | ProcHit::BLOCK) {
        return;
    }
    let until = ctx.now() + ctx.config().defense_state_duration_ms;
    if let Some(unit) = ctx.world.unit_mut(target).filter(|u| u.is_alive()) {
        unit.aura_state.set(AuraState::Defense, true);
        unit.defense_state_until = Some(until);
    }
}

/// Collects, then fires, the procs of one unit's auras.
fn process_side(ctx: &mut CombatContext<'_>, owner: UnitId, event: &ProcEventInfo) {
    let max_depth = ctx.config().max_proc_chain_depth;
    let Some(unit) = ctx.world.unit(owner) else {
        return;
    };
    if unit.cant_proc > 0 {
        trace!(target: "combat::proc", %owner, "procs suppressed while a no-proc spell resolves");
        return;
    }
    if unit.proc_depth >= max_depth {
        debug!(target: "combat::proc", %owner, depth = unit.proc_depth, "proc chain depth reached");
        return;
    }
    let candidates: Vec<AuraId> = unit.applied_auras.keys().copied().collect();

    let queued: Vec<(AuraId, EffectMask)> = candidates
        .into_iter()
        .filter_map(|id| collect(ctx, owner, id, event).map(|mask| (id, mask)))
        .collect();
    if queued.is_empty() {
        return;
    }

    let depth_before = enter(ctx, owner);
    for (id, mask) in queued {
        let live = ctx
            .world
            .unit(owner)
            .and_then(|u| u.aura(id))
            .is_some_and(|a| !a.is_removing());
        if !live {
            continue;
        }
        trace!(target: "combat::proc", %owner, aura = %id, effects = mask.0, "aura procs");
        for slot in 0..CombatConfig::MAX_SPELL_EFFECTS {
            if mask.has(slot) {
                fire_effect(ctx, owner, id, slot, event);
            }
        }
        consume_charge(ctx, owner, id);
    }
    leave(ctx, owner, depth_before);
}

fn enter(ctx: &mut CombatContext<'_>, owner: UnitId) -> u32 {
    let unit = ctx.world.unit_mut(owner);
    unit.map_or(0, |u| {
        u.proc_depth += 1;
        u.proc_depth - 1
    })
}

/// # Panics
///
/// Panics if the depth on the way out differs from the depth on the way in.
fn leave(ctx: &mut CombatContext<'_>, owner: UnitId, depth_before: u32) {
    if let Some(unit) = ctx.world.unit_mut(owner) {
        unit.proc_depth -= 1;
        assert_eq!(
            unit.proc_depth, depth_before,
            "proc depth of {owner} did not return to its value before dispatch"
        );
    }
}

/// Decides whether one aura reacts to the event. Returns the slots to fire.
fn collect(ctx: &mut CombatContext<'_>, owner: UnitId, id: AuraId, event: &ProcEventInfo) -> Option<EffectMask> {
    let now = ctx.now();
    let env = ctx.env;
    let unit = ctx.world.unit(owner)?;
    let aura = unit.aura(id).filter(|a| !a.is_removing())?;
    let applied = unit.application(id)?.effect_mask();
    let spell = env.spell(aura.spell).ok()?;
    let entry = spell.proc.as_ref()?;

    if !accepts(entry, spell, aura, event, now) {
        return None;
    }

    let mask = aura
        .effects()
        .filter(|e| applied.has(e.slot) && !entry.disable_effect_mask.has(e.slot))
        .filter(|e| check_effect_proc(aura, e, event))
        .fold(EffectMask::NONE, |mask, e| mask.union(EffectMask::slot(e.slot)));

    let actor = ctx.world.unit(event.actor);
    let chance = proc_chance(entry, actor);
    let cooldown_ms = entry.cooldown_ms;
    let cooldown_on_failure = entry.attributes.contains(ProcAttributes::COOLDOWN_ON_FAILURE);

    let passed = !mask.is_empty() && (chance >= 100.0 || ctx.roll_chance(owner, roll_context::PROC, chance));
    if passed {
        start_cooldown(ctx, owner, id, now, cooldown_ms);
        return Some(mask);
    }
    if cooldown_on_failure {
        start_cooldown(ctx, owner, id, now, cooldown_ms);
        consume_charge(ctx, owner, id);
    }
    None
}

/// Entry-level filters that do not depend on individual slots.
fn accepts(entry: &SpellProcEntry, spell: &SpellInfo, aura: &Aura, event: &ProcEventInfo, now: Timestamp) -> bool {
    if !entry.proc_flags.intersects(event.type_mask) {
        return false;
    }
    if aura.is_on_proc_cooldown(now) {
        return false;
    }
    let uses_stacks = entry.attributes.contains(ProcAttributes::USE_STACKS_FOR_CHARGES);
    if spell.proc_charges > 0 && aura.charges() == 0 && !uses_stacks {
        return false;
    }

    if let Some(source) = &event.spell {
        // a proc never feeds itself
        if source.triggered_by_aura == Some(aura.spell) {
            return false;
        }
        if source.triggered && !entry.attributes.contains(ProcAttributes::TRIGGERED_CAN_PROC) {
            return false;
        }
        if source.cast_item.is_some() && entry.attributes.contains(ProcAttributes::CANT_PROC_FROM_ITEM_CAST) {
            return false;
        }
    }

    if event.type_mask.intersects(ProcFlags::ALWAYS_TRIGGER) {
        return true;
    }

    if !entry.school_mask.is_empty() && !entry.school_mask.intersects(event.school_mask()) {
        return false;
    }
    if entry.family != 0 {
        let affected = event
            .spell
            .is_some_and(|s| s.is_affected(entry.family, entry.family_mask));
        if !affected {
            return false;
        }
    }
    if event.type_mask.intersects(ProcFlags::SPELL)
        && !entry.spell_type_mask.is_empty()
        && !entry.spell_type_mask.intersects(event.spell_type_mask)
    {
        return false;
    }
    if event.type_mask.intersects(ProcFlags::REQ_SPELL_PHASE) {
        let phase = if entry.spell_phase_mask.is_empty() {
            ProcSpellPhase::HIT
        } else {
            entry.spell_phase_mask
        };
        if !phase.intersects(event.spell_phase_mask) {
            return false;
        }
    }

    let hit_mask = if !entry.hit_mask.is_empty() {
        entry.hit_mask
    } else if event.type_mask.intersects(ProcFlags::TAKEN_HIT) {
        ProcHit::NORMAL | ProcHit::CRITICAL
    } else if event.type_mask.intersects(ProcFlags::DONE_HIT) {
        ProcHit::NORMAL | ProcHit::CRITICAL | ProcHit::ABSORB
    } else {
        ProcHit::empty()
    };
    hit_mask.is_empty() || hit_mask.intersects(event.hit_mask)
}

/// Percent chance: procs-per-minute scaled by the actor's swing time, the
/// flat chance, or always.
fn proc_chance(entry: &SpellProcEntry, actor: Option<&Unit>) -> f32 {
    if entry.procs_per_minute > 0.0 {
        let attack_time_ms = actor.map_or(0, |a| a.stats.attack_time_ms);
        return entry.procs_per_minute * attack_time_ms as f32 / 600.0;
    }
    if entry.chance > 0.0 { entry.chance } else { 100.0 }
}

fn start_cooldown(ctx: &mut CombatContext<'_>, owner: UnitId, id: AuraId, now: Timestamp, cooldown_ms: u32) {
    if cooldown_ms == 0 {
        return;
    }
    if let Some(aura) = ctx.world.unit_mut(owner).and_then(|u| u.aura_mut(id)) {
        aura.start_proc_cooldown(now + u64::from(cooldown_ms));
    }
}

/// Spends one charge (or stack); the last one removes the aura.
fn consume_charge(ctx: &mut CombatContext<'_>, owner: UnitId, id: AuraId) {
    let env = ctx.env;
    let Some((spell, charges)) = ctx
        .world
        .unit(owner)
        .and_then(|u| u.aura(id))
        .filter(|a| !a.is_removing())
        .and_then(|a| env.spell(a.spell).ok().map(|s| (s, a.charges())))
    else {
        return;
    };
    let uses_stacks = spell
        .proc
        .as_ref()
        .is_some_and(|e| e.attributes.contains(ProcAttributes::USE_STACKS_FOR_CHARGES));

    if uses_stacks {
        aura::modify_stack_amount(ctx, owner, id, -1, AuraRemoveMode::Expire);
    } else if spell.proc_charges > 0 {
        if charges <= 1 {
            aura::remove_aura(ctx, owner, id, AuraRemoveMode::Expire);
        } else if let Some(aura) = ctx.world.unit_mut(owner).and_then(|u| u.aura_mut(id)) {
            aura.set_charges(charges - 1);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aura::{AuraApplyRequest, AuraType, apply_aura};
    use crate::spell::{SpellEffectInfo, SpellEffectKind};
    use crate::testing::{Harness, SpellBuilder};
    use crate::types::{SchoolMask, SpellId};

    const PROC_AURA: SpellId = SpellId(10);
    const TRIGGERED: SpellId = SpellId(11);
    const BOLT: SpellId = SpellId(12);
    const ECHO_A: SpellId = SpellId(20);
    const ECHO_B: SpellId = SpellId(21);
    const ECHO_A_HIT: SpellId = SpellId(120);
    const ECHO_B_HIT: SpellId = SpellId(121);

    fn harmful_spell_entry() -> SpellProcEntry {
        SpellProcEntry {
            proc_flags: ProcFlags::DEAL_HARMFUL_SPELL,
            ..SpellProcEntry::default()
        }
    }

    fn harness() -> Harness {
        let mut h = Harness::new();
        h.add_spell(
            SpellBuilder::new(PROC_AURA)
                .duration(-1)
                .aura(AuraType::ProcTriggerSpell, 0)
                .trigger(TRIGGERED)
                .charges(2)
                .proc(harmful_spell_entry())
                .build(),
        );
        h.add_spell(
            SpellBuilder::new(TRIGGERED)
                .school(SchoolMask::FIRE)
                .magic()
                .attributes(SpellAttributes::IGNORE_HIT_RESULT)
                .school_damage(5)
                .build(),
        );
        h.add_spell(SpellBuilder::new(BOLT).school(SchoolMask::FIRE).magic().school_damage(10).build());
        h
    }

    fn bolt_event(h: &Harness, caster: UnitId, victim: UnitId) -> ProcRequest {
        let bolt = h.spells.get(BOLT).expect("bolt");
        ProcRequest::new(caster, Some(victim), ProcFlags::DEAL_HARMFUL_SPELL, ProcFlags::TAKE_HARMFUL_SPELL)
            .with_phase(ProcSpellPhase::HIT)
            .with_spell_type(ProcSpellType::DAMAGE)
            .with_hit_mask(ProcHit::NORMAL)
            .with_spell(ProcSpellContext::new(bolt))
    }

    #[test]
    fn charges_are_spent_and_exhausted_aura_removed() {
        let mut h = harness();
        let caster = h.spawn(Unit::player(UnitId(1)).with_faction(1));
        let victim = h.spawn(Unit::creature(UnitId(2)).with_faction(2).with_health(1_000, 1_000));
        let id = apply_aura(&mut h.ctx(), &AuraApplyRequest::new(PROC_AURA, caster, Some(caster)))
            .expect("proc aura applies");

        let event = bolt_event(&h, caster, victim);
        dispatch(&mut h.ctx(), event.clone());
        assert_eq!(h.world.unit(caster).and_then(|u| u.aura(id)).map(Aura::charges), Some(1));
        assert_eq!(h.world.unit(victim).map(|u| u.health.current), Some(995));

        dispatch(&mut h.ctx(), event);
        assert!(h.world.unit(caster).and_then(|u| u.aura(id)).is_none());
        assert_eq!(h.world.unit(caster).map(Unit::proc_depth), Some(0));
    }

    #[test]
    fn harmful_trigger_without_target_is_not_cast_on_owner() {
        let mut h = harness();
        let caster = h.spawn(Unit::player(UnitId(1)).with_faction(1).with_health(1_000, 1_000));
        let id = apply_aura(&mut h.ctx(), &AuraApplyRequest::new(PROC_AURA, caster, Some(caster)))
            .expect("proc aura applies");

        let mut event = bolt_event(&h, caster, UnitId(2));
        event.action_target = None;
        dispatch(&mut h.ctx(), event);

        assert_eq!(h.world.unit(caster).map(|u| u.health.current), Some(1_000));
        assert_eq!(h.world.unit(caster).and_then(|u| u.aura(id)).map(Aura::charges), Some(1));
    }

    #[test]
    fn failed_roll_with_cooldown_on_failure_spends_charge() {
        const CHANCY: SpellId = SpellId(13);
        let mut h = harness();
        h.add_spell(
            SpellBuilder::new(CHANCY)
                .duration(-1)
                .aura(AuraType::ProcTriggerSpell, 0)
                .trigger(TRIGGERED)
                .charges(3)
                .proc(SpellProcEntry {
                    chance: 25.0,
                    cooldown_ms: 5_000,
                    attributes: ProcAttributes::COOLDOWN_ON_FAILURE,
                    ..harmful_spell_entry()
                })
                .build(),
        );
        let caster = h.spawn(Unit::player(UnitId(1)).with_faction(1));
        let victim = h.spawn(Unit::creature(UnitId(2)).with_faction(2).with_health(1_000, 1_000));
        let id = apply_aura(&mut h.ctx(), &AuraApplyRequest::new(CHANCY, caster, Some(caster)))
            .expect("proc aura applies");

        // 2500 is the first failing roll at 25%
        h.rng.script(&[2_500]);
        let event = bolt_event(&h, caster, victim);
        dispatch(&mut h.ctx(), event.clone());

        assert_eq!(h.rng.pending(), 0);
        assert_eq!(h.world.unit(victim).map(|u| u.health.current), Some(1_000));
        let now = h.world.now();
        let aura = h.world.unit(caster).and_then(|u| u.aura(id)).expect("aura kept");
        assert_eq!(aura.charges(), 2);
        assert!(aura.is_on_proc_cooldown(now));

        // the cooldown blocks the next event before any roll is taken
        h.rng.script(&[0]);
        dispatch(&mut h.ctx(), event);
        assert_eq!(h.rng.pending(), 1);
        assert_eq!(h.world.unit(caster).and_then(|u| u.aura(id)).map(Aura::charges), Some(2));
    }

    #[test]
    fn wrong_phase_does_not_proc() {
        let mut h = harness();
        let caster = h.spawn(Unit::player(UnitId(1)).with_faction(1));
        let victim = h.spawn(Unit::creature(UnitId(2)).with_faction(2));
        let id = apply_aura(&mut h.ctx(), &AuraApplyRequest::new(PROC_AURA, caster, Some(caster)))
            .expect("proc aura applies");

        let mut event = bolt_event(&h, caster, victim);
        event.phase = ProcSpellPhase::CAST;
        dispatch(&mut h.ctx(), event);
        assert_eq!(h.world.unit(caster).and_then(|u| u.aura(id)).map(Aura::charges), Some(2));
    }

    #[test]
    fn missed_hit_does_not_match_default_mask() {
        let mut h = harness();
        let caster = h.spawn(Unit::player(UnitId(1)).with_faction(1));
        let victim = h.spawn(Unit::creature(UnitId(2)).with_faction(2));
        let id = apply_aura(&mut h.ctx(), &AuraApplyRequest::new(PROC_AURA, caster, Some(caster)))
            .expect("proc aura applies");

        let mut event = bolt_event(&h, caster, victim);
        event.hit_mask = ProcHit::MISS;
        dispatch(&mut h.ctx(), event);
        assert_eq!(h.world.unit(caster).and_then(|u| u.aura(id)).map(Aura::charges), Some(2));
    }

    #[test]
    fn mutually_triggering_auras_stop_at_depth_limit() {
        let mut h = Harness::new();
        let entry = SpellProcEntry {
            proc_flags: ProcFlags::DEAL_HARMFUL_SPELL,
            attributes: ProcAttributes::TRIGGERED_CAN_PROC,
            ..SpellProcEntry::default()
        };
        // each echo's damage spell re-triggers the other echo
        h.add_spell(
            SpellBuilder::new(ECHO_A)
                .duration(-1)
                .aura(AuraType::ProcTriggerSpell, 0)
                .trigger(ECHO_B_HIT)
                .proc(entry.clone())
                .build(),
        );
        h.add_spell(
            SpellBuilder::new(ECHO_B)
                .duration(-1)
                .aura(AuraType::ProcTriggerSpell, 0)
                .trigger(ECHO_A_HIT)
                .proc(entry)
                .build(),
        );
        for id in [ECHO_A_HIT, ECHO_B_HIT] {
            h.add_spell(
                SpellBuilder::new(id)
                    .magic()
                    .attributes(SpellAttributes::IGNORE_HIT_RESULT)
                    .school_damage(1)
                    .build(),
            );
        }
        h.add_spell(SpellBuilder::new(BOLT).magic().school_damage(1).build());

        let caster = h.spawn(Unit::player(UnitId(1)).with_faction(1));
        let victim = h.spawn(Unit::creature(UnitId(2)).with_faction(2).with_health(100_000, 100_000));
        for spell in [ECHO_A, ECHO_B] {
            apply_aura(&mut h.ctx(), &AuraApplyRequest::new(spell, caster, Some(caster))).expect("echo applies");
        }

        let event = bolt_event(&h, caster, victim);
        dispatch(&mut h.ctx(), event);

        let caster_unit = h.world.unit(caster).expect("caster");
        assert_eq!(caster_unit.proc_depth(), 0);
        let taken = 100_000 - h.world.unit(victim).map_or(0, |u| u.health.current);
        let limit = h.config.max_proc_chain_depth;
        assert!(taken > 0);
        assert!(taken <= 2u32.pow(limit), "proc chain was not bounded: {taken}");
    }

    #[test]
    fn dodge_opens_defense_window() {
        let mut h = harness();
        let attacker = h.spawn(Unit::creature(UnitId(1)).with_faction(1));
        let defender = h.spawn(Unit::player(UnitId(2)).with_faction(2));

        let (deal, take) = melee_proc_flags(WeaponAttackType::BaseAttack);
        dispatch(
            &mut h.ctx(),
            ProcRequest::new(attacker, Some(defender), deal, take).with_hit_mask(ProcHit::DODGE),
        );
        assert!(h.world.unit(defender).is_some_and(|u| u.has_aura_state(AuraState::Defense)));
    }

    #[test]
    fn spell_proc_flags_follow_damage_class() {
        let mut spell = SpellInfo::default();
        spell.effects.push(SpellEffectInfo::new(SpellEffectKind::Heal, 1));
        spell.damage_class = DamageClass::Magic;
        assert_eq!(
            spell_proc_flags(&spell, true),
            (ProcFlags::DEAL_HELPFUL_SPELL, ProcFlags::TAKE_HELPFUL_SPELL)
        );
        spell.damage_class = DamageClass::Melee;
        assert_eq!(
            spell_proc_flags(&spell, false),
            (ProcFlags::DEAL_MELEE_ABILITY, ProcFlags::TAKE_MELEE_ABILITY)
        );
    }

    #[test]
    fn ppm_scales_with_attack_time() {
        let entry = SpellProcEntry {
            procs_per_minute: 6.0,
            ..SpellProcEntry::default()
        };
        let mut unit = Unit::player(UnitId(1));
        unit.stats.attack_time_ms = 3_000;
        assert_eq!(proc_chance(&entry, Some(&unit)), 30.0);
        assert_eq!(proc_chance(&SpellProcEntry::default(), None), 100.0);
    }
}
