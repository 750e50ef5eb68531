//! Damage and healing orchestration.
//!
//! [`damage_unit`] runs one hit through the full pipeline:
//! done → taken → crit → glancing/crushing → armor → block → resist → absorb
//! → split → [`deal_damage`]. [`deal_damage`] is the only place health goes
//! down, and every redirected portion (split, share) passes through it again
//! with [`DamageEffectType::Shared`].

use tracing::{debug, trace};

use super::info::{DamageInfo, HealInfo, MeleeHitOutcome, SpellMissInfo};
use super::mitigation::{
    apply_absorbs, apply_heal_absorbs, apply_prevent_death, apply_resist, apply_split_damage,
    armor_reduced_damage,
};
use super::modifiers::{self, ModifierInput};
use crate::aura::{self, AuraType};
use crate::env::roll_context;
use crate::immunity::is_immune_to_damage;
use crate::log::{CombatLogEntry, DamageLog, DamageLogFlags, HealLog};
use crate::proc::{self, ProcFlags, ProcHit, ProcRequest};
use crate::spell::{self, AuraInterruptFlags, SpellAttributes, SpellInfo};
use crate::types::{
    DamageEffectType, Mechanic, SchoolMask, SpellId, UnitId, UnitKind, WeaponAttackType,
};
use crate::unit::{DeathState, Unit, UnitStateFlags};
use crate::world::CombatContext;

/// Where one hit comes from and how it should be treated.
#[derive(Clone, Copy, Debug)]
pub struct HitSource<'s> {
    pub attacker: Option<UnitId>,
    pub victim: UnitId,
    pub spell: Option<&'s SpellInfo>,
    pub school_mask: SchoolMask,
    pub effect_type: DamageEffectType,
    pub attack_type: WeaponAttackType,
    pub coefficient: f32,
    pub stacks: u32,
    pub mechanic: Mechanic,
    pub can_crit: bool,
    /// White-swing outcome; decides crit, glancing, crushing and block itself.
    pub melee_outcome: Option<MeleeHitOutcome>,
    /// The hit roll came back as a block.
    pub blocked: bool,
}

impl<'s> HitSource<'s> {
    pub fn spell(
        attacker: Option<UnitId>,
        victim: UnitId,
        spell: &'s SpellInfo,
        effect_type: DamageEffectType,
    ) -> Self {
        Self {
            attacker,
            victim,
            spell: Some(spell),
            school_mask: spell.school_mask,
            effect_type,
            attack_type: spell.attack_type,
            coefficient: 0.0,
            stacks: 1,
            mechanic: spell.mechanic,
            can_crit: !spell.has_attribute(SpellAttributes::CANT_CRIT),
            melee_outcome: None,
            blocked: false,
        }
    }

    /// A white swing already rolled against the melee table.
    pub fn melee(
        attacker: UnitId,
        victim: UnitId,
        attack_type: WeaponAttackType,
        outcome: MeleeHitOutcome,
    ) -> Self {
        Self {
            attacker: Some(attacker),
            victim,
            spell: None,
            school_mask: SchoolMask::PHYSICAL,
            effect_type: DamageEffectType::Direct,
            attack_type,
            coefficient: 1.0,
            stacks: 1,
            mechanic: Mechanic::None,
            can_crit: true,
            melee_outcome: Some(outcome),
            blocked: outcome == MeleeHitOutcome::Block,
        }
    }

    #[must_use]
    pub fn with_coefficient(mut self, coefficient: f32) -> Self {
        self.coefficient = coefficient;
        self
    }

    #[must_use]
    pub fn with_stacks(mut self, stacks: u32) -> Self {
        self.stacks = stacks.max(1);
        self
    }

    /// Overrides the spell mechanic when the slot carries its own.
    #[must_use]
    pub fn with_mechanic(mut self, mechanic: Mechanic) -> Self {
        if mechanic != Mechanic::None {
            self.mechanic = mechanic;
        }
        self
    }

    /// Allows or forbids crits; a `CANT_CRIT` spell never crits.
    #[must_use]
    pub fn with_crit(mut self, can_crit: bool) -> Self {
        self.can_crit = can_crit && !self.spell.is_some_and(|s| s.has_attribute(SpellAttributes::CANT_CRIT));
        self
    }

    #[must_use]
    pub fn with_blocked(mut self, blocked: bool) -> Self {
        self.blocked = blocked;
        self
    }

    pub fn modifiers(&self) -> ModifierInput<'s> {
        ModifierInput {
            spell: self.spell,
            school_mask: self.school_mask,
            effect_type: self.effect_type,
            attack_type: self.attack_type,
            coefficient: self.coefficient,
            stacks: self.stacks,
            mechanic: self.mechanic,
        }
    }

    fn spell_id(&self) -> Option<SpellId> {
        self.spell.map(|s| s.id)
    }

    fn reduced_by_armor(&self) -> bool {
        self.school_mask.contains(SchoolMask::PHYSICAL) && self.mechanic != Mechanic::Bleed
    }
}

/// Damage before mitigation with crit and swing-outcome flags.
struct Bonused {
    amount: u32,
    critical: bool,
    flags: DamageLogFlags,
}

/// Runs done/taken bonuses and the crit decision.
fn bonused_damage(ctx: &mut CombatContext<'_>, source: &HitSource<'_>, base: u32) -> Option<Bonused> {
    let input = source.modifiers();
    let victim = ctx.world.unit(source.victim)?;
    let attacker = source.attacker.and_then(|a| ctx.world.unit(a));

    let mut amount = match attacker {
        Some(attacker) => modifiers::damage_bonus_done(attacker, victim, base, &input),
        None => base,
    };
    amount = modifiers::damage_bonus_taken(attacker, victim, amount, &input);

    let mut flags = DamageLogFlags::empty();
    let critical = match (source.melee_outcome, attacker) {
        (Some(outcome), _) => outcome == MeleeHitOutcome::Crit,
        (None, Some(attacker)) if source.can_crit => {
            let mut chance = modifiers::crit_chance(attacker, victim, &input);
            ctx.collab.hooks.crit_chance(attacker, victim, source.spell, &mut chance);
            let chance = chance.max(0.0);
            let roller = attacker.id;
            ctx.roll_chance(roller, roll_context::CRIT, chance)
        }
        _ => false,
    };

    if critical {
        let attacker = source.attacker.and_then(|a| ctx.world.unit(a));
        if let Some(attacker) = attacker {
            let doubled = modifiers::crit_damage(attacker, amount, &input);
            let multiplier = ctx.collab.hooks.crit_damage_multiplier(attacker, source.spell);
            let flat = ctx.collab.hooks.crit_flat_bonus(attacker, source.spell);
            amount = ((doubled as f32 * multiplier).max(0.0) as i64 + flat as i64).max(0) as u32;
        }
        flags |= DamageLogFlags::CRITICAL;
    }

    match source.melee_outcome {
        Some(MeleeHitOutcome::Glancing) => {
            amount = (amount as f32 * 0.75) as u32;
            flags |= DamageLogFlags::GLANCING;
        }
        Some(MeleeHitOutcome::Crushing) => {
            amount = (amount as f32 * 1.5) as u32;
            flags |= DamageLogFlags::CRUSHING;
        }
        _ => {}
    }
    Some(Bonused {
        amount,
        critical,
        flags,
    })
}

/// Resolves one damaging hit end to end and returns the final record.
///
/// Returns `None` when the victim is missing, dead or immune to the school;
/// immunity is logged as a miss.
pub fn damage_unit(ctx: &mut CombatContext<'_>, source: &HitSource<'_>, base: u32) -> Option<DamageInfo> {
    let victim = ctx.world.unit(source.victim)?;
    if !victim.is_alive() {
        return None;
    }
    if is_immune_to_damage(victim, source.school_mask, source.spell) {
        if let Some(attacker) = source.attacker {
            ctx.collab.log.record(CombatLogEntry::Miss {
                attacker,
                victim: source.victim,
                spell: source.spell_id(),
                result: SpellMissInfo::Immune,
            });
        }
        debug!(target: "combat::damage", victim = %source.victim, school = ?source.school_mask, "victim immune to damage");
        return None;
    }

    let Bonused {
        mut amount,
        critical,
        flags,
    } = bonused_damage(ctx, source, base)?;

    if source.reduced_by_armor() {
        let attacker = source.attacker.and_then(|a| ctx.world.unit(a));
        if let Some(victim) = ctx.world.unit(source.victim) {
            amount = armor_reduced_damage(attacker, victim, amount);
        }
    }

    let mut blocked = 0;
    if source.blocked && amount > 0 {
        let block_value = ctx.world.unit(source.victim).map_or(0, |v| v.stats.block_value);
        blocked = block_value.min(amount);
        amount -= blocked;
    }

    let hit = if critical { ProcHit::CRITICAL } else { ProcHit::NORMAL };
    let mut info = DamageInfo::new(
        source.attacker,
        source.victim,
        amount,
        source.spell_id(),
        source.school_mask,
        source.effect_type,
        source.attack_type,
    )
    .with_blocked(blocked)
    .with_hit_mask(hit);
    if blocked > 0 && amount == 0 {
        info.hit_mask |= ProcHit::FULL_BLOCK;
    }

    apply_resist(ctx, &mut info, source.spell);
    apply_absorbs(ctx, &mut info);
    apply_split_damage(ctx, &mut info, source.spell);

    let health_before = ctx.world.unit(source.victim).map_or(0, |v| v.health.current);
    let dealt = deal_damage(
        ctx,
        DealDamageRequest::new(source.attacker, source.victim, info.amount, source.effect_type)
            .with_school(source.school_mask)
            .with_spell(source.spell_id())
            .with_clean_damage(info.absorbed + info.resisted + info.blocked)
            .with_durability_loss(!source.effect_type.is_periodic()),
    );

    ctx.collab.log.record(CombatLogEntry::Damage(DamageLog {
        attacker: source.attacker,
        victim: source.victim,
        spell: source.spell_id(),
        amount: dealt,
        overkill: dealt.saturating_sub(health_before),
        school: source.school_mask,
        absorbed: info.absorbed,
        resisted: info.resisted,
        blocked: info.blocked,
        periodic: source.effect_type.is_periodic(),
        flags,
    }));
    trace!(
        target: "combat::damage",
        victim = %source.victim,
        original = info.original,
        absorbed = info.absorbed,
        resisted = info.resisted,
        dealt,
        critical,
        "damage resolved"
    );
    Some(info)
}

// ============================================================================
// Health loss
// ============================================================================

/// Raw damage handed to [`deal_damage`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct DealDamageRequest {
    pub attacker: Option<UnitId>,
    pub victim: UnitId,
    pub amount: u32,
    /// Damage mitigated before this point; engages combat even when `amount` is 0.
    pub clean_damage: u32,
    pub effect_type: DamageEffectType,
    pub school_mask: SchoolMask,
    pub spell: Option<SpellId>,
    pub durability_loss: bool,
}

impl DealDamageRequest {
    pub fn new(attacker: Option<UnitId>, victim: UnitId, amount: u32, effect_type: DamageEffectType) -> Self {
        Self {
            attacker,
            victim,
            amount,
            clean_damage: 0,
            effect_type,
            school_mask: SchoolMask::PHYSICAL,
            spell: None,
            durability_loss: false,
        }
    }

    #[must_use]
    pub fn with_school(mut self, school_mask: SchoolMask) -> Self {
        self.school_mask = school_mask;
        self
    }

    #[must_use]
    pub fn with_spell(mut self, spell: Option<SpellId>) -> Self {
        self.spell = spell;
        self
    }

    #[must_use]
    pub fn with_clean_damage(mut self, clean_damage: u32) -> Self {
        self.clean_damage = clean_damage;
        self
    }

    #[must_use]
    pub fn with_durability_loss(mut self, durability_loss: bool) -> Self {
        self.durability_loss = durability_loss;
        self
    }
}

/// Takes health from the victim, killing it if the hit is lethal.
///
/// Returns the damage committed after hooks, duel and death-prevention
/// adjustments.
pub fn deal_damage(ctx: &mut CombatContext<'_>, req: DealDamageRequest) -> u32 {
    let mut amount = req.amount;
    let victim_id = req.victim;
    {
        let Some(victim) = ctx.world.unit(victim_id).filter(|v| v.is_alive()) else {
            return 0;
        };
        let attacker = req.attacker.and_then(|a| ctx.world.unit(a));
        ctx.collab
            .hooks
            .damage_taken(victim, attacker, &mut amount, req.effect_type, req.spell);
        if let Some(attacker) = attacker {
            ctx.collab
                .hooks
                .damage_dealt(attacker, victim, &mut amount, req.effect_type, req.spell);
        }
    }

    let spell = req.spell.and_then(|id| ctx.spell(id));
    let breaks_auras = req.effect_type != DamageEffectType::SelfDamage
        && !spell.is_some_and(|s| s.has_attribute(SpellAttributes::DAMAGE_DOESNT_BREAK_AURAS));

    if req.effect_type != DamageEffectType::Shared && amount > 0 {
        if breaks_auras {
            aura::remove_auras_with_interrupt_flags(ctx, victim_id, AuraInterruptFlags::TAKE_DAMAGE, req.spell);
        }
        share_damage(ctx, &req, amount);
    }

    if amount == 0 {
        if req.clean_damage > 0 {
            engage(ctx, req.attacker, victim_id);
        }
        return 0;
    }

    let Some(health) = ctx.world.unit(victim_id).filter(|v| v.is_alive()).map(|v| v.health.current) else {
        return 0;
    };

    if amount >= health && is_duel_hit(ctx, req.attacker, victim_id) {
        amount = health.saturating_sub(1);
        end_duel(ctx, victim_id);
        debug!(target: "combat::damage", victim = %victim_id, "duel ended by a lethal hit");
    }

    if amount >= health {
        let prevented = apply_prevent_death(ctx, req.attacker, victim_id, amount, req.school_mask);
        amount -= prevented.min(amount);
    }

    let Some(health) = ctx.world.unit(victim_id).map(|v| v.health.current) else {
        return 0;
    };
    if amount >= health && health > 0 {
        kill(ctx, req.attacker, victim_id, req.spell);
        return amount;
    }
    if amount == 0 {
        return 0;
    }

    let config = ctx.config();
    if let Some(victim) = ctx.world.unit_mut(victim_id) {
        victim.health.current -= amount;
        victim.update_health_states(config.health_low_pct, config.health_mid_pct, config.health_high_pct);
    }

    let direct = !req.effect_type.is_periodic();
    if direct && breaks_auras {
        aura::remove_auras_with_interrupt_flags(ctx, victim_id, AuraInterruptFlags::DIRECT_DAMAGE, req.spell);
    }

    if let Some(attacker) = req.attacker.filter(|a| *a != victim_id) {
        let no_threat = spell.is_some_and(|s| s.has_attribute(SpellAttributes::NO_THREAT));
        if !no_threat && hostile(ctx, attacker, victim_id) {
            ctx.collab.threat.add_threat(victim_id, attacker, amount as f32, req.spell);
        }
    }
    engage(ctx, req.attacker, victim_id);

    if req.durability_loss {
        roll_durability(ctx, victim_id);
        if let Some(attacker) = req.attacker.filter(|a| *a != victim_id) {
            roll_durability(ctx, attacker);
        }
    }

    if direct && req.effect_type != DamageEffectType::Shared {
        spell::on_damage_taken(ctx, victim_id);
    }
    amount
}

/// Copies part of the victim's damage onto the casters of its share auras.
fn share_damage(ctx: &mut CombatContext<'_>, req: &DealDamageRequest, amount: u32) {
    let Some(victim) = ctx.world.unit(req.victim) else {
        return;
    };
    let shares: Vec<(UnitId, u32)> = victim
        .applied_effects(AuraType::ShareDamagePct)
        .filter(|(_, e)| aura::misc_school(e).intersects(req.school_mask))
        .filter_map(|(a, e)| a.caster.map(|c| (c, e.amount().clamp(0, 100) as u32)))
        .filter(|(caster, _)| *caster != req.victim)
        .collect();

    for (caster, pct) in shares {
        let share = (amount as u64 * pct as u64 / 100) as u32;
        if share == 0 || !ctx.world.unit(caster).is_some_and(Unit::is_alive) {
            continue;
        }
        let dealt = deal_damage(
            ctx,
            DealDamageRequest::new(req.attacker, caster, share, DamageEffectType::Shared)
                .with_school(req.school_mask)
                .with_spell(req.spell),
        );
        ctx.collab.log.record(CombatLogEntry::Damage(DamageLog {
            attacker: req.attacker,
            victim: caster,
            spell: req.spell,
            amount: dealt,
            overkill: 0,
            school: req.school_mask,
            absorbed: 0,
            resisted: 0,
            blocked: 0,
            periodic: false,
            flags: DamageLogFlags::SHARED,
        }));
    }
}

fn hostile(ctx: &CombatContext<'_>, a: UnitId, b: UnitId) -> bool {
    match (ctx.world.unit(a), ctx.world.unit(b)) {
        (Some(a), Some(b)) => ctx.env.is_hostile(a, b),
        _ => false,
    }
}

/// Puts both parties of a hostile action in combat.
pub(crate) fn engage(ctx: &mut CombatContext<'_>, attacker: Option<UnitId>, victim: UnitId) {
    let Some(attacker) = attacker.filter(|a| *a != victim) else {
        return;
    };
    if !hostile(ctx, attacker, victim) {
        return;
    }
    for id in [attacker, victim] {
        if let Some(unit) = ctx.world.unit_mut(id).filter(|u| u.is_alive()) {
            unit.state |= UnitStateFlags::IN_COMBAT;
        }
    }
}

/// Whether `attacker`, or the unit controlling it, is dueling `victim`.
fn is_duel_hit(ctx: &CombatContext<'_>, attacker: Option<UnitId>, victim: UnitId) -> bool {
    let Some(opponent) = ctx.world.unit(victim).and_then(|v| v.duel).map(|d| d.opponent) else {
        return false;
    };
    let Some(attacker) = attacker.and_then(|a| ctx.world.unit(a)) else {
        return false;
    };
    attacker.id == opponent || attacker.owner == Some(opponent)
}

fn end_duel(ctx: &mut CombatContext<'_>, loser: UnitId) {
    let opponent = ctx.world.unit_mut(loser).and_then(|u| u.duel.take()).map(|d| d.opponent);
    if let Some(unit) = opponent.and_then(|o| ctx.world.unit_mut(o)) {
        unit.duel = None;
    }
}

fn roll_durability(ctx: &mut CombatContext<'_>, unit: UnitId) {
    if !ctx.world.unit(unit).is_some_and(|u| u.kind == UnitKind::Player) {
        return;
    }
    let config = ctx.config();
    if ctx.roll_chance(unit, roll_context::DURABILITY, config.durability_loss_chance_pct) {
        ctx.collab.hooks.durability_loss(unit, config.durability_loss_pct);
    }
}

/// Death transition and everything that follows it.
fn kill(ctx: &mut CombatContext<'_>, killer: Option<UnitId>, victim: UnitId, spell: Option<SpellId>) {
    let config = ctx.config();
    let Some(unit) = ctx.world.unit_mut(victim) else {
        return;
    };
    unit.health.current = 0;
    unit.set_death_state(DeathState::JustDied);
    unit.update_health_states(config.health_low_pct, config.health_mid_pct, config.health_high_pct);
    debug!(target: "combat::damage", %victim, killer = ?killer, spell = ?spell, "unit killed");

    // death procs fire while the victim's auras are still attached
    if let Some(killer) = killer.filter(|k| *k != victim) {
        proc::dispatch(ctx, ProcRequest::new(killer, Some(victim), ProcFlags::KILL, ProcFlags::KILLED));
    }
    proc::dispatch(ctx, ProcRequest::new(victim, None, ProcFlags::DEATH, ProcFlags::empty()));

    aura::remove_auras_on_death(ctx, victim);
    if let Some(slots) = ctx.world.unit(victim).map(spell::active_slots) {
        for slot in slots {
            let _ = spell::interrupt_spell(ctx, victim, slot);
        }
    }
    if let Some(unit) = ctx.world.unit_mut(victim) {
        unit.state.remove(UnitStateFlags::IN_COMBAT);
    }
    ctx.collab.threat.clear(victim);
    ctx.collab.hooks.on_death(victim, killer);
    ctx.collab.log.record(CombatLogEntry::Death { victim, killer });
}

// ============================================================================
// Healing and power
// ============================================================================

/// Resolves one heal: bonuses, crit, then [`deal_heal`].
///
/// Returns `None` when the target is missing or dead.
pub fn heal_unit(ctx: &mut CombatContext<'_>, source: &HitSource<'_>, base: u32) -> Option<HealInfo> {
    let input = source.modifiers();
    let target = ctx.world.unit(source.victim).filter(|t| t.is_alive())?;
    let healer = source.attacker.and_then(|h| ctx.world.unit(h));

    let mut amount = match healer {
        Some(healer) => modifiers::heal_bonus_done(healer, base, &input),
        None => base,
    };
    amount = modifiers::heal_bonus_taken(target, amount, &input);

    let critical = match healer {
        Some(healer) if source.can_crit => {
            let mut chance = modifiers::crit_chance(healer, target, &input);
            ctx.collab.hooks.crit_chance(healer, target, source.spell, &mut chance);
            let id = healer.id;
            ctx.roll_chance(id, roll_context::CRIT, chance.max(0.0))
        }
        _ => false,
    };
    if critical {
        if let Some(healer) = source.attacker.and_then(|h| ctx.world.unit(h)) {
            amount = modifiers::heal_crit_amount(healer, amount);
        }
    }

    let mut heal = HealInfo::new(source.attacker, source.victim, amount, source.spell_id(), source.school_mask)
        .critical(critical)
        .periodic(source.effect_type.is_periodic());
    deal_heal(ctx, &mut heal);
    Some(heal)
}

/// Applies a heal: heal absorbs, clamp to missing health, log and assist threat.
/// Returns the health actually restored.
pub fn deal_heal(ctx: &mut CombatContext<'_>, heal: &mut HealInfo) -> u32 {
    apply_heal_absorbs(ctx, heal);
    let config = ctx.config();
    let Some(target) = ctx.world.unit_mut(heal.target).filter(|t| t.is_alive()) else {
        return 0;
    };
    let effective = heal.amount.min(target.health.missing());
    target.health.current += effective;
    heal.effective = effective;
    target.update_health_states(config.health_low_pct, config.health_mid_pct, config.health_high_pct);

    ctx.collab.log.record(CombatLogEntry::Heal(HealLog {
        healer: heal.healer,
        target: heal.target,
        spell: heal.spell,
        amount: heal.amount,
        overheal: heal.overheal(),
        absorbed: heal.absorbed,
        critical: heal.critical,
    }));

    if let Some(healer) = heal.healer.filter(|h| *h != heal.target) {
        if effective > 0 {
            let threat = effective as f32 * config.assist_threat_factor;
            ctx.collab.threat.assist_threat(heal.target, healer, threat, heal.spell);
        }
    }
    effective
}

/// Restores power of the target's own type. Returns the power gained.
pub fn energize(
    ctx: &mut CombatContext<'_>,
    caster: Option<UnitId>,
    target: UnitId,
    spell: Option<SpellId>,
    amount: u32,
) -> u32 {
    let Some(unit) = ctx.world.unit_mut(target).filter(|t| t.is_alive()) else {
        return 0;
    };
    let gained = amount.min(unit.power.missing());
    unit.power.current += gained;
    let power = unit.power_type;

    ctx.collab.log.record(CombatLogEntry::Energize {
        caster,
        target,
        spell,
        power,
        amount: gained,
    });
    if let Some(caster) = caster.filter(|c| *c != target) {
        if gained > 0 {
            let threat = gained as f32 * ctx.config().assist_threat_factor;
            ctx.collab.threat.assist_threat(target, caster, threat, spell);
        }
    }
    gained
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aura::AuraApplyRequest;
    use crate::testing::{Harness, SpellBuilder};
    use crate::types::SpellId;

    const BOLT: SpellId = SpellId(100);
    const SLEEP: SpellId = SpellId(101);

    fn harness() -> Harness {
        let mut harness = Harness::new();
        harness.add_spell(SpellBuilder::new(BOLT).school(SchoolMask::FIRE).magic().school_damage(30).build());
        harness.add_spell(
            SpellBuilder::new(SLEEP)
                .duration(-1)
                .aura_interrupt_flags(AuraInterruptFlags::TAKE_DAMAGE)
                .aura(AuraType::Dummy, 0)
                .build(),
        );
        harness
    }

    #[test]
    fn self_damage_does_not_break_auras() {
        let mut h = harness();
        let attacker = h.spawn(Unit::player(UnitId(1)).with_faction(1));
        let victim = h.spawn(Unit::creature(UnitId(2)).with_faction(2).with_health(100, 100));
        aura::apply_aura(&mut h.ctx(), &AuraApplyRequest::new(SLEEP, victim, Some(attacker))).expect("sleep applies");

        deal_damage(&mut h.ctx(), DealDamageRequest::new(Some(victim), victim, 10, DamageEffectType::SelfDamage));
        let unit = h.world.unit(victim).expect("victim");
        assert_eq!(unit.health.current, 90);
        assert!(unit.has_aura(SLEEP));

        deal_damage(&mut h.ctx(), DealDamageRequest::new(Some(attacker), victim, 10, DamageEffectType::Direct));
        assert!(h.world.unit(victim).is_some_and(|u| !u.has_aura(SLEEP)));
    }

    #[test]
    fn non_lethal_hit_commits_health_and_threat() {
        let mut h = harness();
        let attacker = h.spawn(Unit::player(UnitId(1)).with_faction(1));
        let victim = h.spawn(Unit::creature(UnitId(2)).with_faction(2).with_health(50, 100));
        let spell = h.spells.get(BOLT).cloned().expect("bolt");

        let mut ctx = h.ctx();
        let source = HitSource::spell(Some(attacker), victim, &spell, DamageEffectType::SpellDirect);
        let info = damage_unit(&mut ctx, &source, 30).expect("hit lands");
        drop(ctx);

        assert_eq!(info.amount, 30);
        assert_eq!(h.world.unit(victim).map(|u| u.health.current), Some(20));
        assert_eq!(h.threat.total(victim, attacker), 30.0);
        assert!(h.world.unit(victim).is_some_and(Unit::is_in_combat));
    }

    #[test]
    fn lethal_hit_kills_and_logs_death() {
        let mut h = harness();
        let attacker = h.spawn(Unit::player(UnitId(1)).with_faction(1));
        let victim = h.spawn(Unit::creature(UnitId(2)).with_faction(2).with_health(5, 100));

        let dealt = deal_damage(
            &mut h.ctx(),
            DealDamageRequest::new(Some(attacker), victim, 50, DamageEffectType::Direct),
        );
        assert_eq!(dealt, 50);
        let unit = h.world.unit(victim).expect("victim");
        assert_eq!(unit.health.current, 0);
        assert_eq!(unit.death_state(), DeathState::JustDied);
        assert!(h.log.iter().any(|e| matches!(e, CombatLogEntry::Death { victim: v, .. } if *v == victim)));
    }

    #[test]
    fn duel_hit_leaves_one_health() {
        let mut h = harness();
        let a = h.spawn(Unit::player(UnitId(1)).with_faction(1));
        let b = h.spawn(Unit::player(UnitId(2)).with_faction(2).with_health(10, 100));
        h.world.start_duel(a, b);

        let dealt = deal_damage(&mut h.ctx(), DealDamageRequest::new(Some(a), b, 40, DamageEffectType::Direct));
        assert_eq!(dealt, 9);
        let unit = h.world.unit(b).expect("b");
        assert_eq!(unit.health.current, 1);
        assert!(unit.is_alive());
        assert!(unit.duel.is_none());
    }

    #[test]
    fn zero_damage_still_engages_on_mitigation() {
        let mut h = harness();
        let a = h.spawn(Unit::player(UnitId(1)).with_faction(1));
        let b = h.spawn(Unit::creature(UnitId(2)).with_faction(2));

        let dealt = deal_damage(
            &mut h.ctx(),
            DealDamageRequest::new(Some(a), b, 0, DamageEffectType::Direct).with_clean_damage(12),
        );
        assert_eq!(dealt, 0);
        assert!(h.world.unit(b).is_some_and(Unit::is_in_combat));
        assert_eq!(h.world.unit(b).map(|u| u.health.current), Some(100));
    }

    #[test]
    fn heal_clamps_to_missing_health_and_assists() {
        let mut h = harness();
        let healer = h.spawn(Unit::player(UnitId(1)));
        let target = h.spawn(Unit::player(UnitId(2)).with_health(90, 100));

        let mut heal = HealInfo::new(Some(healer), target, 25, None, SchoolMask::HOLY);
        let restored = deal_heal(&mut h.ctx(), &mut heal);
        assert_eq!(restored, 10);
        assert_eq!(heal.overheal(), 15);
        assert_eq!(h.threat.assisted(target, healer), 5.0);
    }

    #[test]
    fn energize_fills_own_power_type() {
        let mut h = harness();
        let target = h.spawn(Unit::player(UnitId(1)).with_power(crate::types::PowerType::Rage, 90, 100));
        let gained = energize(&mut h.ctx(), None, target, None, 30);
        assert_eq!(gained, 10);
        assert_eq!(h.world.unit(target).map(|u| u.power.current), Some(100));
    }
}
