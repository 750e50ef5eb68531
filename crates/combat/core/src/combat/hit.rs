//! Hit resolution: one roll against a table of cumulative chances.
//!
//! Tables are built from unit state by pure functions so they can be checked
//! without a world; the `*_result` functions add the roll.

use arrayvec::ArrayVec;

use super::info::{MeleeHitOutcome, SpellMissInfo};
use super::modifiers;
use crate::aura::{AuraType, ignore_result};
use crate::config::CombatConfig;
use crate::env::{CombatEnv, roll_context};
use crate::immunity::is_immune_to_spell;
use crate::spell::{SpellAttributes, SpellInfo};
use crate::types::{DamageClass, SchoolMask, UnitKind, WeaponAttackType};
use crate::unit::{Unit, UnitStateFlags};
use crate::world::CombatContext;

/// Ordered outcomes with their chances in basis points.
///
/// A roll resolves to the first outcome whose cumulative threshold is at
/// least the roll; outcomes with zero chance never match.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RollTable<T> {
    steps: ArrayVec<(T, u32), 8>,
}

impl<T: Copy> Default for RollTable<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Copy> RollTable<T> {
    pub fn new() -> Self {
        Self {
            steps: ArrayVec::new(),
        }
    }

    /// Appends an outcome. Zero chances are dropped.
    pub fn push(&mut self, outcome: T, chance_bp: u32) {
        if chance_bp > 0 && !self.steps.is_full() {
            self.steps.push((outcome, chance_bp));
        }
    }

    pub fn resolve(&self, roll: u32, fallback: T) -> T {
        let mut threshold = 0u32;
        for &(outcome, chance) in &self.steps {
            threshold = threshold.saturating_add(chance);
            if roll <= threshold {
                return outcome;
            }
        }
        fallback
    }

    /// Chance of one outcome, as pushed.
    pub fn chance_of(&self, outcome: T) -> u32
    where
        T: PartialEq,
    {
        self.steps
            .iter()
            .filter(|(o, _)| *o == outcome)
            .map(|(_, c)| *c)
            .sum()
    }
}

/// Percent to basis points, negative chances count as zero.
#[inline]
fn bp(pct: f32) -> u32 {
    (pct.max(0.0) * 100.0).round() as u32
}

// ============================================================================
// Avoidance chances
// ============================================================================

/// Base melee miss: 5% plus 1% per level the victim is above the attacker,
/// less the attacker's hit bonus.
pub fn melee_miss_chance(attacker: &Unit, victim: &Unit) -> f32 {
    let level_diff = victim.level as i32 - attacker.level as i32;
    let chance = 5.0 + level_diff.max(0) as f32 - attacker.stats.hit_chance;
    chance.clamp(0.0, 60.0)
}

pub fn dodge_chance(victim: &Unit) -> f32 {
    victim.stats.dodge_chance + victim.total_aura_modifier(AuraType::ModDodgePercent) as f32
}

pub fn parry_chance(victim: &Unit) -> f32 {
    if !victim.stats.can_parry {
        return 0.0;
    }
    victim.stats.parry_chance + victim.total_aura_modifier(AuraType::ModParryPercent) as f32
}

pub fn block_chance(victim: &Unit) -> f32 {
    if !victim.stats.can_block {
        return 0.0;
    }
    victim.stats.block_chance + victim.total_aura_modifier(AuraType::ModBlockPercent) as f32
}

/// Highest mechanic resistance the victim has against any mechanic of the spell.
fn mechanic_resist_chance(victim: &Unit, spell: &SpellInfo) -> f32 {
    let mask = spell.mechanic_mask(spell.all_effects_mask());
    victim
        .applied_effects(AuraType::ModMechanicResistance)
        .filter(|(_, e)| (0..64).contains(&e.misc_value) && mask.0 & (1u64 << e.misc_value) != 0)
        .map(|(_, e)| e.amount())
        .max()
        .unwrap_or(0) as f32
}

fn deflect_chance(victim: &Unit) -> f32 {
    victim.total_aura_modifier(AuraType::DeflectSpells) as f32
}

/// Outcomes the attacker's `IgnoreCombatResult` auras rule out for `spell`.
fn ignored_results(attacker: &Unit, spell: &SpellInfo) -> i32 {
    attacker
        .applied_effects(AuraType::IgnoreCombatResult)
        .filter(|(_, e)| e.misc_value_b == 0 || e.misc_value_b as u32 == spell.family)
        .fold(0, |bits, (_, e)| bits | e.misc_value)
}

// ============================================================================
// Tables
// ============================================================================

/// Miss, resist, deflect (ranged), dodge, parry, block for a melee or ranged
/// spell effect.
pub fn melee_spell_hit_table(
    env: &CombatEnv<'_>,
    attacker: &Unit,
    victim: &Unit,
    spell: &SpellInfo,
) -> RollTable<SpellMissInfo> {
    let mut table = RollTable::new();
    table.push(SpellMissInfo::Miss, bp(melee_miss_chance(attacker, victim)));
    table.push(SpellMissInfo::Resist, bp(mechanic_resist_chance(victim, spell)));

    if spell.has_attribute(SpellAttributes::IMPOSSIBLE_DODGE_PARRY_BLOCK) {
        return table;
    }

    let in_front = env.in_frontal_arc(victim, attacker);
    let ignores_direction = victim.has_aura_type(AuraType::IgnoreHitDirection);

    if spell.damage_class == DamageClass::Ranged {
        if !victim.is_controlled() && (in_front || ignores_direction) {
            table.push(SpellMissInfo::Deflect, bp(deflect_chance(victim)));
        }
        return table;
    }

    let mut can_dodge = true;
    let mut can_parry = true;
    let mut can_block = spell.has_attribute(SpellAttributes::BLOCKABLE);

    if victim.is_casting_non_melee() || victim.is_controlled() {
        can_dodge = false;
        can_parry = false;
        can_block = false;
    }

    if !in_front && !ignores_direction {
        if victim.kind == UnitKind::Player {
            can_dodge = false;
        }
        can_parry = false;
        can_block = false;
    }

    let ignored = ignored_results(attacker, spell);
    if ignored & ignore_result::DODGE != 0 {
        can_dodge = false;
    }
    if ignored & ignore_result::PARRY != 0 {
        can_parry = false;
    }
    if ignored & ignore_result::BLOCK != 0 {
        can_block = false;
    }

    if can_dodge {
        table.push(SpellMissInfo::Dodge, bp(dodge_chance(victim)));
    }
    if can_parry {
        table.push(SpellMissInfo::Parry, bp(parry_chance(victim)));
    }
    if can_block {
        table.push(SpellMissInfo::Block, bp(block_chance(victim)));
    }
    table
}

/// Level-difference hit chance in basis points for a magic spell.
pub fn magic_hit_chance(caster: &Unit, victim: &Unit, school: SchoolMask) -> u32 {
    let level_diff = victim.level as i32 - caster.level as i32;
    let per_level = if victim.kind == UnitKind::Player { 7 } else { 11 };
    let mut hit_pct = if level_diff < 3 {
        96 - level_diff
    } else {
        94 - (level_diff - 2) * per_level
    };
    hit_pct += victim.total_aura_modifier_by_school(AuraType::ModAttackerSpellHitChance, school);
    hit_pct += caster.total_aura_modifier_by_school(AuraType::ModSpellHitChance, school);

    let hit_bp = hit_pct as f32 * 100.0 + caster.stats.spell_hit_chance * 100.0;
    (hit_bp.round() as i64).clamp(100, 10_000) as u32
}

/// Miss, mechanic resist and deflect for a magic spell.
pub fn magic_spell_hit_table(
    env: &CombatEnv<'_>,
    caster: &Unit,
    victim: &Unit,
    spell: &SpellInfo,
) -> RollTable<SpellMissInfo> {
    let mut table = RollTable::new();
    table.push(
        SpellMissInfo::Miss,
        10_000 - magic_hit_chance(caster, victim, spell.school_mask),
    );
    table.push(SpellMissInfo::Resist, bp(mechanic_resist_chance(victim, spell)));
    if !victim.is_controlled()
        && (env.in_frontal_arc(victim, caster) || victim.has_aura_type(AuraType::IgnoreHitDirection))
    {
        table.push(SpellMissInfo::Deflect, bp(deflect_chance(victim)));
    }
    table
}

/// Glancing chance in percent for a white swing, zero when not applicable.
fn glancing_chance(attacker: &Unit, victim: &Unit, attack_type: WeaponAttackType) -> f32 {
    if !attacker.player_controlled
        || victim.player_controlled
        || attack_type == WeaponAttackType::RangedAttack
    {
        return 0.0;
    }
    let level_diff = (victim.level as i32 - attacker.level as i32).min(3);
    (10.0 + level_diff as f32 * 5.0).clamp(0.0, 40.0)
}

/// Crushing chance in percent for a creature at least four levels above its victim.
fn crushing_chance(attacker: &Unit, victim: &Unit, attack_type: WeaponAttackType) -> f32 {
    if attacker.player_controlled || attack_type == WeaponAttackType::RangedAttack {
        return 0.0;
    }
    let level_diff = attacker.level as i32 - victim.level as i32;
    if level_diff < 4 {
        return 0.0;
    }
    (level_diff as f32 * 10.0 - 15.0).max(0.0)
}

/// White-swing table: miss, dodge, parry, block, glancing, crit, crushing.
pub fn melee_outcome_table(
    env: &CombatEnv<'_>,
    attacker: &Unit,
    victim: &Unit,
    attack_type: WeaponAttackType,
    crit_chance: f32,
) -> RollTable<MeleeHitOutcome> {
    let mut table = RollTable::new();
    table.push(MeleeHitOutcome::Miss, bp(melee_miss_chance(attacker, victim)));

    let in_front = env.in_frontal_arc(victim, attacker) || victim.has_aura_type(AuraType::IgnoreHitDirection);
    let avoids = !victim.is_controlled() && attack_type != WeaponAttackType::RangedAttack;

    if avoids && (in_front || victim.kind != UnitKind::Player) {
        table.push(MeleeHitOutcome::Dodge, bp(dodge_chance(victim)));
    }
    if avoids && in_front {
        table.push(MeleeHitOutcome::Parry, bp(parry_chance(victim)));
    }
    table.push(
        MeleeHitOutcome::Glancing,
        bp(glancing_chance(attacker, victim, attack_type)),
    );
    if avoids && in_front {
        table.push(MeleeHitOutcome::Block, bp(block_chance(victim)));
    }
    table.push(MeleeHitOutcome::Crit, bp(crit_chance));
    table.push(
        MeleeHitOutcome::Crushing,
        bp(crushing_chance(attacker, victim, attack_type)),
    );
    table
}

// ============================================================================
// Rolls
// ============================================================================

pub fn melee_spell_hit_result(
    ctx: &mut CombatContext<'_>,
    attacker: &Unit,
    victim: &Unit,
    spell: &SpellInfo,
) -> SpellMissInfo {
    let table = melee_spell_hit_table(&ctx.env, attacker, victim, spell);
    let roll = ctx.roll_basis_points(attacker.id, roll_context::HIT);
    table.resolve(roll.min(CombatConfig::ROLL_MAX), SpellMissInfo::None)
}

pub fn magic_spell_hit_result(
    ctx: &mut CombatContext<'_>,
    caster: &Unit,
    victim: &Unit,
    spell: &SpellInfo,
) -> SpellMissInfo {
    let table = magic_spell_hit_table(&ctx.env, caster, victim, spell);
    let roll = ctx.roll_basis_points(caster.id, roll_context::HIT);
    table.resolve(roll.min(CombatConfig::ROLL_MAX), SpellMissInfo::None)
}

/// Full hit resolution for one spell against one victim.
///
/// Immunity and evade short-circuit; beneficial spells on friends and spells
/// on oneself always land.
pub fn spell_hit_result(
    ctx: &mut CombatContext<'_>,
    caster: &Unit,
    victim: &Unit,
    spell: &SpellInfo,
) -> SpellMissInfo {
    if is_immune_to_spell(victim, spell) {
        return SpellMissInfo::Immune;
    }
    if caster.id == victim.id || (spell.is_positive() && !ctx.env.is_hostile(caster, victim)) {
        return SpellMissInfo::None;
    }
    if victim.has_unit_state(UnitStateFlags::EVADING) {
        return SpellMissInfo::Evade;
    }
    match spell.damage_class {
        DamageClass::Melee | DamageClass::Ranged => {
            melee_spell_hit_result(ctx, caster, victim, spell)
        }
        DamageClass::Magic => magic_spell_hit_result(ctx, caster, victim, spell),
        DamageClass::None => SpellMissInfo::None,
    }
}

/// Rolls the outcome of one white swing.
pub fn roll_melee_outcome(
    ctx: &mut CombatContext<'_>,
    attacker: &Unit,
    victim: &Unit,
    attack_type: WeaponAttackType,
) -> MeleeHitOutcome {
    if victim.has_unit_state(UnitStateFlags::EVADING) {
        return MeleeHitOutcome::Evade;
    }
    let input = modifiers::ModifierInput::melee(attack_type);
    let mut crit = modifiers::crit_chance(attacker, victim, &input);
    ctx.collab.hooks.crit_chance(attacker, victim, None, &mut crit);
    let table = melee_outcome_table(&ctx.env, attacker, victim, attack_type, crit.max(0.0));
    let roll = ctx.roll_basis_points(attacker.id, roll_context::MELEE_TABLE);
    table.resolve(roll.min(CombatConfig::ROLL_MAX), MeleeHitOutcome::Normal)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aura::{Aura, AuraApplication, AuraEffect};
    use crate::config::CombatConfig;
    use crate::types::{AuraId, SpellId, UnitId};

    fn attach(unit: &mut Unit, aura_type: AuraType, amount: i32, misc: i32) {
        let id = AuraId(unit.owned_auras.len() as u64 + 1);
        let mut aura = Aura::new(id, SpellId(900), unit.id, None);
        let mut effect = AuraEffect::new(0, aura_type, amount);
        effect.misc_value = misc;
        aura.set_effect(effect);
        let mut app = AuraApplication::new(id, unit.id, true);
        app.set_effect_applied(0);
        unit.owned_auras.insert(id, aura);
        unit.applied_auras.insert(id, app);
    }

    fn melee_spell() -> SpellInfo {
        SpellInfo {
            id: SpellId(1),
            damage_class: DamageClass::Melee,
            attributes: SpellAttributes::BLOCKABLE,
            ..SpellInfo::default()
        }
    }

    #[test]
    fn roll_resolves_inclusively_against_cumulative_thresholds() {
        let mut table = RollTable::new();
        table.push(SpellMissInfo::Miss, 500);
        assert_eq!(table.resolve(9_999, SpellMissInfo::None), SpellMissInfo::None);
        assert_eq!(table.resolve(500, SpellMissInfo::None), SpellMissInfo::Miss);
        assert_eq!(table.resolve(501, SpellMissInfo::None), SpellMissInfo::None);

        table.push(SpellMissInfo::Dodge, 1_000);
        assert_eq!(table.resolve(1_500, SpellMissInfo::None), SpellMissInfo::Dodge);
        assert_eq!(table.resolve(1_501, SpellMissInfo::None), SpellMissInfo::None);
    }

    #[test]
    fn zero_chance_steps_are_skipped() {
        let mut table = RollTable::new();
        table.push(SpellMissInfo::Miss, 0);
        table.push(SpellMissInfo::Dodge, 200);
        assert_eq!(table.resolve(0, SpellMissInfo::None), SpellMissInfo::Dodge);
    }

    #[test]
    fn controlled_victims_cannot_avoid() {
        let config = CombatConfig::default();
        let env = CombatEnv::new(&config);
        let attacker = Unit::player(UnitId(1));
        let mut victim = Unit::creature(UnitId(2));
        victim.stats.dodge_chance = 10.0;
        victim.stats.parry_chance = 10.0;

        let table = melee_spell_hit_table(&env, &attacker, &victim, &melee_spell());
        assert_eq!(table.chance_of(SpellMissInfo::Dodge), 1_000);

        victim.state |= UnitStateFlags::STUNNED;
        let table = melee_spell_hit_table(&env, &attacker, &victim, &melee_spell());
        assert_eq!(table.chance_of(SpellMissInfo::Dodge), 0);
        assert_eq!(table.chance_of(SpellMissInfo::Parry), 0);
        assert_eq!(table.chance_of(SpellMissInfo::Miss), 500);
    }

    #[test]
    fn ignore_combat_result_disables_single_outcomes() {
        let config = CombatConfig::default();
        let env = CombatEnv::new(&config);
        let mut attacker = Unit::player(UnitId(1));
        let mut victim = Unit::creature(UnitId(2));
        victim.stats.dodge_chance = 5.0;
        victim.stats.parry_chance = 5.0;
        attach(&mut attacker, AuraType::IgnoreCombatResult, 0, ignore_result::DODGE);

        let table = melee_spell_hit_table(&env, &attacker, &victim, &melee_spell());
        assert_eq!(table.chance_of(SpellMissInfo::Dodge), 0);
        assert_eq!(table.chance_of(SpellMissInfo::Parry), 500);
    }

    #[test]
    fn ranged_spells_only_deflect() {
        let config = CombatConfig::default();
        let env = CombatEnv::new(&config);
        let attacker = Unit::player(UnitId(1));
        let mut victim = Unit::creature(UnitId(2));
        victim.stats.dodge_chance = 5.0;
        attach(&mut victim, AuraType::DeflectSpells, 20, 0);

        let spell = SpellInfo {
            damage_class: DamageClass::Ranged,
            ..melee_spell()
        };
        let table = melee_spell_hit_table(&env, &attacker, &victim, &spell);
        assert_eq!(table.chance_of(SpellMissInfo::Deflect), 2_000);
        assert_eq!(table.chance_of(SpellMissInfo::Dodge), 0);
    }

    #[test]
    fn magic_hit_falls_off_past_two_levels() {
        let caster = Unit::player(UnitId(1)).with_level(80);
        let same = Unit::creature(UnitId(2)).with_level(80);
        let boss = Unit::creature(UnitId(3)).with_level(83);
        assert_eq!(magic_hit_chance(&caster, &same, SchoolMask::FIRE), 9_600);
        assert_eq!(magic_hit_chance(&caster, &boss, SchoolMask::FIRE), 8_300);
    }

    #[test]
    fn glancing_only_for_players_against_creatures() {
        let config = CombatConfig::default();
        let env = CombatEnv::new(&config);
        let player = Unit::player(UnitId(1)).with_level(60);
        let creature = Unit::creature(UnitId(2)).with_level(63);
        let table = melee_outcome_table(&env, &player, &creature, WeaponAttackType::BaseAttack, 0.0);
        assert_eq!(table.chance_of(MeleeHitOutcome::Glancing), 2_500);

        let table = melee_outcome_table(&env, &creature, &player, WeaponAttackType::BaseAttack, 0.0);
        assert_eq!(table.chance_of(MeleeHitOutcome::Glancing), 0);
    }
}
