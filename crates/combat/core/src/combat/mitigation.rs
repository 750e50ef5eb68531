//! Armor, resistance, absorb shields and damage splitting.

use tracing::trace;

use super::damage::{DealDamageRequest, deal_damage};
use super::info::{DamageInfo, HealInfo};
use crate::aura::{self, AuraRemoveMode, AuraType};
use crate::env::roll_context;
use crate::immunity::is_immune_to_damage;
use crate::log::{CombatLogEntry, DamageLog, DamageLogFlags};
use crate::spell::{SpellAttributes, SpellInfo};
use crate::types::{AuraId, DamageEffectType, SchoolMask, SpellId, UnitId};
use crate::unit::Unit;
use crate::world::CombatContext;

// ============================================================================
// Armor
// ============================================================================

/// Victim armor after the attacker's penetration, never negative.
pub fn effective_armor(attacker: Option<&Unit>, victim: &Unit) -> f32 {
    let mut armor = victim.stats.armor as f32
        + victim.total_aura_modifier_by_school(AuraType::ModResistance, SchoolMask::PHYSICAL) as f32;
    if let Some(attacker) = attacker {
        armor += attacker
            .total_aura_modifier_by_school(AuraType::ModTargetResistance, SchoolMask::PHYSICAL)
            as f32;
    }
    armor.max(0.0)
}

/// Physical damage after armor. Reduction is capped at 75% and a non-zero
/// hit never drops below 1.
pub fn armor_reduced_damage(attacker: Option<&Unit>, victim: &Unit, damage: u32) -> u32 {
    if damage == 0 {
        return 0;
    }
    let armor = effective_armor(attacker, victim);
    let level = attacker.map_or(victim.level, |a| a.level) as f32;
    let divisor = if level < 60.0 {
        armor + 400.0 + 85.0 * level
    } else {
        armor + 467.5 * level - 22_167.5
    };
    let reduction = if divisor > 0.0 {
        (armor / divisor).clamp(0.0, 0.75)
    } else {
        0.0
    };
    ((damage as f32 * (1.0 - reduction)).round() as u32).max(1)
}

// ============================================================================
// Resistance
// ============================================================================

/// Lowest resistance the victim has among the schools of `school_mask`,
/// after the attacker's penetration.
pub fn victim_resistance(attacker: Option<&Unit>, victim: &Unit, school_mask: SchoolMask) -> i32 {
    school_mask
        .schools()
        .map(|school| {
            let mut value = victim.stats.resistances[school.index()]
                + victim.total_aura_modifier_by_school(AuraType::ModResistance, school.mask());
            if let Some(attacker) = attacker {
                value += attacker.total_aura_modifier_by_school(AuraType::ModTargetResistance, school.mask());
            }
            value.max(0)
        })
        .min()
        .unwrap_or(0)
}

/// Expected fraction of damage resisted.
pub fn average_resist_reduction(attacker: Option<&Unit>, victim: &Unit, school_mask: SchoolMask) -> f32 {
    const BOSS_LEVEL: u32 = 83;
    const BOSS_RESISTANCE_CONSTANT: f32 = 510.0;

    let resistance = victim_resistance(attacker, victim, school_mask) as f32;
    let constant = if victim.level == BOSS_LEVEL {
        BOSS_RESISTANCE_CONSTANT
    } else {
        victim.level as f32 * 5.0
    };
    if resistance + constant <= 0.0 {
        return 0.0;
    }
    (resistance / (resistance + constant)).clamp(0.0, 1.0)
}

/// Probability of each tenth (0%, 10%, ... 100%) being resisted.
pub fn resist_distribution(average: f32) -> [f32; 11] {
    let mut odds = [0.0; 11];
    if average <= 0.1 {
        odds[0] = 1.0 - 7.5 * average;
        odds[1] = 5.0 * average;
        odds[2] = 2.5 * average;
    } else {
        for (tenth, chance) in odds.iter_mut().enumerate() {
            *chance = (0.5 - 2.5 * (0.1 * tenth as f32 - average).abs()).max(0.0);
        }
    }
    odds
}

/// Number of tenths resisted for one roll in basis points.
pub fn resisted_tenths(average: f32, roll_bp: u32) -> u32 {
    let roll = roll_bp as f32 / 10_000.0;
    let mut sum = 0.0;
    for (tenth, chance) in resist_distribution(average).iter().enumerate() {
        sum += chance;
        if roll < sum {
            return tenth as u32;
        }
    }
    0
}

fn resists_apply(school_mask: SchoolMask, spell: Option<&SpellInfo>) -> bool {
    if school_mask.contains(SchoolMask::PHYSICAL) || school_mask.is_empty() {
        return false;
    }
    !spell.is_some_and(|s| {
        s.has_attribute(SpellAttributes::BINARY) || s.has_attribute(SpellAttributes::IGNORE_RESISTANCES)
    })
}

/// Rolls a partial resist and moves it into `info.resisted`.
pub(crate) fn apply_resist(ctx: &mut CombatContext<'_>, info: &mut DamageInfo, spell: Option<&SpellInfo>) {
    if info.amount == 0 || !resists_apply(info.school_mask, spell) {
        return;
    }
    let average = {
        let attacker = info.attacker.and_then(|a| ctx.world.unit(a));
        let Some(victim) = ctx.world.unit(info.victim) else {
            return;
        };
        average_resist_reduction(attacker, victim, info.school_mask)
    };
    if average <= 0.0 {
        return;
    }
    let roll = ctx.roll_basis_points(info.victim, roll_context::RESIST);
    let tenths = resisted_tenths(average, roll);
    let resisted = info.amount as u64 * tenths as u64 / 10;
    info.resist(resisted as u32);

    if info.amount == 0 && info.resisted > 0 {
        ctx.collab.log.record(CombatLogEntry::Resist {
            caster: info.attacker,
            target: info.victim,
            spell: info.spell,
        });
    }
    trace!(target: "combat::damage", victim = %info.victim, average, tenths, resisted = info.resisted, "resist rolled");
}

// ============================================================================
// Absorbs
// ============================================================================

/// `(aura, slot, caster, spell, remaining)` of every shield of `aura_type`
/// matching `school`, in application order.
fn shields(
    unit: &Unit,
    aura_type: AuraType,
    school: SchoolMask,
) -> Vec<(AuraId, usize, Option<UnitId>, SpellId, u32)> {
    unit.applied_effects(aura_type)
        .filter(|(_, e)| aura::misc_school(e).intersects(school))
        .map(|(a, e)| (a.id, e.slot, a.caster, a.spell, e.amount().max(0) as u32))
        .collect()
}

/// Drains shields of `aura_type` on `owner` by up to `incoming`.
/// Returns `(total absorbed, per-shield amounts)`; exhausted shields are removed.
fn drain_shields(
    ctx: &mut CombatContext<'_>,
    owner: UnitId,
    aura_type: AuraType,
    school: SchoolMask,
    mut incoming: u32,
) -> Vec<(Option<UnitId>, SpellId, u32)> {
    let Some(unit) = ctx.world.unit(owner) else {
        return Vec::new();
    };
    let mut drained = Vec::new();
    for (id, slot, caster, spell, remaining) in shields(unit, aura_type, school) {
        if incoming == 0 {
            break;
        }
        let taken = remaining.min(incoming);
        if taken == 0 {
            continue;
        }
        incoming -= taken;
        let left = remaining - taken;
        match ctx.world.unit_mut(owner).and_then(|u| u.aura_mut(id)) {
            Some(aura) if !aura.is_removing() => aura.set_effect_amount(slot, left as i32),
            _ => continue,
        }
        drained.push((caster, spell, taken));
        if left == 0 {
            aura::remove_aura(ctx, owner, id, AuraRemoveMode::EnemySpell);
        }
    }
    drained
}

/// Consumes absorb shields on the victim.
pub(crate) fn apply_absorbs(ctx: &mut CombatContext<'_>, info: &mut DamageInfo) {
    if info.amount == 0 {
        return;
    }
    let drained = drain_shields(ctx, info.victim, AuraType::SchoolAbsorb, info.school_mask, info.amount);
    for (caster, spell, amount) in drained {
        let absorbed = info.absorb(amount);
        ctx.collab.log.record(CombatLogEntry::Absorb {
            attacker: info.attacker,
            victim: info.victim,
            caster,
            absorbing_spell: spell,
            amount: absorbed,
        });
    }
}

/// Consumes shields that only engage on a lethal hit, leaving the victim at 1 health.
/// Returns the damage prevented.
pub(crate) fn apply_prevent_death(
    ctx: &mut CombatContext<'_>,
    attacker: Option<UnitId>,
    victim: UnitId,
    amount: u32,
    school: SchoolMask,
) -> u32 {
    let Some(health) = ctx.world.unit(victim).map(|u| u.health.current) else {
        return 0;
    };
    if amount < health {
        return 0;
    }
    let excess = amount - health.saturating_sub(1);
    let drained = drain_shields(ctx, victim, AuraType::PreventDeath, school, excess);
    let mut prevented = 0;
    for (caster, spell, taken) in drained {
        prevented += taken;
        ctx.collab.log.record(CombatLogEntry::Absorb {
            attacker,
            victim,
            caster,
            absorbing_spell: spell,
            amount: taken,
        });
    }
    prevented
}

/// Consumes heal-absorb shields on the heal target.
pub(crate) fn apply_heal_absorbs(ctx: &mut CombatContext<'_>, heal: &mut HealInfo) {
    if heal.amount == 0 {
        return;
    }
    let drained = drain_shields(ctx, heal.target, AuraType::SchoolHealAbsorb, heal.school_mask, heal.amount);
    for (_, _, amount) in drained {
        heal.absorb(amount);
    }
}

// ============================================================================
// Split
// ============================================================================

/// Moves part of the victim's damage onto the casters of its split auras.
pub(crate) fn apply_split_damage(ctx: &mut CombatContext<'_>, info: &mut DamageInfo, spell: Option<&SpellInfo>) {
    if info.amount == 0 {
        return;
    }
    let Some(victim) = ctx.world.unit(info.victim) else {
        return;
    };
    let splits: Vec<(UnitId, u32)> = victim
        .applied_effects(AuraType::SplitDamagePct)
        .filter(|(_, e)| aura::misc_school(e).intersects(info.school_mask))
        .filter_map(|(a, e)| a.caster.map(|c| (c, e.amount().clamp(0, 100) as u32)))
        .filter(|(caster, _)| *caster != info.victim)
        .collect();

    for (caster, pct) in splits {
        if info.amount == 0 {
            break;
        }
        let eligible = ctx
            .world
            .unit(caster)
            .is_some_and(|c| c.is_alive() && !is_immune_to_damage(c, info.school_mask, spell));
        if !eligible {
            continue;
        }
        let split = (info.amount as u64 * pct as u64 / 100) as u32;
        let moved = info.absorb(split);
        if moved == 0 {
            continue;
        }
        let dealt = deal_damage(
            ctx,
            DealDamageRequest::new(info.attacker, caster, moved, DamageEffectType::Shared)
                .with_school(info.school_mask)
                .with_spell(info.spell),
        );
        ctx.collab.log.record(CombatLogEntry::Damage(DamageLog {
            attacker: info.attacker,
            victim: caster,
            spell: info.spell,
            amount: dealt,
            overkill: moved - dealt,
            school: info.school_mask,
            absorbed: 0,
            resisted: 0,
            blocked: 0,
            periodic: false,
            flags: DamageLogFlags::SHARED,
        }));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::UnitId;

    #[test]
    fn armor_caps_at_three_quarters() {
        let attacker = Unit::player(UnitId(1)).with_level(80);
        let mut victim = Unit::creature(UnitId(2)).with_level(80);
        victim.stats.armor = 1_000_000;
        assert_eq!(armor_reduced_damage(Some(&attacker), &victim, 1_000), 250);
        assert_eq!(armor_reduced_damage(Some(&attacker), &victim, 0), 0);
        assert_eq!(armor_reduced_damage(Some(&attacker), &victim, 1), 1);
    }

    #[test]
    fn armor_formula_below_sixty() {
        let attacker = Unit::player(UnitId(1)).with_level(10);
        let mut victim = Unit::creature(UnitId(2)).with_level(10);
        victim.stats.armor = 1_250;
        // 1250 / (1250 + 400 + 850) = 0.5
        assert_eq!(armor_reduced_damage(Some(&attacker), &victim, 100), 50);
    }

    #[test]
    fn average_resist_uses_boss_constant() {
        let mut victim = Unit::creature(UnitId(2)).with_level(83);
        victim.stats.resistances[crate::types::SpellSchool::Fire.index()] = 510;
        let avg = average_resist_reduction(None, &victim, SchoolMask::FIRE);
        assert!((avg - 0.5).abs() < 1e-5);
    }

    #[test]
    fn resist_distribution_sums_to_one() {
        for average in [0.0, 0.05, 0.1, 0.35, 0.5, 0.75] {
            let total: f32 = resist_distribution(average).iter().sum();
            assert!((total - 1.0).abs() < 1e-3, "average {average} sums to {total}");
        }
    }

    #[test]
    fn zero_resistance_never_resists() {
        assert_eq!(resisted_tenths(0.0, 0), 0);
        assert_eq!(resisted_tenths(0.0, 9_999), 0);
    }

    #[test]
    fn physical_and_binary_skip_resists() {
        let binary = SpellInfo {
            attributes: SpellAttributes::BINARY,
            ..SpellInfo::default()
        };
        assert!(!resists_apply(SchoolMask::PHYSICAL, None));
        assert!(!resists_apply(SchoolMask::PHYSICAL | SchoolMask::FIRE, None));
        assert!(!resists_apply(SchoolMask::FIRE, Some(&binary)));
        assert!(resists_apply(SchoolMask::FIRE, None));
    }
}
