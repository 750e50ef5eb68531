//! Done/taken bonuses and crit numbers.
//!
//! Pure functions over the two units; the pipeline in `damage.rs` calls them
//! in a fixed order. Nothing here rolls or mutates.

use crate::aura::AuraType;
use crate::spell::{SpellAttributes, SpellInfo};
use crate::types::{
    DamageClass, DamageEffectType, Mechanic, PowerType, SchoolMask, Stat, WeaponAttackType,
};
use crate::unit::{AuraState, Unit};

/// What the modifiers need to know about the hit being computed.
#[derive(Clone, Copy, Debug)]
pub struct ModifierInput<'s> {
    pub spell: Option<&'s SpellInfo>,
    pub school_mask: SchoolMask,
    pub effect_type: DamageEffectType,
    pub attack_type: WeaponAttackType,
    /// Share of the caster's power added per hit.
    pub coefficient: f32,
    pub stacks: u32,
    pub mechanic: Mechanic,
}

impl ModifierInput<'_> {
    /// A white swing: physical, full attack power contribution.
    pub fn melee(attack_type: WeaponAttackType) -> Self {
        Self {
            spell: None,
            school_mask: SchoolMask::PHYSICAL,
            effect_type: DamageEffectType::Direct,
            attack_type,
            coefficient: 1.0,
            stacks: 1,
            mechanic: Mechanic::None,
        }
    }

    fn has_attribute(&self, attribute: SpellAttributes) -> bool {
        self.spell.is_some_and(|s| s.has_attribute(attribute))
    }

    fn damage_class(&self) -> DamageClass {
        self.spell.map_or(DamageClass::Melee, |s| match s.damage_class {
            // physical spells without a class still use weapon numbers
            DamageClass::None if s.school_mask.is_physical_only() => DamageClass::Melee,
            class => class,
        })
    }

    fn scale(&self) -> f32 {
        self.coefficient * self.stacks.max(1) as f32
    }
}

/// Largest per-school multiplier of `aura_type` over the schools of `mask`.
fn best_school_multiplier(unit: &Unit, aura_type: AuraType, mask: SchoolMask) -> f32 {
    mask.schools()
        .map(|school| unit.total_aura_multiplier_by_school(aura_type, school.mask()))
        .fold(None, |best: Option<f32>, m| Some(best.map_or(m, |b| b.max(m))))
        .unwrap_or(1.0)
}

fn versatility_multiplier(unit: &Unit) -> f32 {
    let pct = unit.stats.versatility + unit.total_aura_modifier(AuraType::ModVersatility) as f32;
    (1.0 + pct / 100.0).max(0.0)
}

#[inline]
fn to_amount(value: f32) -> u32 {
    value.max(0.0).round() as u32
}

// ============================================================================
// Damage
// ============================================================================

/// Power the attacker brings to a hit, before the coefficient.
pub fn advertised_damage_power(attacker: &Unit, input: &ModifierInput<'_>) -> f32 {
    if input.school_mask.is_physical_only() {
        let attack_power = attacker.stats.attack_power.max(0) as f32;
        return attack_power / 14.0 * attacker.stats.attack_time_ms as f32 / 1_000.0;
    }
    let mut power = attacker.stats.spell_power as f32;
    if attacker.power_type == PowerType::Mana {
        power += (attacker.stats.primary[Stat::Intellect.index()] - 10).max(0) as f32;
    }
    for (_, effect) in attacker.applied_effects(AuraType::ModSpellDamageOfStatPercent) {
        let schools = crate::aura::misc_school(effect);
        if !schools.intersects(input.school_mask) {
            continue;
        }
        if let Some(stat) = Stat::from_index(effect.misc_value_b) {
            power += attacker.stats.primary[stat.index()] as f32 * effect.amount() as f32 / 100.0;
        }
    }
    power
}

/// Flat damage the attacker adds to one hit.
pub fn damage_bonus_done_flat(attacker: &Unit, input: &ModifierInput<'_>) -> f32 {
    let done = attacker.total_aura_modifier_by_school(AuraType::ModDamageDone, input.school_mask) as f32;
    let power = advertised_damage_power(attacker, input);
    if input.school_mask.is_physical_only() {
        done + power * input.scale()
    } else {
        (done + power) * input.scale()
    }
}

/// Multiplier the attacker applies to one hit.
pub fn damage_pct_done(attacker: &Unit, victim: &Unit, input: &ModifierInput<'_>) -> f32 {
    // magic schools only
    let magic = input.school_mask & SchoolMask::MAGIC;
    let mut pct = best_school_multiplier(attacker, AuraType::ModDamagePercentDone, magic);

    pct *= attacker.total_aura_multiplier_by_misc_mask(
        AuraType::ModDamageDoneVersus,
        victim.creature_type.mask(),
    );
    pct *= attacker
        .modifier_totals(AuraType::ModDamageDoneVersusAuraState, |_, e| {
            AuraState::from_index(e.misc_value).is_some_and(|state| victim.has_aura_state(state))
        })
        .multiplier;
    if input.mechanic != Mechanic::None {
        pct *= attacker
            .modifier_totals(AuraType::ModDamageDoneForMechanic, |_, e| {
                e.misc_value == input.mechanic as i32
            })
            .multiplier;
    }
    pct * versatility_multiplier(attacker)
}

/// Damage after the attacker's bonuses.
pub fn damage_bonus_done(attacker: &Unit, victim: &Unit, base: u32, input: &ModifierInput<'_>) -> u32 {
    if input.has_attribute(SpellAttributes::IGNORE_CASTER_MODIFIERS) {
        return base;
    }
    let flat = damage_bonus_done_flat(attacker, input);
    let pct = damage_pct_done(attacker, victim, input);
    to_amount((base as f32 + flat) * pct)
}

/// Damage after the victim's bonuses.
pub fn damage_bonus_taken(
    attacker: Option<&Unit>,
    victim: &Unit,
    amount: u32,
    input: &ModifierInput<'_>,
) -> u32 {
    let mut pct = 1.0;
    if input.mechanic != Mechanic::None {
        pct *= victim
            .modifier_totals(AuraType::ModMechanicDamageTakenPercent, |_, e| {
                e.misc_value == input.mechanic as i32
            })
            .multiplier;
    }
    if input.has_attribute(SpellAttributes::IGNORE_DAMAGE_TAKEN_MODIFIERS) {
        return to_amount(amount as f32 * pct);
    }

    let taken = victim.total_aura_modifier_by_school(AuraType::ModDamageTaken, input.school_mask) as f32;
    let flat = if input.school_mask.is_physical_only() {
        taken
    } else {
        taken * input.scale()
    };
    pct *= victim.total_aura_multiplier_by_school(AuraType::ModDamagePercentTaken, input.school_mask);
    if let Some(attacker) = attacker {
        pct *= victim
            .modifier_totals(AuraType::ModDamageTakenFromCaster, |aura, _| {
                aura.caster == Some(attacker.id)
            })
            .multiplier;
    }
    to_amount((amount as f32 + flat) * pct)
}

// ============================================================================
// Healing
// ============================================================================

pub fn heal_bonus_done(healer: &Unit, base: u32, input: &ModifierInput<'_>) -> u32 {
    if input.has_attribute(SpellAttributes::IGNORE_CASTER_MODIFIERS) {
        return base;
    }
    let done = healer.total_aura_modifier_by_school(AuraType::ModHealingDone, input.school_mask) as f32;
    let flat = (done + healer.stats.spell_power as f32) * input.scale();
    let pct = healer.total_aura_multiplier(AuraType::ModHealingDonePercent) * versatility_multiplier(healer);
    to_amount((base as f32 + flat) * pct)
}

pub fn heal_bonus_taken(target: &Unit, amount: u32, input: &ModifierInput<'_>) -> u32 {
    let taken = target.total_aura_modifier_by_school(AuraType::ModHealingTaken, input.school_mask) as f32;
    let pct = target.total_aura_multiplier(AuraType::ModHealingPct);
    to_amount((amount as f32 + taken * input.scale()) * pct)
}

// ============================================================================
// Crits
// ============================================================================

/// Melee or ranged crit chance of the attacker before the victim's modifiers.
pub fn weapon_crit_chance(attacker: &Unit) -> f32 {
    attacker.stats.crit_chance + attacker.total_aura_modifier(AuraType::ModWeaponCritPercent) as f32
}

/// Total crit chance in percent, unclamped.
pub fn crit_chance(attacker: &Unit, victim: &Unit, input: &ModifierInput<'_>) -> f32 {
    if input.has_attribute(SpellAttributes::CANT_CRIT) {
        return 0.0;
    }
    let mut chance = match input.damage_class() {
        DamageClass::Melee | DamageClass::Ranged => {
            let taken = if input.attack_type == WeaponAttackType::RangedAttack {
                AuraType::ModAttackerRangedCritChance
            } else {
                AuraType::ModAttackerMeleeCritChance
            };
            weapon_crit_chance(attacker) + victim.total_aura_modifier(taken) as f32
        }
        DamageClass::Magic => {
            attacker.stats.spell_crit_chance
                + attacker.total_aura_modifier_by_school(AuraType::ModSpellCritChance, input.school_mask)
                    as f32
                + victim.total_aura_modifier(AuraType::ModAttackerSpellCritChance) as f32
        }
        DamageClass::None => return 0.0,
    };
    chance += victim
        .modifier_totals(AuraType::ModCritChanceForCaster, |aura, _| {
            aura.caster == Some(attacker.id)
        })
        .flat as f32;
    chance
}

/// Crit damage before hooks: double, then the attacker's crit damage bonus.
pub fn crit_damage(attacker: &Unit, amount: u32, input: &ModifierInput<'_>) -> u32 {
    let bonus = attacker.total_aura_multiplier_by_school(AuraType::ModCritDamageBonus, input.school_mask);
    to_amount(amount as f32 * 2.0 * bonus)
}

pub fn heal_crit_amount(healer: &Unit, amount: u32) -> u32 {
    let bonus = healer.total_aura_multiplier(AuraType::ModCriticalHealingAmount);
    to_amount(amount as f32 * 2.0 * bonus)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aura::{Aura, AuraApplication, AuraEffect};
    use crate::types::{AuraId, CreatureType, SpellId, UnitId};

    fn attach(unit: &mut Unit, aura_type: AuraType, amount: i32, misc: i32, caster: Option<UnitId>) {
        let id = AuraId(unit.owned_auras.len() as u64 + 1);
        let mut aura = Aura::new(id, SpellId(500 + id.0 as u32), unit.id, caster);
        let mut effect = AuraEffect::new(0, aura_type, amount);
        effect.misc_value = misc;
        aura.set_effect(effect);
        let mut app = AuraApplication::new(id, unit.id, true);
        app.set_effect_applied(0);
        unit.owned_auras.insert(id, aura);
        unit.applied_auras.insert(id, app);
    }

    fn fire_input(coefficient: f32) -> ModifierInput<'static> {
        ModifierInput {
            spell: None,
            school_mask: SchoolMask::FIRE,
            effect_type: DamageEffectType::SpellDirect,
            attack_type: WeaponAttackType::BaseAttack,
            coefficient,
            stacks: 1,
            mechanic: Mechanic::None,
        }
    }

    #[test]
    fn spell_power_scales_with_coefficient() {
        let mut attacker = Unit::player(UnitId(1)).with_power(PowerType::Rage, 0, 100);
        attacker.stats.spell_power = 200;
        let victim = Unit::creature(UnitId(2));
        assert_eq!(damage_bonus_done(&attacker, &victim, 100, &fire_input(0.5)), 200);
        assert_eq!(damage_bonus_done(&attacker, &victim, 100, &fire_input(0.0)), 100);
    }

    #[test]
    fn percent_done_takes_best_school_then_versus() {
        let mut attacker = Unit::player(UnitId(1));
        attach(&mut attacker, AuraType::ModDamagePercentDone, 10, SchoolMask::FIRE.bits() as i32, None);
        attach(&mut attacker, AuraType::ModDamagePercentDone, 30, SchoolMask::FROST.bits() as i32, None);
        attach(&mut attacker, AuraType::ModDamageDoneVersus, 50, CreatureType::Beast.mask() as i32, None);

        let beast = Unit::creature(UnitId(2)).with_creature_type(CreatureType::Beast);
        let input = ModifierInput {
            school_mask: SchoolMask::FIRE | SchoolMask::FROST,
            ..fire_input(0.0)
        };
        let pct = damage_pct_done(&attacker, &beast, &input);
        assert!((pct - 1.3 * 1.5).abs() < 1e-5);
    }

    #[test]
    fn percent_done_ignores_physical_school() {
        let mut attacker = Unit::player(UnitId(1));
        attach(&mut attacker, AuraType::ModDamagePercentDone, 50, SchoolMask::PHYSICAL.bits() as i32, None);
        attach(&mut attacker, AuraType::ModDamagePercentDone, 20, SchoolMask::FIRE.bits() as i32, None);
        let victim = Unit::creature(UnitId(2));

        let melee = ModifierInput::melee(WeaponAttackType::BaseAttack);
        assert!((damage_pct_done(&attacker, &victim, &melee) - 1.0).abs() < 1e-5);

        let mixed = ModifierInput {
            school_mask: SchoolMask::PHYSICAL | SchoolMask::FIRE,
            ..fire_input(0.0)
        };
        assert!((damage_pct_done(&attacker, &victim, &mixed) - 1.2).abs() < 1e-5);
    }

    #[test]
    fn taken_from_caster_only_counts_that_caster() {
        let attacker = Unit::player(UnitId(1));
        let other = Unit::player(UnitId(3));
        let mut victim = Unit::creature(UnitId(2));
        attach(&mut victim, AuraType::ModDamageTakenFromCaster, 100, 0, Some(UnitId(1)));

        let input = fire_input(0.0);
        assert_eq!(damage_bonus_taken(Some(&attacker), &victim, 50, &input), 100);
        assert_eq!(damage_bonus_taken(Some(&other), &victim, 50, &input), 50);
        assert_eq!(damage_bonus_taken(None, &victim, 50, &input), 50);
    }

    #[test]
    fn negative_taken_modifiers_floor_at_zero() {
        let mut victim = Unit::creature(UnitId(2));
        attach(&mut victim, AuraType::ModDamagePercentTaken, -150, 0, None);
        assert_eq!(damage_bonus_taken(None, &victim, 80, &fire_input(0.0)), 0);
    }

    #[test]
    fn crit_chance_adds_caster_specific_bonus() {
        let mut attacker = Unit::player(UnitId(1));
        attacker.stats.crit_chance = 5.0;
        let mut victim = Unit::creature(UnitId(2));
        attach(&mut victim, AuraType::ModCritChanceForCaster, 10, 0, Some(UnitId(1)));
        attach(&mut victim, AuraType::ModAttackerMeleeCritChance, 3, 0, None);

        let input = ModifierInput::melee(WeaponAttackType::BaseAttack);
        assert!((crit_chance(&attacker, &victim, &input) - 18.0).abs() < 1e-5);
    }

    #[test]
    fn crit_doubles_then_applies_bonus() {
        let mut attacker = Unit::player(UnitId(1));
        assert_eq!(crit_damage(&attacker, 100, &fire_input(0.0)), 200);
        attach(&mut attacker, AuraType::ModCritDamageBonus, 50, 0, None);
        assert_eq!(crit_damage(&attacker, 100, &fire_input(0.0)), 300);
    }

    #[test]
    fn healing_taken_percent_applies_after_flat() {
        let mut target = Unit::player(UnitId(1));
        attach(&mut target, AuraType::ModHealingPct, -50, 0, None);
        let input = ModifierInput {
            school_mask: SchoolMask::HOLY,
            ..fire_input(1.0)
        };
        assert_eq!(heal_bonus_taken(&target, 100, &input), 50);
    }
}
