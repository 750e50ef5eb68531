use crate::unit::UnitStateFlags;

/// Closed set of aura effect behaviours.
///
/// Every place that reacts to an aura type matches on this enum; there is no
/// per-instance behaviour object.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum AuraType {
    Dummy,

    // crowd control; `amount` is the damage threshold before breaking (0 = any)
    ModStun,
    ModRoot,
    ModFear,
    ModConfuse,
    ModPacify,
    ModSilence,

    // periodic
    PeriodicDamage,
    PeriodicHeal,
    PeriodicEnergize,

    // damage done / taken; `misc_value` is a school mask unless noted
    ModDamageDone,
    ModDamagePercentDone,
    ModDamageTaken,
    ModDamagePercentTaken,
    /// `misc_value` is a creature type mask.
    ModDamageDoneVersus,
    /// `misc_value` is the aura state the victim must have.
    ModDamageDoneVersusAuraState,
    /// `misc_value` is the mechanic of the damaging spell.
    ModDamageDoneForMechanic,
    /// `misc_value` is the mechanic of the damaging spell.
    ModMechanicDamageTakenPercent,
    /// Damage taken from this aura's caster only.
    ModDamageTakenFromCaster,
    /// `misc_value` school mask, `misc_value_b` stat index.
    ModSpellDamageOfStatPercent,
    ModVersatility,

    // healing
    ModHealingDone,
    ModHealingDonePercent,
    /// Percent healing taken.
    ModHealingPct,
    /// Flat healing taken.
    ModHealingTaken,
    ModCriticalHealingAmount,

    // crit
    ModWeaponCritPercent,
    /// `misc_value` school mask.
    ModSpellCritChance,
    ModAttackerMeleeCritChance,
    ModAttackerRangedCritChance,
    ModAttackerSpellCritChance,
    /// Extra crit chance for this aura's caster against the owner.
    ModCritChanceForCaster,
    ModCritDamageBonus,

    // stats and avoidance
    /// `misc_value` is a stat index, `-1` for all.
    ModStat,
    /// `misc_value` school mask.
    ModResistance,
    ModIncreaseHealth,
    /// `misc_value` school mask; negative amounts penetrate victim resistance.
    ModTargetResistance,
    ModDodgePercent,
    ModParryPercent,
    ModBlockPercent,
    /// `misc_value` mechanic.
    ModMechanicResistance,
    ModSpellHitChance,
    ModAttackerSpellHitChance,
    DeflectSpells,

    // absorbs
    SchoolAbsorb,
    SchoolHealAbsorb,
    /// Capacity that only engages when damage would be lethal.
    PreventDeath,

    // immunities
    SchoolImmunity,
    DamageImmunity,
    MechanicImmunity,
    DispelImmunity,
    /// `misc_value` is the effect kind index made immune.
    EffectImmunity,
    /// `misc_value` is the aura type index made immune.
    StateImmunity,

    // redirection
    /// Part of the owner's damage goes to the caster before it lands.
    SplitDamagePct,
    /// Part of the owner's damage is dealt again to the caster afterwards.
    ShareDamagePct,

    // procs
    ProcTriggerSpell,
    ProcTriggerSpellWithValue,
    ProcTriggerDamage,

    // hit-table overrides
    IgnoreHitDirection,
    /// `misc_value` bit 0 dodge, bit 1 parry, bit 2 block.
    IgnoreCombatResult,
}

/// Bits of `IgnoreCombatResult` `misc_value`.
pub mod ignore_result {
    pub const DODGE: i32 = 1 << 0;
    pub const PARRY: i32 = 1 << 1;
    pub const BLOCK: i32 = 1 << 2;
}

impl AuraType {
    /// Unit state bit held while an aura of this type is applied.
    pub const fn unit_state(self) -> Option<UnitStateFlags> {
        match self {
            AuraType::ModStun => Some(UnitStateFlags::STUNNED),
            AuraType::ModRoot => Some(UnitStateFlags::ROOTED),
            AuraType::ModFear => Some(UnitStateFlags::FLEEING),
            AuraType::ModConfuse => Some(UnitStateFlags::CONFUSED),
            AuraType::ModPacify => Some(UnitStateFlags::PACIFIED),
            AuraType::ModSilence => Some(UnitStateFlags::SILENCED),
            _ => None,
        }
    }

    /// Crowd control that can be broken by damage.
    pub const fn is_breakable_crowd_control(self) -> bool {
        matches!(
            self,
            AuraType::ModStun | AuraType::ModRoot | AuraType::ModFear | AuraType::ModConfuse
        )
    }

    pub const fn is_periodic(self) -> bool {
        matches!(
            self,
            AuraType::PeriodicDamage | AuraType::PeriodicHeal | AuraType::PeriodicEnergize
        )
    }

    /// Whether a slot of this type with this amount hurts its owner.
    pub const fn is_harmful(self, amount: i32) -> bool {
        use AuraType::*;
        match self {
            ModStun | ModRoot | ModFear | ModConfuse | ModPacify | ModSilence
            | PeriodicDamage | SchoolHealAbsorb => true,
            ModDamageTaken
            | ModDamagePercentTaken
            | ModMechanicDamageTakenPercent
            | ModDamageTakenFromCaster
            | ModAttackerMeleeCritChance
            | ModAttackerRangedCritChance
            | ModAttackerSpellCritChance
            | ModCritChanceForCaster
            | ModAttackerSpellHitChance => amount > 0,
            ModDamageDone
            | ModDamagePercentDone
            | ModHealingDone
            | ModHealingDonePercent
            | ModHealingPct
            | ModHealingTaken
            | ModStat
            | ModResistance
            | ModIncreaseHealth
            | ModDodgePercent
            | ModParryPercent
            | ModBlockPercent
            | ModWeaponCritPercent
            | ModSpellCritChance
            | ModVersatility => amount < 0,
            _ => false,
        }
    }

    /// Modifier types that aggregate by multiplication rather than addition.
    pub const fn is_multiplicative(self) -> bool {
        use AuraType::*;
        matches!(
            self,
            ModDamagePercentDone
                | ModDamagePercentTaken
                | ModDamageDoneVersus
                | ModDamageDoneVersusAuraState
                | ModDamageDoneForMechanic
                | ModMechanicDamageTakenPercent
                | ModHealingDonePercent
                | ModHealingPct
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn crowd_control_types_map_to_unit_state() {
        assert_eq!(AuraType::ModStun.unit_state(), Some(UnitStateFlags::STUNNED));
        assert_eq!(AuraType::ModDamageDone.unit_state(), None);
    }

    #[test]
    fn harmfulness_depends_on_sign() {
        assert!(AuraType::ModDamagePercentTaken.is_harmful(10));
        assert!(!AuraType::ModDamagePercentTaken.is_harmful(-10));
        assert!(AuraType::ModStat.is_harmful(-5));
        assert!(!AuraType::ModStat.is_harmful(5));
        assert!(AuraType::ModStun.is_harmful(0));
    }
}
