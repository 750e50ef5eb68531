//! Closed vocabularies shared by spells, units and the combat pipeline.

use strum::{EnumCount, EnumIter};

/// Category tag on an effect used for immunity, resistance and dispel matching.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Default, EnumCount, EnumIter)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[repr(u8)]
pub enum Mechanic {
    #[default]
    None = 0,
    Charm = 1,
    Disoriented = 2,
    Disarm = 3,
    Distract = 4,
    Fear = 5,
    Grip = 6,
    Root = 7,
    SlowAttack = 8,
    Silence = 9,
    Sleep = 10,
    Snare = 11,
    Stun = 12,
    Freeze = 13,
    Knockout = 14,
    Bleed = 15,
    Polymorph = 17,
    Banish = 18,
    Shield = 19,
    Shackle = 20,
    Horror = 24,
    Invulnerability = 25,
    Interrupt = 26,
    Daze = 27,
    ImmuneShield = 29,
    Sapped = 30,
    Enraged = 31,
}

impl Mechanic {
    /// Bit of this mechanic inside a [`MechanicMask`]; `None` maps to no bit.
    #[inline]
    pub const fn mask(self) -> MechanicMask {
        match self {
            Mechanic::None => MechanicMask(0),
            m => MechanicMask(1 << (m as u8)),
        }
    }

    /// Mechanics that count as crowd control for immunity bookkeeping.
    pub const fn is_crowd_control(self) -> bool {
        matches!(
            self,
            Mechanic::Charm
                | Mechanic::Disoriented
                | Mechanic::Fear
                | Mechanic::Root
                | Mechanic::Silence
                | Mechanic::Sleep
                | Mechanic::Stun
                | Mechanic::Freeze
                | Mechanic::Knockout
                | Mechanic::Polymorph
                | Mechanic::Banish
                | Mechanic::Shackle
                | Mechanic::Horror
                | Mechanic::Sapped
        )
    }
}

/// Bit set of [`Mechanic`] values.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(transparent))]
pub struct MechanicMask(pub u64);

impl MechanicMask {
    pub const NONE: Self = Self(0);

    #[inline]
    pub const fn contains(self, mechanic: Mechanic) -> bool {
        let bit = mechanic.mask().0;
        bit != 0 && self.0 & bit != 0
    }

    #[inline]
    pub const fn intersects(self, other: MechanicMask) -> bool {
        self.0 & other.0 != 0
    }

    #[inline]
    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }

    #[must_use]
    pub const fn with(self, mechanic: Mechanic) -> Self {
        Self(self.0 | mechanic.mask().0)
    }
}

/// Dispel category of a spell.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum DispelType {
    #[default]
    None,
    Magic,
    Curse,
    Disease,
    Poison,
    Stealth,
    Enrage,
}

impl DispelType {
    /// Dispel type stored in an effect's `misc_value`.
    pub const fn from_index(index: i32) -> Option<DispelType> {
        match index {
            0 => Some(DispelType::None),
            1 => Some(DispelType::Magic),
            2 => Some(DispelType::Curse),
            3 => Some(DispelType::Disease),
            4 => Some(DispelType::Poison),
            5 => Some(DispelType::Stealth),
            6 => Some(DispelType::Enrage),
            _ => None,
        }
    }
}

/// Power pool a unit spends and regains.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum PowerType {
    #[default]
    Mana,
    Rage,
    Focus,
    Energy,
}

/// Creature family used by "damage done versus" modifiers.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default, EnumCount, EnumIter)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[repr(u8)]
pub enum CreatureType {
    #[default]
    None = 0,
    Beast = 1,
    Dragonkin = 2,
    Demon = 3,
    Elemental = 4,
    Giant = 5,
    Undead = 6,
    Humanoid = 7,
    Critter = 8,
    Mechanical = 9,
}

impl CreatureType {
    /// Bit used in `misc_value` of creature-type modifiers.
    #[inline]
    pub const fn mask(self) -> u32 {
        match self {
            CreatureType::None => 0,
            t => 1 << (t as u8 - 1),
        }
    }
}

/// How a spell's outcome is resolved.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum DamageClass {
    /// Always hits; no hit table.
    #[default]
    None,
    Magic,
    Melee,
    Ranged,
}

/// Which weapon an attack is made with.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default, EnumCount)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum WeaponAttackType {
    #[default]
    BaseAttack,
    OffAttack,
    RangedAttack,
}

/// Primary stats.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, EnumCount, EnumIter)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[repr(u8)]
pub enum Stat {
    Strength = 0,
    Agility = 1,
    Stamina = 2,
    Intellect = 3,
    Spirit = 4,
}

impl Stat {
    #[inline]
    pub const fn index(self) -> usize {
        self as usize
    }

    pub const fn from_index(index: i32) -> Option<Stat> {
        match index {
            0 => Some(Stat::Strength),
            1 => Some(Stat::Agility),
            2 => Some(Stat::Stamina),
            3 => Some(Stat::Intellect),
            4 => Some(Stat::Spirit),
            _ => None,
        }
    }
}

/// Broad kind of unit.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum UnitKind {
    Player,
    #[default]
    Creature,
}

/// How damage reached its victim.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum DamageEffectType {
    /// White swing or melee/ranged ability.
    Direct,
    /// Direct spell damage.
    SpellDirect,
    /// Damage over time tick.
    Periodic,
    /// Redirected from another unit by a share-damage aura.
    Shared,
    /// Damage a unit deals to itself.
    SelfDamage,
    /// Damage from a proc handler.
    Proc,
}

impl DamageEffectType {
    #[inline]
    pub const fn is_periodic(self) -> bool {
        matches!(self, DamageEffectType::Periodic)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mechanic_none_has_no_bit() {
        assert!(Mechanic::None.mask().is_empty());
        assert!(!MechanicMask(u64::MAX).contains(Mechanic::None));
    }

    #[test]
    fn mechanic_mask_builder() {
        let mask = MechanicMask::NONE.with(Mechanic::Stun).with(Mechanic::Root);
        assert!(mask.contains(Mechanic::Stun));
        assert!(mask.contains(Mechanic::Root));
        assert!(!mask.contains(Mechanic::Fear));
    }

    #[test]
    fn creature_type_masks_are_distinct() {
        assert_eq!(CreatureType::Beast.mask(), 1);
        assert_eq!(CreatureType::Humanoid.mask(), 1 << 6);
        assert_eq!(CreatureType::None.mask(), 0);
    }
}
