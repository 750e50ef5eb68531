//! Damage schools and school masks.

use bitflags::bitflags;
use strum::{EnumCount, EnumIter, IntoEnumIterator};

/// A single damage school.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, EnumCount, EnumIter)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[repr(u8)]
pub enum SpellSchool {
    Physical = 0,
    Holy = 1,
    Fire = 2,
    Nature = 3,
    Frost = 4,
    Shadow = 5,
    Arcane = 6,
}

impl SpellSchool {
    #[inline]
    pub const fn index(self) -> usize {
        self as usize
    }

    #[inline]
    pub const fn mask(self) -> SchoolMask {
        SchoolMask::from_bits_truncate(1 << self as u8)
    }
}

bitflags! {
    /// Set of damage schools a spell or modifier applies to.
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
    #[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
    #[cfg_attr(feature = "serde", serde(transparent))]
    pub struct SchoolMask: u8 {
        const PHYSICAL = 1 << 0;
        const HOLY     = 1 << 1;
        const FIRE     = 1 << 2;
        const NATURE   = 1 << 3;
        const FROST    = 1 << 4;
        const SHADOW   = 1 << 5;
        const ARCANE   = 1 << 6;

        const MAGIC = Self::HOLY.bits()
            | Self::FIRE.bits()
            | Self::NATURE.bits()
            | Self::FROST.bits()
            | Self::SHADOW.bits()
            | Self::ARCANE.bits();
        const ALL = Self::PHYSICAL.bits() | Self::MAGIC.bits();
    }
}

impl SchoolMask {
    /// True when the mask contains only physical damage.
    #[inline]
    pub fn is_physical_only(self) -> bool {
        self == SchoolMask::PHYSICAL
    }

    /// Schools contained in this mask, lowest first.
    pub fn schools(self) -> impl Iterator<Item = SpellSchool> {
        SpellSchool::iter().filter(move |s| self.contains(s.mask()))
    }

    /// First school of the mask, used where a single school is required.
    pub fn first_school(self) -> SpellSchool {
        self.schools().next().unwrap_or(SpellSchool::Physical)
    }
}

/// Per-school integer values such as resistances.
pub type SchoolValues = [i32; SpellSchool::COUNT];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn magic_excludes_physical() {
        assert!(!SchoolMask::MAGIC.contains(SchoolMask::PHYSICAL));
        assert_eq!(SchoolMask::ALL.schools().count(), SpellSchool::COUNT);
    }

    #[test]
    fn first_school_of_mixed_mask() {
        let mask = SchoolMask::FROST | SchoolMask::FIRE;
        assert_eq!(mask.first_school(), SpellSchool::Fire);
        assert_eq!(SchoolMask::empty().first_school(), SpellSchool::Physical);
    }
}
