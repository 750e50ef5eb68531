//! Transient records carried through one hit.

use crate::proc::ProcHit;
use crate::types::{DamageEffectType, SchoolMask, SpellId, UnitId, WeaponAttackType};

/// Outcome of hit resolution for a spell.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum SpellMissInfo {
    /// The spell lands.
    None,
    Miss,
    Resist,
    Dodge,
    Parry,
    Block,
    Evade,
    Immune,
    Deflect,
    Absorb,
    Reflect,
}

impl SpellMissInfo {
    /// Hit-mask bit reported to procs.
    pub const fn proc_hit(self) -> ProcHit {
        match self {
            Self::None => ProcHit::NORMAL,
            Self::Miss => ProcHit::MISS,
            Self::Resist => ProcHit::FULL_RESIST,
            Self::Dodge => ProcHit::DODGE,
            Self::Parry => ProcHit::PARRY,
            Self::Block => ProcHit::BLOCK,
            Self::Evade => ProcHit::EVADE,
            Self::Immune => ProcHit::IMMUNE,
            Self::Deflect => ProcHit::DEFLECT,
            Self::Absorb => ProcHit::ABSORB,
            Self::Reflect => ProcHit::REFLECT,
        }
    }

    pub const fn is_hit(self) -> bool {
        matches!(self, Self::None)
    }

    /// Whether the effects still resolve; a blocked spell lands with reduced damage.
    pub const fn lands(self) -> bool {
        matches!(self, Self::None | Self::Block)
    }
}

/// Outcome of a white swing.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum MeleeHitOutcome {
    Evade,
    Miss,
    Dodge,
    Block,
    Parry,
    Glancing,
    Crit,
    Crushing,
    Normal,
}

impl MeleeHitOutcome {
    pub const fn proc_hit(self) -> ProcHit {
        match self {
            Self::Evade => ProcHit::EVADE,
            Self::Miss => ProcHit::MISS,
            Self::Dodge => ProcHit::DODGE,
            Self::Parry => ProcHit::PARRY,
            Self::Block => ProcHit::BLOCK,
            Self::Crit => ProcHit::CRITICAL,
            Self::Glancing | Self::Crushing | Self::Normal => ProcHit::NORMAL,
        }
    }

    /// Whether the swing connects and deals damage.
    pub const fn lands(self) -> bool {
        matches!(
            self,
            Self::Block | Self::Glancing | Self::Crit | Self::Crushing | Self::Normal
        )
    }
}

/// Running damage accumulator for one hit.
///
/// `absorbed + resisted` never exceeds `original`, and `amount` is always
/// `original - absorbed - resisted`. Blocked damage is removed before the
/// record is built and only reported.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DamageInfo {
    pub attacker: Option<UnitId>,
    pub victim: UnitId,
    pub spell: Option<SpellId>,
    pub school_mask: SchoolMask,
    pub effect_type: DamageEffectType,
    pub attack_type: WeaponAttackType,
    pub amount: u32,
    pub original: u32,
    pub absorbed: u32,
    pub resisted: u32,
    pub blocked: u32,
    pub hit_mask: ProcHit,
}

impl DamageInfo {
    pub fn new(
        attacker: Option<UnitId>,
        victim: UnitId,
        amount: u32,
        spell: Option<SpellId>,
        school_mask: SchoolMask,
        effect_type: DamageEffectType,
        attack_type: WeaponAttackType,
    ) -> Self {
        Self {
            attacker,
            victim,
            spell,
            school_mask,
            effect_type,
            attack_type,
            amount,
            original: amount,
            absorbed: 0,
            resisted: 0,
            blocked: 0,
            hit_mask: ProcHit::empty(),
        }
    }

    #[must_use]
    pub fn with_blocked(mut self, blocked: u32) -> Self {
        self.blocked = blocked;
        if blocked > 0 {
            self.hit_mask |= ProcHit::BLOCK;
        }
        self
    }

    #[must_use]
    pub fn with_hit_mask(mut self, hit_mask: ProcHit) -> Self {
        self.hit_mask |= hit_mask;
        self
    }

    /// Moves up to `amount` from the running total into `absorbed`.
    /// Returns how much was actually absorbed.
    pub fn absorb(&mut self, amount: u32) -> u32 {
        let taken = amount.min(self.amount);
        self.amount -= taken;
        self.absorbed += taken;
        if taken > 0 {
            self.hit_mask |= ProcHit::ABSORB;
        }
        taken
    }

    /// Moves up to `amount` from the running total into `resisted`.
    pub fn resist(&mut self, amount: u32) -> u32 {
        let taken = amount.min(self.amount);
        self.amount -= taken;
        self.resisted += taken;
        if self.amount == 0 && taken > 0 && self.absorbed == 0 {
            self.hit_mask |= ProcHit::FULL_RESIST;
        }
        taken
    }

    pub fn is_periodic(&self) -> bool {
        self.effect_type.is_periodic()
    }
}

/// Running heal accumulator for one heal.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct HealInfo {
    pub healer: Option<UnitId>,
    pub target: UnitId,
    pub spell: Option<SpellId>,
    pub school_mask: SchoolMask,
    pub amount: u32,
    pub original: u32,
    /// Portion that actually restored health.
    pub effective: u32,
    pub absorbed: u32,
    pub critical: bool,
    pub periodic: bool,
}

impl HealInfo {
    pub fn new(
        healer: Option<UnitId>,
        target: UnitId,
        amount: u32,
        spell: Option<SpellId>,
        school_mask: SchoolMask,
    ) -> Self {
        Self {
            healer,
            target,
            spell,
            school_mask,
            amount,
            original: amount,
            effective: 0,
            absorbed: 0,
            critical: false,
            periodic: false,
        }
    }

    #[must_use]
    pub fn critical(mut self, critical: bool) -> Self {
        self.critical = critical;
        self
    }

    #[must_use]
    pub fn periodic(mut self, periodic: bool) -> Self {
        self.periodic = periodic;
        self
    }

    pub fn absorb(&mut self, amount: u32) -> u32 {
        let taken = amount.min(self.amount);
        self.amount -= taken;
        self.absorbed += taken;
        taken
    }

    pub fn overheal(&self) -> u32 {
        self.amount - self.effective
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(amount: u32) -> DamageInfo {
        DamageInfo::new(
            Some(UnitId(1)),
            UnitId(2),
            amount,
            None,
            SchoolMask::FIRE,
            DamageEffectType::SpellDirect,
            WeaponAttackType::BaseAttack,
        )
    }

    #[test]
    fn absorb_and_resist_never_exceed_original() {
        let mut info = record(100);
        assert_eq!(info.resist(30), 30);
        assert_eq!(info.absorb(500), 70);
        assert_eq!(info.amount, 0);
        assert_eq!(info.absorbed + info.resisted, info.original);
        assert!(info.hit_mask.contains(ProcHit::ABSORB));
    }

    #[test]
    fn full_resist_sets_hit_bit() {
        let mut info = record(40);
        info.resist(40);
        assert!(info.hit_mask.contains(ProcHit::FULL_RESIST));
    }

    #[test]
    fn heal_absorb_reduces_amount() {
        let mut heal = HealInfo::new(None, UnitId(1), 50, None, SchoolMask::HOLY);
        assert_eq!(heal.absorb(20), 20);
        heal.effective = 25;
        assert_eq!(heal.amount, 30);
        assert_eq!(heal.overheal(), 5);
    }

    #[test]
    fn missed_swings_do_not_land() {
        assert!(!MeleeHitOutcome::Dodge.lands());
        assert!(MeleeHitOutcome::Glancing.lands());
        assert_eq!(MeleeHitOutcome::Crit.proc_hit(), ProcHit::CRITICAL);
    }
}
