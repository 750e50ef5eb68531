//! Static spell descriptors and spell execution.
//!
//! [`SpellInfo`] is read-only catalog data. Nothing in the combat core ever
//! mutates a descriptor; per-cast numbers live on auras and damage records.
mod cast;
mod flags;

pub use cast::{
    CastOutcome, CastRequest, CurrentCast, active_slots, attacker_state_update, cast_spell,
    execute_spell, interrupt_spell, interrupt_spell_by_id, prepare_cast,
};
pub(crate) use cast::{on_damage_taken, update_casts};
pub use flags::{
    AuraInterruptFlags, CastInterruptFlags, SpellAttributes, SpellFamilyFlags,
};

use arrayvec::ArrayVec;

use crate::aura::AuraType;
use crate::config::CombatConfig;
use crate::diminishing::DiminishingGroup;
use crate::proc::SpellProcEntry;
use crate::types::{
    DamageClass, DispelType, Mechanic, MechanicMask, SchoolMask, SpellId, WeaponAttackType,
};
use crate::unit::AuraState;

/// Fixed-capacity list of effect slots on a descriptor.
pub type SpellEffects = ArrayVec<SpellEffectInfo, { CombatConfig::MAX_SPELL_EFFECTS }>;

/// Bit set of effect slot indices (`1 << slot`).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(transparent))]
pub struct EffectMask(pub u8);

impl EffectMask {
    pub const NONE: Self = Self(0);
    pub const ALL: Self = Self((1 << CombatConfig::MAX_SPELL_EFFECTS) - 1);

    #[inline]
    pub const fn slot(slot: usize) -> Self {
        Self(1 << slot)
    }

    #[inline]
    pub const fn has(self, slot: usize) -> bool {
        self.0 & (1 << slot) != 0
    }

    #[inline]
    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }

    #[inline]
    pub const fn intersect(self, other: EffectMask) -> Self {
        Self(self.0 & other.0)
    }

    #[inline]
    pub const fn union(self, other: EffectMask) -> Self {
        Self(self.0 | other.0)
    }

    #[inline]
    pub const fn without(self, other: EffectMask) -> Self {
        Self(self.0 & !other.0)
    }

    #[inline]
    pub const fn is_subset_of(self, other: EffectMask) -> bool {
        self.0 & !other.0 == 0
    }

    pub const fn count(self) -> u32 {
        self.0.count_ones()
    }
}

/// What one effect slot does when the spell lands.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum SpellEffectKind {
    SchoolDamage,
    /// Weapon damage plus `base_points`.
    WeaponDamage,
    Heal,
    ApplyAura(AuraType),
    Energize,
    /// Cast `trigger_spell` on the effect target.
    TriggerSpell,
    /// Remove up to `base_points` dispellable auras of dispel type `misc_value`.
    Dispel,
    /// Interrupt the target's current non-melee cast.
    InterruptCast,
    Dummy,
}

impl SpellEffectKind {
    /// Stable numeric tag used by effect immunities.
    pub const fn tag(self) -> u32 {
        match self {
            Self::SchoolDamage => 0,
            Self::WeaponDamage => 1,
            Self::Heal => 2,
            Self::ApplyAura(_) => 3,
            Self::Energize => 4,
            Self::TriggerSpell => 5,
            Self::Dispel => 6,
            Self::InterruptCast => 7,
            Self::Dummy => 8,
        }
    }
}

/// Who an effect slot lands on.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum EffectTarget {
    #[default]
    Target,
    Caster,
}

/// One effect slot of a spell descriptor.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct SpellEffectInfo {
    pub kind: SpellEffectKind,
    pub base_points: i32,
    /// Random spread added on top of `base_points` (`0..=die_sides`).
    pub die_sides: u32,
    /// Fraction of caster bonus (spell power) added per point.
    pub bonus_coefficient: f32,
    pub misc_value: i32,
    pub misc_value_b: i32,
    pub amplitude_ms: u32,
    pub mechanic: Mechanic,
    pub trigger_spell: Option<SpellId>,
    pub target: EffectTarget,
}

impl Default for SpellEffectInfo {
    fn default() -> Self {
        Self {
            kind: SpellEffectKind::Dummy,
            base_points: 0,
            die_sides: 0,
            bonus_coefficient: 0.0,
            misc_value: 0,
            misc_value_b: 0,
            amplitude_ms: 0,
            mechanic: Mechanic::None,
            trigger_spell: None,
            target: EffectTarget::Target,
        }
    }
}

impl SpellEffectInfo {
    pub fn new(kind: SpellEffectKind, base_points: i32) -> Self {
        Self {
            kind,
            base_points,
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_misc_value(mut self, misc_value: i32) -> Self {
        self.misc_value = misc_value;
        self
    }

    #[must_use]
    pub fn with_misc_value_b(mut self, misc_value_b: i32) -> Self {
        self.misc_value_b = misc_value_b;
        self
    }

    #[must_use]
    pub fn with_amplitude(mut self, amplitude_ms: u32) -> Self {
        self.amplitude_ms = amplitude_ms;
        self
    }

    #[must_use]
    pub fn with_trigger_spell(mut self, spell: SpellId) -> Self {
        self.trigger_spell = Some(spell);
        self
    }

    #[must_use]
    pub fn with_coefficient(mut self, coefficient: f32) -> Self {
        self.bonus_coefficient = coefficient;
        self
    }

    #[must_use]
    pub fn with_mechanic(mut self, mechanic: Mechanic) -> Self {
        self.mechanic = mechanic;
        self
    }

    #[must_use]
    pub fn with_target(mut self, target: EffectTarget) -> Self {
        self.target = target;
        self
    }

    /// Aura type if this slot applies an aura.
    #[inline]
    pub fn aura_type(&self) -> Option<AuraType> {
        match self.kind {
            SpellEffectKind::ApplyAura(aura) => Some(aura),
            _ => None,
        }
    }

    #[inline]
    pub fn is_aura(&self) -> bool {
        self.aura_type().is_some()
    }

    /// True for slots that hurt their target.
    pub fn is_harmful(&self) -> bool {
        match self.kind {
            SpellEffectKind::SchoolDamage
            | SpellEffectKind::WeaponDamage
            | SpellEffectKind::InterruptCast => true,
            SpellEffectKind::ApplyAura(aura) => aura.is_harmful(self.base_points),
            _ => false,
        }
    }
}

/// How auras sharing a spell group coexist on one target.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum SpellGroupStackRule {
    /// Group members stack freely.
    #[default]
    Default,
    /// Only one member of the group may be present; the newest replaces the rest.
    Exclusive,
    /// Only one member per caster.
    ExclusiveFromSameCaster,
    /// Like `ExclusiveHighest`; members that still coexist (different casters
    /// of one spell) contribute only their largest same-type modifier.
    ExclusiveSameEffect,
    /// Only the member with the largest effect magnitude stays.
    ExclusiveHighest,
}

/// Static descriptor of one spell.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct SpellInfo {
    pub id: SpellId,
    pub name: String,
    pub school_mask: SchoolMask,
    pub dispel: DispelType,
    pub mechanic: Mechanic,
    pub attributes: SpellAttributes,
    pub damage_class: DamageClass,
    pub attack_type: WeaponAttackType,
    /// Duration in milliseconds; `-1` is infinite, `0` means no aura duration.
    pub duration_ms: i32,
    pub cast_time_ms: u32,
    /// Delay between cast completion and effect launch.
    pub launch_delay_ms: u32,
    /// Cooldown the spell history starts once the cast completes.
    pub recovery_ms: u32,
    /// Stack cap; `0` behaves like `1`.
    pub max_stack: u32,
    pub proc_charges: u32,
    pub proc: Option<SpellProcEntry>,
    pub effects: SpellEffects,
    pub aura_interrupt_flags: AuraInterruptFlags,
    pub channel_interrupt_flags: AuraInterruptFlags,
    pub interrupt_flags: CastInterruptFlags,
    /// Aura state set on the target while an aura of this spell is applied.
    pub aura_state: Option<AuraState>,
    pub stack_group: Option<u32>,
    pub diminishing_group: Option<DiminishingGroup>,
    pub single_target_group: Option<u32>,
    pub family: u32,
    pub family_flags: SpellFamilyFlags,
}

impl Default for SpellInfo {
    fn default() -> Self {
        Self {
            id: SpellId(0),
            name: String::new(),
            school_mask: SchoolMask::PHYSICAL,
            dispel: DispelType::None,
            mechanic: Mechanic::None,
            attributes: SpellAttributes::empty(),
            damage_class: DamageClass::None,
            attack_type: WeaponAttackType::BaseAttack,
            duration_ms: 0,
            cast_time_ms: 0,
            launch_delay_ms: 0,
            recovery_ms: 0,
            max_stack: 0,
            proc_charges: 0,
            proc: None,
            effects: SpellEffects::new(),
            aura_interrupt_flags: AuraInterruptFlags::empty(),
            channel_interrupt_flags: AuraInterruptFlags::empty(),
            interrupt_flags: CastInterruptFlags::empty(),
            aura_state: None,
            stack_group: None,
            diminishing_group: None,
            single_target_group: None,
            family: 0,
            family_flags: SpellFamilyFlags::default(),
        }
    }
}

impl SpellInfo {
    #[inline]
    pub fn has_attribute(&self, attribute: SpellAttributes) -> bool {
        self.attributes.contains(attribute)
    }

    pub fn effect(&self, slot: usize) -> Option<&SpellEffectInfo> {
        self.effects.get(slot)
    }

    /// Slots that apply auras.
    pub fn aura_effect_mask(&self) -> EffectMask {
        self.effects
            .iter()
            .enumerate()
            .filter(|(_, e)| e.is_aura())
            .fold(EffectMask::NONE, |mask, (slot, _)| {
                mask.union(EffectMask::slot(slot))
            })
    }

    pub fn all_effects_mask(&self) -> EffectMask {
        EffectMask((1u8 << self.effects.len()) - 1)
    }

    /// Whether any slot applies an aura of the given type.
    pub fn has_aura(&self, aura: AuraType) -> bool {
        self.effects.iter().any(|e| e.aura_type() == Some(aura))
    }

    /// Beneficial unless flagged negative or any slot is harmful.
    pub fn is_positive(&self) -> bool {
        if self.has_attribute(SpellAttributes::NEGATIVE) {
            return false;
        }
        !self.effects.iter().any(SpellEffectInfo::is_harmful)
    }

    pub fn is_passive(&self) -> bool {
        self.has_attribute(SpellAttributes::PASSIVE)
    }

    pub fn is_channeled(&self) -> bool {
        self.has_attribute(SpellAttributes::CHANNELED)
    }

    pub fn is_death_persistent(&self) -> bool {
        self.has_attribute(SpellAttributes::DEATH_PERSISTENT) || self.is_passive()
    }

    pub fn is_multi_instance(&self) -> bool {
        self.has_attribute(SpellAttributes::MULTI_INSTANCE)
    }

    pub fn is_caster_agnostic(&self) -> bool {
        self.has_attribute(SpellAttributes::CASTER_AGNOSTIC)
    }

    pub fn is_single_target(&self) -> bool {
        self.has_attribute(SpellAttributes::SINGLE_TARGET)
    }

    /// Stack cap, never below one.
    pub fn stack_cap(&self) -> u32 {
        self.max_stack.max(1)
    }

    pub fn is_infinite(&self) -> bool {
        self.duration_ms < 0
    }

    /// Mechanic of the spell plus every slot mechanic.
    pub fn mechanic_mask(&self, effects: EffectMask) -> MechanicMask {
        let mut mask = self.mechanic.mask();
        for (slot, effect) in self.effects.iter().enumerate() {
            if effects.has(slot) {
                mask = MechanicMask(mask.0 | effect.mechanic.mask().0);
            }
        }
        mask
    }

    /// Mechanic of one slot, falling back to the spell mechanic.
    pub fn effect_mechanic(&self, slot: usize) -> Mechanic {
        self.effect(slot)
            .map(|e| e.mechanic)
            .filter(|m| *m != Mechanic::None)
            .unwrap_or(self.mechanic)
    }

    /// Diminishing group, explicit or derived from the mechanic.
    pub fn diminishing_group(&self) -> DiminishingGroup {
        if let Some(group) = self.diminishing_group {
            return group;
        }
        let mechanic = (0..self.effects.len())
            .map(|slot| self.effect_mechanic(slot))
            .find(|m| *m != Mechanic::None)
            .unwrap_or(self.mechanic);
        DiminishingGroup::from_mechanic(mechanic)
    }

    /// Whether a spell family mask selects this spell.
    pub fn matches_family(&self, family: u32, mask: SpellFamilyFlags) -> bool {
        family == self.family && self.family_flags.intersects(mask)
    }
}

/// Slot a cast occupies on its caster.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum CastSlot {
    Generic,
    Channeled,
    AutoRepeat,
}
