use bitflags::bitflags;

use crate::combat::{DamageInfo, HealInfo};
use crate::spell::{EffectMask, SpellFamilyFlags, SpellInfo};
use crate::types::{ItemId, SchoolMask, SpellId, UnitId};

bitflags! {
    /// Kind of combat event, seen from one side.
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
    #[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
    #[cfg_attr(feature = "serde", serde(transparent))]
    pub struct ProcFlags: u32 {
        const KILLED                = 1 << 0;
        const KILL                  = 1 << 1;
        const DEAL_MELEE_SWING      = 1 << 2;
        const TAKE_MELEE_SWING      = 1 << 3;
        const DEAL_MELEE_ABILITY    = 1 << 4;
        const TAKE_MELEE_ABILITY    = 1 << 5;
        const DEAL_RANGED_ATTACK    = 1 << 6;
        const TAKE_RANGED_ATTACK    = 1 << 7;
        const DEAL_RANGED_ABILITY   = 1 << 8;
        const TAKE_RANGED_ABILITY   = 1 << 9;
        const DEAL_HELPFUL_SPELL    = 1 << 10;
        const TAKE_HELPFUL_SPELL    = 1 << 11;
        const DEAL_HARMFUL_SPELL    = 1 << 12;
        const TAKE_HARMFUL_SPELL    = 1 << 13;
        const DEAL_HARMFUL_PERIODIC = 1 << 14;
        const TAKE_HARMFUL_PERIODIC = 1 << 15;
        const DEAL_HELPFUL_PERIODIC = 1 << 16;
        const TAKE_HELPFUL_PERIODIC = 1 << 17;
        const TAKE_ANY_DAMAGE       = 1 << 18;
        const DEATH                 = 1 << 19;

        /// Events that always pass the school, family and hit checks.
        const ALWAYS_TRIGGER = Self::KILLED.bits() | Self::KILL.bits() | Self::DEATH.bits();

        const AUTO_ATTACK = Self::DEAL_MELEE_SWING.bits()
            | Self::TAKE_MELEE_SWING.bits()
            | Self::DEAL_RANGED_ATTACK.bits()
            | Self::TAKE_RANGED_ATTACK.bits();

        const SPELL = Self::DEAL_MELEE_ABILITY.bits()
            | Self::TAKE_MELEE_ABILITY.bits()
            | Self::DEAL_RANGED_ABILITY.bits()
            | Self::TAKE_RANGED_ABILITY.bits()
            | Self::DEAL_HELPFUL_SPELL.bits()
            | Self::TAKE_HELPFUL_SPELL.bits()
            | Self::DEAL_HARMFUL_SPELL.bits()
            | Self::TAKE_HARMFUL_SPELL.bits()
            | Self::DEAL_HARMFUL_PERIODIC.bits()
            | Self::TAKE_HARMFUL_PERIODIC.bits()
            | Self::DEAL_HELPFUL_PERIODIC.bits()
            | Self::TAKE_HELPFUL_PERIODIC.bits();

        const DONE_HIT = Self::DEAL_MELEE_SWING.bits()
            | Self::DEAL_MELEE_ABILITY.bits()
            | Self::DEAL_RANGED_ATTACK.bits()
            | Self::DEAL_RANGED_ABILITY.bits()
            | Self::DEAL_HELPFUL_SPELL.bits()
            | Self::DEAL_HARMFUL_SPELL.bits()
            | Self::DEAL_HARMFUL_PERIODIC.bits()
            | Self::DEAL_HELPFUL_PERIODIC.bits();

        const TAKEN_HIT = Self::TAKE_MELEE_SWING.bits()
            | Self::TAKE_MELEE_ABILITY.bits()
            | Self::TAKE_RANGED_ATTACK.bits()
            | Self::TAKE_RANGED_ABILITY.bits()
            | Self::TAKE_HELPFUL_SPELL.bits()
            | Self::TAKE_HARMFUL_SPELL.bits()
            | Self::TAKE_HARMFUL_PERIODIC.bits()
            | Self::TAKE_HELPFUL_PERIODIC.bits()
            | Self::TAKE_ANY_DAMAGE.bits();

        /// Spell events whose phase must match the proc entry.
        const REQ_SPELL_PHASE = Self::SPELL.bits() & Self::DONE_HIT.bits();
    }
}

bitflags! {
    /// Category of the spell behind an event.
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
    #[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
    #[cfg_attr(feature = "serde", serde(transparent))]
    pub struct ProcSpellType: u8 {
        const DAMAGE      = 1 << 0;
        const HEAL        = 1 << 1;
        const NO_DMG_HEAL = 1 << 2;
        const ALL = Self::DAMAGE.bits() | Self::HEAL.bits() | Self::NO_DMG_HEAL.bits();
    }
}

bitflags! {
    /// Point in a spell's life the event fires at.
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
    #[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
    #[cfg_attr(feature = "serde", serde(transparent))]
    pub struct ProcSpellPhase: u8 {
        const CAST   = 1 << 0;
        const HIT    = 1 << 1;
        const FINISH = 1 << 2;
    }
}

bitflags! {
    /// Outcome of the hit behind an event.
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
    #[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
    #[cfg_attr(feature = "serde", serde(transparent))]
    pub struct ProcHit: u32 {
        const NORMAL      = 1 << 0;
        const CRITICAL    = 1 << 1;
        const MISS        = 1 << 2;
        const FULL_RESIST = 1 << 3;
        const DODGE       = 1 << 4;
        const PARRY       = 1 << 5;
        const BLOCK       = 1 << 6;
        const EVADE       = 1 << 7;
        const IMMUNE      = 1 << 8;
        const DEFLECT     = 1 << 9;
        const ABSORB      = 1 << 10;
        const REFLECT     = 1 << 11;
        const INTERRUPT   = 1 << 12;
        const FULL_BLOCK  = 1 << 13;
    }
}

bitflags! {
    /// Extra rules on a proc entry.
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
    #[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
    #[cfg_attr(feature = "serde", serde(transparent))]
    pub struct ProcAttributes: u32 {
        /// Triggered spells may proc this aura.
        const TRIGGERED_CAN_PROC       = 1 << 0;
        /// Consume stacks instead of charges.
        const USE_STACKS_FOR_CHARGES   = 1 << 1;
        const CANT_PROC_FROM_ITEM_CAST = 1 << 2;
        /// A failed predicate or roll still burns a charge and starts the cooldown.
        const COOLDOWN_ON_FAILURE      = 1 << 3;
    }
}

/// Proc behaviour of a spell's auras.
#[derive(Clone, Debug, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct SpellProcEntry {
    /// Empty means any school.
    pub school_mask: SchoolMask,
    /// Zero means any family.
    pub family: u32,
    pub family_mask: SpellFamilyFlags,
    pub proc_flags: ProcFlags,
    /// Empty means any spell type.
    pub spell_type_mask: ProcSpellType,
    pub spell_phase_mask: ProcSpellPhase,
    /// Empty selects the defaults for done or taken events.
    pub hit_mask: ProcHit,
    pub attributes: ProcAttributes,
    /// Percent; `0` with no PPM means always.
    pub chance: f32,
    pub procs_per_minute: f32,
    pub cooldown_ms: u32,
    /// Slots that never fire from procs.
    pub disable_effect_mask: EffectMask,
}

/// The spell behind a proc event.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ProcSpellContext {
    pub spell: SpellId,
    pub school_mask: SchoolMask,
    pub family: u32,
    pub family_flags: SpellFamilyFlags,
    pub triggered: bool,
    pub cast_item: Option<ItemId>,
    /// Aura spell whose proc cast this spell.
    pub triggered_by_aura: Option<SpellId>,
}

impl ProcSpellContext {
    pub fn new(spell: &SpellInfo) -> Self {
        Self {
            spell: spell.id,
            school_mask: spell.school_mask,
            family: spell.family,
            family_flags: spell.family_flags,
            triggered: false,
            cast_item: None,
            triggered_by_aura: None,
        }
    }

    #[must_use]
    pub fn triggered_by(mut self, aura_spell: Option<SpellId>) -> Self {
        self.triggered = aura_spell.is_some();
        self.triggered_by_aura = aura_spell;
        self
    }

    #[must_use]
    pub fn with_cast_item(mut self, item: Option<ItemId>) -> Self {
        self.cast_item = item;
        self
    }

    /// Whether a family filter selects this spell. Family `0` selects everything.
    pub fn is_affected(&self, family: u32, mask: SpellFamilyFlags) -> bool {
        if family == 0 {
            return true;
        }
        if family != self.family {
            return false;
        }
        mask.is_empty() || self.family_flags.intersects(mask)
    }
}

/// One combat event as seen by the auras of one side.
///
/// Built fresh per side and never mutated.
#[derive(Clone, Debug)]
pub struct ProcEventInfo {
    pub actor: UnitId,
    pub action_target: Option<UnitId>,
    /// The unit a proc reacting to this event acts upon.
    pub proc_target: Option<UnitId>,
    pub type_mask: ProcFlags,
    pub spell_type_mask: ProcSpellType,
    pub spell_phase_mask: ProcSpellPhase,
    pub hit_mask: ProcHit,
    pub spell: Option<ProcSpellContext>,
    pub damage: Option<DamageInfo>,
    pub heal: Option<HealInfo>,
}

impl ProcEventInfo {
    /// School of the event: damage first, then heal, then spell.
    pub fn school_mask(&self) -> SchoolMask {
        if let Some(damage) = &self.damage {
            return damage.school_mask;
        }
        if let Some(heal) = &self.heal {
            return heal.school_mask;
        }
        self.spell.map_or(SchoolMask::empty(), |s| s.school_mask)
    }

    pub fn damage_amount(&self) -> u32 {
        self.damage.as_ref().map_or(0, |d| d.amount)
    }
}
