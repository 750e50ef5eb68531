//! Structured combat-log records.

use bitflags::bitflags;

use crate::aura::AuraRemoveMode;
use crate::combat::SpellMissInfo;
use crate::types::{AuraId, PowerType, SchoolMask, SpellId, UnitId};

bitflags! {
    /// Extra facts about one damage record.
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
    #[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
    #[cfg_attr(feature = "serde", serde(transparent))]
    pub struct DamageLogFlags: u32 {
        const CRITICAL = 1 << 0;
        const GLANCING = 1 << 1;
        const CRUSHING = 1 << 2;
        const SHARED   = 1 << 3;
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct DamageLog {
    pub attacker: Option<UnitId>,
    pub victim: UnitId,
    pub spell: Option<SpellId>,
    pub amount: u32,
    pub overkill: u32,
    pub school: SchoolMask,
    pub absorbed: u32,
    pub resisted: u32,
    pub blocked: u32,
    pub periodic: bool,
    pub flags: DamageLogFlags,
}

#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct HealLog {
    pub healer: Option<UnitId>,
    pub target: UnitId,
    pub spell: Option<SpellId>,
    pub amount: u32,
    pub overheal: u32,
    pub absorbed: u32,
    pub critical: bool,
}

/// One line of the combat log.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum CombatLogEntry {
    Damage(DamageLog),
    Heal(HealLog),
    Absorb {
        attacker: Option<UnitId>,
        victim: UnitId,
        caster: Option<UnitId>,
        absorbing_spell: SpellId,
        amount: u32,
    },
    Resist {
        caster: Option<UnitId>,
        target: UnitId,
        spell: Option<SpellId>,
    },
    Miss {
        attacker: UnitId,
        victim: UnitId,
        spell: Option<SpellId>,
        result: SpellMissInfo,
    },
    Energize {
        caster: Option<UnitId>,
        target: UnitId,
        spell: Option<SpellId>,
        power: PowerType,
        amount: u32,
    },
    AuraApplied {
        target: UnitId,
        caster: Option<UnitId>,
        spell: SpellId,
        aura: AuraId,
        stack: u32,
    },
    AuraRemoved {
        target: UnitId,
        spell: SpellId,
        aura: AuraId,
        mode: AuraRemoveMode,
    },
    Death {
        victim: UnitId,
        killer: Option<UnitId>,
    },
}

/// Receiver of combat-log records.
pub trait CombatLogSink {
    fn record(&mut self, entry: CombatLogEntry);
}

impl CombatLogSink for Vec<CombatLogEntry> {
    fn record(&mut self, entry: CombatLogEntry) {
        self.push(entry);
    }
}

/// Sink that drops everything.
#[derive(Clone, Copy, Debug, Default)]
pub struct DiscardLog;

impl CombatLogSink for DiscardLog {
    fn record(&mut self, _entry: CombatLogEntry) {}
}
