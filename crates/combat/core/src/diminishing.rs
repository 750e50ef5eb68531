//! Diminishing returns for repeated crowd control.
//!
//! Each unit keeps one [`DiminishingEntry`] per [`DiminishingGroup`]. Applying
//! a crowd-control aura raises the group's level; while any aura of the group
//! is applied the level is sticky, and once the last one fades the level
//! resets after the configured grace window.

use strum::EnumCount;

use crate::spell::SpellInfo;
use crate::types::{Mechanic, Timestamp};
use crate::unit::Unit;

/// Families of crowd control sharing one escalation track.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default, EnumCount)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[repr(u8)]
pub enum DiminishingGroup {
    #[default]
    None,
    Stun,
    Root,
    Incapacitate,
    Disorient,
    Silence,
    Disarm,
    Taunt,
}

/// Which targets a group diminishes on.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DiminishingReturnType {
    None,
    /// Only player-controlled targets.
    Player,
    All,
}

/// Escalation step. `Level1` is the undiminished base.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum DiminishingLevel {
    #[default]
    Level1,
    Level2,
    Level3,
    Level4,
    Immune,
}

impl DiminishingGroup {
    #[inline]
    const fn index(self) -> usize {
        self as usize
    }

    /// Group implied by a mechanic when the spell names none.
    pub const fn from_mechanic(mechanic: Mechanic) -> Self {
        match mechanic {
            Mechanic::Stun | Mechanic::Knockout => Self::Stun,
            Mechanic::Root | Mechanic::Freeze => Self::Root,
            Mechanic::Polymorph | Mechanic::Sapped | Mechanic::Sleep | Mechanic::Shackle => {
                Self::Incapacitate
            }
            Mechanic::Fear | Mechanic::Horror | Mechanic::Charm | Mechanic::Disoriented => {
                Self::Disorient
            }
            Mechanic::Silence => Self::Silence,
            Mechanic::Disarm => Self::Disarm,
            _ => Self::None,
        }
    }

    pub const fn return_type(self) -> DiminishingReturnType {
        match self {
            Self::None => DiminishingReturnType::None,
            Self::Stun | Self::Incapacitate | Self::Disorient | Self::Taunt => {
                DiminishingReturnType::All
            }
            Self::Root | Self::Silence | Self::Disarm => DiminishingReturnType::Player,
        }
    }

    /// Level reached after one more application at `level`.
    pub const fn next_level(self, level: DiminishingLevel) -> DiminishingLevel {
        use DiminishingLevel::*;
        match (self, level) {
            (_, Level1) => Level2,
            (_, Level2) => Level3,
            (Self::Taunt, Level3) => Level4,
            _ => Immune,
        }
    }

    /// Whether durations in this group are capped between players.
    pub const fn is_pvp_limited(self) -> bool {
        !matches!(self, Self::None | Self::Taunt)
    }

    /// Duration multiplier at a level.
    pub fn multiplier(self, level: DiminishingLevel) -> f32 {
        match self {
            Self::Taunt => match level {
                DiminishingLevel::Level1 => 1.0,
                DiminishingLevel::Level2 => 0.65,
                DiminishingLevel::Level3 => 0.42,
                DiminishingLevel::Level4 => 0.27,
                DiminishingLevel::Immune => 0.0,
            },
            _ => match level {
                DiminishingLevel::Level1 => 1.0,
                DiminishingLevel::Level2 => 0.5,
                DiminishingLevel::Level3 => 0.25,
                // standard groups skip Level4
                DiminishingLevel::Level4 | DiminishingLevel::Immune => 0.0,
            },
        }
    }
}

/// Escalation record of one group on one unit.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct DiminishingEntry {
    pub level: DiminishingLevel,
    /// Applied auras currently counting against this group.
    pub stack: u32,
    /// Time the stack last dropped to zero.
    pub hit_time: Timestamp,
}

/// Per-unit diminishing-returns table.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct DiminishingTable {
    entries: [DiminishingEntry; DiminishingGroup::COUNT],
}

impl DiminishingTable {
    pub fn entry(&self, group: DiminishingGroup) -> &DiminishingEntry {
        &self.entries[group.index()]
    }

    /// Effective level of a group at `now`.
    ///
    /// A group with nothing applied whose stack emptied at least `reset_ms`
    /// ago is back at `Level1`, whatever it escalated to before.
    pub fn level(&self, group: DiminishingGroup, now: Timestamp, reset_ms: u64) -> DiminishingLevel {
        if group == DiminishingGroup::None {
            return DiminishingLevel::Level1;
        }
        let entry = self.entry(group);
        if entry.stack == 0 && now.since(entry.hit_time) >= reset_ms {
            return DiminishingLevel::Level1;
        }
        entry.level
    }

    /// Escalates a group one level, starting from its effective level.
    pub fn increment(&mut self, group: DiminishingGroup, now: Timestamp, reset_ms: u64) {
        if group == DiminishingGroup::None {
            return;
        }
        let current = self.level(group, now, reset_ms);
        self.entries[group.index()].level = group.next_level(current);
    }

    /// Tracks one aura of the group being applied or removed.
    pub fn apply_diminishing(&mut self, group: DiminishingGroup, apply: bool, now: Timestamp) {
        if group == DiminishingGroup::None {
            return;
        }
        let entry = &mut self.entries[group.index()];
        if apply {
            entry.stack += 1;
        } else if entry.stack > 0 {
            entry.stack -= 1;
            if entry.stack == 0 {
                entry.hit_time = now;
            }
        }
    }

    /// Forgets all escalation, e.g. when combat ends.
    pub fn clear(&mut self) {
        self.entries = Default::default();
    }
}

/// Whether `target` is subject to diminishing for `group`.
pub fn is_diminishing_eligible(group: DiminishingGroup, target: &Unit) -> bool {
    match group {
        DiminishingGroup::Taunt => !target.player_controlled,
        _ => match group.return_type() {
            DiminishingReturnType::All => true,
            DiminishingReturnType::Player => target.player_controlled,
            DiminishingReturnType::None => false,
        },
    }
}

/// Scales `duration_ms` for the diminishing level of `spell` on `target`.
///
/// Returns `false` when the duration became zero and the aura must not be
/// applied at all. Infinite durations and spells outside any group are left
/// untouched.
pub fn apply_to_duration(
    spell: &SpellInfo,
    duration_ms: &mut i32,
    caster_player_controlled: bool,
    target: &Unit,
    level: DiminishingLevel,
    pvp_limit_ms: i32,
) -> bool {
    let group = spell.diminishing_group();
    if *duration_ms == -1 || group == DiminishingGroup::None {
        return true;
    }

    if group.is_pvp_limited()
        && caster_player_controlled
        && target.player_controlled
        && *duration_ms > pvp_limit_ms
    {
        *duration_ms = pvp_limit_ms;
    }

    if is_diminishing_eligible(group, target) {
        let scaled = *duration_ms as f32 * group.multiplier(level);
        *duration_ms = scaled as i32;
    }

    *duration_ms != 0
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::UnitId;

    const RESET: u64 = 18_000;

    fn stun_spell(duration_ms: i32) -> SpellInfo {
        SpellInfo {
            duration_ms,
            diminishing_group: Some(DiminishingGroup::Stun),
            ..SpellInfo::default()
        }
    }

    #[test]
    fn level_escalates_and_caps_at_immune() {
        let mut table = DiminishingTable::default();
        let now = Timestamp(1_000);
        for _ in 0..10 {
            table.apply_diminishing(DiminishingGroup::Stun, true, now);
            table.increment(DiminishingGroup::Stun, now, RESET);
        }
        assert_eq!(
            table.level(DiminishingGroup::Stun, now, RESET),
            DiminishingLevel::Immune
        );
    }

    #[test]
    fn standard_family_goes_immune_after_three() {
        let mut table = DiminishingTable::default();
        for _ in 0..3 {
            table.increment(DiminishingGroup::Disorient, Timestamp(0), RESET);
        }
        assert_eq!(table.entry(DiminishingGroup::Disorient).level, DiminishingLevel::Immune);

        for _ in 0..3 {
            table.increment(DiminishingGroup::Taunt, Timestamp(0), RESET);
        }
        assert_eq!(table.entry(DiminishingGroup::Taunt).level, DiminishingLevel::Level4);
    }

    #[test]
    fn level_resets_after_grace_window_with_empty_stack() {
        let mut table = DiminishingTable::default();
        table.apply_diminishing(DiminishingGroup::Root, true, Timestamp(0));
        table.increment(DiminishingGroup::Root, Timestamp(0), RESET);
        table.increment(DiminishingGroup::Root, Timestamp(0), RESET);
        table.apply_diminishing(DiminishingGroup::Root, false, Timestamp(5_000));

        assert_eq!(
            table.level(DiminishingGroup::Root, Timestamp(22_999), RESET),
            DiminishingLevel::Level3
        );
        assert_eq!(
            table.level(DiminishingGroup::Root, Timestamp(23_000), RESET),
            DiminishingLevel::Level1
        );
    }

    #[test]
    fn level_is_sticky_while_stack_is_held() {
        let mut table = DiminishingTable::default();
        table.apply_diminishing(DiminishingGroup::Stun, true, Timestamp(0));
        table.increment(DiminishingGroup::Stun, Timestamp(0), RESET);
        assert_eq!(
            table.level(DiminishingGroup::Stun, Timestamp(100_000), RESET),
            DiminishingLevel::Level2
        );
    }

    #[test]
    fn increment_after_reset_starts_from_base() {
        let mut table = DiminishingTable::default();
        table.increment(DiminishingGroup::Stun, Timestamp(0), RESET);
        table.increment(DiminishingGroup::Stun, Timestamp(0), RESET);
        table.increment(DiminishingGroup::Stun, Timestamp(50_000), RESET);
        assert_eq!(table.entry(DiminishingGroup::Stun).level, DiminishingLevel::Level2);
    }

    #[test]
    fn standard_family_halves_then_quarters() {
        let target = Unit::player(UnitId(2));
        let spell = stun_spell(4_000);

        let mut duration = spell.duration_ms;
        assert!(apply_to_duration(&spell, &mut duration, false, &target, DiminishingLevel::Level2, 8_000));
        assert_eq!(duration, 2_000);

        let mut duration = spell.duration_ms;
        assert!(apply_to_duration(&spell, &mut duration, false, &target, DiminishingLevel::Level3, 8_000));
        assert_eq!(duration, 1_000);

        let mut duration = spell.duration_ms;
        assert!(!apply_to_duration(&spell, &mut duration, false, &target, DiminishingLevel::Immune, 8_000));
        assert_eq!(duration, 0);
    }

    #[test]
    fn pvp_duration_is_capped() {
        let target = Unit::player(UnitId(2));
        let spell = stun_spell(20_000);
        let mut duration = spell.duration_ms;
        assert!(apply_to_duration(&spell, &mut duration, true, &target, DiminishingLevel::Level1, 8_000));
        assert_eq!(duration, 8_000);
    }

    #[test]
    fn taunt_only_diminishes_on_creatures() {
        let spell = SpellInfo {
            duration_ms: 3_000,
            diminishing_group: Some(DiminishingGroup::Taunt),
            ..SpellInfo::default()
        };
        let creature = Unit::creature(UnitId(3));
        let player = Unit::player(UnitId(4));

        let mut duration = spell.duration_ms;
        apply_to_duration(&spell, &mut duration, true, &creature, DiminishingLevel::Level2, 8_000);
        assert_eq!(duration, 1_950);

        let mut duration = spell.duration_ms;
        apply_to_duration(&spell, &mut duration, true, &player, DiminishingLevel::Level2, 8_000);
        assert_eq!(duration, 3_000);
    }

    #[test]
    fn player_only_groups_skip_creatures() {
        let spell = SpellInfo {
            duration_ms: 4_000,
            diminishing_group: Some(DiminishingGroup::Root),
            ..SpellInfo::default()
        };
        let creature = Unit::creature(UnitId(3));
        let mut duration = spell.duration_ms;
        assert!(apply_to_duration(&spell, &mut duration, false, &creature, DiminishingLevel::Immune, 8_000));
        assert_eq!(duration, 4_000);
    }

    #[test]
    fn infinite_duration_is_untouched() {
        let target = Unit::player(UnitId(2));
        let spell = stun_spell(-1);
        let mut duration = -1;
        assert!(apply_to_duration(&spell, &mut duration, true, &target, DiminishingLevel::Immune, 8_000));
        assert_eq!(duration, -1);
    }
}
