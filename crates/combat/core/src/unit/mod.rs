//! Combat-relevant state of one actor.
//!
//! A [`Unit`] privately owns its auras, applications, diminishing-returns
//! table and immunity table. Other units reach them only through the public
//! entry points in [`crate::aura`] and [`crate::combat`].
mod state;

pub use state::{AuraState, AuraStateMask, UnitStateFlags};

use std::collections::BTreeMap;

use strum::EnumCount;

use crate::aura::{Aura, AuraApplication, AuraEffect, AuraType};
use crate::diminishing::DiminishingTable;
use crate::immunity::SpellImmunityTable;
use crate::spell::{CastSlot, CurrentCast};
use crate::types::{
    AuraId, CreatureType, PowerType, SchoolValues, SpellId, Stat, Timestamp, UnitId, UnitKind,
};

/// Integer resource meter (health, power) tracked per unit.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ResourceMeter {
    pub current: u32,
    pub maximum: u32,
}

impl ResourceMeter {
    pub fn new(current: u32, maximum: u32) -> Self {
        Self { current, maximum }
    }

    pub fn full(maximum: u32) -> Self {
        Self::new(maximum, maximum)
    }

    pub fn missing(&self) -> u32 {
        self.maximum.saturating_sub(self.current)
    }

    /// Current value as a percentage of maximum.
    pub fn pct(&self) -> f32 {
        if self.maximum == 0 {
            return 0.0;
        }
        self.current as f32 * 100.0 / self.maximum as f32
    }
}

/// Life cycle of a unit. Transitions only move forward.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum DeathState {
    #[default]
    Alive,
    JustDied,
    Dead,
}

/// Base numbers a unit brings into combat before auras are applied.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct UnitStats {
    pub primary: [i32; Stat::COUNT],
    pub armor: i32,
    pub resistances: SchoolValues,
    pub spell_power: i32,
    pub attack_power: i32,
    pub weapon_min_damage: u32,
    pub weapon_max_damage: u32,
    pub attack_time_ms: u32,
    /// Melee and ranged crit chance in percent.
    pub crit_chance: f32,
    pub spell_crit_chance: f32,
    pub dodge_chance: f32,
    pub parry_chance: f32,
    pub block_chance: f32,
    pub block_value: u32,
    /// Bonus melee/ranged hit chance in percent.
    pub hit_chance: f32,
    pub spell_hit_chance: f32,
    /// Versatility in percent of damage and healing done.
    pub versatility: f32,
    pub can_parry: bool,
    pub can_block: bool,
}

impl Default for UnitStats {
    fn default() -> Self {
        Self {
            primary: [10; Stat::COUNT],
            armor: 0,
            resistances: [0; crate::types::SpellSchool::COUNT],
            spell_power: 0,
            attack_power: 0,
            weapon_min_damage: 1,
            weapon_max_damage: 2,
            attack_time_ms: 2_000,
            crit_chance: 0.0,
            spell_crit_chance: 0.0,
            dodge_chance: 0.0,
            parry_chance: 0.0,
            block_chance: 0.0,
            block_value: 0,
            hit_chance: 0.0,
            spell_hit_chance: 0.0,
            versatility: 0.0,
            can_parry: true,
            can_block: false,
        }
    }
}

/// Active duel between two player units.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct DuelInfo {
    pub opponent: UnitId,
}

/// A single-target aura this unit cast on someone.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) struct SingleTargetRef {
    pub target: UnitId,
    pub aura: AuraId,
}

/// One combatant.
#[derive(Clone, Debug)]
pub struct Unit {
    pub id: UnitId,
    pub kind: UnitKind,
    pub player_controlled: bool,
    /// Controlling unit (pet owner, totem summoner).
    pub owner: Option<UnitId>,
    pub level: u32,
    pub faction: u32,
    pub creature_type: CreatureType,
    pub health: ResourceMeter,
    pub power: ResourceMeter,
    pub power_type: PowerType,
    pub stats: UnitStats,
    pub duel: Option<DuelInfo>,
    death_state: DeathState,
    pub(crate) state: UnitStateFlags,
    pub(crate) aura_state: AuraStateMask,
    pub(crate) owned_auras: BTreeMap<AuraId, Aura>,
    pub(crate) applied_auras: BTreeMap<AuraId, AuraApplication>,
    pub(crate) single_target_auras: Vec<SingleTargetRef>,
    pub(crate) diminishing: DiminishingTable,
    pub(crate) immunities: SpellImmunityTable,
    pub(crate) casts: BTreeMap<CastSlot, CurrentCast>,
    pub(crate) proc_depth: u32,
    pub(crate) cant_proc: u32,
    pub(crate) defense_state_until: Option<Timestamp>,
}

impl Unit {
    pub fn new(id: UnitId, kind: UnitKind) -> Self {
        Self {
            id,
            kind,
            player_controlled: matches!(kind, UnitKind::Player),
            owner: None,
            level: 1,
            faction: 0,
            creature_type: CreatureType::None,
            health: ResourceMeter::full(100),
            power: ResourceMeter::full(100),
            power_type: PowerType::Mana,
            stats: UnitStats::default(),
            duel: None,
            death_state: DeathState::Alive,
            state: UnitStateFlags::empty(),
            aura_state: AuraStateMask::default(),
            owned_auras: BTreeMap::new(),
            applied_auras: BTreeMap::new(),
            single_target_auras: Vec::new(),
            diminishing: DiminishingTable::default(),
            immunities: SpellImmunityTable::default(),
            casts: BTreeMap::new(),
            proc_depth: 0,
            cant_proc: 0,
            defense_state_until: None,
        }
    }

    pub fn player(id: UnitId) -> Self {
        Self::new(id, UnitKind::Player)
    }

    pub fn creature(id: UnitId) -> Self {
        Self::new(id, UnitKind::Creature)
    }

    #[must_use]
    pub fn with_health(mut self, current: u32, maximum: u32) -> Self {
        self.health = ResourceMeter::new(current, maximum);
        self
    }

    #[must_use]
    pub fn with_power(mut self, power_type: PowerType, current: u32, maximum: u32) -> Self {
        self.power_type = power_type;
        self.power = ResourceMeter::new(current, maximum);
        self
    }

    #[must_use]
    pub fn with_level(mut self, level: u32) -> Self {
        self.level = level;
        self
    }

    #[must_use]
    pub fn with_faction(mut self, faction: u32) -> Self {
        self.faction = faction;
        self
    }

    #[must_use]
    pub fn with_creature_type(mut self, creature_type: CreatureType) -> Self {
        self.creature_type = creature_type;
        self
    }

    #[must_use]
    pub fn with_stats(mut self, stats: UnitStats) -> Self {
        self.stats = stats;
        self
    }

    #[must_use]
    pub fn with_owner(mut self, owner: UnitId) -> Self {
        self.owner = Some(owner);
        self.player_controlled = true;
        self
    }

    // ========================================================================
    // Life cycle
    // ========================================================================

    pub fn death_state(&self) -> DeathState {
        self.death_state
    }

    pub fn is_alive(&self) -> bool {
        self.death_state == DeathState::Alive
    }

    /// Moves the death state forward.
    ///
    /// # Panics
    ///
    /// Panics when asked to move backwards; a revived corpse would leave auras
    /// and threat in an undefined state.
    pub(crate) fn set_death_state(&mut self, next: DeathState) {
        assert!(
            next >= self.death_state,
            "unit {} death state cannot go from {:?} to {:?}",
            self.id,
            self.death_state,
            next
        );
        self.death_state = next;
    }

    // ========================================================================
    // State flags
    // ========================================================================

    pub fn unit_state(&self) -> UnitStateFlags {
        self.state
    }

    pub fn has_unit_state(&self, flags: UnitStateFlags) -> bool {
        self.state.intersects(flags)
    }

    pub fn is_in_combat(&self) -> bool {
        self.state.contains(UnitStateFlags::IN_COMBAT)
    }

    pub fn is_controlled(&self) -> bool {
        self.has_unit_state(UnitStateFlags::CONTROLLED)
    }

    pub fn has_aura_state(&self, state: AuraState) -> bool {
        self.aura_state.has(state)
    }

    pub fn aura_state_mask(&self) -> AuraStateMask {
        self.aura_state
    }

    /// Refreshes the health-threshold aura states.
    pub(crate) fn update_health_states(&mut self, low_pct: u32, mid_pct: u32, high_pct: u32) {
        let pct = self.health.pct();
        let alive = self.is_alive();
        self.aura_state
            .set(AuraState::Health20Pct, alive && pct < low_pct as f32);
        self.aura_state
            .set(AuraState::Health35Pct, alive && pct < mid_pct as f32);
        self.aura_state
            .set(AuraState::Health75Pct, alive && pct > high_pct as f32);
    }

    // ========================================================================
    // Casting
    // ========================================================================

    pub fn current_cast(&self, slot: CastSlot) -> Option<&CurrentCast> {
        self.casts.get(&slot)
    }

    /// True while a generic or channelled spell is in progress.
    pub fn is_casting_non_melee(&self) -> bool {
        self.casts.contains_key(&CastSlot::Generic) || self.casts.contains_key(&CastSlot::Channeled)
    }

    // ========================================================================
    // Aura access
    // ========================================================================

    /// Auras this unit owns, including ones mid-removal.
    pub fn owned_auras(&self) -> impl Iterator<Item = &Aura> {
        self.owned_auras.values()
    }

    /// Live applications on this unit.
    pub fn applications(&self) -> impl Iterator<Item = &AuraApplication> {
        self.applied_auras.values()
    }

    pub fn aura(&self, id: AuraId) -> Option<&Aura> {
        self.owned_auras.get(&id)
    }

    pub(crate) fn aura_mut(&mut self, id: AuraId) -> Option<&mut Aura> {
        self.owned_auras.get_mut(&id)
    }

    pub fn application(&self, id: AuraId) -> Option<&AuraApplication> {
        self.applied_auras.get(&id)
    }

    /// Whether any applied aura comes from `spell`.
    pub fn has_aura(&self, spell: SpellId) -> bool {
        self.applied_auras
            .keys()
            .filter_map(|id| self.owned_auras.get(id))
            .any(|aura| aura.spell == spell)
    }

    /// First applied aura from `spell`, optionally restricted to one caster.
    pub fn find_aura(&self, spell: SpellId, caster: Option<UnitId>) -> Option<&Aura> {
        self.applied_auras
            .keys()
            .filter_map(|id| self.owned_auras.get(id))
            .find(|aura| aura.spell == spell && (caster.is_none() || aura.caster == caster))
    }

    pub fn applied_aura_count(&self) -> usize {
        self.applied_auras.len()
    }

    /// Applied effects of one aura type, in application order.
    pub fn applied_effects(&self, aura_type: AuraType) -> impl Iterator<Item = (&Aura, &AuraEffect)> {
        self.applied_auras.iter().flat_map(move |(id, app)| {
            self.owned_auras
                .get(id)
                .into_iter()
                .flat_map(move |aura| {
                    aura.effects()
                        .filter(move |e| e.aura_type == aura_type && app.has_effect(e.slot))
                        .map(move |e| (aura, e))
                })
        })
    }

    pub fn has_aura_type(&self, aura_type: AuraType) -> bool {
        self.applied_effects(aura_type).next().is_some()
    }

    pub fn diminishing(&self) -> &DiminishingTable {
        &self.diminishing
    }

    pub fn immunities(&self) -> &SpellImmunityTable {
        &self.immunities
    }

    /// Current proc nesting depth on this unit.
    pub fn proc_depth(&self) -> u32 {
        self.proc_depth
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resource_meter_percentages() {
        let meter = ResourceMeter::new(25, 100);
        assert_eq!(meter.pct(), 25.0);
        assert_eq!(meter.missing(), 75);
        assert_eq!(ResourceMeter::new(0, 0).pct(), 0.0);
    }

    #[test]
    fn death_state_moves_forward() {
        let mut unit = Unit::creature(UnitId(1));
        unit.set_death_state(DeathState::JustDied);
        unit.set_death_state(DeathState::Dead);
        assert_eq!(unit.death_state(), DeathState::Dead);
    }

    #[test]
    #[should_panic(expected = "death state cannot go")]
    fn death_state_never_moves_back() {
        let mut unit = Unit::creature(UnitId(1));
        unit.set_death_state(DeathState::JustDied);
        unit.set_death_state(DeathState::Alive);
    }

    #[test]
    fn health_states_follow_thresholds() {
        let mut unit = Unit::creature(UnitId(1)).with_health(15, 100);
        unit.update_health_states(20, 35, 75);
        assert!(unit.has_aura_state(AuraState::Health20Pct));
        assert!(unit.has_aura_state(AuraState::Health35Pct));
        assert!(!unit.has_aura_state(AuraState::Health75Pct));

        unit.health.current = 90;
        unit.update_health_states(20, 35, 75);
        assert!(!unit.has_aura_state(AuraState::Health20Pct));
        assert!(unit.has_aura_state(AuraState::Health75Pct));
    }
}
