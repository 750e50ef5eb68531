//! Fixtures for tests: an in-memory spell book, scripted rolls, recording
//! collaborators and a fluent spell builder.
//!
//! Enabled for unit tests and, through the `test-utils` feature, for
//! downstream integration tests.

use std::cell::RefCell;
use std::collections::{BTreeMap, HashMap, VecDeque};

use crate::aura::AuraType;
use crate::collab::{Collaborators, NoopHooks, SpellHistory, ThreatManager};
use crate::config::CombatConfig;
use crate::diminishing::DiminishingGroup;
use crate::env::{CombatEnv, PcgRng, RngOracle, SpellOracle};
use crate::log::CombatLogEntry;
use crate::proc::{ProcAttributes, ProcFlags, SpellProcEntry};
use crate::spell::{
    AuraInterruptFlags, CastInterruptFlags, EffectTarget, SpellAttributes, SpellEffectInfo, SpellEffectKind,
    SpellFamilyFlags, SpellGroupStackRule, SpellInfo,
};
use crate::types::{DamageClass, DispelType, ItemId, Mechanic, SchoolMask, SpellId, UnitId};
use crate::unit::{AuraState, Unit};
use crate::world::{CombatContext, World};

// ============================================================================
// Oracles
// ============================================================================

/// Spell catalog backed by a map.
#[derive(Clone, Debug, Default)]
pub struct TestSpellBook {
    spells: HashMap<SpellId, SpellInfo>,
    rules: HashMap<u32, SpellGroupStackRule>,
}

impl TestSpellBook {
    pub fn insert(&mut self, spell: SpellInfo) {
        self.spells.insert(spell.id, spell);
    }

    pub fn set_group_rule(&mut self, group: u32, rule: SpellGroupStackRule) {
        self.rules.insert(group, rule);
    }

    pub fn get(&self, id: SpellId) -> Option<&SpellInfo> {
        self.spells.get(&id)
    }
}

impl SpellOracle for TestSpellBook {
    fn spell(&self, id: SpellId) -> Option<&SpellInfo> {
        self.spells.get(&id)
    }

    fn group_rule(&self, group: u32) -> SpellGroupStackRule {
        self.rules.get(&group).copied().unwrap_or_default()
    }
}

/// Basis-point rolls taken from a script first, then from [`PcgRng`].
#[derive(Debug, Default)]
pub struct ScriptedRng {
    rolls: RefCell<VecDeque<u32>>,
}

impl ScriptedRng {
    /// Queues rolls for the next `roll_basis_points` calls (and the percent
    /// rolls built on them).
    pub fn script(&self, rolls: &[u32]) {
        self.rolls.borrow_mut().extend(rolls.iter().copied());
    }

    pub fn pending(&self) -> usize {
        self.rolls.borrow().len()
    }
}

impl RngOracle for ScriptedRng {
    fn next_u32(&self, seed: u64) -> u32 {
        PcgRng.next_u32(seed)
    }

    fn roll_basis_points(&self, seed: u64) -> u32 {
        match self.rolls.borrow_mut().pop_front() {
            Some(roll) => roll,
            None => PcgRng.roll_basis_points(seed),
        }
    }
}

// ============================================================================
// Collaborators
// ============================================================================

/// Threat manager that sums everything it is told.
#[derive(Clone, Debug, Default)]
pub struct RecordingThreat {
    threat: BTreeMap<(UnitId, UnitId), f32>,
    assists: BTreeMap<(UnitId, UnitId), f32>,
    pub cleared: Vec<UnitId>,
}

impl RecordingThreat {
    /// Threat `source` holds on `victim`'s list.
    pub fn total(&self, victim: UnitId, source: UnitId) -> f32 {
        self.threat.get(&(victim, source)).copied().unwrap_or(0.0)
    }

    /// Assist threat `helper` generated by helping `beneficiary`.
    pub fn assisted(&self, beneficiary: UnitId, helper: UnitId) -> f32 {
        self.assists.get(&(beneficiary, helper)).copied().unwrap_or(0.0)
    }
}

impl ThreatManager for RecordingThreat {
    fn add_threat(&mut self, victim: UnitId, source: UnitId, amount: f32, _spell: Option<SpellId>) {
        *self.threat.entry((victim, source)).or_default() += amount;
    }

    fn assist_threat(&mut self, beneficiary: UnitId, helper: UnitId, amount: f32, _spell: Option<SpellId>) {
        *self.assists.entry((beneficiary, helper)).or_default() += amount;
    }

    fn clear(&mut self, unit: UnitId) {
        self.threat.retain(|(victim, source), _| *victim != unit && *source != unit);
        self.cleared.push(unit);
    }
}

/// One `start_cooldown` call.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct StartedCooldown {
    pub spell: SpellId,
    pub item: Option<ItemId>,
    pub caster: UnitId,
    pub infinite: bool,
}

/// Spell history that records calls.
#[derive(Clone, Debug, Default)]
pub struct RecordingHistory {
    pub started: Vec<StartedCooldown>,
    pub events: Vec<(SpellId, UnitId)>,
}

impl SpellHistory for RecordingHistory {
    fn start_cooldown(&mut self, spell: SpellId, item: Option<ItemId>, caster: UnitId, infinite: bool) {
        self.started.push(StartedCooldown {
            spell,
            item,
            caster,
            infinite,
        });
    }

    fn send_cooldown_event(&mut self, spell: SpellId, caster: UnitId) {
        self.events.push((spell, caster));
    }
}

// ============================================================================
// Harness
// ============================================================================

/// A world plus every oracle and collaborator, ready to hand out contexts.
#[derive(Debug, Default)]
pub struct Harness {
    pub world: World,
    pub config: CombatConfig,
    pub spells: TestSpellBook,
    pub rng: ScriptedRng,
    pub threat: RecordingThreat,
    pub history: RecordingHistory,
    pub log: Vec<CombatLogEntry>,
    pub hooks: NoopHooks,
}

impl Harness {
    pub fn new() -> Self {
        Self {
            world: World::new(0x5eed),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_config(mut self, config: CombatConfig) -> Self {
        self.config = config;
        self
    }

    pub fn add_spell(&mut self, spell: SpellInfo) {
        self.spells.insert(spell);
    }

    pub fn spawn(&mut self, unit: Unit) -> UnitId {
        self.world.spawn(unit)
    }

    pub fn ctx(&mut self) -> CombatContext<'_> {
        let env = CombatEnv::new(&self.config)
            .with_spells(&self.spells)
            .with_rng(&self.rng);
        let collab = Collaborators::new(&mut self.threat, &mut self.history, &mut self.log, &mut self.hooks);
        CombatContext::new(&mut self.world, env, collab)
    }
}

// ============================================================================
// Spell builder
// ============================================================================

/// Fluent builder for [`SpellInfo`]. Effect modifiers such as
/// [`SpellBuilder::trigger`] act on the most recently added slot.
#[derive(Clone, Debug)]
pub struct SpellBuilder {
    info: SpellInfo,
}

impl SpellBuilder {
    pub fn new(id: SpellId) -> Self {
        Self {
            info: SpellInfo {
                id,
                name: format!("spell {id}"),
                ..SpellInfo::default()
            },
        }
    }

    #[must_use]
    pub fn school(mut self, school: SchoolMask) -> Self {
        self.info.school_mask = school;
        self
    }

    #[must_use]
    pub fn magic(mut self) -> Self {
        self.info.damage_class = DamageClass::Magic;
        self
    }

    #[must_use]
    pub fn melee(mut self) -> Self {
        self.info.damage_class = DamageClass::Melee;
        self
    }

    #[must_use]
    pub fn ranged(mut self) -> Self {
        self.info.damage_class = DamageClass::Ranged;
        self
    }

    #[must_use]
    pub fn attributes(mut self, attributes: SpellAttributes) -> Self {
        self.info.attributes |= attributes;
        self
    }

    #[must_use]
    pub fn duration(mut self, duration_ms: i32) -> Self {
        self.info.duration_ms = duration_ms;
        self
    }

    #[must_use]
    pub fn cast_time(mut self, cast_time_ms: u32) -> Self {
        self.info.cast_time_ms = cast_time_ms;
        self
    }

    #[must_use]
    pub fn launch_delay(mut self, delay_ms: u32) -> Self {
        self.info.launch_delay_ms = delay_ms;
        self
    }

    #[must_use]
    pub fn recovery(mut self, recovery_ms: u32) -> Self {
        self.info.recovery_ms = recovery_ms;
        self
    }

    /// Channeled spell lasting `duration_ms`.
    #[must_use]
    pub fn channeled(mut self, duration_ms: i32) -> Self {
        self.info.attributes |= SpellAttributes::CHANNELED;
        self.info.duration_ms = duration_ms;
        self
    }

    #[must_use]
    pub fn max_stack(mut self, max_stack: u32) -> Self {
        self.info.max_stack = max_stack;
        self
    }

    #[must_use]
    pub fn charges(mut self, charges: u32) -> Self {
        self.info.proc_charges = charges;
        self
    }

    #[must_use]
    pub fn mechanic(mut self, mechanic: Mechanic) -> Self {
        self.info.mechanic = mechanic;
        self
    }

    #[must_use]
    pub fn dispel(mut self, dispel: DispelType) -> Self {
        self.info.dispel = dispel;
        self
    }

    #[must_use]
    pub fn stack_group(mut self, group: u32) -> Self {
        self.info.stack_group = Some(group);
        self
    }

    #[must_use]
    pub fn single_target_group(mut self, group: u32) -> Self {
        self.info.single_target_group = Some(group);
        self
    }

    #[must_use]
    pub fn dr_group(mut self, group: DiminishingGroup) -> Self {
        self.info.diminishing_group = Some(group);
        self
    }

    #[must_use]
    pub fn family(mut self, family: u32, flags: u64) -> Self {
        self.info.family = family;
        self.info.family_flags = SpellFamilyFlags(flags);
        self
    }

    #[must_use]
    pub fn aura_state(mut self, state: AuraState) -> Self {
        self.info.aura_state = Some(state);
        self
    }

    #[must_use]
    pub fn interrupt_flags(mut self, flags: CastInterruptFlags) -> Self {
        self.info.interrupt_flags = flags;
        self
    }

    #[must_use]
    pub fn aura_interrupt_flags(mut self, flags: AuraInterruptFlags) -> Self {
        self.info.aura_interrupt_flags = flags;
        self
    }

    #[must_use]
    pub fn channel_interrupt_flags(mut self, flags: AuraInterruptFlags) -> Self {
        self.info.channel_interrupt_flags = flags;
        self
    }

    #[must_use]
    pub fn proc(mut self, entry: SpellProcEntry) -> Self {
        self.info.proc = Some(entry);
        self
    }

    /// Appends a slot. Extra slots beyond capacity are dropped.
    #[must_use]
    pub fn effect(mut self, effect: SpellEffectInfo) -> Self {
        let _ = self.info.effects.try_push(effect);
        self
    }

    #[must_use]
    pub fn school_damage(self, base_points: i32) -> Self {
        self.effect(SpellEffectInfo::new(SpellEffectKind::SchoolDamage, base_points))
    }

    #[must_use]
    pub fn weapon_damage(self, bonus: i32) -> Self {
        self.effect(SpellEffectInfo::new(SpellEffectKind::WeaponDamage, bonus))
    }

    #[must_use]
    pub fn heal(self, base_points: i32) -> Self {
        self.effect(SpellEffectInfo::new(SpellEffectKind::Heal, base_points))
    }

    #[must_use]
    pub fn energize(self, base_points: i32) -> Self {
        self.effect(SpellEffectInfo::new(SpellEffectKind::Energize, base_points))
    }

    #[must_use]
    pub fn aura(self, aura_type: AuraType, base_points: i32) -> Self {
        self.effect(SpellEffectInfo::new(SpellEffectKind::ApplyAura(aura_type), base_points))
    }

    /// Crowd control that breaks once `threshold` damage was taken (`0`
    /// breaks on any damage).
    #[must_use]
    pub fn breakable_crowd_control(self, aura_type: AuraType, threshold: i32) -> Self {
        self.aura(aura_type, threshold).proc(SpellProcEntry {
            proc_flags: ProcFlags::TAKE_ANY_DAMAGE,
            attributes: ProcAttributes::TRIGGERED_CAN_PROC,
            ..SpellProcEntry::default()
        })
    }

    fn last_effect(&mut self) -> Option<&mut SpellEffectInfo> {
        self.info.effects.last_mut()
    }

    #[must_use]
    pub fn trigger(mut self, spell: SpellId) -> Self {
        if let Some(effect) = self.last_effect() {
            effect.trigger_spell = Some(spell);
        }
        self
    }

    #[must_use]
    pub fn misc(mut self, misc_value: i32) -> Self {
        if let Some(effect) = self.last_effect() {
            effect.misc_value = misc_value;
        }
        self
    }

    #[must_use]
    pub fn amplitude(mut self, amplitude_ms: u32) -> Self {
        if let Some(effect) = self.last_effect() {
            effect.amplitude_ms = amplitude_ms;
        }
        self
    }

    #[must_use]
    pub fn coefficient(mut self, coefficient: f32) -> Self {
        if let Some(effect) = self.last_effect() {
            effect.bonus_coefficient = coefficient;
        }
        self
    }

    #[must_use]
    pub fn die_sides(mut self, die_sides: u32) -> Self {
        if let Some(effect) = self.last_effect() {
            effect.die_sides = die_sides;
        }
        self
    }

    #[must_use]
    pub fn on_caster(mut self) -> Self {
        if let Some(effect) = self.last_effect() {
            effect.target = EffectTarget::Caster;
        }
        self
    }

    pub fn build(self) -> SpellInfo {
        self.info
    }
}
