//! Unit registry, simulation clock and the per-call combat context.
//!
//! [`World`] only maps ids to units and owns the clock, the roll nonce, the
//! aura id counter and the delayed-effect queue. Everything a unit owns lives
//! on the [`Unit`] itself.

use std::collections::BTreeMap;

use tracing::{debug, trace, warn};

use crate::aura::{self, AuraRemoveMode};
use crate::collab::Collaborators;
use crate::config::CombatConfig;
use crate::env::{CombatEnv, PcgRng, RngOracle, compute_seed};
use crate::schedule::{DelayedEffect, EventQueue};
use crate::spell::{self, SpellInfo};
use crate::types::{AuraId, SpellId, Timestamp, UnitId};
use crate::unit::{AuraState, DeathState, DuelInfo, Unit};

/// All units taking part in one simulation.
#[derive(Clone, Debug, Default)]
pub struct World {
    units: BTreeMap<UnitId, Unit>,
    now: Timestamp,
    seed: u64,
    nonce: u64,
    next_aura_id: u64,
    pub(crate) events: EventQueue,
}

impl World {
    pub fn new(seed: u64) -> Self {
        Self {
            seed,
            ..Self::default()
        }
    }

    pub fn now(&self) -> Timestamp {
        self.now
    }

    pub fn seed(&self) -> u64 {
        self.seed
    }

    /// Adds a unit.
    ///
    /// # Panics
    ///
    /// Panics if a unit with the same id already exists.
    pub fn spawn(&mut self, unit: Unit) -> UnitId {
        let id = unit.id;
        let previous = self.units.insert(id, unit);
        assert!(previous.is_none(), "unit {id} spawned twice");
        id
    }

    pub fn unit(&self, id: UnitId) -> Option<&Unit> {
        self.units.get(&id)
    }

    pub fn unit_mut(&mut self, id: UnitId) -> Option<&mut Unit> {
        self.units.get_mut(&id)
    }

    pub fn units(&self) -> impl Iterator<Item = &Unit> {
        self.units.values()
    }

    pub fn unit_ids(&self) -> Vec<UnitId> {
        self.units.keys().copied().collect()
    }

    pub fn contains(&self, id: UnitId) -> bool {
        self.units.contains_key(&id)
    }

    /// Starts a duel between two units.
    pub fn start_duel(&mut self, a: UnitId, b: UnitId) {
        if let Some(unit) = self.units.get_mut(&a) {
            unit.duel = Some(DuelInfo { opponent: b });
        }
        if let Some(unit) = self.units.get_mut(&b) {
            unit.duel = Some(DuelInfo { opponent: a });
        }
    }

    pub fn pending_events(&self) -> usize {
        self.events.len()
    }

    pub(crate) fn next_aura_id(&mut self) -> AuraId {
        self.next_aura_id += 1;
        AuraId(self.next_aura_id)
    }

    pub(crate) fn next_nonce(&mut self) -> u64 {
        self.nonce += 1;
        self.nonce
    }

    pub(crate) fn remove_unit(&mut self, id: UnitId) -> Option<Unit> {
        self.units.remove(&id)
    }
}

/// Everything one combat call needs: the world, the read-only environment
/// and the mutable collaborators.
#[derive(Debug)]
pub struct CombatContext<'a> {
    pub world: &'a mut World,
    pub env: CombatEnv<'a>,
    pub collab: Collaborators<'a>,
}

impl<'a> CombatContext<'a> {
    pub fn new(world: &'a mut World, env: CombatEnv<'a>, collab: Collaborators<'a>) -> Self {
        Self { world, env, collab }
    }

    pub fn now(&self) -> Timestamp {
        self.world.now
    }

    pub fn config(&self) -> &'a CombatConfig {
        self.env.config()
    }

    /// Spell lookup for references found in live data; a miss is logged and
    /// the caller skips the effect.
    pub fn spell(&self, id: SpellId) -> Option<&'a SpellInfo> {
        match self.env.spell(id) {
            Ok(spell) => Some(spell),
            Err(error) => {
                warn!(target: "combat::world", spell = %id, %error, "skipping unknown spell reference");
                None
            }
        }
    }

    fn rng(&self) -> &'a dyn RngOracle {
        self.env.rng().unwrap_or(&PcgRng)
    }

    fn seed_for(&mut self, unit: UnitId, context: u32) -> u64 {
        let nonce = self.world.next_nonce();
        compute_seed(self.world.seed, nonce, unit.0, context)
    }

    /// One roll in `0..=ROLL_MAX`.
    pub fn roll_basis_points(&mut self, unit: UnitId, context: u32) -> u32 {
        let seed = self.seed_for(unit, context);
        self.rng().roll_basis_points(seed)
    }

    /// True with probability `chance_pct / 100`.
    pub fn roll_chance(&mut self, unit: UnitId, context: u32, chance_pct: f32) -> bool {
        let seed = self.seed_for(unit, context);
        self.rng().roll_chance(seed, chance_pct)
    }

    /// Uniform value in `min..=max`.
    pub fn roll_range(&mut self, unit: UnitId, context: u32, min: u32, max: u32) -> u32 {
        let seed = self.seed_for(unit, context);
        self.rng().range(seed, min, max)
    }

    /// Advances the simulation by `diff_ms`.
    pub fn update(&mut self, diff_ms: u64) {
        update(self, diff_ms);
    }
}

/// Advances the clock, fires due delayed effects, then updates every unit.
pub fn update(ctx: &mut CombatContext<'_>, diff_ms: u64) {
    ctx.world.now = ctx.world.now + diff_ms;
    let now = ctx.world.now;
    trace!(target: "combat::world", %now, diff_ms, "world update");

    while let Some(event) = ctx.world.events.pop_due(now) {
        match event.effect {
            DelayedEffect::LaunchSpell(request) => {
                if let Err(error) = spell::execute_spell(ctx, &request) {
                    debug!(target: "combat::world", spell = %request.spell, %error, "delayed spell dropped");
                }
            }
        }
    }

    for id in ctx.world.unit_ids() {
        unit_update(ctx, id, diff_ms);
    }
}

/// Per-unit tick: auras, casts, reactive states and the death transition.
///
/// # Panics
///
/// Panics if the unit's proc depth is not zero once the tick finishes.
pub fn unit_update(ctx: &mut CombatContext<'_>, id: UnitId, diff_ms: u64) {
    if !ctx.world.contains(id) {
        return;
    }

    aura::update_auras(ctx, id, diff_ms);
    spell::update_casts(ctx, id, diff_ms);

    let now = ctx.now();
    let Some(unit) = ctx.world.unit_mut(id) else {
        return;
    };
    if unit.defense_state_until.is_some_and(|until| until <= now) {
        unit.defense_state_until = None;
        unit.aura_state.set(AuraState::Defense, false);
    }
    if unit.death_state() == DeathState::JustDied {
        unit.set_death_state(DeathState::Dead);
    }
    assert_eq!(
        unit.proc_depth, 0,
        "unit {id} finished its update with a non-zero proc depth"
    );
}

/// Removes a unit from the world, stripping its auras first.
pub fn despawn(ctx: &mut CombatContext<'_>, id: UnitId) -> Option<Unit> {
    if !ctx.world.contains(id) {
        return None;
    }
    for slot in spell::active_slots(ctx.world.unit(id)?) {
        let _ = spell::interrupt_spell(ctx, id, slot);
    }
    aura::remove_all_auras(ctx, id, AuraRemoveMode::Default);

    // single-target auras this unit still holds on others
    let tracked: Vec<_> = ctx
        .world
        .unit(id)
        .map(|u| u.single_target_auras.clone())
        .unwrap_or_default();
    for tracked in tracked {
        aura::remove_aura(ctx, tracked.target, tracked.aura, AuraRemoveMode::Default);
    }

    ctx.collab.threat.clear(id);
    debug!(target: "combat::world", unit = %id, "unit left the world");
    ctx.world.remove_unit(id)
}
