//! Synchronous simulation driver.
//!
//! [`Simulation`] owns the [`World`] together with every collaborator the
//! combat core calls out to, and advances them in fixed ticks. All entry
//! points borrow a fresh [`CombatContext`] for the duration of one call.

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Arc;

use combat_content::ContentFactory;
use combat_core::aura::{self, AuraApplyRequest};
use combat_core::spell::{self, CastRequest};
use combat_core::{
    AuraId, CastOutcome, CastSlot, Collaborators, CombatConfig, CombatContext, CombatHooks, MeleeHitOutcome,
    SpellId, Timestamp, Unit, UnitId, WeaponAttackType, World, world,
};
use tracing::{debug, info, trace};

use crate::combat_log::CombatLogBuffer;
use crate::error::{Result, RuntimeError};
use crate::history::{CooldownHistory, CooldownState};
use crate::hooks::TracingHooks;
use crate::oracle::{OracleManager, SpellOracleImpl};
use crate::threat::ThreatTable;

/// Simulation configuration shared by the driver and the combat core.
#[derive(Debug, Clone)]
pub struct SimulationConfig {
    pub combat: CombatConfig,
    /// Milliseconds advanced by one [`Simulation::tick`].
    pub tick_ms: u64,
    /// World seed feeding every deterministic roll.
    pub seed: u64,
    pub log_capacity: usize,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            combat: CombatConfig::default(),
            tick_ms: 100,
            seed: 0,
            log_capacity: CombatLogBuffer::DEFAULT_CAPACITY,
        }
    }
}

/// Running auto-attack of one unit.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
struct Swing {
    victim: UnitId,
    attack_type: WeaponAttackType,
    /// Time left until the next swing.
    timer_ms: u64,
}

/// Deterministic combat simulation driven in fixed ticks.
pub struct Simulation {
    config: SimulationConfig,
    world: World,
    oracles: OracleManager,
    threat: ThreatTable,
    history: CooldownHistory,
    log: CombatLogBuffer,
    hooks: Box<dyn CombatHooks>,
    swings: BTreeMap<UnitId, Swing>,
}

impl Simulation {
    /// Create a new simulation builder
    pub fn builder() -> SimulationBuilder {
        SimulationBuilder::new()
    }

    pub fn config(&self) -> &SimulationConfig {
        &self.config
    }

    pub fn now(&self) -> Timestamp {
        self.world.now()
    }

    pub fn world(&self) -> &World {
        &self.world
    }

    pub fn unit(&self, id: UnitId) -> Option<&Unit> {
        self.world.unit(id)
    }

    pub fn threat(&self) -> &ThreatTable {
        &self.threat
    }

    pub fn history(&self) -> &CooldownHistory {
        &self.history
    }

    pub fn combat_log(&self) -> &CombatLogBuffer {
        &self.log
    }

    pub fn combat_log_mut(&mut self) -> &mut CombatLogBuffer {
        &mut self.log
    }

    pub fn oracles(&self) -> &OracleManager {
        &self.oracles
    }

    /// Runs `f` with a combat context over the simulation's world and
    /// collaborators.
    pub fn with_context<R>(&mut self, f: impl FnOnce(&mut CombatContext<'_>) -> R) -> R {
        let env = self.oracles.as_combat_env(&self.config.combat);
        let collab = Collaborators::new(
            &mut self.threat,
            &mut self.history,
            &mut self.log,
            self.hooks.as_mut(),
        );
        let mut ctx = CombatContext::new(&mut self.world, env, collab);
        f(&mut ctx)
    }

    // ========================================================================
    // Units
    // ========================================================================

    pub fn spawn(&mut self, unit: Unit) -> Result<UnitId> {
        if self.world.contains(unit.id) {
            return Err(RuntimeError::DuplicateUnit(unit.id));
        }
        let id = self.world.spawn(unit);
        debug!(target: "runtime::simulation", unit = %id, "unit spawned");
        Ok(id)
    }

    /// Removes a unit, cancelling its casts and auras and forgetting its
    /// threat and cooldowns.
    pub fn despawn(&mut self, id: UnitId) -> Result<Unit> {
        let unit = self
            .with_context(|ctx| world::despawn(ctx, id))
            .ok_or(RuntimeError::UnknownUnit(id))?;
        self.history.reset_all(id);
        self.swings.remove(&id);
        self.swings.retain(|_, swing| swing.victim != id);
        Ok(unit)
    }

    // ========================================================================
    // Actions
    // ========================================================================

    /// Casts a spell after checking the caster's cooldown.
    pub fn cast(&mut self, request: CastRequest) -> Result<CastOutcome> {
        self.require(request.caster)?;
        if !request.triggered {
            self.check_cooldown(request.caster, request.spell)?;
        }
        let (spell_id, caster) = (request.spell, request.caster);
        let outcome = self.with_context(|ctx| spell::cast_spell(ctx, request))?;
        trace!(target: "runtime::simulation", spell = %spell_id, %caster, ?outcome, "cast");
        Ok(outcome)
    }

    pub fn interrupt(&mut self, unit: UnitId, slot: CastSlot) -> Result<()> {
        self.require(unit)?;
        self.with_context(|ctx| spell::interrupt_spell(ctx, unit, slot))?;
        Ok(())
    }

    /// Interrupts whichever slot is casting `spell`.
    pub fn interrupt_spell(&mut self, unit: UnitId, spell_id: SpellId) -> Result<CastSlot> {
        self.require(unit)?;
        Ok(self.with_context(|ctx| spell::interrupt_spell_by_id(ctx, unit, spell_id))?)
    }

    pub fn apply_aura(&mut self, request: &AuraApplyRequest) -> Result<AuraId> {
        self.require(request.target)?;
        Ok(self.with_context(|ctx| aura::apply_aura(ctx, request))?)
    }

    /// One immediate weapon swing. `None` when the swing could not happen
    /// (dead or controlled attacker, dead victim).
    pub fn swing(
        &mut self,
        attacker: UnitId,
        victim: UnitId,
        attack_type: WeaponAttackType,
    ) -> Result<Option<MeleeHitOutcome>> {
        self.require(attacker)?;
        self.require(victim)?;
        Ok(self.with_context(|ctx| spell::attacker_state_update(ctx, attacker, victim, attack_type)))
    }

    /// Starts auto-attacking: the first swing lands on the next tick, later
    /// ones every weapon attack time.
    pub fn start_attack(&mut self, attacker: UnitId, victim: UnitId) -> Result<()> {
        self.require(attacker)?;
        self.require(victim)?;
        self.swings.insert(
            attacker,
            Swing {
                victim,
                attack_type: WeaponAttackType::BaseAttack,
                timer_ms: 0,
            },
        );
        Ok(())
    }

    pub fn stop_attack(&mut self, attacker: UnitId) {
        self.swings.remove(&attacker);
    }

    pub fn is_attacking(&self, attacker: UnitId) -> bool {
        self.swings.contains_key(&attacker)
    }

    // ========================================================================
    // Time
    // ========================================================================

    /// Advances by one configured tick.
    pub fn tick(&mut self) {
        self.advance(self.config.tick_ms);
    }

    /// Advances the world clock by `diff_ms`: cooldowns, delayed effects,
    /// auras and casts, then auto-attacks.
    pub fn advance(&mut self, diff_ms: u64) {
        // cooldowns started during this update count from the new time
        self.history.advance_to(self.world.now() + diff_ms);
        self.with_context(|ctx| world::update(ctx, diff_ms));
        self.update_swings(diff_ms);
    }

    /// Ticks until `duration_ms` has elapsed. Returns the number of ticks.
    pub fn run_for(&mut self, duration_ms: u64) -> u64 {
        let mut elapsed = 0;
        let mut ticks = 0;
        while elapsed < duration_ms {
            let step = self.config.tick_ms.min(duration_ms - elapsed);
            self.advance(step);
            elapsed += step;
            ticks += 1;
        }
        ticks
    }

    /// Ticks until `done` holds or `limit_ms` has elapsed. Returns whether
    /// `done` was reached.
    pub fn run_until(&mut self, limit_ms: u64, mut done: impl FnMut(&Simulation) -> bool) -> bool {
        let mut elapsed = 0;
        while !done(self) {
            if elapsed >= limit_ms {
                return false;
            }
            self.tick();
            elapsed += self.config.tick_ms;
        }
        true
    }

    fn update_swings(&mut self, diff_ms: u64) {
        let attackers: Vec<UnitId> = self.swings.keys().copied().collect();
        for attacker in attackers {
            let Some(mut swing) = self.swings.get(&attacker).copied() else {
                continue;
            };
            let alive = |id| self.world.unit(id).is_some_and(Unit::is_alive);
            if !alive(attacker) || !alive(swing.victim) {
                debug!(target: "runtime::simulation", %attacker, victim = %swing.victim, "auto-attack stopped");
                self.swings.remove(&attacker);
                continue;
            }

            swing.timer_ms = swing.timer_ms.saturating_sub(diff_ms);
            if swing.timer_ms == 0 {
                let (victim, attack_type) = (swing.victim, swing.attack_type);
                self.with_context(|ctx| spell::attacker_state_update(ctx, attacker, victim, attack_type));
                swing.timer_ms = self
                    .world
                    .unit(attacker)
                    .map_or(0, |u| u64::from(u.stats.attack_time_ms));
            }
            if let Some(slot) = self.swings.get_mut(&attacker) {
                *slot = swing;
            }
        }
    }

    fn require(&self, id: UnitId) -> Result<()> {
        if self.world.contains(id) {
            Ok(())
        } else {
            Err(RuntimeError::UnknownUnit(id))
        }
    }

    fn check_cooldown(&self, caster: UnitId, spell: SpellId) -> Result<()> {
        let remaining_ms = match self.history.state(caster, spell) {
            CooldownState::Ready => return Ok(()),
            CooldownState::Remaining(left) => left,
            CooldownState::Held => u64::MAX,
        };
        debug!(target: "runtime::simulation", %spell, %caster, remaining_ms, "spell on cooldown");
        Err(RuntimeError::SpellOnCooldown {
            spell,
            caster,
            remaining_ms,
        })
    }
}

impl std::fmt::Debug for Simulation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Simulation")
            .field("now", &self.world.now())
            .field("units", &self.world.unit_ids().len())
            .field("log", &self.log.len())
            .finish_non_exhaustive()
    }
}

/// Builder for [`Simulation`] with flexible configuration.
pub struct SimulationBuilder {
    config: SimulationConfig,
    oracles: Option<OracleManager>,
    content_dir: Option<PathBuf>,
    hooks: Option<Box<dyn CombatHooks>>,
}

impl SimulationBuilder {
    fn new() -> Self {
        Self {
            config: SimulationConfig::default(),
            oracles: None,
            content_dir: None,
            hooks: None,
        }
    }

    /// Override simulation configuration
    pub fn config(mut self, config: SimulationConfig) -> Self {
        self.config = config;
        self
    }

    pub fn combat_config(mut self, combat: CombatConfig) -> Self {
        self.config.combat = combat;
        self
    }

    pub fn seed(mut self, seed: u64) -> Self {
        self.config.seed = seed;
        self
    }

    pub fn tick_ms(mut self, tick_ms: u64) -> Self {
        self.config.tick_ms = tick_ms;
        self
    }

    /// Set the oracle manager
    pub fn oracles(mut self, oracles: OracleManager) -> Self {
        self.oracles = Some(oracles);
        self
    }

    /// Shorthand for an oracle manager around `spells`.
    pub fn spells(self, spells: SpellOracleImpl) -> Self {
        self.oracles(OracleManager::new(Arc::new(spells)))
    }

    /// Load `config.toml` and `spells.ron` from a content directory at build
    /// time. Explicitly set oracles take precedence over the loaded catalog.
    pub fn content_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.content_dir = Some(dir.into());
        self
    }

    /// Set behavioural hooks; [`TracingHooks`] when not provided.
    pub fn hooks(mut self, hooks: impl CombatHooks + 'static) -> Self {
        self.hooks = Some(Box::new(hooks));
        self
    }

    pub fn build(self) -> Result<Simulation> {
        let SimulationBuilder {
            mut config,
            mut oracles,
            content_dir,
            hooks,
        } = self;

        if config.tick_ms == 0 {
            return Err(RuntimeError::ZeroTick);
        }

        if let Some(dir) = content_dir {
            let factory = ContentFactory::new(dir);
            config.combat = factory
                .load_config()
                .map_err(|e| RuntimeError::Content(e.into()))?;
            if oracles.is_none() {
                let catalog = factory
                    .load_spells()
                    .map_err(|e| RuntimeError::Content(e.into()))?;
                oracles = Some(OracleManager::new(Arc::new(SpellOracleImpl::from_catalog(catalog))));
            }
        }
        let oracles = oracles.ok_or(RuntimeError::MissingOracles)?;

        let mut history = CooldownHistory::new();
        for spell in oracles.spells().iter() {
            history.set_recovery(spell.id, u64::from(spell.recovery_ms));
        }

        info!(
            target: "runtime::simulation",
            spells = oracles.spells().len(),
            tick_ms = config.tick_ms,
            seed = config.seed,
            "simulation built"
        );

        Ok(Simulation {
            world: World::new(config.seed),
            log: CombatLogBuffer::new(config.log_capacity),
            config,
            oracles,
            threat: ThreatTable::new(),
            history,
            hooks: hooks.unwrap_or_else(|| Box::new(TracingHooks)),
            swings: BTreeMap::new(),
        })
    }
}
