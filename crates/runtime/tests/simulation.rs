//! Driving combat through the simulation API.

use std::path::PathBuf;

use combat_core::aura::AuraType;
use combat_core::spell::CastRequest;
use combat_core::testing::SpellBuilder;
use combat_core::{
    CastOutcome, CombatLogEntry, SchoolMask, SpellAttributes, SpellId, Unit, UnitId, WeaponAttackType,
};
use runtime::{CooldownState, RuntimeError, Simulation, SpellOracleImpl};
use tracing_subscriber::EnvFilter;

const BOLT: SpellId = SpellId(1);
const SLOW_BOLT: SpellId = SpellId(2);
const BARRIER: SpellId = SpellId(3);

const MAGE: UnitId = UnitId(1);
const OGRE: UnitId = UnitId(2);

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

fn spells() -> SpellOracleImpl {
    let mut spells = SpellOracleImpl::new();
    spells.add_spell(
        SpellBuilder::new(BOLT)
            .school(SchoolMask::FIRE)
            .magic()
            .attributes(SpellAttributes::NEGATIVE | SpellAttributes::CANT_CRIT | SpellAttributes::IGNORE_HIT_RESULT)
            .recovery(1_000)
            .school_damage(30)
            .build(),
    );
    spells.add_spell(
        SpellBuilder::new(SLOW_BOLT)
            .school(SchoolMask::FROST)
            .magic()
            .attributes(SpellAttributes::NEGATIVE | SpellAttributes::CANT_CRIT | SpellAttributes::IGNORE_HIT_RESULT)
            .cast_time(1_000)
            .school_damage(10)
            .build(),
    );
    spells.add_spell(
        SpellBuilder::new(BARRIER)
            .duration(1_000)
            .attributes(SpellAttributes::COOLDOWN_ON_AURA_REMOVE)
            .recovery(5_000)
            .aura(AuraType::Dummy, 0)
            .build(),
    );
    spells
}

fn simulation() -> Simulation {
    init_tracing();
    let mut sim = Simulation::builder()
        .spells(spells())
        .tick_ms(100)
        .build()
        .expect("simulation builds");
    sim.spawn(Unit::player(MAGE).with_faction(1)).expect("mage");
    sim.spawn(Unit::creature(OGRE).with_faction(2).with_health(50, 100))
        .expect("ogre");
    sim
}

fn health(sim: &Simulation, id: UnitId) -> Option<u32> {
    sim.unit(id).map(|u| u.health.current)
}

#[test]
fn spell_hit_commits_health_and_threat() {
    let mut sim = simulation();

    let outcome = sim.cast(CastRequest::new(MAGE, BOLT, OGRE)).expect("bolt");

    assert!(matches!(outcome, CastOutcome::Resolved(_)));
    assert_eq!(health(&sim, OGRE), Some(20));
    assert!(sim.unit(OGRE).is_some_and(Unit::is_alive));
    assert_eq!(sim.threat().threat(OGRE, MAGE), 30.0);
    assert_eq!(sim.threat().top_threat(OGRE), Some(MAGE));
    assert_eq!(sim.combat_log().damage_done_by(MAGE), 30);
}

#[test]
fn cooldown_blocks_recast_until_recovery() {
    let mut sim = simulation();
    sim.cast(CastRequest::new(MAGE, BOLT, OGRE)).expect("first bolt");

    let err = sim.cast(CastRequest::new(MAGE, BOLT, OGRE)).unwrap_err();
    assert!(matches!(
        err,
        RuntimeError::SpellOnCooldown {
            remaining_ms: 1_000,
            ..
        }
    ));

    sim.run_for(1_000);
    assert!(sim.history().is_ready(MAGE, BOLT));
    sim.cast(CastRequest::new(MAGE, BOLT, OGRE)).expect("bolt after recovery");
}

#[test]
fn triggered_casts_skip_the_cooldown_check() {
    let mut sim = simulation();
    sim.cast(CastRequest::new(MAGE, BOLT, OGRE)).expect("first bolt");
    sim.cast(CastRequest::new(MAGE, BOLT, OGRE).triggered())
        .expect("triggered bolt ignores cooldown");
}

#[test]
fn timed_cast_lands_after_ticks() {
    let mut sim = simulation();

    let outcome = sim.cast(CastRequest::new(MAGE, SLOW_BOLT, OGRE)).expect("slow bolt");
    assert!(matches!(outcome, CastOutcome::Started { .. }));
    assert_eq!(health(&sim, OGRE), Some(50));

    assert!(sim.run_until(2_000, |s| health(s, OGRE) == Some(40)));
}

#[test]
fn aura_bound_cooldown_is_held_until_removal() {
    let mut sim = simulation();
    sim.cast(CastRequest::new(MAGE, BARRIER, MAGE)).expect("barrier");
    assert_eq!(sim.history().state(MAGE, BARRIER), CooldownState::Held);

    sim.run_for(1_100);

    assert!(!sim.unit(MAGE).is_some_and(|u| u.has_aura(BARRIER)));
    assert!(matches!(
        sim.history().state(MAGE, BARRIER),
        CooldownState::Remaining(left) if left <= 5_000
    ));
}

#[test]
fn auto_attack_swings_on_weapon_timer() {
    let mut sim = simulation();
    let knight = sim
        .spawn(Unit::player(UnitId(3)).with_faction(1))
        .expect("knight");
    let dummy = sim
        .spawn(Unit::creature(UnitId(4)).with_faction(2).with_health(100_000, 100_000))
        .expect("dummy");

    sim.start_attack(knight, dummy).expect("attack starts");
    sim.run_for(4_100);

    let swings = sim
        .combat_log()
        .entries()
        .filter(|entry| match entry {
            CombatLogEntry::Damage(log) => log.attacker == Some(knight),
            CombatLogEntry::Miss { attacker, .. } => *attacker == knight,
            _ => false,
        })
        .count();
    assert_eq!(swings, 3);
}

#[test]
fn auto_attack_stops_when_victim_dies() {
    let mut sim = simulation();
    let knight = sim
        .spawn(Unit::player(UnitId(3)).with_faction(1))
        .expect("knight");
    let rat = sim
        .spawn(Unit::creature(UnitId(4)).with_faction(2).with_health(1, 1))
        .expect("rat");

    sim.start_attack(knight, rat).expect("attack starts");

    assert!(sim.run_until(60_000, |s| !s.is_attacking(knight)));
    assert!(!sim.unit(rat).is_some_and(Unit::is_alive));
}

#[test]
fn manual_swing_requires_known_units() {
    let mut sim = simulation();
    let err = sim
        .swing(MAGE, UnitId(99), WeaponAttackType::BaseAttack)
        .unwrap_err();
    assert!(matches!(err, RuntimeError::UnknownUnit(UnitId(99))));
}

#[test]
fn despawn_forgets_threat() {
    let mut sim = simulation();
    sim.cast(CastRequest::new(MAGE, BOLT, OGRE)).expect("bolt");

    sim.despawn(MAGE).expect("mage leaves");

    assert_eq!(sim.threat().threat(OGRE, MAGE), 0.0);
    assert!(matches!(sim.despawn(MAGE), Err(RuntimeError::UnknownUnit(MAGE))));
}

#[test]
fn duplicate_spawn_is_rejected() {
    let mut sim = simulation();
    let err = sim.spawn(Unit::player(MAGE)).unwrap_err();
    assert!(matches!(err, RuntimeError::DuplicateUnit(MAGE)));
}

#[test]
fn builder_requires_oracles_and_a_tick() {
    assert!(matches!(
        Simulation::builder().build(),
        Err(RuntimeError::MissingOracles)
    ));
    assert!(matches!(
        Simulation::builder().spells(spells()).tick_ms(0).build(),
        Err(RuntimeError::ZeroTick)
    ));
}

#[test]
fn bundled_content_drives_a_simulation() {
    init_tracing();
    let data = PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("../combat/content/data");
    let mut sim = Simulation::builder()
        .content_dir(data)
        .build()
        .expect("bundled content loads");
    assert!(sim.oracles().spells().iter().any(|s| s.name == "Fireball"));

    let paladin = sim.spawn(Unit::player(UnitId(1)).with_faction(1)).expect("paladin");
    let rogue = sim.spawn(Unit::player(UnitId(2)).with_faction(2)).expect("rogue");
    let hammer = SpellId(853);

    sim.cast(CastRequest::new(paladin, hammer, rogue)).expect("hammer");
    let err = sim.cast(CastRequest::new(paladin, hammer, rogue)).unwrap_err();
    assert!(matches!(
        err,
        RuntimeError::SpellOnCooldown {
            remaining_ms: 60_000,
            ..
        }
    ));
}
