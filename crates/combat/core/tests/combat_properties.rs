//! End-to-end behaviour of the combat core through its public API.

use combat_core::aura::{AuraApplyRequest, AuraRemoveMode, AuraType, apply_aura};
use combat_core::combat::hit::RollTable;
use combat_core::combat::{DealDamageRequest, HitSource, damage_unit, deal_damage};
use combat_core::diminishing::{DiminishingGroup, DiminishingLevel};
use combat_core::spell::{CastRequest, SpellGroupStackRule, cast_spell};
use combat_core::testing::{Harness, SpellBuilder};
use combat_core::types::{DamageEffectType, Mechanic, SchoolMask, SpellId, SpellSchool, UnitId};
use combat_core::world;
use combat_core::{AuraError, AuraState, DeathState, MeleeHitOutcome, SpellAttributes, Unit};

const STACKING: SpellId = SpellId(1);
const MINOR: SpellId = SpellId(2);
const MAJOR: SpellId = SpellId(3);
const STUN: SpellId = SpellId(4);
const SHIELD: SpellId = SpellId(5);
const FIREBOLT: SpellId = SpellId(6);
const CURSE: SpellId = SpellId(7);
const SOULSTONE: SpellId = SpellId(8);
const TWIN: SpellId = SpellId(9);
const WIDE: SpellId = SpellId(10);
const CHILL: SpellId = SpellId(11);
const FROSTBITE: SpellId = SpellId(12);

const EXCLUSIVE_GROUP: u32 = 40;

fn harness() -> Harness {
    let mut h = Harness::new();
    h.add_spell(
        SpellBuilder::new(STACKING)
            .duration(10_000)
            .max_stack(3)
            .aura(AuraType::Dummy, 1)
            .build(),
    );
    for (id, amount) in [(MINOR, 10), (MAJOR, 15), (TWIN, 15)] {
        h.add_spell(
            SpellBuilder::new(id)
                .duration(-1)
                .stack_group(EXCLUSIVE_GROUP)
                .aura(AuraType::Dummy, amount)
                .build(),
        );
    }
    h.add_spell(
        SpellBuilder::new(WIDE)
            .duration(-1)
            .stack_group(EXCLUSIVE_GROUP)
            .aura(AuraType::Dummy, 15)
            .aura(AuraType::Dummy, 5)
            .build(),
    );
    for id in [CHILL, FROSTBITE] {
        h.add_spell(
            SpellBuilder::new(id)
                .duration(5_000)
                .aura_state(AuraState::Frozen)
                .aura(AuraType::Dummy, 0)
                .build(),
        );
    }
    h.spells.set_group_rule(EXCLUSIVE_GROUP, SpellGroupStackRule::ExclusiveHighest);
    h.add_spell(
        SpellBuilder::new(STUN)
            .melee()
            .attributes(SpellAttributes::IGNORE_HIT_RESULT)
            .duration(4_000)
            .mechanic(Mechanic::Stun)
            .aura(AuraType::ModStun, 0)
            .build(),
    );
    h.add_spell(
        SpellBuilder::new(SHIELD)
            .duration(-1)
            .aura(AuraType::SchoolAbsorb, 40)
            .build(),
    );
    h.add_spell(
        SpellBuilder::new(FIREBOLT)
            .school(SchoolMask::FIRE)
            .magic()
            .attributes(SpellAttributes::CANT_CRIT)
            .school_damage(100)
            .build(),
    );
    h.add_spell(
        SpellBuilder::new(CURSE)
            .duration(-1)
            .attributes(SpellAttributes::NEGATIVE)
            .aura(AuraType::Dummy, 0)
            .build(),
    );
    h.add_spell(
        SpellBuilder::new(SOULSTONE)
            .duration(-1)
            .attributes(SpellAttributes::DEATH_PERSISTENT)
            .aura(AuraType::Dummy, 0)
            .build(),
    );
    h
}

fn hostile_pair(h: &mut Harness) -> (UnitId, UnitId) {
    let caster = h.spawn(Unit::player(UnitId(1)).with_faction(1));
    let target = h.spawn(Unit::player(UnitId(2)).with_faction(2).with_health(1_000, 1_000));
    (caster, target)
}

#[test]
fn stacks_stop_at_cap_and_refresh_duration() {
    let mut h = harness();
    let (caster, target) = hostile_pair(&mut h);

    for _ in 0..5 {
        apply_aura(&mut h.ctx(), &AuraApplyRequest::new(STACKING, target, Some(caster))).expect("applies");
        world::update(&mut h.ctx(), 1_000);
    }
    let aura = h
        .world
        .unit(target)
        .and_then(|u| u.find_aura(STACKING, Some(caster)))
        .expect("aura present");
    assert_eq!(aura.stack(), 3);
    assert_eq!(aura.max_duration(), 10_000);
    assert_eq!(aura.duration(), 9_000);
}

#[test]
fn exclusive_highest_keeps_larger_magnitude_in_either_order() {
    for order in [[MINOR, MAJOR], [MAJOR, MINOR]] {
        let mut h = harness();
        let (caster, target) = hostile_pair(&mut h);
        for spell in order {
            let result = apply_aura(&mut h.ctx(), &AuraApplyRequest::new(spell, target, Some(caster)));
            if spell == MINOR && order[0] == MAJOR {
                assert!(matches!(result, Err(AuraError::Superseded { winner: MAJOR, .. })));
            }
        }
        let unit = h.world.unit(target).expect("target");
        assert!(unit.has_aura(MAJOR));
        assert!(!unit.has_aura(MINOR));
    }
}

#[test]
fn exclusive_highest_tie_prefers_more_effects() {
    for order in [[MAJOR, WIDE], [WIDE, MAJOR]] {
        let mut h = harness();
        let (caster, target) = hostile_pair(&mut h);
        for spell in order {
            let result = apply_aura(&mut h.ctx(), &AuraApplyRequest::new(spell, target, Some(caster)));
            if spell == MAJOR && order[0] == WIDE {
                assert!(matches!(result, Err(AuraError::Superseded { winner: WIDE, .. })));
            }
        }
        let unit = h.world.unit(target).expect("target");
        assert!(unit.has_aura(WIDE));
        assert!(!unit.has_aura(MAJOR));
    }
}

#[test]
fn exclusive_highest_full_tie_goes_to_newer_aura() {
    for (first, second) in [(MAJOR, TWIN), (TWIN, MAJOR)] {
        let mut h = harness();
        let (caster, target) = hostile_pair(&mut h);
        apply_aura(&mut h.ctx(), &AuraApplyRequest::new(first, target, Some(caster))).expect("first applies");
        apply_aura(&mut h.ctx(), &AuraApplyRequest::new(second, target, Some(caster))).expect("newer replaces");

        let unit = h.world.unit(target).expect("target");
        assert!(unit.has_aura(second));
        assert!(!unit.has_aura(first));
    }
}

#[test]
fn aura_state_survives_while_another_aura_grants_it() {
    let mut h = harness();
    let (caster, target) = hostile_pair(&mut h);
    for spell in [CHILL, FROSTBITE] {
        apply_aura(&mut h.ctx(), &AuraApplyRequest::new(spell, target, Some(caster))).expect("applies");
    }
    assert!(h.world.unit(target).is_some_and(|u| u.has_aura_state(AuraState::Frozen)));

    combat_core::aura::remove_auras_by_spell(&mut h.ctx(), target, CHILL, None, AuraRemoveMode::Cancel);
    let unit = h.world.unit(target).expect("target");
    assert!(!unit.has_aura(CHILL));
    assert!(unit.has_aura_state(AuraState::Frozen));

    combat_core::aura::remove_auras_by_spell(&mut h.ctx(), target, FROSTBITE, None, AuraRemoveMode::Cancel);
    assert!(h.world.unit(target).is_some_and(|u| !u.has_aura_state(AuraState::Frozen)));
}

#[test]
fn diminishing_resets_after_grace_window() {
    let mut h = harness();
    let (caster, target) = hostile_pair(&mut h);
    let reset = h.config.dr_reset_ms;

    cast_spell(&mut h.ctx(), CastRequest::new(caster, STUN, target)).expect("first stun");
    world::update(&mut h.ctx(), 4_000);
    cast_spell(&mut h.ctx(), CastRequest::new(caster, STUN, target)).expect("second stun");
    let second = h
        .world
        .unit(target)
        .and_then(|u| u.find_aura(STUN, Some(caster)))
        .map(|a| a.max_duration());
    assert_eq!(second, Some(2_000));
    world::update(&mut h.ctx(), 2_000);

    let now = h.world.now();
    let table = h.world.unit(target).expect("target").diminishing();
    assert_eq!(table.entry(DiminishingGroup::Stun).stack, 0);
    assert_eq!(table.level(DiminishingGroup::Stun, now, reset), DiminishingLevel::Level3);

    world::update(&mut h.ctx(), reset);
    let now = h.world.now();
    let table = h.world.unit(target).expect("target").diminishing();
    assert_eq!(table.level(DiminishingGroup::Stun, now, reset), DiminishingLevel::Level1);

    cast_spell(&mut h.ctx(), CastRequest::new(caster, STUN, target)).expect("third stun");
    let third = h
        .world
        .unit(target)
        .and_then(|u| u.find_aura(STUN, Some(caster)))
        .map(|a| a.max_duration());
    assert_eq!(third, Some(4_000));
}

#[test]
fn absorbed_and_resisted_never_exceed_original() {
    let mut h = harness();
    let (caster, target) = hostile_pair(&mut h);
    h.world.unit_mut(target).expect("target").stats.resistances[SpellSchool::Fire.index()] = 150;
    let firebolt = h.spells.get(FIREBOLT).cloned().expect("firebolt");

    for _ in 0..20 {
        apply_aura(&mut h.ctx(), &AuraApplyRequest::new(SHIELD, target, Some(target))).expect("shield");
        let source = HitSource::spell(Some(caster), target, &firebolt, DamageEffectType::SpellDirect);
        let info = damage_unit(&mut h.ctx(), &source, 100).expect("target alive");

        assert!(info.absorbed + info.resisted <= info.original);
        assert_eq!(info.amount, info.original.saturating_sub(info.absorbed + info.resisted));
        if let Some(unit) = h.world.unit_mut(target) {
            unit.health.current = unit.health.maximum;
        }
        combat_core::aura::remove_auras_by_spell(&mut h.ctx(), target, SHIELD, None, AuraRemoveMode::Cancel);
    }
}

#[test]
fn lethal_damage_strips_auras_that_do_not_survive_death() {
    let mut h = harness();
    let (caster, target) = hostile_pair(&mut h);
    if let Some(unit) = h.world.unit_mut(target) {
        unit.health.current = 5;
    }
    for spell in [CURSE, SOULSTONE] {
        apply_aura(&mut h.ctx(), &AuraApplyRequest::new(spell, target, Some(caster))).expect("applies");
    }

    deal_damage(&mut h.ctx(), DealDamageRequest::new(Some(caster), target, 50, DamageEffectType::Direct));

    let unit = h.world.unit(target).expect("target");
    assert_eq!(unit.health.current, 0);
    assert_eq!(unit.death_state(), DeathState::JustDied);
    assert!(!unit.has_aura(CURSE));
    assert!(unit.has_aura(SOULSTONE));

    world::update(&mut h.ctx(), 100);
    assert_eq!(h.world.unit(target).map(Unit::death_state), Some(DeathState::Dead));
}

#[test]
fn roll_table_resolves_inclusive_thresholds() {
    let mut table = RollTable::new();
    table.push(MeleeHitOutcome::Miss, 500);
    table.push(MeleeHitOutcome::Dodge, 500);

    assert_eq!(table.resolve(9_999, MeleeHitOutcome::Normal), MeleeHitOutcome::Normal);
    assert_eq!(table.resolve(500, MeleeHitOutcome::Normal), MeleeHitOutcome::Miss);
    assert_eq!(table.resolve(1_000, MeleeHitOutcome::Normal), MeleeHitOutcome::Dodge);
    assert_eq!(table.resolve(1_001, MeleeHitOutcome::Normal), MeleeHitOutcome::Normal);
}

#[test]
fn proc_depth_is_zero_after_every_update() {
    let mut h = harness();
    let (caster, target) = hostile_pair(&mut h);
    cast_spell(&mut h.ctx(), CastRequest::new(caster, FIREBOLT, target)).expect("firebolt resolves");
    world::update(&mut h.ctx(), 100);
    for id in [caster, target] {
        assert_eq!(h.world.unit(id).map(Unit::proc_depth), Some(0));
    }
}
