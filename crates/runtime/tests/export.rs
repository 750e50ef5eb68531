//! Content and combat-log files on disk.

use std::fs;
use std::io::{BufRead, BufReader};

use combat_core::spell::CastRequest;
use combat_core::{SpellId, Unit, UnitId};
use runtime::{RuntimeError, Simulation};
use tempfile::{NamedTempFile, TempDir};

const SPELLS: &str = r#"(
    spells: [
        (
            id: SpellId(7),
            name: "Spark",
            school_mask: "NATURE",
            damage_class: Magic,
            attributes: "NEGATIVE | IGNORE_HIT_RESULT | CANT_CRIT",
            effects: [(kind: SchoolDamage, base_points: 12)],
        ),
    ],
)"#;

fn content_dir(spells: &str) -> TempDir {
    let dir = TempDir::new().expect("temp dir");
    fs::write(dir.path().join("spells.ron"), spells).expect("spells written");
    fs::write(dir.path().join("config.toml"), "max_proc_chain_depth = 4\n").expect("config written");
    dir
}

#[test]
fn content_directory_configures_the_simulation() {
    let dir = content_dir(SPELLS);
    let sim = Simulation::builder()
        .content_dir(dir.path())
        .build()
        .expect("content loads");

    assert_eq!(sim.config().combat.max_proc_chain_depth, 4);
    assert_eq!(sim.oracles().spells().len(), 1);
}

#[test]
fn broken_catalog_is_a_content_error() {
    let dir = content_dir("(spells: [(id: SpellId(1)), (id: SpellId(1))])");
    let err = Simulation::builder().content_dir(dir.path()).build().unwrap_err();
    assert!(matches!(err, RuntimeError::Content(_)));
}

#[test]
fn combat_log_exports_as_json_lines() {
    let dir = content_dir(SPELLS);
    let mut sim = Simulation::builder()
        .content_dir(dir.path())
        .build()
        .expect("content loads");
    let caster = sim.spawn(Unit::player(UnitId(1)).with_faction(1)).expect("caster");
    let target = sim.spawn(Unit::player(UnitId(2)).with_faction(2)).expect("target");
    for _ in 0..3 {
        sim.cast(CastRequest::new(caster, SpellId(7), target)).expect("spark");
    }

    let file = NamedTempFile::new().expect("temp file");
    sim.combat_log()
        .write_json_lines(file.as_file())
        .expect("log exported");

    let lines: Vec<String> = BufReader::new(file.reopen().expect("reopen"))
        .lines()
        .collect::<Result<_, _>>()
        .expect("lines read");
    assert_eq!(lines.len(), sim.combat_log().len());
    let damage_lines = lines.iter().filter(|l| l.starts_with("{\"Damage\"")).count();
    assert_eq!(damage_lines, 3);
}
