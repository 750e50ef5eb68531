//! Spell catalog loader.

use std::collections::{HashMap, HashSet};
use std::path::Path;

use anyhow::{bail, ensure};
use combat_core::spell::SpellGroupStackRule;
use combat_core::{SpellAttributes, SpellId, SpellInfo};
use serde::{Deserialize, Serialize};

use crate::loaders::{LoadResult, read_file};

/// Stacking rule of one spell group.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpellGroupSpec {
    pub group: u32,
    pub rule: SpellGroupStackRule,
}

/// Spell catalog structure for RON files.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SpellCatalog {
    pub spells: Vec<SpellInfo>,
    #[serde(default)]
    pub groups: Vec<SpellGroupSpec>,
}

impl SpellCatalog {
    /// Group rules keyed by group id.
    pub fn group_rules(&self) -> HashMap<u32, SpellGroupStackRule> {
        self.groups.iter().map(|g| (g.group, g.rule)).collect()
    }

    pub fn get(&self, id: SpellId) -> Option<&SpellInfo> {
        self.spells.iter().find(|s| s.id == id)
    }

    /// Rejects catalogs the combat core cannot resolve consistently.
    pub fn validate(&self) -> LoadResult<()> {
        let mut ids = HashSet::with_capacity(self.spells.len());
        for spell in &self.spells {
            ensure!(spell.id != SpellId(0), "spell '{}' has no id", spell.name);
            if !ids.insert(spell.id) {
                bail!("duplicate id {}", spell.id);
            }
            if spell.has_attribute(SpellAttributes::CHANNELED) {
                ensure!(
                    spell.duration_ms != 0,
                    "channeled {} needs a duration",
                    spell.id
                );
            }
        }

        for spell in &self.spells {
            for (slot, effect) in spell.effects.iter().enumerate() {
                if let Some(trigger) = effect.trigger_spell {
                    ensure!(
                        ids.contains(&trigger),
                        "{} effect {} triggers unknown {}",
                        spell.id,
                        slot,
                        trigger
                    );
                }
            }
            if spell.proc.as_ref().is_some_and(|p| p.proc_flags.is_empty()) {
                tracing::warn!(target: "content::spells", spell = %spell.id, "proc entry without proc flags never fires");
            }
        }

        let mut groups = HashSet::with_capacity(self.groups.len());
        for group in &self.groups {
            if !groups.insert(group.group) {
                bail!("spell group {} declared twice", group.group);
            }
        }
        Ok(())
    }
}

/// Loader for spell catalogs from RON files.
pub struct SpellLoader;

impl SpellLoader {
    /// Load and validate a spell catalog from a RON file.
    pub fn load(path: &Path) -> LoadResult<SpellCatalog> {
        let content = read_file(path)?;
        Self::parse(&content)
    }

    pub fn parse(content: &str) -> LoadResult<SpellCatalog> {
        let catalog: SpellCatalog = ron::from_str(content)
            .map_err(|e| anyhow::anyhow!("Failed to parse spell catalog RON: {}", e))?;
        catalog.validate()?;

        tracing::debug!(
            target: "content::spells",
            spells = catalog.spells.len(),
            groups = catalog.groups.len(),
            "loaded spell catalog"
        );
        Ok(catalog)
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use combat_core::aura::AuraType;
    use combat_core::{Mechanic, SchoolMask, SpellEffectKind};
    use tempfile::NamedTempFile;

    use super::*;

    const CATALOG: &str = r#"(
        spells: [
            (
                id: SpellId(10),
                name: "Searing Bolt",
                school_mask: "FIRE",
                damage_class: Magic,
                attributes: "NEGATIVE | CANT_CRIT",
                cast_time_ms: 1500,
                effects: [
                    (kind: SchoolDamage, base_points: 120, die_sides: 20, bonus_coefficient: 0.8),
                ],
            ),
            (
                id: SpellId(11),
                name: "Hamstring Stun",
                mechanic: Stun,
                duration_ms: 4000,
                diminishing_group: Some(Stun),
                effects: [
                    (kind: ApplyAura(ModStun)),
                    (kind: TriggerSpell, trigger_spell: Some(SpellId(10))),
                ],
            ),
        ],
        groups: [
            (group: 7, rule: ExclusiveHighest),
        ],
    )"#;

    #[test]
    fn parses_flags_effects_and_groups() {
        let catalog = SpellLoader::parse(CATALOG).unwrap();
        assert_eq!(catalog.spells.len(), 2);

        let bolt = catalog.get(SpellId(10)).unwrap();
        assert_eq!(bolt.school_mask, SchoolMask::FIRE);
        assert!(bolt.has_attribute(SpellAttributes::NEGATIVE));
        assert!(bolt.has_attribute(SpellAttributes::CANT_CRIT));
        assert_eq!(bolt.effects[0].kind, SpellEffectKind::SchoolDamage);
        assert_eq!(bolt.effects[0].die_sides, 20);

        let stun = catalog.get(SpellId(11)).unwrap();
        assert_eq!(stun.mechanic, Mechanic::Stun);
        assert_eq!(stun.effects[0].aura_type(), Some(AuraType::ModStun));
        assert_eq!(
            catalog.group_rules().get(&7),
            Some(&SpellGroupStackRule::ExclusiveHighest)
        );
    }

    #[test]
    fn unknown_trigger_is_rejected() {
        let source = r#"(spells: [(id: SpellId(1), effects: [(kind: TriggerSpell, trigger_spell: Some(SpellId(99)))])])"#;
        let err = SpellLoader::parse(source).unwrap_err();
        assert!(err.to_string().contains("triggers unknown spell:99"));
    }

    #[test]
    fn duplicate_ids_are_rejected() {
        let source = r#"(spells: [(id: SpellId(3)), (id: SpellId(3))])"#;
        let err = SpellLoader::parse(source).unwrap_err();
        assert!(err.to_string().contains("duplicate id spell:3"));
    }

    #[test]
    fn more_effects_than_slots_fail_to_parse() {
        let source = r#"(spells: [(id: SpellId(4), effects: [(), (), (), ()])])"#;
        assert!(SpellLoader::parse(source).is_err());
    }

    #[test]
    fn loads_from_file() {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(CATALOG.as_bytes()).unwrap();

        let catalog = SpellLoader::load(file.path()).unwrap();
        assert_eq!(catalog.spells.len(), 2);
    }

    #[test]
    fn missing_file_names_the_path() {
        let err = SpellLoader::load(Path::new("/nonexistent/spells.ron")).unwrap_err();
        assert!(err.to_string().contains("/nonexistent/spells.ron"));
    }
}
