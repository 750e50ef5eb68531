//! [`combat_core::SpellOracle`] backed by an in-memory map.
use std::collections::HashMap;

use combat_content::SpellCatalog;
use combat_core::spell::SpellGroupStackRule;
use combat_core::{SpellId, SpellInfo, SpellOracle};

/// SpellOracle implementation with static spell descriptors and group rules.
#[derive(Debug, Clone)]
pub struct SpellOracleImpl {
    spells: HashMap<SpellId, SpellInfo>,
    group_rules: HashMap<u32, SpellGroupStackRule>,
}

impl SpellOracleImpl {
    pub fn new() -> Self {
        Self {
            spells: HashMap::new(),
            group_rules: HashMap::new(),
        }
    }

    /// Builds the oracle from a loaded catalog.
    pub fn from_catalog(catalog: SpellCatalog) -> Self {
        let group_rules = catalog.group_rules();
        let mut oracle = Self {
            spells: HashMap::with_capacity(catalog.spells.len()),
            group_rules,
        };
        for spell in catalog.spells {
            oracle.add_spell(spell);
        }
        oracle
    }

    /// Add a spell descriptor, replacing any previous one with the same id.
    pub fn add_spell(&mut self, spell: SpellInfo) {
        self.spells.insert(spell.id, spell);
    }

    pub fn set_group_rule(&mut self, group: u32, rule: SpellGroupStackRule) {
        self.group_rules.insert(group, rule);
    }

    pub fn len(&self) -> usize {
        self.spells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.spells.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &SpellInfo> {
        self.spells.values()
    }

    /// Cooldown started when `spell` is cast, zero for unknown spells.
    pub fn recovery_ms(&self, spell: SpellId) -> u64 {
        self.spells.get(&spell).map_or(0, |s| u64::from(s.recovery_ms))
    }
}

impl Default for SpellOracleImpl {
    fn default() -> Self {
        Self::new()
    }
}

impl SpellOracle for SpellOracleImpl {
    fn spell(&self, id: SpellId) -> Option<&SpellInfo> {
        self.spells.get(&id)
    }

    fn group_rule(&self, group: u32) -> SpellGroupStackRule {
        self.group_rules.get(&group).copied().unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use combat_content::SpellGroupSpec;

    use super::*;

    #[test]
    fn catalog_rules_are_exposed() {
        let catalog = SpellCatalog {
            spells: vec![SpellInfo {
                id: SpellId(5),
                recovery_ms: 1_500,
                ..SpellInfo::default()
            }],
            groups: vec![SpellGroupSpec {
                group: 2,
                rule: SpellGroupStackRule::Exclusive,
            }],
        };
        let oracle = SpellOracleImpl::from_catalog(catalog);

        assert_eq!(oracle.len(), 1);
        assert!(oracle.spell(SpellId(5)).is_some());
        assert_eq!(oracle.recovery_ms(SpellId(5)), 1_500);
        assert_eq!(oracle.group_rule(2), SpellGroupStackRule::Exclusive);
        assert_eq!(oracle.group_rule(3), SpellGroupStackRule::Default);
    }
}
