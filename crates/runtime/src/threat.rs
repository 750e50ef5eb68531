//! Per-unit threat lists.
//!
//! Each unit that has been attacked owns a list of the units that generated
//! threat on it. Helpful actions spread their threat across the lists of
//! everyone already fighting the beneficiary.

use std::collections::BTreeMap;

use combat_core::{SpellId, ThreatManager, UnitId};
use tracing::trace;

/// Threat accumulated by one source on one owner.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ThreatEntry {
    pub source: UnitId,
    pub threat: f32,
}

/// In-memory threat lists keyed by owner.
#[derive(Clone, Debug, Default)]
pub struct ThreatTable {
    lists: BTreeMap<UnitId, BTreeMap<UnitId, f32>>,
}

impl ThreatTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Threat `source` holds on `owner`'s list.
    pub fn threat(&self, owner: UnitId, source: UnitId) -> f32 {
        self.lists
            .get(&owner)
            .and_then(|list| list.get(&source))
            .copied()
            .unwrap_or(0.0)
    }

    /// Source with the most threat on `owner`; ties go to the lower unit id.
    pub fn top_threat(&self, owner: UnitId) -> Option<UnitId> {
        self.lists.get(&owner)?.iter().fold(None, |best, (&source, &threat)| match best {
            Some((_, best_threat)) if best_threat >= threat => best,
            _ => Some((source, threat)),
        })
        .map(|(source, _)| source)
    }

    /// `owner`'s list ordered by descending threat.
    pub fn threat_list(&self, owner: UnitId) -> Vec<ThreatEntry> {
        let mut entries: Vec<ThreatEntry> = self
            .lists
            .get(&owner)
            .into_iter()
            .flatten()
            .map(|(&source, &threat)| ThreatEntry { source, threat })
            .collect();
        entries.sort_by(|a, b| b.threat.total_cmp(&a.threat));
        entries
    }

    pub fn is_engaged(&self, owner: UnitId) -> bool {
        self.lists.get(&owner).is_some_and(|list| !list.is_empty())
    }

    fn add(&mut self, owner: UnitId, source: UnitId, amount: f32) {
        let entry = self.lists.entry(owner).or_default().entry(source).or_insert(0.0);
        *entry = (*entry + amount).max(0.0);
    }
}

impl ThreatManager for ThreatTable {
    fn add_threat(&mut self, victim: UnitId, source: UnitId, amount: f32, spell: Option<SpellId>) {
        if victim == source || amount <= 0.0 {
            return;
        }
        trace!(target: "runtime::threat", %victim, %source, amount, ?spell, "threat added");
        self.add(victim, source, amount);
    }

    fn assist_threat(&mut self, beneficiary: UnitId, helper: UnitId, amount: f32, spell: Option<SpellId>) {
        if amount <= 0.0 {
            return;
        }
        let owners: Vec<UnitId> = self
            .lists
            .iter()
            .filter(|(owner, list)| **owner != helper && list.contains_key(&beneficiary))
            .map(|(owner, _)| *owner)
            .collect();
        if owners.is_empty() {
            return;
        }
        let share = amount / owners.len() as f32;
        trace!(target: "runtime::threat", %beneficiary, %helper, share, enemies = owners.len(), ?spell, "assist threat");
        for owner in owners {
            self.add(owner, helper, share);
        }
    }

    fn clear(&mut self, unit: UnitId) {
        self.lists.remove(&unit);
        for list in self.lists.values_mut() {
            list.remove(&unit);
        }
        self.lists.retain(|_, list| !list.is_empty());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TANK: UnitId = UnitId(1);
    const HEALER: UnitId = UnitId(2);
    const OGRE: UnitId = UnitId(10);
    const WOLF: UnitId = UnitId(11);

    #[test]
    fn threat_accumulates_per_source() {
        let mut table = ThreatTable::new();
        table.add_threat(OGRE, TANK, 30.0, None);
        table.add_threat(OGRE, TANK, 12.5, None);
        table.add_threat(OGRE, HEALER, 5.0, None);

        assert_eq!(table.threat(OGRE, TANK), 42.5);
        assert_eq!(table.top_threat(OGRE), Some(TANK));
        let list = table.threat_list(OGRE);
        assert_eq!(list[0].source, TANK);
        assert_eq!(list[1].source, HEALER);
    }

    #[test]
    fn assist_is_split_across_engaged_enemies() {
        let mut table = ThreatTable::new();
        table.add_threat(OGRE, TANK, 10.0, None);
        table.add_threat(WOLF, TANK, 10.0, None);

        table.assist_threat(TANK, HEALER, 50.0, None);

        assert_eq!(table.threat(OGRE, HEALER), 25.0);
        assert_eq!(table.threat(WOLF, HEALER), 25.0);
    }

    #[test]
    fn assisting_an_unengaged_unit_adds_nothing() {
        let mut table = ThreatTable::new();
        table.assist_threat(TANK, HEALER, 50.0, None);
        assert!(!table.is_engaged(OGRE));
        assert_eq!(table.top_threat(OGRE), None);
    }

    #[test]
    fn clear_drops_lists_and_entries() {
        let mut table = ThreatTable::new();
        table.add_threat(OGRE, TANK, 10.0, None);
        table.add_threat(TANK, OGRE, 10.0, None);
        table.add_threat(WOLF, TANK, 10.0, None);

        table.clear(TANK);

        assert!(!table.is_engaged(TANK));
        assert!(!table.is_engaged(OGRE));
        assert!(!table.is_engaged(WOLF));
    }

    #[test]
    fn self_threat_is_ignored() {
        let mut table = ThreatTable::new();
        table.add_threat(OGRE, OGRE, 10.0, None);
        assert!(!table.is_engaged(OGRE));
    }
}
