//! Per-unit immunity bookkeeping.
//!
//! Several auras may grant the same immunity; each grant is recorded with the
//! spell that granted it and removed individually.

use std::collections::BTreeMap;

use crate::spell::{SpellAttributes, SpellInfo};
use crate::types::{DispelType, Mechanic, SchoolMask, SpellId};
use crate::unit::Unit;

/// Category of an immunity grant. The paired value's meaning depends on it.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ImmunityKind {
    /// Value is a spell id.
    Spell,
    /// Value is a [`crate::spell::SpellEffectKind`] tag.
    Effect,
    /// Value is an [`crate::aura::AuraType`] discriminant.
    State,
    /// Value is a school mask; blocks whole harmful spells.
    School,
    /// Value is a school mask; blocks damage only.
    Damage,
    /// Value is a [`DispelType`] discriminant.
    Dispel,
    /// Value is a [`Mechanic`] discriminant.
    Mechanic,
}

/// Multimap of `(kind, value)` to granting spells.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SpellImmunityTable {
    grants: BTreeMap<ImmunityKind, Vec<(u32, SpellId)>>,
}

impl SpellImmunityTable {
    pub fn add(&mut self, kind: ImmunityKind, value: u32, granted_by: SpellId) {
        self.grants.entry(kind).or_default().push((value, granted_by));
    }

    /// Removes exactly one `(value, granted_by)` grant of `kind`.
    pub fn remove(&mut self, kind: ImmunityKind, value: u32, granted_by: SpellId) {
        if let Some(list) = self.grants.get_mut(&kind) {
            if let Some(pos) = list.iter().position(|g| *g == (value, granted_by)) {
                list.remove(pos);
            }
            if list.is_empty() {
                self.grants.remove(&kind);
            }
        }
    }

    pub fn has(&self, kind: ImmunityKind, value: u32) -> bool {
        self.grants
            .get(&kind)
            .is_some_and(|list| list.iter().any(|(v, _)| *v == value))
    }

    /// Union of all school or damage masks granted.
    pub fn school_mask(&self, kind: ImmunityKind) -> SchoolMask {
        self.grants.get(&kind).map_or(SchoolMask::empty(), |list| {
            list.iter().fold(SchoolMask::empty(), |acc, (v, _)| {
                acc | SchoolMask::from_bits_truncate(*v as u8)
            })
        })
    }

    pub fn is_immune_to_mechanic(&self, mechanic: Mechanic) -> bool {
        mechanic != Mechanic::None && self.has(ImmunityKind::Mechanic, mechanic as u32)
    }

    pub fn is_immune_to_dispel(&self, dispel: DispelType) -> bool {
        dispel != DispelType::None && self.has(ImmunityKind::Dispel, dispel as u32)
    }

    pub fn grant_count(&self) -> usize {
        self.grants.values().map(Vec::len).sum()
    }
}

/// Whether a single effect slot of `spell` would be ignored by `unit`.
pub fn is_immune_to_effect(unit: &Unit, spell: &SpellInfo, slot: usize) -> bool {
    let Some(effect) = spell.effect(slot) else {
        return true;
    };
    let table = &unit.immunities;
    if table.has(ImmunityKind::Effect, effect.kind.tag()) {
        return true;
    }
    if let Some(aura) = effect.aura_type() {
        if table.has(ImmunityKind::State, aura as u32) {
            return true;
        }
    }
    table.is_immune_to_mechanic(spell.effect_mechanic(slot))
}

/// Whether `unit` ignores `spell` entirely.
pub fn is_immune_to_spell(unit: &Unit, spell: &SpellInfo) -> bool {
    let table = &unit.immunities;
    if table.has(ImmunityKind::Spell, spell.id.0) {
        return true;
    }
    if table.is_immune_to_dispel(spell.dispel) {
        return true;
    }
    if table.is_immune_to_mechanic(spell.mechanic) {
        return true;
    }

    // immune only if every slot is individually immune
    if !spell.effects.is_empty()
        && (0..spell.effects.len()).all(|slot| is_immune_to_effect(unit, spell, slot))
    {
        return true;
    }

    if !spell.has_attribute(SpellAttributes::UNAFFECTED_BY_SCHOOL_IMMUNE) && !spell.is_positive() {
        let immune = table.school_mask(ImmunityKind::School);
        if !spell.school_mask.is_empty() && immune.contains(spell.school_mask) {
            return true;
        }
    }
    false
}

/// Whether damage of `school_mask` is fully ignored by `unit`.
pub fn is_immune_to_damage(unit: &Unit, school_mask: SchoolMask, spell: Option<&SpellInfo>) -> bool {
    if spell.is_some_and(|s| s.has_attribute(SpellAttributes::UNAFFECTED_BY_INVULNERABILITY)) {
        return false;
    }
    if school_mask.is_empty() {
        return false;
    }
    let table = &unit.immunities;
    let immune = table.school_mask(ImmunityKind::Damage) | table.school_mask(ImmunityKind::School);
    immune.contains(school_mask)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aura::AuraType;
    use crate::spell::{SpellEffectInfo, SpellEffectKind};
    use crate::types::UnitId;

    #[test]
    fn removal_is_exact_pair() {
        let mut table = SpellImmunityTable::default();
        table.add(ImmunityKind::Mechanic, Mechanic::Stun as u32, SpellId(1));
        table.add(ImmunityKind::Mechanic, Mechanic::Stun as u32, SpellId(2));

        table.remove(ImmunityKind::Mechanic, Mechanic::Stun as u32, SpellId(1));
        assert!(table.is_immune_to_mechanic(Mechanic::Stun));

        table.remove(ImmunityKind::Mechanic, Mechanic::Stun as u32, SpellId(3));
        assert!(table.is_immune_to_mechanic(Mechanic::Stun));

        table.remove(ImmunityKind::Mechanic, Mechanic::Stun as u32, SpellId(2));
        assert!(!table.is_immune_to_mechanic(Mechanic::Stun));
        assert_eq!(table.grant_count(), 0);
    }

    #[test]
    fn school_immunity_blocks_harmful_spells_of_that_school() {
        let mut unit = Unit::player(UnitId(1));
        unit.immunities
            .add(ImmunityKind::School, SchoolMask::FIRE.bits() as u32, SpellId(9));

        let mut fireball = SpellInfo {
            id: SpellId(100),
            school_mask: SchoolMask::FIRE,
            ..SpellInfo::default()
        };
        fireball
            .effects
            .push(SpellEffectInfo::new(SpellEffectKind::SchoolDamage, 10));
        assert!(is_immune_to_spell(&unit, &fireball));

        let frostbolt = SpellInfo {
            school_mask: SchoolMask::FROST,
            ..fireball.clone()
        };
        assert!(!is_immune_to_spell(&unit, &frostbolt));
    }

    #[test]
    fn spell_is_immune_only_when_every_slot_is() {
        let mut unit = Unit::player(UnitId(1));
        unit.immunities
            .add(ImmunityKind::State, AuraType::ModStun as u32, SpellId(9));

        let mut spell = SpellInfo::default();
        spell.effects.push(SpellEffectInfo::new(
            SpellEffectKind::ApplyAura(AuraType::ModStun),
            0,
        ));
        assert!(is_immune_to_spell(&unit, &spell));

        spell
            .effects
            .push(SpellEffectInfo::new(SpellEffectKind::SchoolDamage, 5));
        assert!(!is_immune_to_spell(&unit, &spell));
        assert!(is_immune_to_effect(&unit, &spell, 0));
    }

    #[test]
    fn damage_immunity_requires_full_school_coverage() {
        let mut unit = Unit::player(UnitId(1));
        unit.immunities
            .add(ImmunityKind::Damage, SchoolMask::PHYSICAL.bits() as u32, SpellId(9));
        assert!(is_immune_to_damage(&unit, SchoolMask::PHYSICAL, None));
        assert!(!is_immune_to_damage(
            &unit,
            SchoolMask::PHYSICAL | SchoolMask::FIRE,
            None
        ));
    }
}
