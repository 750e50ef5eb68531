//! On-demand aggregation of modifier auras.
//!
//! Modifier auras have no apply handler; the pipeline reads them here every
//! time it needs them. Members of one `ExclusiveSameEffect` spell group
//! contribute only their single largest amount.

use std::collections::BTreeMap;

use crate::aura::{Aura, AuraEffect, AuraType};
use crate::spell::SpellGroupStackRule;
use crate::types::SchoolMask;
use crate::unit::Unit;

/// Sum and product of one aura type on one unit.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ModifierTotals {
    /// Sum of amounts.
    pub flat: i32,
    /// Product of `1 + amount / 100`.
    pub multiplier: f32,
}

impl Default for ModifierTotals {
    fn default() -> Self {
        Self {
            flat: 0,
            multiplier: 1.0,
        }
    }
}

impl ModifierTotals {
    fn add(&mut self, amount: i32) {
        self.flat = self.flat.saturating_add(amount);
        self.multiplier *= 1.0 + amount as f32 / 100.0;
    }
}

impl Unit {
    /// Totals of every applied effect of `aura_type` accepted by `filter`.
    pub fn modifier_totals<F>(&self, aura_type: AuraType, mut filter: F) -> ModifierTotals
    where
        F: FnMut(&Aura, &AuraEffect) -> bool,
    {
        let mut totals = ModifierTotals::default();
        let mut group_best: BTreeMap<u32, i32> = BTreeMap::new();

        for (aura, effect) in self.applied_effects(aura_type) {
            if !filter(aura, effect) {
                continue;
            }
            let amount = effect.amount();
            match aura.stack_group {
                Some((group, SpellGroupStackRule::ExclusiveSameEffect)) => {
                    let best = group_best.entry(group).or_insert(0);
                    if amount.saturating_abs() > best.saturating_abs() {
                        *best = amount;
                    }
                }
                _ => totals.add(amount),
            }
        }
        for amount in group_best.into_values() {
            totals.add(amount);
        }
        totals
    }

    pub fn total_aura_modifier(&self, aura_type: AuraType) -> i32 {
        self.modifier_totals(aura_type, |_, _| true).flat
    }

    /// Sum over effects whose `misc_value` school mask intersects `mask`.
    pub fn total_aura_modifier_by_school(&self, aura_type: AuraType, mask: SchoolMask) -> i32 {
        self.modifier_totals(aura_type, |_, e| misc_school(e).intersects(mask))
            .flat
    }

    /// Sum over effects whose `misc_value` equals `misc`.
    pub fn total_aura_modifier_by_misc(&self, aura_type: AuraType, misc: i32) -> i32 {
        self.modifier_totals(aura_type, |_, e| e.misc_value == misc).flat
    }

    pub fn total_aura_multiplier(&self, aura_type: AuraType) -> f32 {
        self.modifier_totals(aura_type, |_, _| true).multiplier
    }

    pub fn total_aura_multiplier_by_school(&self, aura_type: AuraType, mask: SchoolMask) -> f32 {
        self.modifier_totals(aura_type, |_, e| misc_school(e).intersects(mask))
            .multiplier
    }

    /// Multiplier over effects whose `misc_value` is a bit mask intersecting `mask`.
    pub fn total_aura_multiplier_by_misc_mask(&self, aura_type: AuraType, mask: u32) -> f32 {
        self.modifier_totals(aura_type, |_, e| (e.misc_value as u32) & mask != 0)
            .multiplier
    }
}

/// School mask stored in `misc_value`; `0` selects every school.
pub(crate) fn misc_school(effect: &AuraEffect) -> SchoolMask {
    match effect.misc_value {
        0 => SchoolMask::ALL,
        bits => SchoolMask::from_bits_truncate(bits as u8),
    }
}
