use crate::spell::{SpellGroupStackRule, SpellInfo};
use crate::types::SpellId;

/// Read-only spell catalog.
pub trait SpellOracle {
    /// Descriptor for a spell id, if the catalog knows it.
    fn spell(&self, id: SpellId) -> Option<&SpellInfo>;

    /// Stacking rule of a spell group. Groups without a rule stack freely.
    fn group_rule(&self, group: u32) -> SpellGroupStackRule {
        let _ = group;
        SpellGroupStackRule::Default
    }
}
