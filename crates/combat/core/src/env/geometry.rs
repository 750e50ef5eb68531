//! Positional and faction facts consumed from outside the combat core.

use crate::unit::Unit;

/// Positional queries. Movement and facing live elsewhere; the core only asks
/// whether an attacker stands inside the victim's frontal arc.
pub trait GeometryOracle {
    fn in_frontal_arc(&self, victim: &Unit, attacker: &Unit) -> bool;
}

/// Hostility between two units.
pub trait FactionOracle {
    fn is_hostile(&self, a: &Unit, b: &Unit) -> bool;
}

/// Geometry used when no oracle is configured: everyone faces everyone.
#[derive(Clone, Copy, Debug, Default)]
pub struct FacingEveryone;

impl GeometryOracle for FacingEveryone {
    fn in_frontal_arc(&self, _victim: &Unit, _attacker: &Unit) -> bool {
        true
    }
}

/// Factions used when no oracle is configured: different faction ids are hostile.
#[derive(Clone, Copy, Debug, Default)]
pub struct FactionIdHostility;

impl FactionOracle for FactionIdHostility {
    fn is_hostile(&self, a: &Unit, b: &Unit) -> bool {
        a.faction != b.faction
    }
}
