//! Identifiers and closed vocabularies used across the combat core.
mod ids;
mod kinds;
mod school;

pub use ids::{AuraId, ItemId, SpellId, Timestamp, UnitId};
pub use kinds::{
    CreatureType, DamageClass, DamageEffectType, DispelType, Mechanic, MechanicMask, PowerType,
    Stat, UnitKind, WeaponAttackType,
};
pub use school::{SchoolMask, SchoolValues, SpellSchool};
