//! Hit resolution and the damage/heal pipeline.
//!
//! - [`hit`]: attack tables and spell hit rolls
//! - [`modifiers`]: done/taken bonuses and crit chance from auras and stats
//! - [`mitigation`]: armor, resistance, absorbs and redirected damage
//! - [`damage`]: the orchestrator that commits health changes
mod damage;
pub mod hit;
mod info;
mod mitigation;
pub mod modifiers;

pub use damage::{DealDamageRequest, HitSource, damage_unit, deal_damage, deal_heal, energize, heal_unit};
pub(crate) use damage::engage;
pub use hit::{roll_melee_outcome, spell_hit_result};
pub use info::{DamageInfo, HealInfo, MeleeHitOutcome, SpellMissInfo};
pub use mitigation::{armor_reduced_damage, average_resist_reduction, resist_distribution};
