//! Synchronous driver for the deterministic combat simulation.
//!
//! This crate wires the content loaders, oracle implementations and the
//! collaborators the combat core calls out to into one [`Simulation`] that
//! advances in fixed ticks.
//!
//! Modules are organized by responsibility:
//! - [`simulation`] hosts the driver and its builder
//! - [`oracle`] adapts loaded content to the `combat-core` oracle traits
//! - [`threat`], [`history`] and [`combat_log`] implement the collaborator
//!   traits with in-memory state
//! - [`hooks`] provides the default behavioural hooks
pub mod combat_log;
pub mod error;
pub mod history;
pub mod hooks;
pub mod oracle;
pub mod simulation;
pub mod threat;

pub use combat_log::CombatLogBuffer;
pub use error::{Result, RuntimeError};
pub use history::{CooldownHistory, CooldownState};
pub use hooks::TracingHooks;
pub use oracle::{OracleManager, SpellOracleImpl};
pub use simulation::{Simulation, SimulationBuilder, SimulationConfig};
pub use threat::{ThreatEntry, ThreatTable};
