//! Proc trigger engine.
//!
//! A combat event is described once as a [`ProcRequest`] and then seen
//! separately by the actor's auras and the action target's auras. Each side
//! first collects every aura whose proc entry accepts the event, then fires
//! the collected auras inside a depth guard so nested procs stay bounded.
mod engine;
mod handlers;
mod types;

pub use engine::{ProcRequest, dispatch, melee_proc_flags, spell_proc_flags};
pub use types::*;
