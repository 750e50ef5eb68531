//! Hook implementations the simulation installs by default.

use combat_core::{CombatHooks, UnitId};
use tracing::info;

/// Reports deaths and durability loss through `tracing` and leaves every
/// number untouched.
#[derive(Clone, Copy, Debug, Default)]
pub struct TracingHooks;

impl CombatHooks for TracingHooks {
    fn on_death(&mut self, victim: UnitId, killer: Option<UnitId>) {
        info!(target: "runtime::hooks", %victim, ?killer, "unit died");
    }

    fn durability_loss(&mut self, unit: UnitId, pct: f32) {
        info!(target: "runtime::hooks", %unit, pct, "durability lost");
    }
}
