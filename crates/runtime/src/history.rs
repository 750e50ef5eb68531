//! Spell cooldown bookkeeping keyed by caster and spell.

use std::collections::HashMap;

use combat_core::{ItemId, SpellHistory, SpellId, Timestamp, UnitId};
use tracing::{debug, trace};

/// Readiness of one spell for one caster.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CooldownState {
    Ready,
    Remaining(u64),
    /// Held until the matching cooldown event arrives.
    Held,
}

#[derive(Clone, Copy, Debug)]
struct Cooldown {
    ready_at: Option<Timestamp>,
    item: Option<ItemId>,
}

/// In-memory [`SpellHistory`] that follows the simulation clock.
#[derive(Clone, Debug, Default)]
pub struct CooldownHistory {
    recovery: HashMap<SpellId, u64>,
    cooldowns: HashMap<(UnitId, SpellId), Cooldown>,
    now: Timestamp,
}

impl CooldownHistory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers the cooldown length of a spell.
    pub fn set_recovery(&mut self, spell: SpellId, recovery_ms: u64) {
        if recovery_ms == 0 {
            self.recovery.remove(&spell);
        } else {
            self.recovery.insert(spell, recovery_ms);
        }
    }

    pub fn now(&self) -> Timestamp {
        self.now
    }

    /// Moves the clock forward and forgets cooldowns that have run out.
    pub fn advance_to(&mut self, now: Timestamp) {
        self.now = now.max(self.now);
        let now = self.now;
        self.cooldowns
            .retain(|_, cd| cd.ready_at.is_none_or(|ready| ready > now));
    }

    pub fn state(&self, caster: UnitId, spell: SpellId) -> CooldownState {
        match self.cooldowns.get(&(caster, spell)) {
            None => CooldownState::Ready,
            Some(Cooldown { ready_at: None, .. }) => CooldownState::Held,
            Some(Cooldown {
                ready_at: Some(ready),
                ..
            }) => match ready.since(self.now) {
                0 => CooldownState::Ready,
                left => CooldownState::Remaining(left),
            },
        }
    }

    pub fn is_ready(&self, caster: UnitId, spell: SpellId) -> bool {
        self.state(caster, spell) == CooldownState::Ready
    }

    /// Item the running cooldown was started from.
    pub fn cooldown_item(&self, caster: UnitId, spell: SpellId) -> Option<ItemId> {
        self.cooldowns.get(&(caster, spell)).and_then(|cd| cd.item)
    }

    pub fn reset_cooldown(&mut self, caster: UnitId, spell: SpellId) {
        self.cooldowns.remove(&(caster, spell));
    }

    /// Clears every cooldown of `caster`.
    pub fn reset_all(&mut self, caster: UnitId) {
        self.cooldowns.retain(|(unit, _), _| *unit != caster);
    }

    fn recovery_of(&self, spell: SpellId) -> u64 {
        self.recovery.get(&spell).copied().unwrap_or(0)
    }
}

impl SpellHistory for CooldownHistory {
    fn start_cooldown(&mut self, spell: SpellId, item: Option<ItemId>, caster: UnitId, infinite: bool) {
        let ready_at = if infinite {
            None
        } else {
            match self.recovery_of(spell) {
                0 => return,
                recovery => Some(self.now + recovery),
            }
        };
        trace!(target: "runtime::history", %spell, %caster, ?ready_at, "cooldown started");
        self.cooldowns.insert((caster, spell), Cooldown { ready_at, item });
    }

    fn send_cooldown_event(&mut self, spell: SpellId, caster: UnitId) {
        let recovery = self.recovery_of(spell);
        let now = self.now;
        let Some(cooldown) = self.cooldowns.get_mut(&(caster, spell)) else {
            debug!(target: "runtime::history", %spell, %caster, "cooldown event without held cooldown");
            return;
        };
        if cooldown.ready_at.is_some() {
            return;
        }
        if recovery == 0 {
            self.cooldowns.remove(&(caster, spell));
        } else {
            cooldown.ready_at = Some(now + recovery);
        }
    }
}
