//! Bounded in-memory combat log.

use std::collections::VecDeque;
use std::io::Write;

use combat_core::log::DamageLog;
use combat_core::{CombatLogEntry, CombatLogSink, UnitId};
use tracing::warn;

use crate::error::{Result, RuntimeError};

/// Ring buffer of combat-log records. The oldest record is dropped once the
/// buffer is full.
#[derive(Clone, Debug)]
pub struct CombatLogBuffer {
    entries: VecDeque<CombatLogEntry>,
    capacity: usize,
    dropped: u64,
}

impl CombatLogBuffer {
    pub const DEFAULT_CAPACITY: usize = 4_096;

    pub fn new(capacity: usize) -> Self {
        Self {
            entries: VecDeque::with_capacity(capacity.min(Self::DEFAULT_CAPACITY)),
            capacity: capacity.max(1),
            dropped: 0,
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Records evicted because the buffer was full.
    pub fn dropped(&self) -> u64 {
        self.dropped
    }

    pub fn entries(&self) -> impl Iterator<Item = &CombatLogEntry> {
        self.entries.iter()
    }

    /// Removes and returns every buffered record.
    pub fn drain(&mut self) -> Vec<CombatLogEntry> {
        self.entries.drain(..).collect()
    }

    /// Damage records with `victim` as the victim.
    pub fn damage_taken(&self, victim: UnitId) -> impl Iterator<Item = &DamageLog> {
        self.entries.iter().filter_map(move |entry| match entry {
            CombatLogEntry::Damage(log) if log.victim == victim => Some(log),
            _ => None,
        })
    }

    /// Sum of damage `attacker` dealt across buffered records.
    pub fn damage_done_by(&self, attacker: UnitId) -> u64 {
        self.entries
            .iter()
            .filter_map(|entry| match entry {
                CombatLogEntry::Damage(log) if log.attacker == Some(attacker) => Some(u64::from(log.amount)),
                _ => None,
            })
            .sum()
    }

    /// Writes buffered records as JSON lines, oldest first.
    pub fn write_json_lines(&self, mut writer: impl Write) -> Result<()> {
        for entry in &self.entries {
            serde_json::to_writer(&mut writer, entry).map_err(|e| RuntimeError::Export(e.into()))?;
            writer.write_all(b"\n").map_err(RuntimeError::Export)?;
        }
        writer.flush().map_err(RuntimeError::Export)
    }
}

impl Default for CombatLogBuffer {
    fn default() -> Self {
        Self::new(Self::DEFAULT_CAPACITY)
    }
}

impl CombatLogSink for CombatLogBuffer {
    fn record(&mut self, entry: CombatLogEntry) {
        if self.entries.len() == self.capacity {
            self.entries.pop_front();
            self.dropped += 1;
            if self.dropped == 1 {
                warn!(target: "runtime::combat_log", capacity = self.capacity, "combat log full, dropping oldest records");
            }
        }
        self.entries.push_back(entry);
    }
}
