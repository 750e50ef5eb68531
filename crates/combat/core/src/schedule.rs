//! Time-ordered queue of delayed combat effects.

use std::cmp::Ordering;
use std::collections::BinaryHeap;

use crate::spell::CastRequest;
use crate::types::Timestamp;

/// Work deferred to a later simulation time.
#[derive(Clone, Debug, PartialEq)]
pub enum DelayedEffect {
    /// Resolve a spell whose cast already completed (travel time).
    LaunchSpell(CastRequest),
}

#[derive(Clone, Debug)]
pub struct ScheduledEvent {
    pub at: Timestamp,
    seq: u64,
    pub effect: DelayedEffect,
}

impl PartialEq for ScheduledEvent {
    fn eq(&self, other: &Self) -> bool {
        self.at == other.at && self.seq == other.seq
    }
}

impl Eq for ScheduledEvent {}

impl PartialOrd for ScheduledEvent {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for ScheduledEvent {
    fn cmp(&self, other: &Self) -> Ordering {
        // reversed: BinaryHeap pops the largest, we want the earliest
        other
            .at
            .cmp(&self.at)
            .then_with(|| other.seq.cmp(&self.seq))
    }
}

/// Min-heap of delayed effects; ties pop in insertion order.
#[derive(Clone, Debug, Default)]
pub struct EventQueue {
    heap: BinaryHeap<ScheduledEvent>,
    next_seq: u64,
}

impl EventQueue {
    pub fn push(&mut self, at: Timestamp, effect: DelayedEffect) {
        let seq = self.next_seq;
        self.next_seq += 1;
        self.heap.push(ScheduledEvent { at, seq, effect });
    }

    /// Pops the earliest event due at or before `now`.
    pub fn pop_due(&mut self, now: Timestamp) -> Option<ScheduledEvent> {
        if self.heap.peek().is_some_and(|e| e.at <= now) {
            self.heap.pop()
        } else {
            None
        }
    }

    pub fn next_due(&self) -> Option<Timestamp> {
        self.heap.peek().map(|e| e.at)
    }

    pub fn len(&self) -> usize {
        self.heap.len()
    }

    pub fn is_empty(&self) -> bool {
        self.heap.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{SpellId, UnitId};

    fn launch(spell: u32) -> DelayedEffect {
        DelayedEffect::LaunchSpell(CastRequest::new(UnitId(1), SpellId(spell), UnitId(2)))
    }

    fn spell_of(event: ScheduledEvent) -> SpellId {
        match event.effect {
            DelayedEffect::LaunchSpell(req) => req.spell,
        }
    }

    #[test]
    fn pops_earliest_first_then_fifo() {
        let mut queue = EventQueue::default();
        queue.push(Timestamp(300), launch(3));
        queue.push(Timestamp(100), launch(1));
        queue.push(Timestamp(100), launch(2));

        assert!(queue.pop_due(Timestamp(99)).is_none());
        let due: Vec<_> = std::iter::from_fn(|| queue.pop_due(Timestamp(300)))
            .map(spell_of)
            .collect();
        assert_eq!(due, vec![SpellId(1), SpellId(2), SpellId(3)]);
        assert!(queue.is_empty());
    }
}
