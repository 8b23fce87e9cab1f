//! Per-line edge counters shared between interrupt callbacks and the observer.

use gpio_hal::LineId;
use std::sync::atomic::{AtomicU64, Ordering};

/// Fixed-size set of counters indexed by line id.
///
/// Counters start at zero, are never reset and wrap on overflow.
#[derive(Debug)]
pub struct CounterSet {
    slots: Box<[AtomicU64]>,
}

impl CounterSet {
    pub fn new(lines: usize) -> Self {
        Self {
            slots: (0..lines).map(|_| AtomicU64::new(0)).collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Records one edge on `line`. Returns false if the line has no slot.
    pub fn increment(&self, line: LineId) -> bool {
        match self.slots.get(line.index()) {
            Some(slot) => {
                slot.fetch_add(1, Ordering::Relaxed);
                true
            }
            None => false,
        }
    }

    pub fn get(&self, line: LineId) -> Option<u64> {
        self.slots
            .get(line.index())
            .map(|slot| slot.load(Ordering::Relaxed))
    }

    /// Current value of every slot, in line order.
    pub fn values(&self) -> Vec<u64> {
        self.slots
            .iter()
            .map(|slot| slot.load(Ordering::Relaxed))
            .collect()
    }
}
