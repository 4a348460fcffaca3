//! Per-slot rotation counters
//!
//! Every slot fetch advances its slot's counter, so consecutive
//! requests start the carousel at successive creatives and no creative
//! is starved of the first position. The counters are in-process only;
//! they reset on restart, which is acceptable for rotation fairness.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

#[derive(Debug, Clone, Default)]
pub struct RotationCounters {
    counters: Arc<Mutex<HashMap<String, u64>>>,
}

impl RotationCounters {
    pub fn new() -> Self {
        Self::default()
    }

    /// Advance the slot's counter and return the rotation start index
    /// for a list of `len` creatives. An empty list always starts at 0.
    pub fn next_start(&self, slot: &str, len: usize) -> usize {
        if len == 0 {
            return 0;
        }
        let mut counters = self
            .counters
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        let counter = counters.entry(slot.to_string()).or_insert(0);
        let start = (*counter % len as u64) as usize;
        *counter = counter.wrapping_add(1);
        start
    }
}
