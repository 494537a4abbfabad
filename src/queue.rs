//! FIFO of pending configurations. Popping from the front and pushing at the back
//! makes the exploration breadth-first.

use std::collections::VecDeque;

use crate::tape::{Tape, TapeStore};
use crate::types::{NdtmError, State};

/// One point of the computation: current state, owned tape and remaining budget.
#[derive(Debug)]
pub struct Configuration {
    pub state: State,
    pub tape: Tape,
    pub ttl: u32,
}

impl Configuration {
    pub fn new(state: State, tape: Tape, ttl: u32) -> Self {
        Self { state, tape, ttl }
    }
}

#[derive(Debug, Default)]
pub struct ConfigQueue {
    pending: VecDeque<Configuration>,
}

impl ConfigQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    /// Makes room for `additional` pushes, so the following pushes cannot fail.
    pub fn try_reserve(&mut self, additional: usize) -> Result<(), NdtmError> {
        Ok(self.pending.try_reserve(additional)?)
    }

    pub fn push(&mut self, conf: Configuration) {
        self.pending.push_back(conf);
    }

    pub fn pop(&mut self) -> Option<Configuration> {
        self.pending.pop_front()
    }

    /// Drops every pending configuration and releases its tape into `store`.
    /// Returns how many configurations were discarded.
    pub fn purge(&mut self, store: &mut TapeStore) -> usize {
        let mut purged = 0;
        while let Some(conf) = self.pending.pop_front() {
            let released = store.release(conf.tape);
            debug_assert!(released, "queued tape was not live");
            purged += 1;
        }
        purged
    }
}
