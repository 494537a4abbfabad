//! The breadth-first exploration engine.
//!
//! A run starts from one configuration in state `0` holding the whole budget. Each
//! dequeued configuration is expanded into one successor per destination of its
//! `(state, symbol)` key: every destination but the last works on a branched copy of
//! the tape, the last one takes the tape over. Reaching an accepting destination ends
//! the run at once, so the shallowest accepting path in queue order wins.

use log::{debug, warn};
use serde::{Deserialize, Serialize};

use crate::machine::Machine;
use crate::queue::{ConfigQueue, Configuration};
use crate::tape::{Tape, TapeStore};
use crate::types::{
    Destination, NdtmError, Symbol, Verdict, DEFAULT_LANES_PER_GROUP, INITIAL_STATE,
};

/// Engine settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EngineConfig {
    /// How many sibling tapes share one allocation group.
    pub lanes_per_group: usize,
    /// Upper bound on live tape groups; reaching it aborts the run as out of memory.
    pub max_groups: Option<usize>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            lanes_per_group: DEFAULT_LANES_PER_GROUP,
            max_groups: None,
        }
    }
}

/// Counters collected during one run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunStats {
    /// Configurations taken off the queue.
    pub expansions: u64,
    /// Tapes created by branching.
    pub forks: u64,
    /// Configurations without any outgoing transition.
    pub dead_branches: u64,
    /// Configurations that still had transitions but no budget left.
    pub exhausted_branches: u64,
    /// Largest queue length seen.
    pub peak_queue: usize,
    /// Number of transitions on the accepting path, if one was found.
    pub accept_depth: Option<u32>,
}

enum Expansion {
    Dead,
    Exhausted,
    Expanded,
    Accepted,
}

/// Runs a [`Machine`] on tapes held in its own [`TapeStore`].
pub struct Engine<'m> {
    machine: &'m Machine,
    tapes: TapeStore,
    stats: RunStats,
}

impl<'m> Engine<'m> {
    pub fn new(machine: &'m Machine, config: EngineConfig) -> Self {
        Self {
            machine,
            tapes: TapeStore::with_limit(config.lanes_per_group, config.max_groups),
            stats: RunStats::default(),
        }
    }

    /// Builds the initial tape for a run from already encoded input.
    pub fn load(&mut self, input: &[Symbol]) -> Result<Tape, NdtmError> {
        self.tapes.init(input)
    }

    /// Counters of the latest run.
    pub fn stats(&self) -> &RunStats {
        &self.stats
    }

    pub fn tapes(&self) -> &TapeStore {
        &self.tapes
    }

    /// Explores every computation path from `tape` and reduces them to one verdict.
    ///
    /// Allocation failure aborts the run with [`NdtmError::OutOfMemory`]. Whatever
    /// the outcome, every tape of the run is released before returning.
    pub fn run(&mut self, tape: Tape) -> Result<Verdict, NdtmError> {
        self.stats = RunStats::default();
        debug!("run started with budget {}", self.machine.budget());

        let mut queue = ConfigQueue::new();
        let result = self.explore(&mut queue, tape);
        let purged = queue.purge(&mut self.tapes);

        match &result {
            Ok(verdict) => debug!(
                "run finished: verdict {}, {} pending configurations dropped, {:?}",
                verdict, purged, self.stats
            ),
            Err(e) => warn!("run aborted after {} expansions: {}", self.stats.expansions, e),
        }
        result
    }

    fn explore(&mut self, queue: &mut ConfigQueue, tape: Tape) -> Result<Verdict, NdtmError> {
        if let Err(e) = queue.try_reserve(1) {
            return self.discard(tape, e);
        }
        queue.push(Configuration::new(INITIAL_STATE, tape, self.machine.budget()));
        self.stats.peak_queue = 1;

        let mut undecided = false;
        while let Some(conf) = queue.pop() {
            self.stats.expansions += 1;
            let expansion = self.expand(conf, queue)?;
            self.stats.peak_queue = self.stats.peak_queue.max(queue.len());

            match expansion {
                Expansion::Accepted => return Ok(Verdict::Accept),
                Expansion::Exhausted => undecided = true,
                Expansion::Dead | Expansion::Expanded => {}
            }
        }

        Ok(if undecided {
            Verdict::Undecided
        } else {
            Verdict::Reject
        })
    }

    fn expand(
        &mut self,
        conf: Configuration,
        queue: &mut ConfigQueue,
    ) -> Result<Expansion, NdtmError> {
        let Configuration { state, tape, ttl } = conf;
        let machine = self.machine;

        let symbol = match self.tapes.read(&tape) {
            Ok(symbol) => symbol,
            Err(e) => return self.discard(tape, e),
        };

        let Some((last, forks)) = machine.rules().find(state, symbol).split_last() else {
            self.stats.dead_branches += 1;
            self.free(tape);
            return Ok(Expansion::Dead);
        };

        if ttl == 0 {
            self.stats.exhausted_branches += 1;
            self.free(tape);
            return Ok(Expansion::Exhausted);
        }

        if let Err(e) = queue.try_reserve(forks.len() + 1) {
            return self.discard(tape, e);
        }
        let depth = machine.budget() - ttl + 1;

        for dest in forks {
            if machine.accepts(dest.state) {
                self.free(tape);
                return Ok(self.accepted(depth));
            }

            let mut branch = match self.tapes.branch(&tape) {
                Ok(branch) => branch,
                Err(e) => return self.discard(tape, e),
            };
            self.stats.forks += 1;

            if let Err(e) = self.apply(&mut branch, dest) {
                self.free(branch);
                return self.discard(tape, e);
            }
            queue.push(Configuration::new(dest.state, branch, ttl - 1));
        }

        if machine.accepts(last.state) {
            self.free(tape);
            return Ok(self.accepted(depth));
        }

        // Last destination: move on the parent's own tape.
        let mut tape = tape;
        if let Err(e) = self.apply(&mut tape, last) {
            return self.discard(tape, e);
        }
        queue.push(Configuration::new(last.state, tape, ttl - 1));

        Ok(Expansion::Expanded)
    }

    fn apply(&mut self, tape: &mut Tape, dest: &Destination) -> Result<(), NdtmError> {
        self.tapes.write(tape, dest.symbol, dest.direction)?;
        Ok(())
    }

    fn accepted(&mut self, depth: u32) -> Expansion {
        self.stats.accept_depth = Some(depth);
        Expansion::Accepted
    }

    fn discard<T>(&mut self, tape: Tape, error: NdtmError) -> Result<T, NdtmError> {
        self.free(tape);
        Err(error)
    }

    /// Gives a tape back to the store. Every handle the engine holds is live.
    fn free(&mut self, tape: Tape) {
        let released = self.tapes.release(tape);
        debug_assert!(released, "engine released a stale or already released tape");
    }
}
