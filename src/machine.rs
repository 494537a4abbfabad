//! This module defines the `Machine` struct: the transition dictionary, the accepting
//! set and the step budget of a non-deterministic Turing machine, bundled as the one
//! immutable value every run reads from.

use crate::accept::AcceptSet;
use crate::engine::{Engine, EngineConfig, RunStats};
use crate::rules::RuleDict;
use crate::types::{NdtmError, State, Symbol, Transition, Verdict};

/// A non-deterministic single-tape Turing machine.
///
/// Runs always start in state `0`, with every path limited to `budget` transitions.
#[derive(Debug, Default)]
pub struct Machine {
    rules: RuleDict,
    accept: AcceptSet,
    budget: u32,
}

impl Machine {
    /// Creates a machine with no rules, no accepting states and the given step budget.
    pub fn new(budget: u32) -> Self {
        Self {
            rules: RuleDict::new(),
            accept: AcceptSet::new(),
            budget,
        }
    }

    /// Registers one non-deterministic destination.
    ///
    /// Both states of the rule are reported to the accepting set so that its dense
    /// form, if it ever switches, covers every state of the machine.
    pub fn add_transition(&mut self, transition: Transition) -> Result<(), NdtmError> {
        self.accept.observe_max(transition.from_state);
        self.accept.observe_max(transition.to_state);
        self.rules.insert(transition)
    }

    /// Marks `state` as accepting.
    pub fn add_accepting(&mut self, state: State) -> Result<(), NdtmError> {
        self.accept.insert(state)
    }

    pub fn set_budget(&mut self, budget: u32) {
        self.budget = budget;
    }

    /// Maximum number of transitions any single path may take.
    pub fn budget(&self) -> u32 {
        self.budget
    }

    pub fn rules(&self) -> &RuleDict {
        &self.rules
    }

    pub fn accepting(&self) -> &AcceptSet {
        &self.accept
    }

    pub fn accepts(&self, state: State) -> bool {
        self.accept.contains(state)
    }

    /// Runs the machine on `input` with the default engine settings.
    pub fn run(&self, input: &[Symbol]) -> Result<Verdict, NdtmError> {
        self.run_with(input, EngineConfig::default())
            .map(|(verdict, _)| verdict)
    }

    /// Runs the machine on `input` and returns the verdict with the run's counters.
    pub fn run_with(
        &self,
        input: &[Symbol],
        config: EngineConfig,
    ) -> Result<(Verdict, RunStats), NdtmError> {
        let mut engine = Engine::new(self, config);
        let tape = engine.load(input)?;
        let verdict = engine.run(tape)?;
        Ok((verdict, engine.stats().clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Direction, BLANK};

    fn scanner(budget: u32) -> Machine {
        let mut machine = Machine::new(budget);
        machine
            .add_transition(Transition {
                from_state: 0,
                from_symbol: b'a',
                to_state: 0,
                to_symbol: b'a',
                direction: Direction::Right,
            })
            .unwrap();
        machine
            .add_transition(Transition {
                from_state: 0,
                from_symbol: BLANK,
                to_state: 1,
                to_symbol: BLANK,
                direction: Direction::Stay,
            })
            .unwrap();
        machine.add_accepting(1).unwrap();
        machine
    }

    #[test]
    fn test_machine_creation() {
        let machine = scanner(10);

        assert_eq!(machine.budget(), 10);
        assert_eq!(machine.rules().len(), 2);
        assert!(machine.accepts(1));
        assert!(!machine.accepts(0));
    }

    #[test]
    fn test_run_scanner() {
        let machine = scanner(10);

        assert_eq!(machine.run(b"aaa"), Ok(Verdict::Accept));
        assert_eq!(machine.run(b""), Ok(Verdict::Accept));
        assert_eq!(machine.run(b"aab"), Ok(Verdict::Reject));
    }

    #[test]
    fn test_run_with_stats() {
        let machine = scanner(10);

        let (verdict, stats) = machine.run_with(b"aa", EngineConfig::default()).unwrap();
        assert_eq!(verdict, Verdict::Accept);
        assert_eq!(stats.accept_depth, Some(3));
        assert_eq!(stats.forks, 0);
    }

    #[test]
    fn test_set_budget() {
        let mut machine = scanner(0);
        assert_eq!(machine.run(b"a"), Ok(Verdict::Undecided));

        machine.set_budget(2);
        assert_eq!(machine.run(b"a"), Ok(Verdict::Accept));
    }

    #[test]
    fn test_states_are_observed() {
        let mut machine = Machine::new(1);
        machine
            .add_transition(Transition {
                from_state: 4,
                from_symbol: b'x',
                to_state: 70,
                to_symbol: b'y',
                direction: Direction::Left,
            })
            .unwrap();

        assert_eq!(machine.accepting().max_state(), 70);
        assert!(machine.accepting().is_empty());

        machine.add_accepting(90).unwrap();
        assert_eq!(machine.accepting().max_state(), 90);
        assert!(machine.accepts(90));
    }
}
