//! The accepting-state set.
//!
//! Starts as a plain list, which is the cheapest form for a handful of states. Once
//! the list would take at least as many bytes as a bitfield covering every observed
//! state, the set converts itself (once, for good) into that bitfield.

use std::mem::size_of;

use crate::bits::{bytes_for, Bitfield};
use crate::types::{NdtmError, State};

#[derive(Debug, Clone, PartialEq, Eq)]
enum Repr {
    List(Vec<State>),
    Bits(Bitfield),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AcceptSet {
    repr: Repr,
    max: State,
    count: usize,
}

impl Default for AcceptSet {
    fn default() -> Self {
        Self::new()
    }
}

impl AcceptSet {
    pub fn new() -> Self {
        Self {
            repr: Repr::List(Vec::new()),
            max: 0,
            count: 0,
        }
    }

    /// Records that `state` may occur. Keeps the largest value seen.
    pub fn observe_max(&mut self, state: State) {
        self.max = self.max.max(state);
    }

    /// Largest state observed or inserted so far.
    pub fn max_state(&self) -> State {
        self.max
    }

    /// Number of distinct accepting states.
    pub fn len(&self) -> usize {
        self.count
    }

    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    /// Whether the set has switched to its bitfield form.
    pub fn is_dense(&self) -> bool {
        matches!(self.repr, Repr::Bits(_))
    }

    /// Adds `state` to the set.
    pub fn insert(&mut self, state: State) -> Result<(), NdtmError> {
        self.observe_max(state);

        if let Repr::List(list) = &self.repr {
            let dense = bytes_for(self.max as usize + 1);
            if size_of::<State>() * (list.len() + 1) >= dense {
                self.densify()?;
            }
        }

        let added = match &mut self.repr {
            Repr::List(list) => {
                if list.contains(&state) {
                    false
                } else {
                    list.try_reserve(1)?;
                    list.push(state);
                    true
                }
            }
            Repr::Bits(bits) => {
                // Observed maximum may have moved since the conversion.
                bits.grow(state as usize + 1)?;
                let fresh = !bits.get(state as usize);
                bits.set(state as usize);
                fresh
            }
        };

        if added {
            self.count += 1;
        }
        Ok(())
    }

    pub fn contains(&self, state: State) -> bool {
        match &self.repr {
            Repr::List(list) => list.contains(&state),
            Repr::Bits(bits) => bits.get(state as usize),
        }
    }

    /// Returns the accepting states in ascending order.
    pub fn states(&self) -> Vec<State> {
        match &self.repr {
            Repr::List(list) => {
                let mut states = list.clone();
                states.sort_unstable();
                states
            }
            Repr::Bits(bits) => bits.ones().map(|i| i as State).collect(),
        }
    }

    fn densify(&mut self) -> Result<(), NdtmError> {
        let mut bits = Bitfield::with_len(self.max as usize + 1)?;
        if let Repr::List(list) = &self.repr {
            for &state in list {
                bits.set(state as usize);
            }
        }
        self.repr = Repr::Bits(bits);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_set() {
        let set = AcceptSet::new();
        assert!(set.is_empty());
        assert!(!set.contains(0));
        assert!(!set.is_dense());
    }

    #[test]
    fn test_stays_a_list_when_sparse() {
        let mut set = AcceptSet::new();
        set.observe_max(10_000);

        for state in [9_999, 3, 512] {
            set.insert(state).unwrap();
        }

        assert!(!set.is_dense());
        assert!(set.contains(3) && set.contains(512) && set.contains(9_999));
        assert!(!set.contains(4));
        assert_eq!(set.states(), vec![3, 512, 9_999]);
    }

    #[test]
    fn test_converts_when_bitfield_is_smaller() {
        let mut set = AcceptSet::new();
        set.observe_max(63);

        // A 64-state bitfield takes 8 bytes; the second list entry would too.
        set.insert(40).unwrap();
        assert!(!set.is_dense());
        set.insert(2).unwrap();
        assert!(set.is_dense());

        assert!(set.contains(40) && set.contains(2));
        assert!(!set.contains(41));
        assert_eq!(set.len(), 2);
    }

    #[test]
    fn test_same_answers_in_both_forms() {
        let inserted = [5u32, 17, 0, 33, 17, 8];
        let mut sparse = AcceptSet::new();
        sparse.observe_max(1_000_000);
        let mut dense = AcceptSet::new();
        dense.observe_max(40);

        for &state in &inserted {
            sparse.insert(state).unwrap();
            dense.insert(state).unwrap();
        }

        assert!(!sparse.is_dense());
        assert!(dense.is_dense());
        for state in 0..100 {
            assert_eq!(sparse.contains(state), dense.contains(state), "state {state}");
        }
        assert_eq!(sparse.len(), 5);
        assert_eq!(dense.len(), 5);
        assert_eq!(sparse.states(), dense.states());
    }

    #[test]
    fn test_insert_beyond_observed_max_after_conversion() {
        let mut set = AcceptSet::new();
        set.insert(1).unwrap();
        assert!(set.is_dense());

        set.insert(300).unwrap();
        assert!(set.contains(300));
        assert!(set.contains(1));
        assert!(!set.contains(299));
        assert!(!set.contains(100_000));
        assert_eq!(set.max_state(), 300);
    }
}
