//! The transition dictionary.
//!
//! Maps a `(state, symbol)` key to its ordered list of non-deterministic destinations.
//! Keys are spread over chained buckets; the bucket array doubles once more than 3/4
//! of it is occupied, so `find` and `insert` stay amortized O(1).

use crate::types::{Destination, NdtmError, State, Symbol, Transition};

/// Bucket count of a new dictionary. Always a power of two.
const MIN_BUCKETS: usize = 8;

#[derive(Debug)]
struct Entry {
    state: State,
    symbol: Symbol,
    destinations: Vec<Destination>,
}

#[derive(Debug)]
pub struct RuleDict {
    buckets: Vec<Vec<Entry>>,
    keys: usize,
    transitions: usize,
}

impl Default for RuleDict {
    fn default() -> Self {
        Self::new()
    }
}

fn hash(state: State, symbol: Symbol) -> u64 {
    let key = (u64::from(state) << 8) | u64::from(symbol);
    key.wrapping_mul(0x9E37_79B9_7F4A_7C15) >> 17
}

fn empty_buckets(count: usize) -> Result<Vec<Vec<Entry>>, NdtmError> {
    let mut buckets = Vec::new();
    buckets.try_reserve_exact(count)?;
    buckets.resize_with(count, Vec::new);
    Ok(buckets)
}

impl RuleDict {
    pub fn new() -> Self {
        let mut buckets = Vec::with_capacity(MIN_BUCKETS);
        buckets.resize_with(MIN_BUCKETS, Vec::new);
        Self {
            buckets,
            keys: 0,
            transitions: 0,
        }
    }

    /// Number of distinct `(state, symbol)` keys.
    pub fn len(&self) -> usize {
        self.keys
    }

    pub fn is_empty(&self) -> bool {
        self.keys == 0
    }

    /// Total number of destinations over all keys.
    pub fn transition_count(&self) -> usize {
        self.transitions
    }

    /// Current size of the bucket array.
    pub fn capacity(&self) -> usize {
        self.buckets.len()
    }

    /// Appends one destination to the list of `transition`'s key.
    pub fn insert(&mut self, transition: Transition) -> Result<(), NdtmError> {
        let Transition {
            from_state,
            from_symbol,
            ..
        } = transition;
        let slot = self.slot(from_state, from_symbol);
        let bucket = &mut self.buckets[slot];

        match bucket
            .iter_mut()
            .find(|e| e.state == from_state && e.symbol == from_symbol)
        {
            Some(entry) => {
                entry.destinations.try_reserve(1)?;
                entry.destinations.push(transition.destination());
            }
            None => {
                let mut destinations = Vec::new();
                destinations.try_reserve(1)?;
                destinations.push(transition.destination());

                bucket.try_reserve(1)?;
                bucket.push(Entry {
                    state: from_state,
                    symbol: from_symbol,
                    destinations,
                });
                self.keys += 1;
            }
        }
        self.transitions += 1;

        if self.keys > self.buckets.len() * 3 / 4 {
            self.grow()?;
        }
        Ok(())
    }

    /// Returns every destination registered for the key, in insertion order.
    pub fn find(&self, state: State, symbol: Symbol) -> &[Destination] {
        self.buckets[self.slot(state, symbol)]
            .iter()
            .find(|e| e.state == state && e.symbol == symbol)
            .map(|e| e.destinations.as_slice())
            .unwrap_or(&[])
    }

    /// Iterates over all keys and their destinations, in no particular order.
    pub fn iter(&self) -> impl Iterator<Item = (State, Symbol, &[Destination])> + '_ {
        self.buckets
            .iter()
            .flatten()
            .map(|e| (e.state, e.symbol, e.destinations.as_slice()))
    }

    /// Largest state named by any rule, on either side.
    pub fn max_state(&self) -> Option<State> {
        self.iter()
            .flat_map(|(state, _, destinations)| {
                std::iter::once(state).chain(destinations.iter().map(|d| d.state))
            })
            .max()
    }

    fn slot(&self, state: State, symbol: Symbol) -> usize {
        hash(state, symbol) as usize & (self.buckets.len() - 1)
    }

    fn grow(&mut self) -> Result<(), NdtmError> {
        let size = self.buckets.len() * 2;
        let mut buckets = empty_buckets(size)?;

        for entry in self.buckets.iter().flatten() {
            let slot = hash(entry.state, entry.symbol) as usize & (size - 1);
            buckets[slot].try_reserve(1)?;
        }
        // Capacity is in place; moving entries over can no longer fail.
        for entry in std::mem::take(&mut self.buckets).into_iter().flatten() {
            let slot = hash(entry.state, entry.symbol) as usize & (size - 1);
            buckets[slot].push(entry);
        }

        self.buckets = buckets;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Direction, BLANK};

    fn rule(from: State, read: Symbol, to: State, write: Symbol, dir: Direction) -> Transition {
        Transition {
            from_state: from,
            from_symbol: read,
            to_state: to,
            to_symbol: write,
            direction: dir,
        }
    }

    #[test]
    fn test_find_missing_key() {
        let dict = RuleDict::new();
        assert!(dict.find(0, BLANK).is_empty());
        assert!(dict.is_empty());
        assert_eq!(dict.max_state(), None);
    }

    #[test]
    fn test_destinations_keep_insertion_order() {
        let mut dict = RuleDict::new();
        dict.insert(rule(0, b'a', 1, b'x', Direction::Right)).unwrap();
        dict.insert(rule(0, b'a', 2, b'y', Direction::Left)).unwrap();
        dict.insert(rule(0, b'a', 1, b'x', Direction::Right)).unwrap();

        let found = dict.find(0, b'a');
        assert_eq!(found.len(), 3);
        assert_eq!(found[0].state, 1);
        assert_eq!(found[1].state, 2);
        assert_eq!(found[1].direction, Direction::Left);
        assert_eq!(found[2], found[0]);

        assert_eq!(dict.len(), 1);
        assert_eq!(dict.transition_count(), 3);
        assert!(dict.find(0, b'b').is_empty());
        assert!(dict.find(1, b'a').is_empty());
    }

    #[test]
    fn test_rehash_preserves_lists() {
        let mut dict = RuleDict::new();
        assert_eq!(dict.capacity(), MIN_BUCKETS);

        // Interleave a tracked key with many unrelated ones to force several rehashes.
        for state in 0..200u32 {
            dict.insert(rule(state, b'0', state + 1, b'1', Direction::Right))
                .unwrap();
            if state % 50 == 0 {
                dict.insert(rule(7, b'k', state, b'k', Direction::Stay))
                    .unwrap();
            }
        }

        assert!(dict.capacity() >= 256);
        assert!(dict.len() * 4 <= dict.capacity() * 3);
        assert_eq!(dict.len(), 201);

        let tracked: Vec<State> = dict.find(7, b'k').iter().map(|d| d.state).collect();
        assert_eq!(tracked, vec![0, 50, 100, 150]);

        for state in 0..200u32 {
            let found = dict.find(state, b'0');
            assert_eq!(found.len(), 1);
            assert_eq!(found[0].state, state + 1);
        }
        assert_eq!(dict.max_state(), Some(200));
    }

    #[test]
    fn test_iter_covers_all_keys() {
        let mut dict = RuleDict::new();
        for symbol in [b'a', b'b', BLANK] {
            dict.insert(rule(3, symbol, 4, symbol, Direction::Stay))
                .unwrap();
        }

        let mut keys: Vec<(State, Symbol)> = dict.iter().map(|(s, c, _)| (s, c)).collect();
        keys.sort();
        assert_eq!(keys, vec![(3, BLANK), (3, b'a'), (3, b'b')]);
    }
}
