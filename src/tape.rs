//! Branching tape storage.
//!
//! Tapes live in a [`TapeStore`] arena. Sibling tapes created by branching share an
//! allocation group: a group is a deque of rows, row `r` holding the cell at one
//! position for every lane of the group. A [`Tape`] is a handle naming its group,
//! its lane and its head position, so each tape reads and writes a single column.
//!
//! ```text
//!  lane 3:  _ .... a .... _
//!  lane 2:  b .... _ .... _
//!  lane 1:  a .... a .... _
//!  lane 0:  a .... b .... _
//!           ^      ^      ^
//!        row 0  row 1  row 2      (rows grow at either end)
//! ```
//!
//! A group tracks its occupied lanes in a bitfield and is dropped once its last lane
//! is released. Group slots are generation-checked, so a handle that outlived its
//! group is detected instead of reading someone else's cells.

use std::collections::VecDeque;

use log::trace;

use crate::bits::Bitfield;
use crate::types::{Direction, NdtmError, Symbol, BLANK, DEFAULT_LANES_PER_GROUP};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct GroupId {
    index: usize,
    generation: u32,
}

/// Handle to one tape held in a [`TapeStore`].
///
/// A handle is the single owner of its tape: it is neither `Clone` nor `Copy`, and
/// giving it back to [`TapeStore::release`] is the only way to free its lane.
#[derive(Debug, PartialEq, Eq)]
#[must_use = "tapes must be released back to their store"]
pub struct Tape {
    group: GroupId,
    lane: usize,
    position: isize,
}

impl Tape {
    /// Head position relative to the first cell of the initial content.
    pub fn position(&self) -> isize {
        self.position
    }

    /// The lane this tape occupies inside its group.
    pub fn lane(&self) -> usize {
        self.lane
    }
}

struct Group {
    rows: VecDeque<Box<[Symbol]>>,
    /// Row index of position 0.
    origin: usize,
    active: Bitfield,
    live: usize,
    next_free: usize,
}

impl Group {
    fn new(lanes: usize, rows: usize, origin: usize) -> Result<Self, NdtmError> {
        let mut deque = VecDeque::new();
        deque.try_reserve(rows)?;
        for _ in 0..rows {
            deque.push_back(blank_row(lanes)?);
        }

        Ok(Self {
            rows: deque,
            origin,
            active: Bitfield::with_len(lanes)?,
            live: 0,
            next_free: 0,
        })
    }

    fn has_room(&self) -> bool {
        self.live < self.active.len()
    }

    fn claim(&mut self) -> usize {
        debug_assert!(self.has_room());
        let lane = self.next_free;
        self.active.set(lane);
        self.live += 1;
        self.next_free = self.active.next_clear(lane + 1);
        lane
    }

    fn free(&mut self, lane: usize) -> bool {
        if !self.active.get(lane) {
            return false;
        }
        self.active.unset(lane);
        self.live -= 1;
        self.next_free = self.next_free.min(lane);
        true
    }

    fn row_index(&self, position: isize) -> Option<usize> {
        let index = self.origin as isize + position;
        (index >= 0 && (index as usize) < self.rows.len()).then_some(index as usize)
    }

    /// Materializes rows until `position` is backed by storage.
    fn ensure(&mut self, position: isize, lanes: usize) -> Result<(), NdtmError> {
        while self.origin as isize + position < 0 {
            self.rows.try_reserve(1)?;
            self.rows.push_front(blank_row(lanes)?);
            self.origin += 1;
        }
        while self.origin as isize + position >= self.rows.len() as isize {
            self.rows.try_reserve(1)?;
            self.rows.push_back(blank_row(lanes)?);
        }
        Ok(())
    }
}

fn blank_row(lanes: usize) -> Result<Box<[Symbol]>, NdtmError> {
    let mut row = Vec::new();
    row.try_reserve_exact(lanes)?;
    row.resize(lanes, BLANK);
    Ok(row.into_boxed_slice())
}

struct Slot {
    generation: u32,
    group: Option<Group>,
}

/// Arena owning the cells of every tape of a run.
pub struct TapeStore {
    slots: Vec<Slot>,
    vacant: Vec<usize>,
    lanes: usize,
    max_groups: Option<usize>,
    live_groups: usize,
}

impl Default for TapeStore {
    fn default() -> Self {
        Self::new(DEFAULT_LANES_PER_GROUP)
    }
}

impl TapeStore {
    /// Creates an empty store whose groups hold `lanes` tapes each (at least one).
    pub fn new(lanes: usize) -> Self {
        Self::with_limit(lanes, None)
    }

    /// Creates an empty store that refuses to hold more than `max_groups` live groups.
    /// Hitting the limit is reported as [`NdtmError::OutOfMemory`].
    pub fn with_limit(lanes: usize, max_groups: Option<usize>) -> Self {
        Self {
            slots: Vec::new(),
            vacant: Vec::new(),
            lanes: lanes.max(1),
            max_groups,
            live_groups: 0,
        }
    }

    /// Number of allocation groups currently holding at least one tape.
    pub fn live_groups(&self) -> usize {
        self.live_groups
    }

    /// Number of tapes not yet released.
    pub fn live_tapes(&self) -> usize {
        self.slots
            .iter()
            .filter_map(|slot| slot.group.as_ref())
            .map(|group| group.live)
            .sum()
    }

    /// Builds a tape holding `content` at positions `0..content.len()`, head at 0.
    pub fn init(&mut self, content: &[Symbol]) -> Result<Tape, NdtmError> {
        self.check_limit()?;

        let mut group = Group::new(self.lanes, content.len().max(1), 0)?;
        let lane = group.claim();
        for (row, &symbol) in group.rows.iter_mut().zip(content) {
            row[lane] = symbol;
        }

        let id = self.insert_group(group)?;
        Ok(Tape {
            group: id,
            lane,
            position: 0,
        })
    }

    /// Builds an all-blank tape with the head at position 0.
    pub fn blank(&mut self) -> Result<Tape, NdtmError> {
        self.init(&[])
    }

    /// Returns the symbol under the head.
    pub fn read(&self, tape: &Tape) -> Result<Symbol, NdtmError> {
        self.read_at(tape, tape.position)
    }

    /// Returns the symbol at any position; never-written cells read as blank.
    pub fn read_at(&self, tape: &Tape, position: isize) -> Result<Symbol, NdtmError> {
        let group = self.group(tape.group)?;
        Ok(group
            .row_index(position)
            .map_or(BLANK, |row| group.rows[row][tape.lane]))
    }

    /// Writes `symbol` under the head, then moves the head, growing the tape if needed.
    pub fn write<'t>(
        &mut self,
        tape: &'t mut Tape,
        symbol: Symbol,
        direction: Direction,
    ) -> Result<&'t mut Tape, NdtmError> {
        let lanes = self.lanes;
        let group = self.group_mut(tape.group)?;

        group.ensure(tape.position, lanes)?;
        if let Some(row) = group.row_index(tape.position) {
            group.rows[row][tape.lane] = symbol;
        }

        let next = tape.position + direction.offset();
        group.ensure(next, lanes)?;
        tape.position = next;

        Ok(tape)
    }

    /// Creates an independent copy of `tape` with the same content and head position.
    ///
    /// The copy takes a free lane of the parent's group when there is one, otherwise
    /// it opens a new group shaped like the parent's.
    pub fn branch(&mut self, tape: &Tape) -> Result<Tape, NdtmError> {
        let group = self.group_mut(tape.group)?;
        if group.has_room() {
            let lane = group.claim();
            for row in group.rows.iter_mut() {
                row[lane] = row[tape.lane];
            }
            return Ok(Tape {
                group: tape.group,
                lane,
                position: tape.position,
            });
        }

        self.check_limit()?;
        let lanes = self.lanes;
        let parent = self.group(tape.group)?;

        let mut fresh = Group::new(lanes, parent.rows.len(), parent.origin)?;
        let lane = fresh.claim();
        for (dst, src) in fresh.rows.iter_mut().zip(parent.rows.iter()) {
            dst[lane] = src[tape.lane];
        }

        let id = self.insert_group(fresh)?;
        Ok(Tape {
            group: id,
            lane,
            position: tape.position,
        })
    }

    /// Frees the tape's lane, and its whole group once no lane is in use.
    ///
    /// Returns `false` if the handle does not name a live tape of this store.
    pub fn release(&mut self, tape: Tape) -> bool {
        let Some(slot) = self.slots.get_mut(tape.group.index) else {
            return false;
        };
        if slot.generation != tape.group.generation {
            return false;
        }
        let Some(group) = slot.group.as_mut() else {
            return false;
        };
        if !group.free(tape.lane) {
            return false;
        }

        if group.live == 0 {
            slot.group = None;
            slot.generation = slot.generation.wrapping_add(1);
            self.vacant.push(tape.group.index);
            self.live_groups -= 1;
            trace!("released tape group {}", tape.group.index);
        }
        true
    }

    /// Returns the written part of the tape, with surrounding blanks trimmed.
    pub fn contents(&self, tape: &Tape) -> Result<Vec<Symbol>, NdtmError> {
        let group = self.group(tape.group)?;
        let column: Vec<Symbol> = group.rows.iter().map(|row| row[tape.lane]).collect();

        let start = column.iter().position(|&s| s != BLANK);
        let end = column.iter().rposition(|&s| s != BLANK);
        Ok(match (start, end) {
            (Some(start), Some(end)) => column[start..=end].to_vec(),
            _ => Vec::new(),
        })
    }

    fn check_limit(&self) -> Result<(), NdtmError> {
        match self.max_groups {
            Some(max) if self.live_groups >= max => Err(NdtmError::OutOfMemory(format!(
                "tape group limit of {max} reached"
            ))),
            _ => Ok(()),
        }
    }

    fn insert_group(&mut self, group: Group) -> Result<GroupId, NdtmError> {
        let id = match self.vacant.pop() {
            Some(index) => {
                let slot = &mut self.slots[index];
                slot.group = Some(group);
                GroupId {
                    index,
                    generation: slot.generation,
                }
            }
            None => {
                self.slots.try_reserve(1)?;
                // Keep room for every slot on the vacant list so release never allocates.
                self.vacant
                    .try_reserve(self.slots.len() + 1 - self.vacant.len())?;
                self.slots.push(Slot {
                    generation: 0,
                    group: Some(group),
                });
                GroupId {
                    index: self.slots.len() - 1,
                    generation: 0,
                }
            }
        };

        self.live_groups += 1;
        trace!("allocated tape group {}", id.index);
        Ok(id)
    }

    fn group(&self, id: GroupId) -> Result<&Group, NdtmError> {
        self.slots
            .get(id.index)
            .filter(|slot| slot.generation == id.generation)
            .and_then(|slot| slot.group.as_ref())
            .ok_or(NdtmError::StaleTape)
    }

    fn group_mut(&mut self, id: GroupId) -> Result<&mut Group, NdtmError> {
        self.slots
            .get_mut(id.index)
            .filter(|slot| slot.generation == id.generation)
            .and_then(|slot| slot.group.as_mut())
            .ok_or(NdtmError::StaleTape)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn text(store: &TapeStore, tape: &Tape) -> String {
        String::from_utf8(store.contents(tape).unwrap()).unwrap()
    }

    #[test]
    fn test_init_and_read() {
        let mut store = TapeStore::default();
        let tape = store.init(b"abc").unwrap();

        assert_eq!(store.read(&tape).unwrap(), b'a');
        assert_eq!(store.read_at(&tape, 2).unwrap(), b'c');
        assert_eq!(store.read_at(&tape, 3).unwrap(), BLANK);
        assert_eq!(store.read_at(&tape, -40).unwrap(), BLANK);
        assert_eq!(tape.position(), 0);

        let empty = store.init(&[]).unwrap();
        assert_eq!(store.read(&empty).unwrap(), BLANK);
        assert!(store.release(empty));
        assert!(store.release(tape));
    }

    #[test]
    fn test_blank_tape() {
        let mut store = TapeStore::new(2);
        let mut tape = store.blank().unwrap();
        assert_eq!(tape.position(), 0);
        assert_eq!(store.read(&tape).unwrap(), BLANK);
        assert!(store.contents(&tape).unwrap().is_empty());

        store.write(&mut tape, b'k', Direction::Left).unwrap();
        assert_eq!(store.read_at(&tape, 0).unwrap(), b'k');
        assert_eq!(text(&store, &tape), "k");
        assert_eq!(store.live_groups(), 1);

        assert!(store.release(tape));
        assert_eq!(store.live_groups(), 0);
    }

    #[test]
    fn test_write_moves_and_grows_both_ways() {
        let mut store = TapeStore::new(4);
        let mut tape = store.init(b"ab").unwrap();

        store.write(&mut tape, b'x', Direction::Left).unwrap();
        assert_eq!(tape.position(), -1);
        assert_eq!(store.read(&tape).unwrap(), BLANK);

        let position = store
            .write(&mut tape, b'y', Direction::Left)
            .unwrap()
            .position();
        assert_eq!(position, -2);
        store.write(&mut tape, b'z', Direction::Stay).unwrap();
        assert_eq!(tape.position(), -2);
        assert_eq!(store.read(&tape).unwrap(), b'z');
        assert_eq!(text(&store, &tape), "zyxb");

        for _ in 0..5 {
            let symbol = store.read(&tape).unwrap();
            store.write(&mut tape, symbol, Direction::Right).unwrap();
        }
        assert_eq!(tape.position(), 3);
        assert_eq!(store.read(&tape).unwrap(), BLANK);
        assert_eq!(text(&store, &tape), "zyxb");
    }

    #[test]
    fn test_branch_is_independent() {
        let mut store = TapeStore::new(8);
        let mut parent = store.init(b"hello").unwrap();
        store.write(&mut parent, b'j', Direction::Right).unwrap();

        let mut child = store.branch(&parent).unwrap();
        assert_eq!(child.position(), parent.position());
        assert_eq!(text(&store, &child), "jello");

        store.write(&mut child, b'E', Direction::Left).unwrap();
        store.write(&mut parent, b'U', Direction::Right).unwrap();

        assert_eq!(text(&store, &parent), "jUllo");
        assert_eq!(text(&store, &child), "jEllo");
        for position in -3..8 {
            if position != 1 {
                assert_eq!(
                    store.read_at(&parent, position).unwrap(),
                    store.read_at(&child, position).unwrap()
                );
            }
        }

        assert!(store.release(parent));
        assert_eq!(text(&store, &child), "jEllo");
        assert!(store.release(child));
    }

    #[test]
    fn test_branch_shares_group_until_full() {
        let mut store = TapeStore::new(2);
        let root = store.init(b"ab").unwrap();

        let sibling = store.branch(&root).unwrap();
        assert_eq!(store.live_groups(), 1);
        assert_eq!(sibling.lane(), 1);

        // Group is full: the next branch opens a second group with the same shape.
        let mut overflow = store.branch(&root).unwrap();
        assert_eq!(store.live_groups(), 2);
        assert_eq!(overflow.lane(), 0);
        assert_eq!(text(&store, &overflow), "ab");

        store.write(&mut overflow, b'q', Direction::Left).unwrap();
        assert_eq!(text(&store, &overflow), "qb");
        assert_eq!(text(&store, &root), "ab");
        assert_eq!(store.live_tapes(), 3);

        assert!(store.release(root));
        assert!(store.release(sibling));
        assert!(store.release(overflow));
        assert_eq!(store.live_tapes(), 0);
        assert_eq!(store.live_groups(), 0);
    }

    #[test]
    fn test_released_lane_is_reused() {
        let mut store = TapeStore::new(4);
        let mut root = store.init(b"a").unwrap();
        let first = store.branch(&root).unwrap();
        let second = store.branch(&root).unwrap();
        assert_eq!((first.lane(), second.lane()), (1, 2));

        assert!(store.release(first));
        store.write(&mut root, b'z', Direction::Stay).unwrap();

        // The freed lane is handed out again and fully overwritten.
        let third = store.branch(&root).unwrap();
        assert_eq!(third.lane(), 1);
        assert_eq!(text(&store, &third), "z");
        assert_eq!(text(&store, &second), "a");

        for tape in [root, second, third] {
            assert!(store.release(tape));
        }
        assert_eq!(store.live_groups(), 0);
    }

    #[test]
    fn test_stale_handle_is_detected() {
        let mut store = TapeStore::new(1);
        let tape = store.init(b"a").unwrap();
        let forged = Tape {
            group: tape.group,
            lane: tape.lane,
            position: 0,
        };

        assert!(store.release(tape));
        assert_eq!(store.read(&forged), Err(NdtmError::StaleTape));

        // The slot is reused under a new generation; the old handle stays dead.
        let fresh = store.init(b"b").unwrap();
        assert_eq!(fresh.group.index, forged.group.index);
        assert_eq!(store.read(&forged), Err(NdtmError::StaleTape));
        assert!(!store.release(forged));
        assert_eq!(store.read(&fresh).unwrap(), b'b');
        assert!(store.release(fresh));
    }

    #[test]
    fn test_double_release_is_refused() {
        let mut store = TapeStore::new(4);
        let root = store.init(b"a").unwrap();
        let child = store.branch(&root).unwrap();
        let copy = Tape {
            group: child.group,
            lane: child.lane,
            position: child.position,
        };

        assert!(store.release(child));
        assert!(!store.release(copy));
        assert_eq!(store.live_tapes(), 1);
        assert!(store.release(root));
    }

    #[test]
    fn test_group_limit() {
        let mut store = TapeStore::with_limit(1, Some(2));
        let root = store.init(b"a").unwrap();
        let child = store.branch(&root).unwrap();

        assert!(matches!(
            store.branch(&root),
            Err(NdtmError::OutOfMemory(_))
        ));
        assert!(matches!(store.init(b"b"), Err(NdtmError::OutOfMemory(_))));

        assert!(store.release(child));
        let again = store.branch(&root).unwrap();
        assert!(store.release(again));
        assert!(store.release(root));
    }
}
