//! This module defines the core data types shared by the simulator: states, symbols,
//! head moves, transitions, verdicts, configuration constants and the error type.

use serde::{Deserialize, Serialize};
use std::collections::TryReserveError;
use std::fmt;
use thiserror::Error;

use crate::Rule;

/// A machine state identifier. States are dense and used directly as keys.
pub type State = u32;
/// A tape symbol. Every never-written cell holds [`BLANK`].
pub type Symbol = u8;

/// The symbol stored in blank cells.
pub const BLANK: Symbol = 0;
/// The state every run starts in.
pub const INITIAL_STATE: State = 0;
/// The glyph used in descriptions and inputs to denote the blank symbol.
pub const DEFAULT_BLANK_GLYPH: u8 = b'_';
/// The byte that ends an input string.
pub const DEFAULT_TERMINATOR: u8 = b'\n';
/// How many sibling tapes share one allocation group by default.
pub const DEFAULT_LANES_PER_GROUP: usize = 256;

/// Represents the possible directions a tape head can move.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Direction {
    /// Move the head one position to the left.
    Left,
    /// Keep the head in the same position.
    Stay,
    /// Move the head one position to the right.
    Right,
}

impl Direction {
    /// Returns the head displacement in cells.
    pub fn offset(self) -> isize {
        match self {
            Direction::Left => -1,
            Direction::Stay => 0,
            Direction::Right => 1,
        }
    }

    /// Returns the glyph used for this direction in machine descriptions.
    pub fn glyph(self) -> char {
        match self {
            Direction::Left => 'L',
            Direction::Stay => 'S',
            Direction::Right => 'R',
        }
    }
}

/// One non-deterministic destination of a `(state, symbol)` pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Destination {
    /// The state the machine moves to.
    pub state: State,
    /// The symbol written under the head before moving.
    pub symbol: Symbol,
    /// Where the head goes after writing.
    pub direction: Direction,
}

/// A single transition rule: `(from_state, from_symbol) -> (to_state, to_symbol, move)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transition {
    pub from_state: State,
    pub from_symbol: Symbol,
    pub to_state: State,
    pub to_symbol: Symbol,
    pub direction: Direction,
}

impl Transition {
    /// Returns the right-hand side of the rule.
    pub fn destination(&self) -> Destination {
        Destination {
            state: self.to_state,
            symbol: self.to_symbol,
            direction: self.direction,
        }
    }
}

/// The outcome of one run of the machine on one input.
///
/// Allocation failure is not a verdict; it is reported as [`NdtmError::OutOfMemory`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Verdict {
    /// Some computation path reached an accepting state within its budget.
    Accept,
    /// Every path died without accepting and none ran out of budget.
    Reject,
    /// No path accepted, but at least one ran out of budget with moves left.
    Undecided,
}

impl Verdict {
    /// Returns the single output character for this verdict.
    pub fn symbol(self) -> char {
        match self {
            Verdict::Accept => '1',
            Verdict::Reject => '0',
            Verdict::Undecided => 'U',
        }
    }
}

impl fmt::Display for Verdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.symbol())
    }
}

/// Glyph settings shared by the description reader and writer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Glyphs {
    /// Glyph that stands for the blank symbol.
    pub blank: u8,
    /// Byte that marks the end of an input string.
    pub terminator: u8,
}

impl Default for Glyphs {
    fn default() -> Self {
        Self {
            blank: DEFAULT_BLANK_GLYPH,
            terminator: DEFAULT_TERMINATOR,
        }
    }
}

impl Glyphs {
    /// Maps a glyph read from text to a tape symbol.
    pub fn to_symbol(&self, glyph: u8) -> Symbol {
        if glyph == self.blank {
            BLANK
        } else {
            glyph
        }
    }

    /// Maps a tape symbol back to the glyph written in text.
    pub fn to_glyph(&self, symbol: Symbol) -> u8 {
        if symbol == BLANK {
            self.blank
        } else {
            symbol
        }
    }
}

/// Converts an input string to tape content.
///
/// Bytes are taken up to the first terminator; the blank glyph becomes [`BLANK`].
pub fn encode_input(input: &str, glyphs: &Glyphs) -> Vec<Symbol> {
    input
        .bytes()
        .take_while(|&b| b != glyphs.terminator)
        .map(|b| glyphs.to_symbol(b))
        .collect()
}

/// Represents the errors that can occur while loading or running a machine.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum NdtmError {
    /// An allocation could not be satisfied. Aborts the current run.
    #[error("Out of memory: {0}")]
    OutOfMemory(String),
    /// A tape handle was used after its group had been released.
    #[error("Stale tape handle")]
    StaleTape,
    /// Indicates an error during the parsing of a machine description.
    #[error("Description parsing error: {0}")]
    ParseError(#[from] Box<pest::error::Error<Rule>>),
    /// The description parsed but is not a usable machine.
    #[error("Description validation error: {0}")]
    ValidationError(String),
    /// Indicates an error related to file system operations.
    #[error("File error: {0}")]
    FileError(String),
}

impl From<TryReserveError> for NdtmError {
    fn from(error: TryReserveError) -> Self {
        NdtmError::OutOfMemory(error.to_string())
    }
}
