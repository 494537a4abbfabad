//! This crate provides the core logic for a non-deterministic Turing machine simulator.
//! It includes the branching tape store, the transition dictionary, the adaptive accepting
//! set, the breadth-first execution engine, and a reader and writer for the plain-text
//! machine description format.

pub mod accept;
pub mod bits;
pub mod encoder;
pub mod engine;
pub mod loader;
pub mod machine;
pub mod parser;
pub mod queue;
pub mod rules;
pub mod samples;
pub mod tape;
pub mod types;

/// Re-exports the `Rule` enum from the parser module, used by the `pest` grammar.
pub use crate::parser::Rule;
/// Re-exports the accepting-state set.
pub use accept::AcceptSet;
/// Re-exports the writer functions from the encoder module.
pub use encoder::{encode, render_verdicts};
/// Re-exports the execution engine and its settings.
pub use engine::{Engine, EngineConfig, RunStats};
/// Re-exports the `DescriptionLoader` struct from the loader module.
pub use loader::DescriptionLoader;
/// Re-exports the `Machine` struct from the machine module.
pub use machine::Machine;
/// Re-exports the parsing entry points from the parser module.
pub use parser::{parse, parse_with, Description};
/// Re-exports the transition dictionary.
pub use rules::RuleDict;
/// Re-exports `Sample`, `SampleManager`, and `SAMPLES` from the samples module.
pub use samples::{Sample, SampleManager, SAMPLES};
/// Re-exports the tape store and its handles.
pub use tape::{Tape, TapeStore};
/// Re-exports the core types shared across modules.
pub use types::{
    encode_input, Destination, Direction, Glyphs, NdtmError, State, Symbol, Transition, Verdict,
    BLANK, DEFAULT_BLANK_GLYPH, DEFAULT_LANES_PER_GROUP, DEFAULT_TERMINATOR, INITIAL_STATE,
};
