//! This module provides the writer side of the description format: it turns a parsed
//! [`Description`] back into text, and renders verdicts the way the CLI prints them.

use crate::parser::Description;
use crate::types::{Glyphs, Symbol, Verdict};

/// Encodes a description into the `tr` / `acc` / `max` / `run` text format.
///
/// Rules come out sorted by `(state, symbol)`, with the destinations of one key kept in
/// the order they were registered, so that parsing the output yields the same machine.
pub fn encode(description: &Description) -> String {
    let machine = &description.machine;
    let glyphs = &description.glyphs;
    let mut out = String::new();

    out.push_str("tr\n");
    let mut keys: Vec<_> = machine.rules().iter().collect();
    keys.sort_by_key(|&(state, symbol, _)| (state, symbol));
    for (state, symbol, destinations) in keys {
        for destination in destinations {
            out.push_str(&format!(
                "{} {} {} {} {}\n",
                state,
                glyph(glyphs, symbol),
                glyph(glyphs, destination.symbol),
                destination.direction.glyph(),
                destination.state
            ));
        }
    }

    out.push_str("acc\n");
    for state in machine.accepting().states() {
        out.push_str(&format!("{}\n", state));
    }

    out.push_str(&format!("max\n{}\n", machine.budget()));

    if !description.inputs.is_empty() {
        out.push_str("run\n");
        for input in &description.inputs {
            out.push_str(input);
            out.push('\n');
        }
    }

    out
}

/// Renders one verdict character per line.
pub fn render_verdicts(verdicts: &[Verdict]) -> String {
    verdicts.iter().fold(String::new(), |mut out, verdict| {
        out.push(verdict.symbol());
        out.push('\n');
        out
    })
}

fn glyph(glyphs: &Glyphs, symbol: Symbol) -> char {
    char::from(glyphs.to_glyph(symbol))
}
