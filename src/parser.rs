//! This module provides the parser for machine descriptions, utilizing the `pest` crate.
//! The grammar lives in `grammar.pest`; this module turns its parse tree into a
//! [`Description`]: a ready-to-run [`Machine`] plus the inputs listed in the `run` section.

use crate::engine::EngineConfig;
use crate::machine::Machine;
use crate::types::{encode_input, Direction, Glyphs, NdtmError, State, Symbol, Transition, Verdict};
use log::debug;
use pest::{
    error::{Error, ErrorVariant},
    iterators::Pair,
    Parser as PestParser, Span,
};
use pest_derive::Parser as PestParser;

/// Derives a `PestParser` for the description grammar defined in `grammar.pest`.
#[derive(PestParser)]
#[grammar = "grammar.pest"]
pub struct DescriptionParser;

/// A parsed machine description.
#[derive(Debug)]
pub struct Description {
    /// The machine built from the `tr`, `acc` and `max` sections.
    pub machine: Machine,
    /// Raw input lines of the `run` section, in file order.
    pub inputs: Vec<String>,
    /// Glyph settings the description was read with.
    pub glyphs: Glyphs,
}

impl Description {
    /// Returns the tape content for every input line.
    pub fn tapes(&self) -> impl Iterator<Item = Vec<Symbol>> + '_ {
        self.inputs
            .iter()
            .map(|input| encode_input(input, &self.glyphs))
    }

    /// Runs the machine on every input, stopping at the first fatal error.
    pub fn verdicts(&self, config: EngineConfig) -> Result<Vec<Verdict>, NdtmError> {
        self.tapes()
            .map(|tape| {
                self.machine
                    .run_with(&tape, config)
                    .map(|(verdict, _)| verdict)
            })
            .collect()
    }
}

/// Parses a description using the default glyphs (`_` for blank, newline as terminator).
pub fn parse(input: &str) -> Result<Description, NdtmError> {
    parse_with(input, Glyphs::default())
}

/// Parses a description with custom glyph settings.
///
/// # Returns
///
/// * `Ok(Description)` if the input is well-formed.
/// * `Err(NdtmError::ParseError)` on syntax errors, out-of-range numbers or invalid symbol glyphs.
/// * `Err(NdtmError::ValidationError)` if the `max` section is missing.
pub fn parse_with(input: &str, glyphs: Glyphs) -> Result<Description, NdtmError> {
    let root = DescriptionParser::parse(Rule::description, input)
        .map_err(|e| NdtmError::ParseError(e.into()))?
        .next()
        .ok_or_else(|| NdtmError::ValidationError("Empty description".to_string()))?;

    let mut machine = Machine::new(0);
    let mut budget = None;
    let mut inputs = Vec::new();

    for section in root.into_inner() {
        match section.as_rule() {
            Rule::transitions => parse_transitions(section, &glyphs, &mut machine)?,
            Rule::accepting => parse_accepting(section, &mut machine)?,
            Rule::budget => budget = Some(parse_budget(section)?),
            Rule::inputs => inputs = parse_inputs(section),
            _ => {} // EOI
        }
    }

    machine.set_budget(check_required_section(budget, "max")?);
    debug!(
        "parsed description: {} transitions over {} keys, {} accepting states, budget {}, {} inputs",
        machine.rules().transition_count(),
        machine.rules().len(),
        machine.accepting().len(),
        machine.budget(),
        inputs.len()
    );

    Ok(Description {
        machine,
        inputs,
        glyphs,
    })
}

/// Parses the `tr` section, registering each rule line in order.
fn parse_transitions(
    pair: Pair<Rule>,
    glyphs: &Glyphs,
    machine: &mut Machine,
) -> Result<(), NdtmError> {
    for line in pair.into_inner() {
        let span = line.as_span();
        let parts: Vec<Pair<Rule>> = line.into_inner().collect();

        // Rule: transition > [state, glyph, glyph, shift, state]
        let [from, read, write, shift, to] = parts.as_slice() else {
            return Err(parse_error("Malformed transition", span));
        };

        machine.add_transition(Transition {
            from_state: parse_state(from)?,
            from_symbol: parse_symbol(read, glyphs)?,
            to_state: parse_state(to)?,
            to_symbol: parse_symbol(write, glyphs)?,
            direction: parse_direction(shift)?,
        })?;
    }

    Ok(())
}

/// Parses the `acc` section.
fn parse_accepting(pair: Pair<Rule>, machine: &mut Machine) -> Result<(), NdtmError> {
    for state in pair.into_inner() {
        machine.add_accepting(parse_state(&state)?)?;
    }

    Ok(())
}

/// Parses the `max` section into the per-path step budget.
fn parse_budget(pair: Pair<Rule>) -> Result<u32, NdtmError> {
    let span = pair.as_span();
    let steps = pair
        .into_inner()
        .next()
        .ok_or_else(|| parse_error("Missing step budget", span))?;

    steps.as_str().parse::<u32>().map_err(|_| {
        parse_error(
            &format!("Step budget {} is out of range", steps.as_str()),
            steps.as_span(),
        )
    })
}

/// Collects the `run` section's input lines.
fn parse_inputs(pair: Pair<Rule>) -> Vec<String> {
    // Rule: inputs > [input | last_input]
    pair.into_inner()
        .map(|input| input.as_str().to_string())
        .collect()
}

fn parse_state(pair: &Pair<Rule>) -> Result<State, NdtmError> {
    pair.as_str().parse::<State>().map_err(|_| {
        parse_error(
            &format!("State {} is out of range", pair.as_str()),
            pair.as_span(),
        )
    })
}

/// Parses a one-byte symbol glyph, mapping the blank glyph to the blank symbol.
fn parse_symbol(pair: &Pair<Rule>, glyphs: &Glyphs) -> Result<Symbol, NdtmError> {
    match pair.as_str().as_bytes() {
        [glyph] if glyph.is_ascii_graphic() => Ok(glyphs.to_symbol(*glyph)),
        _ => Err(parse_error(
            &format!("Symbol must be a printable ASCII character: {}", pair.as_str()),
            pair.as_span(),
        )),
    }
}

/// Parses a head move: `L` for Left, `R` for Right, `S` for Stay.
fn parse_direction(pair: &Pair<Rule>) -> Result<Direction, NdtmError> {
    match pair.as_str() {
        "L" => Ok(Direction::Left),
        "R" => Ok(Direction::Right),
        "S" => Ok(Direction::Stay),
        other => Err(parse_error(
            &format!("Unsupported direction: {other}"),
            pair.as_span(),
        )),
    }
}

/// Creates a `NdtmError::ParseError` from a message and a `Span`.
fn parse_error(msg: &str, span: Span) -> NdtmError {
    NdtmError::ParseError(Box::new(Error::new_from_span(
        ErrorVariant::CustomError {
            message: msg.to_string(),
        },
        span,
    )))
}

/// Checks if a required section is present, returning an `Err` if it's missing.
fn check_required_section<T>(value: Option<T>, name: &str) -> Result<T, NdtmError> {
    value.ok_or_else(|| NdtmError::ValidationError(format!("Missing '{name}' section")))
}
