//! This module provides the parsers for automaton source documents, utilizing the `pest`
//! crate. Every formalism but regex uses the YAML-like document format read by
//! [`parse_document`]; this module maps the resulting tree onto each engine's definition
//! type and attaches source locations to the errors the engines report.

use pest::Parser as PestParser;
use pest_derive::Parser as PestParser;
use std::collections::HashMap;
use tracing::debug;

use crate::alphabet::parse_symbol;
use crate::automaton::{Automaton, Formalism};
use crate::config::EngineConfig;
use crate::dfa::{Dfa, DfaDefinition};
use crate::document::{parse_document, Entry, Node};
use crate::grammar::{Grammar, GrammarDefinition};
use crate::machine::{TmAction, TmDefinition, TuringMachine};
use crate::nfa::{Nfa, NfaDefinition};
use crate::regex::{PatternLine, Regex, RegexDefinition};
use crate::types::{AutomatonError, Direction, Location, ParseError, EPSILON, MAX_PROGRAM_SIZE};

/// Derives a `PestParser` for the source grammar defined in `syntax.pest`.
#[derive(PestParser)]
#[grammar = "syntax.pest"]
pub struct AutomatonParser;

/// Parses `input` as a source document of the given formalism.
///
/// # Arguments
///
/// * `formalism` - Which kind of automaton the document describes.
/// * `input` - The document text.
/// * `config` - Engine settings; `require_total_delta`, `max_tree_depth` and
///   `max_chart_cells` apply here.
///
/// # Returns
///
/// * `Ok(Automaton)` if the document is well formed.
/// * `Err(AutomatonError::Parse)` describing the first problem found otherwise.
pub fn parse(
    formalism: Formalism,
    input: &str,
    config: &EngineConfig,
) -> Result<Automaton, AutomatonError> {
    let automaton = match formalism {
        Formalism::Dfa => Automaton::Dfa(parse_dfa(input, config)?),
        Formalism::Nfa => Automaton::Nfa(parse_nfa(input)?),
        Formalism::Regex => Automaton::Regex(parse_regex(input)?),
        Formalism::Cfg => Automaton::Cfg(parse_cfg(input, config)?),
        Formalism::Tm => Automaton::Tm(parse_tm(input)?),
    };

    debug!(%formalism, "parsed automaton");
    Ok(automaton)
}

/// Key paths seen while reading a document, with where each one starts.
#[derive(Debug, Default)]
struct Locations {
    fields: HashMap<String, Location>,
}

impl Locations {
    fn note(&mut self, field: impl Into<String>, location: Location) {
        self.fields.entry(field.into()).or_insert(location);
    }

    /// Fills in the location of an engine error from its key path, falling back to the
    /// closest enclosing path that was seen.
    fn locate(&self, mut error: ParseError) -> ParseError {
        if error.location.is_some() {
            return error;
        }
        let mut field = error.field.as_deref();
        while let Some(path) = field {
            if let Some(location) = self.fields.get(path) {
                error.location = Some(*location);
                break;
            }
            field = path.rsplit_once('.').map(|(parent, _)| parent);
        }
        error
    }
}

/// Top-level keys shared by DFA and NFA documents.
const FINITE_AUTOMATON_KEYS: [&str; 5] = [
    "states",
    "input_alphabet",
    "start_state",
    "accept_states",
    "delta",
];

const TURING_MACHINE_KEYS: [&str; 7] = [
    "states",
    "input_alphabet",
    "tape_alphabet_extra",
    "start_state",
    "accept_state",
    "reject_state",
    "delta",
];

/// The top-level keys of a document, checked against the keys a formalism allows.
struct Fields<'a> {
    root: &'a Node,
    entries: HashMap<&'static str, &'a Entry>,
}

impl<'a> Fields<'a> {
    /// Indexes the top-level mapping. `aliases` maps alternative spellings to allowed keys.
    fn new(
        root: &'a Node,
        allowed: &[&'static str],
        aliases: &[(&str, &str)],
        locations: &mut Locations,
    ) -> Result<Self, ParseError> {
        let mut entries = HashMap::new();
        for entry in root.as_mapping("document")? {
            let name = aliases
                .iter()
                .find(|(alias, _)| *alias == entry.key)
                .map_or(entry.key.as_str(), |(_, key)| *key);
            let Some(&key) = allowed.iter().find(|key| **key == name) else {
                return Err(ParseError::at(&entry.key, format!("unknown key '{}'", entry.key))
                    .with_location(entry.location.line, entry.location.column));
            };
            if entries.insert(key, entry).is_some() {
                return Err(ParseError::at(key, format!("'{key}' is given more than once"))
                    .with_location(entry.location.line, entry.location.column));
            }
            locations.note(key, entry.location);
        }
        Ok(Self { root, entries })
    }

    fn optional(&self, key: &str) -> Option<&'a Node> {
        self.entries.get(key).map(|entry| &entry.value)
    }

    fn required(&self, key: &str) -> Result<&'a Node, ParseError> {
        self.optional(key).ok_or_else(|| {
            self.root
                .error(key, format!("missing required key '{key}'"))
        })
    }

    fn scalar(&self, key: &str) -> Result<String, ParseError> {
        Ok(self.required(key)?.as_scalar(key)?.to_string())
    }

    fn names(&self, key: &str) -> Result<Vec<String>, ParseError> {
        names(self.required(key)?, key)
    }

    fn symbols(&self, key: &str) -> Result<Vec<char>, ParseError> {
        match self.optional(key) {
            Some(node) => symbols(node, key),
            None => Err(self.root.error(key, format!("missing required key '{key}'"))),
        }
    }
}

fn names(node: &Node, field: &str) -> Result<Vec<String>, ParseError> {
    node.as_list(field)?
        .into_iter()
        .map(|item| item.as_scalar(field).map(str::to_string))
        .collect()
}

fn symbols(node: &Node, field: &str) -> Result<Vec<char>, ParseError> {
    node.as_list(field)?
        .into_iter()
        .map(|item| {
            let text = item.as_scalar(field)?;
            parse_symbol(text, field).map_err(|e| item.error(field, e.message))
        })
        .collect()
}

/// Walks a `delta` mapping of `state -> symbol -> value`, calling `visit` with the state,
/// the symbol entry, and its key path. An empty symbol key appears as `ε` in the path.
fn walk_delta<'a>(
    delta: Option<&'a Node>,
    locations: &mut Locations,
    mut visit: impl FnMut(&str, &'a Entry, String) -> Result<(), ParseError>,
) -> Result<(), ParseError> {
    let Some(delta) = delta else {
        return Ok(());
    };
    for state in delta.as_mapping("delta")? {
        let state_field = format!("delta.{}", state.key);
        locations.note(&state_field, state.location);
        if state.value.is_null() {
            continue;
        }
        for symbol in state.value.as_mapping(&state_field)? {
            let key = if symbol.key.is_empty() {
                EPSILON
            } else {
                symbol.key.as_str()
            };
            let field = format!("{state_field}.{key}");
            locations.note(&field, symbol.location);
            visit(&state.key, symbol, field)?;
        }
    }
    Ok(())
}

fn symbol_at(entry: &Entry, field: &str) -> Result<char, ParseError> {
    parse_symbol(&entry.key, field)
        .map_err(|e| e.with_location(entry.location.line, entry.location.column))
}

/// Parses a DFA document.
pub fn parse_dfa(input: &str, config: &EngineConfig) -> Result<Dfa, ParseError> {
    let root = parse_document(input)?;
    let mut locations = Locations::default();
    let fields = Fields::new(
        &root,
        &FINITE_AUTOMATON_KEYS,
        &[("accept_state", "accept_states")],
        &mut locations,
    )?;

    let mut delta = Vec::new();
    walk_delta(fields.optional("delta"), &mut locations, |state, entry, field| {
        let symbol = symbol_at(entry, &field)?;
        let target = entry.value.as_scalar(&field)?;
        delta.push((state.to_string(), symbol, target.to_string()));
        Ok(())
    })?;

    DfaDefinition {
        states: fields.names("states")?,
        input_alphabet: fields.symbols("input_alphabet")?,
        start_state: fields.scalar("start_state")?,
        accept_states: optional_names(&fields, "accept_states")?,
        delta,
    }
    .build(config.require_total_delta)
    .map_err(|e| locations.locate(e))
}

fn optional_names(fields: &Fields, key: &str) -> Result<Vec<String>, ParseError> {
    match fields.optional(key) {
        Some(node) => names(node, key),
        None => Ok(Vec::new()),
    }
}

/// Parses an NFA document. ε-moves use the key `''` (or `ε`).
pub fn parse_nfa(input: &str) -> Result<Nfa, ParseError> {
    let root = parse_document(input)?;
    let mut locations = Locations::default();
    let fields = Fields::new(
        &root,
        &FINITE_AUTOMATON_KEYS,
        &[("accept_state", "accept_states")],
        &mut locations,
    )?;

    let mut delta = Vec::new();
    walk_delta(fields.optional("delta"), &mut locations, |state, entry, field| {
        let symbol = if entry.key.is_empty() || entry.key == EPSILON {
            None
        } else {
            Some(symbol_at(entry, &field)?)
        };
        let targets = names(&entry.value, &field)?;
        delta.push((state.to_string(), symbol, targets));
        Ok(())
    })?;

    NfaDefinition {
        states: fields.names("states")?,
        input_alphabet: fields.symbols("input_alphabet")?,
        start_state: fields.scalar("start_state")?,
        accept_states: optional_names(&fields, "accept_states")?,
        delta,
    }
    .build()
    .map_err(|e| locations.locate(e))
}

/// Parses a Turing Machine document.
pub fn parse_tm(input: &str) -> Result<TuringMachine, ParseError> {
    let root = parse_document(input)?;
    let mut locations = Locations::default();
    let fields = Fields::new(&root, &TURING_MACHINE_KEYS, &[], &mut locations)?;

    let mut delta = Vec::new();
    walk_delta(fields.optional("delta"), &mut locations, |state, entry, field| {
        let read = symbol_at(entry, &field)?;
        delta.push((state.to_string(), read, tm_action(&entry.value, &field)?));
        Ok(())
    })?;

    TmDefinition {
        states: fields.names("states")?,
        input_alphabet: fields.symbols("input_alphabet")?,
        tape_alphabet_extra: match fields.optional("tape_alphabet_extra") {
            Some(node) => symbols(node, "tape_alphabet_extra")?,
            None => Vec::new(),
        },
        start_state: fields.scalar("start_state")?,
        accept_state: fields.scalar("accept_state")?,
        reject_state: fields.scalar("reject_state")?,
        delta,
    }
    .build()
    .map_err(|e| locations.locate(e))
}

/// Reads `[next_state, write, direction]`.
fn tm_action(node: &Node, field: &str) -> Result<TmAction, ParseError> {
    let items = node.as_list(field)?;
    let [next_state, write, direction] = items.as_slice() else {
        return Err(node.error(
            field,
            format!(
                "expected [next_state, write, direction], found {} item(s)",
                items.len()
            ),
        ));
    };

    let write_text = write.as_scalar(field)?;
    let write_symbol = parse_symbol(write_text, field).map_err(|e| write.error(field, e.message))?;
    let direction = match direction.as_scalar(field)? {
        "L" => Direction::Left,
        "R" => Direction::Right,
        "S" => Direction::Stay,
        other => {
            return Err(direction.error(
                field,
                format!("invalid direction '{other}', expected L, R or S"),
            ))
        }
    };

    Ok(TmAction {
        next_state: next_state.as_scalar(field)?.to_string(),
        write: write_symbol,
        direction,
    })
}

/// Parses a context-free grammar document: each key is a nonterminal mapped to one or more
/// right-hand sides, and the first key is the start symbol.
pub fn parse_cfg(input: &str, config: &EngineConfig) -> Result<Grammar, ParseError> {
    let root = parse_document(input)?;
    let mut locations = Locations::default();

    let mut rules = Vec::new();
    for entry in root.as_mapping("document")? {
        locations.note(&entry.key, entry.location);
        rules.push((entry.key.clone(), names(&entry.value, &entry.key)?));
    }

    let grammar = GrammarDefinition { rules }
        .build()
        .map_err(|e| match e.field {
            Some(_) => locations.locate(e),
            None => e.with_location(root.location.line, root.location.column),
        })?;

    Ok(grammar
        .with_max_tree_depth(config.max_tree_depth)
        .with_max_chart_cells(config.max_chart_cells))
}

/// Parses a regex document: `name = pattern` bindings, then exactly one pattern line.
pub fn parse_regex(input: &str) -> Result<Regex, ParseError> {
    if input.len() > MAX_PROGRAM_SIZE {
        return Err(ParseError::new(format!(
            "document is larger than {MAX_PROGRAM_SIZE} bytes"
        )));
    }

    let root = AutomatonParser::parse(Rule::regex_document, input)
        .map_err(ParseError::from)?
        .next()
        .ok_or_else(|| ParseError::new("empty parse result"))?;

    let mut bindings = Vec::new();
    let mut pattern: Option<PatternLine> = None;

    for pair in root.into_inner() {
        let (line, column) = pair.as_span().start_pos().line_col();
        match pair.as_rule() {
            Rule::binding => {
                if pattern.is_some() {
                    return Err(ParseError::new("bindings must come before the final pattern")
                        .with_location(line, column));
                }
                let mut inner = pair.into_inner();
                let name = inner
                    .next()
                    .map(|p| p.as_str().to_string())
                    .unwrap_or_default();
                let text = match inner.next() {
                    Some(p) => {
                        let (line, column) = p.as_span().start_pos().line_col();
                        PatternLine {
                            text: p.as_str().to_string(),
                            location: Some(Location { line, column }),
                        }
                    }
                    None => PatternLine::new(""),
                };
                bindings.push((name, text));
            }
            Rule::pattern => {
                if pattern.is_some() {
                    return Err(ParseError::at(
                        "pattern",
                        "a regex document has exactly one pattern line",
                    )
                    .with_location(line, column));
                }
                pattern = Some(PatternLine {
                    text: pair.as_str().to_string(),
                    location: Some(Location { line, column }),
                });
            }
            _ => {}
        }
    }

    let pattern = pattern.ok_or_else(|| {
        ParseError::at("pattern", "missing final pattern").with_location(1, 1)
    })?;

    RegexDefinition { bindings, pattern }.build()
}
