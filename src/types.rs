//! This module defines the shared constants, the head `Direction`, and the error types used
//! by every engine and parser in the crate.

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

use crate::automaton::Formalism;
use crate::Rule;

/// The blank symbol used on Turing Machine tapes.
pub const BLANK_SYMBOL: char = '_';
/// The marker displayed for epsilon moves and epsilon leaves of parse trees.
pub const EPSILON: &str = "ε";
/// The maximum allowed size for a source document in bytes.
pub const MAX_PROGRAM_SIZE: usize = 65536; // 64KB
/// The default number of Turing Machine steps executed before giving up.
pub const MAX_EXECUTION_STEPS: usize = 10000;
/// The default depth ceiling for parse tree construction.
pub const MAX_TREE_DEPTH: usize = 10000;
/// The default number of cells a grammar's span chart may allocate for one input.
pub const MAX_CHART_CELLS: usize = 1 << 22;

/// Represents the possible directions a Turing Machine head can move.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Direction {
    /// Move the head one position to the left.
    Left,
    /// Move the head one position to the right.
    Right,
    /// Keep the head in the same position.
    Stay,
}

impl Direction {
    /// Returns the change in head position caused by this direction.
    pub fn offset(self) -> i64 {
        match self {
            Direction::Left => -1,
            Direction::Right => 1,
            Direction::Stay => 0,
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let c = match self {
            Direction::Left => 'L',
            Direction::Right => 'R',
            Direction::Stay => 'S',
        };
        write!(f, "{c}")
    }
}

/// A 1-based line and column inside a source document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Location {
    pub line: usize,
    pub column: usize,
}

/// A malformed source document.
///
/// `field` is the dotted key path of the offending entry (for example `delta.q0.1`) and
/// `location` points at it in the source text when it is known.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Error)]
#[error("{}{}{message}", location_prefix(.location), field_prefix(.field))]
pub struct ParseError {
    pub message: String,
    pub field: Option<String>,
    pub location: Option<Location>,
}

impl ParseError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            field: None,
            location: None,
        }
    }

    /// Creates an error attached to a key path.
    pub fn at(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            field: Some(field.into()),
            location: None,
        }
    }

    pub fn with_location(mut self, line: usize, column: usize) -> Self {
        self.location = Some(Location { line, column });
        self
    }
}

fn location_prefix(location: &Option<Location>) -> String {
    location.map_or_else(String::new, |Location { line, column }| {
        format!("line {line}, column {column}: ")
    })
}

fn field_prefix(field: &Option<String>) -> String {
    field
        .as_ref()
        .map_or_else(String::new, |field| format!("`{field}`: "))
}

impl From<pest::error::Error<Rule>> for ParseError {
    fn from(error: pest::error::Error<Rule>) -> Self {
        let (line, column) = match error.line_col {
            pest::error::LineColLocation::Pos(pos) => pos,
            pest::error::LineColLocation::Span(start, _) => start,
        };
        let message = match &error.variant {
            pest::error::ErrorVariant::CustomError { message } => message.clone(),
            pest::error::ErrorVariant::ParsingError { .. } => {
                format!("syntax error: {}", error.variant.message())
            }
        };

        ParseError::new(message).with_location(line, column)
    }
}

/// A computation was asked for something outside the automaton's domain.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DomainError {
    /// An input symbol is not part of the declared alphabet.
    #[error("symbol '{symbol}' at position {position} is not in the input alphabet")]
    UnknownSymbol { symbol: char, position: usize },
    /// The operation does not exist for this kind of automaton.
    #[error("{operation} is not supported for {formalism}")]
    Unsupported {
        operation: &'static str,
        formalism: Formalism,
    },
    /// The input is too long for the grammar's span chart under the configured limit.
    #[error("input of length {length} needs {cells} chart cells, above the limit of {limit}")]
    ChartTooLarge {
        length: usize,
        cells: usize,
        limit: usize,
    },
}

/// Represents the errors that can occur while parsing or executing an automaton.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum AutomatonError {
    /// The source document is malformed.
    #[error("Parse error: {0}")]
    Parse(#[from] ParseError),
    /// The request does not fit the automaton (unknown symbol, unsupported operation).
    #[error("Domain error: {0}")]
    Domain(#[from] DomainError),
    /// An internal consistency check failed; the computation was aborted.
    #[error("Internal invariant violated: {0}")]
    InvariantViolation(String),
    /// Indicates an error related to reading source files.
    #[error("File error: {0}")]
    FileError(String),
}
