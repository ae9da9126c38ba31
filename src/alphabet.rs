//! Shared building blocks for every engine: ordered symbol alphabets, the table mapping state
//! names to dense ids, and the helpers that validate inputs against them.

use serde::Serialize;
use std::collections::HashMap;

use crate::types::{DomainError, ParseError};

/// Dense index of a state inside a `StateTable`.
pub type StateId = usize;

/// An ordered set of single-character symbols.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Alphabet {
    symbols: Vec<char>,
}

impl Alphabet {
    /// Builds an alphabet, rejecting duplicated symbols.
    pub fn new(symbols: impl IntoIterator<Item = char>) -> Result<Self, char> {
        let mut alphabet = Self::default();
        for symbol in symbols {
            if alphabet.contains(symbol) {
                return Err(symbol);
            }
            alphabet.symbols.push(symbol);
        }
        Ok(alphabet)
    }

    /// Builds an alphabet from symbols in first-seen order, silently skipping repeats.
    pub fn collect(symbols: impl IntoIterator<Item = char>) -> Self {
        let mut alphabet = Self::default();
        for symbol in symbols {
            if !alphabet.contains(symbol) {
                alphabet.symbols.push(symbol);
            }
        }
        alphabet
    }

    pub fn contains(&self, symbol: char) -> bool {
        self.symbols.contains(&symbol)
    }

    pub fn symbols(&self) -> &[char] {
        &self.symbols
    }

    pub fn iter(&self) -> impl Iterator<Item = char> + '_ {
        self.symbols.iter().copied()
    }

    pub fn len(&self) -> usize {
        self.symbols.len()
    }

    pub fn is_empty(&self) -> bool {
        self.symbols.is_empty()
    }

    /// Returns a new alphabet holding the symbols of `self` followed by the new ones of `other`.
    pub fn union(&self, other: &Alphabet) -> Alphabet {
        Self::collect(self.iter().chain(other.iter()))
    }

    /// Splits `input` into symbols, failing on the first one outside the alphabet.
    pub fn tokenize(&self, input: &str) -> Result<Vec<char>, DomainError> {
        input
            .chars()
            .enumerate()
            .map(|(position, symbol)| {
                if self.contains(symbol) {
                    Ok(symbol)
                } else {
                    Err(DomainError::UnknownSymbol { symbol, position })
                }
            })
            .collect()
    }
}

/// Ordered, unique state names with a reverse index.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StateTable {
    names: Vec<String>,
    index: HashMap<String, StateId>,
}

impl StateTable {
    /// Builds a table from declared names. Empty or repeated names are rejected with an
    /// error attached to `field`.
    pub fn new(names: Vec<String>, field: &str) -> Result<Self, ParseError> {
        let mut table = Self::default();
        for name in names {
            if name.is_empty() {
                return Err(ParseError::at(field, "state names must not be empty"));
            }
            if table.index.contains_key(&name) {
                return Err(ParseError::at(field, format!("duplicate state '{name}'")));
            }
            table.push(name);
        }
        Ok(table)
    }

    /// Appends a generated state. A name that is already taken gets primes appended until
    /// it is free, so names stay unique.
    pub(crate) fn push(&mut self, name: String) -> StateId {
        let name = fresh_name(name, |candidate| self.index.contains_key(candidate));
        let id = self.names.len();
        self.index.insert(name.clone(), id);
        self.names.push(name);
        id
    }

    pub fn id(&self, name: &str) -> Option<StateId> {
        self.index.get(name).copied()
    }

    /// Resolves a referenced state, reporting an undeclared one against `field`.
    pub fn resolve(&self, name: &str, field: &str) -> Result<StateId, ParseError> {
        self.id(name)
            .ok_or_else(|| ParseError::at(field, format!("undeclared state '{name}'")))
    }

    pub fn name(&self, id: StateId) -> &str {
        &self.names[id]
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}

/// Appends `'` to `name` until `taken` no longer holds for it.
pub(crate) fn fresh_name(mut name: String, taken: impl Fn(&str) -> bool) -> String {
    while taken(&name) {
        name.push('\'');
    }
    name
}

/// Parses a declared symbol, which must be exactly one character.
pub fn parse_symbol(text: &str, field: &str) -> Result<char, ParseError> {
    let mut chars = text.chars();
    match (chars.next(), chars.next()) {
        (Some(symbol), None) => Ok(symbol),
        (None, _) => Err(ParseError::at(field, "empty symbol")),
        _ => Err(ParseError::at(
            field,
            format!("symbol '{text}' must be a single character"),
        )),
    }
}

/// Key path segment used for a transition symbol; `None` is the epsilon move.
pub fn symbol_key(symbol: Option<char>) -> String {
    match symbol {
        Some(symbol) => symbol.to_string(),
        None => crate::types::EPSILON.to_string(),
    }
}
