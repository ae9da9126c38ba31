//! Regular expressions over single-character symbols with named sub-expressions.
//!
//! A regex document is an ordered list of `name = pattern` bindings followed by the pattern
//! to match. Bindings are resolved in order into one shared AST, which is compiled to an
//! [`Nfa`] by Thompson construction.

pub mod ast;
pub(crate) mod compiler;
pub(crate) mod parser;


use std::collections::{HashMap, HashSet};
use std::rc::Rc;
use tracing::debug;

use crate::nfa::{Nfa, NfaTrace};
use crate::types::{Location, ParseError};
use ast::Expr;
use compiler::Compiler;
use parser::{tokenize, Parser, PatternError, TokenKind};

/// One line of a regex document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PatternLine {
    pub text: String,
    /// Position of the first character of `text`, when it came from a document.
    pub location: Option<Location>,
}

impl PatternLine {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            location: None,
        }
    }

    fn error(&self, field: &str, error: PatternError) -> ParseError {
        let parse_error = ParseError::at(field, error.message);
        match self.location {
            Some(Location { line, column }) => {
                parse_error.with_location(line, column + error.offset)
            }
            None => parse_error,
        }
    }
}

/// The plain description of a regex document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegexDefinition {
    pub bindings: Vec<(String, PatternLine)>,
    pub pattern: PatternLine,
}

impl RegexDefinition {
    /// Resolves every binding and compiles the final pattern.
    pub fn build(self) -> Result<Regex, ParseError> {
        let names: Vec<&str> = self.bindings.iter().map(|(name, _)| name.as_str()).collect();

        let mut seen = HashSet::new();
        for (name, line) in &self.bindings {
            if !seen.insert(name.as_str()) {
                return Err(line.error(
                    name,
                    PatternError {
                        message: format!("duplicate binding '{name}'"),
                        offset: 0,
                    },
                ));
            }
        }

        let mut tokens = Vec::with_capacity(self.bindings.len());
        for (name, line) in &self.bindings {
            tokens.push(tokenize(&line.text, &names).map_err(|e| line.error(name, e))?);
        }
        let references: Vec<HashSet<usize>> = tokens
            .iter()
            .map(|tokens| {
                tokens
                    .iter()
                    .filter_map(|token| match &token.kind {
                        TokenKind::Name(name) => names.iter().position(|n| n == name),
                        _ => None,
                    })
                    .collect()
            })
            .collect();

        let mut scope: HashMap<String, Rc<Expr>> = HashMap::new();
        let mut bindings = Vec::with_capacity(self.bindings.len());
        for (index, ((name, line), tokens)) in self.bindings.iter().zip(tokens).enumerate() {
            for token in &tokens {
                let TokenKind::Name(reference) = &token.kind else {
                    continue;
                };
                let Some(target) = names.iter().position(|n| n == reference) else {
                    continue;
                };
                if target >= index && reaches(&references, target, index) {
                    return Err(line.error(
                        name,
                        PatternError {
                            message: format!("circular subexpression '{reference}'"),
                            offset: token.offset,
                        },
                    ));
                }
            }

            let end = line.text.chars().count();
            let expr = Parser::new(tokens, &scope, end)
                .parse()
                .map_err(|e| line.error(name, e))?;
            let expr = Rc::new(expr);
            scope.insert(name.clone(), Rc::clone(&expr));
            bindings.push((name.clone(), expr));
        }

        let pattern = &self.pattern;
        let tokens = tokenize(&pattern.text, &names).map_err(|e| pattern.error("pattern", e))?;
        let expr = Parser::new(tokens, &scope, pattern.text.chars().count())
            .parse()
            .map_err(|e| pattern.error("pattern", e))?;

        Ok(Regex::from_parts(bindings, expr))
    }
}

/// Whether binding `to` can be reached from binding `from` through references.
fn reaches(references: &[HashSet<usize>], from: usize, to: usize) -> bool {
    let mut stack = vec![from];
    let mut visited = HashSet::new();

    while let Some(current) = stack.pop() {
        if current == to && current != from {
            return true;
        }
        if !visited.insert(current) {
            continue;
        }
        for &next in &references[current] {
            if next == to {
                return true;
            }
            stack.push(next);
        }
    }

    false
}

/// A compiled regular expression.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Regex {
    bindings: Vec<(String, Rc<Expr>)>,
    expr: Expr,
    nfa: Nfa,
}

impl Regex {
    pub fn from_parts(bindings: Vec<(String, Rc<Expr>)>, expr: Expr) -> Self {
        let nfa = Compiler::compile(&expr);
        debug!(
            bindings = bindings.len(),
            nfa_states = nfa.states().len(),
            "compiled regex"
        );
        Self {
            bindings,
            expr,
            nfa,
        }
    }

    /// Compiles a single pattern without bindings.
    pub fn new(pattern: &str) -> Result<Self, ParseError> {
        RegexDefinition {
            bindings: Vec::new(),
            pattern: PatternLine::new(pattern),
        }
        .build()
    }

    pub fn expr(&self) -> &Expr {
        &self.expr
    }

    pub fn bindings(&self) -> &[(String, Rc<Expr>)] {
        &self.bindings
    }

    /// The NFA the pattern compiled to.
    pub fn nfa(&self) -> &Nfa {
        &self.nfa
    }

    /// Decides whether the pattern matches the whole input. Symbols that never occur in the
    /// pattern make the input rejected.
    pub fn accepts(&self, input: &str) -> bool {
        let symbols: Vec<char> = input.chars().collect();
        self.nfa.accepts_symbols(&symbols)
    }

    /// The state sets of the compiled NFA while reading `input`.
    pub fn trace(&self, input: &str) -> NfaTrace {
        self.nfa.trace_symbols(input.chars().collect())
    }
}
