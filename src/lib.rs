//! This crate provides the core logic for an automata simulator.
//! It includes engines for deterministic and nondeterministic finite automata, regular
//! expressions, context-free grammars and Turing Machines, a parser for their shared textual
//! source format, a reversible execution log for stepping Turing Machines back and forth,
//! and a static analyzer that points out likely mistakes in a definition.

pub mod alphabet;
pub mod analyzer;
pub mod automaton;
pub mod config;
pub mod dfa;
pub mod document;
pub mod grammar;
pub mod history;
pub mod loader;
pub mod machine;
pub mod nfa;
pub mod parser;
pub mod regex;
pub mod samples;
pub mod tape;
pub mod types;

/// Re-exports the `Rule` enum from the parser module, used by the `pest` grammar.
pub use crate::parser::Rule;
/// Re-exports the `analyze` function and `Finding` enum from the analyzer module.
pub use analyzer::{analyze, Finding};
pub use automaton::{Automaton, ExecutionData, Formalism};
pub use config::EngineConfig;
pub use dfa::{Dfa, DfaTrace};
pub use grammar::{CfgTrace, Grammar, NodeKind, TreeNode};
pub use history::{ConfigDiff, ExecutionLog, Status, Timeline};
pub use loader::{load_automaton, load_directory};
pub use machine::{Execution, TuringMachine};
pub use nfa::{Nfa, NfaTrace};
/// Re-exports the `parse` function and the per-formalism parsers.
pub use parser::{parse, parse_cfg, parse_dfa, parse_nfa, parse_regex, parse_tm};
pub use regex::Regex;
pub use samples::{sample, Sample, SAMPLES};
pub use tape::{Configuration, Tape};
pub use types::{
    AutomatonError, Direction, DomainError, Location, ParseError, BLANK_SYMBOL, EPSILON,
    MAX_CHART_CELLS, MAX_EXECUTION_STEPS, MAX_PROGRAM_SIZE,
};
