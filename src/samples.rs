//! This module embeds a small library of sample automata, one per formalism, so front ends
//! can offer something to run without touching the filesystem.

use crate::automaton::{Automaton, Formalism};
use crate::config::EngineConfig;
use crate::parser::parse;
use crate::types::AutomatonError;

/// An embedded sample source.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Sample {
    pub name: &'static str,
    pub formalism: Formalism,
    pub source: &'static str,
}

impl Sample {
    /// Parses the embedded source.
    pub fn load(&self, config: &EngineConfig) -> Result<Automaton, AutomatonError> {
        parse(self.formalism, self.source, config)
    }
}

pub const SAMPLES: [Sample; 5] = [
    Sample {
        name: "no-triple-zero",
        formalism: Formalism::Dfa,
        source: include_str!("../samples/no-triple-zero.dfa"),
    },
    Sample {
        name: "third-to-last-zero",
        formalism: Formalism::Nfa,
        source: include_str!("../samples/third-to-last-zero.nfa"),
    },
    Sample {
        name: "contains-010",
        formalism: Formalism::Regex,
        source: include_str!("../samples/contains-010.regex"),
    },
    Sample {
        name: "balanced-parens",
        formalism: Formalism::Cfg,
        source: include_str!("../samples/balanced-parens.cfg"),
    },
    Sample {
        name: "palindrome",
        formalism: Formalism::Tm,
        source: include_str!("../samples/palindrome.tm"),
    },
];

/// Finds a sample by name.
pub fn sample(name: &str) -> Option<&'static Sample> {
    SAMPLES.iter().find(|sample| sample.name == name)
}

/// Lists the names of all embedded samples.
pub fn sample_names() -> Vec<&'static str> {
    SAMPLES.iter().map(|sample| sample.name).collect()
}
