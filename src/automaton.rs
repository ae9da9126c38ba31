//! The formalism-independent face of the engines: one `Automaton` enum with a uniform
//! acceptance and execution API.

use serde::Serialize;
use std::fmt;
use std::path::Path;
use std::str::FromStr;

use crate::config::EngineConfig;
use crate::dfa::{Dfa, DfaTrace};
use crate::grammar::{CfgTrace, Grammar};
use crate::history::ExecutionLog;
use crate::machine::TuringMachine;
use crate::nfa::{Nfa, NfaTrace};
use crate::regex::Regex;
use crate::types::{AutomatonError, DomainError};

/// The kinds of automata this crate can parse and run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Formalism {
    Dfa,
    Nfa,
    Regex,
    Cfg,
    Tm,
}

impl Formalism {
    pub const ALL: [Formalism; 5] = [
        Formalism::Dfa,
        Formalism::Nfa,
        Formalism::Regex,
        Formalism::Cfg,
        Formalism::Tm,
    ];

    /// The file extension used for sources of this formalism.
    pub fn extension(self) -> &'static str {
        match self {
            Formalism::Dfa => "dfa",
            Formalism::Nfa => "nfa",
            Formalism::Regex => "regex",
            Formalism::Cfg => "cfg",
            Formalism::Tm => "tm",
        }
    }

    /// Picks the formalism from a path's extension.
    pub fn from_extension(path: &Path) -> Option<Self> {
        let extension = path.extension()?.to_str()?;
        extension.parse().ok()
    }
}

impl FromStr for Formalism {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "dfa" => Ok(Formalism::Dfa),
            "nfa" => Ok(Formalism::Nfa),
            "regex" | "re" => Ok(Formalism::Regex),
            "cfg" | "grammar" => Ok(Formalism::Cfg),
            "tm" | "turing" => Ok(Formalism::Tm),
            _ => Err(format!("unknown formalism '{s}'")),
        }
    }
}

impl fmt::Display for Formalism {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Formalism::Dfa => "DFA",
            Formalism::Nfa => "NFA",
            Formalism::Regex => "regex",
            Formalism::Cfg => "CFG",
            Formalism::Tm => "Turing Machine",
        };
        write!(f, "{name}")
    }
}

/// A parsed automaton of any formalism.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Automaton {
    Dfa(Dfa),
    Nfa(Nfa),
    Regex(Regex),
    Cfg(Grammar),
    Tm(TuringMachine),
}

/// What one execution produced, tagged by formalism.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "formalism", content = "data")]
pub enum ExecutionData {
    Dfa(DfaTrace),
    Nfa(NfaTrace),
    Regex(NfaTrace),
    Cfg(CfgTrace),
    Tm(ExecutionLog),
}

impl ExecutionData {
    /// Whether the execution ended by accepting its input.
    pub fn accepted(&self) -> bool {
        match self {
            ExecutionData::Dfa(trace) => trace.accepted,
            ExecutionData::Nfa(trace) | ExecutionData::Regex(trace) => trace.accepted,
            ExecutionData::Cfg(trace) => trace.accepted,
            ExecutionData::Tm(log) => log.outcome == crate::history::Status::Accepted,
        }
    }
}

impl Automaton {
    pub fn formalism(&self) -> Formalism {
        match self {
            Automaton::Dfa(_) => Formalism::Dfa,
            Automaton::Nfa(_) => Formalism::Nfa,
            Automaton::Regex(_) => Formalism::Regex,
            Automaton::Cfg(_) => Formalism::Cfg,
            Automaton::Tm(_) => Formalism::Tm,
        }
    }

    /// Decides whether the automaton accepts `input`. A Turing Machine that runs out of steps
    /// does not accept.
    pub fn accepts(&self, input: &str, config: &EngineConfig) -> Result<bool, AutomatonError> {
        match self {
            Automaton::Dfa(dfa) => Ok(dfa.accepts(input)?),
            Automaton::Nfa(nfa) => Ok(nfa.accepts(input)?),
            Automaton::Regex(regex) => Ok(regex.accepts(input)),
            Automaton::Cfg(grammar) => grammar.accepts(input),
            Automaton::Tm(tm) => tm.accepts(input, config),
        }
    }

    /// Runs the automaton on `input` and returns its trace or execution log.
    pub fn execute(
        &self,
        input: &str,
        config: &EngineConfig,
    ) -> Result<ExecutionData, AutomatonError> {
        Ok(match self {
            Automaton::Dfa(dfa) => ExecutionData::Dfa(dfa.states_visited(input)?),
            Automaton::Nfa(nfa) => ExecutionData::Nfa(nfa.state_sets_visited(input)?),
            Automaton::Regex(regex) => ExecutionData::Regex(regex.trace(input)),
            Automaton::Cfg(grammar) => ExecutionData::Cfg(grammar.trace(input)?),
            Automaton::Tm(tm) => ExecutionData::Tm(tm.run(input, config)?),
        })
    }

    /// Returns the minimal DFA. Only DFAs can be minimized.
    pub fn minimize(&self) -> Result<Automaton, DomainError> {
        match self {
            Automaton::Dfa(dfa) => Ok(Automaton::Dfa(dfa.minimize())),
            other => Err(DomainError::Unsupported {
                operation: "minimization",
                formalism: other.formalism(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grammar::GrammarDefinition;

    #[test]
    fn test_formalism_from_extension() {
        assert_eq!(
            Formalism::from_extension(Path::new("samples/contains-010.regex")),
            Some(Formalism::Regex)
        );
        assert_eq!(Formalism::from_extension(Path::new("a.TM")), Some(Formalism::Tm));
        assert_eq!(Formalism::from_extension(Path::new("notes.txt")), None);
        assert!("pda".parse::<Formalism>().is_err());

        for formalism in Formalism::ALL {
            assert_eq!(formalism.extension().parse::<Formalism>(), Ok(formalism));
        }
    }

    #[test]
    fn test_minimize_rejects_other_formalisms() {
        let grammar = GrammarDefinition {
            rules: vec![("S".into(), vec!["a".into()])],
        }
        .build()
        .unwrap();
        let automaton = Automaton::Cfg(grammar);

        assert_eq!(
            automaton.minimize().unwrap_err(),
            DomainError::Unsupported {
                operation: "minimization",
                formalism: Formalism::Cfg
            }
        );
        assert_eq!(
            automaton.minimize().unwrap_err().to_string(),
            "minimization is not supported for CFG"
        );
    }

    #[test]
    fn test_execute_matches_accepts() {
        let regex = Automaton::Regex(Regex::new("a(b|c)*").unwrap());
        let config = EngineConfig::default();

        for input in ["a", "abcb", "b", "ax"] {
            let data = regex.execute(input, &config).unwrap();
            assert_eq!(data.accepted(), regex.accepts(input, &config).unwrap());
        }
    }
}
