//! This module provides static checks that detect likely mistakes in a parsed automaton
//! without running it: unreachable states, gaps in a DFA's transition table, unused symbols,
//! Turing Machine states that can only fall into the reject state, and useless grammar
//! nonterminals.
//!
//! Findings are warnings. Every automaton that parses can still be run.

use std::collections::{HashSet, VecDeque};
use std::fmt;

use crate::automaton::Automaton;
use crate::dfa::Dfa;
use crate::grammar::Grammar;
use crate::machine::TuringMachine;
use crate::nfa::Nfa;
use crate::types::BLANK_SYMBOL;

/// A non-fatal issue found by [`analyze`].
#[derive(Debug, PartialEq, Eq, Clone)]
pub enum Finding {
    /// States that no input can lead to.
    UnreachableStates(Vec<String>),
    /// DFA `(state, symbol)` pairs without a transition; such inputs are rejected.
    MissingTransitions(Vec<(String, char)>),
    /// Declared symbols that no transition reads or writes.
    UnusedSymbols(Vec<char>),
    /// Non-halting Turing Machine states without a single outgoing transition.
    StuckStates(Vec<String>),
    /// Nonterminals that never appear in a derivation from the start symbol.
    UnreachableNonterminals(Vec<String>),
    /// Nonterminals that derive no terminal string.
    UnproductiveNonterminals(Vec<String>),
}

impl fmt::Display for Finding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Finding::UnreachableStates(states) => {
                write!(f, "unreachable states: {}", states.join(", "))
            }
            Finding::MissingTransitions(pairs) => {
                let pairs: Vec<String> = pairs
                    .iter()
                    .map(|(state, symbol)| format!("({state}, {symbol})"))
                    .collect();
                write!(f, "missing transitions: {}", pairs.join(", "))
            }
            Finding::UnusedSymbols(symbols) => {
                let symbols: Vec<String> = symbols.iter().map(char::to_string).collect();
                write!(f, "symbols never used by a transition: {}", symbols.join(", "))
            }
            Finding::StuckStates(states) => write!(
                f,
                "states without outgoing transitions: {}",
                states.join(", ")
            ),
            Finding::UnreachableNonterminals(names) => {
                write!(f, "unreachable nonterminals: {}", names.join(", "))
            }
            Finding::UnproductiveNonterminals(names) => {
                write!(f, "nonterminals that derive no string: {}", names.join(", "))
            }
        }
    }
}

/// Analyzes an automaton and returns its findings in a fixed order.
///
/// # Arguments
///
/// * `automaton` - The automaton to inspect.
///
/// # Returns
///
/// * One `Finding` per failed check; an empty vector when nothing looks suspicious.
pub fn analyze(automaton: &Automaton) -> Vec<Finding> {
    match automaton {
        Automaton::Dfa(dfa) => run_checks(
            dfa,
            &[
                check_dfa_unreachable_states,
                check_dfa_missing_transitions,
                check_dfa_unused_symbols,
            ],
        ),
        Automaton::Nfa(nfa) => run_checks(
            nfa,
            &[check_nfa_unreachable_states, check_nfa_unused_symbols],
        ),
        Automaton::Regex(_) => Vec::new(),
        Automaton::Cfg(grammar) => run_checks(
            grammar,
            &[check_unreachable_nonterminals, check_unproductive_nonterminals],
        ),
        Automaton::Tm(tm) => run_checks(
            tm,
            &[
                check_tm_unreachable_states,
                check_tm_stuck_states,
                check_tm_unused_symbols,
            ],
        ),
    }
}

fn run_checks<T>(subject: &T, checks: &[fn(&T) -> Option<Finding>]) -> Vec<Finding> {
    checks.iter().filter_map(|check| check(subject)).collect()
}

fn non_empty<T>(items: Vec<T>, finding: fn(Vec<T>) -> Finding) -> Option<Finding> {
    (!items.is_empty()).then(|| finding(items))
}

fn unreachable(all: &[String], reachable: &[&str]) -> Vec<String> {
    all.iter()
        .filter(|state| !reachable.contains(&state.as_str()))
        .cloned()
        .collect()
}

fn check_dfa_unreachable_states(dfa: &Dfa) -> Option<Finding> {
    let reachable = dfa.reachable_states();
    non_empty(
        unreachable(dfa.states(), &reachable),
        Finding::UnreachableStates,
    )
}

fn check_dfa_missing_transitions(dfa: &Dfa) -> Option<Finding> {
    non_empty(dfa.missing_transitions(), Finding::MissingTransitions)
}

fn check_dfa_unused_symbols(dfa: &Dfa) -> Option<Finding> {
    let used: HashSet<char> = dfa.transitions().iter().map(|&(_, symbol, _)| symbol).collect();
    let unused = dfa
        .input_alphabet()
        .iter()
        .filter(|symbol| !used.contains(symbol))
        .collect();
    non_empty(unused, Finding::UnusedSymbols)
}

fn check_nfa_unreachable_states(nfa: &Nfa) -> Option<Finding> {
    let reachable = nfa.reachable_states();
    non_empty(
        unreachable(nfa.states(), &reachable),
        Finding::UnreachableStates,
    )
}

fn check_nfa_unused_symbols(nfa: &Nfa) -> Option<Finding> {
    let used: HashSet<char> = nfa
        .transitions()
        .iter()
        .filter_map(|&(_, symbol, _)| symbol)
        .collect();
    let unused = nfa
        .input_alphabet()
        .iter()
        .filter(|symbol| !used.contains(symbol))
        .collect();
    non_empty(unused, Finding::UnusedSymbols)
}

fn check_unreachable_nonterminals(grammar: &Grammar) -> Option<Finding> {
    let names = grammar
        .unreachable_nonterminals()
        .into_iter()
        .map(String::from)
        .collect();
    non_empty(names, Finding::UnreachableNonterminals)
}

fn check_unproductive_nonterminals(grammar: &Grammar) -> Option<Finding> {
    let names = grammar
        .unproductive_nonterminals()
        .into_iter()
        .map(String::from)
        .collect();
    non_empty(names, Finding::UnproductiveNonterminals)
}

/// Reachable states of a Turing Machine. The reject state counts as reachable, since any
/// missing transition leads there.
fn check_tm_unreachable_states(tm: &TuringMachine) -> Option<Finding> {
    let transitions = tm.transitions();
    let mut reached: Vec<&str> = vec![tm.start_state(), tm.reject_state()];
    let mut queue = VecDeque::from([tm.start_state()]);

    while let Some(state) = queue.pop_front() {
        for (_, _, action) in transitions.iter().filter(|(from, _, _)| *from == state) {
            let next = tm
                .states()
                .iter()
                .find(|name| **name == action.next_state)
                .map(String::as_str);
            if let Some(next) = next {
                if !reached.contains(&next) {
                    reached.push(next);
                    queue.push_back(next);
                }
            }
        }
    }

    non_empty(
        unreachable(tm.states(), &reached),
        Finding::UnreachableStates,
    )
}

fn check_tm_stuck_states(tm: &TuringMachine) -> Option<Finding> {
    let transitions = tm.transitions();
    let stuck = tm
        .states()
        .iter()
        .filter(|state| !tm.is_halting(state))
        .filter(|state| !transitions.iter().any(|(from, _, _)| *from == state.as_str()))
        .cloned()
        .collect();
    non_empty(stuck, Finding::StuckStates)
}

fn check_tm_unused_symbols(tm: &TuringMachine) -> Option<Finding> {
    let mut used = HashSet::new();
    for (_, read, action) in tm.transitions() {
        used.insert(read);
        used.insert(action.write);
    }
    let unused = tm
        .tape_alphabet()
        .iter()
        .filter(|&symbol| symbol != BLANK_SYMBOL && !used.contains(&symbol))
        .collect();
    non_empty(unused, Finding::UnusedSymbols)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::automaton::Formalism;
    use crate::config::EngineConfig;
    use crate::parser::parse;

    fn analyze_source(formalism: Formalism, source: &str) -> Vec<Finding> {
        analyze(&parse(formalism, source, &EngineConfig::default()).unwrap())
    }

    #[test]
    fn test_clean_dfa() {
        let source = "\
states: [even, odd]
input_alphabet: [a]
start_state: even
accept_states: [even]
delta:
  even: {a: odd}
  odd: {a: even}
";
        assert!(analyze_source(Formalism::Dfa, source).is_empty());
    }

    #[test]
    fn test_dfa_findings() {
        let source = "\
states: [s, t, lost]
input_alphabet: [a, b, c]
start_state: s
accept_states: [t]
delta:
  s: {a: t, b: s}
  t: {a: t, b: s}
  lost: {a: s}
";
        let findings = analyze_source(Formalism::Dfa, source);

        assert_eq!(
            findings,
            vec![
                Finding::UnreachableStates(vec!["lost".into()]),
                Finding::MissingTransitions(vec![
                    ("s".into(), 'c'),
                    ("t".into(), 'c'),
                    ("lost".into(), 'b'),
                    ("lost".into(), 'c'),
                ]),
                Finding::UnusedSymbols(vec!['c']),
            ]
        );
        assert_eq!(findings[0].to_string(), "unreachable states: lost");
        assert_eq!(
            findings[1].to_string(),
            "missing transitions: (s, c), (t, c), (lost, b), (lost, c)"
        );
    }

    #[test]
    fn test_nfa_findings() {
        let source = "\
states: [p, q, r]
input_alphabet: [0, 1]
start_state: p
accept_states: [q]
delta:
  p:
    0: [q]
";
        assert_eq!(
            analyze_source(Formalism::Nfa, source),
            vec![
                Finding::UnreachableStates(vec!["r".into()]),
                Finding::UnusedSymbols(vec!['1']),
            ]
        );
    }

    #[test]
    fn test_tm_findings() {
        let source = "\
states: [start, idle, spare, yes, no]
input_alphabet: [0]
tape_alphabet_extra: [x, y]
start_state: start
accept_state: yes
reject_state: no
delta:
  start:
    0: [idle, x, R]
    _: [yes, _, S]
";
        assert_eq!(
            analyze_source(Formalism::Tm, source),
            vec![
                Finding::UnreachableStates(vec!["spare".into()]),
                Finding::StuckStates(vec!["idle".into(), "spare".into()]),
                Finding::UnusedSymbols(vec!['y']),
            ]
        );
    }

    #[test]
    fn test_grammar_findings() {
        let findings = analyze_source(Formalism::Cfg, "S: [a, B]\nB: bB\nC: c\n");

        assert_eq!(
            findings,
            vec![
                Finding::UnreachableNonterminals(vec!["C".into()]),
                Finding::UnproductiveNonterminals(vec!["B".into()]),
            ]
        );
    }
}
