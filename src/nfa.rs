//! Nondeterministic finite automata with ε-moves, simulated by tracking the set of live states.

use serde::Serialize;
use std::collections::{BTreeSet, HashMap, VecDeque};
use tracing::debug;

use crate::alphabet::{symbol_key, Alphabet, StateId, StateTable};
use crate::dfa::Dfa;
use crate::types::{DomainError, ParseError};

type StateSet = BTreeSet<StateId>;

/// The plain description of an NFA, as read from a source document.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NfaDefinition {
    pub states: Vec<String>,
    pub input_alphabet: Vec<char>,
    pub start_state: String,
    pub accept_states: Vec<String>,
    /// `(state, symbol, targets)` entries; a `None` symbol is an ε-move.
    pub delta: Vec<(String, Option<char>, Vec<String>)>,
}

impl NfaDefinition {
    /// Validates the definition and builds the automaton.
    pub fn build(self) -> Result<Nfa, ParseError> {
        if self.states.is_empty() {
            return Err(ParseError::at("states", "at least one state is required"));
        }
        let states = StateTable::new(self.states, "states")?;
        let input_alphabet = Alphabet::new(self.input_alphabet).map_err(|symbol| {
            ParseError::at("input_alphabet", format!("duplicate symbol '{symbol}'"))
        })?;
        let start = states.resolve(&self.start_state, "start_state")?;

        let mut accepting = vec![false; states.len()];
        for name in &self.accept_states {
            accepting[states.resolve(name, "accept_states")?] = true;
        }

        let mut builder = NfaBuilder::with_states(states);
        for (state, symbol, targets) in &self.delta {
            let field = format!("delta.{state}.{}", symbol_key(*symbol));
            let from = builder.states.resolve(state, &format!("delta.{state}"))?;
            if let Some(symbol) = symbol {
                if !input_alphabet.contains(*symbol) {
                    return Err(ParseError::at(
                        field,
                        format!("symbol '{symbol}' is not in the input alphabet"),
                    ));
                }
            }
            for target in targets {
                let to = builder.states.resolve(target, &field)?;
                builder.add_transition(from, *symbol, to);
            }
        }

        Ok(builder.finish(input_alphabet, start, accepting))
    }
}

/// Incremental construction of an NFA from dense state ids.
#[derive(Debug, Default)]
pub(crate) struct NfaBuilder {
    states: StateTable,
    delta: HashMap<(StateId, char), StateSet>,
    epsilon: HashMap<StateId, StateSet>,
}

impl NfaBuilder {
    fn with_states(states: StateTable) -> Self {
        Self {
            states,
            ..Self::default()
        }
    }

    pub(crate) fn add_state(&mut self, name: String) -> StateId {
        self.states.push(name)
    }

    pub(crate) fn add_transition(&mut self, from: StateId, symbol: Option<char>, to: StateId) {
        match symbol {
            Some(symbol) => self.delta.entry((from, symbol)).or_default().insert(to),
            None => self.epsilon.entry(from).or_default().insert(to),
        };
    }

    /// Finishes the automaton; the alphabet is every symbol used by a transition.
    pub(crate) fn build(self, start: StateId, accept: &[StateId]) -> Nfa {
        let mut symbols: Vec<char> = self.delta.keys().map(|&(_, symbol)| symbol).collect();
        symbols.sort_unstable();
        let alphabet = Alphabet::collect(symbols);

        let mut accepting = vec![false; self.states.len()];
        for &state in accept {
            accepting[state] = true;
        }

        self.finish(alphabet, start, accepting)
    }

    fn finish(self, input_alphabet: Alphabet, start: StateId, accepting: Vec<bool>) -> Nfa {
        Nfa {
            states: self.states,
            input_alphabet,
            start,
            accepting,
            delta: self.delta,
            epsilon: self.epsilon,
        }
    }
}

/// A nondeterministic finite automaton over single-character symbols.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Nfa {
    states: StateTable,
    input_alphabet: Alphabet,
    start: StateId,
    accepting: Vec<bool>,
    delta: HashMap<(StateId, char), StateSet>,
    epsilon: HashMap<StateId, StateSet>,
}

/// The live state sets while reading an input.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NfaTrace {
    pub input: Vec<char>,
    /// One set per prefix of the input, each in declaration order. An empty set rejects.
    pub state_sets: Vec<Vec<String>>,
    pub accepted: bool,
}

impl Nfa {
    /// Returns the state names in declaration order.
    pub fn states(&self) -> &[String] {
        self.states.names()
    }

    pub fn input_alphabet(&self) -> &Alphabet {
        &self.input_alphabet
    }

    /// Returns the name of the start state.
    pub fn start_state(&self) -> &str {
        self.states.name(self.start)
    }

    /// Returns the accepting states, in declaration order.
    pub fn accept_states(&self) -> Vec<&str> {
        (0..self.states.len())
            .filter(|&id| self.accepting[id])
            .map(|id| self.states.name(id))
            .collect()
    }

    /// Lists every transition, ordered by state, with ε-moves before symbol moves.
    pub fn transitions(&self) -> Vec<(&str, Option<char>, &str)> {
        let mut result = Vec::new();
        for from in 0..self.states.len() {
            let epsilon = self.epsilon.get(&from).into_iter().flatten();
            for &to in epsilon {
                result.push((self.states.name(from), None, self.states.name(to)));
            }
            for symbol in self.input_alphabet.iter() {
                for &to in self.delta.get(&(from, symbol)).into_iter().flatten() {
                    result.push((self.states.name(from), Some(symbol), self.states.name(to)));
                }
            }
        }
        result
    }

    /// Computes the ε-closure of the named states. Undeclared names are ignored.
    pub fn epsilon_closure(&self, states: &[&str]) -> Vec<&str> {
        let set = states.iter().filter_map(|name| self.states.id(name)).collect();
        self.names(&self.closure(set))
    }

    fn closure(&self, mut set: StateSet) -> StateSet {
        let mut worklist: VecDeque<StateId> = set.iter().copied().collect();

        while let Some(state) = worklist.pop_front() {
            for &next in self.epsilon.get(&state).into_iter().flatten() {
                if set.insert(next) {
                    worklist.push_back(next);
                }
            }
        }

        set
    }

    fn start_set(&self) -> StateSet {
        self.closure(StateSet::from([self.start]))
    }

    fn step(&self, set: &StateSet, symbol: char) -> StateSet {
        let moved = set
            .iter()
            .filter_map(|&state| self.delta.get(&(state, symbol)))
            .flatten()
            .copied()
            .collect();
        self.closure(moved)
    }

    fn is_accepting(&self, set: &StateSet) -> bool {
        set.iter().any(|&state| self.accepting[state])
    }

    fn names(&self, set: &StateSet) -> Vec<&str> {
        set.iter().map(|&id| self.states.name(id)).collect()
    }

    /// Decides whether the automaton accepts `input`.
    pub fn accepts(&self, input: &str) -> Result<bool, DomainError> {
        let symbols = self.input_alphabet.tokenize(input)?;
        Ok(self.accepts_symbols(&symbols))
    }

    /// Runs the subset simulation without checking symbols against the alphabet; an unknown
    /// symbol simply empties the live set.
    pub(crate) fn accepts_symbols(&self, symbols: &[char]) -> bool {
        let mut current = self.start_set();
        for &symbol in symbols {
            if current.is_empty() {
                return false;
            }
            current = self.step(&current, symbol);
        }
        self.is_accepting(&current)
    }

    /// Records the live state set after each prefix of `input`.
    pub fn state_sets_visited(&self, input: &str) -> Result<NfaTrace, DomainError> {
        let symbols = self.input_alphabet.tokenize(input)?;
        Ok(self.trace_symbols(symbols))
    }

    pub(crate) fn trace_symbols(&self, symbols: Vec<char>) -> NfaTrace {
        let mut current = self.start_set();
        let mut sets = vec![current.clone()];

        for &symbol in &symbols {
            current = self.step(&current, symbol);
            sets.push(current.clone());
        }

        NfaTrace {
            accepted: self.is_accepting(&current),
            state_sets: sets
                .iter()
                .map(|set| self.names(set).into_iter().map(String::from).collect())
                .collect(),
            input: symbols,
        }
    }

    /// Returns the states reachable from the start state through any moves.
    pub fn reachable_states(&self) -> Vec<&str> {
        let mut reached = self.start_set();
        let mut worklist: VecDeque<StateId> = reached.iter().copied().collect();

        while let Some(state) = worklist.pop_front() {
            for symbol in self.input_alphabet.iter() {
                for &next in self.step(&StateSet::from([state]), symbol).iter() {
                    if reached.insert(next) {
                        worklist.push_back(next);
                    }
                }
            }
        }

        self.names(&reached)
    }

    /// Converts the automaton into an equivalent DFA by subset construction.
    ///
    /// Each DFA state is named after its set, e.g. `{q0,q2}`. The empty set is left implicit,
    /// so the result may be partial.
    pub fn to_dfa(&self) -> Dfa {
        let start = self.start_set();
        let mut table = StateTable::default();
        let mut ids: HashMap<StateSet, StateId> = HashMap::new();
        let mut accepting = Vec::new();
        let mut delta = HashMap::new();
        let mut queue = VecDeque::new();

        let mut intern = |set: StateSet,
                          table: &mut StateTable,
                          accepting: &mut Vec<bool>,
                          queue: &mut VecDeque<StateSet>| {
            if let Some(&id) = ids.get(&set) {
                return id;
            }
            let id = table.push(format!("{{{}}}", self.names(&set).join(",")));
            accepting.push(self.is_accepting(&set));
            ids.insert(set.clone(), id);
            queue.push_back(set);
            id
        };

        let start_id = intern(start, &mut table, &mut accepting, &mut queue);

        while let Some(set) = queue.pop_front() {
            let from = intern(set.clone(), &mut table, &mut accepting, &mut queue);
            for symbol in self.input_alphabet.iter() {
                let next = self.step(&set, symbol);
                if next.is_empty() {
                    continue;
                }
                let to = intern(next, &mut table, &mut accepting, &mut queue);
                delta.insert((from, symbol), to);
            }
        }

        debug!(
            nfa_states = self.states.len(),
            dfa_states = table.len(),
            "converted NFA to DFA"
        );

        Dfa::from_parts(table, self.input_alphabet.clone(), start_id, accepting, delta)
    }
}
