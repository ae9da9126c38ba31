//! Deterministic finite automata: acceptance, per-step traces, and minimization by partition
//! refinement.

use serde::Serialize;
use std::collections::{HashMap, HashSet, VecDeque};
use tracing::debug;

use crate::alphabet::{fresh_name, Alphabet, StateId, StateTable};
use crate::types::{DomainError, ParseError};

/// The plain description of a DFA, as read from a source document.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DfaDefinition {
    pub states: Vec<String>,
    pub input_alphabet: Vec<char>,
    pub start_state: String,
    pub accept_states: Vec<String>,
    /// `(state, symbol, next_state)` triples.
    pub delta: Vec<(String, char, String)>,
}

impl DfaDefinition {
    /// Validates the definition and builds the automaton.
    ///
    /// With `require_total` set, every (state, symbol) pair must have a transition.
    pub fn build(self, require_total: bool) -> Result<Dfa, ParseError> {
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

        let mut delta = HashMap::new();
        for (state, symbol, next) in &self.delta {
            let field = format!("delta.{state}.{symbol}");
            let from = states.resolve(state, &format!("delta.{state}"))?;
            if !input_alphabet.contains(*symbol) {
                return Err(ParseError::at(
                    field,
                    format!("symbol '{symbol}' is not in the input alphabet"),
                ));
            }
            let to = states.resolve(next, &field)?;
            if delta.insert((from, *symbol), to).is_some() {
                return Err(ParseError::at(field, "duplicate transition"));
            }
        }

        let dfa = Dfa {
            states,
            input_alphabet,
            start,
            accepting,
            delta,
        };

        if require_total {
            if let Some((state, symbol)) = dfa.missing_transitions().into_iter().next() {
                return Err(ParseError::at(
                    format!("delta.{state}"),
                    format!("missing transition on '{symbol}'"),
                ));
            }
        }

        Ok(dfa)
    }
}

/// A deterministic finite automaton with a total or partial transition function.
///
/// A missing transition sends the machine to an implicit dead state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Dfa {
    states: StateTable,
    input_alphabet: Alphabet,
    start: StateId,
    accepting: Vec<bool>,
    delta: HashMap<(StateId, char), StateId>,
}

/// The states visited while reading an input.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DfaTrace {
    pub input: Vec<char>,
    /// One entry per prefix of the input; `None` is the implicit dead state.
    pub states: Vec<Option<String>>,
    pub accepted: bool,
}

impl Dfa {
    pub(crate) fn from_parts(
        states: StateTable,
        input_alphabet: Alphabet,
        start: StateId,
        accepting: Vec<bool>,
        delta: HashMap<(StateId, char), StateId>,
    ) -> Self {
        Self {
            states,
            input_alphabet,
            start,
            accepting,
            delta,
        }
    }

    /// Returns the state names in declaration order.
    pub fn states(&self) -> &[String] {
        self.states.names()
    }

    /// Returns the input alphabet in declaration order.
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

    /// Whether `state` is declared and accepting.
    pub fn is_accept_state(&self, state: &str) -> bool {
        self.states.id(state).is_some_and(|id| self.accepting[id])
    }

    /// Returns the target of `state` on `symbol`, if one is defined.
    pub fn transition(&self, state: &str, symbol: char) -> Option<&str> {
        let from = self.states.id(state)?;
        self.delta
            .get(&(from, symbol))
            .map(|&to| self.states.name(to))
    }

    /// Lists every transition, ordered by state then alphabet.
    pub fn transitions(&self) -> Vec<(&str, char, &str)> {
        let mut result = Vec::new();
        for from in 0..self.states.len() {
            for symbol in self.input_alphabet.iter() {
                if let Some(&to) = self.delta.get(&(from, symbol)) {
                    result.push((self.states.name(from), symbol, self.states.name(to)));
                }
            }
        }
        result
    }

    /// Lists the (state, symbol) pairs without a transition.
    pub fn missing_transitions(&self) -> Vec<(String, char)> {
        let mut missing = Vec::new();
        for from in 0..self.states.len() {
            for symbol in self.input_alphabet.iter() {
                if !self.delta.contains_key(&(from, symbol)) {
                    missing.push((self.states.name(from).to_string(), symbol));
                }
            }
        }
        missing
    }

    /// Whether every (state, symbol) pair has a transition.
    pub fn is_total(&self) -> bool {
        self.delta.len() == self.states.len() * self.input_alphabet.len()
    }

    fn next(&self, state: Option<StateId>, symbol: char) -> Option<StateId> {
        state.and_then(|from| self.delta.get(&(from, symbol)).copied())
    }

    /// Decides whether the automaton accepts `input`.
    pub fn accepts(&self, input: &str) -> Result<bool, DomainError> {
        let symbols = self.input_alphabet.tokenize(input)?;
        let last = symbols
            .into_iter()
            .try_fold(self.start, |state, symbol| self.next(Some(state), symbol));

        Ok(last.is_some_and(|state| self.accepting[state]))
    }

    /// Records the state after each prefix of `input`, starting with the start state.
    pub fn states_visited(&self, input: &str) -> Result<DfaTrace, DomainError> {
        let symbols = self.input_alphabet.tokenize(input)?;
        let mut current = Some(self.start);
        let mut visited = vec![current];

        for &symbol in &symbols {
            current = self.next(current, symbol);
            visited.push(current);
        }

        Ok(DfaTrace {
            accepted: current.is_some_and(|state| self.accepting[state]),
            states: visited
                .into_iter()
                .map(|state| state.map(|id| self.states.name(id).to_string()))
                .collect(),
            input: symbols,
        })
    }

    /// Returns the states reachable from the start state, in declaration order.
    pub fn reachable_states(&self) -> Vec<&str> {
        self.reachable()
            .into_iter()
            .map(|id| self.states.name(id))
            .collect()
    }

    fn reachable(&self) -> Vec<StateId> {
        let mut seen = vec![false; self.states.len()];
        let mut queue = VecDeque::from([self.start]);
        seen[self.start] = true;

        while let Some(state) = queue.pop_front() {
            for symbol in self.input_alphabet.iter() {
                if let Some(&to) = self.delta.get(&(state, symbol)) {
                    if !seen[to] {
                        seen[to] = true;
                        queue.push_back(to);
                    }
                }
            }
        }

        (0..self.states.len()).filter(|&id| seen[id]).collect()
    }

    /// Builds the minimal DFA for the same language.
    ///
    /// Unreachable states are pruned first. The implicit dead state takes part in the
    /// refinement as an explicit sink; states that end up equivalent to it are dropped, so
    /// a partial automaton stays partial. The only exception is a dead start state, which
    /// is kept as a lone rejecting state.
    pub fn minimize(&self) -> Dfa {
        let reachable = self.reachable();
        let sink = reachable.len();
        let local: HashMap<StateId, usize> = reachable
            .iter()
            .enumerate()
            .map(|(index, &id)| (id, index))
            .collect();
        let symbols: Vec<char> = self.input_alphabet.iter().collect();

        // Successor table over reachable states plus the sink.
        let successors: Vec<Vec<usize>> = reachable
            .iter()
            .map(|&id| {
                symbols
                    .iter()
                    .map(|&symbol| {
                        self.delta
                            .get(&(id, symbol))
                            .and_then(|to| local.get(to).copied())
                            .unwrap_or(sink)
                    })
                    .collect()
            })
            .chain(std::iter::once(vec![sink; symbols.len()]))
            .collect();

        let accepting: Vec<bool> = reachable
            .iter()
            .map(|&id| self.accepting[id])
            .chain(std::iter::once(false))
            .collect();

        let mut classes = renumber(accepting.iter().map(|&a| vec![usize::from(a)]));
        let mut count = class_count(&classes);

        loop {
            let refined = renumber((0..=sink).map(|state| {
                std::iter::once(classes[state])
                    .chain(successors[state].iter().map(|&to| classes[to]))
                    .collect()
            }));
            let refined_count = class_count(&refined);
            classes = refined;
            if refined_count == count {
                break;
            }
            count = refined_count;
        }

        let dead = classes[sink];
        let start_class = classes[local[&self.start]];

        let mut members: Vec<Vec<usize>> = vec![Vec::new(); count];
        for (state, &class) in classes.iter().enumerate().take(sink) {
            members[class].push(state);
        }

        let kept: Vec<usize> = (0..count)
            .filter(|&class| !members[class].is_empty() && (class != dead || class == start_class))
            .collect();

        // Singleton classes keep their declared name; merged names avoid all of those.
        let mut taken: HashSet<String> = kept
            .iter()
            .filter(|&&class| members[class].len() == 1)
            .map(|&class| self.states.name(reachable[members[class][0]]).to_string())
            .collect();

        let mut table = StateTable::default();
        let mut new_id: HashMap<usize, StateId> = HashMap::new();
        for &class in &kept {
            let states = &members[class];
            let name = class_name(states.iter().map(|&s| self.states.name(reachable[s])));
            let name = if states.len() == 1 {
                name
            } else {
                let name = fresh_name(name, |candidate| taken.contains(candidate));
                taken.insert(name.clone());
                name
            };
            new_id.insert(class, table.push(name));
        }

        let mut new_accepting = vec![false; table.len()];
        let mut delta = HashMap::new();
        for (&class, &id) in &new_id {
            let representative = members[class][0];
            new_accepting[id] = members[class].iter().any(|&s| accepting[s]);
            for (index, &symbol) in symbols.iter().enumerate() {
                let target = classes[successors[representative][index]];
                if let Some(&to) = new_id.get(&target) {
                    if target != dead {
                        delta.insert((id, symbol), to);
                    }
                }
            }
        }

        debug!(
            states = self.states.len(),
            reachable = reachable.len(),
            minimal = table.len(),
            "minimized DFA"
        );

        Dfa::from_parts(
            table,
            self.input_alphabet.clone(),
            new_id[&start_class],
            new_accepting,
            delta,
        )
    }

    /// Checks whether both automata accept the same language, by a breadth-first walk of the
    /// product automaton.
    pub fn is_equivalent(&self, other: &Dfa) -> bool {
        let symbols = self.input_alphabet.union(&other.input_alphabet);
        let accepts = |dfa: &Dfa, state: Option<StateId>| state.is_some_and(|s| dfa.accepting[s]);

        let start = (Some(self.start), Some(other.start));
        let mut seen = HashSet::from([start]);
        let mut queue = VecDeque::from([start]);

        while let Some((left, right)) = queue.pop_front() {
            if accepts(self, left) != accepts(other, right) {
                return false;
            }
            for symbol in symbols.iter() {
                let pair = (self.next(left, symbol), other.next(right, symbol));
                if seen.insert(pair) {
                    queue.push_back(pair);
                }
            }
        }

        true
    }
}

/// Maps signatures to dense class ids in order of first appearance.
fn renumber(signatures: impl Iterator<Item = Vec<usize>>) -> Vec<usize> {
    let mut ids: HashMap<Vec<usize>, usize> = HashMap::new();
    signatures
        .map(|signature| {
            let next = ids.len();
            *ids.entry(signature).or_insert(next)
        })
        .collect()
}

fn class_count(classes: &[usize]) -> usize {
    classes.iter().max().map_or(0, |max| max + 1)
}

fn class_name<'a>(mut names: impl Iterator<Item = &'a str>) -> String {
    let first = names.next().unwrap_or_default().to_string();
    let rest: Vec<&str> = names.collect();
    if rest.is_empty() {
        first
    } else {
        format!("{{{},{}}}", first, rest.join(","))
    }
}
