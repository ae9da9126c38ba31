//! This module defines the `TuringMachine` struct, a deterministic single-tape Turing
//! Machine, and `Execution`, which runs it one step at a time while recording a reversible
//! diff for every step.

use std::collections::HashMap;
use tracing::{debug, trace};

use crate::alphabet::{Alphabet, StateId, StateTable};
use crate::config::EngineConfig;
use crate::history::{ConfigDiff, ExecutionLog, Status};
use crate::tape::{Configuration, Tape};
use crate::types::{AutomatonError, Direction, DomainError, ParseError, BLANK_SYMBOL};

/// The right-hand side of a transition: `(next_state, write, direction)`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TmAction {
    pub next_state: String,
    pub write: char,
    pub direction: Direction,
}

/// The plain description of a Turing Machine, as read from a source document.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TmDefinition {
    pub states: Vec<String>,
    pub input_alphabet: Vec<char>,
    /// Tape symbols besides the input symbols and the blank.
    pub tape_alphabet_extra: Vec<char>,
    pub start_state: String,
    pub accept_state: String,
    pub reject_state: String,
    /// `(state, read, action)` entries.
    pub delta: Vec<(String, char, TmAction)>,
}

impl TmDefinition {
    /// Validates the definition and builds the machine.
    pub fn build(self) -> Result<TuringMachine, ParseError> {
        if self.states.is_empty() {
            return Err(ParseError::at("states", "at least one state is required"));
        }
        let states = StateTable::new(self.states, "states")?;

        let input_alphabet = Alphabet::new(self.input_alphabet.iter().copied()).map_err(|symbol| {
            ParseError::at("input_alphabet", format!("duplicate symbol '{symbol}'"))
        })?;
        if input_alphabet.contains(BLANK_SYMBOL) {
            return Err(ParseError::at(
                "input_alphabet",
                format!("the blank symbol '{BLANK_SYMBOL}' cannot be an input symbol"),
            ));
        }
        let declared = self
            .input_alphabet
            .iter()
            .chain(&self.tape_alphabet_extra)
            .copied()
            .filter(|&symbol| symbol != BLANK_SYMBOL);
        let tape_alphabet = Alphabet::new(declared)
            .map_err(|symbol| {
                ParseError::at("tape_alphabet_extra", format!("duplicate symbol '{symbol}'"))
            })?
            .union(&Alphabet::collect([BLANK_SYMBOL]));

        let start = states.resolve(&self.start_state, "start_state")?;
        let accept = states.resolve(&self.accept_state, "accept_state")?;
        let reject = states.resolve(&self.reject_state, "reject_state")?;
        if accept == reject {
            return Err(ParseError::at(
                "reject_state",
                "accept_state and reject_state must be different states",
            ));
        }

        let mut rules = HashMap::new();
        for (state, read, action) in &self.delta {
            let field = format!("delta.{state}.{read}");
            let from = states.resolve(state, &format!("delta.{state}"))?;
            for symbol in [*read, action.write] {
                if !tape_alphabet.contains(symbol) {
                    return Err(ParseError::at(
                        &field,
                        format!("symbol '{symbol}' is not in the tape alphabet"),
                    ));
                }
            }
            let rule = Rule {
                next: states.resolve(&action.next_state, &field)?,
                write: action.write,
                direction: action.direction,
            };
            if rules.insert((from, *read), rule).is_some() {
                return Err(ParseError::at(field, "duplicate transition"));
            }
        }

        Ok(TuringMachine {
            states,
            input_alphabet,
            tape_alphabet,
            start,
            accept,
            reject,
            rules,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Rule {
    next: StateId,
    write: char,
    direction: Direction,
}

/// A deterministic single-tape Turing Machine with distinguished accept and reject states.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TuringMachine {
    states: StateTable,
    input_alphabet: Alphabet,
    tape_alphabet: Alphabet,
    start: StateId,
    accept: StateId,
    reject: StateId,
    rules: HashMap<(StateId, char), Rule>,
}

impl TuringMachine {
    /// Returns the state names in declaration order.
    pub fn states(&self) -> &[String] {
        self.states.names()
    }

    /// The symbols an input string may contain.
    pub fn input_alphabet(&self) -> &Alphabet {
        &self.input_alphabet
    }

    /// Input symbols, extra symbols, and the blank.
    pub fn tape_alphabet(&self) -> &Alphabet {
        &self.tape_alphabet
    }

    /// Returns the name of the start state.
    pub fn start_state(&self) -> &str {
        self.states.name(self.start)
    }

    /// Returns the name of the accepting halt state.
    pub fn accept_state(&self) -> &str {
        self.states.name(self.accept)
    }

    /// Returns the name of the rejecting halt state.
    pub fn reject_state(&self) -> &str {
        self.states.name(self.reject)
    }

    /// Returns the action for `state` reading `symbol`, if one is defined.
    pub fn transition(&self, state: &str, symbol: char) -> Option<TmAction> {
        let rule = self.rules.get(&(self.states.id(state)?, symbol))?;
        Some(TmAction {
            next_state: self.states.name(rule.next).to_string(),
            write: rule.write,
            direction: rule.direction,
        })
    }

    /// Lists every transition as `(state, read, action)`, ordered by state then tape alphabet.
    pub fn transitions(&self) -> Vec<(&str, char, TmAction)> {
        let mut result = Vec::new();
        for state in self.states.names() {
            for symbol in self.tape_alphabet.iter() {
                if let Some(action) = self.transition(state, symbol) {
                    result.push((state.as_str(), symbol, action));
                }
            }
        }
        result
    }

    /// Whether `state` is the accept or the reject state.
    pub fn is_halting(&self, state: &str) -> bool {
        self.states
            .id(state)
            .is_some_and(|id| id == self.accept || id == self.reject)
    }

    /// Builds the starting configuration: `input` on the tape from cell 0, head on cell 0.
    pub fn initial_config(&self, input: &str) -> Result<Configuration, DomainError> {
        let symbols = self.input_alphabet.tokenize(input)?;
        Ok(Configuration::new(
            self.start_state(),
            Tape::new(symbols, BLANK_SYMBOL),
        ))
    }

    /// Classifies a configuration by its state.
    pub fn status(&self, config: &Configuration) -> Status {
        match self.states.id(&config.state) {
            Some(id) if id == self.accept => Status::Accepted,
            Some(id) if id == self.reject => Status::Rejected,
            _ => Status::Running,
        }
    }

    /// Computes the diff of the next step, or `None` when the configuration has halted.
    ///
    /// Without a matching transition the machine moves to the reject state, leaving the tape
    /// and head unchanged.
    pub fn next_diff(&self, config: &Configuration) -> Result<Option<ConfigDiff>, AutomatonError> {
        let state = self.states.id(&config.state).ok_or_else(|| {
            AutomatonError::InvariantViolation(format!(
                "configuration is in unknown state '{}'",
                config.state
            ))
        })?;
        if state == self.accept || state == self.reject {
            return Ok(None);
        }

        let symbol = config.symbol();
        let (next, write, direction) = match self.rules.get(&(state, symbol)) {
            Some(rule) => (rule.next, rule.write, rule.direction),
            None => (self.reject, symbol, Direction::Stay),
        };

        Ok(Some(ConfigDiff {
            prev_state: config.state.clone(),
            next_state: self.states.name(next).to_string(),
            prev_head: config.head,
            next_head: config.head + direction.offset(),
            prev_symbol: symbol,
            next_symbol: write,
        }))
    }

    /// Starts a step-wise execution on `input`.
    pub fn execute(&self, input: &str, config: &EngineConfig) -> Result<Execution<'_>, DomainError> {
        let initial = self.initial_config(input)?;
        Ok(Execution {
            machine: self,
            status: self.status(&initial),
            current: initial.clone(),
            initial,
            diffs: Vec::new(),
            max_steps: config.max_steps,
        })
    }

    /// Runs the machine on `input` until it halts or hits `config.max_steps`.
    pub fn run(&self, input: &str, config: &EngineConfig) -> Result<ExecutionLog, AutomatonError> {
        let execution = self.execute(input, config)?;
        execution.finish()
    }

    /// Decides whether the machine accepts `input` within the step limit.
    pub fn accepts(&self, input: &str, config: &EngineConfig) -> Result<bool, AutomatonError> {
        Ok(self.run(input, config)?.outcome == Status::Accepted)
    }
}

/// A run in progress. Each call to [`Execution::step`] performs one transition; a caller
/// cancels simply by not calling it again.
#[derive(Debug, Clone)]
pub struct Execution<'m> {
    machine: &'m TuringMachine,
    initial: Configuration,
    current: Configuration,
    diffs: Vec<ConfigDiff>,
    max_steps: usize,
    status: Status,
}

impl Execution<'_> {
    pub fn status(&self) -> Status {
        self.status
    }

    pub fn current(&self) -> &Configuration {
        &self.current
    }

    pub fn steps(&self) -> usize {
        self.diffs.len()
    }

    /// Performs one transition and returns the resulting status.
    ///
    /// Once the step limit is spent, the next call ends the run as `StepLimitExceeded`.
    pub fn step(&mut self) -> Result<Status, AutomatonError> {
        if self.status != Status::Running {
            return Ok(self.status);
        }
        if self.diffs.len() >= self.max_steps {
            self.status = Status::StepLimitExceeded;
            return Ok(self.status);
        }

        let Some(diff) = self.machine.next_diff(&self.current)? else {
            self.status = self.machine.status(&self.current);
            return Ok(self.status);
        };

        self.current.apply_diff(&diff)?;
        trace!(
            step = self.diffs.len() + 1,
            state = %diff.next_state,
            head = diff.next_head,
            "tm step"
        );
        self.diffs.push(diff);
        self.status = self.machine.status(&self.current);

        Ok(self.status)
    }

    /// Performs up to `steps` transitions, stopping early when the run ends.
    pub fn run_for(&mut self, steps: usize) -> Result<Status, AutomatonError> {
        for _ in 0..steps {
            if self.step()? != Status::Running {
                break;
            }
        }
        Ok(self.status)
    }

    /// Runs to the end and returns the log.
    pub fn finish(mut self) -> Result<ExecutionLog, AutomatonError> {
        while self.step()? == Status::Running {}
        debug!(outcome = %self.status, steps = self.diffs.len(), "tm run finished");
        Ok(self.into_log())
    }

    /// Returns the log of the steps taken so far; a cancelled run keeps the `Running` outcome.
    pub fn into_log(self) -> ExecutionLog {
        ExecutionLog {
            initial: self.initial,
            final_config: self.current,
            diffs: self.diffs,
            outcome: self.status,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn action(next: &str, write: char, direction: Direction) -> TmAction {
        TmAction {
            next_state: next.into(),
            write,
            direction,
        }
    }

    fn palindromes() -> TuringMachine {
        use Direction::*;

        let rules = [
            ("q0", '0', action("q1", '_', Right)),
            ("q0", '1', action("q2", '_', Right)),
            ("q0", '_', action("qA", '_', Stay)),
            ("q1", '0', action("q1", '0', Right)),
            ("q1", '1', action("q1", '1', Right)),
            ("q1", '_', action("q3", '_', Left)),
            ("q2", '0', action("q2", '0', Right)),
            ("q2", '1', action("q2", '1', Right)),
            ("q2", '_', action("q4", '_', Left)),
            ("q3", '0', action("q5", '_', Left)),
            ("q3", '1', action("qR", '1', Stay)),
            ("q3", '_', action("qA", '_', Stay)),
            ("q4", '1', action("q5", '_', Left)),
            ("q4", '0', action("qR", '0', Stay)),
            ("q4", '_', action("qA", '_', Stay)),
            ("q5", '0', action("q5", '0', Left)),
            ("q5", '1', action("q5", '1', Left)),
            ("q5", '_', action("q0", '_', Right)),
        ];

        TmDefinition {
            states: ["q0", "q1", "q2", "q3", "q4", "q5", "qA", "qR"]
                .map(String::from)
                .to_vec(),
            input_alphabet: vec!['0', '1'],
            tape_alphabet_extra: vec![],
            start_state: "q0".into(),
            accept_state: "qA".into(),
            reject_state: "qR".into(),
            delta: rules
                .into_iter()
                .map(|(state, read, action)| (state.to_string(), read, action))
                .collect(),
        }
        .build()
        .unwrap()
    }

    #[test]
    fn test_palindromes() {
        let tm = palindromes();
        let config = EngineConfig::default();

        for input in ["", "0", "010", "0110", "1001001"] {
            assert!(tm.accepts(input, &config).unwrap(), "{input} is a palindrome");
        }
        for input in ["01", "011", "0010", "110"] {
            assert!(!tm.accepts(input, &config).unwrap(), "{input} is not a palindrome");
        }
    }

    #[test]
    fn test_backward_from_end_restores_initial() {
        let tm = palindromes();
        let log = tm.run("0110", &EngineConfig::default()).unwrap();

        assert_eq!(log.outcome, Status::Accepted);
        assert_eq!(log.initial, tm.initial_config("0110").unwrap());

        let mut timeline = log.timeline();
        timeline.to_end();
        while timeline.backward().unwrap() {}
        assert_eq!(timeline.current(), &log.initial);

        while timeline.forward().unwrap() {}
        assert_eq!(timeline.current(), &log.final_config);
    }

    #[test]
    fn test_step_limit() {
        let tm = TmDefinition {
            states: vec!["run".into(), "yes".into(), "no".into()],
            input_alphabet: vec!['1'],
            tape_alphabet_extra: vec![],
            start_state: "run".into(),
            accept_state: "yes".into(),
            reject_state: "no".into(),
            delta: vec![
                ("run".into(), '_', action("run", '1', Direction::Right)),
                ("run".into(), '1', action("run", '1', Direction::Right)),
            ],
        }
        .build()
        .unwrap();

        let config = EngineConfig::default().with_max_steps(5);
        let log = tm.run("", &config).unwrap();

        assert_eq!(log.outcome, Status::StepLimitExceeded);
        assert_eq!(log.steps(), 5);
        assert_eq!(log.final_config.output_string(), "11111");
    }

    #[test]
    fn test_missing_transition_rejects() {
        let tm = palindromes();
        let mut definition_without_q4_one = TmDefinition {
            states: tm.states().to_vec(),
            input_alphabet: vec!['0', '1'],
            start_state: "q0".into(),
            accept_state: "qA".into(),
            reject_state: "qR".into(),
            ..TmDefinition::default()
        };
        definition_without_q4_one.delta = tm
            .transitions()
            .into_iter()
            .filter(|(state, read, _)| !(*state == "q4" && *read == '1'))
            .map(|(state, read, action)| (state.to_string(), read, action))
            .collect();
        let tm = definition_without_q4_one.build().unwrap();

        let log = tm.run("11", &EngineConfig::default()).unwrap();
        let last = log.diffs.last().unwrap();

        assert_eq!(log.outcome, Status::Rejected);
        assert_eq!(last.prev_state, "q4");
        assert_eq!(last.next_state, "qR");
        assert_eq!(last.prev_head, last.next_head);
    }

    #[test]
    fn test_step_wise_execution() {
        let tm = palindromes();
        let config = EngineConfig::default();
        let mut execution = tm.execute("010", &config).unwrap();

        assert_eq!(execution.run_for(3).unwrap(), Status::Running);
        assert_eq!(execution.steps(), 3);
        assert_eq!(execution.current().state, "q1");

        let partial = execution.clone().into_log();
        assert_eq!(partial.outcome, Status::Running);

        let log = execution.finish().unwrap();
        assert_eq!(log.outcome, Status::Accepted);
        assert_eq!(&log.diffs[..3], &partial.diffs[..]);
    }

    #[test]
    fn test_unknown_input_symbol() {
        let tm = palindromes();

        assert_eq!(
            tm.initial_config("0_1").unwrap_err(),
            DomainError::UnknownSymbol {
                symbol: '_',
                position: 1
            }
        );
        assert!(matches!(
            tm.run("2", &EngineConfig::default()),
            Err(AutomatonError::Domain(_))
        ));
    }

    #[test]
    fn test_build_errors() {
        let base = TmDefinition {
            states: vec!["a".into(), "y".into(), "n".into()],
            input_alphabet: vec!['0'],
            tape_alphabet_extra: vec!['x'],
            start_state: "a".into(),
            accept_state: "y".into(),
            reject_state: "n".into(),
            delta: vec![],
        };

        let mut blank_input = base.clone();
        blank_input.input_alphabet.push('_');
        assert_eq!(
            blank_input.build().unwrap_err().field.as_deref(),
            Some("input_alphabet")
        );

        let mut same_halt = base.clone();
        same_halt.reject_state = "y".into();
        assert!(same_halt.build().is_err());

        let mut bad_write = base.clone();
        bad_write
            .delta
            .push(("a".into(), '0', action("a", 'z', Direction::Right)));
        let error = bad_write.build().unwrap_err();
        assert_eq!(error.field.as_deref(), Some("delta.a.0"));
        assert!(error.message.contains("'z'"));

        let tm = base.build().unwrap();
        assert_eq!(tm.tape_alphabet().symbols(), &['0', 'x', '_']);
    }
}
