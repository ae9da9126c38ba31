//! Reversible Turing Machine execution history.
//!
//! A run is stored as its initial and final configurations plus one [`ConfigDiff`] per step.
//! A diff holds both sides of every change it makes, so it can be applied forward or undone,
//! and a [`Timeline`] can move between steps without re-running the machine.

use serde::Serialize;
use std::fmt;

use crate::tape::Configuration;
use crate::types::AutomatonError;

/// Where a Turing Machine run stands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Status {
    Running,
    Accepted,
    Rejected,
    /// The run was cut off by the step limit before reaching a halting state.
    StepLimitExceeded,
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            Status::Running => "running",
            Status::Accepted => "accepted",
            Status::Rejected => "rejected",
            Status::StepLimitExceeded => "step limit exceeded",
        };
        write!(f, "{text}")
    }
}

/// The change made by one step. The symbol is written at `prev_head`, before the move.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ConfigDiff {
    pub prev_state: String,
    pub next_state: String,
    pub prev_head: i64,
    pub next_head: i64,
    pub prev_symbol: char,
    pub next_symbol: char,
}

impl Configuration {
    /// Advances this configuration by one step.
    ///
    /// # Errors
    ///
    /// Returns `InvariantViolation` when the diff was not recorded from this configuration.
    pub fn apply_diff(&mut self, diff: &ConfigDiff) -> Result<(), AutomatonError> {
        self.check(
            &diff.prev_state,
            diff.prev_head,
            diff.prev_head,
            diff.prev_symbol,
            "apply",
        )?;

        self.tape.write(diff.prev_head, diff.next_symbol);
        self.tape.extend_to(diff.next_head);
        self.head = diff.next_head;
        self.state.clone_from(&diff.next_state);
        Ok(())
    }

    /// Undoes one step, restoring the previous state, symbol, and head position.
    ///
    /// # Errors
    ///
    /// Returns `InvariantViolation` when this configuration is not the one the diff produced.
    pub fn apply_reverse_diff(&mut self, diff: &ConfigDiff) -> Result<(), AutomatonError> {
        self.check(
            &diff.next_state,
            diff.next_head,
            diff.prev_head,
            diff.next_symbol,
            "reverse",
        )?;

        self.tape.write(diff.prev_head, diff.prev_symbol);
        self.head = diff.prev_head;
        self.state.clone_from(&diff.prev_state);
        Ok(())
    }

    /// Verifies the state, head, and the symbol stored at `cell`.
    fn check(
        &self,
        state: &str,
        head: i64,
        cell: i64,
        symbol: char,
        action: &str,
    ) -> Result<(), AutomatonError> {
        if self.state != state || self.head != head {
            return Err(AutomatonError::InvariantViolation(format!(
                "cannot {action} diff: expected state '{state}' at head {head}, found '{}' at head {}",
                self.state, self.head
            )));
        }
        let found = self.tape.read(cell);
        if found != symbol {
            return Err(AutomatonError::InvariantViolation(format!(
                "cannot {action} diff: expected '{symbol}' at cell {cell}, found '{found}'"
            )));
        }
        Ok(())
    }
}

/// The complete record of one run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExecutionLog {
    pub initial: Configuration,
    #[serde(rename = "final")]
    pub final_config: Configuration,
    pub diffs: Vec<ConfigDiff>,
    pub outcome: Status,
}

impl ExecutionLog {
    /// Number of steps taken.
    pub fn steps(&self) -> usize {
        self.diffs.len()
    }

    /// Reconstructs the configuration after `step` steps by replaying diffs.
    pub fn configuration_at(&self, step: usize) -> Result<Configuration, AutomatonError> {
        let mut timeline = self.timeline();
        timeline.seek(step)?;
        Ok(timeline.current)
    }

    /// Opens a cursor at the initial configuration.
    pub fn timeline(&self) -> Timeline<'_> {
        Timeline::new(self)
    }
}

/// A cursor over an [`ExecutionLog`] holding the configuration at its position.
///
/// Moving by `k` steps applies `k` diffs; jumping to either end copies the stored
/// configuration.
#[derive(Debug, Clone)]
pub struct Timeline<'a> {
    log: &'a ExecutionLog,
    current: Configuration,
    position: usize,
}

impl<'a> Timeline<'a> {
    pub fn new(log: &'a ExecutionLog) -> Self {
        Self {
            log,
            current: log.initial.clone(),
            position: 0,
        }
    }

    /// The number of steps applied so far.
    pub fn position(&self) -> usize {
        self.position
    }

    /// The configuration at the cursor.
    pub fn current(&self) -> &Configuration {
        &self.current
    }

    pub fn is_at_end(&self) -> bool {
        self.position == self.log.diffs.len()
    }

    /// Applies the next diff. Returns `false` at the end of the log.
    pub fn forward(&mut self) -> Result<bool, AutomatonError> {
        let Some(diff) = self.log.diffs.get(self.position) else {
            return Ok(false);
        };
        self.current.apply_diff(diff)?;
        self.position += 1;
        Ok(true)
    }

    /// Undoes the previous diff. Returns `false` at the start of the log.
    pub fn backward(&mut self) -> Result<bool, AutomatonError> {
        if self.position == 0 {
            return Ok(false);
        }
        self.current
            .apply_reverse_diff(&self.log.diffs[self.position - 1])?;
        self.position -= 1;
        Ok(true)
    }

    /// Moves to `step`, clamped to the length of the log.
    pub fn seek(&mut self, step: usize) -> Result<(), AutomatonError> {
        let target = step.min(self.log.diffs.len());
        while self.position < target {
            self.forward()?;
        }
        while self.position > target {
            self.backward()?;
        }
        Ok(())
    }

    /// Rewinds to the initial configuration.
    pub fn to_start(&mut self) {
        self.current = self.log.initial.clone();
        self.position = 0;
    }

    /// Jumps to the final configuration.
    pub fn to_end(&mut self) {
        self.current = self.log.final_config.clone();
        self.position = self.log.diffs.len();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tape::Tape;

    fn config() -> Configuration {
        Configuration::new("q0", Tape::new("ab".chars(), '_'))
    }

    fn diff() -> ConfigDiff {
        ConfigDiff {
            prev_state: "q0".into(),
            next_state: "q1".into(),
            prev_head: 0,
            next_head: -1,
            prev_symbol: 'a',
            next_symbol: 'x',
        }
    }

    #[test]
    fn test_apply_then_reverse_restores() {
        let original = config();
        let mut current = original.clone();

        current.apply_diff(&diff()).unwrap();
        assert_eq!(current.state, "q1");
        assert_eq!(current.head, -1);
        assert_eq!(current.tape.read(0), 'x');

        current.apply_reverse_diff(&diff()).unwrap();
        assert_eq!(current, original);
    }

    #[test]
    fn test_mismatched_diff_is_rejected() {
        let mut current = config();
        let mut wrong_symbol = diff();
        wrong_symbol.prev_symbol = 'b';

        assert!(matches!(
            current.apply_diff(&wrong_symbol),
            Err(AutomatonError::InvariantViolation(_))
        ));
        assert!(matches!(
            current.apply_reverse_diff(&diff()),
            Err(AutomatonError::InvariantViolation(_))
        ));
        assert_eq!(current, config());
    }

    #[test]
    fn test_timeline_navigation() {
        let initial = config();
        let mut final_config = initial.clone();
        let diffs = vec![
            diff(),
            ConfigDiff {
                prev_state: "q1".into(),
                next_state: "q2".into(),
                prev_head: -1,
                next_head: 0,
                prev_symbol: '_',
                next_symbol: 'y',
            },
        ];
        for d in &diffs {
            final_config.apply_diff(d).unwrap();
        }
        let log = ExecutionLog {
            initial: initial.clone(),
            final_config: final_config.clone(),
            diffs,
            outcome: Status::Accepted,
        };

        let mut timeline = log.timeline();
        timeline.seek(2).unwrap();
        assert_eq!(timeline.current(), &final_config);
        assert!(!timeline.forward().unwrap());

        timeline.seek(0).unwrap();
        assert_eq!(timeline.current(), &initial);
        assert!(!timeline.backward().unwrap());

        timeline.to_end();
        assert!(timeline.is_at_end());
        assert!(timeline.backward().unwrap());
        assert_eq!(timeline.current(), &log.configuration_at(1).unwrap());
        assert_eq!(timeline.current().to_string(), "q1: [_]xb");
    }
}
