//! Engine limits and switches shared by the parsers and the executors.

use serde::{Deserialize, Serialize};

use crate::types::{AutomatonError, MAX_CHART_CELLS, MAX_EXECUTION_STEPS, MAX_TREE_DEPTH};

/// Settings for parsing and running automata.
///
/// Every field has a default, so a partial JSON object (or `{}`) is a valid configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Number of Turing Machine steps after which a run ends as `StepLimitExceeded`.
    #[serde(default = "default_max_steps")]
    pub max_steps: usize,
    /// Parse trees deeper than this abort with an invariant violation.
    ///
    /// Tree construction always terminates on its own, since every child is proved in an
    /// earlier chart round than its parent. This ceiling only guards against trees that
    /// are too deep to build or render, and can be set lower than the tree a grammar needs.
    #[serde(default = "default_max_tree_depth")]
    pub max_tree_depth: usize,
    /// Upper bound on `nonterminals * (input length + 1)^2`, the cells of a grammar's span
    /// chart. Larger inputs are refused with a domain error.
    #[serde(default = "default_max_chart_cells")]
    pub max_chart_cells: usize,
    /// Refuse DFAs that leave any (state, symbol) pair without a transition.
    #[serde(default)]
    pub require_total_delta: bool,
}

fn default_max_steps() -> usize {
    MAX_EXECUTION_STEPS
}

fn default_max_tree_depth() -> usize {
    MAX_TREE_DEPTH
}

fn default_max_chart_cells() -> usize {
    MAX_CHART_CELLS
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_steps: default_max_steps(),
            max_tree_depth: default_max_tree_depth(),
            max_chart_cells: default_max_chart_cells(),
            require_total_delta: false,
        }
    }
}

impl EngineConfig {
    /// Reads a configuration from a JSON document.
    pub fn from_json(content: &str) -> Result<Self, AutomatonError> {
        serde_json::from_str(content)
            .map_err(|e| AutomatonError::FileError(format!("Invalid configuration: {e}")))
    }

    /// Overrides the Turing Machine step limit.
    pub fn with_max_steps(mut self, max_steps: usize) -> Self {
        self.max_steps = max_steps;
        self
    }
}
