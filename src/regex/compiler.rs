//! Thompson construction from a resolved regex to an NFA.

use super::ast::Expr;
use crate::alphabet::StateId;
use crate::nfa::{Nfa, NfaBuilder};

/// Regex AST to NFA compiler. States are named `q0`, `q1`, … in creation order.
#[derive(Default)]
pub(crate) struct Compiler {
    nfa: NfaBuilder,
    count: usize,
}

impl Compiler {
    pub(crate) fn compile(expr: &Expr) -> Nfa {
        let mut compiler = Self::default();
        let (start, end) = compiler.fragment(expr);
        compiler.nfa.build(start, &[end])
    }

    fn new_state(&mut self) -> StateId {
        let id = self.nfa.add_state(format!("q{}", self.count));
        self.count += 1;
        id
    }

    /// Builds the fragment for `expr` and returns its start and accept states.
    fn fragment(&mut self, expr: &Expr) -> (StateId, StateId) {
        match expr {
            Expr::Empty => {
                let start = self.new_state();
                let end = self.new_state();
                self.nfa.add_transition(start, None, end);
                (start, end)
            }
            Expr::Literal(symbol) => {
                let start = self.new_state();
                let end = self.new_state();
                self.nfa.add_transition(start, Some(*symbol), end);
                (start, end)
            }
            Expr::Reference(_, expr) => self.fragment(expr),
            Expr::Concat(items) => {
                let mut items = items.iter();
                let Some(first) = items.next() else {
                    return self.fragment(&Expr::Empty);
                };
                let (start, mut end) = self.fragment(first);
                for item in items {
                    let (next_start, next_end) = self.fragment(item);
                    self.nfa.add_transition(end, None, next_start);
                    end = next_end;
                }
                (start, end)
            }
            Expr::Union(branches) => {
                let start = self.new_state();
                let ends: Vec<StateId> = branches
                    .iter()
                    .map(|branch| {
                        let (branch_start, branch_end) = self.fragment(branch);
                        self.nfa.add_transition(start, None, branch_start);
                        branch_end
                    })
                    .collect();
                let end = self.new_state();
                for branch_end in ends {
                    self.nfa.add_transition(branch_end, None, end);
                }
                (start, end)
            }
            Expr::Star(inner) => {
                let start = self.new_state();
                let (inner_start, inner_end) = self.fragment(inner);
                let end = self.new_state();
                self.nfa.add_transition(start, None, inner_start);
                self.nfa.add_transition(inner_end, None, inner_start);
                self.nfa.add_transition(inner_end, None, end);
                self.nfa.add_transition(start, None, end);
                (start, end)
            }
        }
    }
}
