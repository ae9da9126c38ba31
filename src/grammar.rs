//! Context-free grammars: recognition with a ranked span chart, and parse tree construction.
//!
//! The chart records, for every nonterminal `A` and span `i..j` of the input, whether `A`
//! derives `input[i..j]`. Facts are found by Jacobi iteration: round `r` only combines facts
//! from rounds before `r`, and `r` is stored as the fact's rank. A fact of rank `r` always has
//! a derivation whose nonterminal children have lower ranks, which keeps tree construction
//! well-founded even for left-recursive, cyclic, or ambiguous grammars.

use serde::Serialize;
use std::fmt;
use tracing::{debug, trace};

use crate::types::{
    AutomatonError, DomainError, ParseError, EPSILON, MAX_CHART_CELLS, MAX_TREE_DEPTH,
};

/// A symbol on the right-hand side of a production.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Symbol {
    Terminal(char),
    /// Index into the grammar's nonterminal list.
    Nonterminal(usize),
}

/// `head -> body`; an empty body is an ε-production.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Production {
    pub head: usize,
    pub body: Vec<Symbol>,
}

/// The plain description of a grammar: each nonterminal with its right-hand sides, as raw
/// strings. The first nonterminal is the start symbol.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GrammarDefinition {
    pub rules: Vec<(String, Vec<String>)>,
}

impl GrammarDefinition {
    /// Tokenizes every right-hand side and builds the grammar.
    ///
    /// In a right-hand side, the longest nonterminal name that matches at a position is a
    /// nonterminal; any other character is a terminal. An empty string or `ε` is the empty
    /// production.
    pub fn build(self) -> Result<Grammar, ParseError> {
        if self.rules.is_empty() {
            return Err(ParseError::new("a grammar needs at least one nonterminal"));
        }

        let mut nonterminals: Vec<String> = Vec::with_capacity(self.rules.len());
        for (name, _) in &self.rules {
            if name.is_empty() {
                return Err(ParseError::new("nonterminal names must not be empty"));
            }
            if nonterminals.contains(name) {
                return Err(ParseError::at(name, format!("duplicate nonterminal '{name}'")));
            }
            nonterminals.push(name.clone());
        }

        let mut productions = Vec::new();
        for (head, (name, bodies)) in self.rules.iter().enumerate() {
            if bodies.is_empty() {
                return Err(ParseError::at(name, "expected at least one right-hand side"));
            }
            for body in bodies {
                productions.push(Production {
                    head,
                    body: tokenize_body(body, &nonterminals),
                });
            }
        }

        debug!(
            nonterminals = nonterminals.len(),
            productions = productions.len(),
            "built grammar"
        );

        Ok(Grammar {
            nonterminals,
            productions,
            max_tree_depth: MAX_TREE_DEPTH,
            max_chart_cells: MAX_CHART_CELLS,
        })
    }
}

fn tokenize_body(body: &str, nonterminals: &[String]) -> Vec<Symbol> {
    if body == EPSILON {
        return Vec::new();
    }

    let chars: Vec<char> = body.chars().collect();
    let mut symbols = Vec::new();
    let mut position = 0;

    while position < chars.len() {
        let rest = &chars[position..];
        let longest = nonterminals
            .iter()
            .enumerate()
            .filter(|(_, name)| {
                let len = name.chars().count();
                rest.len() >= len && name.chars().zip(rest).all(|(a, &b)| a == b)
            })
            .max_by_key(|(_, name)| name.chars().count());

        match longest {
            Some((index, name)) => {
                symbols.push(Symbol::Nonterminal(index));
                position += name.chars().count();
            }
            None => {
                symbols.push(Symbol::Terminal(chars[position]));
                position += 1;
            }
        }
    }

    symbols
}

/// A context-free grammar.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Grammar {
    nonterminals: Vec<String>,
    productions: Vec<Production>,
    max_tree_depth: usize,
    max_chart_cells: usize,
}

/// Whether the symbol of a tree node is a nonterminal, a terminal, or the ε marker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum NodeKind {
    Nonterminal,
    Terminal,
    Epsilon,
}

/// A node of a parse tree. Leaves are terminals or ε.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TreeNode {
    pub symbol: String,
    pub kind: NodeKind,
    pub children: Vec<TreeNode>,
}

impl TreeNode {
    fn leaf(symbol: String, kind: NodeKind) -> Self {
        Self {
            symbol,
            kind,
            children: Vec::new(),
        }
    }

    /// The terminals at the leaves, read left to right.
    pub fn yield_string(&self) -> String {
        let mut output = String::new();
        self.collect_yield(&mut output);
        output
    }

    fn collect_yield(&self, output: &mut String) {
        match self.kind {
            NodeKind::Terminal => output.push_str(&self.symbol),
            NodeKind::Epsilon => {}
            NodeKind::Nonterminal => self
                .children
                .iter()
                .for_each(|child| child.collect_yield(output)),
        }
    }

    /// Number of edges on the longest root-to-leaf path.
    pub fn depth(&self) -> usize {
        self.children
            .iter()
            .map(|child| child.depth() + 1)
            .max()
            .unwrap_or(0)
    }

    /// The sentential forms of the leftmost derivation this tree encodes, from the root
    /// symbol to the yield. An empty form is shown as `ε`.
    pub fn leftmost_derivation(&self) -> Vec<String> {
        let mut frontier: Vec<&TreeNode> = vec![self];
        let mut forms = vec![sentential_form(&frontier)];

        while let Some(index) = frontier
            .iter()
            .position(|node| node.kind == NodeKind::Nonterminal)
        {
            let node = frontier[index];
            frontier.splice(index..=index, node.children.iter());
            forms.push(sentential_form(&frontier));
        }

        forms
    }
}

fn sentential_form(frontier: &[&TreeNode]) -> String {
    let form: String = frontier
        .iter()
        .filter(|node| node.kind != NodeKind::Epsilon)
        .map(|node| node.symbol.as_str())
        .collect();
    if form.is_empty() {
        EPSILON.to_string()
    } else {
        form
    }
}

/// The result of parsing one input.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CfgTrace {
    pub input: String,
    pub tree: Option<TreeNode>,
    /// Sentential forms of the leftmost derivation, empty when the input is rejected.
    pub derivation: Vec<String>,
    pub accepted: bool,
}

impl Grammar {
    /// Sets the depth past which tree construction gives up. The ceiling is a guard, not a
    /// termination mechanism: a tree is never deeper than the rank of its root fact.
    pub fn with_max_tree_depth(mut self, max_tree_depth: usize) -> Self {
        self.max_tree_depth = max_tree_depth;
        self
    }

    /// Sets the largest span chart, in cells, that one input may allocate.
    pub fn with_max_chart_cells(mut self, max_chart_cells: usize) -> Self {
        self.max_chart_cells = max_chart_cells;
        self
    }

    /// The nonterminal names in declaration order; the first is the start symbol.
    pub fn nonterminals(&self) -> &[String] {
        &self.nonterminals
    }

    pub fn start_symbol(&self) -> &str {
        &self.nonterminals[0]
    }

    /// Every production, grouped by head in declaration order.
    pub fn productions(&self) -> &[Production] {
        &self.productions
    }

    /// Every terminal used by a production, in first-seen order.
    pub fn terminals(&self) -> Vec<char> {
        let mut terminals = Vec::new();
        for symbol in self.productions.iter().flat_map(|p| p.body.iter()) {
            if let Symbol::Terminal(c) = symbol {
                if !terminals.contains(c) {
                    terminals.push(*c);
                }
            }
        }
        terminals
    }

    /// Renders a production as `A -> body`.
    pub fn display_production(&self, production: &Production) -> String {
        let body: String = if production.body.is_empty() {
            EPSILON.to_string()
        } else {
            production
                .body
                .iter()
                .map(|symbol| match symbol {
                    Symbol::Terminal(c) => c.to_string(),
                    Symbol::Nonterminal(index) => self.nonterminals[*index].clone(),
                })
                .collect()
        };
        format!("{} -> {}", self.nonterminals[production.head], body)
    }

    /// Prepares a chart for `input` without filling it.
    pub fn chart(&self, input: &str) -> Result<Chart<'_>, DomainError> {
        Chart::new(self, input)
    }

    /// Decides whether the grammar derives `input`.
    pub fn accepts(&self, input: &str) -> Result<bool, AutomatonError> {
        Ok(self.parse_tree(input)?.is_some())
    }

    /// Returns a parse tree for `input`, or `None` when the grammar does not derive it.
    pub fn parse_tree(&self, input: &str) -> Result<Option<TreeNode>, AutomatonError> {
        let mut chart = self.chart(input)?;
        chart.complete();
        chart.parse_tree()
    }

    /// Parses `input` and records the leftmost derivation of the tree, if there is one.
    pub fn trace(&self, input: &str) -> Result<CfgTrace, AutomatonError> {
        let tree = self.parse_tree(input)?;
        Ok(CfgTrace {
            input: input.to_string(),
            derivation: tree
                .as_ref()
                .map(TreeNode::leftmost_derivation)
                .unwrap_or_default(),
            accepted: tree.is_some(),
            tree,
        })
    }

    /// Nonterminals that no sentential form derived from the start symbol contains.
    pub fn unreachable_nonterminals(&self) -> Vec<&str> {
        let mut reached = vec![false; self.nonterminals.len()];
        let mut stack = vec![0];
        reached[0] = true;

        while let Some(head) = stack.pop() {
            for production in self.productions.iter().filter(|p| p.head == head) {
                for symbol in &production.body {
                    if let Symbol::Nonterminal(index) = *symbol {
                        if !reached[index] {
                            reached[index] = true;
                            stack.push(index);
                        }
                    }
                }
            }
        }

        self.unmarked(&reached)
    }

    /// Nonterminals that derive no terminal string at all.
    pub fn unproductive_nonterminals(&self) -> Vec<&str> {
        let mut productive = vec![false; self.nonterminals.len()];
        let mut changed = true;

        while changed {
            changed = false;
            for production in &self.productions {
                if productive[production.head] {
                    continue;
                }
                let all_productive = production.body.iter().all(|symbol| match symbol {
                    Symbol::Terminal(_) => true,
                    Symbol::Nonterminal(index) => productive[*index],
                });
                if all_productive {
                    productive[production.head] = true;
                    changed = true;
                }
            }
        }

        self.unmarked(&productive)
    }

    fn unmarked(&self, marks: &[bool]) -> Vec<&str> {
        self.nonterminals
            .iter()
            .zip(marks)
            .filter(|(_, marked)| !**marked)
            .map(|(name, _)| name.as_str())
            .collect()
    }
}

/// The span table for one input.
///
/// Each [`Chart::advance`] call runs one fixpoint round, so a caller can interleave chart
/// construction with other work and stop early.
#[derive(Debug, Clone)]
pub struct Chart<'g> {
    grammar: &'g Grammar,
    input: Vec<char>,
    /// `ranks[(A * (n + 1) + i) * (n + 1) + j]` is the round that proved `A =>* input[i..j]`.
    ranks: Vec<Option<u32>>,
    round: u32,
    complete: bool,
}

impl<'g> Chart<'g> {
    /// Allocates an empty chart, refusing inputs whose chart would exceed the grammar's
    /// cell limit.
    pub fn new(grammar: &'g Grammar, input: &str) -> Result<Self, DomainError> {
        let input: Vec<char> = input.chars().collect();
        let width = input.len() + 1;
        let cells = grammar
            .nonterminals
            .len()
            .saturating_mul(width)
            .saturating_mul(width);
        if cells > grammar.max_chart_cells {
            return Err(DomainError::ChartTooLarge {
                length: input.len(),
                cells,
                limit: grammar.max_chart_cells,
            });
        }

        Ok(Self {
            grammar,
            ranks: vec![None; cells],
            input,
            round: 0,
            complete: false,
        })
    }

    fn index(&self, nonterminal: usize, i: usize, j: usize) -> usize {
        let width = self.input.len() + 1;
        (nonterminal * width + i) * width + j
    }

    fn rank(&self, nonterminal: usize, i: usize, j: usize) -> Option<u32> {
        self.ranks[self.index(nonterminal, i, j)]
    }

    /// Whether the last round found nothing new.
    pub fn is_complete(&self) -> bool {
        self.complete
    }

    /// Number of rounds run so far.
    pub fn rounds(&self) -> u32 {
        self.round
    }

    /// Runs one round. Returns `false` once the chart has reached its fixpoint.
    pub fn advance(&mut self) -> bool {
        if self.complete {
            return false;
        }
        self.round += 1;

        let mut found = Vec::new();
        for production in &self.grammar.productions {
            for start in 0..=self.input.len() {
                for end in self.reach(&production.body, start, self.round) {
                    if self.rank(production.head, start, end).is_none() {
                        found.push(self.index(production.head, start, end));
                    }
                }
            }
        }

        found.sort_unstable();
        found.dedup();
        for &index in &found {
            self.ranks[index] = Some(self.round);
        }

        trace!(round = self.round, new_facts = found.len(), "chart round");

        if found.is_empty() {
            self.complete = true;
        }
        !self.complete
    }

    /// Runs rounds until the fixpoint.
    pub fn complete(&mut self) {
        while self.advance() {}
    }

    /// The end positions reachable by matching `body` from `start`, using facts ranked
    /// below `below`.
    fn reach(&self, body: &[Symbol], start: usize, below: u32) -> Vec<usize> {
        let n = self.input.len();
        let mut positions = vec![false; n + 1];
        positions[start] = true;

        for symbol in body {
            let mut next = vec![false; n + 1];
            for position in (0..=n).filter(|&p| positions[p]) {
                match *symbol {
                    Symbol::Terminal(c) => {
                        if self.input.get(position) == Some(&c) {
                            next[position + 1] = true;
                        }
                    }
                    Symbol::Nonterminal(index) => {
                        for end in position..=n {
                            if self.rank(index, position, end).is_some_and(|r| r < below) {
                                next[end] = true;
                            }
                        }
                    }
                }
            }
            positions = next;
        }

        (0..=n).filter(|&p| positions[p]).collect()
    }

    /// Whether the chart proves that `nonterminal` derives `input[i..j]`.
    pub fn derives(&self, nonterminal: &str, i: usize, j: usize) -> bool {
        let Some(index) = self.grammar.nonterminals.iter().position(|n| n == nonterminal) else {
            return false;
        };
        i <= j && j <= self.input.len() && self.rank(index, i, j).is_some()
    }

    /// Whether the start symbol derives the whole input, according to the facts found so far.
    pub fn accepts(&self) -> bool {
        self.rank(0, 0, self.input.len()).is_some()
    }

    /// Builds the parse tree for the whole input from the facts found so far.
    pub fn parse_tree(&self) -> Result<Option<TreeNode>, AutomatonError> {
        if !self.accepts() {
            return Ok(None);
        }
        self.build(0, 0, self.input.len(), 0).map(Some)
    }

    fn build(
        &self,
        head: usize,
        i: usize,
        j: usize,
        depth: usize,
    ) -> Result<TreeNode, AutomatonError> {
        if depth >= self.grammar.max_tree_depth {
            return Err(AutomatonError::InvariantViolation(format!(
                "grammar did not terminate: parse tree deeper than {}",
                self.grammar.max_tree_depth
            )));
        }
        let rank = self.rank(head, i, j).ok_or_else(|| {
            AutomatonError::InvariantViolation(format!(
                "no fact for {} over {i}..{j}",
                self.grammar.nonterminals[head]
            ))
        })?;

        let production = self
            .grammar
            .productions
            .iter()
            .filter(|p| p.head == head)
            .find_map(|p| self.split(&p.body, i, j, rank).map(|spans| (p, spans)));
        let Some((production, spans)) = production else {
            return Err(AutomatonError::InvariantViolation(format!(
                "no derivation of rank {rank} for {} over {i}..{j}",
                self.grammar.nonterminals[head]
            )));
        };

        let mut children = Vec::with_capacity(production.body.len().max(1));
        if production.body.is_empty() {
            children.push(TreeNode::leaf(EPSILON.to_string(), NodeKind::Epsilon));
        }
        for (symbol, (start, end)) in production.body.iter().zip(spans) {
            children.push(match *symbol {
                Symbol::Terminal(c) => TreeNode::leaf(c.to_string(), NodeKind::Terminal),
                Symbol::Nonterminal(index) => self.build(index, start, end, depth + 1)?,
            });
        }

        Ok(TreeNode {
            symbol: self.grammar.nonterminals[head].clone(),
            kind: NodeKind::Nonterminal,
            children,
        })
    }

    /// Finds the leftmost split of `input[start..end]` over `body` whose nonterminal parts
    /// all have a rank below `rank`.
    fn split(
        &self,
        body: &[Symbol],
        start: usize,
        end: usize,
        rank: u32,
    ) -> Option<Vec<(usize, usize)>> {
        let Some((first, rest)) = body.split_first() else {
            return (start == end).then(Vec::new);
        };

        let ends: Vec<usize> = match *first {
            Symbol::Terminal(c) => {
                if start < end && self.input[start] == c {
                    vec![start + 1]
                } else {
                    Vec::new()
                }
            }
            Symbol::Nonterminal(index) => (start..=end)
                .filter(|&mid| self.rank(index, start, mid).is_some_and(|r| r < rank))
                .collect(),
        };

        ends.into_iter().find_map(|mid| {
            let mut spans = self.split(rest, mid, end, rank)?;
            spans.insert(0, (start, mid));
            Some(spans)
        })
    }
}

impl fmt::Display for Grammar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for production in &self.productions {
            writeln!(f, "{}", self.display_production(production))?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn grammar(rules: &[(&str, &[&str])]) -> Grammar {
        GrammarDefinition {
            rules: rules
                .iter()
                .map(|(name, bodies)| {
                    (
                        name.to_string(),
                        bodies.iter().map(|b| b.to_string()).collect(),
                    )
                })
                .collect(),
        }
        .build()
        .unwrap()
    }

    fn balanced() -> Grammar {
        grammar(&[("S", &["(S)", "SS", ""])])
    }

    #[test]
    fn test_balanced_parentheses() {
        let g = balanced();

        assert!(g.accepts("(())").unwrap());
        assert!(g.accepts("()()").unwrap());
        assert!(g.accepts("").unwrap());
        assert!(!g.accepts("(()").unwrap());
        assert!(!g.accepts(")(").unwrap());
    }

    #[test]
    fn test_parse_tree_shape() {
        let tree = balanced().parse_tree("(())").unwrap().unwrap();

        assert_eq!(tree.depth(), 3);
        assert_eq!(tree.yield_string(), "(())");
        assert_eq!(tree.children.len(), 3);
        assert_eq!(tree.children[0].symbol, "(");
        assert_eq!(tree.children[1].children[1].children[0].kind, NodeKind::Epsilon);
    }

    #[test]
    fn test_leftmost_derivation() {
        let tree = balanced().parse_tree("()").unwrap().unwrap();

        assert_eq!(tree.leftmost_derivation(), vec!["S", "(S)", "()"]);

        let empty = balanced().parse_tree("").unwrap().unwrap();
        assert_eq!(empty.leftmost_derivation(), vec!["S", "ε"]);
    }

    #[test]
    fn test_left_recursion_and_unit_cycles() {
        let g = grammar(&[("E", &["E+T", "T"]), ("T", &["E", "a"])]);

        assert!(g.accepts("a+a+a").unwrap());
        assert!(!g.accepts("a+").unwrap());

        let tree = g.parse_tree("a+a").unwrap().unwrap();
        assert_eq!(tree.yield_string(), "a+a");
    }

    #[test]
    fn test_longest_nonterminal_match() {
        let g = grammar(&[("A", &["AB", "x"]), ("AB", &["y"])]);

        assert_eq!(g.productions()[0].body, vec![Symbol::Nonterminal(1)]);
        assert!(g.accepts("y").unwrap());
        assert!(!g.accepts("xy").unwrap());
    }

    #[test]
    fn test_chart_advance_rounds() {
        let g = balanced();
        let mut chart = g.chart("(())").unwrap();

        assert!(chart.advance());
        assert!(chart.derives("S", 2, 2));
        assert!(!chart.accepts());

        chart.complete();
        assert!(chart.is_complete());
        assert!(chart.accepts());
        assert!(chart.derives("S", 1, 3));
        assert!(!chart.advance());
    }

    #[test]
    fn test_depth_ceiling() {
        let g = balanced().with_max_tree_depth(2);

        assert!(matches!(
            g.parse_tree("(())"),
            Err(AutomatonError::InvariantViolation(message)) if message.contains("did not terminate")
        ));
        assert!(g.accepts("()").unwrap());
    }

    #[test]
    fn test_chart_size_limit() {
        // One nonterminal and 9 positions: 81 cells.
        let g = balanced().with_max_chart_cells(80);

        assert_eq!(
            g.accepts("(())(())").unwrap_err(),
            AutomatonError::Domain(DomainError::ChartTooLarge {
                length: 8,
                cells: 81,
                limit: 80
            })
        );
        assert!(g.accepts("(())()()").is_err());
        assert!(g.accepts("(())()").unwrap());
    }

    #[test]
    fn test_trace_of_rejected_input() {
        let trace = balanced().trace("(()").unwrap();

        assert!(!trace.accepted);
        assert!(trace.tree.is_none());
        assert!(trace.derivation.is_empty());
    }

    #[test]
    fn test_analysis_helpers() {
        let g = grammar(&[("S", &["a", "B"]), ("B", &["bB"]), ("C", &["c"])]);

        assert_eq!(g.unreachable_nonterminals(), vec!["C"]);
        assert_eq!(g.unproductive_nonterminals(), vec!["B"]);
        assert_eq!(g.terminals(), vec!['a', 'b', 'c']);
    }

    #[test]
    fn test_duplicate_nonterminal() {
        let error = GrammarDefinition {
            rules: vec![
                ("S".into(), vec!["a".into()]),
                ("S".into(), vec!["b".into()]),
            ],
        }
        .build()
        .unwrap_err();

        assert!(error.message.contains("duplicate nonterminal 'S'"));
    }
}
