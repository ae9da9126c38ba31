//! Resolved regex syntax tree.
//!
//! # Grammar
//!
//! ```ebnf
//!     union  ::= concat ("|" concat)*;
//!     concat ::= repeat*;
//!     repeat ::= atom "*"*;
//!     atom   ::= SYMBOL | NAME | "(" union ")";
//! ```

use std::fmt;
use std::rc::Rc;

/// Characters with a meaning of their own inside a pattern.
pub(crate) const SPECIAL: [char; 5] = ['(', ')', '|', '*', '\\'];

/// A regular expression with every named reference already resolved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Expr {
    /// Matches only the empty string (an empty alternative or `()`).
    Empty,
    /// Matches one symbol.
    Literal(char),
    /// A named sub-expression, shared between all places that reference it.
    Reference(String, Rc<Expr>),
    Concat(Vec<Expr>),
    Union(Vec<Expr>),
    Star(Box<Expr>),
}

impl Expr {
    /// Every symbol the expression can consume, in first-seen order.
    pub fn symbols(&self) -> Vec<char> {
        let mut symbols = Vec::new();
        self.collect_symbols(&mut symbols);
        symbols
    }

    fn collect_symbols(&self, symbols: &mut Vec<char>) {
        match self {
            Expr::Empty => {}
            Expr::Literal(symbol) => {
                if !symbols.contains(symbol) {
                    symbols.push(*symbol);
                }
            }
            Expr::Reference(_, expr) => expr.collect_symbols(symbols),
            Expr::Concat(items) | Expr::Union(items) => {
                items.iter().for_each(|item| item.collect_symbols(symbols))
            }
            Expr::Star(expr) => expr.collect_symbols(symbols),
        }
    }

    fn is_reference(&self) -> bool {
        matches!(self, Expr::Reference(..))
    }
}

impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expr::Empty => write!(f, "()"),
            Expr::Literal(symbol) if SPECIAL.contains(symbol) || symbol.is_whitespace() => {
                write!(f, "\\{symbol}")
            }
            Expr::Literal(symbol) => write!(f, "{symbol}"),
            Expr::Reference(name, _) => write!(f, "{name}"),
            Expr::Concat(items) => {
                for (index, item) in items.iter().enumerate() {
                    if index > 0 && (item.is_reference() || items[index - 1].is_reference()) {
                        write!(f, " ")?;
                    }
                    match item {
                        Expr::Union(_) => write!(f, "({item})")?,
                        _ => write!(f, "{item}")?,
                    }
                }
                Ok(())
            }
            Expr::Union(items) => {
                for (index, item) in items.iter().enumerate() {
                    if index > 0 {
                        write!(f, "|")?;
                    }
                    write!(f, "{item}")?;
                }
                Ok(())
            }
            Expr::Star(expr) => match expr.as_ref() {
                Expr::Concat(_) | Expr::Union(_) => write!(f, "({expr})*"),
                _ => write!(f, "{expr}*"),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display() {
        let bits = Rc::new(Expr::Star(Box::new(Expr::Union(vec![
            Expr::Literal('0'),
            Expr::Literal('1'),
        ]))));
        let expr = Expr::Concat(vec![
            Expr::Reference("B".into(), bits.clone()),
            Expr::Literal('0'),
            Expr::Literal('1'),
            Expr::Reference("B".into(), bits),
        ]);

        assert_eq!(expr.to_string(), "B 01 B");
        assert_eq!(
            Expr::Star(Box::new(Expr::Literal('*'))).to_string(),
            "\\**"
        );
        assert_eq!(expr.symbols(), vec!['0', '1']);
    }
}
