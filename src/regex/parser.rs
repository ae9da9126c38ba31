//! Tokenizer and recursive descent parser for regex patterns.

use std::collections::HashMap;
use std::iter::Peekable;
use std::rc::Rc;
use std::vec::IntoIter;

use super::ast::Expr;

/// An error inside one pattern, at a character offset of that pattern.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct PatternError {
    pub(crate) message: String,
    pub(crate) offset: usize,
}

impl PatternError {
    fn new(message: impl Into<String>, offset: usize) -> Self {
        Self {
            message: message.into(),
            offset,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum TokenKind {
    LeftParen,
    RightParen,
    Bar,
    Star,
    Symbol(char),
    Name(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Token {
    pub(crate) kind: TokenKind,
    pub(crate) offset: usize,
}

/// Splits a pattern into tokens. Whitespace is skipped, `\` escapes the next character, and
/// names are matched greedily, the longest of `names` that fits winning.
pub(crate) fn tokenize(pattern: &str, names: &[&str]) -> Result<Vec<Token>, PatternError> {
    let chars: Vec<char> = pattern.chars().collect();
    let mut tokens = Vec::new();
    let mut offset = 0;

    while offset < chars.len() {
        let start = offset;
        let kind = match chars[offset] {
            c if c.is_whitespace() => {
                offset += 1;
                continue;
            }
            '(' => TokenKind::LeftParen,
            ')' => TokenKind::RightParen,
            '|' => TokenKind::Bar,
            '*' => TokenKind::Star,
            '\\' => {
                offset += 1;
                match chars.get(offset) {
                    Some(&escaped) => TokenKind::Symbol(escaped),
                    None => return Err(PatternError::new("dangling escape '\\'", start)),
                }
            }
            symbol => match longest_name(&chars[offset..], names) {
                Some(name) => {
                    offset += name.chars().count() - 1;
                    TokenKind::Name(name.to_string())
                }
                None => TokenKind::Symbol(symbol),
            },
        };
        offset += 1;
        tokens.push(Token {
            kind,
            offset: start,
        });
    }

    Ok(tokens)
}

fn longest_name<'a>(rest: &[char], names: &[&'a str]) -> Option<&'a str> {
    names
        .iter()
        .filter(|name| {
            let len = name.chars().count();
            len > 0 && rest.len() >= len && name.chars().zip(rest).all(|(a, &b)| a == b)
        })
        .max_by_key(|name| name.chars().count())
        .copied()
}

/// Recursive descent parser over a token stream. References are looked up in `scope`, which
/// holds the bindings defined so far.
pub(crate) struct Parser<'a> {
    tokens: Peekable<IntoIter<Token>>,
    scope: &'a HashMap<String, Rc<Expr>>,
    end: usize,
}

impl<'a> Parser<'a> {
    pub(crate) fn new(tokens: Vec<Token>, scope: &'a HashMap<String, Rc<Expr>>, end: usize) -> Self {
        Self {
            tokens: tokens.into_iter().peekable(),
            scope,
            end,
        }
    }

    /// Parses the whole token stream into one expression.
    pub(crate) fn parse(mut self) -> Result<Expr, PatternError> {
        let expr = self.union()?;
        match self.tokens.next() {
            None => Ok(expr),
            Some(Token {
                kind: TokenKind::RightParen,
                offset,
            }) => Err(PatternError::new("unmatched ')'", offset)),
            Some(token) => Err(PatternError::new("unexpected token", token.offset)),
        }
    }

    /// Rule: `union ::= concat ("|" concat)*`
    fn union(&mut self) -> Result<Expr, PatternError> {
        let mut branches = vec![self.concat()?];
        while self.next_if(&TokenKind::Bar).is_some() {
            branches.push(self.concat()?);
        }

        Ok(if branches.len() == 1 {
            branches.remove(0)
        } else {
            Expr::Union(branches)
        })
    }

    /// Rule: `concat ::= repeat*`
    fn concat(&mut self) -> Result<Expr, PatternError> {
        let mut items = Vec::new();
        while let Some(token) = self.tokens.peek() {
            if matches!(token.kind, TokenKind::Bar | TokenKind::RightParen) {
                break;
            }
            items.push(self.repeat()?);
        }

        Ok(match items.len() {
            0 => Expr::Empty,
            1 => items.remove(0),
            _ => Expr::Concat(items),
        })
    }

    /// Rule: `repeat ::= atom "*"*`
    fn repeat(&mut self) -> Result<Expr, PatternError> {
        let mut expr = self.atom()?;
        while self.next_if(&TokenKind::Star).is_some() {
            expr = Expr::Star(Box::new(expr));
        }
        Ok(expr)
    }

    /// Rule: `atom ::= SYMBOL | NAME | "(" union ")"`
    fn atom(&mut self) -> Result<Expr, PatternError> {
        let Some(token) = self.tokens.next() else {
            return Err(PatternError::new("unexpected end of pattern", self.end));
        };

        match token.kind {
            TokenKind::Symbol(symbol) => Ok(Expr::Literal(symbol)),
            TokenKind::Name(name) => match self.scope.get(&name) {
                Some(expr) => Ok(Expr::Reference(name, Rc::clone(expr))),
                None => Err(PatternError::new(
                    format!("'{name}' used before its definition"),
                    token.offset,
                )),
            },
            TokenKind::LeftParen => {
                let inner = self.union()?;
                match self.next_if(&TokenKind::RightParen) {
                    Some(_) => Ok(inner),
                    None => Err(PatternError::new("unmatched '('", token.offset)),
                }
            }
            TokenKind::Star => Err(PatternError::new("'*' has nothing to repeat", token.offset)),
            TokenKind::Bar | TokenKind::RightParen => {
                Err(PatternError::new("unexpected token", token.offset))
            }
        }
    }

    fn next_if(&mut self, kind: &TokenKind) -> Option<Token> {
        self.tokens.next_if(|token| &token.kind == kind)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(pattern: &str) -> Result<Expr, PatternError> {
        let scope = HashMap::new();
        let tokens = tokenize(pattern, &[])?;
        Parser::new(tokens, &scope, pattern.chars().count()).parse()
    }

    #[test]
    fn test_tokenize_longest_name() {
        let tokens = tokenize("AB A x", &["A", "AB"]).unwrap();
        let kinds: Vec<_> = tokens.into_iter().map(|t| t.kind).collect();

        assert_eq!(
            kinds,
            vec![
                TokenKind::Name("AB".into()),
                TokenKind::Name("A".into()),
                TokenKind::Symbol('x'),
            ]
        );
    }

    #[test]
    fn test_escape() {
        let tokens = tokenize("\\(\\ ", &[]).unwrap();
        let kinds: Vec<_> = tokens.into_iter().map(|t| t.kind).collect();

        assert_eq!(kinds, vec![TokenKind::Symbol('('), TokenKind::Symbol(' ')]);
        assert!(tokenize("a\\", &[]).is_err());
    }

    #[test]
    fn test_precedence() {
        let expr = parse("ab*|c").unwrap();

        assert_eq!(
            expr,
            Expr::Union(vec![
                Expr::Concat(vec![
                    Expr::Literal('a'),
                    Expr::Star(Box::new(Expr::Literal('b'))),
                ]),
                Expr::Literal('c'),
            ])
        );
    }

    #[test]
    fn test_empty_alternatives() {
        assert_eq!(parse("").unwrap(), Expr::Empty);
        assert_eq!(parse("()").unwrap(), Expr::Empty);
        assert_eq!(
            parse("a|").unwrap(),
            Expr::Union(vec![Expr::Literal('a'), Expr::Empty])
        );
    }

    #[test]
    fn test_errors() {
        assert_eq!(
            parse("(ab").unwrap_err(),
            PatternError::new("unmatched '('", 0)
        );
        assert_eq!(
            parse("a)b").unwrap_err(),
            PatternError::new("unmatched ')'", 1)
        );
        assert_eq!(
            parse("a|*").unwrap_err(),
            PatternError::new("'*' has nothing to repeat", 2)
        );
    }

    #[test]
    fn test_unknown_reference() {
        let scope = HashMap::new();
        let tokens = tokenize("x Later", &["Later"]).unwrap();
        let error = Parser::new(tokens, &scope, 7).parse().unwrap_err();

        assert_eq!(error.message, "'Later' used before its definition");
        assert_eq!(error.offset, 2);
    }
}
