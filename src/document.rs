//! This module turns the YAML-like source text into a tree of `Node`s.
//!
//! The `pest` grammar recognizes individual lines and flow collections; nesting of block
//! mappings and sequences is rebuilt here from the indentation of each line.

use pest::{iterators::Pair, Parser as PestParser};
use std::collections::VecDeque;

use crate::parser::{AutomatonParser, Rule};
use crate::types::{Location, ParseError, MAX_PROGRAM_SIZE};

/// The value held by a `Node`.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// A key without a value, or an empty document.
    Null,
    Scalar(String),
    Sequence(Vec<Node>),
    Mapping(Vec<Entry>),
}

/// A value together with where it starts in the source.
#[derive(Debug, Clone, PartialEq)]
pub struct Node {
    pub value: Value,
    pub location: Location,
}

/// A `key: value` pair of a mapping.
#[derive(Debug, Clone, PartialEq)]
pub struct Entry {
    pub key: String,
    pub location: Location,
    pub value: Node,
}

impl Node {
    fn new(value: Value, location: Location) -> Self {
        Self { value, location }
    }

    /// Builds an error located at this node.
    pub fn error(&self, field: &str, message: impl Into<String>) -> ParseError {
        ParseError::at(field, message).with_location(self.location.line, self.location.column)
    }

    pub fn is_null(&self) -> bool {
        matches!(self.value, Value::Null)
    }

    fn describe(&self) -> &'static str {
        match self.value {
            Value::Null => "nothing",
            Value::Scalar(_) => "a scalar",
            Value::Sequence(_) => "a list",
            Value::Mapping(_) => "a mapping",
        }
    }

    pub fn as_mapping(&self, field: &str) -> Result<&[Entry], ParseError> {
        match &self.value {
            Value::Mapping(entries) => Ok(entries),
            _ => Err(self.error(field, format!("expected a mapping, found {}", self.describe()))),
        }
    }

    pub fn as_scalar(&self, field: &str) -> Result<&str, ParseError> {
        match &self.value {
            Value::Scalar(text) => Ok(text),
            _ => Err(self.error(field, format!("expected a scalar, found {}", self.describe()))),
        }
    }

    /// Reads a list. A lone scalar counts as a one-element list and a missing value as an
    /// empty one.
    pub fn as_list(&self, field: &str) -> Result<Vec<&Node>, ParseError> {
        match &self.value {
            Value::Sequence(items) => Ok(items.iter().collect()),
            Value::Scalar(_) => Ok(vec![self]),
            Value::Null => Ok(Vec::new()),
            Value::Mapping(_) => Err(self.error(field, "expected a list, found a mapping")),
        }
    }
}

/// Parses a complete YAML-like document.
pub fn parse_document(input: &str) -> Result<Node, ParseError> {
    if input.len() > MAX_PROGRAM_SIZE {
        return Err(ParseError::new(format!(
            "document is larger than {MAX_PROGRAM_SIZE} bytes"
        )));
    }

    let root = AutomatonParser::parse(Rule::document, input)
        .map_err(ParseError::from)?
        .next()
        .ok_or_else(|| ParseError::new("empty parse result"))?;

    let mut lines = Vec::new();
    for pair in root.into_inner() {
        if pair.as_rule() == Rule::line {
            if let Some(line) = parse_line(pair)? {
                lines.push(line);
            }
        }
    }

    let mut builder = Builder {
        lines: lines.into(),
    };
    let Some(indent) = builder.peek().map(|line| line.indent) else {
        return Ok(Node::new(Value::Null, Location { line: 1, column: 1 }));
    };

    let node = builder.block(indent)?;
    if let Some(line) = builder.peek() {
        return Err(ParseError::new("inconsistent indentation")
            .with_location(line.location.line, line.location.column));
    }

    Ok(node)
}

/// One non-blank source line.
struct Line {
    indent: usize,
    location: Location,
    content: Content,
}

enum Content {
    Entry(String, Location, Option<Node>),
    Item(Option<ItemContent>),
}

enum ItemContent {
    Entry(String, Location, Option<Node>),
    Value(Node),
}

impl Line {
    fn is_item(&self) -> bool {
        matches!(self.content, Content::Item(_))
    }
}

fn location(pair: &Pair<Rule>) -> Location {
    let (line, column) = pair.as_span().start_pos().line_col();
    Location { line, column }
}

fn parse_line(pair: Pair<Rule>) -> Result<Option<Line>, ParseError> {
    let mut pairs = pair.into_inner();
    let Some(indent) = pairs.next() else {
        return Ok(None);
    };
    let indent_width = indent.as_str().len();

    let Some(body) = pairs.next() else {
        return Ok(None);
    };
    let line_location = location(&body);

    let content = match body.as_rule() {
        Rule::entry => {
            let (key, key_location, value) = parse_entry(body)?;
            Content::Entry(key, key_location, value)
        }
        Rule::sequence_item => match body.into_inner().next() {
            None => Content::Item(None),
            Some(inner) if inner.as_rule() == Rule::entry => {
                let (key, key_location, value) = parse_entry(inner)?;
                Content::Item(Some(ItemContent::Entry(key, key_location, value)))
            }
            Some(inner) => Content::Item(Some(ItemContent::Value(parse_value(inner)?))),
        },
        _ => return Ok(None),
    };

    Ok(Some(Line {
        indent: indent_width,
        location: line_location,
        content,
    }))
}

fn parse_entry(pair: Pair<Rule>) -> Result<(String, Location, Option<Node>), ParseError> {
    let mut pairs = pair.into_inner();
    let key = pairs
        .next()
        .ok_or_else(|| ParseError::new("entry without a key"))?;
    let key_location = location(&key);
    let key = scalar_text(key);
    let value = pairs.next().map(parse_value).transpose()?;

    Ok((key, key_location, value))
}

fn parse_value(pair: Pair<Rule>) -> Result<Node, ParseError> {
    let at = location(&pair);
    let value = match pair.as_rule() {
        Rule::flow_sequence => Value::Sequence(
            pair.into_inner()
                .map(parse_value)
                .collect::<Result<_, _>>()?,
        ),
        Rule::flow_mapping => {
            let mut entries = Vec::new();
            for flow_pair in pair.into_inner() {
                let (key, key_location, value) = parse_entry(flow_pair)?;
                let value = value.ok_or_else(|| {
                    ParseError::new(format!("missing value for key '{key}'"))
                        .with_location(key_location.line, key_location.column)
                })?;
                push_entry(
                    &mut entries,
                    Entry {
                        key,
                        location: key_location,
                        value,
                    },
                )?;
            }
            Value::Mapping(entries)
        }
        _ => Value::Scalar(scalar_text(pair)),
    };

    Ok(Node::new(value, at))
}

/// Extracts the text of a `scalar` pair, unescaping quoted forms.
fn scalar_text(pair: Pair<Rule>) -> String {
    let Some(inner) = pair.clone().into_inner().next() else {
        return pair.as_str().to_string();
    };

    match inner.as_rule() {
        Rule::single_quoted => inner.as_str()[1..inner.as_str().len() - 1].replace("''", "'"),
        Rule::double_quoted => unescape(&inner.as_str()[1..inner.as_str().len() - 1]),
        _ => inner.as_str().to_string(),
    }
}

fn unescape(text: &str) -> String {
    let mut result = String::with_capacity(text.len());
    let mut chars = text.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            result.push(c);
            continue;
        }
        match chars.next() {
            Some('n') => result.push('\n'),
            Some('t') => result.push('\t'),
            Some(other) => result.push(other),
            None => result.push('\\'),
        }
    }
    result
}

/// Appends an entry, refusing a key that is already present.
fn push_entry(entries: &mut Vec<Entry>, entry: Entry) -> Result<(), ParseError> {
    if entries.iter().any(|e| e.key == entry.key) {
        return Err(ParseError::new(format!("duplicate key '{}'", entry.key))
            .with_location(entry.location.line, entry.location.column));
    }
    entries.push(entry);
    Ok(())
}

/// Rebuilds block structure from indented lines.
struct Builder {
    lines: VecDeque<Line>,
}

impl Builder {
    fn peek(&self) -> Option<&Line> {
        self.lines.front()
    }

    fn next_line(&mut self) -> Option<Line> {
        self.lines.pop_front()
    }

    fn block(&mut self, indent: usize) -> Result<Node, ParseError> {
        match self.peek() {
            Some(line) if line.is_item() => self.sequence(indent),
            Some(line) => {
                let at = line.location;
                self.mapping(indent, Vec::new(), at)
            }
            None => Ok(Node::new(Value::Null, Location { line: 1, column: 1 })),
        }
    }

    fn mapping(
        &mut self,
        indent: usize,
        mut entries: Vec<Entry>,
        at: Location,
    ) -> Result<Node, ParseError> {
        while let Some(line) = self.peek() {
            if line.indent != indent || line.is_item() {
                break;
            }
            let Some(Line {
                content: Content::Entry(key, key_location, inline),
                ..
            }) = self.next_line()
            else {
                break;
            };
            let value = self.entry_value(inline, indent, key_location)?;
            push_entry(
                &mut entries,
                Entry {
                    key,
                    location: key_location,
                    value,
                },
            )?;
        }

        Ok(Node::new(Value::Mapping(entries), at))
    }

    fn sequence(&mut self, indent: usize) -> Result<Node, ParseError> {
        let at = self
            .peek()
            .map(|line| line.location)
            .unwrap_or(Location { line: 1, column: 1 });
        let mut items = Vec::new();

        while let Some(line) = self.peek() {
            if line.indent != indent || !line.is_item() {
                break;
            }
            let Some(Line {
                content: Content::Item(item),
                location: item_location,
                ..
            }) = self.next_line()
            else {
                break;
            };

            let node = match item {
                Some(ItemContent::Value(node)) => node,
                Some(ItemContent::Entry(key, key_location, inline)) => {
                    // `- key: value` opens a mapping aligned on the key column.
                    let entry_indent = key_location.column - 1;
                    let value = self.entry_value(inline, entry_indent, key_location)?;
                    let first = Entry {
                        key,
                        location: key_location,
                        value,
                    };
                    self.mapping(entry_indent, vec![first], key_location)?
                }
                None => match self.peek() {
                    Some(next) if next.indent > indent => {
                        let nested = next.indent;
                        self.block(nested)?
                    }
                    _ => Node::new(Value::Null, item_location),
                },
            };
            items.push(node);
        }

        Ok(Node::new(Value::Sequence(items), at))
    }

    fn entry_value(
        &mut self,
        inline: Option<Node>,
        indent: usize,
        at: Location,
    ) -> Result<Node, ParseError> {
        if let Some(node) = inline {
            return Ok(node);
        }

        match self.peek() {
            Some(next) if next.indent > indent || (next.indent == indent && next.is_item()) => {
                let nested = next.indent;
                self.block(nested)
            }
            _ => Ok(Node::new(Value::Null, at)),
        }
    }
}
