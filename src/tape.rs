//! Two-way infinite Turing Machine tape and the machine configuration built on it.

use serde::Serialize;
use std::collections::VecDeque;
use std::fmt;

/// A tape that grows with blanks in both directions.
///
/// Only the cells that were ever touched are stored; `origin` is the position of the first
/// stored cell. Two tapes are equal when they hold the same symbols at the same positions,
/// regardless of how many blank cells each one stores.
#[derive(Debug, Clone, Eq, Serialize)]
pub struct Tape {
    cells: VecDeque<char>,
    origin: i64,
    blank: char,
}

impl Tape {
    /// Creates a tape holding `input` from position 0.
    pub fn new(input: impl IntoIterator<Item = char>, blank: char) -> Self {
        Self {
            cells: input.into_iter().collect(),
            origin: 0,
            blank,
        }
    }

    pub fn blank(&self) -> char {
        self.blank
    }

    /// Returns the symbol at `position`; unstored cells are blank.
    pub fn read(&self, position: i64) -> char {
        self.offset(position)
            .and_then(|index| self.cells.get(index))
            .copied()
            .unwrap_or(self.blank)
    }

    /// Writes `symbol` at `position`, extending the stored range with blanks as needed.
    pub fn write(&mut self, position: i64, symbol: char) {
        self.extend_to(position);
        if let Some(cell) = self
            .offset(position)
            .and_then(|index| self.cells.get_mut(index))
        {
            *cell = symbol;
        }
    }

    /// Makes sure `position` is inside the stored range.
    pub fn extend_to(&mut self, position: i64) {
        while position < self.origin {
            self.cells.push_front(self.blank);
            self.origin -= 1;
        }
        while position >= self.origin + self.cells.len() as i64 {
            self.cells.push_back(self.blank);
        }
    }

    fn offset(&self, position: i64) -> Option<usize> {
        usize::try_from(position - self.origin).ok()
    }

    /// The stored range as `(first, last + 1)` positions.
    pub fn bounds(&self) -> (i64, i64) {
        (self.origin, self.origin + self.cells.len() as i64)
    }

    /// The non-blank region: the position of its first symbol and its symbols.
    fn trimmed(&self) -> (i64, Vec<char>) {
        let first = self.cells.iter().position(|&c| c != self.blank);
        let last = self.cells.iter().rposition(|&c| c != self.blank);
        match (first, last) {
            (Some(first), Some(last)) => (
                self.origin + first as i64,
                self.cells.range(first..=last).copied().collect(),
            ),
            _ => (0, Vec::new()),
        }
    }

    /// The tape contents without leading and trailing blanks.
    pub fn contents(&self) -> String {
        self.trimmed().1.into_iter().collect()
    }
}

impl PartialEq for Tape {
    fn eq(&self, other: &Self) -> bool {
        self.blank == other.blank && self.trimmed() == other.trimmed()
    }
}

/// A Turing Machine configuration: current state, tape, and head position.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Configuration {
    pub state: String,
    pub tape: Tape,
    pub head: i64,
}

impl Configuration {
    pub fn new(state: impl Into<String>, tape: Tape) -> Self {
        Self {
            state: state.into(),
            tape,
            head: 0,
        }
    }

    /// The symbol under the head.
    pub fn symbol(&self) -> char {
        self.tape.read(self.head)
    }

    /// Tape contents with leading and trailing blanks trimmed.
    pub fn output_string(&self) -> String {
        self.tape.contents()
    }
}

impl fmt::Display for Configuration {
    /// Renders the stored tape with the head cell in brackets, e.g. `q1: 0[1]_`.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let (start, end) = self.tape.bounds();
        write!(f, "{}: ", self.state)?;
        for position in start.min(self.head)..end.max(self.head + 1) {
            let symbol = self.tape.read(position);
            if position == self.head {
                write!(f, "[{symbol}]")?;
            } else {
                write!(f, "{symbol}")?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_read_write_both_directions() {
        let mut tape = Tape::new("01".chars(), '_');

        assert_eq!(tape.read(-3), '_');
        assert_eq!(tape.read(1), '1');

        tape.write(-2, 'x');
        tape.write(4, 'y');

        assert_eq!(tape.bounds(), (-2, 5));
        assert_eq!(tape.read(-2), 'x');
        assert_eq!(tape.read(-1), '_');
        assert_eq!(tape.contents(), "x_01__y");
    }

    #[test]
    fn test_equality_ignores_blank_padding() {
        let plain = Tape::new("ab".chars(), '_');
        let mut padded = Tape::new("ab".chars(), '_');
        padded.extend_to(-5);
        padded.extend_to(9);

        assert_eq!(plain, padded);

        padded.write(3, 'c');
        assert_ne!(plain, padded);
    }

    #[test]
    fn test_output_string_trims_blanks() {
        let mut config = Configuration::new("q0", Tape::new("__1_0__".chars(), '_'));
        assert_eq!(config.output_string(), "1_0");

        config.tape = Tape::new(std::iter::empty(), '_');
        assert_eq!(config.output_string(), "");
    }

    #[test]
    fn test_display_marks_head() {
        let mut config = Configuration::new("q1", Tape::new("01".chars(), '_'));
        config.head = 2;

        assert_eq!(config.to_string(), "q1: 01[_]");
    }
}
