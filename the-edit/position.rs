use std::fmt;

use the_core::chars::char_is_line_ending;

/// A single point in a text buffer.
///
/// Both `line` and `column` are 1-based. A column counts chars from the start
/// of the line, so the position after the last char of a line of length `n` is
/// column `n + 1`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Position {
  pub line:   usize,
  pub column: usize,
}

impl Default for Position {
  fn default() -> Self {
    Self::new(1, 1)
  }
}

impl Position {
  pub const fn new(line: usize, column: usize) -> Self {
    Self { line, column }
  }

  #[inline]
  pub fn is_before(&self, other: &Position) -> bool {
    self < other
  }

  #[inline]
  pub fn is_before_or_equal(&self, other: &Position) -> bool {
    self <= other
  }

  #[must_use]
  pub const fn with_line(self, line: usize) -> Self {
    Self { line, ..self }
  }

  #[must_use]
  pub const fn with_column(self, column: usize) -> Self {
    Self { column, ..self }
  }

  /// Shifts the position by signed deltas, never going below line 1 /
  /// column 1.
  #[must_use]
  pub fn delta(self, line_delta: isize, column_delta: isize) -> Self {
    Self {
      line:   self.line.saturating_add_signed(line_delta).max(1),
      column: self.column.saturating_add_signed(column_delta).max(1),
    }
  }

  /// The position reached after inserting `text` at this position.
  #[must_use]
  pub fn traverse(self, text: impl AsRef<str>) -> Self {
    let Self {
      mut line,
      mut column,
    } = self;
    let mut chars = text.as_ref().chars().peekable();

    while let Some(ch) = chars.next() {
      if char_is_line_ending(ch) && !(ch == '\r' && chars.peek() == Some(&'\n')) {
        line += 1;
        column = 1;
      } else if ch != '\r' || chars.peek() != Some(&'\n') {
        column += 1;
      }
    }

    Self { line, column }
  }
}

impl From<(usize, usize)> for Position {
  fn from(value: (usize, usize)) -> Self {
    Position::new(value.0, value.1)
  }
}

impl fmt::Display for Position {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "({},{})", self.line, self.column)
  }
}
