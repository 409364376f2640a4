use std::fmt;

use crate::position::Position;

/// An ordered pair of positions. `start <= end` always holds; an empty range
/// is a collapsed caret.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Range {
  start: Position,
  end:   Position,
}

impl Range {
  /// Builds a range from two positions in any order.
  pub fn new(a: Position, b: Position) -> Self {
    if b < a {
      Self { start: b, end: a }
    } else {
      Self { start: a, end: b }
    }
  }

  pub fn from_coords(
    start_line: usize,
    start_column: usize,
    end_line: usize,
    end_column: usize,
  ) -> Self {
    Self::new(
      Position::new(start_line, start_column),
      Position::new(end_line, end_column),
    )
  }

  #[inline]
  pub fn empty(position: Position) -> Self {
    Self {
      start: position,
      end:   position,
    }
  }

  #[inline]
  pub fn start(&self) -> Position {
    self.start
  }

  #[inline]
  pub fn end(&self) -> Position {
    self.end
  }

  #[inline]
  #[must_use]
  pub fn is_empty(&self) -> bool {
    self.start == self.end
  }

  #[inline]
  pub fn is_single_line(&self) -> bool {
    self.start.line == self.end.line
  }

  /// Whether `position` lies inside the range, both ends included.
  pub fn contains_position(&self, position: Position) -> bool {
    self.start <= position && position <= self.end
  }

  pub fn contains_range(&self, other: &Range) -> bool {
    self.start <= other.start && other.end <= self.end
  }

  /// Whether the two ranges share at least one position.
  pub fn intersects(&self, other: &Range) -> bool {
    self.start <= other.end && other.start <= self.end
  }

  /// Smallest range covering both ranges.
  #[must_use]
  pub fn union(&self, other: &Range) -> Range {
    Range {
      start: self.start.min(other.start),
      end:   self.end.max(other.end),
    }
  }

  /// Range from the start of `self` to the end of `other`.
  #[must_use]
  pub fn plus_range(&self, other: &Range) -> Range {
    Range::new(self.start, other.end)
  }

  #[must_use]
  pub fn collapse_to_start(&self) -> Range {
    Range::empty(self.start)
  }

  #[must_use]
  pub fn collapse_to_end(&self) -> Range {
    Range::empty(self.end)
  }
}

impl From<Position> for Range {
  fn from(position: Position) -> Self {
    Range::empty(position)
  }
}

impl fmt::Display for Range {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "[{} -> {}]", self.start, self.end)
  }
}

#[cfg(test)]
mod test {
  use super::*;

  #[test]
  fn new_orders_endpoints() {
    let range = Range::from_coords(3, 1, 1, 5);
    assert_eq!(range.start(), Position::new(1, 5));
    assert_eq!(range.end(), Position::new(3, 1));
    assert!(!range.is_empty());
    assert!(Range::empty(Position::new(2, 2)).is_empty());
  }

  #[test]
  fn sorts_by_start_then_end() {
    let mut ranges = vec![
      Range::from_coords(2, 1, 2, 3),
      Range::from_coords(1, 4, 1, 6),
      Range::from_coords(1, 4, 1, 5),
    ];
    ranges.sort();
    assert_eq!(ranges, vec![
      Range::from_coords(1, 4, 1, 5),
      Range::from_coords(1, 4, 1, 6),
      Range::from_coords(2, 1, 2, 3),
    ]);
  }

  #[test]
  fn containment_and_intersection() {
    let outer = Range::from_coords(1, 1, 3, 1);
    let inner = Range::from_coords(2, 1, 2, 4);
    assert!(outer.contains_range(&inner));
    assert!(outer.contains_position(Position::new(3, 1)));
    assert!(!outer.contains_position(Position::new(3, 2)));
    assert!(outer.intersects(&Range::from_coords(3, 1, 4, 1)));
    assert!(!inner.intersects(&Range::from_coords(2, 5, 2, 6)));
    assert_eq!(inner.union(&outer), outer);
  }
}
