//! Directed selections.
//!
//! A [`Selection`] has two positions: `anchor` and `active`. The `active` end
//! is where the caret is drawn, the `anchor` is the other end. When
//! `anchor == active` the selection is a collapsed caret.
//!
//! ```text
//! anchor=(1,3), active=(1,8): "he[llo w]orld"  (left to right)
//! anchor=(1,8), active=(1,3): "he]llo w[orld"  (right to left)
//! ```
//!
//! The [`Selection::range`] method returns the bounds regardless of direction,
//! while [`Selection::direction`] tells which way the selection extends.

use std::fmt;

use crate::{
  position::Position,
  range::Range,
};

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum SelectionDirection {
  /// The active end is at the range end.
  Ltr,
  /// The active end is at the range start.
  Rtl,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Selection {
  pub anchor: Position,
  pub active: Position,
}

impl Selection {
  pub const fn new(anchor: Position, active: Position) -> Self {
    Self { anchor, active }
  }

  #[inline]
  pub const fn caret(position: Position) -> Self {
    Self::new(position, position)
  }

  pub fn from_coords(
    anchor_line: usize,
    anchor_column: usize,
    active_line: usize,
    active_column: usize,
  ) -> Self {
    Self::new(
      Position::new(anchor_line, anchor_column),
      Position::new(active_line, active_column),
    )
  }

  pub fn from_range(range: Range, direction: SelectionDirection) -> Self {
    match direction {
      SelectionDirection::Ltr => Self::new(range.start(), range.end()),
      SelectionDirection::Rtl => Self::new(range.end(), range.start()),
    }
  }

  #[inline]
  pub fn range(&self) -> Range {
    Range::new(self.anchor, self.active)
  }

  #[inline]
  pub fn start(&self) -> Position {
    self.anchor.min(self.active)
  }

  #[inline]
  pub fn end(&self) -> Position {
    self.anchor.max(self.active)
  }

  #[inline]
  #[must_use]
  pub fn is_empty(&self) -> bool {
    self.anchor == self.active
  }

  #[inline]
  pub fn direction(&self) -> SelectionDirection {
    if self.active < self.anchor {
      SelectionDirection::Rtl
    } else {
      SelectionDirection::Ltr
    }
  }

  /// Swaps anchor and active end.
  #[inline]
  #[must_use]
  pub fn flip(&self) -> Self {
    Self::new(self.active, self.anchor)
  }

  /// Returns the selection if it already goes the way of `direction`, else
  /// flips it.
  #[inline]
  #[must_use]
  pub fn with_direction(self, direction: SelectionDirection) -> Self {
    if self.is_empty() || self.direction() == direction {
      self
    } else {
      self.flip()
    }
  }

  /// Moves the active end, keeping the anchor.
  #[must_use]
  pub fn set_active(self, active: Position) -> Self {
    Self::new(self.anchor, active)
  }

  /// Collapses the selection onto its active end.
  #[must_use]
  pub fn collapse(self) -> Self {
    Self::caret(self.active)
  }
}

impl From<Range> for Selection {
  fn from(range: Range) -> Self {
    Selection::from_range(range, SelectionDirection::Ltr)
  }
}

impl fmt::Display for Selection {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "[{} -> {}]", self.anchor, self.active)
  }
}
