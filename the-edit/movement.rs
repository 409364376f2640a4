//! Single-step caret motions over a [`TextModel`].
//!
//! Horizontal steps move by whole grapheme clusters and cross line breaks;
//! they never leave the document.

use the_core::grapheme::{
  left_delete_offset,
  line_graphemes,
};

use crate::{
  document::TextModel,
  position::Position,
};

/// One grapheme to the right of `position`, or the start of the next line at
/// a line end. Stays put at the end of the document.
pub fn right_of(model: &impl TextModel, position: Position) -> Position {
  let position = model.validate_position(position);
  if position.column < model.line_max_column(position.line) {
    let offset = position.column - 1;
    let line = model.line_content(position.line);
    let next = line_graphemes(&line, 1)
      .map(|(start, _, grapheme)| start + grapheme.len_chars())
      .find(|end| *end > offset)
      .unwrap_or(offset + 1);
    position.with_column(next + 1)
  } else if position.line < model.line_count() {
    Position::new(position.line + 1, 1)
  } else {
    position
  }
}

/// One grapheme to the left of `position`, or the end of the previous line
/// at column 1. Stays put at the start of the document.
pub fn left_of(model: &impl TextModel, position: Position) -> Position {
  let position = model.validate_position(position);
  if position.column > 1 {
    let line = model.line_content(position.line);
    position.with_column(left_delete_offset(&line, position.column - 1) + 1)
  } else if position.line > 1 {
    let line = position.line - 1;
    Position::new(line, model.line_max_column(line))
  } else {
    position
  }
}

#[cfg(test)]
mod test {
  use super::*;
  use crate::{
    document::Document,
    history::UndoRedoLedger,
  };

  #[test]
  fn steps_cross_lines_and_clusters() {
    let doc = Document::new("xa\u{0301}\nb", UndoRedoLedger::shared());
    assert_eq!(right_of(&doc, Position::new(1, 1)), Position::new(1, 2));
    assert_eq!(right_of(&doc, Position::new(1, 2)), Position::new(1, 4));
    assert_eq!(right_of(&doc, Position::new(1, 4)), Position::new(2, 1));
    assert_eq!(right_of(&doc, Position::new(2, 2)), Position::new(2, 2));

    assert_eq!(left_of(&doc, Position::new(1, 4)), Position::new(1, 2));
    assert_eq!(left_of(&doc, Position::new(2, 1)), Position::new(1, 4));
    assert_eq!(left_of(&doc, Position::new(1, 1)), Position::new(1, 1));
  }
}
