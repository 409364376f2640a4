//! State of a single cursor and the moves over it.
//!
//! A [`SingleCursorState`] remembers where its selection started
//! (`selection_start`, a range so a word or line selection can be extended
//! from either side) and where the caret is now (`position`). The visible
//! selection is derived from both and never stored separately. States are
//! values: every move returns a new one.

use crate::{
  config::CursorConfiguration,
  document::TextModel,
  movement,
  position::Position,
  range::Range,
  search::word_at_position,
  selection::Selection,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SelectionStartKind {
  #[default]
  Simple,
  Word,
  Line,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SingleCursorState {
  pub selection_start:                         Range,
  pub selection_start_kind:                    SelectionStartKind,
  pub selection_start_leftover_visible_columns: usize,
  pub position:                                Position,
  /// Visible columns the caret could not reach on its current line; kept
  /// across vertical moves.
  pub leftover_visible_columns:                usize,
}

impl SingleCursorState {
  pub fn new(
    selection_start: Range,
    selection_start_kind: SelectionStartKind,
    selection_start_leftover_visible_columns: usize,
    position: Position,
    leftover_visible_columns: usize,
  ) -> Self {
    Self {
      selection_start,
      selection_start_kind,
      selection_start_leftover_visible_columns,
      position,
      leftover_visible_columns,
    }
  }

  pub fn from_selection(selection: Selection) -> Self {
    Self::new(
      Range::empty(selection.anchor),
      SelectionStartKind::Simple,
      0,
      selection.active,
      0,
    )
  }

  /// The selection spans from the far side of `selection_start` to
  /// `position`, so a started word or line stays selected whichever way the
  /// caret goes.
  pub fn selection(&self) -> Selection {
    let anchor = if self.selection_start.is_empty()
      || !self.position.is_before_or_equal(&self.selection_start.start())
    {
      self.selection_start.start()
    } else {
      self.selection_start.end()
    };
    Selection::new(anchor, self.position)
  }

  pub fn has_selection(&self) -> bool {
    !self.selection().is_empty()
  }

  /// Moves the caret. In selection mode only the caret moves, otherwise the
  /// selection collapses onto the new position.
  #[must_use]
  pub fn move_to(
    &self,
    in_selection_mode: bool,
    position: Position,
    leftover_visible_columns: usize,
  ) -> Self {
    if in_selection_mode {
      Self {
        position,
        leftover_visible_columns,
        ..*self
      }
    } else {
      Self::new(
        Range::empty(position),
        SelectionStartKind::Simple,
        leftover_visible_columns,
        position,
        leftover_visible_columns,
      )
    }
  }
}

pub fn move_left(
  model: &impl TextModel,
  cursor: &SingleCursorState,
  extend: bool,
) -> SingleCursorState {
  let position = if cursor.has_selection() && !extend {
    cursor.selection().start()
  } else {
    movement::left_of(model, cursor.position)
  };
  cursor.move_to(extend, position, 0)
}

pub fn move_right(
  model: &impl TextModel,
  cursor: &SingleCursorState,
  extend: bool,
) -> SingleCursorState {
  let position = if cursor.has_selection() && !extend {
    cursor.selection().end()
  } else {
    movement::right_of(model, cursor.position)
  };
  cursor.move_to(extend, position, 0)
}

pub fn move_up(
  config: &CursorConfiguration,
  model: &impl TextModel,
  cursor: &SingleCursorState,
  extend: bool,
) -> SingleCursorState {
  let from = if cursor.has_selection() && !extend {
    cursor.selection().start()
  } else {
    cursor.position
  };
  let visible = config.visible_column_from_column(model, from) + cursor.leftover_visible_columns;
  let was_on_first_position = from.line == 1 && from.column == 1;

  let to = if from.line == 1 {
    Position::new(1, model.line_min_column(1))
  } else {
    let line = from.line - 1;
    Position::new(line, config.column_from_visible_column(model, line, visible))
  };
  let leftover = if was_on_first_position {
    0
  } else {
    visible.saturating_sub(config.visible_column_from_column(model, to))
  };
  cursor.move_to(extend, to, leftover)
}

pub fn move_down(
  config: &CursorConfiguration,
  model: &impl TextModel,
  cursor: &SingleCursorState,
  extend: bool,
) -> SingleCursorState {
  let from = if cursor.has_selection() && !extend {
    cursor.selection().end()
  } else {
    cursor.position
  };
  let visible = config.visible_column_from_column(model, from) + cursor.leftover_visible_columns;
  let line_count = model.line_count();
  let was_on_last_position =
    from.line == line_count && from.column == model.line_max_column(line_count);

  let to = if from.line == line_count {
    Position::new(line_count, model.line_max_column(line_count))
  } else {
    let line = from.line + 1;
    Position::new(line, config.column_from_visible_column(model, line, visible))
  };
  let leftover = if was_on_last_position {
    0
  } else {
    visible.saturating_sub(config.visible_column_from_column(model, to))
  };
  cursor.move_to(extend, to, leftover)
}

/// First non-whitespace column, or column 1 when already there.
pub fn move_to_line_start(
  model: &impl TextModel,
  cursor: &SingleCursorState,
  extend: bool,
) -> SingleCursorState {
  let line = cursor.position.line;
  let min_column = model.line_min_column(line);
  let first_non_blank = match model.line_first_non_whitespace_column(line) {
    0 => min_column,
    column => column,
  };
  let column = if cursor.position.column == first_non_blank {
    min_column
  } else {
    first_non_blank
  };
  cursor.move_to(extend, Position::new(line, column), 0)
}

pub fn move_to_line_end(
  model: &impl TextModel,
  cursor: &SingleCursorState,
  extend: bool,
) -> SingleCursorState {
  let line = cursor.position.line;
  cursor.move_to(extend, Position::new(line, model.line_max_column(line)), 0)
}

pub fn move_to(
  model: &impl TextModel,
  cursor: &SingleCursorState,
  position: Position,
  extend: bool,
) -> SingleCursorState {
  cursor.move_to(extend, model.validate_position(position), 0)
}

/// Selects the word under `position`; a caret outside any word stays a
/// caret.
pub fn select_word(
  config: &CursorConfiguration,
  model: &impl TextModel,
  position: Position,
) -> SingleCursorState {
  let position = model.validate_position(position);
  match word_at_position(model, position, &config.word_classifier) {
    Some(word) => SingleCursorState::new(word.range, SelectionStartKind::Word, 0, word.range.end(), 0),
    None => SingleCursorState::from_selection(Selection::caret(position)),
  }
}

/// Selects `line` including its line break.
pub fn select_line(model: &impl TextModel, line: usize) -> SingleCursorState {
  let line = line.clamp(1, model.line_count());
  let end = if line < model.line_count() {
    Position::new(line + 1, 1)
  } else {
    Position::new(line, model.line_max_column(line))
  };
  let range = Range::new(Position::new(line, 1), end);
  SingleCursorState::new(range, SelectionStartKind::Line, 0, end, 0)
}
