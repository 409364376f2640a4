//! Cursors of one editor and the edits they drive.
//!
//! A [`CursorsController`] owns the cursor states of a single editor and
//! commits the commands computed by the delete and typing operations to a
//! [`Document`]. After every edit the cursor states are rebuilt from the
//! edited text, and the set of auto-closed chars is carried through the
//! edit's change set.

use std::sync::Arc;

use smallvec::SmallVec;
use thiserror::Error;

use crate::{
  command::{
    CursorPlacement,
    EditOperationResult,
    EditOperationType,
  },
  config::CursorConfiguration,
  cursor::{
    self,
    SingleCursorState,
  },
  delete,
  document::{
    Document,
    DocumentError,
    TextModel,
  },
  history::Selections,
  position::Position,
  selection::Selection,
  transaction::{
    Assoc,
    TransactionError,
  },
  typing,
};

pub type Result<T> = std::result::Result<T, ControllerError>;

#[derive(Debug, Error)]
pub enum ControllerError {
  #[error(transparent)]
  Document(#[from] DocumentError),
  #[error(transparent)]
  Transaction(#[from] TransactionError),
}

/// What a copy or cut puts on the clipboard.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClipboardData {
  pub text:                     String,
  /// One piece per cursor when there are several.
  pub multicursor_text:         Option<Vec<String>>,
  pub is_from_empty_selections: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CursorMove {
  Left,
  Right,
  Up,
  Down,
  LineStart,
  LineEnd,
}

#[derive(Debug, Clone)]
pub struct CursorsController {
  config:               Arc<CursorConfiguration>,
  states:               SmallVec<[SingleCursorState; 1]>,
  auto_closed:          Vec<Position>,
  prev_edit_type:       EditOperationType,
  is_doing_composition: bool,
}

impl CursorsController {
  pub fn new(config: Arc<CursorConfiguration>, selections: &[Selection]) -> Self {
    let mut controller = Self {
      config,
      states: SmallVec::new(),
      auto_closed: Vec::new(),
      prev_edit_type: EditOperationType::Other,
      is_doing_composition: false,
    };
    controller.replace_states(selections);
    controller
  }

  pub fn config(&self) -> &Arc<CursorConfiguration> {
    &self.config
  }

  pub fn set_config(&mut self, config: Arc<CursorConfiguration>) {
    self.config = config;
  }

  pub fn states(&self) -> &[SingleCursorState] {
    &self.states
  }

  pub fn selections(&self) -> Selections {
    self.states.iter().map(SingleCursorState::selection).collect()
  }

  pub fn primary_selection(&self) -> Selection {
    self.states[0].selection()
  }

  pub fn auto_closed_characters(&self) -> &[Position] {
    &self.auto_closed
  }

  pub fn prev_edit_type(&self) -> EditOperationType {
    self.prev_edit_type
  }

  pub fn is_doing_composition(&self) -> bool {
    self.is_doing_composition
  }

  fn replace_states(&mut self, selections: &[Selection]) {
    self.states = selections
      .iter()
      .copied()
      .map(SingleCursorState::from_selection)
      .collect();
    if self.states.is_empty() {
      self
        .states
        .push(SingleCursorState::from_selection(Selection::caret(Position::default())));
    }
    self.dedup_states();
  }

  fn dedup_states(&mut self) {
    let mut seen: SmallVec<[Selection; 1]> = SmallVec::new();
    self.states.retain(|state| {
      let selection = state.selection();
      if seen.contains(&selection) {
        false
      } else {
        seen.push(selection);
        true
      }
    });
  }

  /// Replaces every cursor, clamping the selections into `model`.
  pub fn set_selections(&mut self, model: &impl TextModel, selections: &[Selection]) {
    let selections: Selections = selections
      .iter()
      .map(|selection| {
        Selection::new(
          model.validate_position(selection.anchor),
          model.validate_position(selection.active),
        )
      })
      .collect();
    self.replace_states(&selections);
    self.prev_edit_type = EditOperationType::Other;
  }

  pub fn set_states(&mut self, states: SmallVec<[SingleCursorState; 1]>) {
    if !states.is_empty() {
      self.states = states;
      self.dedup_states();
    }
    self.prev_edit_type = EditOperationType::Other;
  }

  pub fn move_cursors(&mut self, model: &impl TextModel, motion: CursorMove, extend: bool) {
    let config = Arc::clone(&self.config);
    let states = self
      .states
      .iter()
      .map(|state| {
        match motion {
          CursorMove::Left => cursor::move_left(model, state, extend),
          CursorMove::Right => cursor::move_right(model, state, extend),
          CursorMove::Up => cursor::move_up(&config, model, state, extend),
          CursorMove::Down => cursor::move_down(&config, model, state, extend),
          CursorMove::LineStart => cursor::move_to_line_start(model, state, extend),
          CursorMove::LineEnd => cursor::move_to_line_end(model, state, extend),
        }
      })
      .collect();
    self.set_states(states);
    self.forget_auto_closed_off_cursor_lines();
  }

  /// Moves the primary cursor to `position` and drops the others.
  pub fn move_to(&mut self, model: &impl TextModel, position: Position, extend: bool) {
    let state = cursor::move_to(model, &self.states[0], position, extend);
    self.set_states(SmallVec::from_elem(state, 1));
    self.forget_auto_closed_off_cursor_lines();
  }

  pub fn select_word(&mut self, model: &impl TextModel, position: Position) {
    let state = cursor::select_word(&self.config, model, position);
    self.set_states(SmallVec::from_elem(state, 1));
  }

  pub fn select_line(&mut self, model: &impl TextModel, line: usize) {
    let state = cursor::select_line(model, line);
    self.set_states(SmallVec::from_elem(state, 1));
  }

  fn forget_auto_closed_off_cursor_lines(&mut self) {
    let states = &self.states;
    self
      .auto_closed
      .retain(|closed| states.iter().any(|state| state.position.line == closed.line));
  }

  pub fn type_text(&mut self, doc: &mut Document, text: &str) -> Result<()> {
    let result = typing::type_text(
      self.prev_edit_type,
      &self.config,
      &*doc,
      &self.selections(),
      text,
      &self.auto_closed,
    );
    self.execute(doc, result)
  }

  pub fn delete_left(&mut self, doc: &mut Document) -> Result<()> {
    let (push_before, commands) = delete::delete_left(
      self.prev_edit_type,
      &self.config,
      &*doc,
      &self.selections(),
      &self.auto_closed,
    );
    self.execute(
      doc,
      EditOperationResult {
        kind: EditOperationType::DeletingLeft,
        commands,
        should_push_stack_element_before: push_before,
        should_push_stack_element_after: false,
      },
    )
  }

  pub fn delete_right(&mut self, doc: &mut Document) -> Result<()> {
    let (push_before, commands) =
      delete::delete_right(self.prev_edit_type, &self.config, &*doc, &self.selections());
    self.execute(
      doc,
      EditOperationResult {
        kind: EditOperationType::DeletingRight,
        commands,
        should_push_stack_element_before: push_before,
        should_push_stack_element_after: false,
      },
    )
  }

  /// Cuts every selection and returns what was removed.
  pub fn cut(&mut self, doc: &mut Document) -> Result<ClipboardData> {
    let clipboard = self.clipboard_text(&*doc);
    let result = delete::cut(&self.config, &*doc, &self.selections());
    self.execute(doc, result)?;
    Ok(clipboard)
  }

  pub fn paste(
    &mut self,
    doc: &mut Document,
    text: &str,
    paste_on_new_line: bool,
    multicursor_text: Option<&[String]>,
  ) -> Result<()> {
    let result = typing::paste(
      &self.config,
      &self.selections(),
      text,
      paste_on_new_line,
      multicursor_text,
    );
    self.execute(doc, result)
  }

  pub fn start_composition(&mut self, doc: &mut Document) -> Result<()> {
    if !self.is_doing_composition {
      doc.push_stack_element(&self.selections())?;
      self.is_doing_composition = true;
    }
    Ok(())
  }

  pub fn composition_type(
    &mut self,
    doc: &mut Document,
    text: &str,
    replace_prev: usize,
    replace_next: usize,
    position_delta: isize,
  ) -> Result<()> {
    let result = typing::composition_type(
      self.prev_edit_type,
      &*doc,
      &self.selections(),
      text,
      replace_prev,
      replace_next,
      position_delta,
    );
    self.execute(doc, result)
  }

  pub fn end_composition(&mut self, doc: &mut Document) -> Result<()> {
    if self.is_doing_composition {
      self.is_doing_composition = false;
      doc.push_stack_element(&self.selections())?;
    }
    Ok(())
  }

  /// Text a copy would put on the clipboard. Empty selections copy their
  /// whole line when `empty_selection_clipboard` is on.
  pub fn clipboard_text(&self, model: &impl TextModel) -> ClipboardData {
    let mut selections = self.selections();
    selections.sort_by_key(Selection::range);

    let is_from_empty_selections = selections.iter().all(Selection::is_empty);
    let pieces: Vec<String> = selections
      .iter()
      .filter_map(|selection| {
        if !selection.is_empty() {
          Some(model.value_in_range(selection.range()))
        } else if self.config.empty_selection_clipboard {
          Some(format!("{}\n", model.line_content(selection.active.line)))
        } else {
          None
        }
      })
      .collect();

    let text = if is_from_empty_selections {
      pieces.concat()
    } else {
      pieces.join("\n")
    };
    let multicursor_text = (pieces.len() > 1).then(|| {
      pieces
        .iter()
        .map(|piece| piece.strip_suffix('\n').unwrap_or(piece).to_string())
        .collect()
    });
    ClipboardData {
      text,
      multicursor_text,
      is_from_empty_selections,
    }
  }

  /// Commits `result` to `doc` and rebuilds the cursors from the edited text.
  pub fn execute(&mut self, doc: &mut Document, result: EditOperationResult) -> Result<()> {
    let selections = self.selections();
    if result.should_push_stack_element_before {
      doc.push_stack_element(&selections)?;
    }

    let mut slots = Vec::with_capacity(result.commands.len());
    let mut commands = Vec::with_capacity(result.commands.len());
    for command in &result.commands {
      match command {
        Some(command) => {
          slots.push(Some(commands.len()));
          commands.push(command.clone());
        },
        None => slots.push(None),
      }
    }
    if commands.is_empty() {
      self.prev_edit_type = result.kind;
      return Ok(());
    }

    let old_offsets: Vec<(usize, usize)> = selections
      .iter()
      .map(|selection| (doc.offset_at(selection.anchor), doc.offset_at(selection.active)))
      .collect();
    let auto_closed: Vec<usize> = self
      .auto_closed
      .iter()
      .map(|position| doc.offset_at(*position))
      .collect();
    let preserved: Vec<Option<(usize, usize)>> = commands
      .iter()
      .map(|command| {
        match command.cursor {
          CursorPlacement::Preserve(selection) => {
            Some((doc.offset_at(selection.anchor), doc.offset_at(selection.active)))
          },
          _ => None,
        }
      })
      .collect();

    let applied = doc.apply_edits(&commands, &selections)?;
    let changes = &applied.changes;

    let mut new_auto_closed = Vec::new();
    for offset in auto_closed {
      if changes.retains(offset) {
        new_auto_closed.push(doc.position_at(changes.map_pos(offset, Assoc::After)?));
      }
    }

    let mut new_selections = Selections::with_capacity(selections.len());
    for (idx, (anchor, active)) in old_offsets.into_iter().enumerate() {
      let slot = slots.get(idx).copied().flatten();
      let inserted = slot.and_then(|slot| applied.inserted[slot].map(|range| (slot, range)));
      let selection = match inserted {
        Some((slot, range)) => {
          match commands[slot].cursor {
            CursorPlacement::AfterText => Selection::caret(range.end()),
            CursorPlacement::Offset(delta) => {
              Selection::caret(doc.validate_position(range.end().delta(0, delta)))
            },
            CursorPlacement::AutoClosed => {
              let caret = range.end().delta(0, -1);
              new_auto_closed.push(caret);
              Selection::caret(caret)
            },
            CursorPlacement::Preserve(_) => {
              let (anchor, active) = preserved[slot].unwrap_or((anchor, active));
              Selection::new(
                doc.position_at(changes.map_pos(anchor, Assoc::After)?),
                doc.position_at(changes.map_pos(active, Assoc::After)?),
              )
            },
          }
        },
        None => {
          Selection::new(
            doc.position_at(changes.map_pos(anchor, Assoc::After)?),
            doc.position_at(changes.map_pos(active, Assoc::After)?),
          )
        },
      };
      new_selections.push(selection);
    }

    new_auto_closed.sort_unstable();
    new_auto_closed.dedup();
    self.auto_closed = new_auto_closed;

    if result.should_push_stack_element_after {
      doc.push_stack_element(&new_selections)?;
    }
    self.replace_states(&new_selections);
    self.prev_edit_type = result.kind;

    tracing::trace!(
      kind = ?result.kind,
      cursors = self.states.len(),
      version = doc.version(),
      "executed edit operation"
    );
    Ok(())
  }
}
