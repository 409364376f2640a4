//! Text model of one editable resource.
//!
//! A [`Document`] wraps a [`Rope`] and exposes it through 1-based
//! line/column coordinates ([`TextModel`]). Edits arrive as
//! [`ReplaceCommand`]s, are committed as one [`Transaction`] per batch and
//! accumulate into a pending edit until [`Document::push_stack_element`]
//! seals them into an undo element of the shared ledger.

use std::borrow::Cow;

use ropey::{
  Rope,
  RopeSlice,
};
use the_core::{
  chars::char_is_indent,
  line_ending::line_without_line_ending,
};
use thiserror::Error;

use crate::{
  Tendril,
  command::ReplaceCommand,
  history::{
    ElementId,
    ResourceEdit,
    ResourceId,
    Selections,
    SharedLedger,
  },
  position::Position,
  range::Range,
  selection::Selection,
  transaction::{
    ChangeSet,
    Transaction,
    TransactionError,
  },
};

pub type Result<T> = std::result::Result<T, DocumentError>;

#[derive(Debug, Error)]
pub enum DocumentError {
  #[error(transparent)]
  Transaction(#[from] TransactionError),
}

/// Read access to a text buffer in 1-based coordinates.
pub trait TextModel {
  fn line_count(&self) -> usize;

  /// Content of `line` without its line terminator.
  fn line_content(&self, line: usize) -> Cow<'_, str>;

  fn line_length(&self, line: usize) -> usize;

  fn line_min_column(&self, _line: usize) -> usize {
    1
  }

  fn line_max_column(&self, line: usize) -> usize {
    self.line_length(line) + 1
  }

  /// Column of the first char that is not a space or tab, or 0 when the
  /// line is blank.
  fn line_first_non_whitespace_column(&self, line: usize) -> usize {
    self
      .line_content(line)
      .chars()
      .position(|ch| !char_is_indent(ch))
      .map_or(0, |idx| idx + 1)
  }

  /// Column right after the last char that is not a space or tab, or 0 when
  /// the line is blank.
  fn line_last_non_whitespace_column(&self, line: usize) -> usize {
    let content = self.line_content(line);
    let len = content.chars().count();
    content
      .chars()
      .rev()
      .position(|ch| !char_is_indent(ch))
      .map_or(0, |idx| len - idx + 1)
  }

  /// Clamps `position` into the buffer.
  fn validate_position(&self, position: Position) -> Position {
    let line = position.line.clamp(1, self.line_count());
    let column = position
      .column
      .clamp(self.line_min_column(line), self.line_max_column(line));
    Position::new(line, column)
  }

  fn offset_at(&self, position: Position) -> usize;

  fn position_at(&self, offset: usize) -> Position;

  fn value_in_range(&self, range: Range) -> String;

  /// The char right after `position` on its line.
  fn char_after(&self, position: Position) -> Option<char> {
    self
      .line_content(position.line)
      .chars()
      .nth(position.column.saturating_sub(1))
  }

  /// The char right before `position` on its line.
  fn char_before(&self, position: Position) -> Option<char> {
    let column = position.column.checked_sub(2)?;
    self.line_content(position.line).chars().nth(column)
  }
}

/// Edits accumulated since the last undo stop.
#[derive(Debug, Clone)]
struct PendingEdit {
  transaction:       Transaction,
  original:          Rope,
  selections_before: Selections,
}

/// Outcome of one [`Document::apply_edits`] call.
#[derive(Debug, Clone)]
pub struct AppliedEdits {
  pub changes:  ChangeSet,
  /// Range of each command's new text in the edited document, `None` for
  /// commands dropped because they overlapped an earlier one.
  pub inserted: Vec<Option<Range>>,
}

#[derive(Debug)]
pub struct Document {
  id:      ResourceId,
  text:    Rope,
  version: u64,
  pending: Option<PendingEdit>,
  ledger:  SharedLedger,
}

impl Document {
  pub fn new(text: impl Into<Rope>, ledger: SharedLedger) -> Self {
    Self {
      id: ResourceId::next(),
      text: text.into(),
      version: 0,
      pending: None,
      ledger,
    }
  }

  pub fn id(&self) -> ResourceId {
    self.id
  }

  pub fn text(&self) -> &Rope {
    &self.text
  }

  pub fn version(&self) -> u64 {
    self.version
  }

  pub fn ledger(&self) -> &SharedLedger {
    &self.ledger
  }

  /// Content of the 1-based `line`, clamped into the document.
  pub fn line(&self, line: usize) -> RopeSlice<'_> {
    let slice = self.text.slice(..);
    let line = line.clamp(1, self.text.len_lines());
    line_without_line_ending(&slice, line - 1)
  }

  pub fn has_pending_edit(&self) -> bool {
    self.pending.is_some()
  }

  /// Commits `commands` as one transaction.
  ///
  /// Ranges are clamped into the document first. A command that overlaps an
  /// earlier one (in document order) is dropped.
  pub fn apply_edits(
    &mut self,
    commands: &[ReplaceCommand],
    selections_before: &[Selection],
  ) -> Result<AppliedEdits> {
    let changes = commands.iter().map(|command| {
      let start = self.offset_at(command.range.start());
      let end = self.offset_at(command.range.end());
      (start, end, Some(command.text.clone()))
    });
    let (transaction, kept) = Transaction::change_ignore_overlapping(&self.text, changes)?;

    let mut inserted = vec![None; commands.len()];
    let mut delta = 0isize;
    let mut starts = Vec::with_capacity(kept.len());
    for &idx in &kept {
      let command = &commands[idx];
      let from = self.offset_at(command.range.start());
      let to = self.offset_at(command.range.end());
      let len = command.text.chars().count();
      starts.push((idx, from.saturating_add_signed(delta), len));
      delta += len as isize - (to - from) as isize;
    }

    let original = self.text.clone();
    transaction.apply(&mut self.text)?;
    self.version += 1;

    for (idx, start, len) in starts {
      inserted[idx] = Some(Range::new(
        self.position_at(start),
        self.position_at(start + len),
      ));
    }

    let changes = transaction.changes().clone();
    self.pending = Some(match self.pending.take() {
      Some(pending) => {
        PendingEdit {
          transaction: pending.transaction.compose(transaction)?,
          ..pending
        }
      },
      None => {
        PendingEdit {
          transaction,
          original,
          selections_before: selections_before.iter().copied().collect(),
        }
      },
    });

    tracing::trace!(
      resource = ?self.id,
      version = self.version,
      commands = commands.len(),
      kept = kept.len(),
      "applied edits"
    );

    Ok(AppliedEdits { changes, inserted })
  }

  /// Seals pending edits into an undo element of the ledger. Returns its id,
  /// or `None` when nothing was pending.
  pub fn push_stack_element(&mut self, selections_after: &[Selection]) -> Result<Option<ElementId>> {
    let Some(pending) = self.pending.take() else {
      return Ok(None);
    };
    if pending.transaction.changes().is_empty() {
      return Ok(None);
    }

    let inversion = pending.transaction.invert(&pending.original)?;
    let id = ElementId::next();
    self.ledger.lock().push(ResourceEdit {
      id,
      resource: self.id,
      transaction: pending.transaction,
      inversion,
      selections_before: pending.selections_before,
      selections_after: selections_after.iter().copied().collect(),
    });
    Ok(Some(id))
  }

  /// Applies an undo (`revert == true`) or redo of `edit` without recording
  /// it in the ledger.
  pub fn replay(&mut self, edit: &ResourceEdit, revert: bool) -> Result<()> {
    let transaction = if revert {
      &edit.inversion
    } else {
      &edit.transaction
    };
    transaction.apply(&mut self.text)?;
    self.version += 1;
    Ok(())
  }

  /// Replaces the whole text without recording an undo element and drops
  /// anything pending.
  pub fn reset_text(&mut self, text: Rope) -> Result<()> {
    let replacement = Tendril::from(text.to_string());
    Transaction::change(&self.text, [(0, self.text.len_chars(), Some(replacement))])?
      .apply(&mut self.text)?;
    self.pending = None;
    self.version += 1;
    Ok(())
  }
}

impl TextModel for Document {
  fn line_count(&self) -> usize {
    self.text.len_lines()
  }

  fn line_content(&self, line: usize) -> Cow<'_, str> {
    Cow::from(self.line(line))
  }

  fn line_length(&self, line: usize) -> usize {
    self.line(line).len_chars()
  }

  fn offset_at(&self, position: Position) -> usize {
    let position = self.validate_position(position);
    self.text.line_to_char(position.line - 1) + position.column - 1
  }

  fn position_at(&self, offset: usize) -> Position {
    let offset = offset.min(self.text.len_chars());
    let line = self.text.char_to_line(offset);
    let column = offset - self.text.line_to_char(line) + 1;
    // an offset inside a CRLF pair lands on the line end
    self.validate_position(Position::new(line + 1, column))
  }

  fn value_in_range(&self, range: Range) -> String {
    let start = self.offset_at(range.start());
    let end = self.offset_at(range.end());
    self.text.slice(start..end).to_string()
  }
}
