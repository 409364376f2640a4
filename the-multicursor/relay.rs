//! What travels from the anchor editor to the followers.
//!
//! Typing is relayed in two phases. Followers receive the text before the
//! anchor commits it, and the bookkeeping that follows needs an
//! [`AnchorCommit`], which only a committed anchor edit hands out.

use the_edit::{
  controller::{
    self,
    CursorsController,
  },
  document::Document,
  range::Range,
  selection::{
    Selection,
    SelectionDirection,
  },
};

use crate::workspace::UnitId;

/// Why the anchor's selection changed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SelectionChangeReason {
  /// Keyboard navigation or a move command.
  Explicit,
  Mouse,
  /// Cursor placement after an edit.
  Edit,
  Undo,
  Redo,
  /// The whole text was replaced.
  ContentFlush,
}

impl SelectionChangeReason {
  pub fn is_relayed(self) -> bool {
    self == Self::Explicit
  }
}

/// Per-endpoint movement of the anchor selection during one event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SelectionDelta {
  pub start_line:   isize,
  pub start_column: isize,
  pub end_line:     isize,
  pub end_column:   isize,
  /// Direction a collapsed follower takes when the delta opens it up.
  pub direction:    SelectionDirection,
}

fn diff(from: usize, to: usize) -> isize {
  to as isize - from as isize
}

impl SelectionDelta {
  pub fn between(before: Selection, after: Selection) -> Self {
    let (old, new) = (before.range(), after.range());
    Self {
      start_line: diff(old.start().line, new.start().line),
      start_column: diff(old.start().column, new.start().column),
      end_line: diff(old.end().line, new.end().line),
      end_column: diff(old.end().column, new.end().column),
      direction: after.direction(),
    }
  }

  pub fn is_empty(&self) -> bool {
    self.start_line == 0 && self.start_column == 0 && self.end_line == 0 && self.end_column == 0
  }

  /// Moves both ends of `selection`, keeping its direction. A caret has no
  /// direction of its own and follows the anchor's.
  pub fn apply(&self, selection: Selection) -> Selection {
    let range = selection.range();
    let start = range.start().delta(self.start_line, self.start_column);
    let end = range.end().delta(self.end_line, self.end_column);
    let direction = if selection.is_empty() {
      self.direction
    } else {
      selection.direction()
    };
    Selection::from_range(Range::new(start, end), direction)
  }
}

/// Proof that the anchor editor committed an edit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AnchorCommit {
  unit:    UnitId,
  version: u64,
}

impl AnchorCommit {
  pub(crate) fn new(unit: UnitId, version: u64) -> Self {
    Self { unit, version }
  }

  pub fn unit(&self) -> UnitId {
    self.unit
  }

  /// Document version right after the commit.
  pub fn version(&self) -> u64 {
    self.version
  }
}

/// Editor operations replayed verbatim on every follower.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EditorOperation {
  CompositionStart,
  CompositionType {
    text:           String,
    replace_prev:   usize,
    replace_next:   usize,
    position_delta: isize,
  },
  CompositionEnd,
  Paste {
    text:              String,
    paste_on_new_line: bool,
    multicursor_text:  Option<Vec<String>>,
  },
  Cut,
  DeleteLeft,
  DeleteRight,
}

impl EditorOperation {
  pub fn apply(&self, controller: &mut CursorsController, doc: &mut Document) -> controller::Result<()> {
    match self {
      Self::CompositionStart => controller.start_composition(doc),
      Self::CompositionType {
        text,
        replace_prev,
        replace_next,
        position_delta,
      } => controller.composition_type(doc, text, *replace_prev, *replace_next, *position_delta),
      Self::CompositionEnd => controller.end_composition(doc),
      Self::Paste {
        text,
        paste_on_new_line,
        multicursor_text,
      } => controller.paste(doc, text, *paste_on_new_line, multicursor_text.as_deref()),
      Self::Cut => controller.cut(doc).map(|_| ()),
      Self::DeleteLeft => controller.delete_left(doc),
      Self::DeleteRight => controller.delete_right(doc),
    }
  }

  pub fn name(&self) -> &'static str {
    match self {
      Self::CompositionStart => "composition-start",
      Self::CompositionType { .. } => "composition-type",
      Self::CompositionEnd => "composition-end",
      Self::Paste { .. } => "paste",
      Self::Cut => "cut",
      Self::DeleteLeft => "delete-left",
      Self::DeleteRight => "delete-right",
    }
  }
}
