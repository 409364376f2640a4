use smallvec::SmallVec;

use crate::{
  Tendril,
  range::Range,
  selection::Selection,
};

/// Where the caret of the issuing cursor lands once a [`ReplaceCommand`] is
/// committed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CursorPlacement {
  /// Empty selection right after the inserted text.
  AfterText,
  /// Empty selection `n` columns away from the end of the inserted text.
  Offset(isize),
  /// Like `Offset(-1)`, and the char after the caret is recorded as
  /// auto-closed.
  AutoClosed,
  /// Keep the cursor's selection, mapped through the edit.
  Preserve(Selection),
}

/// Declarative edit: replace `range` with `text`. Never executed by the
/// operation that builds it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReplaceCommand {
  pub range:  Range,
  pub text:   Tendril,
  pub cursor: CursorPlacement,
}

impl ReplaceCommand {
  pub fn new(range: Range, text: impl Into<Tendril>) -> Self {
    Self {
      range,
      text: text.into(),
      cursor: CursorPlacement::AfterText,
    }
  }

  pub fn delete(range: Range) -> Self {
    Self::new(range, Tendril::new())
  }

  #[must_use]
  pub fn with_cursor(mut self, cursor: CursorPlacement) -> Self {
    self.cursor = cursor;
    self
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum EditOperationType {
  #[default]
  Other,
  DeletingLeft,
  DeletingRight,
  TypingOther,
  TypingFirstSpace,
  TypingConsecutiveSpace,
}

impl EditOperationType {
  pub fn is_typing(self) -> bool {
    matches!(
      self,
      Self::TypingOther | Self::TypingFirstSpace | Self::TypingConsecutiveSpace
    )
  }

  /// Both space kinds group together when deciding on undo stops.
  fn normalized(self) -> Self {
    match self {
      Self::TypingFirstSpace | Self::TypingConsecutiveSpace => Self::TypingFirstSpace,
      other => other,
    }
  }

  /// Whether an undo stop separates an edit of kind `self` from a following
  /// edit of kind `next`.
  pub fn should_push_stack_element_between(self, next: Self) -> bool {
    if self.is_typing() && !next.is_typing() {
      return true;
    }
    if self == Self::TypingFirstSpace {
      // a single space keeps "hello world" in one undo unit
      return false;
    }
    self.normalized() != next.normalized()
  }
}

/// Commands for one batch of cursors, one slot per cursor. `None` means the
/// cursor has nothing to do.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EditOperationResult {
  pub kind:                             EditOperationType,
  pub commands:                         SmallVec<[Option<ReplaceCommand>; 1]>,
  pub should_push_stack_element_before: bool,
  pub should_push_stack_element_after:  bool,
}

impl EditOperationResult {
  pub fn new(
    kind: EditOperationType,
    commands: impl IntoIterator<Item = Option<ReplaceCommand>>,
    before: bool,
    after: bool,
  ) -> Self {
    Self {
      kind,
      commands: commands.into_iter().collect(),
      should_push_stack_element_before: before,
      should_push_stack_element_after: after,
    }
  }

  pub fn is_noop(&self) -> bool {
    self.commands.iter().all(Option::is_none)
  }
}

#[cfg(test)]
mod test {
  use super::*;
  use EditOperationType::*;

  #[test]
  fn undo_stops_between_edit_kinds() {
    assert!(TypingOther.should_push_stack_element_between(DeletingLeft));
    assert!(!TypingOther.should_push_stack_element_between(TypingOther));
    assert!(!TypingFirstSpace.should_push_stack_element_between(TypingOther));
    assert!(TypingOther.should_push_stack_element_between(TypingFirstSpace));
    assert!(!TypingFirstSpace.should_push_stack_element_between(TypingConsecutiveSpace));
    assert!(!DeletingLeft.should_push_stack_element_between(DeletingLeft));
    assert!(DeletingLeft.should_push_stack_element_between(DeletingRight));
  }
}
