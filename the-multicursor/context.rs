//! Session flags handed to command enablement checks.

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum MultiSelectState {
  /// No tracked cursors.
  #[default]
  Idle,
  /// Cursors follow the matches of a search word.
  Selecting,
  /// Typing has started on the tracked cursors.
  Editing,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct SessionContext {
  pub is_multi_cursor: bool,
  pub state:           MultiSelectState,
}

impl SessionContext {
  pub fn new(state: MultiSelectState) -> Self {
    Self {
      is_multi_cursor: state != MultiSelectState::Idle,
      state,
    }
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MultiCursorCommand {
  AddSelectionToNextFindMatch,
  SelectAllFindMatches,
  DeleteLeft,
  DeleteRight,
  Exit,
  Undo,
  Redo,
  Accept,
  Reject,
}

impl MultiCursorCommand {
  pub const ALL: [MultiCursorCommand; 9] = [
    Self::AddSelectionToNextFindMatch,
    Self::SelectAllFindMatches,
    Self::DeleteLeft,
    Self::DeleteRight,
    Self::Exit,
    Self::Undo,
    Self::Redo,
    Self::Accept,
    Self::Reject,
  ];

  pub fn is_enabled(self, ctx: &SessionContext) -> bool {
    match self {
      Self::AddSelectionToNextFindMatch | Self::SelectAllFindMatches => {
        matches!(ctx.state, MultiSelectState::Idle | MultiSelectState::Selecting)
      },
      Self::DeleteLeft
      | Self::DeleteRight
      | Self::Exit
      | Self::Undo
      | Self::Redo
      | Self::Accept
      | Self::Reject => ctx.is_multi_cursor,
    }
  }
}
