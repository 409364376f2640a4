//! Multi-cursor sessions spanning several editable units.
//!
//! A [`workspace::Workspace`] holds the units (each with its own document,
//! editor and decorations) and the shared undo ledger. The
//! [`coordinator::MultiCursorCoordinator`] tracks find matches across units,
//! relays what happens at the anchor editor to every follower, and folds a
//! session's edits into one workspace undo element when the session ends.

pub mod context;
pub mod coordinator;
pub mod decorations;
pub mod error;
pub mod relay;
pub mod tracked;
pub mod workspace;

pub use crate::{
  coordinator::MultiCursorCoordinator,
  error::{
    CoordinatorError,
    Result,
  },
  workspace::{
    SharedWorkspace,
    UnitId,
    Workspace,
  },
};
