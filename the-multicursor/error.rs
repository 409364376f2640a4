use the_edit::{
  controller::ControllerError,
  document::DocumentError,
  history::HistoryError,
  search::SearchError,
};
use thiserror::Error;

use crate::{
  tracked::TrackedCursorId,
  workspace::UnitId,
};

/// Failures of the workspace and the coordinator.
///
/// The first four variants are contract breaches by the host. Expected races
/// such as a reset while a lookup was suspended are not errors.
#[derive(Debug, Error)]
pub enum CoordinatorError {
  #[error("unit {0:?} is not the active unit")]
  NotActiveUnit(UnitId),
  #[error("unit {0:?} does not support multi-cursor editing")]
  UnsupportedUnit(UnitId),
  #[error("unknown tracked cursor {0:?}")]
  UnknownCursor(TrackedCursorId),
  #[error("unknown unit {0:?}")]
  UnknownUnit(UnitId),
  #[error(transparent)]
  Controller(#[from] ControllerError),
  #[error(transparent)]
  Document(#[from] DocumentError),
  #[error(transparent)]
  History(#[from] HistoryError),
  #[error(transparent)]
  Search(#[from] SearchError),
}

pub type Result<T> = std::result::Result<T, CoordinatorError>;
