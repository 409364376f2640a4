use std::sync::Arc;

use the_edit::{
  config::CursorConfiguration,
  controller::CursorsController,
  history::{
    ElementId,
    Selections,
  },
  selection::Selection,
};

use crate::{
  decorations::DecorationId,
  workspace::UnitId,
};

slotmap::new_key_type! {
    pub struct TrackedCursorId;
}

/// One unit's share of a multi-cursor session.
#[derive(Debug, Clone)]
pub struct TrackedCursor {
  pub unit:              UnitId,
  /// Editor selection from before the unit was tracked.
  pub initial_selection: Selection,
  /// Matches selected in this unit, in the order they were found.
  pub match_selections:  Vec<Selection>,
  pub config:            Arc<CursorConfiguration>,
  pub decoration_ids:    Vec<DecorationId>,
  /// Past undo elements of the unit's document when tracking started.
  pub undo_snapshot:     Vec<ElementId>,
  pub controller:        CursorsController,
}

impl TrackedCursor {
  pub fn new(
    unit: UnitId,
    initial_selection: Selection,
    match_selections: Vec<Selection>,
    config: Arc<CursorConfiguration>,
    undo_snapshot: Vec<ElementId>,
  ) -> Self {
    let controller = CursorsController::new(Arc::clone(&config), &match_selections);
    Self {
      unit,
      initial_selection,
      match_selections,
      config,
      decoration_ids: Vec::new(),
      undo_snapshot,
      controller,
    }
  }

  pub fn selections(&self) -> Selections {
    self.controller.selections()
  }

  /// Elements in `past` that were not there when tracking started.
  pub fn new_elements(&self, past: &[ElementId]) -> Vec<ElementId> {
    past
      .iter()
      .copied()
      .filter(|id| !self.undo_snapshot.contains(id))
      .collect()
  }

  pub fn set_config(&mut self, config: Arc<CursorConfiguration>) {
    self.controller.set_config(Arc::clone(&config));
    self.config = config;
  }
}
