//! The multi-cursor session state machine.
//!
//! One unit holds the real editor focus (the anchor). Every other unit that
//! takes part in the session is a follower: it owns a [`CursorsController`]
//! that replays what the anchor does and shows mock cursors instead of a
//! caret. Ending the session folds all edits into one workspace undo element.
//!
//! Lookups may suspend. Nothing here holds a borrow across an `.await`, and
//! every resumed lookup checks the session epoch first, so a reset that lands
//! while a lookup is pending wins and the late result is dropped.

use std::{
  cell::RefCell,
  future::{
    self,
    Future,
  },
  mem,
  rc::Rc,
  sync::Arc,
};

use slotmap::SlotMap;
use smallvec::smallvec;
use the_edit::{
  config::{
    CursorConfiguration,
    EditorOptions,
  },
  controller::{
    self,
    CursorMove,
    CursorsController,
  },
  document::Document,
  history::{
    ElementId,
    JumpDirection,
    Selections,
    UndoElement,
    WorkspaceUndoElement,
  },
  search::{
    self,
    SearchQuery,
  },
  selection::{
    Selection,
    SelectionDirection,
  },
};

use crate::{
  context::{
    MultiCursorCommand,
    MultiSelectState,
    SessionContext,
  },
  decorations::Decoration,
  error::{
    CoordinatorError,
    Result,
  },
  relay::{
    AnchorCommit,
    EditorOperation,
    SelectionChangeReason,
    SelectionDelta,
  },
  tracked::{
    TrackedCursor,
    TrackedCursorId,
  },
  workspace::{
    SharedWorkspace,
    UnitId,
    UnitKind,
    UnitMatches,
    UnitPosition,
    Workspace,
  },
};

const SESSION_UNDO_LABEL: &str = "multi-cursor edit";

/// Looks up the cursor configuration of a unit, possibly asynchronously.
pub trait UnitResolver {
  /// `None` when the unit can no longer be edited.
  fn resolve(&self, unit: UnitId) -> impl Future<Output = Option<Arc<CursorConfiguration>>>;
}

/// Finds every match of a query across the workspace.
pub trait MatchProvider {
  fn find_all(&self, query: &SearchQuery) -> impl Future<Output = Result<Vec<UnitMatches>>>;
}

impl UnitResolver for SharedWorkspace {
  fn resolve(&self, unit: UnitId) -> impl Future<Output = Option<Arc<CursorConfiguration>>> {
    future::ready(self.borrow_mut().cursor_config(unit).ok())
  }
}

impl MatchProvider for SharedWorkspace {
  fn find_all(&self, query: &SearchQuery) -> impl Future<Output = Result<Vec<UnitMatches>>> {
    future::ready(self.borrow().find_all_matches(query))
  }
}

#[derive(Debug, Default)]
struct Session {
  state:         MultiSelectState,
  /// Bumped on every reset; lookups started in an older epoch are stale.
  epoch:         u64,
  query:         Option<SearchQuery>,
  total_matches: usize,
  /// Where the first match was found; find-next stops when it wraps here.
  start:         Option<UnitPosition>,
  cursors:       SlotMap<TrackedCursorId, TrackedCursor>,
  /// Tracked cursors in the order they were last extended.
  order:         Vec<TrackedCursorId>,
}

impl Session {
  fn tracked_matches(&self) -> usize {
    self
      .cursors
      .values()
      .map(|cursor| cursor.match_selections.len())
      .sum()
  }

  fn cursor_for_unit(&self, unit: UnitId) -> Option<TrackedCursorId> {
    self
      .cursors
      .iter()
      .find(|(_, cursor)| cursor.unit == unit)
      .map(|(id, _)| id)
  }

  fn touch(&mut self, id: TrackedCursorId) {
    self.order.retain(|other| *other != id);
    self.order.push(id);
  }
}

/// Word picked at the anchor caret when a session starts.
struct StartWord {
  unit:      UnitId,
  query:     SearchQuery,
  selection: Selection,
  initial:   Selection,
  epoch:     u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SessionEnd {
  Exit,
  Accept,
  Reject,
}

pub struct MultiCursorCoordinator<R = SharedWorkspace, M = SharedWorkspace> {
  workspace: SharedWorkspace,
  resolver:  R,
  matches:   M,
  session:   RefCell<Session>,
}

impl MultiCursorCoordinator {
  pub fn new(workspace: SharedWorkspace) -> Rc<Self> {
    Self::with_collaborators(Rc::clone(&workspace), Rc::clone(&workspace), workspace)
  }
}

impl<R: UnitResolver, M: MatchProvider> MultiCursorCoordinator<R, M> {
  pub fn with_collaborators(workspace: SharedWorkspace, resolver: R, matches: M) -> Rc<Self> {
    Rc::new(Self {
      workspace,
      resolver,
      matches,
      session: RefCell::new(Session::default()),
    })
  }

  pub fn workspace(&self) -> &SharedWorkspace {
    &self.workspace
  }

  pub fn context(&self) -> SessionContext {
    SessionContext::new(self.state())
  }

  pub fn state(&self) -> MultiSelectState {
    self.session.borrow().state
  }

  pub fn total_matches(&self) -> usize {
    self.session.borrow().total_matches
  }

  /// Tracked cursors, the most recently extended last.
  pub fn tracked_cursors(&self) -> Vec<TrackedCursorId> {
    self.session.borrow().order.clone()
  }

  pub fn tracked_unit(&self, id: TrackedCursorId) -> Result<UnitId> {
    self.with_cursor(id, |cursor| cursor.unit)
  }

  pub fn tracked_selections(&self, id: TrackedCursorId) -> Result<Selections> {
    self.with_cursor(id, TrackedCursor::selections)
  }

  pub fn match_selections(&self, id: TrackedCursorId) -> Result<Vec<Selection>> {
    self.with_cursor(id, |cursor| cursor.match_selections.clone())
  }

  pub fn initial_selection(&self, id: TrackedCursorId) -> Result<Selection> {
    self.with_cursor(id, |cursor| cursor.initial_selection)
  }

  fn with_cursor<T>(&self, id: TrackedCursorId, f: impl FnOnce(&TrackedCursor) -> T) -> Result<T> {
    self
      .session
      .borrow()
      .cursors
      .get(id)
      .map(f)
      .ok_or(CoordinatorError::UnknownCursor(id))
  }

  fn is_current(&self, epoch: u64) -> bool {
    self.session.borrow().epoch == epoch
  }

  fn ensure_supported(workspace: &Workspace, unit: UnitId) -> Result<()> {
    match workspace.unit(unit)?.kind() {
      UnitKind::Code => Ok(()),
      UnitKind::Markup => Err(CoordinatorError::UnsupportedUnit(unit)),
    }
  }

  fn ensure_active(&self, unit: UnitId) -> Result<()> {
    if self.workspace.borrow().active() == Some(unit) {
      Ok(())
    } else {
      Err(CoordinatorError::NotActiveUnit(unit))
    }
  }

  /// Runs a command if the current session enables it. Returns whether it
  /// ran.
  pub async fn run_command(&self, command: MultiCursorCommand) -> Result<bool> {
    if !command.is_enabled(&self.context()) {
      tracing::trace!(?command, "command disabled");
      return Ok(false);
    }
    match command {
      MultiCursorCommand::AddSelectionToNextFindMatch => self.find_and_track_next_selection().await?,
      MultiCursorCommand::SelectAllFindMatches => self.select_all_matches(None).await?,
      MultiCursorCommand::DeleteLeft => self.run_operation(EditorOperation::DeleteLeft)?,
      MultiCursorCommand::DeleteRight => self.run_operation(EditorOperation::DeleteRight)?,
      MultiCursorCommand::Exit => self.reset_to_idle()?,
      MultiCursorCommand::Undo => self.undo()?,
      MultiCursorCommand::Redo => self.redo()?,
      MultiCursorCommand::Accept => self.accept()?,
      MultiCursorCommand::Reject => self.reject()?,
    }
    Ok(true)
  }

  /// Adds the next match of the session word to the tracked cursors, or
  /// starts a session on the word under the anchor caret.
  pub async fn find_and_track_next_selection(&self) -> Result<()> {
    match self.state() {
      MultiSelectState::Idle => self.start_selecting().await,
      MultiSelectState::Selecting => self.track_next_match().await,
      MultiSelectState::Editing => {
        tracing::trace!("find next ignored while editing");
        Ok(())
      },
    }
  }

  fn select_start_word(&self) -> Result<Option<StartWord>> {
    let mut workspace = self.workspace.borrow_mut();
    let Some(unit) = workspace.active() else {
      tracing::trace!("no active unit");
      return Ok(None);
    };
    Self::ensure_supported(&workspace, unit)?;
    let config = workspace.cursor_config(unit)?;
    let initial = workspace.selections(unit)?[0];
    let Some(word) = search::word_at_position(
      workspace.unit(unit)?.document(),
      initial.active,
      &config.word_classifier,
    ) else {
      tracing::trace!(?unit, position = ?initial.active, "no word at caret");
      return Ok(None);
    };
    let selection = Selection::from_range(word.range, SelectionDirection::Ltr);
    workspace.set_selections(unit, &[selection])?;
    let query = SearchQuery::whole_word(word.word, config.word_separators.clone());
    drop(workspace);

    let mut session = self.session.borrow_mut();
    session.state = MultiSelectState::Selecting;
    session.query = Some(query.clone());
    session.total_matches = 0;
    session.start = Some(UnitPosition {
      unit,
      position: word.range.start(),
    });
    tracing::debug!(?unit, word = %query.word, "multi-cursor session started");
    Ok(Some(StartWord {
      unit,
      query,
      selection,
      initial,
      epoch: session.epoch,
    }))
  }

  async fn start_selecting(&self) -> Result<()> {
    let Some(word) = self.select_start_word()? else {
      return Ok(());
    };
    let config = self.resolver.resolve(word.unit).await;
    if !self.is_current(word.epoch) {
      tracing::debug!(unit = ?word.unit, "session reset while resolving the anchor");
      return Ok(());
    }
    let Some(config) = config else {
      tracing::debug!(unit = ?word.unit, "anchor unit went away");
      return self.reset_to_idle();
    };
    self.ensure_active(word.unit)?;
    self.track_unit(word.unit, word.initial, vec![word.selection], config)?;

    let matches = self.matches.find_all(&word.query).await?;
    if !self.is_current(word.epoch) {
      tracing::debug!("session reset while counting matches");
      return Ok(());
    }
    let total = matches.iter().map(|found| found.ranges.len()).sum();
    self.session.borrow_mut().total_matches = total;
    tracing::trace!(total, "matches counted");
    self.refresh_decorations();
    Ok(())
  }

  async fn track_next_match(&self) -> Result<()> {
    let (query, from, start, epoch) = {
      let session = self.session.borrow();
      if session.tracked_matches() >= session.total_matches {
        tracing::trace!(total = session.total_matches, "every match is tracked");
        return Ok(());
      }
      let last = session.order.last().and_then(|id| session.cursors.get(*id));
      let (Some(query), Some(start), Some(last)) = (session.query.clone(), session.start, last) else {
        return Ok(());
      };
      let Some(last_match) = last.match_selections.last() else {
        return Ok(());
      };
      let from = UnitPosition {
        unit:     last.unit,
        position: last_match.end(),
      };
      (query, from, start, session.epoch)
    };

    let found = self.workspace.borrow().find_next_match(&query, from, start)?;
    let Some(found) = found else {
      tracing::trace!(word = %query.word, "no further match");
      return Ok(());
    };
    let selection = Selection::from_range(found.range, SelectionDirection::Ltr);

    let existing = self.session.borrow().cursor_for_unit(found.unit);
    match existing {
      Some(id) => self.add_match_selection(id, selection)?,
      None => {
        let initial = self.focus_unit(found.unit, selection)?;
        let config = self.resolver.resolve(found.unit).await;
        if !self.is_current(epoch) {
          tracing::debug!(unit = ?found.unit, "session reset while resolving a match");
          return Ok(());
        }
        let Some(config) = config else {
          tracing::debug!(unit = ?found.unit, "matched unit went away");
          return Ok(());
        };
        self.ensure_active(found.unit)?;
        self.track_unit(found.unit, initial, vec![selection], config)?;
      },
    }
    self.refresh_decorations();
    Ok(())
  }

  fn add_match_selection(&self, id: TrackedCursorId, selection: Selection) -> Result<()> {
    let unit = self.tracked_unit(id)?;
    if self.workspace.borrow().active() != Some(unit) {
      self.sync_anchor_controller()?;
      self.workspace.borrow_mut().set_active(unit)?;
    }

    let mut workspace = self.workspace.borrow_mut();
    let mut session = self.session.borrow_mut();
    let session = &mut *session;
    let cursor = session
      .cursors
      .get_mut(id)
      .ok_or(CoordinatorError::UnknownCursor(id))?;
    cursor.match_selections.push(selection);
    let selections = cursor.match_selections.clone();
    workspace.set_selections(unit, &selections)?;
    cursor
      .controller
      .set_selections(workspace.unit(unit)?.document(), &selections);
    session.touch(id);
    tracing::trace!(?unit, matches = selections.len(), "match added to tracked unit");
    Ok(())
  }

  /// Moves focus to `unit` and selects `selection` there. Returns the
  /// selection the unit had before.
  fn focus_unit(&self, unit: UnitId, selection: Selection) -> Result<Selection> {
    Self::ensure_supported(&self.workspace.borrow(), unit)?;
    self.sync_anchor_controller()?;
    let mut workspace = self.workspace.borrow_mut();
    workspace.open_editor(unit)?;
    let initial = workspace.selections(unit)?[0];
    workspace.set_active(unit)?;
    workspace.set_selections(unit, &[selection])?;
    Ok(initial)
  }

  fn track_unit(
    &self,
    unit: UnitId,
    initial: Selection,
    match_selections: Vec<Selection>,
    config: Arc<CursorConfiguration>,
  ) -> Result<TrackedCursorId> {
    let undo_snapshot = {
      let mut workspace = self.workspace.borrow_mut();
      workspace.flush(unit)?;
      let resource = workspace.unit(unit)?.document().id();
      workspace.ledger().lock().elements(resource).past_ids()
    };
    let mut session = self.session.borrow_mut();
    let id = session.cursors.insert(TrackedCursor::new(
      unit,
      initial,
      match_selections,
      config,
      undo_snapshot,
    ));
    session.order.push(id);
    tracing::debug!(?unit, cursors = session.order.len(), "unit tracked");
    Ok(id)
  }

  /// Tracks every match at once. `supplied` replaces the workspace search,
  /// e.g. when the host already knows the matches.
  pub async fn select_all_matches(&self, supplied: Option<Vec<UnitMatches>>) -> Result<()> {
    let (query, epoch, start_word) = match self.state() {
      MultiSelectState::Editing => {
        tracing::trace!("select all ignored while editing");
        return Ok(());
      },
      MultiSelectState::Idle => {
        let Some(word) = self.select_start_word()? else {
          return Ok(());
        };
        (word.query.clone(), word.epoch, Some(word))
      },
      MultiSelectState::Selecting => {
        let session = self.session.borrow();
        let Some(query) = session.query.clone() else {
          return Ok(());
        };
        (query, session.epoch, None)
      },
    };

    let matches = match supplied {
      Some(matches) => matches,
      None => self.matches.find_all(&query).await?,
    };
    if !self.is_current(epoch) {
      tracing::debug!("session reset while searching");
      return Ok(());
    }

    let mut total = 0;
    for found in &matches {
      total += found.ranges.len();
      if found.ranges.is_empty() {
        continue;
      }
      let selections: Vec<Selection> = found
        .ranges
        .iter()
        .map(|range| Selection::from_range(*range, SelectionDirection::Ltr))
        .collect();

      let existing = self.session.borrow().cursor_for_unit(found.unit);
      if let Some(id) = existing {
        let mut workspace = self.workspace.borrow_mut();
        let mut session = self.session.borrow_mut();
        if let Some(cursor) = session.cursors.get_mut(id) {
          cursor
            .controller
            .set_selections(workspace.unit(found.unit)?.document(), &selections);
          cursor.match_selections = selections;
        }
        workspace.open_editor(found.unit)?;
        continue;
      }

      let initial = {
        let mut workspace = self.workspace.borrow_mut();
        Self::ensure_supported(&workspace, found.unit)?;
        match &start_word {
          Some(word) if word.unit == found.unit => word.initial,
          _ => {
            workspace.open_editor(found.unit)?;
            workspace.selections(found.unit)?[0]
          },
        }
      };
      let config = self.resolver.resolve(found.unit).await;
      if !self.is_current(epoch) {
        tracing::debug!(unit = ?found.unit, "session reset while resolving a match");
        return Ok(());
      }
      let Some(config) = config else {
        continue;
      };
      self.track_unit(found.unit, initial, selections, config)?;
    }

    if self.session.borrow().cursors.is_empty() {
      tracing::debug!(word = %query.word, "no matches to select");
      return self.reset_to_idle();
    }

    let anchor = {
      let workspace = self.workspace.borrow();
      let session = self.session.borrow();
      workspace
        .active()
        .filter(|unit| session.cursor_for_unit(*unit).is_some())
        .or_else(|| {
          session
            .order
            .first()
            .and_then(|id| session.cursors.get(*id))
            .map(|cursor| cursor.unit)
        })
    };
    if let Some(anchor) = anchor {
      if self.workspace.borrow().active() != Some(anchor) {
        self.sync_anchor_controller()?;
      }
      let mut workspace = self.workspace.borrow_mut();
      let session = self.session.borrow();
      workspace.set_active(anchor)?;
      if let Some(cursor) = session
        .cursor_for_unit(anchor)
        .and_then(|id| session.cursors.get(id))
      {
        workspace.set_selections(anchor, &cursor.match_selections)?;
      }
    }

    {
      let mut session = self.session.borrow_mut();
      session.state = MultiSelectState::Selecting;
      session.total_matches = total;
      if session.start.is_none() {
        session.start = matches.iter().find_map(|found| {
          found.ranges.first().map(|range| UnitPosition {
            unit:     found.unit,
            position: range.start(),
          })
        });
      }
      session.query = Some(query);
      tracing::debug!(total, cursors = session.order.len(), "all matches selected");
    }
    self.refresh_decorations();
    Ok(())
  }

  /// Types `text` at the anchor and at every follower.
  pub fn type_text(&self, text: &str) -> Result<()> {
    let Some(anchor) = self.workspace.borrow().active() else {
      return Ok(());
    };
    self.on_will_type(text)?;
    let commit = self.workspace.borrow_mut().type_text(anchor, text)?;
    self.on_did_type(commit)
  }

  /// First phase of typing: the followers get the text before the anchor.
  pub fn on_will_type(&self, text: &str) -> Result<()> {
    self.relay_to_followers(|controller, document| controller.type_text(document, text))
  }

  /// Second phase of typing, after the anchor committed an edit.
  pub fn on_did_type(&self, commit: AnchorCommit) -> Result<()> {
    {
      let mut session = self.session.borrow_mut();
      if session.state == MultiSelectState::Idle {
        return Ok(());
      }
      if self.workspace.borrow().active() != Some(commit.unit()) {
        tracing::debug!(unit = ?commit.unit(), "edit committed outside the anchor");
        return Ok(());
      }
      if session.state == MultiSelectState::Selecting {
        tracing::debug!(version = commit.version(), "multi-cursor editing started");
      }
      session.state = MultiSelectState::Editing;
      for cursor in session.cursors.values_mut() {
        cursor.match_selections.clear();
      }
    }
    self.sync_anchor_controller()?;
    self.refresh_decorations();
    Ok(())
  }

  /// Runs an editor operation at the anchor and at every follower.
  pub fn run_operation(&self, operation: EditorOperation) -> Result<()> {
    let Some(anchor) = self.workspace.borrow().active() else {
      return Ok(());
    };
    self.on_operation(&operation)?;
    let commit = self.workspace.borrow_mut().run_operation(anchor, &operation)?;
    self.on_did_type(commit)
  }

  pub fn on_operation(&self, operation: &EditorOperation) -> Result<()> {
    tracing::trace!(operation = operation.name(), "relaying operation");
    self.relay_to_followers(|controller, document| operation.apply(controller, document))
  }

  fn relay_to_followers(
    &self,
    mut edit: impl FnMut(&mut CursorsController, &mut Document) -> controller::Result<()>,
  ) -> Result<()> {
    let mut workspace = self.workspace.borrow_mut();
    let mut session = self.session.borrow_mut();
    let session = &mut *session;
    if session.state == MultiSelectState::Idle {
      return Ok(());
    }
    let anchor = workspace.active();
    for id in &session.order {
      let Some(cursor) = session.cursors.get_mut(*id) else {
        continue;
      };
      if Some(cursor.unit) == anchor {
        continue;
      }
      let Ok(unit) = workspace.unit_mut(cursor.unit) else {
        tracing::trace!(unit = ?cursor.unit, "follower unit closed");
        continue;
      };
      edit(&mut cursor.controller, unit.document_mut())?;
    }
    Ok(())
  }

  /// Moves the anchor's cursors and relays the movement.
  pub fn move_anchor(&self, motion: CursorMove, extend: bool) -> Result<()> {
    let Some(anchor) = self.workspace.borrow().active() else {
      return Ok(());
    };
    let (before, after) = self
      .workspace
      .borrow_mut()
      .move_cursors(anchor, motion, extend)?;
    self.on_anchor_selection_changed(before, after, SelectionChangeReason::Explicit)
  }

  /// Applies the anchor's selection movement to every follower. Only
  /// explicit moves are relayed.
  pub fn on_anchor_selection_changed(
    &self,
    before: Selection,
    after: Selection,
    reason: SelectionChangeReason,
  ) -> Result<()> {
    if !reason.is_relayed() || self.state() == MultiSelectState::Idle {
      return Ok(());
    }
    let delta = SelectionDelta::between(before, after);
    if delta.is_empty() {
      return Ok(());
    }
    {
      let workspace = self.workspace.borrow();
      let mut session = self.session.borrow_mut();
      let anchor = workspace.active();
      for cursor in session.cursors.values_mut() {
        if Some(cursor.unit) == anchor {
          continue;
        }
        let Ok(unit) = workspace.unit(cursor.unit) else {
          continue;
        };
        let moved: Vec<Selection> = cursor
          .controller
          .selections()
          .iter()
          .map(|selection| delta.apply(*selection))
          .collect();
        cursor.controller.set_selections(unit.document(), &moved);
      }
    }
    tracing::trace!(?delta, "anchor movement relayed");
    self.sync_anchor_controller()?;
    self.refresh_decorations();
    Ok(())
  }

  /// Copies the anchor editor's selections into the anchor's tracked
  /// controller.
  fn sync_anchor_controller(&self) -> Result<()> {
    let workspace = self.workspace.borrow();
    let Some(anchor) = workspace.active() else {
      return Ok(());
    };
    let mut session = self.session.borrow_mut();
    let Some(id) = session.cursor_for_unit(anchor) else {
      return Ok(());
    };
    let unit = workspace.unit(anchor)?;
    if let Some(cursor) = session.cursors.get_mut(id) {
      cursor
        .controller
        .set_selections(unit.document(), &unit.selections());
    }
    Ok(())
  }

  fn sync_controllers(&self, restored: &[(UnitId, Selections)]) {
    let workspace = self.workspace.borrow();
    let mut session = self.session.borrow_mut();
    for (unit, selections) in restored {
      let Some(id) = session.cursor_for_unit(*unit) else {
        continue;
      };
      let (Some(cursor), Ok(entry)) = (session.cursors.get_mut(id), workspace.unit(*unit)) else {
        continue;
      };
      cursor.controller.set_selections(entry.document(), selections);
    }
  }

  fn refresh_decorations(&self) {
    let mut workspace = self.workspace.borrow_mut();
    let mut session = self.session.borrow_mut();
    let anchor = workspace.active();
    for cursor in session.cursors.values_mut() {
      let decorations = if Some(cursor.unit) == anchor {
        Vec::new()
      } else {
        Decoration::for_selections(&cursor.controller.selections())
      };
      let Ok(unit) = workspace.unit_mut(cursor.unit) else {
        continue;
      };
      cursor.decoration_ids = unit
        .decorations_mut()
        .delta_decorations(&cursor.decoration_ids, &decorations);
    }
  }

  /// Rebuilds cursor configurations after an options change.
  pub fn set_options(&self, options: EditorOptions) -> Result<()> {
    let changed = self.workspace.borrow_mut().set_options(options)?;
    if !CursorConfiguration::should_recreate(&changed) {
      return Ok(());
    }
    let mut workspace = self.workspace.borrow_mut();
    let mut session = self.session.borrow_mut();
    for cursor in session.cursors.values_mut() {
      cursor.set_config(workspace.cursor_config(cursor.unit)?);
    }
    Ok(())
  }

  pub fn undo(&self) -> Result<()> {
    self.jump(JumpDirection::Undo)
  }

  pub fn redo(&self) -> Result<()> {
    self.jump(JumpDirection::Redo)
  }

  /// Outside a session this is the anchor's undo. Inside one, every tracked
  /// unit steps back once; a workspace element spanning several of them
  /// counts for all.
  fn jump(&self, direction: JumpDirection) -> Result<()> {
    let units: Vec<UnitId> = {
      let session = self.session.borrow();
      if session.state == MultiSelectState::Idle {
        self.workspace.borrow().active().into_iter().collect()
      } else {
        session
          .order
          .iter()
          .filter_map(|id| session.cursors.get(*id))
          .map(|cursor| cursor.unit)
          .collect()
      }
    };
    self.flush_tracked()?;

    let mut restored: Vec<(UnitId, Selections)> = Vec::new();
    for unit in units {
      if restored.iter().any(|(other, _)| *other == unit) {
        continue;
      }
      let mut workspace = self.workspace.borrow_mut();
      let replayed = match direction {
        JumpDirection::Undo => workspace.undo(unit)?,
        JumpDirection::Redo => workspace.redo(unit)?,
      };
      restored.extend(replayed);
    }
    self.sync_controllers(&restored);
    self.refresh_decorations();
    Ok(())
  }

  /// Seals pending edits of tracked units. Followers seal with their own
  /// cursors' selections.
  fn flush_tracked(&self) -> Result<()> {
    let mut workspace = self.workspace.borrow_mut();
    let session = self.session.borrow();
    let anchor = workspace.active();
    for cursor in session.cursors.values() {
      if Some(cursor.unit) == anchor {
        workspace.flush(cursor.unit)?;
        continue;
      }
      let Ok(unit) = workspace.unit_mut(cursor.unit) else {
        continue;
      };
      unit.document_mut().push_stack_element(&cursor.selections())?;
    }
    Ok(())
  }

  /// Ends the session. The session's edits become one undo element and every
  /// tracked unit gets its pre-session selection back.
  pub fn reset_to_idle(&self) -> Result<()> {
    self.end_session(SessionEnd::Exit)
  }

  /// Ends the session and keeps its edits as the new baseline.
  pub fn accept(&self) -> Result<()> {
    self.end_session(SessionEnd::Accept)
  }

  /// Ends the session and drops every change of the tracked units since the
  /// last accept.
  pub fn reject(&self) -> Result<()> {
    self.end_session(SessionEnd::Reject)
  }

  fn end_session(&self, end: SessionEnd) -> Result<()> {
    let mut session = {
      let mut session = self.session.borrow_mut();
      if session.state == MultiSelectState::Idle && session.cursors.is_empty() {
        return Ok(());
      }
      let epoch = session.epoch + 1;
      mem::replace(&mut *session, Session {
        epoch,
        ..Session::default()
      })
    };
    let cursors: Vec<TrackedCursor> = session
      .order
      .iter()
      .filter_map(|id| session.cursors.remove(*id))
      .collect();

    let mut workspace = self.workspace.borrow_mut();
    let anchor = workspace.active();
    for cursor in &cursors {
      if Some(cursor.unit) == anchor {
        workspace.flush(cursor.unit)?;
      } else if let Ok(unit) = workspace.unit_mut(cursor.unit) {
        unit.document_mut().push_stack_element(&cursor.selections())?;
      }
    }

    if end != SessionEnd::Reject {
      consolidate(&workspace, &cursors, anchor);
    }

    for cursor in &cursors {
      let Ok(unit) = workspace.unit_mut(cursor.unit) else {
        continue;
      };
      unit
        .decorations_mut()
        .delta_decorations(&cursor.decoration_ids, &[]);
      match end {
        SessionEnd::Exit => {},
        SessionEnd::Accept => workspace.accept(cursor.unit)?,
        SessionEnd::Reject => workspace.reject(cursor.unit, &cursor.undo_snapshot)?,
      }
      workspace.set_selections(cursor.unit, &[cursor.initial_selection])?;
    }
    tracing::debug!(?end, cursors = cursors.len(), "multi-cursor session ended");
    Ok(())
  }
}

/// Folds the resource elements each tracked unit gained during the session
/// into one workspace element.
fn consolidate(workspace: &Workspace, cursors: &[TrackedCursor], anchor: Option<UnitId>) {
  let mut ledger = workspace.ledger().lock();
  let mut edits = Vec::new();
  let mut selections_before = Vec::new();
  let mut selections_after = Vec::new();
  for cursor in cursors {
    let Ok(unit) = workspace.unit(cursor.unit) else {
      continue;
    };
    let resource = unit.document().id();
    let past: Vec<ElementId> = ledger
      .elements(resource)
      .past
      .iter()
      .filter(|element| matches!(element, UndoElement::Resource(_)))
      .map(UndoElement::id)
      .collect();
    let new = cursor.new_elements(&past);
    for element in ledger.remove_elements(resource, &new) {
      if let UndoElement::Resource(edit) = element {
        edits.push(edit);
      }
    }
    let after = if Some(cursor.unit) == anchor {
      unit.selections()
    } else {
      cursor.selections()
    };
    selections_before.push((resource, smallvec![cursor.initial_selection]));
    selections_after.push((resource, after));
  }
  if edits.is_empty() {
    tracing::trace!("session made no edits");
    return;
  }
  edits.sort_by_key(|edit| edit.id);
  tracing::debug!(edits = edits.len(), units = selections_before.len(), "session edits consolidated");
  ledger.push_workspace_element(WorkspaceUndoElement {
    id: ElementId::next(),
    label: SESSION_UNDO_LABEL.to_string(),
    edits,
    selections_before,
    selections_after,
  });
}
