//! Editable units sharing one undo ledger.
//!
//! Every [`Unit`] has its own [`Document`], an optional visible editor and a
//! decoration store. The workspace knows which unit has focus and replays
//! undo elements, including workspace elements that span several units.

use std::{
  cell::RefCell,
  collections::HashMap,
  rc::Rc,
  sync::Arc,
};

use ropey::Rope;
use slotmap::SlotMap;
use smallvec::smallvec;
use the_edit::{
  config::{
    CursorConfiguration,
    EditorOptions,
    LanguageConfiguration,
    LanguageRegistry,
    OptionKey,
  },
  controller::{
    CursorMove,
    CursorsController,
  },
  document::Document,
  history::{
    ElementId,
    JumpDirection,
    ResourceEdit,
    ResourceId,
    Selections,
    SharedLedger,
    UndoElement,
    UndoRedoLedger,
  },
  position::Position,
  range::Range,
  search::{
    self,
    SearchQuery,
  },
  selection::Selection,
};

use crate::{
  decorations::DecorationStore,
  error::{
    CoordinatorError,
    Result,
  },
  relay::{
    AnchorCommit,
    EditorOperation,
  },
};

slotmap::new_key_type! {
    pub struct UnitId;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UnitKind {
  /// Plain editable text.
  Code,
  /// Rendered markup; not part of multi-cursor sessions.
  Markup,
}

#[derive(Debug)]
pub struct Unit {
  kind:        UnitKind,
  language_id: String,
  /// Text as of the last accept.
  original:    Rope,
  document:    Document,
  editor:      Option<CursorsController>,
  decorations: DecorationStore,
}

impl Unit {
  pub fn kind(&self) -> UnitKind {
    self.kind
  }

  pub fn language_id(&self) -> &str {
    &self.language_id
  }

  pub fn original(&self) -> &Rope {
    &self.original
  }

  pub fn document(&self) -> &Document {
    &self.document
  }

  pub(crate) fn document_mut(&mut self) -> &mut Document {
    &mut self.document
  }

  pub fn editor(&self) -> Option<&CursorsController> {
    self.editor.as_ref()
  }

  pub fn decorations(&self) -> &DecorationStore {
    &self.decorations
  }

  pub(crate) fn decorations_mut(&mut self) -> &mut DecorationStore {
    &mut self.decorations
  }

  /// Editor selections, or a caret at the start when no editor is open.
  pub fn selections(&self) -> Selections {
    self
      .editor
      .as_ref()
      .map(CursorsController::selections)
      .unwrap_or_else(|| smallvec![Selection::caret(Position::default())])
  }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnitMatches {
  pub unit:   UnitId,
  pub ranges: Vec<Range>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UnitMatch {
  pub unit:  UnitId,
  pub range: Range,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UnitPosition {
  pub unit:     UnitId,
  pub position: Position,
}

pub type SharedWorkspace = Rc<RefCell<Workspace>>;

#[derive(Debug)]
pub struct Workspace {
  units:     SlotMap<UnitId, Unit>,
  order:     Vec<UnitId>,
  resources: HashMap<ResourceId, UnitId>,
  active:    Option<UnitId>,
  ledger:    SharedLedger,
  options:   EditorOptions,
  languages: LanguageRegistry,
  configs:   HashMap<String, Arc<CursorConfiguration>>,
}

impl Workspace {
  pub fn new(options: EditorOptions) -> Self {
    Self {
      units: SlotMap::with_key(),
      order: Vec::new(),
      resources: HashMap::new(),
      active: None,
      ledger: UndoRedoLedger::shared(),
      options,
      languages: LanguageRegistry::default(),
      configs: HashMap::new(),
    }
  }

  pub fn into_shared(self) -> SharedWorkspace {
    Rc::new(RefCell::new(self))
  }

  pub fn options(&self) -> &EditorOptions {
    &self.options
  }

  pub fn ledger(&self) -> &SharedLedger {
    &self.ledger
  }

  pub fn register_language(&mut self, language: LanguageConfiguration) {
    self.configs.remove(&language.language_id);
    self.languages.register(language);
  }

  pub fn add_unit(&mut self, kind: UnitKind, language_id: impl Into<String>, text: &str) -> UnitId {
    let document = Document::new(text, Arc::clone(&self.ledger));
    let resource = document.id();
    let unit = self.units.insert(Unit {
      kind,
      language_id: language_id.into(),
      original: document.text().clone(),
      document,
      editor: None,
      decorations: DecorationStore::new(),
    });
    self.order.push(unit);
    self.resources.insert(resource, unit);
    tracing::trace!(?unit, ?kind, "added unit");
    unit
  }

  /// Units in display order.
  pub fn units(&self) -> &[UnitId] {
    &self.order
  }

  pub fn unit(&self, unit: UnitId) -> Result<&Unit> {
    self.units.get(unit).ok_or(CoordinatorError::UnknownUnit(unit))
  }

  pub(crate) fn unit_mut(&mut self, unit: UnitId) -> Result<&mut Unit> {
    self
      .units
      .get_mut(unit)
      .ok_or(CoordinatorError::UnknownUnit(unit))
  }

  pub fn unit_for_resource(&self, resource: ResourceId) -> Option<UnitId> {
    self.resources.get(&resource).copied()
  }

  pub fn text(&self, unit: UnitId) -> Result<String> {
    Ok(self.unit(unit)?.document.text().to_string())
  }

  pub fn active(&self) -> Option<UnitId> {
    self.active
  }

  pub fn set_active(&mut self, unit: UnitId) -> Result<()> {
    self.unit(unit)?;
    if self.active != Some(unit) {
      tracing::debug!(?unit, "focus moved");
      self.active = Some(unit);
    }
    Ok(())
  }

  /// Cursor configuration for `unit`, shared by all units of a language until
  /// the options change.
  pub fn cursor_config(&mut self, unit: UnitId) -> Result<Arc<CursorConfiguration>> {
    let language_id = self.unit(unit)?.language_id.clone();
    if let Some(config) = self.configs.get(&language_id) {
      return Ok(Arc::clone(config));
    }
    let language = self.languages.get(&language_id);
    let config = Arc::new(CursorConfiguration::new(&self.options, language));
    self.configs.insert(language_id, Arc::clone(&config));
    Ok(config)
  }

  /// Replaces the options and returns the keys that changed. Open editors get
  /// a new cursor configuration when any of them affects cursors.
  pub fn set_options(&mut self, options: EditorOptions) -> Result<Vec<OptionKey>> {
    let changed = self.options.changed_keys(&options);
    self.options = options;
    if CursorConfiguration::should_recreate(&changed) {
      self.configs.clear();
      for unit in self.order.clone() {
        let config = self.cursor_config(unit)?;
        if let Some(editor) = self.unit_mut(unit)?.editor.as_mut() {
          editor.set_config(config);
        }
      }
      tracing::debug!(?changed, "cursor configuration recreated");
    }
    Ok(changed)
  }

  fn editor_parts(&mut self, unit: UnitId) -> Result<(&mut CursorsController, &mut Document)> {
    let config = self.cursor_config(unit)?;
    let entry = self.unit_mut(unit)?;
    let editor = entry
      .editor
      .get_or_insert_with(|| CursorsController::new(config, &[Selection::caret(Position::default())]));
    Ok((editor, &mut entry.document))
  }

  /// Opens the visible editor of `unit` if it is not open yet.
  pub fn open_editor(&mut self, unit: UnitId) -> Result<()> {
    self.editor_parts(unit).map(|_| ())
  }

  pub fn selections(&self, unit: UnitId) -> Result<Selections> {
    Ok(self.unit(unit)?.selections())
  }

  pub fn set_selections(&mut self, unit: UnitId, selections: &[Selection]) -> Result<()> {
    let (editor, document) = self.editor_parts(unit)?;
    editor.set_selections(&*document, selections);
    Ok(())
  }

  /// Types into the editor of `unit`.
  pub fn type_text(&mut self, unit: UnitId, text: &str) -> Result<AnchorCommit> {
    let (editor, document) = self.editor_parts(unit)?;
    editor.type_text(document, text)?;
    Ok(AnchorCommit::new(unit, document.version()))
  }

  pub fn run_operation(&mut self, unit: UnitId, operation: &EditorOperation) -> Result<AnchorCommit> {
    let (editor, document) = self.editor_parts(unit)?;
    operation.apply(editor, document)?;
    Ok(AnchorCommit::new(unit, document.version()))
  }

  /// Moves the cursors of the editor of `unit` and returns its primary
  /// selection before and after the move.
  pub fn move_cursors(
    &mut self,
    unit: UnitId,
    motion: CursorMove,
    extend: bool,
  ) -> Result<(Selection, Selection)> {
    let (editor, document) = self.editor_parts(unit)?;
    let before = editor.primary_selection();
    editor.move_cursors(&*document, motion, extend);
    Ok((before, editor.primary_selection()))
  }

  /// Every match in every code unit, in display order.
  pub fn find_all_matches(&self, query: &SearchQuery) -> Result<Vec<UnitMatches>> {
    let mut found = Vec::new();
    for &unit in &self.order {
      let Some(entry) = self.units.get(unit) else {
        continue;
      };
      if entry.kind != UnitKind::Code {
        continue;
      }
      let ranges = search::find_matches(&entry.document, query)?;
      if !ranges.is_empty() {
        found.push(UnitMatches { unit, ranges });
      }
    }
    Ok(found)
  }

  /// First match at or after `from` in display order. The search wraps to
  /// the first unit but never reaches `wrap_start` again.
  pub fn find_next_match(
    &self,
    query: &SearchQuery,
    from: UnitPosition,
    wrap_start: UnitPosition,
  ) -> Result<Option<UnitMatch>> {
    let index_of = |unit: UnitId| self.order.iter().position(|&other| other == unit);
    let (Some(from_idx), Some(wrap_idx)) = (index_of(from.unit), index_of(wrap_start.unit)) else {
      return Ok(None);
    };
    let from_key = (from_idx, from.position);
    let wrap_key = (wrap_idx, wrap_start.position);

    let mut candidates = Vec::new();
    for found in self.find_all_matches(query)? {
      let Some(idx) = index_of(found.unit) else {
        continue;
      };
      candidates.extend(found.ranges.into_iter().map(|range| {
        ((idx, range.start()), UnitMatch {
          unit: found.unit,
          range,
        })
      }));
    }

    let wrapped = from_key < wrap_key;
    if !wrapped && let Some((_, found)) = candidates.iter().find(|(key, _)| *key >= from_key) {
      return Ok(Some(*found));
    }
    Ok(
      candidates
        .iter()
        .find(|(key, _)| (!wrapped || *key >= from_key) && *key < wrap_key)
        .map(|(_, found)| *found),
    )
  }

  /// Seals the pending edits of `unit` into an undo element.
  pub fn flush(&mut self, unit: UnitId) -> Result<()> {
    let entry = self.unit_mut(unit)?;
    let selections = entry.selections();
    entry.document.push_stack_element(&selections)?;
    Ok(())
  }

  pub fn flush_all(&mut self) -> Result<()> {
    for unit in self.order.clone() {
      self.flush(unit)?;
    }
    Ok(())
  }

  /// Undoes the latest element of `unit` and returns the selections it
  /// restored, per unit.
  pub fn undo(&mut self, unit: UnitId) -> Result<Vec<(UnitId, Selections)>> {
    self.jump(unit, JumpDirection::Undo)
  }

  pub fn redo(&mut self, unit: UnitId) -> Result<Vec<(UnitId, Selections)>> {
    self.jump(unit, JumpDirection::Redo)
  }

  fn jump(&mut self, unit: UnitId, direction: JumpDirection) -> Result<Vec<(UnitId, Selections)>> {
    self.flush_all()?;
    let resource = self.unit(unit)?.document.id();
    let jump = {
      let ledger = self.ledger.lock();
      match direction {
        JumpDirection::Undo => ledger.undo(resource)?,
        JumpDirection::Redo => ledger.redo(resource)?,
      }
    };
    let Some(jump) = jump else {
      tracing::trace!(?unit, ?direction, "nothing to replay");
      return Ok(Vec::new());
    };

    let revert = direction == JumpDirection::Undo;
    let mut restored = Vec::new();
    match &jump.element {
      UndoElement::Resource(edit) => {
        self.unit_mut(unit)?.document.replay(edit, revert)?;
        let selections = if revert {
          &edit.selections_before
        } else {
          &edit.selections_after
        };
        restored.push((unit, selections.clone()));
      },
      UndoElement::Workspace(element) => {
        let mut edits: Vec<&ResourceEdit> = element.edits.iter().collect();
        if revert {
          edits.reverse();
        }
        for edit in edits {
          let Some(target) = self.unit_for_resource(edit.resource) else {
            tracing::warn!(resource = ?edit.resource, "undo element refers to a closed unit");
            continue;
          };
          self.unit_mut(target)?.document.replay(edit, revert)?;
        }
        let selections = if revert {
          &element.selections_before
        } else {
          &element.selections_after
        };
        restored.extend(selections.iter().filter_map(|(resource, selections)| {
          self
            .unit_for_resource(*resource)
            .map(|target| (target, selections.clone()))
        }));
      },
    }
    self.ledger.lock().apply_jump(&jump)?;

    for (target, selections) in &restored {
      self.set_selections(*target, selections)?;
    }
    tracing::debug!(
      ?direction,
      element = ?jump.element.id(),
      units = restored.len(),
      "replayed undo element"
    );
    Ok(restored)
  }

  /// Keeps the current text: it becomes the unit's original.
  pub fn accept(&mut self, unit: UnitId) -> Result<()> {
    let entry = self.unit_mut(unit)?;
    entry.original = entry.document.text().clone();
    Ok(())
  }

  /// Reverts and forgets the edits `unit` gained since its past undo list
  /// was `since`, newest first. Earlier edits and the baseline stay as they
  /// are.
  pub fn reject(&mut self, unit: UnitId, since: &[ElementId]) -> Result<()> {
    self.flush(unit)?;
    let resource = self.unit(unit)?.document.id();
    let ledger = Arc::clone(&self.ledger);
    let removed = {
      let mut ledger = ledger.lock();
      let ids: Vec<ElementId> = ledger
        .elements(resource)
        .past
        .iter()
        .filter(|element| matches!(element, UndoElement::Resource(_)))
        .map(UndoElement::id)
        .filter(|id| !since.contains(id))
        .collect();
      ledger.remove_elements(resource, &ids)
    };

    let entry = self.unit_mut(unit)?;
    for element in removed.iter().rev() {
      if let UndoElement::Resource(edit) = element {
        entry.document.replay(edit, true)?;
      }
    }
    if let Some(editor) = entry.editor.as_mut() {
      let selections = editor.selections();
      editor.set_selections(&entry.document, &selections);
    }
    tracing::trace!(?unit, reverted = removed.len(), "edits rejected");
    Ok(())
  }

  pub fn is_modified(&self, unit: UnitId) -> Result<bool> {
    let entry = self.unit(unit)?;
    Ok(entry.original != *entry.document.text())
  }
}

#[cfg(test)]
mod test {
  use the_edit::config::DEFAULT_WORD_SEPARATORS;

  use super::*;

  fn workspace(texts: &[&str]) -> (Workspace, Vec<UnitId>) {
    let mut workspace = Workspace::new(EditorOptions::default());
    let units = texts
      .iter()
      .map(|text| workspace.add_unit(UnitKind::Code, "plaintext", text))
      .collect();
    (workspace, units)
  }

  fn at(unit: UnitId, line: usize, column: usize) -> UnitPosition {
    UnitPosition {
      unit,
      position: Position::new(line, column),
    }
  }

  #[test]
  fn next_match_crosses_units_and_wraps() {
    let (workspace, units) = workspace(&["foo x foo", "bar", "y foo"]);
    let query = SearchQuery::whole_word("foo", DEFAULT_WORD_SEPARATORS);
    let start = at(units[0], 1, 7);

    let next = |from| workspace.find_next_match(&query, from, start).unwrap();
    assert_eq!(
      next(at(units[0], 1, 10)),
      Some(UnitMatch {
        unit:  units[2],
        range: Range::from_coords(1, 3, 1, 6),
      })
    );
    // wraps to the first unit
    assert_eq!(
      next(at(units[2], 1, 6)).map(|found| (found.unit, found.range.start())),
      Some((units[0], Position::new(1, 1)))
    );
    // but not back onto the start
    assert_eq!(next(at(units[0], 1, 4)), None);
  }

  #[test]
  fn markup_units_are_not_searched() {
    let (mut workspace, units) = workspace(&["foo"]);
    workspace.add_unit(UnitKind::Markup, "markdown", "foo");
    let query = SearchQuery::whole_word("foo", DEFAULT_WORD_SEPARATORS);
    let matches = workspace.find_all_matches(&query).unwrap();
    assert_eq!(matches.len(), 1);
    assert_eq!(matches[0].unit, units[0]);
  }

  #[test]
  fn resource_undo_restores_selections() {
    let (mut workspace, units) = workspace(&["abc"]);
    let unit = units[0];
    workspace
      .set_selections(unit, &[Selection::caret(Position::new(1, 4))])
      .unwrap();
    workspace.type_text(unit, "d").unwrap();
    assert_eq!(workspace.text(unit).unwrap(), "abcd");

    let restored = workspace.undo(unit).unwrap();
    assert_eq!(workspace.text(unit).unwrap(), "abc");
    assert_eq!(restored.len(), 1);
    assert_eq!(
      workspace.selections(unit).unwrap().as_slice(),
      &[Selection::caret(Position::new(1, 4))]
    );

    workspace.redo(unit).unwrap();
    assert_eq!(workspace.text(unit).unwrap(), "abcd");
    assert_eq!(
      workspace.selections(unit).unwrap().as_slice(),
      &[Selection::caret(Position::new(1, 5))]
    );
  }

  #[test]
  fn accept_moves_the_baseline() {
    let (mut workspace, units) = workspace(&["one"]);
    let unit = units[0];
    workspace.type_text(unit, "x").unwrap();
    assert!(workspace.is_modified(unit).unwrap());
    workspace.accept(unit).unwrap();
    assert!(!workspace.is_modified(unit).unwrap());
  }

  #[test]
  fn reject_reverts_only_later_edits() {
    let (mut workspace, units) = workspace(&["one"]);
    let unit = units[0];
    workspace.type_text(unit, "x").unwrap();
    workspace.flush(unit).unwrap();
    let resource = workspace.unit(unit).unwrap().document().id();
    let since = workspace.ledger().lock().elements(resource).past_ids();

    workspace.type_text(unit, "y").unwrap();
    workspace.flush(unit).unwrap();
    workspace.type_text(unit, "z").unwrap();
    workspace.reject(unit, &since).unwrap();
    assert_eq!(workspace.text(unit).unwrap(), "xone");
    assert_eq!(workspace.ledger().lock().elements(resource).past_ids(), since);

    // history still lines up with the text
    workspace.undo(unit).unwrap();
    assert_eq!(workspace.text(unit).unwrap(), "one");
    assert!(!workspace.is_modified(unit).unwrap());
  }

  #[test]
  fn option_changes_recreate_cursor_configs() {
    let (mut workspace, units) = workspace(&["a"]);
    workspace.open_editor(units[0]).unwrap();
    let before = workspace.cursor_config(units[0]).unwrap();
    assert!(Arc::ptr_eq(&before, &workspace.cursor_config(units[0]).unwrap()));

    let options = EditorOptions {
      word_wrap: !workspace.options().word_wrap,
      ..workspace.options().clone()
    };
    assert_eq!(workspace.set_options(options).unwrap(), vec![OptionKey::WordWrap]);
    assert!(Arc::ptr_eq(&before, &workspace.cursor_config(units[0]).unwrap()));

    let options = EditorOptions {
      tab_size: 8,
      ..workspace.options().clone()
    };
    workspace.set_options(options).unwrap();
    let after = workspace.cursor_config(units[0]).unwrap();
    assert!(!Arc::ptr_eq(&before, &after));
    assert_eq!(after.tab_size, 8);
    let editor = workspace.unit(units[0]).unwrap().editor().unwrap();
    assert_eq!(editor.config().tab_size, 8);
  }

  #[test]
  fn unknown_units_are_reported() {
    let (mut workspace, _) = workspace(&["a"]);
    let bogus = UnitId::default();
    assert!(matches!(
      workspace.set_active(bogus),
      Err(CoordinatorError::UnknownUnit(_))
    ));
  }
}
