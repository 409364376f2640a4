//! Undo/redo ledger shared by every document of a workspace.
//!
//! Each resource owns a `past` and a `future` list of [`UndoElement`]s. A
//! [`UndoElement::Resource`] belongs to exactly one resource. A
//! [`UndoElement::Workspace`] element spans several resources and is
//! registered on each of them, so undoing it from any of those resources
//! reverts all of its member edits as one operation.
//!
//! Navigation is two-phase: [`UndoRedoLedger::undo`] and
//! [`UndoRedoLedger::redo`] return a [`LedgerJump`] describing what to apply,
//! and the ledger only moves once the caller confirms with
//! [`UndoRedoLedger::apply_jump`]. History therefore never diverges from the
//! documents when applying an element fails.

use std::{
  collections::HashMap,
  sync::{
    Arc,
    atomic::{
      AtomicU64,
      Ordering,
    },
  },
};

use parking_lot::Mutex;
use smallvec::SmallVec;
use thiserror::Error;

use crate::{
  selection::Selection,
  transaction::Transaction,
};

pub type Result<T> = std::result::Result<T, HistoryError>;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum HistoryError {
  #[error("workspace element {element:?} is not the latest element of resource {resource:?}")]
  NotOnTop {
    element:  ElementId,
    resource: ResourceId,
  },
  #[error("element {0:?} is not in the ledger")]
  UnknownElement(ElementId),
}

/// Stable identity of a document across edits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ResourceId(u64);

impl ResourceId {
  pub fn next() -> Self {
    static NEXT: AtomicU64 = AtomicU64::new(1);
    Self(NEXT.fetch_add(1, Ordering::Relaxed))
  }
}

/// Identity of an undo element. Ids grow monotonically, so sorting by id
/// sorts elements chronologically.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ElementId(u64);

impl ElementId {
  pub fn next() -> Self {
    static NEXT: AtomicU64 = AtomicU64::new(1);
    Self(NEXT.fetch_add(1, Ordering::Relaxed))
  }
}

pub type Selections = SmallVec<[Selection; 1]>;

/// One sealed edit of a single document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceEdit {
  pub id:                ElementId,
  pub resource:          ResourceId,
  pub transaction:       Transaction,
  /// Reverts `transaction`; computed against the text it was applied to.
  pub inversion:         Transaction,
  pub selections_before: Selections,
  pub selections_after:  Selections,
}

/// Several resource edits undone and redone as one operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkspaceUndoElement {
  pub id:                ElementId,
  pub label:             String,
  /// Member edits in the order they were made.
  pub edits:             Vec<ResourceEdit>,
  /// Selections to restore per resource after undo.
  pub selections_before: Vec<(ResourceId, Selections)>,
  /// Selections to restore per resource after redo.
  pub selections_after:  Vec<(ResourceId, Selections)>,
}

impl WorkspaceUndoElement {
  pub fn resources(&self) -> Vec<ResourceId> {
    let mut resources: Vec<_> = self.edits.iter().map(|edit| edit.resource).collect();
    resources.extend(self.selections_before.iter().map(|(resource, _)| *resource));
    resources.sort_unstable();
    resources.dedup();
    resources
  }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UndoElement {
  Resource(ResourceEdit),
  Workspace(Arc<WorkspaceUndoElement>),
}

impl UndoElement {
  pub fn id(&self) -> ElementId {
    match self {
      Self::Resource(edit) => edit.id,
      Self::Workspace(element) => element.id,
    }
  }

  fn resources(&self) -> Vec<ResourceId> {
    match self {
      Self::Resource(edit) => vec![edit.resource],
      Self::Workspace(element) => element.resources(),
    }
  }
}

/// Snapshot of a resource's lists, oldest first.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResourceElements {
  pub past:   Vec<UndoElement>,
  pub future: Vec<UndoElement>,
}

impl ResourceElements {
  pub fn past_ids(&self) -> Vec<ElementId> {
    self.past.iter().map(UndoElement::id).collect()
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JumpDirection {
  Undo,
  Redo,
}

/// A pending undo or redo that has not been applied yet.
#[derive(Debug, Clone)]
pub struct LedgerJump {
  pub direction: JumpDirection,
  pub element:   UndoElement,
}

#[derive(Debug, Default)]
pub struct UndoRedoLedger {
  resources: HashMap<ResourceId, ResourceElements>,
}

pub type SharedLedger = Arc<Mutex<UndoRedoLedger>>;

impl UndoRedoLedger {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn shared() -> SharedLedger {
    Arc::new(Mutex::new(Self::new()))
  }

  pub fn elements(&self, resource: ResourceId) -> ResourceElements {
    self.resources.get(&resource).cloned().unwrap_or_default()
  }

  pub fn can_undo(&self, resource: ResourceId) -> bool {
    self
      .resources
      .get(&resource)
      .is_some_and(|elements| !elements.past.is_empty())
  }

  pub fn can_redo(&self, resource: ResourceId) -> bool {
    self
      .resources
      .get(&resource)
      .is_some_and(|elements| !elements.future.is_empty())
  }

  /// Pushes a single-resource element. Clears the resource's redo list.
  pub fn push(&mut self, edit: ResourceEdit) {
    tracing::trace!(resource = ?edit.resource, element = ?edit.id, "push undo element");
    let elements = self.resources.entry(edit.resource).or_default();
    elements.future.clear();
    elements.past.push(UndoElement::Resource(edit));
  }

  /// Registers `element` on every resource it spans.
  pub fn push_workspace_element(&mut self, element: WorkspaceUndoElement) {
    let element = Arc::new(element);
    let resources = element.resources();
    tracing::debug!(
      element = ?element.id,
      resources = resources.len(),
      edits = element.edits.len(),
      "push workspace undo element"
    );
    for resource in resources {
      let elements = self.resources.entry(resource).or_default();
      elements.future.clear();
      elements
        .past
        .push(UndoElement::Workspace(Arc::clone(&element)));
    }
  }

  /// Removes the given elements from a resource's past list and returns
  /// them, oldest first.
  pub fn remove_elements(&mut self, resource: ResourceId, ids: &[ElementId]) -> Vec<UndoElement> {
    let Some(elements) = self.resources.get_mut(&resource) else {
      return Vec::new();
    };
    let (removed, kept) = std::mem::take(&mut elements.past)
      .into_iter()
      .partition(|element| ids.contains(&element.id()));
    elements.past = kept;
    removed
  }

  pub fn undo(&self, resource: ResourceId) -> Result<Option<LedgerJump>> {
    self.jump(resource, JumpDirection::Undo)
  }

  pub fn redo(&self, resource: ResourceId) -> Result<Option<LedgerJump>> {
    self.jump(resource, JumpDirection::Redo)
  }

  fn jump(&self, resource: ResourceId, direction: JumpDirection) -> Result<Option<LedgerJump>> {
    let Some(element) = self
      .resources
      .get(&resource)
      .and_then(|elements| Self::list(elements, direction).last())
    else {
      return Ok(None);
    };

    // a workspace element can only move when it is the latest entry of every
    // resource it spans
    if let UndoElement::Workspace(workspace) = element {
      for other in workspace.resources() {
        let on_top = self
          .resources
          .get(&other)
          .and_then(|elements| Self::list(elements, direction).last())
          .is_some_and(|top| top.id() == workspace.id);
        if !on_top {
          return Err(HistoryError::NotOnTop {
            element:  workspace.id,
            resource: other,
          });
        }
      }
    }

    Ok(Some(LedgerJump {
      direction,
      element: element.clone(),
    }))
  }

  /// Moves the jumped element from one list to the other on every resource
  /// it spans. Call after the element has been applied to the documents.
  pub fn apply_jump(&mut self, jump: &LedgerJump) -> Result<()> {
    let id = jump.element.id();
    for resource in jump.element.resources() {
      let elements = self.resources.entry(resource).or_default();
      let (from, to) = match jump.direction {
        JumpDirection::Undo => (&mut elements.past, &mut elements.future),
        JumpDirection::Redo => (&mut elements.future, &mut elements.past),
      };
      let idx = from
        .iter()
        .rposition(|element| element.id() == id)
        .ok_or(HistoryError::UnknownElement(id))?;
      to.push(from.remove(idx));
    }
    Ok(())
  }

  fn list(elements: &ResourceElements, direction: JumpDirection) -> &[UndoElement] {
    match direction {
      JumpDirection::Undo => &elements.past,
      JumpDirection::Redo => &elements.future,
    }
  }
}

#[cfg(test)]
mod test {
  use ropey::Rope;

  use super::*;
  use crate::position::Position;

  fn edit(resource: ResourceId) -> ResourceEdit {
    let doc = Rope::from("abc");
    let transaction = Transaction::change(&doc, vec![(0, 0, Some("x".into()))]).unwrap();
    let inversion = transaction.invert(&doc).unwrap();
    ResourceEdit {
      id: ElementId::next(),
      resource,
      transaction,
      inversion,
      selections_before: SmallVec::from_elem(Selection::caret(Position::new(1, 1)), 1),
      selections_after: SmallVec::from_elem(Selection::caret(Position::new(1, 2)), 1),
    }
  }

  #[test]
  fn push_clears_future() {
    let resource = ResourceId::next();
    let mut ledger = UndoRedoLedger::new();
    ledger.push(edit(resource));
    let jump = ledger.undo(resource).unwrap().unwrap();
    ledger.apply_jump(&jump).unwrap();
    assert!(ledger.can_redo(resource));

    ledger.push(edit(resource));
    assert!(!ledger.can_redo(resource));
    assert_eq!(ledger.elements(resource).past.len(), 1);
  }

  #[test]
  fn remove_elements_keeps_the_rest() {
    let resource = ResourceId::next();
    let mut ledger = UndoRedoLedger::new();
    let (a, b, c) = (edit(resource), edit(resource), edit(resource));
    let (a_id, b_id, c_id) = (a.id, b.id, c.id);
    ledger.push(a);
    ledger.push(b);
    ledger.push(c);

    let removed = ledger.remove_elements(resource, &[a_id, c_id]);
    assert_eq!(
      removed.iter().map(UndoElement::id).collect::<Vec<_>>(),
      vec![a_id, c_id]
    );
    assert_eq!(ledger.elements(resource).past_ids(), vec![b_id]);
    assert!(ledger.remove_elements(ResourceId::next(), &[a_id]).is_empty());
  }

  #[test]
  fn workspace_element_moves_on_every_resource() {
    let (r1, r2) = (ResourceId::next(), ResourceId::next());
    let mut ledger = UndoRedoLedger::new();
    ledger.push_workspace_element(WorkspaceUndoElement {
      id:                ElementId::next(),
      label:             "multi-cursor edit".into(),
      edits:             vec![edit(r1), edit(r2)],
      selections_before: Vec::new(),
      selections_after:  Vec::new(),
    });

    let jump = ledger.undo(r2).unwrap().unwrap();
    ledger.apply_jump(&jump).unwrap();
    assert!(!ledger.can_undo(r1));
    assert!(!ledger.can_undo(r2));
    assert!(ledger.can_redo(r1));

    let jump = ledger.redo(r1).unwrap().unwrap();
    ledger.apply_jump(&jump).unwrap();
    assert!(ledger.can_undo(r1) && ledger.can_undo(r2));
  }

  #[test]
  fn workspace_element_blocked_by_later_edit() {
    let (r1, r2) = (ResourceId::next(), ResourceId::next());
    let mut ledger = UndoRedoLedger::new();
    let id = ElementId::next();
    ledger.push_workspace_element(WorkspaceUndoElement {
      id,
      label: "multi-cursor edit".into(),
      edits: vec![edit(r1), edit(r2)],
      selections_before: Vec::new(),
      selections_after: Vec::new(),
    });
    ledger.push(edit(r2));

    // r1 still has the workspace element on top, r2 does not
    assert_eq!(ledger.undo(r1).unwrap_err(), HistoryError::NotOnTop {
      element:  id,
      resource: r2,
    });
  }
}
