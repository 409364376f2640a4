//! Decorations of one unit: mock cursors and selection highlights painted
//! for the cursors that do not own the real caret.

use slotmap::SlotMap;
use the_edit::{
  range::Range,
  selection::Selection,
};

slotmap::new_key_type! {
    pub struct DecorationId;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DecorationKind {
  /// Zero-width caret drawn at a selection's active end.
  MockCursor,
  /// Background of a non-empty selection.
  Highlight,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Decoration {
  pub range: Range,
  pub kind:  DecorationKind,
}

impl Decoration {
  /// Mock cursor for every selection plus a highlight for the non-empty ones.
  pub fn for_selections(selections: &[Selection]) -> Vec<Decoration> {
    let mut decorations = Vec::with_capacity(selections.len() * 2);
    for selection in selections {
      decorations.push(Decoration {
        range: Range::empty(selection.active),
        kind:  DecorationKind::MockCursor,
      });
      if !selection.is_empty() {
        decorations.push(Decoration {
          range: selection.range(),
          kind:  DecorationKind::Highlight,
        });
      }
    }
    decorations
  }
}

#[derive(Debug, Default)]
pub struct DecorationStore {
  decorations: SlotMap<DecorationId, Decoration>,
}

impl DecorationStore {
  pub fn new() -> Self {
    Self::default()
  }

  /// Removes `old` and adds `new`, returning the ids of the added
  /// decorations in order. Unknown ids in `old` are ignored.
  pub fn delta_decorations(&mut self, old: &[DecorationId], new: &[Decoration]) -> Vec<DecorationId> {
    for id in old {
      self.decorations.remove(*id);
    }
    new
      .iter()
      .map(|decoration| self.decorations.insert(*decoration))
      .collect()
  }

  pub fn get(&self, id: DecorationId) -> Option<&Decoration> {
    self.decorations.get(id)
  }

  pub fn iter(&self) -> impl Iterator<Item = (DecorationId, &Decoration)> {
    self.decorations.iter()
  }

  pub fn len(&self) -> usize {
    self.decorations.len()
  }

  pub fn is_empty(&self) -> bool {
    self.decorations.is_empty()
  }

  pub fn count(&self, kind: DecorationKind) -> usize {
    self
      .decorations
      .values()
      .filter(|decoration| decoration.kind == kind)
      .count()
  }
}
