//! Char-offset changes over a rope.
//!
//! A [`ChangeSet`] walks the document from its start and either keeps,
//! removes or adds text at each step. It carries the length it expects to be
//! applied to and the length it produces, so two change sets compose only when
//! the output of the first is the input of the second. Inverting a change set
//! against the text it was built for yields the undo of it.
//!
//! Line/column positions are turned into offsets by
//! [`crate::document::Document`] before a [`Transaction`] is built.

use std::collections::VecDeque;

use ropey::Rope;
use thiserror::Error;

use crate::Tendril;

pub type Result<T> = std::result::Result<T, TransactionError>;

/// Replacement of the chars `from..to` by an optional text.
pub type Change = (usize, usize, Option<Tendril>);

#[derive(Debug, Error, PartialEq, Eq)]
#[non_exhaustive]
pub enum TransactionError {
  #[error("changeset length mismatch: expected {expected}, got {actual}")]
  LengthMismatch { expected: usize, actual: usize },
  #[error("cannot compose: left produces {left_len_after} chars, right expects {right_len}")]
  ComposeLengthMismatch {
    left_len_after: usize,
    right_len:      usize,
  },
  #[error("invalid change range: start {from} is after end {to}")]
  InvalidRange { from: usize, to: usize },
  #[error("change range {from}..{to} is out of bounds for document length {len}")]
  RangeOutOfBounds {
    from: usize,
    to:   usize,
    len:  usize,
  },
  #[error("change range {from}..{to} overlaps previous end {prev_end}")]
  OverlappingRange {
    prev_end: usize,
    from:     usize,
    to:       usize,
  },
  #[error("position {pos} is out of bounds for changeset length {len}")]
  PositionOutOfBounds { pos: usize, len: usize },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Operation {
  /// Keep n chars.
  Retain(usize),
  /// Remove n chars.
  Delete(usize),
  Insert(Tendril),
}

impl Operation {
  fn len_chars(&self) -> usize {
    match self {
      Self::Retain(n) | Self::Delete(n) => *n,
      Self::Insert(text) => text.chars().count(),
    }
  }

  /// Splits off everything after the first `n` chars.
  fn split_at(self, n: usize) -> (Self, Option<Self>) {
    if self.len_chars() <= n {
      return (self, None);
    }
    match self {
      Self::Retain(len) => (Self::Retain(n), Some(Self::Retain(len - n))),
      Self::Delete(len) => (Self::Delete(n), Some(Self::Delete(len - n))),
      Self::Insert(mut text) => {
        let tail = text.split_off(char_to_byte(&text, n));
        (Self::Insert(text), Some(Self::Insert(tail)))
      },
    }
  }
}

/// Which side of an insertion at exactly a mapped position the position sticks
/// to.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Assoc {
  Before,
  After,
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ChangeSet {
  pub(crate) changes: Vec<Operation>,
  /// Length of the text this applies to.
  len:                usize,
  len_after:          usize,
}

impl ChangeSet {
  /// Length of the text this change set applies to.
  pub fn len(&self) -> usize {
    self.len
  }

  pub fn len_after(&self) -> usize {
    self.len_after
  }

  pub fn retain(&mut self, n: usize) {
    if n == 0 {
      return;
    }
    self.len += n;
    self.len_after += n;
    match self.changes.last_mut() {
      Some(Operation::Retain(count)) => *count += n,
      _ => self.changes.push(Operation::Retain(n)),
    }
  }

  pub fn delete(&mut self, n: usize) {
    if n == 0 {
      return;
    }
    self.len += n;
    match self.changes.last_mut() {
      Some(Operation::Delete(count)) => *count += n,
      _ => self.changes.push(Operation::Delete(n)),
    }
  }

  /// Adds `text` at the current point. A replacement is always kept as an
  /// insert followed by a delete.
  pub fn insert(&mut self, text: Tendril) {
    if text.is_empty() {
      return;
    }
    self.len_after += text.chars().count();
    let at = match self.changes.last() {
      Some(Operation::Delete(_)) => self.changes.len() - 1,
      _ => self.changes.len(),
    };
    if at > 0
      && let Some(Operation::Insert(prev)) = self.changes.get_mut(at - 1)
    {
      prev.push_str(&text);
      return;
    }
    self.changes.insert(at, Operation::Insert(text));
  }

  /// The change set equivalent to applying `self` and then `other`.
  pub fn compose(self, other: Self) -> Result<Self> {
    if self.len_after != other.len {
      return Err(TransactionError::ComposeLengthMismatch {
        left_len_after: self.len_after,
        right_len:      other.len,
      });
    }

    let mut first = OperationQueue::from(self.changes);
    let mut second = OperationQueue::from(other.changes);
    let mut composed = Self::default();
    loop {
      match (first.front(), second.front()) {
        (None, None) => break,
        // text removed by the first never reaches the second
        (Some(Operation::Delete(_)), _) => {
          if let Some(Operation::Delete(n)) = first.pop() {
            composed.delete(n);
          }
        },
        // text added by the second does not come from the first
        (_, Some(Operation::Insert(_))) => {
          if let Some(Operation::Insert(text)) = second.pop() {
            composed.insert(text);
          }
        },
        (Some(a), Some(b)) => {
          let n = a.len_chars().min(b.len_chars());
          match (first.take(n), second.take(n)) {
            (Some(Operation::Retain(n)), Some(Operation::Retain(_))) => composed.retain(n),
            (Some(Operation::Retain(n)), Some(Operation::Delete(_))) => composed.delete(n),
            (Some(Operation::Insert(text)), Some(Operation::Retain(_))) => composed.insert(text),
            // inserted by the first, deleted by the second
            _ => {},
          }
        },
        (None, Some(_)) | (Some(_), None) => {
          return Err(TransactionError::ComposeLengthMismatch {
            left_len_after: composed.len_after,
            right_len:      composed.len,
          });
        },
      }
    }
    Ok(composed)
  }

  /// The change set that undoes this one. `original` is the text this change
  /// set applies to.
  pub fn invert(&self, original: &Rope) -> Result<Self> {
    self.ensure_len(original.len_chars())?;
    let mut inverted = Self::default();
    let mut pos = 0;
    for change in &self.changes {
      match change {
        Operation::Retain(n) => {
          inverted.retain(*n);
          pos += n;
        },
        Operation::Delete(n) => {
          let removed = String::from(original.slice(pos..pos + n));
          inverted.insert(Tendril::from(removed));
          pos += n;
        },
        Operation::Insert(text) => inverted.delete(text.chars().count()),
      }
    }
    Ok(inverted)
  }

  fn ensure_len(&self, len: usize) -> Result<()> {
    if len == self.len {
      Ok(())
    } else {
      Err(TransactionError::LengthMismatch {
        expected: self.len,
        actual:   len,
      })
    }
  }

  pub fn apply(&self, text: &mut Rope) -> Result<()> {
    self.ensure_len(text.len_chars())?;
    let mut pos = 0;
    for change in &self.changes {
      match change {
        Operation::Retain(n) => pos += n,
        Operation::Delete(n) => text.remove(pos..pos + n),
        Operation::Insert(inserted) => {
          text.insert(pos, inserted);
          pos += inserted.chars().count();
        },
      }
    }
    Ok(())
  }

  #[inline]
  pub fn is_empty(&self) -> bool {
    self
      .changes
      .iter()
      .all(|change| matches!(change, Operation::Retain(_)))
  }

  /// Maps a char offset of the old text into the new one.
  ///
  /// A position inside removed text lands where the removal happened, after
  /// any replacement text. A position exactly at an insertion goes before it
  /// for [`Assoc::Before`] and after it for [`Assoc::After`].
  pub fn map_pos(&self, pos: usize, assoc: Assoc) -> Result<usize> {
    if pos > self.len {
      return Err(TransactionError::PositionOutOfBounds { pos, len: self.len });
    }

    let mut old = 0;
    let mut new = 0;
    let mut changes = self.changes.iter().peekable();
    while let Some(change) = changes.next() {
      let (inserted, deleted) = match change {
        Operation::Retain(n) => {
          if pos < old + n {
            return Ok(new + pos - old);
          }
          old += n;
          new += n;
          continue;
        },
        Operation::Delete(n) => (0, *n),
        Operation::Insert(text) => {
          let deleted = match changes.next_if(|next| matches!(next, Operation::Delete(_))) {
            Some(Operation::Delete(n)) => *n,
            _ => 0,
          };
          (text.chars().count(), deleted)
        },
      };
      if pos == old && assoc == Assoc::Before {
        return Ok(new);
      }
      if pos < old + deleted {
        return Ok(new + inserted);
      }
      old += deleted;
      new += inserted;
    }
    Ok(new + pos - old)
  }

  /// Whether the char at old offset `pos` is kept.
  pub fn retains(&self, pos: usize) -> bool {
    let mut old = 0;
    for change in &self.changes {
      match change {
        Operation::Retain(n) | Operation::Delete(n) if pos < old + n => {
          return matches!(change, Operation::Retain(_));
        },
        Operation::Retain(n) | Operation::Delete(n) => old += n,
        Operation::Insert(_) => {},
      }
    }
    pos >= old
  }
}

/// Operations consumed from the front, possibly a part at a time.
struct OperationQueue(VecDeque<Operation>);

impl From<Vec<Operation>> for OperationQueue {
  fn from(changes: Vec<Operation>) -> Self {
    Self(changes.into())
  }
}

impl OperationQueue {
  fn front(&self) -> Option<&Operation> {
    self.0.front()
  }

  fn pop(&mut self) -> Option<Operation> {
    self.0.pop_front()
  }

  /// Pops at most `n` chars worth of the front operation.
  fn take(&mut self, n: usize) -> Option<Operation> {
    let (head, rest) = self.0.pop_front()?.split_at(n);
    if let Some(rest) = rest {
      self.0.push_front(rest);
    }
    Some(head)
  }
}

fn char_to_byte(text: &str, char_idx: usize) -> usize {
  text
    .char_indices()
    .nth(char_idx)
    .map_or(text.len(), |(byte, _)| byte)
}

fn validate_change_bounds(from: usize, to: usize, len: usize) -> Result<()> {
  if from > to {
    Err(TransactionError::InvalidRange { from, to })
  } else if to > len {
    Err(TransactionError::RangeOutOfBounds { from, to, len })
  } else {
    Ok(())
  }
}

/// A committed unit of change against one document.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Transaction {
  changes: ChangeSet,
}

impl From<ChangeSet> for Transaction {
  fn from(changes: ChangeSet) -> Self {
    Self { changes }
  }
}

impl Transaction {
  pub fn changes(&self) -> &ChangeSet {
    &self.changes
  }

  pub fn apply(&self, doc: &mut Rope) -> Result<()> {
    self.changes.apply(doc)
  }

  pub fn invert(&self, original: &Rope) -> Result<Self> {
    self.changes.invert(original).map(Self::from)
  }

  pub fn compose(self, other: Self) -> Result<Self> {
    self.changes.compose(other.changes).map(Self::from)
  }

  /// Builds a transaction from sorted, non-overlapping changes.
  pub fn change(doc: &Rope, changes: impl IntoIterator<Item = Change>) -> Result<Self> {
    let len = doc.len_chars();
    let mut changeset = ChangeSet::default();
    let mut last = 0;
    for (from, to, text) in changes {
      validate_change_bounds(from, to, len)?;
      if from < last {
        return Err(TransactionError::OverlappingRange {
          prev_end: last,
          from,
          to,
        });
      }
      changeset.retain(from - last);
      if let Some(text) = text {
        changeset.insert(text);
      }
      changeset.delete(to - from);
      last = to;
    }
    changeset.retain(len - last);
    Ok(Self::from(changeset))
  }

  /// Builds a transaction from changes in any order. Changes are sorted by
  /// position and one that overlaps an earlier one is dropped. Returns the
  /// indices (into `changes`) that were kept.
  pub fn change_ignore_overlapping(
    doc: &Rope,
    changes: impl IntoIterator<Item = Change>,
  ) -> Result<(Self, Vec<usize>)> {
    let len = doc.len_chars();
    let mut indexed: Vec<(usize, Change)> = changes.into_iter().enumerate().collect();
    indexed.sort_by_key(|(idx, (from, to, _))| (*from, *to, *idx));

    let mut last = 0;
    let mut kept = Vec::with_capacity(indexed.len());
    let mut accepted = Vec::with_capacity(indexed.len());
    for (idx, (from, to, text)) in indexed {
      validate_change_bounds(from, to, len)?;
      // an empty insertion may share its point with the end of a previous change
      if from < last {
        continue;
      }
      last = to;
      kept.push(idx);
      accepted.push((from, to, text));
    }

    Ok((Self::change(doc, accepted)?, kept))
  }
}

#[cfg(test)]
mod test {
  use quickcheck::quickcheck;

  use super::*;

  fn applied(text: &str, changes: Vec<Change>) -> (Transaction, Rope) {
    let mut doc = Rope::from(text);
    let transaction = Transaction::change(&doc, changes).unwrap();
    transaction.apply(&mut doc).unwrap();
    (transaction, doc)
  }

  #[test]
  fn replacement_is_insert_then_delete() {
    let (transaction, doc) = applied("one two", vec![(4, 7, Some("three".into()))]);
    assert_eq!(doc, "one three");
    assert_eq!(transaction.changes().changes, vec![
      Operation::Retain(4),
      Operation::Insert("three".into()),
      Operation::Delete(3),
    ]);
    assert_eq!(transaction.changes().len(), 7);
    assert_eq!(transaction.changes().len_after(), 9);
  }

  #[test]
  fn compose_matches_sequential_application() {
    let (first, once) = applied("fn main() {}", vec![(3, 7, Some("start".into()))]);
    let (second, twice) = applied(&once.to_string(), vec![
      (0, 2, None),
      (10, 10, Some("世界".into())),
    ]);

    let mut doc = Rope::from("fn main() {}");
    first.compose(second).unwrap().apply(&mut doc).unwrap();
    assert_eq!(doc, twice);
    assert_eq!(doc, " start()世界 {}");
  }

  #[test]
  fn compose_rejects_mismatched_lengths() {
    let (first, _) = applied("abc", vec![(0, 1, None)]);
    let (second, _) = applied("abc", vec![(0, 1, None)]);
    assert_eq!(
      first.compose(second),
      Err(TransactionError::ComposeLengthMismatch {
        left_len_after: 2,
        right_len:      3,
      })
    );
  }

  #[test]
  fn invert_restores_the_original() {
    let original = Rope::from("ünïcode text\nline");
    let (transaction, mut doc) = applied("ünïcode text\nline", vec![
      (0, 3, Some("x".into())),
      (8, 12, None),
      (13, 13, Some("new ".into())),
    ]);
    assert_eq!(doc, "xcode \nnew line");

    let inversion = transaction.invert(&original).unwrap();
    inversion.apply(&mut doc).unwrap();
    assert_eq!(doc, original);
    assert_eq!(inversion.invert(&doc.clone()), Ok(transaction));
  }

  #[test]
  fn map_pos_around_insertions() {
    let (transaction, _) = applied("abcdefgh", vec![(4, 4, Some("!!".into()))]);
    let changes = transaction.changes();
    assert_eq!(changes.map_pos(0, Assoc::Before), Ok(0));
    assert_eq!(changes.map_pos(4, Assoc::Before), Ok(4));
    assert_eq!(changes.map_pos(4, Assoc::After), Ok(6));
    assert_eq!(changes.map_pos(5, Assoc::Before), Ok(7));
    assert_eq!(changes.map_pos(8, Assoc::After), Ok(10));
  }

  #[test]
  fn map_pos_around_deletions_and_replacements() {
    let (transaction, _) = applied("0123456789ab", vec![(4, 8, None)]);
    let changes = transaction.changes();
    assert_eq!(changes.map_pos(4, Assoc::Before), Ok(4));
    assert_eq!(changes.map_pos(6, Assoc::After), Ok(4));
    assert_eq!(changes.map_pos(8, Assoc::After), Ok(4));
    assert_eq!(changes.map_pos(9, Assoc::After), Ok(5));

    let (transaction, _) = applied("abcd", vec![(1, 3, Some("xyz".into()))]);
    let changes = transaction.changes();
    assert_eq!(changes.map_pos(1, Assoc::Before), Ok(1));
    assert_eq!(changes.map_pos(1, Assoc::After), Ok(4));
    assert_eq!(changes.map_pos(2, Assoc::After), Ok(4));
    assert_eq!(changes.map_pos(3, Assoc::After), Ok(4));
    assert!(changes.map_pos(5, Assoc::After).is_err());
  }

  #[test]
  fn retains_reports_deleted_chars() {
    let (transaction, _) = applied("abcdef", vec![(1, 3, Some("X".into()))]);
    let changes = transaction.changes();
    assert!(changes.retains(0));
    assert!(!changes.retains(1));
    assert!(!changes.retains(2));
    assert!(changes.retains(3));
  }

  #[test]
  fn change_rejects_overlap() {
    let doc = Rope::from("hello");
    let err = Transaction::change(&doc, vec![(0, 3, None), (2, 4, None)]).unwrap_err();
    assert_eq!(err, TransactionError::OverlappingRange {
      prev_end: 3,
      from:     2,
      to:       4,
    });
  }

  #[test]
  fn change_ignore_overlapping_keeps_first() {
    let mut doc = Rope::from("hello world");
    let (transaction, kept) = Transaction::change_ignore_overlapping(&doc, vec![
      (6, 11, Some("there".into())),
      (0, 5, None),
      (0, 5, None),
    ])
    .unwrap();
    assert_eq!(kept, vec![1, 0]);
    transaction.apply(&mut doc).unwrap();
    assert_eq!(doc, " there");
  }

  #[test]
  fn apply_refuses_other_lengths() {
    let (transaction, _) = applied("hello", vec![(0, 1, None)]);
    let mut other = Rope::from("nope");
    assert_eq!(
      transaction.apply(&mut other),
      Err(TransactionError::LengthMismatch {
        expected: 5,
        actual:   4,
      })
    );
    assert_eq!(other, "nope");
  }

  quickcheck! {
    fn compose_then_invert_round_trips(
      text: String,
      first: (u8, u8, String),
      second: (u8, u8, String)
    ) -> bool {
      let clamp = |doc: &Rope, (a, b, insert): (u8, u8, String)| -> Change {
        let len = doc.len_chars();
        let (a, b) = ((a as usize).min(len), (b as usize).min(len));
        (a.min(b), a.max(b), Some(insert.as_str().into()))
      };

      let original = Rope::from(text.as_str());
      let mut doc = original.clone();
      let a = Transaction::change(&doc, [clamp(&doc, first)]).unwrap();
      a.apply(&mut doc).unwrap();
      let b = Transaction::change(&doc, [clamp(&doc, second)]).unwrap();
      b.apply(&mut doc).unwrap();

      let composed = a.compose(b).unwrap();
      let mut replayed = original.clone();
      composed.apply(&mut replayed).unwrap();
      composed.invert(&original).unwrap().apply(&mut replayed).unwrap();
      replayed == original && {
        let mut again = original.clone();
        composed.apply(&mut again).unwrap();
        again == doc
      }
    }
  }
}
