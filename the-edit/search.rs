//! Word search over a document.
//!
//! Queries are compiled into a [`regex_cursor`] regex that runs directly on
//! the rope, so no contiguous copy of the text is made. The query word is
//! always matched literally.

use regex_cursor::{
  Input,
  engines::meta::Regex,
};
use ropey::Rope;
use the_core::chars::WordClassifier;
use thiserror::Error;

use crate::{
  document::{
    Document,
    TextModel,
  },
  position::Position,
  range::Range,
};

pub type Result<T> = std::result::Result<T, SearchError>;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SearchError {
  #[error("invalid search pattern: {0}")]
  Pattern(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchQuery {
  pub word:           String,
  pub case_sensitive: bool,
  pub whole_word:     bool,
  pub separators:     String,
}

impl SearchQuery {
  /// Case-sensitive whole-word query, the way multi-cursor match tracking
  /// searches.
  pub fn whole_word(word: impl Into<String>, separators: impl Into<String>) -> Self {
    Self {
      word:           word.into(),
      case_sensitive: true,
      whole_word:     true,
      separators:     separators.into(),
    }
  }

  fn compile(&self) -> Result<Regex> {
    let pattern = regex::escape(&self.word);
    let pattern = if self.case_sensitive {
      pattern
    } else {
      format!("(?i){pattern}")
    };
    Regex::new(&pattern).map_err(|err| SearchError::Pattern(err.to_string()))
  }
}

fn is_whole_word(text: &Rope, start: usize, end: usize, classifier: &WordClassifier) -> bool {
  let before = start
    .checked_sub(1)
    .map(|idx| text.char(idx))
    .is_some_and(|ch| classifier.is_word_char(ch));
  let after = (end < text.len_chars()) && classifier.is_word_char(text.char(end));
  !before && !after
}

/// Every match of `query` in document order.
pub fn find_matches(doc: &Document, query: &SearchQuery) -> Result<Vec<Range>> {
  if query.word.is_empty() {
    return Ok(Vec::new());
  }

  let regex = query.compile()?;
  let text = doc.text();
  let classifier = WordClassifier::new(&query.separators);
  let matches = regex
    .find_iter(Input::new(text.slice(..)))
    .filter(|found| found.start() < found.end())
    .map(|found| (text.byte_to_char(found.start()), text.byte_to_char(found.end())))
    .filter(|&(start, end)| !query.whole_word || is_whole_word(text, start, end, &classifier))
    .map(|(start, end)| Range::new(doc.position_at(start), doc.position_at(end)))
    .collect();
  Ok(matches)
}

/// First match starting at or after `from`. When there is none the search
/// wraps to the document start, but never returns a match starting at or
/// after `wrap_start`.
pub fn find_next_match(
  doc: &Document,
  query: &SearchQuery,
  from: Position,
  wrap_start: Option<Position>,
) -> Result<Option<Range>> {
  let matches = find_matches(doc, query)?;
  if let Some(found) = matches.iter().find(|range| range.start() >= from) {
    return Ok(Some(*found));
  }
  Ok(
    matches
      .first()
      .filter(|range| wrap_start.is_none_or(|wrap| range.start() < wrap))
      .copied(),
  )
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WordAtPosition {
  pub word:  String,
  pub range: Range,
}

/// The word touching `position`, either around it or ending right at it.
pub fn word_at_position(
  model: &impl TextModel,
  position: Position,
  classifier: &WordClassifier,
) -> Option<WordAtPosition> {
  let position = model.validate_position(position);
  let line: Vec<char> = model.line_content(position.line).chars().collect();
  let caret = position.column - 1;

  let mut start = caret;
  while start > 0 && classifier.is_word_char(line[start - 1]) {
    start -= 1;
  }
  let mut end = caret;
  while end < line.len() && classifier.is_word_char(line[end]) {
    end += 1;
  }
  if start == end {
    return None;
  }

  Some(WordAtPosition {
    word:  line[start..end].iter().collect(),
    range: Range::from_coords(position.line, start + 1, position.line, end + 1),
  })
}

#[cfg(test)]
mod test {
  use super::*;
  use crate::{
    config::DEFAULT_WORD_SEPARATORS,
    history::UndoRedoLedger,
  };

  fn doc(text: &str) -> Document {
    Document::new(text, UndoRedoLedger::shared())
  }

  #[test]
  fn finds_whole_words_in_order() {
    let doc = doc("foo food\nfoo.bar (foo)\nFoo");
    let query = SearchQuery::whole_word("foo", DEFAULT_WORD_SEPARATORS);
    assert_eq!(find_matches(&doc, &query).unwrap(), vec![
      Range::from_coords(1, 1, 1, 4),
      Range::from_coords(2, 1, 2, 4),
      Range::from_coords(2, 10, 2, 13),
    ]);

    let query = SearchQuery {
      case_sensitive: false,
      whole_word: false,
      ..query
    };
    assert_eq!(find_matches(&doc, &query).unwrap().len(), 5);
  }

  #[test]
  fn word_is_matched_literally() {
    let doc = doc("a.b axb a.b");
    let query = SearchQuery {
      whole_word: false,
      ..SearchQuery::whole_word("a.b", "")
    };
    assert_eq!(find_matches(&doc, &query).unwrap(), vec![
      Range::from_coords(1, 1, 1, 4),
      Range::from_coords(1, 9, 1, 12),
    ]);
    assert!(find_matches(&doc, &SearchQuery::whole_word("", "")).unwrap().is_empty());

    let doc = self::doc("(a)* (a) $x^");
    for (word, expected) in [
      ("(a)*", Range::from_coords(1, 1, 1, 5)),
      ("$x^", Range::from_coords(1, 10, 1, 13)),
    ] {
      let query = SearchQuery {
        whole_word: false,
        ..SearchQuery::whole_word(word, "")
      };
      assert_eq!(find_matches(&doc, &query).unwrap(), vec![expected]);
    }
  }

  #[test]
  fn next_match_wraps_up_to_start() {
    let doc = doc("foo x foo y foo");
    let query = SearchQuery::whole_word("foo", DEFAULT_WORD_SEPARATORS);
    let start = Position::new(1, 7);
    assert_eq!(
      find_next_match(&doc, &query, Position::new(1, 10), Some(start)).unwrap(),
      Some(Range::from_coords(1, 13, 1, 16))
    );
    assert_eq!(
      find_next_match(&doc, &query, Position::new(1, 16), Some(start)).unwrap(),
      Some(Range::from_coords(1, 1, 1, 4))
    );
    assert_eq!(
      find_next_match(&doc, &query, Position::new(1, 16), Some(Position::new(1, 1))).unwrap(),
      None
    );
  }

  #[test]
  fn word_under_caret() {
    let doc = doc("let foo_bar = baz.qux;");
    let classifier = WordClassifier::new(DEFAULT_WORD_SEPARATORS);
    let word = word_at_position(&doc, Position::new(1, 6), &classifier).unwrap();
    assert_eq!(word.word, "foo_bar");
    assert_eq!(word.range, Range::from_coords(1, 5, 1, 12));

    // caret right after a word
    let word = word_at_position(&doc, Position::new(1, 18), &classifier).unwrap();
    assert_eq!(word.word, "baz");
    assert_eq!(word_at_position(&doc, Position::new(1, 13), &classifier), None);
  }
}
