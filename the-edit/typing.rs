//! Typing, composition and paste.
//!
//! Like the delete operations these only compute commands. Typing a single
//! char goes through two interceptors before plain insertion: typing over an
//! auto-closed char, then auto-closing an open char.

use smallvec::SmallVec;
use the_core::line_ending::split_lines;

use crate::{
  command::{
    CursorPlacement,
    EditOperationResult,
    EditOperationType,
    ReplaceCommand,
  },
  config::{
    AutoClosingEditStrategy,
    AutoClosingKind,
    AutoClosingStrategy,
    CursorConfiguration,
    MultiCursorPaste,
  },
  delete::Commands,
  document::TextModel,
  position::Position,
  range::Range,
  selection::Selection,
};

fn typing_operation(text: &str, prev_edit_type: EditOperationType) -> EditOperationType {
  if text != " " {
    return EditOperationType::TypingOther;
  }
  match prev_edit_type {
    EditOperationType::TypingFirstSpace | EditOperationType::TypingConsecutiveSpace => {
      EditOperationType::TypingConsecutiveSpace
    },
    _ => EditOperationType::TypingFirstSpace,
  }
}

fn single_char(text: &str) -> Option<char> {
  let mut chars = text.chars();
  let ch = chars.next()?;
  chars.next().is_none().then_some(ch)
}

fn carets(selections: &[Selection]) -> Option<SmallVec<[Position; 1]>> {
  selections
    .iter()
    .map(|selection| selection.is_empty().then_some(selection.active))
    .collect()
}

/// Typing `ch` right before an identical close char moves over it.
fn overtype(
  config: &CursorConfiguration,
  model: &impl TextModel,
  selections: &[Selection],
  ch: char,
  auto_closed: &[Position],
) -> Option<Commands> {
  if config.auto_closing_overtype == AutoClosingEditStrategy::Never
    || config.auto_closing_pairs.with_close(ch).is_empty()
  {
    return None;
  }

  let carets = carets(selections)?;
  let can_overtype = carets.iter().all(|&position| {
    model.char_after(position) == Some(ch)
      && (config.auto_closing_overtype == AutoClosingEditStrategy::Always
        || auto_closed.contains(&position))
  });
  if !can_overtype {
    return None;
  }

  Some(
    carets
      .iter()
      .map(|&position| {
        Some(ReplaceCommand::new(
          Range::new(position, position.delta(0, 1)),
          ch.to_string(),
        ))
      })
      .collect(),
  )
}

/// Typing an open char inserts the whole pair when the char after each caret
/// allows it.
fn auto_close(
  config: &CursorConfiguration,
  model: &impl TextModel,
  selections: &[Selection],
  ch: char,
) -> Option<Commands> {
  let pair = *config.auto_closing_pairs.with_open(ch).first()?;
  let kind = pair.kind();
  if config.auto_closing_strategy(kind) == AutoClosingStrategy::Never {
    return None;
  }

  let carets = carets(selections)?;
  let allowed = carets.iter().all(|&position| {
    let before_ok = match kind {
      // don't pair the apostrophe in "don't"
      AutoClosingKind::Quote => {
        !model
          .char_before(position)
          .is_some_and(|before| config.word_classifier.is_word_char(before))
      },
      AutoClosingKind::Bracket => true,
    };
    let after_ok = model
      .char_after(position)
      .is_none_or(|after| config.should_auto_close_before(kind, after));
    before_ok && after_ok
  });
  if !allowed {
    return None;
  }

  let text = format!("{}{}", pair.open, pair.close);
  Some(
    carets
      .iter()
      .map(|&position| {
        Some(
          ReplaceCommand::new(Range::empty(position), text.as_str())
            .with_cursor(CursorPlacement::AutoClosed),
        )
      })
      .collect(),
  )
}

pub fn type_text(
  prev_edit_type: EditOperationType,
  config: &CursorConfiguration,
  model: &impl TextModel,
  selections: &[Selection],
  text: &str,
  auto_closed: &[Position],
) -> EditOperationResult {
  if let Some(ch) = single_char(text) {
    if let Some(commands) = overtype(config, model, selections, ch, auto_closed) {
      let kind = EditOperationType::TypingOther;
      return EditOperationResult::new(
        kind,
        commands,
        prev_edit_type.should_push_stack_element_between(kind),
        false,
      );
    }
    if let Some(commands) = auto_close(config, model, selections, ch) {
      tracing::trace!(open = %ch, cursors = commands.len(), "auto-close pair");
      return EditOperationResult::new(EditOperationType::TypingOther, commands, true, false);
    }
  }

  let kind = typing_operation(text, prev_edit_type);
  let commands = selections
    .iter()
    .map(|selection| Some(ReplaceCommand::new(selection.range(), text)));
  EditOperationResult::new(
    kind,
    commands,
    prev_edit_type.should_push_stack_element_between(kind),
    false,
  )
}

/// One step of an IME composition: replace `replace_prev` chars before and
/// `replace_next` chars after each caret with `text`, then move the caret by
/// `position_delta` columns from the end of `text`. A non-empty selection is
/// replaced as a whole.
pub fn composition_type(
  prev_edit_type: EditOperationType,
  model: &impl TextModel,
  selections: &[Selection],
  text: &str,
  replace_prev: usize,
  replace_next: usize,
  position_delta: isize,
) -> EditOperationResult {
  let commands = selections.iter().map(|selection| {
    if !selection.is_empty() {
      return Some(
        ReplaceCommand::new(selection.range(), text).with_cursor(CursorPlacement::Offset(position_delta)),
      );
    }
    let position = model.validate_position(selection.active);
    let start = position.column.saturating_sub(replace_prev).max(1);
    let end = (position.column + replace_next).min(model.line_max_column(position.line));
    let range = Range::from_coords(position.line, start, position.line, end);
    if model.value_in_range(range) == text && position_delta == 0 {
      return None;
    }
    Some(ReplaceCommand::new(range, text).with_cursor(CursorPlacement::Offset(position_delta)))
  });
  let kind = EditOperationType::TypingOther;
  EditOperationResult::new(
    kind,
    commands,
    prev_edit_type.should_push_stack_element_between(kind),
    false,
  )
}

/// Pieces of a paste handed out one per cursor, if the paste should be
/// distributed at all.
fn distribute_paste(
  config: &CursorConfiguration,
  cursor_count: usize,
  text: &str,
  paste_on_new_line: bool,
  multicursor_text: Option<&[String]>,
) -> Option<Vec<String>> {
  if paste_on_new_line || cursor_count == 1 {
    return None;
  }
  if let Some(pieces) = multicursor_text.filter(|pieces| pieces.len() == cursor_count) {
    return Some(pieces.to_vec());
  }
  if config.multi_cursor_paste == MultiCursorPaste::Spread {
    let text = text.strip_suffix('\n').unwrap_or(text);
    let text = text.strip_suffix('\r').unwrap_or(text);
    let lines = split_lines(text);
    if lines.len() == cursor_count {
      return Some(lines.into_iter().map(str::to_string).collect());
    }
  }
  None
}

pub fn paste(
  config: &CursorConfiguration,
  selections: &[Selection],
  text: &str,
  paste_on_new_line: bool,
  multicursor_text: Option<&[String]>,
) -> EditOperationResult {
  let commands: Commands = match distribute_paste(
    config,
    selections.len(),
    text,
    paste_on_new_line,
    multicursor_text,
  ) {
    Some(pieces) => {
      // pieces go to cursors in document order
      let mut order: Vec<usize> = (0..selections.len()).collect();
      order.sort_by_key(|&idx| selections[idx].range());
      let mut commands: Commands = SmallVec::from_elem(None, selections.len());
      for (piece, idx) in pieces.into_iter().zip(order) {
        commands[idx] = Some(ReplaceCommand::new(selections[idx].range(), piece));
      }
      commands
    },
    None => {
      let whole_lines = text.find('\n').is_some_and(|idx| idx == text.len() - 1);
      selections
        .iter()
        .map(|selection| {
          if paste_on_new_line && selection.is_empty() && whole_lines {
            let line_start = Position::new(selection.active.line, 1);
            Some(
              ReplaceCommand::new(Range::empty(line_start), text)
                .with_cursor(CursorPlacement::Preserve(*selection)),
            )
          } else {
            Some(ReplaceCommand::new(selection.range(), text))
          }
        })
        .collect()
    },
  };
  EditOperationResult::new(EditOperationType::Other, commands, true, true)
}

#[cfg(test)]
mod test {
  use std::sync::Arc;

  use super::*;
  use crate::{
    config::{
      EditorOptions,
      LanguageConfiguration,
    },
    document::Document,
    history::UndoRedoLedger,
  };

  fn doc(text: &str) -> Document {
    Document::new(text, UndoRedoLedger::shared())
  }

  fn config() -> CursorConfiguration {
    CursorConfiguration::new(
      &EditorOptions::default(),
      Arc::new(LanguageConfiguration::new("plaintext")),
    )
  }

  fn caret(line: usize, column: usize) -> Selection {
    Selection::caret(Position::new(line, column))
  }

  #[test]
  fn plain_typing_kinds() {
    let doc = doc("ab");
    let config = config();
    let result = type_text(EditOperationType::Other, &config, &doc, &[caret(1, 2)], "x", &[]);
    assert_eq!(result.kind, EditOperationType::TypingOther);
    assert!(result.should_push_stack_element_before);

    let result = type_text(EditOperationType::TypingOther, &config, &doc, &[caret(1, 2)], " ", &[]);
    assert_eq!(result.kind, EditOperationType::TypingFirstSpace);
    assert!(result.should_push_stack_element_before);

    let result = type_text(
      EditOperationType::TypingFirstSpace,
      &config,
      &doc,
      &[caret(1, 2)],
      " ",
      &[],
    );
    assert_eq!(result.kind, EditOperationType::TypingConsecutiveSpace);
    assert!(!result.should_push_stack_element_before);

    let selection = Selection::from_coords(1, 1, 1, 3);
    let result = type_text(EditOperationType::Other, &config, &doc, &[selection], "xyz", &[]);
    assert_eq!(result.commands[0], Some(ReplaceCommand::new(selection.range(), "xyz")));
  }

  #[test]
  fn open_char_auto_closes_before_allowed_chars() {
    let doc = doc("a b;");
    let config = config();
    let result = type_text(EditOperationType::Other, &config, &doc, &[caret(1, 4)], "(", &[]);
    assert_eq!(
      result.commands[0],
      Some(ReplaceCommand::new(Range::from_coords(1, 4, 1, 4), "()").with_cursor(CursorPlacement::AutoClosed))
    );
    // end of line
    let result = type_text(EditOperationType::Other, &config, &doc, &[caret(1, 5)], "[", &[]);
    assert_eq!(result.commands[0].as_ref().map(|c| c.text.as_str()), Some("[]"));
    // before a word char
    let result = type_text(EditOperationType::Other, &config, &doc, &[caret(1, 3)], "(", &[]);
    assert_eq!(result.commands[0].as_ref().map(|c| c.text.as_str()), Some("("));
    // apostrophe after a word char
    let result = type_text(EditOperationType::Other, &config, &doc, &[caret(1, 2)], "'", &[]);
    assert_eq!(result.commands[0].as_ref().map(|c| c.text.as_str()), Some("'"));
  }

  #[test]
  fn close_char_overtypes_auto_closed() {
    let doc = doc("f()");
    let config = config();
    let result = type_text(
      EditOperationType::TypingOther,
      &config,
      &doc,
      &[caret(1, 3)],
      ")",
      &[Position::new(1, 3)],
    );
    assert_eq!(
      result.commands[0],
      Some(ReplaceCommand::new(Range::from_coords(1, 3, 1, 4), ")"))
    );

    // not inserted by the editor: plain insert under the auto policy
    let result = type_text(EditOperationType::TypingOther, &config, &doc, &[caret(1, 3)], ")", &[]);
    assert_eq!(
      result.commands[0],
      Some(ReplaceCommand::new(Range::from_coords(1, 3, 1, 3), ")"))
    );
  }

  #[test]
  fn composition_replaces_around_caret() {
    let doc = doc("abc");
    let result = composition_type(EditOperationType::Other, &doc, &[caret(1, 3)], "ü", 1, 0, 0);
    assert_eq!(
      result.commands[0],
      Some(
        ReplaceCommand::new(Range::from_coords(1, 2, 1, 3), "ü")
          .with_cursor(CursorPlacement::Offset(0))
      )
    );
    // unchanged text and no caret move
    let result = composition_type(EditOperationType::Other, &doc, &[caret(1, 3)], "b", 1, 0, 0);
    assert_eq!(result.commands[0], None);
  }

  #[test]
  fn composition_replaces_a_selection() {
    let doc = doc("abc");
    let selection = Selection::from_coords(1, 3, 1, 1);
    let result = composition_type(EditOperationType::Other, &doc, &[selection], "x", 1, 1, -1);
    assert_eq!(
      result.commands[0],
      Some(
        ReplaceCommand::new(Range::from_coords(1, 1, 1, 3), "x")
          .with_cursor(CursorPlacement::Offset(-1))
      )
    );
  }

  #[test]
  fn paste_spreads_lines_over_cursors() {
    let config = config();
    let selections = [caret(2, 1), caret(1, 1)];
    let result = paste(&config, &selections, "one\ntwo\n", false, None);
    assert_eq!(result.commands[1].as_ref().map(|c| c.text.as_str()), Some("one"));
    assert_eq!(result.commands[0].as_ref().map(|c| c.text.as_str()), Some("two"));

    let pieces = ["a".to_string(), "b".to_string()];
    let result = paste(&config, &selections, "ignored", false, Some(&pieces));
    assert_eq!(result.commands[1].as_ref().map(|c| c.text.as_str()), Some("a"));

    let result = paste(&config, &selections, "x\ny\nz", false, None);
    assert!(result.commands.iter().flatten().all(|c| c.text == "x\ny\nz"));
    assert!(result.should_push_stack_element_before && result.should_push_stack_element_after);
  }

  #[test]
  fn paste_full_line_on_new_line() {
    let config = config();
    let selection = caret(2, 3);
    let result = paste(&config, &[selection], "line\n", true, None);
    assert_eq!(
      result.commands[0],
      Some(
        ReplaceCommand::new(Range::from_coords(2, 1, 2, 1), "line\n")
          .with_cursor(CursorPlacement::Preserve(selection))
      )
    );
    // not a single whole line: pasted at the caret
    let result = paste(&config, &[selection], "a\nb\n", true, None);
    assert_eq!(result.commands[0], Some(ReplaceCommand::new(selection.range(), "a\nb\n")));
  }
}
