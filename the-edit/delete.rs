//! Delete and cut operations.
//!
//! Every function here is pure: it reads the model and the selections and
//! returns one optional [`ReplaceCommand`] per selection, plus whether an undo
//! stop has to go before the edit. Nothing is applied and nothing fails;
//! out-of-range input is clamped and a cursor with nothing to delete gets
//! `None`.

use smallvec::SmallVec;

use crate::{
  columns,
  command::{
    EditOperationResult,
    EditOperationType,
    ReplaceCommand,
  },
  config::{
    AutoClosingEditStrategy,
    AutoClosingStrategy,
    CursorConfiguration,
  },
  document::TextModel,
  movement,
  position::Position,
  range::Range,
  selection::Selection,
};

pub type Commands = SmallVec<[Option<ReplaceCommand>; 1]>;

/// Range removed by a forward delete from `selection`.
pub fn get_delete_right_range(
  selection: &Selection,
  model: &impl TextModel,
  config: &CursorConfiguration,
) -> Range {
  if !selection.is_empty() {
    return selection.range();
  }

  let position = model.validate_position(selection.active);
  let right = movement::right_of(model, position);

  if config.trim_whitespace_on_delete && right.line != position.line {
    let current_has_content = model.line_first_non_whitespace_column(position.line) > 0;
    let first_non_whitespace = model.line_first_non_whitespace_column(right.line);
    if current_has_content && first_non_whitespace > 0 {
      // join with the next line and drop its indentation in one go
      return Range::new(Position::new(right.line, first_non_whitespace), position);
    }
  }

  Range::new(right, position)
}

pub fn delete_right(
  prev_edit_type: EditOperationType,
  config: &CursorConfiguration,
  model: &impl TextModel,
  selections: &[Selection],
) -> (bool, Commands) {
  let mut push_before = prev_edit_type != EditOperationType::DeletingRight;
  let commands = selections
    .iter()
    .map(|selection| {
      let range = get_delete_right_range(selection, model, config);
      if range.is_empty() {
        return None;
      }
      if !range.is_single_line() {
        push_before = true;
      }
      Some(ReplaceCommand::delete(range))
    })
    .collect();
  (push_before, commands)
}

/// Whether a backspace should remove an auto-closing pair around the caret.
pub fn is_auto_closing_pair_delete(
  config: &CursorConfiguration,
  auto_closed: &[Position],
  model: &impl TextModel,
  selections: &[Selection],
) -> bool {
  if config.auto_closing_brackets == AutoClosingStrategy::Never
    && config.auto_closing_quotes == AutoClosingStrategy::Never
  {
    return false;
  }
  if config.auto_closing_delete == AutoClosingEditStrategy::Never {
    return false;
  }
  let [selection] = selections else {
    return false;
  };
  if !selection.is_empty() {
    return false;
  }

  let position = model.validate_position(selection.active);
  let line_length = model.line_length(position.line);
  if position.column < 2 || position.column >= line_length + 1 {
    return false;
  }
  let (Some(before), Some(after)) = (model.char_before(position), model.char_after(position)) else {
    return false;
  };
  let Some(pair) = config.auto_closing_pairs.find(before, after) else {
    return false;
  };
  if config.auto_closing_strategy(pair.kind()) == AutoClosingStrategy::Never {
    return false;
  }

  match config.auto_closing_delete {
    AutoClosingEditStrategy::Auto => auto_closed.contains(&position),
    _ => true,
  }
}

fn run_auto_closing_pair_delete(model: &impl TextModel, selections: &[Selection]) -> (bool, Commands) {
  let commands = selections
    .iter()
    .map(|selection| {
      let position = model.validate_position(selection.active);
      Some(ReplaceCommand::delete(Range::new(
        position.delta(0, -1),
        position.delta(0, 1),
      )))
    })
    .collect();
  (true, commands)
}

/// Range removed by a backspace from `selection`.
pub fn get_delete_left_range(
  selection: &Selection,
  model: &impl TextModel,
  config: &CursorConfiguration,
) -> Range {
  if !selection.is_empty() {
    return selection.range();
  }

  let position = model.validate_position(selection.active);
  if config.use_tab_stops && position.column > 1 {
    let first_non_whitespace = model.line_first_non_whitespace_column(position.line);
    let last_indentation_column = if first_non_whitespace == 0 {
      model.line_max_column(position.line)
    } else {
      first_non_whitespace
    };

    if position.column <= last_indentation_column {
      let from = config.visible_column_from_column(model, position);
      let to = columns::prev_tab_stop(from, config.indent_size);
      let to_column = config.column_from_visible_column(model, position.line, to);
      return Range::new(position.with_column(to_column), position);
    }
  }

  Range::new(movement::left_of(model, position), position)
}

pub fn delete_left(
  prev_edit_type: EditOperationType,
  config: &CursorConfiguration,
  model: &impl TextModel,
  selections: &[Selection],
  auto_closed: &[Position],
) -> (bool, Commands) {
  if is_auto_closing_pair_delete(config, auto_closed, model, selections) {
    return run_auto_closing_pair_delete(model, selections);
  }

  let mut push_before = prev_edit_type != EditOperationType::DeletingLeft;
  let commands = selections
    .iter()
    .map(|selection| {
      let range = get_delete_left_range(selection, model, config);
      if range.is_empty() {
        return None;
      }
      if !range.is_single_line() {
        push_before = true;
      }
      Some(ReplaceCommand::delete(range))
    })
    .collect();
  (push_before, commands)
}

/// Cut every selection. Empty selections cut their whole line when
/// `empty_selection_clipboard` is on.
///
/// Commands stay paired with `selections` by index, even though the cut is
/// computed in document order.
pub fn cut(
  config: &CursorConfiguration,
  model: &impl TextModel,
  selections: &[Selection],
) -> EditOperationResult {
  let mut order: Vec<usize> = (0..selections.len()).collect();
  order.sort_by_key(|&idx| selections[idx].range());

  let mut commands: Commands = SmallVec::from_elem(None, selections.len());
  let mut last_cut: Option<Range> = None;

  for idx in order {
    let selection = &selections[idx];
    if !selection.is_empty() {
      commands[idx] = Some(ReplaceCommand::delete(selection.range()));
      continue;
    }
    if !config.empty_selection_clipboard {
      continue;
    }

    let position = model.validate_position(selection.active);
    let line = position.line;
    let range = if line < model.line_count() {
      Range::from_coords(line, 1, line + 1, 1)
    } else if line > 1 && last_cut.is_none_or(|last| last.end().line != line) {
      Range::from_coords(
        line - 1,
        model.line_max_column(line - 1),
        line,
        model.line_max_column(line),
      )
    } else {
      Range::from_coords(line, 1, line, model.line_max_column(line))
    };

    // another cursor on the same line already took it
    let consumed = last_cut.is_some_and(|last| {
      last == range || (range.start() < last.end() && last.start() < range.end())
    });
    last_cut = Some(range);
    if !consumed && !range.is_empty() {
      commands[idx] = Some(ReplaceCommand::delete(range));
    }
  }

  EditOperationResult {
    kind: EditOperationType::Other,
    commands,
    should_push_stack_element_before: true,
    should_push_stack_element_after: true,
  }
}

#[cfg(test)]
mod test {
  use std::sync::Arc;

  use quickcheck::quickcheck;

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

  fn config(options: EditorOptions) -> CursorConfiguration {
    CursorConfiguration::new(&options, Arc::new(LanguageConfiguration::new("plaintext")))
  }

  fn caret(line: usize, column: usize) -> Selection {
    Selection::caret(Position::new(line, column))
  }

  /// Clamps an arbitrary position into `doc`.
  fn position_in(doc: &Document, line: usize, column: usize) -> Position {
    let line = line % doc.line_count() + 1;
    let column = column % doc.line_max_column(line) + 1;
    Position::new(line, column)
  }

  #[test]
  fn deletes_clamp_out_of_range_carets() {
    let doc = doc("ab");
    let config = config(EditorOptions::default());
    for selection in [caret(9, 1), caret(0, 0), caret(1, 40)] {
      let (_, commands) = delete_left(EditOperationType::Other, &config, &doc, &[selection], &[]);
      assert_eq!(commands.len(), 1);
      let (_, commands) = delete_right(EditOperationType::Other, &config, &doc, &[selection]);
      assert_eq!(commands.len(), 1);
    }

    // a caret past the line end clamps onto it: backspace takes the last char
    let (_, commands) = delete_left(EditOperationType::Other, &config, &doc, &[caret(1, 40)], &[]);
    assert_eq!(
      commands[0].as_ref().map(|command| command.range),
      Some(Range::from_coords(1, 2, 1, 3))
    );
    for selection in [caret(0, 0), caret(9, 1)] {
      let (_, commands) = delete_left(EditOperationType::Other, &config, &doc, &[selection], &[]);
      assert_eq!(commands[0], None);
    }
  }

  #[test]
  fn delete_right_plain_and_smart_join() {
    let doc = doc("ab  \n    cd\n");
    let plain = config(EditorOptions::default());
    assert_eq!(
      get_delete_right_range(&caret(1, 1), &doc, &plain),
      Range::from_coords(1, 1, 1, 2)
    );
    assert_eq!(
      get_delete_right_range(&caret(1, 5), &doc, &plain),
      Range::from_coords(1, 5, 2, 1)
    );

    let trim = config(EditorOptions {
      trim_whitespace_on_delete: true,
      ..EditorOptions::default()
    });
    assert_eq!(
      get_delete_right_range(&caret(1, 5), &doc, &trim),
      Range::from_coords(1, 5, 2, 5)
    );
    // the next line is blank: plain join
    assert_eq!(
      get_delete_right_range(&caret(2, 7), &doc, &trim),
      Range::from_coords(2, 7, 3, 1)
    );
    // end of document
    assert!(get_delete_right_range(&caret(3, 1), &doc, &trim).is_empty());
  }

  #[test]
  fn delete_right_undo_stops() {
    let doc = doc("abc\ndef");
    let config = config(EditorOptions::default());
    let (push, commands) =
      delete_right(EditOperationType::DeletingRight, &config, &doc, &[caret(1, 1)]);
    assert!(!push);
    assert_eq!(commands[0], Some(ReplaceCommand::delete(Range::from_coords(1, 1, 1, 2))));

    let (push, _) = delete_right(EditOperationType::DeletingRight, &config, &doc, &[caret(1, 4)]);
    assert!(push);
    let (push, commands) = delete_right(EditOperationType::TypingOther, &config, &doc, &[caret(2, 4)]);
    assert!(push);
    assert_eq!(commands[0], None);
  }

  #[test]
  fn delete_left_tab_stops() {
    let doc = doc("      x\n\t  y\n   \nab");
    let config = config(EditorOptions::default());
    // six spaces: back to the previous indent stop
    assert_eq!(
      get_delete_left_range(&caret(1, 7), &doc, &config),
      Range::from_coords(1, 5, 1, 7)
    );
    assert_eq!(
      get_delete_left_range(&caret(1, 5), &doc, &config),
      Range::from_coords(1, 1, 1, 5)
    );
    // tab then two spaces: visible 6 -> 4 removes the spaces only
    assert_eq!(
      get_delete_left_range(&caret(2, 4), &doc, &config),
      Range::from_coords(2, 2, 2, 4)
    );
    // whitespace-only line counts as indentation
    assert_eq!(
      get_delete_left_range(&caret(3, 4), &doc, &config),
      Range::from_coords(3, 1, 3, 4)
    );
    // outside indentation: one grapheme
    assert_eq!(
      get_delete_left_range(&caret(1, 8), &doc, &config),
      Range::from_coords(1, 7, 1, 8)
    );
    // column 1 joins with the previous line
    assert_eq!(
      get_delete_left_range(&caret(4, 1), &doc, &config),
      Range::from_coords(3, 4, 4, 1)
    );
    assert!(get_delete_left_range(&caret(1, 1), &doc, &config).is_empty());
  }

  #[test]
  fn auto_closing_pair_delete_policies() {
    let doc = doc("f() \"\" ( )");
    let always = config(EditorOptions {
      auto_closing_delete: AutoClosingEditStrategy::Always,
      ..EditorOptions::default()
    });
    assert!(is_auto_closing_pair_delete(&always, &[], &doc, &[caret(1, 3)]));
    assert!(is_auto_closing_pair_delete(&always, &[], &doc, &[caret(1, 6)]));
    assert!(!is_auto_closing_pair_delete(&always, &[], &doc, &[caret(1, 9)]));
    assert!(!is_auto_closing_pair_delete(&always, &[], &doc, &[caret(1, 2)]));

    let auto = config(EditorOptions::default());
    assert!(!is_auto_closing_pair_delete(&auto, &[], &doc, &[caret(1, 3)]));
    assert!(is_auto_closing_pair_delete(&auto, &[Position::new(1, 3)], &doc, &[caret(1, 3)]));

    let no_quotes = config(EditorOptions {
      auto_closing_delete: AutoClosingEditStrategy::Always,
      auto_closing_quotes: AutoClosingStrategy::Never,
      ..EditorOptions::default()
    });
    assert!(!is_auto_closing_pair_delete(&no_quotes, &[], &doc, &[caret(1, 6)]));
    assert!(is_auto_closing_pair_delete(&no_quotes, &[], &doc, &[caret(1, 3)]));

    let (push, commands) = delete_left(
      EditOperationType::DeletingLeft,
      &always,
      &doc,
      &[caret(1, 3)],
      &[],
    );
    assert!(push);
    assert_eq!(commands[0], Some(ReplaceCommand::delete(Range::from_coords(1, 2, 1, 4))));
  }

  #[test]
  fn cut_full_lines() {
    let doc = doc("one\ntwo\nthree");
    let config = config(EditorOptions::default());

    let result = cut(&config, &doc, &[caret(1, 2)]);
    assert_eq!(result.commands[0], Some(ReplaceCommand::delete(Range::from_coords(1, 1, 2, 1))));
    assert!(result.should_push_stack_element_before && result.should_push_stack_element_after);

    let result = cut(&config, &doc, &[caret(3, 2)]);
    assert_eq!(result.commands[0], Some(ReplaceCommand::delete(Range::from_coords(2, 4, 3, 6))));

    // the cut above already took the line break before the last line
    let result = cut(&config, &doc, &[caret(3, 1), caret(2, 1)]);
    assert_eq!(result.commands[1], Some(ReplaceCommand::delete(Range::from_coords(2, 1, 3, 1))));
    assert_eq!(result.commands[0], Some(ReplaceCommand::delete(Range::from_coords(3, 1, 3, 6))));

    let single = self::doc("only");
    let result = cut(&config, &single, &[caret(1, 3)]);
    assert_eq!(result.commands[0], Some(ReplaceCommand::delete(Range::from_coords(1, 1, 1, 5))));
    assert_eq!(cut(&config, &self::doc(""), &[caret(1, 1)]).commands[0], None);
  }

  #[test]
  fn cut_dedups_same_line_and_skips_without_clipboard() {
    let doc = doc("one\ntwo\nthree");
    let config_on = config(EditorOptions::default());
    let result = cut(&config_on, &doc, &[caret(2, 3), caret(2, 1)]);
    assert_eq!(result.commands.len(), 2);
    assert_eq!(result.commands.iter().flatten().count(), 1);
    assert_eq!(result.commands[1], Some(ReplaceCommand::delete(Range::from_coords(2, 1, 3, 1))));

    let result = cut(&config_on, &doc, &[caret(3, 1), caret(3, 4)]);
    assert_eq!(result.commands.iter().flatten().count(), 1);

    let config_off = config(EditorOptions {
      empty_selection_clipboard: false,
      ..EditorOptions::default()
    });
    let selection = Selection::from_coords(1, 2, 1, 4);
    let result = cut(&config_off, &doc, &[caret(2, 1), selection]);
    assert_eq!(result.commands[0], None);
    assert_eq!(result.commands[1], Some(ReplaceCommand::delete(selection.range())));
  }

  quickcheck! {
    fn delete_right_keeps_selections_and_empties_only_at_end(
      text: String,
      anchor: (usize, usize),
      active: (usize, usize)
    ) -> bool {
      let doc = doc(&text);
      let config = config(EditorOptions {
        trim_whitespace_on_delete: true,
        ..EditorOptions::default()
      });
      let selection = Selection::new(
        position_in(&doc, anchor.0, anchor.1),
        position_in(&doc, active.0, active.1),
      );
      let range = get_delete_right_range(&selection, &doc, &config);
      if !selection.is_empty() {
        return range == selection.range();
      }
      let at_end = doc.offset_at(selection.active) == doc.text().len_chars();
      range.is_empty() == at_end
    }

    fn delete_left_stays_inside_indentation(indent: String, rest: String, column: usize) -> bool {
      let indent: String = indent
        .chars()
        .map(|ch| if ch as u32 % 2 == 0 { ' ' } else { '\t' })
        .collect();
      let rest: String = rest
        .chars()
        .filter(|ch| !the_core::chars::char_is_line_ending(*ch))
        .collect();
      let doc = doc(&format!("{indent}{rest}"));
      let config = config(EditorOptions::default());
      let first = doc.line_first_non_whitespace_column(1);
      let last_indentation = if first == 0 { doc.line_max_column(1) } else { first };
      let column = column % last_indentation + 1;
      let range = get_delete_left_range(&caret(1, column), &doc, &config);
      range.is_single_line() && range.end().column == column && range.end().column <= last_indentation
    }

    fn auto_closing_pair_delete_needs_one_empty_selection(
      column: usize,
      other: usize,
      extend: bool
    ) -> bool {
      let doc = doc("(){}[]\"\"''");
      let config = config(EditorOptions {
        auto_closing_delete: AutoClosingEditStrategy::Always,
        ..EditorOptions::default()
      });
      let column = column % 11 + 1;
      let selections = if extend {
        vec![Selection::from_coords(1, column, 1, column % 11 + 1)]
      } else {
        vec![caret(1, column), caret(1, other % 11 + 1)]
      };
      !is_auto_closing_pair_delete(&config, &[], &doc, &selections)
    }

    fn cut_yields_one_entry_per_selection(text: String, carets: Vec<(usize, usize)>) -> bool {
      let doc = doc(&text);
      let config = config(EditorOptions::default());
      let selections: Vec<_> = carets
        .iter()
        .map(|&(line, column)| Selection::caret(position_in(&doc, line, column)))
        .collect();
      cut(&config, &doc, &selections).commands.len() == selections.len()
    }
  }
}
