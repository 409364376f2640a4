//! Benchmarks for the delete operations with many cursors.
//!
//! Run with: `cargo bench -p the-edit --bench delete`

use std::sync::Arc;

use divan::{
  Bencher,
  black_box,
};
use the_edit::{
  command::EditOperationType,
  config::CursorConfiguration,
  controller::CursorsController,
  delete,
  document::Document,
  history::UndoRedoLedger,
  position::Position,
  selection::Selection,
};

fn main() {
  divan::main();
}

fn make_text(lines: usize) -> String {
  let line = "    let quick_brown = fox.jumps(over, the_lazy_dog);\n";
  line.repeat(lines)
}

/// One caret per line, in the middle of the indentation or of the code.
fn make_carets(lines: usize, column: usize) -> Vec<Selection> {
  (1..=lines)
    .map(|line| Selection::caret(Position::new(line, column)))
    .collect()
}

mod compute {
  use super::*;

  const LINES: usize = 2048;

  #[divan::bench(args = [1, 64, 1024])]
  fn delete_left_code(bencher: Bencher, count: usize) {
    let doc = Document::new(make_text(LINES), UndoRedoLedger::shared());
    let config = CursorConfiguration::default();
    let selections = make_carets(count, 20);

    bencher.bench(|| {
      let commands = delete::delete_left(
        EditOperationType::Other,
        black_box(&config),
        black_box(&doc),
        black_box(&selections),
        &[],
      );
      black_box(commands);
    });
  }

  #[divan::bench(args = [1, 64, 1024])]
  fn delete_left_indentation(bencher: Bencher, count: usize) {
    let doc = Document::new(make_text(LINES), UndoRedoLedger::shared());
    let config = CursorConfiguration::default();
    let selections = make_carets(count, 5);

    bencher.bench(|| {
      let commands = delete::delete_left(
        EditOperationType::Other,
        black_box(&config),
        black_box(&doc),
        black_box(&selections),
        &[],
      );
      black_box(commands);
    });
  }

  #[divan::bench(args = [1, 64, 1024])]
  fn cut_lines(bencher: Bencher, count: usize) {
    let doc = Document::new(make_text(LINES), UndoRedoLedger::shared());
    let config = CursorConfiguration::default();
    let selections = make_carets(count, 1);

    bencher.bench(|| {
      black_box(delete::cut(
        black_box(&config),
        black_box(&doc),
        black_box(&selections),
      ));
    });
  }
}

mod execute {
  use super::*;

  const LINES: usize = 1024;

  #[divan::bench(args = [1, 64, 1024])]
  fn delete_right(bencher: Bencher, count: usize) {
    let text = make_text(LINES);
    let config = Arc::new(CursorConfiguration::default());
    let selections = make_carets(count, 20);

    bencher
      .with_inputs(|| {
        let doc = Document::new(text.as_str(), UndoRedoLedger::shared());
        let controller = CursorsController::new(Arc::clone(&config), &selections);
        (doc, controller)
      })
      .bench_local_values(|(mut doc, mut controller)| {
        controller.delete_right(&mut doc).unwrap();
        black_box(doc.version());
      });
  }
}
