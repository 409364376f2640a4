//! Conversions between raw columns and tab-expanded visible columns.
//!
//! Raw columns are 1-based char positions. Visible columns are 0-based screen
//! cells: a tab advances to the next multiple of the tab size and wide
//! graphemes take two cells.

use the_core::grapheme::line_graphemes;

/// Visible column of the caret at raw `column` of `line`.
pub fn visible_column_from_column(line: &str, column: usize, tab_size: u16) -> usize {
  let offset = column.saturating_sub(1);
  let mut visible = 0;
  for (start, x, grapheme) in line_graphemes(line, tab_size) {
    if start >= offset {
      return x;
    }
    visible = x + grapheme.width();
  }
  visible
}

/// Raw column closest to `visible_column` on `line`.
///
/// When the visible column falls inside a grapheme the nearer edge wins, ties
/// going left. The result is in `1..=line_len + 1`.
pub fn column_from_visible_column(line: &str, visible_column: usize, tab_size: u16) -> usize {
  let mut len = 0;
  for (start, before, grapheme) in line_graphemes(line, tab_size) {
    let after = before + grapheme.width();
    if after > visible_column {
      let before_delta = visible_column.saturating_sub(before);
      let after_delta = after - visible_column;
      return if after_delta < before_delta {
        start + grapheme.len_chars() + 1
      } else {
        start + 1
      };
    }
    len = start + grapheme.len_chars();
  }
  len + 1
}

/// Previous multiple of `size` strictly before `visible_column`, or 0.
#[inline]
pub fn prev_tab_stop(visible_column: usize, size: u16) -> usize {
  let size = size.max(1) as usize;
  visible_column.saturating_sub(1) / size * size
}

/// Next multiple of `size` strictly after `visible_column`.
#[inline]
pub fn next_tab_stop(visible_column: usize, size: u16) -> usize {
  let size = size.max(1) as usize;
  visible_column + size - visible_column % size
}
