//! Grapheme layout of a single line: where each cluster starts and how wide
//! it is on screen.

use unicode_segmentation::UnicodeSegmentation;
use unicode_width::UnicodeWidthStr;

use crate::line_ending::LineEnding;

/// Cells a tab starting at `visual_x` takes, up to the next tab stop.
#[inline]
pub fn tab_width_at(visual_x: usize, tab_width: u16) -> usize {
  let tab_width = tab_width.max(1) as usize;
  tab_width - visual_x % tab_width
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Grapheme<'a> {
  Newline,
  Tab { width: usize },
  Other { g: &'a str },
}

impl<'a> Grapheme<'a> {
  pub fn new(g: &'a str, visual_x: usize, tab_width: u16) -> Grapheme<'a> {
    let mut chars = g.chars();
    let single = match (chars.next(), chars.next()) {
      (Some(ch), None) => Some(ch),
      _ => None,
    };
    if g == "\t" {
      Grapheme::Tab {
        width: tab_width_at(visual_x, tab_width),
      }
    } else if g == "\r\n" || single.and_then(LineEnding::from_char).is_some() {
      Grapheme::Newline
    } else {
      Grapheme::Other { g }
    }
  }

  /// Screen cells.
  #[inline]
  pub fn width(&self) -> usize {
    match *self {
      Grapheme::Other { g } => grapheme_width(g),
      Grapheme::Tab { width } => width,
      Grapheme::Newline => 1,
    }
  }

  /// Chars this grapheme spans in the buffer.
  #[inline]
  pub fn len_chars(&self) -> usize {
    match *self {
      Grapheme::Other { g } => g.chars().count(),
      Grapheme::Tab { .. } => 1,
      Grapheme::Newline => 1,
    }
  }
}

/// Graphemes of `line` laid out from visual column 0.
///
/// Each item is `(char_offset, visual_x, grapheme)`, with `char_offset` the
/// 0-based offset of the grapheme's first char inside `line`.
pub fn line_graphemes(
  line: &str,
  tab_width: u16,
) -> impl Iterator<Item = (usize, usize, Grapheme<'_>)> + '_ {
  line
    .graphemes(true)
    .scan((0, 0), move |(char_offset, visual_x), g| {
      let grapheme = Grapheme::new(g, *visual_x, tab_width);
      let item = (*char_offset, *visual_x, grapheme);
      *char_offset += grapheme.len_chars();
      *visual_x += grapheme.width();
      Some(item)
    })
}

/// Width of a cluster, at least one cell so that ill-formed clusters stay
/// reachable.
#[must_use]
pub fn grapheme_width(g: &str) -> usize {
  if g.is_ascii() {
    g.len()
  } else {
    UnicodeWidthStr::width(g).max(1)
  }
}

/// Start offset of the grapheme that ends at or contains `char_offset - 1`,
/// i.e. where a delete to the left of `char_offset` stops.
///
/// A base char and its combining marks go away together.
#[must_use]
pub fn left_delete_offset(line: &str, char_offset: usize) -> usize {
  line_graphemes(line, 1)
    .map(|(start, _, _)| start)
    .take_while(|start| *start < char_offset)
    .last()
    .unwrap_or(0)
}

#[cfg(test)]
mod test {
  use super::*;

  #[test]
  fn tab_stops() {
    assert_eq!(tab_width_at(0, 4), 4);
    assert_eq!(tab_width_at(1, 4), 3);
    assert_eq!(tab_width_at(3, 4), 1);
    assert_eq!(tab_width_at(4, 4), 4);
    assert_eq!(tab_width_at(7, 0), 1);
  }

  #[test]
  fn variants_and_widths() {
    assert_eq!(Grapheme::new("\t", 3, 4), Grapheme::Tab { width: 1 });
    assert_eq!(Grapheme::new("\r\n", 0, 4), Grapheme::Newline);
    assert_eq!(Grapheme::new("\n", 0, 4).width(), 1);

    let wide = Grapheme::new("漢", 0, 4);
    assert_eq!((wide.width(), wide.len_chars()), (2, 1));
    let combined = Grapheme::new("e\u{0301}", 0, 4);
    assert_eq!((combined.width(), combined.len_chars()), (1, 2));
  }

  #[test]
  fn layout_of_a_line() {
    let items: Vec<_> = line_graphemes("\ta\u{0301}b", 4)
      .map(|(offset, x, g)| (offset, x, g.width()))
      .collect();
    assert_eq!(items, vec![(0, 0, 4), (1, 4, 1), (3, 5, 1)]);
  }

  #[test]
  fn left_delete_takes_whole_clusters() {
    assert_eq!(left_delete_offset("abc", 3), 2);
    assert_eq!(left_delete_offset("abc", 1), 0);
    assert_eq!(left_delete_offset("xa\u{0301}", 3), 1);
    assert_eq!(left_delete_offset("xa\u{0301}y", 2), 1);
    assert_eq!(left_delete_offset("", 0), 0);
  }
}
