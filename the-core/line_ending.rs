//! Line terminators as the buffer counts them.

use ropey::RopeSlice;

/// Line breaks recognised by the buffer.
///
/// `Crlf`, `LF` and `CR` always end a line. The other unicode terminators only
/// do so with the `unicode-lines` feature, which has to agree with the ropey
/// feature used to count lines.
#[derive(PartialEq, Eq, Copy, Clone, Debug)]
pub enum LineEnding {
  Crlf,
  LF,
  CR,
  #[cfg(feature = "unicode-lines")]
  VT,
  #[cfg(feature = "unicode-lines")]
  FF,
  #[cfg(feature = "unicode-lines")]
  Nel,
  #[cfg(feature = "unicode-lines")]
  LS,
  #[cfg(feature = "unicode-lines")]
  PS,
}

impl LineEnding {
  #[inline]
  pub const fn len_chars(&self) -> usize {
    match self {
      Self::Crlf => 2,
      _ => 1,
    }
  }

  /// Single-char terminators. `Crlf` is never returned; see
  /// [`trailing_line_ending`].
  #[inline]
  pub const fn from_char(ch: char) -> Option<LineEnding> {
    match ch {
      '\n' => Some(Self::LF),
      '\r' => Some(Self::CR),
      #[cfg(feature = "unicode-lines")]
      '\u{000B}' => Some(Self::VT),
      #[cfg(feature = "unicode-lines")]
      '\u{000C}' => Some(Self::FF),
      #[cfg(feature = "unicode-lines")]
      '\u{0085}' => Some(Self::Nel),
      #[cfg(feature = "unicode-lines")]
      '\u{2028}' => Some(Self::LS),
      #[cfg(feature = "unicode-lines")]
      '\u{2029}' => Some(Self::PS),
      _ => None,
    }
  }
}

/// Terminator at the very end of `line`, if any.
pub fn trailing_line_ending(line: RopeSlice) -> Option<LineEnding> {
  let mut chars = line.chars_at(line.len_chars());
  let ending = LineEnding::from_char(chars.prev()?)?;
  if ending == LineEnding::LF && chars.prev() == Some('\r') {
    return Some(LineEnding::Crlf);
  }
  Some(ending)
}

/// Line `line_idx` (0-based) of `slice` without its terminator.
pub fn line_without_line_ending<'a>(slice: &RopeSlice<'a>, line_idx: usize) -> RopeSlice<'a> {
  let line = slice.line(line_idx);
  let ending = trailing_line_ending(line).map_or(0, |ending| ending.len_chars());
  line.slice(..line.len_chars() - ending)
}

/// Splits `text` into lines, dropping the line terminators.
///
/// A trailing terminator yields a final empty line, matching how the buffer
/// counts lines.
pub fn split_lines(text: &str) -> Vec<&str> {
  let mut lines = Vec::new();
  let mut start = 0;
  let mut chars = text.char_indices().peekable();
  while let Some((idx, ch)) = chars.next() {
    if LineEnding::from_char(ch).is_none() {
      continue;
    }
    lines.push(&text[start..idx]);
    let mut end = idx + ch.len_utf8();
    if ch == '\r' && chars.next_if(|(_, next)| *next == '\n').is_some() {
      end += 1;
    }
    start = end;
  }
  lines.push(&text[start..]);
  lines
}
