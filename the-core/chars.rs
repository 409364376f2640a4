use crate::line_ending::LineEnding;

#[inline]
pub fn char_is_line_ending(ch: char) -> bool {
  LineEnding::from_char(ch).is_some()
}

/// Horizontal whitespace, including the unicode spaces that render blank.
#[inline]
pub fn char_is_whitespace(ch: char) -> bool {
  matches!(
    ch,
    '\t'
      | ' '
      | '\u{00A0}' // no-break space
      | '\u{180E}' // mongolian vowel separator
      | '\u{2000}'..='\u{200B}' // en quad up to zero width space
      | '\u{202F}' // narrow no-break space
      | '\u{205F}' // medium mathematical space
      | '\u{3000}' // ideographic space
      | '\u{FEFF}' // zero width no-break space
  )
}

/// What an indent can be made of.
#[inline]
pub fn char_is_indent(ch: char) -> bool {
  ch == ' ' || ch == '\t'
}

/// How a char takes part in word navigation under a configured set of word
/// separators.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WordCharClass {
  Regular,
  Whitespace,
  Separator,
}

/// Classifies chars against a user configured `word_separators` string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WordClassifier {
  separators: Vec<char>,
}

impl WordClassifier {
  pub fn new(separators: &str) -> Self {
    let mut separators: Vec<char> = separators.chars().collect();
    separators.sort_unstable();
    separators.dedup();
    Self { separators }
  }

  pub fn classify(&self, ch: char) -> WordCharClass {
    if char_is_whitespace(ch) || char_is_line_ending(ch) {
      WordCharClass::Whitespace
    } else if self.separators.binary_search(&ch).is_ok() {
      WordCharClass::Separator
    } else {
      WordCharClass::Regular
    }
  }

  #[inline]
  pub fn is_word_char(&self, ch: char) -> bool {
    self.classify(ch) == WordCharClass::Regular
  }
}
