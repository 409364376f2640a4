//! Editor options and the resolved per-editor cursor configuration.
//!
//! [`EditorOptions`] is what users write (kebab-case TOML, every key
//! defaulted). [`CursorConfiguration`] is the immutable snapshot the edit
//! operations read. It is rebuilt only when one of the keys reported by
//! [`CursorConfiguration::should_recreate`] changes.

use std::{
  collections::HashMap,
  sync::Arc,
};

use once_cell::sync::OnceCell;
use serde::{
  Deserialize,
  Serialize,
};
use the_core::chars::WordClassifier;
use thiserror::Error;

use crate::{
  columns,
  document::TextModel,
  position::Position,
};

pub type Result<T> = std::result::Result<T, ConfigError>;

#[derive(Debug, Error)]
pub enum ConfigError {
  #[error("invalid editor options: {0}")]
  Toml(#[from] toml::de::Error),
}

/// Chars that count as separators between words by default.
pub const DEFAULT_WORD_SEPARATORS: &str = "`~!@#$%^&*()-=+[{]}\\|;:'\",.<>/?";

/// Chars before which a language-defined auto-close happens when the
/// language does not say otherwise.
pub const DEFAULT_AUTO_CLOSE_BEFORE: &str = ";:.,=}])> \t";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum AutoClosingStrategy {
  Never,
  Always,
  BeforeWhitespace,
  #[default]
  LanguageDefined,
}

/// Policy for deleting or typing over an auto-closed char.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum AutoClosingEditStrategy {
  Never,
  Always,
  /// Only chars the editor inserted itself.
  #[default]
  Auto,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum MultiCursorPaste {
  /// One line of the pasted text per cursor when the counts match.
  #[default]
  Spread,
  Full,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case", default, deny_unknown_fields)]
pub struct EditorOptions {
  pub tab_size:                  u16,
  pub indent_size:               u16,
  pub insert_spaces:             bool,
  pub use_tab_stops:             bool,
  pub trim_whitespace_on_delete: bool,
  pub empty_selection_clipboard: bool,
  pub auto_closing_brackets:     AutoClosingStrategy,
  pub auto_closing_quotes:       AutoClosingStrategy,
  pub auto_closing_delete:       AutoClosingEditStrategy,
  pub auto_closing_overtype:     AutoClosingEditStrategy,
  pub multi_cursor_paste:        MultiCursorPaste,
  pub word_separators:           String,
  pub word_wrap:                 bool,
  pub render_whitespace:         bool,
}

impl Default for EditorOptions {
  fn default() -> Self {
    Self {
      tab_size:                  4,
      indent_size:               4,
      insert_spaces:             true,
      use_tab_stops:             true,
      trim_whitespace_on_delete: false,
      empty_selection_clipboard: true,
      auto_closing_brackets:     AutoClosingStrategy::LanguageDefined,
      auto_closing_quotes:       AutoClosingStrategy::LanguageDefined,
      auto_closing_delete:       AutoClosingEditStrategy::Auto,
      auto_closing_overtype:     AutoClosingEditStrategy::Auto,
      multi_cursor_paste:        MultiCursorPaste::Spread,
      word_separators:           DEFAULT_WORD_SEPARATORS.to_string(),
      word_wrap:                 false,
      render_whitespace:         false,
    }
  }
}

impl EditorOptions {
  pub fn from_toml(source: &str) -> Result<Self> {
    Ok(toml::from_str(source)?)
  }

  /// Keys whose values differ between `self` and `other`.
  pub fn changed_keys(&self, other: &Self) -> Vec<OptionKey> {
    OptionKey::ALL
      .iter()
      .copied()
      .filter(|key| !key.same_value(self, other))
      .collect()
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OptionKey {
  TabSize,
  IndentSize,
  InsertSpaces,
  UseTabStops,
  TrimWhitespaceOnDelete,
  EmptySelectionClipboard,
  AutoClosingBrackets,
  AutoClosingQuotes,
  AutoClosingDelete,
  AutoClosingOvertype,
  MultiCursorPaste,
  WordSeparators,
  WordWrap,
  RenderWhitespace,
}

impl OptionKey {
  pub const ALL: [OptionKey; 14] = [
    Self::TabSize,
    Self::IndentSize,
    Self::InsertSpaces,
    Self::UseTabStops,
    Self::TrimWhitespaceOnDelete,
    Self::EmptySelectionClipboard,
    Self::AutoClosingBrackets,
    Self::AutoClosingQuotes,
    Self::AutoClosingDelete,
    Self::AutoClosingOvertype,
    Self::MultiCursorPaste,
    Self::WordSeparators,
    Self::WordWrap,
    Self::RenderWhitespace,
  ];

  fn same_value(self, a: &EditorOptions, b: &EditorOptions) -> bool {
    match self {
      Self::TabSize => a.tab_size == b.tab_size,
      Self::IndentSize => a.indent_size == b.indent_size,
      Self::InsertSpaces => a.insert_spaces == b.insert_spaces,
      Self::UseTabStops => a.use_tab_stops == b.use_tab_stops,
      Self::TrimWhitespaceOnDelete => a.trim_whitespace_on_delete == b.trim_whitespace_on_delete,
      Self::EmptySelectionClipboard => a.empty_selection_clipboard == b.empty_selection_clipboard,
      Self::AutoClosingBrackets => a.auto_closing_brackets == b.auto_closing_brackets,
      Self::AutoClosingQuotes => a.auto_closing_quotes == b.auto_closing_quotes,
      Self::AutoClosingDelete => a.auto_closing_delete == b.auto_closing_delete,
      Self::AutoClosingOvertype => a.auto_closing_overtype == b.auto_closing_overtype,
      Self::MultiCursorPaste => a.multi_cursor_paste == b.multi_cursor_paste,
      Self::WordSeparators => a.word_separators == b.word_separators,
      Self::WordWrap => a.word_wrap == b.word_wrap,
      Self::RenderWhitespace => a.render_whitespace == b.render_whitespace,
    }
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AutoClosingPair {
  pub open:  char,
  pub close: char,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AutoClosingKind {
  Quote,
  Bracket,
}

impl AutoClosingPair {
  pub const fn new(open: char, close: char) -> Self {
    Self { open, close }
  }

  pub fn kind(&self) -> AutoClosingKind {
    if matches!(self.open, '"' | '\'' | '`') {
      AutoClosingKind::Quote
    } else {
      AutoClosingKind::Bracket
    }
  }
}

pub const DEFAULT_PAIRS: &[AutoClosingPair] = &[
  AutoClosingPair::new('(', ')'),
  AutoClosingPair::new('{', '}'),
  AutoClosingPair::new('[', ']'),
  AutoClosingPair::new('\'', '\''),
  AutoClosingPair::new('"', '"'),
  AutoClosingPair::new('`', '`'),
];

/// Lookup tables over a language's pairs, keyed by open and by close char.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AutoClosingPairs {
  by_open:  HashMap<char, Vec<AutoClosingPair>>,
  by_close: HashMap<char, Vec<AutoClosingPair>>,
}

impl AutoClosingPairs {
  pub fn new(pairs: &[AutoClosingPair]) -> Self {
    let mut by_open: HashMap<char, Vec<AutoClosingPair>> = HashMap::new();
    let mut by_close: HashMap<char, Vec<AutoClosingPair>> = HashMap::new();
    for pair in pairs {
      by_open.entry(pair.open).or_default().push(*pair);
      by_close.entry(pair.close).or_default().push(*pair);
    }
    Self { by_open, by_close }
  }

  pub fn with_open(&self, open: char) -> &[AutoClosingPair] {
    self.by_open.get(&open).map(Vec::as_slice).unwrap_or_default()
  }

  pub fn with_close(&self, close: char) -> &[AutoClosingPair] {
    self.by_close.get(&close).map(Vec::as_slice).unwrap_or_default()
  }

  /// The registered pair `open`/`close`, if any.
  pub fn find(&self, open: char, close: char) -> Option<AutoClosingPair> {
    self
      .with_open(open)
      .iter()
      .find(|pair| pair.close == close)
      .copied()
  }
}

/// Per-language settings relevant to cursor operations.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub struct LanguageConfiguration {
  pub language_id:        String,
  #[serde(default = "default_pairs")]
  pub auto_closing_pairs: Vec<AutoClosingPair>,
  #[serde(default)]
  pub auto_close_before:  Option<String>,
  #[serde(skip)]
  auto_close_before_set:  OnceCell<Vec<char>>,
}

fn default_pairs() -> Vec<AutoClosingPair> {
  DEFAULT_PAIRS.to_vec()
}

impl LanguageConfiguration {
  pub fn new(language_id: impl Into<String>) -> Self {
    Self {
      language_id:           language_id.into(),
      auto_closing_pairs:    default_pairs(),
      auto_close_before:     None,
      auto_close_before_set: OnceCell::new(),
    }
  }

  #[must_use]
  pub fn with_auto_close_before(mut self, chars: impl Into<String>) -> Self {
    self.auto_close_before = Some(chars.into());
    self.auto_close_before_set = OnceCell::new();
    self
  }

  #[must_use]
  pub fn with_pairs(mut self, pairs: Vec<AutoClosingPair>) -> Self {
    self.auto_closing_pairs = pairs;
    self
  }

  /// Sorted set of chars before which this language auto-closes. Built on
  /// first use.
  pub fn auto_close_before(&self) -> &[char] {
    self.auto_close_before_set.get_or_init(|| {
      tracing::trace!(language = %self.language_id, "resolve auto-close-before set");
      let mut chars: Vec<char> = self
        .auto_close_before
        .as_deref()
        .unwrap_or(DEFAULT_AUTO_CLOSE_BEFORE)
        .chars()
        .collect();
      chars.sort_unstable();
      chars.dedup();
      chars
    })
  }
}

/// Language configurations shared by every editor, one per language id.
#[derive(Debug, Default)]
pub struct LanguageRegistry {
  languages: HashMap<String, Arc<LanguageConfiguration>>,
}

impl LanguageRegistry {
  pub fn register(&mut self, language: LanguageConfiguration) -> Arc<LanguageConfiguration> {
    let language = Arc::new(language);
    self
      .languages
      .insert(language.language_id.clone(), Arc::clone(&language));
    language
  }

  /// The registered configuration, or a default one created on demand.
  pub fn get(&mut self, language_id: &str) -> Arc<LanguageConfiguration> {
    Arc::clone(
      self
        .languages
        .entry(language_id.to_string())
        .or_insert_with(|| Arc::new(LanguageConfiguration::new(language_id))),
    )
  }
}

/// Resolved, immutable settings for one editor.
#[derive(Debug, Clone)]
pub struct CursorConfiguration {
  pub tab_size:                  u16,
  pub indent_size:               u16,
  pub insert_spaces:             bool,
  pub use_tab_stops:             bool,
  pub trim_whitespace_on_delete: bool,
  pub empty_selection_clipboard: bool,
  pub auto_closing_brackets:     AutoClosingStrategy,
  pub auto_closing_quotes:       AutoClosingStrategy,
  pub auto_closing_delete:       AutoClosingEditStrategy,
  pub auto_closing_overtype:     AutoClosingEditStrategy,
  pub multi_cursor_paste:        MultiCursorPaste,
  pub auto_closing_pairs:        AutoClosingPairs,
  pub word_separators:           String,
  pub word_classifier:           WordClassifier,
  language:                      Arc<LanguageConfiguration>,
}

impl Default for CursorConfiguration {
  fn default() -> Self {
    Self::new(
      &EditorOptions::default(),
      Arc::new(LanguageConfiguration::new("plaintext")),
    )
  }
}

impl CursorConfiguration {
  pub fn new(options: &EditorOptions, language: Arc<LanguageConfiguration>) -> Self {
    Self {
      tab_size: options.tab_size.max(1),
      indent_size: options.indent_size.max(1),
      insert_spaces: options.insert_spaces,
      use_tab_stops: options.use_tab_stops,
      trim_whitespace_on_delete: options.trim_whitespace_on_delete,
      empty_selection_clipboard: options.empty_selection_clipboard,
      auto_closing_brackets: options.auto_closing_brackets,
      auto_closing_quotes: options.auto_closing_quotes,
      auto_closing_delete: options.auto_closing_delete,
      auto_closing_overtype: options.auto_closing_overtype,
      multi_cursor_paste: options.multi_cursor_paste,
      auto_closing_pairs: AutoClosingPairs::new(&language.auto_closing_pairs),
      word_separators: options.word_separators.clone(),
      word_classifier: WordClassifier::new(&options.word_separators),
      language,
    }
  }

  pub fn language_id(&self) -> &str {
    &self.language.language_id
  }

  /// Whether a change of any of `changed` invalidates this snapshot.
  pub fn should_recreate(changed: &[OptionKey]) -> bool {
    changed.iter().any(|key| {
      !matches!(key, OptionKey::WordWrap | OptionKey::RenderWhitespace)
    })
  }

  pub fn auto_closing_strategy(&self, kind: AutoClosingKind) -> AutoClosingStrategy {
    match kind {
      AutoClosingKind::Quote => self.auto_closing_quotes,
      AutoClosingKind::Bracket => self.auto_closing_brackets,
    }
  }

  /// Whether a pair of `kind` may be auto-closed when `ch` follows the
  /// caret.
  pub fn should_auto_close_before(&self, kind: AutoClosingKind, ch: char) -> bool {
    match self.auto_closing_strategy(kind) {
      AutoClosingStrategy::Always => true,
      AutoClosingStrategy::Never => false,
      AutoClosingStrategy::BeforeWhitespace => ch == ' ' || ch == '\t',
      AutoClosingStrategy::LanguageDefined => {
        self.language.auto_close_before().binary_search(&ch).is_ok()
      },
    }
  }

  pub fn visible_column_from_column(&self, model: &impl TextModel, position: Position) -> usize {
    columns::visible_column_from_column(
      &model.line_content(position.line),
      position.column,
      self.tab_size,
    )
  }

  pub fn column_from_visible_column(
    &self,
    model: &impl TextModel,
    line: usize,
    visible_column: usize,
  ) -> usize {
    let column =
      columns::column_from_visible_column(&model.line_content(line), visible_column, self.tab_size);
    column.clamp(model.line_min_column(line), model.line_max_column(line))
  }
}

#[cfg(test)]
mod test {
  use super::*;

  #[test]
  fn options_from_toml_default_missing_keys() {
    let options = EditorOptions::from_toml(
      r#"
        tab-size = 2
        auto-closing-brackets = "before-whitespace"
        auto-closing-delete = "always"
      "#,
    )
    .unwrap();
    assert_eq!(options.tab_size, 2);
    assert_eq!(options.auto_closing_brackets, AutoClosingStrategy::BeforeWhitespace);
    assert_eq!(options.auto_closing_delete, AutoClosingEditStrategy::Always);
    assert_eq!(options.indent_size, 4);
    assert!(options.empty_selection_clipboard);

    assert!(EditorOptions::from_toml("tab-width = 2").is_err());
  }

  #[test]
  fn recreate_only_for_cursor_keys() {
    let a = EditorOptions::default();
    let b = EditorOptions {
      word_wrap: true,
      ..EditorOptions::default()
    };
    let changed = a.changed_keys(&b);
    assert_eq!(changed, vec![OptionKey::WordWrap]);
    assert!(!CursorConfiguration::should_recreate(&changed));

    let c = EditorOptions {
      tab_size: 8,
      ..b.clone()
    };
    assert!(CursorConfiguration::should_recreate(&b.changed_keys(&c)));
    assert!(!CursorConfiguration::should_recreate(&[]));
  }

  #[test]
  fn auto_close_before_policies() {
    let language = Arc::new(LanguageConfiguration::new("rust").with_auto_close_before(";)"));
    let mut options = EditorOptions::default();
    let config = CursorConfiguration::new(&options, Arc::clone(&language));
    assert!(config.should_auto_close_before(AutoClosingKind::Bracket, ';'));
    assert!(!config.should_auto_close_before(AutoClosingKind::Bracket, 'x'));
    assert!(!config.should_auto_close_before(AutoClosingKind::Quote, ' '));

    options.auto_closing_brackets = AutoClosingStrategy::BeforeWhitespace;
    options.auto_closing_quotes = AutoClosingStrategy::Never;
    let config = CursorConfiguration::new(&options, Arc::clone(&language));
    assert!(config.should_auto_close_before(AutoClosingKind::Bracket, '\t'));
    assert!(!config.should_auto_close_before(AutoClosingKind::Bracket, ';'));
    assert!(!config.should_auto_close_before(AutoClosingKind::Quote, ' '));

    options.auto_closing_quotes = AutoClosingStrategy::Always;
    let config = CursorConfiguration::new(&options, language);
    assert!(config.should_auto_close_before(AutoClosingKind::Quote, 'x'));
  }

  #[test]
  fn language_registry_caches_per_id() {
    let mut registry = LanguageRegistry::default();
    let a = registry.get("plaintext");
    let b = registry.get("plaintext");
    assert!(Arc::ptr_eq(&a, &b));
    assert!(std::ptr::eq(a.auto_close_before(), b.auto_close_before()));
    assert!(a.auto_close_before().contains(&')'));
  }

  #[test]
  fn pair_tables() {
    let pairs = AutoClosingPairs::new(DEFAULT_PAIRS);
    assert_eq!(pairs.find('(', ')'), Some(AutoClosingPair::new('(', ')')));
    assert_eq!(pairs.find('(', ']'), None);
    assert_eq!(pairs.with_close('"')[0].kind(), AutoClosingKind::Quote);
    assert!(pairs.with_open('x').is_empty());
  }
}
