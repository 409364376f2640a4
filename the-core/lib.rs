//! Text primitives shared by the editing crates: char classification,
//! grapheme traversal and measurement, and line endings.

pub mod chars;
pub mod grapheme;
pub mod line_ending;
