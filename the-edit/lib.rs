//! Cursor-level editing on top of a rope.
//!
//! Geometry lives in [`position`], [`range`] and [`selection`]. The pure
//! operations in [`delete`] and [`typing`] turn selections into
//! [`command::ReplaceCommand`]s, and a [`controller::CursorsController`]
//! commits them to a [`document::Document`] whose undo elements go to a
//! shared [`history::UndoRedoLedger`].

use smartstring::{
  LazyCompact,
  SmartString,
};

pub mod columns;
pub mod command;
pub mod config;
pub mod controller;
pub mod cursor;
pub mod delete;
pub mod document;
pub mod history;
pub mod movement;
pub mod position;
pub mod range;
pub mod search;
pub mod selection;
pub mod transaction;
pub mod typing;

pub type Tendril = SmartString<LazyCompact>;
