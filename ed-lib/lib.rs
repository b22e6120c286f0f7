//! Document and undo engine for a line-oriented editor.
//!
//! A [`document::Document`] owns a doubly-linked list of lines whose text
//! lives in an append-only arena. Every structural edit is recorded as one
//! self-invertible [`transaction::Transaction`], so undo and redo are the
//! same list surgery applied to dual data. The [`mark::Mark`] observes every
//! applied transaction and keeps the current selection pointing at live
//! lines. All user-facing operations go through a [`session::Session`].

use smartstring::{
  LazyCompact,
  SmartString,
};

pub mod config;
pub mod document;
pub mod error;
pub mod events;
pub mod history;
pub mod line;
pub mod mark;
pub mod session;
pub mod stash;
pub mod transaction;

pub type Tendril = SmartString<LazyCompact>;
