//! The undo and redo stacks of a document.
//!
//! Both stacks hold transactions in their forward orientation. Undo applies
//! the inverse of the top undo entry and moves it to the redo stack; redo
//! re-applies the top redo entry and moves it back.
//!
//! The stacks only change after the caller has applied the transaction:
//! [`History::undo`] and [`History::redo`] peek, [`History::apply_undo`] and
//! [`History::apply_redo`] move the entry once the list surgery succeeded.
//!
//! Committing a new transaction forks history: the whole redo stack is
//! discarded. Lines that no transaction can reach any more are handed back to
//! the caller as spans to free.

use std::collections::VecDeque;

use smallvec::SmallVec;

use crate::transaction::{
  Span,
  Transaction,
};

/// Default bound of the undo stack.
pub const DEFAULT_HISTORY_LIMIT: usize = 1024;

/// Runs of lines that became unreachable.
pub type Released = SmallVec<[Span; 4]>;

#[derive(Debug)]
pub struct History {
  undo:      VecDeque<Transaction>,
  redo:      Vec<Transaction>,
  /// 0 means unbounded.
  limit:     usize,
  /// Entries were dropped from the bottom of the undo stack.
  truncated: bool,
}

impl Default for History {
  fn default() -> Self {
    Self::new(DEFAULT_HISTORY_LIMIT)
  }
}

impl History {
  pub fn new(limit: usize) -> Self {
    Self {
      undo: VecDeque::new(),
      redo: Vec::new(),
      limit,
      truncated: false,
    }
  }

  pub fn limit(&self) -> usize {
    self.limit
  }

  pub fn undo_len(&self) -> usize {
    self.undo.len()
  }

  pub fn redo_len(&self) -> usize {
    self.redo.len()
  }

  /// Whether undoing everything returns to the state history started from.
  pub fn at_origin(&self) -> bool {
    self.undo.is_empty() && !self.truncated
  }

  /// Record a freshly applied transaction.
  pub fn commit(&mut self, transaction: Transaction) -> Released {
    let mut released = self.clear_redo();

    self.undo.push_back(transaction);
    while self.limit > 0 && self.undo.len() > self.limit {
      if let Some(oldest) = self.undo.pop_front() {
        released.extend(oldest.remove());
        self.truncated = true;
      }
    }

    if self.truncated && !released.is_empty() {
      tracing::debug!(
        limit = self.limit,
        released = released.len(),
        "history: truncated"
      );
    }
    released
  }

  fn clear_redo(&mut self) -> Released {
    if !self.redo.is_empty() {
      tracing::debug!(dropped = self.redo.len(), "history: new edit discards redo");
    }
    self
      .redo
      .drain(..)
      .filter_map(|transaction| transaction.insert())
      .collect()
  }

  /// The transaction the next undo reverts.
  pub fn undo(&self) -> Option<Transaction> {
    self.undo.back().copied()
  }

  /// The transaction the next redo re-applies.
  pub fn redo(&self) -> Option<Transaction> {
    self.redo.last().copied()
  }

  pub fn apply_undo(&mut self) {
    if let Some(transaction) = self.undo.pop_back() {
      self.redo.push(transaction);
    }
  }

  pub fn apply_redo(&mut self) {
    if let Some(transaction) = self.redo.pop() {
      self.undo.push_back(transaction);
    }
  }

  /// Take the top undo entry without applying its inverse.
  ///
  /// Used to fold a transaction into the one about to be committed.
  pub fn pop_undo(&mut self) -> Option<Transaction> {
    self.undo.pop_back()
  }

  /// Forget both stacks. The current state becomes the origin.
  pub fn reset(&mut self) -> Released {
    let mut released = self.clear_redo();
    released.extend(self.undo.drain(..).filter_map(|transaction| transaction.remove()));
    self.truncated = false;
    released
  }
}
