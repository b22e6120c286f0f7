//! Notifications a session sends to the host.

use crate::{
  document::{
    Document,
    DocumentId,
  },
  line::LineId,
  transaction::Transaction,
};

/// A transaction was applied to a document.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChangeEvent {
  pub document:    DocumentId,
  /// Always in its forward orientation.
  pub transaction: Transaction,
  /// The inverse of `transaction` is what was applied.
  pub undo:        bool,
}

impl ChangeEvent {
  pub fn new(document: DocumentId, transaction: Transaction, undo: bool) -> Self {
    Self {
      document,
      transaction,
      undo,
    }
  }

  /// The transaction as it was applied.
  pub fn applied(&self) -> Transaction {
    if self.undo {
      self.transaction.invert()
    } else {
      self.transaction
    }
  }

  /// Move a line pointer the host holds off lines this change removed.
  pub fn repair(&self, document: &Document, line: LineId) -> LineId {
    document.relocate(line, &self.applied())
  }
}

/// A document was closed. Its line handles are dead from now on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CloseEvent {
  pub document: DocumentId,
}

/// Receives session notifications. Both methods default to doing nothing.
pub trait SessionListener {
  fn on_change(&mut self, _document: &Document, _event: &ChangeEvent) {}

  fn on_close(&mut self, _event: &CloseEvent) {}
}

/// A listener that ignores everything.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoListener;

impl SessionListener for NoListener {}
