//! The copy/cut stash.
//!
//! The stash owns its text outright. Nothing in it refers to document lines,
//! so removing or closing the source never invalidates a pending paste.

use crate::{
  Tendril,
  document::DocumentId,
  mark::MarkShape,
};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Stash {
  file:  Option<DocumentId>,
  lines: Vec<Tendril>,
  shape: MarkShape,
}

impl Stash {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn is_empty(&self) -> bool {
    self.lines.is_empty()
  }

  /// The document the stash was taken from, while it is open.
  pub fn file(&self) -> Option<DocumentId> {
    self.file
  }

  pub fn lines(&self) -> &[Tendril] {
    &self.lines
  }

  pub fn rows(&self) -> usize {
    self.lines.len()
  }

  pub fn shape(&self) -> MarkShape {
    self.shape
  }

  pub(crate) fn replace(&mut self, file: DocumentId, lines: Vec<Tendril>, shape: MarkShape) {
    tracing::debug!(
      document = ?file,
      rows = lines.len(),
      shape = ?shape,
      replaced = self.lines.len(),
      "stash: replaced"
    );
    self.file = Some(file);
    self.lines = lines;
    self.shape = shape;
  }

  pub fn clear(&mut self) {
    *self = Self::default();
  }

  /// Drop the reference to a closed document. The text stays pasteable.
  pub(crate) fn forget(&mut self, file: DocumentId) {
    if self.file == Some(file) {
      self.file = None;
    }
  }
}
