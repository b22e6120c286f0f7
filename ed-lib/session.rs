//! The editing session: every open document, the mark, and the stash.
//!
//! All user-facing operations are methods here. Each applied transaction is
//! shown to the mark first and to the listener second, so a host always sees
//! a document whose mark is already consistent.

use std::{
  collections::BTreeMap,
  fmt,
  num::NonZeroUsize,
};

use ed_core::delimiter::Mode;

use crate::{
  config::EngineConfig,
  document::{
    Document,
    DocumentId,
  },
  error::{
    EditError,
    Result,
  },
  events::{
    ChangeEvent,
    CloseEvent,
    NoListener,
    SessionListener,
  },
  line::LineId,
  mark::{
    Mark,
    MarkShape,
  },
  stash::Stash,
  transaction::Transaction,
};

/// Which view holds the cursor.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ViewKind {
  /// The document text.
  #[default]
  Data,
  /// The command line.
  Command,
}

pub struct Session {
  config:    EngineConfig,
  documents: BTreeMap<DocumentId, Document>,
  next_id:   NonZeroUsize,
  mark:      Mark,
  stash:     Stash,
  focus:     ViewKind,
  listener:  Box<dyn SessionListener>,
}

impl fmt::Debug for Session {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("Session")
      .field("config", &self.config)
      .field("documents", &self.documents.len())
      .field("mark", &self.mark)
      .field("stash", &self.stash)
      .field("focus", &self.focus)
      .finish_non_exhaustive()
  }
}

impl Default for Session {
  fn default() -> Self {
    Self::new(EngineConfig::default())
  }
}

impl Session {
  pub fn new(config: EngineConfig) -> Self {
    Self {
      config,
      documents: BTreeMap::new(),
      next_id: NonZeroUsize::MIN,
      mark: Mark::new(),
      stash: Stash::new(),
      focus: ViewKind::default(),
      listener: Box::new(NoListener),
    }
  }

  pub fn config(&self) -> &EngineConfig {
    &self.config
  }

  pub fn set_listener(&mut self, listener: impl SessionListener + 'static) {
    self.listener = Box::new(listener);
  }

  /// Load `text` as a new document.
  pub fn open(&mut self, text: &str) -> DocumentId {
    let id = DocumentId::new(self.next_id);
    self.next_id = self.next_id.saturating_add(1);
    self
      .documents
      .insert(id, Document::new(id, text, &self.config));
    id
  }

  /// Close a document. The mark and stash let go of it before the listener
  /// hears about it.
  pub fn close(&mut self, id: DocumentId) -> Result<()> {
    self
      .documents
      .remove(&id)
      .ok_or(EditError::UnknownDocument)?;
    self.mark.forget(id);
    self.stash.forget(id);
    tracing::debug!(document = ?id, "session: closed");
    self.listener.on_close(&CloseEvent { document: id });
    Ok(())
  }

  pub fn document(&self, id: DocumentId) -> Result<&Document> {
    self.documents.get(&id).ok_or(EditError::UnknownDocument)
  }

  pub fn documents(&self) -> impl Iterator<Item = &Document> + '_ {
    self.documents.values()
  }

  fn document_mut(&mut self, id: DocumentId) -> Result<&mut Document> {
    self
      .documents
      .get_mut(&id)
      .ok_or(EditError::UnknownDocument)
  }

  pub fn mark(&self) -> &Mark {
    &self.mark
  }

  pub fn stash(&self) -> &Stash {
    &self.stash
  }

  pub fn focus(&self) -> ViewKind {
    self.focus
  }

  pub fn set_focus(&mut self, focus: ViewKind) {
    self.focus = focus;
  }

  pub fn set_protected(&mut self, id: DocumentId, protected: bool) -> Result<()> {
    self.document_mut(id)?.set_protected(protected);
    Ok(())
  }

  pub fn protect_line(&mut self, id: DocumentId, line: LineId, protected: bool) -> Result<()> {
    self.document_mut(id)?.protect_line(line, protected)
  }

  pub fn set_cursor(&mut self, id: DocumentId, line: LineId, column: usize) -> Result<()> {
    self.document_mut(id)?.set_cursor(line, column)
  }

  /// Show an applied transaction to the mark, then to the listener.
  fn observe(&mut self, id: DocumentId, transaction: Transaction, undo: bool) {
    let Some(doc) = self.documents.get_mut(&id) else {
      return;
    };
    self.mark.handle_transaction(doc, &transaction, undo);
    self
      .listener
      .on_change(doc, &ChangeEvent::new(id, transaction, undo));
  }

  /// Tell the listener about a transaction the mark already handled.
  fn announce(&mut self, id: DocumentId, transaction: Transaction) {
    if let Some(doc) = self.documents.get(&id) {
      self
        .listener
        .on_change(doc, &ChangeEvent::new(id, transaction, false));
    }
  }

  fn edit<F>(&mut self, id: DocumentId, f: F) -> Result<Transaction>
  where
    F: FnOnce(&mut Document) -> Result<Transaction>,
  {
    let transaction = f(self.document_mut(id)?)?;
    self.observe(id, transaction, false);
    Ok(transaction)
  }

  pub fn commit_line(&mut self, id: DocumentId, line: LineId, text: &str) -> Result<Transaction> {
    self.edit(id, |doc| doc.commit_line(line, text))
  }

  pub fn insert_line(&mut self, id: DocumentId, after: LineId, text: &str) -> Result<Transaction> {
    self.edit(id, |doc| doc.insert_line(after, text))
  }

  pub fn insert_lines<I, S>(&mut self, id: DocumentId, after: LineId, texts: I) -> Result<Transaction>
  where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
  {
    self.edit(id, |doc| doc.insert_lines(after, texts))
  }

  pub fn split_line(&mut self, id: DocumentId, line: LineId, column: usize) -> Result<Transaction> {
    self.edit(id, |doc| doc.split_line(line, column))
  }

  pub fn join_lines(&mut self, id: DocumentId, line: LineId) -> Result<Transaction> {
    self.edit(id, |doc| doc.join_lines(line))
  }

  pub fn remove_lines(&mut self, id: DocumentId, head: LineId, tail: LineId) -> Result<Transaction> {
    self.edit(id, |doc| doc.remove_lines(head, tail))
  }

  pub fn set_mode(&mut self, id: DocumentId, mode: Mode) -> Result<Option<Transaction>> {
    let transaction = self.document_mut(id)?.set_mode(mode)?;
    if let Some(transaction) = transaction {
      self.observe(id, transaction, false);
    }
    Ok(transaction)
  }

  /// Undo the latest edit of a document. `false` when there was none.
  pub fn undo(&mut self, id: DocumentId) -> Result<bool> {
    let Some(transaction) = self.document_mut(id)?.undo()? else {
      return Ok(false);
    };
    self.observe(id, transaction, true);
    Ok(true)
  }

  pub fn redo(&mut self, id: DocumentId) -> Result<bool> {
    let Some(transaction) = self.document_mut(id)?.redo()? else {
      return Ok(false);
    };
    self.observe(id, transaction, false);
    Ok(true)
  }

  pub fn reset_history(&mut self, id: DocumentId) -> Result<()> {
    self.document_mut(id)?.reset_history();
    Ok(())
  }

  pub fn mark_saved(&mut self, id: DocumentId) -> Result<()> {
    self.document_mut(id)?.mark_saved();
    Ok(())
  }

  fn data_view(&self) -> Result<()> {
    match self.focus {
      ViewKind::Data => Ok(()),
      ViewKind::Command => Err(EditError::WrongView),
    }
  }

  /// Touch `line` of a document; see [`Mark::touch`].
  pub fn mark_line(&mut self, id: DocumentId, line: LineId, column: Option<usize>) -> Result<()> {
    let doc = self
      .documents
      .get_mut(&id)
      .ok_or(EditError::UnknownDocument)?;
    self.mark.touch(doc, line, column)
  }

  pub fn unmark(&mut self) {
    let Some(file) = self.mark.file() else {
      return;
    };
    if let Some(doc) = self.documents.get_mut(&file) {
      self.mark.unmark(doc);
    }
  }

  pub fn copy(&mut self) -> Result<()> {
    self.data_view()?;
    let file = self.mark.file().ok_or(EditError::NoMark)?;
    let doc = self.documents.get(&file).ok_or(EditError::UnknownDocument)?;
    self.mark.copy(doc, &mut self.stash)
  }

  pub fn cut(&mut self) -> Result<Transaction> {
    self.data_view()?;
    let file = self.mark.file().ok_or(EditError::NoMark)?;
    let doc = self
      .documents
      .get_mut(&file)
      .ok_or(EditError::UnknownDocument)?;
    let transaction = self.mark.cut(doc, &mut self.stash)?;
    self.announce(file, transaction);
    Ok(transaction)
  }

  pub fn delete(&mut self) -> Result<Transaction> {
    self.data_view()?;
    let file = self.mark.file().ok_or(EditError::NoMark)?;
    let doc = self
      .documents
      .get_mut(&file)
      .ok_or(EditError::UnknownDocument)?;
    let transaction = self.mark.delete(doc)?;
    self.announce(file, transaction);
    Ok(transaction)
  }

  /// Paste the stash into a document. The pasted text becomes the mark, so
  /// a mark in another document is dropped once the paste is known to fit.
  pub fn paste(&mut self, id: DocumentId, dest: LineId, column: Option<usize>) -> Result<Transaction> {
    self.data_view()?;
    self
      .mark
      .verify_paste(self.document(id)?, &self.stash, dest)?;
    if self.mark.file().is_some_and(|file| file != id) {
      self.unmark();
    }

    let doc = self
      .documents
      .get_mut(&id)
      .ok_or(EditError::UnknownDocument)?;
    let transaction = self.mark.paste(doc, &self.stash, dest, column)?;
    self.announce(id, transaction);
    Ok(transaction)
  }

  pub fn format(&self) -> Result<()> {
    self.mark.format()
  }

  pub fn verify_copy(&self, id: DocumentId, dest: LineId) -> Result<()> {
    self.mark.verify_copy(self.document(id)?, dest)
  }

  pub fn verify_move(&self, id: DocumentId, dest: LineId, column: Option<usize>) -> Result<Option<usize>> {
    self.mark.verify_move(self.document(id)?, dest, column)
  }

  /// Copy the marked text and paste it at `dest`.
  pub fn copy_mark(&mut self, id: DocumentId, dest: LineId, column: Option<usize>) -> Result<Transaction> {
    self.data_view()?;
    self.verify_copy(id, dest)?;
    self.copy()?;
    self.paste(id, dest, column)
  }

  /// Cut the marked text and paste it at `dest`.
  ///
  /// A block moved along its own rows replaces the destination lines during
  /// the cut, so the destination is found again by row afterwards.
  pub fn move_mark(&mut self, id: DocumentId, dest: LineId, column: Option<usize>) -> Result<Transaction> {
    self.data_view()?;
    let column = self.verify_move(id, dest, column)?;
    let same_rows = self.mark.file() == Some(id)
      && self.mark.shape().is_some_and(MarkShape::is_block);
    let dest_row = self.document(id)?.get_row(dest);

    self.cut()?;
    let dest = match dest_row.filter(|_| same_rows) {
      Some(row) => {
        self
          .document(id)?
          .get_line(row)
          .ok_or(EditError::UnknownLine)?
      },
      None => dest,
    };
    self.paste(id, dest, column)
  }
}
