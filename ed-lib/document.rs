//! Documents: the line list, its history, and the edit protocol.
//!
//! Every structural edit follows the same steps: capture the old run, remove
//! it, build the new run, insert it at the same anchor, and record one
//! [`Transaction`] describing both. Validation happens before the first
//! mutation, so a failed edit leaves the document untouched.
//!
//! Undo applies the inverse of the top undo entry; redo re-applies the top
//! redo entry. Both are the same list surgery as the original edit.

use std::num::NonZeroUsize;

use ed_core::{
  arena::Arena,
  column,
  delimiter::{
    Delimiter,
    Mode,
  },
  loader,
};

use crate::{
  Tendril,
  config::EngineConfig,
  error::{
    EditError,
    Result,
  },
  history::History,
  line::{
    LineFlags,
    LineId,
    LineList,
  },
  transaction::{
    Columns,
    Span,
    Transaction,
    TransactionError,
  },
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DocumentId(NonZeroUsize);

impl DocumentId {
  pub const fn new(id: NonZeroUsize) -> Self {
    Self(id)
  }

  pub const fn get(self) -> NonZeroUsize {
    self.0
  }
}

impl From<NonZeroUsize> for DocumentId {
  fn from(value: NonZeroUsize) -> Self {
    Self::new(value)
  }
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct DocumentFlags {
  /// Edited since load or the last save.
  pub changed:   bool,
  /// An internal invariant broke. Sticky: edits and undo are refused.
  pub damaged:   bool,
  /// Read-only.
  pub protected: bool,
}

/// Where the host's view of the document sits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Cursor {
  /// First line on screen.
  pub top:    LineId,
  pub line:   LineId,
  pub column: usize,
}

/// A line an edit is about to create.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct NewLine {
  pub(crate) text:      Tendril,
  pub(crate) delimiter: Delimiter,
  pub(crate) flags:     LineFlags,
}

impl NewLine {
  pub(crate) fn new(text: impl Into<Tendril>, delimiter: Delimiter) -> Self {
    Self {
      text: text.into(),
      delimiter,
      flags: LineFlags::empty(),
    }
  }

  pub(crate) fn with_flags(mut self, flags: LineFlags) -> Self {
    self.flags = flags;
    self
  }
}

/// What an edit takes out of the list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Removal {
  Nothing,
  Run(Span),
  /// Fold a cut taken from right after the anchor into this edit, if it is
  /// the latest undo entry.
  FoldCut,
}

#[derive(Debug)]
pub struct Document {
  id:                DocumentId,
  lines:             LineList,
  history:           History,
  mode:              Mode,
  default_delimiter: Delimiter,
  flags:             DocumentFlags,
  cursor:            Cursor,
}

impl Document {
  pub fn new(id: DocumentId, text: &str, config: &EngineConfig) -> Self {
    let loaded = loader::split_lines(text);
    let mut lines = LineList::with_arena(Arena::with_block_size(config.arena_block_size));

    let ids: Vec<_> = loaded
      .lines
      .iter()
      .map(|&(text, delimiter)| lines.create(text, delimiter, LineFlags::empty()))
      .collect();
    if let Some(span) = lines.chain(&ids) {
      let head = lines.head();
      lines.insert(head, span.head, span.tail);
    }

    let top = lines.head();
    let first = lines.next(top).unwrap_or(top);
    tracing::debug!(
      document = ?id,
      rows = lines.rows(),
      mode = ?loaded.mode,
      "document: loaded"
    );

    Self {
      id,
      lines,
      history: History::new(config.history_limit),
      mode: loaded.mode,
      default_delimiter: config.default_delimiter(),
      flags: DocumentFlags::default(),
      cursor: Cursor {
        top,
        line: first,
        column: 0,
      },
    }
  }

  pub fn id(&self) -> DocumentId {
    self.id
  }

  pub fn line_list(&self) -> &LineList {
    &self.lines
  }

  pub(crate) fn line_list_mut(&mut self) -> &mut LineList {
    &mut self.lines
  }

  pub fn history(&self) -> &History {
    &self.history
  }

  pub fn mode(&self) -> Mode {
    self.mode
  }

  pub fn flags(&self) -> DocumentFlags {
    self.flags
  }

  pub fn is_changed(&self) -> bool {
    self.flags.changed
  }

  pub fn is_damaged(&self) -> bool {
    self.flags.damaged
  }

  pub fn set_protected(&mut self, protected: bool) {
    self.flags.protected = protected;
  }

  pub fn cursor(&self) -> Cursor {
    self.cursor
  }

  pub fn set_cursor(&mut self, line: LineId, column: usize) -> Result<()> {
    if !self.lines.contains(line) {
      return Err(EditError::UnknownLine);
    }
    self.cursor.line = line;
    self.cursor.column = column;
    Ok(())
  }

  pub fn set_top(&mut self, line: LineId) -> Result<()> {
    if !self.lines.contains(line) {
      return Err(EditError::UnknownLine);
    }
    self.cursor.top = line;
    Ok(())
  }

  /// The line at `row`; row 0 is the top-of-file sentinel.
  pub fn get_line(&self, row: usize) -> Option<LineId> {
    self.lines.get_line(row)
  }

  pub fn get_row(&self, line: LineId) -> Option<usize> {
    self.lines.get_row(line)
  }

  pub fn line_text(&self, line: LineId) -> Option<&str> {
    self.lines.text(line)
  }

  /// Content line texts, without delimiters.
  pub fn lines(&self) -> impl Iterator<Item = &str> + '_ {
    self
      .lines
      .content()
      .map(|id| self.lines.text(id).unwrap_or_default())
  }

  /// The content serialized with each line's own delimiter.
  pub fn text(&self) -> String {
    let mut text = String::new();
    for id in self.lines.content() {
      if let Some(line) = self.lines.get(id) {
        text.push_str(self.lines.text(id).unwrap_or_default());
        text.push_str(&line.delimiter().as_str());
      }
    }
    text
  }

  /// Delimiter given to lines created by edits.
  pub fn new_delimiter(&self) -> Delimiter {
    self.mode.delimiter().unwrap_or(self.default_delimiter)
  }

  /// Protect or release a content line.
  pub fn protect_line(&mut self, line: LineId, protected: bool) -> Result<()> {
    if !self.lines.is_content(line) {
      return Err(EditError::UnknownLine);
    }
    self.lines.set_flags(line, LineFlags::PROTECTED, protected);
    Ok(())
  }

  pub(crate) fn writable(&self) -> Result<()> {
    if self.flags.damaged {
      return Err(EditError::Damaged);
    }
    if self.flags.protected {
      return Err(EditError::ReadOnly);
    }
    Ok(())
  }

  /// Flag the document as damaged and return the error to report.
  pub(crate) fn damage(&mut self, reason: &'static str) -> EditError {
    if !self.flags.damaged {
      tracing::error!(document = ?self.id, reason, "document: damaged");
    }
    self.flags.damaged = true;
    EditError::Damaged
  }

  /// Check that `line` is an editable content line and return its delimiter.
  fn editable(&self, line: LineId) -> Result<Delimiter> {
    let Some(data) = self.lines.get(line).filter(|data| data.is_attached()) else {
      return Err(EditError::UnknownLine);
    };
    if data.is_protected() {
      return Err(EditError::Protected);
    }
    Ok(data.delimiter())
  }

  /// Replace one line's text. The delimiter is kept.
  pub fn commit_line(&mut self, line: LineId, text: &str) -> Result<Transaction> {
    self.writable()?;
    let delimiter = self.editable(line)?;
    let anchor = self.lines.prev(line).ok_or(EditError::UnknownLine)?;
    self.edit(
      anchor,
      Removal::Run(Span::single(line)),
      vec![NewLine::new(text, delimiter)],
      None,
    )
  }

  /// Insert one line after `after`. An empty `text` inserts a blank line.
  pub fn insert_line(&mut self, after: LineId, text: &str) -> Result<Transaction> {
    self.insert_lines(after, [text])
  }

  pub fn insert_lines<I, S>(&mut self, after: LineId, texts: I) -> Result<Transaction>
  where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
  {
    let delimiter = self.new_delimiter();
    let lines = texts
      .into_iter()
      .map(|text| NewLine::new(text.as_ref(), delimiter))
      .collect();
    self.edit(after, Removal::Nothing, lines, None)
  }

  /// Split `line` in two at grapheme `column`.
  pub fn split_line(&mut self, line: LineId, column: usize) -> Result<Transaction> {
    self.writable()?;
    let delimiter = self.editable(line)?;
    let text = self.lines.text(line).unwrap_or_default();
    let (left, right) = text.split_at(column::to_byte(text, column));
    let lines = vec![
      NewLine::new(left, self.new_delimiter()),
      NewLine::new(right, delimiter),
    ];
    let anchor = self.lines.prev(line).ok_or(EditError::UnknownLine)?;
    self.edit(anchor, Removal::Run(Span::single(line)), lines, None)
  }

  /// Join `line` with the line after it.
  pub fn join_lines(&mut self, line: LineId) -> Result<Transaction> {
    self.writable()?;
    self.editable(line)?;
    let next = self.lines.next(line).ok_or(EditError::UnknownLine)?;
    if next == self.lines.tail() {
      return Err(EditError::EndOfFile);
    }
    let delimiter = self.editable(next)?;

    let mut text = Tendril::from(self.lines.text(line).unwrap_or_default());
    text.push_str(self.lines.text(next).unwrap_or_default());
    let anchor = self.lines.prev(line).ok_or(EditError::UnknownLine)?;
    self.edit(
      anchor,
      Removal::Run(Span::new(line, next)),
      vec![NewLine::new(text, delimiter)],
      None,
    )
  }

  /// Delete the run `head..=tail`.
  pub fn remove_lines(&mut self, head: LineId, tail: LineId) -> Result<Transaction> {
    self.writable()?;
    let anchor = self.lines.prev(head).ok_or(EditError::UnknownLine)?;
    self.edit(anchor, Removal::Run(Span::new(head, tail)), Vec::new(), None)
  }

  /// Rewrite every newline delimiter for `mode`, as one transaction.
  ///
  /// Only DOS and UNIX are targets. NUL delimiters and a missing final
  /// newline are kept as they are.
  pub fn set_mode(&mut self, mode: Mode) -> Result<Option<Transaction>> {
    let delimiter = match mode {
      Mode::Dos => Delimiter::DOS,
      Mode::Unix => Delimiter::UNIX,
      _ => return Err(EditError::NotImplemented),
    };
    self.writable()?;

    let (Some(first), Some(last)) = (self.lines.content().next(), self.lines.content().last())
    else {
      self.mode = mode;
      return Ok(None);
    };

    let lines = self
      .lines
      .content()
      .filter_map(|id| {
        let line = self.lines.get(id)?;
        let kept = if line.delimiter().is_newline() {
          delimiter
        } else {
          line.delimiter()
        };
        Some(NewLine::new(self.lines.text(id)?, kept))
      })
      .collect();
    let head = self.lines.head();
    let transaction = self.edit(head, Removal::Run(Span::new(first, last)), lines, None)?;
    self.detect_mode();
    Ok(Some(transaction))
  }

  pub(crate) fn edit(
    &mut self,
    anchor: LineId,
    removal: Removal,
    insert: Vec<NewLine>,
    columns: Option<Columns>,
  ) -> Result<Transaction> {
    self.writable()?;
    if !self.lines.contains(anchor) {
      return Err(EditError::UnknownLine);
    }
    if anchor == self.lines.tail() {
      return Err(EditError::EndOfFile);
    }

    let mut anchor = anchor;
    let mut insert = insert;
    let mut remove = None;
    let mut fold = removal == Removal::FoldCut;

    match removal {
      Removal::Run(span) => {
        let run = self
          .lines
          .run(span.head, span.tail)
          .ok_or(EditError::UnknownLine)?;
        for &id in &run {
          if !self.lines.contains(id) {
            return Err(EditError::UnknownLine);
          }
          if self.lines.flags(id).contains(LineFlags::PROTECTED) {
            return Err(EditError::Protected);
          }
        }
        if self.lines.prev(span.head) != Some(anchor) {
          return Err(EditError::UnknownLine);
        }
        remove = Some(span);
      },
      Removal::Nothing | Removal::FoldCut => {
        // Content may not follow a line without a delimiter: swap that line
        // for a delimited duplicate in the same transaction.
        let unterminated = self
          .lines
          .get(anchor)
          .is_some_and(|line| line.delimiter().is_none());
        if !insert.is_empty() && unterminated {
          let flags = self.lines.flags(anchor);
          if flags.contains(LineFlags::PROTECTED) {
            return Err(EditError::Protected);
          }
          let text = self.lines.text(anchor).unwrap_or_default();
          let duplicate = NewLine::new(text, self.new_delimiter())
            .with_flags((flags - LineFlags::MARKED) | LineFlags::SYNTHETIC);
          insert.insert(0, duplicate);
          remove = Some(Span::single(anchor));
          anchor = self.lines.prev(anchor).ok_or(EditError::UnknownLine)?;
          fold = false;
        }
      },
    }

    if insert.is_empty() && remove.is_none() {
      return Err(TransactionError::Empty.into());
    }

    // Only now that nothing can fail is the cut taken off the undo stack.
    let folded = if fold { self.take_cut(anchor) } else { None };

    let ids: Vec<_> = insert
      .iter()
      .map(|line| self.lines.create(&line.text, line.delimiter, line.flags))
      .collect();
    let inserted = self.lines.chain(&ids);

    let mut transaction = Transaction::new(remove.or(folded), inserted)?;
    if let Some(columns) = columns {
      transaction = transaction.with_columns(columns);
    }

    if let Some(span) = remove
      && self.lines.remove(span.head, span.tail).is_none()
    {
      return Err(self.damage("edit: remove failed"));
    }
    if let Some(span) = inserted
      && self.lines.insert(anchor, span.head, span.tail).is_none()
    {
      return Err(self.damage("edit: insert failed"));
    }

    for span in self.history.commit(transaction) {
      self.lines.free_run(span.head, span.tail);
    }
    self.repair_cursor(&transaction);
    self.flags.changed = true;
    self.trace("edit", &transaction);
    Ok(transaction)
  }

  /// Pop the latest undo entry if it is a cut taken from right after
  /// `anchor`, leaving its lines detached for the caller to fold in.
  fn take_cut(&mut self, anchor: LineId) -> Option<Span> {
    let top = self.history.undo().filter(Transaction::is_cut)?;
    let span = top.remove()?;
    let terminated = self
      .lines
      .get(anchor)
      .is_some_and(|line| !line.delimiter().is_none());
    if self.lines.prev(span.head) != Some(anchor) || !terminated {
      return None;
    }
    self.history.pop_undo();
    tracing::debug!(document = ?self.id, "document: folding cut into paste");
    Some(span)
  }

  /// Revert the latest transaction. Returns it in its forward orientation,
  /// or `None` when there is nothing to undo.
  pub fn undo(&mut self) -> Result<Option<Transaction>> {
    self.writable()?;
    let Some(transaction) = self.history.undo() else {
      return Ok(None);
    };

    let inverse = transaction.invert();
    self.apply(&inverse)?;
    self.history.apply_undo();
    self.after_history_step(&inverse);
    if self.history.at_origin() {
      self.flags.changed = false;
    }
    self.trace("undo", &inverse);
    Ok(Some(transaction))
  }

  /// Re-apply the latest undone transaction.
  pub fn redo(&mut self) -> Result<Option<Transaction>> {
    self.writable()?;
    let Some(transaction) = self.history.redo() else {
      return Ok(None);
    };

    self.apply(&transaction)?;
    self.history.apply_redo();
    self.after_history_step(&transaction);
    self.flags.changed = true;
    self.trace("redo", &transaction);
    Ok(Some(transaction))
  }

  /// Forget all history. The current state cannot be undone past.
  pub fn reset_history(&mut self) {
    for span in self.history.reset() {
      self.lines.free_run(span.head, span.tail);
    }
  }

  /// Record a save: history is reset and the document is clean.
  pub fn mark_saved(&mut self) {
    self.reset_history();
    self.flags.changed = false;
  }

  fn apply(&mut self, transaction: &Transaction) -> Result<()> {
    let anchor = match (transaction.remove(), transaction.insert()) {
      (Some(span), _) | (None, Some(span)) => self.lines.prev(span.head),
      (None, None) => None,
    };
    let Some(anchor) = anchor else {
      return Err(self.damage("history: transaction has no anchor"));
    };

    if let Some(span) = transaction.remove()
      && self.lines.remove(span.head, span.tail).is_none()
    {
      return Err(self.damage("history: remove failed"));
    }
    if let Some(span) = transaction.insert()
      && self.lines.insert(anchor, span.head, span.tail).is_none()
    {
      return Err(self.damage("history: insert failed"));
    }
    Ok(())
  }

  fn after_history_step(&mut self, applied: &Transaction) {
    self.repair_cursor(applied);

    let Some(span) = applied.insert() else {
      return;
    };
    let head = self.lines.head();
    let tail = self.lines.tail();
    if self.lines.prev(span.head) == Some(head) && self.lines.next(span.tail) == Some(tail) {
      self.detect_mode();
    }
  }

  fn detect_mode(&mut self) {
    let delimiters = self
      .lines
      .content()
      .filter_map(|id| self.lines.get(id).map(|line| line.delimiter()));
    self.mode = Mode::detect(delimiters);
  }

  /// Move a line pointer that `applied` took out of the list.
  ///
  /// A line inside the removed run maps to the line at the same offset in
  /// the inserted run, clamped to its end. Without an inserted run the
  /// pointer walks back to the nearest surviving line.
  pub(crate) fn relocate(&self, line: LineId, applied: &Transaction) -> LineId {
    if self.lines.contains(line) {
      return line;
    }

    if let (Some(removed), Some(inserted)) = (applied.remove(), applied.insert())
      && let Some(offset) = self
        .lines
        .run(removed.head, removed.tail)
        .and_then(|run| run.iter().position(|&id| id == line))
      && let Some(run) = self.lines.run(inserted.head, inserted.tail)
      && let Some(&target) = run.get(offset.min(run.len() - 1))
    {
      return target;
    }

    self.lines.nearest_live(line)
  }

  fn repair_cursor(&mut self, applied: &Transaction) {
    self.cursor.top = self.relocate(self.cursor.top, applied);
    self.cursor.line = self.relocate(self.cursor.line, applied);
  }

  fn trace(&self, action: &'static str, transaction: &Transaction) {
    let count = |span: Option<Span>| span.map_or(0, |span| self.lines.count_run(span.head, span.tail));
    tracing::trace!(
      document = ?self.id,
      action,
      removed = count(transaction.remove()),
      inserted = count(transaction.insert()),
      columns = ?transaction.columns(),
      "document: applied transaction"
    );
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn doc(text: &str) -> Document {
    Document::new(DocumentId::new(NonZeroUsize::MIN), text, &EngineConfig::default())
  }

  fn contents(doc: &Document) -> Vec<&str> {
    doc.lines().collect()
  }

  fn line(doc: &Document, row: usize) -> LineId {
    doc.get_line(row).unwrap()
  }

  #[test]
  fn load_detects_mode_and_rows() {
    let doc = doc("one\r\ntwo\r\n");
    assert_eq!(doc.mode(), Mode::Dos);
    assert_eq!(doc.line_list().rows(), 2);
    assert_eq!(contents(&doc), vec!["one", "two"]);
    assert_eq!(doc.text(), "one\r\ntwo\r\n");
    assert!(!doc.is_changed());
  }

  #[test]
  fn commit_line_and_undo() {
    let mut doc = doc("a\nb\nc\n");
    let b = line(&doc, 2);
    doc.commit_line(b, "B").unwrap();
    assert_eq!(contents(&doc), vec!["a", "B", "c"]);
    assert!(doc.is_changed());

    doc.undo().unwrap();
    assert_eq!(contents(&doc), vec!["a", "b", "c"]);
    assert!(!doc.is_changed());
    // The original line itself is back.
    assert_eq!(line(&doc, 2), b);
  }

  #[test]
  fn redo_after_undo_restores_edit() {
    let mut doc = doc("a\nb\n");
    let a = line(&doc, 1);
    doc.insert_line(a, "x").unwrap();
    let after = doc.text();

    doc.undo().unwrap();
    doc.redo().unwrap();
    assert_eq!(doc.text(), after);
    assert!(doc.is_changed());
  }

  #[test]
  fn undo_on_empty_history_is_a_no_op() {
    let mut doc = doc("a\n");
    assert_eq!(doc.undo(), Ok(None));
    assert_eq!(doc.redo(), Ok(None));
  }

  #[test]
  fn new_edit_after_undo_discards_redo() {
    let mut doc = doc("a\nb\n");
    let a = line(&doc, 1);
    doc.commit_line(a, "first").unwrap();
    doc.undo().unwrap();
    assert_eq!(doc.history().redo_len(), 1);

    let a = line(&doc, 1);
    doc.commit_line(a, "second").unwrap();
    assert_eq!(doc.history().redo_len(), 0);
    assert_eq!(doc.redo(), Ok(None));
    assert_eq!(contents(&doc), vec!["second", "b"]);
  }

  #[test]
  fn split_and_join() {
    let mut doc = doc("hello world\n");
    let hello = line(&doc, 1);
    doc.split_line(hello, 5).unwrap();
    assert_eq!(contents(&doc), vec!["hello", " world"]);

    let left = line(&doc, 1);
    doc.join_lines(left).unwrap();
    assert_eq!(contents(&doc), vec!["hello world"]);
    assert_eq!(doc.history().undo_len(), 2);
  }

  #[test]
  fn join_needs_a_next_line() {
    let mut doc = doc("only\n");
    let only = line(&doc, 1);
    assert_eq!(doc.join_lines(only), Err(EditError::EndOfFile));
  }

  #[test]
  fn insert_after_unterminated_line_is_one_transaction() {
    let mut doc = doc("a\nb");
    let b = line(&doc, 2);
    doc.insert_line(b, "c").unwrap();

    assert_eq!(doc.text(), "a\nb\nc\n");
    assert_eq!(doc.history().undo_len(), 1);

    doc.undo().unwrap();
    assert_eq!(doc.text(), "a\nb");
    assert_eq!(line(&doc, 2), b);
  }

  #[test]
  fn nothing_goes_after_end_of_file() {
    let mut doc = doc("a\n");
    let tail = doc.line_list().tail();
    assert_eq!(doc.insert_line(tail, "x"), Err(EditError::EndOfFile));
  }

  #[test]
  fn protected_line_rejects_edits() {
    let mut doc = doc("a\nb\n");
    let b = line(&doc, 2);
    doc.protect_line(b, true).unwrap();

    assert_eq!(doc.commit_line(b, "x"), Err(EditError::Protected));
    assert_eq!(doc.remove_lines(b, b), Err(EditError::Protected));
    assert_eq!(doc.split_line(b, 0), Err(EditError::Protected));
    assert_eq!(contents(&doc), vec!["a", "b"]);
    assert_eq!(doc.history().undo_len(), 0);
    assert!(!doc.is_changed());
  }

  #[test]
  fn sentinels_are_protected() {
    let mut doc = doc("a\n");
    let head = doc.line_list().head();
    assert_eq!(doc.commit_line(head, "x"), Err(EditError::Protected));
  }

  #[test]
  fn read_only_document() {
    let mut doc = doc("a\n");
    let a = line(&doc, 1);
    doc.set_protected(true);
    assert_eq!(doc.commit_line(a, "x"), Err(EditError::ReadOnly));
    assert_eq!(doc.undo(), Err(EditError::ReadOnly));
  }

  #[test]
  fn damaged_document_still_reads() {
    let mut doc = doc("a\n");
    let a = line(&doc, 1);
    let _ = doc.damage("test");
    assert_eq!(doc.commit_line(a, "x"), Err(EditError::Damaged));
    assert_eq!(doc.undo(), Err(EditError::Damaged));
    assert_eq!(doc.text(), "a\n");
  }

  #[test]
  fn cursor_leaves_removed_lines() {
    let mut doc = doc("a\nb\nc\nd\n");
    let a = line(&doc, 1);
    let b = line(&doc, 2);
    let c = line(&doc, 3);
    doc.set_cursor(c, 1).unwrap();
    doc.set_top(b).unwrap();

    doc.remove_lines(b, c).unwrap();
    assert_eq!(doc.cursor().line, a);
    assert_eq!(doc.cursor().top, a);
    assert_eq!(doc.cursor().column, 1);
  }

  #[test]
  fn cursor_follows_replaced_line() {
    let mut doc = doc("a\nb\n");
    let b = line(&doc, 2);
    doc.set_cursor(b, 0).unwrap();
    doc.commit_line(b, "B").unwrap();
    assert_eq!(doc.cursor().line, line(&doc, 2));
  }

  #[test]
  fn set_mode_rewrites_delimiters() {
    let mut doc = doc("a\nb");
    doc.set_mode(Mode::Dos).unwrap();
    assert_eq!(doc.text(), "a\r\nb");
    assert_eq!(doc.mode(), Mode::Dos);
    assert_eq!(doc.new_delimiter(), Delimiter::DOS);

    doc.undo().unwrap();
    assert_eq!(doc.text(), "a\nb");
    assert_eq!(doc.mode(), Mode::Unix);

    doc.redo().unwrap();
    assert_eq!(doc.mode(), Mode::Dos);
  }

  #[test]
  fn history_limit_bounds_undo() {
    let config = EngineConfig {
      history_limit: 2,
      ..EngineConfig::default()
    };
    let mut doc = Document::new(DocumentId::new(NonZeroUsize::MIN), "a\n", &config);
    for text in ["1", "2", "3"] {
      let first = line(&doc, 1);
      doc.commit_line(first, text).unwrap();
    }

    assert!(doc.undo().unwrap().is_some());
    assert!(doc.undo().unwrap().is_some());
    assert_eq!(doc.undo(), Ok(None));
    assert_eq!(contents(&doc), vec!["1"]);
    // The oldest edit is gone, so this is not the loaded state.
    assert!(doc.is_changed());
  }

  #[test]
  fn saving_resets_history() {
    let mut doc = doc("a\n");
    let a = line(&doc, 1);
    doc.commit_line(a, "b").unwrap();
    doc.mark_saved();

    assert!(!doc.is_changed());
    assert_eq!(doc.undo(), Ok(None));
    assert_eq!(contents(&doc), vec!["b"]);
  }

  fn random_edit(doc: &mut Document, op: u8, row: u8, column: u8) -> Result<Transaction> {
    let rows = doc.line_list().rows();
    if rows == 0 {
      let head = doc.line_list().head();
      return doc.insert_line(head, "seed");
    }
    let target = line(doc, 1 + row as usize % rows);
    match op % 5 {
      0 => doc.commit_line(target, &format!("edit {column}")),
      1 => doc.insert_line(target, "new"),
      2 => doc.split_line(target, column as usize % 4),
      3 => doc.join_lines(target),
      _ => doc.remove_lines(target, target),
    }
  }

  quickcheck::quickcheck! {
    fn undo_restores_content(edits: Vec<(u8, u8, u8)>) -> bool {
      let mut doc = doc("alpha\nbeta\ngamma\ndelta\n");
      let before = doc.text();
      let mut applied = 0;
      for (op, row, column) in edits.into_iter().take(32) {
        if random_edit(&mut doc, op, row, column).is_ok() {
          applied += 1;
        }
      }
      for _ in 0..applied {
        if doc.undo().ok().flatten().is_none() {
          return false;
        }
      }
      doc.text() == before && doc.history().undo_len() == 0 && !doc.is_changed()
    }

    fn redo_replays_undone_edits(edits: Vec<(u8, u8, u8)>, back: u8) -> bool {
      let mut doc = doc("alpha\nbeta\ngamma\n");
      for (op, row, column) in edits.into_iter().take(32) {
        let _ = random_edit(&mut doc, op, row, column);
      }
      let after = doc.text();
      let back = back as usize % (doc.history().undo_len() + 1);
      for _ in 0..back {
        let _ = doc.undo();
      }
      for _ in 0..back {
        let _ = doc.redo();
      }
      doc.text() == after
    }
  }
}
