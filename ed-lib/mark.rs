//! The mark: the current selection and the operations built on it.
//!
//! A mark covers the contiguous run `head..=tail` of one document, and every
//! line of that run carries [`LineFlags::MARKED`]. A line mark selects whole
//! lines; a block mark additionally restricts every line to the inclusive
//! column range `[lh, rh]`.
//!
//! The mark observes every transaction applied to a document through
//! [`Mark::handle_transaction`] and re-derives itself from the flags of the
//! lines around the change, so it never points at a line that left the list.
//! Lines that leave the list together with the whole mark keep their flags;
//! when undo brings them back fully marked, the mark follows them.

use ed_core::column;

use crate::{
  Tendril,
  document::{
    Document,
    DocumentId,
    NewLine,
    Removal,
  },
  error::{
    EditError,
    Result,
  },
  line::{
    LineFlags,
    LineId,
    LineList,
  },
  stash::Stash,
  transaction::{
    Columns,
    Span,
    Transaction,
  },
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum MarkShape {
  /// Whole lines.
  #[default]
  Line,
  /// The inclusive column range `[lh, rh]` of every line.
  Block { lh: usize, rh: usize },
}

impl MarkShape {
  pub fn is_block(self) -> bool {
    matches!(self, MarkShape::Block { .. })
  }

  pub fn columns(self) -> Option<Columns> {
    match self {
      MarkShape::Line => None,
      MarkShape::Block { lh, rh } => Some(Columns::new(lh, rh)),
    }
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ActiveMark {
  pub file:   DocumentId,
  pub head:   LineId,
  pub tail:   LineId,
  /// The first line touched. Contraction never moves past it.
  pub anchor: LineId,
  pub shape:  MarkShape,
  pub rows:   usize,
}

bitflags::bitflags! {
  /// Which lines around a transaction carried the mark.
  #[derive(Debug, Clone, Copy, PartialEq, Eq)]
  struct Touch: u8 {
    const BEFORE = 1 << 0;
    const HEAD   = 1 << 1;
    const TAIL   = 1 << 2;
    const AFTER  = 1 << 3;
  }
}

#[derive(Debug, Default)]
pub struct Mark {
  active: Option<ActiveMark>,
}

fn is_marked(lines: &LineList, id: LineId) -> bool {
  lines.contains(id) && lines.flags(id).contains(LineFlags::MARKED)
}

fn set_marked(lines: &mut LineList, ids: &[LineId], value: bool) {
  for &id in ids {
    lines.set_flags(id, LineFlags::MARKED, value);
  }
}

/// The lines passed walking from `from` to `to`, `to` excluded, or `None`
/// when a protected line or the end of the list is in the way.
fn walk(lines: &LineList, from: LineId, to: LineId, forward: bool) -> Option<Vec<LineId>> {
  let mut path = Vec::new();
  let mut at = from;
  loop {
    if at == to {
      return Some(path);
    }
    if lines.flags(at).contains(LineFlags::PROTECTED) || path.len() > lines.rows() {
      return None;
    }
    path.push(at);
    at = if forward {
      lines.next(at)?
    } else {
      lines.prev(at)?
    };
  }
}

fn touch_mask(lines: &LineList, applied: &Transaction) -> Touch {
  let mut touch = Touch::empty();
  let Some(span) = applied.remove().or(applied.insert()) else {
    return touch;
  };
  touch.set(
    Touch::BEFORE,
    lines.prev(span.head).is_some_and(|id| is_marked(lines, id)),
  );
  touch.set(
    Touch::AFTER,
    lines.next(span.tail).is_some_and(|id| is_marked(lines, id)),
  );
  if let Some(removed) = applied.remove() {
    touch.set(Touch::HEAD, lines.flags(removed.head).contains(LineFlags::MARKED));
    touch.set(Touch::TAIL, lines.flags(removed.tail).contains(LineFlags::MARKED));
  }
  touch
}

/// Whether the latest edit of `doc` is a cut of exactly the text `stash` holds.
fn holds_cut(doc: &Document, stash: &Stash) -> bool {
  if stash.shape() != MarkShape::Line || stash.file() != Some(doc.id()) {
    return false;
  }
  let lines = doc.line_list();
  doc
    .history()
    .undo()
    .filter(Transaction::is_cut)
    .and_then(|cut| cut.remove())
    .and_then(|span| lines.run(span.head, span.tail))
    .is_some_and(|run| {
      run.len() == stash.rows()
        && run
          .iter()
          .zip(stash.lines())
          .all(|(&id, text)| lines.text(id) == Some(text.as_str()))
    })
}

/// The `rows` lines a block paste at `dest` overwrites.
fn block_destination(lines: &LineList, dest: LineId, rows: usize) -> Result<Vec<LineId>> {
  let mut targets = Vec::with_capacity(rows);
  let mut at = dest;
  for _ in 0..rows {
    if at == lines.tail() {
      return Err(EditError::NotEnoughLines);
    }
    if lines.flags(at).contains(LineFlags::PROTECTED) {
      return Err(EditError::Protected);
    }
    targets.push(at);
    at = lines.next(at).ok_or(EditError::NotEnoughLines)?;
  }
  Ok(targets)
}

impl Mark {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn active(&self) -> Option<&ActiveMark> {
    self.active.as_ref()
  }

  pub fn file(&self) -> Option<DocumentId> {
    self.active.map(|mark| mark.file)
  }

  pub fn shape(&self) -> Option<MarkShape> {
    self.active.map(|mark| mark.shape)
  }

  pub fn is_empty(&self) -> bool {
    self.active.is_none()
  }

  fn in_document(&self, doc: &Document) -> Option<ActiveMark> {
    self.active.filter(|mark| mark.file == doc.id())
  }

  fn settle(&mut self, doc: &Document, mut mark: ActiveMark) {
    mark.rows = doc.line_list().count_run(mark.head, mark.tail);
    self.active = Some(mark);
  }

  /// Touch `line`, optionally at `column`.
  ///
  /// The first touch starts a one-line mark. Touching an unmarked line
  /// extends the mark to it; touching a marked line contracts the mark back
  /// to it, toward the anchor. Column touches widen a block mark's range.
  pub fn touch(&mut self, doc: &mut Document, line: LineId, column: Option<usize>) -> Result<()> {
    let Some(data) = doc
      .line_list()
      .get(line)
      .filter(|data| data.is_attached())
    else {
      return Err(EditError::UnknownLine);
    };
    if data.is_protected() {
      return Err(EditError::Protected);
    }
    let marked = data.is_marked();

    let Some(mut mark) = self.active else {
      let shape = column.map_or(MarkShape::Line, |column| {
        MarkShape::Block {
          lh: column,
          rh: column,
        }
      });
      doc
        .line_list_mut()
        .set_flags(line, LineFlags::MARKED, true);
      tracing::debug!(document = ?doc.id(), ?shape, "mark: started");
      self.settle(doc, ActiveMark {
        file: doc.id(),
        head: line,
        tail: line,
        anchor: line,
        shape,
        rows: 1,
      });
      return Ok(());
    };

    if mark.file != doc.id() {
      return Err(EditError::MarkElsewhere);
    }
    mark.shape = match (mark.shape, column) {
      (MarkShape::Line, None) => MarkShape::Line,
      (MarkShape::Block { lh, rh }, Some(column)) => {
        MarkShape::Block {
          lh: lh.min(column),
          rh: rh.max(column),
        }
      },
      _ => return Err(EditError::MarkShapeMismatch),
    };

    if marked {
      Self::contract(doc, &mut mark, line)?;
    } else {
      Self::extend(doc, &mut mark, line)?;
    }
    self.settle(doc, mark);
    Ok(())
  }

  fn extend(doc: &mut Document, mark: &mut ActiveMark, line: LineId) -> Result<()> {
    if let Some(path) = walk(doc.line_list(), line, mark.head, true) {
      set_marked(doc.line_list_mut(), &path, true);
      mark.head = line;
    } else if let Some(path) = walk(doc.line_list(), line, mark.tail, false) {
      set_marked(doc.line_list_mut(), &path, true);
      mark.tail = line;
    } else {
      let _ = doc.damage("mark: no unprotected path to the touched line");
      return Err(EditError::MarkInconsistent);
    }
    tracing::debug!(document = ?doc.id(), "mark: extended");
    Ok(())
  }

  fn contract(doc: &mut Document, mark: &mut ActiveMark, line: LineId) -> Result<()> {
    let lines = doc.line_list();
    let released: Vec<LineId> = if line == mark.anchor {
      let run = lines.run(mark.head, mark.tail).unwrap_or_default();
      mark.head = line;
      mark.tail = line;
      run.into_iter().filter(|&id| id != line).collect()
    } else {
      let lower = lines.run(mark.anchor, mark.tail).unwrap_or_default();
      let upper = lines.run(mark.head, mark.anchor).unwrap_or_default();
      if let Some(at) = lower.iter().position(|&id| id == line) {
        mark.tail = line;
        lower[at + 1..].to_vec()
      } else if let Some(at) = upper.iter().position(|&id| id == line) {
        mark.head = line;
        upper[..at].to_vec()
      } else {
        let _ = doc.damage("mark: marked line outside the mark");
        return Err(EditError::MarkInconsistent);
      }
    };
    set_marked(doc.line_list_mut(), &released, false);
    tracing::debug!(document = ?doc.id(), released = released.len(), "mark: contracted");
    Ok(())
  }

  /// Drop the mark and clear its lines' flags.
  pub fn unmark(&mut self, doc: &mut Document) {
    let Some(mark) = self.in_document(doc) else {
      return;
    };
    let run = doc
      .line_list()
      .run(mark.head, mark.tail)
      .unwrap_or_default();
    set_marked(doc.line_list_mut(), &run, false);
    self.active = None;
    tracing::debug!(document = ?doc.id(), "mark: cleared");
  }

  /// Forget a mark in a closed document.
  pub(crate) fn forget(&mut self, file: DocumentId) {
    if self.file() == Some(file) {
      self.active = None;
    }
  }

  /// Duplicate the marked text into `stash`, replacing what it held.
  pub fn copy(&self, doc: &Document, stash: &mut Stash) -> Result<()> {
    let mark = self.in_document(doc).ok_or(EditError::NoMark)?;
    let run = doc
      .line_list()
      .run(mark.head, mark.tail)
      .ok_or(EditError::MarkInconsistent)?;

    let lines = run
      .iter()
      .map(|&id| {
        let text = doc.line_text(id).unwrap_or_default();
        match mark.shape {
          MarkShape::Line => Tendril::from(text),
          MarkShape::Block { lh, rh } => Tendril::from(column::slice(text, lh, rh)),
        }
      })
      .collect();
    stash.replace(doc.id(), lines, mark.shape);
    Ok(())
  }

  /// Copy, then take the marked text out of the document.
  ///
  /// A line mark is removed as a cut; a block mark has its columns excised
  /// from every line. The stash only changes when the edit succeeds.
  pub fn cut(&mut self, doc: &mut Document, stash: &mut Stash) -> Result<Transaction> {
    doc.writable()?;
    let mut copied = Stash::new();
    self.copy(doc, &mut copied)?;
    let transaction = self.remove_marked(doc, true)?;
    *stash = copied;
    Ok(transaction)
  }

  /// Remove the marked text without touching the stash.
  pub fn delete(&mut self, doc: &mut Document) -> Result<Transaction> {
    doc.writable()?;
    self.remove_marked(doc, false)
  }

  fn remove_marked(&mut self, doc: &mut Document, cut: bool) -> Result<Transaction> {
    let mark = self.in_document(doc).ok_or(EditError::NoMark)?;
    let anchor = doc
      .line_list()
      .prev(mark.head)
      .ok_or(EditError::UnknownLine)?;
    let span = Span::new(mark.head, mark.tail);

    let transaction = match mark.shape {
      MarkShape::Line => {
        doc.edit(
          anchor,
          Removal::Run(span),
          Vec::new(),
          cut.then_some(Columns::CUT),
        )?
      },
      MarkShape::Block { lh, rh } => {
        let lines = doc.line_list();
        let run = lines
          .run(mark.head, mark.tail)
          .ok_or(EditError::MarkInconsistent)?;
        let excised = run
          .iter()
          .map(|&id| {
            let delimiter = lines.get(id).map(|line| line.delimiter()).unwrap_or_default();
            let text = lines.text(id).unwrap_or_default();
            NewLine::new(column::excise(text, lh, rh), delimiter)
          })
          .collect();
        doc.edit(
          anchor,
          Removal::Run(span),
          excised,
          Some(Columns::new(lh, rh).invert()),
        )?
      },
    };

    self.handle_transaction(doc, &transaction, false);
    self.unmark(doc);
    Ok(transaction)
  }

  /// Paste the stash after `dest` (line stash) or into the lines starting
  /// at `dest` at `column` (block stash). The pasted text becomes the mark.
  pub fn paste(
    &mut self,
    doc: &mut Document,
    stash: &Stash,
    dest: LineId,
    column: Option<usize>,
  ) -> Result<Transaction> {
    self.verify_paste(doc, stash, dest)?;
    let column = column.unwrap_or(0);

    let transaction = match stash.shape() {
      MarkShape::Line => {
        let delimiter = doc.new_delimiter();
        let lines = stash
          .lines()
          .iter()
          .map(|text| NewLine::new(text.clone(), delimiter).with_flags(LineFlags::MARKED))
          .collect();
        let removal = if holds_cut(doc, stash) {
          Removal::FoldCut
        } else {
          Removal::Nothing
        };
        doc.edit(dest, removal, lines, None)?
      },
      MarkShape::Block { lh, rh } => {
        let width = rh - lh + 1;
        let targets = block_destination(doc.line_list(), dest, stash.rows())?;
        let anchor = doc.line_list().prev(dest).ok_or(EditError::UnknownLine)?;
        let last = targets.last().copied().unwrap_or(dest);

        let lines = doc.line_list();
        let spliced = targets
          .iter()
          .zip(stash.lines())
          .map(|(&id, slice)| {
            let delimiter = lines.get(id).map(|line| line.delimiter()).unwrap_or_default();
            let text = lines.text(id).unwrap_or_default();
            let text = column::splice(text, column, &column::pad(slice, width));
            NewLine::new(text, delimiter).with_flags(LineFlags::MARKED)
          })
          .collect();
        doc.edit(
          anchor,
          Removal::Run(Span::new(dest, last)),
          spliced,
          Some(Columns::new(column, column + width - 1)),
        )?
      },
    };

    self.handle_transaction(doc, &transaction, false);
    if let Some(mark) = self.in_document(doc) {
      doc.set_cursor(mark.head, column)?;
    }
    Ok(transaction)
  }

  /// Check that `stash` could be pasted at `dest` in `doc`.
  pub fn verify_paste(&self, doc: &Document, stash: &Stash, dest: LineId) -> Result<()> {
    if stash.is_empty() {
      return Err(EditError::NoStash);
    }
    doc.writable()?;
    let lines = doc.line_list();
    let Some(data) = lines.get(dest).filter(|data| data.is_attached()) else {
      return Err(EditError::UnknownLine);
    };
    match stash.shape() {
      MarkShape::Line if dest == lines.tail() => Err(EditError::EndOfFile),
      // The unterminated line is replaced by a delimited duplicate.
      MarkShape::Line if data.delimiter().is_none() && data.is_protected() => {
        Err(EditError::Protected)
      },
      MarkShape::Line => Ok(()),
      MarkShape::Block { .. } => block_destination(lines, dest, stash.rows()).map(|_| ()),
    }
  }

  /// Reflow the marked lines.
  pub fn format(&self) -> Result<()> {
    Err(EditError::NotImplemented)
  }

  /// Check that the marked text could be pasted at `dest` in `doc`.
  pub fn verify_copy(&self, doc: &Document, dest: LineId) -> Result<()> {
    let mark = self.active.ok_or(EditError::NoMark)?;
    doc.writable()?;
    let lines = doc.line_list();
    if !lines.contains(dest) {
      return Err(EditError::UnknownLine);
    }
    match mark.shape {
      MarkShape::Line if dest == lines.tail() => Err(EditError::EndOfFile),
      MarkShape::Line => Ok(()),
      MarkShape::Block { .. } => block_destination(lines, dest, mark.rows).map(|_| ()),
    }
  }

  /// Check that the marked text could be moved to `dest` in `doc`, and
  /// return the destination column once the mark's own columns are gone.
  ///
  /// A block moved to the right on its own rows lands `width` columns
  /// further left than requested, since the cut closes the gap first. Right
  /// of the block, destination rows must be all or none of the marked rows.
  pub fn verify_move(
    &self,
    doc: &Document,
    dest: LineId,
    column: Option<usize>,
  ) -> Result<Option<usize>> {
    self.verify_copy(doc, dest)?;
    let Some(mark) = self.in_document(doc) else {
      return Ok(column);
    };
    let lines = doc.line_list();

    match mark.shape {
      MarkShape::Line if is_marked(lines, dest) => Err(EditError::MoveIntoMark),
      MarkShape::Line => Ok(column),
      MarkShape::Block { lh, rh } => {
        let column = column.unwrap_or(0);
        let targets = block_destination(lines, dest, mark.rows)?;
        let overlap = targets
          .iter()
          .filter(|&&id| is_marked(lines, id))
          .count();
        if overlap == 0 || column <= lh {
          Ok(Some(column))
        } else if overlap == targets.len() && column > rh {
          Ok(Some(column - (rh - lh + 1)))
        } else {
          Err(EditError::MoveIntoMark)
        }
      },
    }
  }

  /// Bring the mark in line with a transaction just applied to `doc`.
  ///
  /// `undo` says the inverse of `transaction` was applied; the handler then
  /// works on the dual transaction, so redo and undo share one algorithm.
  pub fn handle_transaction(&mut self, doc: &mut Document, transaction: &Transaction, undo: bool) {
    let applied = if undo {
      transaction.invert()
    } else {
      *transaction
    };
    let lines = doc.line_list();
    let inserted = applied
      .insert()
      .and_then(|span| lines.run(span.head, span.tail))
      .unwrap_or_default();
    let removed = applied
      .remove()
      .and_then(|span| lines.run(span.head, span.tail))
      .unwrap_or_default();

    // Inserted lines that arrive marked bring a mark with them. Synthetic
    // duplicates only count when nothing else came back.
    let mut carried: Vec<LineId> = inserted
      .iter()
      .copied()
      .filter(|&id| !lines.flags(id).contains(LineFlags::SYNTHETIC))
      .collect();
    if carried.is_empty() {
      carried.clone_from(&inserted);
    }
    let marked = carried
      .iter()
      .filter(|&&id| lines.flags(id).contains(LineFlags::MARKED))
      .count();
    let stray = inserted
      .iter()
      .any(|&id| lines.flags(id).contains(LineFlags::MARKED));
    let local = self.active.is_none_or(|mark| mark.file == doc.id());

    if marked > 0 && marked == carried.len() && local {
      self.adopt(doc, &applied, &carried, &removed);
      return;
    }
    if stray {
      if marked > 0 && marked < carried.len() {
        tracing::warn!(
          document = ?doc.id(),
          marked,
          lines = carried.len(),
          "mark: inserted lines are partially marked"
        );
      }
      set_marked(doc.line_list_mut(), &inserted, false);
    }

    let Some(mut mark) = self.in_document(doc) else {
      return;
    };
    let lines = doc.line_list();
    let touch = touch_mask(lines, &applied);
    let head_gone = !lines.contains(mark.head);
    let tail_gone = !lines.contains(mark.tail);
    let anchor_gone = !lines.contains(mark.anchor);
    tracing::trace!(document = ?doc.id(), ?touch, head_gone, tail_gone, "mark: transaction");

    if !head_gone && !tail_gone {
      if touch.contains(Touch::BEFORE | Touch::AFTER) {
        set_marked(doc.line_list_mut(), &inserted, true);
      }
      if anchor_gone {
        mark.anchor = doc.relocate(mark.anchor, &applied);
      }
      set_marked(doc.line_list_mut(), &removed, false);
      self.settle(doc, mark);
      return;
    }

    // A plain replace: ends that were replaced move to the line at the same
    // offset of the new run.
    if applied.columns().is_none() && !inserted.is_empty() {
      let head = if head_gone {
        doc.relocate(mark.head, &applied)
      } else {
        mark.head
      };
      let tail = if tail_gone {
        doc.relocate(mark.tail, &applied)
      } else {
        mark.tail
      };
      let position = |line: LineId| inserted.iter().position(|&id| id == line);
      let from = if head_gone { position(head).unwrap_or(0) } else { 0 };
      let to = if tail_gone {
        position(tail).unwrap_or(inserted.len() - 1)
      } else {
        inserted.len() - 1
      };
      if from <= to {
        set_marked(doc.line_list_mut(), &inserted[from..=to], true);
      }
      if anchor_gone {
        mark.anchor = doc.relocate(mark.anchor, &applied);
      }
      mark.head = head;
      mark.tail = tail;
      set_marked(doc.line_list_mut(), &removed, false);
      tracing::debug!(document = ?doc.id(), "mark: follows replaced lines");
      self.settle(doc, mark);
      return;
    }

    let (before, after) = applied.remove().map_or((None, None), |span| {
      (lines.prev(span.head), lines.next(span.tail))
    });
    match (head_gone, tail_gone) {
      (false, false) => {},
      (true, true) => {
        tracing::debug!(document = ?doc.id(), "mark: removed with its lines");
        self.active = None;
        return;
      },
      (true, false) => {
        match after.filter(|_| touch.contains(Touch::TAIL | Touch::AFTER)) {
          Some(after) => mark.head = after,
          None => return self.lose(doc, "mark: head removed but the next line is unmarked"),
        }
      },
      (false, true) => {
        match before.filter(|_| touch.contains(Touch::BEFORE | Touch::HEAD)) {
          Some(before) => mark.tail = before,
          None => return self.lose(doc, "mark: tail removed but the previous line is unmarked"),
        }
      },
    }
    if anchor_gone {
      mark.anchor = if head_gone { mark.head } else { mark.tail };
    }
    set_marked(doc.line_list_mut(), &removed, false);
    self.settle(doc, mark);
  }

  /// Make the freshly inserted, fully marked lines the mark.
  fn adopt(
    &mut self,
    doc: &mut Document,
    applied: &Transaction,
    carried: &[LineId],
    removed: &[LineId],
  ) {
    let (Some(&head), Some(&tail)) = (carried.first(), carried.last()) else {
      return;
    };
    let content: Vec<LineId> = doc.line_list().content().collect();
    let range = doc.line_list().run(head, tail).unwrap_or_default();
    let lines = doc.line_list_mut();
    set_marked(lines, &content, false);
    set_marked(lines, removed, false);
    set_marked(lines, &range, true);

    let shape = match applied.columns() {
      Some(columns) if applied.is_block_insert() => {
        MarkShape::Block {
          lh: columns.lh,
          rh: columns.rh,
        }
      },
      _ => MarkShape::Line,
    };
    tracing::debug!(document = ?doc.id(), ?shape, "mark: follows inserted lines");
    self.settle(doc, ActiveMark {
      file: doc.id(),
      head,
      tail,
      anchor: head,
      shape,
      rows: range.len(),
    });
  }

  /// Drop a mark that no longer matches the flags around it.
  fn lose(&mut self, doc: &mut Document, reason: &'static str) {
    tracing::warn!(document = ?doc.id(), reason, "mark: lost");
    let content: Vec<LineId> = doc.line_list().content().collect();
    set_marked(doc.line_list_mut(), &content, false);
    self.active = None;
  }
}

#[cfg(test)]
mod tests {
  use std::num::NonZeroUsize;

  use super::*;
  use crate::config::EngineConfig;

  fn doc(text: &str) -> Document {
    Document::new(DocumentId::new(NonZeroUsize::MIN), text, &EngineConfig::default())
  }

  fn row(doc: &Document, row: usize) -> LineId {
    doc.get_line(row).unwrap()
  }

  fn touch(mark: &mut Mark, doc: &mut Document, row: usize, column: Option<usize>) -> Result<()> {
    let line = doc.get_line(row).unwrap();
    mark.touch(doc, line, column)
  }

  fn marked_rows(doc: &Document) -> Vec<usize> {
    let lines = doc.line_list();
    lines
      .content()
      .enumerate()
      .filter(|&(_, id)| lines.flags(id).contains(LineFlags::MARKED))
      .map(|(index, _)| index + 1)
      .collect()
  }

  fn contents(doc: &Document) -> Vec<&str> {
    doc.lines().collect()
  }

  fn ten_lines() -> Document {
    doc("1\n2\n3\n4\n5\n6\n7\n8\n9\n10\n")
  }

  #[test]
  fn extend_then_contract() {
    let mut doc = ten_lines();
    let mut mark = Mark::new();
    touch(&mut mark, &mut doc, 2, None).unwrap();
    touch(&mut mark, &mut doc, 7, None).unwrap();
    assert_eq!(marked_rows(&doc), vec![2, 3, 4, 5, 6, 7]);

    touch(&mut mark, &mut doc, 4, None).unwrap();
    assert_eq!(marked_rows(&doc), vec![2, 3, 4]);
    let active = mark.active().unwrap();
    assert_eq!(active.anchor, row(&doc, 2));
    assert_eq!(active.tail, row(&doc, 4));
    assert_eq!(active.rows, 3);
  }

  #[test]
  fn extend_upward_and_collapse_at_anchor() {
    let mut doc = ten_lines();
    let mut mark = Mark::new();
    touch(&mut mark, &mut doc, 6, None).unwrap();
    touch(&mut mark, &mut doc, 3, None).unwrap();
    assert_eq!(marked_rows(&doc), vec![3, 4, 5, 6]);

    touch(&mut mark, &mut doc, 4, None).unwrap();
    assert_eq!(marked_rows(&doc), vec![4, 5, 6]);

    touch(&mut mark, &mut doc, 6, None).unwrap();
    assert_eq!(marked_rows(&doc), vec![6]);
  }

  #[test]
  fn block_columns_widen() {
    let mut doc = ten_lines();
    let mut mark = Mark::new();
    touch(&mut mark, &mut doc, 1, Some(7)).unwrap();
    touch(&mut mark, &mut doc, 3, Some(3)).unwrap();
    touch(&mut mark, &mut doc, 2, Some(5)).unwrap();
    assert_eq!(mark.shape(), Some(MarkShape::Block { lh: 3, rh: 7 }));
    assert_eq!(marked_rows(&doc), vec![1, 2]);
  }

  #[test]
  fn mixing_shapes_fails() {
    let mut doc = ten_lines();
    let mut mark = Mark::new();
    touch(&mut mark, &mut doc, 1, None).unwrap();
    assert_eq!(
      touch(&mut mark, &mut doc, 2, Some(1)),
      Err(EditError::MarkShapeMismatch)
    );
    assert_eq!(marked_rows(&doc), vec![1]);
  }

  #[test]
  fn protected_line_cannot_be_marked() {
    let mut doc = ten_lines();
    let third = row(&doc, 3);
    doc.protect_line(third, true).unwrap();
    let mut mark = Mark::new();

    assert_eq!(mark.touch(&mut doc, third, None), Err(EditError::Protected));
    assert!(mark.is_empty());
    let head = doc.line_list().head();
    assert_eq!(mark.touch(&mut doc, head, None), Err(EditError::Protected));
  }

  #[test]
  fn protected_line_on_every_path_damages() {
    let mut doc = ten_lines();
    let third = row(&doc, 3);
    doc.protect_line(third, true).unwrap();
    let mut mark = Mark::new();
    touch(&mut mark, &mut doc, 2, None).unwrap();

    let err = touch(&mut mark, &mut doc, 4, None).unwrap_err();
    assert_eq!(err, EditError::MarkInconsistent);
    assert!(doc.is_damaged());
    assert_eq!(marked_rows(&doc), vec![2]);
  }

  #[test]
  fn copy_and_paste_need_state() {
    let mut doc = ten_lines();
    let mut mark = Mark::new();
    let mut stash = Stash::new();
    assert_eq!(mark.copy(&doc, &mut stash), Err(EditError::NoMark));
    let first = row(&doc, 1);
    assert_eq!(
      mark.paste(&mut doc, &stash, first, None),
      Err(EditError::NoStash)
    );
    assert_eq!(mark.format(), Err(EditError::NotImplemented));
  }

  #[test]
  fn cut_and_paste_in_place_is_one_undo_step() {
    let mut doc = doc("AAA\nBBB\nCCC\n");
    let mut mark = Mark::new();
    let mut stash = Stash::new();
    let bbb = row(&doc, 2);
    let aaa = row(&doc, 1);

    mark.touch(&mut doc, bbb, None).unwrap();
    mark.cut(&mut doc, &mut stash).unwrap();
    assert_eq!(contents(&doc), vec!["AAA", "CCC"]);
    assert!(mark.is_empty());

    mark.paste(&mut doc, &stash, aaa, None).unwrap();
    assert_eq!(contents(&doc), vec!["AAA", "BBB", "CCC"]);
    assert_eq!(doc.history().undo_len(), 1);

    let pasted = row(&doc, 2);
    assert_ne!(pasted, bbb);
    assert_eq!(mark.active().map(|mark| mark.head), Some(pasted));
    assert_eq!(doc.cursor().line, pasted);

    let undone = doc.undo().unwrap().unwrap();
    mark.handle_transaction(&mut doc, &undone, true);
    assert_eq!(contents(&doc), vec!["AAA", "BBB", "CCC"]);
    assert_eq!(row(&doc, 2), bbb);
    assert_eq!(mark.active().map(|mark| mark.head), Some(bbb));
    assert_eq!(doc.history().undo_len(), 0);
  }

  #[test]
  fn cut_then_paste_back_restores_order() {
    let mut doc = ten_lines();
    let before = doc.text();
    let mut mark = Mark::new();
    let mut stash = Stash::new();
    let anchor = row(&doc, 3);

    touch(&mut mark, &mut doc, 4, None).unwrap();
    touch(&mut mark, &mut doc, 8, None).unwrap();
    mark.cut(&mut doc, &mut stash).unwrap();
    assert_eq!(doc.line_list().rows(), 5);

    mark.paste(&mut doc, &stash, anchor, None).unwrap();
    assert_eq!(doc.text(), before);
    assert_eq!(marked_rows(&doc), vec![4, 5, 6, 7, 8]);
  }

  #[test]
  fn paste_cannot_follow_end_of_file() {
    let mut doc = ten_lines();
    let mut mark = Mark::new();
    let mut stash = Stash::new();
    touch(&mut mark, &mut doc, 1, None).unwrap();
    mark.copy(&doc, &mut stash).unwrap();

    let tail = doc.line_list().tail();
    assert_eq!(
      mark.paste(&mut doc, &stash, tail, None),
      Err(EditError::EndOfFile)
    );
    assert_eq!(marked_rows(&doc), vec![1]);
  }

  #[test]
  fn block_copy_and_paste() {
    let mut doc = doc("0123456789ABCDEF\n0123456789ABCDEF\nxyz\n");
    let mut mark = Mark::new();
    let mut stash = Stash::new();
    touch(&mut mark, &mut doc, 1, Some(3)).unwrap();
    touch(&mut mark, &mut doc, 2, Some(7)).unwrap();
    mark.copy(&doc, &mut stash).unwrap();
    assert_eq!(stash.lines(), &["34567", "34567"]);
    assert_eq!(stash.shape(), MarkShape::Block { lh: 3, rh: 7 });

    let first = row(&doc, 1);
    mark.paste(&mut doc, &stash, first, Some(10)).unwrap();
    assert_eq!(contents(&doc), vec![
      "012345678934567ABCDEF",
      "012345678934567ABCDEF",
      "xyz",
    ]);
    assert_eq!(mark.shape(), Some(MarkShape::Block { lh: 10, rh: 14 }));
    assert_eq!(marked_rows(&doc), vec![1, 2]);
  }

  #[test]
  fn block_paste_pads_short_lines() {
    let mut doc = doc("abcdef\nab\nxy\nz\n");
    let mut mark = Mark::new();
    let mut stash = Stash::new();
    touch(&mut mark, &mut doc, 1, Some(1)).unwrap();
    touch(&mut mark, &mut doc, 2, Some(3)).unwrap();
    mark.copy(&doc, &mut stash).unwrap();
    assert_eq!(stash.lines(), &["bcd", "b"]);

    let third = row(&doc, 3);
    mark.paste(&mut doc, &stash, third, Some(4)).unwrap();
    assert_eq!(contents(&doc), vec!["abcdef", "ab", "xy  bcd", "z   b  "]);
  }

  #[test]
  fn block_paste_needs_enough_lines() {
    let mut doc = doc("abc\nabc\nabc\n");
    let mut mark = Mark::new();
    let mut stash = Stash::new();
    touch(&mut mark, &mut doc, 1, Some(0)).unwrap();
    touch(&mut mark, &mut doc, 2, Some(1)).unwrap();
    mark.copy(&doc, &mut stash).unwrap();

    let third = row(&doc, 3);
    assert_eq!(
      mark.paste(&mut doc, &stash, third, Some(0)),
      Err(EditError::NotEnoughLines)
    );
    assert_eq!(mark.verify_copy(&doc, third), Err(EditError::NotEnoughLines));

    let second = row(&doc, 2);
    doc.protect_line(third, true).unwrap();
    assert_eq!(mark.verify_copy(&doc, second), Err(EditError::Protected));
    assert_eq!(contents(&doc), vec!["abc", "abc", "abc"]);
    assert_eq!(doc.history().undo_len(), 0);
  }

  #[test]
  fn block_cut_and_undo() {
    let mut doc = doc("0123456789\n0123456789\n");
    let mut mark = Mark::new();
    let mut stash = Stash::new();
    touch(&mut mark, &mut doc, 1, Some(3)).unwrap();
    touch(&mut mark, &mut doc, 2, Some(7)).unwrap();

    mark.cut(&mut doc, &mut stash).unwrap();
    assert_eq!(contents(&doc), vec!["01289", "01289"]);
    assert!(mark.is_empty());
    assert!(marked_rows(&doc).is_empty());

    let undone = doc.undo().unwrap().unwrap();
    mark.handle_transaction(&mut doc, &undone, true);
    assert_eq!(contents(&doc), vec!["0123456789", "0123456789"]);
    assert_eq!(mark.shape(), Some(MarkShape::Block { lh: 3, rh: 7 }));
    assert_eq!(marked_rows(&doc), vec![1, 2]);
  }

  #[test]
  fn delete_leaves_stash_alone() {
    let mut doc = doc("a\nb\nc\n");
    let mut mark = Mark::new();
    let mut stash = Stash::new();
    touch(&mut mark, &mut doc, 1, None).unwrap();
    mark.copy(&doc, &mut stash).unwrap();
    mark.unmark(&mut doc);

    touch(&mut mark, &mut doc, 2, None).unwrap();
    let deleted = mark.delete(&mut doc).unwrap();
    assert!(!deleted.is_cut());
    assert_eq!(contents(&doc), vec!["a", "c"]);
    assert_eq!(stash.lines(), &["a"]);
  }

  #[test]
  fn read_only_cut_keeps_stash() {
    let mut doc = doc("a\nb\n");
    let mut mark = Mark::new();
    let mut stash = Stash::new();
    touch(&mut mark, &mut doc, 1, None).unwrap();
    mark.copy(&doc, &mut stash).unwrap();
    mark.unmark(&mut doc);

    touch(&mut mark, &mut doc, 2, None).unwrap();
    doc.set_protected(true);
    assert_eq!(mark.cut(&mut doc, &mut stash), Err(EditError::ReadOnly));
    assert_eq!(stash.lines(), &["a"]);
    assert_eq!(contents(&doc), vec!["a", "b"]);
  }

  #[test]
  fn edit_on_mark_tail_is_followed() {
    let mut doc = doc("a\nb\nc\nd\n");
    let mut mark = Mark::new();
    touch(&mut mark, &mut doc, 1, None).unwrap();
    touch(&mut mark, &mut doc, 3, None).unwrap();

    let c = row(&doc, 3);
    let committed = doc.commit_line(c, "C").unwrap();
    mark.handle_transaction(&mut doc, &committed, false);
    assert_eq!(mark.active().map(|mark| mark.tail), Some(row(&doc, 3)));
    assert_eq!(marked_rows(&doc), vec![1, 2, 3]);

    let undone = doc.undo().unwrap().unwrap();
    mark.handle_transaction(&mut doc, &undone, true);
    assert_eq!(mark.active().map(|mark| mark.tail), Some(c));
    assert_eq!(marked_rows(&doc), vec![1, 2, 3]);
  }

  #[test]
  fn insert_inside_mark_is_marked() {
    let mut doc = doc("a\nb\nc\n");
    let mut mark = Mark::new();
    touch(&mut mark, &mut doc, 1, None).unwrap();
    touch(&mut mark, &mut doc, 2, None).unwrap();

    let a = row(&doc, 1);
    let inserted = doc.insert_line(a, "x").unwrap();
    mark.handle_transaction(&mut doc, &inserted, false);
    assert_eq!(marked_rows(&doc), vec![1, 2, 3]);
    assert_eq!(mark.active().map(|mark| mark.rows), Some(3));

    let c = row(&doc, 4);
    let inserted = doc.insert_line(c, "y").unwrap();
    mark.handle_transaction(&mut doc, &inserted, false);
    assert_eq!(marked_rows(&doc), vec![1, 2, 3]);
  }

  #[test]
  fn removing_head_moves_it_down() {
    let mut doc = doc("a\nb\nc\nd\n");
    let mut mark = Mark::new();
    touch(&mut mark, &mut doc, 2, None).unwrap();
    touch(&mut mark, &mut doc, 4, None).unwrap();

    let (a, b) = (row(&doc, 1), row(&doc, 2));
    let removed = doc.remove_lines(a, b).unwrap();
    mark.handle_transaction(&mut doc, &removed, false);
    let active = mark.active().unwrap();
    assert_eq!(active.head, row(&doc, 1));
    assert_eq!(active.anchor, row(&doc, 1));
    assert_eq!(active.rows, 2);
  }

  #[test]
  fn removing_whole_mark_and_undo_restores_it() {
    let mut doc = doc("a\nb\nc\nd\n");
    let mut mark = Mark::new();
    touch(&mut mark, &mut doc, 2, None).unwrap();
    touch(&mut mark, &mut doc, 3, None).unwrap();

    let (b, c) = (row(&doc, 2), row(&doc, 3));
    let removed = doc.remove_lines(b, c).unwrap();
    mark.handle_transaction(&mut doc, &removed, false);
    assert!(mark.is_empty());

    let undone = doc.undo().unwrap().unwrap();
    mark.handle_transaction(&mut doc, &undone, true);
    let active = mark.active().unwrap();
    assert_eq!((active.head, active.tail), (b, c));
    assert_eq!(marked_rows(&doc), vec![2, 3]);
  }

  #[test]
  fn mark_in_one_document_at_a_time() {
    let mut first = doc("a\n");
    let mut second = Document::new(
      DocumentId::new(NonZeroUsize::new(2).unwrap()),
      "b\n",
      &EngineConfig::default(),
    );
    let mut mark = Mark::new();
    touch(&mut mark, &mut first, 1, None).unwrap();
    let line = row(&second, 1);
    assert_eq!(
      mark.touch(&mut second, line, None),
      Err(EditError::MarkElsewhere)
    );
    assert_eq!(mark.copy(&second, &mut Stash::new()), Err(EditError::NoMark));
  }

  #[test]
  fn verify_move_adjusts_block_column() {
    let mut doc = doc("0123456789ABCDEF\n0123456789ABCDEF\n");
    let mut mark = Mark::new();
    touch(&mut mark, &mut doc, 1, Some(3)).unwrap();
    touch(&mut mark, &mut doc, 2, Some(7)).unwrap();
    let first = row(&doc, 1);

    assert_eq!(mark.verify_move(&doc, first, Some(10)), Ok(Some(5)));
    assert_eq!(mark.verify_move(&doc, first, Some(2)), Ok(Some(2)));
    assert_eq!(
      mark.verify_move(&doc, first, Some(5)),
      Err(EditError::MoveIntoMark)
    );
  }

  #[test]
  fn verify_move_rejects_line_mark_target() {
    let mut doc = doc("a\nb\nc\n");
    let mut mark = Mark::new();
    touch(&mut mark, &mut doc, 1, None).unwrap();
    touch(&mut mark, &mut doc, 2, None).unwrap();

    let second = row(&doc, 2);
    assert_eq!(
      mark.verify_move(&doc, second, None),
      Err(EditError::MoveIntoMark)
    );
    let third = row(&doc, 3);
    assert_eq!(mark.verify_move(&doc, third, None), Ok(None));
    let tail = doc.line_list().tail();
    assert_eq!(mark.verify_copy(&doc, tail), Err(EditError::EndOfFile));
  }

  #[test]
  fn restored_duplicate_rejoins_the_mark() {
    let mut doc = doc("a\nb");
    let b = row(&doc, 2);
    doc.insert_line(b, "c").unwrap();
    let duplicate = row(&doc, 2);
    assert!(doc.line_list().flags(duplicate).contains(LineFlags::SYNTHETIC));

    let mut mark = Mark::new();
    touch(&mut mark, &mut doc, 2, None).unwrap();
    mark.delete(&mut doc).unwrap();
    assert!(mark.is_empty());

    let undone = doc.undo().unwrap().unwrap();
    mark.handle_transaction(&mut doc, &undone, true);
    let active = mark.active().unwrap();
    assert_eq!((active.head, active.tail), (duplicate, duplicate));

    touch(&mut mark, &mut doc, 1, None).unwrap();
    assert_eq!(marked_rows(&doc), vec![1, 2]);
    assert_eq!(mark.active().map(|mark| mark.rows), Some(2));
    let mut stash = Stash::new();
    mark.copy(&doc, &mut stash).unwrap();
    assert_eq!(stash.lines(), &["a", "b"]);
  }

  #[test]
  fn restored_duplicate_is_cleared_when_the_mark_moved_on() {
    let mut doc = doc("a\nb");
    let b = row(&doc, 2);
    doc.insert_line(b, "c").unwrap();
    let mut mark = Mark::new();
    touch(&mut mark, &mut doc, 2, None).unwrap();
    mark.delete(&mut doc).unwrap();

    let mut other = Document::new(
      DocumentId::new(NonZeroUsize::new(2).unwrap()),
      "x\n",
      &EngineConfig::default(),
    );
    touch(&mut mark, &mut other, 1, None).unwrap();

    let undone = doc.undo().unwrap().unwrap();
    mark.handle_transaction(&mut doc, &undone, true);
    assert_eq!(contents(&doc), vec!["a", "b", "c"]);
    assert!(marked_rows(&doc).is_empty());
    assert_eq!(mark.file(), Some(other.id()));
  }

  #[test]
  fn marked_line_outside_the_mark_damages() {
    let mut doc = ten_lines();
    let mut mark = Mark::new();
    touch(&mut mark, &mut doc, 2, None).unwrap();
    let stray = row(&doc, 5);
    doc
      .line_list_mut()
      .set_flags(stray, LineFlags::MARKED, true);

    assert_eq!(
      mark.touch(&mut doc, stray, None),
      Err(EditError::MarkInconsistent)
    );
    assert!(doc.is_damaged());
    let active = mark.active().unwrap();
    assert_eq!((active.head, active.tail), (row(&doc, 2), row(&doc, 2)));
    assert_eq!(active.rows, 1);
  }

  #[test]
  fn failed_paste_keeps_the_mark() {
    let mut doc = doc("a\nb");
    let mut mark = Mark::new();
    let mut stash = Stash::new();
    touch(&mut mark, &mut doc, 1, None).unwrap();
    mark.copy(&doc, &mut stash).unwrap();

    let b = row(&doc, 2);
    doc.protect_line(b, true).unwrap();
    assert_eq!(mark.verify_paste(&doc, &stash, b), Err(EditError::Protected));
    assert_eq!(
      mark.paste(&mut doc, &stash, b, None),
      Err(EditError::Protected)
    );
    assert_eq!(marked_rows(&doc), vec![1]);
    assert_eq!(mark.active().map(|mark| mark.head), Some(row(&doc, 1)));
    assert_eq!(doc.history().undo_len(), 0);
  }

  #[test]
  fn verify_move_rejects_partial_block_overlap() {
    let mut doc = doc("0123456789\n0123456789\n0123456789\n0123456789\n");
    let mut mark = Mark::new();
    touch(&mut mark, &mut doc, 1, Some(3)).unwrap();
    touch(&mut mark, &mut doc, 2, Some(7)).unwrap();

    let second = row(&doc, 2);
    assert_eq!(
      mark.verify_move(&doc, second, Some(10)),
      Err(EditError::MoveIntoMark)
    );
    assert_eq!(mark.verify_move(&doc, second, Some(2)), Ok(Some(2)));
    let third = row(&doc, 3);
    assert_eq!(mark.verify_move(&doc, third, Some(10)), Ok(Some(10)));
  }

  #[test]
  fn removing_tail_moves_it_up() {
    let mut doc = doc("a\nb\nc\nd\ne\n");
    let mut mark = Mark::new();
    touch(&mut mark, &mut doc, 2, None).unwrap();
    touch(&mut mark, &mut doc, 4, None).unwrap();

    let (d, e) = (row(&doc, 4), row(&doc, 5));
    let removed = doc.remove_lines(d, e).unwrap();
    mark.handle_transaction(&mut doc, &removed, false);
    let active = mark.active().unwrap();
    assert_eq!(active.tail, row(&doc, 3));
    assert_eq!(active.anchor, row(&doc, 2));
    assert_eq!(marked_rows(&doc), vec![2, 3]);
  }

  #[test]
  fn paste_after_unrelated_copy_is_its_own_step() {
    let mut doc = doc("a\nb\nc\nd\n");
    let mut mark = Mark::new();
    let mut stash = Stash::new();
    touch(&mut mark, &mut doc, 2, None).unwrap();
    mark.cut(&mut doc, &mut stash).unwrap();
    touch(&mut mark, &mut doc, 2, None).unwrap();
    mark.copy(&doc, &mut stash).unwrap();

    let a = row(&doc, 1);
    mark.paste(&mut doc, &stash, a, None).unwrap();
    assert_eq!(contents(&doc), vec!["a", "c", "c", "d"]);
    assert_eq!(doc.history().undo_len(), 2);

    let undone = doc.undo().unwrap().unwrap();
    mark.handle_transaction(&mut doc, &undone, true);
    assert_eq!(contents(&doc), vec!["a", "c", "d"]);
  }
}
