//! Line-list transactions.
//!
//! A [`Transaction`] records one atomic change to the line list: the run of
//! lines it removed, the run it inserted, or both for a replace. Both runs are
//! kept alive by the document for as long as the transaction is reachable from
//! either history stack, so the transaction only needs their end points.
//!
//! # Columns
//!
//! Block edits carry a [`Columns`] range. A forward range (`lh <= rh`)
//! describes the columns that appear in the inserted run; an inverted range
//! describes columns that were excised from the removed run. A remove-only
//! transaction with `lh == rh == 0` is the record of a cut.
//!
//! # Inversion
//!
//! Swapping the runs and the column bounds yields the exact inverse, which is
//! how undo is applied:
//!
//! ```ignore
//! let inverse = transaction.invert();
//! assert_eq!(inverse.invert(), transaction);
//! ```

use thiserror::Error;

use crate::line::LineId;

pub type Result<T> = std::result::Result<T, TransactionError>;

#[derive(Debug, Error, PartialEq, Eq)]
#[non_exhaustive]
pub enum TransactionError {
  #[error("transaction neither removes nor inserts lines")]
  Empty,
}

/// A contiguous run of lines, inclusive on both ends.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Span {
  pub head: LineId,
  pub tail: LineId,
}

impl Span {
  pub const fn new(head: LineId, tail: LineId) -> Self {
    Self { head, tail }
  }

  pub const fn single(line: LineId) -> Self {
    Self {
      head: line,
      tail: line,
    }
  }
}

/// An inclusive column range of a block edit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Columns {
  pub lh: usize,
  pub rh: usize,
}

impl Columns {
  /// The marker carried by a cut.
  pub const CUT: Self = Self { lh: 0, rh: 0 };

  pub const fn new(lh: usize, rh: usize) -> Self {
    Self { lh, rh }
  }

  #[inline]
  pub const fn is_forward(self) -> bool {
    self.lh <= self.rh
  }

  pub const fn invert(self) -> Self {
    Self {
      lh: self.rh,
      rh: self.lh,
    }
  }

  /// The bounds in ascending order.
  pub fn ordered(self) -> (usize, usize) {
    (self.lh.min(self.rh), self.lh.max(self.rh))
  }

  pub fn width(self) -> usize {
    let (lh, rh) = self.ordered();
    rh - lh + 1
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Transaction {
  remove:  Option<Span>,
  insert:  Option<Span>,
  columns: Option<Columns>,
}

impl Transaction {
  pub fn new(remove: Option<Span>, insert: Option<Span>) -> Result<Self> {
    if remove.is_none() && insert.is_none() {
      return Err(TransactionError::Empty);
    }
    Ok(Self {
      remove,
      insert,
      columns: None,
    })
  }

  pub fn with_columns(mut self, columns: Columns) -> Self {
    self.columns = Some(columns);
    self
  }

  /// The run taken out of the list.
  pub fn remove(&self) -> Option<Span> {
    self.remove
  }

  /// The run put into the list.
  pub fn insert(&self) -> Option<Span> {
    self.insert
  }

  pub fn columns(&self) -> Option<Columns> {
    self.columns
  }

  pub fn is_replace(&self) -> bool {
    self.remove.is_some() && self.insert.is_some()
  }

  /// A remove-only transaction carrying the cut marker.
  pub fn is_cut(&self) -> bool {
    self.insert.is_none() && self.columns == Some(Columns::CUT)
  }

  /// A block replace whose inserted run carries the columns.
  pub fn is_block_insert(&self) -> bool {
    self.is_replace() && self.columns.is_some_and(Columns::is_forward)
  }

  /// The transaction that undoes this one.
  pub fn invert(&self) -> Self {
    Self {
      remove:  self.insert,
      insert:  self.remove,
      columns: self.columns.map(Columns::invert),
    }
  }
}
