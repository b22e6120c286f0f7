//! The failure channel shared by every mutating operation.

use thiserror::Error;

use crate::transaction::TransactionError;

pub type Result<T> = std::result::Result<T, EditError>;

#[derive(Debug, Error, PartialEq, Eq)]
#[non_exhaustive]
pub enum EditError {
  #[error("Read/only")]
  ReadOnly,
  #[error("Protected")]
  Protected,
  #[error("End of file")]
  EndOfFile,
  #[error("document is damaged")]
  Damaged,
  #[error("No mark")]
  NoMark,
  #[error("No copy/cut")]
  NoStash,
  #[error("not in the data view")]
  WrongView,
  #[error("Mark offscreen")]
  MarkElsewhere,
  #[error("cannot mix line and block marks")]
  MarkShapeMismatch,
  #[error("unknown document")]
  UnknownDocument,
  #[error("line is not part of the document")]
  UnknownLine,
  #[error("destination is inside the mark")]
  MoveIntoMark,
  #[error("not enough lines at the destination")]
  NotEnoughLines,
  #[error("mark internal error")]
  MarkInconsistent,
  #[error("NOT CODED YET")]
  NotImplemented,
  #[error(transparent)]
  Transaction(#[from] TransactionError),
}

/// Stable classification of an [`EditError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
  /// The document or line may not be changed.
  Permission,
  /// The operation is not applicable in the current state.
  Precondition,
  /// The destination cannot hold the data.
  Capacity,
  /// An internal invariant was violated. The document is now damaged.
  Internal,
  Unsupported,
}

impl EditError {
  pub fn kind(&self) -> ErrorKind {
    match self {
      EditError::ReadOnly | EditError::Protected => ErrorKind::Permission,
      EditError::NotEnoughLines | EditError::EndOfFile => ErrorKind::Capacity,
      EditError::Damaged | EditError::MarkInconsistent => ErrorKind::Internal,
      EditError::NotImplemented => ErrorKind::Unsupported,
      EditError::NoMark
      | EditError::NoStash
      | EditError::WrongView
      | EditError::MarkElsewhere
      | EditError::MarkShapeMismatch
      | EditError::UnknownDocument
      | EditError::UnknownLine
      | EditError::MoveIntoMark
      | EditError::Transaction(_) => ErrorKind::Precondition,
    }
  }
}
