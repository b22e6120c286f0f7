//! Line delimiters and document line-ending modes.
//!
//! A [`Delimiter`] is the pair of bytes that terminated a line when it was
//! loaded. `[b'\n', 0]` is a UNIX line end, `[b'\n', b'\r']` a DOS line end,
//! `[0, n]` a run of `n` NUL bytes in a binary file, and `[0, 0]` means the
//! line had no terminator at all. Only the last line of a document may carry
//! the zero pair.

use std::borrow::Cow;

use serde::{
  Deserialize,
  Serialize,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Delimiter([u8; 2]);

impl Delimiter {
  pub const DOS: Self = Self([b'\n', b'\r']);
  pub const NONE: Self = Self([0, 0]);
  pub const UNIX: Self = Self([b'\n', 0]);

  /// A run of `count` NUL delimiters.
  pub const fn nul(count: u8) -> Self {
    Self([0, count])
  }

  pub const fn from_bytes(bytes: [u8; 2]) -> Self {
    Self(bytes)
  }

  pub const fn bytes(self) -> [u8; 2] {
    self.0
  }

  /// True for the zero pair: the line is not terminated.
  pub const fn is_none(self) -> bool {
    self.0[0] == 0 && self.0[1] == 0
  }

  pub const fn is_newline(self) -> bool {
    self.0[0] == b'\n'
  }

  /// The bytes this delimiter stands for when the line is written out.
  pub fn as_str(self) -> Cow<'static, str> {
    match self.0 {
      [b'\n', b'\r'] => Cow::Borrowed("\r\n"),
      [b'\n', _] => Cow::Borrowed("\n"),
      [0, 0] => Cow::Borrowed(""),
      [0, count] => Cow::Owned("\0".repeat(count as usize)),
      // Unknown pairs only come from hand-built delimiters.
      _ => Cow::Borrowed("\n"),
    }
  }
}

/// The line-ending mode of a whole document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Mode {
  /// Nothing loaded yet.
  #[default]
  None,
  Binary,
  Dos,
  Mixed,
  Unix,
}

impl Mode {
  /// The delimiter given to lines created in a document of this mode, or
  /// `None` when the mode does not decide it.
  pub fn delimiter(self) -> Option<Delimiter> {
    match self {
      Mode::Dos => Some(Delimiter::DOS),
      Mode::Unix | Mode::Mixed | Mode::Binary => Some(Delimiter::UNIX),
      Mode::None => None,
    }
  }

  /// Detect the mode of a sequence of content-line delimiters.
  ///
  /// The first delimiter decides between DOS and UNIX. Any later
  /// disagreement makes the sequence mixed. A NUL delimiter makes it binary,
  /// and the scan stops at the first non-newline delimiter.
  pub fn detect<I>(delimiters: I) -> Mode
  where
    I: IntoIterator<Item = Delimiter>,
  {
    let mut delimiters = delimiters.into_iter().peekable();
    let Some(first) = delimiters.peek().copied() else {
      return Mode::None;
    };

    let (mut mode, expected) = if first.bytes()[1] == b'\r' {
      (Mode::Dos, b'\r')
    } else {
      (Mode::Unix, 0)
    };

    for delimiter in delimiters {
      let [lead, trail] = delimiter.bytes();
      if lead != b'\n' {
        if trail != 0 {
          mode = Mode::Binary;
        }
        break;
      }
      if trail != expected {
        mode = Mode::Mixed;
      }
    }

    mode
  }
}
