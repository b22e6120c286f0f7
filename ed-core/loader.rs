//! Line splitting for freshly loaded text.

use crate::delimiter::{
  Delimiter,
  Mode,
};

/// The result of splitting input text into lines.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Loaded<'a> {
  pub lines:           Vec<(&'a str, Delimiter)>,
  pub mode:            Mode,
  /// The last line had no terminator and carries [`Delimiter::NONE`].
  pub missing_newline: bool,
}

/// Split `text` into `(line, delimiter)` pairs and detect its mode.
///
/// `\n` ends a line; a `\r` directly before it is folded into a DOS
/// delimiter. A run of NUL bytes also ends a line and makes the text binary.
/// Once the first line ending has decided between DOS and UNIX, any line
/// ending of the other kind makes the text mixed.
pub fn split_lines(text: &str) -> Loaded<'_> {
  let bytes = text.as_bytes();
  let mut loaded = Loaded::default();
  let mut start = 0;
  let mut at = 0;

  while at < bytes.len() {
    match bytes[at] {
      b'\n' => {
        let (end, delimiter) = if at > start && bytes[at - 1] == b'\r' {
          (at - 1, Delimiter::DOS)
        } else {
          (at, Delimiter::UNIX)
        };
        loaded.mode = next_mode(loaded.mode, delimiter);
        loaded.lines.push((&text[start..end], delimiter));
        at += 1;
        start = at;
      },
      0 => {
        let end = at;
        let mut count: u8 = 0;
        while at < bytes.len() && bytes[at] == 0 && count < u8::MAX {
          count += 1;
          at += 1;
        }
        loaded.mode = Mode::Binary;
        loaded.lines.push((&text[start..end], Delimiter::nul(count)));
        start = at;
      },
      _ => at += 1,
    }
  }

  if start < bytes.len() {
    tracing::debug!(line = loaded.lines.len(), "loader: ending newline missing");
    loaded.lines.push((&text[start..], Delimiter::NONE));
    loaded.missing_newline = true;
  }

  loaded
}

fn next_mode(mode: Mode, delimiter: Delimiter) -> Mode {
  let this = if delimiter == Delimiter::DOS {
    Mode::Dos
  } else {
    Mode::Unix
  };

  match mode {
    Mode::None => this,
    Mode::Binary | Mode::Mixed => mode,
    _ if mode == this => mode,
    _ => Mode::Mixed,
  }
}
