//! Grapheme column arithmetic for block marks.
//!
//! Columns are 0-indexed grapheme cluster counts within a single line. Column
//! ranges are inclusive on both ends, so `[3, 7]` covers five columns.

use std::borrow::Cow;

use unicode_segmentation::UnicodeSegmentation;

/// Number of columns in `text`.
pub fn width(text: &str) -> usize {
  text.graphemes(true).count()
}

/// Byte offset of `column` in `text`.
///
/// Columns past the end of the text resolve to `text.len()`.
pub fn to_byte(text: &str, column: usize) -> usize {
  text
    .grapheme_indices(true)
    .nth(column)
    .map_or(text.len(), |(offset, _)| offset)
}

/// The text covered by the inclusive column range `[lh, rh]`.
///
/// The range is clipped to the text; a range lying entirely past the end of
/// the line is empty.
pub fn slice(text: &str, lh: usize, rh: usize) -> &str {
  if rh < lh {
    return "";
  }
  let start = to_byte(text, lh);
  let end = to_byte(text, rh + 1);
  &text[start..end]
}

/// `text` with the inclusive column range `[lh, rh]` removed.
pub fn excise(text: &str, lh: usize, rh: usize) -> String {
  if rh < lh {
    return text.to_string();
  }
  let start = to_byte(text, lh);
  let end = to_byte(text, rh + 1);

  let mut out = String::with_capacity(text.len() - (end - start));
  out.push_str(&text[..start]);
  out.push_str(&text[end..]);
  out
}

/// `text` with `insert` placed at `column`.
///
/// A line shorter than `column` is padded with spaces up to it first.
pub fn splice(text: &str, column: usize, insert: &str) -> String {
  let len = width(text);
  let mut out = String::with_capacity(text.len() + insert.len() + column.saturating_sub(len));

  if column >= len {
    out.push_str(text);
    out.extend(std::iter::repeat_n(' ', column - len));
    out.push_str(insert);
  } else {
    let at = to_byte(text, column);
    out.push_str(&text[..at]);
    out.push_str(insert);
    out.push_str(&text[at..]);
  }
  out
}

/// `text` padded on the right with spaces to at least `columns` wide.
pub fn pad(text: &str, columns: usize) -> Cow<'_, str> {
  let len = width(text);
  if len >= columns {
    return Cow::Borrowed(text);
  }

  let mut out = String::with_capacity(text.len() + columns - len);
  out.push_str(text);
  out.extend(std::iter::repeat_n(' ', columns - len));
  Cow::Owned(out)
}
