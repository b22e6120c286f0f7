//! Lines and the line list.
//!
//! Lines live in a slot map and are addressed by generation-checked
//! [`LineId`]s, so a transaction may hold on to lines long after they left
//! the list without ever observing a reused slot. `prev`/`next` are plain id
//! fields.
//!
//! The list is always bounded by two protected sentinels: the top-of-file
//! line (row 0) and the end-of-file line, which is the only line allowed to
//! carry the zero delimiter at all times.
//!
//! [`LineList::remove`] unlinks a run but leaves the run's own links alone,
//! including the head's `prev` and the tail's `next`. A removed run therefore
//! still knows where it used to be, which is what undo relies on to splice it
//! back in.

use ed_core::{
  arena::{
    Arena,
    TextRef,
  },
  delimiter::Delimiter,
};
use slotmap::SlotMap;

use crate::transaction::Span;

pub const TOP_OF_FILE: &str = "* * * * Top of file * * * *";
pub const END_OF_FILE: &str = "* * * * End of file * * * *";

slotmap::new_key_type! {
  pub struct LineId;
}

bitflags::bitflags! {
  #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
  pub struct LineFlags: u8 {
    /// Never editable or markable.
    const PROTECTED = 1 << 0;
    /// Part of the current mark.
    const MARKED    = 1 << 1;
    /// Created by a repair rather than by the user.
    const SYNTHETIC = 1 << 2;
  }
}

#[derive(Debug, Clone)]
pub struct Line {
  prev:      Option<LineId>,
  next:      Option<LineId>,
  text:      TextRef,
  delimiter: Delimiter,
  flags:     LineFlags,
  attached:  bool,
}

impl Line {
  pub fn prev(&self) -> Option<LineId> {
    self.prev
  }

  pub fn next(&self) -> Option<LineId> {
    self.next
  }

  pub fn text_ref(&self) -> TextRef {
    self.text
  }

  pub fn delimiter(&self) -> Delimiter {
    self.delimiter
  }

  pub fn flags(&self) -> LineFlags {
    self.flags
  }

  #[inline]
  pub fn is_protected(&self) -> bool {
    self.flags.contains(LineFlags::PROTECTED)
  }

  #[inline]
  pub fn is_marked(&self) -> bool {
    self.flags.contains(LineFlags::MARKED)
  }

  #[inline]
  pub fn is_synthetic(&self) -> bool {
    self.flags.contains(LineFlags::SYNTHETIC)
  }

  /// Whether the line is currently linked into the list.
  #[inline]
  pub fn is_attached(&self) -> bool {
    self.attached
  }
}

#[derive(Debug)]
pub struct LineList {
  arena: Arena,
  lines: SlotMap<LineId, Line>,
  head:  LineId,
  tail:  LineId,
  rows:  usize,
}

impl Default for LineList {
  fn default() -> Self {
    Self::new()
  }
}

impl LineList {
  pub fn new() -> Self {
    Self::with_arena(Arena::new())
  }

  pub fn with_arena(mut arena: Arena) -> Self {
    let mut lines = SlotMap::with_key();
    let head = lines.insert(Line {
      prev:      None,
      next:      None,
      text:      arena.allocate(TOP_OF_FILE),
      delimiter: Delimiter::UNIX,
      flags:     LineFlags::PROTECTED,
      attached:  true,
    });
    let tail = lines.insert(Line {
      prev:      Some(head),
      next:      None,
      text:      arena.allocate(END_OF_FILE),
      delimiter: Delimiter::NONE,
      flags:     LineFlags::PROTECTED,
      attached:  true,
    });
    lines[head].next = Some(tail);

    Self {
      arena,
      lines,
      head,
      tail,
      rows: 0,
    }
  }

  /// The top-of-file sentinel.
  #[inline]
  pub fn head(&self) -> LineId {
    self.head
  }

  /// The end-of-file sentinel.
  #[inline]
  pub fn tail(&self) -> LineId {
    self.tail
  }

  /// Number of content lines, sentinels excluded.
  #[inline]
  pub fn rows(&self) -> usize {
    self.rows
  }

  pub fn arena(&self) -> &Arena {
    &self.arena
  }

  pub fn get(&self, id: LineId) -> Option<&Line> {
    self.lines.get(id)
  }

  pub fn text(&self, id: LineId) -> Option<&str> {
    self.lines.get(id).map(|line| self.arena.get(line.text))
  }

  pub fn next(&self, id: LineId) -> Option<LineId> {
    self.lines.get(id).and_then(|line| line.next)
  }

  pub fn prev(&self, id: LineId) -> Option<LineId> {
    self.lines.get(id).and_then(|line| line.prev)
  }

  pub fn contains(&self, id: LineId) -> bool {
    self.lines.get(id).is_some_and(|line| line.attached)
  }

  /// Whether `id` is an attached line other than a sentinel.
  pub fn is_content(&self, id: LineId) -> bool {
    id != self.head && id != self.tail && self.contains(id)
  }

  pub fn flags(&self, id: LineId) -> LineFlags {
    self
      .lines
      .get(id)
      .map_or(LineFlags::empty(), |line| line.flags)
  }

  pub fn set_flags(&mut self, id: LineId, flags: LineFlags, value: bool) {
    if let Some(line) = self.lines.get_mut(id) {
      line.flags.set(flags, value);
    }
  }

  /// Create a detached, unlinked line.
  pub fn create(&mut self, text: &str, delimiter: Delimiter, flags: LineFlags) -> LineId {
    let text = self.arena.allocate(text);
    self.lines.insert(Line {
      prev: None,
      next: None,
      text,
      delimiter,
      flags,
      attached: false,
    })
  }

  /// Link detached lines into a run, in order.
  pub fn chain(&mut self, ids: &[LineId]) -> Option<Span> {
    let (&first, &last) = (ids.first()?, ids.last()?);
    for pair in ids.windows(2) {
      if let Some(line) = self.lines.get_mut(pair[0]) {
        line.next = Some(pair[1]);
      }
      if let Some(line) = self.lines.get_mut(pair[1]) {
        line.prev = Some(pair[0]);
      }
    }
    Some(Span::new(first, last))
  }

  /// The lines of the run `head..=tail`, following `next` links.
  ///
  /// Returns `None` when `tail` cannot be reached from `head`.
  pub fn run(&self, head: LineId, tail: LineId) -> Option<Vec<LineId>> {
    let mut run = Vec::new();
    let mut at = Some(head);
    while let Some(id) = at {
      let line = self.lines.get(id)?;
      run.push(id);
      if id == tail {
        return Some(run);
      }
      if run.len() > self.lines.len() {
        return None;
      }
      at = line.next;
    }
    None
  }

  pub fn count_run(&self, head: LineId, tail: LineId) -> usize {
    self.run(head, tail).map_or(0, |run| run.len())
  }

  /// Unlink the attached run `head..=tail`.
  ///
  /// Returns the number of lines removed, or `None` without touching the
  /// list when the run is not a contiguous attached stretch of content.
  pub fn remove(&mut self, head: LineId, tail: LineId) -> Option<usize> {
    let run = self.run(head, tail)?;
    if run
      .iter()
      .any(|&id| id == self.head || id == self.tail || !self.contains(id))
    {
      return None;
    }

    let before = self.lines.get(head)?.prev?;
    let after = self.lines.get(tail)?.next?;
    self.lines.get_mut(before)?.next = Some(after);
    self.lines.get_mut(after)?.prev = Some(before);

    for &id in &run {
      if let Some(line) = self.lines.get_mut(id) {
        line.attached = false;
      }
    }
    self.rows -= run.len();
    Some(run.len())
  }

  /// Splice the detached run `head..=tail` in right after `after`.
  pub fn insert(&mut self, after: LineId, head: LineId, tail: LineId) -> Option<usize> {
    if after == self.tail || !self.contains(after) {
      return None;
    }
    let run = self.run(head, tail)?;
    if run.iter().any(|&id| self.contains(id)) {
      return None;
    }

    let next = self.lines.get(after)?.next?;
    self.lines.get_mut(after)?.next = Some(head);
    self.lines.get_mut(next)?.prev = Some(tail);
    self.lines.get_mut(head)?.prev = Some(after);
    self.lines.get_mut(tail)?.next = Some(next);

    for &id in &run {
      if let Some(line) = self.lines.get_mut(id) {
        line.attached = true;
      }
    }
    self.rows += run.len();
    Some(run.len())
  }

  /// Drop the detached run `head..=tail` for good.
  ///
  /// Attached lines are never released.
  pub fn free_run(&mut self, head: LineId, tail: LineId) -> usize {
    let Some(run) = self.run(head, tail) else {
      return 0;
    };
    let mut freed = 0;
    for id in run {
      if !self.contains(id) && self.lines.remove(id).is_some() {
        freed += 1;
      }
    }
    freed
  }

  /// Every attached line from the top-of-file to the end-of-file sentinel.
  pub fn iter(&self) -> Lines<'_> {
    Lines {
      list: self,
      next: Some(self.head),
    }
  }

  /// Attached content lines, sentinels excluded.
  pub fn content(&self) -> impl Iterator<Item = LineId> + '_ {
    self.iter().filter(|&id| id != self.head && id != self.tail)
  }

  /// The line at `row`, where row 0 is the top-of-file sentinel.
  pub fn get_line(&self, row: usize) -> Option<LineId> {
    self.iter().nth(row)
  }

  pub fn get_row(&self, id: LineId) -> Option<usize> {
    if !self.contains(id) {
      return None;
    }
    self.iter().position(|line| line == id)
  }

  /// Walk `prev` links from a possibly detached line to the nearest line
  /// still in the list. Falls back to the top-of-file sentinel.
  pub fn nearest_live(&self, stale: LineId) -> LineId {
    let mut at = Some(stale);
    let mut steps = 0;
    while let Some(id) = at {
      if self.contains(id) {
        return id;
      }
      steps += 1;
      if steps > self.lines.len() {
        break;
      }
      at = self.prev(id);
    }
    self.head
  }

  /// Number of line nodes held, detached ones included.
  pub fn nodes(&self) -> usize {
    self.lines.len()
  }
}

pub struct Lines<'a> {
  list: &'a LineList,
  next: Option<LineId>,
}

impl Iterator for Lines<'_> {
  type Item = LineId;

  fn next(&mut self) -> Option<LineId> {
    let id = self.next?;
    self.next = self.list.next(id);
    Some(id)
  }
}
