//! Append-only text pool.
//!
//! Every line's text is copied into the arena exactly once. A [`TextRef`]
//! returned by [`Arena::allocate`] always resolves to the same bytes: blocks
//! are only ever appended to, and no block is released before the arena
//! itself is dropped.
//!
//! # Allocation
//!
//! Small requests are carved out of fixed-size blocks, newest block first.
//! When no block has room a fresh block is opened. Requests larger than one
//! eighth of the block size get a dedicated block sized exactly for them, so
//! a single long line never wastes the tail of a shared block.
//!
//! ```ignore
//! use ed_core::arena::Arena;
//!
//! let mut arena = Arena::new();
//! let text = arena.allocate("hello");
//! assert_eq!(arena.get(text), "hello");
//! ```

use std::ops::Range;

/// Default size of a shared block.
pub const DEFAULT_BLOCK_SIZE: usize = 64 * 1024;
/// Smallest accepted block size.
pub const MIN_BLOCK_SIZE: usize = 4 * 1024;

/// Immutable handle to text stored in an [`Arena`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct TextRef {
  block: usize,
  start: usize,
  end:   usize,
}

impl TextRef {
  /// The empty text. Resolves to `""` in every arena.
  pub const EMPTY: Self = Self {
    block: 0,
    start: 0,
    end:   0,
  };

  #[inline]
  pub fn len(&self) -> usize {
    self.end - self.start
  }

  #[inline]
  pub fn is_empty(&self) -> bool {
    self.start == self.end
  }
}

#[derive(Debug)]
struct Block {
  data:      String,
  size:      usize,
  dedicated: bool,
}

impl Block {
  fn new(size: usize, dedicated: bool) -> Self {
    Self {
      data: String::with_capacity(size),
      size,
      dedicated,
    }
  }

  #[inline]
  fn remaining(&self) -> usize {
    self.size - self.data.len()
  }

  /// Carve `text` out of this block, or `None` when the block is exhausted.
  fn allocate(&mut self, text: &str) -> Option<Range<usize>> {
    if text.len() > self.remaining() {
      return None;
    }

    let start = self.data.len();
    self.data.push_str(text);
    Some(start..self.data.len())
  }
}

#[derive(Debug)]
pub struct Arena {
  blocks:     Vec<Block>,
  block_size: usize,
  used:       usize,
}

impl Default for Arena {
  fn default() -> Self {
    Self::new()
  }
}

impl Arena {
  pub fn new() -> Self {
    Self::with_block_size(DEFAULT_BLOCK_SIZE)
  }

  pub fn with_block_size(block_size: usize) -> Self {
    Self {
      blocks:     Vec::new(),
      block_size: block_size.max(MIN_BLOCK_SIZE),
      used:       0,
    }
  }

  #[inline]
  pub fn block_size(&self) -> usize {
    self.block_size
  }

  /// Number of blocks allocated so far, dedicated blocks included.
  #[inline]
  pub fn blocks(&self) -> usize {
    self.blocks.len()
  }

  /// Total number of text bytes handed out.
  #[inline]
  pub fn used(&self) -> usize {
    self.used
  }

  /// Copy `text` into the arena.
  pub fn allocate(&mut self, text: &str) -> TextRef {
    if text.is_empty() {
      return TextRef::EMPTY;
    }
    self.used += text.len();

    if text.len() > self.block_size / 8 {
      return self.allocate_block(text, text.len(), true);
    }

    for (index, block) in self.blocks.iter_mut().enumerate().rev() {
      if block.dedicated {
        continue;
      }
      if let Some(range) = block.allocate(text) {
        return TextRef {
          block: index,
          start: range.start,
          end:   range.end,
        };
      }
    }

    tracing::trace!(blocks = self.blocks.len() + 1, "arena: opening new block");
    self.allocate_block(text, self.block_size, false)
  }

  fn allocate_block(&mut self, text: &str, size: usize, dedicated: bool) -> TextRef {
    let mut block = Block::new(size, dedicated);
    // A fresh block is at least as large as the request.
    let range = block.allocate(text).unwrap_or(0..0);
    self.blocks.push(block);
    TextRef {
      block: self.blocks.len() - 1,
      start: range.start,
      end:   range.end,
    }
  }

  /// Resolve a [`TextRef`] produced by this arena.
  pub fn get(&self, text: TextRef) -> &str {
    if text.is_empty() {
      return "";
    }

    self
      .blocks
      .get(text.block)
      .and_then(|block| block.data.get(text.start..text.end))
      .unwrap_or("")
  }
}
