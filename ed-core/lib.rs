//! Leaf utilities for the line editor engine: the text arena, line
//! delimiters and modes, grapheme column arithmetic, and the line splitter.

pub mod arena;
pub mod column;
pub mod delimiter;
pub mod loader;
