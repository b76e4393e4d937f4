//! Cache-blocked multiplication.
//!
//! Tiles the i-k-j line kernel so the rows of A, B and C touched by the
//! two innermost loops stay within a `block × block` working set.

pub mod tiled;
