//! Lexical (term-frequency) ranking over a chunk corpus snapshot.
//!
//! The index is a pure function of the corpus: it is fitted in memory from
//! an index version's chunk texts at search time and never persisted. One
//! document = one chunk's text.

pub mod bm25;

pub use bm25::{tokenize, Bm25Index};
