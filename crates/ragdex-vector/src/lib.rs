//! Vector index backends.
//!
//! Two variants behind one closed enum: `Flat` (exact inner-product scan)
//! and `Ivf` (clustered approximate search with a one-time training pass).
//! Backends work purely in positional indices; mapping positions back to
//! chunk ids is the version store's job.

pub mod flat;
pub mod index;
pub mod ivf;
pub mod kmeans;

pub use flat::FlatIndex;
pub use index::VectorIndex;
pub use ivf::IvfIndex;
