//! Versioned index store and the build pipeline that feeds it.
//!
//! Every completed build becomes one immutable snapshot under a
//! timestamped version id, while a "latest" file set at a fixed path is
//! overwritten wholesale. Readers of a version directory never see a
//! partial snapshot; readers of "latest" during an in-flight build may see
//! interleaved old/new files, a narrow documented race.

pub mod jobs;
pub mod layout;
pub mod pipeline;
pub mod progress;
pub mod source;
pub mod store;

pub use jobs::{JobRecord, JobStatus, MemoryJobStore};
pub use pipeline::BuildCoordinator;
pub use progress::ProgressBus;
pub use store::{IndexStore, LoadedIndex};
