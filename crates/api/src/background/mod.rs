//! Background work that outlives a single request.
//!
//! Jobs are spawned via `tokio::spawn` and tracked in the [`jobs`] registry
//! so the UI can poll their progress.

pub mod jobs;

pub use jobs::{JobProgress, JobRecord, JobRegistry, JobStatus};
