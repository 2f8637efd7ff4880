//! Domain logic for the pose labeling app backend.
//!
//! Everything here is transport-agnostic: ffmpeg plumbing, video
//! reformatting, motion-energy snippet selection, pose prediction parsing,
//! Label Studio labeling configs and the on-disk project layout.

pub mod error;
pub mod ffmpeg;
pub mod labeling;
pub mod motion;
pub mod predictions;
pub mod progress;
pub mod project;
pub mod video;
