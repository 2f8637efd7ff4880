//! Label Studio integration.
//!
//! [`api`] is a thin typed client over the Label Studio REST API; [`setup`]
//! builds on it to bootstrap a labeling project for an app project and keep
//! its task counters current.

pub mod api;
pub mod setup;

pub use api::{LabelStudioApi, LabelStudioError};
pub use setup::SetupError;
