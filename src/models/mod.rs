//! Data models for the onionize front-end.
//!
//! - [`SessionRequest`]: immutable publish request sent to the engine
//! - [`PublishResult`] / [`PublishError`]: the two terminal events the engine emits
//! - [`RawInputs`]: typed snapshot of the input controls
//! - [`ContentMode`]: file, directory or archive
//! - [`UserConfig`]: persisted settings loaded from `onionize.yaml`

pub mod config;
pub mod session;

pub use config::UserConfig;
pub use session::{ContentMode, PublishError, PublishResult, RawInputs, SessionRequest};
