//! Services module - collaborators of the session controller with no UI dependencies.
//!
//! - [`code_image`]: renders a published address as a QR code bitmap
//! - [`engine`]: the channel boundary to the publishing engine, plus
//!   [`ProcessEngine`], which delegates publishing to an external `onionize`
//!   executable
//!
//! Both are framework-agnostic: no Slint types appear here, so everything can
//! be exercised from plain tests.

pub mod code_image;
pub mod engine;

pub use code_image::{Bitmap, EncodingError, render};
pub use engine::{EngineEndpoints, EngineSide, ProcessEngine, PublishEngine, channels};
