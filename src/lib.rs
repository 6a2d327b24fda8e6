// onionize-gui - Desktop front-end for publishing a file, directory or zip archive as an onion service
//
// This is the library crate containing the session controller and its collaborators.
// The binary crate (main.rs) provides the GUI entry point.

pub mod config;
pub mod logging;
pub mod metrics;
pub mod models;
pub mod services;
pub mod state;
pub mod ui;

// Re-export commonly used types for convenience
pub use config::ConfigManager;
pub use metrics::Metrics;
pub use models::{ContentMode, PublishError, PublishResult, RawInputs, SessionRequest, UserConfig};
pub use state::{SessionError, SessionState, SessionManager, StateChange};

/// Application version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Application name
pub const APP_NAME: &str = env!("CARGO_PKG_NAME");
