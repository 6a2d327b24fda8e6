//! onionize-gui - desktop front-end for onionize
//!
//! Main entry point for the GUI application.
//!
//! # Overview
//!
//! This binary crate provides the Slint window for publishing a file, a
//! directory or a zip archive as an onion service. It initializes:
//! - Configuration loading ([`ConfigManager`], `onionize-data/onionize.yaml`)
//! - Logging infrastructure (daily file rotation + optional console output)
//! - Tokio async runtime (engine adapter and result listener)
//! - Session state ([`SessionManager`])
//! - GUI controller ([`GuiController`] - bridges Slint UI with the session controller)
//!
//! The application uses a hybrid threading model:
//! - **Main thread**: Runs the Slint event loop and owns every widget
//! - **Tokio workers**: Run the publishing engine and wait for its replies
//!
//! # Execution Flow
//!
//! 1. Parse command line, load configuration, apply overrides
//! 2. Initialize logging → `<log_dir>/onionize-gui.<date>`
//! 3. Create tokio runtime
//! 4. Connect the engine channels and start the engine adapter
//! 5. Create GuiController and run the Slint event loop (blocks until window closed)
//! 6. Shutdown the runtime; an unfinished publish is abandoned

use anyhow::Result;
use camino::{Utf8Path, Utf8PathBuf};
use clap::Parser;
use onionize_gui::services::{ProcessEngine, channels};
use onionize_gui::state::latest_change;
use onionize_gui::ui::GuiController;
use onionize_gui::{APP_NAME, ConfigManager, Metrics, SessionManager, VERSION};
use std::sync::Arc;

/// Publish a file, directory or zip archive as an onion service
#[derive(Debug, Parser)]
#[command(name = "onionize-gui", version, about)]
struct Cli {
    /// Directory holding onionize.yaml
    #[arg(long, env = "ONIONIZE_CONFIG_DIR", default_value = "onionize-data")]
    config_dir: Utf8PathBuf,

    /// Verbose logging and engine diagnostics
    #[arg(long)]
    debug: bool,

    /// Control interface address, overriding the configured one
    #[arg(long)]
    control: Option<String>,

    /// Also log to stderr
    #[arg(long)]
    console: bool,
}

/// Main entry point for the onionize GUI application
///
/// # Errors
///
/// This function can fail if:
/// - The configuration directory cannot be created or the config is invalid
/// - Logging initialization fails (disk space, permissions)
/// - Tokio runtime creation fails (system resources)
/// - Slint UI initialization fails (graphics drivers, display)
/// - The session hits an unrecoverable error (e.g. a QR code cannot be produced)
fn main() -> Result<()> {
    let cli = Cli::parse();

    let config_manager = ConfigManager::new(&cli.config_dir)?;
    config_manager.write_default_if_missing()?;
    let mut config = config_manager.load_config()?;
    if cli.debug {
        config.debug = true;
    }
    if let Some(control) = cli.control {
        config.control_address = control;
    }

    let _guard = onionize_gui::logging::setup_logging(
        Utf8Path::new(&config.log_dir),
        APP_NAME,
        config.debug,
        cli.console,
    )?;

    tracing::info!("Starting {} v{}", APP_NAME, VERSION);
    tracing::info!(
        "Configuration: control={}, mode={}, engine={}",
        config.control_address,
        config.default_mode,
        config.engine_program
    );

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .worker_threads(2)
        .thread_name("onionize-worker")
        .build()?;

    tracing::info!("Tokio runtime initialized with {} worker threads", 2);

    let metrics = Arc::new(Metrics::new());
    let session = SessionManager::new();
    let mut changes = session.subscribe();

    // Engine adapter runs for the lifetime of the runtime
    let (endpoints, engine_side) = channels();
    let engine = ProcessEngine::new(config.engine_program.clone())
        .with_leading_args(config.engine_args.clone());
    runtime.spawn(engine_side.serve(engine));

    let gui_controller = GuiController::new(
        &config,
        endpoints,
        session.clone(),
        metrics.clone(),
        runtime.handle().clone(),
    )?;

    tracing::info!("GUI controller initialized, launching window");

    // Blocks until the window is closed or the session aborts
    let result = gui_controller.run();

    tracing::info!("GUI closed, shutting down");

    match latest_change(&mut changes) {
        Some(change) if change.leaves_request_outstanding() => {
            tracing::warn!("Window closed while publishing - abandoning the request");
        }
        Some(change) => tracing::debug!("Last session change: {:?}", change),
        None => tracing::debug!("Window closed before anything was submitted"),
    }

    // Nothing waits for the engine: a late reply has nowhere to go
    runtime.shutdown_background();

    metrics.log_summary();
    tracing::info!("Application shutdown complete");

    result.map(|state| {
        tracing::debug!("Final session state: {}", state);
    })
}
