// GUI Controller - Bridges the Slint window with the session controller
//
// This module contains the GuiController which coordinates between:
// - Slint UI (MainWindow)
// - SessionContext (state machine + dispatcher, owned by the UI thread)
// - ResultListener (tokio task waiting on the engine channels)
// - Marshaler (worker -> UI thread hand-off)
//
// It handles:
// - Setting up UI callbacks -> session commands
// - Draining marshaled tasks on the UI thread
// - File browser dialogs
// - Stopping the event loop on unrecoverable errors

use crate::metrics::Metrics;
use crate::models::{ContentMode, RawInputs, UserConfig};
use crate::services::code_image::Bitmap;
use crate::services::engine::EngineEndpoints;
use crate::state::{SessionError, SessionManager, SessionState};
use crate::ui::bridge::{self, TaskQueue};
use crate::ui::context::SessionContext;
use crate::ui::dispatcher::{Dispatcher, EngineSettings};
use crate::ui::listener::ResultListener;
use crate::ui::machine::SessionMachine;
use crate::ui::view::{ACTION_LABEL, SessionView};
use anyhow::{Context, Result};
use camino::Utf8PathBuf;
use slint::{ComponentHandle, ModelRc, Rgb8Pixel, SharedPixelBuffer, SharedString, VecModel};
use std::cell::RefCell;
use std::rc::Rc;
use std::sync::Arc;
use tokio::task::JoinHandle;

// Include the generated Slint code
slint::include_modules!();

type WindowContext = SessionContext<SlintView>;

/// Slot for the first unrecoverable error; set just before the event loop is stopped
type FatalSlot = Rc<RefCell<Option<SessionError>>>;

/// [`SessionView`] backed by the Slint main window
pub struct SlintView {
    ui: slint::Weak<MainWindow>,
}

impl SlintView {
    pub fn new(ui: slint::Weak<MainWindow>) -> Self {
        Self { ui }
    }
}

impl SessionView for SlintView {
    fn set_inputs_enabled(&self, enabled: bool) {
        if let Some(ui) = self.ui.upgrade() {
            ui.set_inputs_enabled(enabled);
        }
    }

    fn set_action_label(&self, label: &str) {
        if let Some(ui) = self.ui.upgrade() {
            ui.set_action_label(label.into());
        }
    }

    fn show_published(&self, address: &str, image: &Bitmap) {
        if let Some(ui) = self.ui.upgrade() {
            ui.set_address(address.into());
            ui.set_qr_code(to_slint_image(image));
            ui.set_published(true);
        }
    }

    fn show_error(&self, message: &str) {
        if let Some(ui) = self.ui.upgrade() {
            ui.set_error_message(message.into());
            ui.set_show_error_dialog(true);
        }
    }

    fn dismiss_error(&self) {
        if let Some(ui) = self.ui.upgrade() {
            ui.set_show_error_dialog(false);
        }
    }
}

/// Convert a QR bitmap into an image the window can display.
pub fn to_slint_image(bitmap: &Bitmap) -> slint::Image {
    let buffer = SharedPixelBuffer::<Rgb8Pixel>::clone_from_slice(
        &bitmap.to_rgb8(),
        bitmap.width(),
        bitmap.height(),
    );
    slint::Image::from_rgb8(buffer)
}

/// GUI Controller that wires the Slint window to the session controller
///
/// Everything that mutates widgets runs on the thread that created the
/// controller. The result listener runs on the tokio runtime and reaches the
/// window only through the marshaler.
///
/// # Example
/// ```ignore
/// let (endpoints, engine_side) = onionize_gui::services::channels();
/// let controller = GuiController::new(&config, endpoints, session, metrics, runtime.handle().clone())?;
/// controller.run()?;  // Blocks until window is closed
/// ```
pub struct GuiController {
    ui: MainWindow,

    session: SessionManager,

    _context: Rc<RefCell<WindowContext>>,

    fatal: FatalSlot,

    _listener: JoinHandle<()>,
}

impl GuiController {
    /// Create the window, the session context and the result listener.
    pub fn new(
        config: &UserConfig,
        endpoints: EngineEndpoints,
        session: SessionManager,
        metrics: Arc<Metrics>,
        tokio_handle: tokio::runtime::Handle,
    ) -> Result<Self> {
        let ui = MainWindow::new().context("Failed to create Slint UI")?;
        Self::sync_ui_with_config(&ui, config);

        let EngineEndpoints {
            commands,
            results,
            errors,
        } = endpoints;

        let machine = SessionMachine::new(session.clone(), SlintView::new(ui.as_weak()));
        let dispatcher = Dispatcher::new(commands, EngineSettings::from(config), metrics.clone());
        let context = Rc::new(RefCell::new(SessionContext::new(machine, dispatcher)));
        let fatal: FatalSlot = Rc::new(RefCell::new(None));

        // Waking posts a drain request into Slint's event loop; the drain itself
        // runs in the drain-tasks callback, on the UI thread.
        let ui_weak = ui.as_weak();
        let (marshaler, queue) = bridge::channel::<WindowContext>(
            move || {
                if let Err(e) = ui_weak.upgrade_in_event_loop(|ui| ui.invoke_drain_tasks()) {
                    tracing::warn!("Failed to queue UI drain to event loop: {:?}", e);
                }
            },
            metrics.clone(),
        );

        Self::setup_callbacks(&ui, &context, &fatal, queue);

        let listener = ResultListener::new(results, errors, marshaler, metrics).spawn(&tokio_handle);

        tracing::info!("GUI controller initialized");

        Ok(Self {
            ui,
            session,
            _context: context,
            fatal,
            _listener: listener,
        })
    }

    /// Run the GUI (blocks until window is closed)
    ///
    /// Returns the session state the window was closed in, or the error that
    /// stopped the event loop.
    pub fn run(self) -> Result<SessionState> {
        tracing::info!("Starting GUI event loop");
        self.ui.run().context("Slint event loop failed")?;

        if let Some(err) = self.fatal.borrow_mut().take() {
            return Err(anyhow::Error::new(err).context("Session aborted"));
        }

        Ok(self.session.snapshot())
    }

    /// Initialize the inputs from configuration
    fn sync_ui_with_config(ui: &MainWindow, config: &UserConfig) {
        let labels: Vec<SharedString> = ContentMode::ALL
            .iter()
            .map(|mode| SharedString::from(mode.label()))
            .collect();
        ui.set_mode_labels(ModelRc::new(VecModel::from(labels)));
        ui.set_mode_index(config.default_mode.index());
        ui.set_slug(config.slug);
        ui.set_action_label(ACTION_LABEL.into());
        ui.set_inputs_enabled(true);
        ui.set_published(false);
        ui.set_show_error_dialog(false);

        tracing::debug!(
            "UI initialized: mode={}, slug={}",
            config.default_mode,
            config.slug
        );
    }

    /// Set up Slint UI callbacks
    fn setup_callbacks(
        ui: &MainWindow,
        context: &Rc<RefCell<WindowContext>>,
        fatal: &FatalSlot,
        queue: TaskQueue<WindowContext>,
    ) {
        let ctx = Rc::clone(context);
        let fatal_slot = Rc::clone(fatal);
        let queue = RefCell::new(queue);

        // Marshaled work from the result listener
        ui.on_drain_tasks(move || {
            let mut ctx = ctx.borrow_mut();
            queue.borrow_mut().drain(&mut *ctx);

            if let Some(err) = ctx.take_fatal() {
                Self::escalate(&fatal_slot, err);
            }
        });

        let ctx = Rc::clone(context);
        let fatal_slot = Rc::clone(fatal);
        let ui_weak = ui.as_weak();

        // Action button
        ui.on_submit(move || {
            let Some(ui) = ui_weak.upgrade() else {
                return;
            };
            let inputs = Self::read_inputs(&ui);
            tracing::info!("Submit clicked: mode={}, path={}", inputs.mode, inputs.path);

            let result = ctx.borrow_mut().submit(inputs);
            if let Err(err) = result {
                Self::escalate(&fatal_slot, err);
            }
        });

        let ctx = Rc::clone(context);
        let fatal_slot = Rc::clone(fatal);

        // Error dialog close button
        ui.on_error_acknowledged(move || {
            tracing::debug!("Error dialog dismissed");

            let result = ctx.borrow_mut().acknowledge();
            if let Err(err) = result {
                Self::escalate(&fatal_slot, err);
            }
        });

        let ctx = Rc::clone(context);
        let ui_weak = ui.as_weak();

        // Browse button
        ui.on_browse(move || {
            let Some(ui) = ui_weak.upgrade() else {
                return;
            };
            let state = ctx.borrow().state();
            if !state.accepts_input() {
                tracing::debug!("Ignoring browse while {}", state);
                return;
            }
            let mode = ContentMode::from_index(ui.get_mode_index());
            tracing::debug!("Browse clicked in {} mode", mode);

            if let Some(path) = Self::show_path_picker(mode) {
                tracing::info!("Content path selected: {}", path);
                ui.set_content_path(path.as_str().into());
            }
        });
    }

    /// Snapshot the input controls
    fn read_inputs(ui: &MainWindow) -> RawInputs {
        RawInputs {
            path: ui.get_content_path().to_string(),
            mode: ContentMode::from_index(ui.get_mode_index()),
            slug: ui.get_slug(),
            passphrase: ui.get_passphrase().to_string(),
        }
    }

    /// Record an unrecoverable error and stop the event loop
    fn escalate(fatal: &FatalSlot, err: SessionError) {
        if err.is_recoverable() {
            tracing::warn!("Session error: {}", err);
            return;
        }

        tracing::error!("Stopping after unrecoverable session error: {}", err);
        fatal.borrow_mut().get_or_insert(err);

        if let Err(e) = slint::quit_event_loop() {
            tracing::error!("Failed to stop event loop: {}", e);
        }
    }

    /// Show a native chooser constrained by `mode`
    ///
    /// Directory mode picks a folder, archive mode only offers archives, file
    /// mode picks any file. Returns `None` if cancelled or the path isn't UTF-8.
    fn show_path_picker(mode: ContentMode) -> Option<Utf8PathBuf> {
        use rfd::FileDialog;

        let dialog = FileDialog::new().set_title("Select a path");

        let picked = if mode.selects_directory() {
            dialog.pick_folder()
        } else if mode == ContentMode::Archive {
            dialog
                .add_filter("Zip archives", ContentMode::ARCHIVE_EXTENSIONS)
                .pick_file()
        } else {
            dialog.pick_file()
        }?;

        let path = Utf8PathBuf::try_from(picked)
            .map_err(|e| {
                tracing::error!("Failed to convert path to UTF-8: {}", e);
                e
            })
            .ok()?;

        if !mode.accepts_path(path.as_str()) {
            tracing::warn!("Ignoring {} - not acceptable in {} mode", path, mode);
            return None;
        }

        Some(path)
    }
}
