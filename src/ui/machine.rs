//! Session state machine with presentation side effects.
//!
//! [`SessionMachine`] pairs the guarded transitions of [`SessionManager`] with
//! the view updates each transition implies. A transition is validated first;
//! the view is only touched once the state has actually moved, so a rejected
//! call leaves both untouched.

use crate::services::code_image::Bitmap;
use crate::state::{SessionError, SessionManager, SessionState};
use crate::ui::view::{ACTION_LABEL, BUSY_LABEL, SessionView};

/// How an outstanding request ended, ready for display.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    Success { address: String, image: Bitmap },
    Failure { message: String },
}

/// Must only be used from the UI thread.
pub struct SessionMachine<V: SessionView> {
    session: SessionManager,
    view: V,
}

impl<V: SessionView> SessionMachine<V> {
    pub fn new(session: SessionManager, view: V) -> Self {
        Self { session, view }
    }

    pub fn state(&self) -> SessionState {
        self.session.snapshot()
    }

    /// `Idle -> Publishing`: lock the inputs and show the busy label.
    pub fn begin_publishing(&mut self) -> Result<(), SessionError> {
        self.session.begin_publishing()?;

        self.view.set_inputs_enabled(false);
        self.view.set_action_label(BUSY_LABEL);
        Ok(())
    }

    /// `Publishing -> Published | Failed`.
    ///
    /// Success swaps the action button for the address and its code; failure
    /// opens the error dialog and waits for [`acknowledge`](Self::acknowledge).
    pub fn resolve(&mut self, resolution: Resolution) -> Result<(), SessionError> {
        match resolution {
            Resolution::Success { address, image } => {
                self.session.publish_succeeded(&address)?;
                self.view.show_published(&address, &image);
            }
            Resolution::Failure { message } => {
                self.session.publish_failed(&message)?;
                self.view.show_error(&message);
            }
        }
        Ok(())
    }

    /// `Failed -> Idle`: close the dialog and give the inputs back.
    pub fn acknowledge(&mut self) -> Result<(), SessionError> {
        self.session.acknowledge()?;

        self.view.dismiss_error();
        self.view.set_action_label(ACTION_LABEL);
        self.view.set_inputs_enabled(true);
        Ok(())
    }
}
