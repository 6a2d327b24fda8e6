//! The session context: everything the UI thread owns for the one session.
//!
//! Built once at startup and handed to whichever component needs it instead of
//! living in a global. Engine events reach it through the marshaler as
//! [`OutcomeSink::deliver`] calls; user actions call [`SessionContext::submit`]
//! and [`SessionContext::acknowledge`] directly from UI callbacks.

use crate::models::RawInputs;
use crate::services::code_image;
use crate::state::{SessionError, SessionState};
use crate::ui::dispatcher::Dispatcher;
use crate::ui::listener::{EngineEvent, OutcomeSink};
use crate::ui::machine::{Resolution, SessionMachine};
use crate::ui::view::SessionView;

pub struct SessionContext<V: SessionView> {
    machine: SessionMachine<V>,
    dispatcher: Dispatcher,

    /// First unrecoverable error raised inside a marshaled task
    fatal: Option<SessionError>,
}

impl<V: SessionView> SessionContext<V> {
    pub fn new(machine: SessionMachine<V>, dispatcher: Dispatcher) -> Self {
        Self {
            machine,
            dispatcher,
            fatal: None,
        }
    }

    pub fn state(&self) -> SessionState {
        self.machine.state()
    }

    /// Handle the action button. An empty path is ignored silently.
    pub fn submit(&mut self, inputs: RawInputs) -> Result<(), SessionError> {
        match self.dispatcher.submit(&mut self.machine, inputs) {
            Err(SessionError::Validation(reason)) => {
                tracing::debug!("Ignoring submission: {}", reason);
                Ok(())
            }
            other => other,
        }
    }

    /// Handle the error dialog's close button.
    pub fn acknowledge(&mut self) -> Result<(), SessionError> {
        self.machine.acknowledge()
    }

    /// Apply a terminal engine event: render the code on success, then resolve.
    pub fn handle_event(&mut self, event: EngineEvent) -> Result<(), SessionError> {
        let resolution = match event {
            EngineEvent::Published(result) => {
                let image = code_image::render(&result.address)?;
                Resolution::Success {
                    address: result.address,
                    image,
                }
            }
            EngineEvent::Failed(error) => Resolution::Failure {
                message: error.message,
            },
        };
        self.machine.resolve(resolution)
    }

    /// Take the fatal error recorded by a marshaled task, if any.
    pub fn take_fatal(&mut self) -> Option<SessionError> {
        self.fatal.take()
    }
}

impl<V: SessionView + 'static> OutcomeSink for SessionContext<V> {
    fn deliver(&mut self, event: EngineEvent) {
        if let Err(err) = self.handle_event(event) {
            tracing::error!("Unrecoverable session error: {}", err);
            self.fatal.get_or_insert(err);
        }
    }
}
