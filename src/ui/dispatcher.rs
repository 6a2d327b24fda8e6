//! Command dispatcher: turns a submission into at most one engine request.

use crate::metrics::Metrics;
use crate::models::{RawInputs, SessionRequest, UserConfig};
use crate::state::SessionError;
use crate::ui::machine::{Resolution, SessionMachine};
use crate::ui::view::SessionView;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;

/// Request fields that come from configuration rather than the input surface
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineSettings {
    pub control_address: String,
    pub control_password: String,
    pub debug: bool,
}

impl From<&UserConfig> for EngineSettings {
    fn from(config: &UserConfig) -> Self {
        Self {
            control_address: config.control_address.clone(),
            control_password: config.control_password.clone(),
            debug: config.debug,
        }
    }
}

pub struct Dispatcher {
    commands: mpsc::Sender<SessionRequest>,
    settings: EngineSettings,
    metrics: Arc<Metrics>,
}

impl Dispatcher {
    pub fn new(
        commands: mpsc::Sender<SessionRequest>,
        settings: EngineSettings,
        metrics: Arc<Metrics>,
    ) -> Self {
        Self {
            commands,
            settings,
            metrics,
        }
    }

    /// Validate `inputs` and build the request they describe.
    ///
    /// The path is sent exactly as picked; a blank one means nothing is selected.
    pub fn build_request(&self, inputs: RawInputs) -> Result<SessionRequest, SessionError> {
        if inputs.path.trim().is_empty() {
            return Err(SessionError::Validation("no content selected".to_string()));
        }

        Ok(SessionRequest {
            path: inputs.path,
            mode: inputs.mode,
            slug: inputs.slug,
            passphrase: inputs.passphrase,
            control_address: self.settings.control_address.clone(),
            control_password: self.settings.control_password.clone(),
            debug: self.settings.debug,
        })
    }

    /// Submit `inputs`: validate, move the machine to `Publishing`, send once.
    ///
    /// Fails with [`SessionError::Validation`] (nothing sent, state unchanged)
    /// when no path is selected, and with [`SessionError::InvalidTransition`]
    /// when a request is already outstanding. If the engine is gone the
    /// session is resolved as a failure right away so the user sees why.
    pub fn submit<V: SessionView>(
        &self,
        machine: &mut SessionMachine<V>,
        inputs: RawInputs,
    ) -> Result<(), SessionError> {
        self.metrics.record_submission();

        let request = self.build_request(inputs).inspect_err(|_| {
            self.metrics.record_submission_ignored();
        })?;

        machine.begin_publishing()?;

        tracing::info!("Sending request to engine: {:?}", request);

        match self.commands.try_send(request) {
            Ok(()) => {
                self.metrics.record_request_sent();
                Ok(())
            }
            Err(TrySendError::Full(_)) => {
                tracing::error!("Engine command channel is full while a new session started");
                Err(SessionError::EngineBusy)
            }
            Err(TrySendError::Closed(_)) => {
                let message = SessionError::EngineUnavailable.to_string();
                tracing::error!("{}", message);
                machine.resolve(Resolution::Failure { message })
            }
        }
    }
}
