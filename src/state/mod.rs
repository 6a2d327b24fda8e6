// Session state module
//
// Holds the single process-wide publish session: its state, the pure transition
// function that guards it, and a SessionManager that wraps it for thread-safe
// access and emits change events for observers.

use crate::services::code_image::EncodingError;
use std::fmt;
use std::sync::{Arc, PoisonError, RwLock};
use thiserror::Error;
use tokio::sync::broadcast;
use tokio::sync::broadcast::error::TryRecvError;

/// Lifecycle of the one publish session.
///
/// ```text
/// Idle --submit--> Publishing --succeed--> Published (terminal)
///                       |
///                       +----fail--> Failed --acknowledge--> Idle
/// ```
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum SessionState {
    #[default]
    Idle,
    Publishing,
    Published,
    Failed,
}

impl SessionState {
    /// Compute the state reached by applying `event`, or reject the event.
    ///
    /// This is the only place transitions are decided; everything else calls it.
    pub fn on(self, event: SessionEvent) -> Result<SessionState, SessionError> {
        use SessionEvent::*;
        use SessionState::*;

        match (self, event) {
            (Idle, Submit) => Ok(Publishing),
            (Publishing, Succeed) => Ok(Published),
            (Publishing, Fail) => Ok(Failed),
            (Failed, Acknowledge) => Ok(Idle),
            (from, event) => Err(SessionError::InvalidTransition { from, event }),
        }
    }

    /// Whether the input controls should accept edits in this state.
    pub fn accepts_input(self) -> bool {
        self == SessionState::Idle
    }
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SessionState::Idle => "idle",
            SessionState::Publishing => "publishing",
            SessionState::Published => "published",
            SessionState::Failed => "failed",
        };
        f.write_str(name)
    }
}

/// Inputs to the session state machine.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum SessionEvent {
    /// The user submitted a valid request
    Submit,
    /// The engine reported a published address
    Succeed,
    /// The engine reported a failure
    Fail,
    /// The user dismissed the error dialog
    Acknowledge,
}

impl fmt::Display for SessionEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SessionEvent::Submit => "submit",
            SessionEvent::Succeed => "resolve with success",
            SessionEvent::Fail => "resolve with failure",
            SessionEvent::Acknowledge => "acknowledge",
        };
        f.write_str(name)
    }
}

/// Errors raised by the session controller.
///
/// Only [`SessionError::Validation`] and [`SessionError::EngineUnavailable`] belong
/// to normal operation; the rest mean an invariant broke and the process should stop.
#[derive(Debug, Error)]
pub enum SessionError {
    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Invalid transition: cannot {event} while {from}")]
    InvalidTransition {
        from: SessionState,
        event: SessionEvent,
    },

    #[error("Failed to render address as a QR code: {0}")]
    Encoding(#[from] EncodingError),

    #[error("Publishing engine is not running")]
    EngineUnavailable,

    #[error("Publishing engine already holds an unread request")]
    EngineBusy,
}

impl SessionError {
    /// Whether the session can carry on after this error.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            SessionError::Validation(_) | SessionError::EngineUnavailable
        )
    }
}

/// Change events emitted after every accepted transition
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum StateChange {
    /// A request was handed to the engine
    PublishingStarted,

    /// The content is reachable at `address`
    Published { address: String },

    /// The engine gave up with `message`
    Failed { message: String },

    /// The user dismissed the failure and may submit again
    Reset,
}

impl StateChange {
    /// Whether the engine still owes an answer after this change.
    pub fn leaves_request_outstanding(&self) -> bool {
        matches!(self, StateChange::PublishingStarted)
    }
}

/// Drain every change already queued on `changes` and return the newest.
///
/// Lagging only drops older changes, so the result is exact either way.
pub fn latest_change(changes: &mut broadcast::Receiver<StateChange>) -> Option<StateChange> {
    let mut latest = None;
    loop {
        match changes.try_recv() {
            Ok(change) => {
                tracing::debug!("Session change: {:?}", change);
                latest = Some(change);
            }
            Err(TryRecvError::Lagged(skipped)) => {
                tracing::debug!("Skipped {} older session changes", skipped);
            }
            Err(TryRecvError::Empty | TryRecvError::Closed) => return latest,
        }
    }
}

/// Thread-safe owner of the session state with event emission
///
/// Every mutator runs the pure [`SessionState::on`] transition under the write
/// lock, so a rejected event leaves the state untouched. Accepted transitions are
/// broadcast as [`StateChange`] events; it's fine if nobody listens.
///
/// Clones share the same state.
#[derive(Clone)]
pub struct SessionManager {
    state: Arc<RwLock<SessionState>>,

    /// Broadcast channel for state change events
    state_tx: broadcast::Sender<StateChange>,
}

impl SessionManager {
    /// Create a manager in the `Idle` state with a 16-event broadcast buffer
    pub fn new() -> Self {
        let (state_tx, _) = broadcast::channel(16);
        Self {
            state: Arc::new(RwLock::new(SessionState::Idle)),
            state_tx,
        }
    }

    /// Current state
    pub fn snapshot(&self) -> SessionState {
        *self.state.read().unwrap_or_else(PoisonError::into_inner)
    }

    /// Subscribe to state change events
    pub fn subscribe(&self) -> broadcast::Receiver<StateChange> {
        self.state_tx.subscribe()
    }

    /// `Idle -> Publishing`
    pub fn begin_publishing(&self) -> Result<StateChange, SessionError> {
        self.transition(SessionEvent::Submit, StateChange::PublishingStarted)
    }

    /// `Publishing -> Published`
    pub fn publish_succeeded(&self, address: &str) -> Result<StateChange, SessionError> {
        self.transition(
            SessionEvent::Succeed,
            StateChange::Published {
                address: address.to_string(),
            },
        )
    }

    /// `Publishing -> Failed`
    pub fn publish_failed(&self, message: &str) -> Result<StateChange, SessionError> {
        self.transition(
            SessionEvent::Fail,
            StateChange::Failed {
                message: message.to_string(),
            },
        )
    }

    /// `Failed -> Idle`
    pub fn acknowledge(&self) -> Result<StateChange, SessionError> {
        self.transition(SessionEvent::Acknowledge, StateChange::Reset)
    }

    fn transition(
        &self,
        event: SessionEvent,
        change: StateChange,
    ) -> Result<StateChange, SessionError> {
        let mut state = self.state.write().unwrap_or_else(PoisonError::into_inner);
        let from = *state;
        let to = from.on(event)?;
        *state = to;
        drop(state);

        tracing::debug!("Session transition: {} --{}--> {}", from, event, to);

        // Ignore send errors - it's OK if no one is listening
        let _ = self.state_tx.send(change.clone());

        Ok(change)
    }
}

impl Default for SessionManager {
    fn default() -> Self {
        Self::new()
    }
}
