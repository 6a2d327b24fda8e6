// UI module - session controller and its Slint front-end
//
// This module contains:
// - SessionMachine / SessionView: state transitions and what the window shows for them
// - Dispatcher: turns a submission into at most one engine request
// - ResultListener: waits on the engine channels off the UI thread
// - Marshaler / TaskQueue: hands listener work back to the UI thread
// - SessionContext: everything the UI thread owns for the session
// - GuiController: wires the Slint window to all of the above

pub mod bridge;
pub mod context;
pub mod controller;
pub mod dispatcher;
pub mod listener;
pub mod machine;
pub mod view;

pub use bridge::{Marshaler, TaskQueue, Wake};
pub use context::SessionContext;
pub use controller::GuiController;
pub use dispatcher::{Dispatcher, EngineSettings};
pub use listener::{EngineEvent, OutcomeSink, ResultListener};
pub use machine::{Resolution, SessionMachine};
pub use view::{ACTION_LABEL, BUSY_LABEL, SessionView};
