//! Integration tests for the session controller
//!
//! These tests drive the controller the way the window does: submissions go
//! through SessionContext, the engine side of the channels is played by the
//! test, and engine events come back through the ResultListener and the
//! marshaler before they touch the (recording) view.

use onionize_gui::metrics::Metrics;
use onionize_gui::models::{ContentMode, PublishError, PublishResult, RawInputs};
use onionize_gui::services::code_image::Bitmap;
use onionize_gui::services::{EngineSide, channels};
use onionize_gui::state::{SessionError, SessionManager, SessionState, StateChange};
use onionize_gui::ui::{
    ACTION_LABEL, BUSY_LABEL, Dispatcher, EngineEvent, EngineSettings, ResultListener,
    SessionContext, SessionMachine, SessionView, TaskQueue, bridge,
};
use proptest::prelude::*;
use std::cell::RefCell;
use std::rc::Rc;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use tokio::time::{Duration, timeout};

/// What the window would currently show
#[derive(Debug, Default)]
struct Screen {
    inputs_enabled: bool,
    action_label: String,
    address: Option<String>,
    image: Option<Bitmap>,
    error: Option<String>,
}

/// View that records the latest value of every widget it would touch
#[derive(Clone)]
struct RecordingView {
    screen: Rc<RefCell<Screen>>,
}

impl RecordingView {
    fn new() -> Self {
        Self {
            screen: Rc::new(RefCell::new(Screen {
                inputs_enabled: true,
                action_label: ACTION_LABEL.to_string(),
                ..Screen::default()
            })),
        }
    }
}

impl SessionView for RecordingView {
    fn set_inputs_enabled(&self, enabled: bool) {
        self.screen.borrow_mut().inputs_enabled = enabled;
    }

    fn set_action_label(&self, label: &str) {
        self.screen.borrow_mut().action_label = label.to_string();
    }

    fn show_published(&self, address: &str, image: &Bitmap) {
        let mut screen = self.screen.borrow_mut();
        screen.address = Some(address.to_string());
        screen.image = Some(image.clone());
    }

    fn show_error(&self, message: &str) {
        self.screen.borrow_mut().error = Some(message.to_string());
    }

    fn dismiss_error(&self) {
        self.screen.borrow_mut().error = None;
    }
}

type Context = SessionContext<RecordingView>;

struct Harness {
    context: Context,
    queue: TaskQueue<Context>,
    screen: Rc<RefCell<Screen>>,
    engine: EngineSide,
    session: SessionManager,
    wakes: Arc<AtomicUsize>,
    metrics: Arc<Metrics>,
}

impl Harness {
    /// Wire everything up; the listener runs on the current tokio runtime.
    fn start() -> Self {
        let (endpoints, engine) = channels();
        let metrics = Arc::new(Metrics::new());
        let session = SessionManager::new();
        let view = RecordingView::new();
        let screen = view.screen.clone();

        let wakes = Arc::new(AtomicUsize::new(0));
        let counter = wakes.clone();
        let (marshaler, queue) = bridge::channel::<Context>(
            move || {
                counter.fetch_add(1, Ordering::SeqCst);
            },
            metrics.clone(),
        );

        let settings = EngineSettings {
            control_address: "default://".to_string(),
            control_password: String::new(),
            debug: false,
        };
        let dispatcher = Dispatcher::new(endpoints.commands, settings, metrics.clone());
        let machine = SessionMachine::new(session.clone(), view);
        let context = SessionContext::new(machine, dispatcher);

        ResultListener::new(endpoints.results, endpoints.errors, marshaler, metrics.clone())
            .spawn(&tokio::runtime::Handle::current());

        Self {
            context,
            queue,
            screen,
            engine,
            session,
            wakes,
            metrics,
        }
    }

    /// Drain marshaled tasks until one has run, like the UI loop would after a wake.
    async fn pump(&mut self) -> usize {
        let deadline = tokio::time::Instant::now() + Duration::from_secs(2);
        loop {
            let ran = self.queue.drain(&mut self.context);
            if ran > 0 {
                return ran;
            }
            assert!(
                tokio::time::Instant::now() < deadline,
                "Timeout waiting for a marshaled task"
            );
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    }
}

fn inputs(path: &str, mode: ContentMode) -> RawInputs {
    RawInputs {
        path: path.to_string(),
        mode,
        slug: true,
        passphrase: String::new(),
    }
}

#[tokio::test]
async fn test_empty_path_sends_nothing() {
    let mut harness = Harness::start();

    harness.context.submit(inputs("", ContentMode::File)).unwrap();

    assert_eq!(harness.context.state(), SessionState::Idle);
    assert!(harness.engine.commands.try_recv().is_err());
    assert!(harness.screen.borrow().inputs_enabled);
}

#[tokio::test]
async fn test_successful_publish_shows_address_and_code() {
    let mut harness = Harness::start();

    harness
        .context
        .submit(inputs("/home/user/notes.txt", ContentMode::File))
        .unwrap();

    assert_eq!(harness.context.state(), SessionState::Publishing);
    assert!(!harness.screen.borrow().inputs_enabled);
    assert_eq!(harness.screen.borrow().action_label, BUSY_LABEL);

    let request = harness.engine.commands.recv().await.unwrap();
    assert_eq!(request.path, "/home/user/notes.txt");
    assert_eq!(request.mode, ContentMode::File);

    harness
        .engine
        .results
        .send(PublishResult::new("http://abc123.onion"))
        .await
        .unwrap();

    // Nothing is applied until the UI side drains its queue
    tokio::time::sleep(Duration::from_millis(20)).await;
    assert_eq!(harness.context.state(), SessionState::Publishing);

    assert_eq!(harness.pump().await, 1);

    assert_eq!(harness.context.state(), SessionState::Published);
    let screen = harness.screen.borrow();
    assert_eq!(screen.address.as_deref(), Some("http://abc123.onion"));
    assert!(screen.image.is_some());
    assert!(screen.error.is_none());
    assert!(harness.wakes.load(Ordering::SeqCst) >= 1);
}

#[tokio::test]
async fn test_failed_publish_shows_error_until_acknowledged() {
    let mut harness = Harness::start();

    harness
        .context
        .submit(inputs("/srv/www", ContentMode::Directory))
        .unwrap();
    harness.engine.commands.recv().await.unwrap();

    harness
        .engine
        .errors
        .send(PublishError::new("connection refused"))
        .await
        .unwrap();
    harness.pump().await;

    assert_eq!(harness.context.state(), SessionState::Failed);
    assert_eq!(
        harness.screen.borrow().error.as_deref(),
        Some("connection refused")
    );
    assert!(!harness.screen.borrow().inputs_enabled);

    harness.context.acknowledge().unwrap();

    assert_eq!(harness.context.state(), SessionState::Idle);
    let screen = harness.screen.borrow();
    assert!(screen.error.is_none());
    assert!(screen.inputs_enabled);
    assert_eq!(screen.action_label, ACTION_LABEL);
}

#[tokio::test]
async fn test_unencodable_address_is_recorded_as_fatal() {
    let mut harness = Harness::start();

    harness
        .context
        .submit(inputs("/srv/www", ContentMode::Directory))
        .unwrap();
    harness.engine.commands.recv().await.unwrap();

    let address = format!("http://{}.onion", "a".repeat(4000));
    harness
        .engine
        .results
        .send(PublishResult::new(address))
        .await
        .unwrap();
    harness.pump().await;

    assert!(matches!(
        harness.context.take_fatal(),
        Some(SessionError::Encoding(_))
    ));
    // Taken once; the controller stops the loop after reading it
    assert!(harness.context.take_fatal().is_none());

    assert_eq!(harness.context.state(), SessionState::Publishing);
    let screen = harness.screen.borrow();
    assert!(screen.address.is_none());
    assert!(screen.image.is_none());
    assert!(screen.error.is_none());
}

#[tokio::test]
async fn test_back_to_back_submissions_send_once() {
    let mut harness = Harness::start();

    harness
        .context
        .submit(inputs("/srv/a.zip", ContentMode::Archive))
        .unwrap();
    let second = harness
        .context
        .submit(inputs("/srv/b.zip", ContentMode::Archive));

    assert!(matches!(
        second,
        Err(SessionError::InvalidTransition {
            from: SessionState::Publishing,
            ..
        })
    ));

    let first = harness.engine.commands.recv().await.unwrap();
    assert_eq!(first.path, "/srv/a.zip");
    assert!(harness.engine.commands.try_recv().is_err());
    assert_eq!(harness.metrics.requests_sent.load(Ordering::Relaxed), 1);
    assert_eq!(harness.context.state(), SessionState::Publishing);
}

#[tokio::test]
async fn test_state_changes_are_broadcast() {
    let mut harness = Harness::start();
    let mut rx = harness.session.subscribe();

    harness
        .context
        .submit(inputs("/srv/www", ContentMode::Directory))
        .unwrap();
    harness.engine.commands.recv().await.unwrap();
    harness
        .engine
        .results
        .send(PublishResult::new("http://abc123.onion"))
        .await
        .unwrap();
    harness.pump().await;

    let started = timeout(Duration::from_millis(100), rx.recv())
        .await
        .expect("Timeout waiting for event")
        .expect("Channel closed");
    assert_eq!(started, StateChange::PublishingStarted);

    let published = timeout(Duration::from_millis(100), rx.recv())
        .await
        .expect("Timeout waiting for event")
        .expect("Channel closed");
    assert_eq!(
        published,
        StateChange::Published {
            address: "http://abc123.onion".to_string()
        }
    );
}

#[tokio::test]
async fn test_new_session_after_failure() {
    let mut harness = Harness::start();

    harness
        .context
        .submit(inputs("/srv/www", ContentMode::Directory))
        .unwrap();
    harness.engine.commands.recv().await.unwrap();
    harness
        .engine
        .errors
        .send(PublishError::new("connection refused"))
        .await
        .unwrap();
    harness.pump().await;
    harness.context.acknowledge().unwrap();

    harness
        .context
        .submit(inputs("/srv/www", ContentMode::Directory))
        .unwrap();

    assert_eq!(harness.context.state(), SessionState::Publishing);
    assert!(harness.engine.commands.recv().await.is_some());
}

#[tokio::test]
async fn test_stopped_engine_surfaces_as_error() {
    let mut harness = Harness::start();
    harness.engine.commands.close();

    harness
        .context
        .submit(inputs("/srv/www", ContentMode::Directory))
        .unwrap();

    assert_eq!(harness.context.state(), SessionState::Failed);
    assert_eq!(
        harness.screen.borrow().error.as_deref(),
        Some("Publishing engine is not running")
    );
}

/// One step of a randomized session
#[derive(Debug, Clone)]
enum Step {
    Submit,
    EmptySubmit,
    Succeed,
    Fail,
    Acknowledge,
}

fn step() -> impl Strategy<Value = Step> {
    prop_oneof![
        Just(Step::Submit),
        Just(Step::EmptySubmit),
        Just(Step::Succeed),
        Just(Step::Fail),
        Just(Step::Acknowledge),
    ]
}

proptest! {
    /// No second request is ever sent while one is outstanding, and every
    /// request that gets an answer leaves the session Published or Failed.
    #[test]
    fn prop_single_flight(steps in prop::collection::vec(step(), 1..40)) {
        let (endpoints, mut engine) = channels();
        let metrics = Arc::new(Metrics::new());
        let settings = EngineSettings {
            control_address: "default://".to_string(),
            control_password: String::new(),
            debug: false,
        };
        let dispatcher = Dispatcher::new(endpoints.commands, settings, metrics);
        let machine = SessionMachine::new(SessionManager::new(), RecordingView::new());
        let mut context = SessionContext::new(machine, dispatcher);

        let mut outstanding = 0usize;

        for step in steps {
            match step {
                Step::Submit => {
                    let before = context.state();
                    let result = context.submit(inputs("/srv/www", ContentMode::Directory));
                    if engine.commands.try_recv().is_ok() {
                        outstanding += 1;
                    }
                    prop_assert!(outstanding <= 1);
                    if before == SessionState::Idle {
                        prop_assert!(result.is_ok());
                        prop_assert_eq!(context.state(), SessionState::Publishing);
                    } else {
                        prop_assert!(result.is_err());
                        prop_assert_eq!(context.state(), before);
                    }
                }
                Step::EmptySubmit => {
                    let before = context.state();
                    let _ = context.submit(inputs("  ", ContentMode::File));
                    prop_assert!(engine.commands.try_recv().is_err());
                    prop_assert_eq!(context.state(), before);
                }
                Step::Succeed | Step::Fail if outstanding == 1 => {
                    let event = if matches!(step, Step::Succeed) {
                        EngineEvent::Published(PublishResult::new("http://abc123.onion"))
                    } else {
                        EngineEvent::Failed(PublishError::new("connection refused"))
                    };
                    context.handle_event(event).unwrap();
                    outstanding = 0;
                    prop_assert!(matches!(
                        context.state(),
                        SessionState::Published | SessionState::Failed
                    ));
                }
                Step::Succeed | Step::Fail => {}
                Step::Acknowledge => {
                    let before = context.state();
                    let result = context.acknowledge();
                    prop_assert_eq!(result.is_ok(), before == SessionState::Failed);
                    if before == SessionState::Failed {
                        prop_assert_eq!(context.state(), SessionState::Idle);
                    }
                }
            }
        }
    }
}
