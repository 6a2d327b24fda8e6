//! Result listener: waits for engine replies off the UI thread and marshals them over.

use crate::metrics::Metrics;
use crate::models::{PublishError, PublishResult};
use crate::ui::bridge::Marshaler;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

/// A terminal engine event, whichever channel it arrived on
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EngineEvent {
    Published(PublishResult),
    Failed(PublishError),
}

/// The UI-thread side that consumes engine events.
pub trait OutcomeSink: 'static {
    fn deliver(&mut self, event: EngineEvent);
}

/// Owns both inbound engine channels and forwards every event to the UI thread.
///
/// The listener never touches widgets: it only schedules a task through the
/// [`Marshaler`], and that task does the work on the owner thread.
pub struct ResultListener<C> {
    results: mpsc::Receiver<PublishResult>,
    errors: mpsc::Receiver<PublishError>,
    marshaler: Marshaler<C>,
    metrics: Arc<Metrics>,
}

impl<C: OutcomeSink> ResultListener<C> {
    pub fn new(
        results: mpsc::Receiver<PublishResult>,
        errors: mpsc::Receiver<PublishError>,
        marshaler: Marshaler<C>,
        metrics: Arc<Metrics>,
    ) -> Self {
        Self {
            results,
            errors,
            marshaler,
            metrics,
        }
    }

    /// Run the listener on a tokio worker for the rest of the process.
    pub fn spawn(self, handle: &tokio::runtime::Handle) -> JoinHandle<()> {
        handle.spawn(self.run())
    }

    /// Forward events until both engine channels close or the UI loop goes away.
    pub async fn run(mut self) {
        tracing::debug!("Result listener started");

        while let Some(event) = self.next_event().await {
            match &event {
                EngineEvent::Published(result) => {
                    self.metrics.record_result();
                    tracing::info!("Engine published: {}", result.address);
                }
                EngineEvent::Failed(error) => {
                    self.metrics.record_error();
                    tracing::warn!("Engine failed: {}", error);
                }
            }

            if !self
                .marshaler
                .schedule(move |sink: &mut C| sink.deliver(event))
            {
                break;
            }
        }

        tracing::debug!("Result listener terminated");
    }

    /// Wait on both channels and fold whichever fires into one event type.
    async fn next_event(&mut self) -> Option<EngineEvent> {
        tokio::select! {
            Some(result) = self.results.recv() => Some(EngineEvent::Published(result)),
            Some(error) = self.errors.recv() => Some(EngineEvent::Failed(error)),
            else => None,
        }
    }
}
