// Marshaling between worker threads and the UI thread
//
// Widgets may only be touched from the thread running the Slint event loop,
// while engine results arrive on tokio worker threads. Everything that crosses
// over goes through a Marshaler: workers push boxed closures into a queue, wake
// the owner loop, and the owner drains the queue on its own thread, handing
// each closure the context object only it can reach.

use crate::metrics::Metrics;
use std::sync::Arc;
use tokio::sync::mpsc;

/// A unit of work that must run on the owner thread with access to its context `C`
pub type Task<C> = Box<dyn FnOnce(&mut C) + Send + 'static>;

/// Nudges the owner loop to drain its [`TaskQueue`] soon.
///
/// For Slint this posts a drain request with `upgrade_in_event_loop`; tests use
/// a no-op or a counter and drain by hand.
pub trait Wake: Send + Sync + 'static {
    fn wake(&self);
}

impl<F> Wake for F
where
    F: Fn() + Send + Sync + 'static,
{
    fn wake(&self) {
        self()
    }
}

/// Create a connected marshaler and owner-side queue.
///
/// The queue is unbounded so that [`Marshaler::schedule`] never blocks and never
/// drops a task while the owner is alive.
pub fn channel<C: 'static>(waker: impl Wake, metrics: Arc<Metrics>) -> (Marshaler<C>, TaskQueue<C>) {
    let (tx, rx) = mpsc::unbounded_channel();
    (
        Marshaler {
            tx,
            waker: Arc::new(waker),
            metrics,
        },
        TaskQueue { rx },
    )
}

/// Sending half: clone it freely and schedule from any thread.
pub struct Marshaler<C> {
    tx: mpsc::UnboundedSender<Task<C>>,
    waker: Arc<dyn Wake>,
    metrics: Arc<Metrics>,
}

// Manual Clone implementation to avoid requiring C: Clone
impl<C> Clone for Marshaler<C> {
    fn clone(&self) -> Self {
        Self {
            tx: self.tx.clone(),
            waker: Arc::clone(&self.waker),
            metrics: Arc::clone(&self.metrics),
        }
    }
}

impl<C: 'static> Marshaler<C> {
    /// Queue `task` to run later on the owner thread, without blocking.
    ///
    /// Tasks from one marshaler run in the order they were scheduled. Returns
    /// `false` if the owner has gone away and the task was discarded.
    pub fn schedule<F>(&self, task: F) -> bool
    where
        F: FnOnce(&mut C) + Send + 'static,
    {
        match self.tx.send(Box::new(task)) {
            Ok(()) => {
                self.metrics.record_ui_task();
                self.waker.wake();
                true
            }
            Err(_) => {
                self.metrics.record_ui_task_dropped();
                tracing::warn!("Failed to schedule UI task - owner loop has stopped");
                false
            }
        }
    }
}

/// Receiving half, owned by the UI thread.
pub struct TaskQueue<C> {
    rx: mpsc::UnboundedReceiver<Task<C>>,
}

impl<C> TaskQueue<C> {
    /// Run every task queued so far against `context`, in FIFO order.
    ///
    /// Returns how many tasks ran.
    pub fn drain(&mut self, context: &mut C) -> usize {
        let mut ran = 0;
        while let Ok(task) = self.rx.try_recv() {
            task(context);
            ran += 1;
        }
        if ran > 0 {
            tracing::trace!("Drained {} UI task(s)", ran);
        }
        ran
    }
}
