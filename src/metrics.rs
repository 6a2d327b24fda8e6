// Session metrics module
//
// Lightweight counters for what the session controller did during a run

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

/// Session controller counters
///
/// Uses atomic operations so the dispatcher (UI thread), the result listener
/// (worker thread) and the marshaler can all record without locks.
/// The summary is logged on shutdown.
#[derive(Debug)]
pub struct Metrics {
    /// Submissions received from the input surface
    pub submissions: AtomicU64,

    /// Submissions dropped by validation (empty path)
    pub submissions_ignored: AtomicU64,

    /// Requests actually sent to the engine
    pub requests_sent: AtomicU64,

    /// Publish results received from the engine
    pub results_received: AtomicU64,

    /// Publish errors received from the engine
    pub errors_received: AtomicU64,

    /// Tasks marshaled onto the UI thread
    pub ui_tasks_scheduled: AtomicU64,

    /// Tasks that could not be marshaled because the UI loop had stopped
    pub ui_tasks_dropped: AtomicU64,

    /// Application start time
    start_time: Instant,
}

impl Metrics {
    pub fn new() -> Self {
        Self {
            submissions: AtomicU64::new(0),
            submissions_ignored: AtomicU64::new(0),
            requests_sent: AtomicU64::new(0),
            results_received: AtomicU64::new(0),
            errors_received: AtomicU64::new(0),
            ui_tasks_scheduled: AtomicU64::new(0),
            ui_tasks_dropped: AtomicU64::new(0),
            start_time: Instant::now(),
        }
    }

    pub fn record_submission(&self) {
        self.submissions.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_submission_ignored(&self) {
        self.submissions_ignored.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_request_sent(&self) {
        self.requests_sent.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_result(&self) {
        self.results_received.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_error(&self) {
        self.errors_received.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_ui_task(&self) {
        self.ui_tasks_scheduled.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_ui_task_dropped(&self) {
        self.ui_tasks_dropped.fetch_add(1, Ordering::Relaxed);
    }

    /// Requests sent but not yet answered by the engine
    pub fn outstanding_requests(&self) -> u64 {
        let sent = self.requests_sent.load(Ordering::Relaxed);
        let answered = self.results_received.load(Ordering::Relaxed)
            + self.errors_received.load(Ordering::Relaxed);
        sent.saturating_sub(answered)
    }

    pub fn uptime(&self) -> Duration {
        self.start_time.elapsed()
    }

    /// Log metrics summary
    pub fn log_summary(&self) {
        tracing::info!("=== Session Metrics Summary ===");
        tracing::info!("Uptime: {:.2}s", self.uptime().as_secs_f64());
        tracing::info!(
            "Submissions: {} ({} ignored), requests sent: {}",
            self.submissions.load(Ordering::Relaxed),
            self.submissions_ignored.load(Ordering::Relaxed),
            self.requests_sent.load(Ordering::Relaxed)
        );
        tracing::info!(
            "Engine replies: {} published, {} failed, {} outstanding",
            self.results_received.load(Ordering::Relaxed),
            self.errors_received.load(Ordering::Relaxed),
            self.outstanding_requests()
        );
        tracing::info!(
            "UI tasks: {} scheduled, {} dropped",
            self.ui_tasks_scheduled.load(Ordering::Relaxed),
            self.ui_tasks_dropped.load(Ordering::Relaxed)
        );
    }
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}
