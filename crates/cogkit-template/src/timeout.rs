//! Time-bounded rendering.
//!
//! A render runs on a worker (a dedicated thread for the blocking API, the
//! tokio blocking pool for the async API) while the caller waits for at most
//! the render budget. If the budget runs out, the caller gets
//! [`RenderError::TimedOut`] right away and the worker is abandoned. The
//! worker shares a [`Deadline`] with the caller and checks it at every node,
//! loop iteration, and filter call, so an abandoned worker stops on its own
//! shortly after.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{mpsc, Arc};
use std::thread;
use std::time::{Duration, Instant};

use cogkit_core::error::RenderError;

/// A render deadline shared between the caller and the render worker.
#[derive(Debug, Clone)]
pub struct Deadline {
    inner: Arc<DeadlineInner>,
}

#[derive(Debug)]
struct DeadlineInner {
    expires_at: Option<Instant>,
    budget: Duration,
    cancelled: AtomicBool,
}

impl Deadline {
    /// A deadline that never expires unless cancelled.
    pub fn unbounded() -> Self {
        Self::new(None, Duration::MAX)
    }

    /// A deadline that expires `budget` from now.
    pub fn after(budget: Duration) -> Self {
        Self::new(Instant::now().checked_add(budget), budget)
    }

    fn new(expires_at: Option<Instant>, budget: Duration) -> Self {
        Self {
            inner: Arc::new(DeadlineInner {
                expires_at,
                budget,
                cancelled: AtomicBool::new(false),
            }),
        }
    }

    /// Marks the deadline as passed, regardless of the clock.
    pub fn cancel(&self) {
        self.inner.cancelled.store(true, Ordering::Relaxed);
    }

    /// Returns `true` once the deadline has passed or was cancelled.
    pub fn is_expired(&self) -> bool {
        self.inner.cancelled.load(Ordering::Relaxed)
            || self
                .inner
                .expires_at
                .is_some_and(|at| Instant::now() >= at)
    }

    /// Returns [`RenderError::TimedOut`] once the deadline has passed.
    pub fn check(&self) -> Result<(), RenderError> {
        if self.is_expired() {
            Err(RenderError::TimedOut {
                budget: self.inner.budget,
            })
        } else {
            Ok(())
        }
    }

    /// The budget this deadline was created with.
    pub fn budget(&self) -> Duration {
        self.inner.budget
    }
}

/// Runs `job` on a dedicated worker thread, waiting at most `budget`.
///
/// The job receives the deadline and is expected to check it. On timeout the
/// deadline is cancelled and the thread is left to wind down by itself; its
/// result is discarded.
pub fn run_with_deadline<F>(budget: Duration, job: F) -> Result<String, RenderError>
where
    F: FnOnce(&Deadline) -> Result<String, RenderError> + Send + 'static,
{
    let deadline = Deadline::after(budget);
    let worker_deadline = deadline.clone();
    let (tx, rx) = mpsc::channel();

    thread::Builder::new()
        .name("cogkit-render".to_string())
        .spawn(move || {
            // The receiver is gone if the caller already timed out.
            tx.send(job(&worker_deadline)).ok();
        })
        .map_err(|e| RenderError::evaluation(format!("could not start render worker: {e}")))?;

    match rx.recv_timeout(budget) {
        Ok(result) => finished(budget, result),
        Err(mpsc::RecvTimeoutError::Timeout) => abandoned(budget, &deadline),
        Err(mpsc::RecvTimeoutError::Disconnected) => {
            tracing::warn!("Template render worker panicked");
            Err(RenderError::evaluation("render worker stopped unexpectedly"))
        }
    }
}

/// Runs `job` on the tokio blocking pool, waiting at most `budget`.
///
/// Same contract as [`run_with_deadline`], for callers inside an async
/// runtime.
pub async fn run_with_deadline_async<F>(budget: Duration, job: F) -> Result<String, RenderError>
where
    F: FnOnce(&Deadline) -> Result<String, RenderError> + Send + 'static,
{
    let deadline = Deadline::after(budget);
    let worker_deadline = deadline.clone();
    let handle = tokio::task::spawn_blocking(move || job(&worker_deadline));

    match tokio::time::timeout(budget, handle).await {
        Ok(Ok(result)) => finished(budget, result),
        Ok(Err(join_error)) => {
            tracing::warn!(error = %join_error, "Template render worker panicked");
            Err(RenderError::evaluation("render worker stopped unexpectedly"))
        }
        Err(_elapsed) => abandoned(budget, &deadline),
    }
}

/// Passes on the worker's result, reporting a worker that hit the deadline
/// before the caller gave up on it.
fn finished(budget: Duration, result: Result<String, RenderError>) -> Result<String, RenderError> {
    if result.as_ref().is_err_and(RenderError::is_timeout) {
        tracing::warn!(
            budget_ms = budget.as_millis(),
            "Template render timed out; worker stopped at the deadline"
        );
    }
    result
}

/// Gives up on a worker that is still running.
fn abandoned(budget: Duration, deadline: &Deadline) -> Result<String, RenderError> {
    deadline.cancel();
    tracing::warn!(
        budget_ms = budget.as_millis(),
        "Template render timed out; abandoning worker"
    );
    Err(RenderError::TimedOut { budget })
}

#[cfg(test)]
mod tests {
    use std::io;
    use std::sync::Mutex;

    use super::*;

    /// Collects formatted log lines for assertions.
    #[derive(Clone, Default)]
    struct LogBuffer(Arc<Mutex<Vec<u8>>>);

    impl LogBuffer {
        fn contents(&self) -> String {
            String::from_utf8_lossy(&self.0.lock().unwrap()).into_owned()
        }
    }

    impl io::Write for LogBuffer {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    /// Runs `f` with a subscriber that writes into the returned buffer.
    fn with_logs<T>(f: impl FnOnce() -> T) -> (T, String) {
        let buffer = LogBuffer::default();
        let writer = buffer.clone();
        let subscriber = tracing_subscriber::fmt()
            .with_ansi(false)
            .with_writer(move || writer.clone())
            .finish();
        let value = tracing::subscriber::with_default(subscriber, f);
        (value, buffer.contents())
    }

    /// Spins until the deadline passes, the way a runaway render would.
    fn spin(deadline: &Deadline) -> Result<String, RenderError> {
        loop {
            deadline.check()?;
            std::hint::spin_loop();
        }
    }

    #[test]
    fn test_unbounded_deadline_never_expires() {
        let deadline = Deadline::unbounded();
        assert!(!deadline.is_expired());
        assert!(deadline.check().is_ok());
    }

    #[test]
    fn test_deadline_expires() {
        let deadline = Deadline::after(Duration::from_millis(5));
        thread::sleep(Duration::from_millis(20));
        assert!(deadline.is_expired());
        assert_eq!(
            deadline.check(),
            Err(RenderError::TimedOut {
                budget: Duration::from_millis(5)
            })
        );
    }

    #[test]
    fn test_cancel_is_shared_between_clones() {
        let deadline = Deadline::after(Duration::from_secs(60));
        let clone = deadline.clone();
        clone.cancel();
        assert!(deadline.is_expired());
        assert_eq!(deadline.budget(), Duration::from_secs(60));
    }

    #[test]
    fn test_run_completes_within_budget() {
        let result = run_with_deadline(Duration::from_secs(2), |_| Ok("done".to_string()));
        assert_eq!(result.unwrap(), "done");
    }

    #[test]
    fn test_run_propagates_job_error() {
        let result =
            run_with_deadline(Duration::from_secs(2), |_| Err(RenderError::evaluation("boom")));
        assert_eq!(result, Err(RenderError::evaluation("boom")));
    }

    #[test]
    fn test_run_times_out_cooperative_job() {
        let result = run_with_deadline(Duration::from_millis(50), spin);
        assert!(result.unwrap_err().is_timeout());
    }

    #[test]
    fn test_run_returns_at_deadline_for_stuck_job() {
        let started = Instant::now();
        let result = run_with_deadline(Duration::from_millis(50), |_| {
            thread::sleep(Duration::from_millis(600));
            Ok("late".to_string())
        });
        assert!(result.unwrap_err().is_timeout());
        assert!(started.elapsed() < Duration::from_millis(500));
    }

    #[test]
    fn test_run_logs_job_that_stops_at_deadline() {
        let budget = Duration::from_secs(2);
        let (result, logs) = with_logs(|| {
            run_with_deadline(budget, |deadline| {
                Err(RenderError::TimedOut {
                    budget: deadline.budget(),
                })
            })
        });
        assert_eq!(result, Err(RenderError::TimedOut { budget }));
        assert!(logs.contains("WARN"), "{logs}");
        assert!(logs.contains("worker stopped at the deadline"), "{logs}");
    }

    #[test]
    fn test_run_logs_abandoned_job() {
        let (result, logs) = with_logs(|| run_with_deadline(Duration::from_millis(50), spin));
        assert!(result.unwrap_err().is_timeout());
        assert!(logs.contains("abandoning worker"), "{logs}");
    }

    #[test]
    fn test_run_does_not_warn_on_success() {
        let (result, logs) = with_logs(|| {
            run_with_deadline(Duration::from_secs(2), |_| Ok("done".to_string()))
        });
        assert_eq!(result.unwrap(), "done");
        assert!(!logs.contains("WARN"), "{logs}");
    }

    #[test]
    fn test_run_reports_panicking_job() {
        let result = run_with_deadline(Duration::from_secs(2), |_| panic!("worker blew up"));
        assert!(matches!(result, Err(RenderError::Evaluation { .. })));
    }

    #[tokio::test]
    async fn test_async_run_completes() {
        let result =
            run_with_deadline_async(Duration::from_secs(2), |_| Ok("done".to_string())).await;
        assert_eq!(result.unwrap(), "done");
    }

    #[tokio::test]
    async fn test_async_run_times_out() {
        let result = run_with_deadline_async(Duration::from_millis(50), spin).await;
        assert!(result.unwrap_err().is_timeout());
    }

    #[tokio::test]
    async fn test_async_run_reports_panicking_job() {
        let result =
            run_with_deadline_async(Duration::from_secs(2), |_| panic!("worker blew up")).await;
        assert!(matches!(result, Err(RenderError::Evaluation { .. })));
    }
}
