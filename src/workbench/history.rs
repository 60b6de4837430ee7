//! Session query history and best-effort server-side logging

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Mutex;
use tokio_util::task::TaskTracker;
use tracing::debug;

use crate::service::InsightService;

/// Queries submitted successfully during this session, oldest first.
///
/// Unbounded; only the view returned by [`QueryHistory::recent`] is capped.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QueryHistory {
    entries: Vec<String>,
}

impl QueryHistory {
    /// Creates an empty history.
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a query.
    pub fn push(&mut self, query_text: impl Into<String>) {
        self.entries.push(query_text.into());
    }

    /// All entries, oldest first.
    pub fn entries(&self) -> &[String] {
        &self.entries
    }

    /// The last `limit` entries, newest first.
    ///
    /// # Examples
    ///
    /// ```
    /// use insighthub::workbench::QueryHistory;
    ///
    /// let mut history = QueryHistory::new();
    /// for q in ["a", "b", "c"] {
    ///     history.push(q);
    /// }
    /// assert_eq!(history.recent(2), vec!["c", "b"]);
    /// ```
    pub fn recent(&self, limit: usize) -> Vec<&str> {
        self.entries
            .iter()
            .rev()
            .take(limit)
            .map(String::as_str)
            .collect()
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether nothing has been submitted yet.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Drops every entry.
    pub fn clear(&mut self) {
        self.entries.clear();
    }
}

/// Fire-and-forget recorder of submitted queries.
///
/// Each call runs on its own detached task. Errors are caught and logged at
/// the task boundary; nothing is returned to the caller and nothing is
/// retried.
#[derive(Clone)]
pub struct HistoryLogger {
    service: Arc<dyn InsightService>,
    tasks: TaskTracker,
    /// Held across close/wait/reopen so concurrent flushes do not interleave.
    flushing: Arc<Mutex<()>>,
}

impl HistoryLogger {
    /// Creates a logger that records through `service`.
    pub fn new(service: Arc<dyn InsightService>) -> Self {
        Self {
            service,
            tasks: TaskTracker::new(),
            flushing: Arc::new(Mutex::new(())),
        }
    }

    /// Records `query_text` in the background.
    ///
    /// Returns immediately. Must be called from within a Tokio runtime.
    pub fn log_best_effort(&self, query_text: &str) {
        let service = Arc::clone(&self.service);
        let query_text = query_text.to_string();

        let _detached = self.tasks.spawn(async move {
            match service.log_history(&query_text).await {
                Ok(()) => debug!("Query logged to history"),
                Err(e) => debug!(error = %e, "Failed to log query history"),
            }
        });
    }

    /// Number of log calls still running.
    pub fn pending(&self) -> usize {
        self.tasks.len()
    }

    /// Waits up to `timeout` for pending log calls to finish.
    ///
    /// Returns `true` if everything finished. Calls still running when the
    /// timeout expires are abandoned. New calls can still be made afterwards.
    /// Concurrent flushes run one after another.
    pub async fn flush(&self, timeout: Duration) -> bool {
        let _flushing = self.flushing.lock().await;
        self.tasks.close();
        let finished = tokio::time::timeout(timeout, self.tasks.wait())
            .await
            .is_ok();
        self.tasks.reopen();
        if !finished {
            debug!(pending = self.pending(), "Gave up waiting for history log calls");
        }
        finished
    }
}
