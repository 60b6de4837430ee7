//! Query submission

use std::sync::{Arc, Mutex, MutexGuard};

use tracing::{debug, info, warn};

use super::classifier::{Failure, Operation};
use super::history::{HistoryLogger, QueryHistory};
use crate::service::{InsightService, QueryResult};

#[derive(Debug, Default)]
struct EngineState {
    current: Option<QueryResult>,
    current_query: Option<String>,
    history: QueryHistory,
    /// Bumped by `reset`; a response from an older session is not recorded.
    session: u64,
}

/// Submits queries and keeps the latest result and the session history.
///
/// There is no in-flight limit. Two concurrent submissions are both valid;
/// whichever response lands last becomes the current result.
pub struct QueryEngine {
    service: Arc<dyn InsightService>,
    logger: HistoryLogger,
    state: Mutex<EngineState>,
}

impl QueryEngine {
    /// Creates an engine with an empty history.
    pub fn new(service: Arc<dyn InsightService>, logger: HistoryLogger) -> Self {
        Self {
            service,
            logger,
            state: Mutex::new(EngineState::default()),
        }
    }

    fn state(&self) -> MutexGuard<'_, EngineState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Runs `query_text` against `source_id`.
    ///
    /// Blank input fails with a validation failure and sends nothing. On
    /// success the result replaces the current one, the query is appended to
    /// history, and a best-effort log call is started without being awaited.
    /// On failure the current result and history are left untouched. A
    /// response landing after [`reset`](Self::reset) is returned but neither
    /// recorded nor logged.
    ///
    /// # Errors
    ///
    /// Returns a [`Failure`] classified from the service's message, or a
    /// validation failure for blank input.
    pub async fn submit(&self, query_text: &str, source_id: &str) -> Result<QueryResult, Failure> {
        if query_text.trim().is_empty() {
            return Err(Failure::validation(
                Operation::Query,
                "Please enter a query",
            ));
        }

        let session = self.state().session;
        let result = match self.service.run_query(query_text, source_id).await {
            Ok(result) => result,
            Err(e) => {
                let failure = Failure::from_service(Operation::Query, &e);
                warn!(kind = %failure.kind, error = %e, "Query failed");
                return Err(failure);
            }
        };

        if !result.has_uniform_columns() {
            warn!("Result rows do not share one column set; rendering uses the first row's columns");
        }
        info!(rows = result.row_count(), source = %source_id, "Query succeeded");

        {
            let mut state = self.state();
            if state.session != session {
                debug!("Session ended while the query was running; result not recorded");
                return Ok(result);
            }
            state.current = Some(result.clone());
            state.current_query = Some(query_text.to_string());
            state.history.push(query_text);
        }

        self.logger.log_best_effort(query_text);

        Ok(result)
    }

    /// The latest successful result.
    pub fn current_result(&self) -> Option<QueryResult> {
        self.state().current.clone()
    }

    /// The query text that produced [`current_result`](Self::current_result).
    pub fn current_query(&self) -> Option<String> {
        self.state().current_query.clone()
    }

    /// Snapshot of the session history.
    pub fn history(&self) -> QueryHistory {
        self.state().history.clone()
    }

    /// Drops the current result and history.
    pub fn reset(&self) {
        let mut state = self.state();
        state.current = None;
        state.current_query = None;
        state.history.clear();
        state.session += 1;
    }
}
