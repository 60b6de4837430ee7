//! AI insight generation

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use tracing::{info, warn};

use super::classifier::{Failure, Operation};
use super::navigation::Navigator;
use crate::service::{Insight, InsightService, Row};

/// Requests AI analysis of result rows.
pub struct InsightGenerator {
    service: Arc<dyn InsightService>,
    navigator: Arc<dyn Navigator>,
    pending: AtomicUsize,
}

/// Decrements the pending count however the request ends.
struct PendingGuard<'a>(&'a AtomicUsize);

impl<'a> PendingGuard<'a> {
    fn enter(counter: &'a AtomicUsize) -> Self {
        counter.fetch_add(1, Ordering::SeqCst);
        Self(counter)
    }
}

impl Drop for PendingGuard<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

impl InsightGenerator {
    /// Creates a generator that reports plan restrictions to `navigator`.
    pub fn new(service: Arc<dyn InsightService>, navigator: Arc<dyn Navigator>) -> Self {
        Self {
            service,
            navigator,
            pending: AtomicUsize::new(0),
        }
    }

    /// Analyzes `rows`, giving the service `query_text` as context.
    ///
    /// Like export, the request is always sent regardless of the local plan,
    /// and an entitlement failure also sends the user to pricing.
    ///
    /// # Errors
    ///
    /// Validation failure for empty `rows` (nothing is sent); otherwise the
    /// classified service failure.
    pub async fn analyze(&self, rows: &[Row], query_text: &str) -> Result<Insight, Failure> {
        if rows.is_empty() {
            return Err(Failure::validation(
                Operation::Insights,
                "No data to analyze",
            ));
        }

        let _pending = PendingGuard::enter(&self.pending);
        match self.service.analyze(rows, query_text).await {
            Ok(insight) => {
                info!(
                    insights = insight.insights.len(),
                    recommendations = insight.recommendations.len(),
                    "AI insights generated"
                );
                Ok(insight)
            }
            Err(e) => {
                let failure = Failure::from_service(Operation::Insights, &e);
                warn!(kind = %failure.kind, error = %e, "AI insights failed");
                if failure.is_entitlement() {
                    self.navigator.to_pricing(&failure);
                }
                Err(failure)
            }
        }
    }

    /// Whether an analysis request is in flight.
    pub fn is_analyzing(&self) -> bool {
        self.pending.load(Ordering::SeqCst) > 0
    }
}
