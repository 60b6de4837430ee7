//! The query workbench
//!
//! [`Workbench`] ties together the pieces a user session needs: the stored
//! credential, plan entitlement, query submission with its history, export,
//! and AI insights. Every operation goes through the [`InsightService`] trait
//! and reports failures as a classified [`Failure`].

pub mod classifier;
pub mod entitlement;
pub mod export;
pub mod history;
pub mod insight;
pub mod navigation;
pub mod query;

use std::sync::{Arc, Mutex, MutexGuard};

use tokio::task::JoinHandle;
use tracing::{info, warn};

pub use classifier::{
    classify, Failure, FailureKind, Operation, CONNECTIVITY_MARKER, ENTITLEMENT_MARKER,
};
pub use entitlement::{plan_from_token, Entitlement, EntitlementResolver, EntitlementSource};
pub use export::{deliver, export_filename, ExportArtifact, ExportPipeline};
pub use history::{HistoryLogger, QueryHistory};
pub use insight::InsightGenerator;
pub use navigation::{LogNavigator, Navigator};
pub use query::QueryEngine;

use crate::config::WorkbenchConfig;
use crate::credentials::CredentialStore;
use crate::error::Result;
use crate::service::{ExportFormat, Insight, InsightService, PlanCatalogue, QueryResult};

/// Shortest password `register` accepts.
pub const MIN_PASSWORD_LEN: usize = 6;

/// One user's workbench.
///
/// All methods take `&self`; share it behind an `Arc` when several tasks need
/// it.
pub struct Workbench {
    service: Arc<dyn InsightService>,
    credentials: Arc<dyn CredentialStore>,
    resolver: EntitlementResolver,
    logger: HistoryLogger,
    engine: QueryEngine,
    exporter: ExportPipeline,
    insights: InsightGenerator,
    current_insight: Mutex<Option<Insight>>,
    config: WorkbenchConfig,
}

impl Workbench {
    /// Creates a workbench whose upgrade prompts only go to the log.
    pub fn new(
        service: Arc<dyn InsightService>,
        credentials: Arc<dyn CredentialStore>,
        config: WorkbenchConfig,
    ) -> Self {
        Self::with_navigator(service, credentials, config, Arc::new(LogNavigator))
    }

    /// Creates a workbench that sends upgrade prompts to `navigator`.
    pub fn with_navigator(
        service: Arc<dyn InsightService>,
        credentials: Arc<dyn CredentialStore>,
        config: WorkbenchConfig,
        navigator: Arc<dyn Navigator>,
    ) -> Self {
        let logger = HistoryLogger::new(Arc::clone(&service));
        Self {
            resolver: EntitlementResolver::new(Arc::clone(&service)),
            engine: QueryEngine::new(Arc::clone(&service), logger.clone()),
            exporter: ExportPipeline::new(Arc::clone(&service), Arc::clone(&navigator)),
            insights: InsightGenerator::new(Arc::clone(&service), navigator),
            logger,
            service,
            credentials,
            current_insight: Mutex::new(None),
            config,
        }
    }

    fn insight_slot(&self) -> MutexGuard<'_, Option<Insight>> {
        self.current_insight
            .lock()
            .unwrap_or_else(|e| e.into_inner())
    }

    /// Workbench settings in use.
    pub fn config(&self) -> &WorkbenchConfig {
        &self.config
    }

    // -----------------------------------------------------------------------
    // Session
    // -----------------------------------------------------------------------

    /// Resumes a session from the stored token, if any.
    ///
    /// A store that cannot be read is treated as "no token". The returned
    /// handle completes when the service has answered (or failed to answer)
    /// the plan request.
    pub fn start_session(&self) -> JoinHandle<()> {
        let token = match self.credentials.load() {
            Ok(token) => token,
            Err(e) => {
                warn!(error = %e, "Could not read stored credentials; continuing without a token");
                None
            }
        };
        self.resolver.begin_session(token.as_deref())
    }

    /// Logs in, stores the token, and starts a session.
    ///
    /// # Errors
    ///
    /// Validation failure when either field is blank; otherwise the classified
    /// service failure. A token that cannot be persisted is logged and the
    /// session still starts.
    pub async fn login(
        &self,
        email: &str,
        password: &str,
    ) -> std::result::Result<JoinHandle<()>, Failure> {
        if email.trim().is_empty() || password.is_empty() {
            return Err(Failure::validation(
                Operation::Login,
                "Please enter both email and password",
            ));
        }

        let response = self
            .service
            .login(email, password)
            .await
            .map_err(|e| Failure::from_service(Operation::Login, &e))?;

        if let Err(e) = self.credentials.save(&response.token) {
            warn!(error = %e, "Could not persist token; session lasts for this process only");
        }
        info!(email = %email, "Logged in");
        Ok(self.resolver.begin_session(Some(&response.token)))
    }

    /// Creates an account. Does not log in.
    ///
    /// # Errors
    ///
    /// Validation failure when either field is blank or the password is
    /// shorter than [`MIN_PASSWORD_LEN`]; otherwise the classified service
    /// failure.
    pub async fn register(
        &self,
        email: &str,
        password: &str,
    ) -> std::result::Result<(), Failure> {
        if email.trim().is_empty() || password.is_empty() {
            return Err(Failure::validation(
                Operation::Register,
                "Please enter both email and password",
            ));
        }
        if password.chars().count() < MIN_PASSWORD_LEN {
            return Err(Failure::validation(
                Operation::Register,
                format!(
                    "Password must be at least {} characters long",
                    MIN_PASSWORD_LEN
                ),
            ));
        }

        self.service
            .register(email, password)
            .await
            .map_err(|e| Failure::from_service(Operation::Register, &e))?;
        info!(email = %email, "Account registered");
        Ok(())
    }

    /// Ends the session: forgets the token, the plan, and all session data.
    ///
    /// # Errors
    ///
    /// Returns an error if the stored token cannot be removed. Session state
    /// is reset either way.
    pub fn logout(&self) -> Result<()> {
        self.resolver.end_session();
        self.engine.reset();
        *self.insight_slot() = None;
        self.credentials.clear()?;
        info!("Logged out");
        Ok(())
    }

    /// Plan currently in effect, or `None` without a session.
    pub fn entitlement(&self) -> Option<Entitlement> {
        self.resolver.current()
    }

    /// Whether export and AI insights should be offered. A hint only.
    pub fn allows_premium_features(&self) -> bool {
        self.resolver.allows_premium_features()
    }

    /// Fetches the plan catalogue.
    ///
    /// # Errors
    ///
    /// Returns the classified service failure.
    pub async fn list_plans(&self) -> std::result::Result<PlanCatalogue, Failure> {
        self.service
            .list_plans()
            .await
            .map_err(|e| Failure::from_service(Operation::Plan, &e))
    }

    // -----------------------------------------------------------------------
    // Queries
    // -----------------------------------------------------------------------

    /// Runs a query against `source_id`, or the configured default source.
    ///
    /// # Errors
    ///
    /// See [`QueryEngine::submit`].
    pub async fn submit(
        &self,
        query_text: &str,
        source_id: Option<&str>,
    ) -> std::result::Result<QueryResult, Failure> {
        let source_id = source_id.unwrap_or(&self.config.default_source);
        let result = self.engine.submit(query_text, source_id).await?;
        *self.insight_slot() = None;
        Ok(result)
    }

    /// The latest successful result.
    pub fn current_result(&self) -> Option<QueryResult> {
        self.engine.current_result()
    }

    /// Full session history, oldest first.
    pub fn history(&self) -> QueryHistory {
        self.engine.history()
    }

    /// The most recent queries, newest first, capped by configuration.
    pub fn recent_history(&self) -> Vec<String> {
        self.engine
            .history()
            .recent(self.config.history_display_limit)
            .into_iter()
            .map(str::to_string)
            .collect()
    }

    // -----------------------------------------------------------------------
    // Export and insights
    // -----------------------------------------------------------------------

    /// Exports the current result.
    ///
    /// # Errors
    ///
    /// See [`ExportPipeline::export`]; having no current result is the same
    /// as having an empty one.
    pub async fn export(
        &self,
        format: ExportFormat,
    ) -> std::result::Result<ExportArtifact, Failure> {
        let rows = self
            .engine
            .current_result()
            .map(|r| r.results)
            .unwrap_or_default();
        self.exporter.export(&rows, format).await
    }

    /// Writes `artifact` into the configured download directory.
    ///
    /// # Errors
    ///
    /// See [`deliver`].
    pub fn save_export(&self, artifact: &ExportArtifact) -> Result<std::path::PathBuf> {
        deliver(artifact, &self.config.download_dir)
    }

    /// Generates AI insights for the current result.
    ///
    /// On success the insight is kept until the next query or logout.
    ///
    /// # Errors
    ///
    /// See [`InsightGenerator::analyze`].
    pub async fn analyze(&self) -> std::result::Result<Insight, Failure> {
        let rows = self
            .engine
            .current_result()
            .map(|r| r.results)
            .unwrap_or_default();
        let query_text = self.engine.current_query().unwrap_or_default();

        let insight = self.insights.analyze(&rows, &query_text).await?;
        *self.insight_slot() = Some(insight.clone());
        Ok(insight)
    }

    /// The latest generated insight.
    pub fn current_insight(&self) -> Option<Insight> {
        self.insight_slot().clone()
    }

    /// Whether an analysis request is in flight.
    pub fn is_analyzing(&self) -> bool {
        self.insights.is_analyzing()
    }

    /// Gives pending history log calls the configured grace period.
    pub async fn shutdown(&self) {
        let finished = self.logger.flush(self.config.log_flush_timeout()).await;
        if !finished {
            warn!(pending = self.logger.pending(), "Dropping unsent history log calls");
        }
    }
}
