//! HTTP client for the InsightHub service.
//!
//! Attaches the stored bearer token to every request, turns transport
//! failures into a single "backend not running" error, and pulls the
//! `detail` message out of error responses.
//!
//! # Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use insighthub::config::ServiceConfig;
//! use insighthub::credentials::MemoryCredentialStore;
//! use insighthub::service::{InsightService, ServiceClient};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let credentials = Arc::new(MemoryCredentialStore::new());
//!     let client = ServiceClient::new(&ServiceConfig::default(), credentials)?;
//!
//!     let result = client.run_query("Show top 5 students by marks", "default").await?;
//!     println!("{} rows", result.row_count());
//!     Ok(())
//! }
//! ```

use std::sync::Arc;

use async_trait::async_trait;
use reqwest::{Client, Method, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use thiserror::Error;
use tracing::{debug, warn};

use super::types::{
    AnalyzeRequest, AuthRequest, ExportFormat, ExportRequest, Insight, LoginResponse,
    PlanCatalogue, PlanInfo, QueryRequest, QueryResult, Row,
};
use super::InsightService;
use crate::config::ServiceConfig;
use crate::credentials::CredentialStore;

/// Errors that can occur during service calls.
///
/// The `Display` text is the message the error classifier inspects.
#[derive(Error, Debug)]
pub enum ServiceError {
    /// The service could not be reached at all.
    #[error(
        "Backend server is not running at {base_url}. Please start the backend API server and try again."
    )]
    Unreachable {
        /// Base URL that was tried.
        base_url: String,
        /// Underlying transport error.
        #[source]
        source: reqwest::Error,
    },

    /// The service answered with a non-success status.
    #[error("{message}")]
    Api {
        /// HTTP status code.
        status: u16,
        /// `detail` from the response body, or the body itself.
        message: String,
    },

    /// The request could not be built or was redirected too often.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The response body did not have the expected shape.
    #[error("Invalid response from server: {0}")]
    Decode(String),
}

impl ServiceError {
    /// HTTP status code, if the service answered.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Api { status, .. } => Some(*status),
            _ => None,
        }
    }
}

/// HTTP implementation of [`InsightService`].
#[derive(Clone)]
pub struct ServiceClient {
    client: Client,
    base_url: String,
    credentials: Arc<dyn CredentialStore>,
}

impl ServiceClient {
    /// Creates a new client.
    ///
    /// # Errors
    ///
    /// Returns `ServiceError::Http` if the HTTP client cannot be created.
    pub fn new(
        config: &ServiceConfig,
        credentials: Arc<dyn CredentialStore>,
    ) -> Result<Self, ServiceError> {
        let client = Client::builder().timeout(config.timeout()).build()?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            credentials,
        })
    }

    /// Base URL requests are sent to.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Builds a request with the bearer token attached when one is stored.
    fn build_request(&self, method: Method, path: &str) -> RequestBuilder {
        let url = format!("{}/{}", self.base_url, path.trim_start_matches('/'));
        let request = self.client.request(method, &url);

        match self.credentials.load() {
            Ok(Some(token)) => request.bearer_auth(token),
            Ok(None) => request,
            Err(e) => {
                warn!(error = %e, "Could not read stored token; sending request unauthenticated");
                request
            }
        }
    }

    /// Sends a request, mapping transport failures and non-success statuses.
    async fn send(&self, request: RequestBuilder) -> Result<Response, ServiceError> {
        let response = request.send().await.map_err(|e| self.transport_error(e))?;

        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        let message = error_message(status.as_u16(), &body);
        debug!(status = status.as_u16(), message = %message, "Service returned an error");
        Err(ServiceError::Api {
            status: status.as_u16(),
            message,
        })
    }

    /// Sends a request and decodes a JSON body.
    async fn send_json<T: DeserializeOwned>(
        &self,
        request: RequestBuilder,
    ) -> Result<T, ServiceError> {
        let response = self.send(request).await?;
        let bytes = response
            .bytes()
            .await
            .map_err(|e| self.transport_error(e))?;
        serde_json::from_slice(&bytes).map_err(|e| ServiceError::Decode(e.to_string()))
    }

    fn transport_error(&self, error: reqwest::Error) -> ServiceError {
        // Refused, timed out, or dropped before the response completed.
        if error.is_connect() || error.is_timeout() || error.is_request() || error.is_body() {
            warn!(base_url = %self.base_url, error = %error, "Service unreachable");
            ServiceError::Unreachable {
                base_url: self.base_url.clone(),
                source: error,
            }
        } else {
            ServiceError::Http(error)
        }
    }
}

/// Extracts a human-readable message from an error response body.
///
/// Prefers a string `detail` field, then any other `detail` value, then the
/// raw body, then a generic status line.
fn error_message(status: u16, body: &str) -> String {
    if let Ok(value) = serde_json::from_str::<serde_json::Value>(body) {
        match value.get("detail") {
            Some(serde_json::Value::String(detail)) => return detail.clone(),
            Some(detail) => return detail.to_string(),
            None => {}
        }
    }

    let trimmed = body.trim();
    if trimmed.is_empty() {
        format!("Request failed with status code {}", status)
    } else {
        trimmed.to_string()
    }
}

#[async_trait]
impl InsightService for ServiceClient {
    async fn login(&self, email: &str, password: &str) -> Result<LoginResponse, ServiceError> {
        let request = self
            .build_request(Method::POST, "auth/login")
            .json(&AuthRequest { email, password });
        self.send_json(request).await
    }

    async fn register(&self, email: &str, password: &str) -> Result<(), ServiceError> {
        let request = self
            .build_request(Method::POST, "auth/register")
            .json(&AuthRequest { email, password });
        self.send(request).await?;
        Ok(())
    }

    async fn run_query(
        &self,
        query_text: &str,
        source_id: &str,
    ) -> Result<QueryResult, ServiceError> {
        let request = self
            .build_request(Method::POST, "query/run")
            .json(&QueryRequest {
                query_text,
                source_id,
            });
        let result: QueryResult = self.send_json(request).await?;
        debug!(rows = result.row_count(), "Query completed");
        Ok(result)
    }

    async fn log_history(&self, query_text: &str) -> Result<(), ServiceError> {
        let request = self
            .build_request(Method::POST, "history/log")
            .query(&[("query", query_text)]);
        self.send(request).await?;
        Ok(())
    }

    async fn current_plan(&self) -> Result<PlanInfo, ServiceError> {
        let request = self.build_request(Method::GET, "subscription/current");
        self.send_json(request).await
    }

    async fn list_plans(&self) -> Result<PlanCatalogue, ServiceError> {
        let request = self.build_request(Method::GET, "subscription/plans");
        self.send_json(request).await
    }

    async fn export(
        &self,
        rows: &[Row],
        format: ExportFormat,
        filename: &str,
    ) -> Result<Vec<u8>, ServiceError> {
        let request = self
            .build_request(Method::POST, &format!("export/{}", format.as_str()))
            .json(&ExportRequest {
                data: rows,
                format: format.as_str(),
                filename,
            });
        let response = self.send(request).await?;
        let bytes = response
            .bytes()
            .await
            .map_err(|e| self.transport_error(e))?;
        debug!(format = %format, bytes = bytes.len(), "Export artifact received");
        Ok(bytes.to_vec())
    }

    async fn analyze(&self, rows: &[Row], query_text: &str) -> Result<Insight, ServiceError> {
        let request = self
            .build_request(Method::POST, "ai/analyze")
            .json(&AnalyzeRequest {
                data: rows,
                query_text,
            });
        self.send_json(request).await
    }
}
