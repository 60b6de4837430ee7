//! InsightHub service API
//!
//! The workbench talks to the remote service only through the
//! [`InsightService`] trait. [`ServiceClient`] is the HTTP implementation;
//! tests substitute their own.

pub mod client;
pub mod types;

use async_trait::async_trait;

pub use client::{ServiceClient, ServiceError};
pub use types::{
    ExportFormat, Insight, LoginResponse, Plan, PlanCatalogue, PlanInfo, PlanOffer, QueryResult,
    Row,
};

/// Operations offered by the InsightHub service.
///
/// Every method is a single request. Implementations attach the session's
/// bearer token to authenticated calls and never retry.
#[async_trait]
pub trait InsightService: Send + Sync {
    /// `POST auth/login`
    async fn login(&self, email: &str, password: &str) -> Result<LoginResponse, ServiceError>;

    /// `POST auth/register`
    async fn register(&self, email: &str, password: &str) -> Result<(), ServiceError>;

    /// `POST query/run`
    async fn run_query(
        &self,
        query_text: &str,
        source_id: &str,
    ) -> Result<QueryResult, ServiceError>;

    /// `POST history/log?query=...`; the response body is ignored.
    async fn log_history(&self, query_text: &str) -> Result<(), ServiceError>;

    /// `GET subscription/current`
    async fn current_plan(&self) -> Result<PlanInfo, ServiceError>;

    /// `GET subscription/plans`
    async fn list_plans(&self) -> Result<PlanCatalogue, ServiceError>;

    /// `POST export/{format}`; returns the rendered file.
    async fn export(
        &self,
        rows: &[Row],
        format: ExportFormat,
        filename: &str,
    ) -> Result<Vec<u8>, ServiceError>;

    /// `POST ai/analyze`
    async fn analyze(&self, rows: &[Row], query_text: &str) -> Result<Insight, ServiceError>;
}
