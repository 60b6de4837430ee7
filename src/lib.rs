//! InsightHub - terminal query workbench library
//!
//! This library provides the client side of the AI Insight Hub service:
//! natural-language queries against connected data sources, per-session
//! history, plan-gated export and AI insights, and plan entitlement.
//!
//! # Architecture
//!
//! The library is organized into the following modules:
//!
//! - `workbench`: Query engine, history, export, insights, entitlement, and failure classification
//! - `service`: Service API trait and its HTTP client
//! - `credentials`: Bearer token storage (keyring, file, memory)
//! - `config`: Configuration management and validation
//! - `error`: Error types and result aliases
//! - `cli`: Command-line interface definition
//! - `commands`: Command handlers and terminal rendering
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use insighthub::credentials::create_credential_store;
//! use insighthub::service::ServiceClient;
//! use insighthub::{Config, Workbench};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = Config::load("config/config.yaml", &Default::default())?;
//!     config.validate()?;
//!
//!     let credentials = create_credential_store(&config.credentials)?;
//!     let client = ServiceClient::new(&config.service, credentials.clone())?;
//!     let workbench = Workbench::new(Arc::new(client), credentials, config.workbench);
//!
//!     workbench.start_session().await?;
//!     let result = workbench.submit("Show top 10 customers by revenue", None).await?;
//!     println!("{} rows", result.row_count());
//!     workbench.shutdown().await;
//!     Ok(())
//! }
//! ```

pub mod cli;
pub mod commands;
pub mod config;
pub mod credentials;
pub mod error;
pub mod service;
pub mod workbench;

pub use config::Config;
pub use error::{InsightHubError, Result};
pub use service::{InsightService, ServiceClient};
pub use workbench::{Failure, FailureKind, Workbench};

#[cfg(test)]
pub mod test_utils;
