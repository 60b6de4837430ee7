//! Failure classification
//!
//! Every failed workbench operation ends up as a [`Failure`]: a category plus
//! the message that explains it. Network failures are categorized by
//! [`classify`], a pure function of the message text. Validation failures are
//! raised before any request is made and never go through it.

use std::fmt;

use thiserror::Error;

use crate::service::ServiceError;

/// Text the service client puts in every "cannot reach the backend" message.
pub const CONNECTIVITY_MARKER: &str = "Backend server is not running";

/// Text the service puts in every plan-restriction message.
pub const ENTITLEMENT_MARKER: &str = "only available for";

/// User-facing failure category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FailureKind {
    /// Bad input caught before any request was sent
    Validation,
    /// The backend could not be reached
    Connectivity,
    /// The feature needs a higher plan
    Entitlement,
    /// Anything else
    Generic,
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Validation => "validation",
            Self::Connectivity => "connectivity",
            Self::Entitlement => "entitlement",
            Self::Generic => "generic",
        };
        f.write_str(name)
    }
}

/// The workbench operation a failure came from.
///
/// Only affects how the failure is worded for the user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    /// Logging in
    Login,
    /// Creating an account
    Register,
    /// Running a query
    Query,
    /// Fetching plan information
    Plan,
    /// Exporting results
    Export,
    /// Generating AI insights
    Insights,
}

impl Operation {
    fn failure_prefix(self) -> &'static str {
        match self {
            Self::Login => "Login failed",
            Self::Register => "Registration failed",
            Self::Query => "Query failed",
            Self::Plan => "Failed to fetch plan info",
            Self::Export => "Export failed",
            Self::Insights => "Failed to generate insights",
        }
    }

    fn feature_name(self) -> Option<&'static str> {
        match self {
            Self::Export => Some("Export"),
            Self::Insights => Some("AI Insights"),
            _ => None,
        }
    }
}

/// Maps a failure message to its category.
///
/// Connectivity is checked first, so a message carrying both markers is
/// Connectivity. Never returns [`FailureKind::Validation`].
///
/// # Examples
///
/// ```
/// use insighthub::workbench::{classify, FailureKind};
///
/// assert_eq!(
///     classify("'export' is only available for Pro and Business plans."),
///     FailureKind::Entitlement
/// );
/// assert_eq!(classify("Error executing query: timeout"), FailureKind::Generic);
/// ```
pub fn classify(message: &str) -> FailureKind {
    if message.contains(CONNECTIVITY_MARKER) {
        FailureKind::Connectivity
    } else if message.contains(ENTITLEMENT_MARKER) {
        FailureKind::Entitlement
    } else {
        FailureKind::Generic
    }
}

/// A classified workbench failure.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{message}")]
pub struct Failure {
    /// Category
    pub kind: FailureKind,
    /// Operation that failed
    pub operation: Operation,
    /// Raw message (server detail, transport description, or validation text)
    pub message: String,
}

impl Failure {
    /// A validation failure; no request was made.
    pub fn validation(operation: Operation, message: impl Into<String>) -> Self {
        Self {
            kind: FailureKind::Validation,
            operation,
            message: message.into(),
        }
    }

    /// Classifies a failure from its message.
    pub fn from_message(operation: Operation, message: impl Into<String>) -> Self {
        let message = message.into();
        Self {
            kind: classify(&message),
            operation,
            message,
        }
    }

    /// Classifies a service error.
    pub fn from_service(operation: Operation, error: &ServiceError) -> Self {
        Self::from_message(operation, error.to_string())
    }

    /// Whether this failure should send the user toward a plan upgrade.
    pub fn is_entitlement(&self) -> bool {
        self.kind == FailureKind::Entitlement
    }

    /// Text to show the user.
    pub fn user_message(&self) -> String {
        match self.kind {
            FailureKind::Validation => self.message.clone(),
            FailureKind::Connectivity => format!(
                "Backend Connection Error:\n\n{}\n\nPlease make sure the backend API server is running and reachable.",
                self.message
            ),
            FailureKind::Entitlement => match self.operation.feature_name() {
                Some(feature) => format!(
                    "{} is only available for Pro and Business plans. Please upgrade to access this feature.",
                    feature
                ),
                None => self.message.clone(),
            },
            FailureKind::Generic => {
                format!("{}: {}", self.operation.failure_prefix(), self.message)
            }
        }
    }
}
