//! Upgrade routing
//!
//! When export or AI insights are refused for plan reasons, the user is sent
//! toward pricing. The workbench only decides *when*; a [`Navigator`] decides
//! *how*.

use super::classifier::Failure;

/// Receives "send the user to pricing" requests.
pub trait Navigator: Send + Sync {
    /// Called once per entitlement failure from export or AI insights.
    fn to_pricing(&self, failure: &Failure);
}

/// Navigator that only records the request in the log.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogNavigator;

impl Navigator for LogNavigator {
    fn to_pricing(&self, failure: &Failure) {
        tracing::info!(operation = ?failure.operation, "Upgrade required");
    }
}
