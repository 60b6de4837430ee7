//! Plan entitlement resolution
//!
//! Two sources say which plan the user is on:
//!
//! - the `plan` claim inside the bearer token, available immediately
//!   (**optimistic**), and
//! - `GET subscription/current`, which arrives later (**authoritative**).
//!
//! Both are kept side by side. The authoritative value wins as soon as it is
//! present and stays for the rest of the session; the token is never
//! consulted again. Readers always get the value resolved at call time.

use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use base64::engine::general_purpose::{STANDARD_NO_PAD, URL_SAFE_NO_PAD};
use base64::Engine as _;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::service::{InsightService, Plan};

/// Where the current plan value came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntitlementSource {
    /// Decoded from the token's claims
    Optimistic,
    /// Confirmed by the service
    Authoritative,
}

impl std::fmt::Display for EntitlementSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Optimistic => f.write_str("optimistic"),
            Self::Authoritative => f.write_str("authoritative"),
        }
    }
}

/// The plan currently in effect and how sure we are of it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Entitlement {
    /// Plan tier
    pub plan: Plan,
    /// Source of `plan`
    pub source: EntitlementSource,
}

impl Entitlement {
    /// Whether export and AI insights should be offered.
    ///
    /// This is a hint for the UI only; the service makes the real decision.
    pub fn allows_premium_features(&self) -> bool {
        self.plan.includes_premium_features()
    }
}

/// Decodes the `plan` claim from a JWT-shaped token.
///
/// Falls back to [`Plan::Free`] for an absent token, a token that is not
/// three dot-separated segments, an undecodable payload, a missing claim, or
/// an unknown plan name. Never fails.
///
/// # Examples
///
/// ```
/// use insighthub::service::Plan;
/// use insighthub::workbench::plan_from_token;
///
/// assert_eq!(plan_from_token(None), Plan::Free);
/// assert_eq!(plan_from_token(Some("garbage")), Plan::Free);
/// ```
pub fn plan_from_token(token: Option<&str>) -> Plan {
    token.and_then(decode_plan_claim).unwrap_or(Plan::Free)
}

fn decode_plan_claim(token: &str) -> Option<Plan> {
    let mut segments = token.split('.');
    let (_header, payload, _signature) = (segments.next()?, segments.next()?, segments.next()?);
    if segments.next().is_some() {
        return None;
    }

    let payload = payload.trim_end_matches('=');
    let bytes = URL_SAFE_NO_PAD
        .decode(payload)
        .or_else(|_| STANDARD_NO_PAD.decode(payload))
        .ok()?;
    let claims: serde_json::Value = serde_json::from_slice(&bytes).ok()?;
    claims.get("plan")?.as_str().and_then(Plan::parse_str)
}

#[derive(Debug, Default)]
struct ResolverState {
    /// Bumped on every session start and end; stale fetches compare against it.
    generation: u64,
    optimistic: Option<Plan>,
    authoritative: Option<Plan>,
}

impl ResolverState {
    fn resolved(&self) -> Option<Entitlement> {
        if let Some(plan) = self.authoritative {
            return Some(Entitlement {
                plan,
                source: EntitlementSource::Authoritative,
            });
        }
        self.optimistic.map(|plan| Entitlement {
            plan,
            source: EntitlementSource::Optimistic,
        })
    }
}

/// Reconciles the token's plan claim with the service's answer.
///
/// Cloning shares state.
#[derive(Clone)]
pub struct EntitlementResolver {
    service: Arc<dyn InsightService>,
    state: Arc<RwLock<ResolverState>>,
}

impl EntitlementResolver {
    /// Creates a resolver with no active session.
    pub fn new(service: Arc<dyn InsightService>) -> Self {
        Self {
            service,
            state: Arc::new(RwLock::new(ResolverState::default())),
        }
    }

    fn read(&self) -> RwLockReadGuard<'_, ResolverState> {
        self.state.read().unwrap_or_else(|e| e.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, ResolverState> {
        self.state.write().unwrap_or_else(|e| e.into_inner())
    }

    /// Starts a session.
    ///
    /// Sets the optimistic plan from `token` right away and spawns the
    /// authoritative fetch. The returned handle may be awaited or dropped;
    /// dropping it does not cancel the fetch.
    pub fn begin_session(&self, token: Option<&str>) -> JoinHandle<()> {
        let optimistic = plan_from_token(token);
        let generation = {
            let mut state = self.write();
            state.generation += 1;
            state.optimistic = Some(optimistic);
            state.authoritative = None;
            state.generation
        };
        info!(plan = %optimistic, has_token = token.is_some(), "Session started with optimistic plan");

        let resolver = self.clone();
        tokio::spawn(async move {
            resolver.fetch_authoritative(generation).await;
        })
    }

    /// Fetches the plan from the service and records it for `generation`.
    ///
    /// Returns whether the authoritative value was recorded. Failures are
    /// logged and leave the optimistic value in place; there is no retry.
    async fn fetch_authoritative(&self, generation: u64) -> bool {
        let info = match self.service.current_plan().await {
            Ok(info) => info,
            Err(e) => {
                warn!(error = %e, "Could not confirm plan with the service; keeping plan from token");
                return false;
            }
        };

        let plan = info.resolved_plan();
        let mut state = self.write();
        if state.generation != generation {
            debug!(plan = %plan, "Discarding plan fetched for an earlier session");
            return false;
        }
        if state.optimistic != Some(plan) {
            info!(
                optimistic = ?state.optimistic,
                authoritative = %plan,
                "Service plan differs from token claim"
            );
        }
        state.authoritative = Some(plan);
        true
    }

    /// Ends the session; the plan becomes unknown.
    pub fn end_session(&self) {
        let mut state = self.write();
        state.generation += 1;
        state.optimistic = None;
        state.authoritative = None;
    }

    /// The entitlement in effect now, or `None` without a session.
    pub fn current(&self) -> Option<Entitlement> {
        self.read().resolved()
    }

    /// Current plan, or `None` (unknown) without a session.
    pub fn plan(&self) -> Option<Plan> {
        self.current().map(|e| e.plan)
    }

    /// Whether the current plan suggests export and AI insights are available.
    pub fn allows_premium_features(&self) -> bool {
        self.current()
            .map(|e| e.allows_premium_features())
            .unwrap_or(false)
    }
}
