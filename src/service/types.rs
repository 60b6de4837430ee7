//! Request and response types for the InsightHub service API

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// One result row: column name to scalar-or-null.
///
/// Column order is the order the service sent them in.
pub type Row = Map<String, Value>;

// ---------------------------------------------------------------------------
// Plans
// ---------------------------------------------------------------------------

/// Subscription tier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Plan {
    /// Free tier; no export, no AI insights
    Free,
    /// Pro tier
    Pro,
    /// Business tier
    Business,
}

impl Plan {
    /// Parses a plan name as the service spells it.
    ///
    /// Returns `None` for names this client does not know.
    ///
    /// # Examples
    ///
    /// ```
    /// use insighthub::service::Plan;
    ///
    /// assert_eq!(Plan::parse_str("Pro"), Some(Plan::Pro));
    /// assert_eq!(Plan::parse_str("enterprise"), None);
    /// ```
    pub fn parse_str(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "free" => Some(Self::Free),
            "pro" => Some(Self::Pro),
            "business" => Some(Self::Business),
            _ => None,
        }
    }

    /// Whether this tier includes export and AI insights.
    pub fn includes_premium_features(self) -> bool {
        matches!(self, Self::Pro | Self::Business)
    }

    /// Lowercase wire name.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Free => "free",
            Self::Pro => "pro",
            Self::Business => "business",
        }
    }
}

impl fmt::Display for Plan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Response of `GET subscription/current`.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct PlanInfo {
    /// Plan name as reported by the service
    #[serde(default)]
    pub plan: Option<String>,
    /// Feature flags for the plan
    #[serde(default)]
    pub features: Map<String, Value>,
    /// Numeric limits for the plan (`-1` means unlimited)
    #[serde(default)]
    pub limits: Map<String, Value>,
}

impl PlanInfo {
    /// The reported plan, with missing or unrecognized names treated as free.
    pub fn resolved_plan(&self) -> Plan {
        self.plan
            .as_deref()
            .and_then(Plan::parse_str)
            .unwrap_or(Plan::Free)
    }
}

/// One entry of the plan catalogue.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct PlanOffer {
    /// Display name
    pub name: String,
    /// Display price, e.g. `$19/month`
    pub price: String,
    /// Feature flags and limits
    #[serde(default)]
    pub features: Map<String, Value>,
}

/// Response of `GET subscription/plans`.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct PlanCatalogue {
    /// Offers keyed by plan name
    #[serde(default)]
    pub plans: BTreeMap<String, PlanOffer>,
}

impl PlanCatalogue {
    /// Offers ordered by tier, with unknown plan names last.
    pub fn by_tier(&self) -> Vec<(&str, &PlanOffer)> {
        let mut offers: Vec<(&str, &PlanOffer)> =
            self.plans.iter().map(|(k, v)| (k.as_str(), v)).collect();
        offers.sort_by_key(|(key, _)| Plan::parse_str(key).map_or(u8::MAX, |p| p as u8));
        offers
    }
}

// ---------------------------------------------------------------------------
// Auth
// ---------------------------------------------------------------------------

/// Body of `POST auth/login` and `POST auth/register`.
#[derive(Debug, Serialize)]
pub struct AuthRequest<'a> {
    /// Account email
    pub email: &'a str,
    /// Account password
    pub password: &'a str,
}

/// Response of `POST auth/login`.
#[derive(Debug, Clone, Deserialize)]
pub struct LoginResponse {
    /// Bearer token
    pub token: String,
    /// Token type, normally `bearer`
    #[serde(default)]
    pub token_type: Option<String>,
    /// Plan at login time
    #[serde(default)]
    pub plan: Option<String>,
    /// Account email
    #[serde(default)]
    pub email: Option<String>,
}

// ---------------------------------------------------------------------------
// Queries
// ---------------------------------------------------------------------------

/// Body of `POST query/run`.
#[derive(Debug, Serialize)]
pub struct QueryRequest<'a> {
    /// Natural-language question
    pub query_text: &'a str,
    /// Connection id or `default`
    pub source_id: &'a str,
}

/// Result of a natural-language query.
///
/// All rows are expected to share one key set in one order. This is not
/// enforced; [`QueryResult::columns`] takes the first row's keys.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct QueryResult {
    /// One-line description of what was found
    #[serde(default)]
    pub summary: Option<String>,
    /// Follow-up questions the service suggests
    #[serde(default)]
    pub suggestions: Vec<String>,
    /// Result rows
    #[serde(default)]
    pub results: Vec<Row>,
    /// The query the service actually executed
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub executed_query: Option<String>,
}

impl QueryResult {
    /// Column names, taken from the first row.
    pub fn columns(&self) -> Vec<&str> {
        self.results
            .first()
            .map(|row| row.keys().map(String::as_str).collect())
            .unwrap_or_default()
    }

    /// Whether there are no rows.
    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }

    /// Number of rows.
    pub fn row_count(&self) -> usize {
        self.results.len()
    }

    /// Whether every row has exactly the first row's keys in the same order.
    pub fn has_uniform_columns(&self) -> bool {
        let Some(first) = self.results.first() else {
            return true;
        };
        self.results
            .iter()
            .skip(1)
            .all(|row| row.len() == first.len() && row.keys().eq(first.keys()))
    }
}

// ---------------------------------------------------------------------------
// Export
// ---------------------------------------------------------------------------

/// Export file format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExportFormat {
    /// Comma-separated values
    Csv,
    /// Excel workbook
    Excel,
}

impl ExportFormat {
    /// Parses `csv`, `excel`, or `xlsx`, case-insensitively.
    pub fn parse_str(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "csv" => Some(Self::Csv),
            "excel" | "xlsx" => Some(Self::Excel),
            _ => None,
        }
    }

    /// Name used in the endpoint path and request body.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Csv => "csv",
            Self::Excel => "excel",
        }
    }

    /// File extension of the rendered artifact.
    pub fn extension(self) -> &'static str {
        match self {
            Self::Csv => "csv",
            Self::Excel => "xlsx",
        }
    }
}

impl fmt::Display for ExportFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Body of `POST export/{format}`.
#[derive(Debug, Serialize)]
pub struct ExportRequest<'a> {
    /// Rows to render
    pub data: &'a [Row],
    /// Format name
    pub format: &'a str,
    /// Suggested file name
    pub filename: &'a str,
}

// ---------------------------------------------------------------------------
// AI insights
// ---------------------------------------------------------------------------

/// Body of `POST ai/analyze`.
#[derive(Debug, Serialize)]
pub struct AnalyzeRequest<'a> {
    /// Rows to analyze
    pub data: &'a [Row],
    /// The question that produced the rows
    pub query_text: &'a str,
}

/// Narrative analysis of a result set.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct Insight {
    /// Key findings
    #[serde(default)]
    pub insights: Vec<String>,
    /// Suggested next steps
    #[serde(default)]
    pub recommendations: Vec<String>,
    /// Per-column numeric summaries (mean, median, min, max, std)
    #[serde(default)]
    pub statistics: Map<String, Value>,
    /// Trend records
    #[serde(default)]
    pub trends: Vec<Value>,
}
