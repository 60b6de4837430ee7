//! Test utilities for InsightHub
//!
//! This module provides a scriptable in-memory [`InsightService`], fixture
//! builders for tokens and results, and temporary file helpers.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine as _;
use serde_json::{json, Map, Value};
use tempfile::TempDir;
use tokio::sync::Notify;

use crate::service::{
    ExportFormat, Insight, InsightService, LoginResponse, PlanCatalogue, PlanInfo, PlanOffer,
    QueryResult, Row, ServiceError,
};
use crate::workbench::{Failure, Navigator, Operation};

/// Scripted reply: the value, or an API error as `(status, message)`.
pub type Reply<T> = Result<T, (u16, String)>;

fn reply<T: Clone>(scripted: &Reply<T>) -> Result<T, ServiceError> {
    scripted.clone().map_err(|(status, message)| ServiceError::Api { status, message })
}

/// Create a temporary directory for testing
pub fn temp_dir() -> TempDir {
    TempDir::new().expect("Failed to create temporary directory")
}

/// Create a test file with the given content
///
/// # Panics
///
/// Panics if file creation or writing fails
pub fn create_test_file(dir: &TempDir, name: &str, content: &str) -> PathBuf {
    let path = dir.path().join(name);
    std::fs::write(&path, content).expect("Failed to write test file");
    path
}

/// Assert that an error contains the expected message
///
/// # Panics
///
/// Panics if the result is Ok or if the error doesn't contain the expected message
pub fn assert_error_contains<T, E: std::fmt::Display>(result: Result<T, E>, expected: &str) {
    match result {
        Ok(_) => panic!("Expected error containing '{}' but got Ok", expected),
        Err(e) => {
            let error_msg = e.to_string();
            assert!(
                error_msg.contains(expected),
                "Error message '{}' does not contain '{}'",
                error_msg,
                expected
            );
        }
    }
}

/// Build a JWT-shaped token whose payload segment encodes `claims`.
///
/// The header and signature segments are fixed; nothing verifies them.
pub fn make_token(claims: Value) -> String {
    let header = URL_SAFE_NO_PAD.encode(r#"{"alg":"HS256","typ":"JWT"}"#);
    let payload = URL_SAFE_NO_PAD.encode(claims.to_string());
    format!("{}.{}.signature", header, payload)
}

/// A result with `rows` uniform rows keyed `name`, `marks`, `grade`.
pub fn sample_result(rows: usize) -> QueryResult {
    let results = (0..rows)
        .map(|i| {
            let mut row = Row::new();
            row.insert("name".to_string(), json!(format!("Student {}", i + 1)));
            row.insert("marks".to_string(), json!(95 - i as i64));
            row.insert("grade".to_string(), json!("A"));
            row
        })
        .collect();

    QueryResult {
        summary: Some(format!("Found {} students", rows)),
        suggestions: vec!["Show average marks by grade".to_string()],
        results,
        executed_query: Some(format!(
            "SELECT name, marks, grade FROM students ORDER BY marks DESC LIMIT {}",
            rows
        )),
    }
}

/// An insight with one entry in each section.
pub fn sample_insight() -> Insight {
    let mut statistics = Map::new();
    statistics.insert("row_count".to_string(), json!(5));
    Insight {
        insights: vec!["Marks are tightly clustered".to_string()],
        recommendations: vec!["Compare against last term".to_string()],
        statistics,
        trends: vec![json!({"column": "marks", "direction": "down"})],
    }
}

fn sample_catalogue() -> PlanCatalogue {
    let offer = |name: &str, price: &str, premium: bool| PlanOffer {
        name: name.to_string(),
        price: price.to_string(),
        features: json!({"export": premium, "ai_insights": premium})
            .as_object()
            .cloned()
            .unwrap_or_default(),
    };
    PlanCatalogue {
        plans: [
            ("free".to_string(), offer("Free", "$0", false)),
            ("pro".to_string(), offer("Pro", "$29/month", true)),
            ("business".to_string(), offer("Business", "$99/month", true)),
        ]
        .into_iter()
        .collect(),
    }
}

struct Script {
    login: Reply<LoginResponse>,
    register: Reply<()>,
    query: Reply<QueryResult>,
    log: Reply<()>,
    plan: Reply<PlanInfo>,
    plans: Reply<PlanCatalogue>,
    export: Reply<Vec<u8>>,
    analyze: Reply<Insight>,
}

#[derive(Default)]
struct Calls {
    counts: HashMap<&'static str, usize>,
    queries: Vec<(String, String)>,
    logged: Vec<String>,
    exports: Vec<(ExportFormat, String, usize)>,
    analyzed: Vec<String>,
}

/// In-memory [`InsightService`] with scripted replies and call recording.
///
/// Calls are recorded before any gate is awaited, so a test can observe that
/// a call started while it is still held.
pub struct MockService {
    script: Mutex<Script>,
    calls: Mutex<Calls>,
    query_gate: Option<Arc<Notify>>,
    plan_gate: Option<Arc<Notify>>,
    log_gate: Option<Arc<Notify>>,
    analyze_gate: Option<Arc<Notify>>,
}

impl Default for MockService {
    fn default() -> Self {
        Self::new()
    }
}

impl MockService {
    /// Every call succeeds: a free-plan token, five rows, a free plan.
    pub fn new() -> Self {
        Self {
            script: Mutex::new(Script {
                login: Ok(LoginResponse {
                    token: make_token(json!({"sub": "user@example.com", "plan": "free"})),
                    token_type: Some("bearer".to_string()),
                    plan: Some("free".to_string()),
                    email: Some("user@example.com".to_string()),
                }),
                register: Ok(()),
                query: Ok(sample_result(5)),
                log: Ok(()),
                plan: Ok(PlanInfo {
                    plan: Some("free".to_string()),
                    ..Default::default()
                }),
                plans: Ok(sample_catalogue()),
                export: Ok(b"name,marks,grade\n".to_vec()),
                analyze: Ok(sample_insight()),
            }),
            calls: Mutex::new(Calls::default()),
            query_gate: None,
            plan_gate: None,
            log_gate: None,
            analyze_gate: None,
        }
    }

    /// `run_query` waits for `gate` before answering.
    pub fn with_query_gate(mut self, gate: Arc<Notify>) -> Self {
        self.query_gate = Some(gate);
        self
    }

    /// `current_plan` waits for `gate` before answering.
    pub fn with_plan_gate(mut self, gate: Arc<Notify>) -> Self {
        self.plan_gate = Some(gate);
        self
    }

    /// `log_history` waits for `gate` before answering.
    pub fn with_log_gate(mut self, gate: Arc<Notify>) -> Self {
        self.log_gate = Some(gate);
        self
    }

    /// `analyze` waits for `gate` before answering.
    pub fn with_analyze_gate(mut self, gate: Arc<Notify>) -> Self {
        self.analyze_gate = Some(gate);
        self
    }

    fn script(&self) -> std::sync::MutexGuard<'_, Script> {
        self.script.lock().unwrap()
    }

    fn record(&self, name: &'static str, f: impl FnOnce(&mut Calls)) {
        let mut calls = self.calls.lock().unwrap();
        *calls.counts.entry(name).or_default() += 1;
        f(&mut calls);
    }

    pub fn set_login(&self, reply: Reply<LoginResponse>) {
        self.script().login = reply;
    }

    /// Login succeeds and returns `token`.
    pub fn set_login_token(&self, token: &str) {
        self.set_login(Ok(LoginResponse {
            token: token.to_string(),
            token_type: Some("bearer".to_string()),
            plan: None,
            email: None,
        }));
    }

    pub fn set_register(&self, reply: Reply<()>) {
        self.script().register = reply;
    }

    pub fn set_query(&self, reply: Reply<QueryResult>) {
        self.script().query = reply;
    }

    pub fn set_log(&self, reply: Reply<()>) {
        self.script().log = reply;
    }

    pub fn set_plan(&self, reply: Reply<PlanInfo>) {
        self.script().plan = reply;
    }

    pub fn set_plans(&self, reply: Reply<PlanCatalogue>) {
        self.script().plans = reply;
    }

    pub fn set_export(&self, reply: Reply<Vec<u8>>) {
        self.script().export = reply;
    }

    pub fn set_analyze(&self, reply: Reply<Insight>) {
        self.script().analyze = reply;
    }

    /// Number of calls made to the named trait method.
    pub fn call_count(&self, method: &str) -> usize {
        self.calls
            .lock()
            .unwrap()
            .counts
            .get(method)
            .copied()
            .unwrap_or(0)
    }

    /// Number of calls across all methods.
    pub fn total_calls(&self) -> usize {
        self.calls.lock().unwrap().counts.values().sum()
    }

    /// Query text of every `log_history` call, in order.
    pub fn logged_queries(&self) -> Vec<String> {
        self.calls.lock().unwrap().logged.clone()
    }

    /// `(query_text, source_id)` of the latest `run_query` call.
    pub fn last_query(&self) -> Option<(String, String)> {
        self.calls.lock().unwrap().queries.last().cloned()
    }

    /// `(format, filename, row count)` of the latest `export` call.
    pub fn last_export(&self) -> Option<(ExportFormat, String, usize)> {
        self.calls.lock().unwrap().exports.last().cloned()
    }

    /// Query text of the latest `analyze` call.
    pub fn last_analyze_query(&self) -> Option<String> {
        self.calls.lock().unwrap().analyzed.last().cloned()
    }
}

async fn pass(gate: &Option<Arc<Notify>>) {
    if let Some(gate) = gate {
        gate.notified().await;
    }
}

#[async_trait]
impl InsightService for MockService {
    async fn login(&self, _email: &str, _password: &str) -> Result<LoginResponse, ServiceError> {
        self.record("login", |_| {});
        reply(&self.script().login)
    }

    async fn register(&self, _email: &str, _password: &str) -> Result<(), ServiceError> {
        self.record("register", |_| {});
        reply(&self.script().register)
    }

    async fn run_query(
        &self,
        query_text: &str,
        source_id: &str,
    ) -> Result<QueryResult, ServiceError> {
        self.record("run_query", |c| {
            c.queries
                .push((query_text.to_string(), source_id.to_string()))
        });
        pass(&self.query_gate).await;
        reply(&self.script().query)
    }

    async fn log_history(&self, query_text: &str) -> Result<(), ServiceError> {
        self.record("log_history", |c| c.logged.push(query_text.to_string()));
        pass(&self.log_gate).await;
        reply(&self.script().log)
    }

    async fn current_plan(&self) -> Result<PlanInfo, ServiceError> {
        self.record("current_plan", |_| {});
        pass(&self.plan_gate).await;
        reply(&self.script().plan)
    }

    async fn list_plans(&self) -> Result<PlanCatalogue, ServiceError> {
        self.record("list_plans", |_| {});
        reply(&self.script().plans)
    }

    async fn export(
        &self,
        rows: &[Row],
        format: ExportFormat,
        filename: &str,
    ) -> Result<Vec<u8>, ServiceError> {
        self.record("export", |c| {
            c.exports.push((format, filename.to_string(), rows.len()))
        });
        reply(&self.script().export)
    }

    async fn analyze(&self, _rows: &[Row], query_text: &str) -> Result<Insight, ServiceError> {
        self.record("analyze", |c| c.analyzed.push(query_text.to_string()));
        pass(&self.analyze_gate).await;
        reply(&self.script().analyze)
    }
}

/// Navigator that remembers every pricing request.
#[derive(Default)]
pub struct RecordingNavigator {
    failures: Mutex<Vec<Failure>>,
}

impl RecordingNavigator {
    /// Number of pricing requests received.
    pub fn visits(&self) -> usize {
        self.failures.lock().unwrap().len()
    }

    /// Operation behind the latest pricing request.
    pub fn last_operation(&self) -> Option<Operation> {
        self.failures.lock().unwrap().last().map(|f| f.operation)
    }
}

impl Navigator for RecordingNavigator {
    fn to_pricing(&self, failure: &Failure) {
        self.failures.lock().unwrap().push(failure.clone());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::workbench::plan_from_token;
    use crate::service::Plan;

    #[test]
    fn test_temp_dir_creation() {
        let dir = temp_dir();
        assert!(dir.path().exists());
    }

    #[test]
    fn test_create_test_file() {
        let dir = temp_dir();
        let path = create_test_file(&dir, "test.txt", "content");
        let content = std::fs::read_to_string(&path).unwrap();
        assert_eq!(content, "content");
    }

    #[test]
    #[should_panic(expected = "does not contain")]
    fn test_assert_error_contains_wrong_message() {
        let result: Result<(), String> = Err("different error".to_string());
        assert_error_contains(result, "not present");
    }

    #[test]
    fn test_make_token_round_trips_plan_claim() {
        let token = make_token(json!({"plan": "pro"}));
        assert_eq!(token.split('.').count(), 3);
        assert_eq!(plan_from_token(Some(&token)), Plan::Pro);
    }

    #[test]
    fn test_sample_result_shape() {
        let result = sample_result(3);
        assert_eq!(result.row_count(), 3);
        assert_eq!(result.columns(), vec!["name", "marks", "grade"]);
    }

    #[tokio::test]
    async fn test_mock_service_maps_scripted_errors() {
        let service = MockService::new();
        service.set_query(Err((429, "Monthly query limit reached".to_string())));
        let err = service.run_query("q", "default").await.unwrap_err();
        assert_eq!(err.status(), Some(429));
        assert_eq!(err.to_string(), "Monthly query limit reached");
        assert_eq!(service.call_count("run_query"), 1);
    }
}
