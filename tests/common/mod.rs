use std::fs;
use std::path::PathBuf;
use std::sync::Arc;

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine as _;
use tempfile::TempDir;

use insighthub::config::{ServiceConfig, WorkbenchConfig};
use insighthub::credentials::{CredentialStore, MemoryCredentialStore};
use insighthub::service::ServiceClient;
use insighthub::Workbench;

#[allow(dead_code)]
pub fn temp_config_file(contents: &str) -> (TempDir, PathBuf) {
    let temp_dir = TempDir::new().expect("failed to create tempdir");
    let config_path = temp_dir.path().join("config.yaml");
    fs::write(&config_path, contents).expect("failed to write config file");
    (temp_dir, config_path)
}

/// JWT-shaped token carrying `claims` in its payload segment.
#[allow(dead_code)]
pub fn make_token(claims: serde_json::Value) -> String {
    let header = URL_SAFE_NO_PAD.encode(r#"{"alg":"HS256","typ":"JWT"}"#);
    let payload = URL_SAFE_NO_PAD.encode(claims.to_string());
    format!("{}.{}.sig", header, payload)
}

#[allow(dead_code)]
pub fn service_config(base_url: &str) -> ServiceConfig {
    ServiceConfig {
        base_url: base_url.to_string(),
        timeout_seconds: 5,
        ..Default::default()
    }
}

/// HTTP client against `base_url` sharing `credentials`.
#[allow(dead_code)]
pub fn client(base_url: &str, credentials: Arc<MemoryCredentialStore>) -> ServiceClient {
    ServiceClient::new(&service_config(base_url), credentials).expect("failed to build client")
}

/// A workbench talking HTTP to `base_url`, with an in-memory credential
/// store and downloads going to a fresh temporary directory.
#[allow(dead_code)]
pub struct TestWorkbench {
    pub workbench: Workbench,
    pub credentials: Arc<MemoryCredentialStore>,
    pub downloads: TempDir,
}

#[allow(dead_code)]
pub fn workbench(base_url: &str, token: Option<&str>) -> TestWorkbench {
    let credentials = Arc::new(MemoryCredentialStore::new());
    if let Some(token) = token {
        credentials.save(token).expect("failed to store token");
    }
    let downloads = TempDir::new().expect("failed to create tempdir");
    let config = WorkbenchConfig {
        download_dir: downloads.path().to_path_buf(),
        log_flush_timeout_ms: 2000,
        ..Default::default()
    };

    let service = Arc::new(client(base_url, credentials.clone()));
    TestWorkbench {
        workbench: Workbench::new(service, credentials.clone(), config),
        credentials,
        downloads,
    }
}

/// A base URL nothing is listening on.
#[allow(dead_code)]
pub fn unreachable_base_url() -> String {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").expect("failed to bind");
    let port = listener.local_addr().expect("no local addr").port();
    drop(listener);
    format!("http://127.0.0.1:{}", port)
}

/// A base URL whose listener accepts each connection and closes it without
/// answering. Must be called from within a Tokio runtime.
#[allow(dead_code)]
pub async fn dropping_base_url() -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("failed to bind");
    let port = listener.local_addr().expect("no local addr").port();
    tokio::spawn(async move {
        while let Ok((socket, _)) = listener.accept().await {
            drop(socket);
        }
    });
    format!("http://127.0.0.1:{}", port)
}
