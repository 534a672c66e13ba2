//! Test helper functions and utilities.

use paygate_api::{AppState, build_app};
use paygate_billing::SIGNATURE_HEADER;
use reqwest::Client;
use reqwest::redirect::Policy;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;

/// Start an API server for testing and return its address.
pub async fn start_test_server(
    state: AppState,
) -> anyhow::Result<(SocketAddr, tokio::task::JoinHandle<()>)> {
    let app = build_app(Arc::new(state));
    let listener = TcpListener::bind("127.0.0.1:0").await?;
    let addr = listener.local_addr()?;

    let handle = tokio::spawn(async move {
        if let Err(e) = axum::serve(listener, app).await {
            tracing::error!(error = %e, "Test server failed");
        }
    });

    Ok((addr, handle))
}

/// Create an HTTP client for testing. Redirects are not followed so
/// checkout responses can be inspected.
pub fn test_client() -> Client {
    Client::builder()
        .timeout(std::time::Duration::from_secs(30))
        .redirect(Policy::none())
        .build()
        .expect("Failed to create test client")
}

/// API test client with base URL.
pub struct ApiTestClient {
    client: Client,
    base_url: String,
}

impl ApiTestClient {
    pub fn new(addr: SocketAddr) -> Self {
        Self {
            client: test_client(),
            base_url: format!("http://{}", addr),
        }
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    pub async fn get(&self, path: &str) -> reqwest::Result<reqwest::Response> {
        self.client.get(self.url(path)).send().await
    }

    /// Call the paid endpoint, optionally presenting a key.
    pub async fn call_api(&self, api_key: Option<&str>) -> reqwest::Result<reqwest::Response> {
        let mut request = self.client.get(self.url("/api"));
        if let Some(key) = api_key {
            request = request.header("x-api-key", key);
        }
        request.send().await
    }

    /// Deliver a webhook body, optionally with a signature header.
    pub async fn post_webhook(
        &self,
        body: Vec<u8>,
        signature: Option<&str>,
    ) -> reqwest::Result<reqwest::Response> {
        let mut request = self
            .client
            .post(self.url("/webhook"))
            .header("content-type", "application/json")
            .body(body);
        if let Some(signature) = signature {
            request = request.header(SIGNATURE_HEADER, signature);
        }
        request.send().await
    }

    /// Check health endpoint.
    pub async fn health(&self) -> anyhow::Result<bool> {
        let resp = self.get("/health").await?;
        Ok(resp.status().is_success())
    }
}
