//! XRAY cloud REST API client.

use async_trait::async_trait;
use serde::Serialize;
use std::time::Duration;

use crate::error::{ListenerError, Result};
use crate::payload::{ExecutionPayload, ExecutionResult};

use super::session::{check_token_response, decode, Authenticator, Session};

/// XRAY operations the listener depends on.
#[async_trait]
pub trait XrayApi: Send + Sync {
    /// Import one test execution.
    async fn post_execution(&self, payload: &ExecutionPayload) -> Result<ExecutionResult>;
}

#[derive(Serialize)]
struct XrayCredentials {
    client_id: String,
    client_secret: String,
}

#[async_trait]
impl Authenticator for XrayCredentials {
    async fn authenticate(&self, http: &reqwest::Client, base_url: &str) -> Result<String> {
        const OPERATION: &str = "get XRAY access token";

        let response = http
            .post(format!("{}/api/v2/authenticate", base_url))
            .json(self)
            .send()
            .await
            .map_err(|e| ListenerError::transport(OPERATION, e))?;

        // The token comes back as a bare JSON string
        let response = check_token_response(response).await?;
        decode(OPERATION, response).await
    }

    fn authorization(&self, token: &str) -> String {
        format!("Bearer {}", token)
    }
}

/// HTTP client for the XRAY API.
pub struct XrayClient {
    session: Session<XrayCredentials>,
}

impl XrayClient {
    /// Create a client and fetch its first access token.
    pub async fn connect(
        url: &str,
        client_id: &str,
        client_secret: &str,
        timeout: Duration,
    ) -> Result<Self> {
        let credentials = XrayCredentials {
            client_id: client_id.to_string(),
            client_secret: client_secret.to_string(),
        };
        let client = Self {
            session: Session::new(url, timeout, credentials)?,
        };
        client.session.refresh().await?;

        tracing::debug!(url = %client.base_url(), "XRAY client authenticated");
        Ok(client)
    }

    pub fn base_url(&self) -> &str {
        self.session.base_url()
    }
}

#[async_trait]
impl XrayApi for XrayClient {
    async fn post_execution(&self, payload: &ExecutionPayload) -> Result<ExecutionResult> {
        self.session
            .post_json("/api/v2/import/execution", payload, "import test execution")
            .await
    }
}
