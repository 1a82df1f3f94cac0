//! Authenticated HTTP session shared by the DAI and XRAY clients.

use async_trait::async_trait;
use reqwest::header::AUTHORIZATION;
use reqwest::{RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::time::Duration;
use tokio::sync::RwLock;

use crate::error::{ListenerError, Result};

use super::normalize_base_url;

/// Obtains access tokens for one API.
#[async_trait]
pub(crate) trait Authenticator: Send + Sync {
    /// Request a fresh access token.
    async fn authenticate(&self, http: &reqwest::Client, base_url: &str) -> Result<String>;

    /// `Authorization` header value carrying `token`.
    fn authorization(&self, token: &str) -> String;
}

/// HTTP client holding a cached access token.
///
/// A request rejected with 401 triggers one token refresh and one retry; a
/// second 401 is reported as [`ListenerError::Auth`].
pub(crate) struct Session<A> {
    http: reqwest::Client,
    base_url: String,
    token: RwLock<Option<String>>,
    auth: A,
}

impl<A: Authenticator> Session<A> {
    pub(crate) fn new(base_url: &str, timeout: Duration, auth: A) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ListenerError::Config(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            http,
            base_url: normalize_base_url(base_url),
            token: RwLock::new(None),
            auth,
        })
    }

    pub(crate) fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Replace the cached token with a fresh one.
    pub(crate) async fn refresh(&self) -> Result<()> {
        let token = self.auth.authenticate(&self.http, &self.base_url).await?;
        *self.token.write().await = Some(token);
        Ok(())
    }

    async fn current_token(&self) -> Result<String> {
        if let Some(token) = self.token.read().await.clone() {
            return Ok(token);
        }
        self.refresh().await?;
        self.token
            .read()
            .await
            .clone()
            .ok_or_else(|| ListenerError::Auth("no access token after refresh".to_string()))
    }

    pub(crate) async fn get_json<T: DeserializeOwned>(&self, path: &str, operation: &str) -> Result<T> {
        let response = self.send(path, operation, |http, url| http.get(url)).await?;
        decode(operation, response).await
    }

    pub(crate) async fn post_json<B, T>(&self, path: &str, body: &B, operation: &str) -> Result<T>
    where
        B: Serialize + Sync + ?Sized,
        T: DeserializeOwned,
    {
        let response = self
            .send(path, operation, |http, url| http.post(url).json(body))
            .await?;
        decode(operation, response).await
    }

    async fn send<F>(&self, path: &str, operation: &str, build: F) -> Result<Response>
    where
        F: Fn(&reqwest::Client, String) -> RequestBuilder + Send + Sync,
    {
        let url = format!("{}{}", self.base_url, path);
        let mut refreshed = false;

        loop {
            let token = self.current_token().await?;
            let response = build(&self.http, url.clone())
                .header(AUTHORIZATION, self.auth.authorization(&token))
                .send()
                .await
                .map_err(|e| ListenerError::transport(operation, e))?;

            let status = response.status();
            if status == StatusCode::UNAUTHORIZED {
                let body = response.text().await.unwrap_or_default();
                if refreshed {
                    // The fresh token was rejected too
                    return Err(ListenerError::Auth(body));
                }

                tracing::debug!(operation, "Access token rejected, refreshing");
                refreshed = true;
                self.refresh().await?;
                continue;
            }

            if !status.is_success() {
                let body = response.text().await.unwrap_or_default();
                return Err(ListenerError::Api {
                    operation: operation.to_string(),
                    status: status.as_u16(),
                    body,
                });
            }

            return Ok(response);
        }
    }
}

/// Read a response body as JSON.
pub(crate) async fn decode<T: DeserializeOwned>(operation: &str, response: Response) -> Result<T> {
    let body = response
        .text()
        .await
        .map_err(|e| ListenerError::transport(operation, e))?;
    serde_json::from_str(&body).map_err(|e| ListenerError::decode(operation, e))
}

/// Turn a token endpoint response into an error unless it succeeded.
pub(crate) async fn check_token_response(response: Response) -> Result<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    Err(ListenerError::Auth(format!(
        "Failed to get access token ({}): {}",
        status.as_u16(),
        body
    )))
}
