//! Eggplant DAI REST API client.

use async_trait::async_trait;
use serde::Deserialize;
use std::time::Duration;

use crate::error::{ListenerError, Result};
use crate::models::{Group, Model, RunDetail, RunList, TestcaseDetail, TestcaseSummary};

use super::session::{check_token_response, decode, Authenticator, Session};

/// DAI operations the listener depends on.
#[async_trait]
pub trait DaiApi: Send + Sync {
    /// One page of the run listing, oldest first.
    async fn get_list_runs_details(&self, limit: u64, offset: u64) -> Result<RunList>;

    async fn get_run(&self, run_id: i64) -> Result<RunDetail>;

    /// Id of the model named exactly `model_name`.
    async fn get_model_id(&self, model_name: &str) -> Result<i64>;

    async fn get_model_testcase_list(&self, model_id: i64) -> Result<Vec<TestcaseSummary>>;

    async fn get_model_testcase(&self, model_id: i64, testcase_id: i64) -> Result<TestcaseDetail>;

    async fn get_group_list(&self) -> Result<Vec<Group>>;
}

struct DaiCredentials {
    username: String,
    password: String,
}

#[derive(Deserialize)]
struct TokenResponse {
    access_token: String,
}

#[async_trait]
impl Authenticator for DaiCredentials {
    async fn authenticate(&self, http: &reqwest::Client, base_url: &str) -> Result<String> {
        const OPERATION: &str = "get DAI access token";

        let response = http
            .post(format!("{}/ai/auth", base_url))
            .form(&[
                ("username", self.username.as_str()),
                ("password", self.password.as_str()),
            ])
            .send()
            .await
            .map_err(|e| ListenerError::transport(OPERATION, e))?;

        let response = check_token_response(response).await?;
        let token: TokenResponse = decode(OPERATION, response).await?;
        Ok(token.access_token)
    }

    fn authorization(&self, token: &str) -> String {
        format!("bearer {}", token)
    }
}

/// HTTP client for the DAI API.
pub struct DaiClient {
    session: Session<DaiCredentials>,
}

impl DaiClient {
    /// Create a client and fetch its first access token.
    pub async fn connect(url: &str, username: &str, password: &str, timeout: Duration) -> Result<Self> {
        let credentials = DaiCredentials {
            username: username.to_string(),
            password: password.to_string(),
        };
        let client = Self {
            session: Session::new(url, timeout, credentials)?,
        };
        client.session.refresh().await?;

        tracing::debug!(url = %client.base_url(), "DAI client authenticated");
        Ok(client)
    }

    pub fn base_url(&self) -> &str {
        self.session.base_url()
    }

    pub async fn get_model_list(&self) -> Result<Vec<Model>> {
        self.session.get_json("/ai/models", "get model list").await
    }
}

#[async_trait]
impl DaiApi for DaiClient {
    async fn get_list_runs_details(&self, limit: u64, offset: u64) -> Result<RunList> {
        self.session
            .get_json(
                &format!("/ai/runs?limit={}&offset={}", limit, offset),
                "get run list",
            )
            .await
    }

    async fn get_run(&self, run_id: i64) -> Result<RunDetail> {
        self.session
            .get_json(
                &format!("/ai/runs/{}", run_id),
                &format!("get run details for {}", run_id),
            )
            .await
    }

    async fn get_model_id(&self, model_name: &str) -> Result<i64> {
        find_model_id(&self.get_model_list().await?, model_name)
    }

    async fn get_model_testcase_list(&self, model_id: i64) -> Result<Vec<TestcaseSummary>> {
        self.session
            .get_json(
                &format!("/ai/models/{}/testcases", model_id),
                &format!("get a list of model testcases for {}", model_id),
            )
            .await
    }

    async fn get_model_testcase(&self, model_id: i64, testcase_id: i64) -> Result<TestcaseDetail> {
        self.session
            .get_json(
                &format!("/ai/models/{}/testcases/{}", model_id, testcase_id),
                &format!("get model {} testcase {}", model_id, testcase_id),
            )
            .await
    }

    async fn get_group_list(&self) -> Result<Vec<Group>> {
        self.session.get_json("/ai/groups", "get group list").await
    }
}

fn find_model_id(models: &[Model], model_name: &str) -> Result<i64> {
    models
        .iter()
        .find(|model| model.name == model_name)
        .map(|model| model.id)
        .ok_or_else(|| ListenerError::Lookup(format!("model {} not found", model_name)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_find_model_id() {
        let models = vec![
            Model { id: 1, name: "Checkout".to_string() },
            Model { id: 2, name: "Checkout v2".to_string() },
        ];

        assert_eq!(find_model_id(&models, "Checkout v2").unwrap(), 2);

        let err = find_model_id(&models, "checkout").unwrap_err();
        assert!(matches!(err, ListenerError::Lookup(_)));
    }

    #[test]
    fn test_authorization_header() {
        let credentials = DaiCredentials {
            username: "user".to_string(),
            password: "secret".to_string(),
        };
        assert_eq!(credentials.authorization("t0k"), "bearer t0k");
    }

    #[tokio::test]
    async fn test_connect_unreachable_host_is_transport_error() {
        // Reserve a free port, then release it so nothing listens there
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let url = format!("http://{}", addr);
        let result = DaiClient::connect(&url, "u", "p", Duration::from_secs(2)).await;
        assert!(matches!(result, Err(ListenerError::Transport { .. })));
    }
}
