//! XRAY execution import payload.

use serde::{Deserialize, Serialize};

/// Body of `POST /api/v2/import/execution`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecutionPayload {
    pub info: ExecutionInfo,
    pub tests: Vec<ExecutionTest>,
}

/// Test execution issue fields.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecutionInfo {
    pub summary: String,
    pub description: String,
    pub version: String,
    pub user: String,
    pub revision: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub start_date: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub finish_date: Option<String>,

    pub test_plan_key: String,
    pub test_environments: Vec<String>,
}

/// Result of a single XRAY test within the execution.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecutionTest {
    pub test_key: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub start: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub finish: Option<String>,

    pub comment: String,
    pub status: String,
}

/// Test execution issue created by the import.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ExecutionResult {
    #[serde(default)]
    pub id: Option<String>,

    #[serde(default)]
    pub key: Option<String>,

    #[serde(rename = "self", default)]
    pub self_url: Option<String>,
}

/// Static text copied into every execution's `info` block.
#[derive(Debug, Clone)]
pub struct ExecutionInfoTemplate {
    pub summary: String,
    pub description: String,
    pub version: String,
    pub user: String,
    pub revision: String,
    pub test_environments: Vec<String>,
}

impl Default for ExecutionInfoTemplate {
    fn default() -> Self {
        Self {
            summary: "Execution of automated tests for release v1.0 - update via API".to_string(),
            description: "This execution is automatically created when importing execution \
                          results from an external source"
                .to_string(),
            version: "1.0.0".to_string(),
            user: "dai-listener".to_string(),
            revision: "1.0.0".to_string(),
            test_environments: vec!["TestEnvironmentA".to_string()],
        }
    }
}
