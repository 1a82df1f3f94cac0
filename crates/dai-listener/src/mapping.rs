//! Mapping table from DAI vocabulary to XRAY vocabulary, and the result mapper.
//!
//! The mapping file has the shape
//!
//! ```json
//! {
//!   "xray": {
//!     "testPlanKey": {
//!       "RegressionPlan": ["JIRA-7", "JIRA-8"],
//!       "DEFAULT": "SmokePlan"
//!     },
//!     "teststatus": {
//!       "PASSED": "PASSED",
//!       "FAILED": "FAILED",
//!       "DEFAULT": "TODO"
//!     }
//!   }
//! }
//! ```
//!
//! Test plan buckets are searched in the order they are declared in the file,
//! and the first bucket listing the testcase's external id wins.

use serde::Deserialize;
use std::collections::HashMap;
use std::path::Path;

use crate::error::{ListenerError, Result};
use crate::models::{RunDetail, RunStatus};
use crate::payload::{ExecutionInfo, ExecutionInfoTemplate, ExecutionPayload, ExecutionTest};

/// Key of the fallback entry in both mapping tables.
pub const DEFAULT_KEY: &str = "DEFAULT";

/// Comment attached to every imported test result.
pub const EXECUTION_COMMENT: &str = "Execution finished";

#[derive(Debug, Deserialize)]
struct MappingFile {
    xray: XrayMapping,
}

#[derive(Debug, Deserialize)]
struct XrayMapping {
    #[serde(rename = "testPlanKey")]
    test_plan_key: serde_json::Map<String, serde_json::Value>,
    teststatus: HashMap<String, String>,
}

/// Test plan bucket: every external test id listed in it belongs to the plan.
#[derive(Debug, Clone, PartialEq)]
pub struct PlanBucket {
    pub key: String,
    pub test_keys: Vec<String>,
}

/// Validated mapping table. Immutable once loaded.
#[derive(Debug, Clone)]
pub struct MappingConfig {
    buckets: Vec<PlanBucket>,
    default_plan_key: String,
    statuses: HashMap<String, String>,
    default_status: String,
}

impl MappingConfig {
    /// Load and validate the mapping file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            ListenerError::Config(format!("Failed to read mapping file {}: {}", path.display(), e))
        })?;

        Self::from_json(&content).map_err(|e| match e {
            ListenerError::Config(msg) => {
                ListenerError::Config(format!("{} ({})", msg, path.display()))
            }
            other => other,
        })
    }

    /// Parse and validate a mapping document.
    pub fn from_json(content: &str) -> Result<Self> {
        let file: MappingFile = serde_json::from_str(content)
            .map_err(|e| ListenerError::Config(format!("Invalid mapping JSON: {}", e)))?;

        let mut buckets = Vec::new();
        let mut default_plan_key = None;

        for (name, value) in file.xray.test_plan_key {
            if name == DEFAULT_KEY {
                let key = value.as_str().ok_or_else(|| {
                    ListenerError::Config("testPlanKey.DEFAULT must be a string".to_string())
                })?;
                default_plan_key = Some(key.to_string());
                continue;
            }

            let test_keys: Vec<String> = serde_json::from_value(value).map_err(|e| {
                ListenerError::Config(format!(
                    "testPlanKey.{} must be a list of test keys: {}",
                    name, e
                ))
            })?;
            buckets.push(PlanBucket {
                key: name,
                test_keys,
            });
        }

        let default_plan_key = default_plan_key.ok_or_else(|| {
            ListenerError::Config("testPlanKey has no DEFAULT entry".to_string())
        })?;

        let mut statuses = file.xray.teststatus;
        let default_status = statuses.remove(DEFAULT_KEY).ok_or_else(|| {
            ListenerError::Config("teststatus has no DEFAULT entry".to_string())
        })?;

        Ok(Self {
            buckets,
            default_plan_key,
            statuses,
            default_status,
        })
    }

    /// Buckets in declaration order, excluding the default.
    pub fn buckets(&self) -> &[PlanBucket] {
        &self.buckets
    }

    /// Test plan holding `test_key`, or the default plan.
    pub fn resolve_test_plan_key(&self, test_key: &str) -> &str {
        self.buckets
            .iter()
            .find(|bucket| bucket.test_keys.iter().any(|k| k == test_key))
            .map(|bucket| bucket.key.as_str())
            .unwrap_or(self.default_plan_key.as_str())
    }

    /// XRAY status for a DAI status, or the default status.
    pub fn resolve_status(&self, status: &RunStatus) -> &str {
        self.statuses
            .get(status.as_str())
            .map(String::as_str)
            .unwrap_or(self.default_status.as_str())
    }
}

/// Translate a finished directed run into an XRAY execution import.
///
/// `test_key` is the testcase's external id. Timestamps are copied from the
/// run as-is, so equal inputs always produce equal payloads.
pub fn map_result(
    mapping: &MappingConfig,
    template: &ExecutionInfoTemplate,
    run: &RunDetail,
    test_key: &str,
) -> ExecutionPayload {
    let test_plan_key = mapping.resolve_test_plan_key(test_key).to_string();
    let status = mapping.resolve_status(&run.teststatus).to_string();

    ExecutionPayload {
        info: ExecutionInfo {
            summary: template.summary.clone(),
            description: template.description.clone(),
            version: template.version.clone(),
            user: template.user.clone(),
            revision: template.revision.clone(),
            start_date: run.starttime.clone(),
            finish_date: run.endtime.clone(),
            test_plan_key,
            test_environments: template.test_environments.clone(),
        },
        tests: vec![ExecutionTest {
            test_key: test_key.to_string(),
            start: run.starttime.clone(),
            finish: run.endtime.clone(),
            comment: EXECUTION_COMMENT.to_string(),
            status,
        }],
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::RunType;
    use std::io::Write;

    const MAPPING: &str = r#"{
        "xray": {
            "testPlanKey": {
                "RegressionPlan": ["JIRA-7", "JIRA-8"],
                "NightlyPlan": ["JIRA-8", "JIRA-9"],
                "DEFAULT": "SmokePlan"
            },
            "teststatus": {
                "PASSED": "PASSED",
                "FAILED": "FAILED",
                "DEFAULT": "TODO"
            }
        }
    }"#;

    fn finished_run(status: RunStatus) -> RunDetail {
        RunDetail {
            id: 42,
            teststatus: status,
            runtype: RunType::Directed,
            modelname: "Checkout".to_string(),
            testcase: Some("Login".to_string()),
            starttime: Some("T0".to_string()),
            endtime: Some("T1".to_string()),
        }
    }

    #[test]
    fn test_buckets_keep_declaration_order() {
        let mapping = MappingConfig::from_json(MAPPING).unwrap();
        let keys: Vec<&str> = mapping.buckets().iter().map(|b| b.key.as_str()).collect();
        assert_eq!(keys, vec!["RegressionPlan", "NightlyPlan"]);
    }

    #[test]
    fn test_resolve_test_plan_key() {
        let mapping = MappingConfig::from_json(MAPPING).unwrap();
        assert_eq!(mapping.resolve_test_plan_key("JIRA-9"), "NightlyPlan");
        assert_eq!(mapping.resolve_test_plan_key("JIRA-404"), "SmokePlan");
    }

    #[test]
    fn test_first_declared_bucket_wins() {
        let mapping = MappingConfig::from_json(MAPPING).unwrap();
        assert_eq!(mapping.resolve_test_plan_key("JIRA-8"), "RegressionPlan");
    }

    #[test]
    fn test_resolve_status() {
        let mapping = MappingConfig::from_json(MAPPING).unwrap();
        assert_eq!(mapping.resolve_status(&RunStatus::Failed), "FAILED");
        assert_eq!(mapping.resolve_status(&RunStatus::Error), "TODO");
        assert_eq!(
            mapping.resolve_status(&RunStatus::Other("ABORTED".to_string())),
            "TODO"
        );
    }

    #[test]
    fn test_map_result_builds_single_test_entry() {
        let mapping = MappingConfig::from_json(MAPPING).unwrap();
        let template = ExecutionInfoTemplate::default();
        let payload = map_result(&mapping, &template, &finished_run(RunStatus::Passed), "JIRA-7");

        assert_eq!(payload.info.test_plan_key, "RegressionPlan");
        assert_eq!(payload.info.start_date.as_deref(), Some("T0"));
        assert_eq!(payload.info.finish_date.as_deref(), Some("T1"));
        assert_eq!(payload.info.test_environments, template.test_environments);
        assert_eq!(payload.tests.len(), 1);

        let test = &payload.tests[0];
        assert_eq!(test.test_key, "JIRA-7");
        assert_eq!(test.status, "PASSED");
        assert_eq!(test.start.as_deref(), Some("T0"));
        assert_eq!(test.finish.as_deref(), Some("T1"));
        assert_eq!(test.comment, EXECUTION_COMMENT);
    }

    #[test]
    fn test_map_result_is_deterministic() {
        let mapping = MappingConfig::from_json(MAPPING).unwrap();
        let template = ExecutionInfoTemplate::default();
        let run = finished_run(RunStatus::Failed);

        let first = serde_json::to_string(&map_result(&mapping, &template, &run, "JIRA-9")).unwrap();
        let second = serde_json::to_string(&map_result(&mapping, &template, &run, "JIRA-9")).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_missing_defaults_rejected() {
        let no_plan_default = r#"{"xray": {"testPlanKey": {"A": ["X-1"]}, "teststatus": {"DEFAULT": "TODO"}}}"#;
        let err = MappingConfig::from_json(no_plan_default).unwrap_err();
        assert!(matches!(err, ListenerError::Config(_)));
        assert!(err.to_string().contains("testPlanKey"));

        let no_status_default = r#"{"xray": {"testPlanKey": {"DEFAULT": "P"}, "teststatus": {}}}"#;
        let err = MappingConfig::from_json(no_status_default).unwrap_err();
        assert!(err.to_string().contains("teststatus"));
    }

    #[test]
    fn test_malformed_bucket_rejected() {
        let bad = r#"{"xray": {"testPlanKey": {"A": "X-1", "DEFAULT": "P"}, "teststatus": {"DEFAULT": "TODO"}}}"#;
        let err = MappingConfig::from_json(bad).unwrap_err();
        assert!(err.to_string().contains("testPlanKey.A"));
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(MAPPING.as_bytes()).unwrap();

        let mapping = MappingConfig::load(file.path()).unwrap();
        assert_eq!(mapping.resolve_test_plan_key("JIRA-7"), "RegressionPlan");
    }

    #[test]
    fn test_example_mapping_is_valid() {
        let path = concat!(env!("CARGO_MANIFEST_DIR"), "/mapping.example.json");
        let mapping = MappingConfig::load(path).unwrap();
        assert_eq!(mapping.resolve_test_plan_key("DEMO-12"), "NightlyPlan");
        assert_eq!(mapping.resolve_status(&RunStatus::Error), "FAILED");
    }

    #[test]
    fn test_load_missing_file() {
        let err = MappingConfig::load("/nonexistent/mapping.json").unwrap_err();
        assert!(matches!(err, ListenerError::Config(_)));
        assert!(err.to_string().contains("/nonexistent/mapping.json"));
    }
}
