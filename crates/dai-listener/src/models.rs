//! DAI resources as returned by the REST API.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Test status of a DAI run.
///
/// `INCOMPLETE` is the only non-terminal status. Statuses the listener has no
/// variant for are kept verbatim so they can still be looked up in the
/// mapping table.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum RunStatus {
    Incomplete,
    Passed,
    Failed,
    Error,
    Cancelled,
    Other(String),
}

impl RunStatus {
    pub fn as_str(&self) -> &str {
        match self {
            RunStatus::Incomplete => "INCOMPLETE",
            RunStatus::Passed => "PASSED",
            RunStatus::Failed => "FAILED",
            RunStatus::Error => "ERROR",
            RunStatus::Cancelled => "CANCELLED",
            RunStatus::Other(s) => s,
        }
    }

    /// Any status other than `INCOMPLETE`.
    pub fn is_terminal(&self) -> bool {
        !matches!(self, RunStatus::Incomplete)
    }
}

impl From<String> for RunStatus {
    fn from(s: String) -> Self {
        match s.as_str() {
            "INCOMPLETE" => RunStatus::Incomplete,
            "PASSED" => RunStatus::Passed,
            "FAILED" => RunStatus::Failed,
            "ERROR" => RunStatus::Error,
            "CANCELLED" => RunStatus::Cancelled,
            _ => RunStatus::Other(s),
        }
    }
}

impl From<RunStatus> for String {
    fn from(status: RunStatus) -> Self {
        status.as_str().to_string()
    }
}

impl fmt::Display for RunStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Kind of DAI run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum RunType {
    /// Run targeting a single named testcase.
    Directed,
    /// Exploratory and every other run type.
    Other(String),
}

impl RunType {
    pub fn as_str(&self) -> &str {
        match self {
            RunType::Directed => "directed",
            RunType::Other(s) => s,
        }
    }

    pub fn is_directed(&self) -> bool {
        matches!(self, RunType::Directed)
    }
}

impl From<String> for RunType {
    fn from(s: String) -> Self {
        if s == "directed" {
            RunType::Directed
        } else {
            RunType::Other(s)
        }
    }
}

impl From<RunType> for String {
    fn from(run_type: RunType) -> Self {
        run_type.as_str().to_string()
    }
}

impl fmt::Display for RunType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Entry of the run listing endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunSummary {
    pub id: i64,

    pub groupid: i64,

    pub teststatus: RunStatus,

    pub runtype: RunType,

    #[serde(default)]
    pub modelname: Option<String>,

    #[serde(default)]
    pub testcase: Option<String>,
}

/// One page of the run listing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunList {
    /// Total number of runs visible to the user, across all pages.
    pub total_count: u64,

    #[serde(default)]
    pub items: Vec<RunSummary>,
}

/// Full run details, polled by a watcher until the run is terminal.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunDetail {
    pub id: i64,

    pub teststatus: RunStatus,

    pub runtype: RunType,

    pub modelname: String,

    /// Testcase name; only directed runs carry one.
    #[serde(default)]
    pub testcase: Option<String>,

    #[serde(default)]
    pub starttime: Option<String>,

    #[serde(default)]
    pub endtime: Option<String>,
}

/// DAI model, as listed by `/ai/models`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Model {
    pub id: i64,
    pub name: String,
}

/// DAI user group.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Group {
    pub id: i64,
    pub groupname: String,
}

/// Entry of a model's testcase list.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TestcaseSummary {
    pub id: i64,

    #[serde(rename = "testcaseName")]
    pub testcase_name: String,
}

/// Testcase details, including the identifier XRAY knows it by.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TestcaseDetail {
    pub id: i64,

    #[serde(rename = "testcaseName", default)]
    pub testcase_name: Option<String>,

    #[serde(rename = "testcaseExternalID", default)]
    pub testcase_external_id: Option<String>,
}
