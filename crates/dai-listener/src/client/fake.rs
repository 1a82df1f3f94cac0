//! In-memory DAI and XRAY collaborators for tests.

use async_trait::async_trait;
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

use crate::error::{ListenerError, Result};
use crate::models::{
    Group, Model, RunDetail, RunList, RunStatus, RunSummary, RunType, TestcaseDetail,
    TestcaseSummary,
};
use crate::payload::{ExecutionPayload, ExecutionResult};

use super::{DaiApi, XrayApi};

pub(crate) fn run_detail(id: i64, runtype: RunType, status: RunStatus) -> RunDetail {
    RunDetail {
        id,
        teststatus: status,
        runtype,
        modelname: "Checkout".to_string(),
        testcase: Some("Login".to_string()),
        starttime: Some("T0".to_string()),
        endtime: Some("T1".to_string()),
    }
}

pub(crate) fn summary(id: i64, groupid: i64, status: RunStatus, runtype: RunType) -> RunSummary {
    RunSummary {
        id,
        groupid,
        teststatus: status,
        runtype,
        modelname: Some("Checkout".to_string()),
        testcase: Some("Login".to_string()),
    }
}

/// DAI fake. Each run replays a queue of states; the last one repeats.
#[derive(Default)]
pub(crate) struct FakeDai {
    runs: Mutex<HashMap<i64, VecDeque<RunDetail>>>,
    summaries: Mutex<Vec<RunSummary>>,
    models: Vec<Model>,
    testcases: HashMap<i64, Vec<TestcaseSummary>>,
    details: HashMap<(i64, i64), TestcaseDetail>,
    groups: Vec<Group>,
    fail_listing: AtomicBool,
    calls: Mutex<Vec<String>>,
}

impl FakeDai {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn with_run(self, id: i64, states: Vec<RunDetail>) -> Self {
        self.set_run(id, states);
        self
    }

    pub(crate) fn with_model(mut self, id: i64, name: &str) -> Self {
        self.models.push(Model {
            id,
            name: name.to_string(),
        });
        self
    }

    pub(crate) fn with_testcase(
        mut self,
        model_id: i64,
        testcase_id: i64,
        name: &str,
        external_id: Option<&str>,
    ) -> Self {
        self.testcases.entry(model_id).or_default().push(TestcaseSummary {
            id: testcase_id,
            testcase_name: name.to_string(),
        });
        self.details.insert(
            (model_id, testcase_id),
            TestcaseDetail {
                id: testcase_id,
                testcase_name: Some(name.to_string()),
                testcase_external_id: external_id.map(str::to_string),
            },
        );
        self
    }

    pub(crate) fn with_group(mut self, id: i64, name: &str) -> Self {
        self.groups.push(Group {
            id,
            groupname: name.to_string(),
        });
        self
    }

    pub(crate) fn with_summaries(self, summaries: Vec<RunSummary>) -> Self {
        self.set_summaries(summaries);
        self
    }

    pub(crate) fn set_run(&self, id: i64, states: Vec<RunDetail>) {
        self.runs.lock().unwrap().insert(id, states.into());
    }

    pub(crate) fn set_summaries(&self, summaries: Vec<RunSummary>) {
        *self.summaries.lock().unwrap() = summaries;
    }

    pub(crate) fn set_listing_failure(&self, fail: bool) {
        self.fail_listing.store(fail, Ordering::SeqCst);
    }

    pub(crate) fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    pub(crate) fn count_calls(&self, prefix: &str) -> usize {
        self.calls().iter().filter(|c| c.starts_with(prefix)).count()
    }

    fn record(&self, call: String) {
        self.calls.lock().unwrap().push(call);
    }
}

fn not_found(operation: String) -> ListenerError {
    ListenerError::Api {
        operation,
        status: 404,
        body: "not found".to_string(),
    }
}

#[async_trait]
impl DaiApi for FakeDai {
    async fn get_list_runs_details(&self, limit: u64, offset: u64) -> Result<RunList> {
        self.record(format!("list {} {}", limit, offset));
        if self.fail_listing.load(Ordering::SeqCst) {
            return Err(ListenerError::Transport {
                operation: "get run list".to_string(),
                message: "connection refused".to_string(),
            });
        }

        // Listed status follows the run's next polled state
        let runs = self.runs.lock().unwrap();
        let summaries = self.summaries.lock().unwrap();
        let items = summaries
            .iter()
            .skip(offset as usize)
            .take(limit as usize)
            .map(|summary| {
                let mut summary = summary.clone();
                if let Some(state) = runs.get(&summary.id).and_then(|states| states.front()) {
                    summary.teststatus = state.teststatus.clone();
                }
                summary
            })
            .collect();
        Ok(RunList {
            total_count: summaries.len() as u64,
            items,
        })
    }

    async fn get_run(&self, run_id: i64) -> Result<RunDetail> {
        self.record(format!("run {}", run_id));
        let mut runs = self.runs.lock().unwrap();
        let states = runs
            .get_mut(&run_id)
            .ok_or_else(|| not_found(format!("get run details for {}", run_id)))?;

        let state = if states.len() > 1 {
            states.pop_front()
        } else {
            states.front().cloned()
        };
        state.ok_or_else(|| not_found(format!("get run details for {}", run_id)))
    }

    async fn get_model_id(&self, model_name: &str) -> Result<i64> {
        self.record(format!("model {}", model_name));
        self.models
            .iter()
            .find(|m| m.name == model_name)
            .map(|m| m.id)
            .ok_or_else(|| ListenerError::Lookup(format!("model {} not found", model_name)))
    }

    async fn get_model_testcase_list(&self, model_id: i64) -> Result<Vec<TestcaseSummary>> {
        self.record(format!("testcases {}", model_id));
        Ok(self.testcases.get(&model_id).cloned().unwrap_or_default())
    }

    async fn get_model_testcase(&self, model_id: i64, testcase_id: i64) -> Result<TestcaseDetail> {
        self.record(format!("testcase {} {}", model_id, testcase_id));
        self.details
            .get(&(model_id, testcase_id))
            .cloned()
            .ok_or_else(|| not_found(format!("get model {} testcase {}", model_id, testcase_id)))
    }

    async fn get_group_list(&self) -> Result<Vec<Group>> {
        self.record("groups".to_string());
        Ok(self.groups.clone())
    }
}

/// XRAY fake recording every imported payload.
#[derive(Default)]
pub(crate) struct FakeXray {
    submitted: Mutex<Vec<ExecutionPayload>>,
    fail: AtomicBool,
}

impl FakeXray {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn failing() -> Self {
        let xray = Self::default();
        xray.fail.store(true, Ordering::SeqCst);
        xray
    }

    pub(crate) fn submitted(&self) -> Vec<ExecutionPayload> {
        self.submitted.lock().unwrap().clone()
    }
}

#[async_trait]
impl XrayApi for FakeXray {
    async fn post_execution(&self, payload: &ExecutionPayload) -> Result<ExecutionResult> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(ListenerError::Api {
                operation: "import test execution".to_string(),
                status: 400,
                body: "invalid testPlanKey".to_string(),
            });
        }

        let mut submitted = self.submitted.lock().unwrap();
        submitted.push(payload.clone());
        Ok(ExecutionResult {
            id: Some(submitted.len().to_string()),
            key: Some(format!("EXEC-{}", submitted.len())),
            self_url: None,
        })
    }
}
