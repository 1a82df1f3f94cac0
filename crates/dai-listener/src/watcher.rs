//! Per-run watcher.
//!
//! A watcher polls one DAI run until it leaves `INCOMPLETE`. A finished
//! directed run is matched to its testcase, translated through the mapping
//! table and imported into XRAY. Any other run type is only logged. Errors end
//! the watcher; they never propagate to the discovery loop or to other
//! watchers.

use std::sync::Arc;

use crate::client::{DaiApi, XrayApi};
use crate::error::{ListenerError, Result};
use crate::mapping::{map_result, MappingConfig};
use crate::models::{RunDetail, RunStatus, TestcaseDetail};
use crate::payload::{ExecutionInfoTemplate, ExecutionPayload, ExecutionResult};
use crate::poll::{poll_until, PollPolicy};

/// Watcher lifecycle state. Both terminal states are final.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WatcherState {
    /// Run is still `INCOMPLETE`.
    Polling,
    /// Directed run reached a terminal status.
    DirectedTerminal,
    /// Any other run type reached a terminal status.
    OtherTerminal,
}

impl WatcherState {
    pub fn of(run: &RunDetail) -> Self {
        if !run.teststatus.is_terminal() {
            WatcherState::Polling
        } else if run.runtype.is_directed() {
            WatcherState::DirectedTerminal
        } else {
            WatcherState::OtherTerminal
        }
    }
}

/// How a watcher ended.
#[derive(Debug)]
pub enum WatchOutcome {
    /// Directed run imported into XRAY.
    Submitted {
        status: RunStatus,
        result: ExecutionResult,
    },
    /// Non-directed run finished; nothing was submitted.
    Completed { status: RunStatus },
    /// Resolution, submission or polling failed.
    Failed(ListenerError),
}

impl WatchOutcome {
    pub fn is_failed(&self) -> bool {
        matches!(self, WatchOutcome::Failed(_))
    }

    /// The run never reached a terminal status within the poll timeout.
    pub fn is_timed_out(&self) -> bool {
        matches!(self, WatchOutcome::Failed(ListenerError::Timeout(_)))
    }
}

/// Collaborators and settings shared by every watcher.
#[derive(Clone)]
pub struct WatcherContext {
    pub dai: Arc<dyn DaiApi>,
    pub xray: Arc<dyn XrayApi>,
    pub mapping: Arc<MappingConfig>,
    pub template: Arc<ExecutionInfoTemplate>,
    pub poll: PollPolicy,
}

/// Watches a single run to completion.
pub struct RunWatcher {
    run_id: i64,
    ctx: WatcherContext,
}

impl RunWatcher {
    pub fn new(run_id: i64, ctx: WatcherContext) -> Self {
        Self { run_id, ctx }
    }

    pub fn run_id(&self) -> i64 {
        self.run_id
    }

    /// Watch the run until it is terminal, then post-process it.
    ///
    /// Never fails: errors are logged and returned as [`WatchOutcome::Failed`].
    pub async fn run(self) -> WatchOutcome {
        tracing::info!(run_id = self.run_id, "Watcher started");

        let outcome = match self.watch().await {
            Ok(outcome) => outcome,
            Err(e) => WatchOutcome::Failed(e),
        };

        match &outcome {
            WatchOutcome::Submitted { status, result } => tracing::info!(
                run_id = self.run_id,
                status = %status,
                execution_key = result.key.as_deref().unwrap_or("unknown"),
                "Execution imported into XRAY"
            ),
            WatchOutcome::Completed { status } => tracing::info!(
                run_id = self.run_id,
                status = %status,
                "Execution has finished"
            ),
            WatchOutcome::Failed(e) => tracing::error!(
                run_id = self.run_id,
                kind = e.kind(),
                error = %e,
                "Watcher failed"
            ),
        }

        outcome
    }

    async fn watch(&self) -> Result<WatchOutcome> {
        let run = self.wait_for_terminal().await?;

        match WatcherState::of(&run) {
            WatcherState::DirectedTerminal => {
                let payload = self.build_payload(&run).await?;
                tracing::debug!(
                    run_id = self.run_id,
                    payload = %serde_json::to_string(&payload).unwrap_or_default(),
                    "Submitting execution"
                );

                let result = self.ctx.xray.post_execution(&payload).await?;
                Ok(WatchOutcome::Submitted {
                    status: run.teststatus,
                    result,
                })
            }
            _ => {
                tracing::info!(
                    run_id = self.run_id,
                    runtype = %run.runtype,
                    "Not a testcase execution, ignoring results"
                );
                Ok(WatchOutcome::Completed {
                    status: run.teststatus,
                })
            }
        }
    }

    async fn wait_for_terminal(&self) -> Result<RunDetail> {
        let dai = &self.ctx.dai;
        let run_id = self.run_id;

        poll_until(
            &self.ctx.poll,
            move || async move {
                let run = dai.get_run(run_id).await?;
                if !run.teststatus.is_terminal() {
                    tracing::debug!(run_id, runtype = %run.runtype, "Run in progress");
                }
                Ok(run)
            },
            |run: &RunDetail| run.teststatus.is_terminal(),
        )
        .await
    }

    /// Find the DAI testcase a directed run executed.
    pub async fn resolve_testcase(&self, run: &RunDetail) -> Result<TestcaseDetail> {
        let testcase_name = run.testcase.as_deref().ok_or_else(|| {
            ListenerError::Lookup(format!("directed run {} has no testcase", run.id))
        })?;

        let model_id = self.ctx.dai.get_model_id(&run.modelname).await?;
        let testcase_id = self
            .ctx
            .dai
            .get_model_testcase_list(model_id)
            .await?
            .into_iter()
            .find(|testcase| testcase.testcase_name == testcase_name)
            .map(|testcase| testcase.id)
            .ok_or_else(|| {
                ListenerError::Lookup(format!(
                    "testcase {} not found in model {}",
                    testcase_name, run.modelname
                ))
            })?;

        self.ctx.dai.get_model_testcase(model_id, testcase_id).await
    }

    async fn build_payload(&self, run: &RunDetail) -> Result<ExecutionPayload> {
        let testcase = self.resolve_testcase(run).await?;
        let test_key = testcase
            .testcase_external_id
            .as_deref()
            .filter(|id| !id.is_empty())
            .ok_or_else(|| {
                ListenerError::Lookup(format!(
                    "testcase {} has no external id",
                    testcase.testcase_name.as_deref().unwrap_or("?")
                ))
            })?;

        Ok(map_result(&self.ctx.mapping, &self.ctx.template, run, test_key))
    }
}
