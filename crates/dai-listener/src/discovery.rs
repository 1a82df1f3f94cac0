//! Run discovery loop.
//!
//! Each tick lists the most recent DAI runs, starts a watcher for every
//! `INCOMPLETE` run of the target group that has none, then sweeps finished
//! watchers out of the registry.

use std::sync::Arc;
use std::time::Duration;
use tokio::time::MissedTickBehavior;
use tracing::Instrument;

use crate::error::Result;
use crate::models::{RunStatus, RunSummary};
use crate::registry::WatcherRegistry;
use crate::watcher::{RunWatcher, WatcherContext};

/// Page size of the first listing call, which only serves to learn the total count.
pub const PROBE_LIMIT: u64 = 5;

/// Discovery loop settings.
#[derive(Debug, Clone)]
pub struct DiscoverySettings {
    /// Only runs of this group are watched.
    pub group_id: i64,

    /// Number of most recent runs inspected per tick.
    pub window: u64,

    /// Delay between two ticks.
    pub interval: Duration,
}

/// Finds new runs and dispatches one watcher per run.
pub struct DiscoveryLoop {
    ctx: WatcherContext,
    registry: Arc<WatcherRegistry>,
    settings: DiscoverySettings,
}

impl DiscoveryLoop {
    pub fn new(ctx: WatcherContext, registry: Arc<WatcherRegistry>, settings: DiscoverySettings) -> Self {
        Self {
            ctx,
            registry,
            settings,
        }
    }

    pub fn registry(&self) -> &Arc<WatcherRegistry> {
        &self.registry
    }

    /// Tick forever. Listing errors are logged and retried on the next tick.
    pub async fn run(&self) {
        let mut ticker = tokio::time::interval(self.settings.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            ticker.tick().await;

            if let Err(e) = self.tick().await {
                tracing::warn!(kind = e.kind(), error = %e, "Run discovery failed");
            }
            self.sweep();
        }
    }

    /// List recent runs and dispatch watchers. Returns the newly watched run ids.
    pub async fn tick(&self) -> Result<Vec<i64>> {
        let runs = self.recent_runs().await?;

        let mut dispatched = Vec::new();
        for summary in runs.iter().filter(|summary| self.is_eligible(summary)) {
            if self.dispatch(summary.id) {
                dispatched.push(summary.id);
            }
        }

        if !dispatched.is_empty() {
            tracing::debug!(
                dispatched = ?dispatched,
                active = self.registry.len(),
                "Discovery tick"
            );
        }
        Ok(dispatched)
    }

    /// The most recent `window` runs, oldest first.
    pub async fn recent_runs(&self) -> Result<Vec<RunSummary>> {
        let probe = self.ctx.dai.get_list_runs_details(PROBE_LIMIT, 0).await?;
        let offset = probe.total_count.saturating_sub(self.settings.window);

        let page = self
            .ctx
            .dai
            .get_list_runs_details(self.settings.window, offset)
            .await?;
        Ok(page.items)
    }

    /// Whether a listed run should be watched, ignoring the registry.
    pub fn is_eligible(&self, summary: &RunSummary) -> bool {
        summary.groupid == self.settings.group_id && summary.teststatus == RunStatus::Incomplete
    }

    /// Start a watcher for `run_id` unless one is already registered.
    ///
    /// A watcher that times out abandons its run, so the run is not picked up
    /// again by later ticks.
    pub fn dispatch(&self, run_id: i64) -> bool {
        let ctx = self.ctx.clone();
        let registry = self.registry.clone();

        let started = self.registry.try_dispatch(run_id, move |guard| {
            let watcher = RunWatcher::new(run_id, ctx);
            tokio::spawn(
                async move {
                    let _guard = guard;
                    if watcher.run().await.is_timed_out() {
                        // Abandon before the guard drops so the sweep cannot re-dispatch
                        registry.abandon(run_id);
                        tracing::warn!(
                            run_id,
                            "Run still incomplete after timeout, abandoned; reconcile it manually"
                        );
                    }
                }
                .instrument(tracing::info_span!("watcher", run_id)),
            )
        });

        if started {
            tracing::info!(run_id, "Starting new watcher");
        }
        started
    }

    /// Drop finished watchers from the registry. Returns their run ids.
    pub fn sweep(&self) -> Vec<i64> {
        let reaped = self.registry.reap();
        for run_id in &reaped {
            tracing::info!(run_id = *run_id, "Finished execution, watcher closed");
        }
        reaped
    }
}
