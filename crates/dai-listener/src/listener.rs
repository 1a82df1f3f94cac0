//! Listener lifecycle management.

use std::sync::Arc;

use crate::client::{DaiApi, DaiClient, XrayApi, XrayClient};
use crate::config::ListenerConfig;
use crate::discovery::{DiscoveryLoop, DiscoverySettings};
use crate::error::{ListenerError, Result};
use crate::mapping::MappingConfig;
use crate::models::Group;
use crate::poll::PollPolicy;
use crate::registry::WatcherRegistry;
use crate::watcher::WatcherContext;

/// Listener that forwards finished DAI runs to XRAY.
pub struct Listener {
    /// Discovery loop, owning the watcher registry.
    discovery: DiscoveryLoop,

    /// Id of the watched DAI group.
    group_id: i64,
}

impl Listener {
    /// Create a listener: load the mapping, authenticate both clients and
    /// resolve the target group.
    pub async fn new(config: ListenerConfig) -> Result<Self> {
        // Validate the mapping before any network traffic
        let mapping = MappingConfig::load(&config.mapping_path)?;
        tracing::info!(
            path = %config.mapping_path.display(),
            buckets = mapping.buckets().len(),
            "Mapping loaded"
        );

        let dai = DaiClient::connect(
            &config.dai_url,
            &config.dai_username,
            &config.dai_password,
            config.http_timeout,
        )
        .await?;

        let group_id = resolve_group_id(&dai.get_group_list().await?, &config.dai_group)?;
        tracing::info!(group = %config.dai_group, group_id, "Target group resolved");

        let xray = XrayClient::connect(
            &config.xray_url,
            &config.xray_client_id,
            &config.xray_client_secret,
            config.http_timeout,
        )
        .await?;

        Ok(Self::with_collaborators(
            &config,
            Arc::new(dai),
            Arc::new(xray),
            mapping,
            group_id,
        ))
    }

    /// Create a listener around already connected collaborators.
    pub fn with_collaborators(
        config: &ListenerConfig,
        dai: Arc<dyn DaiApi>,
        xray: Arc<dyn XrayApi>,
        mapping: MappingConfig,
        group_id: i64,
    ) -> Self {
        let ctx = WatcherContext {
            dai,
            xray,
            mapping: Arc::new(mapping),
            template: Arc::new(config.execution_info.clone()),
            poll: PollPolicy::new(config.poll_interval, config.run_timeout),
        };

        let discovery = DiscoveryLoop::new(
            ctx,
            Arc::new(WatcherRegistry::new()),
            DiscoverySettings {
                group_id,
                window: config.discovery_window,
                interval: config.discovery_interval,
            },
        );

        Self {
            discovery,
            group_id,
        }
    }

    pub fn group_id(&self) -> i64 {
        self.group_id
    }

    pub fn registry(&self) -> &Arc<WatcherRegistry> {
        self.discovery.registry()
    }

    /// Run the discovery loop until the future is dropped.
    pub async fn run(&self) {
        tracing::info!(group_id = self.group_id, "Listening for DAI runs");
        self.discovery.run().await
    }

    /// Abort all watchers. Returns the run ids whose results were not imported.
    pub fn shutdown(&self) -> Vec<i64> {
        let interrupted = self.registry().abort_all();
        for run_id in &interrupted {
            tracing::warn!(
                run_id = *run_id,
                "Watcher interrupted by shutdown, run result was not imported"
            );
        }
        interrupted
    }
}

/// Id of the group named exactly `name`.
pub fn resolve_group_id(groups: &[Group], name: &str) -> Result<i64> {
    groups
        .iter()
        .find(|group| group.groupname == name)
        .map(|group| group.id)
        .ok_or_else(|| ListenerError::Lookup(format!("group {} not found", name)))
}
