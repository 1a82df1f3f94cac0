//! Listener configuration.

use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use crate::error::{ListenerError, Result};
use crate::payload::ExecutionInfoTemplate;

/// Default XRAY cloud endpoint.
pub const DEFAULT_XRAY_URL: &str = "https://xray.cloud.xpand-it.com";

/// Listener configuration.
#[derive(Clone)]
pub struct ListenerConfig {
    /// DAI server URL.
    pub dai_url: String,

    /// DAI user name.
    pub dai_username: String,

    /// DAI password.
    pub dai_password: String,

    /// Name of the DAI group whose runs are watched.
    pub dai_group: String,

    /// XRAY server URL.
    pub xray_url: String,

    /// XRAY API client id.
    pub xray_client_id: String,

    /// XRAY API client secret.
    pub xray_client_secret: String,

    /// Path of the mapping JSON file.
    pub mapping_path: PathBuf,

    /// Delay between two discovery ticks.
    pub discovery_interval: Duration,

    /// Number of most recent runs inspected per tick.
    pub discovery_window: u64,

    /// Delay between two status polls of the same run.
    pub poll_interval: Duration,

    /// Ceiling on how long a single run is watched. `None` waits forever.
    pub run_timeout: Option<Duration>,

    /// Per-request HTTP timeout.
    pub http_timeout: Duration,

    /// Static text of every imported execution.
    pub execution_info: ExecutionInfoTemplate,
}

impl ListenerConfig {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Load configuration from any variable source.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let required = |name: &str| {
            lookup(name)
                .filter(|value| !value.is_empty())
                .ok_or_else(|| ListenerError::Config(format!("{} is not set", name)))
        };

        let defaults = Self::default();

        let discovery_interval_ms: u64 = parse_or(&lookup, "DAI_LISTENER_DISCOVERY_INTERVAL_MS", 1000)?;
        let poll_interval_secs: u64 = parse_or(&lookup, "DAI_LISTENER_POLL_INTERVAL_SECS", 5)?;
        let http_timeout_secs: u64 = parse_or(&lookup, "DAI_LISTENER_HTTP_TIMEOUT_SECS", 30)?;
        let run_timeout_secs: Option<u64> = parse_optional(&lookup, "DAI_LISTENER_RUN_TIMEOUT_SECS")?;

        let mut execution_info = defaults.execution_info;
        if let Some(environments) = lookup("DAI_LISTENER_TEST_ENVIRONMENTS") {
            execution_info.test_environments = environments
                .split(',')
                .map(str::trim)
                .filter(|env| !env.is_empty())
                .map(str::to_string)
                .collect();
        }
        if let Some(version) = lookup("DAI_LISTENER_RELEASE_VERSION") {
            execution_info.version = version.clone();
            execution_info.revision = version;
        }

        let dai_username = required("DAI_USERNAME")?;
        execution_info.user = dai_username.clone();

        Ok(Self {
            dai_url: required("DAI_URL")?,
            dai_username,
            dai_password: required("DAI_PASSWORD")?,
            dai_group: required("DAI_GROUP")?,
            xray_url: lookup("XRAY_URL").unwrap_or(defaults.xray_url),
            xray_client_id: required("XRAY_CLIENT_ID")?,
            xray_client_secret: required("XRAY_CLIENT_SECRET")?,
            mapping_path: lookup("DAI_LISTENER_MAPPING")
                .map(PathBuf::from)
                .unwrap_or(defaults.mapping_path),
            discovery_interval: Duration::from_millis(discovery_interval_ms),
            discovery_window: parse_or(&lookup, "DAI_LISTENER_DISCOVERY_WINDOW", defaults.discovery_window)?,
            poll_interval: Duration::from_secs(poll_interval_secs),
            run_timeout: run_timeout_secs.map(Duration::from_secs),
            http_timeout: Duration::from_secs(http_timeout_secs),
            execution_info,
        })
    }
}

fn parse_optional<F, T>(lookup: &F, name: &str) -> Result<Option<T>>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
{
    match lookup(name) {
        Some(value) if !value.is_empty() => value
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| ListenerError::Config(format!("{} has an invalid value: {}", name, value))),
        _ => Ok(None),
    }
}

fn parse_or<F, T>(lookup: &F, name: &str, default: T) -> Result<T>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
{
    Ok(parse_optional(lookup, name)?.unwrap_or(default))
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            dai_url: "http://localhost:8000".to_string(),
            dai_username: String::new(),
            dai_password: String::new(),
            dai_group: String::new(),
            xray_url: DEFAULT_XRAY_URL.to_string(),
            xray_client_id: String::new(),
            xray_client_secret: String::new(),
            mapping_path: PathBuf::from("mapping.json"),
            discovery_interval: Duration::from_millis(1000),
            discovery_window: 20,
            poll_interval: Duration::from_secs(5),
            run_timeout: None,
            http_timeout: Duration::from_secs(30),
            execution_info: ExecutionInfoTemplate::default(),
        }
    }
}

// Credentials stay out of logs
impl std::fmt::Debug for ListenerConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ListenerConfig")
            .field("dai_url", &self.dai_url)
            .field("dai_username", &self.dai_username)
            .field("dai_group", &self.dai_group)
            .field("xray_url", &self.xray_url)
            .field("mapping_path", &self.mapping_path)
            .field("discovery_interval", &self.discovery_interval)
            .field("discovery_window", &self.discovery_window)
            .field("poll_interval", &self.poll_interval)
            .field("run_timeout", &self.run_timeout)
            .field("http_timeout", &self.http_timeout)
            .finish_non_exhaustive()
    }
}
