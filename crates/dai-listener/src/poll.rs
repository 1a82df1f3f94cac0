//! Poll-until-done with a fixed interval and an optional ceiling.

use std::future::Future;
use std::time::Duration;
use tokio::time::Instant;

use crate::error::{ListenerError, Result};

/// How often to poll, and for how long at most.
#[derive(Debug, Clone, Copy)]
pub struct PollPolicy {
    /// Delay between two consecutive fetches.
    pub interval: Duration,

    /// Give up after this long. `None` waits forever.
    pub timeout: Option<Duration>,
}

impl PollPolicy {
    pub fn new(interval: Duration, timeout: Option<Duration>) -> Self {
        Self { interval, timeout }
    }
}

impl Default for PollPolicy {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(5),
            timeout: None,
        }
    }
}

/// Call `fetch` until `done` accepts its value.
///
/// The first fetch happens immediately, so a value that is already done on
/// first read returns without sleeping. Fetch errors end the poll. When the
/// next sleep would cross the policy's timeout, returns
/// [`ListenerError::Timeout`] instead.
pub async fn poll_until<T, F, Fut, P>(policy: &PollPolicy, mut fetch: F, done: P) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T>>,
    P: Fn(&T) -> bool,
{
    let started = Instant::now();

    loop {
        let value = fetch().await?;
        if done(&value) {
            return Ok(value);
        }

        if let Some(timeout) = policy.timeout {
            if started.elapsed() + policy.interval > timeout {
                return Err(ListenerError::Timeout(timeout));
            }
        }

        tokio::time::sleep(policy.interval).await;
    }
}
