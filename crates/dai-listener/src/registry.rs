//! Registry of active run watchers.
//!
//! Holds at most one watcher per run id. A watcher is registered when it is
//! dispatched and stays registered until a sweep observes that it finished,
//! so a run id can never be dispatched twice while its watcher is alive.
//! Runs whose watcher gave up on its timeout are abandoned and never
//! dispatched again.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::task::JoinHandle;

/// Marks its watcher as done when dropped, including on panic.
#[derive(Debug)]
pub struct DoneGuard(Arc<AtomicBool>);

impl Drop for DoneGuard {
    fn drop(&mut self) {
        self.0.store(true, Ordering::Release);
    }
}

struct WatcherHandle {
    task: JoinHandle<()>,
    done: Arc<AtomicBool>,
}

impl WatcherHandle {
    fn is_done(&self) -> bool {
        self.done.load(Ordering::Acquire) || self.task.is_finished()
    }
}

#[derive(Default)]
struct Entries {
    watchers: HashMap<i64, WatcherHandle>,
    abandoned: HashSet<i64>,
}

/// Run ids with a live watcher, each with its task handle.
#[derive(Default)]
pub struct WatcherRegistry {
    entries: Mutex<Entries>,
}

impl WatcherRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Entries> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Register a watcher for `run_id` unless one is already registered or
    /// the run was abandoned.
    ///
    /// `spawn` runs under the registry lock and must only start the task. The
    /// task should hold the [`DoneGuard`] until it finishes. Returns whether a
    /// watcher was started.
    pub fn try_dispatch<F>(&self, run_id: i64, spawn: F) -> bool
    where
        F: FnOnce(DoneGuard) -> JoinHandle<()>,
    {
        let mut entries = self.lock();
        if entries.watchers.contains_key(&run_id) || entries.abandoned.contains(&run_id) {
            return false;
        }

        let done = Arc::new(AtomicBool::new(false));
        let task = spawn(DoneGuard(done.clone()));
        entries.watchers.insert(run_id, WatcherHandle { task, done });
        true
    }

    /// Never dispatch `run_id` again. Its current watcher, if any, is reaped as usual.
    pub fn abandon(&self, run_id: i64) {
        self.lock().abandoned.insert(run_id);
    }

    pub fn is_abandoned(&self, run_id: i64) -> bool {
        self.lock().abandoned.contains(&run_id)
    }

    /// Whether `run_id` has a registered watcher (finished but not yet reaped counts).
    pub fn is_active(&self, run_id: i64) -> bool {
        self.lock().watchers.contains_key(&run_id)
    }

    pub fn len(&self) -> usize {
        self.lock().watchers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().watchers.is_empty()
    }

    /// Registered run ids, ascending.
    pub fn active_ids(&self) -> Vec<i64> {
        let mut ids: Vec<i64> = self.lock().watchers.keys().copied().collect();
        ids.sort_unstable();
        ids
    }

    /// Remove finished watchers without waiting on any of them.
    ///
    /// Returns the reaped run ids, ascending.
    pub fn reap(&self) -> Vec<i64> {
        let mut reaped = Vec::new();
        self.lock().watchers.retain(|run_id, handle| {
            if handle.is_done() {
                reaped.push(*run_id);
                false
            } else {
                true
            }
        });
        reaped.sort_unstable();
        reaped
    }

    /// Abort every registered watcher and clear the registry.
    ///
    /// Returns the run ids whose watchers were still running.
    pub fn abort_all(&self) -> Vec<i64> {
        let mut interrupted: Vec<i64> = self
            .lock()
            .watchers
            .drain()
            .filter(|(_, handle)| !handle.is_done())
            .map(|(run_id, handle)| {
                handle.task.abort();
                run_id
            })
            .collect();
        interrupted.sort_unstable();
        interrupted
    }
}
