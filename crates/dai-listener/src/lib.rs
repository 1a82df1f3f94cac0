//! DAI Listener
//!
//! Watches test runs on an Eggplant DAI server and imports the results of
//! finished directed runs into XRAY as test executions.
//!
//! This crate provides:
//! - REST clients for the DAI and XRAY APIs
//! - Discovery loop dispatching one watcher per in-progress run
//! - Per-run watcher polling to completion
//! - Mapping of DAI results to XRAY test plans and statuses

pub mod client;
pub mod config;
pub mod discovery;
pub mod error;
pub mod listener;
pub mod mapping;
pub mod models;
pub mod payload;
pub mod poll;
pub mod registry;
pub mod watcher;

pub use config::ListenerConfig;
pub use error::{ListenerError, Result};
pub use listener::Listener;
