//! Scheduling and process-level setup.
//!
//! - [`WorkerPool`] - worker threads and the actor table they sweep
//! - [`PoolHandle`] - cloneable access to a running pool
//! - [`RuntimeConfig`] - pool size, table ceiling and scheduling policies
//! - [`setup_tracing`] - installs the logging subscriber

pub mod config;
pub mod tracing;
pub mod worker_pool;

pub use config::{BatchPolicy, RuntimeConfig, SweepStrategy};
pub use tracing::setup_tracing;
pub use worker_pool::{PoolHandle, WorkerPool};
