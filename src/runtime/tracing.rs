//! # Observability & Tracing
//!
//! The runtime logs through the `tracing` crate with structured fields. The
//! [`setup_tracing`] function installs a compact `fmt` subscriber for binaries and
//! demos; libraries embedding the pool can install their own subscriber instead.
//!
//! ## What Gets Traced
//!
//! - **Pool lifecycle** (`info`): start, worker start/stop, shutdown.
//! - **Table changes** (`info` / `debug`): registration with the new table size,
//!   unregister requests, removal of poisoned actors.
//! - **Batches** (`debug`): one line per drained batch with its size and outcome.
//! - **Failures** (`warn` / `error`): posts to unknown addresses, duplicate mailbox
//!   addresses, a full table, roles that report `Error` or panic.
//!
//! ## Usage
//!
//! ```bash
//! # Lifecycle only
//! RUST_LOG=info cargo run -p actor-sample
//!
//! # Every batch and every removal
//! RUST_LOG=actor_pool=debug cargo run -p actor-sample
//! ```
//!
//! With `RUST_LOG=debug` a single ping-pong exchange looks like:
//!
//! ```text
//! INFO Registered actor=1 name="ping" size=1
//! INFO Registered actor=2 name="pong" size=2
//! DEBUG Batch drained actor=@2 batch=1 outcome=Complete
//! DEBUG Batch drained actor=@1 batch=1 outcome=Complete
//! ```

/// Installs the global `fmt` subscriber, filtered by `RUST_LOG`.
///
/// Panics if a global subscriber is already set, like
/// [`tracing_subscriber::fmt::SubscriberBuilder::init`].
pub fn setup_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_target(false)
        .compact()
        .init();
}
