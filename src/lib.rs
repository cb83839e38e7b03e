//! # Actor Pool
//!
//! > **In-process actors scheduled on a fixed pool of worker threads.**
//!
//! An actor is a [`Role`] (your behavior), a mailbox (a FIFO queue with an address)
//! and an identity. Actors never get a thread of their own: a small [`WorkerPool`]
//! sweeps the actor table and drains whichever mailboxes have mail, one batch at a
//! time, guaranteeing that a single actor is never processed by two threads at once.
//!
//! ## 🏗️ Design Philosophy
//!
//! - **Few threads, many actors**: thousands of actors share `workers` threads.
//! - **Bounded batches**: a drain handles only the messages present when it began, so a
//!   busy actor cannot starve the rest of the table.
//! - **Safe teardown**: unregistering only asks the actor to stop. The actor is removed
//!   by the worker that observes it finishing, never out from under a running batch.
//! - **No globals**: the post office and the table belong to a pool; several pools can
//!   coexist in one process (tests rely on this).
//!
//! ## 🚀 Quick Start
//!
//! ```rust
//! use actor_pool::{Context, Message, ProcessResult, Role, RuntimeConfig, WorkerPool};
//! use std::sync::mpsc;
//!
//! struct Doubler(mpsc::Sender<u32>);
//!
//! impl Role for Doubler {
//!     fn handle(&mut self, _ctx: &Context<'_>, msg: Message) -> ProcessResult {
//!         match msg.downcast_ref::<u32>() {
//!             Some(n) => {
//!                 let _ = self.0.send(n * 2);
//!                 ProcessResult::Complete
//!             }
//!             None => ProcessResult::Error,
//!         }
//!     }
//! }
//!
//! let pool = WorkerPool::new(RuntimeConfig::default().with_workers(2)).unwrap();
//! let (tx, rx) = mpsc::channel();
//! let id = pool.register(Doubler(tx)).unwrap();
//!
//! pool.post_message(id, Message::new(21u32)).unwrap();
//! assert_eq!(rx.recv().unwrap(), 42);
//!
//! pool.shutdown().unwrap();
//! ```
//!
//! ## 🗺️ Module Tour
//!
//! ### 1. The Building Blocks ([`framework`])
//! - [`ReaderWriterLock`] guards the actor table; pending writers block new readers.
//! - [`Message`], [`Mailbox`] and [`PostOffice`] move typed payloads between addresses.
//! - [`Actor`](framework::Actor) runs the Idle / Processing / Sick state machine.
//!
//! ### 2. The Scheduler ([`runtime`])
//! - [`WorkerPool`] owns the worker threads and the table.
//! - [`RuntimeConfig`] sets the pool size, table ceiling and scheduling policies, from
//!   code or from a TOML file.
//! - [`setup_tracing`](runtime::setup_tracing) installs the log subscriber.
//!
//! ### 3. Testing ([`mock`])
//! [`MockRole`](mock::MockRole) records what an actor handled and returns scripted
//! results.
//!
//! ## 👩‍💻 Architecture Notes
//!
//! ### Control messages
//! [`Message::poison`], [`Message::set_name`] and [`Message::set_id`] are consumed by
//! the actor itself and never reach the role.
//!
//! ### Panics
//! A panic inside [`Role::handle`] is caught at the dispatch boundary and reported as
//! [`ProcessResult::Error`]. The actor stays registered.
//!
//! ### Running the Demo
//!
//! ```bash
//! RUST_LOG=info cargo run -p actor-sample
//! ```

pub mod framework;
pub mod runtime;

pub use framework::mock;
pub use framework::{
    ActorId, Address, Context, Control, Mailbox, Message, PostOffice, ProcessResult,
    ReadGuard, ReaderWriterLock, Role, RuntimeError, Task, TaskRunner, WriteGuard,
};
pub use runtime::{BatchPolicy, PoolHandle, RuntimeConfig, SweepStrategy, WorkerPool};
