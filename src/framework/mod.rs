//! Building blocks of the actor runtime.
//!
//! # Main Components
//!
//! - [`ReaderWriterLock`] - fair lock guarding the actor table
//! - [`Message`] - typed payload plus optional source address
//! - [`Mailbox`] / [`PostOffice`] - addressed FIFO queues and their registry
//! - [`Role`] / [`Context`] - user behavior and its view of the pool
//! - [`Actor`] - a role, a mailbox and the state machine that drains it
//! - [`RuntimeError`] - errors reported by all of the above
//!
//! # Testing
//!
//! See [`mock`] for a scripted, recording role.

pub mod actor;
pub mod error;
pub mod mailbox;
pub mod message;
pub mod mock;
pub mod post_office;
pub mod role;
pub mod rwlock;

pub use actor::{Actor, INVALID_ACTOR};
pub use error::RuntimeError;
pub use mailbox::Mailbox;
pub use message::{ActorId, Address, Control, Message, Payload, ProcessResult};
pub use post_office::PostOffice;
pub use role::{Context, Role, Task, TaskRunner};
pub use rwlock::{ReadGuard, ReaderWriterLock, WriteGuard};
