//! # Roles
//!
//! A [`Role`] is the user-supplied behavior of an actor: one method that handles one
//! message. Roles carry no lifecycle of their own; the owning [`Actor`] decides when a
//! role runs, and the role is dropped together with its actor.
//!
//! ## Talking Back to the Pool
//!
//! Every dispatch receives a [`Context`] describing the actor that is running the role.
//! Through it a role can post to other actors (or to itself), register new actors, or
//! unregister existing ones. The worker never holds the actor table lock while a role
//! runs, so all of these calls are safe from inside `handle`.

use crate::framework::actor::Actor;
use crate::framework::error::RuntimeError;
use crate::framework::message::{ActorId, Address, Message, ProcessResult};
use crate::runtime::worker_pool::Shared;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::warn;

/// Behavior plugged into an actor.
///
/// # Example
///
/// ```rust
/// use actor_pool::{Context, Message, ProcessResult, Role};
///
/// struct Greeter;
///
/// impl Role for Greeter {
///     fn handle(&mut self, ctx: &Context<'_>, msg: Message) -> ProcessResult {
///         match msg.downcast_ref::<String>() {
///             Some(who) => {
///                 println!("{} says hello to {}", ctx.name(), who);
///                 ProcessResult::Complete
///             }
///             None => ProcessResult::Error,
///         }
///     }
///
///     fn default_name(&self) -> &str {
///         "greeter"
///     }
/// }
/// ```
pub trait Role: Send + 'static {
    /// Handles one user message. Control messages never reach this method.
    ///
    /// Returning [`ProcessResult::Poisoned`] makes the actor terminal, exactly as if it
    /// had received a poison message.
    fn handle(&mut self, ctx: &Context<'_>, msg: Message) -> ProcessResult;

    /// Display name given to the actor at registration.
    fn default_name(&self) -> &str {
        "???"
    }
}

/// View of the running actor and its pool, valid for one dispatch.
pub struct Context<'a> {
    actor: &'a Actor,
    shared: &'a Shared,
}

impl<'a> Context<'a> {
    pub(crate) fn new(actor: &'a Actor, shared: &'a Shared) -> Self {
        Self { actor, shared }
    }

    /// ID of the running actor, `None` once it has been poisoned.
    pub fn id(&self) -> Option<ActorId> {
        self.actor.id()
    }

    pub fn name(&self) -> String {
        self.actor.name()
    }

    /// Mailbox address of the running actor.
    pub fn address(&self) -> Address {
        self.actor.address()
    }

    /// Posts as this actor: the message is stamped with our address unless it already
    /// carries a source.
    pub fn post(&self, to: impl Into<Address>, msg: Message) -> Result<(), RuntimeError> {
        let msg = match msg.source() {
            Some(_) => msg,
            None => msg.with_source(self.address()),
        };
        self.shared.post_message(to.into(), msg)
    }

    pub fn post_named(&self, name: &str, msg: Message) -> Result<(), RuntimeError> {
        self.post(Address::from_name(name), msg)
    }

    /// Replies to the sender of `msg`, if it has one.
    pub fn reply(&self, to: &Message, msg: Message) -> Result<(), RuntimeError> {
        match to.source() {
            Some(source) => self.post(source, msg),
            None => {
                warn!(actor = %self.address(), "Reply to a message without a source");
                Err(RuntimeError::NoSource)
            }
        }
    }

    pub fn register(&self, role: impl Role) -> Result<ActorId, RuntimeError> {
        self.shared.register(Box::new(role))
    }

    pub fn unregister(&self, id: ActorId) -> Result<(), RuntimeError> {
        self.shared.unregister(id)
    }

    pub fn find_first_by_name(&self, name: &str) -> Option<ActorId> {
        self.shared.find_first_by_name(name)
    }
}

impl fmt::Debug for Context<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Context")
            .field("id", &self.id())
            .field("name", &self.name())
            .finish()
    }
}

/// A unit of work for [`TaskRunner`].
pub struct Task(Box<dyn FnOnce() -> ProcessResult + Send>);

impl Task {
    pub fn new(f: impl FnOnce() -> ProcessResult + Send + 'static) -> Self {
        Self(Box::new(f))
    }

    pub fn run(self) -> ProcessResult {
        (self.0)()
    }
}

impl fmt::Debug for Task {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Task(..)")
    }
}

static NEXT_TASK_RUNNER: AtomicU64 = AtomicU64::new(1);

/// Built-in role that executes [`Task`] payloads on the pool.
///
/// Every runner gets a unique default name (`task-1`, `task-2`, ...). Anything other
/// than a `Task` is answered with [`ProcessResult::Error`].
#[derive(Debug)]
pub struct TaskRunner {
    name: String,
}

impl TaskRunner {
    pub fn new() -> Self {
        let n = NEXT_TASK_RUNNER.fetch_add(1, Ordering::Relaxed);
        Self {
            name: format!("task-{n}"),
        }
    }
}

impl Default for TaskRunner {
    fn default() -> Self {
        Self::new()
    }
}

impl Role for TaskRunner {
    fn handle(&mut self, ctx: &Context<'_>, msg: Message) -> ProcessResult {
        match msg.into_inner::<Task>() {
            Ok(task) => task.run(),
            Err(_) => {
                warn!(actor = %ctx.address(), name = %self.name, "TaskRunner got a non-task message");
                ProcessResult::Error
            }
        }
    }

    fn default_name(&self) -> &str {
        &self.name
    }
}
