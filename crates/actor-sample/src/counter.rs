//! # Counter
//!
//! A running total owned by one actor. Because an actor is never processed by two
//! workers at once, the total needs no lock of its own even when many threads send
//! [`CounterCommand::Add`] concurrently.

use actor_pool::{Context, Message, ProcessResult, Role};
use tracing::{debug, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CounterCommand {
    Add(i64),
    /// Reply to the sender with a [`Total`].
    Report,
    Reset,
}

/// Answer to [`CounterCommand::Report`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Total(pub i64);

#[derive(Debug, Default)]
pub struct Counter {
    total: i64,
}

impl Counter {
    pub fn new(start: i64) -> Self {
        Self { total: start }
    }
}

impl Role for Counter {
    fn handle(&mut self, ctx: &Context<'_>, msg: Message) -> ProcessResult {
        let Some(command) = msg.downcast_ref::<CounterCommand>().copied() else {
            warn!(actor = %ctx.address(), "Counter got an unknown message");
            return ProcessResult::Error;
        };

        match command {
            CounterCommand::Add(n) => self.total += n,
            CounterCommand::Reset => self.total = 0,
            CounterCommand::Report => {
                if ctx.reply(&msg, Message::new(Total(self.total))).is_err() {
                    return ProcessResult::Error;
                }
            }
        }
        debug!(actor = %ctx.address(), ?command, total = self.total, "Counter");
        ProcessResult::Complete
    }

    fn default_name(&self) -> &str {
        "counter"
    }
}
