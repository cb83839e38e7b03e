//! Replies to every `String` with the same text.

use actor_pool::{Context, Message, ProcessResult, Role};
use tracing::debug;

#[derive(Debug, Default)]
pub struct Echo;

impl Role for Echo {
    fn handle(&mut self, ctx: &Context<'_>, msg: Message) -> ProcessResult {
        let Some(source) = msg.source() else {
            return ProcessResult::Error;
        };
        match msg.into_inner::<String>() {
            Ok(text) => {
                debug!(to = %source, %text, "Echo");
                match ctx.post(source, Message::new(text)) {
                    Ok(()) => ProcessResult::Complete,
                    Err(_) => ProcessResult::Error,
                }
            }
            Err(_) => ProcessResult::Error,
        }
    }

    fn default_name(&self) -> &str {
        "echo"
    }
}
