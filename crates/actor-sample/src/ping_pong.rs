//! # Ping Pong
//!
//! Two [`Player`]s hit a [`Ball`] back and forth. Each hit is a reply to the previous
//! one, so neither player needs to know the other's ID: the ball's source address is
//! always the player who hit it last. The player that makes the final hit reports a
//! [`GameOver`] to the referee address and the rally ends.

use actor_pool::{Address, Context, Message, ProcessResult, Role};
use tracing::info;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Ball {
    pub hits: u32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GameOver {
    pub hits: u32,
    pub last_hit_by: String,
}

#[derive(Debug)]
pub struct Player {
    name: String,
    rally: u32,
    referee: Address,
}

impl Player {
    /// A player that stops the rally once the ball has been hit `rally` times.
    pub fn new(name: impl Into<String>, rally: u32, referee: Address) -> Self {
        Self {
            name: name.into(),
            rally,
            referee,
        }
    }
}

impl Role for Player {
    fn handle(&mut self, ctx: &Context<'_>, msg: Message) -> ProcessResult {
        let Some(ball) = msg.downcast_ref::<Ball>().copied() else {
            return ProcessResult::Error;
        };

        let hits = ball.hits + 1;
        let sent = if hits >= self.rally {
            info!(player = %self.name, hits, "Rally over");
            ctx.post(
                self.referee,
                Message::new(GameOver {
                    hits,
                    last_hit_by: self.name.clone(),
                }),
            )
        } else {
            ctx.reply(&msg, Message::new(Ball { hits }))
        };

        match sent {
            Ok(()) => ProcessResult::Complete,
            Err(_) => ProcessResult::Error,
        }
    }

    fn default_name(&self) -> &str {
        &self.name
    }
}
