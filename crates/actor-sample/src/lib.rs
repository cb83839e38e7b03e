//! # Actor Pool Sample Roles
//!
//! Small, self-contained roles that show how to build on [`actor_pool`]:
//!
//! - [`echo`]: sends text back to whoever sent it.
//! - [`counter`]: private state mutated by commands, queried by request/reply.
//! - [`ping_pong`]: two actors bouncing a ball until one of them reports to a referee.
//!
//! The binary in `main.rs` wires all three into one pool.

pub mod counter;
pub mod echo;
pub mod ping_pong;

pub use counter::{Counter, CounterCommand, Total};
pub use echo::Echo;
pub use ping_pong::{Ball, GameOver, Player};
