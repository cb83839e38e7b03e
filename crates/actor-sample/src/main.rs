//! # Actor Pool Demo
//!
//! Boots a pool (from the TOML file given as the first argument, or defaults), then:
//!
//! 1. Round-trips a string through [`Echo`].
//! 2. Sends a burst of [`CounterCommand::Add`] from several threads and reads back the
//!    [`Total`].
//! 3. Plays a ping-pong rally and waits for the [`GameOver`].
//! 4. Unregisters everything and shuts the pool down.
//!
//! ```bash
//! RUST_LOG=info cargo run -p actor-sample
//! RUST_LOG=debug cargo run -p actor-sample -- pool.toml
//! ```

use actor_pool::runtime::setup_tracing;
use actor_pool::{Address, Mailbox, Message, RuntimeConfig, RuntimeError, WorkerPool};
use actor_sample::{Ball, Counter, CounterCommand, Echo, GameOver, Player, Total};
use std::thread;
use tracing::{error, info};

const SENDERS: i64 = 4;
const ADDS_PER_SENDER: i64 = 250;
const RALLY: u32 = 20;

fn main() -> Result<(), RuntimeError> {
    setup_tracing();

    let config = match std::env::args().nth(1) {
        Some(path) => RuntimeConfig::load(path)?,
        None => RuntimeConfig::default(),
    };
    let pool = WorkerPool::new(config)?;
    let inbox = pool.post_office().new_named("main")?;

    // Echo
    let echo = pool.register(Echo)?;
    pool.post_message(echo, Message::new(String::from("hello")).with_source(inbox.address()))?;
    match inbox.wait().into_inner::<String>() {
        Ok(text) => info!(%text, "Echo answered"),
        Err(other) => error!(?other, "Unexpected echo reply"),
    }

    // Counter, fed from several threads at once
    let counter = pool.register(Counter::default())?;
    let senders: Vec<_> = (0..SENDERS)
        .map(|_| {
            let handle = pool.handle();
            thread::spawn(move || -> Result<(), RuntimeError> {
                for _ in 0..ADDS_PER_SENDER {
                    handle.post_message(counter, Message::new(CounterCommand::Add(1)))?;
                }
                Ok(())
            })
        })
        .collect();
    for sender in senders {
        match sender.join() {
            Ok(Ok(())) => {}
            Ok(Err(e)) => error!(error = %e, "Sender failed"),
            Err(_) => error!("Sender thread panicked"),
        }
    }
    pool.post_message(
        counter,
        Message::new(CounterCommand::Report).with_source(inbox.address()),
    )?;
    let total = await_reply::<Total>(&inbox);
    info!(?total, expected = SENDERS * ADDS_PER_SENDER, "Counter answered");

    // Ping pong
    let referee = inbox.address();
    let ping = pool.register(Player::new("ping", RALLY, referee))?;
    let pong = pool.register(Player::new("pong", RALLY, referee))?;
    pool.post_message(ping, Message::new(Ball { hits: 0 }).with_source(Address::from(pong)))?;
    let result = await_reply::<GameOver>(&inbox);
    info!(?result, "Game over");

    for id in [echo, counter, ping, pong] {
        pool.unregister(id)?;
    }
    pool.shutdown()?;

    info!("Demo completed");
    Ok(())
}

/// Blocks until a `T` arrives, logging and discarding anything else.
fn await_reply<T: 'static>(inbox: &Mailbox) -> Option<T> {
    loop {
        match inbox.wait().into_inner::<T>() {
            Ok(value) => return Some(value),
            Err(other) if other.is_control() => return None,
            Err(other) => error!(?other, "Unexpected message in main inbox"),
        }
    }
}
