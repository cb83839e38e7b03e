//! # Runtime Errors
//!
//! This module defines the error type shared by the post office, the actor table and
//! the worker pool. Programmer errors (a duplicate address, a full table, posting to
//! nobody) are reported through these values rather than by panicking.

use crate::framework::message::{ActorId, Address};

/// Errors that can occur within the actor runtime itself.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RuntimeError {
    #[error("Address already in use: {0}")]
    AddressInUse(Address),
    #[error("No mailbox at address: {0}")]
    AddressNotFound(Address),
    #[error("Message has no source to reply to")]
    NoSource,
    #[error("Actor not found: {0}")]
    ActorNotFound(ActorId),
    #[error("Actor table is full ({max} actors)")]
    TableFull { max: usize },
    #[error("Failed to spawn worker thread: {0}")]
    WorkerSpawn(String),
    #[error("Worker {0} panicked")]
    WorkerPanicked(usize),
    #[error("Invalid configuration: {0}")]
    Config(String),
}
