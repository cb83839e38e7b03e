//! # Messages and Addressing
//!
//! This module defines the envelope that travels between mailboxes, the small closed
//! set of control messages every actor understands, and the identifiers used to
//! address mailboxes and actors.
//!
//! ## Address Space
//!
//! Actor mailboxes live at `Address(id)`; IDs are handed out from 1 upwards and stay
//! below 2^63. Name-derived addresses always have the top bit set, so a named mailbox
//! can never shadow an actor.

use std::any::Any;
use std::fmt;
use xxhash_rust::xxh3::xxh3_64;

/// Bit that marks an address derived from a name.
pub const NAMED_ADDRESS_BIT: u64 = 1 << 63;

/// Numeric key of a mailbox in the [`PostOffice`](crate::framework::PostOffice).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Address(u64);

impl Address {
    pub const fn new(raw: u64) -> Self {
        Self(raw)
    }

    /// Hashes a name into the named half of the address space.
    ///
    /// Names are a convenience: a caller that needs guaranteed delivery should keep
    /// the numeric address (or the owning mailbox) instead of re-resolving the name.
    pub fn from_name(name: &str) -> Self {
        Self(xxh3_64(name.as_bytes()) | NAMED_ADDRESS_BIT)
    }

    pub const fn raw(self) -> u64 {
        self.0
    }

    pub const fn is_named(self) -> bool {
        self.0 & NAMED_ADDRESS_BIT != 0
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_named() {
            write!(f, "#{:016x}", self.0)
        } else {
            write!(f, "@{}", self.0)
        }
    }
}

impl From<ActorId> for Address {
    fn from(id: ActorId) -> Self {
        Self(id.0)
    }
}

/// Identity of a registered actor. Valid only while the actor is registered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ActorId(u64);

impl ActorId {
    pub const fn new(raw: u64) -> Self {
        Self(raw)
    }

    pub const fn raw(self) -> u64 {
        self.0
    }
}

impl fmt::Display for ActorId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Outcome of handling one message, or of draining one batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProcessResult {
    /// Nothing was done: the actor was busy, sick or had an empty mailbox.
    Skipped,
    /// Work was done successfully.
    Complete,
    /// A recoverable role-level failure. The actor stays registered.
    Error,
    /// The actor is terminal and must be removed from the table.
    Poisoned,
}

/// Control messages every actor handles itself, before any role sees them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Control {
    /// Makes the recipient sick; the scheduler then removes it.
    Poison,
    /// Replaces the recipient's display name.
    SetName(String),
    /// Replaces the recipient's ID.
    SetId(ActorId),
}

/// Message body: a control variant or an arbitrary user value.
pub enum Payload {
    Control(Control),
    User(Box<dyn Any + Send>),
}

impl fmt::Debug for Payload {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Payload::Control(control) => f.debug_tuple("Control").field(control).finish(),
            Payload::User(_) => f.write_str("User(..)"),
        }
    }
}

/// Envelope carried by mailboxes.
///
/// A message is moved, never shared: whichever queue holds it owns it, and exactly one
/// consumer ever observes a given instance.
#[derive(Debug)]
pub struct Message {
    source: Option<Address>,
    payload: Payload,
}

impl Message {
    /// Wraps a user value.
    pub fn new<T: Any + Send>(value: T) -> Self {
        Self {
            source: None,
            payload: Payload::User(Box::new(value)),
        }
    }

    pub fn poison() -> Self {
        Self::control(Control::Poison)
    }

    pub fn set_name(name: impl Into<String>) -> Self {
        Self::control(Control::SetName(name.into()))
    }

    pub fn set_id(id: ActorId) -> Self {
        Self::control(Control::SetId(id))
    }

    pub fn control(control: Control) -> Self {
        Self {
            source: None,
            payload: Payload::Control(control),
        }
    }

    /// Stamps the sender's address.
    pub fn with_source(mut self, source: Address) -> Self {
        self.source = Some(source);
        self
    }

    /// Sender's address, if known.
    pub fn source(&self) -> Option<Address> {
        self.source
    }

    pub fn payload(&self) -> &Payload {
        &self.payload
    }

    pub fn into_payload(self) -> Payload {
        self.payload
    }

    pub fn is_control(&self) -> bool {
        matches!(self.payload, Payload::Control(_))
    }

    /// Splits off control messages; user messages come back unchanged.
    pub fn into_control(self) -> Result<Control, Message> {
        match self.payload {
            Payload::Control(control) => Ok(control),
            payload => Err(Message {
                source: self.source,
                payload,
            }),
        }
    }

    /// True if the user value is a `T`.
    pub fn is<T: Any>(&self) -> bool {
        self.downcast_ref::<T>().is_some()
    }

    /// Borrows the user value as a `T`.
    pub fn downcast_ref<T: Any>(&self) -> Option<&T> {
        match &self.payload {
            Payload::User(value) => value.downcast_ref::<T>(),
            Payload::Control(_) => None,
        }
    }

    /// Takes the user value out as a `T`, handing the message back on mismatch.
    pub fn into_inner<T: Any>(self) -> Result<T, Message> {
        let source = self.source;
        match self.payload {
            Payload::User(value) => match value.downcast::<T>() {
                Ok(value) => Ok(*value),
                Err(value) => Err(Message {
                    source,
                    payload: Payload::User(value),
                }),
            },
            payload => Err(Message { source, payload }),
        }
    }
}
