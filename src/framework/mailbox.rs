//! # Mailbox
//!
//! A thread-safe FIFO of [`Message`]s with blocking and non-blocking dequeue.
//!
//! The queue itself is shared: the [`PostOffice`](crate::framework::PostOffice) keeps a
//! weak reference to it, and the single owning [`Mailbox`] handle keeps it alive. When
//! the owner drops the handle the registry entry goes with it, so a stale address
//! resolves to nothing instead of a dead queue.

use crate::framework::error::RuntimeError;
use crate::framework::message::{Address, Message};
use crate::framework::post_office::Registry;
use parking_lot::{Condvar, Mutex};
use std::collections::VecDeque;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};

/// Shared queue behind a mailbox.
#[derive(Default)]
pub(crate) struct Queue {
    storage: Mutex<VecDeque<Message>>,
    notify: Condvar,
}

impl Queue {
    pub(crate) fn put(&self, msg: Message) {
        let mut storage = self.storage.lock();
        storage.push_back(msg);
        self.notify.notify_one();
    }

    fn poll(&self) -> Option<Message> {
        self.storage.lock().pop_front()
    }

    fn wait(&self) -> Message {
        let mut storage = self.storage.lock();
        loop {
            if let Some(msg) = storage.pop_front() {
                return msg;
            }
            self.notify.wait(&mut storage);
        }
    }

    fn len(&self) -> usize {
        self.storage.lock().len()
    }
}

/// Owning handle to a registered queue.
///
/// There is exactly one `Mailbox` per registered address. It is not `Clone`: other
/// parties reach the queue only through [`PostOffice::post`](crate::framework::PostOffice::post).
pub struct Mailbox {
    address: AtomicU64,
    queue: Arc<Queue>,
    registry: Weak<Registry>,
}

impl Mailbox {
    pub(crate) fn new(address: Address, queue: Arc<Queue>, registry: Weak<Registry>) -> Self {
        Self {
            address: AtomicU64::new(address.raw()),
            queue,
            registry,
        }
    }

    pub fn address(&self) -> Address {
        Address::new(self.address.load(Ordering::Acquire))
    }

    /// Moves this mailbox to `to`. Queued messages stay put; the old address stops
    /// resolving.
    ///
    /// # Errors
    ///
    /// [`RuntimeError::AddressInUse`] if another live mailbox owns `to`, and
    /// [`RuntimeError::AddressNotFound`] if this mailbox's own address was revoked.
    pub(crate) fn readdress(&self, to: Address) -> Result<(), RuntimeError> {
        let from = self.address();
        let registry = self
            .registry
            .upgrade()
            .ok_or(RuntimeError::AddressNotFound(from))?;
        registry.rekey(from, to, &self.queue)?;
        self.address.store(to.raw(), Ordering::Release);
        Ok(())
    }

    /// Enqueues a message and wakes one waiter.
    pub fn put(&self, msg: Message) {
        self.queue.put(msg);
    }

    /// Dequeues without blocking.
    pub fn poll(&self) -> Option<Message> {
        self.queue.poll()
    }

    /// Blocks until a message is available, then dequeues it.
    pub fn wait(&self) -> Message {
        self.queue.wait()
    }

    /// Number of queued messages at the moment of the call.
    pub fn len(&self) -> usize {
        self.queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl fmt::Debug for Mailbox {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Mailbox")
            .field("address", &self.address())
            .field("len", &self.len())
            .finish()
    }
}

impl Drop for Mailbox {
    fn drop(&mut self) {
        if let Some(registry) = self.registry.upgrade() {
            registry.remove_if_same(self.address(), &self.queue);
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::framework::{Message, PostOffice};
    use proptest::prelude::*;
    use std::thread;
    use std::time::Duration;

    #[test]
    fn poll_on_empty_returns_none() {
        let office = PostOffice::new();
        let mailbox = office.new_named("empty").unwrap();
        assert!(mailbox.poll().is_none());
        assert!(mailbox.is_empty());
    }

    #[test]
    fn wait_blocks_until_a_message_arrives() {
        let office = PostOffice::new();
        let mailbox = office.new_named("waiter").unwrap();
        let address = mailbox.address();

        let poster = {
            let office = office.clone();
            thread::spawn(move || {
                thread::sleep(Duration::from_millis(30));
                office.post(address, Message::new(11u32)).unwrap();
            })
        };

        let msg = mailbox.wait();
        assert_eq!(msg.downcast_ref::<u32>(), Some(&11));
        poster.join().unwrap();
    }

    proptest! {
        #[test]
        fn messages_come_out_in_posting_order(values in proptest::collection::vec(any::<i64>(), 0..64)) {
            let office = PostOffice::new();
            let mailbox = office.new_named("fifo").unwrap();
            for value in &values {
                mailbox.put(Message::new(*value));
            }
            prop_assert_eq!(mailbox.len(), values.len());

            let mut drained = Vec::new();
            while let Some(msg) = mailbox.poll() {
                drained.push(msg.into_inner::<i64>().unwrap());
            }
            prop_assert_eq!(drained, values);
        }
    }
}
