//! # Post Office
//!
//! The address registry: a map from [`Address`] to a *weak* reference to a mailbox queue.
//! It is the only way to deliver a message when all you know is an address or a name.
//!
//! The registry never keeps a mailbox alive. Once the owning [`Mailbox`] is dropped,
//! posting to its address fails with [`RuntimeError::AddressNotFound`], which is the
//! normal way a sender learns that its peer is gone.
//!
//! A `PostOffice` is a cheap, cloneable handle; all clones share one registry. There is
//! no process-wide instance: the [`WorkerPool`](crate::runtime::WorkerPool) owns one and
//! hands it to whoever needs it.

use crate::framework::error::RuntimeError;
use crate::framework::mailbox::{Mailbox, Queue};
use crate::framework::message::{Address, Message};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::{Arc, Weak};
use tracing::{debug, error, warn};

#[derive(Default)]
pub(crate) struct Registry {
    boxes: Mutex<HashMap<Address, Weak<Queue>>>,
}

impl Registry {
    fn resolve(&self, address: Address) -> Option<Arc<Queue>> {
        let mut boxes = self.boxes.lock();
        let queue = boxes.get(&address)?.upgrade();
        if queue.is_none() {
            boxes.remove(&address);
        }
        queue
    }

    /// Removes the entry only if it still points at `queue`.
    pub(crate) fn remove_if_same(&self, address: Address, queue: &Arc<Queue>) {
        let mut boxes = self.boxes.lock();
        if points_at(&boxes, address, queue) {
            boxes.remove(&address);
        }
    }

    /// Moves `queue` from `from` to `to` in one step.
    pub(crate) fn rekey(
        &self,
        from: Address,
        to: Address,
        queue: &Arc<Queue>,
    ) -> Result<(), RuntimeError> {
        let mut boxes = self.boxes.lock();
        if !points_at(&boxes, from, queue) {
            return Err(RuntimeError::AddressNotFound(from));
        }
        if from == to {
            return Ok(());
        }
        if boxes.get(&to).is_some_and(|weak| weak.strong_count() > 0) {
            return Err(RuntimeError::AddressInUse(to));
        }
        boxes.remove(&from);
        boxes.insert(to, Arc::downgrade(queue));
        debug!(%from, %to, "Mailbox moved");
        Ok(())
    }
}

fn points_at(boxes: &HashMap<Address, Weak<Queue>>, address: Address, queue: &Arc<Queue>) -> bool {
    boxes
        .get(&address)
        .is_some_and(|weak| std::ptr::eq(weak.as_ptr(), Arc::as_ptr(queue)))
}

/// Handle to the address registry.
#[derive(Clone, Default)]
pub struct PostOffice {
    registry: Arc<Registry>,
}

impl PostOffice {
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a mailbox at `address` and returns its only owning handle.
    ///
    /// # Errors
    ///
    /// [`RuntimeError::AddressInUse`] if a live mailbox already owns the address.
    pub fn new_mailbox(&self, address: Address) -> Result<Mailbox, RuntimeError> {
        let mut boxes = self.registry.boxes.lock();
        if boxes.get(&address).is_some_and(|weak| weak.strong_count() > 0) {
            error!(%address, "Mailbox address already in use");
            return Err(RuntimeError::AddressInUse(address));
        }

        let queue = Arc::new(Queue::default());
        boxes.insert(address, Arc::downgrade(&queue));
        debug!(%address, "Mailbox created");
        Ok(Mailbox::new(address, queue, Arc::downgrade(&self.registry)))
    }

    /// Creates a mailbox at the address hashed from `name`.
    pub fn new_named(&self, name: &str) -> Result<Mailbox, RuntimeError> {
        self.new_mailbox(Address::from_name(name))
    }

    /// Delivers `msg` to the mailbox at `address`. Never blocks on the recipient.
    ///
    /// # Errors
    ///
    /// [`RuntimeError::AddressNotFound`] if no live mailbox owns the address.
    pub fn post(&self, address: Address, msg: Message) -> Result<(), RuntimeError> {
        match self.registry.resolve(address) {
            Some(queue) => {
                queue.put(msg);
                Ok(())
            }
            None => {
                warn!(%address, "Post to unknown address");
                Err(RuntimeError::AddressNotFound(address))
            }
        }
    }

    /// Delivers `msg` to the mailbox registered under `name`.
    pub fn post_named(&self, name: &str, msg: Message) -> Result<(), RuntimeError> {
        self.post(Address::from_name(name), msg)
    }

    /// Detaches `address` so nothing new can be posted to it. The mailbox itself keeps
    /// whatever is already queued. Returns `true` if an entry was removed.
    pub fn revoke(&self, address: Address) -> bool {
        let removed = self.registry.boxes.lock().remove(&address).is_some();
        if removed {
            debug!(%address, "Address revoked");
        }
        removed
    }

    /// True if a live mailbox is registered at `address`.
    pub fn contains(&self, address: Address) -> bool {
        self.registry.resolve(address).is_some()
    }

    /// Number of registry entries, including ones whose mailbox is being torn down.
    pub fn len(&self) -> usize {
        self.registry.boxes.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
