//! # Actor
//!
//! An [`Actor`] couples one [`Role`] with one [`Mailbox`] and an identity, and owns the
//! state machine that turns queued messages into role invocations.
//!
//! ## States
//!
//! ```text
//!   Idle ──try_begin──▶ Processing ──batch done──▶ Idle
//!                           │
//!                           └── Poison / role returned Poisoned ──▶ Sick (terminal)
//! ```
//!
//! Entering `Processing` is a single compare-and-swap. A worker that loses the race, or
//! finds the actor `Sick`, gets [`ProcessResult::Skipped`] back immediately and moves
//! on; the sweep is never stalled by one busy actor.
//!
//! ## Batches
//!
//! A drain handles exactly as many messages as the mailbox held when the drain began.
//! Messages that arrive mid-batch wait for the next sweep, so an actor whose mailbox
//! keeps refilling cannot monopolise a worker.

use crate::framework::message::{ActorId, Address, Control, Message, ProcessResult};
use crate::framework::mailbox::Mailbox;
use crate::framework::role::{Context, Role};
use crate::framework::rwlock::ReadGuard;
use crate::runtime::worker_pool::Shared;
use parking_lot::Mutex;
use std::any::Any;
use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicI64, AtomicU8, Ordering};
use tracing::{debug, error, warn};

/// ID value stored once an actor is poisoned.
pub const INVALID_ACTOR: i64 = -1;

const IDLE: u8 = 0;
const PROCESSING: u8 = 1;
const SICK: u8 = 2;

/// A role, its mailbox and its identity.
pub struct Actor {
    mailbox: Mailbox,
    role: Mutex<Box<dyn Role>>,
    name: Mutex<String>,
    id: AtomicI64,
    state: AtomicU8,
}

impl Actor {
    pub(crate) fn new(id: ActorId, role: Box<dyn Role>, mailbox: Mailbox) -> Self {
        let name = role.default_name().to_owned();
        Self {
            mailbox,
            role: Mutex::new(role),
            name: Mutex::new(name),
            id: AtomicI64::new(id.raw() as i64),
            state: AtomicU8::new(IDLE),
        }
    }

    /// Current ID, `None` once the actor has been poisoned.
    pub fn id(&self) -> Option<ActorId> {
        match self.id.load(Ordering::Acquire) {
            INVALID_ACTOR => None,
            raw => Some(ActorId::new(raw as u64)),
        }
    }

    pub fn name(&self) -> String {
        self.name.lock().clone()
    }

    pub fn address(&self) -> Address {
        self.mailbox.address()
    }

    pub fn is_sick(&self) -> bool {
        self.state.load(Ordering::Acquire) == SICK
    }

    /// True if the actor is idle, healthy and has mail waiting.
    pub fn needs_processing(&self) -> bool {
        self.state.load(Ordering::Acquire) == IDLE && !self.mailbox.is_empty()
    }

    /// Number of messages waiting in the mailbox.
    pub fn pending(&self) -> usize {
        self.mailbox.len()
    }

    /// Enqueues directly, bypassing the post office.
    pub fn post(&self, msg: Message) {
        self.mailbox.put(msg);
    }

    /// Drains one batch if no other thread is draining this actor.
    pub(crate) fn process_messages(&self, shared: &Shared) -> ProcessResult {
        if !self.try_begin() {
            return ProcessResult::Skipped;
        }
        let result = self.drain(shared);
        self.finish(result);
        result
    }

    /// Like [`process_messages`](Self::process_messages), but once this actor is
    /// claimed the caller's read lock on the actor table is released for the whole
    /// batch and reacquired before returning, even if the role panics.
    ///
    /// This lets the role call back into the pool (register, unregister) without
    /// deadlocking against the table lock the sweeping worker holds.
    pub(crate) fn process_messages_with_lock_handoff<T: ?Sized>(
        &self,
        shared: &Shared,
        table: &mut ReadGuard<'_, T>,
    ) -> ProcessResult {
        if !self.try_begin() {
            return ProcessResult::Skipped;
        }
        let result = ReadGuard::unlocked(table, || self.drain(shared));
        self.finish(result);
        result
    }

    fn try_begin(&self) -> bool {
        self.state
            .compare_exchange(IDLE, PROCESSING, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }

    fn finish(&self, result: ProcessResult) {
        if result != ProcessResult::Poisoned {
            self.state.store(IDLE, Ordering::Release);
        }
    }

    fn drain(&self, shared: &Shared) -> ProcessResult {
        let batch = self.mailbox.len();
        if batch == 0 {
            return ProcessResult::Skipped;
        }

        let policy = shared.config().batch_policy;
        let mut outcome = ProcessResult::Complete;
        let mut role = self.role.lock();

        for _ in 0..batch {
            // Only the holder of PROCESSING consumes, so `batch` messages are present.
            let msg = self.mailbox.wait();
            let msg = match msg.into_control() {
                Ok(Control::Poison) => {
                    self.make_sick(shared);
                    return ProcessResult::Poisoned;
                }
                Ok(Control::SetName(name)) => {
                    *self.name.lock() = name;
                    continue;
                }
                Ok(Control::SetId(id)) => {
                    self.change_id(id, shared);
                    continue;
                }
                Err(msg) => msg,
            };

            let ctx = Context::new(self, shared);
            let result = panic::catch_unwind(AssertUnwindSafe(|| role.handle(&ctx, msg)))
                .unwrap_or_else(|payload| {
                    error!(actor = %self.address(), panic = %panic_message(&*payload), "Role panicked");
                    ProcessResult::Error
                });

            if result == ProcessResult::Poisoned {
                self.make_sick(shared);
                return ProcessResult::Poisoned;
            }
            outcome = policy.fold(outcome, result);
        }

        debug!(actor = %self.address(), batch, ?outcome, "Batch drained");
        outcome
    }

    /// Moves the actor to `id`, mailbox address included. Refused if `id` falls in the
    /// named half of the address space or another live mailbox already owns it.
    fn change_id(&self, id: ActorId, shared: &Shared) {
        let to = Address::from(id);
        if to.is_named() {
            warn!(actor = %self.address(), requested = id.raw(), "SetId outside the actor ID range");
            return;
        }
        match self.mailbox.readdress(to) {
            Ok(()) => {
                self.id.store(id.raw() as i64, Ordering::Release);
                shared.reserve_id(id);
                debug!(actor = %to, name = %self.name(), "Actor renumbered");
            }
            Err(e) => warn!(actor = %self.address(), requested = %id, error = %e, "SetId rejected"),
        }
    }

    fn make_sick(&self, shared: &Shared) {
        self.state.store(SICK, Ordering::Release);
        self.id.store(INVALID_ACTOR, Ordering::Release);
        shared.office().revoke(self.address());
        debug!(actor = %self.address(), name = %self.name(), "Actor poisoned");
    }
}

impl fmt::Debug for Actor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Actor")
            .field("id", &self.id())
            .field("name", &self.name())
            .field("sick", &self.is_sick())
            .field("pending", &self.pending())
            .finish()
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    if let Some(s) = payload.downcast_ref::<&str>() {
        *s
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.as_str()
    } else {
        "non-string panic payload"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::framework::mock::MockRole;
    use crate::framework::PostOffice;
    use crate::runtime::{BatchPolicy, RuntimeConfig};

    fn shared(policy: BatchPolicy) -> Shared {
        let config = RuntimeConfig::default().with_batch_policy(policy);
        Shared::new(config, PostOffice::new())
    }

    fn actor(shared: &Shared, id: u64, role: impl Role) -> Actor {
        let id = ActorId::new(id);
        let mailbox = shared.office().new_mailbox(id.into()).unwrap();
        Actor::new(id, Box::new(role), mailbox)
    }

    #[test]
    fn empty_mailbox_is_skipped() {
        let shared = shared(BatchPolicy::default());
        let (role, _probe) = MockRole::<i32>::new("idle");
        let actor = actor(&shared, 1, role);

        assert_eq!(actor.process_messages(&shared), ProcessResult::Skipped);
        assert!(!actor.is_sick());
    }

    #[test]
    fn batch_is_bounded_by_depth_at_entry() {
        let shared = shared(BatchPolicy::default());
        let (role, probe) = MockRole::<i32>::new("bounded");
        let actor = actor(&shared, 1, role);

        actor.post(Message::new(1));
        actor.post(Message::new(2));
        assert_eq!(actor.process_messages(&shared), ProcessResult::Complete);
        assert_eq!(probe.values(), vec![1, 2]);

        actor.post(Message::new(3));
        assert_eq!(actor.process_messages(&shared), ProcessResult::Complete);
        assert_eq!(probe.values(), vec![1, 2, 3]);
    }

    #[test]
    fn poison_short_circuits_the_batch() {
        let shared = shared(BatchPolicy::default());
        let (role, probe) = MockRole::<i32>::new("victim");
        let actor = actor(&shared, 4, role);

        actor.post(Message::new(1));
        actor.post(Message::poison());
        actor.post(Message::new(2));

        assert_eq!(actor.process_messages(&shared), ProcessResult::Poisoned);
        assert!(actor.is_sick());
        assert_eq!(actor.id(), None);
        assert_eq!(probe.values(), vec![1]);
        assert_eq!(actor.pending(), 1);
        assert!(!shared.office().contains(Address::new(4)));

        // Sick actors refuse further work.
        assert_eq!(actor.process_messages(&shared), ProcessResult::Skipped);
    }

    #[test]
    fn role_can_poison_itself() {
        let shared = shared(BatchPolicy::default());
        let (role, probe) = MockRole::<i32>::new("quitter");
        let role = role.then_return(ProcessResult::Poisoned);
        let actor = actor(&shared, 2, role);

        actor.post(Message::new(10));
        actor.post(Message::new(11));

        assert_eq!(actor.process_messages(&shared), ProcessResult::Poisoned);
        assert_eq!(probe.values(), vec![10]);
        assert!(actor.is_sick());
    }

    #[test]
    fn control_messages_update_identity() {
        let shared = shared(BatchPolicy::default());
        let (role, probe) = MockRole::<i32>::new("before");
        let actor = actor(&shared, 3, role);
        assert_eq!(actor.name(), "before");

        actor.post(Message::set_name("after"));
        actor.post(Message::set_id(ActorId::new(30)));
        actor.post(Message::new(0));

        assert_eq!(actor.process_messages(&shared), ProcessResult::Complete);
        assert_eq!(actor.name(), "after");
        assert_eq!(actor.id(), Some(ActorId::new(30)));
        assert_eq!(actor.address(), Address::new(30));
        assert!(shared.office().contains(Address::new(30)));
        assert!(!shared.office().contains(Address::new(3)));
        // Control messages are consumed by the actor, not the role.
        assert_eq!(probe.count(), 1);
    }

    #[test]
    fn set_id_into_the_named_range_is_refused() {
        let shared = shared(BatchPolicy::default());
        let (role, _probe) = MockRole::<i32>::new("stubborn");
        let actor = actor(&shared, 9, role);

        actor.post(Message::set_id(ActorId::new(u64::MAX)));
        assert_eq!(actor.process_messages(&shared), ProcessResult::Complete);

        assert_eq!(actor.id(), Some(ActorId::new(9)));
        assert_eq!(actor.address(), Address::new(9));
    }

    #[test]
    fn last_non_complete_result_is_surfaced() {
        let shared = shared(BatchPolicy::LastNonComplete);
        let (role, _probe) = MockRole::<i32>::new("mixed");
        let role = role
            .then_return(ProcessResult::Error)
            .then_return(ProcessResult::Skipped)
            .then_return(ProcessResult::Complete);
        let actor = actor(&shared, 5, role);

        for n in 0..3 {
            actor.post(Message::new(n));
        }
        assert_eq!(actor.process_messages(&shared), ProcessResult::Skipped);
    }

    #[test]
    fn first_non_complete_result_is_surfaced() {
        let shared = shared(BatchPolicy::FirstNonComplete);
        let (role, _probe) = MockRole::<i32>::new("mixed");
        let role = role
            .then_return(ProcessResult::Error)
            .then_return(ProcessResult::Skipped);
        let actor = actor(&shared, 6, role);

        actor.post(Message::new(0));
        actor.post(Message::new(1));
        assert_eq!(actor.process_messages(&shared), ProcessResult::Error);
    }

    #[test]
    fn panicking_role_reports_error_and_stays_alive() {
        struct Fragile;

        impl Role for Fragile {
            fn handle(&mut self, _ctx: &Context<'_>, msg: Message) -> ProcessResult {
                if msg.is::<&str>() {
                    panic!("bad input");
                }
                ProcessResult::Complete
            }
        }

        let shared = shared(BatchPolicy::default());
        let actor = actor(&shared, 7, Fragile);

        actor.post(Message::new("explode"));
        assert_eq!(actor.process_messages(&shared), ProcessResult::Error);
        assert!(!actor.is_sick());

        actor.post(Message::new(1u8));
        assert_eq!(actor.process_messages(&shared), ProcessResult::Complete);
    }

    #[test]
    fn lock_handoff_releases_the_table_during_the_batch() {
        use crate::framework::ReaderWriterLock;
        use std::sync::atomic::AtomicUsize;
        use std::sync::Arc;

        struct TableWriter {
            table: Arc<ReaderWriterLock<Vec<u32>>>,
            readers_seen: Arc<AtomicUsize>,
        }

        impl Role for TableWriter {
            fn handle(&mut self, _ctx: &Context<'_>, _msg: Message) -> ProcessResult {
                self.readers_seen
                    .store(self.table.reader_count(), Ordering::SeqCst);
                // Would deadlock if the sweeping thread still held its read lock.
                self.table.write().push(9);
                ProcessResult::Complete
            }
        }

        let shared = shared(BatchPolicy::default());
        let table = Arc::new(ReaderWriterLock::new(Vec::new()));
        let readers_seen = Arc::new(AtomicUsize::new(usize::MAX));
        let role = TableWriter {
            table: Arc::clone(&table),
            readers_seen: Arc::clone(&readers_seen),
        };
        let actor = actor(&shared, 8, role);
        actor.post(Message::new(1));

        let mut guard = table.read();
        let result = actor.process_messages_with_lock_handoff(&shared, &mut guard);

        assert_eq!(result, ProcessResult::Complete);
        assert_eq!(readers_seen.load(Ordering::SeqCst), 0);
        assert_eq!(*guard, vec![9]);
        assert_eq!(table.reader_count(), 1);
    }
}
