//! # Worker Pool
//!
//! The [`WorkerPool`] owns a fixed set of OS threads and the actor table. Every worker
//! repeatedly sweeps the table, draining each actor that has mail, and then sleeps on
//! its own condition variable until there is work again or it is told to stop.
//!
//! ## Table Ownership
//!
//! The table is a `Vec<Arc<Actor>>` behind a [`ReaderWriterLock`]. Sweeps read it;
//! only two things ever write it:
//!
//! - [`register`](WorkerPool::register), which appends a new actor, and
//! - the sweep itself, which erases actors that came back [`ProcessResult::Poisoned`].
//!
//! [`unregister`](WorkerPool::unregister) never touches the table. It queues a poison
//! message and revokes the actor's address; the actor stops at the end of its current
//! batch and the sweep that observes the `Poisoned` result removes it. An actor is
//! therefore only ever removed after its own in-flight processing has finished.
//!
//! ## Sweep Strategies
//!
//! See [`SweepStrategy`]. The default deferred sweep holds no table lock while role
//! code runs; the handoff sweep releases the lock around each batch instead.
//!
//! ## Wake-ups
//!
//! [`post_message`](WorkerPool::post_message) signals every worker after a successful
//! delivery. There is no actor-to-worker affinity, so any idle worker may be the one to
//! pick the message up. A worker that wakes re-checks whether any idle, healthy actor
//! has a non-empty mailbox before sweeping again.

use crate::framework::actor::Actor;
use crate::framework::error::RuntimeError;
use crate::framework::message::{ActorId, Address, Message, ProcessResult};
use crate::framework::post_office::PostOffice;
use crate::framework::role::Role;
use crate::framework::rwlock::{ReadGuard, ReaderWriterLock};
use crate::runtime::config::{RuntimeConfig, SweepStrategy};
use parking_lot::{Condvar, Mutex};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use tracing::{debug, error, info, warn};

/// Per-worker control block.
#[derive(Default)]
struct WorkerSignal {
    stop: Mutex<bool>,
    notify: Condvar,
}

/// State shared by the pool, its workers and every [`PoolHandle`].
pub(crate) struct Shared {
    table: ReaderWriterLock<Vec<Arc<Actor>>>,
    office: PostOffice,
    signals: Vec<WorkerSignal>,
    next_id: AtomicU64,
    config: RuntimeConfig,
}

impl Shared {
    pub(crate) fn new(config: RuntimeConfig, office: PostOffice) -> Self {
        let signals = (0..config.workers).map(|_| WorkerSignal::default()).collect();
        Self {
            table: ReaderWriterLock::new(Vec::new()),
            office,
            signals,
            next_id: AtomicU64::new(1),
            config,
        }
    }

    pub(crate) fn config(&self) -> &RuntimeConfig {
        &self.config
    }

    pub(crate) fn office(&self) -> &PostOffice {
        &self.office
    }

    pub(crate) fn register(&self, role: Box<dyn Role>) -> Result<ActorId, RuntimeError> {
        let mut table = self.table.write();
        if table.len() >= self.config.max_actors {
            error!(max = self.config.max_actors, "Actor table is full");
            return Err(RuntimeError::TableFull {
                max: self.config.max_actors,
            });
        }

        // The counter only moves once the mailbox exists.
        let id = ActorId::new(self.next_id.load(Ordering::Acquire));
        let mailbox = self.office.new_mailbox(Address::from(id))?;
        self.next_id.fetch_max(id.raw() + 1, Ordering::AcqRel);
        let actor = Arc::new(Actor::new(id, role, mailbox));
        info!(actor = %id, name = %actor.name(), size = table.len() + 1, "Registered");
        table.push(actor);
        Ok(id)
    }

    /// Keeps future registrations clear of an ID an actor moved itself to.
    pub(crate) fn reserve_id(&self, id: ActorId) {
        self.next_id.fetch_max(id.raw() + 1, Ordering::AcqRel);
    }

    pub(crate) fn unregister(&self, id: ActorId) -> Result<(), RuntimeError> {
        let address = Address::from(id);
        self.post_message(address, Message::poison())
            .map_err(|_| RuntimeError::ActorNotFound(id))?;
        self.office.revoke(address);
        info!(actor = %id, "Unregister requested");
        Ok(())
    }

    pub(crate) fn post_message(&self, to: Address, msg: Message) -> Result<(), RuntimeError> {
        self.office.post(to, msg)?;
        self.wake_all();
        Ok(())
    }

    pub(crate) fn find_first_by_name(&self, name: &str) -> Option<ActorId> {
        self.table
            .read()
            .iter()
            .filter(|actor| !actor.is_sick())
            .find(|actor| actor.name() == name)
            .and_then(|actor| actor.id())
    }

    fn actor_name(&self, id: ActorId) -> Option<String> {
        self.table
            .read()
            .iter()
            .find(|actor| actor.id() == Some(id))
            .map(|actor| actor.name())
    }

    fn len(&self) -> usize {
        self.table.read().len()
    }

    fn wake_all(&self) {
        for signal in &self.signals {
            // Taking the worker's mutex orders this wake after its predicate check.
            let _guard = signal.stop.lock();
            signal.notify.notify_one();
        }
    }

    fn stop_all(&self) {
        for signal in &self.signals {
            *signal.stop.lock() = true;
            signal.notify.notify_one();
        }
    }

    fn has_pending_work(&self) -> bool {
        self.table.read().iter().any(|actor| actor.needs_processing())
    }

    fn sweep(&self, worker: usize) {
        match self.config.sweep {
            SweepStrategy::Deferred => self.sweep_deferred(worker),
            SweepStrategy::Handoff => self.sweep_handoff(worker),
        }
    }

    fn sweep_deferred(&self, worker: usize) {
        let snapshot: Vec<Arc<Actor>> = self.table.read().clone();
        let mut poisoned = 0usize;

        for actor in &snapshot {
            match actor.process_messages(self) {
                ProcessResult::Skipped | ProcessResult::Complete => {}
                ProcessResult::Poisoned => poisoned += 1,
                ProcessResult::Error => {
                    warn!(worker, actor = %actor.address(), name = %actor.name(), "Actor reported an error");
                }
            }
        }

        if poisoned > 0 {
            let mut table = self.table.write();
            table.retain(|actor| !actor.is_sick());
            debug!(worker, poisoned, size = table.len(), "Removed poisoned actors");
        }
    }

    fn sweep_handoff(&self, worker: usize) {
        let mut table = self.table.read();
        let mut cursor = 0;

        while cursor < table.len() {
            let actor = Arc::clone(&table[cursor]);
            match actor.process_messages_with_lock_handoff(self, &mut table) {
                ProcessResult::Skipped | ProcessResult::Complete => {}
                ProcessResult::Poisoned => {
                    ReadGuard::unlocked(&mut table, || {
                        let mut slots = self.table.write();
                        if let Some(slot) = slots.iter().position(|a| Arc::ptr_eq(a, &actor)) {
                            slots.remove(slot);
                        }
                        debug!(worker, size = slots.len(), "Removed poisoned actor");
                    });
                    // The next actor has moved into the erased slot.
                    continue;
                }
                ProcessResult::Error => {
                    warn!(worker, actor = %actor.address(), name = %actor.name(), "Actor reported an error");
                }
            }
            cursor += 1;
        }
    }
}

fn run_worker(shared: Arc<Shared>, index: usize) {
    if shared.config.pin_threads {
        let pinned = core_affinity::get_core_ids()
            .and_then(|cores| cores.get(index).copied())
            .is_some_and(core_affinity::set_for_current);
        debug!(worker = index, pinned, "Worker affinity");
    }

    info!(worker = index, "Worker started");
    let signal = &shared.signals[index];

    loop {
        if *signal.stop.lock() {
            break;
        }

        shared.sweep(index);

        let mut stop = signal.stop.lock();
        while !*stop && !shared.has_pending_work() {
            signal.notify.wait(&mut stop);
        }
        if *stop {
            break;
        }
    }

    info!(worker = index, "Worker stopped");
}

/// The scheduler: worker threads plus the actor table they sweep.
///
/// Dropping the pool stops and joins every worker. Actors still registered at that
/// point are dropped with the pool; their queued messages are not drained.
pub struct WorkerPool {
    shared: Arc<Shared>,
    workers: Vec<JoinHandle<()>>,
}

impl WorkerPool {
    /// Starts a pool with its own post office.
    pub fn new(config: RuntimeConfig) -> Result<Self, RuntimeError> {
        Self::with_post_office(config, PostOffice::new())
    }

    /// Starts a pool that registers actor mailboxes in `office`.
    ///
    /// Sharing the office lets non-actor code (a main loop, a UI thread) own named
    /// mailboxes that roles can post to.
    pub fn with_post_office(config: RuntimeConfig, office: PostOffice) -> Result<Self, RuntimeError> {
        config.validate()?;
        let shared = Arc::new(Shared::new(config, office));
        let mut pool = Self {
            shared: Arc::clone(&shared),
            workers: Vec::with_capacity(shared.config.workers),
        };

        for index in 0..shared.config.workers {
            let worker_shared = Arc::clone(&shared);
            let handle = thread::Builder::new()
                .name(format!("{}{}", shared.config.thread_prefix, index))
                .spawn(move || run_worker(worker_shared, index))
                .map_err(|e| RuntimeError::WorkerSpawn(e.to_string()))?;
            pool.workers.push(handle);
        }

        info!(workers = pool.workers.len(), max_actors = shared.config.max_actors, sweep = ?shared.config.sweep, "Worker pool started");
        Ok(pool)
    }

    /// Cloneable handle for use from other threads.
    pub fn handle(&self) -> PoolHandle {
        PoolHandle {
            shared: Arc::clone(&self.shared),
        }
    }

    pub fn post_office(&self) -> &PostOffice {
        &self.shared.office
    }

    pub fn config(&self) -> &RuntimeConfig {
        &self.shared.config
    }

    /// Wraps `role` in a new actor and appends it to the table.
    ///
    /// # Errors
    ///
    /// [`RuntimeError::TableFull`] once `max_actors` actors are registered.
    pub fn register(&self, role: impl Role) -> Result<ActorId, RuntimeError> {
        self.shared.register(Box::new(role))
    }

    pub fn register_boxed(&self, role: Box<dyn Role>) -> Result<ActorId, RuntimeError> {
        self.shared.register(role)
    }

    /// Asks the actor to stop. It is removed by a worker once its current batch ends;
    /// posting to `id` fails from the moment this returns.
    pub fn unregister(&self, id: ActorId) -> Result<(), RuntimeError> {
        self.shared.unregister(id)
    }

    /// Delivers `msg` to an actor ID or any other address, then wakes the workers.
    pub fn post_message(&self, to: impl Into<Address>, msg: Message) -> Result<(), RuntimeError> {
        self.shared.post_message(to.into(), msg)
    }

    pub fn post_named(&self, name: &str, msg: Message) -> Result<(), RuntimeError> {
        self.shared.post_message(Address::from_name(name), msg)
    }

    /// Linear scan for the first healthy actor with this display name.
    pub fn find_first_by_name(&self, name: &str) -> Option<ActorId> {
        self.shared.find_first_by_name(name)
    }

    pub fn actor_name(&self, id: ActorId) -> Option<String> {
        self.shared.actor_name(id)
    }

    /// Number of table slots, including actors poisoned but not yet removed.
    pub fn len(&self) -> usize {
        self.shared.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn worker_count(&self) -> usize {
        self.workers.len()
    }

    /// Stops and joins every worker.
    ///
    /// # Errors
    ///
    /// [`RuntimeError::WorkerPanicked`] for the first worker whose thread panicked.
    pub fn shutdown(mut self) -> Result<(), RuntimeError> {
        self.stop_and_join()
    }

    fn stop_and_join(&mut self) -> Result<(), RuntimeError> {
        if self.workers.is_empty() {
            return Ok(());
        }
        info!(workers = self.workers.len(), actors = self.len(), "Shutting down worker pool");
        self.shared.stop_all();

        let mut result = Ok(());
        for (index, worker) in self.workers.drain(..).enumerate() {
            if worker.join().is_err() {
                error!(worker = index, "Worker thread panicked");
                if result.is_ok() {
                    result = Err(RuntimeError::WorkerPanicked(index));
                }
            }
        }
        info!("Worker pool stopped");
        result
    }
}

impl Drop for WorkerPool {
    fn drop(&mut self) {
        let _ = self.stop_and_join();
    }
}

/// Cheap, cloneable access to a running pool.
///
/// A handle keeps the table and post office alive but not the workers: once the pool
/// has shut down, posts still succeed while nothing processes them.
#[derive(Clone)]
pub struct PoolHandle {
    shared: Arc<Shared>,
}

impl PoolHandle {
    pub fn register(&self, role: impl Role) -> Result<ActorId, RuntimeError> {
        self.shared.register(Box::new(role))
    }

    pub fn unregister(&self, id: ActorId) -> Result<(), RuntimeError> {
        self.shared.unregister(id)
    }

    pub fn post_message(&self, to: impl Into<Address>, msg: Message) -> Result<(), RuntimeError> {
        self.shared.post_message(to.into(), msg)
    }

    pub fn post_named(&self, name: &str, msg: Message) -> Result<(), RuntimeError> {
        self.shared.post_message(Address::from_name(name), msg)
    }

    pub fn find_first_by_name(&self, name: &str) -> Option<ActorId> {
        self.shared.find_first_by_name(name)
    }

    pub fn post_office(&self) -> &PostOffice {
        &self.shared.office
    }
}
