//! # Mock Role & Testing Guide
//!
//! [`MockRole`] is a scripted, recording [`Role`]. It lets a test register an actor
//! whose answers are known in advance and then assert on exactly what the actor saw,
//! without writing a bespoke role for every test.
//!
//! ## Scripted Results
//!
//! Each handled message pops the next scripted result (see [`MockRole::then_return`]).
//! Once the script is exhausted the fallback result is returned, which defaults to
//! [`ProcessResult::Complete`] and can be changed with [`MockRole::returning`].
//!
//! ## Observations
//!
//! The [`MockProbe`] returned alongside the role stays with the test. It records every
//! message the role handled (the payload downcast to `T`, plus the actor identity and
//! the message source), and how many dispatches were ever in flight at once.
//!
//! ```rust
//! use actor_pool::mock::MockRole;
//! use actor_pool::{Message, RuntimeConfig, WorkerPool};
//! use std::time::Duration;
//!
//! let pool = WorkerPool::new(RuntimeConfig::default().with_workers(2)).unwrap();
//! let (role, probe) = MockRole::<u32>::new("listener");
//! let id = pool.register(role).unwrap();
//!
//! pool.post_message(id, Message::new(5u32)).unwrap();
//! assert!(probe.wait_for(1, Duration::from_secs(5)));
//! assert_eq!(probe.values(), vec![5]);
//!
//! pool.shutdown().unwrap();
//! ```

use crate::framework::message::{ActorId, Address, Message, ProcessResult};
use crate::framework::role::{Context, Role};
use parking_lot::{Condvar, Mutex};
use std::any::Any;
use std::collections::VecDeque;
use std::fmt::Debug;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

/// One message as seen by a [`MockRole`].
#[derive(Debug, Clone, PartialEq)]
pub struct Observed<T> {
    pub actor: Option<ActorId>,
    pub name: String,
    pub source: Option<Address>,
    /// The payload, if it was a `T`.
    pub value: Option<T>,
}

struct ProbeState<T> {
    observed: Mutex<Vec<Observed<T>>>,
    changed: Condvar,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
}

/// Scripted role that records what it handles.
pub struct MockRole<T> {
    name: String,
    script: VecDeque<ProcessResult>,
    fallback: ProcessResult,
    delay: Option<Duration>,
    state: Arc<ProbeState<T>>,
}

impl<T: Any + Clone + Send> MockRole<T> {
    /// Creates the role and the probe that observes it.
    pub fn new(name: impl Into<String>) -> (Self, MockProbe<T>) {
        let state = Arc::new(ProbeState {
            observed: Mutex::new(Vec::new()),
            changed: Condvar::new(),
            in_flight: AtomicUsize::new(0),
            max_in_flight: AtomicUsize::new(0),
        });
        let role = Self {
            name: name.into(),
            script: VecDeque::new(),
            fallback: ProcessResult::Complete,
            delay: None,
            state: Arc::clone(&state),
        };
        (role, MockProbe { state })
    }

    /// Queues the result for the next unscripted message.
    pub fn then_return(mut self, result: ProcessResult) -> Self {
        self.script.push_back(result);
        self
    }

    /// Result used once the script runs out.
    pub fn returning(mut self, result: ProcessResult) -> Self {
        self.fallback = result;
        self
    }

    /// Sleeps inside every dispatch, to widen race windows in concurrency tests.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }
}

impl<T: Any + Clone + Send> Role for MockRole<T> {
    fn handle(&mut self, ctx: &Context<'_>, msg: Message) -> ProcessResult {
        let now = self.state.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.state.max_in_flight.fetch_max(now, Ordering::SeqCst);

        if let Some(delay) = self.delay {
            thread::sleep(delay);
        }

        let observed = Observed {
            actor: ctx.id(),
            name: ctx.name(),
            source: msg.source(),
            value: msg.downcast_ref::<T>().cloned(),
        };
        self.state.observed.lock().push(observed);
        self.state.in_flight.fetch_sub(1, Ordering::SeqCst);
        self.state.changed.notify_all();

        self.script.pop_front().unwrap_or(self.fallback)
    }

    fn default_name(&self) -> &str {
        &self.name
    }
}

/// Test-side view of a [`MockRole`].
#[derive(Clone)]
pub struct MockProbe<T> {
    state: Arc<ProbeState<T>>,
}

impl<T: Clone + Debug> MockProbe<T> {
    /// Every handled message, in handling order.
    pub fn observed(&self) -> Vec<Observed<T>> {
        self.state.observed.lock().clone()
    }

    /// Payloads that were a `T`, in handling order.
    pub fn values(&self) -> Vec<T> {
        self.state
            .observed
            .lock()
            .iter()
            .filter_map(|o| o.value.clone())
            .collect()
    }

    pub fn count(&self) -> usize {
        self.state.observed.lock().len()
    }

    /// Highest number of simultaneous dispatches ever observed.
    pub fn max_concurrency(&self) -> usize {
        self.state.max_in_flight.load(Ordering::SeqCst)
    }

    /// Blocks until at least `count` messages were handled or `timeout` elapses.
    pub fn wait_for(&self, count: usize, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        let mut observed = self.state.observed.lock();
        while observed.len() < count {
            if self
                .state
                .changed
                .wait_until(&mut observed, deadline)
                .timed_out()
            {
                return observed.len() >= count;
            }
        }
        true
    }

    /// Panics unless exactly `count` messages were handled.
    pub fn verify(&self, count: usize) {
        let observed = self.observed();
        assert_eq!(
            observed.len(),
            count,
            "expected {} handled messages, got {:?}",
            count,
            observed
        );
    }
}
