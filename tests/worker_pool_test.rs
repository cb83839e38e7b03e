use actor_pool::mock::MockRole;
use actor_pool::{
    ActorId, BatchPolicy, Context, Message, ProcessResult, Role, RuntimeConfig, SweepStrategy,
    WorkerPool,
};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

const TIMEOUT: Duration = Duration::from_secs(10);

fn config(workers: usize) -> RuntimeConfig {
    RuntimeConfig::default()
        .with_workers(workers)
        .with_pin_threads(false)
}

fn wait_until(timeout: Duration, mut condition: impl FnMut() -> bool) -> bool {
    let deadline = Instant::now() + timeout;
    while Instant::now() < deadline {
        if condition() {
            return true;
        }
        thread::sleep(Duration::from_millis(1));
    }
    condition()
}

#[test]
fn test_single_sender_order_is_preserved() {
    let pool = WorkerPool::new(config(4)).unwrap();
    let (role, probe) = MockRole::<u32>::new("ordered");
    let id = pool.register(role).unwrap();

    for n in 0..200u32 {
        pool.post_message(id, Message::new(n)).unwrap();
    }

    assert!(probe.wait_for(200, TIMEOUT));
    assert_eq!(probe.values(), (0..200).collect::<Vec<_>>());
}

#[test]
fn test_actor_is_never_processed_concurrently() {
    let pool = WorkerPool::new(config(4)).unwrap();
    let (role, probe) = MockRole::<u32>::new("exclusive");
    let id = pool
        .register(role.with_delay(Duration::from_millis(1)))
        .unwrap();

    let senders: Vec<_> = (0..4)
        .map(|t| {
            let handle = pool.handle();
            thread::spawn(move || {
                for n in 0..15u32 {
                    handle.post_message(id, Message::new(t * 100 + n)).unwrap();
                }
            })
        })
        .collect();
    for sender in senders {
        sender.join().unwrap();
    }

    assert!(probe.wait_for(60, TIMEOUT));
    assert_eq!(probe.max_concurrency(), 1);

    // Each sender's own messages still arrive in order.
    let values = probe.values();
    for t in 0..4u32 {
        let mine: Vec<_> = values.iter().filter(|v| *v / 100 == t).copied().collect();
        assert_eq!(mine, (0..15).map(|n| t * 100 + n).collect::<Vec<_>>());
    }
}

#[test]
fn test_many_actors_share_few_workers() {
    let pool = WorkerPool::new(config(2)).unwrap();
    let probes: Vec<_> = (0..50)
        .map(|n| {
            let (role, probe) = MockRole::<usize>::new(format!("actor-{n}"));
            let id = pool.register(role).unwrap();
            (id, probe)
        })
        .collect();

    for (n, (id, _)) in probes.iter().enumerate() {
        pool.post_message(*id, Message::new(n)).unwrap();
    }

    for (n, (_, probe)) in probes.iter().enumerate() {
        assert!(probe.wait_for(1, TIMEOUT));
        assert_eq!(probe.values(), vec![n]);
    }
    assert_eq!(pool.worker_count(), 2);
}

#[test]
fn test_handoff_sweep_processes_and_removes() {
    let pool = WorkerPool::new(config(3).with_sweep(SweepStrategy::Handoff)).unwrap();
    let (keep, keep_probe) = MockRole::<u8>::new("keep");
    let (doomed, drop_probe) = MockRole::<u8>::new("drop");
    let keep = pool.register(keep).unwrap();
    let doomed = pool.register(doomed).unwrap();

    pool.post_message(doomed, Message::new(1u8)).unwrap();
    pool.unregister(doomed).unwrap();
    for n in 0..10u8 {
        pool.post_message(keep, Message::new(n)).unwrap();
    }

    assert!(keep_probe.wait_for(10, TIMEOUT));
    assert!(wait_until(TIMEOUT, || pool.len() == 1));
    assert_eq!(drop_probe.values(), vec![1]);
    assert_eq!(pool.find_first_by_name("keep"), Some(keep));
}

/// Registers a fresh child for every message, which needs the table write lock.
struct Breeder {
    born: Arc<AtomicUsize>,
}

impl Role for Breeder {
    fn handle(&mut self, ctx: &Context<'_>, _msg: Message) -> ProcessResult {
        match ctx.register(MockRole::<u8>::new("offspring").0) {
            Ok(_) => {
                self.born.fetch_add(1, Ordering::SeqCst);
                ProcessResult::Complete
            }
            Err(_) => ProcessResult::Error,
        }
    }
}

#[test]
fn test_handoff_sweep_lets_roles_register() {
    let pool = WorkerPool::new(config(2).with_sweep(SweepStrategy::Handoff)).unwrap();
    let born = Arc::new(AtomicUsize::new(0));
    let breeder = pool
        .register(Breeder {
            born: Arc::clone(&born),
        })
        .unwrap();

    for _ in 0..5 {
        pool.post_message(breeder, Message::new(())).unwrap();
    }

    assert!(wait_until(TIMEOUT, || born.load(Ordering::SeqCst) == 5));
    assert_eq!(pool.len(), 6);
}

#[test]
fn test_first_non_complete_policy_on_pool() {
    let pool =
        WorkerPool::new(config(1).with_batch_policy(BatchPolicy::FirstNonComplete)).unwrap();
    let (role, probe) = MockRole::<u8>::new("mixed");
    let id = pool
        .register(
            role.then_return(ProcessResult::Error)
                .then_return(ProcessResult::Skipped),
        )
        .unwrap();

    pool.post_message(id, Message::new(1u8)).unwrap();
    pool.post_message(id, Message::new(2u8)).unwrap();

    // Non-complete results are reported, never fatal.
    assert!(probe.wait_for(2, TIMEOUT));
    assert_eq!(pool.len(), 1);
}

#[test]
fn test_unregister_during_a_long_batch() {
    let pool = WorkerPool::new(config(2)).unwrap();
    let (role, probe) = MockRole::<u8>::new("slow");
    let id = pool
        .register(role.with_delay(Duration::from_millis(20)))
        .unwrap();

    for n in 0..3u8 {
        pool.post_message(id, Message::new(n)).unwrap();
    }
    assert!(probe.wait_for(1, TIMEOUT));
    pool.unregister(id).unwrap();

    // Mail queued before the poison is still handled; the actor then goes away.
    assert!(wait_until(TIMEOUT, || pool.is_empty()));
    assert_eq!(probe.values(), vec![0, 1, 2]);
}

#[test]
fn test_ids_are_not_reused() {
    let pool = WorkerPool::new(config(1)).unwrap();
    let first = pool.register(MockRole::<u8>::new("a").0).unwrap();
    pool.unregister(first).unwrap();
    assert!(wait_until(TIMEOUT, || pool.is_empty()));

    let second = pool.register(MockRole::<u8>::new("b").0).unwrap();
    assert_eq!(first, ActorId::new(1));
    assert_eq!(second, ActorId::new(2));
}

#[test]
fn test_drop_stops_workers_with_mail_pending() {
    let pool = WorkerPool::new(config(2)).unwrap();
    let (role, probe) = MockRole::<u8>::new("busy");
    let id = pool
        .register(role.with_delay(Duration::from_millis(5)))
        .unwrap();
    for n in 0..50u8 {
        pool.post_message(id, Message::new(n)).unwrap();
    }

    drop(pool);
    let handled = probe.count();
    thread::sleep(Duration::from_millis(30));
    assert_eq!(probe.count(), handled);
}

#[test]
fn test_handle_outlives_pool() {
    let pool = WorkerPool::new(config(1)).unwrap();
    let handle = pool.handle();
    let (role, probe) = MockRole::<u8>::new("orphan");
    let id = handle.register(role).unwrap();
    pool.shutdown().unwrap();

    // Delivery still works; nobody is left to process it.
    handle.post_message(id, Message::new(1u8)).unwrap();
    thread::sleep(Duration::from_millis(20));
    probe.verify(0);
}
