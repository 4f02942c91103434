//! Lock behaviour across several coordinators sharing one store
//!
//! Each coordinator stands in for a separate process instance.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::{Duration, Instant};

use biblio_lock::{
    Acquisition, LockCoordinator, LockOptions, LockOutcome, MemorySharedStore, ReleaseOutcome,
    SharedStore,
};

fn instances(count: usize) -> (Arc<MemorySharedStore>, Vec<LockCoordinator>) {
    let store = Arc::new(MemorySharedStore::new());
    let coordinators = (0..count)
        .map(|_| LockCoordinator::new(store.clone()))
        .collect();
    (store, coordinators)
}

#[tokio::test]
async fn test_acquire_on_held_lock_returns_within_bound() {
    let (_, nodes) = instances(2);
    let holder = LockOptions::from_millis(5_000, 0, 10);
    let waiter = LockOptions::from_millis(5_000, 200, 50);

    let held = nodes[0].acquire("lock:book:1", &holder).await.unwrap();
    assert!(held.is_acquired());

    let started = Instant::now();
    let result = nodes[1].acquire("lock:book:1", &waiter).await.unwrap();
    let elapsed = started.elapsed();

    assert!(matches!(result, Acquisition::TimedOut { .. }));
    assert!(elapsed >= Duration::from_millis(200));
    // bound + retry interval, plus scheduler slack
    assert!(elapsed < Duration::from_millis(200 + 50 + 150), "took {:?}", elapsed);
}

#[tokio::test]
async fn test_unreleased_lock_becomes_acquirable_after_ttl() {
    let (_, nodes) = instances(2);
    let short_ttl = LockOptions::from_millis(100, 0, 10);

    let abandoned = nodes[0].acquire("lock:book:2", &short_ttl).await.unwrap();
    assert!(abandoned.is_acquired());

    let waiter = LockOptions::from_millis(5_000, 1_000, 10);
    let result = nodes[1].acquire("lock:book:2", &waiter).await.unwrap();
    assert!(result.is_acquired());
}

#[tokio::test]
async fn test_waiter_acquires_after_holder_releases() {
    let (_, nodes) = instances(2);
    let options = LockOptions::from_millis(5_000, 1_000, 10);

    let held = nodes[0].acquire("lock:book:3", &options).await.unwrap();
    let token = held.token().cloned().unwrap();

    let waiter_node = nodes[1].clone();
    let waiter = tokio::spawn(async move {
        waiter_node.acquire("lock:book:3", &options).await.unwrap()
    });

    tokio::time::sleep(Duration::from_millis(50)).await;
    assert_eq!(
        nodes[0].release("lock:book:3", &token).await.unwrap(),
        ReleaseOutcome::Released
    );

    let result = waiter.await.unwrap();
    assert!(result.is_acquired());
    assert_ne!(result.token(), Some(&token));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_critical_sections_never_overlap() {
    let (_, nodes) = instances(4);
    let inside = Arc::new(AtomicUsize::new(0));
    let max_inside = Arc::new(AtomicUsize::new(0));
    let completed = Arc::new(AtomicUsize::new(0));
    let options = LockOptions::from_millis(5_000, 5_000, 1);

    let mut tasks = Vec::new();
    for i in 0..16 {
        let node = nodes[i % nodes.len()].clone();
        let inside = inside.clone();
        let max_inside = max_inside.clone();
        let completed = completed.clone();
        tasks.push(tokio::spawn(async move {
            let outcome = node
                .with_lock("lock:book:shared", &options, move || async move {
                    let now = inside.fetch_add(1, Ordering::SeqCst) + 1;
                    max_inside.fetch_max(now, Ordering::SeqCst);
                    tokio::time::sleep(Duration::from_millis(2)).await;
                    inside.fetch_sub(1, Ordering::SeqCst);
                    completed.fetch_add(1, Ordering::SeqCst);
                })
                .await
                .unwrap();
            assert!(matches!(outcome, LockOutcome::Completed(())));
        }));
    }

    for task in tasks {
        task.await.unwrap();
    }

    assert_eq!(max_inside.load(Ordering::SeqCst), 1);
    assert_eq!(completed.load(Ordering::SeqCst), 16);
}

#[tokio::test]
async fn test_panic_in_critical_section_releases_lock() {
    let (store, nodes) = instances(1);
    let node = nodes[0].clone();
    let options = LockOptions::from_millis(30_000, 100, 10);

    let handle = tokio::spawn(async move {
        node.with_lock("lock:book:4", &options, || async {
            let broken = true;
            if broken {
                panic!("critical section failed");
            }
        })
        .await
    });

    let joined = handle.await;
    assert!(joined.unwrap_err().is_panic());
    assert!(store.get("lock:book:4").await.unwrap().is_none());

    let again = nodes[0].acquire("lock:book:4", &options).await.unwrap();
    assert!(again.is_acquired());
}

#[tokio::test]
async fn test_dropped_caller_still_finishes_section_and_releases() {
    let (store, nodes) = instances(2);
    let options = LockOptions::from_millis(30_000, 100, 10);
    let finished = Arc::new(AtomicBool::new(false));

    let section_done = finished.clone();
    let cancelled = tokio::time::timeout(
        Duration::from_millis(20),
        nodes[0].with_lock("lock:book:5", &options, move || async move {
            tokio::time::sleep(Duration::from_millis(200)).await;
            section_done.store(true, Ordering::SeqCst);
        }),
    )
    .await;
    assert!(cancelled.is_err());

    // Still held while the section runs on
    assert!(store.get("lock:book:5").await.unwrap().is_some());

    let waiter = LockOptions::from_millis(30_000, 2_000, 10);
    let next = nodes[1].acquire("lock:book:5", &waiter).await.unwrap();
    assert!(next.is_acquired());
    assert!(finished.load(Ordering::SeqCst));
}

#[tokio::test]
async fn test_locks_on_different_names_are_independent() {
    let (_, nodes) = instances(2);
    let options = LockOptions::from_millis(5_000, 0, 10);

    let a = nodes[0].acquire("lock:book:10", &options).await.unwrap();
    let b = nodes[1].acquire("lock:book:11", &options).await.unwrap();

    assert!(a.is_acquired());
    assert!(b.is_acquired());
}
