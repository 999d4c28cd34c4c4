//! Default worker pool.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use stalebox::offload::{OffloadConfig, OffloadManager, TimeoutPolicy};

#[tokio::test]
async fn test_spawned_task_runs_to_completion() {
    let manager = OffloadManager::default();
    let done = Arc::new(AtomicBool::new(false));

    let flag = Arc::clone(&done);
    let key = manager.spawn("refresh", async move {
        flag.store(true, Ordering::SeqCst);
    });
    assert_eq!(key.kind.as_str(), "refresh");

    manager.wait_all().await;
    assert!(done.load(Ordering::SeqCst));
    assert!(!manager.is_in_flight(&key));
    assert_eq!(manager.active_task_count(), 0);
}

#[tokio::test]
async fn test_keys_are_unique() {
    let manager = OffloadManager::default();
    let first = manager.spawn("refresh", async {});
    let second = manager.spawn("refresh", async {});
    assert_ne!(first, second);
    manager.wait_all().await;
}

#[tokio::test]
async fn test_slow_task_is_not_cancelled_by_warn_policy() {
    let config = OffloadConfig::builder()
        .warn_after(Duration::from_millis(1))
        .build();
    assert!(matches!(config.timeout_policy, TimeoutPolicy::Warn(_)));
    let manager = OffloadManager::new(config);

    let done = Arc::new(AtomicBool::new(false));
    let flag = Arc::clone(&done);
    manager.spawn("refresh", async move {
        tokio::time::sleep(Duration::from_millis(20)).await;
        flag.store(true, Ordering::SeqCst);
    });

    assert!(manager.wait_all_timeout(Duration::from_secs(5)).await);
    assert!(done.load(Ordering::SeqCst));
}

#[tokio::test]
async fn test_cancel_all_stops_pending_tasks() {
    let manager = OffloadManager::default();
    let done = Arc::new(AtomicBool::new(false));

    let flag = Arc::clone(&done);
    let key = manager.spawn("refresh", async move {
        std::future::pending::<()>().await;
        flag.store(true, Ordering::SeqCst);
    });
    assert!(manager.is_in_flight(&key));

    manager.cancel_all();
    manager.wait_all().await;
    assert!(!done.load(Ordering::SeqCst));
    assert!(!manager.is_in_flight(&key));
}

#[tokio::test]
async fn test_wait_all_timeout_reports_stuck_tasks() {
    let manager = OffloadManager::default();
    manager.spawn("refresh", std::future::pending::<()>());

    assert!(!manager.wait_all_timeout(Duration::from_millis(20)).await);
    manager.cancel_all();
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_finished_tasks_are_untracked() {
    let manager = OffloadManager::default();

    let spawners: Vec<_> = (0..4)
        .map(|_| {
            let manager = manager.clone();
            tokio::spawn(async move {
                for _ in 0..5_000 {
                    manager.spawn("refresh", async {});
                }
            })
        })
        .collect();
    for spawner in spawners {
        spawner.await.unwrap();
    }

    let drained = tokio::time::timeout(Duration::from_secs(5), async {
        while manager.tracked_task_count() > 0 {
            tokio::time::sleep(Duration::from_millis(1)).await;
        }
    })
    .await;
    assert!(drained.is_ok(), "{} handles left", manager.tracked_task_count());
    assert_eq!(manager.active_task_count(), 0);
}

#[tokio::test]
async fn test_cancelled_tasks_are_untracked() {
    let manager = OffloadManager::default();
    for _ in 0..3 {
        manager.spawn("refresh", std::future::pending::<()>());
    }
    assert_eq!(manager.tracked_task_count(), 3);

    manager.cancel_all();
    let drained = tokio::time::timeout(Duration::from_secs(5), async {
        while manager.tracked_task_count() > 0 {
            tokio::task::yield_now().await;
        }
    })
    .await;
    assert!(drained.is_ok());
}

#[test]
fn test_offload_outside_runtime_drops_task() {
    use stalebox::Offload;

    let manager = OffloadManager::default();
    let done = Arc::new(AtomicBool::new(false));
    let flag = Arc::clone(&done);
    Offload::spawn(&manager, "refresh", async move {
        flag.store(true, Ordering::SeqCst);
    });

    assert_eq!(manager.tracked_task_count(), 0);
    assert!(!done.load(Ordering::SeqCst));
}
