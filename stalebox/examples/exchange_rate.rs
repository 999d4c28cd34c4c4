//! Serving an exchange rate from a slow, flaky upstream.
//!
//! Run with `cargo run --example exchange_rate`.

use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::{Duration, Instant};

use stalebox::offload::OffloadManager;
use stalebox::{CacheStatus, TimedCache};

const STALENESS: Duration = Duration::from_millis(300);
const UPSTREAM_LATENCY: Duration = Duration::from_millis(200);

#[derive(Debug, thiserror::Error)]
#[error("rate service unavailable")]
struct Unavailable;

#[tokio::main]
async fn main() -> Result<(), stalebox::CacheError> {
    let requests = Arc::new(AtomicU32::new(0));
    let counter = Arc::clone(&requests);
    let offload = OffloadManager::default();

    let rates = TimedCache::builder(move || {
        let request = counter.fetch_add(1, Ordering::SeqCst);
        async move {
            tokio::time::sleep(UPSTREAM_LATENCY).await;
            // Every third request fails.
            if request % 3 == 2 {
                return Err(Unavailable);
            }
            Ok(1.08 + f64::from(request) / 100.0)
        }
    })
    .offload(offload.clone())
    .staleness(STALENESS)
    .build();

    for round in 0..12 {
        let started = Instant::now();
        let (rate, status) = rates.get_with_status().await?;
        println!(
            "round {round:>2}: rate {rate:.4} ({status}, {:?}, refreshing: {})",
            started.elapsed(),
            rates.is_refreshing()
        );
        if status == CacheStatus::Miss {
            println!("          first read waited for the upstream");
        }
        tokio::time::sleep(Duration::from_millis(100)).await;
    }

    offload.wait_all().await;
    println!(
        "upstream requests: {}, final rate: {:?}",
        requests.load(Ordering::SeqCst),
        rates.peek()
    );
    Ok(())
}
