//! Sources with observable behavior for cache tests.

#![allow(dead_code)]

use std::collections::VecDeque;
use std::future::Ready;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use futures::FutureExt;
use futures::future::BoxFuture;
use parking_lot::Mutex;
use stalebox::Source;
use tokio::sync::Semaphore;

pub const STALENESS: Duration = Duration::from_millis(100);

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{0}")]
pub struct SourceError(pub &'static str);

/// Source replaying a fixed list of results, one per call.
#[derive(Clone)]
pub struct Scripted {
    calls: Arc<AtomicUsize>,
    script: Arc<Mutex<VecDeque<Result<u32, SourceError>>>>,
}

impl Scripted {
    pub fn new(script: impl IntoIterator<Item = Result<u32, SourceError>>) -> Self {
        Self {
            calls: Arc::new(AtomicUsize::new(0)),
            script: Arc::new(Mutex::new(script.into_iter().collect())),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl Source for Scripted {
    type Value = u32;
    type Error = SourceError;
    type Future = Ready<Result<u32, SourceError>>;

    fn load(&self) -> Self::Future {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let next = self
            .script
            .lock()
            .pop_front()
            .unwrap_or(Err(SourceError("script exhausted")));
        std::future::ready(next)
    }
}

/// Source returning its call number, blocking every call after the first
/// `free_calls` until the gate is opened.
#[derive(Clone)]
pub struct Gated {
    calls: Arc<AtomicUsize>,
    free_calls: usize,
    gate: Arc<Semaphore>,
}

impl Gated {
    pub fn new(free_calls: usize) -> Self {
        Self {
            calls: Arc::new(AtomicUsize::new(0)),
            free_calls,
            gate: Arc::new(Semaphore::new(0)),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn open(&self) {
        self.gate.add_permits(1024);
    }

    /// Waits until at least `calls` computations have started.
    pub async fn started(&self, calls: usize) {
        while self.calls() < calls {
            tokio::task::yield_now().await;
        }
    }
}

impl Source for Gated {
    type Value = usize;
    type Error = SourceError;
    type Future = BoxFuture<'static, Result<usize, SourceError>>;

    fn load(&self) -> Self::Future {
        let call = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
        let gate = (call > self.free_calls).then(|| Arc::clone(&self.gate));
        async move {
            if let Some(gate) = gate {
                let _permit = gate
                    .acquire_owned()
                    .await
                    .map_err(|_| SourceError("gate closed"))?;
            }
            Ok(call)
        }
        .boxed()
    }
}
