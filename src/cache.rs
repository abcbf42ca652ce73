//! Per-repository cache of rendered pages.
//!
//! Each repository owns one `TtlCache` holding at most one entry per
//! `CacheKind`. An entry is served while it is younger than the TTL; after
//! that the next request recomputes it while holding the repository's lock,
//! so concurrent requests for the same page wait for that one recompute
//! instead of spawning their own git processes. Different repositories never
//! share a lock.
//!
//! ```text
//! Empty --compute ok--> Populated --age >= ttl--> Stale --compute ok--> Populated
//!   ^                                               |
//!   +------------------ compute err ----------------+
//! ```
//!
//! A TTL of zero disables the cache: every call computes and nothing is
//! stored. Errors are never stored.

use std::collections::HashMap;
use std::future::Future;
use std::time::Duration;

use axum::body::Bytes;
use tokio::sync::Mutex;
use tokio::time::Instant;

use crate::error::{AppError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CacheKind {
    Log,
    Tree,
}

#[derive(Debug, Clone)]
pub struct CacheEntry {
    pub payload: Bytes,
    pub produced_at: Instant,
}

#[derive(Debug)]
pub struct TtlCache {
    ttl: Duration,
    /// Upper bound on waiting for another request's recompute.
    lock_timeout: Duration,
    entries: Mutex<HashMap<CacheKind, CacheEntry>>,
}

impl TtlCache {
    pub fn new(ttl: Duration, lock_timeout: Duration) -> Self {
        Self {
            ttl,
            lock_timeout,
            entries: Mutex::new(HashMap::new()),
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    pub fn is_enabled(&self) -> bool {
        !self.ttl.is_zero()
    }

    pub async fn get_or_compute<F, Fut>(&self, kind: CacheKind, compute: F) -> Result<Bytes>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<Bytes>>,
    {
        self.entry_or_compute(kind, compute)
            .await
            .map(|entry| entry.payload)
    }

    /// Like `get_or_compute` but also returns when the payload was produced.
    pub async fn entry_or_compute<F, Fut>(&self, kind: CacheKind, compute: F) -> Result<CacheEntry>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<Bytes>>,
    {
        if !self.is_enabled() {
            let payload = compute().await?;
            return Ok(CacheEntry {
                payload,
                produced_at: Instant::now(),
            });
        }

        let mut entries = tokio::time::timeout(self.lock_timeout, self.entries.lock())
            .await
            .map_err(|_| {
                tracing::warn!(
                    ?kind,
                    timeout = ?self.lock_timeout,
                    "gave up waiting for cache recompute"
                );
                AppError::Timeout(self.lock_timeout)
            })?;

        if let Some(entry) = entries.get(&kind) {
            if entry.produced_at.elapsed() < self.ttl {
                tracing::trace!(?kind, "cache hit");
                return Ok(entry.clone());
            }
        }
        entries.remove(&kind);

        let start = Instant::now();
        let payload = compute().await?;
        let entry = CacheEntry {
            payload,
            produced_at: Instant::now(),
        };
        entries.insert(kind, entry.clone());

        tracing::info!(
            ?kind,
            elapsed = ?start.elapsed(),
            bytes = entry.payload.len(),
            "cache recomputed"
        );
        Ok(entry)
    }

    /// Drop the entry for `kind`, if any.
    pub async fn invalidate(&self, kind: CacheKind) {
        self.entries.lock().await.remove(&kind);
    }

    pub async fn contains(&self, kind: CacheKind) -> bool {
        self.entries.lock().await.contains_key(&kind)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;

    const HOUR: Duration = Duration::from_secs(3600);

    fn counting(
        counter: &Arc<AtomicUsize>,
        body: &'static str,
    ) -> impl Future<Output = Result<Bytes>> {
        let counter = counter.clone();
        async move {
            counter.fetch_add(1, Ordering::SeqCst);
            Ok(Bytes::from_static(body.as_bytes()))
        }
    }

    #[tokio::test(start_paused = true)]
    async fn second_call_within_ttl_is_a_hit() {
        let cache = TtlCache::new(HOUR, HOUR);
        let calls = Arc::new(AtomicUsize::new(0));

        let first = cache
            .entry_or_compute(CacheKind::Log, || counting(&calls, "page"))
            .await
            .unwrap();
        tokio::time::advance(Duration::from_secs(60)).await;
        let second = cache
            .entry_or_compute(CacheKind::Log, || counting(&calls, "other"))
            .await
            .unwrap();

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(second.payload, first.payload);
        assert_eq!(second.produced_at, first.produced_at);
    }

    #[tokio::test(start_paused = true)]
    async fn expired_entry_is_recomputed() {
        let cache = TtlCache::new(Duration::from_secs(10), HOUR);
        let calls = Arc::new(AtomicUsize::new(0));

        let first = cache
            .entry_or_compute(CacheKind::Tree, || counting(&calls, "v1"))
            .await
            .unwrap();
        tokio::time::advance(Duration::from_secs(10)).await;
        let second = cache
            .entry_or_compute(CacheKind::Tree, || counting(&calls, "v2"))
            .await
            .unwrap();

        assert_eq!(calls.load(Ordering::SeqCst), 2);
        assert_eq!(second.payload, Bytes::from_static(b"v2"));
        assert!(second.produced_at > first.produced_at);
    }

    #[tokio::test(start_paused = true)]
    async fn failure_is_not_cached() {
        let cache = TtlCache::new(HOUR, HOUR);
        let calls = Arc::new(AtomicUsize::new(0));

        let err = cache
            .get_or_compute(CacheKind::Log, || async {
                Err::<Bytes, _>(AppError::Parse("boom".to_string()))
            })
            .await;
        assert!(err.is_err());
        assert!(!cache.contains(CacheKind::Log).await);

        let ok = cache
            .get_or_compute(CacheKind::Log, || counting(&calls, "fresh"))
            .await
            .unwrap();
        assert_eq!(ok, Bytes::from_static(b"fresh"));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn failed_recompute_evicts_stale_entry() {
        let cache = TtlCache::new(Duration::from_secs(1), HOUR);
        let calls = Arc::new(AtomicUsize::new(0));

        cache
            .get_or_compute(CacheKind::Log, || counting(&calls, "old"))
            .await
            .unwrap();
        tokio::time::advance(Duration::from_secs(2)).await;

        let result = cache
            .get_or_compute(CacheKind::Log, || async {
                Err::<Bytes, _>(AppError::Timeout(Duration::from_secs(2)))
            })
            .await;
        assert!(matches!(result, Err(AppError::Timeout(_))));
        assert!(!cache.contains(CacheKind::Log).await);
    }

    #[tokio::test(start_paused = true)]
    async fn zero_ttl_always_computes() {
        let cache = TtlCache::new(Duration::ZERO, HOUR);
        let calls = Arc::new(AtomicUsize::new(0));

        for _ in 0..3 {
            cache
                .get_or_compute(CacheKind::Log, || counting(&calls, "page"))
                .await
                .unwrap();
        }

        assert!(!cache.is_enabled());
        assert_eq!(calls.load(Ordering::SeqCst), 3);
        assert!(!cache.contains(CacheKind::Log).await);
    }

    #[tokio::test(start_paused = true)]
    async fn kinds_are_cached_separately() {
        let cache = TtlCache::new(HOUR, HOUR);
        let calls = Arc::new(AtomicUsize::new(0));

        let log = cache
            .get_or_compute(CacheKind::Log, || counting(&calls, "log"))
            .await
            .unwrap();
        let tree = cache
            .get_or_compute(CacheKind::Tree, || counting(&calls, "tree"))
            .await
            .unwrap();

        assert_eq!(log, Bytes::from_static(b"log"));
        assert_eq!(tree, Bytes::from_static(b"tree"));
        assert_eq!(calls.load(Ordering::SeqCst), 2);

        cache.invalidate(CacheKind::Log).await;
        assert!(!cache.contains(CacheKind::Log).await);
        assert!(cache.contains(CacheKind::Tree).await);
    }

    #[tokio::test(start_paused = true)]
    async fn concurrent_misses_compute_once() {
        let cache = Arc::new(TtlCache::new(HOUR, HOUR));
        let calls = Arc::new(AtomicUsize::new(0));

        let mut tasks = Vec::new();
        for _ in 0..4 {
            let cache = cache.clone();
            let calls = calls.clone();
            tasks.push(tokio::spawn(async move {
                cache
                    .get_or_compute(CacheKind::Log, || async move {
                        calls.fetch_add(1, Ordering::SeqCst);
                        tokio::time::sleep(Duration::from_millis(100)).await;
                        Ok::<_, AppError>(Bytes::from_static(b"slow"))
                    })
                    .await
            }));
        }

        for task in tasks {
            assert_eq!(task.await.unwrap().unwrap(), Bytes::from_static(b"slow"));
        }
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn waiting_for_a_slow_recompute_is_bounded() {
        let cache = Arc::new(TtlCache::new(HOUR, Duration::from_secs(2)));

        let slow = {
            let cache = cache.clone();
            tokio::spawn(async move {
                cache
                    .get_or_compute(CacheKind::Tree, || async {
                        tokio::time::sleep(Duration::from_secs(10)).await;
                        Ok::<_, AppError>(Bytes::from_static(b"late"))
                    })
                    .await
            })
        };
        // Let the first task take the lock.
        tokio::task::yield_now().await;
        tokio::time::sleep(Duration::from_millis(1)).await;

        let waiter = cache
            .get_or_compute(CacheKind::Tree, || async {
                Ok::<_, AppError>(Bytes::from_static(b"unused"))
            })
            .await;
        assert!(matches!(waiter, Err(AppError::Timeout(_))));

        assert_eq!(slow.await.unwrap().unwrap(), Bytes::from_static(b"late"));
    }
}
