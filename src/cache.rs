//! Short-lived memoization of backend reads.
//!
//! Callers asking for the same key while a fetch is in flight, or within the
//! TTL after it resolved, share that one fetch. Entries expire `ttl` after
//! resolution whether the fetch succeeded or failed. Expiry is checked on
//! access against the tokio clock, so no background timers are involved.

use std::collections::HashMap;
use std::future::Future;
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use futures::future::{BoxFuture, FutureExt, Shared};
use tokio::time::Instant;

use crate::error::ApiError;

pub const MEMO_TTL: Duration = Duration::from_secs(5);

type Resolved<T> = (Result<T, ApiError>, Instant);
type Pending<T> = Shared<BoxFuture<'static, Resolved<T>>>;

pub struct MemoCache<T> {
    ttl: Duration,
    entries: Mutex<HashMap<String, Pending<T>>>,
}

impl<T> MemoCache<T>
where
    T: Clone + Send + Sync + 'static,
{
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            entries: Mutex::new(HashMap::new()),
        }
    }

    /// Return the memoized result for `key`, running `fetch` only when no
    /// live entry exists.
    pub async fn get_or_fetch<F, Fut>(&self, key: &str, fetch: F) -> Result<T, ApiError>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, ApiError>> + Send + 'static,
    {
        let pending = {
            let mut entries = self.lock();
            Self::evict_expired(&mut entries, self.ttl);

            match entries.get(key) {
                Some(pending) => {
                    tracing::debug!(key, "memo hit");
                    pending.clone()
                }
                None => {
                    tracing::debug!(key, "memo miss");
                    let fut = fetch();
                    let pending = async move {
                        let result = fut.await;
                        (result, Instant::now())
                    }
                    .boxed()
                    .shared();
                    entries.insert(key.to_string(), pending.clone());
                    pending
                }
            }
        };

        pending.await.0
    }

    /// Drop every entry whose TTL has run out.
    pub fn purge_expired(&self) {
        let mut entries = self.lock();
        Self::evict_expired(&mut entries, self.ttl);
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    fn evict_expired(entries: &mut HashMap<String, Pending<T>>, ttl: Duration) {
        entries.retain(|key, pending| {
            let expired = pending
                .peek()
                .map(|(_, resolved_at)| resolved_at.elapsed() >= ttl)
                .unwrap_or(false);
            if expired {
                tracing::trace!(key = key.as_str(), "memo entry expired");
            }
            !expired
        });
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, Pending<T>>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl<T> Default for MemoCache<T>
where
    T: Clone + Send + Sync + 'static,
{
    fn default() -> Self {
        Self::new(MEMO_TTL)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    use super::*;

    fn counting_fetch(
        calls: &Arc<AtomicUsize>,
        result: Result<u32, ApiError>,
    ) -> impl FnOnce() -> BoxFuture<'static, Result<u32, ApiError>> {
        let calls = Arc::clone(calls);
        move || {
            async move {
                calls.fetch_add(1, Ordering::SeqCst);
                tokio::time::sleep(Duration::from_millis(100)).await;
                result
            }
            .boxed()
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_concurrent_calls_share_one_fetch() {
        let cache = MemoCache::<u32>::default();
        let calls = Arc::new(AtomicUsize::new(0));

        let (a, b) = tokio::join!(
            cache.get_or_fetch("stats", counting_fetch(&calls, Ok(7))),
            cache.get_or_fetch("stats", counting_fetch(&calls, Ok(8))),
        );

        assert_eq!(a, Ok(7));
        assert_eq!(b, Ok(7));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_repeat_within_window_is_memoized() {
        let cache = MemoCache::<u32>::default();
        let calls = Arc::new(AtomicUsize::new(0));

        assert_eq!(cache.get_or_fetch("stats", counting_fetch(&calls, Ok(1))).await, Ok(1));
        tokio::time::advance(Duration::from_secs(4)).await;
        assert_eq!(cache.get_or_fetch("stats", counting_fetch(&calls, Ok(2))).await, Ok(1));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_entry_expires_after_ttl() {
        let cache = MemoCache::<u32>::default();
        let calls = Arc::new(AtomicUsize::new(0));

        cache.get_or_fetch("stats", counting_fetch(&calls, Ok(1))).await.unwrap();
        tokio::time::advance(MEMO_TTL).await;
        assert_eq!(cache.get_or_fetch("stats", counting_fetch(&calls, Ok(2))).await, Ok(2));
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_failures_are_memoized_then_evicted() {
        let cache = MemoCache::<u32>::default();
        let calls = Arc::new(AtomicUsize::new(0));

        let first = cache
            .get_or_fetch("chart:7", counting_fetch(&calls, Err(ApiError::Server)))
            .await;
        let second = cache
            .get_or_fetch("chart:7", counting_fetch(&calls, Ok(3)))
            .await;
        assert_eq!(first, Err(ApiError::Server));
        assert_eq!(second, Err(ApiError::Server));
        assert_eq!(calls.load(Ordering::SeqCst), 1);

        tokio::time::advance(MEMO_TTL).await;
        cache.purge_expired();
        assert_eq!(cache.len(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_keys_are_independent() {
        let cache = MemoCache::<u32>::default();
        let calls = Arc::new(AtomicUsize::new(0));

        cache.get_or_fetch("chart:7", counting_fetch(&calls, Ok(7))).await.unwrap();
        let thirty = cache
            .get_or_fetch("chart:30", counting_fetch(&calls, Ok(30)))
            .await;
        assert_eq!(thirty, Ok(30));
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }
}
