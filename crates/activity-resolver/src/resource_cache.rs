//! Lazy-loading cache for one external resource type.
//!
//! Each key owns a slot holding `Option<V>`: `Some` is a resolved resource,
//! `None` is a confirmed absence. A key with no settled slot has never been
//! looked up successfully. Fetches are single-flight per key: concurrent
//! callers for the same key wait on one fetch, callers for other keys do not
//! wait at all. A failed fetch settles nothing: callers already waiting on the
//! slot retry the fetch in turn, and the last one out removes the empty slot.

use parking_lot::Mutex;
use std::collections::HashMap;
use std::fmt;
use std::future::Future;
use std::hash::Hash;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::OnceCell;

/// Failure from [`ResourceCache::get_or_fetch`].
#[derive(Debug, Error)]
pub enum CacheError<E> {
    #[error("{cache} has no resource for {key}")]
    Absent { cache: &'static str, key: String },

    #[error(transparent)]
    Fetch(E),
}

type Slot<V> = Arc<OnceCell<Option<V>>>;

pub struct ResourceCache<K, V> {
    name: &'static str,
    slots: Mutex<HashMap<K, Slot<V>>>,
}

impl<K, V> ResourceCache<K, V>
where
    K: Eq + Hash + Clone + fmt::Display,
    V: Clone,
{
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            slots: Mutex::new(HashMap::new()),
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    fn slot(&self, key: &K) -> Slot<V> {
        let mut slots = self.slots.lock();
        slots.entry(key.clone()).or_default().clone()
    }

    /// Drop `slot` after a failed fetch if it is still empty and nobody else holds it.
    ///
    /// Clones are only handed out under the map lock, so the strong count
    /// cannot grow while it is held.
    fn discard_unsettled(&self, key: &K, slot: &Slot<V>) {
        let mut slots = self.slots.lock();
        let unused = slots.get(key).is_some_and(|current| {
            Arc::ptr_eq(current, slot) && !current.initialized() && Arc::strong_count(current) == 2
        });
        if unused {
            slots.remove(key);
        }
    }

    /// Cached resource or confirmed absence; otherwise runs `fetch` once for
    /// this key and remembers a successful outcome.
    ///
    /// `fetch` returns `Ok(None)` when the resource does not exist.
    ///
    /// # Errors
    /// Propagates the error from `fetch`. Errors are not cached.
    pub async fn get_or_fetch_or_none<F, Fut, E>(&self, key: &K, fetch: F) -> Result<Option<V>, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<Option<V>, E>>,
    {
        let slot = self.slot(key);

        let result = slot
            .get_or_try_init(|| async {
                tracing::debug!(cache = self.name, key = %key, "Cache miss, fetching");
                let fetched = fetch().await?;
                if fetched.is_none() {
                    tracing::debug!(cache = self.name, key = %key, "Caching confirmed absence");
                }
                Ok::<_, E>(fetched)
            })
            .await
            .cloned();

        if result.is_err() {
            self.discard_unsettled(key, &slot);
        }
        result
    }

    /// Like [`ResourceCache::get_or_fetch_or_none`] but a missing resource is an error.
    ///
    /// # Errors
    /// `CacheError::Absent` if the resource does not exist (cached),
    /// `CacheError::Fetch` if the fetch failed (not cached).
    pub async fn get_or_fetch<F, Fut, E>(&self, key: &K, fetch: F) -> Result<V, CacheError<E>>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<Option<V>, E>>,
    {
        match self
            .get_or_fetch_or_none(key, fetch)
            .await
            .map_err(CacheError::Fetch)?
        {
            Some(value) => Ok(value),
            None => Err(CacheError::Absent {
                cache: self.name,
                key: key.to_string(),
            }),
        }
    }

    /// Peek without fetching: `None` if never resolved, `Some(None)` if confirmed absent.
    pub fn cached(&self, key: &K) -> Option<Option<V>> {
        let slots = self.slots.lock();
        slots.get(key).and_then(|slot| slot.get().cloned())
    }

    /// Number of settled keys, absences included.
    pub fn len(&self) -> usize {
        let slots = self.slots.lock();
        slots.values().filter(|slot| slot.initialized()).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;
    use tokio::sync::Notify;

    fn key(s: &str) -> String {
        s.to_string()
    }

    #[tokio::test]
    async fn test_fetches_once_then_serves_cached() {
        let cache = ResourceCache::<String, u32>::new("numbers");
        let calls = AtomicUsize::new(0);

        for _ in 0..3 {
            let value = cache
                .get_or_fetch(&key("a"), || async {
                    calls.fetch_add(1, Ordering::SeqCst);
                    Ok::<_, String>(Some(7))
                })
                .await
                .unwrap();
            assert_eq!(value, 7);
        }

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(cache.cached(&key("a")), Some(Some(7)));
        assert_eq!(cache.len(), 1);
    }

    #[tokio::test]
    async fn test_confirmed_absence_is_memoized() {
        let cache = ResourceCache::<String, u32>::new("numbers");
        let calls = AtomicUsize::new(0);

        for _ in 0..3 {
            let value = cache
                .get_or_fetch_or_none(&key("missing"), || async {
                    calls.fetch_add(1, Ordering::SeqCst);
                    Ok::<_, String>(None)
                })
                .await
                .unwrap();
            assert_eq!(value, None);
        }

        let err = cache
            .get_or_fetch(&key("missing"), || async {
                calls.fetch_add(1, Ordering::SeqCst);
                Ok::<_, String>(Some(1))
            })
            .await
            .unwrap_err();

        assert!(matches!(err, CacheError::Absent { cache: "numbers", .. }));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(cache.cached(&key("missing")), Some(None));
    }

    #[tokio::test]
    async fn test_transient_failure_is_not_memoized() {
        let cache = ResourceCache::<String, u32>::new("numbers");
        let calls = AtomicUsize::new(0);

        let err = cache
            .get_or_fetch_or_none(&key("flaky"), || async {
                calls.fetch_add(1, Ordering::SeqCst);
                Err::<Option<u32>, _>("timeout".to_string())
            })
            .await
            .unwrap_err();
        assert_eq!(err, "timeout");
        assert_eq!(cache.cached(&key("flaky")), None);
        assert!(cache.is_empty());

        let value = cache
            .get_or_fetch_or_none(&key("flaky"), || async {
                calls.fetch_add(1, Ordering::SeqCst);
                Ok::<_, String>(Some(3))
            })
            .await
            .unwrap();

        assert_eq!(value, Some(3));
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_failed_fetch_leaves_no_slot_behind() {
        let cache = ResourceCache::<String, u32>::new("numbers");

        for i in 0..5 {
            let result = cache
                .get_or_fetch_or_none(&format!("down-{}", i), || async {
                    Err::<Option<u32>, _>("503".to_string())
                })
                .await;
            assert!(result.is_err());
        }

        assert!(cache.slots.lock().is_empty());
        assert!(cache.is_empty());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_waiters_retry_after_failed_fetch_then_settle() {
        let cache = Arc::new(ResourceCache::<String, u32>::new("numbers"));
        let calls = Arc::new(AtomicUsize::new(0));

        let mut handles = Vec::new();
        for _ in 0..8 {
            let cache = Arc::clone(&cache);
            let calls = Arc::clone(&calls);
            handles.push(tokio::spawn(async move {
                cache
                    .get_or_fetch_or_none(&key("flaky"), || async {
                        let attempt = calls.fetch_add(1, Ordering::SeqCst);
                        tokio::time::sleep(Duration::from_millis(30)).await;
                        if attempt == 0 {
                            Err("timeout".to_string())
                        } else {
                            Ok(Some(5))
                        }
                    })
                    .await
            }));
        }

        let mut failures = 0;
        for handle in handles {
            match handle.await.unwrap() {
                Ok(value) => assert_eq!(value, Some(5)),
                Err(_) => failures += 1,
            }
        }

        assert_eq!(failures, 1);
        assert_eq!(calls.load(Ordering::SeqCst), 2);
        assert_eq!(cache.cached(&key("flaky")), Some(Some(5)));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_requests_coalesce() {
        let cache = Arc::new(ResourceCache::<String, u32>::new("numbers"));
        let calls = Arc::new(AtomicUsize::new(0));

        let mut handles = Vec::new();
        for _ in 0..16 {
            let cache = Arc::clone(&cache);
            let calls = Arc::clone(&calls);
            handles.push(tokio::spawn(async move {
                cache
                    .get_or_fetch_or_none(&key("shared"), || async {
                        calls.fetch_add(1, Ordering::SeqCst);
                        tokio::time::sleep(Duration::from_millis(50)).await;
                        Ok::<_, String>(Some(42))
                    })
                    .await
            }));
        }

        for handle in handles {
            assert_eq!(handle.await.unwrap().unwrap(), Some(42));
        }
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_absence_coalesces() {
        let cache = Arc::new(ResourceCache::<String, u32>::new("numbers"));
        let calls = Arc::new(AtomicUsize::new(0));

        let mut handles = Vec::new();
        for _ in 0..8 {
            let cache = Arc::clone(&cache);
            let calls = Arc::clone(&calls);
            handles.push(tokio::spawn(async move {
                cache
                    .get_or_fetch_or_none(&key("gone"), || async {
                        calls.fetch_add(1, Ordering::SeqCst);
                        tokio::time::sleep(Duration::from_millis(50)).await;
                        Ok::<_, String>(None)
                    })
                    .await
            }));
        }

        for handle in handles {
            assert_eq!(handle.await.unwrap().unwrap(), None);
        }
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_stalled_key_does_not_block_other_keys() {
        let cache = Arc::new(ResourceCache::<String, u32>::new("numbers"));
        let release = Arc::new(Notify::new());

        let slow = {
            let cache = Arc::clone(&cache);
            let release = Arc::clone(&release);
            tokio::spawn(async move {
                cache
                    .get_or_fetch_or_none(&key("slow"), || async {
                        release.notified().await;
                        Ok::<_, String>(Some(1))
                    })
                    .await
            })
        };

        tokio::time::sleep(Duration::from_millis(20)).await;

        let fast = tokio::time::timeout(
            Duration::from_secs(1),
            cache.get_or_fetch_or_none(&key("fast"), || async { Ok::<_, String>(Some(2)) }),
        )
        .await
        .expect("unrelated key must not wait on the stalled fetch")
        .unwrap();
        assert_eq!(fast, Some(2));
        assert!(!slow.is_finished());

        release.notify_one();
        assert_eq!(slow.await.unwrap().unwrap(), Some(1));
    }
}
