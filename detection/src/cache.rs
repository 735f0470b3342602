use crate::model::GenericError;
use std::collections::HashMap;
use std::future::Future;
use std::hash::Hash;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::{Mutex, OnceCell};

struct Entry<V> {
    cell: Arc<OnceCell<V>>,
    inserted_at: Instant,
}

/// TTL cache with at-most-one-in-flight computation per key.
///
/// Concurrent callers that miss on the same key collapse onto a single
/// underlying computation and all receive the completed value. A failed
/// computation leaves the slot empty so the next caller retries.
pub struct TtlCache<K, V> {
    ttl: Duration,
    entries: Mutex<HashMap<K, Entry<V>>>,
}

impl<K, V> TtlCache<K, V>
where
    K: Eq + Hash + Clone,
    V: Clone,
{
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            entries: Mutex::new(HashMap::new()),
        }
    }

    pub async fn get_or_compute<F, Fut>(&self, key: K, compute: F) -> Result<V, GenericError>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<V, GenericError>>,
    {
        let cell = {
            let mut entries = self.entries.lock().await;
            match entries.get(&key) {
                Some(entry) if entry.inserted_at.elapsed() < self.ttl => Arc::clone(&entry.cell),
                _ => {
                    let entry = Entry {
                        cell: Arc::new(OnceCell::new()),
                        inserted_at: Instant::now(),
                    };
                    let cell = Arc::clone(&entry.cell);
                    entries.insert(key, entry);
                    cell
                }
            }
        };

        let value = cell.get_or_try_init(compute).await?;
        Ok(value.clone())
    }

    /// Drop every cached entry. Mainly useful for admin refresh paths and
    /// tests.
    pub async fn clear(&self) {
        self.entries.lock().await.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[tokio::test]
    async fn caches_value_within_ttl() {
        let cache: TtlCache<&str, u32> = TtlCache::new(Duration::from_secs(60));
        let computations = AtomicUsize::new(0);

        for _ in 0..3 {
            let value = cache
                .get_or_compute("key", || async {
                    computations.fetch_add(1, Ordering::SeqCst);
                    Ok(42)
                })
                .await
                .unwrap();
            assert_eq!(value, 42);
        }
        assert_eq!(computations.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn expired_entry_recomputes() {
        let cache: TtlCache<&str, u32> = TtlCache::new(Duration::from_millis(10));
        let computations = AtomicUsize::new(0);

        let compute = || async {
            computations.fetch_add(1, Ordering::SeqCst);
            Ok(1u32)
        };
        cache.get_or_compute("key", compute).await.unwrap();
        tokio::time::sleep(Duration::from_millis(20)).await;
        cache
            .get_or_compute("key", || async {
                computations.fetch_add(1, Ordering::SeqCst);
                Ok(2u32)
            })
            .await
            .unwrap();
        assert_eq!(computations.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn concurrent_misses_collapse_to_one_computation() {
        let cache: Arc<TtlCache<&'static str, u32>> =
            Arc::new(TtlCache::new(Duration::from_secs(60)));
        let computations = Arc::new(AtomicUsize::new(0));

        let mut handles = Vec::new();
        for _ in 0..8 {
            let cache = Arc::clone(&cache);
            let computations = Arc::clone(&computations);
            handles.push(tokio::spawn(async move {
                cache
                    .get_or_compute("shared", || async move {
                        computations.fetch_add(1, Ordering::SeqCst);
                        tokio::time::sleep(Duration::from_millis(25)).await;
                        Ok(7u32)
                    })
                    .await
                    .unwrap()
            }));
        }
        for handle in handles {
            assert_eq!(handle.await.unwrap(), 7);
        }
        assert_eq!(computations.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn failed_computation_is_retried() {
        let cache: TtlCache<&str, u32> = TtlCache::new(Duration::from_secs(60));

        let error: Result<u32, GenericError> = cache
            .get_or_compute("key", || async { Err("boom".into()) })
            .await;
        assert!(error.is_err());

        let value = cache
            .get_or_compute("key", || async { Ok(9) })
            .await
            .unwrap();
        assert_eq!(value, 9);
    }
}
