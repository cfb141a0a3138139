/// Background thumbnail warm-up
///
/// Fetches thumbnails for a list of items in small concurrent batches with a
/// short pause between batches, inserting hits into a `ThumbnailCache`.
use std::future::Future;
use std::hash::Hash;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use bytes::Bytes;
use futures::future::join_all;
use serde::Serialize;
use tracing::debug;

use super::thumbnail::ThumbnailCache;

/// Outcome of one warming pass
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct WarmReport {
    pub requested: usize,
    pub cached: usize,
    pub failed: usize,
}

#[derive(Debug)]
pub struct ThumbnailWarmer {
    batch_size: usize,
    batch_delay: Duration,
    running: AtomicBool,
}

/// Clears the running flag when a pass ends, even on panic
struct RunningGuard<'a>(&'a AtomicBool);

impl Drop for RunningGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

impl ThumbnailWarmer {
    pub fn new(batch_size: usize, batch_delay: Duration) -> Self {
        Self {
            batch_size: batch_size.max(1),
            batch_delay,
            running: AtomicBool::new(false),
        }
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }

    /// Warm `cache` for every item not already cached
    ///
    /// Returns `None` without doing anything if another pass is running.
    /// Individual fetch failures (`None`) are counted and otherwise ignored.
    pub async fn warm<T, K, KF, F, Fut>(
        &self,
        items: &[T],
        cache: &ThumbnailCache<K>,
        key_of: KF,
        fetch: F,
    ) -> Option<WarmReport>
    where
        K: Eq + Hash + Clone + std::fmt::Debug,
        KF: Fn(&T) -> K,
        F: Fn(&T) -> Fut,
        Fut: Future<Output = Option<Bytes>>,
    {
        if self
            .running
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            debug!("Thumbnail warm already running, skipping");
            return None;
        }
        let _guard = RunningGuard(&self.running);

        let pending: Vec<&T> = items
            .iter()
            .filter(|&item| !cache.contains(&key_of(item)))
            .collect();
        let mut report = WarmReport {
            requested: pending.len(),
            ..WarmReport::default()
        };

        let batches = pending.chunks(self.batch_size);
        let batch_count = batches.len();
        for (index, batch) in batches.enumerate() {
            let results = join_all(batch.iter().map(|&item| {
                let key = key_of(item);
                let fut = fetch(item);
                async move { (key, fut.await) }
            }))
            .await;

            for (key, result) in results {
                match result {
                    Some(bytes) => {
                        cache.put(key, bytes);
                        report.cached += 1;
                    }
                    None => report.failed += 1,
                }
            }

            if index + 1 < batch_count {
                tokio::time::sleep(self.batch_delay).await;
            }
        }

        debug!(
            requested = report.requested,
            cached = report.cached,
            failed = report.failed,
            "Thumbnail warm finished"
        );
        Some(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;
    use std::sync::Arc;

    const DAY: Duration = Duration::from_secs(86_400);

    #[tokio::test(start_paused = true)]
    async fn test_warms_in_batches_and_skips_failures() {
        let warmer = ThumbnailWarmer::new(10, Duration::from_millis(50));
        let cache = ThumbnailCache::new(100, DAY);
        let items: Vec<u32> = (0..25).collect();

        let report = warmer
            .warm(&items, &cache, |i| *i, |i| {
                let ok = i % 5 != 0;
                let value = *i as u8;
                async move { ok.then(|| Bytes::from(vec![value])) }
            })
            .await
            .unwrap();

        assert_eq!(report.requested, 25);
        assert_eq!(report.failed, 5);
        assert_eq!(report.cached, 20);
        assert_eq!(cache.len(), 20);
        assert!(!warmer.is_running());
    }

    #[tokio::test(start_paused = true)]
    async fn test_already_cached_items_are_not_fetched() {
        let warmer = ThumbnailWarmer::new(10, Duration::ZERO);
        let cache = ThumbnailCache::new(100, DAY);
        cache.put(1u32, vec![1u8]);
        let calls = AtomicUsize::new(0);

        let report = warmer
            .warm(&[1u32, 2], &cache, |i| *i, |_| {
                calls.fetch_add(1, Ordering::SeqCst);
                async { Some(Bytes::from_static(b"x")) }
            })
            .await
            .unwrap();

        assert_eq!(report.requested, 1);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_concurrent_warm_is_noop() {
        let warmer = Arc::new(ThumbnailWarmer::new(1, Duration::from_secs(1)));
        let cache = Arc::new(ThumbnailCache::new(100, DAY));

        let first = {
            let warmer = Arc::clone(&warmer);
            let cache = Arc::clone(&cache);
            tokio::spawn(async move {
                warmer
                    .warm(&[1u32, 2, 3], &cache, |i| *i, |_| async {
                        Some(Bytes::from_static(b"x"))
                    })
                    .await
            })
        };

        // Let the first pass reach its inter-batch sleep
        tokio::task::yield_now().await;
        assert!(warmer.is_running());

        let second = warmer
            .warm(&[9u32], &cache, |i| *i, |_| async { Some(Bytes::from_static(b"y")) })
            .await;
        assert!(second.is_none());
        assert!(!cache.contains(&9));

        let report = first.await.unwrap().unwrap();
        assert_eq!(report.cached, 3);
        assert!(!warmer.is_running());
    }
}
