/// Prefetch cache.
///
/// Deduplicates prefetches and owns the hint registry. A URL is in the
/// registry exactly while its hint is attached; the hint is released when the
/// fetch resolves or when the hint timeout expires, whichever comes first.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use tracing::{debug, trace};

use crate::error::PrefetchError;
use crate::loading::ImageLoader;

/// Default lifetime of a hint
pub const DEFAULT_HINT_TIMEOUT: Duration = Duration::from_secs(30);

/// Where prefetch hints are attached while a fetch is outstanding.
///
/// `attach` and `detach` are called under the cache lock and must not block.
pub trait HintSink: Send + Sync {
    fn attach(&self, url: &str);
    fn detach(&self, url: &str);
}

/// Hint sink for hosts without a hint mechanism; records hints in the log only
#[derive(Debug, Clone, Copy, Default)]
pub struct LogHints;

impl HintSink for LogHints {
    fn attach(&self, url: &str) {
        trace!(url, "Hint attached");
    }

    fn detach(&self, url: &str) {
        trace!(url, "Hint released");
    }
}

/// Result of a single prefetch request that did not fail
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PrefetchOutcome {
    /// The fetch ran and succeeded
    Fetched,
    /// Already completed earlier; nothing was inserted
    AlreadyCached,
    /// Another request for the same URL is in flight
    AlreadyPending,
}

#[derive(Default)]
struct CacheState {
    completed: HashSet<String>,
    /// Attached hints, keyed by URL, tagged with the generation that attached them
    registry: HashMap<String, u64>,
    /// Bumped by `clear`, so late completions from before a teardown are dropped
    generation: u64,
}

/// Instance-scoped prefetch cache, shared by reference with the scheduler
pub struct PrefetchCache {
    state: Mutex<CacheState>,
    loader: Arc<dyn ImageLoader>,
    hints: Arc<dyn HintSink>,
    hint_timeout: Duration,
}

impl PrefetchCache {
    pub fn new(loader: Arc<dyn ImageLoader>, hints: Arc<dyn HintSink>) -> Self {
        Self {
            state: Mutex::new(CacheState::default()),
            loader,
            hints,
            hint_timeout: DEFAULT_HINT_TIMEOUT,
        }
    }

    pub fn with_hint_timeout(mut self, timeout: Duration) -> Self {
        self.hint_timeout = timeout;
        self
    }

    fn lock(&self) -> MutexGuard<'_, CacheState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Check if a URL has completed prefetching
    pub fn is_cached(&self, url: &str) -> bool {
        self.lock().completed.contains(url)
    }

    /// Number of hints currently attached (equal to prefetches in flight)
    pub fn hint_count(&self) -> usize {
        self.lock().registry.len()
    }

    pub fn completed_count(&self) -> usize {
        self.lock().completed.len()
    }

    /// Prefetch one URL.
    ///
    /// Completed URLs are never refetched and in-flight URLs are not
    /// scheduled twice.
    pub async fn prefetch(&self, url: &str) -> Result<PrefetchOutcome, PrefetchError> {
        let generation = {
            let mut state = self.lock();
            if state.completed.contains(url) {
                return Ok(PrefetchOutcome::AlreadyCached);
            }
            if state.registry.contains_key(url) {
                return Ok(PrefetchOutcome::AlreadyPending);
            }
            let generation = state.generation;
            state.registry.insert(url.to_string(), generation);
            self.hints.attach(url);
            generation
        };

        let result = tokio::time::timeout(self.hint_timeout, self.loader.load(url)).await;

        let mut state = self.lock();
        if state.registry.get(url) == Some(&generation) {
            state.registry.remove(url);
            self.hints.detach(url);
        }

        match result {
            Ok(Ok(_)) => {
                if state.generation == generation {
                    state.completed.insert(url.to_string());
                }
                debug!(url, "Prefetched");
                Ok(PrefetchOutcome::Fetched)
            }
            Ok(Err(source)) => Err(PrefetchError::Fetch {
                url: url.to_string(),
                source,
            }),
            Err(_) => Err(PrefetchError::TimedOut {
                url: url.to_string(),
                timeout_ms: self.hint_timeout.as_millis() as u64,
            }),
        }
    }

    /// Clear all prefetch state and release every attached hint
    pub fn clear(&self) {
        let mut state = self.lock();
        state.generation += 1;
        state.completed.clear();
        for (url, _) in state.registry.drain() {
            self.hints.detach(&url);
        }
        debug!("Prefetch cache cleared");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::loading::testing::ScriptedLoader;
    use crate::loading::{TierCache, UrlBuilder};

    /// Sink that tracks which hints are attached right now
    #[derive(Default)]
    struct RecordingHints {
        attached: Mutex<HashSet<String>>,
        detached: Mutex<Vec<String>>,
    }

    impl HintSink for RecordingHints {
        fn attach(&self, url: &str) {
            assert!(self.attached.lock().unwrap().insert(url.to_string()));
        }

        fn detach(&self, url: &str) {
            assert!(self.attached.lock().unwrap().remove(url));
            self.detached.lock().unwrap().push(url.to_string());
        }
    }

    fn cache(loader: Arc<ScriptedLoader>, hints: Arc<RecordingHints>) -> PrefetchCache {
        PrefetchCache::new(loader, hints)
    }

    #[tokio::test]
    async fn test_completed_url_not_refetched() {
        let loader = Arc::new(ScriptedLoader::new());
        let hints = Arc::new(RecordingHints::default());
        let cache = cache(loader.clone(), hints.clone());

        assert_eq!(cache.prefetch("a.jpg").await, Ok(PrefetchOutcome::Fetched));
        assert_eq!(cache.prefetch("a.jpg").await, Ok(PrefetchOutcome::AlreadyCached));
        assert!(cache.is_cached("a.jpg"));
        assert_eq!(loader.calls(), vec!["a.jpg"]);
        assert_eq!(cache.hint_count(), 0);
        assert!(hints.attached.lock().unwrap().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_pending_url_not_double_scheduled() {
        let loader = Arc::new(ScriptedLoader::new().with_delay(Duration::from_millis(500)));
        let hints = Arc::new(RecordingHints::default());
        let cache = cache(loader.clone(), hints.clone());

        let (first, second) = tokio::join!(cache.prefetch("a.jpg"), cache.prefetch("a.jpg"));
        assert_eq!(first, Ok(PrefetchOutcome::Fetched));
        assert_eq!(second, Ok(PrefetchOutcome::AlreadyPending));
        assert_eq!(loader.calls().len(), 1);
    }

    #[tokio::test]
    async fn test_failure_releases_hint_and_is_not_cached() {
        let loader = Arc::new(ScriptedLoader::new().failing("bad.jpg"));
        let hints = Arc::new(RecordingHints::default());
        let cache = cache(loader.clone(), hints.clone());

        let result = cache.prefetch("bad.jpg").await;
        assert!(matches!(result, Err(PrefetchError::Fetch { .. })));
        assert!(!cache.is_cached("bad.jpg"));
        assert_eq!(cache.hint_count(), 0);
        assert_eq!(*hints.detached.lock().unwrap(), vec!["bad.jpg".to_string()]);

        // A failed URL may be retried
        let _ = cache.prefetch("bad.jpg").await;
        assert_eq!(loader.calls().len(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_hint_released_after_timeout() {
        let loader = Arc::new(ScriptedLoader::new().with_delay(Duration::from_secs(60)));
        let hints = Arc::new(RecordingHints::default());
        let cache = cache(loader, hints.clone()).with_hint_timeout(Duration::from_secs(30));

        let result = cache.prefetch("slow.jpg").await;
        assert_eq!(
            result,
            Err(PrefetchError::TimedOut {
                url: "slow.jpg".to_string(),
                timeout_ms: 30_000
            })
        );
        assert_eq!(cache.hint_count(), 0);
        assert!(hints.attached.lock().unwrap().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_clear_releases_hints_and_drops_late_completion() {
        let loader = Arc::new(ScriptedLoader::new().with_delay(Duration::from_millis(100)));
        let hints = Arc::new(RecordingHints::default());
        let cache = Arc::new(cache(loader, hints.clone()));

        assert_eq!(cache.prefetch("done.jpg").await, Ok(PrefetchOutcome::Fetched));

        let in_flight = {
            let cache = cache.clone();
            tokio::spawn(async move { cache.prefetch("late.jpg").await })
        };
        tokio::time::sleep(Duration::from_millis(10)).await;
        assert_eq!(cache.hint_count(), 1);

        cache.clear();
        assert_eq!(cache.hint_count(), 0);
        assert!(!cache.is_cached("done.jpg"));
        assert!(hints.attached.lock().unwrap().is_empty());

        assert_eq!(in_flight.await.unwrap(), Ok(PrefetchOutcome::Fetched));
        assert!(!cache.is_cached("late.jpg"));
        assert_eq!(cache.completed_count(), 0);
    }

    #[tokio::test]
    async fn test_prefetch_through_tiers_prepares_viewer_urls() {
        let source = tempfile::tempdir().unwrap();
        let tier_dir = tempfile::tempdir().unwrap();
        image::RgbImage::new(800, 600)
            .save(source.path().join("p.png"))
            .unwrap();

        let tiers = Arc::new(TierCache::new(source.path(), tier_dir.path()));
        let cache = PrefetchCache::new(tiers.clone(), Arc::new(LogHints));

        assert_eq!(cache.prefetch("p.png").await, Ok(PrefetchOutcome::Fetched));
        assert!(cache.is_cached("p.png"));

        let urls = tiers.stage_urls("p.png");
        assert!(urls.cdn_active);
        assert_eq!(tiers.ensure_tiers("p.png".to_string()).await.unwrap(), urls);
        let high = tiers.tier_path("p.png", crate::loading::Profile::HighQuality);
        assert_eq!(high.to_string_lossy(), urls.high);
    }
}
