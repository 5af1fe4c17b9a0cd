/// Progressive image loading.
///
/// A [`ProgressiveLoad`] walks one image through placeholder, low quality and
/// high quality stages and yields a [`StageRecord`] per transition as a lazy
/// stream. Records are strictly sequential: the next load only starts after
/// the previous one resolved. A failed load ends the stream with an error
/// record that points back at the placeholder.

use futures::stream::{self, Stream};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

use super::loader::ImageLoader;
use super::tiers::StageUrls;

/// Default time the low quality stage stays on screen before the high load
pub const DEFAULT_DWELL: Duration = Duration::from_millis(100);

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Stage {
    Placeholder,
    LowQuality,
    HighQuality,
    Error,
}

impl Stage {
    /// Loading progress shown for this stage, `None` for error (keep the last value)
    pub fn progress(self) -> Option<u8> {
        match self {
            Stage::Placeholder => Some(10),
            Stage::LowQuality => Some(50),
            Stage::HighQuality => Some(100),
            Stage::Error => None,
        }
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, Stage::HighQuality | Stage::Error)
    }
}

/// One observed stage of a single image
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StageRecord {
    pub stage: Stage,
    /// URL active at this stage
    pub src: String,
    /// Whether this stage's asset finished loading
    pub loaded: bool,
}

impl StageRecord {
    fn loaded(stage: Stage, src: &str) -> Self {
        Self {
            stage,
            src: src.to_string(),
            loaded: true,
        }
    }

    fn error(placeholder: &str) -> Self {
        Self {
            stage: Stage::Error,
            src: placeholder.to_string(),
            loaded: false,
        }
    }
}

/// Liveness flag shared between a load and its consumer.
///
/// Once torn down, the load emits nothing more. Loads already in flight
/// keep running; their results are dropped.
#[derive(Debug, Clone)]
pub struct Liveness(Arc<AtomicBool>);

impl Liveness {
    pub fn new() -> Self {
        Self(Arc::new(AtomicBool::new(true)))
    }

    pub fn is_alive(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }

    pub fn teardown(&self) {
        self.0.store(false, Ordering::Release);
    }
}

impl Default for Liveness {
    fn default() -> Self {
        Self::new()
    }
}

/// Progressive load of a single image
pub struct ProgressiveLoad {
    urls: StageUrls,
    progressive: bool,
    dwell: Duration,
    loader: Arc<dyn ImageLoader>,
    liveness: Liveness,
}

enum Step {
    Start,
    Low,
    High,
    Done,
}

impl ProgressiveLoad {
    /// Progressive mode follows `urls.cdn_active` unless overridden
    pub fn new(urls: StageUrls, loader: Arc<dyn ImageLoader>) -> Self {
        let progressive = urls.cdn_active;
        Self {
            urls,
            progressive,
            dwell: DEFAULT_DWELL,
            loader,
            liveness: Liveness::new(),
        }
    }

    pub fn progressive(mut self, enabled: bool) -> Self {
        self.progressive = enabled;
        self
    }

    pub fn dwell(mut self, dwell: Duration) -> Self {
        self.dwell = dwell;
        self
    }

    /// Handle the consumer keeps to cancel this load
    pub fn liveness(&self) -> Liveness {
        self.liveness.clone()
    }

    /// Turn the load into its lazy stage sequence.
    /// Nothing is fetched until the stream is polled.
    pub fn into_stream(self) -> impl Stream<Item = StageRecord> + Send + 'static {
        let load = Arc::new(self);

        stream::unfold((Step::Start, load), |(step, load)| async move {
            let (record, next) = match step {
                Step::Done => return None,
                Step::Start if !load.progressive => {
                    let record = if load.fetch(&load.urls.high).await {
                        StageRecord::loaded(Stage::HighQuality, &load.urls.high)
                    } else {
                        StageRecord::error(&load.urls.placeholder)
                    };
                    (record, Step::Done)
                }
                // Placeholder is assumed resolvable, no network wait
                Step::Start => (
                    StageRecord::loaded(Stage::Placeholder, &load.urls.placeholder),
                    Step::Low,
                ),
                Step::Low => {
                    if load.fetch(&load.urls.low).await {
                        (StageRecord::loaded(Stage::LowQuality, &load.urls.low), Step::High)
                    } else {
                        (StageRecord::error(&load.urls.placeholder), Step::Done)
                    }
                }
                Step::High => {
                    tokio::time::sleep(load.dwell).await;
                    if !load.liveness.is_alive() {
                        return None;
                    }
                    if load.fetch(&load.urls.high).await {
                        (StageRecord::loaded(Stage::HighQuality, &load.urls.high), Step::Done)
                    } else {
                        (StageRecord::error(&load.urls.placeholder), Step::Done)
                    }
                }
            };

            if !load.liveness.is_alive() {
                debug!(src = %record.src, "Load torn down, dropping stage");
                return None;
            }
            Some((record, (next, load)))
        })
    }

    async fn fetch(&self, url: &str) -> bool {
        match self.loader.load(url).await {
            Ok(_) => true,
            Err(error) => {
                warn!(url, %error, "Progressive image loading failed");
                false
            }
        }
    }
}

/// Consumer-side view of a load: current record and progress.
///
/// Applies records in order and refuses to move backwards, so a stale record
/// arriving after a later stage is ignored.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadState {
    pub current: StageRecord,
    pub progress: u8,
}

impl LoadState {
    pub fn new(placeholder: &str) -> Self {
        Self {
            current: StageRecord {
                stage: Stage::Placeholder,
                src: placeholder.to_string(),
                loaded: false,
            },
            progress: 0,
        }
    }

    /// Apply a record; returns false if it was ignored
    pub fn apply(&mut self, record: StageRecord) -> bool {
        if self.current.stage.is_terminal() {
            return false;
        }
        if record.stage != Stage::Error && record.stage < self.current.stage {
            return false;
        }
        if let Some(progress) = record.stage.progress() {
            self.progress = progress;
        }
        self.current = record;
        true
    }

    pub fn is_loading(&self) -> bool {
        !self.current.stage.is_terminal()
    }

    pub fn is_error(&self) -> bool {
        self.current.stage == Stage::Error
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::loading::testing::ScriptedLoader;
    use futures::StreamExt;

    fn urls() -> StageUrls {
        StageUrls {
            placeholder: "p.jpg".to_string(),
            low: "low.jpg".to_string(),
            high: "high.jpg".to_string(),
            cdn_active: true,
        }
    }

    fn stages(records: &[StageRecord]) -> Vec<Stage> {
        records.iter().map(|r| r.stage).collect()
    }

    #[tokio::test(start_paused = true)]
    async fn test_progressive_all_succeed() {
        let loader = Arc::new(ScriptedLoader::new());
        let records: Vec<StageRecord> = ProgressiveLoad::new(urls(), loader.clone())
            .into_stream()
            .collect()
            .await;

        assert_eq!(
            stages(&records),
            vec![Stage::Placeholder, Stage::LowQuality, Stage::HighQuality]
        );
        assert_eq!(records[0].src, "p.jpg");
        assert_eq!(records[1].src, "low.jpg");
        assert_eq!(records[2].src, "high.jpg");
        assert!(records.iter().all(|r| r.loaded));
        assert_eq!(loader.calls(), vec!["low.jpg", "high.jpg"]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_low_failure_skips_high() {
        let loader = Arc::new(ScriptedLoader::new().failing("low.jpg"));
        let records: Vec<StageRecord> = ProgressiveLoad::new(urls(), loader.clone())
            .into_stream()
            .collect()
            .await;

        assert_eq!(stages(&records), vec![Stage::Placeholder, Stage::Error]);
        let last = records.last().unwrap();
        assert_eq!(last.src, "p.jpg");
        assert!(!last.loaded);
        assert_eq!(loader.calls(), vec!["low.jpg"]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_high_failure_is_error() {
        let loader = Arc::new(ScriptedLoader::new().failing("high.jpg"));
        let records: Vec<StageRecord> = ProgressiveLoad::new(urls(), loader)
            .into_stream()
            .collect()
            .await;

        assert_eq!(
            stages(&records),
            vec![Stage::Placeholder, Stage::LowQuality, Stage::Error]
        );
        assert_eq!(records[2].src, "p.jpg");
    }

    #[tokio::test]
    async fn test_direct_mode_single_load() {
        let loader = Arc::new(ScriptedLoader::new());
        let records: Vec<StageRecord> = ProgressiveLoad::new(urls(), loader.clone())
            .progressive(false)
            .into_stream()
            .collect()
            .await;

        assert_eq!(records, vec![StageRecord::loaded(Stage::HighQuality, "high.jpg")]);
        assert_eq!(loader.calls(), vec!["high.jpg"]);
    }

    #[tokio::test]
    async fn test_direct_mode_failure() {
        let loader = Arc::new(ScriptedLoader::new().failing("high.jpg"));
        let records: Vec<StageRecord> = ProgressiveLoad::new(urls(), loader.clone())
            .progressive(false)
            .into_stream()
            .collect()
            .await;

        assert_eq!(records, vec![StageRecord::error("p.jpg")]);
        assert_eq!(loader.calls(), vec!["high.jpg"]);
    }

    #[tokio::test]
    async fn test_direct_urls_disable_progressive() {
        let loader = Arc::new(ScriptedLoader::new());
        let records: Vec<StageRecord> =
            ProgressiveLoad::new(StageUrls::direct("only.jpg"), loader.clone())
                .into_stream()
                .collect()
                .await;

        assert_eq!(stages(&records), vec![Stage::HighQuality]);
        assert_eq!(loader.calls(), vec!["only.jpg"]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_dwell_between_low_and_high() {
        let loader = Arc::new(ScriptedLoader::new());
        let started = tokio::time::Instant::now();
        let mut stream = Box::pin(
            ProgressiveLoad::new(urls(), loader)
                .dwell(Duration::from_millis(250))
                .into_stream(),
        );

        stream.next().await;
        stream.next().await;
        let low_at = started.elapsed();
        stream.next().await;
        assert!(started.elapsed() - low_at >= Duration::from_millis(250));
    }

    #[tokio::test(start_paused = true)]
    async fn test_teardown_stops_emission() {
        let loader = Arc::new(ScriptedLoader::new());
        let load = ProgressiveLoad::new(urls(), loader.clone());
        let liveness = load.liveness();
        let mut stream = Box::pin(load.into_stream());

        assert_eq!(stream.next().await.map(|r| r.stage), Some(Stage::Placeholder));
        liveness.teardown();
        assert_eq!(stream.next().await, None);
        // The low load was already in flight and is not aborted
        assert_eq!(loader.calls(), vec!["low.jpg"]);
    }

    #[test]
    fn test_load_state_progress() {
        let mut state = LoadState::new("p.jpg");
        assert!(state.is_loading());
        assert_eq!(state.progress, 0);

        assert!(state.apply(StageRecord::loaded(Stage::Placeholder, "p.jpg")));
        assert_eq!(state.progress, 10);
        assert!(state.apply(StageRecord::loaded(Stage::LowQuality, "low.jpg")));
        assert_eq!(state.progress, 50);

        // Backwards transitions are ignored
        assert!(!state.apply(StageRecord::loaded(Stage::Placeholder, "p.jpg")));
        assert_eq!(state.current.stage, Stage::LowQuality);

        assert!(state.apply(StageRecord::error("p.jpg")));
        assert!(state.is_error());
        assert!(!state.is_loading());
        assert_eq!(state.progress, 50);

        // Terminal
        assert!(!state.apply(StageRecord::loaded(Stage::HighQuality, "high.jpg")));
    }
}
