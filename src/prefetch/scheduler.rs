/// Engagement-driven prefetch scheduler.
///
/// Three independent engagement signals can start the batch: dwell time on
/// the page, scroll distance, and an anchor element coming near the viewport.
/// A one-shot latch lets exactly one of them run it.

use futures::future::join_all;
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

use super::cache::{PrefetchCache, PrefetchOutcome};
use super::network::{NetworkInfo, PolicyClass, PrefetchPolicy};
use crate::config::PrefetchSettings;

const ARMED: u8 = 0;
const FIRED: u8 = 1;
const DISABLED: u8 = 2;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TriggerState {
    Armed,
    Fired,
    Disabled,
}

/// One-shot gate checked with compare-and-swap
#[derive(Debug)]
pub struct TriggerLatch(AtomicU8);

impl TriggerLatch {
    pub fn new() -> Self {
        Self(AtomicU8::new(ARMED))
    }

    pub fn state(&self) -> TriggerState {
        match self.0.load(Ordering::Acquire) {
            ARMED => TriggerState::Armed,
            FIRED => TriggerState::Fired,
            _ => TriggerState::Disabled,
        }
    }

    /// Move from armed to fired. Only one caller ever gets `true`.
    pub fn try_fire(&self) -> bool {
        self.0
            .compare_exchange(ARMED, FIRED, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }

    pub fn disable(&self) {
        self.0.store(DISABLED, Ordering::Release);
    }
}

impl Default for TriggerLatch {
    fn default() -> Self {
        Self::new()
    }
}

/// An engagement signal reported by the host
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Engagement {
    /// Time spent on the page
    Dwell(Duration),
    /// Vertical scroll offset in pixels
    Scroll { offset: f32 },
    /// Vertical extents of the anchor element and the viewport
    NearView {
        anchor_top: f32,
        anchor_bottom: f32,
        viewport_top: f32,
        viewport_bottom: f32,
    },
    /// Explicit request from the host
    Manual,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SchedulerConfig {
    pub enabled: bool,
    pub engagement_time: Duration,
    pub scroll_threshold: f32,
    pub near_view_margin: f32,
    /// Requested upper bound, further capped by the network policy
    pub max_images: usize,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self::from(&PrefetchSettings::default())
    }
}

impl From<&PrefetchSettings> for SchedulerConfig {
    fn from(settings: &PrefetchSettings) -> Self {
        Self {
            enabled: settings.enabled,
            engagement_time: settings.engagement_time(),
            scroll_threshold: settings.scroll_threshold_px,
            near_view_margin: settings.near_view_margin_px,
            max_images: settings.max_images,
        }
    }
}

/// Outcome of one prefetch batch
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BatchReport {
    pub policy: PolicyClass,
    /// URLs offered to the scheduler
    pub requested: usize,
    /// URLs actually sent to the cache
    pub scheduled: usize,
    pub completed: usize,
    pub failed: usize,
    /// Already cached or in flight, skipped by the cache
    pub deduplicated: usize,
}

pub struct PrefetchScheduler {
    config: SchedulerConfig,
    latch: TriggerLatch,
    urls: Vec<String>,
    cache: Arc<PrefetchCache>,
    network: Arc<dyn NetworkInfo>,
}

impl PrefetchScheduler {
    /// `urls` are in priority order; only the head of the list is prefetched.
    pub fn new(
        config: SchedulerConfig,
        urls: Vec<String>,
        cache: Arc<PrefetchCache>,
        network: Arc<dyn NetworkInfo>,
    ) -> Self {
        let latch = TriggerLatch::new();
        if !config.enabled {
            latch.disable();
        }
        Self {
            config,
            latch,
            urls,
            cache,
            network,
        }
    }

    pub fn state(&self) -> TriggerState {
        self.latch.state()
    }

    /// Stop any future trigger from running, e.g. on teardown
    pub fn disable(&self) {
        self.latch.disable();
    }

    pub fn cache(&self) -> &Arc<PrefetchCache> {
        &self.cache
    }

    /// Whether a signal meets its threshold. Does not touch the latch.
    pub fn qualifies(&self, signal: &Engagement) -> bool {
        if self.urls.is_empty() {
            return false;
        }
        match *signal {
            Engagement::Dwell(elapsed) => elapsed >= self.config.engagement_time,
            Engagement::Scroll { offset } => offset > self.config.scroll_threshold,
            Engagement::NearView {
                anchor_top,
                anchor_bottom,
                viewport_top,
                viewport_bottom,
            } => {
                let margin = self.config.near_view_margin;
                anchor_top <= viewport_bottom + margin && anchor_bottom >= viewport_top - margin
            }
            Engagement::Manual => true,
        }
    }

    /// Report a signal. Runs the batch if the signal qualifies and this is
    /// the first qualifying signal; returns `None` otherwise.
    pub async fn on_engagement(&self, signal: Engagement) -> Option<BatchReport> {
        if !self.qualifies(&signal) {
            return None;
        }
        if !self.latch.try_fire() {
            debug!(?signal, "Prefetch already triggered");
            return None;
        }

        info!(?signal, "Prefetch triggered");
        Some(self.run_batch().await)
    }

    /// Trigger immediately; still subject to the latch
    pub async fn trigger_now(&self) -> Option<BatchReport> {
        self.on_engagement(Engagement::Manual).await
    }

    /// Wait out the engagement dwell, then trigger if nothing else has
    pub async fn run_engagement_timer(&self) -> Option<BatchReport> {
        tokio::time::sleep(self.config.engagement_time).await;
        if self.state() != TriggerState::Armed {
            return None;
        }
        self.on_engagement(Engagement::Dwell(self.config.engagement_time))
            .await
    }

    async fn run_batch(&self) -> BatchReport {
        let policy = PrefetchPolicy::for_connection(self.network.effective_type());
        let mut report = BatchReport {
            policy: policy.class,
            requested: self.urls.len(),
            scheduled: 0,
            completed: 0,
            failed: 0,
            deduplicated: 0,
        };

        if !policy.should_prefetch() {
            info!("Prefetch skipped on slow connection");
            return report;
        }

        let batch = &self.urls[..policy.bound(self.config.max_images).min(self.urls.len())];
        report.scheduled = batch.len();

        let tasks = batch.iter().enumerate().map(|(index, url)| {
            let cache = &self.cache;
            async move {
                let delay = policy.delay_for(index);
                if !delay.is_zero() {
                    tokio::time::sleep(delay).await;
                }
                cache.prefetch(url).await
            }
        });

        for result in join_all(tasks).await {
            match result {
                Ok(PrefetchOutcome::Fetched) => report.completed += 1,
                Ok(PrefetchOutcome::AlreadyCached) | Ok(PrefetchOutcome::AlreadyPending) => {
                    report.deduplicated += 1
                }
                Err(error) => {
                    warn!(%error, "Prefetch failed");
                    report.failed += 1;
                }
            }
        }

        info!(
            scheduled = report.scheduled,
            completed = report.completed,
            failed = report.failed,
            "Prefetch batch completed"
        );
        report
    }
}
