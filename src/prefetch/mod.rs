/// Prefetch module
///
/// This module warms images before they are needed:
/// - Network-aware policy: whether, how many, how far apart (network.rs)
/// - Deduplicating cache that owns the hint registry (cache.rs)
/// - Engagement-triggered, latched batch scheduling (scheduler.rs)

pub mod cache;
pub mod network;
pub mod scheduler;

pub use cache::{HintSink, LogHints, PrefetchCache, PrefetchOutcome};
pub use network::{EffectiveType, NetworkInfo, PolicyClass, PrefetchPolicy, StaticNetwork};
pub use scheduler::{BatchReport, Engagement, PrefetchScheduler, SchedulerConfig, TriggerState};
