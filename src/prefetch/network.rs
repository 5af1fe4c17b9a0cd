/// Network-aware prefetch policy.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

/// Effective connection type as reported by the platform
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub enum EffectiveType {
    #[serde(rename = "slow-2g")]
    Slow2g,
    #[serde(rename = "2g")]
    TwoG,
    #[serde(rename = "3g")]
    ThreeG,
    #[serde(rename = "4g")]
    FourG,
}

impl FromStr for EffectiveType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "slow-2g" => Ok(EffectiveType::Slow2g),
            "2g" => Ok(EffectiveType::TwoG),
            "3g" => Ok(EffectiveType::ThreeG),
            "4g" => Ok(EffectiveType::FourG),
            other => Err(format!("unknown connection type: {}", other)),
        }
    }
}

impl fmt::Display for EffectiveType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            EffectiveType::Slow2g => "slow-2g",
            EffectiveType::TwoG => "2g",
            EffectiveType::ThreeG => "3g",
            EffectiveType::FourG => "4g",
        })
    }
}

/// Capability to inspect the current connection.
/// `None` means the platform offers no network information.
pub trait NetworkInfo: Send + Sync {
    fn effective_type(&self) -> Option<EffectiveType>;
}

/// A fixed connection type, e.g. from settings
#[derive(Debug, Clone, Copy, Default)]
pub struct StaticNetwork(pub Option<EffectiveType>);

impl NetworkInfo for StaticNetwork {
    fn effective_type(&self) -> Option<EffectiveType> {
        self.0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PolicyClass {
    Disabled,
    Reduced,
    Full,
}

/// How many images to prefetch and how far apart to start them
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PrefetchPolicy {
    pub class: PolicyClass,
    pub max_prefetch: usize,
    pub stagger: Duration,
}

impl PrefetchPolicy {
    pub const DISABLED: PrefetchPolicy = PrefetchPolicy {
        class: PolicyClass::Disabled,
        max_prefetch: 0,
        stagger: Duration::ZERO,
    };

    pub const REDUCED: PrefetchPolicy = PrefetchPolicy {
        class: PolicyClass::Reduced,
        max_prefetch: 6,
        stagger: Duration::from_millis(400),
    };

    pub const FULL: PrefetchPolicy = PrefetchPolicy {
        class: PolicyClass::Full,
        max_prefetch: 12,
        stagger: Duration::from_millis(200),
    };

    /// Classify a connection. Unknown connections get the full policy.
    pub fn for_connection(effective_type: Option<EffectiveType>) -> Self {
        match effective_type {
            Some(EffectiveType::Slow2g) | Some(EffectiveType::TwoG) => Self::DISABLED,
            Some(EffectiveType::ThreeG) => Self::REDUCED,
            Some(EffectiveType::FourG) | None => Self::FULL,
        }
    }

    pub fn should_prefetch(&self) -> bool {
        self.class != PolicyClass::Disabled
    }

    /// Number of items to take when `requested` are wanted
    pub fn bound(&self, requested: usize) -> usize {
        requested.min(self.max_prefetch)
    }

    /// Start offset of the `index`-th item
    pub fn delay_for(&self, index: usize) -> Duration {
        self.stagger * index as u32
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classification() {
        assert_eq!(PrefetchPolicy::for_connection(None), PrefetchPolicy::FULL);
        assert_eq!(
            PrefetchPolicy::for_connection(Some(EffectiveType::FourG)),
            PrefetchPolicy::FULL
        );
        assert_eq!(
            PrefetchPolicy::for_connection(Some(EffectiveType::ThreeG)),
            PrefetchPolicy::REDUCED
        );
        assert!(!PrefetchPolicy::for_connection(Some(EffectiveType::TwoG)).should_prefetch());
        assert!(!PrefetchPolicy::for_connection(Some(EffectiveType::Slow2g)).should_prefetch());
    }

    #[test]
    fn test_bound_and_delay() {
        let policy = PrefetchPolicy::REDUCED;
        assert_eq!(policy.bound(20), 6);
        assert_eq!(policy.bound(4), 4);
        assert_eq!(policy.delay_for(0), Duration::ZERO);
        assert_eq!(policy.delay_for(3), Duration::from_millis(1200));
        assert_eq!(PrefetchPolicy::DISABLED.bound(8), 0);
    }

    #[test]
    fn test_parse_effective_type() {
        assert_eq!("3G".parse::<EffectiveType>(), Ok(EffectiveType::ThreeG));
        assert_eq!("slow-2g".parse::<EffectiveType>(), Ok(EffectiveType::Slow2g));
        assert!("5g".parse::<EffectiveType>().is_err());
        assert_eq!(EffectiveType::FourG.to_string(), "4g");
    }
}
