use std::path::PathBuf;
use std::time::Duration;

use crate::app::{LayoutConfig, SessionOptions};
use crate::scan::{AccessTier, StalePolicy, TierPolicy};

/// Where scan events come from.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum DriverSource {
    Detached,
    Tcp(String),
    Replay { path: PathBuf, interval: Duration },
}

/// Startup settings resolved from the command line.
#[derive(Clone, Debug)]
pub struct Settings {
    pub driver: DriverSource,
    pub target: String,
    pub ports: String,
    pub pro: bool,
    pub drop_stale: bool,
    pub physics_intensity: f32,
}

impl Settings {
    pub(crate) fn session_options(&self) -> SessionOptions {
        SessionOptions {
            tier_policy: if self.pro {
                TierPolicy::Fixed(AccessTier::Full)
            } else {
                TierPolicy::FromDriver
            },
            stale_policy: if self.drop_stale {
                StalePolicy::Drop
            } else {
                StalePolicy::Accept
            },
            layout: LayoutConfig::with_intensity(self.physics_intensity),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn settings() -> Settings {
        Settings {
            driver: DriverSource::Detached,
            target: "127.0.0.1".to_owned(),
            ports: "1-1000".to_owned(),
            pro: false,
            drop_stale: false,
            physics_intensity: 1.0,
        }
    }

    #[test]
    fn defaults_trust_the_driver_and_accept_late_data() {
        let options = settings().session_options();
        assert_eq!(options.tier_policy, TierPolicy::FromDriver);
        assert_eq!(options.stale_policy, StalePolicy::Accept);
    }

    #[test]
    fn flags_switch_policies() {
        let options = Settings {
            pro: true,
            drop_stale: true,
            ..settings()
        }
        .session_options();
        assert_eq!(options.tier_policy, TierPolicy::Fixed(AccessTier::Full));
        assert_eq!(options.stale_policy, StalePolicy::Drop);
    }
}
