use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Timing of the confirmation wait.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkflowConfig {
    /// Upper bound on the wait for inclusion, independent of block time.
    #[serde(default = "default_confirmation_timeout", with = "secs")]
    pub confirmation_timeout: Duration,
    /// Delay between receipt polls.
    #[serde(default = "default_poll_interval", with = "secs")]
    pub poll_interval: Duration,
}

fn default_confirmation_timeout() -> Duration {
    Duration::from_secs(120)
}

fn default_poll_interval() -> Duration {
    Duration::from_secs(2)
}

impl Default for WorkflowConfig {
    fn default() -> Self {
        Self {
            confirmation_timeout: default_confirmation_timeout(),
            poll_interval: default_poll_interval(),
        }
    }
}

mod secs {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_u64(d.as_secs())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
        u64::deserialize(d).map(Duration::from_secs)
    }
}
