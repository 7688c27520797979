//! Watch Configuration
//!
//! Values come from the settings layer of the embedding extension; durations
//! are (de)serialized as milliseconds.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Reconciler and watcher timing options
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WatchConfig {
    /// Quiet period closing a burst; every new batch restarts it
    #[serde(with = "millis")]
    pub quiet_window: Duration,

    /// Give up when no batch at all arrives within this time
    #[serde(with = "millis")]
    pub max_wait: Duration,

    /// Attribute marking a node as hidden
    pub hidden_attribute: String,

    /// Registry id of the reconciler's oneshot watcher
    pub watcher_id: String,
}

impl Default for WatchConfig {
    fn default() -> Self {
        Self {
            quiet_window: Duration::from_millis(50),
            max_wait: Duration::from_secs(5),
            hidden_attribute: graft_dom::HIDDEN_ATTRIBUTE.to_string(),
            watcher_id: "reconciler".to_string(),
        }
    }
}

/// Bounded polling
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryPolicy {
    /// Total attempts, including the first one
    pub attempts: u32,

    /// Delay between two attempts
    #[serde(with = "millis")]
    pub delay: Duration,
}

impl RetryPolicy {
    pub fn new(attempts: u32, delay: Duration) -> Self {
        Self { attempts, delay }
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            attempts: 10,
            delay: Duration::from_millis(100),
        }
    }
}

mod millis {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer, ser};

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        let millis = u64::try_from(value.as_millis()).map_err(<S::Error as ser::Error>::custom)?;
        serializer.serialize_u64(millis)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        u64::deserialize(deserializer).map(Duration::from_millis)
    }
}
