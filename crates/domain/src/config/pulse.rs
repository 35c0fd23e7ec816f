use serde::{Deserialize, Serialize};

/// §4.G pulse store/scheduler configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PulseConfig {
    /// Poll interval in seconds. Minimum enforced at 1s.
    #[serde(default = "d_poll_secs")]
    pub poll_interval_secs: u64,
    /// Default timezone used when a reminder omits one explicitly.
    #[serde(default = "d_timezone")]
    pub default_timezone: String,
    /// Path to the reminder store JSON document.
    #[serde(default = "d_store_path")]
    pub store_path: std::path::PathBuf,
}

impl Default for PulseConfig {
    fn default() -> Self {
        Self {
            poll_interval_secs: d_poll_secs(),
            default_timezone: d_timezone(),
            store_path: d_store_path(),
        }
    }
}

impl PulseConfig {
    pub fn effective_poll_interval(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.poll_interval_secs.max(1))
    }
}

fn d_poll_secs() -> u64 {
    30
}
fn d_timezone() -> String {
    "UTC".into()
}
fn d_store_path() -> std::path::PathBuf {
    std::path::PathBuf::from("data/pulse/reminders.json")
}
