use std::time::Duration;

use crate::RouteTable;

/// Construction-time settings for a monitor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MonitorConfig {
    pub poll_interval: Duration,
    pub auto_reload: bool,
    pub routes: RouteTable,
}

impl MonitorConfig {
    pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(30_000);
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            poll_interval: Self::DEFAULT_POLL_INTERVAL,
            auto_reload: true,
            routes: RouteTable::default(),
        }
    }
}
