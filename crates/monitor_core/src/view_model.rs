use std::time::Duration;

use crate::{ChangeReport, ClaimCounts, CycleStats, Operation};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MonitorView {
    pub active: bool,
    pub in_flight: Option<Operation>,
    pub poll_interval: Duration,
    pub auto_reload: bool,
    pub last_known_status: Option<ChangeReport>,
    pub last_counts: Option<ClaimCounts>,
    pub stats: CycleStats,
}
