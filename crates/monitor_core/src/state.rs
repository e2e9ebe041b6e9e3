use std::time::Duration;

use crate::view_model::MonitorView;
use crate::{ChangeReport, ClaimCounts, MonitorConfig, Operation};

/// Running totals, for status display and operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CycleStats {
    pub checks: u64,
    pub changes: u64,
    pub reloads: u64,
    pub failures: u64,
    pub skipped: u64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MonitorState {
    poll_interval: Duration,
    auto_reload: bool,
    active: bool,
    in_flight: Option<Operation>,
    last_known_status: Option<ChangeReport>,
    last_counts: Option<ClaimCounts>,
    stats: CycleStats,
}

impl Default for MonitorState {
    fn default() -> Self {
        Self::new(MonitorConfig::DEFAULT_POLL_INTERVAL, true)
    }
}

impl MonitorState {
    pub fn new(poll_interval: Duration, auto_reload: bool) -> Self {
        Self {
            poll_interval,
            auto_reload,
            active: false,
            in_flight: None,
            last_known_status: None,
            last_counts: None,
            stats: CycleStats::default(),
        }
    }

    pub fn from_config(config: &MonitorConfig) -> Self {
        Self::new(config.poll_interval, config.auto_reload)
    }

    pub fn view(&self) -> MonitorView {
        MonitorView {
            active: self.active,
            in_flight: self.in_flight,
            poll_interval: self.poll_interval,
            auto_reload: self.auto_reload,
            last_known_status: self.last_known_status.clone(),
            last_counts: self.last_counts,
            stats: self.stats,
        }
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    pub fn auto_reload(&self) -> bool {
        self.auto_reload
    }

    pub fn in_flight(&self) -> Option<Operation> {
        self.in_flight
    }

    pub fn poll_interval(&self) -> Duration {
        self.poll_interval
    }

    pub(crate) fn set_active(&mut self, active: bool) {
        self.active = active;
    }

    pub(crate) fn begin(&mut self, operation: Operation) {
        self.in_flight = Some(operation);
        match operation {
            Operation::Check => self.stats.checks += 1,
            Operation::Reload => self.stats.reloads += 1,
        }
    }

    pub(crate) fn finish(&mut self) {
        self.in_flight = None;
    }

    pub(crate) fn record_status(&mut self, report: ChangeReport) {
        if report.changes_detected {
            self.stats.changes += 1;
        }
        self.last_known_status = Some(report);
    }

    pub(crate) fn record_counts(&mut self, counts: ClaimCounts) {
        self.last_counts = Some(counts);
    }

    pub(crate) fn record_failure(&mut self) {
        self.stats.failures += 1;
    }

    pub(crate) fn record_skip(&mut self) {
        self.stats.skipped += 1;
    }
}
