use monitor_core::{ApiError, Operation, Trigger};
use monitor_logging::{monitor_debug, monitor_info, monitor_warn};
use tokio::sync::mpsc;

use crate::callbacks::CallbackError;
use crate::ui::{RefreshOutcome, UiUpdate};

/// Everything the monitor does, as seen from outside.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MonitorEvent {
    Started,
    Stopped,
    RequestSent(Operation),
    CheckFinished { changes_detected: bool },
    CallbackFailed(CallbackError),
    UiUpdated(UiUpdate),
    Failure { operation: Operation, error: ApiError },
    Skipped { trigger: Trigger, in_flight: Operation },
}

/// Injected hook through which failures reach operators; none of them ever
/// reach the page.
pub trait MonitorObserver: Send + Sync {
    fn observe(&self, event: &MonitorEvent);
}

/// Writes events to the `monitor_logging` macros.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogObserver;

impl MonitorObserver for LogObserver {
    fn observe(&self, event: &MonitorEvent) {
        match event {
            MonitorEvent::Started => monitor_info!("Monitoring started"),
            MonitorEvent::Stopped => monitor_info!("Monitoring stopped"),
            MonitorEvent::RequestSent(operation) => monitor_debug!("Sending {} request", operation),
            MonitorEvent::CheckFinished { changes_detected } => {
                if *changes_detected {
                    monitor_info!("Data changes detected");
                } else {
                    monitor_debug!("No data changes");
                }
            }
            MonitorEvent::CallbackFailed(err) => monitor_warn!("{}", err),
            MonitorEvent::UiUpdated(update) => {
                monitor_info!(
                    "Counts updated claims={} details={} elements={}",
                    update.counts.total_claims,
                    update.counts.total_claim_details,
                    update.counters_updated
                );
                match &update.refresh {
                    RefreshOutcome::Signalled(signal) => {
                        monitor_debug!("Triggered '{}' on {}", signal.event, signal.selector())
                    }
                    RefreshOutcome::FullReload => monitor_info!("Page reloaded"),
                    RefreshOutcome::NoRoute => monitor_debug!("No section to refresh"),
                    RefreshOutcome::Failed { signal, error } => {
                        monitor_warn!("Refresh of {} failed: {}", signal.selector(), error)
                    }
                }
            }
            MonitorEvent::Failure { operation, error } => {
                monitor_warn!("{} failed: {}", operation, error)
            }
            MonitorEvent::Skipped { trigger, in_flight } => {
                monitor_debug!("Skipped {:?} trigger, {} still in flight", trigger, in_flight)
            }
        }
    }
}

/// Forwards events to a channel.
#[derive(Debug, Clone)]
pub struct ChannelObserver {
    tx: mpsc::UnboundedSender<MonitorEvent>,
}

impl ChannelObserver {
    pub fn new(tx: mpsc::UnboundedSender<MonitorEvent>) -> Self {
        Self { tx }
    }
}

impl MonitorObserver for ChannelObserver {
    fn observe(&self, event: &MonitorEvent) {
        let _ = self.tx.send(event.clone());
    }
}
