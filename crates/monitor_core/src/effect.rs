use crate::{ApiError, ChangeReport, ClaimCounts, Operation};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    /// Issue one request to the change-detection endpoint.
    CheckForChanges,
    /// Run every registered callback with the report, in registration order.
    NotifyChange(ChangeReport),
    /// Issue one request to the reload endpoint.
    ForceReload,
    /// Patch counters and refresh the current page section.
    ApplyUiUpdate(ClaimCounts),
    ReportFailure {
        operation: Operation,
        error: ApiError,
    },
    ReportSkipped {
        trigger: Trigger,
        in_flight: Operation,
    },
}

/// What asked for a network operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Trigger {
    Start,
    Tick,
    Visibility,
    ManualCheck,
    ManualReload,
}
