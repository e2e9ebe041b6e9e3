use crate::{ApiError, ChangeReport, ReloadResult};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Msg {
    /// Caller activated the monitor.
    Start,
    /// Caller deactivated the monitor.
    Stop,
    /// Poll interval elapsed.
    Tick,
    /// Page visibility flipped.
    VisibilityChanged { visible: bool },
    /// External request for a single change check.
    ManualCheck,
    /// External request for a server-side reload.
    ManualReload,
    /// Change-detection endpoint answered (or failed).
    CheckCompleted(Result<ChangeReport, ApiError>),
    /// Reload endpoint answered (or failed).
    ReloadCompleted(Result<ReloadResult, ApiError>),
}
