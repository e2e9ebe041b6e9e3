//! Monitor core: pure state machine, wire types and page routing helpers.
mod config;
mod effect;
mod failure;
mod format;
mod msg;
mod report;
mod routes;
mod state;
mod update;
mod view_model;

pub use config::MonitorConfig;
pub use effect::{Effect, Trigger};
pub use failure::{ApiError, FailureKind, Operation};
pub use format::format_count;
pub use msg::Msg;
pub use report::{ChangeReport, ClaimCounts, ReloadResult};
pub use routes::{Route, RouteError, RouteTable, DEFAULT_REFRESH_EVENT};
pub use state::{CycleStats, MonitorState};
pub use update::update;
pub use view_model::MonitorView;
