//! Monitor engine: HTTP client, page abstraction and the runtime that drives
//! the core state machine.
mod callbacks;
mod client;
mod csrf;
mod monitor;
mod observer;
mod page;
mod ui;

pub use callbacks::{CallbackError, CallbackRegistry, ChangeCallback};
pub use client::{ChangeApi, ClientSettings, ReqwestChangeApi};
pub use csrf::{cookie_value, resolve_csrf_token, CSRF_COOKIE, CSRF_FORM_FIELD};
pub use monitor::{ChangeMonitor, MonitorHandle, MonitorStatus};
pub use observer::{ChannelObserver, LogObserver, MonitorEvent, MonitorObserver};
pub use page::{CounterKind, Element, MemoryPage, Page, PageError, RefreshSignal};
pub use ui::{apply_ui_update, RefreshOutcome, UiUpdate};
