use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;

use futures_util::FutureExt;
use monitor_core::{
    update, ApiError, ChangeReport, Effect, FailureKind, MonitorConfig, MonitorState, MonitorView,
    Msg, Operation, RouteTable,
};
use monitor_logging::{monitor_debug, monitor_error, monitor_warn};
use tokio::sync::{mpsc, oneshot};
use tokio::time::{self, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

use crate::callbacks::{panic_message, CallbackRegistry, ChangeCallback};
use crate::client::ChangeApi;
use crate::csrf::{resolve_csrf_token, CSRF_FORM_FIELD};
use crate::observer::{MonitorEvent, MonitorObserver};
use crate::page::Page;
use crate::ui::apply_ui_update;

const MIN_POLL_INTERVAL: Duration = Duration::from_millis(10);

enum Command {
    Dispatch(Msg),
    Register(ChangeCallback),
    Status(oneshot::Sender<MonitorStatus>),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MonitorStatus {
    pub view: MonitorView,
    pub registered_callbacks: usize,
    pub location_path: String,
}

/// Cloneable front of a running monitor.
///
/// Every method only enqueues work for the monitor task; none of them wait
/// for network activity.
#[derive(Clone)]
pub struct MonitorHandle {
    cmd_tx: mpsc::UnboundedSender<Command>,
    shutdown: CancellationToken,
}

impl MonitorHandle {
    pub fn start(&self) {
        self.send(Command::Dispatch(Msg::Start));
    }

    pub fn stop(&self) {
        self.send(Command::Dispatch(Msg::Stop));
    }

    pub fn manual_check(&self) {
        self.send(Command::Dispatch(Msg::ManualCheck));
    }

    pub fn manual_reload(&self) {
        self.send(Command::Dispatch(Msg::ManualReload));
    }

    pub fn visibility_changed(&self, visible: bool) {
        self.send(Command::Dispatch(Msg::VisibilityChanged { visible }));
    }

    pub fn register_change_callback<F>(&self, callback: F)
    where
        F: FnMut(&ChangeReport) -> anyhow::Result<()> + Send + 'static,
    {
        self.send(Command::Register(Box::new(callback)));
    }

    /// Snapshot of the monitor reflecting every command sent earlier on this
    /// handle. `None` once the monitor has shut down.
    pub async fn status(&self) -> Option<MonitorStatus> {
        let (tx, rx) = oneshot::channel();
        if self.cmd_tx.send(Command::Status(tx)).is_err() {
            return None;
        }
        rx.await.ok()
    }

    pub fn shutdown(&self) {
        self.shutdown.cancel();
    }

    /// Resolves when the monitor task has exited.
    pub async fn closed(&self) {
        self.cmd_tx.closed().await;
    }

    fn send(&self, command: Command) {
        if self.cmd_tx.send(command).is_err() {
            monitor_debug!("Monitor already shut down; command dropped");
        }
    }
}

/// Owns the state, the page and the callbacks, and runs on a single task.
pub struct ChangeMonitor {
    state: MonitorState,
    routes: RouteTable,
    api: Arc<dyn ChangeApi>,
    page: Box<dyn Page>,
    callbacks: CallbackRegistry,
    observer: Arc<dyn MonitorObserver>,
    results_tx: mpsc::UnboundedSender<Msg>,
}

impl ChangeMonitor {
    /// Spawns the monitor on the current tokio runtime. The monitor starts
    /// inactive; call [`MonitorHandle::start`].
    pub fn spawn(
        config: MonitorConfig,
        api: Arc<dyn ChangeApi>,
        page: Box<dyn Page>,
        observer: Arc<dyn MonitorObserver>,
    ) -> MonitorHandle {
        let (cmd_tx, cmd_rx) = mpsc::unbounded_channel();
        let (results_tx, results_rx) = mpsc::unbounded_channel();
        let shutdown = CancellationToken::new();

        let period = if config.poll_interval < MIN_POLL_INTERVAL {
            monitor_warn!(
                "Poll interval {:?} too small; using {:?}",
                config.poll_interval,
                MIN_POLL_INTERVAL
            );
            MIN_POLL_INTERVAL
        } else {
            config.poll_interval
        };

        let monitor = Self {
            state: MonitorState::from_config(&config),
            routes: config.routes,
            api,
            page,
            callbacks: CallbackRegistry::new(),
            observer,
            results_tx,
        };
        tokio::spawn(monitor.run(period, cmd_rx, results_rx, shutdown.clone()));

        MonitorHandle { cmd_tx, shutdown }
    }

    async fn run(
        mut self,
        period: Duration,
        mut cmd_rx: mpsc::UnboundedReceiver<Command>,
        mut results_rx: mpsc::UnboundedReceiver<Msg>,
        shutdown: CancellationToken,
    ) {
        // The timer runs for the monitor's whole life; ticks are no-ops while
        // inactive.
        let mut interval = time::interval_at(Instant::now() + period, period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = shutdown.cancelled() => break,
                command = cmd_rx.recv() => match command {
                    Some(command) => self.handle_command(command),
                    None => break,
                },
                Some(msg) = results_rx.recv() => self.dispatch(msg),
                _ = interval.tick() => self.dispatch(Msg::Tick),
            }
        }
        monitor_debug!("Monitor task exiting");
    }

    fn handle_command(&mut self, command: Command) {
        match command {
            Command::Dispatch(msg) => {
                match msg {
                    Msg::Start => self.observe(MonitorEvent::Started),
                    Msg::Stop => self.observe(MonitorEvent::Stopped),
                    _ => {}
                }
                self.dispatch(msg);
            }
            Command::Register(callback) => self.callbacks.register(callback),
            Command::Status(reply) => {
                let _ = reply.send(MonitorStatus {
                    view: self.state.view(),
                    registered_callbacks: self.callbacks.len(),
                    location_path: self.page.location_path(),
                });
            }
        }
    }

    fn dispatch(&mut self, msg: Msg) {
        if let Msg::CheckCompleted(Ok(report)) = &msg {
            self.observe(MonitorEvent::CheckFinished {
                changes_detected: report.changes_detected,
            });
        }
        let state = std::mem::take(&mut self.state);
        let (state, effects) = update(state, msg);
        self.state = state;
        for effect in effects {
            self.run_effect(effect);
        }
    }

    fn run_effect(&mut self, effect: Effect) {
        match effect {
            Effect::CheckForChanges => {
                self.observe(MonitorEvent::RequestSent(Operation::Check));
                let api = self.api.clone();
                self.spawn_request(
                    Operation::Check,
                    async move { api.check_changes().await },
                    Msg::CheckCompleted,
                );
            }
            Effect::ForceReload => {
                self.observe(MonitorEvent::RequestSent(Operation::Reload));
                let token = resolve_csrf_token(
                    self.page.form_value(CSRF_FORM_FIELD).as_deref(),
                    self.page.cookies().as_deref(),
                );
                let api = self.api.clone();
                self.spawn_request(
                    Operation::Reload,
                    async move { api.force_reload(&token).await },
                    Msg::ReloadCompleted,
                );
            }
            Effect::NotifyChange(report) => {
                for failure in self.callbacks.notify(&report) {
                    self.observe(MonitorEvent::CallbackFailed(failure));
                }
            }
            Effect::ApplyUiUpdate(counts) => {
                let outcome = apply_ui_update(self.page.as_mut(), &self.routes, counts);
                self.observe(MonitorEvent::UiUpdated(outcome));
            }
            Effect::ReportFailure { operation, error } => {
                self.observe(MonitorEvent::Failure { operation, error });
            }
            Effect::ReportSkipped { trigger, in_flight } => {
                self.observe(MonitorEvent::Skipped { trigger, in_flight });
            }
        }
    }

    /// Runs a request on its own task. The completion message is always sent,
    /// even when the request panics, so the in-flight marker is released.
    fn spawn_request<T, F>(
        &self,
        operation: Operation,
        request: F,
        complete: fn(Result<T, ApiError>) -> Msg,
    ) where
        T: Send + 'static,
        F: Future<Output = Result<T, ApiError>> + Send + 'static,
    {
        let results_tx = self.results_tx.clone();
        tokio::spawn(async move {
            let result = match AssertUnwindSafe(request).catch_unwind().await {
                Ok(result) => result,
                Err(payload) => {
                    let message = format!(
                        "{operation} request panicked: {}",
                        panic_message(payload.as_ref())
                    );
                    monitor_error!("{}", message);
                    Err(ApiError::new(FailureKind::Network, message))
                }
            };
            let _ = results_tx.send(complete(result));
        });
    }

    fn observe(&self, event: MonitorEvent) {
        self.observer.observe(&event);
    }
}
