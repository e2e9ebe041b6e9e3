use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use monitor_core::{
    ApiError, ChangeReport, ClaimCounts, FailureKind, MonitorConfig, Operation, ReloadResult,
};
use monitor_engine::{
    ChangeApi, ChangeMonitor, ChannelObserver, ClientSettings, CounterKind, Element, MemoryPage,
    MonitorEvent, MonitorHandle, RefreshOutcome, ReqwestChangeApi,
};
use serde_json::json;
use tokio::sync::mpsc;
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const COUNTS: ClaimCounts = ClaimCounts {
    total_claims: 1234,
    total_claim_details: 7,
};

/// Answers from queues and writes every call into a shared journal.
#[derive(Default)]
struct ScriptedApi {
    checks: Mutex<VecDeque<Result<ChangeReport, ApiError>>>,
    reloads: Mutex<VecDeque<Result<ReloadResult, ApiError>>>,
    journal: Arc<Mutex<Vec<String>>>,
}

impl ScriptedApi {
    fn new(journal: Arc<Mutex<Vec<String>>>) -> Self {
        Self {
            journal,
            ..Self::default()
        }
    }

    fn with_check(self, result: Result<ChangeReport, ApiError>) -> Self {
        self.checks.lock().unwrap().push_back(result);
        self
    }

    fn with_reload(self, result: Result<ReloadResult, ApiError>) -> Self {
        self.reloads.lock().unwrap().push_back(result);
        self
    }
}

#[async_trait::async_trait]
impl ChangeApi for ScriptedApi {
    async fn check_changes(&self) -> Result<ChangeReport, ApiError> {
        self.journal.lock().unwrap().push("check".to_string());
        self.checks
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Ok(ChangeReport::unchanged()))
    }

    async fn force_reload(&self, csrf_token: &str) -> Result<ReloadResult, ApiError> {
        self.journal
            .lock()
            .unwrap()
            .push(format!("reload:{csrf_token}"));
        self.reloads
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Ok(ReloadResult::succeeded(COUNTS)))
    }
}

struct Harness {
    handle: MonitorHandle,
    events: mpsc::UnboundedReceiver<MonitorEvent>,
    journal: Arc<Mutex<Vec<String>>>,
    page: Arc<Mutex<MemoryPage>>,
}

impl Harness {
    fn spawn(config: MonitorConfig, api: impl ChangeApi + 'static, page: MemoryPage) -> Self {
        let journal = Arc::new(Mutex::new(Vec::new()));
        Self::spawn_with_journal(config, Arc::new(api), page, journal)
    }

    fn spawn_with_journal(
        config: MonitorConfig,
        api: Arc<dyn ChangeApi>,
        page: MemoryPage,
        journal: Arc<Mutex<Vec<String>>>,
    ) -> Self {
        monitor_logging::initialize_for_tests();
        let (tx, events) = mpsc::unbounded_channel();
        let page = Arc::new(Mutex::new(page));
        let handle = ChangeMonitor::spawn(
            config,
            api,
            Box::new(page.clone()),
            Arc::new(ChannelObserver::new(tx)),
        );
        Self {
            handle,
            events,
            journal,
            page,
        }
    }

    /// Waits for the first event matching `pred`, returning everything seen
    /// up to and including it.
    async fn wait_for(&mut self, pred: impl Fn(&MonitorEvent) -> bool) -> Vec<MonitorEvent> {
        let mut seen = Vec::new();
        loop {
            let event = tokio::time::timeout(Duration::from_secs(5), self.events.recv())
                .await
                .expect("event before timeout")
                .expect("monitor alive");
            let done = pred(&event);
            seen.push(event);
            if done {
                return seen;
            }
        }
    }

    fn drain(&mut self) -> Vec<MonitorEvent> {
        let mut seen = Vec::new();
        while let Ok(event) = self.events.try_recv() {
            seen.push(event);
        }
        seen
    }

    fn journal(&self) -> Vec<String> {
        self.journal.lock().unwrap().clone()
    }
}

fn quiet_config(auto_reload: bool) -> MonitorConfig {
    MonitorConfig {
        poll_interval: Duration::from_secs(3600),
        auto_reload,
        ..MonitorConfig::default()
    }
}

fn claims_page() -> MemoryPage {
    MemoryPage::new("/dashboard/claims/")
        .with_form_field("csrfmiddlewaretoken", "form-token")
        .with_element(Element::counter(CounterKind::Claims))
        .with_element(Element::counter(CounterKind::ClaimDetails))
        .with_element(Element::container("claims-container"))
        .with_element(Element::container("dashboard-container"))
}

fn is_ui_update(event: &MonitorEvent) -> bool {
    matches!(event, MonitorEvent::UiUpdated(_))
}

#[tokio::test]
async fn unchanged_data_fires_no_callback_and_no_reload() {
    let journal = Arc::new(Mutex::new(Vec::new()));
    let api = ScriptedApi::new(journal.clone());
    let mut h = Harness::spawn_with_journal(
        quiet_config(true),
        Arc::new(api),
        claims_page(),
        journal,
    );

    let calls = Arc::new(Mutex::new(0));
    let counter = calls.clone();
    h.handle.register_change_callback(move |_| {
        *counter.lock().unwrap() += 1;
        Ok(())
    });
    h.handle.start();

    h.wait_for(|e| matches!(e, MonitorEvent::CheckFinished { .. }))
        .await;
    let status = h.handle.status().await.expect("status");

    assert_eq!(*calls.lock().unwrap(), 0);
    assert_eq!(h.journal(), vec!["check"]);
    assert!(status.view.active);
    assert_eq!(status.view.in_flight, None);
    assert_eq!(status.registered_callbacks, 1);
    assert!(!h.drain().iter().any(|e| *e == MonitorEvent::RequestSent(Operation::Reload)));
}

#[tokio::test]
async fn change_runs_callbacks_in_order_then_reloads_once() {
    let journal = Arc::new(Mutex::new(Vec::new()));
    let api = ScriptedApi::new(journal.clone())
        .with_check(Ok(ChangeReport::changed(["/srv/Data/claims.csv"])));
    let mut h = Harness::spawn_with_journal(
        quiet_config(true),
        Arc::new(api),
        claims_page(),
        journal.clone(),
    );

    let first = journal.clone();
    h.handle.register_change_callback(move |report| {
        first
            .lock()
            .unwrap()
            .push(format!("first:{}", report.changed_files.len()));
        Ok(())
    });
    h.handle
        .register_change_callback(|_| anyhow::bail!("listener offline"));
    h.handle
        .register_change_callback(|_| panic!("listener crashed"));
    let last = journal.clone();
    h.handle.register_change_callback(move |_| {
        last.lock().unwrap().push("last".to_string());
        Ok(())
    });
    h.handle.start();

    let events = h.wait_for(is_ui_update).await;

    assert_eq!(
        h.journal(),
        vec!["check", "first:1", "last", "reload:form-token"]
    );
    let callback_failures: Vec<usize> = events
        .iter()
        .filter_map(|e| match e {
            MonitorEvent::CallbackFailed(err) => Some(err.index),
            _ => None,
        })
        .collect();
    assert_eq!(callback_failures, vec![1, 2]);

    let page = h.page.lock().unwrap();
    assert_eq!(page.counter_texts(CounterKind::Claims), vec!["1,234"]);
    assert_eq!(page.counter_texts(CounterKind::ClaimDetails), vec!["7"]);
    assert_eq!(page.triggered().len(), 1);
    assert_eq!(page.triggered()[0].container_id, "claims-container");
}

#[tokio::test]
async fn change_without_auto_reload_skips_reload() {
    let journal = Arc::new(Mutex::new(Vec::new()));
    let api = ScriptedApi::new(journal.clone()).with_check(Ok(ChangeReport::changed(["a.csv"])));
    let mut h = Harness::spawn_with_journal(
        quiet_config(false),
        Arc::new(api),
        claims_page(),
        journal,
    );

    h.handle.manual_check();
    h.wait_for(|e| matches!(e, MonitorEvent::CheckFinished { changes_detected: true }))
        .await;
    let status = h.handle.status().await.expect("status");

    assert_eq!(h.journal(), vec!["check"]);
    assert!(!status.view.active);
    assert_eq!(status.view.stats.changes, 1);
}

#[tokio::test]
async fn failures_are_observed_and_state_survives() {
    let api = ScriptedApi::default()
        .with_check(Err(ApiError::new(FailureKind::Network, "connection reset")));
    let mut h = Harness::spawn(quiet_config(true), api, claims_page());

    h.handle.start();
    let events = h
        .wait_for(|e| matches!(e, MonitorEvent::Failure { .. }))
        .await;
    assert_eq!(
        events.last(),
        Some(&MonitorEvent::Failure {
            operation: Operation::Check,
            error: ApiError::new(FailureKind::Network, "connection reset"),
        })
    );

    let status = h.handle.status().await.expect("status");
    assert!(status.view.active);
    assert!(status.view.auto_reload);
    assert_eq!(status.view.in_flight, None);
    assert_eq!(status.view.last_known_status, None);
    assert_eq!(status.view.stats.failures, 1);
}

#[tokio::test]
async fn rejected_manual_reload_leaves_page_alone() {
    let api = ScriptedApi::default().with_reload(Ok(ReloadResult::failed("busy")));
    let mut h = Harness::spawn(quiet_config(true), api, claims_page());

    h.handle.manual_reload();
    h.wait_for(|e| matches!(e, MonitorEvent::Failure { .. }))
        .await;

    let page = h.page.lock().unwrap();
    assert_eq!(page.counter_texts(CounterKind::Claims), vec![""]);
    assert!(page.triggered().is_empty());
}

#[tokio::test]
async fn stop_silences_timer_ticks() {
    let config = MonitorConfig {
        poll_interval: Duration::from_millis(20),
        ..quiet_config(true)
    };
    let mut h = Harness::spawn(config, ScriptedApi::default(), claims_page());

    h.handle.start();
    h.wait_for(|e| matches!(e, MonitorEvent::CheckFinished { .. }))
        .await;
    // Let the timer fire at least once while active.
    h.wait_for(|e| *e == MonitorEvent::RequestSent(Operation::Check))
        .await;

    h.handle.stop();
    let status = h.handle.status().await.expect("status");
    assert!(!status.view.active);
    h.drain();

    tokio::time::sleep(Duration::from_millis(150)).await;
    let late = h.drain();
    assert!(
        !late
            .iter()
            .any(|e| *e == MonitorEvent::RequestSent(Operation::Check)),
        "unexpected events after stop: {late:?}"
    );
}

/// Panics on the first check and answers normally afterwards.
#[derive(Default)]
struct PanicOnceApi {
    checks: Mutex<u32>,
}

#[async_trait::async_trait]
impl ChangeApi for PanicOnceApi {
    async fn check_changes(&self) -> Result<ChangeReport, ApiError> {
        let first = {
            let mut checks = self.checks.lock().unwrap();
            *checks += 1;
            *checks == 1
        };
        if first {
            panic!("backend exploded");
        }
        Ok(ChangeReport::unchanged())
    }

    async fn force_reload(&self, _csrf_token: &str) -> Result<ReloadResult, ApiError> {
        Ok(ReloadResult::succeeded(COUNTS))
    }
}

#[tokio::test]
async fn panicking_request_releases_the_busy_guard() {
    let config = MonitorConfig {
        poll_interval: Duration::from_millis(20),
        ..quiet_config(true)
    };
    let api = Arc::new(PanicOnceApi::default());
    let journal = Arc::new(Mutex::new(Vec::new()));
    let mut h = Harness::spawn_with_journal(config, api.clone(), claims_page(), journal);

    h.handle.start();
    let seen = h
        .wait_for(|e| matches!(e, MonitorEvent::Failure { .. }))
        .await;
    match seen.last() {
        Some(MonitorEvent::Failure { operation, error }) => {
            assert_eq!(*operation, Operation::Check);
            assert_eq!(error.kind, FailureKind::Network);
            assert!(error.message.contains("backend exploded"), "{error}");
        }
        other => panic!("expected a check failure, got {other:?}"),
    }

    // The next tick checks again instead of being skipped.
    h.wait_for(|e| matches!(e, MonitorEvent::CheckFinished { .. }))
        .await;
    let status = h.handle.status().await.expect("status");
    assert!(*api.checks.lock().unwrap() >= 2);
    assert_eq!(status.view.stats.failures, 1);
}

#[tokio::test]
async fn visibility_triggers_check_while_active() {
    let mut h = Harness::spawn(quiet_config(true), ScriptedApi::default(), claims_page());

    h.handle.visibility_changed(true);
    let status = h.handle.status().await.expect("status");
    assert_eq!(status.view.stats.checks, 0);

    h.handle.start();
    h.wait_for(|e| matches!(e, MonitorEvent::CheckFinished { .. }))
        .await;
    h.handle.visibility_changed(false);
    h.handle.visibility_changed(true);
    h.wait_for(|e| matches!(e, MonitorEvent::CheckFinished { .. }))
        .await;

    let status = h.handle.status().await.expect("status");
    assert_eq!(status.view.stats.checks, 2);
}

#[tokio::test]
async fn shutdown_closes_the_monitor() {
    let h = Harness::spawn(quiet_config(true), ScriptedApi::default(), claims_page());

    h.handle.shutdown();
    tokio::time::timeout(Duration::from_secs(5), h.handle.closed())
        .await
        .expect("monitor exits");
    assert_eq!(h.handle.status().await, None);
}

#[tokio::test]
async fn end_to_end_against_http_server() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/dashboard/api/check-changes/"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "changes_detected": true,
            "changed_files": ["/srv/Data/claim_details.csv"],
            "total_files": 2
        })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/dashboard/api/force-reload/"))
        .and(header("X-CSRFToken", "cookie-token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "success": true,
            "total_claims": 1234,
            "total_claim_details": 7
        })))
        .expect(1)
        .mount(&server)
        .await;

    let api = ReqwestChangeApi::new(ClientSettings {
        base_url: server.uri(),
        ..ClientSettings::default()
    })
    .expect("valid settings");
    let page = MemoryPage::new("/dashboard/")
        .with_cookies("sessionid=s1; csrftoken=cookie-token")
        .with_element(Element::counter(CounterKind::Claims))
        .with_element(Element::container("dashboard-container"));
    let mut h = Harness::spawn(quiet_config(true), api, page);

    h.handle.start();
    let events = h.wait_for(is_ui_update).await;

    match events.last() {
        Some(MonitorEvent::UiUpdated(update)) => {
            assert_eq!(update.counts, COUNTS);
            assert!(matches!(
                &update.refresh,
                RefreshOutcome::Signalled(signal) if signal.container_id == "dashboard-container"
            ));
        }
        other => panic!("unexpected event {other:?}"),
    }
    assert_eq!(
        h.page.lock().unwrap().counter_texts(CounterKind::Claims),
        vec!["1,234"]
    );
}
