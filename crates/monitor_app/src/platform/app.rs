use std::sync::Arc;

use monitor_core::{format_count, MonitorConfig};
use monitor_engine::{
    ChangeMonitor, CounterKind, Element, LogObserver, MemoryPage, MonitorHandle, ReqwestChangeApi,
    CSRF_FORM_FIELD,
};
use monitor_logging::{monitor_error, monitor_info, monitor_warn};
use tokio::io::{AsyncBufReadExt, BufReader};

use super::cli::Cli;
use super::config::Settings;
use super::console::ConsoleCommand;
use super::logging;

pub async fn run_app(cli: Cli) -> anyhow::Result<()> {
    let mut settings = match &cli.config {
        Some(path) => Settings::load(path)?,
        None => Settings::default(),
    };
    settings.apply_cli(&cli);

    logging::initialize(
        settings.log_destination,
        monitor_logging::parse_level(&settings.log_level),
    );
    monitor_info!(
        "data_monitor v{} polling {} every {} ms (auto-reload: {})",
        env!("CARGO_PKG_VERSION"),
        settings.base_url,
        settings.poll_interval_ms,
        settings.auto_reload
    );

    let config = settings.monitor_config()?;
    let api = ReqwestChangeApi::new(settings.client_settings()?)?;
    let page = headless_page(&settings, &config);

    let handle = ChangeMonitor::spawn(
        config,
        Arc::new(api),
        Box::new(page),
        Arc::new(LogObserver),
    );
    handle.register_change_callback(|report| {
        if !report.changed_files.is_empty() {
            monitor_info!("Changed files: {}", report.changed_files.join(", "));
        }
        Ok(())
    });
    handle.start();

    run_console(&handle).await;

    handle.shutdown();
    handle.closed().await;
    monitor_info!("data_monitor stopped");
    Ok(())
}

/// Mirrors the counters and section containers the dashboard templates render.
fn headless_page(settings: &Settings, config: &MonitorConfig) -> MemoryPage {
    let mut page = MemoryPage::new(settings.page_path.clone())
        .with_delegated_refresh(settings.delegated_refresh)
        .with_element(Element::counter(CounterKind::Claims))
        .with_element(Element::counter(CounterKind::ClaimDetails));
    for route in config.routes.routes() {
        page = page.with_element(Element::container(route.container_id.clone()));
    }
    if let Some(token) = &settings.csrf_token {
        page = page.with_form_field(CSRF_FORM_FIELD, token.clone());
    }
    if let Some(cookie) = &settings.cookie {
        page = page.with_cookies(cookie.clone());
    }
    page
}

/// Reads commands until `quit` or Ctrl+C. End of input only stops reading.
async fn run_console(handle: &MonitorHandle) {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut stdin_open = true;
    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);

    loop {
        tokio::select! {
            result = &mut ctrl_c => {
                if let Err(err) = result {
                    monitor_error!("Failed to listen for Ctrl+C: {}", err);
                }
                monitor_info!("Shutting down");
                return;
            }
            line = lines.next_line(), if stdin_open => match line {
                Ok(Some(line)) => match ConsoleCommand::parse(&line) {
                    Some(ConsoleCommand::Quit) => return,
                    Some(command) => execute(handle, command).await,
                    None if line.trim().is_empty() => {}
                    None => monitor_warn!(
                        "Unknown command {:?}; expected one of: {}",
                        line.trim(),
                        ConsoleCommand::HELP
                    ),
                },
                Ok(None) => stdin_open = false,
                Err(err) => {
                    monitor_warn!("Stopped reading commands: {}", err);
                    stdin_open = false;
                }
            },
        }
    }
}

async fn execute(handle: &MonitorHandle, command: ConsoleCommand) {
    match command {
        ConsoleCommand::Check => handle.manual_check(),
        ConsoleCommand::Reload => handle.manual_reload(),
        ConsoleCommand::Start => handle.start(),
        ConsoleCommand::Stop => handle.stop(),
        ConsoleCommand::Show => handle.visibility_changed(true),
        ConsoleCommand::Hide => handle.visibility_changed(false),
        ConsoleCommand::Status => match handle.status().await {
            Some(status) => {
                let view = status.view;
                let counts = view
                    .last_counts
                    .map(|c| {
                        format!(
                            "{} claims, {} details",
                            format_count(c.total_claims),
                            format_count(c.total_claim_details)
                        )
                    })
                    .unwrap_or_else(|| "no reload yet".to_string());
                let last_check = view
                    .last_known_status
                    .as_ref()
                    .and_then(|report| report.last_check)
                    .map(|at| at.to_rfc3339())
                    .unwrap_or_else(|| "-".to_string());
                println!(
                    "active={} in_flight={:?} path={} callbacks={} last_check={} counts=[{}]",
                    view.active,
                    view.in_flight,
                    status.location_path,
                    status.registered_callbacks,
                    last_check,
                    counts
                );
                println!(
                    "checks={} changes={} reloads={} failures={} skipped={}",
                    view.stats.checks,
                    view.stats.changes,
                    view.stats.reloads,
                    view.stats.failures,
                    view.stats.skipped
                );
            }
            None => monitor_warn!("Monitor is not running"),
        },
        ConsoleCommand::Quit => {}
    }
}
