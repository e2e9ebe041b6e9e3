use monitor_core::{format_count, ClaimCounts, RouteTable};

use crate::page::{CounterKind, Page, PageError, RefreshSignal};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RefreshOutcome {
    /// Delegated refresh signal dispatched on the section container.
    Signalled(RefreshSignal),
    /// No delegated refresh mechanism; the whole page was reloaded.
    FullReload,
    /// Current path belongs to no known section.
    NoRoute,
    Failed {
        signal: RefreshSignal,
        error: PageError,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UiUpdate {
    pub counts: ClaimCounts,
    pub counters_updated: usize,
    pub refresh: RefreshOutcome,
}

/// Patches the counter displays, then refreshes the section the page is on.
pub fn apply_ui_update(page: &mut dyn Page, routes: &RouteTable, counts: ClaimCounts) -> UiUpdate {
    let claims_text = format_count(counts.total_claims);
    let details_text = format_count(counts.total_claim_details);
    let counters_updated = page.set_counter_text(CounterKind::Claims, &claims_text)
        + page.set_counter_text(CounterKind::ClaimDetails, &details_text);

    let path = page.location_path();
    let refresh = match routes.resolve(&path) {
        None => RefreshOutcome::NoRoute,
        Some(_) if !page.has_delegated_refresh() => {
            page.reload();
            RefreshOutcome::FullReload
        }
        Some(route) => {
            let signal = RefreshSignal {
                container_id: route.container_id.clone(),
                event: route.event.clone(),
            };
            match page.trigger_refresh(&signal) {
                Ok(()) => RefreshOutcome::Signalled(signal),
                Err(error) => RefreshOutcome::Failed { signal, error },
            }
        }
    };

    UiUpdate {
        counts,
        counters_updated,
        refresh,
    }
}
