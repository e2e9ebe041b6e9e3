use crate::{ApiError, Effect, FailureKind, MonitorState, Msg, Operation, Trigger};

/// Pure update function: applies a message to state and returns any effects.
///
/// Effects must be executed in order; `NotifyChange` always precedes the
/// `ForceReload` it leads to.
pub fn update(mut state: MonitorState, msg: Msg) -> (MonitorState, Vec<Effect>) {
    let effects = match msg {
        Msg::Start => {
            state.set_active(true);
            begin(&mut state, Operation::Check, Trigger::Start)
        }
        Msg::Stop => {
            state.set_active(false);
            Vec::new()
        }
        Msg::Tick if state.is_active() => begin(&mut state, Operation::Check, Trigger::Tick),
        Msg::VisibilityChanged { visible: true } if state.is_active() => {
            begin(&mut state, Operation::Check, Trigger::Visibility)
        }
        Msg::ManualCheck => begin(&mut state, Operation::Check, Trigger::ManualCheck),
        Msg::ManualReload => begin(&mut state, Operation::Reload, Trigger::ManualReload),
        Msg::CheckCompleted(Ok(report)) => {
            state.finish();
            let changed = report.changes_detected;
            state.record_status(report.clone());
            if !changed {
                return (state, Vec::new());
            }
            let mut effects = vec![Effect::NotifyChange(report)];
            if state.auto_reload() {
                // The reload belongs to this cycle; it stays in flight until
                // `ReloadCompleted` arrives.
                state.begin(Operation::Reload);
                effects.push(Effect::ForceReload);
            }
            effects
        }
        Msg::CheckCompleted(Err(error)) => fail(&mut state, Operation::Check, error),
        Msg::ReloadCompleted(Ok(result)) => {
            state.finish();
            match result.counts.filter(|_| result.success) {
                Some(counts) => {
                    state.record_counts(counts);
                    vec![Effect::ApplyUiUpdate(counts)]
                }
                None => {
                    let message = result
                        .message
                        .unwrap_or_else(|| "reload reported failure".to_string());
                    fail(
                        &mut state,
                        Operation::Reload,
                        ApiError::new(FailureKind::Rejected, message),
                    )
                }
            }
        }
        Msg::ReloadCompleted(Err(error)) => fail(&mut state, Operation::Reload, error),
        Msg::Tick | Msg::VisibilityChanged { .. } => Vec::new(),
    };

    (state, effects)
}

fn begin(state: &mut MonitorState, operation: Operation, trigger: Trigger) -> Vec<Effect> {
    if let Some(in_flight) = state.in_flight() {
        state.record_skip();
        return vec![Effect::ReportSkipped { trigger, in_flight }];
    }
    state.begin(operation);
    match operation {
        Operation::Check => vec![Effect::CheckForChanges],
        Operation::Reload => vec![Effect::ForceReload],
    }
}

fn fail(state: &mut MonitorState, operation: Operation, error: ApiError) -> Vec<Effect> {
    state.finish();
    state.record_failure();
    vec![Effect::ReportFailure { operation, error }]
}
