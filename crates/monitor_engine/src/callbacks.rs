use std::any::Any;
use std::panic::{self, AssertUnwindSafe};

use monitor_core::ChangeReport;
use thiserror::Error;

pub type ChangeCallback = Box<dyn FnMut(&ChangeReport) -> anyhow::Result<()> + Send>;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("change callback #{index} failed: {message}")]
pub struct CallbackError {
    /// Registration position, starting at zero.
    pub index: usize,
    pub message: String,
}

/// Append-only list of change listeners.
#[derive(Default)]
pub struct CallbackRegistry {
    callbacks: Vec<ChangeCallback>,
}

impl CallbackRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, callback: ChangeCallback) {
        self.callbacks.push(callback);
    }

    pub fn len(&self) -> usize {
        self.callbacks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.callbacks.is_empty()
    }

    /// Calls every callback in registration order. A callback that returns an
    /// error or panics is recorded and the rest still run.
    pub fn notify(&mut self, report: &ChangeReport) -> Vec<CallbackError> {
        let mut failures = Vec::new();
        for (index, callback) in self.callbacks.iter_mut().enumerate() {
            let message = match panic::catch_unwind(AssertUnwindSafe(|| callback(report))) {
                Ok(Ok(())) => continue,
                Ok(Err(err)) => format!("{err:#}"),
                Err(payload) => format!("panicked: {}", panic_message(payload.as_ref())),
            };
            failures.push(CallbackError { index, message });
        }
        failures
    }
}

pub(crate) fn panic_message(payload: &(dyn Any + Send)) -> &str {
    payload
        .downcast_ref::<&str>()
        .copied()
        .or_else(|| payload.downcast_ref::<String>().map(String::as_str))
        .unwrap_or("unknown panic")
}
