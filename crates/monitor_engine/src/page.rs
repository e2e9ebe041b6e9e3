use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, PoisonError};

use thiserror::Error;

/// Counter displays the templates mark with a data attribute.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CounterKind {
    Claims,
    ClaimDetails,
}

impl CounterKind {
    pub fn attribute(self) -> &'static str {
        match self {
            CounterKind::Claims => "data-claims-count",
            CounterKind::ClaimDetails => "data-details-count",
        }
    }
}

/// A named trigger dispatched on a container through the delegated refresh
/// mechanism.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RefreshSignal {
    pub container_id: String,
    pub event: String,
}

impl RefreshSignal {
    pub fn selector(&self) -> String {
        format!("#{}", self.container_id)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PageError {
    #[error("no element matches {0}")]
    MissingTarget(String),
    #[error("refresh dispatch failed: {0}")]
    Dispatch(String),
}

/// What the monitor needs from the document it runs in.
pub trait Page: Send {
    /// Current navigation path, e.g. `/dashboard/claims/`.
    fn location_path(&self) -> String;

    fn form_value(&self, name: &str) -> Option<String>;

    fn cookies(&self) -> Option<String>;

    /// Replaces the text of every element carrying the counter's attribute.
    /// Returns how many elements were touched.
    fn set_counter_text(&mut self, counter: CounterKind, text: &str) -> usize;

    fn has_delegated_refresh(&self) -> bool;

    fn trigger_refresh(&mut self, signal: &RefreshSignal) -> Result<(), PageError>;

    /// Full navigation reload.
    fn reload(&mut self);
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Element {
    pub id: Option<String>,
    pub attributes: Vec<String>,
    pub text: String,
}

impl Element {
    pub fn counter(kind: CounterKind) -> Self {
        Self {
            id: None,
            attributes: vec![kind.attribute().to_string()],
            text: String::new(),
        }
    }

    pub fn container(id: impl Into<String>) -> Self {
        Self {
            id: Some(id.into()),
            ..Self::default()
        }
    }

    pub fn has_attribute(&self, name: &str) -> bool {
        self.attributes.iter().any(|attr| attr == name)
    }
}

/// In-memory document: holds elements, records refresh signals and reloads.
#[derive(Debug, Clone, Default)]
pub struct MemoryPage {
    path: String,
    form_fields: BTreeMap<String, String>,
    cookies: Option<String>,
    elements: Vec<Element>,
    delegated_refresh: bool,
    triggered: Vec<RefreshSignal>,
    reloads: usize,
}

impl MemoryPage {
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            delegated_refresh: true,
            ..Self::default()
        }
    }

    pub fn with_element(mut self, element: Element) -> Self {
        self.elements.push(element);
        self
    }

    pub fn with_form_field(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.form_fields.insert(name.into(), value.into());
        self
    }

    pub fn with_cookies(mut self, cookies: impl Into<String>) -> Self {
        self.cookies = Some(cookies.into());
        self
    }

    pub fn with_delegated_refresh(mut self, available: bool) -> Self {
        self.delegated_refresh = available;
        self
    }

    pub fn counter_texts(&self, counter: CounterKind) -> Vec<&str> {
        self.elements
            .iter()
            .filter(|el| el.has_attribute(counter.attribute()))
            .map(|el| el.text.as_str())
            .collect()
    }

    pub fn triggered(&self) -> &[RefreshSignal] {
        &self.triggered
    }

    pub fn reload_count(&self) -> usize {
        self.reloads
    }
}

impl Page for MemoryPage {
    fn location_path(&self) -> String {
        self.path.clone()
    }

    fn form_value(&self, name: &str) -> Option<String> {
        self.form_fields.get(name).cloned()
    }

    fn cookies(&self) -> Option<String> {
        self.cookies.clone()
    }

    fn set_counter_text(&mut self, counter: CounterKind, text: &str) -> usize {
        let mut touched = 0;
        for element in self
            .elements
            .iter_mut()
            .filter(|el| el.has_attribute(counter.attribute()))
        {
            element.text = text.to_string();
            touched += 1;
        }
        touched
    }

    fn has_delegated_refresh(&self) -> bool {
        self.delegated_refresh
    }

    fn trigger_refresh(&mut self, signal: &RefreshSignal) -> Result<(), PageError> {
        let exists = self
            .elements
            .iter()
            .any(|el| el.id.as_deref() == Some(signal.container_id.as_str()));
        if !exists {
            return Err(PageError::MissingTarget(signal.selector()));
        }
        self.triggered.push(signal.clone());
        Ok(())
    }

    fn reload(&mut self) {
        self.reloads += 1;
    }
}

/// Lets a caller keep inspecting a page the monitor owns.
impl<P: Page> Page for Arc<Mutex<P>> {
    fn location_path(&self) -> String {
        self.lock().unwrap_or_else(PoisonError::into_inner).location_path()
    }

    fn form_value(&self, name: &str) -> Option<String> {
        self.lock().unwrap_or_else(PoisonError::into_inner).form_value(name)
    }

    fn cookies(&self) -> Option<String> {
        self.lock().unwrap_or_else(PoisonError::into_inner).cookies()
    }

    fn set_counter_text(&mut self, counter: CounterKind, text: &str) -> usize {
        self.lock()
            .unwrap_or_else(PoisonError::into_inner)
            .set_counter_text(counter, text)
    }

    fn has_delegated_refresh(&self) -> bool {
        self.lock()
            .unwrap_or_else(PoisonError::into_inner)
            .has_delegated_refresh()
    }

    fn trigger_refresh(&mut self, signal: &RefreshSignal) -> Result<(), PageError> {
        self.lock()
            .unwrap_or_else(PoisonError::into_inner)
            .trigger_refresh(signal)
    }

    fn reload(&mut self) {
        self.lock().unwrap_or_else(PoisonError::into_inner).reload()
    }
}
