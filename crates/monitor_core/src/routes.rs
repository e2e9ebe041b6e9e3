use serde::Deserialize;
use thiserror::Error;

/// Trigger name the page templates listen for on their containers.
pub const DEFAULT_REFRESH_EVENT: &str = "refresh";

/// Maps a navigation path fragment to the container that should refresh.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Route {
    /// Matched as a substring of the current path, e.g. `/claims/`.
    pub pattern: String,
    /// Element id of the refreshable region, without a leading `#`.
    pub container_id: String,
    #[serde(default = "default_event")]
    pub event: String,
}

impl Route {
    pub fn new(pattern: impl Into<String>, container_id: impl Into<String>) -> Self {
        Self {
            pattern: pattern.into(),
            container_id: container_id.into(),
            event: default_event(),
        }
    }

    fn validate(&self) -> Result<(), RouteError> {
        if self.pattern.is_empty() {
            return Err(RouteError::EmptyPattern);
        }
        if self.pattern.len() < 2 || !self.pattern.starts_with('/') || !self.pattern.ends_with('/')
        {
            return Err(RouteError::PatternNotDelimited(self.pattern.clone()));
        }
        let id = &self.container_id;
        if id.is_empty() || id.contains('#') || id.chars().any(char::is_whitespace) {
            return Err(RouteError::InvalidContainerId {
                pattern: self.pattern.clone(),
                container_id: id.clone(),
            });
        }
        if self.event.trim().is_empty() {
            return Err(RouteError::EmptyEvent(self.pattern.clone()));
        }
        Ok(())
    }
}

fn default_event() -> String {
    DEFAULT_REFRESH_EVENT.to_string()
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RouteError {
    #[error("route pattern is empty")]
    EmptyPattern,
    #[error("route pattern {0:?} must start and end with '/'")]
    PatternNotDelimited(String),
    #[error("route pattern {0:?} appears more than once")]
    DuplicatePattern(String),
    #[error("route {pattern:?} has invalid container id {container_id:?}")]
    InvalidContainerId {
        pattern: String,
        container_id: String,
    },
    #[error("route {0:?} has an empty event name")]
    EmptyEvent(String),
}

/// Ordered, validated route list. The first matching pattern wins.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteTable {
    routes: Vec<Route>,
}

impl RouteTable {
    pub fn new(routes: Vec<Route>) -> Result<Self, RouteError> {
        for (i, route) in routes.iter().enumerate() {
            route.validate()?;
            if routes[..i].iter().any(|prev| prev.pattern == route.pattern) {
                return Err(RouteError::DuplicatePattern(route.pattern.clone()));
            }
        }
        Ok(Self { routes })
    }

    pub fn resolve(&self, path: &str) -> Option<&Route> {
        self.routes
            .iter()
            .find(|route| path.contains(route.pattern.as_str()))
    }

    pub fn routes(&self) -> &[Route] {
        &self.routes
    }
}

impl Default for RouteTable {
    fn default() -> Self {
        // Dashboard is last: section pages live below `/dashboard/`.
        Self {
            routes: vec![
                Route::new("/claims/", "claims-container"),
                Route::new("/claim-details/", "claim-details-container"),
                Route::new("/analytics/", "analytics-container"),
                Route::new("/dashboard/", "dashboard-container"),
            ],
        }
    }
}
