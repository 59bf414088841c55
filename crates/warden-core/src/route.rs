//! Per-route rule set configuration.

use serde::{Deserialize, Serialize};
use std::fmt;

/// The rule set identifier applied to requests handled under one route.
///
/// The value is a path or identifier understood by the evaluation engine.
/// An empty value means inspection is disabled for the route.
///
/// # Example
///
/// ```
/// use warden_core::RouteConfig;
///
/// let config = RouteConfig::new("/etc/warden/crs.conf");
/// assert!(config.is_enabled());
/// assert!(!RouteConfig::disabled().is_enabled());
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RouteConfig(String);

impl RouteConfig {
    /// Creates a route configuration naming a rule set.
    pub fn new(rules: impl Into<String>) -> Self {
        Self(rules.into())
    }

    /// Creates a configuration with inspection disabled.
    #[must_use]
    pub fn disabled() -> Self {
        Self(String::new())
    }

    /// Returns true if requests on this route must be inspected.
    #[must_use]
    pub fn is_enabled(&self) -> bool {
        !self.0.is_empty()
    }

    /// Returns the rule set identifier.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for RouteConfig {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for RouteConfig {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl AsRef<str> for RouteConfig {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RouteConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
