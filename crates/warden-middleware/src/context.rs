//! Per-request state carried through the middleware chain.

use std::time::{Duration, Instant};

use warden_core::{RouteConfig, Verdict};

/// Context that flows through the middleware chain.
///
/// The inspection stage records what it decided here so that later stages
/// and the handler can observe it.
#[derive(Debug, Clone)]
pub struct MiddlewareContext {
    request_id: String,
    rules: RouteConfig,
    verdict: Option<Verdict>,
    started_at: Instant,
}

impl Default for MiddlewareContext {
    fn default() -> Self {
        Self::new()
    }
}

impl MiddlewareContext {
    /// Creates an empty context.
    #[must_use]
    pub fn new() -> Self {
        Self {
            request_id: String::new(),
            rules: RouteConfig::disabled(),
            verdict: None,
            started_at: Instant::now(),
        }
    }

    /// Returns the request identifier, empty if the client sent none.
    #[must_use]
    pub fn request_id(&self) -> &str {
        &self.request_id
    }

    /// Sets the request identifier.
    pub fn set_request_id(&mut self, request_id: impl Into<String>) {
        self.request_id = request_id.into();
    }

    /// Returns the rule set the request was inspected against.
    #[must_use]
    pub fn rules(&self) -> &RouteConfig {
        &self.rules
    }

    /// Sets the rule set.
    pub fn set_rules(&mut self, rules: RouteConfig) {
        self.rules = rules;
    }

    /// Returns the verdict, `None` if the request was not evaluated.
    #[must_use]
    pub fn verdict(&self) -> Option<Verdict> {
        self.verdict
    }

    /// Records the verdict.
    pub fn set_verdict(&mut self, verdict: Verdict) {
        self.verdict = Some(verdict);
    }

    /// Returns the time elapsed since the context was created.
    #[must_use]
    pub fn elapsed(&self) -> Duration {
        self.started_at.elapsed()
    }
}
