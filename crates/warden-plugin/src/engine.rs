//! The evaluation engine capability.

use std::fmt;
use warden_core::{FileReadFn, InspectedRequest};

/// An evaluation engine: one call, one allow/deny answer.
///
/// The engine's rules are opaque to Warden. Implementations must be
/// callable from any thread because the pooled execution strategy runs
/// evaluations off the calling thread.
pub trait EvalEngine: Send + Sync {
    /// Returns a short name for logs.
    fn name(&self) -> &str {
        "engine"
    }

    /// Evaluates `request` against the rule set named by `rules`.
    ///
    /// Returns `true` to allow and `false` to deny. `read_file` is the
    /// capability used to read bodies the host spilled to disk.
    fn evaluate(
        &self,
        request_id: &str,
        rules: &str,
        request: &dyn InspectedRequest,
        read_file: FileReadFn,
    ) -> bool;
}

impl fmt::Debug for dyn EvalEngine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EvalEngine").field("name", &self.name()).finish()
    }
}

/// An engine that can be created from a closure.
///
/// # Example
///
/// ```
/// use warden_plugin::{EvalEngine, FnEngine};
/// use warden_core::{read_file_at, RequestSnapshot};
///
/// let engine = FnEngine::new("block-admin", |_id, _rules, request| {
///     !request.uri().starts_with(b"/admin")
/// });
///
/// let request = RequestSnapshot::new("GET", "/admin/users");
/// assert!(!engine.evaluate("", "rules.conf", &request, read_file_at));
/// ```
pub struct FnEngine<F> {
    name: &'static str,
    func: F,
}

impl<F> FnEngine<F>
where
    F: Fn(&str, &str, &dyn InspectedRequest) -> bool + Send + Sync,
{
    /// Creates a new function-based engine.
    pub const fn new(name: &'static str, func: F) -> Self {
        Self { name, func }
    }
}

impl<F> EvalEngine for FnEngine<F>
where
    F: Fn(&str, &str, &dyn InspectedRequest) -> bool + Send + Sync,
{
    fn name(&self) -> &str {
        self.name
    }

    fn evaluate(
        &self,
        request_id: &str,
        rules: &str,
        request: &dyn InspectedRequest,
        _read_file: FileReadFn,
    ) -> bool {
        (self.func)(request_id, rules, request)
    }
}
