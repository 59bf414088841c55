//! The per-request entry point.

use std::sync::Arc;

use http::StatusCode;
use tracing::{debug, error, info};
use warden_core::{PhaseOutcome, RouteConfig, Verdict};
use warden_plugin::{EvaluationInvoker, PluginHandle};
use warden_telemetry::metrics::record_outcome;

use crate::body::{Acquisition, BodyAcquisitionController};
use crate::host::{BodyHost, HostRequest, ReadyRequest};
use crate::phase::Phase;
use crate::pipeline::PhaseHandler;

/// Decides, per request, whether the host pipeline continues.
///
/// One instance serves every request of a host. It holds no per-request
/// state; a suspended request carries its state in its
/// [`ContinuationToken`](crate::ContinuationToken).
///
/// # Example
///
/// ```ignore
/// let interceptor = PhaseInterceptor::new(plugin, EvaluationInvoker::default());
///
/// match interceptor.handle(&host, &request, request.route_config()) {
///     PhaseOutcome::Declined => { /* next handler */ }
///     PhaseOutcome::Done => { /* wait for the continuation */ }
///     PhaseOutcome::Reject(status) => { /* finalize with status */ }
/// }
/// ```
#[derive(Debug, Clone)]
pub struct PhaseInterceptor {
    plugin: Arc<PluginHandle>,
    invoker: EvaluationInvoker,
    bodies: BodyAcquisitionController,
}

impl PhaseInterceptor {
    /// Phase the interceptor is registered at.
    pub const PHASE: Phase = Phase::PreAccess;

    /// Creates an interceptor over a shared plugin handle.
    pub fn new(plugin: Arc<PluginHandle>, invoker: EvaluationInvoker) -> Self {
        Self {
            plugin,
            invoker,
            bodies: BodyAcquisitionController::new(),
        }
    }

    /// Returns the plugin handle.
    pub fn plugin(&self) -> &Arc<PluginHandle> {
        &self.plugin
    }

    /// Handles one request with the rule set of its location.
    pub fn handle<H: BodyHost>(
        &self,
        host: &H,
        request: &H::Request,
        rules: &RouteConfig,
    ) -> PhaseOutcome {
        let outcome = self.decide(host, request, rules);
        record_outcome(outcome.as_str());
        outcome
    }

    fn decide<H: BodyHost>(&self, host: &H, request: &H::Request, rules: &RouteConfig) -> PhaseOutcome {
        let request_id = request.request_id();

        if !rules.is_enabled() {
            return PhaseOutcome::Declined;
        }
        if !request.is_main() {
            debug!(request_id, "skipping sub-request");
            return PhaseOutcome::Declined;
        }

        let engine = match self.plugin.resolve() {
            Ok(engine) => engine,
            Err(e) => {
                error!(request_id, error = %e, "evaluation engine unavailable");
                return PhaseOutcome::Reject(StatusCode::INTERNAL_SERVER_ERROR);
            }
        };

        let body = match self.bodies.acquire(host, request) {
            Acquisition::Ready(body) => body,
            Acquisition::Pending => return PhaseOutcome::Done,
            Acquisition::Failed(status) => return PhaseOutcome::Reject(status),
        };

        let ready = ReadyRequest::new(request, body);
        let verdict = self
            .invoker
            .evaluate_blocking(engine.as_ref(), request_id, rules, &ready);

        match verdict {
            Verdict::Allow => debug!(request_id, rules = %rules, "request allowed"),
            Verdict::Deny => info!(
                request_id,
                rules = %rules,
                uri = %String::from_utf8_lossy(request.uri()),
                "request denied"
            ),
            Verdict::LoadError => error!(request_id, rules = %rules, "evaluation failed"),
        }
        verdict.into_outcome()
    }
}

impl<H: BodyHost> PhaseHandler<H> for PhaseInterceptor {
    fn name(&self) -> &'static str {
        "warden"
    }

    fn handle(&self, host: &H, request: &H::Request) -> PhaseOutcome {
        Self::handle(self, host, request, request.route_config())
    }
}
