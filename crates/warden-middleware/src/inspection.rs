//! Request inspection stage.
//!
//! Runs the evaluation engine against fully buffered requests:
//!
//! ```text
//! Request → [Inspection] → ... → Handler
//!               │
//!               ├─ rules empty      → next
//!               ├─ engine missing   → 500
//!               ├─ Allow            → next
//!               ├─ Deny             → 403
//!               └─ LoadError        → 500
//! ```
//!
//! The request identifier is taken from the `x-request-id` header. The body
//! is handed to the engine as a single in-memory buffer and passed on to the
//! next stage unchanged. Header values reach the engine byte for byte.
//! Requests whose path maps to no location are rejected with 400.

use std::fmt;
use std::sync::Arc;

use bytes::Bytes;
use http::request::Parts;
use http::StatusCode;
use http_body_util::{BodyExt, Full};
use tracing::{debug, error, info};
use warden_core::{PhaseOutcome, RequestBody, RequestSnapshot, RouteConfig, Verdict};
use warden_plugin::{EvaluationInvoker, PluginHandle};
use warden_telemetry::metrics::record_outcome;

use crate::context::MiddlewareContext;
use crate::middleware::{BoxFuture, Middleware, Next};
use crate::types::{Request, Response, ResponseExt, REQUEST_ID_HEADER};

/// Chooses the rule set for a request.
pub trait RouteResolver: Send + Sync + 'static {
    /// Returns the rule set for `request`; an empty one disables inspection.
    ///
    /// `None` means the request maps to no location, for example because its
    /// path climbs above the root. Such requests are rejected.
    fn resolve(&self, request: &Request) -> Option<RouteConfig>;
}

impl RouteResolver for RouteConfig {
    fn resolve(&self, _request: &Request) -> Option<RouteConfig> {
        Some(self.clone())
    }
}

impl<F> RouteResolver for F
where
    F: Fn(&Request) -> Option<RouteConfig> + Send + Sync + 'static,
{
    fn resolve(&self, request: &Request) -> Option<RouteConfig> {
        self(request)
    }
}

/// Middleware that asks the evaluation engine whether a request may proceed.
#[derive(Clone)]
pub struct InspectionMiddleware {
    plugin: Arc<PluginHandle>,
    invoker: EvaluationInvoker,
    routes: Arc<dyn RouteResolver>,
}

impl fmt::Debug for InspectionMiddleware {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InspectionMiddleware")
            .field("plugin", &self.plugin)
            .field("invoker", &self.invoker)
            .finish_non_exhaustive()
    }
}

impl InspectionMiddleware {
    /// Creates the middleware.
    pub fn new(
        plugin: Arc<PluginHandle>,
        invoker: EvaluationInvoker,
        routes: impl RouteResolver,
    ) -> Self {
        Self {
            plugin,
            invoker,
            routes: Arc::new(routes),
        }
    }

    async fn inspect(
        &self,
        ctx: &mut MiddlewareContext,
        rules: RouteConfig,
        parts: &Parts,
        body: Bytes,
    ) -> PhaseOutcome {
        let engine = match self.plugin.resolve() {
            Ok(engine) => engine,
            Err(e) => {
                error!(request_id = ctx.request_id(), error = %e, "evaluation engine unavailable");
                return PhaseOutcome::Reject(StatusCode::INTERNAL_SERVER_ERROR);
            }
        };

        let snapshot = Arc::new(snapshot(parts, body));
        let verdict = self
            .invoker
            .evaluate(engine, ctx.request_id().to_string(), rules.clone(), snapshot)
            .await;
        ctx.set_verdict(verdict);

        match verdict {
            Verdict::Allow => debug!(request_id = ctx.request_id(), rules = %rules, "request allowed"),
            Verdict::Deny => info!(
                request_id = ctx.request_id(),
                rules = %rules,
                uri = %parts.uri,
                "request denied"
            ),
            Verdict::LoadError => error!(request_id = ctx.request_id(), rules = %rules, "evaluation failed"),
        }
        verdict.into_outcome()
    }
}

impl Middleware for InspectionMiddleware {
    fn name(&self) -> &'static str {
        "inspection"
    }

    fn process<'a>(
        &'a self,
        ctx: &'a mut MiddlewareContext,
        request: Request,
        next: Next<'a>,
    ) -> BoxFuture<'a, Response> {
        Box::pin(async move {
            if let Some(id) = request
                .headers()
                .get(REQUEST_ID_HEADER)
                .and_then(|v| v.to_str().ok())
            {
                ctx.set_request_id(id);
            }

            let Some(rules) = self.routes.resolve(&request) else {
                info!(
                    request_id = ctx.request_id(),
                    path = request.uri().path(),
                    "request path maps to no location"
                );
                record_outcome(PhaseOutcome::Reject(StatusCode::BAD_REQUEST).as_str());
                return Response::error(StatusCode::BAD_REQUEST, "Bad Request");
            };
            ctx.set_rules(rules.clone());
            if !rules.is_enabled() {
                record_outcome(PhaseOutcome::Declined.as_str());
                return next.run(ctx, request).await;
            }

            let (parts, body) = request.into_parts();
            let body = collect(body).await;

            let outcome = self.inspect(ctx, rules, &parts, body.clone()).await;
            record_outcome(outcome.as_str());

            match outcome {
                PhaseOutcome::Declined => {
                    next.run(ctx, Request::from_parts(parts, Full::new(body))).await
                }
                PhaseOutcome::Reject(status) => {
                    Response::error(status, status.canonical_reason().unwrap_or("Rejected"))
                }
                // Buffered bodies never suspend.
                PhaseOutcome::Done => Response::error(
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal Server Error",
                ),
            }
        })
    }
}

async fn collect(body: Full<Bytes>) -> Bytes {
    match body.collect().await {
        Ok(collected) => collected.to_bytes(),
        Err(never) => match never {},
    }
}

fn snapshot(parts: &Parts, body: Bytes) -> RequestSnapshot {
    let mut snapshot = RequestSnapshot::new(parts.method.as_str(), parts.uri.to_string());
    for (name, value) in &parts.headers {
        snapshot = snapshot.with_header(name.as_str(), value.as_bytes());
    }
    snapshot.with_body(RequestBody::from_bytes(body))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_snapshot_copies_request() {
        let request = http::Request::builder()
            .method("POST")
            .uri("/search?q=1")
            .header("content-type", "text/plain")
            .body(())
            .unwrap();
        let (parts, ()) = request.into_parts();

        let snapshot = snapshot(&parts, Bytes::from_static(b"hello"));
        assert_eq!(warden_core::InspectedRequest::method(&snapshot), b"POST");
        assert_eq!(warden_core::InspectedRequest::uri(&snapshot), b"/search?q=1");
        assert_eq!(snapshot.header("Content-Type"), Some(&b"text/plain"[..]));
        assert_eq!(warden_core::InspectedRequest::body(&snapshot).len(), 5);
    }

    #[test]
    fn test_fixed_route_resolver() {
        let rules = RouteConfig::new("crs.conf");
        let request = http::Request::builder()
            .body(Full::new(Bytes::new()))
            .unwrap();
        assert_eq!(rules.resolve(&request), Some(RouteConfig::new("crs.conf")));
    }

    #[test]
    fn test_snapshot_keeps_obs_text_header_bytes() {
        let raw = b"\xc0\xbcscript\xc0\xbe";
        let request = http::Request::builder()
            .uri("/")
            .header("x-payload", http::HeaderValue::from_bytes(raw).unwrap())
            .body(())
            .unwrap();
        let (parts, ()) = request.into_parts();

        let snapshot = snapshot(&parts, Bytes::new());
        assert_eq!(snapshot.header("x-payload"), Some(&raw[..]));
    }
}
