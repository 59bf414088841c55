//! End-to-end tests of the interceptor inside a simulated host.

use std::io::Write;
use std::sync::Arc;

use http::StatusCode;
use warden_core::PhaseOutcome;
use warden_interceptor::PhaseInterceptor;
use warden_plugin::{EvalEngine, EvaluationInvoker, PluginConfig, PluginHandle, PluginLoader};
use warden_test::{RecordingEngine, SimHost, SimRequest, SwitchableLoader};

fn interceptor_with(engine: Arc<RecordingEngine>) -> PhaseInterceptor {
    let engine: Arc<dyn EvalEngine> = engine;
    PhaseInterceptor::new(
        Arc::new(PluginHandle::preloaded(engine)),
        EvaluationInvoker::default(),
    )
}

fn interceptor_loading(loader: Arc<SwitchableLoader>, dir: &std::path::Path) -> PhaseInterceptor {
    let config = PluginConfig::default().with_working_dir(dir);
    let handle = PluginHandle::new(PluginLoader::with_module_loader(config, loader));
    PhaseInterceptor::new(Arc::new(handle), EvaluationInvoker::default())
}

// =============================================================================
// Configuration and sub-requests
// =============================================================================

#[test]
fn test_empty_rules_pass_through_without_evaluation() {
    let engine = RecordingEngine::denying();
    let host = SimHost::new(interceptor_with(Arc::clone(&engine)));

    let request = SimRequest::post("/upload").body("payload").build();
    host.submit(&request);

    assert_eq!(request.status(), Some(StatusCode::OK));
    assert_eq!(request.content_runs(), 1);
    assert_eq!(engine.call_count(), 0);
    assert_eq!(host.stats().body_reads, 0);
}

#[test]
fn test_subrequest_is_never_evaluated() {
    let engine = RecordingEngine::denying();
    let host = SimHost::new(interceptor_with(Arc::clone(&engine)));

    let request = SimRequest::get("/internal/auth")
        .rules("crs.conf")
        .subrequest()
        .build();
    host.submit(&request);

    assert_eq!(request.status(), Some(StatusCode::OK));
    assert_eq!(engine.call_count(), 0);
    assert_eq!(host.stats().body_reads, 0);
}

// =============================================================================
// Body acquisition
// =============================================================================

#[test]
fn test_buffered_body_is_evaluated_once() {
    let engine = RecordingEngine::allowing();
    let host = SimHost::new(interceptor_with(Arc::clone(&engine)));

    let request = SimRequest::post("/login")
        .request_id("req-42")
        .rules("crs.conf")
        .body("user=alice")
        .buffered()
        .build();
    host.submit(&request);

    assert_eq!(request.status(), Some(StatusCode::OK));
    assert_eq!(engine.call_count(), 1);
    assert_eq!(host.stats().body_reads, 0);

    let call = &engine.calls()[0];
    assert_eq!(call.request_id, "req-42");
    assert_eq!(call.rules, "crs.conf");
    assert_eq!(call.method, b"POST");
    assert_eq!(call.uri, b"/login");
    assert_eq!(call.body, b"user=alice");
}

#[test]
fn test_pending_body_suspends_then_resumes_once() {
    let engine = RecordingEngine::allowing();
    let host = SimHost::new(interceptor_with(Arc::clone(&engine)));

    let request = SimRequest::post("/comment")
        .rules("crs.conf")
        .body_chunks(["text=hello", "&lang=en"])
        .build();
    host.submit(&request);

    // Suspended: nothing evaluated, nothing finalized, later phases not run.
    assert!(request.status().is_none());
    assert_eq!(request.content_runs(), 0);
    assert_eq!(engine.call_count(), 0);
    assert_eq!(host.queued_reads(), 1);
    assert_eq!(request.pending_refs(), 2);

    assert_eq!(host.deliver_all(), 1);

    let stats = host.stats();
    assert_eq!(stats.body_reads, 1);
    assert_eq!(stats.resumes, 1);
    assert_eq!(stats.pipeline_runs, 2);
    assert_eq!(engine.call_count(), 1);
    assert_eq!(engine.calls()[0].body, b"text=hello&lang=en");

    assert_eq!(request.status(), Some(StatusCode::OK));
    assert_eq!(request.content_runs(), 1);
    assert_eq!(request.finalizations(), 1);
    assert_eq!(request.pending_refs(), 0);
}

#[test]
fn test_synchronous_read_completion() {
    let engine = RecordingEngine::allowing();
    let host = SimHost::new(interceptor_with(Arc::clone(&engine))).with_sync_reads();

    let request = SimRequest::post("/").rules("crs.conf").body("a=1").build();
    host.submit(&request);

    assert_eq!(host.queued_reads(), 0);
    assert_eq!(host.stats().resumes, 1);
    assert_eq!(engine.call_count(), 1);
    assert_eq!(request.status(), Some(StatusCode::OK));
    assert_eq!(request.finalizations(), 1);
    assert_eq!(request.pending_refs(), 0);
}

#[test]
fn test_body_read_failure_status_is_verbatim() {
    let engine = RecordingEngine::allowing();
    let host = SimHost::new(interceptor_with(Arc::clone(&engine)));

    let request = SimRequest::post("/upload")
        .rules("crs.conf")
        .read_failure(StatusCode::PAYLOAD_TOO_LARGE)
        .build();
    host.submit(&request);

    assert_eq!(request.status(), Some(StatusCode::PAYLOAD_TOO_LARGE));
    assert_eq!(engine.call_count(), 0);
    assert_eq!(request.content_runs(), 0);
    assert_eq!(request.pending_refs(), 0);
}

#[test]
fn test_body_read_failure_below_300_becomes_500() {
    let engine = RecordingEngine::allowing();
    let host = SimHost::new(interceptor_with(Arc::clone(&engine)));

    for status in [StatusCode::OK, StatusCode::NO_CONTENT] {
        let request = SimRequest::post("/upload")
            .rules("crs.conf")
            .read_failure(status)
            .build();
        host.submit(&request);

        assert_eq!(request.status(), Some(StatusCode::INTERNAL_SERVER_ERROR), "{status}");
        assert_eq!(request.content_runs(), 0);
        assert_eq!(request.pending_refs(), 0);
    }
    assert_eq!(engine.call_count(), 0);
}

#[test]
fn test_spilled_body_is_read_from_file() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(b"field=value&file=contents").unwrap();

    let engine = RecordingEngine::denying_body("contents");
    let host = SimHost::new(interceptor_with(Arc::clone(&engine)));

    let request = SimRequest::post("/upload")
        .rules("crs.conf")
        .spilled_body(file.path(), 25)
        .build();
    host.submit(&request);
    host.deliver_all();

    assert_eq!(engine.calls()[0].body, b"field=value&file=contents");
    assert_eq!(request.status(), Some(StatusCode::FORBIDDEN));
}

#[test]
fn test_abandoned_read_leaves_request_open() {
    let engine = RecordingEngine::allowing();
    let host = SimHost::new(interceptor_with(Arc::clone(&engine)));

    let request = SimRequest::post("/").rules("crs.conf").body("x").build();
    host.submit(&request);
    assert_eq!(host.abandon_reads(), 1);

    assert!(request.status().is_none());
    assert_eq!(engine.call_count(), 0);
    assert_eq!(host.stats().resumes, 0);
}

// =============================================================================
// Verdicts
// =============================================================================

#[test]
fn test_deny_rejects_with_403_and_stops_pipeline() {
    let engine = RecordingEngine::denying();
    let host = SimHost::new(interceptor_with(Arc::clone(&engine)));

    let request = SimRequest::get("/admin").rules("crs.conf").buffered().build();
    host.submit(&request);

    assert_eq!(request.status(), Some(StatusCode::FORBIDDEN));
    assert_eq!(request.content_runs(), 0);
    assert_eq!(engine.call_count(), 1);
}

#[test]
fn test_allow_continues_to_later_phases() {
    let engine = RecordingEngine::allowing();
    let host = SimHost::new(interceptor_with(Arc::clone(&engine)));

    let request = SimRequest::get("/").rules("crs.conf").buffered().build();
    host.submit(&request);

    assert_eq!(request.status(), Some(StatusCode::OK));
    assert_eq!(request.content_runs(), 1);
}

#[test]
fn test_handle_outcomes_directly() {
    let engine = RecordingEngine::denying();
    let interceptor = interceptor_with(Arc::clone(&engine));
    let host = SimHost::new(interceptor.clone());

    let disabled = SimRequest::get("/").build();
    let pending = SimRequest::post("/").rules("crs.conf").body("x").build();
    let ready = SimRequest::get("/").rules("crs.conf").buffered().build();

    assert_eq!(
        interceptor.handle(&host, &disabled, &"".into()),
        PhaseOutcome::Declined
    );
    assert_eq!(
        interceptor.handle(&host, &pending, &"crs.conf".into()),
        PhaseOutcome::Done
    );
    assert_eq!(
        interceptor.handle(&host, &ready, &"crs.conf".into()),
        PhaseOutcome::Reject(StatusCode::FORBIDDEN)
    );
}

// =============================================================================
// Plugin resolution
// =============================================================================

#[test]
fn test_plugin_resolved_once_across_requests() {
    let dir = tempfile::tempdir().unwrap();
    let engine = RecordingEngine::allowing();
    let loader = SwitchableLoader::present(engine.clone());
    let host = SimHost::new(interceptor_loading(Arc::clone(&loader), dir.path()));

    for _ in 0..3 {
        let request = SimRequest::get("/").rules("crs.conf").buffered().build();
        host.submit(&request);
        assert_eq!(request.status(), Some(StatusCode::OK));
    }

    assert_eq!(loader.attempts(), 1);
    assert_eq!(engine.call_count(), 3);
}

#[test]
fn test_load_failure_is_not_cached() {
    let dir = tempfile::tempdir().unwrap();
    let engine = RecordingEngine::allowing();
    let loader = SwitchableLoader::missing(engine.clone());
    let host = SimHost::new(interceptor_loading(Arc::clone(&loader), dir.path()));

    let first = SimRequest::post("/").rules("crs.conf").body("x").build();
    host.submit(&first);
    assert_eq!(first.status(), Some(StatusCode::INTERNAL_SERVER_ERROR));
    assert_eq!(host.stats().body_reads, 0);
    assert_eq!(engine.call_count(), 0);

    loader.set_available(true);

    let second = SimRequest::get("/").rules("crs.conf").buffered().build();
    host.submit(&second);
    assert_eq!(second.status(), Some(StatusCode::OK));
    assert_eq!(loader.attempts(), 2);
    assert_eq!(engine.call_count(), 1);
}

#[test]
fn test_module_in_working_directory_is_preferred() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("wardenengine.so"), b"").unwrap();

    let loader = SwitchableLoader::present(RecordingEngine::allowing());
    let host = SimHost::new(interceptor_loading(Arc::clone(&loader), dir.path()));

    let request = SimRequest::get("/").rules("crs.conf").buffered().build();
    host.submit(&request);

    assert_eq!(loader.paths(), vec![dir.path().join("wardenengine.so")]);
}

#[test]
fn test_disabled_route_never_loads_plugin() {
    let dir = tempfile::tempdir().unwrap();
    let loader = SwitchableLoader::missing(RecordingEngine::allowing());
    let host = SimHost::new(interceptor_loading(Arc::clone(&loader), dir.path()));

    let request = SimRequest::get("/").build();
    host.submit(&request);

    assert_eq!(request.status(), Some(StatusCode::OK));
    assert_eq!(loader.attempts(), 0);
}
