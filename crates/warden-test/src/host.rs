//! The simulated host server.

use std::cell::{Cell, RefCell};
use std::collections::VecDeque;
use std::rc::Rc;

use http::StatusCode;
use tracing::debug;
use warden_core::{BodyError, PhaseOutcome};
use warden_interceptor::{
    BodyHost, ContinuationToken, Phase, PhaseHandler, PhaseInterceptor, PhasePipeline,
    PhasePipelineBuilder, PipelineRun,
};

use crate::request::SimRequest;

/// Counters kept by the host across all requests.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct HostStats {
    /// Body reads started on behalf of the interceptor.
    pub body_reads: u32,
    /// Pending references released through a continuation.
    pub resumes: u32,
    /// Pipeline runs, including re-runs after a resume.
    pub pipeline_runs: u32,
}

/// A single-threaded host with a phase pipeline and deferred body reads.
///
/// Requests enter through [`submit`](Self::submit), which takes the initial
/// host reference and runs the pipeline. A completed run is finalized with
/// `200 OK`, a rejected one with the rejecting status; each finalization
/// releases one reference. Body reads take an extra reference and are
/// queued until [`deliver_next`](Self::deliver_next) or
/// [`deliver_all`](Self::deliver_all), unless the host was built with
/// synchronous reads.
pub struct SimHost {
    pipeline: PhasePipeline<SimHost>,
    sync_reads: bool,
    deliveries: RefCell<VecDeque<(Rc<SimRequest>, ContinuationToken)>>,
    stats: Cell<HostStats>,
}

impl SimHost {
    /// Creates a host with `interceptor` at its phase and a content handler.
    pub fn new(interceptor: PhaseInterceptor) -> Self {
        Self::with_pipeline(
            PhasePipeline::builder()
                .handler(PhaseInterceptor::PHASE, interceptor)
                .handler(Phase::Content, ContentHandler),
        )
    }

    /// Creates a host with a custom pipeline.
    pub fn with_pipeline(pipeline: PhasePipelineBuilder<SimHost>) -> Self {
        Self {
            pipeline: pipeline.build(),
            sync_reads: false,
            deliveries: RefCell::new(VecDeque::new()),
            stats: Cell::new(HostStats::default()),
        }
    }

    /// Completes body reads inside the read call instead of queueing them.
    #[must_use]
    pub fn with_sync_reads(mut self) -> Self {
        self.sync_reads = true;
        self
    }

    /// Accepts a request and runs its pipeline.
    pub fn submit(&self, request: &Rc<SimRequest>) {
        request.acquire_ref();
        self.run_phases(request);
    }

    /// Completes the oldest queued body read. Returns false if none is queued.
    pub fn deliver_next(&self) -> bool {
        let next = self.deliveries.borrow_mut().pop_front();
        let Some((request, token)) = next else {
            return false;
        };
        request.buffer_body();
        token.resume(self, &request);
        true
    }

    /// Completes every queued body read. Returns how many were completed.
    pub fn deliver_all(&self) -> usize {
        let mut delivered = 0;
        while self.deliver_next() {
            delivered += 1;
        }
        delivered
    }

    /// Drops every queued read without resuming, as on host shutdown.
    pub fn abandon_reads(&self) -> usize {
        let dropped: Vec<_> = self.deliveries.borrow_mut().drain(..).collect();
        dropped.len()
    }

    /// Number of reads waiting for delivery.
    pub fn queued_reads(&self) -> usize {
        self.deliveries.borrow().len()
    }

    /// Returns the host counters.
    pub fn stats(&self) -> HostStats {
        self.stats.get()
    }

    fn update_stats(&self, f: impl FnOnce(&mut HostStats)) {
        let mut stats = self.stats.get();
        f(&mut stats);
        self.stats.set(stats);
    }
}

impl BodyHost for SimHost {
    type Request = SimRequest;

    fn read_body(&self, request: &SimRequest, token: ContinuationToken) -> Result<(), BodyError> {
        self.update_stats(|s| s.body_reads += 1);

        if let Some(status) = request.read_failure() {
            return Err(BodyError::Host(status));
        }
        request.acquire_ref();

        if self.sync_reads {
            request.buffer_body();
            token.resume(self, request);
            return Ok(());
        }

        let Some(handle) = request.handle() else {
            request.release_ref();
            return Err(BodyError::Host(StatusCode::INTERNAL_SERVER_ERROR));
        };
        debug!(request_id = token.request_id(), "body read queued");
        self.deliveries.borrow_mut().push_back((handle, token));
        Ok(())
    }

    fn finalize_pending(&self, request: &SimRequest) {
        self.update_stats(|s| s.resumes += 1);
        request.release_ref();
    }

    fn run_phases(&self, request: &SimRequest) {
        self.update_stats(|s| s.pipeline_runs += 1);

        match self.pipeline.run(self, request) {
            PipelineRun::Completed => request.finalize(StatusCode::OK),
            PipelineRun::Rejected { status, .. } => request.finalize(status),
            PipelineRun::Suspended { .. } => {}
        }
    }
}

/// Content phase handler: counts how often content generation is reached.
#[derive(Debug, Clone, Copy, Default)]
pub struct ContentHandler;

impl PhaseHandler<SimHost> for ContentHandler {
    fn name(&self) -> &'static str {
        "content"
    }

    fn handle(&self, _host: &SimHost, request: &SimRequest) -> PhaseOutcome {
        request.record_content_run();
        PhaseOutcome::Declined
    }
}
