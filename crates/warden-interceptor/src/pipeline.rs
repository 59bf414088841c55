//! Phase-ordered handler pipeline.
//!
//! A reference implementation of the host side of the phase protocol. Each
//! handler is registered at a [`Phase`]; a run visits handlers in phase
//! order, and within a phase in registration order:
//!
//! - `Declined` continues with the next handler,
//! - `Done` stops the run; the request is suspended and not finalized,
//! - `Reject(status)` stops the run; the request ends with `status`.
//!
//! A resumed request is run again from its first handler.

use http::StatusCode;
use tracing::{debug, trace};
use warden_core::PhaseOutcome;

use crate::host::BodyHost;
use crate::phase::Phase;

/// A handler the pipeline calls for every request.
pub trait PhaseHandler<H: BodyHost + ?Sized> {
    /// Returns the handler name, used in logs.
    fn name(&self) -> &'static str;

    /// Handles one request.
    fn handle(&self, host: &H, request: &H::Request) -> PhaseOutcome;
}

/// How a pipeline run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineRun {
    /// Every handler declined.
    Completed,
    /// A handler suspended the request.
    Suspended {
        /// Phase of the suspending handler.
        phase: Phase,
        /// Name of the suspending handler.
        handler: &'static str,
    },
    /// A handler ended the request.
    Rejected {
        /// Phase of the rejecting handler.
        phase: Phase,
        /// Name of the rejecting handler.
        handler: &'static str,
        /// Final status.
        status: StatusCode,
    },
}

impl PipelineRun {
    /// Returns the final status of a rejected run.
    pub const fn status(&self) -> Option<StatusCode> {
        match self {
            Self::Rejected { status, .. } => Some(*status),
            _ => None,
        }
    }
}

struct Registered<H: BodyHost + ?Sized> {
    phase: Phase,
    handler: Box<dyn PhaseHandler<H>>,
}

/// Handlers ordered by phase.
///
/// # Example
///
/// ```ignore
/// let pipeline = PhasePipeline::builder()
///     .handler(PhaseInterceptor::PHASE, interceptor)
///     .handler(Phase::Content, content_handler)
///     .build();
///
/// let run = pipeline.run(&host, &request);
/// ```
pub struct PhasePipeline<H: BodyHost + ?Sized> {
    handlers: Vec<Registered<H>>,
}

impl<H: BodyHost + ?Sized> PhasePipeline<H> {
    /// Creates a new pipeline builder.
    #[must_use]
    pub fn builder() -> PhasePipelineBuilder<H> {
        PhasePipelineBuilder::new()
    }

    /// Runs `request` through all handlers from the first phase.
    pub fn run(&self, host: &H, request: &H::Request) -> PipelineRun {
        for registered in &self.handlers {
            let name = registered.handler.name();
            let outcome = registered.handler.handle(host, request);
            trace!(phase = %registered.phase, handler = name, outcome = outcome.as_str(), "phase handler ran");

            match outcome {
                PhaseOutcome::Declined => {}
                PhaseOutcome::Done => {
                    return PipelineRun::Suspended {
                        phase: registered.phase,
                        handler: name,
                    };
                }
                PhaseOutcome::Reject(status) => {
                    debug!(phase = %registered.phase, handler = name, status = status.as_u16(), "request rejected");
                    return PipelineRun::Rejected {
                        phase: registered.phase,
                        handler: name,
                        status,
                    };
                }
            }
        }
        PipelineRun::Completed
    }

    /// Returns handler names in execution order.
    #[must_use]
    pub fn handler_names(&self) -> Vec<&'static str> {
        self.handlers.iter().map(|r| r.handler.name()).collect()
    }

    /// Returns the number of registered handlers.
    #[must_use]
    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    /// Returns true if no handler is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }
}

/// Builder for a [`PhasePipeline`].
pub struct PhasePipelineBuilder<H: BodyHost + ?Sized> {
    handlers: Vec<Registered<H>>,
}

impl<H: BodyHost + ?Sized> PhasePipelineBuilder<H> {
    /// Creates an empty builder.
    #[must_use]
    pub fn new() -> Self {
        Self {
            handlers: Vec::new(),
        }
    }

    /// Registers a handler at `phase`.
    #[must_use]
    pub fn handler<P>(mut self, phase: Phase, handler: P) -> Self
    where
        P: PhaseHandler<H> + 'static,
    {
        self.handlers.push(Registered {
            phase,
            handler: Box::new(handler),
        });
        self
    }

    /// Builds the pipeline.
    #[must_use]
    pub fn build(mut self) -> PhasePipeline<H> {
        // Stable: registration order is kept within a phase.
        self.handlers.sort_by_key(|r| r.phase);
        PhasePipeline {
            handlers: self.handlers,
        }
    }
}

impl<H: BodyHost + ?Sized> Default for PhasePipelineBuilder<H> {
    fn default() -> Self {
        Self::new()
    }
}
