//! Dispatch of evaluation calls to the resolved engine.

use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::Semaphore;
use tracing::{debug, error, warn};
use warden_core::{read_file_at, FileReadFn, InspectedRequest, RouteConfig, Verdict};
use warden_telemetry::metrics::record_evaluation;

use crate::engine::EvalEngine;

/// Where evaluation calls run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ExecutionStrategy {
    /// On the calling thread. The caller blocks for the duration of the call.
    #[default]
    Inline,
    /// On tokio's blocking pool, at most `max_concurrent` at a time.
    Pool {
        /// Upper bound on evaluations in flight.
        max_concurrent: usize,
    },
}

/// Configuration for the [`EvaluationInvoker`].
#[derive(Debug, Clone, Copy)]
pub struct InvokerConfig {
    /// Execution strategy for the async path.
    pub strategy: ExecutionStrategy,
    /// Evaluations slower than this are logged at warn level.
    pub slow_eval_warn: Duration,
    /// Capability handed to engines for reading spilled bodies.
    pub read_file: FileReadFn,
}

impl Default for InvokerConfig {
    fn default() -> Self {
        Self {
            strategy: ExecutionStrategy::Inline,
            slow_eval_warn: Duration::from_millis(100),
            read_file: read_file_at,
        }
    }
}

impl InvokerConfig {
    /// Set the execution strategy.
    pub fn with_strategy(mut self, strategy: ExecutionStrategy) -> Self {
        self.strategy = strategy;
        self
    }

    /// Set the slow evaluation threshold.
    pub fn with_slow_eval_warn(mut self, threshold: Duration) -> Self {
        self.slow_eval_warn = threshold;
        self
    }

    /// Set the file read capability.
    pub fn with_read_file(mut self, read_file: FileReadFn) -> Self {
        self.read_file = read_file;
        self
    }
}

/// Calls the engine and maps its answer to a [`Verdict`].
///
/// [`evaluate_blocking`](Self::evaluate_blocking) always runs on the calling
/// thread and is what cooperative hosts use. [`evaluate`](Self::evaluate)
/// honors the configured [`ExecutionStrategy`].
///
/// A panicking engine yields [`Verdict::LoadError`].
#[derive(Debug, Clone)]
pub struct EvaluationInvoker {
    config: InvokerConfig,
    permits: Option<Arc<Semaphore>>,
}

impl Default for EvaluationInvoker {
    fn default() -> Self {
        Self::new(InvokerConfig::default())
    }
}

impl EvaluationInvoker {
    /// Creates an invoker.
    pub fn new(config: InvokerConfig) -> Self {
        let permits = match config.strategy {
            ExecutionStrategy::Inline => None,
            ExecutionStrategy::Pool { max_concurrent } => {
                Some(Arc::new(Semaphore::new(max_concurrent.max(1))))
            }
        };
        Self { config, permits }
    }

    /// Returns the invoker configuration.
    pub fn config(&self) -> &InvokerConfig {
        &self.config
    }

    /// Evaluates on the calling thread.
    pub fn evaluate_blocking(
        &self,
        engine: &dyn EvalEngine,
        request_id: &str,
        rules: &RouteConfig,
        request: &dyn InspectedRequest,
    ) -> Verdict {
        run(engine, request_id, rules, request, &self.config)
    }

    /// Evaluates according to the configured strategy.
    pub async fn evaluate<R>(
        &self,
        engine: Arc<dyn EvalEngine>,
        request_id: String,
        rules: RouteConfig,
        request: Arc<R>,
    ) -> Verdict
    where
        R: InspectedRequest + Send + Sync + 'static,
    {
        let Some(permits) = &self.permits else {
            return run(engine.as_ref(), &request_id, &rules, request.as_ref(), &self.config);
        };

        // The semaphore is never closed.
        let Ok(permit) = Arc::clone(permits).acquire_owned().await else {
            return Verdict::LoadError;
        };

        let config = self.config;
        let handle = tokio::task::spawn_blocking(move || {
            let _permit = permit;
            run(engine.as_ref(), &request_id, &rules, request.as_ref(), &config)
        });

        match handle.await {
            Ok(verdict) => verdict,
            Err(e) => {
                error!(error = %e, "evaluation task failed");
                Verdict::LoadError
            }
        }
    }

    /// Returns how many more evaluations may start on the pool right now.
    ///
    /// `None` for the inline strategy.
    pub fn available_permits(&self) -> Option<usize> {
        self.permits.as_ref().map(|p| p.available_permits())
    }
}

fn run(
    engine: &dyn EvalEngine,
    request_id: &str,
    rules: &RouteConfig,
    request: &dyn InspectedRequest,
    config: &InvokerConfig,
) -> Verdict {
    let start = Instant::now();
    let result = panic::catch_unwind(AssertUnwindSafe(|| {
        engine.evaluate(request_id, rules.as_str(), request, config.read_file)
    }));
    let elapsed = start.elapsed();

    let verdict = match result {
        Ok(allowed) => Verdict::from(allowed),
        Err(_) => {
            error!(engine = engine.name(), request_id, "evaluation engine panicked");
            Verdict::LoadError
        }
    };

    record_evaluation(verdict.as_str(), elapsed);
    if elapsed > config.slow_eval_warn {
        warn!(
            request_id,
            rules = %rules,
            elapsed_ms = u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX),
            "slow evaluation"
        );
    } else {
        debug!(request_id, verdict = %verdict, "evaluation complete");
    }
    verdict
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::FnEngine;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use warden_core::RequestSnapshot;

    fn rules() -> RouteConfig {
        RouteConfig::new("crs.conf")
    }

    #[test]
    fn test_blocking_maps_answer() {
        let invoker = EvaluationInvoker::default();
        let allow = FnEngine::new("allow", |_, _, _| true);
        let deny = FnEngine::new("deny", |_, _, _| false);
        let request = RequestSnapshot::new("GET", "/");

        assert_eq!(invoker.evaluate_blocking(&allow, "r1", &rules(), &request), Verdict::Allow);
        assert_eq!(invoker.evaluate_blocking(&deny, "r1", &rules(), &request), Verdict::Deny);
    }

    #[test]
    fn test_engine_receives_route_value() {
        let invoker = EvaluationInvoker::default();
        let engine = FnEngine::new("check", |id, rules, _| id == "abc" && rules == "crs.conf");
        let request = RequestSnapshot::new("GET", "/");

        assert_eq!(invoker.evaluate_blocking(&engine, "abc", &rules(), &request), Verdict::Allow);
    }

    #[test]
    fn test_panicking_engine_is_load_error() {
        let invoker = EvaluationInvoker::default();
        let engine = FnEngine::new("boom", |_, _, _| panic!("engine bug"));
        let request = RequestSnapshot::new("GET", "/");

        assert_eq!(
            invoker.evaluate_blocking(&engine, "", &rules(), &request),
            Verdict::LoadError
        );
    }

    #[tokio::test]
    async fn test_inline_async_path() {
        let invoker = EvaluationInvoker::default();
        assert_eq!(invoker.available_permits(), None);

        let engine: Arc<dyn EvalEngine> = Arc::new(FnEngine::new("deny", |_, _, _| false));
        let request = Arc::new(RequestSnapshot::new("POST", "/"));
        let verdict = invoker
            .evaluate(engine, "r".to_string(), rules(), request)
            .await;
        assert_eq!(verdict, Verdict::Deny);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_pool_bounds_concurrency() {
        static IN_FLIGHT: AtomicUsize = AtomicUsize::new(0);
        static PEAK: AtomicUsize = AtomicUsize::new(0);

        let invoker = EvaluationInvoker::new(
            InvokerConfig::default().with_strategy(ExecutionStrategy::Pool { max_concurrent: 2 }),
        );
        assert_eq!(invoker.available_permits(), Some(2));

        let engine: Arc<dyn EvalEngine> = Arc::new(FnEngine::new("slow", |_, _, _| {
            let now = IN_FLIGHT.fetch_add(1, Ordering::SeqCst) + 1;
            PEAK.fetch_max(now, Ordering::SeqCst);
            std::thread::sleep(Duration::from_millis(20));
            IN_FLIGHT.fetch_sub(1, Ordering::SeqCst);
            true
        }));

        let tasks: Vec<_> = (0..8)
            .map(|i| {
                let invoker = invoker.clone();
                let engine = Arc::clone(&engine);
                tokio::spawn(async move {
                    let request = Arc::new(RequestSnapshot::new("GET", "/"));
                    invoker.evaluate(engine, format!("r{i}"), rules(), request).await
                })
            })
            .collect();

        for task in tasks {
            assert_eq!(task.await.unwrap(), Verdict::Allow);
        }
        assert!(PEAK.load(Ordering::SeqCst) <= 2);
        assert_eq!(invoker.available_permits(), Some(2));
    }

    #[tokio::test]
    async fn test_pool_panic_is_load_error() {
        let invoker = EvaluationInvoker::new(
            InvokerConfig::default().with_strategy(ExecutionStrategy::Pool { max_concurrent: 1 }),
        );
        let engine: Arc<dyn EvalEngine> = Arc::new(FnEngine::new("boom", |_, _, _| panic!("bug")));
        let request = Arc::new(RequestSnapshot::new("GET", "/"));

        let verdict = invoker.evaluate(engine, String::new(), rules(), request).await;
        assert_eq!(verdict, Verdict::LoadError);
        assert_eq!(invoker.available_permits(), Some(1));
    }
}
