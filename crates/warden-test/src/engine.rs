//! Engine and module loader fakes.

use std::io::Read;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;
use warden_core::{FileReadFn, InspectedRequest};
use warden_plugin::{EvalEngine, ModuleLoader, PluginError, PluginResult};

/// One call observed by a [`RecordingEngine`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Evaluation {
    /// Request identifier passed to the engine.
    pub request_id: String,
    /// Rule set passed to the engine.
    pub rules: String,
    /// Request method bytes.
    pub method: Vec<u8>,
    /// Request URI bytes.
    pub uri: Vec<u8>,
    /// Header name/value pairs in the order the engine saw them.
    pub headers: Vec<(Vec<u8>, Vec<u8>)>,
    /// Body bytes read through the body reader.
    pub body: Vec<u8>,
}

/// An engine that records every call and answers with a fixed verdict.
///
/// Requests whose body contains the configured marker are denied
/// regardless of the fixed verdict.
#[derive(Debug)]
pub struct RecordingEngine {
    allow: bool,
    deny_marker: Option<Vec<u8>>,
    calls: Mutex<Vec<Evaluation>>,
}

impl RecordingEngine {
    /// Creates an engine that allows everything.
    pub fn allowing() -> Arc<Self> {
        Arc::new(Self::new(true, None))
    }

    /// Creates an engine that denies everything.
    pub fn denying() -> Arc<Self> {
        Arc::new(Self::new(false, None))
    }

    /// Creates an engine that denies bodies containing `marker`.
    pub fn denying_body(marker: impl Into<Vec<u8>>) -> Arc<Self> {
        Arc::new(Self::new(true, Some(marker.into())))
    }

    fn new(allow: bool, deny_marker: Option<Vec<u8>>) -> Self {
        Self {
            allow,
            deny_marker,
            calls: Mutex::new(Vec::new()),
        }
    }

    /// Number of evaluations so far.
    pub fn call_count(&self) -> usize {
        self.calls.lock().len()
    }

    /// Every evaluation so far, oldest first.
    pub fn calls(&self) -> Vec<Evaluation> {
        self.calls.lock().clone()
    }
}

impl EvalEngine for RecordingEngine {
    fn name(&self) -> &str {
        "recording"
    }

    fn evaluate(
        &self,
        request_id: &str,
        rules: &str,
        request: &dyn InspectedRequest,
        read_file: FileReadFn,
    ) -> bool {
        let mut body = Vec::new();
        if request.body().reader_with(read_file).read_to_end(&mut body).is_err() {
            return false;
        }

        let denied = self
            .deny_marker
            .as_deref()
            .is_some_and(|marker| !marker.is_empty() && body.windows(marker.len()).any(|w| w == marker));

        self.calls.lock().push(Evaluation {
            request_id: request_id.to_string(),
            rules: rules.to_string(),
            method: request.method().to_vec(),
            uri: request.uri().to_vec(),
            headers: request
                .headers()
                .iter()
                .map(|h| (h.name.to_vec(), h.value.to_vec()))
                .collect(),
            body,
        });

        self.allow && !denied
    }
}

/// A [`ModuleLoader`] whose module can be made to appear or disappear.
#[derive(Debug)]
pub struct SwitchableLoader {
    engine: Arc<dyn EvalEngine>,
    available: AtomicBool,
    attempts: AtomicUsize,
    paths: Mutex<Vec<PathBuf>>,
}

impl SwitchableLoader {
    /// Creates a loader that fails until [`set_available`](Self::set_available) is called.
    pub fn missing(engine: Arc<dyn EvalEngine>) -> Arc<Self> {
        Arc::new(Self {
            engine,
            available: AtomicBool::new(false),
            attempts: AtomicUsize::new(0),
            paths: Mutex::new(Vec::new()),
        })
    }

    /// Creates a loader that succeeds.
    pub fn present(engine: Arc<dyn EvalEngine>) -> Arc<Self> {
        let loader = Self::missing(engine);
        loader.set_available(true);
        loader
    }

    /// Makes the module loadable or not.
    pub fn set_available(&self, available: bool) {
        self.available.store(available, Ordering::SeqCst);
    }

    /// Number of load attempts so far.
    pub fn attempts(&self) -> usize {
        self.attempts.load(Ordering::SeqCst)
    }

    /// Paths handed to the loader, oldest first.
    pub fn paths(&self) -> Vec<PathBuf> {
        self.paths.lock().clone()
    }
}

impl ModuleLoader for SwitchableLoader {
    fn load(&self, path: &Path, symbol: &str) -> PluginResult<Arc<dyn EvalEngine>> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        self.paths.lock().push(path.to_path_buf());

        if self.available.load(Ordering::SeqCst) {
            Ok(Arc::clone(&self.engine))
        } else {
            Err(PluginError::module_load(
                path,
                format!("{}: cannot open shared object file: No such file or directory ({symbol})", path.display()),
            ))
        }
    }
}
