//! Assembly of the runtime pieces from a [`WardenConfig`].

use std::sync::Arc;

use tracing::info;
use warden_config::{ScopeTree, WardenConfig};
use warden_core::RouteConfig;
use warden_interceptor::PhaseInterceptor;
use warden_middleware::{InspectionMiddleware, Request};
use warden_plugin::{EvaluationInvoker, ModuleLoader, PluginHandle, PluginLoader};
use warden_telemetry::metrics::describe_metrics;

use crate::error::WardenResult;

/// The shared plugin handle, invoker and route scopes of one process.
///
/// Cheap to clone. Every interceptor and middleware built from the same
/// `Warden` shares one engine.
#[derive(Debug, Clone)]
pub struct Warden {
    plugin: Arc<PluginHandle>,
    invoker: EvaluationInvoker,
    scopes: Arc<ScopeTree>,
}

impl Warden {
    /// Starts building from a validated configuration.
    pub fn builder(config: WardenConfig) -> WardenBuilder {
        WardenBuilder {
            config,
            modules: None,
        }
    }

    /// Builds with the production module loader.
    ///
    /// # Errors
    ///
    /// See [`WardenBuilder::build`].
    pub fn from_config(config: WardenConfig) -> WardenResult<Self> {
        Self::builder(config).build()
    }

    /// The plugin handle.
    pub fn plugin(&self) -> &Arc<PluginHandle> {
        &self.plugin
    }

    /// The invoker.
    pub fn invoker(&self) -> &EvaluationInvoker {
        &self.invoker
    }

    /// The rule set configured for a request path, after normalization.
    ///
    /// `None` when the path climbs above the root or is otherwise malformed.
    pub fn route_for(&self, path: &str) -> Option<RouteConfig> {
        self.scopes.route_for(path).cloned()
    }

    /// A phase handler for cooperative hosts.
    pub fn interceptor(&self) -> PhaseInterceptor {
        PhaseInterceptor::new(Arc::clone(&self.plugin), self.invoker.clone())
    }

    /// A middleware stage that picks rules by the normalized request path.
    ///
    /// Requests whose path cannot be normalized are rejected with 400.
    pub fn inspection(&self) -> InspectionMiddleware {
        let scopes = Arc::clone(&self.scopes);
        InspectionMiddleware::new(
            Arc::clone(&self.plugin),
            self.invoker.clone(),
            move |request: &Request| scopes.route_for(request.uri().path()).cloned(),
        )
    }
}

/// Builder for [`Warden`].
#[must_use]
#[derive(Debug)]
pub struct WardenBuilder {
    config: WardenConfig,
    modules: Option<Arc<dyn ModuleLoader>>,
}

impl WardenBuilder {
    /// Replaces the dynamic library loader.
    pub fn module_loader(mut self, modules: Arc<dyn ModuleLoader>) -> Self {
        self.modules = Some(modules);
        self
    }

    /// Validates the configuration and assembles the pieces.
    ///
    /// With `plugin.preload` set the engine is resolved here, and failing to
    /// resolve it fails the build. Otherwise the first inspected request
    /// resolves it.
    ///
    /// # Errors
    ///
    /// Returns `WardenError::Config` for invalid configuration and
    /// `WardenError::Preload` when preloading fails.
    pub fn build(self) -> WardenResult<Warden> {
        self.config.validate()?;
        describe_metrics();

        let plugin_config = self.config.plugin.to_plugin_config();
        let loader = match self.modules {
            Some(modules) => PluginLoader::with_module_loader(plugin_config, modules),
            None => PluginLoader::new(plugin_config),
        };
        let plugin = Arc::new(PluginHandle::new(loader));

        if self.config.plugin.preload {
            let engine = plugin.resolve()?;
            info!(module = %self.config.plugin.module_name, engine = engine.name(), "engine preloaded");
        }

        Ok(Warden {
            plugin,
            invoker: EvaluationInvoker::new(self.config.execution.to_invoker_config()),
            scopes: Arc::new(self.config.scope_tree()?),
        })
    }
}
