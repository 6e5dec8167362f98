/*!
 * Engine Builder
 * Wires collaborators and configuration into a running engine
 */

use super::Engine;
use crate::core::config::EngineConfig;
use crate::core::errors::BuildError;
use crate::dispatch::{ControlState, Dispatcher};
use crate::evaluate::{BreakpointEvaluator, PathTable};
use crate::graph::{ContextResolver, PatternMatcher};
use crate::monitors::DefinitionStore;
use crate::notify::SinkRegistry;
use crate::watch::WatchpointTracker;
use std::sync::Arc;

/// Builder for [`Engine`]. The context resolver and pattern matcher are the
/// two external collaborators and have no default.
pub struct EngineBuilder {
    config: EngineConfig,
    resolver: Option<Arc<dyn ContextResolver>>,
    matcher: Option<Arc<dyn PatternMatcher>>,
}

impl EngineBuilder {
    pub fn new() -> Self {
        Self {
            config: EngineConfig::default(),
            resolver: None,
            matcher: None,
        }
    }

    pub fn with_config(mut self, config: EngineConfig) -> Self {
        self.config = config;
        self
    }

    pub fn with_resolver(mut self, resolver: impl ContextResolver + 'static) -> Self {
        self.resolver = Some(Arc::new(resolver));
        self
    }

    pub fn with_resolver_arc(mut self, resolver: Arc<dyn ContextResolver>) -> Self {
        self.resolver = Some(resolver);
        self
    }

    pub fn with_matcher(mut self, matcher: impl PatternMatcher + 'static) -> Self {
        self.matcher = Some(Arc::new(matcher));
        self
    }

    pub fn with_matcher_arc(mut self, matcher: Arc<dyn PatternMatcher>) -> Self {
        self.matcher = Some(matcher);
        self
    }

    /// Build the engine and spawn its worker pool. Must run inside a tokio
    /// runtime.
    pub fn build(self) -> Result<Engine, BuildError> {
        let resolver = self.resolver.ok_or(BuildError::MissingResolver)?;
        let matcher = self.matcher.ok_or(BuildError::MissingMatcher)?;
        let config = self.config.normalized();

        let store = Arc::new(DefinitionStore::new());
        let paths = Arc::new(PathTable::new(config.inflight_ttl));
        let control = Arc::new(ControlState::default());
        let (sinks, command_rx) = SinkRegistry::new(config.sink_buffer);
        let sinks = Arc::new(sinks);

        let breakpoints = Arc::new(BreakpointEvaluator::new(
            Arc::clone(&store),
            Arc::clone(&matcher),
            Arc::clone(&paths),
            config.match_timeout,
        ));
        let tracker = Arc::new(WatchpointTracker::new(
            Arc::clone(&store),
            Arc::clone(&matcher),
            config.match_timeout,
        ));

        let dispatcher = Arc::new(Dispatcher::spawn(
            config.clone(),
            resolver,
            breakpoints,
            tracker,
            Arc::clone(&sinks),
            Arc::clone(&control),
        ));

        Ok(Engine::assemble(
            store, dispatcher, sinks, paths, control, command_rx, &config,
        ))
    }
}

impl Default for EngineBuilder {
    fn default() -> Self {
        Self::new()
    }
}
