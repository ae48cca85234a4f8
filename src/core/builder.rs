use crate::config::Config;
use crate::core::emitter::Emitter;
use crate::middleware::Middleware;

/// Builder for constructing an [`Emitter`] with pattern middlewares preinstalled.
///
/// ## Example
/// ```rust
/// use emitvisor::{Config, Emitter, middleware};
///
/// let emitter = Emitter::builder(Config::with_capacity(8))
///     .with_middleware("metrics.*", [middleware::skip()])
///     .with_middleware("debug.*", [middleware::void()])
///     .build();
///
/// assert_eq!(emitter.capacity(), 8);
/// assert_eq!(emitter.middleware_patterns(), vec!["debug.*", "metrics.*"]);
/// ```
pub struct EmitterBuilder {
    cfg: Config,
    middlewares: Vec<(String, Vec<Middleware>)>,
}

impl EmitterBuilder {
    /// Creates a new builder with the given configuration.
    pub fn new(cfg: Config) -> Self {
        Self {
            cfg,
            middlewares: Vec::new(),
        }
    }

    /// Registers a pattern-scoped middleware chain.
    ///
    /// Later calls for the same pattern replace earlier ones; an empty chain removes it.
    pub fn with_middleware(
        mut self,
        pattern: impl Into<String>,
        chain: impl IntoIterator<Item = Middleware>,
    ) -> Self {
        self.middlewares
            .push((pattern.into(), chain.into_iter().collect()));
        self
    }

    /// Builds the emitter.
    ///
    /// Does not need a Tokio runtime: nothing is spawned until the first `on`.
    pub fn build(self) -> Emitter {
        let emitter = Emitter::new(self.cfg);
        for (pattern, chain) in self.middlewares {
            emitter.use_middleware(pattern, chain);
        }
        emitter
    }
}
