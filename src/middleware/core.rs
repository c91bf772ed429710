use crate::context::Context;
use crate::error::ConfigError;
use regex::Regex;
use std::sync::Arc;

/// Erased middleware handler. Runs against a payload-less context; arming
/// any response terminates the request with it.
pub type MiddlewareFn = Arc<dyn Fn(&mut Context<()>) + Send + Sync>;

/// One registered cross-cutting handler with its path scoping patterns.
///
/// Patterns are kept as strings during registration and compiled to regexes
/// at compile time so a bad pattern surfaces as a startup
/// [`ConfigError`], not a silent non-match.
pub struct MiddlewareDescriptor {
    pub(crate) handler: MiddlewareFn,
    pub match_patterns: Vec<String>,
    pub skip_patterns: Vec<String>,
}

impl MiddlewareDescriptor {
    pub fn new<F>(handler: F, match_patterns: &[&str], skip_patterns: &[&str]) -> Self
    where
        F: Fn(&mut Context<()>) + Send + Sync + 'static,
    {
        MiddlewareDescriptor {
            handler: Arc::new(handler),
            match_patterns: match_patterns.iter().map(|s| s.to_string()).collect(),
            skip_patterns: skip_patterns.iter().map(|s| s.to_string()).collect(),
        }
    }

    pub(crate) fn compile(&self) -> Result<CompiledMiddleware, ConfigError> {
        let compile_all = |patterns: &[String]| -> Result<Vec<Regex>, ConfigError> {
            patterns
                .iter()
                .map(|p| {
                    Regex::new(p).map_err(|source| ConfigError::InvalidPattern {
                        pattern: p.clone(),
                        source,
                    })
                })
                .collect()
        };
        Ok(CompiledMiddleware {
            handler: Arc::clone(&self.handler),
            match_patterns: compile_all(&self.match_patterns)?,
            skip_patterns: compile_all(&self.skip_patterns)?,
        })
    }
}

/// A descriptor with its patterns compiled, ready for selection.
pub struct CompiledMiddleware {
    pub(crate) handler: MiddlewareFn,
    pub(crate) match_patterns: Vec<Regex>,
    pub(crate) skip_patterns: Vec<Regex>,
}

/// How far a skip-pattern hit reaches during selection.
///
/// The historical behavior stops evaluating every later-registered
/// middleware once one descriptor's skip pattern matches the route. That is
/// kept as the default for compatibility; `DescriptorOnly` confines the
/// skip to the descriptor that carries the pattern.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SkipScope {
    /// A skip hit excludes this descriptor and abandons the rest of the
    /// registration-order scan for the route.
    #[default]
    Remaining,
    /// A skip hit excludes only the descriptor carrying the pattern.
    DescriptorOnly,
}
