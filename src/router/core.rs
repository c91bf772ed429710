//! Router core - hot path for request routing.

use crate::cache::ResponseCache;
use crate::dispatcher::HandlerSender;
use crate::error::ConfigError;
use crate::limit::RateLimiter;
use crate::middleware::MiddlewareFn;
use http::Method;
use regex::Regex;
use smallvec::SmallVec;
use std::sync::Arc;

/// Maximum number of path/query parameters before heap allocation.
/// Most REST routes carry ≤4 path params; no heap in the hot path for the
/// common case.
pub const MAX_INLINE_PARAMS: usize = 8;

/// Stack-allocated parameter storage for the hot path.
///
/// Param names use `Arc<str>` because they come from the static route
/// table; values stay `String` as per-request data from the URL.
pub type ParamVec = SmallVec<[(Arc<str>, String); MAX_INLINE_PARAMS]>;

/// Trim trailing slashes the way routes are installed, so `/users/` and
/// `/users` resolve identically.
#[must_use]
pub fn trim_route(path: &str) -> &str {
    path.trim_end_matches('/')
}

/// A route path compiled to an anchored regex with `:name` segments turned
/// into capture groups.
#[derive(Debug, Clone)]
pub struct PathPattern {
    raw: String,
    regex: Regex,
    params: Vec<Arc<str>>,
}

impl PathPattern {
    /// Compile a declared route path. Trailing slashes are trimmed before
    /// compilation; literal segments are regex-escaped.
    pub fn compile(path: &str) -> Result<Self, ConfigError> {
        let trimmed = trim_route(path);
        let mut params: Vec<Arc<str>> = Vec::new();
        let segments: Vec<String> = trimmed
            .split('/')
            .map(|seg| {
                if let Some(name) = seg.strip_prefix(':') {
                    params.push(Arc::from(name));
                    "([^/]+)".to_string()
                } else {
                    regex::escape(seg)
                }
            })
            .collect();
        let pattern = format!("^{}$", segments.join("/"));
        let regex = Regex::new(&pattern).map_err(|source| ConfigError::InvalidPattern {
            pattern,
            source,
        })?;
        Ok(PathPattern {
            raw: trimmed.to_string(),
            regex,
            params,
        })
    }

    /// Match an already-trimmed request path, extracting named parameters.
    #[must_use]
    pub fn matches(&self, path: &str) -> Option<ParamVec> {
        let caps = self.regex.captures(path)?;
        let mut out = ParamVec::new();
        for (i, name) in self.params.iter().enumerate() {
            if let Some(m) = caps.get(i + 1) {
                out.push((Arc::clone(name), m.as_str().to_string()));
            }
        }
        Some(out)
    }

    /// The declared path, trailing slashes trimmed.
    #[must_use]
    pub fn raw(&self) -> &str {
        &self.raw
    }
}

/// One installed endpoint: the compiled chain the router executes per
/// request. Never added or removed after compile.
pub struct CompiledRoute {
    pub method: Method,
    pub pattern: PathPattern,
    /// Fixed middleware execution order, as data (see middleware::select).
    pub(crate) chain: Vec<MiddlewareFn>,
    pub(crate) limiter: Option<RateLimiter>,
    pub(crate) cache: Option<ResponseCache>,
    pub(crate) sender: HandlerSender,
}

/// The immutable routing table produced by compiling a registry.
///
/// Duplicate method/path registrations are all kept; resolution scans
/// last-registered-first, so the most recent registration takes precedence.
/// This layer does not deduplicate.
pub struct RoutingTable {
    routes: Vec<CompiledRoute>,
}

impl RoutingTable {
    pub(crate) fn new(routes: Vec<CompiledRoute>) -> Self {
        RoutingTable { routes }
    }

    /// Resolve a request to an installed route, extracting path parameters.
    #[must_use]
    pub fn resolve(&self, method: &Method, path: &str) -> Option<(&CompiledRoute, ParamVec)> {
        let trimmed = trim_route(path);
        self.routes.iter().rev().find_map(|route| {
            if route.method == *method {
                route.pattern.matches(trimmed).map(|params| (route, params))
            } else {
                None
            }
        })
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.routes.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }
}
