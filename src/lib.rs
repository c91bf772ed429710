//! # Gantry
//!
//! **Gantry** is a declarative registration layer in front of a
//! coroutine-powered HTTP engine: applications register typed endpoint
//! handlers, websocket handlers, scheduled jobs and path-scoped middlewares
//! against a [`Registry`], and startup compiles those declarations into an
//! immutable routing table with per-route middleware chains, rate limiting
//! and response caching attached. A companion generator introspects the
//! same registry and emits a typed TypeScript client, so the server-side
//! declarations are the single source of truth for client code.
//!
//! ## Architecture
//!
//! - **[`registry`]** - declaration store, registration API and startup
//!   sequencing
//! - **[`context`]** - per-request typed context and the one-terminal-
//!   response lifecycle
//! - **[`middleware`]** - match/skip pattern scoping and chain selection
//! - **[`router`]** - compiled path patterns and route resolution
//! - **[`dispatcher`]** - per-endpoint handler coroutines and channel
//!   dispatch
//! - **[`server`]** - the HTTP engine wrapper and per-request pipeline
//! - **[`ws`]** - websocket upgrade listener
//! - **[`cron`]** - scheduled job cadence
//! - **[`generator`]** - TypeScript client binding generation
//!
//! ## Quick start
//!
//! ```no_run
//! use gantry::{Context, Registry};
//!
//! let mut registry = Registry::new();
//! registry.get("/ping", |ctx: &mut Context<()>| ctx.ok("pong", None), None);
//! registry.middleware(
//!     |ctx| {
//!         if ctx.bearer_token().is_empty() {
//!             ctx.unauthorized("missing token");
//!         }
//!     },
//!     &["^/admin"],
//!     &[],
//! );
//! registry.run().unwrap();
//! ```
//!
//! ## Lifecycle
//!
//! Registration happens on one thread before serving; `run`/`start` consume
//! the registry, so the compiled tables are immutable and the request path
//! needs no locking. Each request gets a fresh [`Context`] that must be
//! terminated by exactly one completion call - the first wins, later calls
//! log a "double response" warning and change nothing. Handlers that never
//! respond are answered with a fixed 500 by the dispatch wrapper.
//!
//! ## Runtime
//!
//! Gantry runs on the `may` coroutine runtime, not tokio. Handler
//! coroutine stack size is configurable via `GANTRY_STACK_SIZE` (decimal or
//! `0x` hex).
//!
//! ## Client generation
//!
//! Endpoints registered with [`ClientOpt`] metadata participate in
//! [`Registry::generate_client`], which rewrites `:name` path segments into
//! `${name}` placeholders, synthesizes query strings from the declared form
//! fields and emits one axios call stub per endpoint, plus an envelope
//! module and a models module. The output directory is recreated from
//! scratch on every run.

pub mod cache;
pub mod config;
pub mod context;
pub mod cron;
pub mod dispatcher;
pub mod envelope;
pub mod error;
pub mod generator;
pub mod ids;
pub mod limit;
pub mod middleware;
pub mod registry;
pub mod router;
pub mod server;
pub mod telemetry;
pub mod ws;

pub use config::DbKind;
pub use context::Context;
pub use envelope::{Envelope, Pagination, Sorting};
pub use error::ConfigError;
pub use ids::TraceId;
pub use middleware::SkipScope;
pub use registry::{
    AppHandle, CacheOpt, ClientOpt, EndpointOpts, InitStage, ModelDecl, RateLimitOpt, Registry,
};
