use crate::config::DbKind;
use crate::context::Context;
use crate::dispatcher::{spawn_endpoint, HandlerSender};
use crate::error::ConfigError;
use crate::middleware::{MiddlewareDescriptor, SkipScope};
use crate::ws::SocketHandler;
use http::Method;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

/// Rate-limit option: at most `rate` requests per `per` window, per client.
#[derive(Debug, Clone)]
pub struct RateLimitOpt {
    pub rate: u64,
    pub per: Duration,
}

/// Response-cache option: replay the full response for `ttl`.
#[derive(Debug, Clone)]
pub struct CacheOpt {
    pub ttl: Duration,
}

/// Client-codegen metadata attached to an endpoint.
///
/// `paths` and `forms` become untyped stub parameters in declaration order;
/// `body`/`response` name client-side model types (a trailing `[]` array
/// marker is allowed); `models` carries the schema declarations the models
/// module is generated from.
#[derive(Debug, Clone, Default)]
pub struct ClientOpt {
    pub function_name: String,
    pub paths: Vec<String>,
    pub forms: Vec<String>,
    pub body: Option<String>,
    pub response: Option<String>,
    pub models: Vec<ModelDecl>,
}

/// A named model schema for client generation. The schema is a JSON-Schema
/// style object (`properties`, `type`, `format`, `required`), the shape the
/// generator walks to emit a typed interface.
#[derive(Debug, Clone)]
pub struct ModelDecl {
    pub name: String,
    pub schema: Value,
}

impl ModelDecl {
    pub fn new(name: &str, schema: Value) -> Self {
        ModelDecl {
            name: name.to_string(),
            schema,
        }
    }
}

/// Per-endpoint options: rate limiting, response caching, client codegen.
#[derive(Debug, Clone, Default)]
pub struct EndpointOpts {
    pub rate_limit: Option<RateLimitOpt>,
    pub cache: Option<CacheOpt>,
    pub client: Option<ClientOpt>,
}

/// One-shot factory that spawns the endpoint's coroutine at compile time
/// and hands back its channel sender.
pub(crate) type HandlerFactory = Box<dyn FnOnce(usize) -> HandlerSender + Send>;

/// One declared HTTP route. Immutable once created; the handler factory is
/// consumed exactly once when the registry compiles.
pub struct EndpointDescriptor {
    pub method: Method,
    pub path: String,
    pub(crate) handler: HandlerFactory,
    pub opts: Option<EndpointOpts>,
}

/// One declared websocket route.
pub struct WebsocketDescriptor {
    pub path: String,
    pub(crate) handler: SocketHandler,
}

/// One declared scheduled job.
pub struct CronDescriptor {
    pub pattern: String,
    pub(crate) handler: Arc<dyn Fn() + Send + Sync>,
    /// Execute once during startup, in addition to the schedule.
    pub run_immediately: bool,
}

/// When an init job runs relative to route installation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InitStage {
    Before,
    After,
}

/// One declared startup job, consumed exactly once.
pub struct InitJobDescriptor {
    pub(crate) handler: Box<dyn FnOnce() + Send>,
    pub stage: InitStage,
}

/// Registry-level configuration mutated by the `set_*` calls.
#[derive(Debug, Clone)]
pub struct RegistryConfig {
    pub db_kind: DbKind,
    pub mem_kind: DbKind,
    pub skip_scope: SkipScope,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        RegistryConfig {
            db_kind: DbKind::MySql,
            mem_kind: DbKind::Memory,
            skip_scope: SkipScope::default(),
        }
    }
}

/// Everything the storage hook gets to see at startup.
pub struct StorageContext<'a> {
    pub db_kind: DbKind,
    pub mem_kind: DbKind,
    pub database: &'a crate::config::DatabaseConfig,
    /// Opaque model markers collected by `migrate`.
    pub migrations: &'a [String],
    /// Opaque model markers collected by `mem_migrate`.
    pub mem_migrations: &'a [String],
}

pub(crate) type StorageHook = Box<dyn FnOnce(&StorageContext<'_>) -> anyhow::Result<()> + Send>;

/// The declaration store.
///
/// Populated only during the pre-serve registration phase, on one thread.
/// `run`/`start` consume the registry, so request handling can never touch
/// builder state - the single-writer-then-immutable discipline that keeps
/// the hot path lock-free.
pub struct Registry {
    pub(crate) endpoints: Vec<EndpointDescriptor>,
    pub(crate) sockets: Vec<WebsocketDescriptor>,
    pub(crate) crons: Vec<CronDescriptor>,
    pub(crate) init_jobs: Vec<InitJobDescriptor>,
    pub(crate) middlewares: Vec<MiddlewareDescriptor>,
    pub(crate) migrations: Vec<String>,
    pub(crate) mem_migrations: Vec<String>,
    pub(crate) environment_keys: Vec<String>,
    pub(crate) config: RegistryConfig,
    pub(crate) storage: Option<StorageHook>,
}

impl Default for Registry {
    fn default() -> Self {
        Self::new()
    }
}

impl Registry {
    #[must_use]
    pub fn new() -> Self {
        Registry {
            endpoints: Vec::new(),
            sockets: Vec::new(),
            crons: Vec::new(),
            init_jobs: Vec::new(),
            middlewares: Vec::new(),
            migrations: Vec::new(),
            mem_migrations: Vec::new(),
            environment_keys: [
                "GANTRY_MODE",
                "GANTRY_HOST",
                "GANTRY_PORT",
                "GANTRY_WS_PORT",
                "GANTRY_STACK_SIZE",
                "GANTRY_DB_HOST",
                "GANTRY_DB_PORT",
                "GANTRY_DB_USERNAME",
                "GANTRY_DB_PASSWORD",
                "GANTRY_DB_DATABASE",
                "GANTRY_DB_SILENT",
            ]
            .iter()
            .map(|s| s.to_string())
            .collect(),
            config: RegistryConfig::default(),
            storage: None,
        }
    }

    /// Register a GET endpoint.
    pub fn get<T, F>(&mut self, path: &str, handler: F, opts: Option<EndpointOpts>)
    where
        T: DeserializeOwned + Default + 'static,
        F: Fn(&mut Context<T>) + Send + 'static,
    {
        self.endpoint(Method::GET, path, handler, opts);
    }

    /// Register a POST endpoint.
    pub fn post<T, F>(&mut self, path: &str, handler: F, opts: Option<EndpointOpts>)
    where
        T: DeserializeOwned + Default + 'static,
        F: Fn(&mut Context<T>) + Send + 'static,
    {
        self.endpoint(Method::POST, path, handler, opts);
    }

    /// Register a PUT endpoint.
    pub fn put<T, F>(&mut self, path: &str, handler: F, opts: Option<EndpointOpts>)
    where
        T: DeserializeOwned + Default + 'static,
        F: Fn(&mut Context<T>) + Send + 'static,
    {
        self.endpoint(Method::PUT, path, handler, opts);
    }

    /// Register a DELETE endpoint.
    pub fn delete<T, F>(&mut self, path: &str, handler: F, opts: Option<EndpointOpts>)
    where
        T: DeserializeOwned + Default + 'static,
        F: Fn(&mut Context<T>) + Send + 'static,
    {
        self.endpoint(Method::DELETE, path, handler, opts);
    }

    fn endpoint<T, F>(&mut self, method: Method, path: &str, handler: F, opts: Option<EndpointOpts>)
    where
        T: DeserializeOwned + Default + 'static,
        F: Fn(&mut Context<T>) + Send + 'static,
    {
        self.endpoints.push(EndpointDescriptor {
            method,
            path: path.to_string(),
            handler: Box::new(move |stack_size| spawn_endpoint(handler, stack_size)),
            opts,
        });
    }

    /// Register a websocket route. The handler receives a payload-less
    /// context plus the upgraded socket; the socket is closed when the
    /// handler returns, however it exits.
    pub fn websocket<F>(&mut self, path: &str, handler: F)
    where
        F: Fn(&mut Context<()>, &mut crate::ws::Socket) + Send + Sync + 'static,
    {
        self.sockets.push(WebsocketDescriptor {
            path: path.to_string(),
            handler: Arc::new(handler),
        });
    }

    /// Register a scheduled job. `run_immediately` executes it once during
    /// the cron startup stage, in addition to the schedule.
    pub fn cron<F>(&mut self, pattern: &str, handler: F, run_immediately: bool)
    where
        F: Fn() + Send + Sync + 'static,
    {
        self.crons.push(CronDescriptor {
            pattern: pattern.to_string(),
            handler: Arc::new(handler),
            run_immediately,
        });
    }

    /// Register a one-shot startup job, run before or after route setup.
    pub fn init_job<F>(&mut self, handler: F, stage: InitStage)
    where
        F: FnOnce() + Send + 'static,
    {
        self.init_jobs.push(InitJobDescriptor {
            handler: Box::new(handler),
            stage,
        });
    }

    /// Register a cross-cutting middleware scoped by match/skip regex
    /// patterns (matched unanchored against the trimmed route path).
    pub fn middleware<F>(&mut self, handler: F, match_patterns: &[&str], skip_patterns: &[&str])
    where
        F: Fn(&mut Context<()>) + Send + Sync + 'static,
    {
        self.middlewares
            .push(MiddlewareDescriptor::new(handler, match_patterns, skip_patterns));
    }

    /// Collect opaque model markers for the storage hook's migration pass.
    pub fn migrate(&mut self, models: &[&str]) {
        self.migrations.extend(models.iter().map(|m| m.to_string()));
    }

    /// Collect opaque model markers for the memory store's migration pass.
    pub fn mem_migrate(&mut self, models: &[&str]) {
        self.mem_migrations
            .extend(models.iter().map(|m| m.to_string()));
    }

    pub fn set_db_kind(&mut self, kind: DbKind) {
        self.config.db_kind = kind;
    }

    pub fn set_mem_kind(&mut self, kind: DbKind) {
        self.config.mem_kind = kind;
    }

    /// Choose how far a middleware skip-pattern hit reaches (see
    /// [`SkipScope`]).
    pub fn set_skip_scope(&mut self, scope: SkipScope) {
        self.config.skip_scope = scope;
    }

    /// Install the storage hook invoked first during startup. A hook error
    /// is fatal: startup aborts.
    pub fn set_storage<F>(&mut self, hook: F)
    where
        F: FnOnce(&StorageContext<'_>) -> anyhow::Result<()> + Send + 'static,
    {
        self.storage = Some(Box::new(hook));
    }

    /// Read an environment variable, recording the key on the registry so
    /// the set of consumed variables stays introspectable.
    pub fn env(&mut self, key: &str) -> String {
        if !self.environment_keys.iter().any(|k| k == key) {
            self.environment_keys.push(key.to_string());
        }
        std::env::var(key).unwrap_or_default()
    }

    /// Every environment key consumed so far.
    #[must_use]
    pub fn environment_keys(&self) -> &[String] {
        &self.environment_keys
    }

    /// The declared endpoints, in registration order.
    #[must_use]
    pub fn endpoints(&self) -> &[EndpointDescriptor] {
        &self.endpoints
    }

    /// Generate the TypeScript client bindings for every endpoint carrying
    /// client metadata. Read-only; can run before or instead of serving.
    pub fn generate_client(&self, out_dir: &Path) -> Result<(), ConfigError> {
        crate::generator::generate(self, out_dir)
    }
}
