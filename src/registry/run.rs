use super::core::{InitStage, Registry, StorageContext};
use crate::cache::ResponseCache;
use crate::config::{CorsConfig, DatabaseConfig, RuntimeConfig};
use crate::cron;
use crate::error::ConfigError;
use crate::limit::RateLimiter;
use crate::middleware::select;
use crate::router::{CompiledRoute, PathPattern, RoutingTable};
use crate::server::{AppService, CorsPolicy, HttpServer, ServerHandle};
use crate::ws::{self, SocketTable};
use anyhow::{anyhow, Context as _};
use std::io;
use std::net::SocketAddr;
use std::sync::Arc;
use tracing::info;

/// Handle to a started application: the HTTP server plus, when socket
/// routes exist, the upgrade listener.
#[derive(Debug)]
pub struct AppHandle {
    http: ServerHandle,
    /// Bound HTTP address.
    pub addr: SocketAddr,
    /// Bound websocket upgrade address, when socket routes were declared.
    pub ws_addr: Option<SocketAddr>,
}

impl AppHandle {
    /// Wait until the HTTP listener accepts connections.
    pub fn wait_ready(&self) -> io::Result<()> {
        self.http.wait_ready()
    }

    /// Stop serving.
    pub fn stop(self) {
        self.http.stop();
    }

    /// Block until the server exits.
    pub fn join(self) -> anyhow::Result<()> {
        self.http
            .join()
            .map_err(|_| anyhow!("server thread panicked"))
    }
}

impl Registry {
    /// Compile the declarations, run the startup sequence and serve until
    /// the process exits. Any configuration failure aborts before the
    /// first connection is accepted.
    pub fn run(self) -> anyhow::Result<()> {
        self.start()?.join()
    }

    /// Like [`Registry::run`] but returns a handle instead of blocking,
    /// binding the addresses configured in the environment.
    pub fn start(self) -> anyhow::Result<AppHandle> {
        let runtime = RuntimeConfig::from_env();
        let addr = runtime.addr();
        let ws_addr = runtime.ws_addr();
        self.start_on(&addr, &ws_addr)
    }

    /// Start on explicit addresses. The fixed startup order is: storage
    /// hook → CORS policy → "before" init jobs → HTTP endpoint compile →
    /// websocket compile → cron jobs (immediate runs included) → "after"
    /// init jobs → accept connections.
    pub fn start_on(mut self, addr: &str, ws_addr: &str) -> anyhow::Result<AppHandle> {
        let runtime = RuntimeConfig::from_env();

        // Storage first; a failure here is fatal by contract.
        let database = DatabaseConfig::from_env(runtime.release);
        if let Some(hook) = self.storage.take() {
            let storage_ctx = StorageContext {
                db_kind: self.config.db_kind,
                mem_kind: self.config.mem_kind,
                database: &database,
                migrations: &self.migrations,
                mem_migrations: &self.mem_migrations,
            };
            hook(&storage_ctx)
                .map_err(ConfigError::Storage)
                .context("storage setup")?;
            info!(db_kind = self.config.db_kind.as_str(), "storage configured");
        }

        let cors = Arc::new(CorsPolicy::new(CorsConfig::from_env()));

        let (before, after): (Vec<_>, Vec<_>) = self
            .init_jobs
            .drain(..)
            .partition(|job| job.stage == InitStage::Before);
        for job in before {
            (job.handler)();
        }

        let middlewares = self
            .middlewares
            .iter()
            .map(|m| m.compile())
            .collect::<Result<Vec<_>, _>>()?;

        let mut routes = Vec::with_capacity(self.endpoints.len());
        for endpoint in self.endpoints.drain(..) {
            let pattern = PathPattern::compile(&endpoint.path)?;
            let chain = select(pattern.raw(), &middlewares, self.config.skip_scope);
            let opts = endpoint.opts.unwrap_or_default();
            info!(
                method = %endpoint.method,
                path = pattern.raw(),
                middlewares = chain.len(),
                rate_limited = opts.rate_limit.is_some(),
                cached = opts.cache.is_some(),
                "endpoint installed"
            );
            routes.push(CompiledRoute {
                method: endpoint.method,
                pattern,
                chain,
                limiter: opts
                    .rate_limit
                    .map(|rl| RateLimiter::new(rl.rate, rl.per)),
                cache: opts.cache.map(|c| ResponseCache::new(c.ttl)),
                sender: (endpoint.handler)(runtime.stack_size),
            });
        }
        let table = Arc::new(RoutingTable::new(routes));

        let sockets = Arc::new(SocketTable::compile(
            std::mem::take(&mut self.sockets),
            &middlewares,
            self.config.skip_scope,
        )?);

        cron::start(std::mem::take(&mut self.crons))?;

        for job in after {
            (job.handler)();
        }

        let service = AppService::new(Arc::clone(&table), cors);
        let http = HttpServer(service)
            .start(addr)
            .with_context(|| format!("binding {addr}"))?;
        let bound = http.addr();
        let ws_bound = if sockets.is_empty() {
            None
        } else {
            Some(ws::serve(sockets, ws_addr).with_context(|| format!("binding {ws_addr}"))?)
        };
        info!(addr = %bound, routes = table.len(), "listening");

        Ok(AppHandle {
            http,
            addr: bound,
            ws_addr: ws_bound,
        })
    }
}
