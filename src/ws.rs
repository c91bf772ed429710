//! Websocket routes: a dedicated upgrade listener compiled from the same
//! registry declarations as HTTP routes.
//!
//! The HTTP engine cannot yield its stream to a handler mid-connection, so
//! socket routes are served by a sibling listener (`GANTRY_WS_PORT`). Path
//! matching and middleware selection are identical to HTTP routes; a
//! middleware that arms a response rejects the handshake with that status.
//! Each accepted connection runs on its own coroutine for its lifetime, and
//! the socket is closed unconditionally when the handler returns.

use crate::context::Context;
use crate::dispatcher::{HeaderVec, RequestParts};
use crate::error::ConfigError;
use crate::middleware::{select, CompiledMiddleware, MiddlewareFn, SkipScope};
use crate::registry::WebsocketDescriptor;
use crate::router::{trim_route, ParamVec, PathPattern};
use crate::server::parse_query_params;
use http::{Method, StatusCode};
use std::io;
use std::net::SocketAddr;
use std::sync::Arc;
use tracing::{debug, error, info, warn};
use tungstenite::handshake::server::{ErrorResponse, Request, Response};

/// An upgraded websocket over a coroutine-friendly TCP stream.
pub type Socket = tungstenite::WebSocket<may::net::TcpStream>;

/// Erased socket handler: payload-less context plus the upgraded socket.
pub type SocketHandler = Arc<dyn Fn(&mut Context<()>, &mut Socket) + Send + Sync>;

pub(crate) struct SocketRoute {
    pattern: PathPattern,
    chain: Vec<MiddlewareFn>,
    handler: SocketHandler,
}

/// Immutable socket routing table, compiled once at startup.
pub struct SocketTable {
    routes: Vec<SocketRoute>,
}

impl SocketTable {
    pub(crate) fn compile(
        descriptors: Vec<WebsocketDescriptor>,
        middlewares: &[CompiledMiddleware],
        scope: SkipScope,
    ) -> Result<Self, ConfigError> {
        let mut routes = Vec::with_capacity(descriptors.len());
        for desc in descriptors {
            let pattern = PathPattern::compile(&desc.path)?;
            let chain = select(pattern.raw(), middlewares, scope);
            routes.push(SocketRoute {
                pattern,
                chain,
                handler: desc.handler,
            });
        }
        Ok(SocketTable { routes })
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }

    /// Last-registered-wins resolution, same rule as the HTTP table.
    fn resolve(&self, path: &str) -> Option<(usize, ParamVec)> {
        let trimmed = trim_route(path);
        self.routes
            .iter()
            .enumerate()
            .rev()
            .find_map(|(idx, route)| route.pattern.matches(trimmed).map(|p| (idx, p)))
    }
}

/// Bind the upgrade listener and start accepting connections on a
/// coroutine. Returns the bound address (useful when binding port 0).
pub(crate) fn serve(table: Arc<SocketTable>, addr: &str) -> io::Result<SocketAddr> {
    let listener = may::net::TcpListener::bind(addr)?;
    let local = listener.local_addr()?;
    info!(addr = %local, routes = table.routes.len(), "websocket listener started");
    may::go!(move || {
        for stream in listener.incoming() {
            match stream {
                Ok(stream) => {
                    let table = Arc::clone(&table);
                    may::go!(move || handle_connection(&table, stream));
                }
                Err(e) => warn!(error = %e, "websocket accept failed"),
            }
        }
    });
    Ok(local)
}

fn handle_connection(table: &SocketTable, stream: may::net::TcpStream) {
    let mut selected: Option<(usize, RequestParts)> = None;
    let accepted = tungstenite::accept_hdr(stream, |req: &Request, resp: Response| {
        let path = req.uri().path().to_string();
        let target = req
            .uri()
            .path_and_query()
            .map(|pq| pq.as_str().to_string())
            .unwrap_or_else(|| path.clone());

        let (idx, path_params) = match table.resolve(&path) {
            Some(found) => found,
            None => return Err(error_response(404, None)),
        };

        let mut headers = HeaderVec::new();
        for (name, value) in req.headers() {
            headers.push((
                Arc::from(name.as_str()),
                String::from_utf8_lossy(value.as_bytes()).to_string(),
            ));
        }
        let parts = RequestParts {
            method: Method::GET,
            path: trim_route(&path).to_string(),
            target,
            headers,
            path_params,
            query: parse_query_params(req.uri().query()),
            body: None,
        };

        // Middleware gate: an armed response rejects the handshake.
        for mw in &table.routes[idx].chain {
            let mut ctx = Context::<()>::new(parts.clone());
            (mw)(&mut ctx);
            if ctx.has_response() {
                let body = ctx
                    .envelope()
                    .and_then(|env| serde_json::to_string(env).ok());
                return Err(error_response(ctx.status(), body));
            }
        }

        selected = Some((idx, parts));
        Ok(resp)
    });

    match accepted {
        Ok(mut socket) => {
            if let Some((idx, parts)) = selected {
                let route = &table.routes[idx];
                let outcome = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
                    let mut ctx = Context::<()>::new(parts);
                    (route.handler)(&mut ctx, &mut socket);
                }));
                if let Err(panic) = outcome {
                    error!(panic = ?panic, path = route.pattern.raw(), "socket handler panicked");
                }
            }
            // Release the connection no matter how the handler exited.
            let _ = socket.close(None);
        }
        Err(e) => debug!(error = %e, "websocket handshake rejected"),
    }
}

fn error_response(status: u16, body: Option<String>) -> ErrorResponse {
    let mut resp = ErrorResponse::new(body);
    *resp.status_mut() =
        StatusCode::from_u16(status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    resp
}
