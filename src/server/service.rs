use super::cors::CorsPolicy;
use super::request::parse_request;
use super::response::{write_json_error, write_wire};
use crate::cache::CachedResponse;
use crate::context::Context;
use crate::dispatcher::{dispatch, DispatchReply};
use crate::router::RoutingTable;
use http::Method;
use may_minihttp::{HttpService, Request, Response};
use serde_json::json;
use std::io;
use std::sync::Arc;
use tracing::{error, info};

/// The compiled per-request pipeline, shared immutably across the engine's
/// connection coroutines.
///
/// Per request: parse → CORS → resolve → rate-limit guard → middleware
/// chain → cache → dispatch-wrapped handler → write. All state reached from
/// here is either immutable (routing table, CORS policy) or internally
/// synchronized (limiter/cache stores), so no locking happens on this path.
#[derive(Clone)]
pub struct AppService {
    pub routes: Arc<RoutingTable>,
    pub cors: Arc<CorsPolicy>,
}

impl AppService {
    #[must_use]
    pub fn new(routes: Arc<RoutingTable>, cors: Arc<CorsPolicy>) -> Self {
        AppService { routes, cors }
    }
}

impl HttpService for AppService {
    fn call(&mut self, req: Request, res: &mut Response) -> io::Result<()> {
        let mut parts = parse_request(req);

        self.cors.apply(res);
        if parts.method == Method::OPTIONS {
            res.status_code(204, "No Content");
            return Ok(());
        }

        let (route, path_params) = match self.routes.resolve(&parts.method, &parts.path) {
            Some(found) => found,
            None => {
                write_json_error(
                    res,
                    404,
                    json!({ "error": "Not Found", "method": parts.method.as_str(), "path": parts.path }),
                );
                return Ok(());
            }
        };
        parts.path_params = path_params;

        if let Some(limiter) = &route.limiter {
            if !limiter.allow(&parts.client_ip()) {
                write_json_error(res, 429, json!({ "error": "Too Many Requests" }));
                return Ok(());
            }
        }

        // An armed middleware response terminates the request with it.
        for mw in &route.chain {
            let mut ctx = Context::<()>::new(parts.clone());
            (mw)(&mut ctx);
            if ctx.has_response() {
                let wire = wire_from_reply(ctx.into_reply(), &parts.path);
                write_wire(res, &wire);
                return Ok(());
            }
        }

        let cache_key = format!("{} {}", parts.method, parts.target);
        if let Some(cache) = &route.cache {
            if let Some(hit) = cache.get(&cache_key) {
                write_wire(res, &hit);
                return Ok(());
            }
        }

        let path = parts.path.clone();
        match dispatch(&route.sender, parts) {
            Some(reply) => {
                let wire = wire_from_reply(reply, &path);
                if let Some(cache) = &route.cache {
                    cache.put(&cache_key, wire.clone());
                }
                write_wire(res, &wire);
            }
            None => {
                write_json_error(
                    res,
                    503,
                    json!({ "error": "handler unavailable", "path": path }),
                );
            }
        }
        Ok(())
    }
}

/// Materialize a dispatch reply into its wire form.
///
/// A file reply passes through untouched; a handler that never armed a
/// response is a framework-level fault answered with a fixed 500.
fn wire_from_reply(reply: DispatchReply, path: &str) -> CachedResponse {
    match reply {
        DispatchReply::Envelope { status, envelope } => CachedResponse {
            status,
            content_type: "application/json".to_string(),
            disposition: None,
            body: serde_json::to_vec(&envelope).unwrap_or_else(|e| {
                error!(path, error = %e, "envelope serialization failed");
                b"{}".to_vec()
            }),
        },
        DispatchReply::File {
            status,
            content_type,
            disposition,
            bytes,
        } => {
            info!(path, size = bytes.len(), "file response");
            CachedResponse {
                status,
                content_type,
                disposition: Some(disposition),
                body: bytes,
            }
        }
        DispatchReply::Unanswered => {
            error!(path, "service did not respond");
            CachedResponse {
                status: 500,
                content_type: "application/json".to_string(),
                disposition: None,
                body: json!({ "message": "service did not respond" })
                    .to_string()
                    .into_bytes(),
            }
        }
    }
}
