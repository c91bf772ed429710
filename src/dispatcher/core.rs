//! Dispatcher core - hot path for request dispatch.

use crate::context::Context;
use crate::envelope::Envelope;
use crate::ids::TraceId;
use crate::router::ParamVec;
use chrono::{SecondsFormat, Utc};
use http::Method;
use may::coroutine;
use may::sync::mpsc;
use serde::de::DeserializeOwned;
use serde_json::Value;
use smallvec::SmallVec;
use std::sync::Arc;
use tracing::error;

/// Maximum inline headers before heap allocation.
/// Most requests carry ≤16 headers (no heap in the hot path).
pub const MAX_INLINE_HEADERS: usize = 16;

/// Stack-allocated header storage for the hot path.
///
/// Header names use `Arc<str>` because they repeat across requests
/// (`content-type`, `authorization`, ...) and `Arc::clone()` is an O(1)
/// atomic increment; values stay `String` as per-request data.
pub type HeaderVec = SmallVec<[(Arc<str>, String); MAX_INLINE_HEADERS]>;

/// Everything the layer extracted from one inbound HTTP request.
///
/// Owned by exactly one in-flight request; the serving side clones it per
/// middleware invocation and moves it into the handler coroutine.
#[derive(Debug, Clone)]
pub struct RequestParts {
    pub method: Method,
    /// Request path with the query string stripped and trailing slashes
    /// trimmed.
    pub path: String,
    /// Original request target (path plus query string), used as the
    /// response-cache key.
    pub target: String,
    /// Headers with lowercase names.
    pub headers: HeaderVec,
    /// Parameters extracted from `:name` path segments.
    pub path_params: ParamVec,
    /// Decoded query string parameters.
    pub query: ParamVec,
    /// Request body parsed as JSON, when present and parseable.
    pub body: Option<Value>,
}

impl RequestParts {
    /// Look up a header by name, case-insensitive.
    #[inline]
    #[must_use]
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// Look up a query parameter by name; last occurrence wins.
    #[inline]
    #[must_use]
    pub fn query_param(&self, name: &str) -> Option<&str> {
        self.query
            .iter()
            .rfind(|(k, _)| k.as_ref() == name)
            .map(|(_, v)| v.as_str())
    }

    /// Look up a path parameter by name; last occurrence wins when a name
    /// repeats at different path depths.
    #[inline]
    #[must_use]
    pub fn path_param(&self, name: &str) -> Option<&str> {
        self.path_params
            .iter()
            .rfind(|(k, _)| k.as_ref() == name)
            .map(|(_, v)| v.as_str())
    }

    /// Client address from forwarding headers; `"unknown"` when no proxy
    /// header is present (the engine does not expose the peer address).
    #[must_use]
    pub fn client_ip(&self) -> String {
        if let Some(fwd) = self.header("x-forwarded-for") {
            if let Some(first) = fwd.split(',').next() {
                let first = first.trim();
                if !first.is_empty() {
                    return first.to_string();
                }
            }
        }
        self.header("x-real-ip").unwrap_or("unknown").to_string()
    }
}

/// Terminal outcome of one handler invocation, sent back over the reply
/// channel.
#[derive(Debug, Clone)]
pub enum DispatchReply {
    /// The context armed a JSON envelope.
    Envelope { status: u16, envelope: Envelope },
    /// The context armed a raw byte response; the serving side must not
    /// wrap it in an envelope.
    File {
        status: u16,
        content_type: String,
        disposition: String,
        bytes: Vec<u8>,
    },
    /// The handler returned without arming any response - a framework-level
    /// fault answered with a fixed 500.
    Unanswered,
}

impl DispatchReply {
    /// Substitute reply for a handler that panicked. Carries a fresh trace
    /// id since the panicking context is gone.
    pub(crate) fn panicked() -> Self {
        DispatchReply::Envelope {
            status: 500,
            envelope: Envelope {
                success: false,
                time: Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true),
                trace_id: TraceId::new().to_string(),
                duration: 0,
                pagination: None,
                err_message: Some("internal error".to_string()),
                data: None,
            },
        }
    }
}

/// Request plus its reply channel, as delivered to a handler coroutine.
pub struct EndpointRequest {
    pub parts: RequestParts,
    pub reply_tx: mpsc::Sender<DispatchReply>,
}

/// Channel sender feeding one endpoint's coroutine.
pub type HandlerSender = mpsc::Sender<EndpointRequest>;

/// Spawn the coroutine for one compiled endpoint and return its sender.
///
/// The coroutine loops over inbound requests until the sender side is
/// dropped (which only happens at process exit - compiled routes are never
/// removed). Handler panics are caught and answered with a 500 so one bad
/// request cannot take the endpoint down.
pub fn spawn_endpoint<T, F>(handler: F, stack_size: usize) -> HandlerSender
where
    T: DeserializeOwned + Default + 'static,
    F: Fn(&mut Context<T>) + Send + 'static,
{
    let (tx, rx) = mpsc::channel::<EndpointRequest>();

    // SAFETY: may::coroutine::Builder::spawn() is marked unsafe by the may
    // runtime. The closure owns only moved data, the handler is Send +
    // 'static, and every request is answered through its reply channel,
    // panics included, so no caller can observe a half-processed request.
    let spawned = unsafe {
        coroutine::Builder::new()
            .stack_size(stack_size)
            .spawn(move || {
                for req in rx.iter() {
                    let EndpointRequest { parts, reply_tx } = req;
                    let outcome = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
                        let mut ctx = Context::<T>::new(parts);
                        handler(&mut ctx);
                        ctx.into_reply()
                    }));
                    let reply = match outcome {
                        Ok(reply) => reply,
                        Err(panic) => {
                            error!(panic = ?panic, "handler panicked");
                            DispatchReply::panicked()
                        }
                    };
                    let _ = reply_tx.send(reply);
                }
            })
    };

    if let Err(e) = spawned {
        // The sender is still returned; sends will fail and surface as a
        // channel-closed dispatch, never as a hang.
        error!(error = %e, stack_size, "failed to spawn handler coroutine");
    }

    tx
}

/// Send one request to an endpoint coroutine and wait for its reply.
///
/// Returns `None` when the coroutine is gone (spawn failure or crash); the
/// serving side reports that as a 503.
#[must_use]
pub fn dispatch(sender: &HandlerSender, parts: RequestParts) -> Option<DispatchReply> {
    let (reply_tx, reply_rx) = mpsc::channel();
    let path = parts.path.clone();
    if sender.send(EndpointRequest { parts, reply_tx }).is_err() {
        error!(path = %path, "handler coroutine unavailable");
        return None;
    }
    match reply_rx.recv() {
        Ok(reply) => Some(reply),
        Err(e) => {
            error!(path = %path, error = %e, "handler reply channel closed");
            None
        }
    }
}
