use crate::config::{HEADER_AUTHORIZATION, HEADER_X_LOCALE};
use crate::dispatcher::{DispatchReply, RequestParts};
use crate::envelope::{Envelope, Pagination, Sorting};
use crate::ids::TraceId;
use chrono::{SecondsFormat, Utc};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use std::time::Instant;
use tracing::{debug, error, info};

/// Terminal state of a context. Arms exactly once.
#[derive(Debug, Clone)]
enum ResponseState {
    Pending,
    Enveloped(Envelope),
    File {
        content_type: String,
        disposition: String,
        bytes: Vec<u8>,
    },
}

/// Per-request wrapper around the inbound request and the eventual outbound
/// response, generically typed over the expected payload.
///
/// Construction generates a unique trace id, eagerly decodes the JSON body
/// into `T` (decode failures leave `T::default()` - handlers must validate)
/// and records the start time used for the envelope's `duration`.
///
/// All completion operations are idempotent-guarded: the first call wins,
/// every later call logs a "double response" warning and changes nothing.
pub struct Context<T> {
    trace_id: TraceId,
    /// Decoded request payload; `T::default()` when the body was absent or
    /// failed to decode.
    pub request: T,
    parts: RequestParts,
    started: Instant,
    status: u16,
    state: ResponseState,
}

impl<T: DeserializeOwned + Default> Context<T> {
    pub fn new(parts: RequestParts) -> Self {
        let request = match parts.body.clone() {
            Some(body) => serde_json::from_value(body).unwrap_or_else(|e| {
                debug!(path = %parts.path, error = %e, "request payload decode failed");
                T::default()
            }),
            None => T::default(),
        };
        Context {
            trace_id: TraceId::new(),
            request,
            parts,
            started: Instant::now(),
            status: 0,
            state: ResponseState::Pending,
        }
    }
}

impl<T> Context<T> {
    /// Arm a success envelope with status 200.
    pub fn ok(&mut self, data: impl Serialize, pagination: Option<Pagination>) {
        if self.double_response() {
            return;
        }
        let data = match serde_json::to_value(data) {
            Ok(v) => Some(v),
            Err(e) => {
                self.log_error(&format!("response serialization failed: {e}"));
                Some(Value::Null)
            }
        };
        self.state = ResponseState::Enveloped(self.build_envelope(true, None, data, pagination));
        self.status = 200;
    }

    /// Arm an inline file response. The content type is inferred from the
    /// filename extension; `None` or an empty name falls back to `"file"`.
    pub fn ok_file(&mut self, bytes: Vec<u8>, filename: Option<&str>) {
        if self.double_response() {
            return;
        }
        let name = normalize_filename(filename);
        self.state = ResponseState::File {
            content_type: content_type_for(&name),
            disposition: format!("filename={name}"),
            bytes,
        };
        self.status = 200;
    }

    /// Arm a download response served as `application/octet-stream`.
    pub fn ok_download(&mut self, bytes: Vec<u8>, filename: Option<&str>) {
        if self.double_response() {
            return;
        }
        let name = normalize_filename(filename);
        self.state = ResponseState::File {
            content_type: "application/octet-stream".to_string(),
            disposition: format!("filename={name}"),
            bytes,
        };
        self.status = 200;
    }

    /// Arm a failure envelope with status 400.
    pub fn err(&mut self, message: &str) {
        self.fail(400, message);
    }

    /// Arm a failure envelope with status 401.
    pub fn unauthorized(&mut self, message: &str) {
        self.fail(401, message);
    }

    /// Arm a failure envelope with status 403.
    pub fn forbidden(&mut self, message: &str) {
        self.fail(403, message);
    }

    /// Arm a failure envelope with status 500.
    pub fn internal_error(&mut self, message: &str) {
        self.fail(500, message);
    }

    fn fail(&mut self, status: u16, message: &str) {
        if self.double_response() {
            return;
        }
        self.state = ResponseState::Enveloped(self.build_envelope(
            false,
            Some(message.to_string()),
            None,
            None,
        ));
        self.status = status;
    }

    fn build_envelope(
        &self,
        success: bool,
        err_message: Option<String>,
        data: Option<Value>,
        pagination: Option<Pagination>,
    ) -> Envelope {
        Envelope {
            success,
            time: Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true),
            trace_id: self.trace_id.to_string(),
            duration: self.started.elapsed().as_millis() as i64,
            pagination,
            err_message,
            data,
        }
    }

    fn double_response(&self) -> bool {
        if matches!(self.state, ResponseState::Pending) {
            false
        } else {
            self.log_error("double response");
            true
        }
    }

    /// Whether any completion operation has armed a response.
    #[must_use]
    pub fn has_response(&self) -> bool {
        !matches!(self.state, ResponseState::Pending)
    }

    /// Whether the armed response is a raw file (non-enveloped).
    #[must_use]
    pub fn is_file(&self) -> bool {
        matches!(self.state, ResponseState::File { .. })
    }

    /// Terminal HTTP status, 0 while unarmed.
    #[must_use]
    pub fn status(&self) -> u16 {
        self.status
    }

    /// The armed envelope, if the response is enveloped.
    #[must_use]
    pub fn envelope(&self) -> Option<&Envelope> {
        match &self.state {
            ResponseState::Enveloped(env) => Some(env),
            _ => None,
        }
    }

    /// Convert the terminal state into a dispatch reply.
    pub(crate) fn into_reply(self) -> DispatchReply {
        match self.state {
            ResponseState::Pending => DispatchReply::Unanswered,
            ResponseState::Enveloped(envelope) => DispatchReply::Envelope {
                status: self.status,
                envelope,
            },
            ResponseState::File {
                content_type,
                disposition,
                bytes,
            } => DispatchReply::File {
                status: self.status,
                content_type,
                disposition,
                bytes,
            },
        }
    }

    pub fn trace_id(&self) -> TraceId {
        self.trace_id
    }

    pub fn method(&self) -> &http::Method {
        &self.parts.method
    }

    pub fn path(&self) -> &str {
        &self.parts.path
    }

    /// A query parameter by name; last occurrence wins.
    pub fn query(&self, name: &str) -> Option<&str> {
        self.parts.query_param(name)
    }

    /// A path parameter extracted from a `:name` segment.
    pub fn param(&self, name: &str) -> Option<&str> {
        self.parts.path_param(name)
    }

    /// A header by name, case-insensitive; empty string when absent.
    pub fn header(&self, name: &str) -> &str {
        self.parts.header(name).unwrap_or("")
    }

    /// Paging values decoded from the query string.
    pub fn pagination(&self) -> Pagination {
        Pagination {
            page: self.query_u64("page"),
            size: self.query_u64("size"),
            total: None,
        }
    }

    /// Sort selector decoded from the query string.
    pub fn sorting(&self) -> Sorting {
        Sorting {
            sort_by: self.query("sort_by").unwrap_or("").to_string(),
            descending: self.query("descending") == Some("true"),
        }
    }

    fn query_u64(&self, name: &str) -> u64 {
        self.query(name)
            .and_then(|v| v.parse().ok())
            .unwrap_or_default()
    }

    /// The `X-Locale` header.
    pub fn locale(&self) -> &str {
        self.header(HEADER_X_LOCALE)
    }

    /// The raw `Authorization` header.
    pub fn authorization(&self) -> &str {
        self.header(HEADER_AUTHORIZATION)
    }

    /// The bearer token from the `Authorization` header: the scheme word is
    /// removed in any casing, along with all spaces; a value without a
    /// scheme word passes through minus spaces.
    pub fn bearer_token(&self) -> String {
        self.authorization()
            .replace("Bearer", "")
            .replace("BEARER", "bearer")
            .replace("bearer", "")
            .replace(' ', "")
    }

    /// Client address from forwarding headers; `"unknown"` when no proxy
    /// header is present (the HTTP engine does not expose the peer).
    pub fn ip(&self) -> String {
        self.parts.client_ip()
    }

    /// The `User-Agent` header.
    pub fn agent(&self) -> &str {
        self.header("user-agent")
    }

    /// Log an error-severity message prefixed with trace id, ip and agent.
    pub fn log_error(&self, message: &str) {
        error!(trace_id = %self.trace_id, ip = %self.ip(), agent = %self.agent(), "{message}");
    }

    /// Log an info-severity message prefixed with trace id, ip and agent.
    pub fn log_info(&self, message: &str) {
        info!(trace_id = %self.trace_id, ip = %self.ip(), agent = %self.agent(), "{message}");
    }

    /// Log a debug-severity message prefixed with trace id, ip and agent.
    pub fn log_debug(&self, message: &str) {
        debug!(trace_id = %self.trace_id, ip = %self.ip(), agent = %self.agent(), "{message}");
    }
}

fn normalize_filename(filename: Option<&str>) -> String {
    match filename {
        None | Some("") => "file".to_string(),
        Some(name) => name.to_string(),
    }
}

/// Infer a content type from a filename extension.
fn content_type_for(name: &str) -> String {
    let ext = name.rsplit('.').next().unwrap_or("").to_ascii_lowercase();
    let ct = match ext.as_str() {
        "html" | "htm" => "text/html",
        "css" => "text/css",
        "js" => "application/javascript",
        "json" => "application/json",
        "xml" => "application/xml",
        "txt" => "text/plain",
        "csv" => "text/csv",
        "pdf" => "application/pdf",
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "gif" => "image/gif",
        "svg" => "image/svg+xml",
        "zip" => "application/zip",
        "mp3" => "audio/mpeg",
        "mp4" => "video/mp4",
        _ => "application/octet-stream",
    };
    ct.to_string()
}
