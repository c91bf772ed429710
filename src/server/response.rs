use crate::cache::CachedResponse;
use may_minihttp::Response;
use serde_json::Value;

fn status_reason(status: u16) -> &'static str {
    match status {
        200 => "OK",
        201 => "Created",
        204 => "No Content",
        400 => "Bad Request",
        401 => "Unauthorized",
        403 => "Forbidden",
        404 => "Not Found",
        429 => "Too Many Requests",
        500 => "Internal Server Error",
        503 => "Service Unavailable",
        _ => "OK",
    }
}

/// Write a materialized response, replayed from cache or freshly produced.
pub(crate) fn write_wire(res: &mut Response, wire: &CachedResponse) {
    res.status_code(wire.status as usize, status_reason(wire.status));
    let ct = format!("Content-Type: {}", wire.content_type).into_boxed_str();
    res.header(Box::leak(ct));
    if let Some(disposition) = &wire.disposition {
        let header = format!("Content-Disposition: {disposition}").into_boxed_str();
        res.header(Box::leak(header));
    }
    res.body_vec(wire.body.clone());
}

/// Write a plain JSON error (non-enveloped: produced before any context
/// exists).
pub(crate) fn write_json_error(res: &mut Response, status: u16, body: Value) {
    res.status_code(status as usize, status_reason(status));
    res.header("Content-Type: application/json");
    res.body_vec(body.to_string().into_bytes());
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_reason() {
        assert_eq!(status_reason(200), "OK");
        assert_eq!(status_reason(429), "Too Many Requests");
        assert_eq!(status_reason(418), "OK");
    }
}
