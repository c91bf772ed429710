use crate::dispatcher::{HeaderVec, RequestParts};
use crate::router::{trim_route, ParamVec};
use http::Method;
use may_minihttp::Request;
use std::io::Read;
use std::sync::Arc;
use tracing::debug;

/// Decode a raw query string (without the `?`) into parameter pairs.
pub(crate) fn parse_query_params(query: Option<&str>) -> ParamVec {
    let mut out = ParamVec::new();
    if let Some(raw) = query {
        for (k, v) in url::form_urlencoded::parse(raw.as_bytes()) {
            out.push((Arc::from(k.as_ref()), v.to_string()));
        }
    }
    out
}

/// Extract everything the layer needs from a raw engine request.
///
/// Header names are lowercased, the query string is split off the target,
/// the path is trailing-slash-trimmed to match how routes are installed,
/// and the body is parsed as JSON when present. Path parameters are filled
/// in after route resolution.
pub(crate) fn parse_request(req: Request) -> RequestParts {
    let method = req
        .method()
        .parse::<Method>()
        .unwrap_or(Method::GET);
    let target = req.path().to_string();
    let (path, query) = match target.split_once('?') {
        Some((p, q)) => (p, Some(q)),
        None => (target.as_str(), None),
    };

    let mut headers = HeaderVec::new();
    for h in req.headers() {
        headers.push((
            Arc::from(h.name.to_ascii_lowercase().as_str()),
            String::from_utf8_lossy(h.value).to_string(),
        ));
    }

    let query = parse_query_params(query);

    let body = {
        let mut body_str = String::new();
        match req.body().read_to_string(&mut body_str) {
            Ok(size) if size > 0 => match serde_json::from_str(&body_str) {
                Ok(json) => Some(json),
                Err(e) => {
                    debug!(error = %e, size, "request body is not JSON");
                    None
                }
            },
            _ => None,
        }
    };

    RequestParts {
        method,
        path: trim_route(path).to_string(),
        target,
        headers,
        path_params: ParamVec::new(),
        query,
        body,
    }
}
