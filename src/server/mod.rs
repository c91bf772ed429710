//! HTTP serving: the engine wrapper, request parsing, the per-request
//! pipeline and response writing.

mod cors;
mod http_server;
mod request;
mod response;
mod service;

pub use cors::CorsPolicy;
pub use http_server::{HttpServer, ServerHandle};
pub use service::AppService;

pub(crate) use request::parse_query_params;
