//! Compiled routing table: path patterns, parameter extraction and
//! last-registered-wins resolution.

mod core;

pub use core::{trim_route, CompiledRoute, ParamVec, PathPattern, RoutingTable, MAX_INLINE_PARAMS};
