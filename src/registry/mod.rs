//! Declaration store and startup sequencing.
//!
//! A [`Registry`] is populated by registration calls on a single
//! initialization thread, then consumed by [`Registry::run`] /
//! [`Registry::start`], which compile the declarations into immutable
//! routing tables and start serving. Nothing can be registered afterwards.

mod core;
mod run;

pub use core::{
    CacheOpt, ClientOpt, CronDescriptor, EndpointDescriptor, EndpointOpts, InitJobDescriptor,
    InitStage, ModelDecl, RateLimitOpt, Registry, RegistryConfig, StorageContext,
    WebsocketDescriptor,
};
pub use run::AppHandle;
