//! Coroutine-based endpoint dispatch.
//!
//! Every compiled endpoint owns one coroutine consuming a channel of
//! [`EndpointRequest`]s. The serving side sends a request together with a
//! reply channel and blocks on the answer; the coroutine side builds a fresh
//! typed [`Context`](crate::context::Context), runs the user handler behind a
//! panic wall and converts the context's terminal state into a
//! [`DispatchReply`].

mod core;

pub use core::{
    dispatch, spawn_endpoint, DispatchReply, EndpointRequest, HandlerSender, HeaderVec,
    RequestParts, MAX_INLINE_HEADERS,
};
