//! Per-route chain behavior over real TCP: middleware gating and ordering,
//! rate limiting, response caching.

mod common;

use common::http::send_request;
use common::test_server::{ephemeral_addr, setup_may_runtime};
use gantry::{AppHandle, CacheOpt, Context, EndpointOpts, RateLimitOpt, Registry, SkipScope};
use serde_json::{json, Value};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

fn start(registry: Registry) -> AppHandle {
    setup_may_runtime();
    let handle = registry
        .start_on(&ephemeral_addr(), &ephemeral_addr())
        .unwrap();
    handle.wait_ready().unwrap();
    handle
}

#[test]
fn middleware_gates_matching_routes_only() {
    let mut registry = Registry::new();
    registry.middleware(
        |ctx| {
            if ctx.bearer_token() != "secret" {
                ctx.unauthorized("missing token");
            }
        },
        &["^/admin"],
        &[],
    );
    registry.get("/admin/settings", |ctx: &mut Context<()>| ctx.ok("admin", None), None);
    registry.get("/public/info", |ctx: &mut Context<()>| ctx.ok("public", None), None);
    let handle = start(registry);

    let resp = send_request(handle.addr, "GET", "/admin/settings", &[], None);
    assert_eq!(resp.status, 401);
    let env: Value = serde_json::from_str(&resp.body).unwrap();
    assert_eq!(env["success"], json!(false));
    assert_eq!(env["err_message"], json!("missing token"));

    let resp = send_request(
        handle.addr,
        "GET",
        "/admin/settings",
        &[("Authorization", "Bearer secret")],
        None,
    );
    assert_eq!(resp.status, 200);

    let resp = send_request(handle.addr, "GET", "/public/info", &[], None);
    assert_eq!(resp.status, 200);

    handle.stop();
}

#[test]
fn later_registered_middleware_runs_first() {
    let order = Arc::new(Mutex::new(Vec::new()));
    let mut registry = Registry::new();
    let first = Arc::clone(&order);
    registry.middleware(
        move |_ctx| first.lock().unwrap().push("first-registered"),
        &["^/traced"],
        &[],
    );
    let second = Arc::clone(&order);
    registry.middleware(
        move |_ctx| second.lock().unwrap().push("second-registered"),
        &["^/traced"],
        &[],
    );
    registry.get("/traced", |ctx: &mut Context<()>| ctx.ok(1, None), None);
    let handle = start(registry);

    let resp = send_request(handle.addr, "GET", "/traced", &[], None);
    assert_eq!(resp.status, 200);
    assert_eq!(
        *order.lock().unwrap(),
        vec!["second-registered", "first-registered"]
    );

    handle.stop();
}

#[test]
fn skip_pattern_suppresses_remaining_descriptors_by_default() {
    let hits = Arc::new(AtomicUsize::new(0));
    let mut registry = Registry::new();
    let h1 = Arc::clone(&hits);
    registry.middleware(
        move |_ctx| {
            h1.fetch_add(1, Ordering::SeqCst);
        },
        &["^/api"],
        &["^/api/open"],
    );
    let h2 = Arc::clone(&hits);
    registry.middleware(
        move |_ctx| {
            h2.fetch_add(1, Ordering::SeqCst);
        },
        &["^/api"],
        &[],
    );
    registry.get("/api/open/ping", |ctx: &mut Context<()>| ctx.ok(1, None), None);
    let handle = start(registry);

    let resp = send_request(handle.addr, "GET", "/api/open/ping", &[], None);
    assert_eq!(resp.status, 200);
    // The skip on the first descriptor also suppressed the second.
    assert_eq!(hits.load(Ordering::SeqCst), 0);

    handle.stop();
}

#[test]
fn descriptor_only_skip_scope_spares_later_descriptors() {
    let hits = Arc::new(AtomicUsize::new(0));
    let mut registry = Registry::new();
    registry.set_skip_scope(SkipScope::DescriptorOnly);
    let h1 = Arc::clone(&hits);
    registry.middleware(
        move |_ctx| {
            h1.fetch_add(1, Ordering::SeqCst);
        },
        &["^/api"],
        &["^/api/open"],
    );
    let h2 = Arc::clone(&hits);
    registry.middleware(
        move |_ctx| {
            h2.fetch_add(1, Ordering::SeqCst);
        },
        &["^/api"],
        &[],
    );
    registry.get("/api/open/ping", |ctx: &mut Context<()>| ctx.ok(1, None), None);
    let handle = start(registry);

    let resp = send_request(handle.addr, "GET", "/api/open/ping", &[], None);
    assert_eq!(resp.status, 200);
    assert_eq!(hits.load(Ordering::SeqCst), 1);

    handle.stop();
}

#[test]
fn middleware_without_match_patterns_never_applies() {
    let hits = Arc::new(AtomicUsize::new(0));
    let mut registry = Registry::new();
    let h = Arc::clone(&hits);
    registry.middleware(
        move |_ctx| {
            h.fetch_add(1, Ordering::SeqCst);
        },
        &[],
        &[],
    );
    registry.get("/anything", |ctx: &mut Context<()>| ctx.ok(1, None), None);
    let handle = start(registry);

    let resp = send_request(handle.addr, "GET", "/anything", &[], None);
    assert_eq!(resp.status, 200);
    assert_eq!(hits.load(Ordering::SeqCst), 0);

    handle.stop();
}

#[test]
fn rate_limit_guards_the_route() {
    let mut registry = Registry::new();
    registry.get(
        "/limited",
        |ctx: &mut Context<()>| ctx.ok(1, None),
        Some(EndpointOpts {
            rate_limit: Some(RateLimitOpt {
                rate: 2,
                per: Duration::from_secs(60),
            }),
            ..Default::default()
        }),
    );
    registry.get("/open", |ctx: &mut Context<()>| ctx.ok(1, None), None);
    let handle = start(registry);

    assert_eq!(send_request(handle.addr, "GET", "/limited", &[], None).status, 200);
    assert_eq!(send_request(handle.addr, "GET", "/limited", &[], None).status, 200);
    let resp = send_request(handle.addr, "GET", "/limited", &[], None);
    assert_eq!(resp.status, 429);
    // Other routes are not guarded.
    assert_eq!(send_request(handle.addr, "GET", "/open", &[], None).status, 200);

    handle.stop();
}

#[test]
fn cached_route_replays_the_first_response() {
    let calls = Arc::new(AtomicUsize::new(0));
    let mut registry = Registry::new();
    let c = Arc::clone(&calls);
    registry.get(
        "/cached",
        move |ctx: &mut Context<()>| {
            let n = c.fetch_add(1, Ordering::SeqCst);
            ctx.ok(json!({ "call": n }), None);
        },
        Some(EndpointOpts {
            cache: Some(CacheOpt {
                ttl: Duration::from_secs(30),
            }),
            ..Default::default()
        }),
    );
    let handle = start(registry);

    let first = send_request(handle.addr, "GET", "/cached", &[], None);
    let second = send_request(handle.addr, "GET", "/cached", &[], None);
    assert_eq!(first.status, 200);
    // Byte-identical replay, trace id included.
    assert_eq!(first.body, second.body);
    assert_eq!(calls.load(Ordering::SeqCst), 1);

    // A different query string is a different cache key.
    let other = send_request(handle.addr, "GET", "/cached?page=2", &[], None);
    let env: Value = serde_json::from_str(&other.body).unwrap();
    assert_eq!(env["data"]["call"], json!(1));

    handle.stop();
}
