//! End-to-end tests for the compiled HTTP pipeline: registration through
//! envelope responses over real TCP.

mod common;

use common::http::send_request;
use common::test_server::{ephemeral_addr, setup_may_runtime};
use gantry::{AppHandle, Context, Registry};
use serde_json::{json, Value};

fn start(registry: Registry) -> AppHandle {
    setup_may_runtime();
    let handle = registry
        .start_on(&ephemeral_addr(), &ephemeral_addr())
        .unwrap();
    handle.wait_ready().unwrap();
    handle
}

#[test]
fn ping_round_trip_with_fresh_trace_ids() {
    let mut registry = Registry::new();
    registry.get("/ping", |ctx: &mut Context<()>| ctx.ok("pong", None), None);
    let handle = start(registry);

    let first = send_request(handle.addr, "GET", "/ping", &[], None);
    assert_eq!(first.status, 200);
    let env: Value = serde_json::from_str(&first.body).unwrap();
    assert_eq!(env["success"], json!(true));
    assert_eq!(env["data"], json!("pong"));
    assert!(env["duration"].as_i64().unwrap() >= 0);

    let second = send_request(handle.addr, "GET", "/ping", &[], None);
    let env2: Value = serde_json::from_str(&second.body).unwrap();
    assert_ne!(env["trace_id"], env2["trace_id"]);
    assert!(!env2["trace_id"].as_str().unwrap().is_empty());

    handle.stop();
}

#[test]
fn unknown_route_is_plain_404() {
    let mut registry = Registry::new();
    registry.get("/known", |ctx: &mut Context<()>| ctx.ok(1, None), None);
    let handle = start(registry);

    let resp = send_request(handle.addr, "GET", "/missing", &[], None);
    assert_eq!(resp.status, 404);
    let body: Value = serde_json::from_str(&resp.body).unwrap();
    assert_eq!(body["error"], json!("Not Found"));

    handle.stop();
}

#[test]
fn typed_payload_reaches_handler() {
    #[derive(serde::Deserialize, Default)]
    struct CreateUser {
        name: String,
    }

    let mut registry = Registry::new();
    registry.post(
        "/users",
        |ctx: &mut Context<CreateUser>| {
            let name = ctx.request.name.clone();
            ctx.ok(json!({ "created": name }), None);
        },
        None,
    );
    let handle = start(registry);

    let resp = send_request(
        handle.addr,
        "POST",
        "/users",
        &[("Content-Type", "application/json")],
        Some(r#"{"name":"ada"}"#),
    );
    assert_eq!(resp.status, 200);
    let env: Value = serde_json::from_str(&resp.body).unwrap();
    assert_eq!(env["data"]["created"], json!("ada"));

    handle.stop();
}

#[test]
fn path_params_and_trailing_slash() {
    let mut registry = Registry::new();
    registry.get(
        "/users/:id/",
        |ctx: &mut Context<()>| {
            let id = ctx.param("id").unwrap_or("").to_string();
            ctx.ok(json!({ "id": id }), None);
        },
        None,
    );
    let handle = start(registry);

    let resp = send_request(handle.addr, "GET", "/users/42", &[], None);
    assert_eq!(resp.status, 200);
    let env: Value = serde_json::from_str(&resp.body).unwrap();
    assert_eq!(env["data"]["id"], json!("42"));

    handle.stop();
}

#[test]
fn duplicate_registration_last_wins() {
    let mut registry = Registry::new();
    registry.get("/dup", |ctx: &mut Context<()>| ctx.ok("first", None), None);
    registry.get("/dup", |ctx: &mut Context<()>| ctx.ok("second", None), None);
    let handle = start(registry);

    let resp = send_request(handle.addr, "GET", "/dup", &[], None);
    let env: Value = serde_json::from_str(&resp.body).unwrap();
    assert_eq!(env["data"], json!("second"));

    handle.stop();
}

#[test]
fn file_response_bypasses_envelope() {
    let mut registry = Registry::new();
    registry.get(
        "/export",
        |ctx: &mut Context<()>| ctx.ok_download(b"csv,data".to_vec(), Some("report.csv")),
        None,
    );
    let handle = start(registry);

    let resp = send_request(handle.addr, "GET", "/export", &[], None);
    assert_eq!(resp.status, 200);
    assert_eq!(
        resp.headers.get("content-disposition").map(String::as_str),
        Some("filename=report.csv")
    );
    assert_eq!(
        resp.headers.get("content-type").map(String::as_str),
        Some("application/octet-stream")
    );
    assert_eq!(resp.body, "csv,data");

    handle.stop();
}

#[test]
fn silent_handler_is_a_framework_fault() {
    let mut registry = Registry::new();
    registry.get("/silent", |_ctx: &mut Context<()>| {}, None);
    let handle = start(registry);

    let resp = send_request(handle.addr, "GET", "/silent", &[], None);
    assert_eq!(resp.status, 500);
    let body: Value = serde_json::from_str(&resp.body).unwrap();
    assert_eq!(body["message"], json!("service did not respond"));

    handle.stop();
}

#[test]
fn handler_panic_answers_500() {
    let mut registry = Registry::new();
    registry.get(
        "/explode",
        |_ctx: &mut Context<()>| panic!("kaboom"),
        None,
    );
    let handle = start(registry);

    let resp = send_request(handle.addr, "GET", "/explode", &[], None);
    assert_eq!(resp.status, 500);
    let env: Value = serde_json::from_str(&resp.body).unwrap();
    assert_eq!(env["success"], json!(false));

    handle.stop();
}

#[test]
fn cors_headers_and_preflight() {
    let mut registry = Registry::new();
    registry.get("/ping", |ctx: &mut Context<()>| ctx.ok(1, None), None);
    let handle = start(registry);

    let resp = send_request(handle.addr, "OPTIONS", "/ping", &[], None);
    assert_eq!(resp.status, 204);
    assert!(resp.headers.contains_key("access-control-allow-origin"));

    let resp = send_request(handle.addr, "GET", "/ping", &[], None);
    assert!(resp.headers.contains_key("access-control-allow-methods"));

    handle.stop();
}
