//! Websocket route tests: upgrade, echo, middleware-gated handshakes.

mod common;

use common::test_server::{ephemeral_addr, setup_may_runtime};
use gantry::{Context, Registry};
use tungstenite::Message;

#[test]
fn websocket_echo_round_trip() {
    setup_may_runtime();
    let mut registry = Registry::new();
    registry.websocket("/ws/echo", |_ctx, socket| {
        if let Ok(msg) = socket.read() {
            if msg.is_text() {
                let _ = socket.send(msg);
            }
        }
    });
    // An HTTP route too, so both listeners come up.
    registry.get("/ping", |ctx: &mut Context<()>| ctx.ok(1, None), None);

    let handle = registry
        .start_on(&ephemeral_addr(), &ephemeral_addr())
        .unwrap();
    handle.wait_ready().unwrap();
    let ws_addr = handle.ws_addr.unwrap();

    let (mut client, _resp) =
        tungstenite::connect(format!("ws://{ws_addr}/ws/echo")).unwrap();
    client.send(Message::Text("hello".into())).unwrap();
    let echoed = client.read().unwrap();
    assert_eq!(echoed.into_text().unwrap(), "hello");

    // Server closes the socket unconditionally after the handler returns.
    loop {
        match client.read() {
            Ok(Message::Close(_)) | Err(_) => break,
            Ok(_) => continue,
        }
    }

    handle.stop();
}

#[test]
fn unknown_socket_route_rejects_handshake() {
    setup_may_runtime();
    let mut registry = Registry::new();
    registry.websocket("/ws/echo", |_ctx, _socket| {});
    registry.get("/ping", |ctx: &mut Context<()>| ctx.ok(1, None), None);

    let handle = registry
        .start_on(&ephemeral_addr(), &ephemeral_addr())
        .unwrap();
    handle.wait_ready().unwrap();
    let ws_addr = handle.ws_addr.unwrap();

    let err = tungstenite::connect(format!("ws://{ws_addr}/ws/other")).unwrap_err();
    match err {
        tungstenite::Error::Http(resp) => assert_eq!(resp.status().as_u16(), 404),
        other => panic!("expected HTTP rejection, got {other:?}"),
    }

    handle.stop();
}

#[test]
fn middleware_armed_response_rejects_handshake() {
    setup_may_runtime();
    let mut registry = Registry::new();
    registry.middleware(
        |ctx| {
            if ctx.bearer_token().is_empty() {
                ctx.unauthorized("token required");
            }
        },
        &["^/ws/secure"],
        &[],
    );
    registry.websocket("/ws/secure", |_ctx, socket| {
        let _ = socket.send(Message::Text("welcome".into()));
    });
    registry.get("/ping", |ctx: &mut Context<()>| ctx.ok(1, None), None);

    let handle = registry
        .start_on(&ephemeral_addr(), &ephemeral_addr())
        .unwrap();
    handle.wait_ready().unwrap();
    let ws_addr = handle.ws_addr.unwrap();

    let err = tungstenite::connect(format!("ws://{ws_addr}/ws/secure")).unwrap_err();
    match err {
        tungstenite::Error::Http(resp) => assert_eq!(resp.status().as_u16(), 401),
        other => panic!("expected HTTP rejection, got {other:?}"),
    }

    handle.stop();
}
