// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Message router and frame host over in-process channels.

mod common;

use common::{stale_token, valid_token, TestShell, TestShellBuilder, TEST_EMAIL, TEST_PASSWORD};
use frame_shell::bridge::{
    in_process_pair, FrameEvent, FrameHandle, FrameHost, FramePort, RouteOutcome, ShellEvent,
};
use frame_shell::models::{Role, ShellMessage};
use frame_shell::services::SessionState;
use serde_json::json;
use std::collections::HashMap;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc::UnboundedReceiver;

const UNTRUSTED_ORIGIN: &str = "http://evil.example.com";

/// Connect a configured frame to the shell over an in-process channel.
fn connect(shell: &TestShell, name: &str) -> (FrameHandle, UnboundedReceiver<FrameEvent>, FramePort) {
    let origin = shell
        .state
        .config
        .frame(name)
        .expect("frame is configured")
        .origin
        .clone();
    let (channel, inbound, port) = in_process_pair(&origin);
    (FrameHandle::new(name, origin, Arc::new(channel)), inbound, port)
}

async fn authenticated_shell() -> TestShell {
    let token = valid_token();
    let shell = TestShellBuilder::new().with_tokens(&token).start().await;
    shell.backend.accept_token(&token);
    shell
}

// ─── Router ──────────────────────────────────────────────────

#[tokio::test]
async fn test_untrusted_origin_is_dropped_without_side_effects() {
    let shell = authenticated_shell().await;
    let (frame, _inbound, mut port) = connect(&shell, "course");

    let outcome = shell
        .state
        .router
        .dispatch(
            &frame,
            UNTRUSTED_ORIGIN,
            &json!({"type": "CREATE_MODULE", "courseId": "c1", "data": {"title": "x"}}),
        )
        .await;

    assert_eq!(outcome, RouteOutcome::Rejected);
    assert!(port.try_recv().is_none());
    assert_eq!(shell.backend.protected_calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_unknown_and_malformed_messages_are_ignored() {
    let shell = authenticated_shell().await;
    let (frame, _inbound, mut port) = connect(&shell, "course");
    let origin = frame.origin.clone();

    for payload in [
        json!({"type": "DELETE_EVERYTHING"}),
        json!({"type": "CREATE_MODULE", "data": {}}),
        json!({"courseId": "c1"}),
        json!("FETCH_COURSE_CONTENT"),
    ] {
        let outcome = shell.state.router.dispatch(&frame, &origin, &payload).await;
        assert_eq!(outcome, RouteOutcome::Ignored, "payload: {}", payload);
    }

    assert!(port.try_recv().is_none());
    assert_eq!(shell.backend.protected_calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_course_content_survives_mid_flight_expiry() {
    let shell = authenticated_shell().await;
    shell.backend.revoke_on_lessons.store(true, Ordering::SeqCst);
    let (frame, _inbound, mut port) = connect(&shell, "learn");
    let origin = frame.origin.clone();

    let outcome = shell
        .state
        .router
        .dispatch(
            &frame,
            &origin,
            &json!({"type": "FETCH_COURSE_CONTENT", "courseId": "c1"}),
        )
        .await;
    assert!(matches!(
        outcome,
        RouteOutcome::Replied(ShellMessage::CourseContentLoaded { .. })
    ));

    let reply = port.recv().await.unwrap();
    assert_eq!(reply.target_origin, origin);
    assert_eq!(reply.payload["type"], "COURSE_CONTENT_LOADED");
    assert_eq!(reply.payload["courseId"], "c1");
    assert_eq!(reply.payload["modules"][0]["lessons"][0]["id"], "m1-l1");
    assert_eq!(
        reply.payload["modules"][1]["lessons"][0]["contents"][0]["id"],
        "m2-l1-c1"
    );
    assert_eq!(reply.payload["quizzes"][0]["questions"][0]["id"], "q1-a");

    // Exactly one reply, one refresh.
    assert!(port.try_recv().is_none());
    assert_eq!(shell.backend.refresh_count(), 1);
    assert!(shell.state.session.is_authenticated());
}

#[tokio::test]
async fn test_course_content_failure_replies_with_error() {
    let shell = TestShellBuilder::new()
        .with_tokens(&stale_token())
        .start()
        .await;
    shell.backend.refresh_fails.store(true, Ordering::SeqCst);
    let (frame, _inbound, mut port) = connect(&shell, "learn");
    let origin = frame.origin.clone();

    shell
        .state
        .router
        .dispatch(
            &frame,
            &origin,
            &json!({"type": "FETCH_COURSE_CONTENT", "courseId": "c1"}),
        )
        .await;

    let reply = port.recv().await.unwrap();
    assert_eq!(reply.payload["type"], "COURSE_CONTENT_ERROR");
    assert_eq!(
        reply.payload["error"],
        "Your session has expired. Please sign in again."
    );
    assert!(port.try_recv().is_none());
    assert_eq!(shell.state.session.state(), SessionState::Anonymous);
}

#[tokio::test]
async fn test_mark_complete_server_error_keeps_session() {
    let shell = authenticated_shell().await;
    shell.backend.progress_fails.store(true, Ordering::SeqCst);
    let tokens_before = shell.credentials().get_tokens();
    let (frame, _inbound, mut port) = connect(&shell, "learn");
    let origin = frame.origin.clone();

    shell
        .state
        .router
        .dispatch(
            &frame,
            &origin,
            &json!({"type": "MARK_LESSON_COMPLETE", "lessonId": "l1"}),
        )
        .await;

    let reply = port.recv().await.unwrap();
    assert_eq!(reply.payload["type"], "COURSE_ERROR");
    assert_eq!(reply.payload["error"], "Progress service unavailable");
    assert_eq!(shell.credentials().get_tokens(), tokens_before);
    assert!(shell.state.session.is_authenticated());
    assert_eq!(shell.backend.refresh_count(), 0);
}

#[tokio::test]
async fn test_create_module_replies_with_created_entity() {
    let shell = authenticated_shell().await;
    let (frame, _inbound, mut port) = connect(&shell, "course");
    let origin = frame.origin.clone();

    shell
        .state
        .router
        .dispatch(
            &frame,
            &origin,
            &json!({
                "type": "CREATE_MODULE",
                "courseId": "c1",
                "data": {"title": "Week 1"},
                "requestId": "req-7"
            }),
        )
        .await;

    let reply = port.recv().await.unwrap();
    assert_eq!(reply.payload["type"], "MODULE_CREATED");
    assert_eq!(reply.payload["module"]["id"], "new-1");
    assert_eq!(reply.payload["module"]["parentId"], "c1");
    assert_eq!(reply.payload["module"]["title"], "Week 1");
    assert_eq!(reply.payload["requestId"], "req-7");
}

#[tokio::test]
async fn test_progress_reply_without_request_id_has_none() {
    let shell = authenticated_shell().await;
    let (frame, _inbound, mut port) = connect(&shell, "learn");
    let origin = frame.origin.clone();

    shell
        .state
        .router
        .dispatch(
            &frame,
            &origin,
            &json!({"type": "FETCH_COURSE_PROGRESS", "courseId": "c3"}),
        )
        .await;

    let reply = port.recv().await.unwrap();
    assert_eq!(reply.payload["type"], "COURSE_PROGRESS_LOADED");
    assert_eq!(reply.payload["progress"]["total"], 3);
    assert!(reply.payload.get("requestId").is_none());
}

// ─── Frame host ──────────────────────────────────────────────

#[tokio::test]
async fn test_theme_and_page_pushed_after_load() {
    let shell = authenticated_shell().await;
    let (frame, _inbound, mut port) = connect(&shell, "course");
    let (host, _events) = FrameHost::mount(frame, Arc::clone(&shell.state.router), "light", "courses");

    // Not loaded yet: changes are remembered, not pushed.
    host.set_theme("dark");
    assert!(port.try_recv().is_none());

    host.on_load();
    let theme = port.recv().await.unwrap();
    assert_eq!(theme.payload, json!({"type": "THEME_CHANGE", "theme": "dark"}));
    let page = port.recv().await.unwrap();
    assert_eq!(page.payload, json!({"type": "PAGE_CHANGE", "page": "courses"}));

    host.set_page("lessons");
    let page = port.recv().await.unwrap();
    assert_eq!(page.payload["page"], "lessons");
    assert_eq!(page.target_origin, "http://localhost:5175");
}

#[tokio::test]
async fn test_auth_login_raises_shell_event() {
    let shell = TestShellBuilder::new().start().await;
    let (frame, inbound, mut port) = connect(&shell, "auth");
    let (host, mut events) = FrameHost::mount(frame, Arc::clone(&shell.state.router), "light", "login");
    let _listener = host.listen(inbound);

    port.send(json!({
        "type": "AUTH_LOGIN",
        "email": TEST_EMAIL,
        "password": TEST_PASSWORD,
    }))
    .unwrap();

    let reply = port.recv().await.unwrap();
    assert_eq!(reply.payload["type"], "AUTH_COMPLETED");
    assert_eq!(reply.payload["user"]["role"], "STUDENT");

    match events.recv().await.unwrap() {
        ShellEvent::Authenticated(user) => {
            assert_eq!(user.email, TEST_EMAIL);
            assert_eq!(user.role, Role::Student);
        }
    }
    assert!(shell.state.session.is_authenticated());
}

#[tokio::test]
async fn test_auth_login_failure_replies_with_error() {
    let shell = TestShellBuilder::new().start().await;
    let (frame, inbound, mut port) = connect(&shell, "auth");
    let (host, mut events) = FrameHost::mount(frame, Arc::clone(&shell.state.router), "light", "login");
    let _listener = host.listen(inbound);

    port.send(json!({"type": "AUTH_LOGIN", "email": TEST_EMAIL, "password": "nope"}))
        .unwrap();

    let reply = port.recv().await.unwrap();
    assert_eq!(reply.payload["type"], "AUTH_ERROR");
    assert_eq!(reply.payload["error"], "Invalid email or password");
    assert!(events.try_recv().is_err());
    assert!(!shell.state.session.is_authenticated());
}

#[tokio::test]
async fn test_auth_success_handoff() {
    let shell = TestShellBuilder::new().start().await;
    let (frame, _inbound, mut port) = connect(&shell, "auth");
    let (host, mut events) = FrameHost::mount(frame, Arc::clone(&shell.state.router), "light", "login");
    let origin = host.frame().origin.clone();

    let outcome = host
        .receive(
            &origin,
            &json!({
                "type": "AUTH_SUCCESS",
                "accessToken": valid_token(),
                "refreshToken": "handoff-refresh",
            }),
        )
        .await;

    assert!(matches!(
        outcome,
        RouteOutcome::Replied(ShellMessage::AuthCompleted { .. })
    ));
    assert_eq!(port.recv().await.unwrap().payload["type"], "AUTH_COMPLETED");
    assert!(matches!(events.recv().await, Some(ShellEvent::Authenticated(_))));
    assert_eq!(
        shell.credentials().get_refresh_token().as_deref(),
        Some("handoff-refresh")
    );
}

#[tokio::test]
async fn test_concurrent_requests_correlate_by_request_id() {
    let shell = authenticated_shell().await;
    shell.backend.progress_delay_ms.store(50, Ordering::SeqCst);
    let (frame, inbound, mut port) = connect(&shell, "learn");
    let (host, _events) = FrameHost::mount(frame, Arc::clone(&shell.state.router), "light", "learn");
    let _listener = host.listen(inbound);

    for (request_id, course_id) in [("a", "c1"), ("b", "c2"), ("c", "c3")] {
        port.send(json!({
            "type": "FETCH_COURSE_PROGRESS",
            "courseId": course_id,
            "requestId": request_id,
        }))
        .unwrap();
    }

    let mut replies = HashMap::new();
    for _ in 0..3 {
        let reply = port.recv().await.unwrap();
        replies.insert(
            reply.payload["requestId"].as_str().unwrap().to_string(),
            reply.payload["courseId"].as_str().unwrap().to_string(),
        );
    }

    assert_eq!(replies["a"], "c1");
    assert_eq!(replies["b"], "c2");
    assert_eq!(replies["c"], "c3");
}

#[tokio::test]
async fn test_listener_drops_messages_from_untrusted_origin() {
    let shell = authenticated_shell().await;
    let (frame, inbound, mut port) = connect(&shell, "learn");
    let (host, _events) = FrameHost::mount(frame, Arc::clone(&shell.state.router), "light", "learn");
    let _listener = host.listen(inbound);

    port.send_as(
        UNTRUSTED_ORIGIN,
        json!({"type": "FETCH_COURSE_PROGRESS", "courseId": "c1", "requestId": "evil"}),
    )
    .unwrap();
    port.send(json!({"type": "FETCH_COURSE_PROGRESS", "courseId": "c2", "requestId": "ok"}))
        .unwrap();

    let reply = port.recv().await.unwrap();
    assert_eq!(reply.payload["requestId"], "ok");
    assert_eq!(reply.payload["courseId"], "c2");

    tokio::time::sleep(Duration::from_millis(100)).await;
    assert!(port.try_recv().is_none());
    assert_eq!(shell.backend.protected_calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_stopped_listener_handles_nothing() {
    let shell = authenticated_shell().await;
    let (frame, inbound, mut port) = connect(&shell, "learn");
    let (host, _events) = FrameHost::mount(frame, Arc::clone(&shell.state.router), "light", "learn");
    let listener = host.listen(inbound);

    listener.stop();
    tokio::time::sleep(Duration::from_millis(50)).await;

    let _ = port.send(json!({"type": "FETCH_COURSE_PROGRESS", "courseId": "c1"}));
    tokio::time::sleep(Duration::from_millis(100)).await;

    assert!(port.try_recv().is_none());
    assert_eq!(shell.backend.protected_calls.load(Ordering::SeqCst), 0);
}
