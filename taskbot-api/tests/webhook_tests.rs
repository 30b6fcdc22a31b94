/// HTTP-level tests for the webhook and health endpoints
///
/// cargo test -p taskbot-api --test webhook_tests

mod common;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use common::{TestContext, SECRET};
use serde_json::{json, Value};
use taskbot_api::dispatcher::replies;
use taskbot_api::routes::webhook::SECRET_HEADER;
use taskbot_shared::models::user::Role;
use tower::ServiceExt;

fn webhook_request(secret: Option<&str>, update: Value) -> Request<Body> {
    let mut builder = Request::builder()
        .method("POST")
        .uri("/webhooks/telegram")
        .header("content-type", "application/json");
    if let Some(secret) = secret {
        builder = builder.header(SECRET_HEADER, secret);
    }
    builder.body(Body::from(update.to_string())).unwrap()
}

fn text_update(update_id: i64, user_id: i64, username: &str, text: &str) -> Value {
    json!({
        "update_id": update_id,
        "message": {
            "message_id": update_id,
            "date": 1_700_000_000,
            "chat": {"id": user_id, "type": "private"},
            "from": {"id": user_id, "is_bot": false, "first_name": username, "username": username},
            "text": text
        }
    })
}

async fn body_json(response: axum::response::Response) -> Value {
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&body).unwrap()
}

#[tokio::test]
async fn test_health_reports_store_status() {
    let ctx = TestContext::new();

    let request = Request::builder().uri("/health").body(Body::empty()).unwrap();
    let response = ctx.app.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["database"], "connected");
    assert_eq!(body["access_mode"], "open");
    assert_eq!(body["active_sessions"], 0);

    let admin = ctx.user("100", "boss", Role::Admin).await;
    ctx.send(&admin, "/create_task").await;
    let request = Request::builder().uri("/health").body(Body::empty()).unwrap();
    let body = body_json(ctx.app.clone().oneshot(request).await.unwrap()).await;
    assert_eq!(body["active_sessions"], 1);

    ctx.store.set_unavailable(true);
    let request = Request::builder().uri("/health").body(Body::empty()).unwrap();
    let body = body_json(ctx.app.clone().oneshot(request).await.unwrap()).await;
    assert_eq!(body["status"], "degraded");
    assert_eq!(body["database"], "disconnected");
}

#[tokio::test]
async fn test_wrong_secret_is_rejected() {
    let ctx = TestContext::new();

    for secret in [None, Some("guess")] {
        let response = ctx
            .app
            .clone()
            .oneshot(webhook_request(secret, text_update(1, 42, "anna", "/start")))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    assert_eq!(ctx.store.user_count().unwrap(), 0);
    assert!(ctx.transport.sent().is_empty());
}

#[tokio::test]
async fn test_message_gets_reply() {
    let ctx = TestContext::new();

    let response = ctx
        .app
        .clone()
        .oneshot(webhook_request(Some(SECRET), text_update(1, 42, "anna", "/start")))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await, json!({"ok": true}));

    let sent = ctx.transport.sent_to("42");
    assert_eq!(sent.len(), 1);
    assert!(sent[0].text.contains("@anna"));
    assert_eq!(ctx.store.user_count().unwrap(), 1);
}

#[tokio::test]
async fn test_unregistered_sender_is_told_to_start() {
    let ctx = TestContext::new();

    let response = ctx
        .app
        .clone()
        .oneshot(webhook_request(Some(SECRET), text_update(1, 42, "anna", "/my_tasks")))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let last = ctx.transport.last().unwrap();
    assert_eq!(last.chat_id, "42");
    assert_eq!(last.text, replies::NOT_REGISTERED);
}

#[tokio::test]
async fn test_button_press_is_answered_and_dispatched() {
    let ctx = TestContext::new();
    let admin = ctx.user("100", "boss", Role::Admin).await;
    ctx.user("111", "anna", Role::Employee).await;
    let created = ctx
        .send(&admin, r#"/create_task title:"Report" assigned_to:111"#)
        .await;
    let callback_data = created.reply.button.unwrap().callback_data;

    let update = json!({
        "update_id": 7,
        "callback_query": {
            "id": "cb-42",
            "from": {"id": 111, "is_bot": false, "first_name": "anna", "username": "anna"},
            "message": {"message_id": 3, "chat": {"id": 111, "type": "private"}},
            "data": callback_data
        }
    });
    let response = ctx
        .app
        .clone()
        .oneshot(webhook_request(Some(SECRET), update))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(ctx.transport.answered_callbacks(), vec!["cb-42".to_string()]);
    let card = ctx.transport.last().unwrap();
    assert_eq!(card.chat_id, "111");
    assert!(card.text.contains("Report"));
}

#[tokio::test]
async fn test_blocked_chat_still_returns_ok() {
    let ctx = TestContext::new();
    ctx.transport.fail_for("42");

    let response = ctx
        .app
        .clone()
        .oneshot(webhook_request(Some(SECRET), text_update(1, 42, "anna", "/start")))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(ctx.store.user_count().unwrap(), 1);
}

#[tokio::test]
async fn test_irrelevant_updates_are_acknowledged() {
    let ctx = TestContext::new();

    let updates = [
        json!({"update_id": 1, "edited_message": {"chat": {"id": 1}, "text": "x"}}),
        json!({"update_id": 2, "message": {"chat": {"id": 1}, "from": {"id": 1}, "sticker": {}}}),
    ];
    for update in updates {
        let response = ctx
            .app
            .clone()
            .oneshot(webhook_request(Some(SECRET), update))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    assert!(ctx.transport.sent().is_empty());
}

#[tokio::test]
async fn test_malformed_update_is_bad_request() {
    let ctx = TestContext::new();

    let response = ctx
        .app
        .clone()
        .oneshot(webhook_request(Some(SECRET), json!({"message": "nope"})))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(response).await["error"], "bad_request");
    assert!(ctx.transport.sent().is_empty());
}
