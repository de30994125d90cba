use sea_orm::EntityTrait;
use serde_json::{Value, json};

use memehub::entity::account;

use crate::common::{TestApp, Upload, WEBHOOK_SECRET, routes};

fn user_event(event_type: &str, id: &str) -> Value {
    json!({
        "type": event_type,
        "data": {
            "id": id,
            "first_name": "Alice",
            "last_name": "Walker",
            "email_addresses": [{"email_address": "alice@example.com"}],
        }
    })
}

#[tokio::test]
async fn created_event_upserts_account() {
    let app = TestApp::spawn().await;

    let res = app
        .post_with_token(
            routes::ACCOUNT_EVENTS,
            &user_event("user.created", "user_alice"),
            WEBHOOK_SECRET,
        )
        .await;
    assert_eq!(res.status, 200, "{}", res.text);
    assert_eq!(res.body["status"], "upserted");
    assert_eq!(res.body["account_id"], "alice");

    let stored = account::Entity::find_by_id("alice".to_string())
        .one(&app.db)
        .await
        .unwrap()
        .expect("account row");
    assert_eq!(stored.username.as_deref(), Some("alicewalker"));
    assert_eq!(stored.email.as_deref(), Some("alice@example.com"));
    assert!(stored.deleted_at.is_none());

    let mut updated = user_event("user.updated", "user_alice");
    updated["data"]["username"] = json!("ally");
    let res = app
        .post_with_token(routes::ACCOUNT_EVENTS, &updated, WEBHOOK_SECRET)
        .await;
    assert_eq!(res.status, 200);

    let stored = account::Entity::find_by_id("alice".to_string())
        .one(&app.db)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(stored.username.as_deref(), Some("ally"));
}

#[tokio::test]
async fn upsert_keeps_upload_counters() {
    let app = TestApp::spawn().await;
    let token = app.token_for("user_alice");
    app.create_meme(&token, "first", "a.png").await;

    app.post_with_token(
        routes::ACCOUNT_EVENTS,
        &user_event("user.updated", "user_alice"),
        WEBHOOK_SECRET,
    )
    .await;

    let stored = account::Entity::find_by_id("alice".to_string())
        .one(&app.db)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(stored.total_uploads, 1);
    assert_eq!(stored.monthly_upload_count, 1);
}

#[tokio::test]
async fn deleted_account_cannot_submit() {
    let app = TestApp::spawn().await;
    let token = app.token_for("user_alice");

    let res = app
        .post_with_token(
            routes::ACCOUNT_EVENTS,
            &json!({"type": "user.deleted", "data": {"id": "user_alice"}}),
            WEBHOOK_SECRET,
        )
        .await;
    assert_eq!(res.status, 200, "{}", res.text);
    assert_eq!(res.body["status"], "deleted");

    let res = app.submit(Upload::png("late", "a.png", "late"), &token).await;
    assert_eq!(res.status, 403);
    assert_eq!(res.body["code"], "PERMISSION_DENIED");
    assert_eq!(app.stored_object_count(), 0);
}

#[tokio::test]
async fn unknown_events_are_ignored() {
    let app = TestApp::spawn().await;
    let res = app
        .post_with_token(
            routes::ACCOUNT_EVENTS,
            &json!({"type": "session.created", "data": {"id": "user_alice"}}),
            WEBHOOK_SECRET,
        )
        .await;
    assert_eq!(res.status, 200);
    assert_eq!(res.body["status"], "ignored");

    let stored = account::Entity::find_by_id("alice".to_string())
        .one(&app.db)
        .await
        .unwrap();
    assert!(stored.is_none());
}

#[tokio::test]
async fn wrong_secret_is_rejected() {
    let app = TestApp::spawn().await;
    let res = app
        .post_with_token(
            routes::ACCOUNT_EVENTS,
            &user_event("user.created", "user_alice"),
            "not-the-secret",
        )
        .await;
    assert_eq!(res.status, 401);
    assert_eq!(res.body["code"], "TOKEN_INVALID");
}

#[tokio::test]
async fn blank_subject_is_rejected() {
    let app = TestApp::spawn().await;
    let res = app
        .post_with_token(
            routes::ACCOUNT_EVENTS,
            &user_event("user.created", "user_"),
            WEBHOOK_SECRET,
        )
        .await;
    assert_eq!(res.status, 400);
}
