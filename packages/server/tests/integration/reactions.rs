use serde_json::json;

use crate::common::{TestApp, routes};

#[tokio::test]
async fn liking_twice_counts_once() {
    let app = TestApp::spawn().await;
    let alice = app.token_for("user_alice");
    let id = app.create_meme(&alice, "Hello", "a.png").await;

    for _ in 0..2 {
        let res = app.post_empty(&routes::reaction(&id, "like"), &alice).await;
        assert_eq!(res.status, 200, "{}", res.text);
        assert_eq!(res.body["like_count"], 1);
        assert_eq!(res.body["reactions"], json!(["like"]));
    }
}

#[tokio::test]
async fn like_and_dislike_are_exclusive() {
    let app = TestApp::spawn().await;
    let alice = app.token_for("user_alice");
    let id = app.create_meme(&alice, "Hello", "a.png").await;

    app.post_empty(&routes::reaction(&id, "like"), &alice).await;
    let res = app.post_empty(&routes::reaction(&id, "dislike"), &alice).await;

    assert_eq!(res.status, 200);
    assert_eq!(res.body["like_count"], 0);
    assert_eq!(res.body["dislike_count"], 1);
    assert_eq!(res.body["reactions"], json!(["dislike"]));
}

#[tokio::test]
async fn independent_votes_when_exclusivity_is_off() {
    let app = TestApp::spawn_with(|c| c.reactions.exclusive_votes = false).await;
    let alice = app.token_for("user_alice");
    let id = app.create_meme(&alice, "Hello", "a.png").await;

    app.post_empty(&routes::reaction(&id, "like"), &alice).await;
    let res = app.post_empty(&routes::reaction(&id, "dislike"), &alice).await;

    assert_eq!(res.body["like_count"], 1);
    assert_eq!(res.body["dislike_count"], 1);
}

#[tokio::test]
async fn retracting_restores_counters() {
    let app = TestApp::spawn().await;
    let alice = app.token_for("user_alice");
    let bob = app.token_for("user_bob");
    let id = app.create_meme(&alice, "Hello", "a.png").await;

    app.post_empty(&routes::reaction(&id, "like"), &alice).await;
    app.post_empty(&routes::reaction(&id, "like"), &bob).await;
    let res = app.delete_with_token(&routes::reaction(&id, "like"), &alice).await;
    assert_eq!(res.status, 200);
    assert_eq!(res.body["like_count"], 1);
    assert_eq!(res.body["reactions"], json!([]));

    // Retracting again is a no-op.
    let res = app.delete_with_token(&routes::reaction(&id, "like"), &alice).await;
    assert_eq!(res.status, 200);
    assert_eq!(res.body["like_count"], 1);

    let res = app.get_with_token(&routes::reactions(&id), &bob).await;
    assert_eq!(res.body["like_count"], 1);
    assert_eq!(res.body["reactions"], json!(["like"]));
}

#[tokio::test]
async fn share_is_counted_separately() {
    let app = TestApp::spawn().await;
    let alice = app.token_for("user_alice");
    let id = app.create_meme(&alice, "Hello", "a.png").await;

    app.post_empty(&routes::reaction(&id, "like"), &alice).await;
    let res = app.post_empty(&routes::reaction(&id, "share"), &alice).await;

    assert_eq!(res.body["like_count"], 1);
    assert_eq!(res.body["share_count"], 1);
}

#[tokio::test]
async fn unknown_kind_is_rejected() {
    let app = TestApp::spawn().await;
    let alice = app.token_for("user_alice");
    let id = app.create_meme(&alice, "Hello", "a.png").await;

    let res = app.post_empty(&routes::reaction(&id, "love"), &alice).await;
    assert_eq!(res.status, 400);
    assert_eq!(res.body["code"], "VALIDATION_ERROR");
}

#[tokio::test]
async fn missing_or_removed_meme_is_404() {
    let app = TestApp::spawn().await;
    let alice = app.token_for("user_alice");

    let res = app
        .post_empty(
            &routes::reaction("01936f0e-1234-7abc-8000-000000000001", "like"),
            &alice,
        )
        .await;
    assert_eq!(res.status, 404);

    let id = app.create_meme(&alice, "Hello", "a.png").await;
    app.delete_with_token(&routes::meme(&id), &alice).await;
    let res = app.post_empty(&routes::reaction(&id, "like"), &alice).await;
    assert_eq!(res.status, 404);
}

#[tokio::test]
async fn requires_token() {
    let app = TestApp::spawn().await;
    let alice = app.token_for("user_alice");
    let id = app.create_meme(&alice, "Hello", "a.png").await;

    let res = app.get_without_token(&routes::reactions(&id)).await;
    assert_eq!(res.status, 401);
    assert_eq!(res.body["code"], "TOKEN_MISSING");

    let res = app.post_empty(&routes::reaction(&id, "like"), "garbage").await;
    assert_eq!(res.status, 401);
    assert_eq!(res.body["code"], "TOKEN_INVALID");
}

#[tokio::test]
async fn concurrent_likes_from_many_users_are_all_counted() {
    let app = TestApp::spawn().await;
    let alice = app.token_for("user_alice");
    let id = app.create_meme(&alice, "Hello", "a.png").await;

    let tokens: Vec<String> = (0..8).map(|i| app.token_for(&format!("user_{i}"))).collect();
    let path = routes::reaction(&id, "like");
    let futures = tokens.iter().map(|t| app.post_empty(&path, t));
    for res in futures::future::join_all(futures).await {
        assert_eq!(res.status, 200, "{}", res.text);
    }

    let res = app.get_with_token(&routes::reactions(&id), &alice).await;
    assert_eq!(res.body["like_count"], 8);
}

#[tokio::test]
async fn concurrent_likes_from_one_user_count_once() {
    let app = TestApp::spawn().await;
    let alice = app.token_for("user_alice");
    let bob = app.token_for("user_bob");
    let id = app.create_meme(&alice, "Hello", "a.png").await;

    let path = routes::reaction(&id, "like");
    let likes = (0..8).map(|_| app.post_empty(&path, &bob));
    for res in futures::future::join_all(likes).await {
        assert_eq!(res.status, 200, "{}", res.text);
        assert_eq!(res.body["like_count"], 1);
    }

    let res = app.get_with_token(&routes::reactions(&id), &bob).await;
    assert_eq!(res.body["like_count"], 1);
    assert_eq!(res.body["reactions"], json!(["like"]));

    let retractions = (0..8).map(|_| app.delete_with_token(&path, &bob));
    for res in futures::future::join_all(retractions).await {
        assert_eq!(res.status, 200, "{}", res.text);
        assert_eq!(res.body["like_count"], 0);
    }

    let meme = app.get_without_token(&routes::meme(&id)).await;
    assert_eq!(meme.body["like_count"], 0);
}
