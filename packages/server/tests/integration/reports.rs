use serde_json::json;

use crate::common::{MODERATOR, TestApp, routes};

#[tokio::test]
async fn reporting_twice_returns_the_first_report() {
    let app = TestApp::spawn().await;
    let alice = app.token_for("user_alice");
    let bob = app.token_for("user_bob");
    let id = app.create_meme(&alice, "Doxx", "a.png").await;

    let first = app
        .post_with_token(&routes::meme_reports(&id), &json!({"reason": "  personal info "}), &bob)
        .await;
    assert_eq!(first.status, 201, "{}", first.text);
    assert_eq!(first.body["status"], "pending");
    assert_eq!(first.body["reason"], "personal info");
    assert_eq!(first.body["reporter_id"], "bob");
    assert_eq!(first.body["meme_id"], id.as_str());

    let again = app
        .post_with_token(&routes::meme_reports(&id), &json!({"reason": "still there"}), &bob)
        .await;
    assert_eq!(again.status, 200, "{}", again.text);
    assert_eq!(again.id(), first.id());
    assert_eq!(again.body["reason"], "personal info");
}

#[tokio::test]
async fn rejects_blank_reason_and_missing_meme() {
    let app = TestApp::spawn().await;
    let alice = app.token_for("user_alice");
    let id = app.create_meme(&alice, "Fine", "a.png").await;

    let res = app
        .post_with_token(&routes::meme_reports(&id), &json!({"reason": "   "}), &alice)
        .await;
    assert_eq!(res.status, 400);
    assert_eq!(res.body["code"], "VALIDATION_ERROR");

    let missing = uuid::Uuid::now_v7().to_string();
    let res = app
        .post_with_token(&routes::meme_reports(&missing), &json!({"reason": "spam"}), &alice)
        .await;
    assert_eq!(res.status, 404);
}

#[tokio::test]
async fn only_moderators_review() {
    let app = TestApp::spawn().await;
    let alice = app.token_for("user_alice");
    let bob = app.token_for("user_bob");
    let id = app.create_meme(&alice, "Meh", "a.png").await;
    let report = app
        .post_with_token(&routes::meme_reports(&id), &json!({"reason": "spam"}), &bob)
        .await
        .id();

    let res = app.get_with_token(routes::REPORTS, &bob).await;
    assert_eq!(res.status, 403);
    assert_eq!(res.body["code"], "PERMISSION_DENIED");

    let res = app
        .patch_with_token(&routes::report(&report), &json!({"status": "reviewed"}), &alice)
        .await;
    assert_eq!(res.status, 403);

    let res = app.get_without_token(routes::REPORTS).await;
    assert_eq!(res.status, 401);
}

#[tokio::test]
async fn list_filters_by_status_and_meme() {
    let app = TestApp::spawn().await;
    let moderator = app.token_for(MODERATOR);
    let alice = app.token_for("user_alice");
    let bob = app.token_for("user_bob");
    let a = app.create_meme(&alice, "A", "a.png").await;
    let b = app.create_meme(&alice, "B", "b.png").await;

    let on_a = app
        .post_with_token(&routes::meme_reports(&a), &json!({"reason": "spam"}), &bob)
        .await
        .id();
    app.post_with_token(&routes::meme_reports(&b), &json!({"reason": "spam"}), &bob)
        .await;
    let res = app
        .patch_with_token(&routes::report(&on_a), &json!({"status": "reviewed"}), &moderator)
        .await;
    assert_eq!(res.status, 200, "{}", res.text);
    assert_eq!(res.body["reviewed_by"], "mod");

    let res = app.get_with_token(routes::REPORTS, &moderator).await;
    assert_eq!(res.status, 200, "{}", res.text);
    assert_eq!(res.body["pagination"]["total"], 2);

    let res = app
        .get_with_token(&format!("{}?status=pending", routes::REPORTS), &moderator)
        .await;
    assert_eq!(res.body["pagination"]["total"], 1);
    assert_eq!(res.body["data"][0]["meme_id"], b.as_str());

    let res = app
        .get_with_token(&format!("{}?meme_id={a}", routes::REPORTS), &moderator)
        .await;
    assert_eq!(res.body["pagination"]["total"], 1);
    assert_eq!(res.body["data"][0]["id"], on_a.as_str());
}

#[tokio::test]
async fn actioning_removes_meme_and_closes_other_reports() {
    let app = TestApp::spawn_with(|c| c.storage.delete_on_removal = true).await;
    let moderator = app.token_for(MODERATOR);
    let alice = app.token_for("user_alice");
    let id = app.create_meme(&alice, "Bad", "a.png").await;
    let other = app.create_meme(&alice, "Fine", "b.png").await;

    let mut reports = Vec::new();
    for reporter in ["user_bob", "user_carol", "user_dave"] {
        let token = app.token_for(reporter);
        let res = app
            .post_with_token(&routes::meme_reports(&id), &json!({"reason": "abuse"}), &token)
            .await;
        reports.push(res.id());
    }
    let unrelated = app
        .post_with_token(
            &routes::meme_reports(&other),
            &json!({"reason": "meh"}),
            &app.token_for("user_bob"),
        )
        .await
        .id();

    let res = app
        .patch_with_token(&routes::report(&reports[0]), &json!({"status": "actioned"}), &moderator)
        .await;
    assert_eq!(res.status, 200, "{}", res.text);
    assert_eq!(res.body["status"], "actioned");

    assert_eq!(app.get_without_token(&routes::meme(&id)).await.status, 404);
    assert_eq!(app.stored_object_count(), 1);

    let res = app
        .get_with_token(&format!("{}?meme_id={id}", routes::REPORTS), &moderator)
        .await;
    for report in res.body["data"].as_array().unwrap() {
        assert_eq!(report["status"], "actioned");
        assert_eq!(report["reviewed_by"], "mod");
    }

    let res = app
        .get_with_token(&format!("{}?meme_id={other}", routes::REPORTS), &moderator)
        .await;
    assert_eq!(res.body["data"][0]["id"], unrelated.as_str());
    assert_eq!(res.body["data"][0]["status"], "pending");
}

#[tokio::test]
async fn actioned_reports_are_final() {
    let app = TestApp::spawn().await;
    let moderator = app.token_for(MODERATOR);
    let alice = app.token_for("user_alice");
    let id = app.create_meme(&alice, "Bad", "a.png").await;
    let report = app
        .post_with_token(&routes::meme_reports(&id), &json!({"reason": "abuse"}), &alice)
        .await
        .id();

    let actioned = json!({"status": "actioned"});
    let res = app.patch_with_token(&routes::report(&report), &actioned, &moderator).await;
    assert_eq!(res.status, 200, "{}", res.text);

    // Repeating the same resolution is a no-op.
    let res = app.patch_with_token(&routes::report(&report), &actioned, &moderator).await;
    assert_eq!(res.status, 200);

    let res = app
        .patch_with_token(&routes::report(&report), &json!({"status": "pending"}), &moderator)
        .await;
    assert_eq!(res.status, 400);
    assert_eq!(res.body["code"], "VALIDATION_ERROR");

    let missing = uuid::Uuid::now_v7().to_string();
    let res = app.patch_with_token(&routes::report(&missing), &actioned, &moderator).await;
    assert_eq!(res.status, 404);
}
