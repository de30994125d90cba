use serde_json::json;

use crate::common::{TestApp, Upload, routes};

mod submission {
    use super::*;

    #[tokio::test]
    async fn owner_gets_created_meme_with_category() {
        let app = TestApp::spawn().await;
        let token = app.token_for("user_alice");

        let mut upload = Upload::png("Monday mood", "cat.png", "monday");
        upload.description = Some("  every week  ");
        let res = app.submit(upload, &token).await;

        assert_eq!(res.status, 201, "{}", res.text);
        assert_eq!(res.body["owner_id"], "alice");
        assert_eq!(res.body["title"], "Monday mood");
        assert_eq!(res.body["description"], "every week");
        assert_eq!(res.body["content_type"], "image/png");
        assert_eq!(res.body["like_count"], 0);
        assert_eq!(res.body["status"], "active");
        assert_eq!(res.body["categories"][0]["slug"], "funny-cats");
        let image_url = res.body["image_url"].as_str().unwrap();
        assert!(image_url.starts_with("http://media.test/api/v1/media/alice/"));
        assert!(image_url.ends_with("-cat.png"));
        assert_eq!(app.stored_object_count(), 1);
    }

    #[tokio::test]
    async fn unlabelled_image_has_no_categories() {
        let app = TestApp::spawn().await;
        let token = app.token_for("user_alice");

        let res = app
            .submit(Upload::png("Abstract", "glitch.png", "a"), &token)
            .await;
        assert_eq!(res.status, 201, "{}", res.text);
        assert_eq!(res.body["categories"], json!([]));
    }

    #[tokio::test]
    async fn requires_token() {
        let app = TestApp::spawn().await;
        let form = reqwest::multipart::Form::new().text("title", "x");
        let res = app
            .client
            .post(format!("http://{}{}", app.addr, routes::MEMES))
            .multipart(form)
            .send()
            .await
            .unwrap();
        assert_eq!(res.status().as_u16(), 401);
    }

    #[tokio::test]
    async fn rejects_unsupported_type_without_storing() {
        let app = TestApp::spawn().await;
        let token = app.token_for("user_alice");

        let upload = Upload {
            title: "Notes",
            description: None,
            filename: "notes.txt",
            mime: "text/plain",
            bytes: b"hello".to_vec(),
        };
        let res = app.submit(upload, &token).await;

        assert_eq!(res.status, 400);
        assert_eq!(res.body["code"], "VALIDATION_ERROR");
        assert_eq!(app.stored_object_count(), 0);
    }

    #[tokio::test]
    async fn rejects_blank_title() {
        let app = TestApp::spawn().await;
        let token = app.token_for("user_alice");

        let res = app.submit(Upload::png("   ", "cat.png", "x"), &token).await;
        assert_eq!(res.status, 400);
        assert_eq!(res.body["code"], "VALIDATION_ERROR");
    }

    #[tokio::test]
    async fn rejects_oversized_file() {
        let app = TestApp::spawn_with(|c| c.upload.max_size = 1024).await;
        let token = app.token_for("user_alice");

        let mut upload = Upload::png("Big", "big.png", "x");
        upload.bytes = vec![7u8; 4096];
        let res = app.submit(upload, &token).await;

        assert_eq!(res.status, 400);
        assert_eq!(app.stored_object_count(), 0);
    }
}

mod dedup {
    use super::*;

    #[tokio::test]
    async fn same_content_is_rejected_with_existing_id() {
        let app = TestApp::spawn().await;
        let alice = app.token_for("user_alice");
        let bob = app.token_for("user_bob");

        let first = app.submit(Upload::png("Original", "cat.png", "same"), &alice).await;
        assert_eq!(first.status, 201, "{}", first.text);

        let second = app.submit(Upload::png("Repost", "copy.png", "same"), &bob).await;
        assert_eq!(second.status, 409, "{}", second.text);
        assert_eq!(second.body["code"], "DUPLICATE_CONTENT");
        assert_eq!(second.body["details"]["existing_id"], first.body["id"]);

        // The rejected upload's object was cleaned up.
        assert_eq!(app.stored_object_count(), 1);
    }

    #[tokio::test]
    async fn removed_meme_does_not_block_resubmission() {
        let app = TestApp::spawn().await;
        let token = app.token_for("user_alice");

        let first = app.submit(Upload::png("Take one", "cat.png", "again"), &token).await;
        assert_eq!(first.status, 201);
        let res = app.delete_with_token(&routes::meme(&first.id()), &token).await;
        assert_eq!(res.status, 204);

        let second = app.submit(Upload::png("Take two", "cat.png", "again"), &token).await;
        assert_eq!(second.status, 201, "{}", second.text);
        assert_ne!(second.id(), first.id());
    }
}

mod quota {
    use super::*;

    #[tokio::test]
    async fn monthly_limit_reports_exact_usage() {
        let app = TestApp::spawn_with(|c| c.upload.free_monthly_limit = 2).await;
        let alice = app.token_for("user_alice");

        app.create_meme(&alice, "one", "a.png").await;
        app.create_meme(&alice, "two", "b.png").await;

        let res = app.submit(Upload::png("three", "c.png", "three"), &alice).await;
        assert_eq!(res.status, 429, "{}", res.text);
        assert_eq!(res.body["code"], "QUOTA_EXCEEDED");
        assert_eq!(res.body["details"]["window"], "monthly");
        assert_eq!(res.body["details"]["limit"], 2);
        assert_eq!(res.body["details"]["count"], 2);
        assert_eq!(res.body["details"]["remaining"], 0);
        assert_eq!(app.stored_object_count(), 2);

        let quota = app.get_with_token(routes::MY_QUOTA, &alice).await;
        assert_eq!(quota.status, 200);
        assert_eq!(quota.body["tier"], "free");
        assert_eq!(quota.body["monthly"]["remaining"], 0);
    }

    #[tokio::test]
    async fn other_users_are_unaffected() {
        let app = TestApp::spawn_with(|c| c.upload.free_monthly_limit = 1).await;
        let alice = app.token_for("user_alice");
        let bob = app.token_for("user_bob");

        app.create_meme(&alice, "mine", "a.png").await;
        let res = app.submit(Upload::png("more", "b.png", "more"), &alice).await;
        assert_eq!(res.status, 429);

        app.create_meme(&bob, "bobs", "a.png").await;
    }

    #[tokio::test]
    async fn premium_tier_gets_the_larger_limit() {
        let app = TestApp::spawn_with(|c| {
            c.upload.free_monthly_limit = 1;
            c.upload.premium_monthly_limit = 3;
        })
        .await;
        let alice = app.token_for("user_alice");

        app.create_meme(&alice, "one", "a.png").await;
        app.exec_sql("UPDATE account SET tier = 'premium' WHERE id = 'alice'")
            .await;
        app.create_meme(&alice, "two", "b.png").await;

        let quota = app.get_with_token(routes::MY_QUOTA, &alice).await;
        assert_eq!(quota.body["tier"], "premium");
        assert_eq!(quota.body["monthly"]["limit"], 3);
        assert_eq!(quota.body["monthly"]["remaining"], 1);
    }

    #[tokio::test]
    async fn daily_limit_applies_across_tiers() {
        let app = TestApp::spawn_with(|c| c.upload.daily_limit = 1).await;
        let alice = app.token_for("user_alice");

        app.create_meme(&alice, "one", "a.png").await;
        let res = app.submit(Upload::png("two", "b.png", "two"), &alice).await;
        assert_eq!(res.status, 429);
        assert_eq!(res.body["details"]["window"], "daily");
    }
}

mod compensation {
    use super::*;

    #[tokio::test]
    async fn failed_commit_removes_uploaded_object() {
        let app = TestApp::spawn().await;
        let token = app.token_for("user_alice");
        app.exec_sql("ALTER TABLE meme ADD CONSTRAINT meme_title_not_boom CHECK (title <> 'boom')")
            .await;

        let res = app.submit(Upload::png("boom", "cat.png", "boom"), &token).await;
        assert_eq!(res.status, 503, "{}", res.text);
        assert_eq!(res.body["code"], "PERSISTENCE_ERROR");
        assert_eq!(app.stored_object_count(), 0);

        // Nothing was counted against the quota.
        let quota = app.get_with_token(routes::MY_QUOTA, &token).await;
        assert_eq!(quota.body["monthly"]["count"], 0);
    }
}

mod browse {
    use super::*;

    #[tokio::test]
    async fn get_returns_meme_and_404_for_unknown() {
        let app = TestApp::spawn().await;
        let token = app.token_for("user_alice");
        let id = app.create_meme(&token, "Hello", "cat.png").await;

        let res = app.get_without_token(&routes::meme(&id)).await;
        assert_eq!(res.status, 200);
        assert_eq!(res.body["title"], "Hello");

        let res = app
            .get_without_token(&routes::meme("01936f0e-1234-7abc-8000-000000000001"))
            .await;
        assert_eq!(res.status, 404);
        assert_eq!(res.body["code"], "NOT_FOUND");
    }

    #[tokio::test]
    async fn search_is_case_insensitive_and_filters_by_category() {
        let app = TestApp::spawn().await;
        let token = app.token_for("user_alice");
        app.create_meme(&token, "Grumpy CAT", "cat.png").await;
        app.create_meme(&token, "Happy dog", "dog.png").await;
        app.create_meme(&token, "Category-less cat", "glitch.png").await;

        let res = app.get_without_token(&format!("{}?q=cat", routes::MEMES)).await;
        assert_eq!(res.status, 200);
        assert_eq!(res.body["data"].as_array().unwrap().len(), 2);
        assert_eq!(res.body["pagination"]["total"], 2);

        let res = app
            .get_without_token(&format!("{}?category=good-dogs", routes::MEMES))
            .await;
        let data = res.body["data"].as_array().unwrap();
        assert_eq!(data.len(), 1);
        assert_eq!(data[0]["title"], "Happy dog");

        let res = app
            .get_without_token(&format!("{}?q=100%25", routes::MEMES))
            .await;
        assert_eq!(res.body["data"], json!([]));
    }

    #[tokio::test]
    async fn most_liked_sort_and_top() {
        let app = TestApp::spawn().await;
        let alice = app.token_for("user_alice");
        let bob = app.token_for("user_bob");
        let plain = app.create_meme(&alice, "Plain", "a.png").await;
        let liked = app.create_meme(&alice, "Liked", "b.png").await;

        for token in [&alice, &bob] {
            let res = app.post_empty(&routes::reaction(&liked, "like"), token).await;
            assert_eq!(res.status, 200);
        }

        let res = app
            .get_without_token(&format!("{}?sort=most_liked", routes::MEMES))
            .await;
        assert_eq!(res.body["data"][0]["id"], liked.as_str());
        assert_eq!(res.body["data"][1]["id"], plain.as_str());

        let res = app
            .get_without_token(&format!("{}?limit=1", routes::TOP_MEMES))
            .await;
        assert_eq!(res.status, 200);
        let top = res.body.as_array().unwrap();
        assert_eq!(top.len(), 1);
        assert_eq!(top[0]["like_count"], 2);
    }

    #[tokio::test]
    async fn top_rejects_out_of_range_limit() {
        let app = TestApp::spawn().await;
        let res = app
            .get_without_token(&format!("{}?limit=0", routes::TOP_MEMES))
            .await;
        assert_eq!(res.status, 400);
    }
}

mod removal {
    use super::*;

    #[tokio::test]
    async fn only_owner_can_remove() {
        let app = TestApp::spawn().await;
        let alice = app.token_for("user_alice");
        let bob = app.token_for("user_bob");
        let id = app.create_meme(&alice, "Mine", "cat.png").await;

        let res = app.delete_with_token(&routes::meme(&id), &bob).await;
        assert_eq!(res.status, 403);

        let res = app.delete_with_token(&routes::meme(&id), &alice).await;
        assert_eq!(res.status, 204);

        let res = app.get_without_token(&routes::meme(&id)).await;
        assert_eq!(res.status, 404);

        // Retained by default.
        assert_eq!(app.stored_object_count(), 1);
    }

    #[tokio::test]
    async fn delete_on_removal_drops_object() {
        let app = TestApp::spawn_with(|c| c.storage.delete_on_removal = true).await;
        let alice = app.token_for("user_alice");
        let id = app.create_meme(&alice, "Mine", "cat.png").await;

        let res = app.delete_with_token(&routes::meme(&id), &alice).await;
        assert_eq!(res.status, 204);
        assert_eq!(app.stored_object_count(), 0);
    }
}

mod trending {
    use super::*;

    fn ranked_ids(body: &serde_json::Value) -> Vec<String> {
        body["data"]
            .as_array()
            .expect("trending data")
            .iter()
            .map(|t| t["meme"]["id"].as_str().unwrap().to_string())
            .collect()
    }

    #[tokio::test]
    async fn ranks_by_interactions_inside_the_window() {
        let app = TestApp::spawn().await;
        let alice = app.token_for("user_alice");
        let bob = app.token_for("user_bob");
        let quiet = app.create_meme(&alice, "Quiet", "a.png").await;
        let busy = app.create_meme(&alice, "Busy", "b.png").await;
        let stale = app.create_meme(&alice, "Stale", "c.png").await;

        app.post_empty(&routes::reaction(&quiet, "like"), &bob).await;
        for kind in ["like", "share", "save"] {
            app.post_empty(&routes::reaction(&busy, kind), &bob).await;
        }
        for token in [&alice, &bob] {
            for kind in ["like", "share"] {
                app.post_empty(&routes::reaction(&stale, kind), token).await;
            }
        }
        app.exec_sql(&format!(
            "UPDATE interaction SET created_at = now() - interval '3 days' WHERE meme_id = '{stale}'"
        ))
        .await;

        let res = app
            .get_without_token(&format!("{}?timeframe=day", routes::TRENDING))
            .await;
        assert_eq!(res.status, 200, "{}", res.text);
        assert_eq!(res.body["timeframe"], "day");
        assert_eq!(ranked_ids(&res.body), vec![busy.clone(), quiet.clone()]);
        assert_eq!(res.body["data"][0]["interactions"], 3);

        // The default week reaches back far enough for the older reactions.
        let res = app.get_without_token(routes::TRENDING).await;
        assert_eq!(res.body["timeframe"], "week");
        assert_eq!(ranked_ids(&res.body), vec![stale, busy, quiet]);
        assert_eq!(res.body["data"][0]["interactions"], 4);
    }

    #[tokio::test]
    async fn removed_memes_drop_out() {
        let app = TestApp::spawn().await;
        let alice = app.token_for("user_alice");
        let id = app.create_meme(&alice, "Gone", "a.png").await;
        app.post_empty(&routes::reaction(&id, "like"), &alice).await;

        let res = app.delete_with_token(&routes::meme(&id), &alice).await;
        assert_eq!(res.status, 204);

        let res = app.get_without_token(routes::TRENDING).await;
        assert_eq!(res.body["data"], json!([]));
    }

    #[tokio::test]
    async fn rejects_bad_parameters() {
        let app = TestApp::spawn().await;
        for query in ["limit=0", "limit=51", "timeframe=year"] {
            let res = app
                .get_without_token(&format!("{}?{query}", routes::TRENDING))
                .await;
            assert_eq!(res.status, 400, "{query}: {}", res.text);
        }
    }
}

mod saved {
    use super::*;

    #[tokio::test]
    async fn lists_active_saves_newest_first() {
        let app = TestApp::spawn().await;
        let alice = app.token_for("user_alice");
        let bob = app.token_for("user_bob");
        let first = app.create_meme(&alice, "First", "a.png").await;
        let second = app.create_meme(&alice, "Second", "b.png").await;
        let removed = app.create_meme(&alice, "Removed", "c.png").await;
        let liked = app.create_meme(&alice, "Liked", "d.png").await;

        for id in [&first, &second, &removed] {
            let res = app.post_empty(&routes::reaction(id, "save"), &bob).await;
            assert_eq!(res.status, 200, "{}", res.text);
        }
        app.post_empty(&routes::reaction(&liked, "like"), &bob).await;
        app.post_empty(&routes::reaction(&first, "save"), &alice).await;
        app.delete_with_token(&routes::meme(&removed), &alice).await;

        let res = app.get_with_token(routes::SAVED, &bob).await;
        assert_eq!(res.status, 200, "{}", res.text);
        let ids: Vec<&str> = res.body["data"]
            .as_array()
            .unwrap()
            .iter()
            .map(|s| s["meme"]["id"].as_str().unwrap())
            .collect();
        assert_eq!(ids, vec![second.as_str(), first.as_str()]);
        assert_eq!(res.body["pagination"]["total"], 2);
        assert!(res.body["data"][0]["saved_at"].is_string());

        // Unsaving takes it off the list.
        app.delete_with_token(&routes::reaction(&second, "save"), &bob).await;
        let res = app.get_with_token(routes::SAVED, &bob).await;
        assert_eq!(res.body["pagination"]["total"], 1);
        assert_eq!(res.body["data"][0]["meme"]["id"], first.as_str());
    }

    #[tokio::test]
    async fn requires_token() {
        let app = TestApp::spawn().await;
        let res = app.get_without_token(routes::SAVED).await;
        assert_eq!(res.status, 401);
    }
}
