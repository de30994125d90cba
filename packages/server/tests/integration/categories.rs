use crate::common::{TestApp, Upload, routes};

#[tokio::test]
async fn label_variants_share_one_category() {
    let app = TestApp::spawn().await;
    let alice = app.token_for("user_alice");

    let first = app
        .submit(Upload::png("Rex", "dog.png", "rex"), &alice)
        .await;
    let second = app
        .submit(Upload::png("Fido", "puppy.png", "fido"), &alice)
        .await;
    assert_eq!(first.status, 201, "{}", first.text);
    assert_eq!(second.status, 201, "{}", second.text);
    assert_eq!(
        first.body["categories"][0]["id"],
        second.body["categories"][0]["id"]
    );
    assert_eq!(second.body["categories"][0]["slug"], "good-dogs");
    assert_eq!(second.body["categories"][0]["name"], "Good Dogs");

    let res = app.get_without_token(routes::CATEGORIES).await;
    assert_eq!(res.status, 200);
    let data = res.body["data"].as_array().unwrap();
    assert_eq!(data.len(), 1);
    assert_eq!(data[0]["slug"], "good-dogs");
}

#[tokio::test]
async fn distinct_labels_get_distinct_slugs() {
    let app = TestApp::spawn().await;
    let alice = app.token_for("user_alice");
    app.create_meme(&alice, "Tom", "cat.png").await;
    app.create_meme(&alice, "Rex", "dog.png").await;
    app.create_meme(&alice, "Noise", "glitch.png").await;

    let res = app.get_without_token(routes::CATEGORIES).await;
    let slugs: Vec<&str> = res.body["data"]
        .as_array()
        .unwrap()
        .iter()
        .map(|c| c["slug"].as_str().unwrap())
        .collect();
    assert_eq!(slugs, ["funny-cats", "good-dogs"]);
}

#[tokio::test]
async fn concurrent_first_use_converges() {
    let app = TestApp::spawn().await;
    let tokens: Vec<String> = (0..4).map(|i| app.token_for(&format!("user_c{i}"))).collect();
    let app = &app;

    let futures = tokens.iter().enumerate().map(|(i, t)| {
        let seed = format!("cat-{i}");
        async move {
            app.submit(Upload::png("Cat", "cat.png", &seed), t)
                .await
        }
    });
    for res in futures::future::join_all(futures).await {
        assert_eq!(res.status, 201, "{}", res.text);
        assert_eq!(res.body["categories"][0]["slug"], "funny-cats");
    }

    let res = app.get_without_token(routes::CATEGORIES).await;
    assert_eq!(res.body["data"].as_array().unwrap().len(), 1);
}
