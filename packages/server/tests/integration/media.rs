use crate::common::{TestApp, Upload};

/// Path of the media route for a meme's public image URL.
fn media_path(image_url: &str) -> String {
    let key = image_url
        .strip_prefix("http://media.test/api/v1/media/")
        .expect("image_url under the configured base");
    format!("/api/v1/media/{key}")
}

#[tokio::test]
async fn serves_stored_bytes_with_etag() {
    let app = TestApp::spawn().await;
    let token = app.token_for("user_alice");
    let upload = Upload::png("Hello", "cat.png", "bytes");
    let expected = upload.bytes.clone();
    let res = app.submit(upload, &token).await;
    assert_eq!(res.status, 201);
    let path = media_path(res.body["image_url"].as_str().unwrap());
    let key = path.trim_start_matches("/api/v1/media/");
    assert!(app.object_store.exists(key).await.unwrap());

    let res = app.raw_get(&path, &[]).await;
    assert_eq!(res.status().as_u16(), 200);
    assert_eq!(res.headers()["content-type"], "image/png");
    let etag = res.headers()["etag"].to_str().unwrap().to_string();
    assert_eq!(res.bytes().await.unwrap().as_ref(), expected.as_slice());

    let res = app.raw_get(&path, &[("If-None-Match", &etag)]).await;
    assert_eq!(res.status().as_u16(), 304);
}

#[tokio::test]
async fn missing_object_is_404() {
    let app = TestApp::spawn().await;
    let res = app.raw_get("/api/v1/media/nobody/missing.png", &[]).await;
    assert_eq!(res.status().as_u16(), 404);
}
