use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use common::storage::{ContentHash, ObjectStore};
use serde::{Deserialize, Serialize};

use super::{EnrichmentError, Fingerprinter, StoredImage, bounded};

#[derive(Serialize)]
struct PhashRequest<'a> {
    image_url: &'a str,
}

#[derive(Deserialize)]
struct PhashResponse {
    phash: String,
}

/// Perceptual-hash service reached over HTTP.
///
/// POSTs `{"image_url": ...}` and expects `{"phash": "..."}`.
pub struct HttpFingerprinter {
    url: String,
    client: reqwest::Client,
    timeout: Duration,
}

impl HttpFingerprinter {
    pub fn new(url: String, client: reqwest::Client, timeout: Duration) -> Self {
        Self {
            url,
            client,
            timeout,
        }
    }

    async fn request(&self, image: &StoredImage) -> Result<String, EnrichmentError> {
        tracing::debug!(url = %self.url, key = %image.key, "Requesting fingerprint");

        let response = self
            .client
            .post(&self.url)
            .json(&PhashRequest {
                image_url: &image.public_url,
            })
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(EnrichmentError::Api(status.as_u16(), error_text));
        }

        let body: PhashResponse = response.json().await?;
        let phash = body.phash.trim();
        if phash.is_empty() {
            return Err(EnrichmentError::Parse("empty phash".into()));
        }
        Ok(phash.to_string())
    }
}

#[async_trait]
impl Fingerprinter for HttpFingerprinter {
    async fn fingerprint(&self, image: &StoredImage) -> Result<String, EnrichmentError> {
        bounded(self.timeout, self.request(image)).await
    }
}

/// SHA-256 of the stored bytes, read back through the object store.
///
/// Only exact re-uploads collide, which is enough for local runs without a
/// hashing service.
pub struct ContentDigestFingerprinter {
    object_store: Arc<dyn ObjectStore>,
    timeout: Duration,
}

impl ContentDigestFingerprinter {
    pub fn new(object_store: Arc<dyn ObjectStore>, timeout: Duration) -> Self {
        Self {
            object_store,
            timeout,
        }
    }
}

#[async_trait]
impl Fingerprinter for ContentDigestFingerprinter {
    async fn fingerprint(&self, image: &StoredImage) -> Result<String, EnrichmentError> {
        bounded(self.timeout, async {
            let data = self.object_store.get(&image.key).await?;
            Ok::<_, EnrichmentError>(ContentHash::compute(&data).to_hex())
        })
        .await
    }
}

pub struct DisabledFingerprinter;

#[async_trait]
impl Fingerprinter for DisabledFingerprinter {
    async fn fingerprint(&self, _image: &StoredImage) -> Result<String, EnrichmentError> {
        Err(EnrichmentError::Disabled)
    }
}
