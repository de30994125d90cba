use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use super::{Classifier, EnrichmentError, StoredImage, bounded};

/// Longest label accepted from a classifier.
pub const MAX_LABEL_CHARS: usize = 64;

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ClassifyRequest<'a> {
    image_url: &'a str,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ClassifyResponse {
    suggested_category: Option<String>,
}

/// Reduce a raw classifier answer to a usable category name.
///
/// Keeps ASCII letters, digits, spaces and `& / -`, then trims. Returns `None`
/// when nothing is left or the result is longer than [`MAX_LABEL_CHARS`].
pub fn clean_label(raw: &str) -> Option<String> {
    let cleaned: String = raw
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || matches!(c, ' ' | '&' | '/' | '-'))
        .collect();
    let cleaned = cleaned.trim();
    if cleaned.is_empty() || cleaned.chars().count() > MAX_LABEL_CHARS {
        return None;
    }
    Some(cleaned.to_string())
}

/// Vision classifier reached over HTTP.
///
/// POSTs `{"imageUrl": ...}` and expects `{"suggestedCategory": "..."}`.
pub struct HttpClassifier {
    url: String,
    client: reqwest::Client,
    timeout: Duration,
}

impl HttpClassifier {
    pub fn new(url: String, client: reqwest::Client, timeout: Duration) -> Self {
        Self {
            url,
            client,
            timeout,
        }
    }

    async fn request(&self, image: &StoredImage) -> Result<Option<String>, EnrichmentError> {
        let response = self
            .client
            .post(&self.url)
            .json(&ClassifyRequest {
                image_url: &image.public_url,
            })
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(EnrichmentError::Api(status.as_u16(), error_text));
        }

        let body: ClassifyResponse = response.json().await?;
        Ok(body.suggested_category.as_deref().and_then(clean_label))
    }
}

#[async_trait]
impl Classifier for HttpClassifier {
    async fn classify(&self, image: &StoredImage) -> Result<Option<String>, EnrichmentError> {
        bounded(self.timeout, self.request(image)).await
    }
}

pub struct DisabledClassifier;

#[async_trait]
impl Classifier for DisabledClassifier {
    async fn classify(&self, _image: &StoredImage) -> Result<Option<String>, EnrichmentError> {
        Ok(None)
    }
}
