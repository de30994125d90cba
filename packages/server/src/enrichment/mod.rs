//! Best-effort enrichment of uploaded images.
//!
//! Both capabilities are external and unreliable. Their failures surface as
//! [`EnrichmentError`] and the ingestion pipeline absorbs them; they never
//! fail a submission.

pub mod classifier;
pub mod fingerprint;

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use common::storage::{ObjectStore, StorageError};
use thiserror::Error;

use crate::config::{ClassifierProvider, EnrichmentConfig, FingerprintProvider};

pub use classifier::{DisabledClassifier, HttpClassifier, clean_label};
pub use fingerprint::{ContentDigestFingerprinter, DisabledFingerprinter, HttpFingerprinter};

const USER_AGENT: &str = concat!("memehub/", env!("CARGO_PKG_VERSION"));

#[derive(Debug, Error)]
pub enum EnrichmentError {
    #[error("enrichment provider is disabled")]
    Disabled,

    #[error("network error: {0}")]
    Network(String),

    #[error("service returned {0}: {1}")]
    Api(u16, String),

    #[error("unexpected response: {0}")]
    Parse(String),

    #[error("timed out after {0:?}")]
    Timeout(Duration),

    #[error("reading stored object failed: {0}")]
    Storage(#[from] StorageError),
}

impl From<reqwest::Error> for EnrichmentError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            EnrichmentError::Parse(err.to_string())
        } else {
            EnrichmentError::Network(err.to_string())
        }
    }
}

/// A freshly uploaded object, addressed both by key and by public URL.
#[derive(Debug, Clone)]
pub struct StoredImage {
    pub key: String,
    pub public_url: String,
}

/// Computes an opaque near-duplicate fingerprint for an image.
#[async_trait]
pub trait Fingerprinter: Send + Sync {
    async fn fingerprint(&self, image: &StoredImage) -> Result<String, EnrichmentError>;
}

/// Suggests a free-text topical label for an image.
///
/// `Ok(None)` means the classifier answered but had nothing to suggest.
#[async_trait]
pub trait Classifier: Send + Sync {
    async fn classify(&self, image: &StoredImage) -> Result<Option<String>, EnrichmentError>;
}

/// Wrap an enrichment call in the provider's deadline.
pub(crate) async fn bounded<T, F>(timeout: Duration, fut: F) -> Result<T, EnrichmentError>
where
    F: Future<Output = Result<T, EnrichmentError>>,
{
    tokio::time::timeout(timeout, fut)
        .await
        .map_err(|_| EnrichmentError::Timeout(timeout))?
}

fn http_client(timeout: Duration) -> Result<reqwest::Client, EnrichmentError> {
    reqwest::Client::builder()
        .user_agent(USER_AGENT)
        .timeout(timeout)
        .build()
        .map_err(|e| EnrichmentError::Network(e.to_string()))
}

/// Build the configured fingerprint provider.
pub fn build_fingerprinter(
    config: &EnrichmentConfig,
    object_store: Arc<dyn ObjectStore>,
) -> Result<Arc<dyn Fingerprinter>, EnrichmentError> {
    let cfg = &config.fingerprint;
    let timeout = Duration::from_millis(cfg.timeout_ms);
    Ok(match cfg.provider {
        FingerprintProvider::Http => {
            let url = cfg.url.clone().ok_or_else(|| {
                EnrichmentError::Network("enrichment.fingerprint.url is not set".into())
            })?;
            Arc::new(HttpFingerprinter::new(url, http_client(timeout)?, timeout))
        }
        FingerprintProvider::ContentDigest => {
            Arc::new(ContentDigestFingerprinter::new(object_store, timeout))
        }
        FingerprintProvider::Disabled => Arc::new(DisabledFingerprinter),
    })
}

/// Build the configured classification provider.
pub fn build_classifier(config: &EnrichmentConfig) -> Result<Arc<dyn Classifier>, EnrichmentError> {
    let cfg = &config.classifier;
    let timeout = Duration::from_millis(cfg.timeout_ms);
    Ok(match cfg.provider {
        ClassifierProvider::Http => {
            let url = cfg.url.clone().ok_or_else(|| {
                EnrichmentError::Network("enrichment.classifier.url is not set".into())
            })?;
            Arc::new(HttpClassifier::new(url, http_client(timeout)?, timeout))
        }
        ClassifierProvider::Disabled => Arc::new(DisabledClassifier),
    })
}
