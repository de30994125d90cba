use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

use super::error::StorageError;
use super::traits::{BoxReader, ObjectStore};

/// Wraps another store and bounds every call with a timeout.
///
/// Elapsed calls fail with [`StorageError::Timeout`] so callers can tell a slow
/// backend from a failing one.
pub struct TimedObjectStore {
    inner: Arc<dyn ObjectStore>,
    limit: Duration,
}

impl TimedObjectStore {
    pub fn new(inner: Arc<dyn ObjectStore>, limit: Duration) -> Self {
        Self { inner, limit }
    }

    async fn bounded<T>(
        &self,
        operation: &'static str,
        fut: impl Future<Output = Result<T, StorageError>>,
    ) -> Result<T, StorageError> {
        tokio::time::timeout(self.limit, fut)
            .await
            .map_err(|_| StorageError::Timeout { operation })?
    }
}

#[async_trait]
impl ObjectStore for TimedObjectStore {
    async fn put(
        &self,
        key: &str,
        data: &[u8],
        content_type: &str,
    ) -> Result<String, StorageError> {
        self.bounded("put", self.inner.put(key, data, content_type))
            .await
    }

    async fn get(&self, key: &str) -> Result<Vec<u8>, StorageError> {
        self.bounded("get", self.inner.get(key)).await
    }

    async fn get_stream(&self, key: &str) -> Result<BoxReader, StorageError> {
        self.bounded("get", self.inner.get_stream(key)).await
    }

    async fn exists(&self, key: &str) -> Result<bool, StorageError> {
        self.bounded("head", self.inner.exists(key)).await
    }

    async fn delete(&self, key: &str) -> Result<bool, StorageError> {
        self.bounded("delete", self.inner.delete(key)).await
    }

    fn public_url(&self, key: &str) -> String {
        self.inner.public_url(key)
    }
}
