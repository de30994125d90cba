use std::sync::Arc;
use std::time::Duration;

use common::storage::ObjectStore;
use sea_orm::DatabaseConnection;

use crate::config::AppConfig;
use crate::database;
use crate::enrichment::{Classifier, Fingerprinter};
use crate::error::AppError;

#[derive(Clone)]
pub struct AppState {
    pub db: DatabaseConnection,
    pub config: Arc<AppConfig>,
    pub object_store: Arc<dyn ObjectStore>,
    pub fingerprinter: Arc<dyn Fingerprinter>,
    pub classifier: Arc<dyn Classifier>,
}

impl AppState {
    /// Upper bound for one datastore round.
    pub fn db_timeout(&self) -> Duration {
        Duration::from_millis(self.config.database.timeout_ms)
    }

    /// Bound a datastore step from a handler. Elapsed maps to [`AppError::Timeout`].
    pub async fn bounded<T, E, F>(&self, step: &'static str, fut: F) -> Result<T, AppError>
    where
        F: Future<Output = Result<T, E>>,
        AppError: From<E>,
    {
        database::bounded(self.db_timeout(), step, async { fut.await.map_err(AppError::from) })
            .await
    }
}
