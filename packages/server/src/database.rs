use std::time::Duration;

use sea_orm::{ConnectOptions, Database, DatabaseConnection, DbErr};
use thiserror::Error;

pub async fn init_db(db_url: &str) -> Result<DatabaseConnection, DbErr> {
    let mut opt = ConnectOptions::new(db_url.to_owned());

    // Set connection pool options
    opt.max_connections(50)
        .min_connections(2)
        .connect_timeout(Duration::from_secs(8))
        .acquire_timeout(Duration::from_secs(8))
        .idle_timeout(Duration::from_secs(300))
        .sqlx_logging(false);

    let db = Database::connect(opt).await?;
    db.get_schema_registry("memehub::entity::*")
        .sync(&db)
        .await?;

    Ok(db)
}

/// A datastore step that did not finish within its bound.
#[derive(Debug, Clone, Copy, Error)]
#[error("{0} timed out")]
pub struct StepTimeout(pub &'static str);

/// Run one datastore step under `limit`.
///
/// The step's own error passes through; an elapsed bound becomes
/// `E::from(StepTimeout(step))`. Dropping a transaction future on timeout
/// rolls the transaction back.
pub async fn bounded<T, E, F>(limit: Duration, step: &'static str, fut: F) -> Result<T, E>
where
    F: Future<Output = Result<T, E>>,
    E: From<StepTimeout>,
{
    match tokio::time::timeout(limit, fut).await {
        Ok(result) => result,
        Err(_) => Err(E::from(StepTimeout(step))),
    }
}
