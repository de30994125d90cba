//! The submission pipeline.
//!
//! validate → quota → upload → fingerprint → dedup → classify → commit → link
//!
//! Only the upload is an external side effect that needs undoing. It is
//! compensated when the put itself times out (the backend may still have
//! accepted it), on the duplicate branch and when the commit fails.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use common::storage::{ObjectStore, StorageError};
use common::{AccountTier, MemeStatus};
use sea_orm::sea_query::{LockType, OnConflict};
use sea_orm::{
    ActiveModelTrait, ConnectionTrait, DatabaseConnection, DbErr, EntityTrait, QuerySelect, Set,
    SqlErr, TransactionTrait,
};
use thiserror::Error;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::config::{AppConfig, UploadConfig};
use crate::database::{self, StepTimeout};
use crate::enrichment::{Classifier, Fingerprinter, StoredImage, clean_label};
use crate::entity::{account, category, meme};
use crate::services::category::CategoryResolver;
use crate::services::dedup::DedupIndex;
use crate::services::quota::{QuotaTracker, QuotaUsage, month_label};
use crate::state::AppState;
use crate::utils::filename::storage_key;

#[derive(Debug, Error)]
pub enum IngestError {
    #[error("{0}")]
    Validation(String),

    #[error("account has been deleted")]
    AccountDeleted,

    #[error("quota exceeded: {0:?}")]
    QuotaExceeded(QuotaUsage),

    #[error("upload failed: {0}")]
    Storage(#[from] StorageError),

    #[error("duplicate of meme {existing_id}")]
    Duplicate { existing_id: Uuid },

    #[error("commit failed: {0}")]
    Persistence(String),

    #[error("{0} timed out")]
    Timeout(&'static str),
}

impl From<StepTimeout> for IngestError {
    fn from(t: StepTimeout) -> Self {
        IngestError::Timeout(t.0)
    }
}

/// A meme as received from the caller.
#[derive(Debug, Clone)]
pub struct Submission {
    pub owner_id: String,
    pub title: String,
    pub description: Option<String>,
    pub filename: String,
    pub content_type: String,
    pub data: Vec<u8>,
}

/// A committed meme and the categories linked during ingestion.
#[derive(Debug, Clone)]
pub struct Ingested {
    pub meme: meme::Model,
    pub categories: Vec<category::Model>,
}

/// Check the caller-supplied fields. Returns the trimmed title and description.
pub fn validate(
    submission: &Submission,
    config: &UploadConfig,
) -> Result<(String, Option<String>), IngestError> {
    let title = submission.title.trim();
    if title.is_empty() || title.chars().count() > config.title_max_chars {
        return Err(IngestError::Validation(format!(
            "Title must be 1-{} characters",
            config.title_max_chars
        )));
    }

    let description = submission
        .description
        .as_deref()
        .map(str::trim)
        .filter(|d| !d.is_empty());
    if let Some(d) = description
        && d.chars().count() > config.description_max_chars
    {
        return Err(IngestError::Validation(format!(
            "Description must be at most {} characters",
            config.description_max_chars
        )));
    }

    if !config
        .allowed_types
        .iter()
        .any(|t| t.eq_ignore_ascii_case(&submission.content_type))
    {
        return Err(IngestError::Validation(format!(
            "Unsupported file type '{}'. Allowed: {}",
            submission.content_type,
            config.allowed_types.join(", ")
        )));
    }

    if submission.data.is_empty() {
        return Err(IngestError::Validation("File is empty".into()));
    }
    if submission.data.len() as u64 > config.max_size {
        return Err(IngestError::Validation(format!(
            "File exceeds the {} byte limit",
            config.max_size
        )));
    }

    Ok((title.to_string(), description.map(str::to_string)))
}

/// Owned handles for one pipeline run, so it can live on its own task.
#[derive(Clone)]
pub struct IngestPipeline {
    db: DatabaseConnection,
    config: Arc<AppConfig>,
    object_store: Arc<dyn ObjectStore>,
    fingerprinter: Arc<dyn Fingerprinter>,
    classifier: Arc<dyn Classifier>,
}

impl IngestPipeline {
    pub fn from_state(state: &AppState) -> Self {
        Self {
            db: state.db.clone(),
            config: state.config.clone(),
            object_store: state.object_store.clone(),
            fingerprinter: state.fingerprinter.clone(),
            classifier: state.classifier.clone(),
        }
    }

    fn db_timeout(&self) -> Duration {
        Duration::from_millis(self.config.database.timeout_ms)
    }

    /// Bound a datastore step. Elapsed maps to [`IngestError::Timeout`].
    async fn bounded<T, F>(&self, step: &'static str, fut: F) -> Result<T, IngestError>
    where
        F: Future<Output = Result<T, DbErr>>,
    {
        database::bounded(self.db_timeout(), step, async {
            fut.await.map_err(|e| IngestError::Persistence(e.to_string()))
        })
        .await
    }

    /// Run the whole pipeline for one submission.
    pub async fn submit(&self, submission: Submission) -> Result<Ingested, IngestError> {
        let (title, description) = validate(&submission, &self.config.upload)?;
        let owner_id = submission.owner_id.as_str();
        let now = Utc::now();

        let tier = self.check_quota(owner_id, now).await?;

        let key = storage_key(owner_id, &submission.filename, now);
        if let Err(e) = self
            .object_store
            .put(&key, &submission.data, &submission.content_type)
            .await
        {
            if e.is_timeout() {
                self.compensate(&key, "upload timed out").await;
            }
            return Err(e.into());
        }
        let image = StoredImage {
            public_url: self.object_store.public_url(&key),
            key,
        };
        info!(owner_id, storage_key = %image.key, "Stored upload");

        let fingerprint = match self.fingerprinter.fingerprint(&image).await {
            Ok(fp) => Some(fp),
            Err(e) => {
                warn!(
                    owner_id,
                    storage_key = %image.key,
                    error = %e,
                    "Fingerprinting failed, skipping dedup"
                );
                None
            }
        };

        if let Some(fp) = fingerprint.as_deref() {
            let existing = self
                .bounded("dedup check", DedupIndex::new(&self.db).find_by_fingerprint(fp))
                .await;
            match existing {
                Ok(None) => {}
                Ok(Some(existing)) => {
                    info!(owner_id, existing_id = %existing.id, "Rejected duplicate submission");
                    self.compensate(&image.key, "duplicate").await;
                    return Err(IngestError::Duplicate {
                        existing_id: existing.id,
                    });
                }
                Err(e) => {
                    self.compensate(&image.key, "dedup check failed").await;
                    return Err(e);
                }
            }
        }

        let label = match self.classifier.classify(&image).await {
            Ok(label) => label.as_deref().and_then(clean_label),
            Err(e) => {
                warn!(owner_id, storage_key = %image.key, error = %e, "Classification failed");
                None
            }
        };

        let record = meme::ActiveModel {
            id: Set(Uuid::now_v7()),
            owner_id: Set(owner_id.to_string()),
            title: Set(title),
            description: Set(description),
            storage_key: Set(image.key.clone()),
            content_type: Set(submission.content_type.to_ascii_lowercase()),
            fingerprint: Set(fingerprint.clone()),
            like_count: Set(0),
            dislike_count: Set(0),
            share_count: Set(0),
            status: Set(MemeStatus::Active),
            created_at: Set(now),
        };

        let meme = match self.commit(owner_id, tier, record, now).await {
            Ok(meme) => meme,
            Err(err) => {
                self.compensate(&image.key, "commit failed").await;
                return Err(self.classify_commit_error(err, fingerprint.as_deref()).await);
            }
        };
        info!(owner_id, meme_id = %meme.id, "Committed meme");

        let mut categories = Vec::new();
        if let Some(label) = label {
            let linked = self
                .bounded(
                    "category link",
                    CategoryResolver::new(&self.db).attach(meme.id, &label),
                )
                .await;
            match linked {
                Ok(Some(category)) => categories.push(category),
                Ok(None) => {}
                Err(e) => {
                    warn!(meme_id = %meme.id, label = %label, error = %e, "Failed to link category");
                }
            }
        }

        Ok(Ingested { meme, categories })
    }

    /// Refuse deleted accounts and exhausted windows. Returns the owner's tier.
    async fn check_quota(
        &self,
        owner_id: &str,
        now: DateTime<Utc>,
    ) -> Result<AccountTier, IngestError> {
        let account = self
            .bounded(
                "quota check",
                account::Entity::find_by_id(owner_id.to_string()).one(&self.db),
            )
            .await?;
        if account.as_ref().is_some_and(|a| a.deleted_at.is_some()) {
            return Err(IngestError::AccountDeleted);
        }
        let tier = account.map(|a| a.tier).unwrap_or_default();

        let tracker = QuotaTracker::new(&self.db, &self.config.upload);
        let decision = self
            .bounded("quota check", tracker.check(owner_id, tier, now))
            .await?;
        if let Some(usage) = decision.exceeded() {
            info!(
                owner_id,
                window = usage.window.label(),
                count = usage.count,
                limit = usage.limit,
                "Quota exceeded"
            );
            return Err(IngestError::QuotaExceeded(usage));
        }
        Ok(tier)
    }

    /// Insert the meme and bump the owner's counters atomically.
    ///
    /// The statements are bounded; the final COMMIT is not, so a timeout can
    /// only ever leave the transaction rolled back.
    async fn commit(
        &self,
        owner_id: &str,
        tier: AccountTier,
        record: meme::ActiveModel,
        now: DateTime<Utc>,
    ) -> Result<meme::Model, CommitError> {
        let txn = database::bounded(self.db_timeout(), "commit", async {
            Ok::<_, CommitError>(self.db.begin().await?)
        })
        .await?;

        let inserted = database::bounded(self.db_timeout(), "commit", async {
            record_upload(&txn, owner_id, tier, now).await?;
            Ok::<_, CommitError>(record.insert(&txn).await?)
        })
        .await?;

        txn.commit().await?;
        Ok(inserted)
    }

    /// Map a failed commit onto the caller-visible error.
    ///
    /// A unique violation means a concurrent submission with the same
    /// fingerprint won the race; report it as a duplicate of the winner.
    async fn classify_commit_error(&self, err: CommitError, fingerprint: Option<&str>) -> IngestError {
        match err {
            CommitError::Timeout => IngestError::Timeout("commit"),
            CommitError::Db(e) => {
                if matches!(e.sql_err(), Some(SqlErr::UniqueConstraintViolation(_)))
                    && let Some(fp) = fingerprint
                    && let Ok(Some(winner)) = self
                        .bounded("dedup check", DedupIndex::new(&self.db).find_by_fingerprint(fp))
                        .await
                {
                    return IngestError::Duplicate {
                        existing_id: winner.id,
                    };
                }
                IngestError::Persistence(e.to_string())
            }
        }
    }

    /// Best-effort removal of an object whose meme will never exist.
    async fn compensate(&self, key: &str, reason: &'static str) {
        match self.object_store.delete(key).await {
            Ok(_) => info!(storage_key = %key, reason, "Removed uploaded object"),
            Err(e) => error!(
                storage_key = %key,
                reason,
                error = %e,
                "Compensating delete failed, object is orphaned"
            ),
        }
    }
}

#[derive(Debug, Error)]
enum CommitError {
    #[error("timed out")]
    Timeout,
    #[error(transparent)]
    Db(#[from] DbErr),
}

impl From<StepTimeout> for CommitError {
    fn from(_: StepTimeout) -> Self {
        CommitError::Timeout
    }
}

/// Ensure the owner's account row exists and count the upload against it.
async fn record_upload<C: ConnectionTrait>(
    conn: &C,
    owner_id: &str,
    tier: AccountTier,
    now: DateTime<Utc>,
) -> Result<(), DbErr> {
    let month = month_label(now);

    account::Entity::insert(account::ActiveModel {
        id: Set(owner_id.to_string()),
        username: Set(None),
        email: Set(None),
        tier: Set(tier),
        monthly_upload_count: Set(0),
        total_uploads: Set(0),
        quota_month: Set(month.clone()),
        created_at: Set(now),
        updated_at: Set(now),
        deleted_at: Set(None),
    })
    .on_conflict(OnConflict::column(account::Column::Id).do_nothing().to_owned())
    .exec_without_returning(conn)
    .await
    .or_else(|e| match e {
        DbErr::RecordNotInserted => Ok(0),
        e => Err(e),
    })?;

    let current = account::Entity::find_by_id(owner_id.to_string())
        .lock(LockType::Update)
        .one(conn)
        .await?
        .ok_or_else(|| DbErr::RecordNotFound(format!("account {owner_id}")))?;

    let monthly = if current.quota_month == month {
        current.monthly_upload_count + 1
    } else {
        1
    };
    let total = current.total_uploads + 1;

    let mut active: account::ActiveModel = current.into();
    active.monthly_upload_count = Set(monthly);
    active.total_uploads = Set(total);
    active.quota_month = Set(month);
    active.updated_at = Set(now);
    active.update(conn).await?;
    Ok(())
}
