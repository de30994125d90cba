use std::time::Duration;

use chrono::Utc;
use common::{MemeStatus, ReactionKind};
use sea_orm::sea_query::{Expr, ExprTrait, OnConflict};
use sea_orm::{
    ColumnTrait, ConnectionTrait, DatabaseConnection, DbErr, EntityTrait, QueryFilter,
    QuerySelect, Set, TransactionTrait,
};
use thiserror::Error;
use tracing::debug;
use uuid::Uuid;

use crate::database::{StepTimeout, bounded};
use crate::entity::{interaction, meme};

#[derive(Debug, Error)]
pub enum LedgerError {
    #[error("meme {0} not found")]
    MemeNotFound(Uuid),
    #[error("{0} timed out")]
    Timeout(&'static str),
    #[error(transparent)]
    Db(#[from] DbErr),
}

impl From<StepTimeout> for LedgerError {
    fn from(t: StepTimeout) -> Self {
        LedgerError::Timeout(t.0)
    }
}

/// Aggregate counters of a meme plus the caller's own reactions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReactionState {
    pub like_count: i32,
    pub dislike_count: i32,
    pub share_count: i32,
    pub active: Vec<ReactionKind>,
}

/// Counter column maintained for `kind`. `Save` is not aggregated.
fn counter_column(kind: ReactionKind) -> Option<meme::Column> {
    match kind {
        ReactionKind::Like => Some(meme::Column::LikeCount),
        ReactionKind::Dislike => Some(meme::Column::DislikeCount),
        ReactionKind::Share => Some(meme::Column::ShareCount),
        ReactionKind::Save => None,
    }
}

/// Per-user reactions and the counters derived from them.
///
/// Every call runs in one transaction. Counters move only by the number of
/// ledger rows actually inserted or deleted, so a repeated or concurrent
/// identical reaction can never double count.
pub struct ReactionLedger<'a> {
    db: &'a DatabaseConnection,
    exclusive_votes: bool,
    timeout: Duration,
}

impl<'a> ReactionLedger<'a> {
    /// With `exclusive_votes`, like and dislike behave as a single vote:
    /// setting one retracts the other.
    pub fn new(db: &'a DatabaseConnection, exclusive_votes: bool, timeout: Duration) -> Self {
        Self {
            db,
            exclusive_votes,
            timeout,
        }
    }

    pub async fn set_reaction(
        &self,
        user_id: &str,
        meme_id: Uuid,
        kind: ReactionKind,
        present: bool,
    ) -> Result<ReactionState, LedgerError> {
        // Statements are bounded; the COMMIT is not, so a timeout can only
        // ever leave the transaction rolled back.
        let (txn, state) = bounded(self.timeout, "reaction update", async {
            let txn = self.db.begin().await?;

            find_active(&txn, meme_id).await?;

            if present {
                if insert_row(&txn, user_id, meme_id, kind).await? {
                    adjust_counter(&txn, meme_id, kind, 1).await?;
                }
                if self.exclusive_votes
                    && let Some(opposing) = kind.opposing_vote()
                    && delete_row(&txn, user_id, meme_id, opposing).await?
                {
                    adjust_counter(&txn, meme_id, opposing, -1).await?;
                }
            } else if delete_row(&txn, user_id, meme_id, kind).await? {
                adjust_counter(&txn, meme_id, kind, -1).await?;
            }

            let state = load_state(&txn, user_id, meme_id).await?;
            Ok::<_, LedgerError>((txn, state))
        })
        .await?;
        txn.commit().await?;

        debug!(user_id, %meme_id, %kind, present, likes = state.like_count, "Reaction applied");
        Ok(state)
    }

    /// Current counters and the caller's reactions, without changing anything.
    pub async fn state(&self, user_id: &str, meme_id: Uuid) -> Result<ReactionState, LedgerError> {
        bounded(self.timeout, "reaction lookup", async {
            find_active(self.db, meme_id).await?;
            load_state(self.db, user_id, meme_id).await
        })
        .await
    }
}

async fn find_active<C: ConnectionTrait>(conn: &C, meme_id: Uuid) -> Result<meme::Model, LedgerError> {
    meme::Entity::find_by_id(meme_id)
        .filter(meme::Column::Status.eq(MemeStatus::Active))
        .one(conn)
        .await?
        .ok_or(LedgerError::MemeNotFound(meme_id))
}

/// Returns `true` if a new row was written.
async fn insert_row<C: ConnectionTrait>(
    conn: &C,
    user_id: &str,
    meme_id: Uuid,
    kind: ReactionKind,
) -> Result<bool, DbErr> {
    let result = interaction::Entity::insert(interaction::ActiveModel {
        user_id: Set(user_id.to_string()),
        meme_id: Set(meme_id),
        kind: Set(kind),
        created_at: Set(Utc::now()),
    })
    .on_conflict(
        OnConflict::columns([
            interaction::Column::UserId,
            interaction::Column::MemeId,
            interaction::Column::Kind,
        ])
        .do_nothing()
        .to_owned(),
    )
    .exec_without_returning(conn)
    .await;

    match result {
        Ok(rows) => Ok(rows == 1),
        Err(DbErr::RecordNotInserted) => Ok(false),
        Err(e) => Err(e),
    }
}

/// Returns `true` if a row was removed.
async fn delete_row<C: ConnectionTrait>(
    conn: &C,
    user_id: &str,
    meme_id: Uuid,
    kind: ReactionKind,
) -> Result<bool, DbErr> {
    let result = interaction::Entity::delete_many()
        .filter(interaction::Column::UserId.eq(user_id))
        .filter(interaction::Column::MemeId.eq(meme_id))
        .filter(interaction::Column::Kind.eq(kind))
        .exec(conn)
        .await?;
    Ok(result.rows_affected > 0)
}

async fn adjust_counter<C: ConnectionTrait>(
    conn: &C,
    meme_id: Uuid,
    kind: ReactionKind,
    delta: i32,
) -> Result<(), DbErr> {
    let Some(column) = counter_column(kind) else {
        return Ok(());
    };

    let mut update = meme::Entity::update_many()
        .col_expr(column, Expr::col(column).add(delta))
        .filter(meme::Column::Id.eq(meme_id));
    if delta < 0 {
        update = update.filter(column.gt(0));
    }
    update.exec(conn).await?;
    Ok(())
}

async fn load_state<C: ConnectionTrait>(
    conn: &C,
    user_id: &str,
    meme_id: Uuid,
) -> Result<ReactionState, LedgerError> {
    let meme = meme::Entity::find_by_id(meme_id)
        .one(conn)
        .await?
        .ok_or(LedgerError::MemeNotFound(meme_id))?;

    let mut active: Vec<ReactionKind> = interaction::Entity::find()
        .select_only()
        .column(interaction::Column::Kind)
        .filter(interaction::Column::UserId.eq(user_id))
        .filter(interaction::Column::MemeId.eq(meme_id))
        .into_tuple()
        .all(conn)
        .await?;
    active.sort_by_key(|k| ReactionKind::ALL.iter().position(|a| a == k));

    Ok(ReactionState {
        like_count: meme.like_count,
        dislike_count: meme.dislike_count,
        share_count: meme.share_count,
        active,
    })
}
