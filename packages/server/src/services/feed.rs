use std::time::Duration;

use chrono::{DateTime, TimeDelta, Utc};
use common::{MemeStatus, ReactionKind};
use rand::seq::SliceRandom;
use sea_orm::sea_query::{Expr, Query as SeaQuery};
use sea_orm::{
    ColumnTrait, ConnectionTrait, DbErr, EntityTrait, Order, QueryFilter, QueryOrder, QuerySelect,
    Set,
};
use tracing::{debug, warn};
use uuid::Uuid;

use crate::config::FeedConfig;
use crate::database::{StepTimeout, bounded};
use crate::entity::{feed_exposure, interaction, meme};

/// Parse a comma-separated list of meme ids.
///
/// Blank entries are ignored and duplicates collapse. More than `max` ids or
/// a malformed id is an error message for the caller.
pub fn parse_exclude(raw: Option<&str>, max: usize) -> Result<Vec<Uuid>, String> {
    let Some(raw) = raw else {
        return Ok(Vec::new());
    };

    let mut ids = Vec::new();
    for part in raw.split(',').map(str::trim).filter(|p| !p.is_empty()) {
        let id = Uuid::parse_str(part).map_err(|_| format!("Invalid meme id in exclude: '{part}'"))?;
        if !ids.contains(&id) {
            ids.push(id);
        }
        if ids.len() > max {
            return Err(format!("exclude accepts at most {max} ids"));
        }
    }
    Ok(ids)
}

/// Exposures older than this no longer steer sampling.
pub fn exposure_cutoff(config: &FeedConfig, now: DateTime<Utc>) -> DateTime<Utc> {
    now - TimeDelta::hours(config.exposure_window_hours)
}

#[derive(Debug)]
enum ExposureError {
    Db(DbErr),
    Timeout,
}

impl From<DbErr> for ExposureError {
    fn from(e: DbErr) -> Self {
        ExposureError::Db(e)
    }
}

impl From<StepTimeout> for ExposureError {
    fn from(_: StepTimeout) -> Self {
        ExposureError::Timeout
    }
}

/// Random discovery sampling over active memes.
pub struct FeedSampler<'a, C: ConnectionTrait> {
    conn: &'a C,
    config: &'a FeedConfig,
    timeout: Duration,
}

impl<'a, C: ConnectionTrait> FeedSampler<'a, C> {
    /// `timeout` bounds exposure bookkeeping, which never fails the request.
    pub fn new(conn: &'a C, config: &'a FeedConfig, timeout: Duration) -> Self {
        Self {
            conn,
            config,
            timeout,
        }
    }

    /// Return up to `limit` active memes, none of them in `exclude`.
    ///
    /// For a known user, memes shown within the exposure window and memes the
    /// user disliked are skipped too. Fewer than `limit` results means the
    /// eligible set is exhausted.
    pub async fn sample(
        &self,
        user_id: Option<&str>,
        exclude: &[Uuid],
        limit: u64,
    ) -> Result<Vec<meme::Model>, DbErr> {
        let mut select = meme::Entity::find().filter(meme::Column::Status.eq(MemeStatus::Active));

        if !exclude.is_empty() {
            select = select.filter(meme::Column::Id.is_not_in(exclude.iter().copied()));
        }

        if let Some(user_id) = user_id {
            if self.config.avoid_recent_exposures {
                let since = exposure_cutoff(self.config, Utc::now());
                select = select.filter(
                    meme::Column::Id.not_in_subquery(
                        SeaQuery::select()
                            .column(feed_exposure::Column::MemeId)
                            .from(feed_exposure::Entity)
                            .and_where(feed_exposure::Column::UserId.eq(user_id))
                            .and_where(feed_exposure::Column::ShownAt.gte(since))
                            .to_owned(),
                    ),
                );
            }
            if self.config.exclude_disliked {
                select = select.filter(
                    meme::Column::Id.not_in_subquery(
                        SeaQuery::select()
                            .column(interaction::Column::MemeId)
                            .from(interaction::Entity)
                            .and_where(interaction::Column::UserId.eq(user_id))
                            .and_where(interaction::Column::Kind.eq(ReactionKind::Dislike))
                            .to_owned(),
                    ),
                );
            }
        }

        // Uniform pick in the database, then shuffle the page itself so the
        // order does not follow any index.
        let mut memes = select
            .order_by(Expr::cust("RANDOM()"), Order::Asc)
            .limit(limit)
            .all(self.conn)
            .await?;
        memes.shuffle(&mut rand::rng());
        Ok(memes)
    }

    /// Remember what was shown and forget the caller's exposures that fell
    /// out of the window. Failures are logged, never returned.
    pub async fn record_exposures(&self, user_id: &str, memes: &[meme::Model], now: DateTime<Utc>) {
        if memes.is_empty() {
            return;
        }
        let rows = memes.iter().map(|m| feed_exposure::ActiveModel {
            user_id: Set(user_id.to_string()),
            meme_id: Set(m.id),
            shown_at: Set(now),
            ..Default::default()
        });
        let cutoff = exposure_cutoff(self.config, now);

        let result = bounded(self.timeout, "exposure update", async {
            let pruned = feed_exposure::Entity::delete_many()
                .filter(feed_exposure::Column::UserId.eq(user_id))
                .filter(feed_exposure::Column::ShownAt.lt(cutoff))
                .exec(self.conn)
                .await?;
            feed_exposure::Entity::insert_many(rows)
                .exec_without_returning(self.conn)
                .await?;
            Ok::<_, ExposureError>(pruned.rows_affected)
        })
        .await;

        match result {
            Ok(0) => {}
            Ok(pruned) => debug!(user_id, pruned, "Pruned stale feed exposures"),
            Err(ExposureError::Db(e)) => {
                warn!(user_id, error = %e, "Failed to record feed exposures")
            }
            Err(ExposureError::Timeout) => warn!(user_id, "Recording feed exposures timed out"),
        }
    }
}
