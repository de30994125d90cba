use axum::Json;
use axum::extract::State;
use chrono::Utc;
use tracing::instrument;

use crate::error::{AppError, ErrorBody};
use crate::extractors::auth::OptionalAuthUser;
use crate::extractors::rejection::AppQuery;
use crate::handlers::memes::render_memes;
use crate::models::feed::{FeedQuery, FeedResponse};
use crate::services::feed::{FeedSampler, parse_exclude};
use crate::state::AppState;

#[utoipa::path(
    get,
    path = "/",
    tag = "Feed",
    operation_id = "getFeed",
    summary = "Random discovery batch",
    description = "Random active memes, never including IDs from `exclude`. Signed-in callers \
        also skip memes shown to them recently and memes they disliked. A batch shorter \
        than `limit` means the feed is exhausted.",
    params(FeedQuery),
    responses(
        (status = 200, description = "Feed batch", body = FeedResponse),
        (status = 400, description = "Validation error (VALIDATION_ERROR)", body = ErrorBody),
        (status = 401, description = "Invalid token (TOKEN_INVALID)", body = ErrorBody),
        (status = 504, description = "Timed out (TIMEOUT)", body = ErrorBody),
    ),
    security((), ("jwt" = [])),
)]
#[instrument(skip(state, auth_user, query))]
pub async fn get_feed(
    auth_user: OptionalAuthUser,
    State(state): State<AppState>,
    AppQuery(query): AppQuery<FeedQuery>,
) -> Result<Json<FeedResponse>, AppError> {
    let config = &state.config.feed;
    let limit = query.limit.unwrap_or(config.default_limit);
    if limit == 0 || limit > config.max_limit {
        return Err(AppError::Validation(format!(
            "limit must be 1-{}",
            config.max_limit
        )));
    }
    let exclude =
        parse_exclude(query.exclude.as_deref(), config.max_exclude).map_err(AppError::Validation)?;

    let user_id = auth_user.0.map(|u| u.user_id);
    let sampler = FeedSampler::new(&state.db, config, state.db_timeout());
    let memes = state
        .bounded(
            "feed sample",
            sampler.sample(user_id.as_deref(), &exclude, limit),
        )
        .await?;

    if let Some(ref user_id) = user_id {
        sampler.record_exposures(user_id, &memes, Utc::now()).await;
    }

    let exhausted = (memes.len() as u64) < limit;
    Ok(Json(FeedResponse {
        data: render_memes(&state, memes).await?,
        exhausted,
    }))
}
