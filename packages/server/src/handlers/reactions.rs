use std::str::FromStr;

use axum::Json;
use axum::extract::{Path, State};
use common::ReactionKind;
use tracing::instrument;
use uuid::Uuid;

use crate::error::{AppError, ErrorBody};
use crate::extractors::auth::AuthUser;
use crate::models::reaction::ReactionStateResponse;
use crate::services::ledger::ReactionLedger;
use crate::state::AppState;

fn parse_kind(raw: &str) -> Result<ReactionKind, AppError> {
    ReactionKind::from_str(raw).map_err(|e| AppError::Validation(e.to_string()))
}

async fn set_reaction(
    state: &AppState,
    user_id: &str,
    meme_id: Uuid,
    kind: &str,
    present: bool,
) -> Result<Json<ReactionStateResponse>, AppError> {
    let kind = parse_kind(kind)?;
    let ledger = ReactionLedger::new(
        &state.db,
        state.config.reactions.exclusive_votes,
        state.db_timeout(),
    );
    let reaction_state = ledger.set_reaction(user_id, meme_id, kind, present).await?;
    Ok(Json(ReactionStateResponse::new(meme_id, reaction_state)))
}

#[utoipa::path(
    post,
    path = "/{id}/reactions/{kind}",
    tag = "Reactions",
    operation_id = "addReaction",
    summary = "React to a meme",
    description = "Idempotent: reacting twice counts once. With exclusive votes enabled, \
        `like` retracts an existing `dislike` and vice versa.",
    params(
        ("id" = Uuid, Path, description = "Meme ID"),
        ("kind" = ReactionKind, Path, description = "like, dislike, share or save"),
    ),
    responses(
        (status = 200, description = "Updated counters", body = ReactionStateResponse),
        (status = 400, description = "Unknown kind (VALIDATION_ERROR)", body = ErrorBody),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 404, description = "Meme not found or removed (NOT_FOUND)", body = ErrorBody),
        (status = 504, description = "Timed out (TIMEOUT)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user), fields(user_id = %auth_user.user_id))]
pub async fn add_reaction(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path((meme_id, kind)): Path<(Uuid, String)>,
) -> Result<Json<ReactionStateResponse>, AppError> {
    set_reaction(&state, &auth_user.user_id, meme_id, &kind, true).await
}

#[utoipa::path(
    delete,
    path = "/{id}/reactions/{kind}",
    tag = "Reactions",
    operation_id = "removeReaction",
    summary = "Retract a reaction",
    description = "Retracting a reaction that does not exist is a no-op.",
    params(
        ("id" = Uuid, Path, description = "Meme ID"),
        ("kind" = ReactionKind, Path, description = "like, dislike, share or save"),
    ),
    responses(
        (status = 200, description = "Updated counters", body = ReactionStateResponse),
        (status = 400, description = "Unknown kind (VALIDATION_ERROR)", body = ErrorBody),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 404, description = "Meme not found or removed (NOT_FOUND)", body = ErrorBody),
        (status = 504, description = "Timed out (TIMEOUT)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user), fields(user_id = %auth_user.user_id))]
pub async fn remove_reaction(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path((meme_id, kind)): Path<(Uuid, String)>,
) -> Result<Json<ReactionStateResponse>, AppError> {
    set_reaction(&state, &auth_user.user_id, meme_id, &kind, false).await
}

#[utoipa::path(
    get,
    path = "/{id}/reactions",
    tag = "Reactions",
    operation_id = "getReactions",
    summary = "Counters and the caller's reactions",
    params(("id" = Uuid, Path, description = "Meme ID")),
    responses(
        (status = 200, description = "Current counters", body = ReactionStateResponse),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 404, description = "Meme not found or removed (NOT_FOUND)", body = ErrorBody),
        (status = 504, description = "Timed out (TIMEOUT)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user), fields(user_id = %auth_user.user_id))]
pub async fn get_reactions(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path(meme_id): Path<Uuid>,
) -> Result<Json<ReactionStateResponse>, AppError> {
    let ledger = ReactionLedger::new(
        &state.db,
        state.config.reactions.exclusive_votes,
        state.db_timeout(),
    );
    let reaction_state = ledger.state(&auth_user.user_id, meme_id).await?;
    Ok(Json(ReactionStateResponse::new(meme_id, reaction_state)))
}
