use axum::Json;
use axum::extract::State;
use chrono::Utc;
use tracing::instrument;

use crate::error::{AppError, ErrorBody};
use crate::extractors::auth::AuthUser;
use crate::models::quota::QuotaResponse;
use crate::services::quota::QuotaTracker;
use crate::state::AppState;

#[utoipa::path(
    get,
    path = "/quota",
    tag = "Accounts",
    operation_id = "getMyQuota",
    summary = "Upload allowance of the caller",
    description = "Both windows: rolling 24 hours and the current calendar month (UTC).",
    responses(
        (status = 200, description = "Quota usage", body = QuotaResponse),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 504, description = "Timed out (TIMEOUT)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user), fields(user_id = %auth_user.user_id))]
pub async fn my_quota(
    auth_user: AuthUser,
    State(state): State<AppState>,
) -> Result<Json<QuotaResponse>, AppError> {
    let tracker = QuotaTracker::new(&state.db, &state.config.upload);
    let tier = state
        .bounded("quota lookup", tracker.tier_of(&auth_user.user_id))
        .await?;
    let decision = state
        .bounded(
            "quota lookup",
            tracker.check(&auth_user.user_id, tier, Utc::now()),
        )
        .await?;
    Ok(Json(QuotaResponse {
        tier: decision.tier,
        daily: decision.daily,
        monthly: decision.monthly,
    }))
}
