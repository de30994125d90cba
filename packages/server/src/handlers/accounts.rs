use axum::Json;
use axum::extract::State;
use chrono::Utc;
use common::AccountTier;
use common::identity::normalize_subject;
use sea_orm::sea_query::OnConflict;
use sea_orm::{EntityTrait, Set};
use tracing::{info, instrument};

use crate::entity::account;
use crate::error::{AppError, ErrorBody};
use crate::extractors::auth::WebhookAuth;
use crate::extractors::rejection::AppJson;
use crate::models::account::{AccountEvent, AccountEventData, AccountEventResponse};
use crate::services::quota::month_label;
use crate::state::AppState;

/// Display name for an account: explicit username, else first and last name
/// run together in lowercase, else the local part of the first email.
pub fn derive_username(data: &AccountEventData) -> Option<String> {
    if let Some(username) = data.username.as_deref().map(str::trim)
        && !username.is_empty()
    {
        return Some(username.to_string());
    }

    let full: String = [data.first_name.as_deref(), data.last_name.as_deref()]
        .into_iter()
        .flatten()
        .map(str::trim)
        .collect::<String>()
        .to_lowercase();
    if !full.is_empty() {
        return Some(full);
    }

    data.email_addresses
        .first()
        .and_then(|e| e.email_address.split('@').next())
        .map(str::trim)
        .filter(|local| !local.is_empty())
        .map(str::to_string)
}

#[utoipa::path(
    post,
    path = "/events",
    tag = "Accounts",
    operation_id = "accountEvent",
    summary = "Receive an identity-provider user event",
    description = "`user.created` and `user.updated` upsert the account; `user.deleted` marks it \
        deleted. Other event types are acknowledged and ignored. Authorized with the \
        configured webhook secret as bearer token.",
    request_body = AccountEvent,
    responses(
        (status = 200, description = "Event applied", body = AccountEventResponse),
        (status = 400, description = "Validation error (VALIDATION_ERROR)", body = ErrorBody),
        (status = 401, description = "Bad webhook secret (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, _auth, event), fields(event_type = %event.event_type))]
pub async fn account_event(
    _auth: WebhookAuth,
    State(state): State<AppState>,
    AppJson(event): AppJson<AccountEvent>,
) -> Result<Json<AccountEventResponse>, AppError> {
    let account_id = normalize_subject(&event.data.id)
        .ok_or_else(|| AppError::Validation("data.id must not be empty".into()))?;
    let now = Utc::now();

    let status = match event.event_type.as_str() {
        "user.created" | "user.updated" => {
            let email = event
                .data
                .email_addresses
                .first()
                .map(|e| e.email_address.trim().to_string());
            let model = account::ActiveModel {
                id: Set(account_id.clone()),
                username: Set(derive_username(&event.data)),
                email: Set(email),
                tier: Set(AccountTier::Free),
                monthly_upload_count: Set(0),
                total_uploads: Set(0),
                quota_month: Set(month_label(now)),
                created_at: Set(now),
                updated_at: Set(now),
                deleted_at: Set(None),
            };
            upsert(
                &state,
                model,
                &[
                    account::Column::Username,
                    account::Column::Email,
                    account::Column::UpdatedAt,
                ],
            )
            .await?;
            "upserted"
        }
        "user.deleted" => {
            let model = account::ActiveModel {
                id: Set(account_id.clone()),
                username: Set(None),
                email: Set(None),
                tier: Set(AccountTier::Free),
                monthly_upload_count: Set(0),
                total_uploads: Set(0),
                quota_month: Set(month_label(now)),
                created_at: Set(now),
                updated_at: Set(now),
                deleted_at: Set(Some(now)),
            };
            upsert(
                &state,
                model,
                &[account::Column::DeletedAt, account::Column::UpdatedAt],
            )
            .await?;
            "deleted"
        }
        _ => "ignored",
    };

    info!(account_id = %account_id, status, "Processed account event");
    Ok(Json(AccountEventResponse {
        status,
        account_id,
    }))
}

async fn upsert(
    state: &AppState,
    model: account::ActiveModel,
    update: &[account::Column],
) -> Result<(), AppError> {
    let insert = account::Entity::insert(model)
        .on_conflict(
            OnConflict::column(account::Column::Id)
                .update_columns(update.iter().copied())
                .to_owned(),
        )
        .exec_without_returning(&state.db);
    state.bounded("account upsert", insert).await?;
    Ok(())
}
