use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use chrono::Utc;
use common::{MemeStatus, ReportStatus};
use sea_orm::sea_query::{Expr, LockType, OnConflict};
use sea_orm::*;
use tracing::{info, instrument};
use uuid::Uuid;

use crate::entity::{meme, report};
use crate::error::{AppError, ErrorBody};
use crate::extractors::auth::AuthUser;
use crate::extractors::rejection::{AppJson, AppQuery};
use crate::handlers::memes::{discard_image, find_active_meme};
use crate::models::report::*;
use crate::models::shared::{Pagination, page_params};
use crate::state::AppState;

fn validate_reason(raw: &str) -> Result<String, AppError> {
    let reason = raw.trim();
    if reason.is_empty() || reason.chars().count() > MAX_REASON_CHARS {
        return Err(AppError::Validation(format!(
            "Reason must be 1-{MAX_REASON_CHARS} characters"
        )));
    }
    Ok(reason.to_string())
}

#[utoipa::path(
    post,
    path = "/{id}/reports",
    tag = "Reports",
    operation_id = "reportMeme",
    summary = "Report a meme",
    description = "Files a pending report. Reporting the same meme again returns the \
        existing report with 200 instead of creating a second one.",
    params(("id" = Uuid, Path, description = "Meme ID")),
    request_body = CreateReportRequest,
    responses(
        (status = 201, description = "Report created", body = ReportResponse),
        (status = 200, description = "Already reported", body = ReportResponse),
        (status = 400, description = "Validation error (VALIDATION_ERROR)", body = ErrorBody),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 404, description = "Meme not found or removed (NOT_FOUND)", body = ErrorBody),
        (status = 504, description = "Timed out (TIMEOUT)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user, payload), fields(user_id = %auth_user.user_id))]
pub async fn create_report(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path(meme_id): Path<Uuid>,
    AppJson(payload): AppJson<CreateReportRequest>,
) -> Result<(StatusCode, Json<ReportResponse>), AppError> {
    let reason = validate_reason(&payload.reason)?;
    state
        .bounded("meme lookup", find_active_meme(&state.db, meme_id))
        .await?;

    let now = Utc::now();
    let insert = report::Entity::insert(report::ActiveModel {
        id: Set(Uuid::now_v7()),
        reporter_id: Set(auth_user.user_id.clone()),
        meme_id: Set(meme_id),
        reason: Set(reason),
        status: Set(ReportStatus::Pending),
        reviewed_by: Set(None),
        created_at: Set(now),
        updated_at: Set(now),
    })
    .on_conflict(
        OnConflict::columns([report::Column::ReporterId, report::Column::MemeId])
            .do_nothing()
            .to_owned(),
    )
    .exec_without_returning(&state.db);
    let created = state
        .bounded("report insert", async {
            match insert.await {
                Ok(rows) => Ok(rows == 1),
                Err(DbErr::RecordNotInserted) => Ok(false),
                Err(e) => Err(e),
            }
        })
        .await?;

    let existing = report::Entity::find()
        .filter(report::Column::ReporterId.eq(auth_user.user_id.as_str()))
        .filter(report::Column::MemeId.eq(meme_id))
        .one(&state.db);
    let model = state
        .bounded("report lookup", existing)
        .await?
        .ok_or_else(|| AppError::Internal("report missing after insert".into()))?;

    let status = if created {
        info!(report_id = %model.id, %meme_id, "Meme reported");
        StatusCode::CREATED
    } else {
        StatusCode::OK
    };
    Ok((status, Json(model.into())))
}

#[utoipa::path(
    get,
    path = "/",
    tag = "Reports",
    operation_id = "listReports",
    summary = "List reports",
    description = "Moderators only. Newest first, optionally filtered by status and meme.",
    params(ReportListQuery),
    responses(
        (status = 200, description = "Report page", body = ReportListResponse),
        (status = 400, description = "Validation error (VALIDATION_ERROR)", body = ErrorBody),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 403, description = "Not a moderator (PERMISSION_DENIED)", body = ErrorBody),
        (status = 504, description = "Timed out (TIMEOUT)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user, query), fields(user_id = %auth_user.user_id))]
pub async fn list_reports(
    auth_user: AuthUser,
    State(state): State<AppState>,
    AppQuery(query): AppQuery<ReportListQuery>,
) -> Result<Json<ReportListResponse>, AppError> {
    auth_user.require_moderator(&state.config.auth)?;
    let (page, per_page) = page_params(query.page, query.per_page)?;

    let mut select = report::Entity::find();
    if let Some(status) = query.status {
        select = select.filter(report::Column::Status.eq(status));
    }
    if let Some(meme_id) = query.meme_id {
        select = select.filter(report::Column::MemeId.eq(meme_id));
    }
    let select = select
        .order_by_desc(report::Column::CreatedAt)
        .order_by_desc(report::Column::Id);

    let paginator = select.paginate(&state.db, per_page);
    let total = state.bounded("report count", paginator.num_items()).await?;
    let reports = state
        .bounded("report page", paginator.fetch_page(page - 1))
        .await?;

    Ok(Json(ReportListResponse {
        data: reports.into_iter().map(ReportResponse::from).collect(),
        pagination: Pagination::new(page, per_page, total),
    }))
}

#[utoipa::path(
    patch,
    path = "/{id}",
    tag = "Reports",
    operation_id = "updateReport",
    summary = "Resolve a report",
    description = "Moderators only. Setting `actioned` removes the meme and marks every other \
        pending report on it `actioned` as well. An actioned report is final.",
    params(("id" = Uuid, Path, description = "Report ID")),
    request_body = UpdateReportRequest,
    responses(
        (status = 200, description = "Report updated", body = ReportResponse),
        (status = 400, description = "Validation error (VALIDATION_ERROR)", body = ErrorBody),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 403, description = "Not a moderator (PERMISSION_DENIED)", body = ErrorBody),
        (status = 404, description = "Report not found (NOT_FOUND)", body = ErrorBody),
        (status = 504, description = "Timed out (TIMEOUT)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user, payload), fields(user_id = %auth_user.user_id))]
pub async fn update_report(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    AppJson(payload): AppJson<UpdateReportRequest>,
) -> Result<Json<ReportResponse>, AppError> {
    auth_user.require_moderator(&state.config.auth)?;
    let moderator = auth_user.user_id;
    let target = payload.status;
    let now = Utc::now();

    // Statements are bounded; the COMMIT is not.
    let (txn, updated, removed_key) = state
        .bounded("report update", async {
            let txn = state.db.begin().await?;
            let existing = report::Entity::find_by_id(id)
                .lock(LockType::Update)
                .one(&txn)
                .await?
                .ok_or_else(|| AppError::NotFound("Report not found".into()))?;

            if existing.status == target {
                return Ok::<_, AppError>((txn, existing, None));
            }
            if existing.status == ReportStatus::Actioned {
                return Err(AppError::Validation("Actioned reports are final".into()));
            }

            let mut removed_key = None;
            if target == ReportStatus::Actioned {
                let reported = meme::Entity::find_by_id(existing.meme_id)
                    .lock(LockType::Update)
                    .one(&txn)
                    .await?;
                if let Some(m) = reported
                    && m.status == MemeStatus::Active
                {
                    removed_key = Some(m.storage_key.clone());
                    let mut active: meme::ActiveModel = m.into();
                    active.status = Set(MemeStatus::Removed);
                    active.update(&txn).await?;
                }

                report::Entity::update_many()
                    .col_expr(report::Column::Status, Expr::value(ReportStatus::Actioned))
                    .col_expr(report::Column::ReviewedBy, Expr::value(moderator.clone()))
                    .col_expr(report::Column::UpdatedAt, Expr::value(now))
                    .filter(report::Column::MemeId.eq(existing.meme_id))
                    .filter(report::Column::Status.eq(ReportStatus::Pending))
                    .filter(report::Column::Id.ne(id))
                    .exec(&txn)
                    .await?;
            }

            let mut active: report::ActiveModel = existing.into();
            active.status = Set(target);
            active.reviewed_by = Set(Some(moderator.clone()));
            active.updated_at = Set(now);
            let updated = active.update(&txn).await?;
            Ok((txn, updated, removed_key))
        })
        .await?;
    txn.commit().await?;

    info!(report_id = %id, status = %updated.status, "Report updated");
    if let Some(key) = removed_key {
        info!(meme_id = %updated.meme_id, "Meme removed by moderation");
        discard_image(&state, updated.meme_id, &key).await;
    }

    Ok(Json(updated.into()))
}
