use std::collections::HashMap;

use axum::Json;
use axum::extract::multipart::Field;
use axum::extract::{DefaultBodyLimit, Multipart, Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use common::{MemeStatus, ReactionKind};
use sea_orm::sea_query::{Expr, Func, LikeExpr, Query as SeaQuery};
use sea_orm::*;
use tracing::{info, instrument, warn};
use uuid::Uuid;

use crate::config::UploadConfig;
use crate::entity::{category, interaction, meme, meme_category};
use crate::error::{AppError, ErrorBody};
use crate::extractors::auth::AuthUser;
use crate::extractors::rejection::AppQuery;
use crate::models::meme::*;
use crate::models::shared::{Pagination, escape_like, page_params};
use crate::services::ingest::{IngestPipeline, Submission};
use crate::state::AppState;

/// Room for the multipart envelope and text fields on top of the image itself.
const MULTIPART_OVERHEAD: u64 = 64 * 1024;

pub fn upload_body_limit(config: &UploadConfig) -> DefaultBodyLimit {
    DefaultBodyLimit::max(usize::try_from(config.max_size + MULTIPART_OVERHEAD).unwrap_or(usize::MAX))
}

/// Read the `file` field into memory, refusing anything over `max_size`.
async fn read_file_field(mut field: Field<'_>, max_size: u64) -> Result<Vec<u8>, AppError> {
    let mut data = Vec::new();
    while let Some(chunk) = field
        .chunk()
        .await
        .map_err(|e| AppError::Validation(format!("Upload read error: {e}")))?
    {
        if (data.len() + chunk.len()) as u64 > max_size {
            return Err(AppError::Validation(format!(
                "File exceeds the {max_size} byte limit"
            )));
        }
        data.extend_from_slice(&chunk);
    }
    Ok(data)
}

/// The declared part type, or a guess from the filename when the client sent
/// none or a generic one.
fn resolve_content_type(declared: Option<&str>, filename: &str) -> String {
    match declared {
        Some(ct) if !ct.is_empty() && ct != "application/octet-stream" => {
            ct.split(';').next().unwrap_or(ct).trim().to_ascii_lowercase()
        }
        _ => mime_guess::from_path(filename)
            .first()
            .map(|m| m.essence_str().to_string())
            .unwrap_or_else(|| "application/octet-stream".into()),
    }
}

/// Load the categories linked to each of `meme_ids`.
pub(crate) async fn categories_for<C: ConnectionTrait>(
    db: &C,
    meme_ids: &[Uuid],
) -> Result<HashMap<Uuid, Vec<category::Model>>, DbErr> {
    let mut by_meme: HashMap<Uuid, Vec<category::Model>> = HashMap::new();
    if meme_ids.is_empty() {
        return Ok(by_meme);
    }

    let links = meme_category::Entity::find()
        .filter(meme_category::Column::MemeId.is_in(meme_ids.iter().copied()))
        .all(db)
        .await?;
    if links.is_empty() {
        return Ok(by_meme);
    }

    let categories: HashMap<i32, category::Model> = category::Entity::find()
        .filter(category::Column::Id.is_in(links.iter().map(|l| l.category_id)))
        .order_by_asc(category::Column::Name)
        .all(db)
        .await?
        .into_iter()
        .map(|c| (c.id, c))
        .collect();

    for link in links {
        if let Some(c) = categories.get(&link.category_id) {
            by_meme.entry(link.meme_id).or_default().push(c.clone());
        }
    }
    for list in by_meme.values_mut() {
        list.sort_by(|a, b| a.name.cmp(&b.name));
    }
    Ok(by_meme)
}

/// Render memes with their categories, keeping input order.
pub(crate) async fn render_memes(
    state: &AppState,
    memes: Vec<meme::Model>,
) -> Result<Vec<MemeResponse>, AppError> {
    let ids: Vec<Uuid> = memes.iter().map(|m| m.id).collect();
    let mut categories = state
        .bounded("category lookup", categories_for(&state.db, &ids))
        .await?;
    Ok(memes
        .into_iter()
        .map(|m| {
            let cats = categories.remove(&m.id).unwrap_or_default();
            MemeResponse::new(m, cats, &*state.object_store)
        })
        .collect())
}

/// Delete a removed meme's image when retention is off. Failures are logged.
pub(crate) async fn discard_image(state: &AppState, meme_id: Uuid, storage_key: &str) {
    if state.config.storage.delete_on_removal
        && let Err(e) = state.object_store.delete(storage_key).await
    {
        warn!(%meme_id, storage_key, error = %e, "Failed to delete stored object");
    }
}

pub(crate) async fn find_active_meme<C: ConnectionTrait>(db: &C, id: Uuid) -> Result<meme::Model, AppError> {
    meme::Entity::find_by_id(id)
        .filter(meme::Column::Status.eq(MemeStatus::Active))
        .one(db)
        .await?
        .ok_or_else(|| AppError::NotFound("Meme not found".into()))
}

#[utoipa::path(
    post,
    path = "/",
    tag = "Memes",
    operation_id = "submitMeme",
    summary = "Submit a meme",
    description = "Multipart upload with fields `title`, optional `description` and `file`. \
        The image is stored, fingerprinted and classified. A submission whose fingerprint \
        matches an active meme is rejected with `DUPLICATE_CONTENT` and the existing ID.",
    request_body(content_type = "multipart/form-data", description = "title, description?, file"),
    responses(
        (status = 201, description = "Meme created", body = MemeResponse),
        (status = 400, description = "Validation error (VALIDATION_ERROR)", body = ErrorBody),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 403, description = "Account deleted (PERMISSION_DENIED)", body = ErrorBody),
        (status = 409, description = "Duplicate content (DUPLICATE_CONTENT)", body = ErrorBody),
        (status = 429, description = "Upload quota exhausted (QUOTA_EXCEEDED)", body = ErrorBody),
        (status = 502, description = "Object storage failure (STORAGE_ERROR)", body = ErrorBody),
        (status = 503, description = "Datastore failure (PERSISTENCE_ERROR)", body = ErrorBody),
        (status = 504, description = "Timed out (TIMEOUT)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user, multipart), fields(owner_id = %auth_user.user_id))]
pub async fn submit_meme(
    auth_user: AuthUser,
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<impl IntoResponse, AppError> {
    let max_size = state.config.upload.max_size;

    let mut title: Option<String> = None;
    let mut description: Option<String> = None;
    let mut file: Option<(String, String, Vec<u8>)> = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::Validation(format!("Multipart error: {e}")))?
    {
        match field.name() {
            Some("title") => {
                title = Some(field.text().await.map_err(|e| {
                    AppError::Validation(format!("Failed to read title: {e}"))
                })?);
            }
            Some("description") => {
                description = Some(field.text().await.map_err(|e| {
                    AppError::Validation(format!("Failed to read description: {e}"))
                })?);
            }
            Some("file") => {
                let filename = field.file_name().unwrap_or("upload").to_string();
                let content_type = resolve_content_type(field.content_type(), &filename);
                let data = read_file_field(field, max_size).await?;
                file = Some((filename, content_type, data));
            }
            _ => {} // Ignore unknown fields.
        }
    }

    let title = title.ok_or_else(|| AppError::Validation("Missing 'title' field".into()))?;
    let (filename, content_type, data) =
        file.ok_or_else(|| AppError::Validation("Missing 'file' field".into()))?;

    let submission = Submission {
        owner_id: auth_user.user_id,
        title,
        description,
        filename,
        content_type,
        data,
    };

    // Detached from the request future: a client disconnect must not stop the
    // pipeline between upload and commit or compensation.
    let pipeline = IngestPipeline::from_state(&state);
    let ingested = tokio::spawn(async move { pipeline.submit(submission).await })
        .await
        .map_err(|e| AppError::Internal(format!("Ingestion task failed: {e}")))??;

    Ok((
        StatusCode::CREATED,
        Json(MemeResponse::new(
            ingested.meme,
            ingested.categories,
            &*state.object_store,
        )),
    ))
}

#[utoipa::path(
    get,
    path = "/",
    tag = "Memes",
    operation_id = "listMemes",
    summary = "List and search memes",
    description = "Active memes, optionally filtered by a case-insensitive substring of title or \
        description (`q`) and by category slug. Sorted by `newest` (default) or `most_liked`.",
    params(MemeListQuery),
    responses(
        (status = 200, description = "Meme page", body = MemeListResponse),
        (status = 400, description = "Validation error (VALIDATION_ERROR)", body = ErrorBody),
    ),
)]
#[instrument(skip(state, query))]
pub async fn list_memes(
    State(state): State<AppState>,
    AppQuery(query): AppQuery<MemeListQuery>,
) -> Result<Json<MemeListResponse>, AppError> {
    let (page, per_page) = page_params(query.page, query.per_page)?;

    let mut select = meme::Entity::find().filter(meme::Column::Status.eq(MemeStatus::Active));

    if let Some(ref q) = query.q {
        let term = escape_like(q.trim());
        if !term.is_empty() {
            let pattern = format!("%{}%", term.to_lowercase());
            select = select.filter(
                Condition::any()
                    .add(
                        Expr::expr(Func::lower(Expr::col(meme::Column::Title)))
                            .like(LikeExpr::new(pattern.clone()).escape('\\')),
                    )
                    .add(
                        Expr::expr(Func::lower(Expr::col(meme::Column::Description)))
                            .like(LikeExpr::new(pattern).escape('\\')),
                    ),
            );
        }
    }

    if let Some(ref slug) = query.category {
        let slug = slug.trim().to_lowercase();
        select = select.filter(
            meme::Column::Id.in_subquery(
                SeaQuery::select()
                    .column((meme_category::Entity, meme_category::Column::MemeId))
                    .from(meme_category::Entity)
                    .inner_join(
                        category::Entity,
                        Expr::col((category::Entity, category::Column::Id))
                            .equals((meme_category::Entity, meme_category::Column::CategoryId)),
                    )
                    .and_where(Expr::col((category::Entity, category::Column::Slug)).eq(slug))
                    .to_owned(),
            ),
        );
    }

    select = match query.sort.unwrap_or_default() {
        MemeSort::Newest => select
            .order_by_desc(meme::Column::CreatedAt)
            .order_by_desc(meme::Column::Id),
        MemeSort::MostLiked => select
            .order_by_desc(meme::Column::LikeCount)
            .order_by_desc(meme::Column::CreatedAt),
    };

    let paginator = select.paginate(&state.db, per_page);
    let total = state.bounded("meme count", paginator.num_items()).await?;
    let memes = state
        .bounded("meme page", paginator.fetch_page(page - 1))
        .await?;

    Ok(Json(MemeListResponse {
        data: render_memes(&state, memes).await?,
        pagination: Pagination::new(page, per_page, total),
    }))
}

#[utoipa::path(
    get,
    path = "/top",
    tag = "Memes",
    operation_id = "topMemes",
    summary = "Most liked memes",
    params(TopQuery),
    responses(
        (status = 200, description = "Memes ordered by like count", body = Vec<MemeResponse>),
        (status = 400, description = "Validation error (VALIDATION_ERROR)", body = ErrorBody),
    ),
)]
#[instrument(skip(state, query))]
pub async fn top_memes(
    State(state): State<AppState>,
    AppQuery(query): AppQuery<TopQuery>,
) -> Result<Json<Vec<MemeResponse>>, AppError> {
    let limit = query.limit.unwrap_or(10);
    if !(1..=50).contains(&limit) {
        return Err(AppError::Validation("limit must be 1-50".into()));
    }

    let top = meme::Entity::find()
        .filter(meme::Column::Status.eq(MemeStatus::Active))
        .order_by_desc(meme::Column::LikeCount)
        .order_by_desc(meme::Column::CreatedAt)
        .limit(limit)
        .all(&state.db);
    let memes = state.bounded("top memes", top).await?;

    Ok(Json(render_memes(&state, memes).await?))
}

/// Active memes as a subquery, for filtering ledger rows.
fn active_meme_ids() -> sea_orm::sea_query::SelectStatement {
    SeaQuery::select()
        .column(meme::Column::Id)
        .from(meme::Entity)
        .and_where(meme::Column::Status.eq(MemeStatus::Active))
        .to_owned()
}

#[utoipa::path(
    get,
    path = "/trending",
    tag = "Memes",
    operation_id = "trendingMemes",
    summary = "Most reacted-to memes in a time window",
    description = "Ranks active memes by the reactions they currently hold that were made \
        within the last day, week (default) or month. Ties go to the newer meme.",
    params(TrendingQuery),
    responses(
        (status = 200, description = "Memes ordered by interactions in the window", body = TrendingResponse),
        (status = 400, description = "Validation error (VALIDATION_ERROR)", body = ErrorBody),
        (status = 504, description = "Timed out (TIMEOUT)", body = ErrorBody),
    ),
)]
#[instrument(skip(state, query))]
pub async fn trending_memes(
    State(state): State<AppState>,
    AppQuery(query): AppQuery<TrendingQuery>,
) -> Result<Json<TrendingResponse>, AppError> {
    let limit = query.limit.unwrap_or(10);
    if !(1..=50).contains(&limit) {
        return Err(AppError::Validation("limit must be 1-50".into()));
    }
    let timeframe = query.timeframe.unwrap_or_default();
    let since = timeframe.window_start(chrono::Utc::now());

    let ranking = interaction::Entity::find()
        .select_only()
        .column(interaction::Column::MemeId)
        .column_as(
            Expr::expr(Func::count(Expr::col(interaction::Column::MemeId))),
            "interactions",
        )
        .filter(interaction::Column::CreatedAt.gte(since))
        .filter(interaction::Column::MemeId.in_subquery(active_meme_ids()))
        .group_by(interaction::Column::MemeId)
        .order_by(Expr::cust("interactions"), Order::Desc)
        .order_by_desc(interaction::Column::MemeId)
        .limit(limit)
        .into_tuple::<(Uuid, i64)>()
        .all(&state.db);
    let ranked = state.bounded("trending ranking", ranking).await?;

    let ids: Vec<Uuid> = ranked.iter().map(|(id, _)| *id).collect();
    let found = meme::Entity::find()
        .filter(meme::Column::Id.is_in(ids.iter().copied()))
        .all(&state.db);
    let mut by_id: HashMap<Uuid, meme::Model> = state
        .bounded("trending memes", found)
        .await?
        .into_iter()
        .map(|m| (m.id, m))
        .collect();

    // Keep ranking order; drop memes removed between the two reads.
    let mut counts = Vec::with_capacity(ranked.len());
    let mut memes = Vec::with_capacity(ranked.len());
    for (id, interactions) in ranked {
        if let Some(m) = by_id.remove(&id)
            && m.status == MemeStatus::Active
        {
            counts.push(interactions);
            memes.push(m);
        }
    }

    let data = counts
        .into_iter()
        .zip(render_memes(&state, memes).await?)
        .map(|(interactions, meme)| TrendingMeme { interactions, meme })
        .collect();
    Ok(Json(TrendingResponse { timeframe, data }))
}

#[utoipa::path(
    get,
    path = "/saved",
    tag = "Memes",
    operation_id = "savedMemes",
    summary = "Memes the caller saved",
    description = "Active memes carrying the caller's `save` reaction, most recently saved first.",
    params(SavedQuery),
    responses(
        (status = 200, description = "Saved memes", body = SavedMemeListResponse),
        (status = 400, description = "Validation error (VALIDATION_ERROR)", body = ErrorBody),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 504, description = "Timed out (TIMEOUT)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user, query), fields(user_id = %auth_user.user_id))]
pub async fn saved_memes(
    auth_user: AuthUser,
    State(state): State<AppState>,
    AppQuery(query): AppQuery<SavedQuery>,
) -> Result<Json<SavedMemeListResponse>, AppError> {
    let (page, per_page) = page_params(query.page, query.per_page)?;

    let saves = interaction::Entity::find()
        .filter(interaction::Column::UserId.eq(auth_user.user_id.as_str()))
        .filter(interaction::Column::Kind.eq(ReactionKind::Save))
        .filter(interaction::Column::MemeId.in_subquery(active_meme_ids()))
        .order_by_desc(interaction::Column::CreatedAt)
        .order_by_desc(interaction::Column::MemeId);

    let paginator = saves.paginate(&state.db, per_page);
    let total = state.bounded("saved count", paginator.num_items()).await?;
    let rows = state
        .bounded("saved page", paginator.fetch_page(page - 1))
        .await?;

    let ids: Vec<Uuid> = rows.iter().map(|r| r.meme_id).collect();
    let found = meme::Entity::find()
        .filter(meme::Column::Id.is_in(ids.iter().copied()))
        .all(&state.db);
    let mut by_id: HashMap<Uuid, meme::Model> = state
        .bounded("saved memes", found)
        .await?
        .into_iter()
        .map(|m| (m.id, m))
        .collect();

    let mut saved_at = Vec::with_capacity(rows.len());
    let mut memes = Vec::with_capacity(rows.len());
    for row in rows {
        if let Some(m) = by_id.remove(&row.meme_id) {
            saved_at.push(row.created_at);
            memes.push(m);
        }
    }

    let data = saved_at
        .into_iter()
        .zip(render_memes(&state, memes).await?)
        .map(|(saved_at, meme)| SavedMeme { saved_at, meme })
        .collect();
    Ok(Json(SavedMemeListResponse {
        data,
        pagination: Pagination::new(page, per_page, total),
    }))
}

#[utoipa::path(
    get,
    path = "/{id}",
    tag = "Memes",
    operation_id = "getMeme",
    summary = "Get a meme",
    params(("id" = Uuid, Path, description = "Meme ID")),
    responses(
        (status = 200, description = "Meme", body = MemeResponse),
        (status = 404, description = "Not found or removed (NOT_FOUND)", body = ErrorBody),
    ),
)]
#[instrument(skip(state))]
pub async fn get_meme(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<MemeResponse>, AppError> {
    let meme = state
        .bounded("meme lookup", find_active_meme(&state.db, id))
        .await?;
    let mut rendered = render_memes(&state, vec![meme]).await?;
    rendered
        .pop()
        .map(Json)
        .ok_or_else(|| AppError::Internal("rendered meme missing".into()))
}

#[utoipa::path(
    delete,
    path = "/{id}",
    tag = "Memes",
    operation_id = "deleteMeme",
    summary = "Remove a meme",
    description = "Owner only. The meme is marked `removed`; the stored image is deleted only \
        when `storage.delete_on_removal` is enabled.",
    params(("id" = Uuid, Path, description = "Meme ID")),
    responses(
        (status = 204, description = "Removed"),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 403, description = "Not the owner (PERMISSION_DENIED)", body = ErrorBody),
        (status = 404, description = "Not found (NOT_FOUND)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user), fields(user_id = %auth_user.user_id))]
pub async fn delete_meme(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    let meme = state
        .bounded("meme lookup", find_active_meme(&state.db, id))
        .await?;
    if meme.owner_id != auth_user.user_id {
        return Err(AppError::PermissionDenied);
    }

    let storage_key = meme.storage_key.clone();
    let mut active: meme::ActiveModel = meme.into();
    active.status = Set(MemeStatus::Removed);
    state
        .bounded("meme removal", active.update(&state.db))
        .await?;
    info!(meme_id = %id, "Meme removed");

    discard_image(&state, id, &storage_key).await;

    Ok(StatusCode::NO_CONTENT)
}
