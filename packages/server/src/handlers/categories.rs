use axum::Json;
use axum::extract::State;
use sea_orm::{EntityTrait, QueryOrder};
use tracing::instrument;

use crate::entity::category;
use crate::error::AppError;
use crate::models::category::{CategoryListResponse, CategoryResponse};
use crate::state::AppState;

#[utoipa::path(
    get,
    path = "/",
    tag = "Categories",
    operation_id = "listCategories",
    summary = "List categories",
    responses((status = 200, description = "All categories by name", body = CategoryListResponse)),
)]
#[instrument(skip(state))]
pub async fn list_categories(
    State(state): State<AppState>,
) -> Result<Json<CategoryListResponse>, AppError> {
    let all = category::Entity::find()
        .order_by_asc(category::Column::Name)
        .all(&state.db);
    let data = state
        .bounded("category list", all)
        .await?
        .into_iter()
        .map(CategoryResponse::from)
        .collect();
    Ok(Json(CategoryListResponse { data }))
}
