use chrono::{DateTime, Months, TimeDelta, Utc};
use common::MemeStatus;
use common::storage::ObjectStore;
use serde::{Deserialize, Serialize};

use crate::entity::{category, meme};

use super::category::CategoryResponse;
use super::shared::Pagination;

/// A submitted meme.
#[derive(Serialize, utoipa::ToSchema)]
pub struct MemeResponse {
    /// Meme ID (UUIDv7).
    #[schema(example = "01936f0e-1234-7abc-8000-000000000001")]
    pub id: String,
    #[schema(example = "2abc")]
    pub owner_id: String,
    #[schema(example = "Monday mood")]
    pub title: String,
    pub description: Option<String>,
    /// Public URL of the image.
    #[schema(example = "http://127.0.0.1:3000/api/v1/media/2abc/1714564800000-k3j9x2ab-cat.png")]
    pub image_url: String,
    #[schema(example = "image/png")]
    pub content_type: String,
    #[schema(example = 12)]
    pub like_count: i32,
    #[schema(example = 1)]
    pub dislike_count: i32,
    #[schema(example = 0)]
    pub share_count: i32,
    pub status: MemeStatus,
    pub categories: Vec<CategoryResponse>,
    pub created_at: DateTime<Utc>,
}

impl MemeResponse {
    pub fn new(
        model: meme::Model,
        categories: Vec<category::Model>,
        object_store: &dyn ObjectStore,
    ) -> Self {
        Self {
            id: model.id.to_string(),
            image_url: object_store.public_url(&model.storage_key),
            owner_id: model.owner_id,
            title: model.title,
            description: model.description,
            content_type: model.content_type,
            like_count: model.like_count,
            dislike_count: model.dislike_count,
            share_count: model.share_count,
            status: model.status,
            categories: categories.into_iter().map(CategoryResponse::from).collect(),
            created_at: model.created_at,
        }
    }
}

/// Sort order for meme listings.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum MemeSort {
    #[default]
    Newest,
    MostLiked,
}

/// Query parameters for meme listing and search.
#[derive(Deserialize, utoipa::IntoParams)]
pub struct MemeListQuery {
    /// Case-insensitive substring of title or description.
    #[param(example = "cat")]
    pub q: Option<String>,
    /// Category slug.
    #[param(example = "funny-cats")]
    pub category: Option<String>,
    /// `newest` (default) or `most_liked`.
    pub sort: Option<MemeSort>,
    #[param(example = 1)]
    pub page: Option<u64>,
    #[param(example = 20)]
    pub per_page: Option<u64>,
}

#[derive(Serialize, utoipa::ToSchema)]
pub struct MemeListResponse {
    pub data: Vec<MemeResponse>,
    pub pagination: Pagination,
}

#[derive(Deserialize, utoipa::IntoParams)]
pub struct TopQuery {
    /// Number of memes, 1-50. Default: 10.
    #[param(example = 10)]
    pub limit: Option<u64>,
}

/// Window over which trending interactions are counted.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum Timeframe {
    Day,
    #[default]
    Week,
    Month,
}

impl Timeframe {
    /// Earliest interaction time that still counts at `now`.
    pub fn window_start(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        match self {
            Timeframe::Day => now - TimeDelta::days(1),
            Timeframe::Week => now - TimeDelta::weeks(1),
            Timeframe::Month => now
                .checked_sub_months(Months::new(1))
                .unwrap_or(now - TimeDelta::days(30)),
        }
    }
}

#[derive(Deserialize, utoipa::IntoParams)]
pub struct TrendingQuery {
    /// `day`, `week` (default) or `month`.
    pub timeframe: Option<Timeframe>,
    /// Number of memes, 1-50. Default: 10.
    #[param(example = 10)]
    pub limit: Option<u64>,
}

/// A meme with the number of reactions it received inside the window.
#[derive(Serialize, utoipa::ToSchema)]
pub struct TrendingMeme {
    #[schema(example = 42)]
    pub interactions: i64,
    pub meme: MemeResponse,
}

#[derive(Serialize, utoipa::ToSchema)]
pub struct TrendingResponse {
    pub timeframe: Timeframe,
    pub data: Vec<TrendingMeme>,
}

/// A meme the caller saved.
#[derive(Serialize, utoipa::ToSchema)]
pub struct SavedMeme {
    pub saved_at: DateTime<Utc>,
    pub meme: MemeResponse,
}

#[derive(Deserialize, utoipa::IntoParams)]
pub struct SavedQuery {
    #[param(example = 1)]
    pub page: Option<u64>,
    #[param(example = 20)]
    pub per_page: Option<u64>,
}

#[derive(Serialize, utoipa::ToSchema)]
pub struct SavedMemeListResponse {
    pub data: Vec<SavedMeme>,
    pub pagination: Pagination,
}
