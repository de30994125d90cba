use common::MemeStatus;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[sea_orm::model]
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "meme")]
pub struct Model {
    /// UUIDv7 primary key.
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,

    pub owner_id: String,
    #[sea_orm(belongs_to, from = "owner_id", to = "id")]
    pub owner: HasOne<super::account::Entity>,

    pub title: String,
    pub description: Option<String>,

    /// Object store key of the image.
    pub storage_key: String,
    pub content_type: String,

    /// Opaque near-duplicate fingerprint. Unique among active memes
    /// (partial index created by `seed::ensure_indexes`).
    pub fingerprint: Option<String>,

    pub like_count: i32,
    pub dislike_count: i32,
    pub share_count: i32,

    pub status: MemeStatus,

    #[sea_orm(has_many, via = "meme_category")]
    pub categories: HasMany<super::category::Entity>,

    pub created_at: DateTimeUtc,
}

impl ActiveModelBehavior for ActiveModel {}
