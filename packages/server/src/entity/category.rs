use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[sea_orm::model]
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "category")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,

    /// Display name as first suggested.
    pub name: String,
    /// Lowercased name; enforces case-insensitive uniqueness.
    #[sea_orm(unique)]
    pub name_normalized: String,
    #[sea_orm(unique)]
    pub slug: String,

    #[sea_orm(has_many, via = "meme_category")]
    pub memes: HasMany<super::meme::Entity>,

    pub created_at: DateTimeUtc,
}

impl ActiveModelBehavior for ActiveModel {}
