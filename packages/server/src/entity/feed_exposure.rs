use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// A meme shown to a user by the feed. Only used to steer sampling away
/// from repeats.
#[sea_orm::model]
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "feed_exposure")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,

    pub user_id: String,
    pub meme_id: Uuid,
    #[sea_orm(belongs_to, from = "meme_id", to = "id")]
    pub meme: HasOne<super::meme::Entity>,

    pub shown_at: DateTimeUtc,
}

impl ActiveModelBehavior for ActiveModel {}
