use common::ReactionKind;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// One ledger row per `(user, meme, kind)`. The composite key makes
/// re-issuing a reaction a no-op.
#[sea_orm::model]
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "interaction")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub user_id: String,
    #[sea_orm(primary_key, auto_increment = false)]
    pub meme_id: Uuid,
    #[sea_orm(primary_key, auto_increment = false)]
    pub kind: ReactionKind,

    #[sea_orm(belongs_to, from = "meme_id", to = "id")]
    pub meme: HasOne<super::meme::Entity>,

    pub created_at: DateTimeUtc,
}

impl ActiveModelBehavior for ActiveModel {}
