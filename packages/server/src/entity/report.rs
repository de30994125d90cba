use common::ReportStatus;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// A user's complaint about a meme. At most one per `(reporter, meme)`
/// (unique index created by `seed::ensure_indexes`).
#[sea_orm::model]
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "report")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,

    pub reporter_id: String,
    pub meme_id: Uuid,
    #[sea_orm(belongs_to, from = "meme_id", to = "id")]
    pub meme: HasOne<super::meme::Entity>,

    pub reason: String,
    pub status: ReportStatus,
    /// Moderator who last changed `status`.
    pub reviewed_by: Option<String>,

    pub created_at: DateTimeUtc,
    pub updated_at: DateTimeUtc,
}

impl ActiveModelBehavior for ActiveModel {}
