use common::AccountTier;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// A user known to the identity provider.
///
/// Rows are created either by an account event or lazily on first upload.
#[sea_orm::model]
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "account")]
pub struct Model {
    /// Normalized identity-provider subject.
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,

    pub username: Option<String>,
    pub email: Option<String>,
    pub tier: AccountTier,

    /// Uploads in `quota_month`. Informational; quota enforcement counts meme rows.
    pub monthly_upload_count: i32,
    pub total_uploads: i32,
    /// Calendar month ("YYYY-MM", UTC) that `monthly_upload_count` refers to.
    pub quota_month: String,

    #[sea_orm(has_many)]
    pub memes: HasMany<super::meme::Entity>,

    pub created_at: DateTimeUtc,
    pub updated_at: DateTimeUtc,
    pub deleted_at: Option<DateTimeUtc>,
}

impl ActiveModelBehavior for ActiveModel {}
