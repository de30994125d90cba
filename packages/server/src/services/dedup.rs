use common::MemeStatus;
use sea_orm::{ColumnTrait, ConnectionTrait, DbErr, EntityTrait, QueryFilter};

use crate::entity::meme;

/// Fingerprint lookup over active memes.
///
/// Read-only. Uniqueness is enforced by the pipeline's check before commit,
/// with the partial unique index `idx_meme_active_fingerprint` as backstop.
pub struct DedupIndex<'a, C: ConnectionTrait> {
    conn: &'a C,
}

impl<'a, C: ConnectionTrait> DedupIndex<'a, C> {
    pub fn new(conn: &'a C) -> Self {
        Self { conn }
    }

    pub async fn find_by_fingerprint(&self, fingerprint: &str) -> Result<Option<meme::Model>, DbErr> {
        meme::Entity::find()
            .filter(meme::Column::Fingerprint.eq(fingerprint))
            .filter(meme::Column::Status.eq(MemeStatus::Active))
            .one(self.conn)
            .await
    }
}
