use chrono::Utc;
use sea_orm::sea_query::OnConflict;
use sea_orm::{
    ColumnTrait, Condition, ConnectionTrait, DbErr, EntityTrait, QueryFilter, QueryOrder, Set,
};
use tracing::debug;
use uuid::Uuid;

use crate::entity::{category, meme_category};
use crate::utils::slug::{normalize_name, slugify};

/// Maps free-text labels onto categories, creating them on first use.
pub struct CategoryResolver<'a, C: ConnectionTrait> {
    conn: &'a C,
}

impl<'a, C: ConnectionTrait> CategoryResolver<'a, C> {
    pub fn new(conn: &'a C) -> Self {
        Self { conn }
    }

    /// Find or create the category for `label`.
    ///
    /// Returns `None` when the label has no usable slug. Concurrent callers
    /// with the same label converge on one row: the insert ignores conflicts
    /// on either unique column and the row is re-read afterwards.
    pub async fn resolve(&self, label: &str) -> Result<Option<category::Model>, DbErr> {
        let name = label.trim();
        let slug = slugify(name);
        if slug.is_empty() {
            return Ok(None);
        }
        let normalized = normalize_name(name);

        if let Some(existing) = self.find(&normalized, &slug).await? {
            return Ok(Some(existing));
        }

        category::Entity::insert(category::ActiveModel {
            name: Set(name.to_string()),
            name_normalized: Set(normalized.clone()),
            slug: Set(slug.clone()),
            created_at: Set(Utc::now()),
            ..Default::default()
        })
        .on_conflict(OnConflict::new().do_nothing().to_owned())
        .exec_without_returning(self.conn)
        .await
        .or_else(|e| match e {
            DbErr::RecordNotInserted => Ok(0),
            e => Err(e),
        })?;

        let created = self.find(&normalized, &slug).await?.ok_or_else(|| {
            DbErr::Custom(format!("category '{slug}' missing after insert"))
        })?;
        debug!(category_id = created.id, slug = %created.slug, "Resolved category");
        Ok(Some(created))
    }

    /// Match by case-insensitive name first, then by slug.
    async fn find(&self, normalized: &str, slug: &str) -> Result<Option<category::Model>, DbErr> {
        let mut matches = category::Entity::find()
            .filter(
                Condition::any()
                    .add(category::Column::NameNormalized.eq(normalized))
                    .add(category::Column::Slug.eq(slug)),
            )
            .order_by_asc(category::Column::Id)
            .all(self.conn)
            .await?;

        let by_name = matches
            .iter()
            .position(|c| c.name_normalized == normalized);
        Ok(match by_name {
            Some(idx) => Some(matches.swap_remove(idx)),
            None => matches.into_iter().next(),
        })
    }

    /// Resolve `label` and link it to `meme_id`. Re-attaching is a no-op.
    pub async fn attach(
        &self,
        meme_id: Uuid,
        label: &str,
    ) -> Result<Option<category::Model>, DbErr> {
        let Some(category) = self.resolve(label).await? else {
            return Ok(None);
        };

        meme_category::Entity::insert(meme_category::ActiveModel {
            meme_id: Set(meme_id),
            category_id: Set(category.id),
        })
        .on_conflict(
            OnConflict::columns([
                meme_category::Column::MemeId,
                meme_category::Column::CategoryId,
            ])
            .do_nothing()
            .to_owned(),
        )
        .exec_without_returning(self.conn)
        .await
        .or_else(|e| match e {
            DbErr::RecordNotInserted => Ok(0),
            e => Err(e),
        })?;

        Ok(Some(category))
    }
}
