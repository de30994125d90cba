use sea_orm::*;
use sea_orm::sea_query::{Index, PostgresQueryBuilder};
use tracing::{info, warn};

use crate::entity::{feed_exposure, interaction, meme, report};

/// Ensure required database indexes exist.
///
/// SeaORM's schema-sync doesn't support composite non-unique or partial
/// indexes, so we create them manually on startup.
pub async fn ensure_indexes(db: &DatabaseConnection) -> Result<(), DbErr> {
    // Quota counts:
    // SELECT COUNT(*) FROM meme WHERE owner_id = ? AND created_at >= ?
    let stmt = Index::create()
        .if_not_exists()
        .name("idx_meme_owner_created")
        .table(meme::Entity)
        .col(meme::Column::OwnerId)
        .col(meme::Column::CreatedAt)
        .to_string(PostgresQueryBuilder);
    run_index(db, "idx_meme_owner_created", &stmt).await;

    // Exposure lookups for the feed:
    // SELECT meme_id FROM feed_exposure WHERE user_id = ? AND shown_at >= ?
    let stmt = Index::create()
        .if_not_exists()
        .name("idx_feed_exposure_user_shown")
        .table(feed_exposure::Entity)
        .col(feed_exposure::Column::UserId)
        .col(feed_exposure::Column::ShownAt)
        .to_string(PostgresQueryBuilder);
    run_index(db, "idx_feed_exposure_user_shown", &stmt).await;

    let stmt = Index::create()
        .if_not_exists()
        .name("idx_interaction_meme")
        .table(interaction::Entity)
        .col(interaction::Column::MemeId)
        .to_string(PostgresQueryBuilder);
    run_index(db, "idx_interaction_meme", &stmt).await;

    // Trending window scans:
    // SELECT meme_id, COUNT(*) FROM interaction WHERE created_at >= ? GROUP BY meme_id
    let stmt = Index::create()
        .if_not_exists()
        .name("idx_interaction_created")
        .table(interaction::Entity)
        .col(interaction::Column::CreatedAt)
        .to_string(PostgresQueryBuilder);
    run_index(db, "idx_interaction_created", &stmt).await;

    // One report per reporter and meme; re-reporting relies on the conflict.
    let stmt = Index::create()
        .if_not_exists()
        .unique()
        .name("idx_report_reporter_meme")
        .table(report::Entity)
        .col(report::Column::ReporterId)
        .col(report::Column::MemeId)
        .to_string(PostgresQueryBuilder);
    db.execute_unprepared(&stmt).await?;
    info!("Ensured index idx_report_reporter_meme exists");

    // Backstop for the dedup check-then-commit race. This one must exist,
    // so a failure is returned rather than logged.
    db.execute_unprepared(
        r#"CREATE UNIQUE INDEX IF NOT EXISTS idx_meme_active_fingerprint
           ON meme (fingerprint)
           WHERE status = 'active' AND fingerprint IS NOT NULL"#,
    )
    .await?;
    info!("Ensured index idx_meme_active_fingerprint exists");

    Ok(())
}

async fn run_index(db: &DatabaseConnection, name: &str, stmt: &str) {
    match db.execute_unprepared(stmt).await {
        Ok(_) => info!("Ensured index {} exists", name),
        Err(e) => warn!("Failed to create index {}: {}", name, e),
    }
}
