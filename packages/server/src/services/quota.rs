use chrono::{DateTime, Datelike, Duration, TimeZone, Utc};
use common::AccountTier;
use sea_orm::{ColumnTrait, ConnectionTrait, DbErr, EntityTrait, PaginatorTrait, QueryFilter};
use serde::Serialize;

use crate::config::UploadConfig;
use crate::entity::{account, meme};

/// Which allowance a usage figure refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, utoipa::ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum QuotaWindow {
    /// Rolling 24 hours, same cap for every tier.
    Daily,
    /// Current UTC calendar month, cap depends on tier.
    Monthly,
}

impl QuotaWindow {
    pub fn label(&self) -> &'static str {
        match self {
            Self::Daily => "Daily",
            Self::Monthly => "Monthly",
        }
    }
}

/// Usage of one allowance window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, utoipa::ToSchema)]
pub struct QuotaUsage {
    pub window: QuotaWindow,
    #[schema(example = 10)]
    pub limit: u64,
    #[schema(example = 3)]
    pub count: u64,
    #[schema(example = 7)]
    pub remaining: u64,
}

impl QuotaUsage {
    fn new(window: QuotaWindow, limit: u64, count: u64) -> Self {
        Self {
            window,
            limit,
            count,
            remaining: limit.saturating_sub(count),
        }
    }

    pub fn allowed(&self) -> bool {
        self.count < self.limit
    }
}

/// Outcome of a quota check. Both windows must allow the upload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QuotaDecision {
    pub tier: AccountTier,
    pub daily: QuotaUsage,
    pub monthly: QuotaUsage,
}

impl QuotaDecision {
    pub fn allowed(&self) -> bool {
        self.daily.allowed() && self.monthly.allowed()
    }

    /// The first exhausted window, daily before monthly.
    pub fn exceeded(&self) -> Option<QuotaUsage> {
        if !self.daily.allowed() {
            Some(self.daily)
        } else if !self.monthly.allowed() {
            Some(self.monthly)
        } else {
            None
        }
    }
}

/// Start of the UTC calendar month containing `now`.
pub fn month_start(now: DateTime<Utc>) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(now.year(), now.month(), 1, 0, 0, 0)
        .single()
        .unwrap_or(now)
}

/// `"YYYY-MM"` label for the calendar month containing `now`.
pub fn month_label(now: DateTime<Utc>) -> String {
    now.format("%Y-%m").to_string()
}

/// Per-owner upload allowance, counted from existing meme rows.
///
/// Uses an optimistic (non-locking) approach: two concurrent submissions from
/// the same owner can both pass the check before either commits, overshooting
/// the limit by at most the number of in-flight requests. This is accepted in
/// exchange for not serializing every upload of an owner; the next window
/// starts clean.
pub struct QuotaTracker<'a, C: ConnectionTrait> {
    conn: &'a C,
    config: &'a UploadConfig,
}

impl<'a, C: ConnectionTrait> QuotaTracker<'a, C> {
    pub fn new(conn: &'a C, config: &'a UploadConfig) -> Self {
        Self { conn, config }
    }

    /// Tier recorded on the account row. Unknown owners are on the free tier.
    pub async fn tier_of(&self, owner_id: &str) -> Result<AccountTier, DbErr> {
        Ok(account::Entity::find_by_id(owner_id.to_string())
            .one(self.conn)
            .await?
            .map(|a| a.tier)
            .unwrap_or_default())
    }

    pub fn monthly_limit(&self, tier: AccountTier) -> u64 {
        match tier {
            AccountTier::Free => self.config.free_monthly_limit,
            AccountTier::Premium => self.config.premium_monthly_limit,
        }
    }

    /// Count this owner's memes, of any status, created at or after `since`.
    async fn count_since(&self, owner_id: &str, since: DateTime<Utc>) -> Result<u64, DbErr> {
        meme::Entity::find()
            .filter(meme::Column::OwnerId.eq(owner_id))
            .filter(meme::Column::CreatedAt.gte(since))
            .count(self.conn)
            .await
    }

    /// Evaluate both windows for `owner_id` at `now`.
    ///
    /// Removed memes still count: deleting an upload does not refund it.
    pub async fn check(
        &self,
        owner_id: &str,
        tier: AccountTier,
        now: DateTime<Utc>,
    ) -> Result<QuotaDecision, DbErr> {
        let daily_count = self.count_since(owner_id, now - Duration::hours(24)).await?;
        let monthly_count = self.count_since(owner_id, month_start(now)).await?;

        Ok(QuotaDecision {
            tier,
            daily: QuotaUsage::new(QuotaWindow::Daily, self.config.daily_limit, daily_count),
            monthly: QuotaUsage::new(
                QuotaWindow::Monthly,
                self.monthly_limit(tier),
                monthly_count,
            ),
        })
    }
}
