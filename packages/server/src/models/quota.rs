use common::AccountTier;
use serde::Serialize;

use crate::services::quota::QuotaUsage;

/// Upload allowance of the caller.
#[derive(Serialize, utoipa::ToSchema)]
pub struct QuotaResponse {
    pub tier: AccountTier,
    pub daily: QuotaUsage,
    pub monthly: QuotaUsage,
}
