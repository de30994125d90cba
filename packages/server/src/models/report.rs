use chrono::{DateTime, Utc};
use common::ReportStatus;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::entity::report;

use super::shared::Pagination;

/// Longest accepted report reason, in characters.
pub const MAX_REASON_CHARS: usize = 500;

#[derive(Deserialize, utoipa::ToSchema)]
pub struct CreateReportRequest {
    /// Why the meme should be looked at. 1-500 characters.
    #[schema(example = "Contains personal information")]
    pub reason: String,
}

#[derive(Deserialize, utoipa::ToSchema)]
pub struct UpdateReportRequest {
    /// `actioned` removes the reported meme and closes every pending report on it.
    pub status: ReportStatus,
}

#[derive(Serialize, utoipa::ToSchema)]
pub struct ReportResponse {
    #[schema(example = "01936f0e-5678-7abc-8000-000000000002")]
    pub id: String,
    #[schema(example = "2abc")]
    pub reporter_id: String,
    #[schema(example = "01936f0e-1234-7abc-8000-000000000001")]
    pub meme_id: String,
    #[schema(example = "Contains personal information")]
    pub reason: String,
    pub status: ReportStatus,
    pub reviewed_by: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<report::Model> for ReportResponse {
    fn from(model: report::Model) -> Self {
        Self {
            id: model.id.to_string(),
            reporter_id: model.reporter_id,
            meme_id: model.meme_id.to_string(),
            reason: model.reason,
            status: model.status,
            reviewed_by: model.reviewed_by,
            created_at: model.created_at,
            updated_at: model.updated_at,
        }
    }
}

#[derive(Deserialize, utoipa::IntoParams)]
pub struct ReportListQuery {
    /// Only reports in this state.
    pub status: Option<ReportStatus>,
    /// Only reports about this meme.
    pub meme_id: Option<Uuid>,
    #[param(example = 1)]
    pub page: Option<u64>,
    #[param(example = 20)]
    pub per_page: Option<u64>,
}

#[derive(Serialize, utoipa::ToSchema)]
pub struct ReportListResponse {
    pub data: Vec<ReportResponse>,
    pub pagination: Pagination,
}
