use serde::{Deserialize, Serialize};

use super::meme::MemeResponse;

#[derive(Deserialize, utoipa::IntoParams)]
pub struct FeedQuery {
    /// Batch size. Default and maximum come from configuration (10 / 50).
    #[param(example = 10)]
    pub limit: Option<u64>,
    /// Comma-separated meme IDs the client already has.
    #[param(example = "01936f0e-1234-7abc-8000-000000000001,01936f0e-1234-7abc-8000-000000000002")]
    pub exclude: Option<String>,
}

#[derive(Serialize, utoipa::ToSchema)]
pub struct FeedResponse {
    pub data: Vec<MemeResponse>,
    /// `true` when fewer than `limit` memes were eligible.
    pub exhausted: bool,
}
