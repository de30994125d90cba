use common::ReactionKind;
use serde::Serialize;

use crate::services::ledger::ReactionState;

/// Counters after a reaction change, plus the caller's own reactions.
#[derive(Serialize, utoipa::ToSchema)]
pub struct ReactionStateResponse {
    #[schema(example = "01936f0e-1234-7abc-8000-000000000001")]
    pub meme_id: String,
    #[schema(example = 12)]
    pub like_count: i32,
    #[schema(example = 1)]
    pub dislike_count: i32,
    #[schema(example = 0)]
    pub share_count: i32,
    /// Reactions the caller currently has on this meme.
    pub reactions: Vec<ReactionKind>,
}

impl ReactionStateResponse {
    pub fn new(meme_id: uuid::Uuid, state: ReactionState) -> Self {
        Self {
            meme_id: meme_id.to_string(),
            like_count: state.like_count,
            dislike_count: state.dislike_count,
            share_count: state.share_count,
            reactions: state.active,
        }
    }
}
