#[cfg(feature = "sea-orm")]
use sea_orm::prelude::StringLen;

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::status::ParseEnumError;

/// Kind of reaction a user can leave on a meme.
///
/// At most one ledger row exists per `(user, meme, kind)`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize, utoipa::ToSchema)]
#[cfg_attr(
    feature = "sea-orm",
    derive(sea_orm::DeriveActiveEnum, sea_orm::EnumIter),
    sea_orm(rs_type = "String", db_type = "String(StringLen::None)")
)]
#[serde(rename_all = "lowercase")]
pub enum ReactionKind {
    #[cfg_attr(feature = "sea-orm", sea_orm(string_value = "like"))]
    Like,
    #[cfg_attr(feature = "sea-orm", sea_orm(string_value = "dislike"))]
    Dislike,
    #[cfg_attr(feature = "sea-orm", sea_orm(string_value = "share"))]
    Share,
    /// Bookmark. Not aggregated into a counter.
    #[cfg_attr(feature = "sea-orm", sea_orm(string_value = "save"))]
    Save,
}

impl ReactionKind {
    pub const ALL: &'static [ReactionKind] = &[Self::Like, Self::Dislike, Self::Share, Self::Save];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Like => "like",
            Self::Dislike => "dislike",
            Self::Share => "share",
            Self::Save => "save",
        }
    }

    /// The opposing vote, for kinds that participate in up/down voting.
    pub fn opposing_vote(&self) -> Option<ReactionKind> {
        match self {
            Self::Like => Some(Self::Dislike),
            Self::Dislike => Some(Self::Like),
            Self::Share | Self::Save => None,
        }
    }
}

impl fmt::Display for ReactionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ReactionKind {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "like" => Ok(Self::Like),
            "dislike" => Ok(Self::Dislike),
            "share" => Ok(Self::Share),
            "save" => Ok(Self::Save),
            _ => Err(ParseEnumError::new(
                "reaction kind",
                s,
                &["like", "dislike", "share", "save"],
            )),
        }
    }
}
