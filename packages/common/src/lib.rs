pub mod config;
pub mod identity;
pub mod reaction;
pub mod status;
pub mod storage;

pub use reaction::ReactionKind;
pub use status::{AccountTier, MemeStatus, ReportStatus};
