pub mod accounts;
pub mod categories;
pub mod feed;
pub mod media;
pub mod memes;
pub mod quota;
pub mod reactions;
pub mod reports;
