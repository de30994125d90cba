pub mod account;
pub mod category;
pub mod feed_exposure;
pub mod interaction;
pub mod meme;
pub mod meme_category;
pub mod report;
