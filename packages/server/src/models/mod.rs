pub mod account;
pub mod category;
pub mod feed;
pub mod meme;
pub mod quota;
pub mod reaction;
pub mod report;
pub mod shared;
