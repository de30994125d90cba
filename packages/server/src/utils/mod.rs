pub mod filename;
pub mod jwt;
pub mod slug;
