mod accounts;
mod categories;
mod media;
mod memes;
mod reactions;
mod reports;
