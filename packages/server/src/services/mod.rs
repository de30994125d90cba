pub mod category;
pub mod dedup;
pub mod feed;
pub mod ingest;
pub mod ledger;
pub mod quota;
