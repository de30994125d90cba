mod error;
mod hash;
mod timed;
mod traits;

pub mod filesystem;
#[cfg(feature = "object-storage")]
pub mod s3;

pub use error::StorageError;
pub use hash::ContentHash;
pub use timed::TimedObjectStore;
pub use traits::{BoxReader, ObjectStore, validate_key};
