use std::path::PathBuf;

use serde::Deserialize;

/// Which object storage implementation backs uploaded media.
#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    Filesystem,
    S3,
}

/// App-level object storage configuration.
#[derive(Debug, Deserialize, Clone)]
pub struct StorageAppConfig {
    /// Storage backend. Default: filesystem.
    #[serde(default = "default_backend")]
    pub backend: StorageBackend,
    /// Root directory for the filesystem backend. Default: "./data/media".
    #[serde(default = "default_root")]
    pub root: PathBuf,
    /// Base URL under which stored objects are publicly reachable.
    /// Default: "http://127.0.0.1:3000/api/v1/media".
    #[serde(default = "default_public_base_url")]
    pub public_base_url: String,
    /// Bucket name for the S3 backend. Default: "memes".
    #[serde(default = "default_bucket")]
    pub bucket: String,
    /// S3 region name. Default: "us-east-1".
    #[serde(default = "default_region")]
    pub region: String,
    /// Custom S3 endpoint (MinIO, R2, ...). Uses AWS when unset.
    #[serde(default)]
    pub endpoint: Option<String>,
    #[serde(default)]
    pub access_key: Option<String>,
    #[serde(default)]
    pub secret_key: Option<String>,
    /// Upper bound for a single put/delete/get. Default: 10000 ms.
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
    /// Delete the stored object when its meme is removed. Default: false (retain).
    #[serde(default)]
    pub delete_on_removal: bool,
}

fn default_backend() -> StorageBackend {
    StorageBackend::Filesystem
}
fn default_root() -> PathBuf {
    PathBuf::from("./data/media")
}
fn default_public_base_url() -> String {
    "http://127.0.0.1:3000/api/v1/media".into()
}
fn default_bucket() -> String {
    "memes".into()
}
fn default_region() -> String {
    "us-east-1".into()
}
fn default_timeout_ms() -> u64 {
    10_000
}

impl Default for StorageAppConfig {
    fn default() -> Self {
        Self {
            backend: default_backend(),
            root: default_root(),
            public_base_url: default_public_base_url(),
            bucket: default_bucket(),
            region: default_region(),
            endpoint: None,
            access_key: None,
            secret_key: None,
            timeout_ms: default_timeout_ms(),
            delete_on_removal: false,
        }
    }
}
