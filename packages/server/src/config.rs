use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;

pub use common::config::{StorageAppConfig, StorageBackend};

#[derive(Debug, Deserialize, Clone)]
pub struct CorsConfig {
    pub allow_origins: Vec<String>,
    pub max_age: u64,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub cors: CorsConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DatabaseConfig {
    pub url: String,
    /// Upper bound for a single datastore round of the upload pipeline. Default: 8000 ms.
    #[serde(default = "default_database_timeout_ms")]
    pub timeout_ms: u64,
}

fn default_database_timeout_ms() -> u64 {
    8_000
}

#[derive(Debug, Deserialize, Clone)]
pub struct AuthConfig {
    /// Shared secret used to verify identity-provider bearer tokens (HS256).
    pub jwt_secret: String,
    /// Bearer secret the identity provider presents when delivering account events.
    #[serde(default)]
    pub webhook_secret: Option<String>,
    /// Subjects allowed to review reports. Normalized like token subjects.
    #[serde(default)]
    pub moderators: Vec<String>,
}

/// Limits applied to meme submissions.
#[derive(Debug, Deserialize, Clone)]
pub struct UploadConfig {
    /// Maximum image size in bytes. Default: 5 MiB.
    #[serde(default = "default_max_size")]
    pub max_size: u64,
    /// Accepted MIME types. Default: jpeg, png, gif, webp.
    #[serde(default = "default_allowed_types")]
    pub allowed_types: Vec<String>,
    /// Submissions per rolling 24 hours, regardless of tier. Default: 30.
    #[serde(default = "default_daily_limit")]
    pub daily_limit: u64,
    /// Submissions per calendar month for free accounts. Default: 10.
    #[serde(default = "default_free_monthly_limit")]
    pub free_monthly_limit: u64,
    /// Submissions per calendar month for premium accounts. Default: 50.
    #[serde(default = "default_premium_monthly_limit")]
    pub premium_monthly_limit: u64,
    #[serde(default = "default_title_max_chars")]
    pub title_max_chars: usize,
    #[serde(default = "default_description_max_chars")]
    pub description_max_chars: usize,
}

fn default_max_size() -> u64 {
    5 * 1024 * 1024
}
fn default_allowed_types() -> Vec<String> {
    ["image/jpeg", "image/png", "image/gif", "image/webp"]
        .into_iter()
        .map(String::from)
        .collect()
}
fn default_daily_limit() -> u64 {
    30
}
fn default_free_monthly_limit() -> u64 {
    10
}
fn default_premium_monthly_limit() -> u64 {
    50
}
fn default_title_max_chars() -> usize {
    256
}
fn default_description_max_chars() -> usize {
    2000
}

impl Default for UploadConfig {
    fn default() -> Self {
        Self {
            max_size: default_max_size(),
            allowed_types: default_allowed_types(),
            daily_limit: default_daily_limit(),
            free_monthly_limit: default_free_monthly_limit(),
            premium_monthly_limit: default_premium_monthly_limit(),
            title_max_chars: default_title_max_chars(),
            description_max_chars: default_description_max_chars(),
        }
    }
}

#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum FingerprintProvider {
    /// External perceptual-hash service.
    Http,
    /// SHA-256 of the stored bytes. Catches exact re-uploads only.
    ContentDigest,
    Disabled,
}

#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ClassifierProvider {
    Http,
    Disabled,
}

#[derive(Debug, Deserialize, Clone)]
pub struct FingerprintConfig {
    #[serde(default = "default_fingerprint_provider")]
    pub provider: FingerprintProvider,
    /// Endpoint of the hash service, e.g. "http://hasher:8000/generate-phash".
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default = "default_enrichment_timeout_ms")]
    pub timeout_ms: u64,
}

fn default_fingerprint_provider() -> FingerprintProvider {
    FingerprintProvider::ContentDigest
}

impl Default for FingerprintConfig {
    fn default() -> Self {
        Self {
            provider: default_fingerprint_provider(),
            url: None,
            timeout_ms: default_enrichment_timeout_ms(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct ClassifierConfig {
    #[serde(default = "default_classifier_provider")]
    pub provider: ClassifierProvider,
    /// Endpoint of the classification service.
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default = "default_enrichment_timeout_ms")]
    pub timeout_ms: u64,
}

fn default_classifier_provider() -> ClassifierProvider {
    ClassifierProvider::Disabled
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            provider: default_classifier_provider(),
            url: None,
            timeout_ms: default_enrichment_timeout_ms(),
        }
    }
}

fn default_enrichment_timeout_ms() -> u64 {
    10_000
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct EnrichmentConfig {
    #[serde(default)]
    pub fingerprint: FingerprintConfig,
    #[serde(default)]
    pub classifier: ClassifierConfig,
}

/// Discovery feed tuning.
#[derive(Debug, Deserialize, Clone)]
pub struct FeedConfig {
    #[serde(default = "default_feed_limit")]
    pub default_limit: u64,
    #[serde(default = "default_feed_max_limit")]
    pub max_limit: u64,
    /// Maximum number of ids a caller may pass in `exclude`.
    #[serde(default = "default_max_exclude")]
    pub max_exclude: usize,
    /// Skip memes already shown to the caller within the exposure window.
    #[serde(default = "default_true")]
    pub avoid_recent_exposures: bool,
    #[serde(default = "default_exposure_window_hours")]
    pub exposure_window_hours: i64,
    /// Skip memes the caller disliked.
    #[serde(default = "default_true")]
    pub exclude_disliked: bool,
}

fn default_feed_limit() -> u64 {
    10
}
fn default_feed_max_limit() -> u64 {
    50
}
fn default_max_exclude() -> usize {
    500
}
fn default_exposure_window_hours() -> i64 {
    24
}
fn default_true() -> bool {
    true
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self {
            default_limit: default_feed_limit(),
            max_limit: default_feed_max_limit(),
            max_exclude: default_max_exclude(),
            avoid_recent_exposures: true,
            exposure_window_hours: default_exposure_window_hours(),
            exclude_disliked: true,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct ReactionConfig {
    /// Treat like and dislike as one mutually exclusive vote.
    #[serde(default = "default_true")]
    pub exclusive_votes: bool,
}

impl Default for ReactionConfig {
    fn default() -> Self {
        Self {
            exclusive_votes: true,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub auth: AuthConfig,
    #[serde(default)]
    pub storage: StorageAppConfig,
    #[serde(default)]
    pub upload: UploadConfig,
    #[serde(default)]
    pub enrichment: EnrichmentConfig,
    #[serde(default)]
    pub feed: FeedConfig,
    #[serde(default)]
    pub reactions: ReactionConfig,
}

impl AppConfig {
    pub fn load() -> Result<Self, ConfigError> {
        let config_path =
            std::env::var("MEMEHUB_CONFIG").unwrap_or_else(|_| "config/config".to_string());

        let s = Config::builder()
            .set_default("server.host", "127.0.0.1")?
            .set_default("server.port", 3000)?
            .set_default("server.cors.allow_origins", Vec::<String>::new())?
            .set_default("server.cors.max_age", 3600)?
            .add_source(File::with_name(&config_path).required(false))
            // Override from environment (e.g., MEMEHUB__AUTH__JWT_SECRET)
            .add_source(Environment::with_prefix("MEMEHUB").separator("__"))
            .build()?;

        s.try_deserialize()
    }
}
