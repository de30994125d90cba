pub mod config;
pub mod database;
pub mod enrichment;
pub mod entity;
pub mod error;
pub mod extractors;
pub mod handlers;
pub mod models;
pub mod routes;
pub mod seed;
pub mod services;
pub mod state;
pub mod utils;

use std::sync::Arc;
use std::time::Duration;

use axum::http::{HeaderValue, Method, header};
use common::storage::filesystem::FilesystemObjectStore;
use common::storage::s3::S3ObjectStore;
use common::storage::{ObjectStore, TimedObjectStore};
use sea_orm::DatabaseConnection;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tracing::{info, warn};
use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{Modify, OpenApi};
use utoipa_axum::router::OpenApiRouter;
use utoipa_scalar::{Scalar, Servable as ScalarServable};
use utoipa_swagger_ui::SwaggerUi;

use crate::config::{AppConfig, CorsConfig, StorageBackend};
use crate::state::AppState;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Memehub API",
        version = "1.0.0",
        description = "Meme submission, discovery and reactions"
    ),
    paths(handlers::media::get_media),
    tags(
        (name = "Memes", description = "Submitting, browsing and removing memes"),
        (name = "Reactions", description = "Likes, dislikes, shares and saves"),
        (name = "Feed", description = "Randomized discovery feed"),
        (name = "Categories", description = "Auto-assigned meme categories"),
        (name = "Reports", description = "User reports and moderation"),
        (name = "Accounts", description = "Account lifecycle and upload quota"),
        (name = "Media", description = "Stored image delivery"),
    ),
    modifiers(&SecurityAddon),
)]
struct ApiDoc;

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        let components = openapi.components.get_or_insert_default();
        components.add_security_scheme(
            "jwt",
            SecurityScheme::Http(
                HttpBuilder::new()
                    .scheme(HttpAuthScheme::Bearer)
                    .bearer_format("JWT")
                    .build(),
            ),
        );
    }
}

/// Wire the object store and enrichment providers described by `config`.
pub async fn build_state(config: AppConfig, db: DatabaseConnection) -> anyhow::Result<AppState> {
    let storage = &config.storage;
    let backend: Arc<dyn ObjectStore> = match storage.backend {
        StorageBackend::Filesystem => Arc::new(
            FilesystemObjectStore::new(
                storage.root.clone(),
                storage.public_base_url.clone(),
                config.upload.max_size,
            )
            .await?,
        ),
        StorageBackend::S3 => Arc::new(S3ObjectStore::new(storage)?),
    };
    let object_store: Arc<dyn ObjectStore> = Arc::new(TimedObjectStore::new(
        backend,
        Duration::from_millis(storage.timeout_ms),
    ));
    info!(backend = ?storage.backend, "Object store ready");

    let fingerprinter = enrichment::build_fingerprinter(&config.enrichment, object_store.clone())?;
    let classifier = enrichment::build_classifier(&config.enrichment)?;

    Ok(AppState {
        db,
        config: Arc::new(config),
        object_store,
        fingerprinter,
        classifier,
    })
}

fn cors_layer(config: &CorsConfig) -> CorsLayer {
    let origins: Vec<HeaderValue> = config
        .allow_origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(_) => {
                warn!(origin = %origin, "Ignoring invalid CORS origin");
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods([Method::GET, Method::POST, Method::PATCH, Method::DELETE])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE, header::IF_NONE_MATCH])
        .max_age(Duration::from_secs(config.max_age))
}

/// Build the application router.
pub fn build_router(state: AppState) -> axum::Router {
    let cors = cors_layer(&state.config.server.cors);
    let (router, api) = OpenApiRouter::with_openapi(ApiDoc::openapi())
        .nest("/api", routes::api_routes(&state.config))
        .split_for_parts();

    router
        .with_state(state)
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", api.clone()))
        .merge(Scalar::with_url("/scalar", api))
        .layer(cors)
}
