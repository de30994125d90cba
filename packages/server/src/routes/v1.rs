use axum::routing::get;
use utoipa_axum::router::OpenApiRouter;
use utoipa_axum::routes;

use crate::config::AppConfig;
use crate::handlers;
use crate::state::AppState;

pub fn routes(config: &AppConfig) -> OpenApiRouter<AppState> {
    OpenApiRouter::new()
        .nest("/memes", meme_routes(config))
        .nest("/feed", OpenApiRouter::new().routes(routes!(handlers::feed::get_feed)))
        .nest(
            "/categories",
            OpenApiRouter::new().routes(routes!(handlers::categories::list_categories)),
        )
        .nest("/me", OpenApiRouter::new().routes(routes!(handlers::quota::my_quota)))
        .nest(
            "/reports",
            OpenApiRouter::new()
                .routes(routes!(handlers::reports::list_reports))
                .routes(routes!(handlers::reports::update_report)),
        )
        .nest(
            "/accounts",
            OpenApiRouter::new().routes(routes!(handlers::accounts::account_event)),
        )
        // Keys contain slashes, so this needs a catch-all segment.
        .route("/media/{*key}", get(handlers::media::get_media))
}

fn meme_routes(config: &AppConfig) -> OpenApiRouter<AppState> {
    let read = OpenApiRouter::new()
        .routes(routes!(handlers::memes::list_memes))
        .routes(routes!(handlers::memes::top_memes))
        .routes(routes!(handlers::memes::trending_memes))
        .routes(routes!(handlers::memes::saved_memes))
        .routes(routes!(
            handlers::memes::get_meme,
            handlers::memes::delete_meme
        ))
        .routes(routes!(
            handlers::reactions::add_reaction,
            handlers::reactions::remove_reaction
        ))
        .routes(routes!(handlers::reactions::get_reactions))
        .routes(routes!(handlers::reports::create_report));

    let upload = OpenApiRouter::new()
        .routes(routes!(handlers::memes::submit_meme))
        .layer(handlers::memes::upload_body_limit(&config.upload));

    read.merge(upload)
}
