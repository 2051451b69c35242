mod routes;
mod controllers;
mod services;
mod models;
mod api_docs;
mod shared_state;
mod config;
mod errors;

use std::net::SocketAddr;
use axum::{Router, routing::get, response::Html};
use crate::routes::api_routes::api_routes;
use utoipa::OpenApi;
use utoipa_scalar::Scalar;
use crate::api_docs::ApiDoc;
use crate::shared_state::AppState;
use crate::config::Config;
use crate::services::history::HistoryStore;
use crate::services::localization::Translator;

use tower_http::cors::CorsLayer;
use tower_http::services::ServeDir;

#[tokio::main]
async fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    // 1. Load configuration
    let config_path = Config::path_from_env();
    let config = match Config::load(&config_path) {
        Ok(c) => c,
        Err(e) => {
            log::error!("Failed to load {}: {}", config_path, e);
            return;
        }
    };
    log::info!(
        "Configuration loaded: history={} ({:?}), default variant={:?}, language={}",
        config.history.path, config.history.policy,
        config.formula.default_variant, config.localization.default_language
    );

    // 2. Load persisted history
    let history = match HistoryStore::load(&config.history.path, config.history.policy) {
        Ok(h) => h,
        Err(e) => {
            log::error!("Failed to read history {}: {}", config.history.path, e);
            return;
        }
    };

    // 3. Initialize shared state
    let translator = Translator::new(&config.translation);
    if config.translation.enabled {
        log::info!("[I18N] Translation service: {}", config.translation.endpoint);
    }
    let server_port = config.server.port;
    let state = AppState::new(config, history, translator);

    // 4. Start Axum HTTP server
    let app = Router::new()
        .nest("/api", api_routes(state))
        .route("/scalar", get(|| async {
            Html(Scalar::new(ApiDoc::openapi()).to_html())
        }))
        .fallback_service(ServeDir::new("static"))
        .layer(CorsLayer::permissive());

    let addr = SocketAddr::from(([0, 0, 0, 0], server_port));
    log::info!("API Server listening on http://{}", addr);
    log::info!("Scalar UI: http://{}/scalar", addr);

    if let Err(e) = axum_server::bind(addr)
        .serve(app.into_make_service())
        .await
    {
        log::error!("HTTP server error: {}", e);
    }
}
