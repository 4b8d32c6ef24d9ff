use axum::{
    http::HeaderValue,
    routing::{get, post},
    Router,
};
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::warn;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::config::Config;
use crate::docs::ApiDoc;
use crate::handlers::{
    diagnostics, health_check, item_add, item_all, item_all_delete, item_delete, item_download, item_get,
    ready_check, session_add, session_all, session_delete, session_get,
};
use crate::websocket::websocket_handler;
use crate::AppState;

/// Create API routes
pub fn create_api_routes(state: AppState) -> Router {
    Router::<AppState>::new()
        .route("/health", get(health_check))
        .route("/ready", get(ready_check))
        .route("/diagnostics", get(diagnostics))
        .route("/session/all", get(session_all))
        .route("/session/add", post(session_add))
        .route("/session/:uid", get(session_get).delete(session_delete))
        .route("/item/add", post(item_add))
        .route("/item/all/:session", get(item_all).delete(item_all_delete))
        .route("/item/download/:uid", get(item_download))
        .route("/item/:uid", get(item_get).delete(item_delete))
        .with_state(state)
}

/// The HTTP application: API routes, Swagger UI, CORS and request tracing
pub fn create_http_app(state: AppState, config: &Config) -> Router {
    Router::new()
        .merge(create_api_routes(state))
        .merge(SwaggerUi::new("/swagger").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .layer(cors_layer(config))
        .layer(TraceLayer::new_for_http())
}

/// WebSocket upgrade routes, served on their own port
pub fn create_ws_routes(state: AppState) -> Router {
    Router::<AppState>::new()
        .route("/", get(websocket_handler))
        .route("/ws", get(websocket_handler))
        .with_state(state)
        .layer(TraceLayer::new_for_http())
}

fn cors_layer(config: &Config) -> CorsLayer {
    let origins: Vec<HeaderValue> = config
        .cors_origin_list()
        .into_iter()
        .filter_map(|origin| match origin.parse() {
            Ok(value) => Some(value),
            Err(_) => {
                warn!("Ignoring invalid CORS origin '{}'", origin);
                None
            }
        })
        .collect();
    if origins.is_empty() {
        if config.is_development() {
            CorsLayer::permissive()
        } else {
            // same-origin only
            CorsLayer::new()
        }
    } else {
        CorsLayer::new()
            .allow_origin(origins)
            .allow_methods(tower_http::cors::Any)
            .allow_headers(tower_http::cors::Any)
    }
}

