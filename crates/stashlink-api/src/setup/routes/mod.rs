//! Route configuration and setup

mod health;

use crate::api_doc::ApiDoc;
use crate::auth::middleware::session_middleware;
use crate::constants::{API_PREFIX, MULTIPART_OVERHEAD_BYTES};
use crate::handlers;
use crate::state::AppState;
use axum::{
    extract::DefaultBodyLimit,
    http::{HeaderValue, Method},
    routing::{delete, get, post},
    Json, Router,
};
use stashlink_core::Config;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::trace::TraceLayer;
use utoipa::OpenApi;

/// Setup all application routes
pub fn setup_routes(config: &Config, state: Arc<AppState>) -> Result<Router<()>, anyhow::Error> {
    let cors = setup_cors(config)?;
    let body_limit = config.max_chunk_size_bytes + MULTIPART_OVERHEAD_BYTES;

    let public_routes = Router::new().route("/health", get(health::health_check));

    // Everything else needs a verified session
    let protected_routes = Router::new()
        .route(
            &format!("{}/uploads/token", API_PREFIX),
            get(handlers::token::issue_token),
        )
        .route(
            &format!("{}/uploads/chunk", API_PREFIX),
            post(handlers::chunked_upload::upload_chunk),
        )
        .route(
            &format!("{}/uploads/finish", API_PREFIX),
            post(handlers::chunked_upload::finish_upload),
        )
        .route(
            &format!("{}/maintenance/sweep", API_PREFIX),
            post(handlers::maintenance::run_sweep),
        )
        .route(
            &format!("{}/files", API_PREFIX),
            get(handlers::files::list_files),
        )
        .route(
            &format!("{}/files/{{name}}", API_PREFIX),
            delete(handlers::files::delete_file),
        )
        .route(
            "/api/openapi.json",
            get(|| async { Json(ApiDoc::openapi()) }),
        )
        .route_layer(axum::middleware::from_fn_with_state(
            state.clone(),
            session_middleware,
        ));

    let app = public_routes
        .merge(protected_routes)
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(RequestBodyLimitLayer::new(body_limit))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    Ok(app)
}

/// Setup CORS configuration
fn setup_cors(config: &Config) -> Result<CorsLayer, anyhow::Error> {
    let cors = if config.cors_origins.iter().any(|o| o == "*") {
        tracing::warn!("CORS configured to allow all origins - not recommended for production");
        CorsLayer::new()
            .allow_origin(Any)
            .allow_methods([Method::GET, Method::POST, Method::DELETE, Method::OPTIONS])
            .allow_headers(Any)
    } else {
        let origins = config
            .cors_origins
            .iter()
            .map(|o| o.parse::<HeaderValue>())
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| anyhow::anyhow!("Invalid CORS origin: {}", e))?;

        CorsLayer::new()
            .allow_origin(origins)
            .allow_methods([Method::GET, Method::POST, Method::DELETE, Method::OPTIONS])
            .allow_headers(Any)
    };
    Ok(cors)
}
