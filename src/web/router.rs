//! Router configuration for Web API.

use axum::{
    extract::DefaultBodyLimit,
    middleware,
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_http::trace::TraceLayer;

use super::handlers::{
    cleanup_files, download_file, download_shared, download_shared_with_password, get_file,
    get_share_info, list_files, revoke_file, upload_file, AppState,
};
use super::middleware::{create_cors_layer, jwt_auth, security_headers, JwtState};

/// Room for multipart framing and form fields beyond the file itself.
const MULTIPART_OVERHEAD_BYTES: usize = 64 * 1024;

/// Create the main API router.
pub fn create_router(
    app_state: Arc<AppState>,
    jwt_state: Arc<JwtState>,
    cors_origins: &[String],
) -> Router {
    let body_limit = usize::try_from(app_state.service.limits().max_upload_bytes)
        .unwrap_or(usize::MAX)
        .saturating_add(MULTIPART_OVERHEAD_BYTES);

    // Owner routes (authentication required)
    let file_routes = Router::new()
        .route(
            "/",
            get(list_files)
                .post(upload_file)
                .layer(DefaultBodyLimit::max(body_limit)),
        )
        .route("/cleanup", post(cleanup_files))
        .route("/:id", get(get_file).delete(revoke_file))
        .route("/:id/download", get(download_file));

    // Public share routes
    let share_routes = Router::new()
        .route("/:token", get(get_share_info))
        .route(
            "/:token/download",
            get(download_shared).post(download_shared_with_password),
        );

    let api_routes = Router::new()
        .nest("/files", file_routes)
        .nest("/share", share_routes);

    let jwt_state_for_middleware = jwt_state.clone();

    Router::new()
        .nest("/api", api_routes)
        .merge(create_health_router())
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(create_cors_layer(cors_origins))
                .layer(middleware::from_fn(security_headers))
                .layer(middleware::from_fn(move |req, next| {
                    let state = jwt_state_for_middleware.clone();
                    jwt_auth(state, req, next)
                })),
        )
        .with_state(app_state)
}

/// Create a health check router.
pub fn create_health_router<S: Clone + Send + Sync + 'static>() -> Router<S> {
    Router::new().route("/health", get(health_check))
}

/// Health check handler.
async fn health_check() -> &'static str {
    "OK"
}
