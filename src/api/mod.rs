use std::sync::Arc;

use axum::{
    http::{header, Method, StatusCode},
    middleware,
    routing::{get, post},
    Router,
};
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::middleware::admin_auth::basic_auth;
use crate::middleware::headers::{request_id_middleware, security_headers_middleware};
use crate::AppState;

pub mod admin;
pub mod handlers;
pub mod quote;

/// The complete HTTP application: health probes, the public API under
/// `/api` and the basic-auth protected `/admin` path.
pub fn app(state: Arc<AppState>) -> Router {
    let cors = cors_layer(state.config.cors_origin.clone());

    Router::new()
        // Health endpoints (no auth)
        .route("/healthz", get(|| async { "ok" }))
        .route("/readyz", get(handlers::readiness))
        .nest("/api", api_router())
        .nest("/admin", admin_router(state.clone()))
        .fallback(fallback_404)
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .layer(middleware::from_fn(request_id_middleware))
        .layer(middleware::from_fn(security_headers_middleware))
}

/// Public routes. All paths are relative; the caller mounts this under `/api`.
pub fn api_router() -> Router<Arc<AppState>> {
    Router::new()
        .route(
            "/meli/refresh",
            get(handlers::refresh_token).post(handlers::refresh_token),
        )
        .route(
            "/meli/sync",
            get(handlers::sync_listings).post(handlers::sync_listings),
        )
        .route(
            "/vehicles/sync",
            get(handlers::sync_vehicles).post(handlers::sync_vehicles),
        )
        .route("/vehicles", get(handlers::list_vehicles))
        .route("/vehicles/:slug", get(handlers::get_vehicle))
        .route("/creditcar/quote", post(quote::request_quote))
}

/// Admin routes, every one behind HTTP basic auth.
pub fn admin_router(state: Arc<AppState>) -> Router<Arc<AppState>> {
    Router::new()
        .route("/status", get(admin::status))
        .route("/vehicles", get(admin::list_vehicles))
        .route_layer(middleware::from_fn_with_state(state, basic_auth))
}

async fn fallback_404() -> StatusCode {
    StatusCode::NOT_FOUND
}

/// Allow the configured site origin plus localhost for development.
fn cors_layer(site_origin: Option<String>) -> CorsLayer {
    CorsLayer::new()
        .allow_origin(AllowOrigin::predicate(move |origin, _| {
            let origin_str = origin.to_str().unwrap_or("");
            site_origin.as_deref() == Some(origin_str)
                || origin_str.starts_with("http://localhost:")
                || origin_str.starts_with("http://127.0.0.1:")
        }))
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION])
}
