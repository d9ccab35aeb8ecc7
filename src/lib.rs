pub mod auth;
pub mod cli;
pub mod config;
pub mod db;
pub mod error;
pub mod models;
pub mod photos;
pub mod routes;
pub mod scheduler;
pub mod store;
pub mod validation;

use std::sync::Arc;

use axum::extract::FromRef;
use axum::http::{HeaderValue, Method, StatusCode, header};
use axum::response::IntoResponse;
use axum::{Json, Router, routing::get};
use serde_json::json;
use sqlx::SqlitePool;
use tower::ServiceBuilder;
use tower_http::{
    cors::{AllowOrigin, CorsLayer},
    services::ServeDir,
    set_header::SetResponseHeaderLayer,
    timeout::TimeoutLayer,
    trace::{DefaultOnRequest, DefaultOnResponse, TraceLayer},
};
use tracing::Level;

use crate::auth::JwtKeys;
use crate::config::Config;
use crate::photos::PhotoHost;
use crate::store::MemberStore;

#[derive(Clone)]
pub struct AppState {
    pub db: SqlitePool,
    pub store: MemberStore,
    pub jwt: JwtKeys,
    pub photos: Arc<dyn PhotoHost>,
}

impl AppState {
    pub fn new(pool: SqlitePool, jwt: JwtKeys, photos: Arc<dyn PhotoHost>) -> Self {
        Self {
            store: MemberStore::new(pool.clone()),
            db: pool,
            jwt,
            photos,
        }
    }
}

impl FromRef<AppState> for JwtKeys {
    fn from_ref(state: &AppState) -> Self {
        state.jwt.clone()
    }
}

async fn health() -> &'static str {
    "ok"
}

async fn root() -> impl IntoResponse {
    Json(json!({ "success": true, "message": "Server is awake and running" }))
}

async fn not_found() -> impl IntoResponse {
    (
        StatusCode::NOT_FOUND,
        Json(json!({ "error": "Route not found" })),
    )
}

fn cors_layer(origins: &[String]) -> CorsLayer {
    let origins: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| match origin.parse() {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!(%origin, "ignoring unparseable CORS origin");
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::PATCH,
            Method::OPTIONS,
        ])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION])
        .allow_credentials(true)
}

/// Build the full Axum application router.
///
/// Caller is responsible for running database migrations on the pool inside
/// `state` beforehand. API routes live under `/api`; locally hosted photos are
/// served from `config.upload_dir` under `/uploads`.
pub fn build_app(state: AppState, config: &Config) -> Router {
    let api = Router::new()
        .merge(routes::auth::router())
        .merge(routes::members::router())
        .merge(routes::dashboard::router())
        .merge(routes::expiry::router());

    Router::new()
        .route("/", get(root))
        .route("/health", get(health))
        .nest("/api", api)
        .nest_service(
            "/uploads",
            ServiceBuilder::new()
                .layer(SetResponseHeaderLayer::overriding(
                    header::CACHE_CONTROL,
                    HeaderValue::from_static("public, max-age=86400"),
                ))
                .service(ServeDir::new(&config.upload_dir)),
        )
        .fallback(not_found)
        .layer(TimeoutLayer::new(config.request_timeout))
        .layer(cors_layer(&config.cors_origins))
        .layer(
            TraceLayer::new_for_http()
                .on_request(DefaultOnRequest::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        )
        .with_state(state)
}
