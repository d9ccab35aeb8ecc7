use axum::{Json, Router, extract::State, response::IntoResponse, routing::get};

use crate::AppState;
use crate::auth::AuthAdmin;
use crate::error::AppError;
use crate::store;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/dashboard/stats", get(stats))
        .route("/dashboard/expiring", get(expiring))
}

async fn stats(
    State(state): State<AppState>,
    AuthAdmin(_admin): AuthAdmin,
) -> Result<impl IntoResponse, AppError> {
    let stats = state.store.stats(store::today()).await?;
    Ok(Json(stats))
}

async fn expiring(
    State(state): State<AppState>,
    AuthAdmin(_admin): AuthAdmin,
) -> Result<impl IntoResponse, AppError> {
    let members = state.store.expiring(store::today()).await?;
    Ok(Json(members))
}
