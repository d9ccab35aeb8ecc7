use axum::{Json, Router, extract::State, response::IntoResponse, routing::post};
use serde::Serialize;

use crate::AppState;
use crate::error::AppError;
use crate::models::ExpiredMember;
use crate::store;

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct AutoExpireResponse {
    success: bool,
    message: String,
    expired_members: Vec<ExpiredMember>,
}

pub fn router() -> Router<AppState> {
    Router::new().route("/auto-expire", post(auto_expire))
}

/// Operational trigger for the expiry sweep. Unauthenticated so cron jobs
/// outside the app can call it; the sweep is idempotent.
async fn auto_expire(State(state): State<AppState>) -> Result<impl IntoResponse, AppError> {
    let expired = state.store.auto_expire(store::today()).await?;

    Ok(Json(AutoExpireResponse {
        success: true,
        message: format!("Auto-expired {} members", expired.len()),
        expired_members: expired,
    }))
}
