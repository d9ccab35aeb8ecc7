use axum::{
    Json, Router,
    extract::{State, rejection::JsonRejection},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
};
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::AppState;
use crate::auth::{AdminIdentity, bearer_token, verify_credentials};
use crate::error::AppError;

#[derive(Deserialize)]
pub struct LoginRequest {
    username: Option<String>,
    password: Option<String>,
}

#[derive(Serialize)]
struct LoginResponse {
    success: bool,
    message: &'static str,
    token: String,
    user: AdminIdentity,
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/auth/login", post(login))
        .route("/auth/verify", get(verify))
}

async fn login(
    State(state): State<AppState>,
    req: Result<Json<LoginRequest>, JsonRejection>,
) -> Result<impl IntoResponse, AppError> {
    let Json(req) = req?;
    let username = req.username.as_deref().map(str::trim).unwrap_or_default();
    let password = req.password.as_deref().unwrap_or_default();
    if username.is_empty() || password.is_empty() {
        return Err(AppError::BadRequest(
            "Username and password are required".to_string(),
        ));
    }

    let identity = verify_credentials(&state.db, username, password).await?;
    let token = state.jwt.issue_token(&identity)?;

    tracing::info!(username = %identity.username, "admin logged in");

    Ok(Json(LoginResponse {
        success: true,
        message: "Login successful",
        token,
        user: identity,
    }))
}

/// Unlike the route guard, any failure here is a plain 401.
async fn verify(State(state): State<AppState>, headers: HeaderMap) -> Response {
    let Some(token) = bearer_token(&headers) else {
        return unauthorized("No token provided");
    };

    match state.jwt.verify_token(token) {
        Ok(user) => Json(json!({ "success": true, "user": user })).into_response(),
        Err(_) => unauthorized("Invalid or expired token"),
    }
}

fn unauthorized(message: &str) -> Response {
    (
        StatusCode::UNAUTHORIZED,
        Json(json!({ "success": false, "error": message })),
    )
        .into_response()
}
