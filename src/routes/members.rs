use axum::{
    Json, Router,
    extract::{DefaultBodyLimit, Multipart, Path, Query, State, rejection::QueryRejection},
    http::StatusCode,
    response::IntoResponse,
    routing::get,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::info;

use crate::AppState;
use crate::auth::AuthAdmin;
use crate::error::AppError;
use crate::models::{Member, PaymentStatus};
use crate::photos::{MAX_PHOTO_BYTES, PhotoError, delete_best_effort};
use crate::store::{self, ListQuery};
use crate::validation::{MemberInput, ValidationError, validate_member};

/// Room for the text fields alongside a maximum-size photo.
const FORM_OVERHEAD_BYTES: usize = 64 * 1024;

#[derive(Deserialize)]
pub struct ListParams {
    search: Option<String>,
    status: Option<String>,
    page: Option<u32>,
    limit: Option<u32>,
}

#[derive(Deserialize)]
pub struct ExcludeParams {
    #[serde(rename = "excludeId")]
    exclude_id: Option<String>,
}

impl ExcludeParams {
    fn exclude_id(&self) -> Option<&str> {
        self.exclude_id
            .as_deref()
            .map(str::trim)
            .filter(|id| !id.is_empty())
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct MemberListResponse {
    data: Vec<Member>,
    total: i64,
    page: u32,
    total_pages: i64,
    has_more: bool,
}

struct PhotoUpload {
    bytes: Vec<u8>,
    filename: String,
}

struct MemberForm {
    input: MemberInput,
    photo: Option<PhotoUpload>,
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/members", get(list_members).post(create_member))
        .route("/members/check-phone/{phone}", get(check_phone))
        .route("/members/check-email/{email}", get(check_email))
        .route(
            "/members/{id}",
            get(get_member).put(update_member).delete(delete_member),
        )
        .layer(DefaultBodyLimit::max(MAX_PHOTO_BYTES + FORM_OVERHEAD_BYTES))
}

fn parse_status_filter(status: Option<&str>) -> Result<Option<PaymentStatus>, AppError> {
    match status.map(str::trim).filter(|s| !s.is_empty()) {
        None | Some("all") => Ok(None),
        Some(s) => s
            .parse::<PaymentStatus>()
            .map(Some)
            .map_err(|_| ValidationError::InvalidPaymentStatus.into()),
    }
}

/// Collect the text fields and the optional `photo` part of a member form.
async fn read_member_form(mut multipart: Multipart) -> Result<MemberForm, AppError> {
    let mut input = MemberInput::default();
    let mut photo = None;

    while let Some(field) = multipart.next_field().await? {
        let name = field.name().unwrap_or_default().to_string();

        if name == "photo" {
            let filename = field.file_name().unwrap_or("photo").to_string();
            let content_type = field.content_type().unwrap_or_default().to_string();
            let bytes = field.bytes().await?;

            // Browsers send an empty part when no file was chosen.
            if bytes.is_empty() {
                continue;
            }
            if !content_type.starts_with("image/") {
                return Err(PhotoError::Rejected("Only image files are allowed").into());
            }
            if bytes.len() > MAX_PHOTO_BYTES {
                return Err(PhotoError::Rejected("File too large").into());
            }

            photo = Some(PhotoUpload {
                bytes: bytes.to_vec(),
                filename,
            });
        } else {
            let value = field.text().await?;
            input.set(&name, value);
        }
    }

    Ok(MemberForm { input, photo })
}

async fn upload_photo(state: &AppState, photo: Option<PhotoUpload>) -> Result<Option<String>, AppError> {
    match photo {
        Some(photo) => Ok(Some(state.photos.upload(photo.bytes, &photo.filename).await?)),
        None => Ok(None),
    }
}

async fn list_members(
    State(state): State<AppState>,
    AuthAdmin(_admin): AuthAdmin,
    params: Result<Query<ListParams>, QueryRejection>,
) -> Result<impl IntoResponse, AppError> {
    let Query(params) = params?;
    let defaults = ListQuery::default();
    let query = ListQuery {
        search: params.search,
        status: parse_status_filter(params.status.as_deref())?,
        page: params.page.unwrap_or(defaults.page),
        limit: params.limit.unwrap_or(defaults.limit),
    };

    let page = state.store.list(&query, store::today()).await?;

    Ok(Json(MemberListResponse {
        data: page.members,
        total: page.total,
        page: page.page,
        total_pages: page.total_pages,
        has_more: page.has_more,
    }))
}

async fn get_member(
    State(state): State<AppState>,
    AuthAdmin(_admin): AuthAdmin,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let member = state.store.get_by_id(&id).await?;
    Ok(Json(member))
}

async fn create_member(
    State(state): State<AppState>,
    AuthAdmin(_admin): AuthAdmin,
    multipart: Multipart,
) -> Result<impl IntoResponse, AppError> {
    let form = read_member_form(multipart).await?;
    let record = validate_member(&form.input)?;
    let photo_url = upload_photo(&state, form.photo).await?;

    let member = match state.store.create(&record, photo_url.as_deref()).await {
        Ok(member) => member,
        Err(e) => {
            // The row was never written, so the fresh upload is orphaned.
            if let Some(url) = &photo_url {
                delete_best_effort(state.photos.as_ref(), url).await;
            }
            return Err(e.into());
        }
    };

    info!(id = %member.id, name = %member.name, "created member");
    Ok((StatusCode::CREATED, Json(member)))
}

async fn update_member(
    State(state): State<AppState>,
    AuthAdmin(_admin): AuthAdmin,
    Path(id): Path<String>,
    multipart: Multipart,
) -> Result<impl IntoResponse, AppError> {
    let form = read_member_form(multipart).await?;
    let record = validate_member(&form.input)?;
    let photo_url = upload_photo(&state, form.photo).await?;

    let updated = match state.store.update(&id, &record, photo_url.as_deref()).await {
        Ok(updated) => updated,
        Err(e) => {
            if let Some(url) = &photo_url {
                delete_best_effort(state.photos.as_ref(), url).await;
            }
            return Err(e.into());
        }
    };

    // The previous photo is only replaced, and so only removed, when a new one was uploaded.
    if photo_url.is_some() {
        if let Some(old) = &updated.old_photo_url {
            delete_best_effort(state.photos.as_ref(), old).await;
        }
    }

    info!(id = %updated.member.id, "updated member");
    Ok(Json(updated.member))
}

async fn delete_member(
    State(state): State<AppState>,
    AuthAdmin(_admin): AuthAdmin,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let deleted = state.store.delete(&id).await?;

    if let Some(url) = &deleted.photo_url {
        delete_best_effort(state.photos.as_ref(), url).await;
    }

    info!(%id, "deleted member");
    Ok(Json(json!({ "message": "Member deleted successfully" })))
}

async fn check_phone(
    State(state): State<AppState>,
    AuthAdmin(_admin): AuthAdmin,
    Path(phone): Path<String>,
    params: Result<Query<ExcludeParams>, QueryRejection>,
) -> Result<impl IntoResponse, AppError> {
    let Query(params) = params?;
    let exists = state.store.phone_exists(&phone, params.exclude_id()).await?;
    Ok(Json(json!({ "exists": exists })))
}

async fn check_email(
    State(state): State<AppState>,
    AuthAdmin(_admin): AuthAdmin,
    Path(email): Path<String>,
    params: Result<Query<ExcludeParams>, QueryRejection>,
) -> Result<impl IntoResponse, AppError> {
    let Query(params) = params?;
    let exists = state.store.email_exists(&email, params.exclude_id()).await?;
    Ok(Json(json!({ "exists": exists })))
}
