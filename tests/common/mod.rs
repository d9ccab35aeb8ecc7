#![allow(dead_code)]

use async_trait::async_trait;
use axum::Router;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::response::Response;
use chrono::{Duration, NaiveDate, Utc};
use http_body_util::BodyExt;
use revive::auth::{AdminIdentity, JwtKeys, hash_password};
use revive::config::Config;
use revive::photos::{PhotoError, PhotoHost};
use revive::{AppState, build_app};
use serde_json::Value;
use sqlx::SqlitePool;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use std::str::FromStr;
use std::sync::{Arc, Mutex};

pub const JWT_SECRET: &str = "test-secret";
pub const BOUNDARY: &str = "revive-test-boundary";

/// Photo host that records calls instead of talking to a real service.
#[derive(Default)]
pub struct RecordingPhotoHost {
    pub uploads: Mutex<Vec<String>>,
    pub deletes: Mutex<Vec<String>>,
}

impl RecordingPhotoHost {
    pub fn uploaded(&self) -> Vec<String> {
        self.uploads.lock().unwrap().clone()
    }

    pub fn deleted(&self) -> Vec<String> {
        self.deletes.lock().unwrap().clone()
    }
}

#[async_trait]
impl PhotoHost for RecordingPhotoHost {
    async fn upload(&self, _bytes: Vec<u8>, filename: &str) -> Result<String, PhotoError> {
        let mut uploads = self.uploads.lock().unwrap();
        let url = format!("https://photos.test/{}-{}", uploads.len() + 1, filename);
        uploads.push(url.clone());
        Ok(url)
    }

    async fn delete(&self, url: &str) -> Result<(), PhotoError> {
        self.deletes.lock().unwrap().push(url.to_string());
        Ok(())
    }
}

pub struct TestApp {
    pub router: Router,
    pub db: SqlitePool,
    pub photos: Arc<RecordingPhotoHost>,
    pub jwt: JwtKeys,
}

impl TestApp {
    pub async fn new() -> Self {
        let options = SqliteConnectOptions::from_str("sqlite::memory:")
            .unwrap()
            .create_if_missing(true);

        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect_with(options)
            .await
            .expect("Failed to create in-memory SQLite pool");

        sqlx::migrate!("./migrations")
            .run(&pool)
            .await
            .expect("Failed to run migrations");

        let config = Config::from_lookup(|_| None).expect("default config");
        let photos = Arc::new(RecordingPhotoHost::default());
        let jwt = JwtKeys::new(JWT_SECRET);
        let state = AppState::new(pool.clone(), jwt.clone(), photos.clone());
        let router = build_app(state, &config);

        Self {
            router,
            db: pool,
            photos,
            jwt,
        }
    }

    /// Send a request through the app and return the response.
    pub async fn request(&self, req: Request<Body>) -> Response {
        tower::ServiceExt::oneshot(self.router.clone(), req)
            .await
            .unwrap()
    }

    /// Insert an admin with a cheap bcrypt cost.
    pub async fn create_admin(&self, username: &str, password: &str) -> String {
        let id = uuid::Uuid::new_v4().to_string();
        let hash = hash_password(password, 4).await.unwrap();

        sqlx::query("INSERT INTO admins (id, username, password_hash, created_at) VALUES (?, ?, ?, ?)")
            .bind(&id)
            .bind(username)
            .bind(&hash)
            .bind(Utc::now().to_rfc3339())
            .execute(&self.db)
            .await
            .expect("Failed to create test admin");

        id
    }

    /// A valid bearer token for a fictional admin.
    pub fn token(&self) -> String {
        self.jwt
            .issue_token(&AdminIdentity {
                id: "admin-test".to_string(),
                username: "owner".to_string(),
            })
            .unwrap()
    }

    /// Send a GET request with an optional bearer token.
    pub async fn get(&self, uri: &str, token: Option<&str>) -> Response {
        let mut builder = Request::builder().uri(uri);
        if let Some(token) = token {
            builder = builder.header("authorization", format!("Bearer {token}"));
        }
        let req = builder.body(Body::empty()).unwrap();
        self.request(req).await
    }

    /// Send a POST JSON request with an optional bearer token.
    pub async fn post_json(&self, uri: &str, body: &Value, token: Option<&str>) -> Response {
        let mut builder = Request::builder()
            .uri(uri)
            .method("POST")
            .header("content-type", "application/json");
        if let Some(token) = token {
            builder = builder.header("authorization", format!("Bearer {token}"));
        }
        let req = builder.body(Body::from(body.to_string())).unwrap();
        self.request(req).await
    }

    /// Send a multipart form with the given method.
    pub async fn send_form(
        &self,
        method: &str,
        uri: &str,
        form: &MemberForm,
        token: Option<&str>,
    ) -> Response {
        let mut builder = Request::builder()
            .uri(uri)
            .method(method)
            .header(
                "content-type",
                format!("multipart/form-data; boundary={BOUNDARY}"),
            );
        if let Some(token) = token {
            builder = builder.header("authorization", format!("Bearer {token}"));
        }
        let req = builder.body(Body::from(form.encode())).unwrap();
        self.request(req).await
    }

    pub async fn post_form(&self, uri: &str, form: &MemberForm, token: Option<&str>) -> Response {
        self.send_form("POST", uri, form, token).await
    }

    pub async fn put_form(&self, uri: &str, form: &MemberForm, token: Option<&str>) -> Response {
        self.send_form("PUT", uri, form, token).await
    }

    /// Send a DELETE request with an optional bearer token.
    pub async fn delete(&self, uri: &str, token: Option<&str>) -> Response {
        let mut builder = Request::builder().uri(uri).method("DELETE");
        if let Some(token) = token {
            builder = builder.header("authorization", format!("Bearer {token}"));
        }
        let req = builder.body(Body::empty()).unwrap();
        self.request(req).await
    }

    /// Create a member through the API and return its JSON.
    pub async fn create_member(&self, form: &MemberForm) -> Value {
        let resp = self.post_form("/api/members", form, Some(&self.token())).await;
        assert_eq!(resp.status(), StatusCode::CREATED);
        body_json(resp).await
    }

    /// Insert a member row directly, bypassing validation.
    pub async fn insert_member(&self, row: MemberRow<'_>) -> String {
        let id = uuid::Uuid::new_v4().to_string();
        let start = row.end_date - Duration::days(30);
        let digits: String = row.phone.chars().filter(|c| c.is_ascii_digit()).collect();

        sqlx::query(
            "INSERT INTO members (id, name, email, phone, phone_digits, membership_type, \
             start_date, end_date, payment_status, photo_url, created_at, updated_at) \
             VALUES (?, ?, ?, ?, ?, 'monthly', ?, ?, ?, NULL, ?, ?)",
        )
        .bind(&id)
        .bind(row.name)
        .bind(row.email)
        .bind(row.phone)
        .bind(&digits)
        .bind(start.format("%Y-%m-%d").to_string())
        .bind(row.end_date.format("%Y-%m-%d").to_string())
        .bind(row.status)
        .bind(row.created_at)
        .bind(row.created_at)
        .execute(&self.db)
        .await
        .expect("Failed to insert test member");

        id
    }

    pub async fn status_of(&self, id: &str) -> String {
        let (status,): (String,) = sqlx::query_as("SELECT payment_status FROM members WHERE id = ?")
            .bind(id)
            .fetch_one(&self.db)
            .await
            .unwrap();
        status
    }
}

pub struct MemberRow<'a> {
    pub name: &'a str,
    pub email: &'a str,
    pub phone: &'a str,
    pub status: &'a str,
    pub end_date: NaiveDate,
    pub created_at: &'a str,
}

impl<'a> MemberRow<'a> {
    pub fn new(name: &'a str, phone: &'a str, status: &'a str, end_date: NaiveDate) -> Self {
        Self {
            name,
            email: "member@revivefitness.com",
            phone,
            status,
            end_date,
            created_at: "2025-01-01T00:00:00+00:00",
        }
    }
}

/// Multipart member form, optionally with a photo part.
#[derive(Clone)]
pub struct MemberForm {
    pub fields: Vec<(String, String)>,
    pub photo: Option<(String, String, Vec<u8>)>,
}

impl MemberForm {
    /// A form that passes validation, ending a month from today.
    pub fn valid(name: &str, phone: &str) -> Self {
        let start = Utc::now().date_naive();
        let end = start + Duration::days(30);
        Self {
            fields: vec![
                ("name".to_string(), name.to_string()),
                ("phone".to_string(), phone.to_string()),
                ("membershipType".to_string(), "monthly".to_string()),
                ("paymentStatus".to_string(), "paid".to_string()),
                ("startDate".to_string(), start.format("%Y-%m-%d").to_string()),
                ("endDate".to_string(), end.format("%Y-%m-%d").to_string()),
            ],
            photo: None,
        }
    }

    pub fn with(mut self, field: &str, value: &str) -> Self {
        self.fields.retain(|(name, _)| name != field);
        self.fields.push((field.to_string(), value.to_string()));
        self
    }

    pub fn with_photo(mut self, filename: &str, content_type: &str, bytes: &[u8]) -> Self {
        self.photo = Some((filename.to_string(), content_type.to_string(), bytes.to_vec()));
        self
    }

    pub fn encode(&self) -> Vec<u8> {
        let mut body = Vec::new();
        for (name, value) in &self.fields {
            body.extend_from_slice(
                format!(
                    "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{name}\"\r\n\r\n{value}\r\n"
                )
                .as_bytes(),
            );
        }
        if let Some((filename, content_type, bytes)) = &self.photo {
            body.extend_from_slice(
                format!(
                    "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"photo\"; filename=\"{filename}\"\r\nContent-Type: {content_type}\r\n\r\n"
                )
                .as_bytes(),
            );
            body.extend_from_slice(bytes);
            body.extend_from_slice(b"\r\n");
        }
        body.extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());
        body
    }
}

pub fn today() -> NaiveDate {
    Utc::now().date_naive()
}

/// Read the full response body as a String.
pub async fn body_string(resp: Response) -> String {
    let bytes = resp.into_body().collect().await.unwrap().to_bytes();
    String::from_utf8(bytes.to_vec()).unwrap()
}

/// Read the full response body as JSON.
pub async fn body_json(resp: Response) -> Value {
    serde_json::from_str(&body_string(resp).await).unwrap()
}
