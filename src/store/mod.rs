//! Persistence for the `members` table.
//!
//! [`MemberStore`] is constructed once at startup around the connection pool
//! and handed to request handlers through `AppState`. Uniqueness of email and
//! phone is enforced by the database's unique indexes; violations come back as
//! [`StoreError::Conflict`].

use chrono::{NaiveDate, Utc};
use sqlx::SqlitePool;
use thiserror::Error;
use uuid::Uuid;

use crate::models::{Member, SENTINEL_EMAIL};
use crate::validation::{ValidMember, digits_only};

/// Column list matching [`Member`]'s fields.
macro_rules! member_columns {
    () => {
        "id, name, email, phone, membership_type, start_date, end_date, payment_status, photo_url, created_at, updated_at"
    };
}
pub(crate) use member_columns;

mod expiry;
mod listing;
mod stats;

pub use expiry::today;
pub use listing::{ListQuery, MemberPage};
pub use stats::DashboardStats;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConflictField {
    Email,
    Phone,
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("member not found")]
    NotFound,
    #[error("{0:?} already exists")]
    Conflict(ConflictField),
    #[error("database error: {0}")]
    Database(#[source] sqlx::Error),
}

impl From<sqlx::Error> for StoreError {
    fn from(e: sqlx::Error) -> Self {
        if let sqlx::Error::Database(db) = &e {
            if db.is_unique_violation() {
                let field = if db.message().contains("phone") {
                    ConflictField::Phone
                } else {
                    ConflictField::Email
                };
                return StoreError::Conflict(field);
            }
        }
        StoreError::Database(e)
    }
}

/// Result of an update: the row as written plus the photo reference it had
/// before, which the caller may hand to the photo host for cleanup.
#[derive(Debug)]
pub struct UpdatedMember {
    pub member: Member,
    pub old_photo_url: Option<String>,
}

#[derive(Debug)]
pub struct DeletedMember {
    pub photo_url: Option<String>,
}

pub(crate) fn date_key(date: NaiveDate) -> String {
    date.format("%Y-%m-%d").to_string()
}

#[derive(Clone)]
pub struct MemberStore {
    pool: SqlitePool,
}

impl MemberStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    pub async fn create(
        &self,
        record: &ValidMember,
        photo_url: Option<&str>,
    ) -> Result<Member, StoreError> {
        let id = Uuid::new_v4().to_string();
        let now = Utc::now().to_rfc3339();

        let member: Member = sqlx::query_as(concat!(
            r#"
            INSERT INTO members (id, name, email, phone, phone_digits, membership_type,
                start_date, end_date, payment_status, photo_url, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            RETURNING "#,
            member_columns!()
        ))
        .bind(&id)
        .bind(&record.name)
        .bind(&record.email)
        .bind(&record.phone)
        .bind(record.phone_digits())
        .bind(record.membership_type)
        .bind(date_key(record.start_date))
        .bind(date_key(record.end_date))
        .bind(record.payment_status)
        .bind(photo_url)
        .bind(&now)
        .bind(&now)
        .fetch_one(&self.pool)
        .await?;

        Ok(member)
    }

    pub async fn get_by_id(&self, id: &str) -> Result<Member, StoreError> {
        let member: Option<Member> =
            sqlx::query_as(concat!("SELECT ", member_columns!(), " FROM members WHERE id = ?"))
                .bind(id)
                .fetch_optional(&self.pool)
                .await?;

        member.ok_or(StoreError::NotFound)
    }

    /// Replace every mutable field. Without a new `photo_url` the stored one is kept.
    pub async fn update(
        &self,
        id: &str,
        record: &ValidMember,
        photo_url: Option<&str>,
    ) -> Result<UpdatedMember, StoreError> {
        // Take the write lock up front so the read below cannot go stale under WAL.
        let mut tx = self.pool.begin_with("BEGIN IMMEDIATE").await?;

        let existing: Option<(Option<String>,)> =
            sqlx::query_as("SELECT photo_url FROM members WHERE id = ?")
                .bind(id)
                .fetch_optional(&mut *tx)
                .await?;

        let Some((old_photo_url,)) = existing else {
            return Err(StoreError::NotFound);
        };

        let photo_url = photo_url.map(str::to_string).or_else(|| old_photo_url.clone());
        let now = Utc::now().to_rfc3339();

        let member: Member = sqlx::query_as(concat!(
            r#"
            UPDATE members
            SET name = ?, email = ?, phone = ?, phone_digits = ?, membership_type = ?,
                start_date = ?, end_date = ?, payment_status = ?, photo_url = ?, updated_at = ?
            WHERE id = ?
            RETURNING "#,
            member_columns!()
        ))
        .bind(&record.name)
        .bind(&record.email)
        .bind(&record.phone)
        .bind(record.phone_digits())
        .bind(record.membership_type)
        .bind(date_key(record.start_date))
        .bind(date_key(record.end_date))
        .bind(record.payment_status)
        .bind(&photo_url)
        .bind(&now)
        .bind(id)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;

        Ok(UpdatedMember {
            member,
            old_photo_url,
        })
    }

    pub async fn delete(&self, id: &str) -> Result<DeletedMember, StoreError> {
        let deleted: Option<(Option<String>,)> =
            sqlx::query_as("DELETE FROM members WHERE id = ? RETURNING photo_url")
                .bind(id)
                .fetch_optional(&self.pool)
                .await?;

        deleted
            .map(|(photo_url,)| DeletedMember { photo_url })
            .ok_or(StoreError::NotFound)
    }

    /// Whether another member already uses this phone number, comparing digits only.
    pub async fn phone_exists(
        &self,
        phone: &str,
        exclude_id: Option<&str>,
    ) -> Result<bool, StoreError> {
        let digits = digits_only(phone);
        if digits.is_empty() {
            return Ok(false);
        }

        let found: Option<(i64,)> = sqlx::query_as(
            "SELECT 1 FROM members WHERE phone_digits = ? AND (? IS NULL OR id <> ?) LIMIT 1",
        )
        .bind(&digits)
        .bind(exclude_id)
        .bind(exclude_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(found.is_some())
    }

    /// Case-insensitive email lookup. The placeholder address never counts as taken.
    pub async fn email_exists(
        &self,
        email: &str,
        exclude_id: Option<&str>,
    ) -> Result<bool, StoreError> {
        let email = email.trim();
        if email.is_empty() || email.eq_ignore_ascii_case(SENTINEL_EMAIL) {
            return Ok(false);
        }

        let found: Option<(i64,)> = sqlx::query_as(
            "SELECT 1 FROM members WHERE LOWER(email) = LOWER(?) AND (? IS NULL OR id <> ?) LIMIT 1",
        )
        .bind(email)
        .bind(exclude_id)
        .bind(exclude_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(found.is_some())
    }
}
