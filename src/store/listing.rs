use chrono::NaiveDate;
use tracing::debug;

use super::{MemberStore, StoreError, member_columns};
use crate::models::{Member, PaymentStatus};

pub const DEFAULT_PAGE_SIZE: u32 = 20;
pub const MAX_PAGE_SIZE: u32 = 100;

#[derive(Debug, Clone)]
pub struct ListQuery {
    /// Case-insensitive substring matched against name or email.
    pub search: Option<String>,
    /// `None` means every status.
    pub status: Option<PaymentStatus>,
    /// 1-indexed.
    pub page: u32,
    pub limit: u32,
}

impl Default for ListQuery {
    fn default() -> Self {
        Self {
            search: None,
            status: None,
            page: 1,
            limit: DEFAULT_PAGE_SIZE,
        }
    }
}

impl ListQuery {
    fn page(&self) -> u32 {
        self.page.max(1)
    }

    fn limit(&self) -> u32 {
        self.limit.clamp(1, MAX_PAGE_SIZE)
    }
}

#[derive(Debug)]
pub struct MemberPage {
    pub members: Vec<Member>,
    pub page: u32,
    pub total: i64,
    pub total_pages: i64,
    pub has_more: bool,
}

macro_rules! list_filter {
    () => {
        r#"
        WHERE (? IS NULL OR name LIKE ? ESCAPE '\' OR email LIKE ? ESCAPE '\')
          AND (? IS NULL OR payment_status = ?)
        "#
    };
}

// Unpaid accounts are triaged most-recently-expired first, i.e. fewest days
// since the end date; everything else is newest member first.
const ORDER_UNPAID: &str = " ORDER BY end_date DESC, created_at DESC, rowid DESC LIMIT ? OFFSET ?";
const ORDER_DEFAULT: &str = " ORDER BY created_at DESC, rowid DESC LIMIT ? OFFSET ?";

fn like_pattern(search: &str) -> String {
    let escaped = search
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_");
    format!("%{escaped}%")
}

impl MemberStore {
    /// Filtered, ordered, paginated member listing. Runs the expiry sweep
    /// first so payment statuses are current.
    pub async fn list(&self, query: &ListQuery, today: NaiveDate) -> Result<MemberPage, StoreError> {
        self.auto_expire(today).await?;

        let page = query.page();
        let limit = query.limit();
        let offset = i64::from(page - 1) * i64::from(limit);

        let pattern = query
            .search
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(like_pattern);
        let status = query.status.map(|s| s.as_str());

        let (total,): (i64,) =
            sqlx::query_as(concat!("SELECT COUNT(*) FROM members", list_filter!()))
                .bind(&pattern)
                .bind(&pattern)
                .bind(&pattern)
                .bind(status)
                .bind(status)
                .fetch_one(self.pool())
                .await?;

        let order = match query.status {
            Some(PaymentStatus::Unpaid) => ORDER_UNPAID,
            _ => ORDER_DEFAULT,
        };
        let sql = format!(
            concat!("SELECT ", member_columns!(), " FROM members", list_filter!(), "{}"),
            order
        );

        let members: Vec<Member> = sqlx::query_as(&sql)
            .bind(&pattern)
            .bind(&pattern)
            .bind(&pattern)
            .bind(status)
            .bind(status)
            .bind(i64::from(limit))
            .bind(offset)
            .fetch_all(self.pool())
            .await?;

        let limit = i64::from(limit);
        let total_pages = (total + limit - 1) / limit;

        debug!(
            search = ?query.search,
            ?status,
            page,
            total,
            returned = members.len(),
            "listed members"
        );

        Ok(MemberPage {
            members,
            page,
            total,
            total_pages,
            has_more: i64::from(page) < total_pages,
        })
    }
}
