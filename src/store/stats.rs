use chrono::{Duration, NaiveDate};
use serde::Serialize;

use super::{MemberStore, StoreError, date_key, member_columns};
use crate::models::Member;

/// Members whose end date falls within this many days from today (inclusive) are "expiring".
pub const EXPIRING_WINDOW_DAYS: i64 = 7;

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct DashboardStats {
    pub total_members: i64,
    pub active_members: i64,
    pub unpaid_members: i64,
    pub expiring_members: i64,
}

impl MemberStore {
    pub async fn stats(&self, today: NaiveDate) -> Result<DashboardStats, StoreError> {
        self.auto_expire(today).await?;

        let horizon = today + Duration::days(EXPIRING_WINDOW_DAYS);

        let (total_members, active_members, unpaid_members, expiring_members): (i64, i64, i64, i64) =
            sqlx::query_as(
                r#"
                SELECT
                    COUNT(*),
                    COALESCE(SUM(payment_status = 'paid'), 0),
                    COALESCE(SUM(payment_status = 'unpaid'), 0),
                    COALESCE(SUM(end_date >= ? AND end_date <= ?), 0)
                FROM members
                "#,
            )
            .bind(date_key(today))
            .bind(date_key(horizon))
            .fetch_one(self.pool())
            .await?;

        Ok(DashboardStats {
            total_members,
            active_members,
            unpaid_members,
            expiring_members,
        })
    }

    /// Members ending between today and the expiring window, soonest first.
    pub async fn expiring(&self, today: NaiveDate) -> Result<Vec<Member>, StoreError> {
        self.auto_expire(today).await?;

        let horizon = today + Duration::days(EXPIRING_WINDOW_DAYS);

        let members: Vec<Member> = sqlx::query_as(concat!(
            "SELECT ",
            member_columns!(),
            " FROM members WHERE end_date >= ? AND end_date <= ? ORDER BY end_date ASC, name ASC"
        ))
        .bind(date_key(today))
        .bind(date_key(horizon))
        .fetch_all(self.pool())
        .await?;

        Ok(members)
    }
}
