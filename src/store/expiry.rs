use chrono::{NaiveDate, Utc};
use tracing::info;

use super::{MemberStore, StoreError, date_key};
use crate::models::ExpiredMember;

/// The calendar date (UTC) that membership end dates are compared against.
pub fn today() -> NaiveDate {
    Utc::now().date_naive()
}

impl MemberStore {
    /// Mark every paid member whose end date is before `today` as unpaid and
    /// return the rows that changed.
    ///
    /// This is a single conditional `UPDATE ... RETURNING`, so concurrent
    /// sweeps never report the same member twice and a second run with no
    /// writes in between returns nothing. It must run before any read that
    /// reports payment status (listing, dashboard) and is also driven by the
    /// background scheduler.
    pub async fn auto_expire(&self, today: NaiveDate) -> Result<Vec<ExpiredMember>, StoreError> {
        let now = Utc::now().to_rfc3339();

        let expired: Vec<ExpiredMember> = sqlx::query_as(
            r#"
            UPDATE members
            SET payment_status = 'unpaid', updated_at = ?
            WHERE end_date < ? AND payment_status = 'paid'
            RETURNING id, name, email
            "#,
        )
        .bind(&now)
        .bind(date_key(today))
        .fetch_all(self.pool())
        .await?;

        if !expired.is_empty() {
            let names: Vec<&str> = expired.iter().map(|m| m.name.as_str()).collect();
            info!(expired = expired.len(), ?names, "auto-expired members");
        }

        Ok(expired)
    }
}
