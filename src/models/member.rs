use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use std::str::FromStr;

/// Placeholder address stored when a member has no email. Exempt from uniqueness.
pub const SENTINEL_EMAIL: &str = "member@revivefitness.com";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "TEXT")]
pub enum MembershipType {
    #[serde(rename = "monthly")]
    #[sqlx(rename = "monthly")]
    Monthly,
    #[serde(rename = "quarterly")]
    #[sqlx(rename = "quarterly")]
    Quarterly,
    #[serde(rename = "yearly")]
    #[sqlx(rename = "yearly")]
    Yearly,
}

impl MembershipType {
    pub fn as_str(&self) -> &'static str {
        match self {
            MembershipType::Monthly => "monthly",
            MembershipType::Quarterly => "quarterly",
            MembershipType::Yearly => "yearly",
        }
    }
}

impl std::fmt::Display for MembershipType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MembershipType {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "monthly" => Ok(MembershipType::Monthly),
            "quarterly" => Ok(MembershipType::Quarterly),
            "yearly" => Ok(MembershipType::Yearly),
            _ => Err(()),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "TEXT")]
pub enum PaymentStatus {
    #[serde(rename = "paid")]
    #[sqlx(rename = "paid")]
    Paid,
    #[serde(rename = "unpaid")]
    #[sqlx(rename = "unpaid")]
    Unpaid,
}

impl PaymentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentStatus::Paid => "paid",
            PaymentStatus::Unpaid => "unpaid",
        }
    }
}

impl std::fmt::Display for PaymentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PaymentStatus {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "paid" => Ok(PaymentStatus::Paid),
            "unpaid" => Ok(PaymentStatus::Unpaid),
            _ => Err(()),
        }
    }
}

/// A member row. Dates are `YYYY-MM-DD`, timestamps RFC 3339.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Member {
    pub id: String,
    pub name: String,
    pub email: String,
    pub phone: String,
    pub membership_type: MembershipType,
    pub start_date: String,
    pub end_date: String,
    pub payment_status: PaymentStatus,
    pub photo_url: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

/// Row reported by the expiry sweep.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, PartialEq, Eq)]
pub struct ExpiredMember {
    pub id: String,
    pub name: String,
    pub email: String,
}
