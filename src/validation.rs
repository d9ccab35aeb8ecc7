use chrono::{DateTime, Datelike, NaiveDate};
use regex::Regex;
use serde::Deserialize;
use std::sync::LazyLock;
use thiserror::Error;

use crate::models::{MembershipType, PaymentStatus, SENTINEL_EMAIL};

static EMAIL_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("email pattern is valid"));

/// Raw member fields as submitted by a client. Every field is optional here;
/// presence is a validation rule, not a parse failure.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MemberInput {
    pub name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub membership_type: Option<String>,
    pub payment_status: Option<String>,
    pub start_date: Option<String>,
    pub end_date: Option<String>,
}

impl MemberInput {
    /// Assign a multipart text field by its wire name. Unknown names are ignored.
    pub fn set(&mut self, field: &str, value: String) {
        let slot = match field {
            "name" => &mut self.name,
            "email" => &mut self.email,
            "phone" => &mut self.phone,
            "membershipType" => &mut self.membership_type,
            "paymentStatus" => &mut self.payment_status,
            "startDate" => &mut self.start_date,
            "endDate" => &mut self.end_date,
            _ => return,
        };
        *slot = Some(value);
    }
}

/// Member fields after validation: trimmed, typed, email defaulted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidMember {
    pub name: String,
    pub email: String,
    pub phone: String,
    pub membership_type: MembershipType,
    pub payment_status: PaymentStatus,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
}

impl ValidMember {
    pub fn phone_digits(&self) -> String {
        digits_only(&self.phone)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("Name is required")]
    NameRequired,
    #[error("Name must be at least 2 characters long")]
    NameTooShort,
    #[error("Please enter a valid email address")]
    InvalidEmail,
    #[error("Phone is required")]
    PhoneRequired,
    #[error("Phone number must have at least 10 digits")]
    PhoneTooShort,
    #[error("Phone number cannot exceed 15 digits")]
    PhoneTooLong,
    #[error("Invalid Indian phone number format")]
    InvalidPhoneFormat,
    #[error("Invalid membership type")]
    InvalidMembershipType,
    #[error("Invalid payment status")]
    InvalidPaymentStatus,
    #[error("Start date is required")]
    StartDateRequired,
    #[error("Invalid start date format")]
    InvalidStartDate,
    #[error("End date is required")]
    EndDateRequired,
    #[error("Invalid end date format")]
    InvalidEndDate,
    #[error("End date must be after start date")]
    EndDateNotAfterStart,
}

/// Strip everything but ASCII digits.
pub fn digits_only(phone: &str) -> String {
    phone.chars().filter(|c| c.is_ascii_digit()).collect()
}

fn present(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

/// Accepts `YYYY-MM-DD` or a full RFC 3339 timestamp (date part kept).
/// Years are limited to four digits so stored dates sort as strings.
fn parse_date(value: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .ok()
        .or_else(|| DateTime::parse_from_rfc3339(value).ok().map(|dt| dt.date_naive()))
        .filter(|date| (0..=9999).contains(&date.year()))
}

/// Check the submitted fields in a fixed order and stop at the first failure.
/// Used unchanged for both create and update.
pub fn validate_member(input: &MemberInput) -> Result<ValidMember, ValidationError> {
    let name = present(&input.name).ok_or(ValidationError::NameRequired)?;
    if name.chars().count() < 2 {
        return Err(ValidationError::NameTooShort);
    }

    let email = match present(&input.email) {
        None => SENTINEL_EMAIL,
        Some(email) if email.eq_ignore_ascii_case(SENTINEL_EMAIL) => SENTINEL_EMAIL,
        Some(email) if EMAIL_RE.is_match(email) => email,
        Some(_) => return Err(ValidationError::InvalidEmail),
    };

    let phone = present(&input.phone).ok_or(ValidationError::PhoneRequired)?;
    let digits = digits_only(phone);
    match digits.len() {
        n if n < 10 => return Err(ValidationError::PhoneTooShort),
        n if n > 15 => return Err(ValidationError::PhoneTooLong),
        10 if !digits.starts_with(['6', '7', '8', '9']) => {
            return Err(ValidationError::InvalidPhoneFormat);
        }
        _ => {}
    }

    let membership_type = present(&input.membership_type)
        .and_then(|v| v.parse::<MembershipType>().ok())
        .ok_or(ValidationError::InvalidMembershipType)?;

    let payment_status = present(&input.payment_status)
        .and_then(|v| v.parse::<PaymentStatus>().ok())
        .ok_or(ValidationError::InvalidPaymentStatus)?;

    let start_date = present(&input.start_date).ok_or(ValidationError::StartDateRequired)?;
    let start_date = parse_date(start_date).ok_or(ValidationError::InvalidStartDate)?;

    let end_date = present(&input.end_date).ok_or(ValidationError::EndDateRequired)?;
    let end_date = parse_date(end_date).ok_or(ValidationError::InvalidEndDate)?;
    if end_date <= start_date {
        return Err(ValidationError::EndDateNotAfterStart);
    }

    Ok(ValidMember {
        name: name.to_string(),
        email: email.to_string(),
        phone: phone.to_string(),
        membership_type,
        payment_status,
        start_date,
        end_date,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid_input() -> MemberInput {
        MemberInput {
            name: Some("  Ravi Kumar ".to_string()),
            email: Some(" ravi@example.com ".to_string()),
            phone: Some(" 9876543210 ".to_string()),
            membership_type: Some("monthly".to_string()),
            payment_status: Some("paid".to_string()),
            start_date: Some("2025-01-01".to_string()),
            end_date: Some("2025-02-01".to_string()),
        }
    }

    #[test]
    fn valid_input_is_trimmed_and_typed() {
        let member = validate_member(&valid_input()).unwrap();
        assert_eq!(member.name, "Ravi Kumar");
        assert_eq!(member.email, "ravi@example.com");
        assert_eq!(member.phone, "9876543210");
        assert_eq!(member.membership_type, MembershipType::Monthly);
        assert_eq!(member.payment_status, PaymentStatus::Paid);
        assert!(member.end_date > member.start_date);
    }

    #[test]
    fn blank_or_missing_email_defaults_to_sentinel() {
        let mut input = valid_input();
        input.email = Some("   ".to_string());
        assert_eq!(validate_member(&input).unwrap().email, SENTINEL_EMAIL);

        input.email = None;
        assert_eq!(validate_member(&input).unwrap().email, SENTINEL_EMAIL);
    }

    #[test]
    fn malformed_email_is_rejected() {
        for bad in ["ravi", "ravi@example", "ra vi@example.com", "@example.com"] {
            let mut input = valid_input();
            input.email = Some(bad.to_string());
            assert_eq!(
                validate_member(&input),
                Err(ValidationError::InvalidEmail),
                "{bad}"
            );
        }
    }

    #[test]
    fn name_rules() {
        let mut input = valid_input();
        input.name = None;
        assert_eq!(validate_member(&input), Err(ValidationError::NameRequired));

        input.name = Some("   ".to_string());
        assert_eq!(validate_member(&input), Err(ValidationError::NameRequired));

        input.name = Some(" A ".to_string());
        assert_eq!(validate_member(&input), Err(ValidationError::NameTooShort));
    }

    #[test]
    fn phone_digit_count_bounds() {
        let mut input = valid_input();

        input.phone = Some("98765-4321".to_string());
        assert_eq!(validate_member(&input), Err(ValidationError::PhoneTooShort));

        input.phone = Some("1234567890123456".to_string());
        assert_eq!(validate_member(&input), Err(ValidationError::PhoneTooLong));

        input.phone = None;
        assert_eq!(validate_member(&input), Err(ValidationError::PhoneRequired));
    }

    #[test]
    fn ten_digit_phone_must_start_with_six_to_nine() {
        let mut input = valid_input();
        for lead in '0'..='5' {
            input.phone = Some(format!("{lead}123456789"));
            assert_eq!(
                validate_member(&input),
                Err(ValidationError::InvalidPhoneFormat)
            );
        }
        for lead in '6'..='9' {
            input.phone = Some(format!("{lead}123456789"));
            assert!(validate_member(&input).is_ok());
        }
    }

    #[test]
    fn longer_phone_ignores_leading_digit() {
        let mut input = valid_input();
        for phone in ["+1 (555) 123-4567", "01234567890", "123456789012345"] {
            input.phone = Some(phone.to_string());
            let member = validate_member(&input).unwrap();
            assert_eq!(member.phone, phone);
        }
    }

    #[test]
    fn enum_fields_must_be_known_values() {
        let mut input = valid_input();
        input.membership_type = Some("weekly".to_string());
        assert_eq!(
            validate_member(&input),
            Err(ValidationError::InvalidMembershipType)
        );

        let mut input = valid_input();
        input.payment_status = None;
        assert_eq!(
            validate_member(&input),
            Err(ValidationError::InvalidPaymentStatus)
        );
    }

    #[test]
    fn date_rules() {
        let mut input = valid_input();
        input.start_date = None;
        assert_eq!(validate_member(&input), Err(ValidationError::StartDateRequired));

        input.start_date = Some("not-a-date".to_string());
        assert_eq!(validate_member(&input), Err(ValidationError::InvalidStartDate));

        let mut input = valid_input();
        input.end_date = Some("".to_string());
        assert_eq!(validate_member(&input), Err(ValidationError::EndDateRequired));

        input.end_date = Some("2025-13-01".to_string());
        assert_eq!(validate_member(&input), Err(ValidationError::InvalidEndDate));
    }

    #[test]
    fn years_beyond_four_digits_are_rejected() {
        let mut input = valid_input();
        input.end_date = Some("+10000-01-01".to_string());
        assert_eq!(validate_member(&input), Err(ValidationError::InvalidEndDate));

        input.end_date = Some("9999-12-31".to_string());
        assert!(validate_member(&input).is_ok());

        input.start_date = Some("-0001-01-01".to_string());
        assert_eq!(validate_member(&input), Err(ValidationError::InvalidStartDate));
    }

    #[test]
    fn placeholder_email_in_any_case_is_normalized() {
        let mut input = valid_input();
        input.email = Some("MEMBER@REVIVEFITNESS.COM".to_string());
        assert_eq!(validate_member(&input).unwrap().email, SENTINEL_EMAIL);
    }

    #[test]
    fn end_date_must_be_strictly_after_start_date() {
        let mut input = valid_input();
        input.end_date = input.start_date.clone();
        assert_eq!(
            validate_member(&input),
            Err(ValidationError::EndDateNotAfterStart)
        );

        input.end_date = Some("2024-12-31".to_string());
        assert_eq!(
            validate_member(&input),
            Err(ValidationError::EndDateNotAfterStart)
        );
    }

    #[test]
    fn timestamp_dates_keep_their_date_part() {
        let mut input = valid_input();
        input.start_date = Some("2025-03-01T00:00:00.000Z".to_string());
        input.end_date = Some("2025-06-01".to_string());
        let member = validate_member(&input).unwrap();
        assert_eq!(member.start_date, NaiveDate::from_ymd_opt(2025, 3, 1).unwrap());
    }

    #[test]
    fn first_failing_rule_wins() {
        let input = MemberInput::default();
        assert_eq!(validate_member(&input), Err(ValidationError::NameRequired));

        let mut input = valid_input();
        input.phone = Some("1".to_string());
        input.membership_type = Some("bogus".to_string());
        assert_eq!(validate_member(&input), Err(ValidationError::PhoneTooShort));
    }

    #[test]
    fn multipart_field_names_map_to_slots() {
        let mut input = MemberInput::default();
        input.set("membershipType", "yearly".to_string());
        input.set("photo", "ignored".to_string());
        assert_eq!(input.membership_type.as_deref(), Some("yearly"));
    }
}
