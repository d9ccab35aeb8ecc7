pub mod admin;
pub mod member;

pub use admin::Admin;
pub use member::{ExpiredMember, Member, MembershipType, PaymentStatus, SENTINEL_EMAIL};
