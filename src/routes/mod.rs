pub mod auth;
pub mod dashboard;
pub mod expiry;
pub mod members;
