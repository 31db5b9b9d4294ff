pub mod auth;
pub mod cors;
pub mod enrollments;
pub mod payments;
pub mod toss_client;
