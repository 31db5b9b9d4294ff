// src/models.rs

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct Course {
    pub id: Uuid,
    pub title: String,
    pub instructor: String,
    pub price: i64,
    pub original_price: Option<i64>,
    pub thumbnail_url: Option<String>,
    pub duration: Option<String>,
    pub is_published: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct Lesson {
    pub id: Uuid,
    pub course_id: Uuid,
    pub title: String,
    pub video_url: Option<String>,
    pub order_index: i32,
    pub duration: Option<String>,
    pub is_preview: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum EnrollmentStatus {
    Pending,
    Completed,
    Failed,
}

impl EnrollmentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            EnrollmentStatus::Pending => "pending",
            EnrollmentStatus::Completed => "completed",
            EnrollmentStatus::Failed => "failed",
        }
    }
}

impl fmt::Display for EnrollmentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EnrollmentStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(EnrollmentStatus::Pending),
            "completed" => Ok(EnrollmentStatus::Completed),
            "failed" => Ok(EnrollmentStatus::Failed),
            other => Err(format!("unknown enrollment status: {other}")),
        }
    }
}

/// One purchased access grant. Rows are serialized with their column names.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct Enrollment {
    pub id: Uuid,
    pub user_id: Uuid,
    pub course_id: Uuid,
    pub payment_key: String,
    pub order_id: String,
    /// Gateway-confirmed total, minor currency unit.
    pub amount: i64,
    pub payment_method: Option<String>,
    pub status: EnrollmentStatus,
    pub approved_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Values for a `completed` enrollment, taken from the gateway's confirmation.
#[derive(Debug, Clone)]
pub struct NewEnrollment {
    pub user_id: Uuid,
    pub course_id: Uuid,
    pub payment_key: String,
    pub order_id: String,
    pub amount: i64,
    pub payment_method: Option<String>,
    pub approved_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_round_trips_through_text() {
        for status in [
            EnrollmentStatus::Pending,
            EnrollmentStatus::Completed,
            EnrollmentStatus::Failed,
        ] {
            assert_eq!(status.as_str().parse::<EnrollmentStatus>(), Ok(status));
        }
        assert!("refunded".parse::<EnrollmentStatus>().is_err());
    }

    #[test]
    fn status_serializes_lowercase() {
        let json = serde_json::to_value(EnrollmentStatus::Completed).unwrap();
        assert_eq!(json, serde_json::json!("completed"));
    }
}
