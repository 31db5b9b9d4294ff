#![allow(dead_code)]

use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use httpmock::Method::GET;
use httpmock::{Mock, MockServer};
use serde_json::json;
use uuid::Uuid;

use course_checkout::AppState;
use course_checkout::config::{Config, Secret};
use course_checkout::db::{EnrollmentStore, StoreError};
use course_checkout::models::{Course, Enrollment, EnrollmentStatus, Lesson, NewEnrollment};

pub const GATEWAY_SECRET: &str = "test_sk_secret";
/// base64("test_sk_secret:")
pub const GATEWAY_BASIC_AUTH: &str = "Basic dGVzdF9za19zZWNyZXQ6";
pub const AUTH_API_KEY: &str = "test-anon-key";
pub const VALID_TOKEN: &str = "valid-access-token";

/// Enrollments table with the (user, course) uniqueness of the real schema.
#[derive(Default)]
pub struct InMemoryStore {
    pub courses: Mutex<Vec<Course>>,
    pub lessons: Mutex<Vec<Lesson>>,
    pub enrollments: Mutex<Vec<Enrollment>>,
    pub fail_inserts: Mutex<bool>,
}

impl InMemoryStore {
    pub fn add_course(&self, title: &str) -> Uuid {
        let now = Utc::now();
        let id = Uuid::new_v4();
        self.courses.lock().unwrap().push(Course {
            id,
            title: title.to_string(),
            instructor: "Instructor".to_string(),
            price: 89000,
            original_price: None,
            thumbnail_url: None,
            duration: None,
            is_published: true,
            created_at: now,
            updated_at: now,
        });
        id
    }

    pub fn add_lesson(&self, course_id: Uuid, title: &str, order_index: i32) -> Uuid {
        let now = Utc::now();
        let id = Uuid::new_v4();
        self.lessons.lock().unwrap().push(Lesson {
            id,
            course_id,
            title: title.to_string(),
            video_url: None,
            order_index,
            duration: None,
            is_preview: false,
            created_at: now,
            updated_at: now,
        });
        id
    }

    pub fn enrollments(&self) -> Vec<Enrollment> {
        self.enrollments.lock().unwrap().clone()
    }
}

#[async_trait]
impl EnrollmentStore for InMemoryStore {
    async fn find_course(&self, course_id: Uuid) -> Result<Option<Course>, StoreError> {
        Ok(self
            .courses
            .lock()
            .unwrap()
            .iter()
            .find(|c| c.id == course_id)
            .cloned())
    }

    async fn list_lessons(&self, course_id: Uuid) -> Result<Vec<Lesson>, StoreError> {
        let mut lessons: Vec<Lesson> = self
            .lessons
            .lock()
            .unwrap()
            .iter()
            .filter(|l| l.course_id == course_id)
            .cloned()
            .collect();
        lessons.sort_by_key(|l| l.order_index);
        Ok(lessons)
    }

    async fn find_completed_enrollment(
        &self,
        user_id: Uuid,
        course_id: Uuid,
    ) -> Result<Option<Enrollment>, StoreError> {
        Ok(self
            .enrollments
            .lock()
            .unwrap()
            .iter()
            .find(|e| {
                e.user_id == user_id
                    && e.course_id == course_id
                    && e.status == EnrollmentStatus::Completed
            })
            .cloned())
    }

    async fn insert_completed_enrollment(
        &self,
        new: NewEnrollment,
    ) -> Result<Enrollment, StoreError> {
        if *self.fail_inserts.lock().unwrap() {
            return Err(StoreError::InvalidRow("simulated store outage".to_string()));
        }

        let mut rows = self.enrollments.lock().unwrap();
        if rows.iter().any(|e| {
            e.user_id == new.user_id
                && e.course_id == new.course_id
                && e.status == EnrollmentStatus::Completed
        }) {
            return Err(StoreError::Conflict {
                constraint: Some("enrollments_user_course_completed_key".to_string()),
            });
        }

        let now = Utc::now();
        let row = Enrollment {
            id: Uuid::new_v4(),
            user_id: new.user_id,
            course_id: new.course_id,
            payment_key: new.payment_key,
            order_id: new.order_id,
            amount: new.amount,
            payment_method: new.payment_method,
            status: EnrollmentStatus::Completed,
            approved_at: Some(new.approved_at),
            created_at: now,
            updated_at: now,
        };
        rows.push(row.clone());
        Ok(row)
    }
}

pub fn test_config(gateway: &MockServer, auth: &MockServer) -> Config {
    Config {
        bind_addr: "127.0.0.1".to_string(),
        port: 0,
        database_url: Secret::new("postgres://unused/unused"),
        toss_secret_key: Some(Secret::new(GATEWAY_SECRET)),
        toss_api_base: gateway.base_url(),
        auth_url: Some(auth.base_url()),
        auth_api_key: Some(Secret::new(AUTH_API_KEY)),
        gateway_timeout: Duration::from_secs(5),
    }
}

pub fn build_state(config: Config, store: Arc<InMemoryStore>) -> AppState {
    AppState::new(config, store).expect("http client")
}

/// Auth service that knows exactly one token.
pub async fn mock_auth_user<'a>(auth: &'a MockServer, user_id: Uuid) -> Mock<'a> {
    auth.mock_async(|when, then| {
        when.method(GET)
            .path("/auth/v1/user")
            .header("apikey", AUTH_API_KEY)
            .header("Authorization", format!("Bearer {VALID_TOKEN}"));
        then.status(200)
            .json_body(json!({ "id": user_id.to_string(), "email": "buyer@example.com" }));
    })
    .await
}

pub fn confirmed_payment(payment_key: &str, order_id: &str, total_amount: i64) -> serde_json::Value {
    json!({
        "mId": "tvivarepublica",
        "paymentKey": payment_key,
        "orderId": order_id,
        "orderName": "Course",
        "status": "DONE",
        "method": "카드",
        "totalAmount": total_amount,
        "balanceAmount": total_amount,
        "requestedAt": "2024-02-05T18:37:10+09:00",
        "approvedAt": "2024-02-05T18:38:27+09:00"
    })
}
