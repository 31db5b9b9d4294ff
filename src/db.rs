// src/db.rs

use async_trait::async_trait;
use sqlx::postgres::PgRow;
use sqlx::{PgPool, Row};
use thiserror::Error;
use uuid::Uuid;

use crate::models::{Course, Enrollment, EnrollmentStatus, Lesson, NewEnrollment};

#[derive(Debug, Error)]
pub enum StoreError {
    /// A unique index rejected the write.
    #[error("unique constraint violated: {}", .constraint.as_deref().unwrap_or("unknown"))]
    Conflict { constraint: Option<String> },

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("invalid row: {0}")]
    InvalidRow(String),
}

/// Tables consumed by the checkout flow. `courses` and `lessons` are read-only here.
#[async_trait]
pub trait EnrollmentStore: Send + Sync {
    async fn find_course(&self, course_id: Uuid) -> Result<Option<Course>, StoreError>;

    async fn list_lessons(&self, course_id: Uuid) -> Result<Vec<Lesson>, StoreError>;

    async fn find_completed_enrollment(
        &self,
        user_id: Uuid,
        course_id: Uuid,
    ) -> Result<Option<Enrollment>, StoreError>;

    /// Inserts a `completed` row. A second grant for the same (user, course)
    /// surfaces as [`StoreError::Conflict`].
    async fn insert_completed_enrollment(
        &self,
        new: NewEnrollment,
    ) -> Result<Enrollment, StoreError>;
}

pub struct PgEnrollmentStore {
    pool: PgPool,
}

impl PgEnrollmentStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

const ENROLLMENT_COLUMNS: &str = "id, user_id, course_id, payment_key, order_id, amount, \
     payment_method, status, approved_at, created_at, updated_at";

fn course_from_row(r: &PgRow) -> Result<Course, sqlx::Error> {
    Ok(Course {
        id: r.try_get("id")?,
        title: r.try_get("title")?,
        instructor: r.try_get("instructor")?,
        price: r.try_get("price")?,
        original_price: r.try_get("original_price")?,
        thumbnail_url: r.try_get("thumbnail_url")?,
        duration: r.try_get("duration")?,
        is_published: r.try_get("is_published")?,
        created_at: r.try_get("created_at")?,
        updated_at: r.try_get("updated_at")?,
    })
}

fn lesson_from_row(r: &PgRow) -> Result<Lesson, sqlx::Error> {
    Ok(Lesson {
        id: r.try_get("id")?,
        course_id: r.try_get("course_id")?,
        title: r.try_get("title")?,
        video_url: r.try_get("video_url")?,
        order_index: r.try_get("order_index")?,
        duration: r.try_get("duration")?,
        is_preview: r.try_get("is_preview")?,
        created_at: r.try_get("created_at")?,
        updated_at: r.try_get("updated_at")?,
    })
}

fn enrollment_from_row(r: &PgRow) -> Result<Enrollment, StoreError> {
    let status: String = r.try_get("status")?;
    Ok(Enrollment {
        id: r.try_get("id")?,
        user_id: r.try_get("user_id")?,
        course_id: r.try_get("course_id")?,
        payment_key: r.try_get("payment_key")?,
        order_id: r.try_get("order_id")?,
        amount: r.try_get("amount")?,
        payment_method: r.try_get("payment_method")?,
        status: status.parse::<EnrollmentStatus>().map_err(StoreError::InvalidRow)?,
        approved_at: r.try_get("approved_at")?,
        created_at: r.try_get("created_at")?,
        updated_at: r.try_get("updated_at")?,
    })
}

#[async_trait]
impl EnrollmentStore for PgEnrollmentStore {
    async fn find_course(&self, course_id: Uuid) -> Result<Option<Course>, StoreError> {
        let row = sqlx::query(
            r#"SELECT id, title, instructor, price, original_price, thumbnail_url, duration,
                      is_published, created_at, updated_at
               FROM courses
               WHERE id = $1"#,
        )
        .bind(course_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.as_ref().map(course_from_row).transpose()?)
    }

    async fn list_lessons(&self, course_id: Uuid) -> Result<Vec<Lesson>, StoreError> {
        let rows = sqlx::query(
            r#"SELECT id, course_id, title, video_url, order_index, duration, is_preview,
                      created_at, updated_at
               FROM lessons
               WHERE course_id = $1
               ORDER BY order_index ASC"#,
        )
        .bind(course_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .iter()
            .map(lesson_from_row)
            .collect::<Result<Vec<_>, _>>()?)
    }

    async fn find_completed_enrollment(
        &self,
        user_id: Uuid,
        course_id: Uuid,
    ) -> Result<Option<Enrollment>, StoreError> {
        let row = sqlx::query(&format!(
            "SELECT {ENROLLMENT_COLUMNS} FROM enrollments \
             WHERE user_id = $1 AND course_id = $2 AND status = 'completed'"
        ))
        .bind(user_id)
        .bind(course_id)
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(enrollment_from_row).transpose()
    }

    async fn insert_completed_enrollment(
        &self,
        new: NewEnrollment,
    ) -> Result<Enrollment, StoreError> {
        let result = sqlx::query(&format!(
            "INSERT INTO enrollments \
                 (user_id, course_id, payment_key, order_id, amount, payment_method, status, approved_at) \
             VALUES ($1, $2, $3, $4, $5, $6, 'completed', $7) \
             RETURNING {ENROLLMENT_COLUMNS}"
        ))
        .bind(new.user_id)
        .bind(new.course_id)
        .bind(&new.payment_key)
        .bind(&new.order_id)
        .bind(new.amount)
        .bind(new.payment_method.as_deref())
        .bind(new.approved_at)
        .fetch_one(&self.pool)
        .await;

        match result {
            Ok(row) => enrollment_from_row(&row),
            Err(sqlx::Error::Database(e)) if e.is_unique_violation() => Err(StoreError::Conflict {
                constraint: e.constraint().map(str::to_string),
            }),
            Err(e) => Err(e.into()),
        }
    }
}
