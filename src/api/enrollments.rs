// src/api/enrollments.rs

use actix_web::{HttpRequest, HttpResponse, get, web};
use serde::Serialize;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::api::auth::{bearer_token, resolve_user};
use crate::api::cors::with_cors;
use crate::error::{ConfirmError, ErrorBody};
use crate::models::{Enrollment, Lesson};
use crate::AppState;

#[derive(Debug, Serialize, ToSchema)]
pub struct EnrollmentStatusResponse {
    pub enrolled: bool,
    pub enrollment: Option<Enrollment>,
}

/// Lessons of a course in playback order; used for the lesson player deep link.
#[utoipa::path(
    get,
    path = "/courses/{course_id}/lessons",
    tag = "courses",
    params(("course_id" = Uuid, Path, description = "Course identifier")),
    responses(
        (status = 200, description = "Lessons ordered by order_index", body = [Lesson]),
        (status = 500, description = "Store error", body = ErrorBody)
    )
)]
#[get("/courses/{course_id}/lessons")]
pub async fn list_lessons(
    path: web::Path<Uuid>,
    state: web::Data<AppState>,
) -> Result<HttpResponse, ConfirmError> {
    let course_id = path.into_inner();
    match state.store.list_lessons(course_id).await {
        Ok(lessons) => Ok(with_cors(&mut HttpResponse::Ok()).json(lessons)),
        Err(e) => {
            log::error!("list_lessons error course_id={course_id}: {e}");
            Err(ConfirmError::Persistence { captured: false })
        }
    }
}

/// Whether the caller holds a completed enrollment for the course.
#[utoipa::path(
    get,
    path = "/enrollments/{course_id}",
    tag = "courses",
    params(("course_id" = Uuid, Path, description = "Course identifier")),
    responses(
        (status = 200, description = "Enrollment status", body = EnrollmentStatusResponse),
        (status = 401, description = "Login required", body = ErrorBody),
        (status = 500, description = "Store or configuration error", body = ErrorBody)
    )
)]
#[get("/enrollments/{course_id}")]
pub async fn enrollment_status(
    req: HttpRequest,
    path: web::Path<Uuid>,
    state: web::Data<AppState>,
) -> Result<HttpResponse, ConfirmError> {
    let course_id = path.into_inner();
    let Some(auth_settings) = state.config.auth_settings() else {
        log::error!("enrollment_status refused: auth service not configured");
        return Err(ConfirmError::Configuration);
    };

    let user = match resolve_user(&state.http, auth_settings, bearer_token(&req)).await {
        Ok(Some(user)) => user,
        Ok(None) => return Err(ConfirmError::Unauthenticated { captured: false }),
        Err(e) => {
            log::warn!("enrollment_status auth lookup failed: {e}");
            return Err(ConfirmError::Unauthenticated { captured: false });
        }
    };

    match state
        .store
        .find_completed_enrollment(user.id, course_id)
        .await
    {
        Ok(enrollment) => Ok(with_cors(&mut HttpResponse::Ok()).json(EnrollmentStatusResponse {
            enrolled: enrollment.is_some(),
            enrollment,
        })),
        Err(e) => {
            log::error!(
                "enrollment_status lookup error user_id={} course_id={course_id}: {e}",
                user.id
            );
            Err(ConfirmError::Persistence { captured: false })
        }
    }
}
