use utoipa::OpenApi;

#[derive(OpenApi)]
#[openapi(
    paths(
        crate::api::payments::confirm_payment,
        crate::api::cors::confirm_payment_preflight,
        crate::api::enrollments::list_lessons,
        crate::api::enrollments::enrollment_status,
        crate::api::cors::enrollment_status_preflight
    ),
    components(
        schemas(
            crate::api::payments::ConfirmPaymentRequest,
            crate::api::payments::ConfirmPaymentResponse,
            crate::api::payments::PaymentSummary,
            crate::api::enrollments::EnrollmentStatusResponse,
            crate::error::ErrorBody,
            crate::models::Enrollment,
            crate::models::EnrollmentStatus,
            crate::models::Lesson,
            crate::models::Course
        )
    ),
    tags(
        (name = "payments", description = "Payment confirmation and enrollment activation"),
        (name = "courses", description = "Read-only course data used after checkout")
    )
)]
pub struct ApiDoc;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn openapi_lists_confirm_endpoint() {
        let doc = ApiDoc::openapi();
        assert!(doc.paths.paths.contains_key("/confirm-payment"));
        assert!(doc.paths.paths.contains_key("/courses/{course_id}/lessons"));
    }
}
