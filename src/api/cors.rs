// src/api/cors.rs

use actix_web::{HttpResponse, HttpResponseBuilder, Responder, route};

pub const ALLOW_ORIGIN: &str = "*";
pub const ALLOW_HEADERS: &str = "authorization, x-client-info, apikey, content-type, \
     x-supabase-client-platform, x-supabase-client-platform-version, \
     x-supabase-client-runtime, x-supabase-client-runtime-version";
pub const ALLOW_METHODS: &str = "GET, POST, OPTIONS";

/// Browser clients call the endpoint cross-origin, so every response carries these.
pub fn with_cors(builder: &mut HttpResponseBuilder) -> &mut HttpResponseBuilder {
    builder
        .insert_header(("Access-Control-Allow-Origin", ALLOW_ORIGIN))
        .insert_header(("Access-Control-Allow-Headers", ALLOW_HEADERS))
        .insert_header(("Access-Control-Allow-Methods", ALLOW_METHODS))
}

#[utoipa::path(
    options,
    path = "/confirm-payment",
    tag = "payments",
    responses((status = 200, description = "CORS preflight, empty body"))
)]
#[route("/confirm-payment", method = "OPTIONS")]
pub async fn confirm_payment_preflight() -> impl Responder {
    with_cors(&mut HttpResponse::Ok()).finish()
}

/// The status lookup sends `Authorization`, so browsers preflight it too.
#[utoipa::path(
    options,
    path = "/enrollments/{course_id}",
    tag = "courses",
    params(("course_id" = String, Path, description = "Course identifier")),
    responses((status = 200, description = "CORS preflight, empty body"))
)]
#[route("/enrollments/{course_id}", method = "OPTIONS")]
pub async fn enrollment_status_preflight() -> impl Responder {
    with_cors(&mut HttpResponse::Ok()).finish()
}
