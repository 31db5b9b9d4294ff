// src/api/payments.rs

use actix_web::{HttpRequest, HttpResponse, post, web};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::api::auth::{bearer_token, resolve_user};
use crate::api::cors::with_cors;
use crate::api::toss_client::{self, ConfirmRequest, ConfirmedPayment};
use crate::db::StoreError;
use crate::error::{ConfirmError, ErrorBody};
use crate::models::{Enrollment, NewEnrollment};
use crate::AppState;

/// Body the client forwards from the payment widget's success redirect.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct ConfirmPaymentRequest {
    #[serde(default)]
    pub payment_key: Option<String>,
    #[serde(default)]
    pub order_id: Option<String>,
    #[serde(default)]
    pub amount: Option<i64>,
    #[serde(default)]
    pub course_id: Option<String>,
}

/// A request that passed boundary validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidatedConfirmation {
    pub payment_key: String,
    pub order_id: String,
    pub amount: i64,
    pub course_id: Uuid,
}

impl ConfirmPaymentRequest {
    pub fn parse(body: &[u8]) -> Result<Self, ConfirmError> {
        serde_json::from_slice(body)
            .map_err(|e| ConfirmError::InvalidParameters(format!("malformed body: {e}")))
    }

    pub fn validate(self) -> Result<ValidatedConfirmation, ConfirmError> {
        let payment_key = non_empty(self.payment_key, "paymentKey")?;
        let order_id = non_empty(self.order_id, "orderId")?;
        let amount = match self.amount {
            Some(a) if a > 0 => a,
            Some(_) => {
                return Err(ConfirmError::InvalidParameters(
                    "amount must be a positive integer".to_string(),
                ))
            }
            None => return Err(ConfirmError::InvalidParameters("amount is required".to_string())),
        };
        let course_id = non_empty(self.course_id, "courseId")?;
        let course_id = Uuid::parse_str(course_id.trim()).map_err(|_| {
            ConfirmError::InvalidParameters("courseId is not a valid identifier".to_string())
        })?;

        Ok(ValidatedConfirmation {
            payment_key,
            order_id,
            amount,
            course_id,
        })
    }
}

fn non_empty(value: Option<String>, field: &str) -> Result<String, ConfirmError> {
    match value {
        Some(v) if !v.trim().is_empty() => Ok(v),
        _ => Err(ConfirmError::InvalidParameters(format!("{field} is required"))),
    }
}

#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PaymentSummary {
    pub payment_key: String,
    pub order_id: String,
    pub method: Option<String>,
    pub total_amount: i64,
    pub approved_at: DateTime<Utc>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ConfirmPaymentResponse {
    pub success: bool,
    pub message: String,
    pub payment: PaymentSummary,
    pub enrollment: Enrollment,
}

/// Outcome of a fully successful confirmation.
#[derive(Debug, Clone)]
pub struct Confirmation {
    pub payment: PaymentSummary,
    pub enrollment: Enrollment,
}

/// Validate, confirm with the gateway, resolve the caller, persist the enrollment.
///
/// Steps run strictly in this order; the enrollment insert is the only write and
/// happens only after the gateway confirmed the capture.
pub async fn confirm(
    state: &AppState,
    bearer: Option<&str>,
    body: &[u8],
) -> Result<Confirmation, ConfirmError> {
    let req = ConfirmPaymentRequest::parse(body)?.validate()?;

    let config = &state.config;
    let (Some(secret), Some(auth_settings)) =
        (config.toss_secret_key.as_ref(), config.auth_settings())
    else {
        log::error!(
            "confirm-payment refused: server misconfigured (has_gateway_secret={} has_auth={})",
            config.toss_secret_key.is_some(),
            config.auth_settings().is_some()
        );
        return Err(ConfirmError::Configuration);
    };

    match state.store.find_course(req.course_id).await {
        Ok(Some(_)) => {}
        Ok(None) => {
            return Err(ConfirmError::InvalidParameters(format!(
                "course {} does not exist",
                req.course_id
            )))
        }
        Err(e) => {
            log::error!("confirm-payment course lookup error: {e}");
            return Err(ConfirmError::Persistence { captured: false });
        }
    }

    log::info!(
        "confirm-payment gateway confirm order_id={} course_id={} amount={}",
        req.order_id,
        req.course_id,
        req.amount
    );
    let payment = match toss_client::confirm_payment(
        &state.http,
        &config.toss_api_base,
        secret.expose(),
        &ConfirmRequest {
            payment_key: &req.payment_key,
            order_id: &req.order_id,
            amount: req.amount,
        },
    )
    .await
    {
        Ok(p) => p,
        Err(toss_client::TossError::Api {
            status,
            code,
            message,
        }) => {
            log::warn!(
                "confirm-payment gateway rejected order_id={} status={} code={:?}",
                req.order_id,
                status,
                code
            );
            return Err(ConfirmError::GatewayRejected {
                message: message.unwrap_or_else(|| "Payment confirmation failed.".to_string()),
                code,
            });
        }
        Err(e @ toss_client::TossError::InvalidResponse(_)) => {
            log::error!(
                "confirm-payment gateway approved but answer unreadable order_id={} payment_key={}: {e}",
                req.order_id,
                req.payment_key
            );
            return Err(ConfirmError::PaymentUnverified);
        }
        Err(e) => {
            log::error!("confirm-payment gateway error order_id={}: {e}", req.order_id);
            return Err(ConfirmError::GatewayUnavailable {
                timed_out: e.is_timeout(),
            });
        }
    };

    let summary = summarize(&payment);
    log::info!(
        "confirm-payment captured order_id={} method={:?} total_amount={}",
        summary.order_id,
        summary.method,
        summary.total_amount
    );

    let user = match resolve_user(&state.http, auth_settings, bearer).await {
        Ok(Some(user)) => user,
        Ok(None) => {
            log::error!(
                "confirm-payment captured without session order_id={} payment_key={}",
                summary.order_id,
                summary.payment_key
            );
            return Err(ConfirmError::Unauthenticated { captured: true });
        }
        Err(e) => {
            log::error!(
                "confirm-payment captured but auth lookup failed order_id={}: {e}",
                summary.order_id
            );
            return Err(ConfirmError::Unauthenticated { captured: true });
        }
    };

    let new = NewEnrollment {
        user_id: user.id,
        course_id: req.course_id,
        payment_key: summary.payment_key.clone(),
        order_id: summary.order_id.clone(),
        amount: summary.total_amount,
        payment_method: summary.method.clone(),
        approved_at: summary.approved_at,
    };

    let enrollment = match state.store.insert_completed_enrollment(new).await {
        Ok(e) => e,
        Err(StoreError::Conflict { constraint }) => {
            log::warn!(
                "confirm-payment already enrolled user_id={} course_id={} constraint={:?}",
                user.id,
                req.course_id,
                constraint
            );
            return Err(ConfirmError::AlreadyEnrolled);
        }
        Err(e) => {
            log::error!(
                "confirm-payment captured but insert failed order_id={} user_id={}: {e}",
                summary.order_id,
                user.id
            );
            return Err(ConfirmError::Persistence { captured: true });
        }
    };

    log::info!(
        "confirm-payment enrollment saved id={} user_id={} course_id={}",
        enrollment.id,
        enrollment.user_id,
        enrollment.course_id
    );

    Ok(Confirmation {
        payment: summary,
        enrollment,
    })
}

fn summarize(payment: &ConfirmedPayment) -> PaymentSummary {
    PaymentSummary {
        payment_key: payment.payment_key.clone(),
        order_id: payment.order_id.clone(),
        method: payment.method.clone(),
        total_amount: payment.total_amount,
        approved_at: payment
            .approved_at
            .map(|t| t.with_timezone(&Utc))
            .unwrap_or_else(Utc::now),
    }
}

#[utoipa::path(
    post,
    path = "/confirm-payment",
    tag = "payments",
    request_body = ConfirmPaymentRequest,
    responses(
        (status = 200, description = "Payment confirmed and enrollment created", body = ConfirmPaymentResponse),
        (status = 400, description = "Invalid parameters or gateway rejection", body = ErrorBody),
        (status = 401, description = "Caller session could not be resolved", body = ErrorBody),
        (status = 409, description = "Already enrolled in this course", body = ErrorBody),
        (status = 500, description = "Misconfiguration or persistence failure", body = ErrorBody),
        (status = 502, description = "Payment gateway unreachable, or approval answer unreadable", body = ErrorBody),
        (status = 504, description = "Payment gateway timed out", body = ErrorBody)
    )
)]
#[post("/confirm-payment")]
pub async fn confirm_payment(
    req: HttpRequest,
    body: web::Bytes,
    state: web::Data<AppState>,
) -> Result<HttpResponse, ConfirmError> {
    let confirmation = confirm(&state, bearer_token(&req), &body).await?;

    Ok(with_cors(&mut HttpResponse::Ok()).json(ConfirmPaymentResponse {
        success: true,
        message: "Payment completed.".to_string(),
        payment: confirmation.payment,
        enrollment: confirmation.enrollment,
    }))
}
