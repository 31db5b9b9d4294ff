// src/error.rs

use actix_web::http::StatusCode;
use actix_web::{HttpResponse, ResponseError};
use serde::Serialize;
use thiserror::Error;
use utoipa::ToSchema;

use crate::api::cors::with_cors;

/// Failure outcomes of the checkout endpoints.
///
/// Variants raised after the gateway captured the charge carry `captured = true`
/// so the client can tell "pay again" apart from "contact support".
#[derive(Debug, Error)]
pub enum ConfirmError {
    #[error("{0}")]
    InvalidParameters(String),

    #[error("{message}")]
    GatewayRejected {
        message: String,
        code: Option<String>,
    },

    #[error("payment gateway did not answer")]
    GatewayUnavailable { timed_out: bool },

    /// The gateway approved the charge but its answer could not be read.
    #[error("payment approved but gateway answer unreadable")]
    PaymentUnverified,

    #[error("server configuration error")]
    Configuration,

    #[error("login required")]
    Unauthenticated { captured: bool },

    #[error("already enrolled in this course")]
    AlreadyEnrolled,

    #[error("enrollment could not be saved")]
    Persistence { captured: bool },
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ErrorBody {
    pub success: bool,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub payment_captured: bool,
}

impl ConfirmError {
    pub fn code(&self) -> &str {
        match self {
            ConfirmError::InvalidParameters(_) => "INVALID_PARAMETERS",
            ConfirmError::GatewayRejected { code, .. } => {
                code.as_deref().unwrap_or("GATEWAY_REJECTED")
            }
            ConfirmError::GatewayUnavailable { timed_out: true } => "GATEWAY_TIMEOUT",
            ConfirmError::GatewayUnavailable { timed_out: false } => "GATEWAY_UNAVAILABLE",
            ConfirmError::PaymentUnverified => "PAYMENT_UNVERIFIED",
            ConfirmError::Configuration => "SERVER_MISCONFIGURED",
            ConfirmError::Unauthenticated { .. } => "UNAUTHENTICATED",
            ConfirmError::AlreadyEnrolled => "ALREADY_ENROLLED",
            ConfirmError::Persistence { .. } => "ENROLLMENT_NOT_SAVED",
        }
    }

    /// True when the gateway is known to hold the money for this request.
    pub fn payment_captured(&self) -> bool {
        match self {
            ConfirmError::Unauthenticated { captured } | ConfirmError::Persistence { captured } => {
                *captured
            }
            ConfirmError::AlreadyEnrolled | ConfirmError::PaymentUnverified => true,
            _ => false,
        }
    }

    pub fn user_message(&self) -> String {
        match self {
            ConfirmError::InvalidParameters(reason) => {
                format!("Required payment parameters are missing or invalid: {reason}")
            }
            ConfirmError::GatewayRejected { message, .. } => message.clone(),
            ConfirmError::GatewayUnavailable { timed_out: true } => {
                "The payment gateway did not respond in time. The charge may or may not have \
                 completed; please check your payment history before trying again."
                    .to_string()
            }
            ConfirmError::GatewayUnavailable { timed_out: false } => {
                "The payment could not be confirmed with the payment gateway.".to_string()
            }
            ConfirmError::PaymentUnverified => {
                "Your payment was approved but its details could not be verified, so the course \
                 was not unlocked. Please contact support; do not pay again."
                    .to_string()
            }
            ConfirmError::Configuration => "A server configuration error occurred.".to_string(),
            ConfirmError::Unauthenticated { captured: true } => {
                "Your payment was captured but your session could not be verified, so the \
                 course was not unlocked. Please contact support; do not pay again."
                    .to_string()
            }
            ConfirmError::Unauthenticated { captured: false } => "Login is required.".to_string(),
            ConfirmError::AlreadyEnrolled => "You are already enrolled in this course.".to_string(),
            ConfirmError::Persistence { captured: true } => {
                "Your payment was captured but the enrollment could not be saved. Please \
                 contact support; do not pay again."
                    .to_string()
            }
            ConfirmError::Persistence { captured: false } => {
                "The request could not be processed.".to_string()
            }
        }
    }

    pub fn body(&self) -> ErrorBody {
        ErrorBody {
            success: false,
            message: self.user_message(),
            code: Some(self.code().to_string()),
            payment_captured: self.payment_captured(),
        }
    }
}

impl ResponseError for ConfirmError {
    fn status_code(&self) -> StatusCode {
        match self {
            ConfirmError::InvalidParameters(_) | ConfirmError::GatewayRejected { .. } => {
                StatusCode::BAD_REQUEST
            }
            ConfirmError::GatewayUnavailable { timed_out: true } => StatusCode::GATEWAY_TIMEOUT,
            ConfirmError::GatewayUnavailable { timed_out: false } | ConfirmError::PaymentUnverified => {
                StatusCode::BAD_GATEWAY
            }
            ConfirmError::Configuration | ConfirmError::Persistence { .. } => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
            ConfirmError::Unauthenticated { .. } => StatusCode::UNAUTHORIZED,
            ConfirmError::AlreadyEnrolled => StatusCode::CONFLICT,
        }
    }

    fn error_response(&self) -> HttpResponse {
        with_cors(&mut HttpResponse::build(self.status_code())).json(self.body())
    }
}
