// src/api/toss_client.rs
//
// Minimal client for the Toss Payments confirm API.
// Auth: HTTP Basic with the secret key as username and an empty password.

use chrono::{DateTime, FixedOffset};
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug)]
pub enum TossError {
    Http(reqwest::Error),
    Api {
        status: u16,
        code: Option<String>,
        message: Option<String>,
    },
    /// The gateway answered 2xx, so the charge went through, but the body
    /// could not be read as a payment.
    InvalidResponse(String),
}

impl TossError {
    pub fn is_timeout(&self) -> bool {
        matches!(self, TossError::Http(e) if e.is_timeout())
    }
}

impl fmt::Display for TossError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TossError::Http(e) => write!(f, "http error: {e}"),
            TossError::Api {
                status,
                code,
                message,
            } => write!(
                f,
                "toss api error status={status} code={} message={}",
                code.as_deref().unwrap_or("-"),
                message.as_deref().unwrap_or("-")
            ),
            TossError::InvalidResponse(e) => write!(f, "invalid response: {e}"),
        }
    }
}

impl std::error::Error for TossError {}

impl From<reqwest::Error> for TossError {
    fn from(value: reqwest::Error) -> Self {
        Self::Http(value)
    }
}

#[derive(Debug, Serialize)]
pub struct ConfirmRequest<'a> {
    #[serde(rename = "paymentKey")]
    pub payment_key: &'a str,
    #[serde(rename = "orderId")]
    pub order_id: &'a str,
    pub amount: i64,
}

/// The subset of the gateway's Payment object this service relies on.
#[derive(Debug, Clone, Deserialize)]
pub struct ConfirmedPayment {
    #[serde(rename = "paymentKey")]
    pub payment_key: String,
    #[serde(rename = "orderId")]
    pub order_id: String,
    #[serde(default)]
    pub method: Option<String>,
    #[serde(rename = "totalAmount")]
    pub total_amount: i64,
    #[serde(rename = "approvedAt", default)]
    pub approved_at: Option<DateTime<FixedOffset>>,
}

#[derive(Debug, Deserialize)]
struct TossErrorBody {
    code: Option<String>,
    message: Option<String>,
}

/// `POST {base}/v1/payments/confirm`. Any non-2xx answer is a rejection.
pub async fn confirm_payment(
    http: &reqwest::Client,
    api_base: &str,
    secret_key: &str,
    req: &ConfirmRequest<'_>,
) -> Result<ConfirmedPayment, TossError> {
    let resp = http
        .post(format!("{api_base}/v1/payments/confirm"))
        .basic_auth(secret_key, Some(""))
        .json(req)
        .send()
        .await?;

    let status = resp.status();

    if !status.is_success() {
        let body = resp.text().await?;
        let parsed = serde_json::from_str::<TossErrorBody>(&body).ok();
        return Err(TossError::Api {
            status: status.as_u16(),
            code: parsed.as_ref().and_then(|b| b.code.clone()),
            message: parsed.and_then(|b| b.message),
        });
    }

    let body = resp
        .text()
        .await
        .map_err(|e| TossError::InvalidResponse(e.to_string()))?;
    serde_json::from_str::<ConfirmedPayment>(&body)
        .map_err(|e| TossError::InvalidResponse(e.to_string()))
}
