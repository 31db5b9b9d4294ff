// src/checkout.rs
//
// Purchaser-side half of the flow: read the payment widget's redirect, forward it
// to the confirmation endpoint and decide where the purchaser goes next.

use chrono::{DateTime, Utc};
use serde::Deserialize;
use uuid::Uuid;

use crate::api::payments::ConfirmPaymentRequest;
use crate::models::Lesson;

const DEFAULT_FAILURE_MESSAGE: &str = "Payment approval failed.";

/// Query parameters of the widget's success redirect, as raw strings.
#[derive(Debug, Default, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RedirectParams {
    pub payment_key: Option<String>,
    pub order_id: Option<String>,
    pub amount: Option<String>,
    pub course_id: Option<String>,
}

impl RedirectParams {
    pub fn from_query(query: &str) -> Self {
        let query = query.trim_start_matches('?');
        serde_urlencoded::from_str(query).unwrap_or_else(|e| {
            log::warn!("unreadable checkout redirect query: {e}");
            Self::default()
        })
    }

    pub fn course_id(&self) -> Option<&str> {
        self.course_id.as_deref().filter(|c| !c.is_empty())
    }

    /// Builds the endpoint request, or the terminal failure when the redirect is
    /// missing `paymentKey`, `orderId` or a usable `amount`.
    pub fn into_request(self) -> Result<ConfirmPaymentRequest, CheckoutOutcome> {
        let failure = || {
            CheckoutOutcome::failed(
                "The payment information is invalid.".to_string(),
                self.course_id(),
            )
        };

        let payment_key = self.payment_key.clone().filter(|v| !v.is_empty());
        let order_id = self.order_id.clone().filter(|v| !v.is_empty());
        let amount = self
            .amount
            .as_deref()
            .and_then(|a| a.trim().parse::<i64>().ok())
            .filter(|a| *a > 0);

        match (payment_key, order_id, amount) {
            (Some(payment_key), Some(order_id), Some(amount)) => Ok(ConfirmPaymentRequest {
                payment_key: Some(payment_key),
                order_id: Some(order_id),
                amount: Some(amount),
                course_id: self.course_id.clone(),
            }),
            _ => Err(failure()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CheckoutOutcome {
    /// Access granted; `learn_href` opens the lesson player.
    Enrolled { learn_href: String },
    /// The purchaser already owned the course; send them to the player, not to pay again.
    AlreadyEnrolled { learn_href: String },
    Failed {
        message: String,
        /// Follow-up routes offered to the purchaser, primary first.
        actions: Vec<FollowUp>,
    },
    /// Money was taken but access was not granted. Paying again would double
    /// charge, so no checkout route is offered.
    CapturedNotGranted {
        message: String,
        actions: Vec<FollowUp>,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FollowUp {
    pub label: &'static str,
    pub href: String,
}

impl CheckoutOutcome {
    pub fn failed(message: String, course_id: Option<&str>) -> Self {
        CheckoutOutcome::Failed {
            message,
            actions: failure_actions(course_id),
        }
    }
}

pub fn failure_actions(course_id: Option<&str>) -> Vec<FollowUp> {
    match course_id {
        Some(c) => vec![
            FollowUp {
                label: "Retry checkout",
                href: format!("/checkout/{c}"),
            },
            FollowUp {
                label: "Back to course",
                href: format!("/courses/{c}"),
            },
        ],
        None => vec![FollowUp {
            label: "Browse courses",
            href: "/courses".to_string(),
        }],
    }
}

pub fn captured_actions(course_id: Option<&str>) -> Vec<FollowUp> {
    match course_id {
        Some(c) => vec![FollowUp {
            label: "Back to course",
            href: format!("/courses/{c}"),
        }],
        None => vec![FollowUp {
            label: "Browse courses",
            href: "/courses".to_string(),
        }],
    }
}

/// Deep link into the lesson player, preferring the course's first lesson.
pub fn learn_href(course_id: Option<&str>, lessons: &[Lesson]) -> String {
    match (course_id, lessons.first()) {
        (None, _) => "/courses".to_string(),
        (Some(c), Some(first)) => format!("/learn/{c}/{}", first.id),
        (Some(c), None) => format!("/learn/{c}"),
    }
}

/// Per-attempt order id handed to the payment widget.
pub fn order_id_for(user_id: Uuid, now: DateTime<Utc>) -> String {
    let user = user_id.to_string();
    format!("order_{}_{}", now.timestamp_millis(), &user[..8])
}

/// Success and failure URLs the widget redirects to.
pub fn redirect_urls(origin: &str, course_id: &str) -> (String, String) {
    let origin = origin.trim_end_matches('/');
    (
        format!("{origin}/checkout/success?courseId={course_id}"),
        format!("{origin}/checkout/fail?courseId={course_id}"),
    )
}

/// User-facing text for the widget's own failure redirect.
pub fn widget_failure_message(code: Option<&str>, message: Option<&str>) -> String {
    match code {
        Some("PAY_PROCESS_CANCELED") => "The payment was canceled.".to_string(),
        Some("PAY_PROCESS_ABORTED") => "An error occurred while processing the payment.".to_string(),
        Some("REJECT_CARD_COMPANY") => {
            "The card issuer declined the payment. Please check your card details.".to_string()
        }
        _ => message
            .filter(|m| !m.is_empty())
            .unwrap_or("A problem occurred while processing the payment.")
            .to_string(),
    }
}

#[derive(Debug, Deserialize)]
struct EndpointReply {
    #[serde(default)]
    success: bool,
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    code: Option<String>,
    #[serde(default, rename = "paymentCaptured")]
    payment_captured: bool,
}

/// Talks to the confirmation endpoint and the lesson listing of this service.
#[derive(Clone)]
pub struct CheckoutClient {
    http: reqwest::Client,
    base_url: String,
}

impl CheckoutClient {
    pub fn new(http: reqwest::Client, base_url: &str) -> Self {
        Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    /// Runs the purchaser side of checkout once. Never retries; every retry is
    /// the purchaser's choice.
    pub async fn complete(&self, redirect: RedirectParams, access_token: &str) -> CheckoutOutcome {
        let course_id = redirect.course_id().map(str::to_string);
        let request = match redirect.into_request() {
            Ok(r) => r,
            Err(outcome) => return outcome,
        };

        let resp = match self
            .http
            .post(format!("{}/confirm-payment", self.base_url))
            .bearer_auth(access_token)
            .json(&request)
            .send()
            .await
        {
            Ok(r) => r,
            Err(e) => {
                log::error!("confirm-payment request failed: {e}");
                return CheckoutOutcome::failed(
                    "An error occurred while processing the payment.".to_string(),
                    course_id.as_deref(),
                );
            }
        };

        let reply = match resp.json::<EndpointReply>().await {
            Ok(r) => r,
            Err(e) => {
                log::error!("confirm-payment reply unreadable: {e}");
                return CheckoutOutcome::failed(
                    DEFAULT_FAILURE_MESSAGE.to_string(),
                    course_id.as_deref(),
                );
            }
        };

        if reply.success {
            let lessons = self.lessons(course_id.as_deref()).await;
            return CheckoutOutcome::Enrolled {
                learn_href: learn_href(course_id.as_deref(), &lessons),
            };
        }

        if reply.code.as_deref() == Some("ALREADY_ENROLLED") {
            let lessons = self.lessons(course_id.as_deref()).await;
            return CheckoutOutcome::AlreadyEnrolled {
                learn_href: learn_href(course_id.as_deref(), &lessons),
            };
        }

        let message = reply
            .message
            .unwrap_or_else(|| DEFAULT_FAILURE_MESSAGE.to_string());

        if reply.payment_captured {
            log::error!(
                "checkout captured without enrollment code={:?} course_id={:?}",
                reply.code,
                course_id
            );
            return CheckoutOutcome::CapturedNotGranted {
                message,
                actions: captured_actions(course_id.as_deref()),
            };
        }

        CheckoutOutcome::failed(message, course_id.as_deref())
    }

    /// Lesson data is optional for the deep link; any failure yields no lessons.
    async fn lessons(&self, course_id: Option<&str>) -> Vec<Lesson> {
        let Some(course_id) = course_id else {
            return Vec::new();
        };

        let resp = match self
            .http
            .get(format!("{}/courses/{course_id}/lessons", self.base_url))
            .send()
            .await
        {
            Ok(r) if r.status().is_success() => r,
            Ok(r) => {
                log::warn!("lesson list status={} course_id={course_id}", r.status());
                return Vec::new();
            }
            Err(e) => {
                log::warn!("lesson list request failed course_id={course_id}: {e}");
                return Vec::new();
            }
        };

        resp.json::<Vec<Lesson>>().await.unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn parses_widget_redirect_query() {
        let params = RedirectParams::from_query(
            "?paymentKey=tgen_123&orderId=order_1&amount=89000&courseId=abc",
        );
        assert_eq!(params.payment_key.as_deref(), Some("tgen_123"));
        assert_eq!(params.amount.as_deref(), Some("89000"));
        assert_eq!(params.course_id(), Some("abc"));

        let req = params.into_request().unwrap();
        assert_eq!(req.amount, Some(89000));
    }

    #[test]
    fn missing_amount_is_terminal() {
        let params = RedirectParams::from_query("paymentKey=p&orderId=o&courseId=abc");
        let outcome = params.into_request().unwrap_err();
        match outcome {
            CheckoutOutcome::Failed { actions, .. } => {
                assert_eq!(actions[0].href, "/checkout/abc");
                assert_eq!(actions[1].href, "/courses/abc");
            }
            other => panic!("unexpected outcome {other:?}"),
        }
    }

    #[test]
    fn failure_without_course_offers_course_list() {
        let outcome = RedirectParams::from_query("").into_request().unwrap_err();
        assert_eq!(
            outcome,
            CheckoutOutcome::Failed {
                message: "The payment information is invalid.".to_string(),
                actions: vec![FollowUp {
                    label: "Browse courses",
                    href: "/courses".to_string()
                }],
            }
        );
    }

    #[test]
    fn captured_actions_never_offer_checkout() {
        let actions = captured_actions(Some("abc"));
        assert!(actions.iter().all(|a| !a.href.starts_with("/checkout")));
        assert_eq!(actions[0].href, "/courses/abc");
        assert_eq!(captured_actions(None)[0].href, "/courses");
    }

    #[test]
    fn learn_href_falls_back_to_course_route() {
        assert_eq!(learn_href(None, &[]), "/courses");
        assert_eq!(learn_href(Some("c1"), &[]), "/learn/c1");
    }

    #[test]
    fn order_id_embeds_time_and_user_prefix() {
        let user = Uuid::parse_str("1234abcd-0000-4000-8000-000000000000").unwrap();
        let now = Utc.timestamp_millis_opt(1_700_000_000_123).unwrap();
        assert_eq!(order_id_for(user, now), "order_1700000000123_1234abcd");
    }

    #[test]
    fn redirect_urls_carry_course_id() {
        let (ok, fail) = redirect_urls("https://shop.example/", "c1");
        assert_eq!(ok, "https://shop.example/checkout/success?courseId=c1");
        assert_eq!(fail, "https://shop.example/checkout/fail?courseId=c1");
    }

    #[test]
    fn widget_failure_codes_are_translated() {
        assert_eq!(
            widget_failure_message(Some("PAY_PROCESS_CANCELED"), Some("raw")),
            "The payment was canceled."
        );
        assert_eq!(widget_failure_message(Some("OTHER"), Some("raw")), "raw");
        assert_eq!(
            widget_failure_message(None, None),
            "A problem occurred while processing the payment."
        );
    }
}
