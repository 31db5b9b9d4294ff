pub mod api;
pub mod checkout;
pub mod config;
pub mod db;
pub mod docs;
pub mod error;
pub mod models;

use std::sync::Arc;

use actix_web::web;

use crate::config::Config;
use crate::db::EnrollmentStore;

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub http: reqwest::Client,
    pub store: Arc<dyn EnrollmentStore>,
}

impl AppState {
    /// Shared outbound client; the gateway timeout bounds every outbound call.
    pub fn new(config: Config, store: Arc<dyn EnrollmentStore>) -> Result<Self, reqwest::Error> {
        let http = reqwest::Client::builder()
            .timeout(config.gateway_timeout)
            .build()?;

        Ok(Self {
            config: Arc::new(config),
            http,
            store,
        })
    }
}

/// Registers the checkout routes on an actix `App` or scope.
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(api::payments::confirm_payment)
        .service(api::cors::confirm_payment_preflight)
        .service(api::enrollments::list_lessons)
        .service(api::enrollments::enrollment_status)
        .service(api::cors::enrollment_status_preflight);
}
