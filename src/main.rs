// src/main.rs
use std::sync::Arc;

use actix_web::{App, HttpResponse, HttpServer, Responder, middleware, web};
use dotenvy::dotenv;
use sqlx::PgPool;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use course_checkout::config::Config;
use course_checkout::db::PgEnrollmentStore;
use course_checkout::{AppState, docs};

async fn index() -> impl Responder {
    HttpResponse::Ok().body("Service ready!")
}

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    dotenv().ok();
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let config = Config::from_env().expect("invalid configuration");

    let pool = PgPool::connect(config.database_url.expose())
        .await
        .expect("Failed to connect to DB");

    sqlx::migrate!()
        .run(&pool)
        .await
        .expect("Failed to run migrations");

    let bind = (config.bind_addr.clone(), config.port);
    let state = AppState::new(config, Arc::new(PgEnrollmentStore::new(pool)))
        .expect("Failed to build HTTP client");
    let state = web::Data::new(state);

    log::info!("listening on {}:{}", bind.0, bind.1);

    HttpServer::new(move || {
        App::new()
            .app_data(state.clone())
            .wrap(middleware::Logger::default())
            .route("/", web::get().to(index))
            .service(
                SwaggerUi::new("/docs/{_:.*}")
                    .url("/api-docs/openapi.json", docs::ApiDoc::openapi()),
            )
            .configure(course_checkout::configure)
    })
    .bind(bind)?
    .run()
    .await
}
