// src/api/routes.rs
use actix_web::web;
use super::handlers;

pub fn configure_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/api/v1")
            .route("/health", web::get().to(handlers::health_check))
            .route("/languages", web::get().to(handlers::list_languages))
            .route("/problems", web::post().to(handlers::generate_problems))
            .route("/tests/generate", web::post().to(handlers::generate_tests))
            .route("/runs", web::post().to(handlers::run_code))
            .route("/ws", web::get().to(handlers::ws_handler))
    );
}
