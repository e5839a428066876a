use actix_web::{web, App, HttpServer, middleware};
use actix_cors::Cors;
use kata_runner::api::{configure_routes, handlers::WsBroker, AppState};
use kata_runner::{banner, config};

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    // Print the startup banner
    banner::print_banner();

    if let Err(e) = dotenvy::dotenv() {
        eprintln!("⚠️  Warning: Could not load .env file: {}", e);
        eprintln!("   Make sure JUDGE0_URL and GEMINI_API_KEY are set in your environment");
    }

    env_logger::init_from_env(env_logger::Env::new().default_filter_or("info"));

    let app_config = config::AppConfig::from_env();
    if app_config.execution.is_none() {
        log::warn!("JUDGE0_URL not set; code runs will be rejected");
    }
    if app_config.gemini.is_none() {
        log::warn!("GEMINI_API_KEY not set; test generation will be rejected");
    }
    let bind_addr = app_config.bind_addr.clone();

    let state = AppState::new(app_config).map_err(std::io::Error::other)?;
    let broker = WsBroker::new();

    log::info!("🚀 Starting server on {}", bind_addr);

    HttpServer::new(move || {
        let cors = Cors::permissive();

        App::new()
            .app_data(web::Data::new(state.clone()))
            .app_data(web::Data::new(broker.clone()))
            .wrap(cors)
            .wrap(middleware::Logger::default())
            .configure(configure_routes)
    })
    .bind(bind_addr)?
    .run()
    .await
}
