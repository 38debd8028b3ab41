mod config;
mod routes;
mod upstream;

use actix_cors::Cors;
use actix_web::{App, HttpServer, web};
use config::GatewayConfig;
use routes::{UploadLimit, configure_routes};
use shared::error::format_bytes;
use std::env;
use upstream::upstream_service::UpstreamService;

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    env_logger::init_from_env(env_logger::Env::new().default_filter_or("info"));
    dotenv::dotenv().ok();

    if let Ok(current_dir) = env::current_dir() {
        log::info!("Current working directory: {}", current_dir.display());
    } else {
        log::error!("Failed to get the current working directory.");
    }

    let config = GatewayConfig::from_env().map_err(|e| {
        log::error!("Configuration error: {}", e);
        std::io::Error::new(std::io::ErrorKind::InvalidInput, e.to_string())
    })?;

    let client = reqwest::Client::builder()
        .user_agent(concat!("detectree-gateway/", env!("CARGO_PKG_VERSION")))
        .build()
        .map_err(|e| std::io::Error::other(format!("HTTP client setup failed: {}", e)))?;
    let upstream = UpstreamService::new(client, config.upstream.clone());
    let limit = UploadLimit(config.max_upload_bytes);

    log::info!("Forwarding analysis requests to {}", config.upstream);
    log::info!("Upload limit: {}", format_bytes(config.max_upload_bytes));
    log::info!("Serving frontend from {}", config.frontend_dir);

    let bind_address = config.bind_address();
    let frontend_dir = config.frontend_dir.clone();

    log::info!("Starting server on {}", bind_address);

    HttpServer::new(move || {
        App::new()
            .wrap(
                Cors::default()
                    .allow_any_origin()
                    .allowed_methods(vec!["GET", "POST", "OPTIONS"])
                    .allowed_headers(vec![
                        actix_web::http::header::ACCEPT,
                        actix_web::http::header::CONTENT_TYPE,
                    ])
                    .max_age(3600),
            )
            .app_data(web::Data::new(upstream.clone()))
            .app_data(web::Data::new(limit))
            .configure(|cfg| configure_routes(cfg, frontend_dir.clone()))
    })
    .bind(&bind_address)?
    .run()
    .await
}
