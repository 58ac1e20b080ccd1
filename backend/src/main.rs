mod agronomy;
mod config;
mod pipeline;
mod routes;
mod sensors;
mod spray;
mod vision;

use actix_cors::Cors;
use actix_web::{web, App, HttpServer};
use std::env;
use std::sync::Arc;

use config::SystemConfig;
use pipeline::AnalysisPipeline;
use routes::configure_routes;
use sensors::SensorHub;
use spray::SprayController;
use vision::SegmentationEngine;

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    env_logger::init_from_env(env_logger::Env::new().default_filter_or("info"));
    dotenv::dotenv().ok();

    if let Ok(current_dir) = env::current_dir() {
        log::info!("Current working directory: {}", current_dir.display());
    } else {
        log::error!("Failed to get the current working directory.");
    }

    let system_config = match SystemConfig::load() {
        Ok(config) => config,
        Err(e) => {
            log::error!("Failed to load configuration: {e}");
            return Err(std::io::Error::other(format!("Config loading failed: {e}")));
        }
    };

    // The engine is fully initialized (weights loaded and checksummed)
    // before the server binds, so no request ever races initialization.
    let engine = match SegmentationEngine::new(&system_config.model) {
        Ok(engine) => Arc::new(engine),
        Err(e) => {
            log::error!("Failed to initialize segmentation engine: {e}");
            return Err(std::io::Error::other(format!("Model loading failed: {e}")));
        }
    };
    if engine.is_fallback() {
        log::warn!("Serving placeholder segmentations; analysis responses carry model_fallback=true");
    }

    let pipeline = web::Data::new(AnalysisPipeline::new(engine, &system_config));
    let sensor_hub = web::Data::new(SensorHub::new(system_config.policy.default_soil_moisture));
    let spray_controller = web::Data::new(SprayController::new());
    let system_config = web::Data::new(system_config);

    let port = env::var("PORT").unwrap_or_else(|_| "8080".to_string());
    let bind_address = format!("0.0.0.0:{}", port);

    log::info!("Starting server on {}", bind_address);

    HttpServer::new(move || {
        App::new()
            .wrap(
                Cors::default()
                    .allow_any_origin()
                    .allowed_methods(vec!["GET", "POST", "OPTIONS"])
                    .allowed_headers(vec![
                        actix_web::http::header::AUTHORIZATION,
                        actix_web::http::header::ACCEPT,
                        actix_web::http::header::CONTENT_TYPE,
                    ])
                    .max_age(3600),
            )
            .app_data(pipeline.clone())
            .app_data(sensor_hub.clone())
            .app_data(spray_controller.clone())
            .app_data(system_config.clone())
            .configure(configure_routes)
    })
    .bind(&bind_address)?
    .run()
    .await
}
