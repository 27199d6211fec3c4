mod config;
mod error;
mod inference;
mod models;
mod routes;

use std::sync::Arc;

use actix_web::middleware::Logger;
use actix_web::{web, App, HttpServer};
use log::{error, info};

use config::ServerConfig;
use inference::{CostModel, OnnxCostModel};

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp_millis()
        .format_module_path(false)
        .init();

    info!("Starting cost-of-treatment prediction API");
    let config = ServerConfig::default();

    // Loaded once, before binding; the server never starts without it.
    info!("Loading model artifact from {}", config.model_path);
    let model = match OnnxCostModel::load(&config.model_path) {
        Ok(model) => model,
        Err(e) => {
            error!("Cannot load model artifact: {:#}", e);
            return Err(e);
        }
    };
    info!("Model loaded from {}", model.path().display());

    let model: web::Data<dyn CostModel> = web::Data::from(Arc::new(model) as Arc<dyn CostModel>);
    let bind_address = config.bind_address();

    info!("Listening on http://{}", bind_address);
    info!("Workers: {}", config.workers);
    info!("   GET  /          - health check");
    info!("   POST /predict   - predict treatment cost");

    HttpServer::new(move || {
        App::new()
            .wrap(Logger::default())
            .wrap(routes::security_headers())
            .wrap(routes::cors())
            .app_data(model.clone())
            .configure(routes::configure)
            .default_service(web::route().to(routes::not_found))
    })
    .workers(config.workers)
    .bind(&bind_address)?
    .run()
    .await?;

    Ok(())
}
