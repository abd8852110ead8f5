use actix_web::{web, App, HttpServer};
use dotenv::dotenv;

use crate::config::app_config::AppConfig;
use crate::logger::init_logger;
use crate::services::campaign_dispatcher::CampaignDispatcher;
use crate::services::campaign_service::CampaignService;
use crate::services::campaign_store::CampaignStore;
use crate::services::delivery_client::DeliveryClient;
use crate::services::progress_service::ProgressService;

mod app;
mod config;
mod handlers;
mod logger;
mod models;
mod services;

#[cfg(test)]
mod tests;

/// Crea la carpeta de la base si el DATABASE_URL apunta a un archivo local.
fn ensure_database_dir(database_url: &str) -> std::io::Result<()> {
    let path = database_url
        .trim_start_matches("sqlite://")
        .trim_start_matches("sqlite:");
    if path.starts_with(':') {
        // sqlite::memory:
        return Ok(());
    }
    match std::path::Path::new(path).parent() {
        Some(dir) if !dir.as_os_str().is_empty() => std::fs::create_dir_all(dir),
        _ => Ok(()),
    }
}

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    dotenv().ok(); // Cargar .env al inicio
    init_logger();

    let config = AppConfig::from_env()?;

    ensure_database_dir(&config.database_url)?;
    log::info!("Conectando a SQLite en {}", config.database_url);
    let db_pool = CampaignStore::connect(&config.database_url).await?;

    let store = CampaignStore::new(db_pool);
    store.run_migrations().await?;

    let delivery = DeliveryClient::new(config.webhook_timeout, config.simulated_delivery_delay)?;
    let dispatcher = CampaignDispatcher::new(store.clone(), delivery);
    let campaign_service = CampaignService::new(store.clone(), dispatcher);
    let progress_service = ProgressService::new(store);

    log::info!("Levantando servidor en {}:{}", config.bind_addr, config.port);
    HttpServer::new(move || {
        App::new()
            .app_data(web::Data::new(campaign_service.clone()))
            .app_data(web::Data::new(progress_service.clone()))
            .configure(app::init_app)
    })
    .bind((config.bind_addr.as_str(), config.port))?
    .run()
    .await?;

    Ok(())
}
