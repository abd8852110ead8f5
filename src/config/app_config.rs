//! config/app_config.rs
//! Configuración del proceso, leída de variables de entorno (.env vía dotenv).

use std::env;
use std::str::FromStr;
use std::time::Duration;

use anyhow::{Context, Result};

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub database_url: String,
    pub bind_addr: String,
    pub port: u16,
    /// Timeout por destinatario al llamar al webhook
    pub webhook_timeout: Duration,
    /// Demora del envío simulado (campañas sin webhook)
    pub simulated_delivery_delay: Duration,
}

impl Default for AppConfig {
    fn default() -> Self {
        AppConfig {
            database_url: "sqlite:./data/campaigns.db".to_string(),
            bind_addr: "0.0.0.0".to_string(),
            port: 5022,
            webhook_timeout: Duration::from_secs(30),
            simulated_delivery_delay: Duration::from_millis(500),
        }
    }
}

impl AppConfig {
    pub fn from_env() -> Result<Self> {
        let defaults = AppConfig::default();

        Ok(AppConfig {
            database_url: env::var("DATABASE_URL").unwrap_or(defaults.database_url),
            bind_addr: env::var("BIND_ADDR").unwrap_or(defaults.bind_addr),
            port: parse_var("PORT")?.unwrap_or(defaults.port),
            webhook_timeout: parse_var("WEBHOOK_TIMEOUT_SECS")?
                .map(Duration::from_secs)
                .unwrap_or(defaults.webhook_timeout),
            simulated_delivery_delay: parse_var("SIMULATED_DELIVERY_MS")?
                .map(Duration::from_millis)
                .unwrap_or(defaults.simulated_delivery_delay),
        })
    }
}

fn parse_var<T>(key: &str) -> Result<Option<T>>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse::<T>()
            .map(Some)
            .with_context(|| format!("Valor inválido para {}: '{}'", key, raw)),
        Err(_) => Ok(None),
    }
}
