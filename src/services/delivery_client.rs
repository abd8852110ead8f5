//! services/delivery_client.rs
//! Entrega de un email vía webhook externo (un solo intento, sin reintentos).
//! Sin webhook configurado se simula el envío con una demora fija.

use std::time::Duration;

use anyhow::{Context, Result};
use chrono::Utc;
use reqwest::{Client, StatusCode};
use serde::Serialize;

use crate::models::recipient_model::Recipient;

/// Payload que recibe el webhook de automatización
#[derive(Debug, Clone, Serialize)]
pub struct WebhookPayload<'a> {
    pub to: &'a str,
    pub name: &'a str,
    pub subject: &'a str,
    pub html: &'a str,
    pub sender_sequence: i64,
    pub timestamp: String,
}

#[derive(Clone, Debug)]
pub struct DeliveryClient {
    http_client: Client,
    simulated_delay: Duration,
}

impl DeliveryClient {
    pub fn new(timeout: Duration, simulated_delay: Duration) -> Result<Self> {
        let http_client = Client::builder()
            .timeout(timeout)
            .build()
            .context("No se pudo construir el cliente HTTP")?;

        Ok(DeliveryClient {
            http_client,
            simulated_delay,
        })
    }

    /// true si el destinatario quedó enviado. Los errores se loguean acá y
    /// nunca se propagan: para el motor son sólo un `failed_count` más.
    pub async fn deliver(
        &self,
        recipient: &Recipient,
        subject: &str,
        html_body: &str,
        sender_index: i64,
        webhook_url: Option<&str>,
    ) -> bool {
        let Some(url) = webhook_url else {
            tokio::time::sleep(self.simulated_delay).await;
            log::info!(
                "(deliver) simulated send to {} with sender sequence {} (no webhook)",
                recipient.email,
                sender_index
            );
            return true;
        };

        let payload = WebhookPayload {
            to: &recipient.email,
            name: &recipient.name,
            subject,
            html: html_body,
            sender_sequence: sender_index,
            timestamp: Utc::now().to_rfc3339(),
        };

        match self.post_webhook(url, &payload).await {
            Ok(status) if status == StatusCode::OK => {
                log::info!(
                    "(deliver) Email sent to {} with sender sequence {}",
                    recipient.email,
                    sender_index
                );
                true
            }
            Ok(status) => {
                log::error!(
                    "(deliver) Webhook failed for {}: status={}",
                    recipient.email,
                    status
                );
                false
            }
            Err(e) => {
                log::error!("(deliver) Webhook error for {}: {:?}", recipient.email, e);
                false
            }
        }
    }

    async fn post_webhook(&self, url: &str, payload: &WebhookPayload<'_>) -> Result<StatusCode> {
        let resp = self
            .http_client
            .post(url)
            .json(payload)
            .send()
            .await
            .context("Fallo al hacer POST al webhook")?;

        Ok(resp.status())
    }
}
