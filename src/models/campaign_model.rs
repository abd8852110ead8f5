//! models/campaign_model.rs
//! Campañas: registro persistido, estados y DTOs de la API.

use std::fmt;
use std::str::FromStr;

use anyhow::anyhow;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Estado de una campaña.
/// `queued -> sending -> {sent, failed, paused}`, `paused -> sending`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CampaignStatus {
    Queued,
    Sending,
    Sent,
    Failed,
    Paused,
}

impl CampaignStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            CampaignStatus::Queued => "queued",
            CampaignStatus::Sending => "sending",
            CampaignStatus::Sent => "sent",
            CampaignStatus::Failed => "failed",
            CampaignStatus::Paused => "paused",
        }
    }

    /// `sent` y `failed` no admiten más transiciones.
    pub fn is_terminal(&self) -> bool {
        matches!(self, CampaignStatus::Sent | CampaignStatus::Failed)
    }
}

impl fmt::Display for CampaignStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CampaignStatus {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "queued" => Ok(CampaignStatus::Queued),
            "sending" => Ok(CampaignStatus::Sending),
            "sent" => Ok(CampaignStatus::Sent),
            "failed" => Ok(CampaignStatus::Failed),
            "paused" => Ok(CampaignStatus::Paused),
            other => Err(anyhow!("Estado de campaña desconocido: {}", other)),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Campaign {
    pub id: String,
    pub title: String,
    pub subject: String,
    pub html_content: String,
    pub selected_lists: Vec<String>,
    pub webhook_url: Option<String>,
    pub status: CampaignStatus,
    pub total_recipients: i64,
    pub sent_count: i64,
    pub failed_count: i64,
    pub current_sender_index: i64,
    pub current_recipient: Option<String>,
    pub created_at: DateTime<Utc>,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    pub error_message: Option<String>,
}

impl Campaign {
    /// Construye una campaña nueva en estado `queued`.
    pub fn new(req: CreateCampaignRequest) -> Self {
        Campaign {
            id: uuid::Uuid::new_v4().to_string(),
            title: req.title,
            subject: req.subject,
            html_content: req.html_content,
            selected_lists: req.selected_lists,
            webhook_url: req.webhook_url.filter(|url| !url.trim().is_empty()),
            status: CampaignStatus::Queued,
            total_recipients: 0,
            sent_count: 0,
            failed_count: 0,
            current_sender_index: req.sender_sequence.unwrap_or(1),
            current_recipient: None,
            created_at: Utc::now(),
            started_at: None,
            completed_at: None,
            error_message: None,
        }
    }

    /// Destinatarios ya contabilizados (enviados o fallidos).
    pub fn processed_count(&self) -> i64 {
        self.sent_count + self.failed_count
    }
}

/// Request para crear una campaña
#[derive(Debug, Clone, Deserialize)]
pub struct CreateCampaignRequest {
    pub title: String,
    pub subject: String,
    pub html_content: String,
    #[serde(default)]
    pub selected_lists: Vec<String>,
    /// Índice de remitente inicial (>= 1)
    pub sender_sequence: Option<i64>,
    pub webhook_url: Option<String>,
}

impl CreateCampaignRequest {
    pub fn validate(&self) -> Result<(), String> {
        if self.title.trim().is_empty() {
            return Err("title no puede estar vacío".to_string());
        }
        if self.subject.trim().is_empty() {
            return Err("subject no puede estar vacío".to_string());
        }
        if let Some(seq) = self.sender_sequence {
            if seq < 1 {
                return Err(format!("sender_sequence debe ser >= 1 (recibido {})", seq));
            }
        }
        Ok(())
    }
}

/// Vista de progreso de una campaña
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CampaignProgress {
    pub campaign_id: String,
    pub total_recipients: i64,
    pub sent_count: i64,
    pub failed_count: i64,
    pub status: CampaignStatus,
    pub progress_percentage: f64,
    pub current_recipient: Option<String>,
    pub current_sender_index: i64,
    pub error_message: Option<String>,
}

/// Para listar campañas con paginación
#[derive(Debug, Clone, Serialize)]
pub struct ListCampaignsResponse {
    pub total: u64,
    pub page: u64,
    pub page_size: u64,
    pub items: Vec<Campaign>,
}

/// Resultado de una transición de estado con guarda.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransitionOutcome {
    Applied,
    NotFound,
    InvalidState(CampaignStatus),
}
