//! models/settings_model.rs
//! Configuración de rotación de remitentes (fila única en `campaign_settings`).

use serde::{Deserialize, Serialize};

pub const DEFAULT_EMAILS_PER_SENDER: i64 = 50;
pub const DEFAULT_MAX_SENDER_SEQUENCE: i64 = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SenderRotationSettings {
    pub emails_per_sender: i64,
    pub max_sender_sequence: i64,
}

impl Default for SenderRotationSettings {
    fn default() -> Self {
        SenderRotationSettings {
            emails_per_sender: DEFAULT_EMAILS_PER_SENDER,
            max_sender_sequence: DEFAULT_MAX_SENDER_SEQUENCE,
        }
    }
}

impl SenderRotationSettings {
    /// Reemplaza valores <= 0 por los defaults (50, 3).
    pub fn normalized(self) -> Self {
        SenderRotationSettings {
            emails_per_sender: if self.emails_per_sender > 0 {
                self.emails_per_sender
            } else {
                DEFAULT_EMAILS_PER_SENDER
            },
            max_sender_sequence: if self.max_sender_sequence > 0 {
                self.max_sender_sequence
            } else {
                DEFAULT_MAX_SENDER_SEQUENCE
            },
        }
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.emails_per_sender <= 0 {
            return Err("emails_per_sender debe ser > 0".to_string());
        }
        if self.max_sender_sequence <= 0 {
            return Err("max_sender_sequence debe ser > 0".to_string());
        }
        Ok(())
    }
}

/// Respuesta de GET /api/settings/rotation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RotationSettingsResponse {
    #[serde(flatten)]
    pub settings: SenderRotationSettings,
    /// true si no hay fila guardada y se devuelven los defaults
    pub using_defaults: bool,
}
