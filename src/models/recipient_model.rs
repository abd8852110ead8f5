//! models/recipient_model.rs

use serde::{Deserialize, Serialize};

/// Contacto tal como se guarda en DB (externo, sólo lectura).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Contact {
    pub id: String,
    pub email: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
}

/// Destinatario resuelto para una campaña (no se persiste).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Recipient {
    pub email: String,
    pub name: String,
    pub contact_id: String,
}

#[derive(Debug, Clone)]
pub struct ResolvedRecipients {
    pub recipients: Vec<Recipient>,
    /// true si no hubo contactos reales y se usó el set de prueba
    pub used_mock: bool,
}
