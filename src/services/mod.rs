//! services/mod.rs
//! Módulo que agrupa los servicios del motor de campañas.

pub mod campaign_dispatcher;
pub mod campaign_service;
pub mod campaign_store;
pub mod delivery_client;
pub mod progress_service;
pub mod recipient_resolver;
pub mod sender_rotation;
