//! handlers/mod.rs
pub mod campaign_handler;
pub mod settings_handler;
