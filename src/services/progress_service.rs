//! services/progress_service.rs
//! Proyección de sólo lectura del estado de una campaña.

use anyhow::Result;

use crate::{
    models::campaign_model::{Campaign, CampaignProgress},
    services::campaign_store::CampaignStore,
};

#[derive(Clone, Debug)]
pub struct ProgressService {
    store: CampaignStore,
}

impl ProgressService {
    pub fn new(store: CampaignStore) -> Self {
        ProgressService { store }
    }

    /// Último snapshot persistido; `None` si la campaña no existe.
    /// No espera al motor de envío: lee lo que haya en DB.
    pub async fn progress(&self, campaign_id: &str) -> Result<Option<CampaignProgress>> {
        Ok(self
            .store
            .get_campaign(campaign_id)
            .await?
            .map(|campaign| progress_view(&campaign)))
    }
}

pub fn progress_view(campaign: &Campaign) -> CampaignProgress {
    CampaignProgress {
        campaign_id: campaign.id.clone(),
        total_recipients: campaign.total_recipients,
        sent_count: campaign.sent_count,
        failed_count: campaign.failed_count,
        status: campaign.status,
        progress_percentage: progress_percentage(campaign.sent_count, campaign.total_recipients),
        current_recipient: campaign.current_recipient.clone(),
        current_sender_index: campaign.current_sender_index,
        error_message: campaign.error_message.clone(),
    }
}

/// `sent / total * 100`, o 0 mientras no haya destinatarios.
pub fn progress_percentage(sent_count: i64, total_recipients: i64) -> f64 {
    if total_recipients > 0 {
        sent_count as f64 / total_recipients as f64 * 100.0
    } else {
        0.0
    }
}
