//! services/campaign_service.rs
//! Operaciones expuestas a la API: crear, consultar, pausar y reanudar.
//! Crear y reanudar lanzan el envío en segundo plano y vuelven enseguida.

use anyhow::Result;

use crate::{
    models::{
        campaign_model::{
            Campaign, CampaignStatus, CreateCampaignRequest, ListCampaignsResponse,
            TransitionOutcome,
        },
        settings_model::{RotationSettingsResponse, SenderRotationSettings},
    },
    services::{campaign_dispatcher::CampaignDispatcher, campaign_store::CampaignStore},
};

#[derive(Clone, Debug)]
pub struct CampaignService {
    store: CampaignStore,
    dispatcher: CampaignDispatcher,
}

impl CampaignService {
    pub fn new(store: CampaignStore, dispatcher: CampaignDispatcher) -> Self {
        CampaignService { store, dispatcher }
    }

    /// Inserta la campaña en `queued` y lanza su envío.
    pub async fn create_campaign(&self, req: CreateCampaignRequest) -> Result<Campaign> {
        let campaign = Campaign::new(req);
        self.store.insert_campaign(&campaign).await?;

        log::info!(
            "(create_campaign) Campaign {} '{}' queued for lists {:?}",
            campaign.id,
            campaign.title,
            campaign.selected_lists
        );
        self.dispatcher.spawn(campaign.id.clone());

        Ok(campaign)
    }

    pub async fn get_campaign(&self, campaign_id: &str) -> Result<Option<Campaign>> {
        self.store.get_campaign(campaign_id).await
    }

    pub async fn list_campaigns(&self, page: u64, page_size: u64) -> Result<ListCampaignsResponse> {
        self.store.list_campaigns(page, page_size).await
    }

    /// `sending -> paused`. No corta un envío en curso: el motor lo ve en
    /// la próxima frontera de destinatario.
    pub async fn pause_campaign(&self, campaign_id: &str) -> Result<TransitionOutcome> {
        let outcome = self
            .store
            .transition_status(campaign_id, CampaignStatus::Sending, CampaignStatus::Paused)
            .await?;
        log::info!("(pause_campaign) Campaign {}: {:?}", campaign_id, outcome);
        Ok(outcome)
    }

    /// `paused -> sending` y relanza el envío desde donde quedó.
    pub async fn resume_campaign(&self, campaign_id: &str) -> Result<TransitionOutcome> {
        let outcome = self
            .store
            .transition_status(campaign_id, CampaignStatus::Paused, CampaignStatus::Sending)
            .await?;

        if outcome == TransitionOutcome::Applied {
            log::info!("(resume_campaign) Campaign {} resumed", campaign_id);
            self.dispatcher.spawn(campaign_id.to_string());
        } else {
            log::info!("(resume_campaign) Campaign {} not resumed: {:?}", campaign_id, outcome);
        }
        Ok(outcome)
    }

    pub async fn get_rotation_settings(&self) -> Result<RotationSettingsResponse> {
        Ok(match self.store.get_rotation_settings().await? {
            Some(stored) => RotationSettingsResponse {
                settings: stored.normalized(),
                using_defaults: false,
            },
            None => RotationSettingsResponse {
                settings: SenderRotationSettings::default(),
                using_defaults: true,
            },
        })
    }

    /// Las corridas ya lanzadas siguen con los settings que cargaron al empezar.
    pub async fn update_rotation_settings(&self, settings: SenderRotationSettings) -> Result<()> {
        self.store.save_rotation_settings(&settings).await
    }
}
