//! services/campaign_dispatcher.rs
//! Motor de envío de campañas: una corrida por campaña, en segundo plano.
//!
//! Cada corrida toma la campaña con un token propio (`dispatch_token`). En cada
//! frontera de destinatario se relee el estado desde la DB: si está `paused`
//! la corrida termina sin tocar nada más; si el token ya no es el suyo (otra
//! corrida la tomó tras un resume) también termina, y sus escrituras
//! posteriores quedan descartadas por la guarda del UPDATE.

use anyhow::{anyhow, Result};
use chrono::Utc;
use tokio::task::JoinHandle;
use uuid::Uuid;

use crate::{
    models::{
        campaign_model::{Campaign, CampaignStatus},
        recipient_model::Recipient,
        settings_model::SenderRotationSettings,
    },
    services::{
        campaign_store::{CampaignStore, DeliveryProgress},
        delivery_client::DeliveryClient,
        progress_service::progress_percentage,
        recipient_resolver::RecipientResolver,
        sender_rotation::sender_index_for,
    },
};

/// Cómo terminó una corrida.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DispatchOutcome {
    /// La campaña no existe.
    NotFound,
    /// La campaña no estaba en un estado que admita envío.
    NotRunnable(CampaignStatus),
    /// Se detuvo por una pausa.
    Paused { sent_count: i64, failed_count: i64 },
    /// Otra corrida tomó la campaña.
    Superseded,
    /// Terminó de recorrer los destinatarios.
    Completed {
        status: CampaignStatus,
        sent_count: i64,
        failed_count: i64,
    },
    /// Error inesperado; ya quedó registrado en `error_message`.
    Failed(String),
}

/// Qué dice la DB en una frontera de destinatario.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunSignal {
    Continue,
    Paused,
    Superseded,
}

/// Señal de cancelación cooperativa: se evalúa contra la DB, nunca contra un
/// estado cacheado en memoria.
pub struct PauseSignal<'a> {
    store: &'a CampaignStore,
    campaign_id: &'a str,
    token: &'a str,
}

impl<'a> PauseSignal<'a> {
    pub fn new(store: &'a CampaignStore, campaign_id: &'a str, token: &'a str) -> Self {
        PauseSignal {
            store,
            campaign_id,
            token,
        }
    }

    pub async fn check(&self) -> Result<RunSignal> {
        let (status, owner) = self
            .store
            .get_run_state(self.campaign_id)
            .await?
            .ok_or_else(|| anyhow!("La campaña {} desapareció durante el envío", self.campaign_id))?;

        if status == CampaignStatus::Paused {
            return Ok(RunSignal::Paused);
        }
        if owner.as_deref() != Some(self.token) {
            return Ok(RunSignal::Superseded);
        }
        Ok(RunSignal::Continue)
    }
}

#[derive(Clone, Debug)]
pub struct CampaignDispatcher {
    store: CampaignStore,
    resolver: RecipientResolver,
    delivery: DeliveryClient,
}

impl CampaignDispatcher {
    pub fn new(store: CampaignStore, delivery: DeliveryClient) -> Self {
        CampaignDispatcher {
            resolver: RecipientResolver::new(store.clone()),
            store,
            delivery,
        }
    }

    /// Lanza la corrida en una task independiente y vuelve enseguida.
    /// Los errores nunca vuelven al que la lanzó; quedan en la campaña.
    pub fn spawn(&self, campaign_id: String) -> JoinHandle<DispatchOutcome> {
        let dispatcher = self.clone();
        tokio::spawn(async move {
            let outcome = dispatcher.dispatch(&campaign_id).await;
            log::info!("(spawn) Campaign {} run ended: {:?}", campaign_id, outcome);
            outcome
        })
    }

    /// Corrida completa. Cualquier error inesperado se captura acá, una sola
    /// vez: la campaña queda `failed` con el error en `error_message`, salvo
    /// que ya esté terminada o pertenezca a otra corrida.
    pub async fn dispatch(&self, campaign_id: &str) -> DispatchOutcome {
        let token = Uuid::new_v4().to_string();
        match self.run(campaign_id, &token).await {
            Ok(outcome) => outcome,
            Err(e) => {
                let error = format!("{:#}", e);
                log::error!("(dispatch) Campaign {} sending error: {}", campaign_id, error);
                match self
                    .store
                    .mark_failed(campaign_id, &token, &error, Utc::now())
                    .await
                {
                    Ok(true) => {}
                    Ok(false) => log::warn!(
                        "(dispatch) Campaign {} no pertenece a esta corrida, no se marca failed",
                        campaign_id
                    ),
                    Err(mark_err) => log::error!(
                        "(dispatch) No se pudo marcar campaign {} como failed: {:?}",
                        campaign_id,
                        mark_err
                    ),
                }
                DispatchOutcome::Failed(error)
            }
        }
    }

    async fn run(&self, campaign_id: &str, token: &str) -> Result<DispatchOutcome> {
        // 1) la campaña tiene que existir
        if self.store.get_campaign(campaign_id).await?.is_none() {
            log::error!("(dispatch) Campaign {} not found", campaign_id);
            return Ok(DispatchOutcome::NotFound);
        }

        // 2) settings de rotación, una vez por corrida
        let settings = self.load_rotation_settings().await?;

        // 3) tomar la campaña
        if !self.store.mark_sending(campaign_id, token, Utc::now()).await? {
            return Ok(match self.store.get_status(campaign_id).await? {
                Some(status) => {
                    if status.is_terminal() {
                        log::warn!(
                            "(dispatch) Campaign {} already finished as '{}'",
                            campaign_id,
                            status
                        );
                    } else {
                        log::info!(
                            "(dispatch) Campaign {} is '{}', nothing to send",
                            campaign_id,
                            status
                        );
                    }
                    DispatchOutcome::NotRunnable(status)
                }
                None => DispatchOutcome::NotFound,
            });
        }

        // Contadores leídos después de tomar la campaña: sólo escribe la dueña del token.
        let Some(campaign) = self.store.get_campaign(campaign_id).await? else {
            return Ok(DispatchOutcome::NotFound);
        };

        // 4) destinatarios
        let resolved = self
            .resolver
            .resolve(campaign_id, &campaign.selected_lists)
            .await?;

        let mut sent_count = campaign.sent_count;
        let mut failed_count = campaign.failed_count;
        let already_processed = campaign.processed_count();
        let resolved_len = resolved.recipients.len() as i64;

        if already_processed > resolved_len {
            log::warn!(
                "(dispatch) Campaign {} already processed {} recipients but only {} resolve now",
                campaign_id,
                already_processed,
                resolved_len
            );
        }
        let total_recipients = resolved_len.max(already_processed);

        if !self
            .store
            .set_total_recipients(campaign_id, token, total_recipients)
            .await?
        {
            return Ok(DispatchOutcome::Superseded);
        }

        log::info!(
            "(dispatch) Campaign {} starting with {} recipients (mock={}, offset={}, emails_per_sender={}, max_sender_sequence={})",
            campaign_id,
            total_recipients,
            resolved.used_mock,
            already_processed,
            settings.emails_per_sender,
            settings.max_sender_sequence
        );

        // 5) un destinatario por vez, en orden
        let signal = PauseSignal::new(&self.store, campaign_id, token);
        let pending = resolved
            .recipients
            .iter()
            .skip(already_processed as usize);

        for recipient in pending {
            match signal.check().await? {
                RunSignal::Continue => {}
                RunSignal::Paused => {
                    log::info!("(dispatch) Campaign {} paused, stopping sending", campaign_id);
                    return Ok(DispatchOutcome::Paused {
                        sent_count,
                        failed_count,
                    });
                }
                RunSignal::Superseded => {
                    log::warn!("(dispatch) Campaign {} taken by another run", campaign_id);
                    return Ok(DispatchOutcome::Superseded);
                }
            }

            let sender_index = sender_index_for(sent_count, &settings);

            if !self
                .store
                .set_current_recipient(campaign_id, token, &recipient.email)
                .await?
            {
                return Ok(DispatchOutcome::Superseded);
            }

            if self.deliver_one(&campaign, recipient, sender_index).await {
                sent_count += 1;
            } else {
                failed_count += 1;
            }

            let progress = DeliveryProgress {
                sent_count,
                failed_count,
                sender_index,
                current_recipient: &recipient.email,
            };
            if !self
                .store
                .record_delivery(campaign_id, token, &progress)
                .await?
            {
                return Ok(DispatchOutcome::Superseded);
            }

            log::info!(
                "(dispatch) Campaign {} progress: {}/{} ({:.1}%), failed={}",
                campaign_id,
                sent_count,
                total_recipients,
                progress_percentage(sent_count, total_recipients),
                failed_count
            );
        }

        // 6) cierre
        let final_status = if failed_count == 0 {
            CampaignStatus::Sent
        } else {
            CampaignStatus::Failed
        };

        if !self
            .store
            .finish_campaign(campaign_id, token, final_status, Utc::now())
            .await?
        {
            if signal.check().await? == RunSignal::Superseded {
                log::warn!("(dispatch) Campaign {} taken by another run", campaign_id);
                return Ok(DispatchOutcome::Superseded);
            }
            // una pausa llegó después del último destinatario; el resume cerrará
            log::info!(
                "(dispatch) Campaign {} paused before completion could be recorded",
                campaign_id
            );
            return Ok(DispatchOutcome::Paused {
                sent_count,
                failed_count,
            });
        }

        log::info!(
            "(dispatch) Campaign {} completed: {} sent, {} failed",
            campaign_id,
            sent_count,
            failed_count
        );

        Ok(DispatchOutcome::Completed {
            status: final_status,
            sent_count,
            failed_count,
        })
    }

    async fn deliver_one(
        &self,
        campaign: &Campaign,
        recipient: &Recipient,
        sender_index: i64,
    ) -> bool {
        self.delivery
            .deliver(
                recipient,
                &campaign.subject,
                &campaign.html_content,
                sender_index,
                campaign.webhook_url.as_deref(),
            )
            .await
    }

    async fn load_rotation_settings(&self) -> Result<SenderRotationSettings> {
        Ok(match self.store.get_rotation_settings().await? {
            Some(stored) => stored.normalized(),
            None => SenderRotationSettings::default(),
        })
    }
}
