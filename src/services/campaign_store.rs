//! services/campaign_store.rs
//! Acceso a SQLite: campañas, contactos, membresías y settings de rotación.
//! Todas las escrituras de campaña son updates puntuales por id (con guarda de
//! estado cuando aplica), nunca read-modify-write del documento completo.

use std::str::FromStr;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions, SqliteRow};
use sqlx::{Pool, Row, Sqlite};

use crate::models::{
    campaign_model::{Campaign, CampaignStatus, ListCampaignsResponse, TransitionOutcome},
    recipient_model::Contact,
    settings_model::SenderRotationSettings,
};

const CAMPAIGN_COLUMNS: &str = r#"
    id, title, subject, html_content, selected_lists, webhook_url, status,
    total_recipients, sent_count, failed_count, current_sender_index,
    current_recipient, created_at, started_at, completed_at, error_message
"#;

#[derive(Clone, Debug)]
pub struct CampaignStore {
    db_pool: Pool<Sqlite>,
}

impl CampaignStore {
    pub fn new(db_pool: Pool<Sqlite>) -> Self {
        CampaignStore { db_pool }
    }

    /// Abre (o crea) la base SQLite indicada.
    pub async fn connect(database_url: &str) -> Result<Pool<Sqlite>> {
        let options = SqliteConnectOptions::from_str(database_url)
            .with_context(|| format!("DATABASE_URL inválida: {}", database_url))?
            .create_if_missing(true);

        SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(options)
            .await
            .with_context(|| format!("No se pudo conectar a {}", database_url))
    }

    /// Corre migraciones con sqlx
    pub async fn run_migrations(&self) -> Result<()> {
        sqlx::migrate!("./migrations")
            .run(&self.db_pool)
            .await
            .context("Failed to run campaign migrations")?;
        Ok(())
    }

    // ----------------------------------------------------------------
    // Campañas
    // ----------------------------------------------------------------

    pub async fn insert_campaign(&self, campaign: &Campaign) -> Result<()> {
        let selected_lists = serde_json::to_string(&campaign.selected_lists)?;

        sqlx::query(
            r#"
            INSERT INTO campaigns (
                id, title, subject, html_content, selected_lists, webhook_url, status,
                total_recipients, sent_count, failed_count, current_sender_index,
                current_recipient, created_at, started_at, completed_at, error_message
            )
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16)
            "#,
        )
        .bind(&campaign.id)
        .bind(&campaign.title)
        .bind(&campaign.subject)
        .bind(&campaign.html_content)
        .bind(selected_lists)
        .bind(&campaign.webhook_url)
        .bind(campaign.status.as_str())
        .bind(campaign.total_recipients)
        .bind(campaign.sent_count)
        .bind(campaign.failed_count)
        .bind(campaign.current_sender_index)
        .bind(&campaign.current_recipient)
        .bind(campaign.created_at.to_rfc3339())
        .bind(campaign.started_at.map(|t| t.to_rfc3339()))
        .bind(campaign.completed_at.map(|t| t.to_rfc3339()))
        .bind(&campaign.error_message)
        .execute(&self.db_pool)
        .await
        .context("Fallo al insertar campaña")?;

        Ok(())
    }

    pub async fn get_campaign(&self, campaign_id: &str) -> Result<Option<Campaign>> {
        let sql = format!("SELECT {CAMPAIGN_COLUMNS} FROM campaigns WHERE id = ?1");
        let row = sqlx::query(&sql)
            .bind(campaign_id)
            .fetch_optional(&self.db_pool)
            .await
            .context("Fallo al leer campaña")?;

        row.map(|r| campaign_from_row(&r)).transpose()
    }

    /// Lista campañas con paginación, más recientes primero
    pub async fn list_campaigns(&self, page: u64, page_size: u64) -> Result<ListCampaignsResponse> {
        let page = page.max(1);
        let limit = page_size.min(i64::MAX as u64) as i64;
        let offset = page
            .saturating_sub(1)
            .saturating_mul(page_size)
            .min(i64::MAX as u64) as i64;

        let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM campaigns")
            .fetch_one(&self.db_pool)
            .await?;

        let sql = format!(
            "SELECT {CAMPAIGN_COLUMNS} FROM campaigns ORDER BY created_at DESC LIMIT ?1 OFFSET ?2"
        );
        let rows = sqlx::query(&sql)
            .bind(limit)
            .bind(offset)
            .fetch_all(&self.db_pool)
            .await?;

        let items = rows
            .iter()
            .map(campaign_from_row)
            .collect::<Result<Vec<_>>>()?;

        Ok(ListCampaignsResponse {
            total: total as u64,
            page,
            page_size,
            items,
        })
    }

    /// Lee sólo el estado, sin caché: es la señal de pausa del loop de envío.
    pub async fn get_status(&self, campaign_id: &str) -> Result<Option<CampaignStatus>> {
        let status: Option<String> =
            sqlx::query_scalar("SELECT status FROM campaigns WHERE id = ?1")
                .bind(campaign_id)
                .fetch_optional(&self.db_pool)
                .await
                .context("Fallo al leer estado de campaña")?;

        status.map(|s| s.parse()).transpose()
    }

    /// `from -> to` sólo si el estado actual es exactamente `from`.
    /// Al volver a `sending` se libera el token: la corrida anterior queda
    /// desplazada y la próxima `mark_sending` toma la campaña.
    pub async fn transition_status(
        &self,
        campaign_id: &str,
        from: CampaignStatus,
        to: CampaignStatus,
    ) -> Result<TransitionOutcome> {
        let result = sqlx::query(
            r#"
            UPDATE campaigns
            SET status = ?1,
                dispatch_token = CASE WHEN ?1 = 'sending' THEN NULL ELSE dispatch_token END
            WHERE id = ?2 AND status = ?3
            "#,
        )
        .bind(to.as_str())
        .bind(campaign_id)
        .bind(from.as_str())
        .execute(&self.db_pool)
        .await
        .context("Fallo al actualizar estado de campaña")?;

        if result.rows_affected() > 0 {
            return Ok(TransitionOutcome::Applied);
        }

        Ok(match self.get_status(campaign_id).await? {
            None => TransitionOutcome::NotFound,
            Some(current) => TransitionOutcome::InvalidState(current),
        })
    }

    /// Pasa a `sending` (desde `queued` o `sending`), sella `started_at` si
    /// falta y deja `token` como dueño de la corrida. Devuelve false si la
    /// campaña está pausada, terminada o no existe.
    pub async fn mark_sending(
        &self,
        campaign_id: &str,
        token: &str,
        now: DateTime<Utc>,
    ) -> Result<bool> {
        let result = sqlx::query(
            r#"
            UPDATE campaigns
            SET status = 'sending',
                started_at = COALESCE(started_at, ?1),
                dispatch_token = ?2
            WHERE id = ?3 AND status IN ('queued', 'sending')
            "#,
        )
        .bind(now.to_rfc3339())
        .bind(token)
        .bind(campaign_id)
        .execute(&self.db_pool)
        .await
        .context("Fallo al marcar campaña como sending")?;

        Ok(result.rows_affected() > 0)
    }

    /// Estado actual y token de la corrida dueña, leídos en una sola consulta.
    pub async fn get_run_state(
        &self,
        campaign_id: &str,
    ) -> Result<Option<(CampaignStatus, Option<String>)>> {
        let row = sqlx::query(r#"SELECT status, dispatch_token FROM campaigns WHERE id = ?1"#)
            .bind(campaign_id)
            .fetch_optional(&self.db_pool)
            .await
            .context("Fallo al leer estado de campaña")?;

        row.map(|r| -> Result<(CampaignStatus, Option<String>)> {
            let status: String = r.try_get("status")?;
            Ok((status.parse()?, r.try_get("dispatch_token")?))
        })
        .transpose()
    }

    pub async fn set_total_recipients(
        &self,
        campaign_id: &str,
        token: &str,
        total: i64,
    ) -> Result<bool> {
        let result = sqlx::query(
            r#"UPDATE campaigns SET total_recipients = ?1 WHERE id = ?2 AND dispatch_token = ?3"#,
        )
        .bind(total)
        .bind(campaign_id)
        .bind(token)
        .execute(&self.db_pool)
        .await
        .context("Fallo al guardar total_recipients")?;
        Ok(result.rows_affected() > 0)
    }

    pub async fn set_current_recipient(
        &self,
        campaign_id: &str,
        token: &str,
        email: &str,
    ) -> Result<bool> {
        let result = sqlx::query(
            r#"UPDATE campaigns SET current_recipient = ?1 WHERE id = ?2 AND dispatch_token = ?3"#,
        )
        .bind(email)
        .bind(campaign_id)
        .bind(token)
        .execute(&self.db_pool)
        .await
        .context("Fallo al guardar current_recipient")?;
        Ok(result.rows_affected() > 0)
    }

    /// Contadores + remitente + destinatario actual en un solo UPDATE.
    /// false si otra corrida tomó la campaña.
    pub async fn record_delivery(
        &self,
        campaign_id: &str,
        token: &str,
        progress: &DeliveryProgress<'_>,
    ) -> Result<bool> {
        let result = sqlx::query(
            r#"
            UPDATE campaigns
            SET sent_count = ?1,
                failed_count = ?2,
                current_sender_index = ?3,
                current_recipient = ?4
            WHERE id = ?5 AND dispatch_token = ?6
            "#,
        )
        .bind(progress.sent_count)
        .bind(progress.failed_count)
        .bind(progress.sender_index)
        .bind(progress.current_recipient)
        .bind(campaign_id)
        .bind(token)
        .execute(&self.db_pool)
        .await
        .context("Fallo al guardar progreso de envío")?;
        Ok(result.rows_affected() > 0)
    }

    /// Cierra la corrida: `sending -> sent|failed`. Si entretanto llegó una
    /// pausa (u otra corrida tomó la campaña) no se toca nada y devuelve false.
    pub async fn finish_campaign(
        &self,
        campaign_id: &str,
        token: &str,
        final_status: CampaignStatus,
        now: DateTime<Utc>,
    ) -> Result<bool> {
        let result = sqlx::query(
            r#"
            UPDATE campaigns
            SET status = ?1,
                completed_at = ?2,
                current_recipient = NULL
            WHERE id = ?3 AND status = 'sending' AND dispatch_token = ?4
            "#,
        )
        .bind(final_status.as_str())
        .bind(now.to_rfc3339())
        .bind(campaign_id)
        .bind(token)
        .execute(&self.db_pool)
        .await
        .context("Fallo al cerrar campaña")?;

        Ok(result.rows_affected() > 0)
    }

    /// Marca `failed` con el mensaje de error, sólo si la campaña es de esta
    /// corrida (`token`) o si todavía nadie la tomó y no está pausada ni
    /// terminada. Devuelve false si no se tocó nada.
    pub async fn mark_failed(
        &self,
        campaign_id: &str,
        token: &str,
        error: &str,
        now: DateTime<Utc>,
    ) -> Result<bool> {
        let result = sqlx::query(
            r#"
            UPDATE campaigns
            SET status = 'failed',
                error_message = ?1,
                completed_at = ?2
            WHERE id = ?3
              AND status IN ('queued', 'sending', 'paused')
              AND (
                  dispatch_token = ?4
                  OR (dispatch_token IS NULL AND status IN ('queued', 'sending'))
              )
            "#,
        )
        .bind(error)
        .bind(now.to_rfc3339())
        .bind(campaign_id)
        .bind(token)
        .execute(&self.db_pool)
        .await
        .context("Fallo al marcar campaña como failed")?;
        Ok(result.rows_affected() > 0)
    }

    // ----------------------------------------------------------------
    // Contactos y listas (sólo lectura desde el motor)
    // ----------------------------------------------------------------

    /// IDs de contacto de una lista, en orden de inserción.
    pub async fn list_member_ids(&self, list_id: &str) -> Result<Vec<String>> {
        let ids: Vec<String> = sqlx::query_scalar(
            r#"SELECT contact_id FROM contact_lists WHERE list_id = ?1 ORDER BY position"#,
        )
        .bind(list_id)
        .fetch_all(&self.db_pool)
        .await
        .context("Fallo al leer miembros de lista")?;
        Ok(ids)
    }

    pub async fn get_contact(&self, contact_id: &str) -> Result<Option<Contact>> {
        let row = sqlx::query(
            r#"SELECT id, email, first_name, last_name FROM contacts WHERE id = ?1"#,
        )
        .bind(contact_id)
        .fetch_optional(&self.db_pool)
        .await
        .context("Fallo al leer contacto")?;

        row.map(|r| -> Result<Contact> {
            Ok(Contact {
                id: r.try_get("id")?,
                email: r.try_get("email")?,
                first_name: r.try_get("first_name")?,
                last_name: r.try_get("last_name")?,
            })
        })
        .transpose()
    }

    #[cfg(test)]
    pub async fn insert_contact(&self, contact: &Contact) -> Result<()> {
        sqlx::query(
            r#"INSERT INTO contacts (id, email, first_name, last_name) VALUES (?1, ?2, ?3, ?4)"#,
        )
        .bind(&contact.id)
        .bind(&contact.email)
        .bind(&contact.first_name)
        .bind(&contact.last_name)
        .execute(&self.db_pool)
        .await?;
        Ok(())
    }

    #[cfg(test)]
    pub async fn add_contact_to_list(&self, list_id: &str, contact_id: &str) -> Result<()> {
        sqlx::query(r#"INSERT INTO contact_lists (list_id, contact_id) VALUES (?1, ?2)"#)
            .bind(list_id)
            .bind(contact_id)
            .execute(&self.db_pool)
            .await?;
        Ok(())
    }

    // ----------------------------------------------------------------
    // Settings de rotación
    // ----------------------------------------------------------------

    pub async fn get_rotation_settings(&self) -> Result<Option<SenderRotationSettings>> {
        let row = sqlx::query(
            r#"SELECT emails_per_sender, max_sender_sequence FROM campaign_settings WHERE id = 1"#,
        )
        .fetch_optional(&self.db_pool)
        .await
        .context("Fallo al leer campaign_settings")?;

        row.map(|r| -> Result<SenderRotationSettings> {
            Ok(SenderRotationSettings {
                emails_per_sender: r.try_get("emails_per_sender")?,
                max_sender_sequence: r.try_get("max_sender_sequence")?,
            })
        })
        .transpose()
    }

    pub async fn save_rotation_settings(&self, settings: &SenderRotationSettings) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO campaign_settings (id, emails_per_sender, max_sender_sequence, updated_at)
            VALUES (1, ?1, ?2, ?3)
            ON CONFLICT(id) DO UPDATE SET
                emails_per_sender = excluded.emails_per_sender,
                max_sender_sequence = excluded.max_sender_sequence,
                updated_at = excluded.updated_at
            "#,
        )
        .bind(settings.emails_per_sender)
        .bind(settings.max_sender_sequence)
        .bind(Utc::now().to_rfc3339())
        .execute(&self.db_pool)
        .await
        .context("Fallo al guardar campaign_settings")?;
        Ok(())
    }
}

/// Snapshot de progreso que se persiste tras cada destinatario.
#[derive(Debug, Clone, Copy)]
pub struct DeliveryProgress<'a> {
    pub sent_count: i64,
    pub failed_count: i64,
    pub sender_index: i64,
    pub current_recipient: &'a str,
}

fn campaign_from_row(row: &SqliteRow) -> Result<Campaign> {
    let selected_lists: String = row.try_get("selected_lists")?;
    let status: String = row.try_get("status")?;
    let created_at: String = row.try_get("created_at")?;

    Ok(Campaign {
        id: row.try_get("id")?,
        title: row.try_get("title")?,
        subject: row.try_get("subject")?,
        html_content: row.try_get("html_content")?,
        selected_lists: serde_json::from_str(&selected_lists)
            .context("selected_lists no es JSON válido")?,
        webhook_url: row.try_get("webhook_url")?,
        status: status.parse()?,
        total_recipients: row.try_get("total_recipients")?,
        sent_count: row.try_get("sent_count")?,
        failed_count: row.try_get("failed_count")?,
        current_sender_index: row.try_get("current_sender_index")?,
        current_recipient: row.try_get("current_recipient")?,
        created_at: created_at.parse()?,
        started_at: parse_optional_ts(row.try_get("started_at")?)?,
        completed_at: parse_optional_ts(row.try_get("completed_at")?)?,
        error_message: row.try_get("error_message")?,
    })
}

fn parse_optional_ts(raw: Option<String>) -> Result<Option<DateTime<Utc>>> {
    raw.map(|s| s.parse::<DateTime<Utc>>().context("timestamp inválido"))
        .transpose()
}
