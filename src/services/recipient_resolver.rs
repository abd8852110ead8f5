//! services/recipient_resolver.rs
//! Convierte las listas de una campaña en destinatarios concretos.

use std::collections::HashSet;

use anyhow::Result;

use crate::{
    models::recipient_model::{Contact, Recipient, ResolvedRecipients},
    services::campaign_store::CampaignStore,
};

#[derive(Clone, Debug)]
pub struct RecipientResolver {
    store: CampaignStore,
}

impl RecipientResolver {
    pub fn new(store: CampaignStore) -> Self {
        RecipientResolver { store }
    }

    /// Recorre las listas en el orden dado; ante emails repetidos gana la
    /// primera aparición. Contactos inexistentes se saltan. Si no queda
    /// ningún destinatario se usa el set de prueba (`used_mock = true`).
    pub async fn resolve(&self, campaign_id: &str, list_ids: &[String]) -> Result<ResolvedRecipients> {
        let mut recipients = Vec::new();
        let mut seen = HashSet::new();

        for list_id in list_ids {
            let member_ids = self.store.list_member_ids(list_id).await?;
            log::debug!(
                "(resolve) campaign={} lista='{}' con {} miembros",
                campaign_id,
                list_id,
                member_ids.len()
            );

            for contact_id in member_ids {
                let Some(contact) = self.store.get_contact(&contact_id).await? else {
                    log::debug!("(resolve) contacto {} no existe, se salta", contact_id);
                    continue;
                };

                if seen.insert(contact.email.clone()) {
                    recipients.push(recipient_from_contact(contact));
                }
            }
        }

        if recipients.is_empty() {
            log::warn!(
                "(resolve) No real contacts found for campaign {}, using mock data",
                campaign_id
            );
            return Ok(ResolvedRecipients {
                recipients: mock_recipients(),
                used_mock: true,
            });
        }

        Ok(ResolvedRecipients {
            recipients,
            used_mock: false,
        })
    }
}

fn recipient_from_contact(contact: Contact) -> Recipient {
    let name = display_name(&contact);
    Recipient {
        email: contact.email,
        name,
        contact_id: contact.id,
    }
}

/// "first last" si hay nombre; si no, se deriva del email.
pub fn display_name(contact: &Contact) -> String {
    let first = contact.first_name.as_deref().unwrap_or("").trim();
    if !first.is_empty() {
        return match contact.last_name.as_deref().map(str::trim) {
            Some(last) if !last.is_empty() => format!("{} {}", first, last),
            _ => first.to_string(),
        };
    }
    name_from_email(&contact.email)
}

/// "maria.lopez_dev@x.com" -> "Maria Lopez Dev"
pub fn name_from_email(email: &str) -> String {
    let local = email.split('@').next().unwrap_or("");
    local
        .replace(['.', '_', '-'], " ")
        .split(' ')
        .map(title_case_word)
        .collect::<Vec<_>>()
        .join(" ")
}

// Mayúscula al inicio de cada tramo alfabético, resto en minúscula
fn title_case_word(word: &str) -> String {
    let mut out = String::with_capacity(word.len());
    let mut prev_is_alpha = false;
    for c in word.chars() {
        if c.is_alphabetic() {
            if prev_is_alpha {
                out.extend(c.to_lowercase());
            } else {
                out.extend(c.to_uppercase());
            }
            prev_is_alpha = true;
        } else {
            out.push(c);
            prev_is_alpha = false;
        }
    }
    out
}

pub fn mock_recipients() -> Vec<Recipient> {
    (1..=3)
        .map(|i| Recipient {
            email: format!("test{}@example.com", i),
            name: format!("Test User {}", i),
            contact_id: format!("mock{}", i),
        })
        .collect()
}
