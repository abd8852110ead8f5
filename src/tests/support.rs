//! tests/support.rs
//! Helpers compartidos por las pruebas.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use actix_web::http::StatusCode;
use actix_web::{web, App, HttpResponse, HttpServer};
use sqlx::{Pool, Sqlite};
use tempfile::TempDir;

use crate::models::campaign_model::{Campaign, CampaignProgress, CreateCampaignRequest};
use crate::models::recipient_model::Contact;
use crate::services::campaign_dispatcher::CampaignDispatcher;
use crate::services::campaign_service::CampaignService;
use crate::services::campaign_store::CampaignStore;
use crate::services::delivery_client::DeliveryClient;
use crate::services::progress_service::ProgressService;

pub struct TestEnv {
    // mantiene vivo el directorio de la DB
    _dir: TempDir,
    pub pool: Pool<Sqlite>,
    pub store: CampaignStore,
    pub dispatcher: CampaignDispatcher,
    pub campaigns: CampaignService,
    pub progress: ProgressService,
}

/// DB nueva por prueba; `simulated_delay` aplica a campañas sin webhook.
pub async fn test_env(simulated_delay: Duration) -> TestEnv {
    let dir = tempfile::tempdir().expect("No se pudo crear tempdir");
    let db_url = format!("sqlite:{}", dir.path().join("campaigns.db").to_string_lossy());

    let pool = CampaignStore::connect(&db_url)
        .await
        .expect("No se pudo abrir SQLite");
    let store = CampaignStore::new(pool.clone());
    store.run_migrations().await.expect("Fallaron migraciones");

    let delivery = DeliveryClient::new(Duration::from_secs(5), simulated_delay)
        .expect("No se pudo crear DeliveryClient");
    let dispatcher = CampaignDispatcher::new(store.clone(), delivery);
    let campaigns = CampaignService::new(store.clone(), dispatcher.clone());
    let progress = ProgressService::new(store.clone());

    TestEnv {
        _dir: dir,
        pool,
        store,
        dispatcher,
        campaigns,
        progress,
    }
}

/// Inserta los contactos y los agrega a `list_id` en ese orden.
pub async fn seed_list(store: &CampaignStore, list_id: &str, contacts: &[(&str, &str)]) {
    for (id, email) in contacts {
        if store.get_contact(id).await.unwrap().is_none() {
            store
                .insert_contact(&Contact {
                    id: id.to_string(),
                    email: email.to_string(),
                    first_name: None,
                    last_name: None,
                })
                .await
                .unwrap();
        }
        store.add_contact_to_list(list_id, id).await.unwrap();
    }
}

/// `n` contactos `user{i}@example.org` en una lista.
pub async fn seed_numbered_list(store: &CampaignStore, list_id: &str, n: usize) {
    let owned: Vec<(String, String)> = (1..=n)
        .map(|i| (format!("{}-c{}", list_id, i), format!("user{}@example.org", i)))
        .collect();
    let refs: Vec<(&str, &str)> = owned.iter().map(|(a, b)| (a.as_str(), b.as_str())).collect();
    seed_list(store, list_id, &refs).await;
}

pub fn campaign_request(lists: &[&str], webhook_url: Option<&str>) -> CreateCampaignRequest {
    CreateCampaignRequest {
        title: "Lanzamiento".to_string(),
        subject: "Novedades".to_string(),
        html_content: "<h1>Hola</h1>".to_string(),
        selected_lists: lists.iter().map(|s| s.to_string()).collect(),
        sender_sequence: None,
        webhook_url: webhook_url.map(String::from),
    }
}

pub async fn create(env: &TestEnv, lists: &[&str], webhook_url: Option<&str>) -> Campaign {
    env.campaigns
        .create_campaign(campaign_request(lists, webhook_url))
        .await
        .expect("create_campaign falló")
}

pub async fn snapshot(env: &TestEnv, campaign_id: &str) -> CampaignProgress {
    env.progress
        .progress(campaign_id)
        .await
        .unwrap()
        .expect("La campaña debería existir")
}

/// Sondea el progreso hasta que `done` sea true. Verifica en cada snapshot
/// que `sent + failed <= total` y que los contadores nunca bajen.
pub async fn wait_until<F>(env: &TestEnv, campaign_id: &str, done: F) -> CampaignProgress
where
    F: Fn(&CampaignProgress) -> bool,
{
    let deadline = Instant::now() + Duration::from_secs(15);
    let mut last = (0, 0);
    loop {
        let p = snapshot(env, campaign_id).await;
        assert!(
            p.sent_count + p.failed_count <= p.total_recipients,
            "Invariante rota: {:?}",
            p
        );
        assert!(p.sent_count >= last.0 && p.failed_count >= last.1, "Contadores bajaron: {:?}", p);
        last = (p.sent_count, p.failed_count);

        if done(&p) {
            return p;
        }
        assert!(Instant::now() < deadline, "Timeout esperando campaña: {:?}", p);
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
}

pub async fn wait_for_terminal(env: &TestEnv, campaign_id: &str) -> CampaignProgress {
    wait_until(env, campaign_id, |p| p.status.is_terminal()).await
}

/// Webhook local que responde siempre `status` y guarda los payloads.
pub struct MockWebhook {
    pub url: String,
    pub hits: Arc<AtomicUsize>,
    pub payloads: Arc<Mutex<Vec<serde_json::Value>>>,
}

impl MockWebhook {
    pub fn hits(&self) -> usize {
        self.hits.load(Ordering::SeqCst)
    }

    pub fn payloads(&self) -> Vec<serde_json::Value> {
        self.payloads.lock().unwrap().clone()
    }
}

pub fn start_webhook(status: u16) -> MockWebhook {
    start_webhook_with_delay(status, Duration::ZERO)
}

pub fn start_webhook_with_delay(status: u16, delay: Duration) -> MockWebhook {
    let hits = Arc::new(AtomicUsize::new(0));
    let payloads = Arc::new(Mutex::new(Vec::new()));
    let status = StatusCode::from_u16(status).expect("status inválido");

    let (hits_srv, payloads_srv) = (hits.clone(), payloads.clone());
    let server = HttpServer::new(move || {
        let hits = hits_srv.clone();
        let payloads = payloads_srv.clone();
        App::new().route(
            "/hook",
            web::post().to(move |body: web::Json<serde_json::Value>| {
                let hits = hits.clone();
                let payloads = payloads.clone();
                async move {
                    if !delay.is_zero() {
                        actix_rt::time::sleep(delay).await;
                    }
                    payloads.lock().unwrap().push(body.into_inner());
                    hits.fetch_add(1, Ordering::SeqCst);
                    HttpResponse::build(status).finish()
                }
            }),
        )
    })
    .workers(1)
    .bind(("127.0.0.1", 0))
    .expect("No se pudo bindear el webhook de prueba");

    let addr = server.addrs()[0];
    actix_rt::spawn(server.run());

    MockWebhook {
        url: format!("http://{}/hook", addr),
        hits,
        payloads,
    }
}
