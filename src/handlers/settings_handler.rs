//! handlers/settings_handler.rs
use actix_web::{web, HttpResponse};
use serde_json::json;

use crate::models::settings_model::SenderRotationSettings;
use crate::services::campaign_service::CampaignService;

/// GET /api/settings/rotation
pub async fn get_rotation_settings_endpoint(
    campaign_service: web::Data<CampaignService>,
) -> HttpResponse {
    match campaign_service.get_rotation_settings().await {
        Ok(resp) => HttpResponse::Ok().json(resp),
        Err(e) => HttpResponse::InternalServerError().json(json!({
            "success": false,
            "error": format!("{:#}", e)
        })),
    }
}

/// PUT /api/settings/rotation
pub async fn update_rotation_settings_endpoint(
    campaign_service: web::Data<CampaignService>,
    body: web::Json<SenderRotationSettings>,
) -> HttpResponse {
    let settings = body.into_inner();
    if let Err(msg) = settings.validate() {
        return HttpResponse::BadRequest().json(json!({
            "success": false,
            "error": msg
        }));
    }

    match campaign_service.update_rotation_settings(settings).await {
        Ok(()) => HttpResponse::Ok().json(json!({
            "success": true,
            "settings": settings
        })),
        Err(e) => HttpResponse::InternalServerError().json(json!({
            "success": false,
            "error": format!("{:#}", e)
        })),
    }
}
