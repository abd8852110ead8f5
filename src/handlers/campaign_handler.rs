//! handlers/campaign_handler.rs
use actix_web::{web, HttpResponse};
use serde::Deserialize;
use serde_json::json;

use crate::models::campaign_model::{CreateCampaignRequest, TransitionOutcome};
use crate::services::{campaign_service::CampaignService, progress_service::ProgressService};

#[derive(Deserialize)]
pub struct PaginationQuery {
    page: Option<u64>,
    page_size: Option<u64>,
}

fn internal_error(e: anyhow::Error) -> HttpResponse {
    log::error!("Campaign endpoint error: {:?}", e);
    HttpResponse::InternalServerError().json(json!({
        "success": false,
        "error": format!("{:#}", e)
    }))
}

fn not_found() -> HttpResponse {
    HttpResponse::NotFound().json(json!({
        "success": false,
        "error": "Campaign not found"
    }))
}

/// POST /api/campaigns
pub async fn create_campaign_endpoint(
    campaign_service: web::Data<CampaignService>,
    body: web::Json<CreateCampaignRequest>,
) -> HttpResponse {
    let req = body.into_inner();
    if let Err(msg) = req.validate() {
        return HttpResponse::BadRequest().json(json!({
            "success": false,
            "error": msg
        }));
    }

    match campaign_service.create_campaign(req).await {
        Ok(campaign) => HttpResponse::Ok().json(campaign),
        Err(e) => internal_error(e),
    }
}

/// GET /api/campaigns
pub async fn list_campaigns_endpoint(
    campaign_service: web::Data<CampaignService>,
    query: web::Query<PaginationQuery>,
) -> HttpResponse {
    let page = query.page.unwrap_or(1).max(1);
    let page_size = query.page_size.unwrap_or(10).clamp(1, 100);

    match campaign_service.list_campaigns(page, page_size).await {
        Ok(list) => HttpResponse::Ok().json(list),
        Err(e) => internal_error(e),
    }
}

/// GET /api/campaigns/{id}
pub async fn get_campaign_endpoint(
    campaign_service: web::Data<CampaignService>,
    path: web::Path<String>,
) -> HttpResponse {
    let campaign_id = path.into_inner();

    match campaign_service.get_campaign(&campaign_id).await {
        Ok(Some(campaign)) => HttpResponse::Ok().json(campaign),
        Ok(None) => not_found(),
        Err(e) => internal_error(e),
    }
}

/// GET /api/campaigns/{id}/progress
pub async fn campaign_progress_endpoint(
    progress_service: web::Data<ProgressService>,
    path: web::Path<String>,
) -> HttpResponse {
    let campaign_id = path.into_inner();

    match progress_service.progress(&campaign_id).await {
        Ok(Some(progress)) => HttpResponse::Ok().json(progress),
        Ok(None) => not_found(),
        Err(e) => internal_error(e),
    }
}

/// POST /api/campaigns/{id}/pause
pub async fn pause_campaign_endpoint(
    campaign_service: web::Data<CampaignService>,
    path: web::Path<String>,
) -> HttpResponse {
    let campaign_id = path.into_inner();

    match campaign_service.pause_campaign(&campaign_id).await {
        Ok(outcome) => transition_response(outcome, "Campaign paused"),
        Err(e) => internal_error(e),
    }
}

/// POST /api/campaigns/{id}/resume
pub async fn resume_campaign_endpoint(
    campaign_service: web::Data<CampaignService>,
    path: web::Path<String>,
) -> HttpResponse {
    let campaign_id = path.into_inner();

    match campaign_service.resume_campaign(&campaign_id).await {
        Ok(outcome) => transition_response(outcome, "Campaign resumed"),
        Err(e) => internal_error(e),
    }
}

fn transition_response(outcome: TransitionOutcome, message: &str) -> HttpResponse {
    match outcome {
        TransitionOutcome::Applied => HttpResponse::Ok().json(json!({
            "success": true,
            "message": message
        })),
        TransitionOutcome::NotFound => not_found(),
        TransitionOutcome::InvalidState(current) => HttpResponse::Conflict().json(json!({
            "success": false,
            "error": format!("Campaign is '{}'", current),
            "status": current
        })),
    }
}
