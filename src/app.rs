//! app.rs
use crate::handlers::{campaign_handler, settings_handler};
use actix_web::web;

pub fn init_app(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/api")
            .service(
                web::scope("/campaigns")
                    .route(
                        "",
                        web::post().to(campaign_handler::create_campaign_endpoint),
                    )
                    .route(
                        "",
                        web::get().to(campaign_handler::list_campaigns_endpoint),
                    )
                    .route(
                        "/{id}",
                        web::get().to(campaign_handler::get_campaign_endpoint),
                    )
                    .route(
                        "/{id}/progress",
                        web::get().to(campaign_handler::campaign_progress_endpoint),
                    )
                    .route(
                        "/{id}/pause",
                        web::post().to(campaign_handler::pause_campaign_endpoint),
                    )
                    .route(
                        "/{id}/resume",
                        web::post().to(campaign_handler::resume_campaign_endpoint),
                    ),
            )
            .service(
                web::scope("/settings")
                    .route(
                        "/rotation",
                        web::get().to(settings_handler::get_rotation_settings_endpoint),
                    )
                    .route(
                        "/rotation",
                        web::put().to(settings_handler::update_rotation_settings_endpoint),
                    ),
            ),
    );
}
