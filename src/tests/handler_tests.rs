//! tests/handler_tests.rs
//! Endpoints HTTP sobre actix_web::test.

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use actix_rt::test;
    use actix_web::{http::StatusCode, test as actix_test, web, App};
    use serde_json::{json, Value};

    use crate::app;
    use crate::models::campaign_model::CampaignStatus;
    use crate::tests::support::*;

    macro_rules! init_app {
        ($env:expr) => {
            actix_test::init_service(
                App::new()
                    .app_data(web::Data::new($env.campaigns.clone()))
                    .app_data(web::Data::new($env.progress.clone()))
                    .configure(app::init_app),
            )
            .await
        };
    }

    fn create_body() -> Value {
        json!({
            "title": "Black Friday",
            "subject": "Descuentos",
            "html_content": "<p>50%</p>",
            "selected_lists": ["vip"],
            "webhook_url": null
        })
    }

    #[test]
    async fn test_create_returns_queued_campaign() {
        let env = test_env(Duration::from_millis(5)).await;
        let app = init_app!(env);

        let req = actix_test::TestRequest::post()
            .uri("/api/campaigns")
            .set_json(create_body())
            .to_request();
        let resp = actix_test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::OK);

        let body: Value = actix_test::read_body_json(resp).await;
        assert_eq!(body["status"], "queued");
        assert_eq!(body["total_recipients"], 0);
        assert_eq!(body["current_sender_index"], 1);
        let id = body["id"].as_str().unwrap().to_string();

        // el envío corre en segundo plano
        let p = wait_for_terminal(&env, &id).await;
        assert_eq!(p.status, CampaignStatus::Sent);
        assert_eq!(p.total_recipients, 3);

        let req = actix_test::TestRequest::get()
            .uri(&format!("/api/campaigns/{}/progress", id))
            .to_request();
        let body: Value = actix_test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["campaign_id"], id.as_str());
        assert_eq!(body["status"], "sent");
        assert_eq!(body["sent_count"], 3);
        assert_eq!(body["progress_percentage"], 100.0);
    }

    #[test]
    async fn test_create_rejects_invalid_request() {
        let env = test_env(Duration::from_millis(5)).await;
        let app = init_app!(env);

        let mut body = create_body();
        body["title"] = json!("  ");
        let req = actix_test::TestRequest::post()
            .uri("/api/campaigns")
            .set_json(body)
            .to_request();
        let resp = actix_test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

        let mut body = create_body();
        body["sender_sequence"] = json!(0);
        let req = actix_test::TestRequest::post()
            .uri("/api/campaigns")
            .set_json(body)
            .to_request();
        let resp = actix_test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    async fn test_unknown_campaign_is_not_found() {
        let env = test_env(Duration::from_millis(5)).await;
        let app = init_app!(env);

        for (method, uri) in [
            ("GET", "/api/campaigns/nope"),
            ("GET", "/api/campaigns/nope/progress"),
            ("POST", "/api/campaigns/nope/pause"),
            ("POST", "/api/campaigns/nope/resume"),
        ] {
            let req = match method {
                "GET" => actix_test::TestRequest::get(),
                _ => actix_test::TestRequest::post(),
            }
            .uri(uri)
            .to_request();
            let resp = actix_test::call_service(&app, req).await;
            assert_eq!(resp.status(), StatusCode::NOT_FOUND, "{} {}", method, uri);

            let body: Value = actix_test::read_body_json(resp).await;
            assert_eq!(body["success"], false);
            assert!(body.get("sent_count").is_none(), "no debe devolver datos parciales");
        }
    }

    #[test]
    async fn test_resume_of_finished_campaign_conflicts() {
        let env = test_env(Duration::from_millis(5)).await;
        let app = init_app!(env);

        let campaign = create(&env, &[], None).await;
        wait_for_terminal(&env, &campaign.id).await;

        let req = actix_test::TestRequest::post()
            .uri(&format!("/api/campaigns/{}/resume", campaign.id))
            .to_request();
        let resp = actix_test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::CONFLICT);
        let body: Value = actix_test::read_body_json(resp).await;
        assert_eq!(body["status"], "sent");
    }

    #[test]
    async fn test_list_campaigns_paginates() {
        let env = test_env(Duration::from_millis(5)).await;
        let app = init_app!(env);

        for _ in 0..3 {
            create(&env, &[], None).await;
        }

        let req = actix_test::TestRequest::get()
            .uri("/api/campaigns?page=1&page_size=2")
            .to_request();
        let body: Value = actix_test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["total"], 3);
        assert_eq!(body["items"].as_array().unwrap().len(), 2);

        let req = actix_test::TestRequest::get()
            .uri("/api/campaigns?page=2&page_size=2")
            .to_request();
        let body: Value = actix_test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["items"].as_array().unwrap().len(), 1);
    }

    #[test]
    async fn test_rotation_settings_endpoints() {
        let env = test_env(Duration::from_millis(5)).await;
        let app = init_app!(env);

        let req = actix_test::TestRequest::get()
            .uri("/api/settings/rotation")
            .to_request();
        let body: Value = actix_test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["emails_per_sender"], 50);
        assert_eq!(body["max_sender_sequence"], 3);
        assert_eq!(body["using_defaults"], true);

        let req = actix_test::TestRequest::put()
            .uri("/api/settings/rotation")
            .set_json(json!({"emails_per_sender": 2, "max_sender_sequence": 4}))
            .to_request();
        let resp = actix_test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::OK);

        let req = actix_test::TestRequest::get()
            .uri("/api/settings/rotation")
            .to_request();
        let body: Value = actix_test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["emails_per_sender"], 2);
        assert_eq!(body["max_sender_sequence"], 4);
        assert_eq!(body["using_defaults"], false);

        let req = actix_test::TestRequest::put()
            .uri("/api/settings/rotation")
            .set_json(json!({"emails_per_sender": 0, "max_sender_sequence": 4}))
            .to_request();
        let resp = actix_test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    async fn test_list_campaigns_huge_page_is_empty() {
        let env = test_env(Duration::from_millis(5)).await;
        let app = init_app!(env);
        create(&env, &[], None).await;

        let req = actix_test::TestRequest::get()
            .uri(&format!("/api/campaigns?page={}&page_size=100", u64::MAX))
            .to_request();
        let resp = actix_test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::OK);

        let body: Value = actix_test::read_body_json(resp).await;
        assert_eq!(body["total"], 1);
        assert!(body["items"].as_array().unwrap().is_empty());
    }
}
