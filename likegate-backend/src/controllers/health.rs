use actix_web::{web, HttpResponse, Responder};
use chrono::Utc;

use crate::scheduler::RECONCILER_LEASE;
use crate::AppState;

/// Version from Cargo.toml, available at compile time
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

pub fn config(cfg: &mut web::ServiceConfig) {
    cfg.service(web::resource("/api/health").route(web::get().to(health_check)));
    cfg.service(web::resource("/api/status").route(web::get().to(get_status)));
}

async fn health_check() -> impl Responder {
    HttpResponse::Ok().json(serde_json::json!({
        "status": "ok",
        "version": VERSION
    }))
}

/// Queue counts plus which worker currently holds the reconciler lease.
async fn get_status(state: web::Data<AppState>) -> HttpResponse {
    let now = Utc::now();

    let stats = match state.db.like_request_stats(now) {
        Ok(s) => s,
        Err(e) => {
            log::error!("Failed to load request stats: {}", e);
            return HttpResponse::InternalServerError().json(serde_json::json!({
                "error": format!("Failed to load request stats: {}", e)
            }));
        }
    };

    let lease_holder = match state.db.lease_holder(RECONCILER_LEASE, now) {
        Ok(holder) => holder,
        Err(e) => {
            log::warn!("Failed to read reconciler lease: {}", e);
            None
        }
    };

    let (worker_id, last_tick_at) = match &state.reconciler {
        Some(r) => (Some(r.worker_id().to_string()), r.last_tick_at().await),
        None => (None, None),
    };

    HttpResponse::Ok().json(serde_json::json!({
        "version": VERSION,
        "requests": stats,
        "worker": {
            "enabled": state.reconciler.is_some(),
            "poll_interval_secs": state.config.poll_interval_secs,
            "worker_id": worker_id,
            "lease_holder": lease_holder,
            "last_tick_at": last_tick_at,
        },
        "telegram_enabled": state.config.telegram_enabled(),
        "membership_required": state.config.required_channel.is_some(),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::db::Database;
    use crate::models::NewLikeRequest;
    use actix_web::{http::StatusCode, test, App};
    use chrono::Duration;
    use std::sync::Arc;

    #[actix_web::test]
    async fn test_health() {
        let app = test::init_service(App::new().configure(config)).await;
        let req = test::TestRequest::get().uri("/api/health").to_request();
        let body: serde_json::Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["status"], "ok");
        assert_eq!(body["version"], VERSION);
    }

    #[actix_web::test]
    async fn test_status_reports_queue_counts() {
        let db = Arc::new(Database::new(":memory:").unwrap());
        let now = Utc::now();
        let new = NewLikeRequest {
            requester_id: 42,
            conversation_id: -100,
            anchor_message_id: 7,
            target_account_id: "1000000001".to_string(),
        };
        let a = db.create_like_request(&new, now, Duration::minutes(10)).unwrap();
        db.create_like_request(&new, now, Duration::minutes(10)).unwrap();
        db.verify_by_code(&a.verification_code, now).unwrap();

        let state = web::Data::new(AppState {
            db,
            config: Config::default(),
            reconciler: None,
        });
        let app = test::init_service(App::new().app_data(state).configure(config)).await;

        let req = test::TestRequest::get().uri("/api/status").to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::OK);
        let body: serde_json::Value = test::read_body_json(resp).await;
        assert_eq!(body["requests"]["pending"], 1);
        assert_eq!(body["requests"]["awaiting_fulfillment"], 1);
        assert_eq!(body["worker"]["enabled"], false);
        assert!(body["worker"]["lease_holder"].is_null());
    }
}
