//! Verification endpoint behind the links handed out by `/like`.

use actix_web::{web, HttpResponse};
use chrono::Utc;

use crate::error::VerifyError;
use crate::messages;
use crate::AppState;

const MAX_CODE_LEN: usize = 64;

pub fn config(cfg: &mut web::ServiceConfig) {
    cfg.service(web::resource("/verify/{code}").route(web::get().to(verify)));
}

fn text(mut builder: actix_web::HttpResponseBuilder, body: &'static str) -> HttpResponse {
    builder.content_type("text/plain; charset=utf-8").body(body)
}

/// GET /verify/{code}
async fn verify(state: web::Data<AppState>, path: web::Path<String>) -> HttpResponse {
    let code = path.into_inner();
    if code.is_empty() || code.len() > MAX_CODE_LEN || !code.chars().all(|c| c.is_ascii_alphanumeric()) {
        return text(HttpResponse::Gone(), messages::VERIFY_FAILURE);
    }

    match state.db.verify_by_code(&code, Utc::now()) {
        Ok(request) => {
            log::info!(
                "[VERIFY] Request {} verified for user {}",
                request.id,
                request.requester_id
            );
            text(HttpResponse::Ok(), messages::VERIFY_SUCCESS)
        }
        Err(VerifyError::AlreadyUsedOrExpired) => {
            log::debug!("[VERIFY] Rejected code (expired, used or unknown)");
            text(HttpResponse::Gone(), messages::VERIFY_FAILURE)
        }
        Err(VerifyError::Storage(e)) => {
            log::error!("[VERIFY] Storage error: {}", e);
            text(HttpResponse::InternalServerError(), messages::TRY_AGAIN_LATER)
        }
    }
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

    fn state_with_request(ttl: Duration) -> (web::Data<AppState>, String) {
        let db = Arc::new(Database::new(":memory:").unwrap());
        let created = db
            .create_like_request(
                &NewLikeRequest {
                    requester_id: 42,
                    conversation_id: -100,
                    anchor_message_id: 7,
                    target_account_id: "1000000001".to_string(),
                },
                Utc::now(),
                ttl,
            )
            .unwrap();
        let state = web::Data::new(AppState {
            db,
            config: Config::default(),
            reconciler: None,
        });
        (state, created.verification_code)
    }

    #[actix_web::test]
    async fn test_first_visit_verifies_second_is_gone() {
        let (state, code) = state_with_request(Duration::minutes(10));
        let app = test::init_service(App::new().app_data(state.clone()).configure(config)).await;

        let req = test::TestRequest::get().uri(&format!("/verify/{}", code)).to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::OK);
        let body = test::read_body(resp).await;
        assert_eq!(body, messages::VERIFY_SUCCESS.as_bytes());

        let req = test::TestRequest::get().uri(&format!("/verify/{}", code)).to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::GONE);
        let body = test::read_body(resp).await;
        assert_eq!(body, messages::VERIFY_FAILURE.as_bytes());

        assert_eq!(state.db.list_verified_unprocessed().unwrap().len(), 1);
    }

    #[actix_web::test]
    async fn test_expired_link_is_gone() {
        let (state, code) = state_with_request(Duration::minutes(-1));
        let app = test::init_service(App::new().app_data(state.clone()).configure(config)).await;

        let req = test::TestRequest::get().uri(&format!("/verify/{}", code)).to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::GONE);
        assert!(state.db.list_verified_unprocessed().unwrap().is_empty());
    }

    #[actix_web::test]
    async fn test_unknown_and_malformed_codes_are_gone() {
        let (state, _) = state_with_request(Duration::minutes(10));
        let app = test::init_service(App::new().app_data(state).configure(config)).await;

        for uri in ["/verify/doesnotexist", "/verify/bad%20code"] {
            let req = test::TestRequest::get().uri(uri).to_request();
            let resp = test::call_service(&app, req).await;
            assert_eq!(resp.status(), StatusCode::GONE, "{}", uri);
        }
    }
}
