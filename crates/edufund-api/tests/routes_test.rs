//! Route-level tests for session checks and request validation
//!
//! Every request here is rejected before a handler touches the database,
//! so the pool is created lazily and never connects.

use actix_web::{http::StatusCode, test, web, App};
use edufund_api::{configure, json_config, path_config, query_config, ServiceFactory};
use edufund_auth::{JwtService, PasswordService};
use edufund_core::config::{
    AuthConfig, BatchConfig, BillingConfig, CorsConfig, DatabaseConfig, ServerConfig,
};
use edufund_core::models::UserRole;
use edufund_core::AppConfig;
use serde_json::Value;
use sqlx::postgres::PgPoolOptions;
use std::sync::Arc;

const SECRET: &str = "routes-test-secret";

fn test_config() -> AppConfig {
    AppConfig {
        server: ServerConfig {
            host: "127.0.0.1".to_string(),
            port: 0,
            workers: 1,
            payload_limit_bytes: 64 * 1024,
        },
        database: DatabaseConfig {
            url: "postgresql://localhost:1/unused".to_string(),
            max_connections: 1,
            min_connections: 0,
            acquire_timeout_secs: 1,
            idle_timeout_secs: 1,
            run_migrations: false,
        },
        auth: AuthConfig {
            jwt_secret: SECRET.to_string(),
            staff_token_secs: 1800,
            holder_token_secs: 900,
            secure_cookies: false,
            bootstrap_admin_password: None,
        },
        cors: CorsConfig::default(),
        billing: BillingConfig::default(),
        batch: BatchConfig::default(),
    }
}

fn jwt() -> Arc<JwtService> {
    Arc::new(JwtService::new(SECRET, 1800, 900))
}

macro_rules! test_app {
    () => {{
        let config = test_config();
        let pool = PgPoolOptions::new()
            .connect_lazy(&config.database.url)
            .unwrap();
        let factory = ServiceFactory::new(pool, config).unwrap();
        test::init_service(
            App::new()
                .app_data(web::Data::new(factory))
                .app_data(web::Data::new(jwt()))
                .app_data(web::Data::new(Arc::new(PasswordService::new())))
                .app_data(json_config(64 * 1024))
                .app_data(query_config())
                .app_data(path_config())
                .configure(configure),
        )
        .await
    }};
}

fn bearer(token: &str) -> (&'static str, String) {
    ("Authorization", format!("Bearer {}", token))
}

#[actix_web::test]
async fn test_admin_route_requires_session() {
    let app = test_app!();

    let req = test::TestRequest::get()
        .uri("/api/v1/admin/dashboard")
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);

    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["error"], "invalid_token");
    assert_eq!(body["status"], 401);
}

#[actix_web::test]
async fn test_tampered_token_rejected() {
    let app = test_app!();
    let other = JwtService::new("some-other-secret", 1800, 900);
    let token = other.create_staff_token("ops", UserRole::Admin).unwrap();

    let req = test::TestRequest::get()
        .uri("/api/v1/admin/dashboard")
        .insert_header(bearer(&token))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
}

#[actix_web::test]
async fn test_holder_session_cannot_use_admin_portal() {
    let app = test_app!();
    let token = jwt().create_holder_token(3, "S1234567D").unwrap();

    let req = test::TestRequest::get()
        .uri("/api/v1/admin/account-holders")
        .insert_header(bearer(&token))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::FORBIDDEN);

    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["error"], "forbidden");
}

#[actix_web::test]
async fn test_staff_session_cannot_use_eservice() {
    let app = test_app!();
    let token = jwt().create_staff_token("ops", UserRole::Superadmin).unwrap();

    let req = test::TestRequest::get()
        .uri("/api/v1/eservice/profile")
        .insert_header(bearer(&token))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::FORBIDDEN);
}

#[actix_web::test]
async fn test_operator_cannot_close_account() {
    let app = test_app!();
    let token = jwt().create_staff_token("ops", UserRole::Operator).unwrap();

    let req = test::TestRequest::post()
        .uri("/api/v1/admin/education-accounts/1/close")
        .insert_header(bearer(&token))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::FORBIDDEN);
}

#[actix_web::test]
async fn test_admin_cannot_read_audit_logs() {
    let app = test_app!();
    let token = jwt().create_staff_token("boss", UserRole::Admin).unwrap();

    let req = test::TestRequest::get()
        .uri("/api/v1/admin/audit-logs")
        .insert_header(bearer(&token))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::FORBIDDEN);
}

#[actix_web::test]
async fn test_session_cookie_accepted() {
    let app = test_app!();
    let token = jwt().create_staff_token("ops", UserRole::Operator).unwrap();

    // Passes the session check, then fails on the malformed page number
    let req = test::TestRequest::get()
        .uri("/api/v1/admin/courses?page=first")
        .cookie(actix_web::cookie::Cookie::new("token", token))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
}

#[actix_web::test]
async fn test_malformed_query_uses_error_envelope() {
    let app = test_app!();
    let token = jwt().create_staff_token("ops", UserRole::Operator).unwrap();

    let req = test::TestRequest::get()
        .uri("/api/v1/admin/invoices?per_page=lots")
        .insert_header(bearer(&token))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["error"], "invalid_input");
    assert_eq!(body["status"], 400);
}

#[actix_web::test]
async fn test_non_numeric_id_is_bad_request() {
    let app = test_app!();
    let token = jwt().create_staff_token("ops", UserRole::Operator).unwrap();

    let req = test::TestRequest::get()
        .uri("/api/v1/admin/courses/abc")
        .insert_header(bearer(&token))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
}

#[actix_web::test]
async fn test_login_rejects_malformed_json() {
    let app = test_app!();

    let req = test::TestRequest::post()
        .uri("/api/v1/admin/auth/login")
        .insert_header(("Content-Type", "application/json"))
        .set_payload("{\"username\": ")
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["error"], "invalid_input");
}

#[actix_web::test]
async fn test_login_validates_before_lookup() {
    let app = test_app!();

    let req = test::TestRequest::post()
        .uri("/api/v1/eservice/auth/login")
        .set_json(serde_json::json!({ "nric": "", "password": "" }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["error"], "validation_error");
}

#[actix_web::test]
async fn test_top_up_amount_validated() {
    let app = test_app!();
    let token = jwt().create_staff_token("boss", UserRole::Admin).unwrap();

    let req = test::TestRequest::post()
        .uri("/api/v1/admin/education-accounts/1/top-up")
        .insert_header(bearer(&token))
        .set_json(serde_json::json!({ "amount": "-5.00" }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
}

#[actix_web::test]
async fn test_unknown_filter_value_rejected() {
    let app = test_app!();
    let token = jwt().create_staff_token("ops", UserRole::Operator).unwrap();

    let req = test::TestRequest::get()
        .uri("/api/v1/admin/account-holders?residential_status=tourist")
        .insert_header(bearer(&token))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["error"], "invalid_input");
}

#[actix_web::test]
async fn test_top_up_fraction_of_cent_rejected() {
    let app = test_app!();
    let token = jwt().create_staff_token("boss", UserRole::Admin).unwrap();

    let req = test::TestRequest::post()
        .uri("/api/v1/admin/education-accounts/1/top-up")
        .insert_header(bearer(&token))
        .set_json(serde_json::json!({ "amount": "0.001" }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["error"], "validation_error");
}
