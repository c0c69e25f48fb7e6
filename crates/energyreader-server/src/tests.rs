//! Server API tests

use super::*;
use axum::{
    body::Body,
    http::{Request, StatusCode},
};
use chrono::{Duration, Utc};
use energyreader_core::models::{BillFilter, TariffFlag, UserRole};
use energyreader_core::InMemoryStore;
use energyreader_core::test_utils::new_bill;
use http_body_util::BodyExt;
use tower::ServiceExt;

fn no_auth() -> ServerConfig {
    ServerConfig {
        require_auth: false,
        allowed_origins: vec![],
        ..Default::default()
    }
}

fn setup_test_app() -> (Router, Database) {
    let db = Database::in_memory().unwrap();
    let app = create_router(db.clone(), None, no_auth()).unwrap();
    (app, db)
}

/// `YYYY-MM-DD` for `n` days before today
fn days_ago(n: i64) -> String {
    (Utc::now() - Duration::days(n)).format("%Y-%m-%d").to_string()
}

/// A user with two recent bills: 200 kWh green, then 280 kWh red
fn seed_history(db: &Database) -> i64 {
    let user_id = db
        .create_user("maria@example.com", "Maria Silva", UserRole::User)
        .unwrap();

    db.insert_bill(&new_bill(user_id, &days_ago(40), 200, 200.0))
        .unwrap();
    let mut latest = new_bill(user_id, &days_ago(10), 280, 300.0);
    latest.tariff_flag = TariffFlag::Red;
    db.insert_bill(&latest).unwrap();

    user_id
}

async fn get_body_json(response: axum::response::Response) -> serde_json::Value {
    let body = response.into_body();
    let bytes = body.collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

async fn get_body_text(response: axum::response::Response) -> String {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    String::from_utf8(bytes.to_vec()).unwrap()
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

/// A request carrying a Cloudflare Access identity
fn as_user(method: &str, uri: &str, email: &str) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header("cf-access-authenticated-user-email", email)
        .body(Body::empty())
        .unwrap()
}

fn post_json(uri: &str, body: serde_json::Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

// ========== Authentication Tests ==========

#[tokio::test]
async fn test_auth_required() {
    let db = Database::in_memory().unwrap();
    let app = create_router(db, None, ServerConfig::default()).unwrap();

    let response = app.oneshot(get("/api/bills")).await.unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_auth_with_header() {
    let db = Database::in_memory().unwrap();
    let app = create_router(db, None, ServerConfig::default()).unwrap();

    let response = app
        .oneshot(
            Request::builder()
                .uri("/api/bills")
                .header("cf-access-authenticated-user-email", "test@example.com")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_auth_whitespace_only_header() {
    let db = Database::in_memory().unwrap();
    let app = create_router(db, None, ServerConfig::default()).unwrap();

    let response = app
        .oneshot(
            Request::builder()
                .uri("/api/bills")
                .header("cf-access-authenticated-user-email", "   ")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_auth_with_api_key() {
    let db = Database::in_memory().unwrap();
    let config = ServerConfig {
        api_keys: vec!["s3cret-key".to_string()],
        ..Default::default()
    };
    let app = create_router(db, None, config).unwrap();

    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .uri("/api/me")
                .header("authorization", "Bearer s3cret-key")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let json = get_body_json(response).await;
    assert_eq!(json["user"], "api-key");
    assert_eq!(json["auth_method"], "api_key");

    let response = app
        .oneshot(
            Request::builder()
                .uri("/api/me")
                .header("authorization", "Bearer wrong-key!")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[test]
fn test_validate_api_key() {
    let keys = vec!["abc123".to_string(), "other".to_string()];
    assert!(validate_api_key("abc123", &keys));
    assert!(validate_api_key("other", &keys));
    assert!(!validate_api_key("abc124", &keys));
    assert!(!validate_api_key("abc", &keys));
    assert!(!validate_api_key("abc123", &[]));
}

#[test]
fn test_parse_trusted_networks() {
    let nets = parse_trusted_networks("192.168.1.0/24, 10.0.0.5,,not-an-ip");
    assert_eq!(nets.len(), 2);

    let inside: std::net::IpAddr = "192.168.1.42".parse().unwrap();
    let single: std::net::IpAddr = "10.0.0.5".parse().unwrap();
    let outside: std::net::IpAddr = "10.0.0.6".parse().unwrap();
    assert!(is_ip_trusted(&inside, &nets));
    assert!(is_ip_trusted(&single, &nets));
    assert!(!is_ip_trusted(&outside, &nets));
}

#[tokio::test]
async fn test_me_reports_admin() {
    let (app, db) = setup_test_app();
    db.create_user("admin@example.com", "Admin", UserRole::Admin)
        .unwrap();

    let response = app
        .oneshot(
            Request::builder()
                .uri("/api/me")
                .header("cf-access-authenticated-user-email", "admin@example.com")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json = get_body_json(response).await;
    assert_eq!(json["user"], "admin@example.com");
    assert_eq!(json["auth_method"], "cloudflare_header");
    assert_eq!(json["is_admin"], true);
}

// ========== Admin Access Tests ==========

/// Cloudflare auth with one admin and one regular account
fn setup_admin_app() -> (Router, Database) {
    let db = Database::in_memory().unwrap();
    db.create_user("admin@example.com", "Admin", UserRole::Admin)
        .unwrap();
    seed_history(&db);
    let config = ServerConfig {
        api_keys: vec!["s3cret-key".to_string()],
        ..Default::default()
    };
    let app = create_router(db.clone(), None, config).unwrap();
    (app, db)
}

#[tokio::test]
async fn test_admin_routes_refuse_regular_users() {
    let (app, db) = setup_admin_app();
    let maria = db.get_user_by_email("maria@example.com").unwrap().unwrap();

    for (method, uri) in [
        ("GET", "/api/admin/metrics".to_string()),
        ("GET", "/api/users".to_string()),
        ("GET", "/api/users/stats".to_string()),
        ("DELETE", format!("/api/users/{}", maria.id)),
        ("GET", "/api/feedback".to_string()),
        ("POST", "/api/feedback/1/approve".to_string()),
        ("GET", "/api/audit".to_string()),
        ("GET", "/api/export/users".to_string()),
        ("GET", "/api/export/admin_bills".to_string()),
    ] {
        let response = app
            .clone()
            .oneshot(as_user(method, &uri, "maria@example.com"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::FORBIDDEN, "{} {}", method, uri);
    }

    // Unknown identities are not admins either
    let response = app
        .clone()
        .oneshot(as_user("GET", "/api/admin/metrics", "stranger@example.com"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    assert!(db.get_user(maria.id).unwrap().is_some());
}

#[tokio::test]
async fn test_admin_routes_allow_admins_and_services() {
    let (app, _db) = setup_admin_app();

    let response = app
        .clone()
        .oneshot(as_user("GET", "/api/admin/metrics", "Admin@Example.com"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let json = get_body_json(response).await;
    assert_eq!(json["total_users"], 2);

    let response = app
        .clone()
        .oneshot(as_user("GET", "/api/export/users", "admin@example.com"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let response = app
        .oneshot(
            Request::builder()
                .uri("/api/audit")
                .header("authorization", "Bearer s3cret-key")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_regular_users_keep_their_own_views() {
    let (app, _db) = setup_admin_app();

    for uri in ["/api/bills", "/api/analytics/trends", "/api/export/bills", "/api/me"] {
        let response = app
            .clone()
            .oneshot(as_user("GET", uri, "maria@example.com"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK, "{}", uri);
    }
}

// ========== User API Tests ==========

#[tokio::test]
async fn test_create_and_list_users() {
    let (app, _db) = setup_test_app();

    let response = app
        .clone()
        .oneshot(post_json(
            "/api/users",
            serde_json::json!({"email": "Ana@Example.com", "name": "Ana Souza", "role": "admin"}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let json = get_body_json(response).await;
    assert_eq!(json["user"]["email"], "ana@example.com");
    assert_eq!(json["user"]["role"], "admin");

    app.clone()
        .oneshot(post_json(
            "/api/users",
            serde_json::json!({"email": "bruno@example.com", "name": "Bruno"}),
        ))
        .await
        .unwrap();

    let response = app
        .clone()
        .oneshot(get("/api/users?search=souza"))
        .await
        .unwrap();
    let json = get_body_json(response).await;
    assert_eq!(json.as_array().unwrap().len(), 1);

    let response = app.clone().oneshot(get("/api/users?role=user")).await.unwrap();
    let json = get_body_json(response).await;
    assert_eq!(json[0]["email"], "bruno@example.com");

    let response = app.oneshot(get("/api/users/stats")).await.unwrap();
    let json = get_body_json(response).await;
    assert_eq!(json["total"], 2);
    assert_eq!(json["admins"], 1);
    assert_eq!(json["users"], 1);
    assert_eq!(json["new_this_month"], 2);
}

#[tokio::test]
async fn test_create_user_invalid_email() {
    let (app, _db) = setup_test_app();

    let response = app
        .oneshot(post_json(
            "/api/users",
            serde_json::json!({"email": "no-at-sign"}),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_invalid_role_filter() {
    let (app, _db) = setup_test_app();

    let response = app.oneshot(get("/api/users?role=owner")).await.unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let json = get_body_json(response).await;
    assert!(json["error"].as_str().unwrap().contains("role"));
}

#[tokio::test]
async fn test_update_role_and_delete_user() {
    let (app, db) = setup_test_app();
    let user_id = seed_history(&db);

    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .method("PUT")
                .uri(format!("/api/users/{}/role", user_id))
                .header("content-type", "application/json")
                .body(Body::from(r#"{"role":"admin"}"#))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(db.get_user(user_id).unwrap().unwrap().role, UserRole::Admin);

    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .method("DELETE")
                .uri(format!("/api/users/{}", user_id))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(db.count_bills(None).unwrap(), 0);

    let response = app
        .oneshot(get(&format!("/api/users/{}", user_id)))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

// ========== Bill API Tests ==========

#[tokio::test]
async fn test_create_bill_and_duplicate() {
    let (app, db) = setup_test_app();
    let user_id = db
        .create_user("maria@example.com", "Maria", UserRole::User)
        .unwrap();
    let body = serde_json::to_value(new_bill(user_id, &days_ago(3), 150, 120.5)).unwrap();

    let response = app
        .clone()
        .oneshot(post_json("/api/bills", body.clone()))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let json = get_body_json(response).await;
    assert_eq!(json["duplicate"], false);
    let id = json["id"].as_i64().unwrap();

    let response = app
        .clone()
        .oneshot(post_json("/api/bills", body))
        .await
        .unwrap();
    let json = get_body_json(response).await;
    assert_eq!(json["duplicate"], true);
    assert!(json["id"].is_null());

    let response = app
        .oneshot(get(&format!("/api/bills/{}", id)))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let json = get_body_json(response).await;
    assert_eq!(json["consumption_kwh"], 150);
    assert_eq!(json["tariff_flag"], "green");
}

#[tokio::test]
async fn test_create_bill_invalid_total() {
    let (app, db) = setup_test_app();
    let user_id = db
        .create_user("maria@example.com", "Maria", UserRole::User)
        .unwrap();
    let body = serde_json::to_value(new_bill(user_id, &days_ago(3), 150, -5.0)).unwrap();

    let response = app.oneshot(post_json("/api/bills", body)).await.unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let json = get_body_json(response).await;
    assert!(json["error"].as_str().unwrap().contains("Invalid total value"));
    assert_eq!(db.count_bills(None).unwrap(), 0);
}

#[tokio::test]
async fn test_create_bill_unknown_user() {
    let (app, _db) = setup_test_app();
    let body = serde_json::to_value(new_bill(99, &days_ago(3), 150, 120.5)).unwrap();

    let response = app.oneshot(post_json("/api/bills", body)).await.unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_list_bills_by_period() {
    let (app, db) = setup_test_app();
    let user_id = seed_history(&db);
    db.insert_bill(&new_bill(user_id, &days_ago(400), 180, 150.0))
        .unwrap();

    let response = app
        .clone()
        .oneshot(get(&format!("/api/bills?user_id={}", user_id)))
        .await
        .unwrap();
    let json = get_body_json(response).await;
    assert_eq!(json.as_array().unwrap().len(), 3);
    assert_eq!(json[0]["consumption_kwh"], 280, "most recent first");

    let response = app
        .clone()
        .oneshot(get(&format!("/api/bills?user_id={}&period=3m", user_id)))
        .await
        .unwrap();
    let json = get_body_json(response).await;
    assert_eq!(json.as_array().unwrap().len(), 2);

    let response = app.oneshot(get("/api/bills?period=2w")).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_get_bill_not_found() {
    let (app, _db) = setup_test_app();

    let response = app.oneshot(get("/api/bills/12345")).await.unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_extract_bill() {
    let (app, db) = setup_test_app();
    let user_id = db
        .create_user("maria@example.com", "Maria", UserRole::User)
        .unwrap();
    let text = "Consumo 312 kWh - Total R$ 287,45 - Vencimento: 15/08/2024 - Bandeira vermelha";

    let response = app
        .clone()
        .oneshot(post_json("/api/bills/extract", serde_json::json!({"text": text})))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let json = get_body_json(response).await;
    assert_eq!(json["extracted"]["consumption_kwh"], 312);
    assert_eq!(json["extracted"]["total_value"], 287.45);
    assert_eq!(json["extracted"]["due_date"], "2024-08-15");
    assert_eq!(json["extracted"]["tariff_flag"], "red");
    assert!(json["bill_id"].is_null());
    assert_eq!(db.count_bills(None).unwrap(), 0);

    let response = app
        .oneshot(post_json(
            "/api/bills/extract",
            serde_json::json!({"text": text, "user_id": user_id, "save": true}),
        ))
        .await
        .unwrap();
    let json = get_body_json(response).await;
    assert!(json["bill_id"].is_i64());
    assert_eq!(db.count_bills(Some(user_id)).unwrap(), 1);
}

#[tokio::test]
async fn test_extract_bill_without_fields() {
    let (app, _db) = setup_test_app();

    let response = app
        .oneshot(post_json(
            "/api/bills/extract",
            serde_json::json!({"text": "Consumo 312 kWh, valor ilegível"}),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
}

// ========== Import API Tests ==========

const IMPORT_CSV: &str = "customer_name,address,installation_number,consumption_kwh,total_value,due_date,tariff_flag,distributor,reference_month
Maria Silva,\"Rua A, 10 - Curitiba, PR\",1234567890,220,180.00,10/02/2024,verde,Copel,2024-01
Maria Silva,\"Rua A, 10 - Curitiba, PR\",1234567890,240,\"195,50\",10/03/2024,amarela,Copel,2024-02";

#[tokio::test]
async fn test_import_csv_json_skips_duplicates() {
    let (app, db) = setup_test_app();
    let user_id = db
        .create_user("maria@example.com", "Maria", UserRole::User)
        .unwrap();
    let body = serde_json::json!({"user_id": user_id, "csv_data": IMPORT_CSV});

    let response = app
        .clone()
        .oneshot(post_json("/api/import/json", body.clone()))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let json = get_body_json(response).await;
    assert_eq!(json["imported"], 2);
    assert_eq!(json["skipped"], 0);

    let response = app
        .oneshot(post_json("/api/import/json", body))
        .await
        .unwrap();
    let json = get_body_json(response).await;
    assert_eq!(json["imported"], 0);
    assert_eq!(json["skipped"], 2);
    assert_eq!(json["total"], 2);
}

#[tokio::test]
async fn test_import_csv_multipart() {
    let (app, db) = setup_test_app();
    let user_id = db
        .create_user("maria@example.com", "Maria", UserRole::User)
        .unwrap();

    let boundary = "----energyreaderboundary";
    let body = format!(
        "--{b}\r\nContent-Disposition: form-data; name=\"user_id\"\r\n\r\n{user}\r\n\
         --{b}\r\nContent-Disposition: form-data; name=\"file\"; filename=\"bills.csv\"\r\n\
         Content-Type: text/csv\r\n\r\n{csv}\r\n--{b}--\r\n",
        b = boundary,
        user = user_id,
        csv = IMPORT_CSV
    );

    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/import")
                .header(
                    "content-type",
                    format!("multipart/form-data; boundary={}", boundary),
                )
                .body(Body::from(body))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json = get_body_json(response).await;
    assert_eq!(json["imported"], 2);
}

#[tokio::test]
async fn test_import_missing_column() {
    let (app, db) = setup_test_app();
    let user_id = db
        .create_user("maria@example.com", "Maria", UserRole::User)
        .unwrap();

    let response = app
        .oneshot(post_json(
            "/api/import/json",
            serde_json::json!({"user_id": user_id, "csv_data": "customer_name,address\nMaria,Rua A"}),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

// ========== Analytics API Tests ==========

#[tokio::test]
async fn test_analytics_endpoints() {
    let (app, db) = setup_test_app();
    seed_history(&db);

    let response = app
        .clone()
        .oneshot(get("/api/analytics/trends?period=3m"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let json = get_body_json(response).await;
    let trends = json.as_array().unwrap();
    let counted: u64 = trends.iter().map(|t| t["count"].as_u64().unwrap()).sum();
    assert_eq!(counted, 2);

    let response = app
        .clone()
        .oneshot(get("/api/analytics/regions"))
        .await
        .unwrap();
    let json = get_body_json(response).await;
    assert_eq!(json[0]["region"], "São Paulo");
    assert_eq!(json[0]["count"], 2);
    assert_eq!(json[0]["avg_consumption"], 240);

    let response = app
        .clone()
        .oneshot(get("/api/analytics/flags"))
        .await
        .unwrap();
    let json = get_body_json(response).await;
    assert_eq!(json.as_array().unwrap().len(), 3);

    let response = app
        .clone()
        .oneshot(get("/api/analytics/chart?kind=value&window=6m"))
        .await
        .unwrap();
    let json = get_body_json(response).await;
    assert_eq!(json["type"], "time_series");
    assert_eq!(json["points"].as_array().unwrap().len(), 2);
    // Fewer than four bills leave no earlier window to compare against
    assert!(json["trend"].is_null());

    let response = app
        .oneshot(get("/api/analytics/chart?kind=pie"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_analytics_growth_empty() {
    let (app, _db) = setup_test_app();

    let response = app.oneshot(get("/api/analytics/growth")).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json = get_body_json(response).await;
    assert!(json.is_null());
}

#[tokio::test]
async fn test_user_summary() {
    let (app, db) = setup_test_app();
    let user_id = seed_history(&db);

    let response = app
        .clone()
        .oneshot(get(&format!("/api/analytics/summary?user_id={}", user_id)))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let json = get_body_json(response).await;
    assert_eq!(json["bill_count"], 2);
    assert_eq!(json["latest_consumption"], 280);
    assert_eq!(json["latest_flag"], "red");

    let response = app
        .oneshot(get("/api/analytics/summary?user_id=999"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_admin_metrics() {
    let (app, db) = setup_test_app();
    seed_history(&db);
    db.create_user("admin@example.com", "Admin", UserRole::Admin)
        .unwrap();

    let response = app.oneshot(get("/api/admin/metrics")).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json = get_body_json(response).await;
    assert_eq!(json["total_bills"], 2);
    assert_eq!(json["total_users"], 2);
    assert_eq!(json["avg_consumption"], 240);
    assert_eq!(json["avg_value"], 250.0);
}

// ========== Insight API Tests ==========

#[tokio::test]
async fn test_insights_for_user() {
    let (app, db) = setup_test_app();
    let user_id = seed_history(&db);

    let response = app
        .oneshot(get(&format!("/api/insights?user_id={}", user_id)))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json = get_body_json(response).await;
    let insights = json.as_array().unwrap();
    assert_eq!(insights.len(), 3);
    assert_eq!(insights[0]["kind"], "warning");
    assert_eq!(insights[0]["title"], "Consumption up 40.0%");
    assert_eq!(insights[1]["title"], "Red flag active");
    assert_eq!(insights[2]["title"], "Bill R$ 100.00 higher");
}

#[tokio::test]
async fn test_insights_respect_configured_cap() {
    let db = Database::in_memory().unwrap();
    let user_id = seed_history(&db);
    let mut config = no_auth();
    config.insights.max_insights = 1;
    let app = create_router(db, None, config).unwrap();

    let response = app
        .oneshot(get(&format!("/api/insights?user_id={}", user_id)))
        .await
        .unwrap();

    let json = get_body_json(response).await;
    assert_eq!(json.as_array().unwrap().len(), 1);
}

// ========== Feedback API Tests ==========

#[tokio::test]
async fn test_feedback_workflow() {
    let (app, db) = setup_test_app();
    let user_id = seed_history(&db);
    let bill_id = db
        .list_bills(&energyreader_core::models::BillFilter::for_user(user_id))
        .unwrap()[0]
        .id;

    let response = app
        .clone()
        .oneshot(post_json(
            "/api/feedback",
            serde_json::json!({
                "bill_id": bill_id,
                "user_id": user_id,
                "field_corrected": "consumption_kwh",
                "correct_value": "290"
            }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let json = get_body_json(response).await;
    let id = json["id"].as_i64().unwrap();
    assert_eq!(json["feedback"]["original_value"], "280");
    assert_eq!(json["feedback"]["status"], "pending");
    assert_eq!(json["feedback"]["customer_name"], "Maria Silva");

    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri(format!("/api/feedback/{}/approve", id))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let json = get_body_json(response).await;
    assert_eq!(json["status"], "approved");

    let response = app
        .clone()
        .oneshot(get("/api/feedback?status=pending"))
        .await
        .unwrap();
    let json = get_body_json(response).await;
    assert!(json.as_array().unwrap().is_empty());

    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/feedback/999/reject")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_feedback_for_missing_bill() {
    let (app, db) = setup_test_app();
    let user_id = seed_history(&db);

    let response = app
        .clone()
        .oneshot(post_json(
            "/api/feedback",
            serde_json::json!({
                "bill_id": 4242,
                "user_id": user_id,
                "field_corrected": "total_value",
                "correct_value": "10.00"
            }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let bill_id = db.list_bills(&BillFilter::for_user(user_id)).unwrap()[0].id;
    let response = app
        .oneshot(post_json(
            "/api/feedback",
            serde_json::json!({
                "bill_id": bill_id,
                "user_id": 9999,
                "field_corrected": "total_value",
                "correct_value": "10.00"
            }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    let json = get_body_json(response).await;
    assert_eq!(json["error"], "User 9999 not found");
    assert_eq!(db.count_pending_feedback().unwrap(), 0);
}

#[tokio::test]
async fn test_reads_served_from_injected_store() {
    let db = Database::in_memory().unwrap();
    let store = InMemoryStore::new();
    store
        .add_user(energyreader_core::test_utils::user(
            1,
            "maria@example.com",
            UserRole::User,
        ))
        .unwrap();
    store
        .insert_bill(&new_bill(1, &days_ago(40), 200, 200.0))
        .unwrap();
    store
        .insert_bill(&new_bill(1, &days_ago(10), 280, 300.0))
        .unwrap();
    let app = create_router_with_store(db.clone(), Arc::new(store), None, no_auth()).unwrap();

    let response = app
        .clone()
        .oneshot(get("/api/analytics/summary?user_id=1"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let json = get_body_json(response).await;
    assert_eq!(json["bill_count"], 2);

    let response = app
        .oneshot(get("/api/export/bills?user_id=1"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(get_body_text(response).await.lines().count(), 7);

    // The database only received audit entries
    assert_eq!(db.count_bills(None).unwrap(), 0);
    assert_eq!(db.list_audit_log(10).unwrap().len(), 2);
}

// ========== Export API Tests ==========

#[tokio::test]
async fn test_export_bills_csv() {
    let (app, db) = setup_test_app();
    let user_id = seed_history(&db);

    let response = app
        .oneshot(get(&format!("/api/export/bills?user_id={}", user_id)))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers().get("content-type").unwrap(),
        "text/csv; charset=utf-8"
    );
    let disposition = response
        .headers()
        .get("content-disposition")
        .unwrap()
        .to_str()
        .unwrap()
        .to_string();
    assert!(disposition.starts_with("attachment; filename=\"energyreader_bills_"));
    assert!(disposition.ends_with(".csv\""));

    let body = get_body_text(response).await;
    let lines: Vec<&str> = body.lines().collect();
    assert_eq!(lines[0], "EnergyReader - Bill Report");
    assert!(lines[1].starts_with("Period: all | Generated: "));
    assert_eq!(lines[3], "BILLS");
    assert_eq!(lines.len(), 7);
}

#[tokio::test]
async fn test_export_analytics_and_admin() {
    let (app, db) = setup_test_app();
    seed_history(&db);

    let response = app
        .clone()
        .oneshot(get("/api/export/analytics?period=6m"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = get_body_text(response).await;
    assert!(body.contains("MONTHLY TRENDS"));
    assert!(body.contains("REGIONAL ANALYSIS"));
    assert!(body.contains("Period: 6m"));

    let response = app
        .oneshot(get("/api/export/admin_bills"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = get_body_text(response).await;
    assert!(body.contains("\"São Paulo\""));
}

#[tokio::test]
async fn test_export_json_and_errors() {
    let (app, db) = setup_test_app();
    seed_history(&db);

    let response = app
        .clone()
        .oneshot(get("/api/export/bills?format=json"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers().get("content-type").unwrap(),
        "application/json"
    );
    let json = get_body_json(response).await;
    assert_eq!(json.as_array().unwrap().len(), 2);

    let response = app
        .clone()
        .oneshot(get("/api/export/users?format=json"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = app.oneshot(get("/api/export/invoices")).await.unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

// ========== Audit Log Tests ==========

#[tokio::test]
async fn test_api_calls_are_audited() {
    let (app, db) = setup_test_app();
    let user_id = seed_history(&db);

    app.clone()
        .oneshot(
            Request::builder()
                .uri(format!("/api/insights?user_id={}", user_id))
                .header("cf-access-authenticated-user-email", "auditor@example.com")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    let response = app.oneshot(get("/api/audit?limit=10")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let json = get_body_json(response).await;
    let entries = json.as_array().unwrap();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0]["user_email"], "auditor@example.com");
    assert_eq!(entries[0]["entity_type"], "insights");

    // The audit listing records itself
    let logged = db.list_audit_log(10).unwrap();
    assert_eq!(logged[0].entity_type.as_deref(), Some("audit_log"));
}

#[tokio::test]
async fn test_security_headers() {
    let (app, _db) = setup_test_app();

    let response = app.oneshot(get("/api/bills")).await.unwrap();

    assert_eq!(
        response.headers().get("x-content-type-options").unwrap(),
        "nosniff"
    );
    assert_eq!(response.headers().get("x-frame-options").unwrap(), "DENY");
}
