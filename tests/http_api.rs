use std::sync::Arc;

use axum::body::{to_bytes, Body};
use axum::http::{header, Request, StatusCode};
use axum::Router;
use chrono::{Duration, NaiveDate, TimeZone, Utc};
use rust_decimal_macros::dec;
use tower::ServiceExt;

use investor_receipts_rs::http::{self, RunSummary};
use investor_receipts_rs::store::MemoryLoanStore;
use investor_receipts_rs::{
    InvestorId, LoanId, LoanRecord, Money, PortalConfig, PortalContext, Rate, SafeTimeProvider,
    SkipReason, TimeSource,
};

const BASE_URL: &str = "http://portal.test";

fn loan(id: &str, start: NaiveDate) -> LoanRecord {
    LoanRecord {
        id: LoanId::from(id),
        investor_id: InvestorId::from("inv-1"),
        title: Some("Calle Mayor 4".to_string()),
        principal: Some(Money::from_major(10_000).into()),
        annual_rate: Some(Rate::from_decimal(dec!(0.12)).into()),
        start_date: start,
        end_date: None,
        payment_day: 10,
        retention_pct: Some(dec!(15).into()),
        active: true,
        investor_name: Some("Ana".to_string()),
        investor_email: None,
    }
}

fn setup() -> (Router, PortalContext) {
    let config = PortalConfig {
        cron_secret: Some("cron-secret".to_string()),
        admin_secret: Some("admin-secret".to_string()),
        signing_secret: "signing-secret".to_string(),
        public_base_url: BASE_URL.to_string(),
        ..PortalConfig::default()
    };
    let loans = Arc::new(MemoryLoanStore::new(vec![
        loan("loan-a", NaiveDate::from_ymd_opt(2024, 1, 1).unwrap()),
        loan("loan-b", NaiveDate::from_ymd_opt(2025, 6, 1).unwrap()),
    ]));
    let time = SafeTimeProvider::new(TimeSource::Test(
        Utc.with_ymd_and_hms(2025, 4, 1, 6, 0, 0).unwrap(),
    ));
    let ctx = PortalContext::in_memory(config, loans, time);
    (http::router(ctx.clone()), ctx)
}

fn cron(uri: &str, secret: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder().method("POST").uri(uri);
    if let Some(secret) = secret {
        builder = builder.header(http::CRON_SECRET_HEADER, secret);
    }
    builder.body(Body::empty()).unwrap()
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

async fn body_bytes(response: axum::response::Response) -> Vec<u8> {
    to_bytes(response.into_body(), usize::MAX).await.unwrap().to_vec()
}

async fn body_json(response: axum::response::Response) -> serde_json::Value {
    serde_json::from_slice(&body_bytes(response).await).unwrap()
}

#[tokio::test]
async fn test_health() {
    let (app, _) = setup();
    let response = app.oneshot(get("/health")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_cron_requires_secret() {
    let (app, _) = setup();

    let response = app
        .clone()
        .oneshot(cron("/api/cron/generate-receipts", None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let body = body_json(response).await;
    assert_eq!(body["ok"], false);

    let response = app
        .oneshot(cron("/api/cron/generate-receipts", Some("wrong")))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_cron_rejects_unconfigured_secret() {
    let ctx = PortalContext::in_memory(
        PortalConfig::default(),
        Arc::new(MemoryLoanStore::default()),
        SafeTimeProvider::new(TimeSource::Test(Utc.with_ymd_and_hms(2025, 4, 1, 0, 0, 0).unwrap())),
    );
    let response = http::router(ctx)
        .oneshot(cron("/api/cron/generate-receipts", Some("")))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_cron_rejects_bad_month() {
    let (app, _) = setup();
    let response = app
        .clone()
        .oneshot(cron(
            "/api/cron/generate-receipts?year=2025&month=13",
            Some("cron-secret"),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = app
        .oneshot(cron(
            "/api/cron/generate-receipts?year=2025&month=march",
            Some("cron-secret"),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_cron_runs_previous_month_and_is_idempotent() {
    let (app, ctx) = setup();

    let response = app
        .clone()
        .oneshot(cron("/api/cron/generate-receipts", Some("cron-secret")))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let summary: RunSummary = serde_json::from_slice(&body_bytes(response).await).unwrap();
    assert!(summary.ok);
    assert_eq!((summary.period.year, summary.period.month), (2025, 3));
    assert_eq!(summary.created, 1);
    assert_eq!(summary.skipped, 1);
    assert_eq!(summary.skips[0].loan_id, LoanId::from("loan-b"));
    assert_eq!(summary.skips[0].reason, SkipReason::OutsideActiveWindow);
    assert!(summary.errors.is_empty());
    assert!(ctx
        .objects
        .exists("inv-1/receipts/2025/receipt_2025-03_loan-a.pdf")
        .await
        .unwrap());

    let response = app
        .oneshot(cron(
            "/api/cron/generate-receipts?year=2025&month=3",
            Some("cron-secret"),
        ))
        .await
        .unwrap();
    let body = body_json(response).await;
    assert_eq!(body["created"], 0);
    assert_eq!(body["skips"][0]["reason"], "already-exists");
}

#[tokio::test]
async fn test_download_redirects_to_signed_url() {
    let (app, ctx) = setup();
    app.clone()
        .oneshot(cron("/api/cron/generate-receipts", Some("cron-secret")))
        .await
        .unwrap();

    let path = "inv-1/receipts/2025/receipt_2025-03_loan-a.pdf";
    let response = app
        .clone()
        .oneshot(get(&format!("/api/download?path={path}")))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::FOUND);
    let location = response
        .headers()
        .get(header::LOCATION)
        .unwrap()
        .to_str()
        .unwrap()
        .to_string();
    assert!(location.starts_with(&format!("{BASE_URL}/files/{path}?expires=")));

    let local = location.trim_start_matches(BASE_URL).to_string();
    let response = app.clone().oneshot(get(&local)).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers().get(header::CONTENT_TYPE).unwrap(),
        "application/pdf"
    );
    assert_eq!(response.headers().get(header::CACHE_CONTROL).unwrap(), "no-store");
    assert!(body_bytes(response).await.starts_with(b"%PDF-"));

    // tampered signature
    let tampered = format!("{}0", local);
    let response = app.clone().oneshot(get(&tampered)).await.unwrap();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    // expired
    ctx.time.test_control().unwrap().advance(Duration::seconds(61));
    let response = app.oneshot(get(&local)).await.unwrap();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_download_rejects_bad_paths() {
    let (app, _) = setup();

    let response = app.clone().oneshot(get("/api/download")).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = app
        .clone()
        .oneshot(get("/api/download?path=../etc/passwd"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = app
        .clone()
        .oneshot(get("/api/download?path=inv-1/receipts/2025/missing.pdf"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let response = app
        .oneshot(get("/files/inv-1/receipts/2025/missing.pdf"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_admin_upload_and_list() {
    let (app, _) = setup();

    let upload = |secret: &str, body: &'static [u8]| {
        Request::builder()
            .method("POST")
            .uri("/api/admin/documents?investor_id=inv-1&category=contract&year=2024&name=Contrato%20Pr%C3%A9stamo")
            .header(http::ADMIN_SECRET_HEADER, secret)
            .body(Body::from(body))
            .unwrap()
    };

    let response = app
        .clone()
        .oneshot(upload("nope", b"%PDF-1.4\n"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let response = app
        .clone()
        .oneshot(upload("admin-secret", b"not a pdf"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = app
        .clone()
        .oneshot(upload("admin-secret", b"%PDF-1.4\n"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);
    let entry = body_json(response).await;
    assert_eq!(entry["storage_path"], "inv-1/contracts/2024/Contrato_Prestamo.pdf");
    assert_eq!(entry["category"], "contract");

    let list = Request::builder()
        .uri("/api/admin/documents?investor_id=inv-1&year=2024")
        .header(http::ADMIN_SECRET_HEADER, "admin-secret")
        .body(Body::empty())
        .unwrap();
    let response = app.oneshot(list).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["documents"].as_array().unwrap().len(), 1);
    assert_eq!(body["documents"][0]["display_name"], "Contrato_Prestamo.pdf");
}
