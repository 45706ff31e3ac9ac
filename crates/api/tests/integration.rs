//! Integration tests for API routes.
//!
//! Uses `tower::ServiceExt` to test Axum routes without a real HTTP server.
//!
//! ```bash
//! cargo test -p sentinel-api --test integration
//! ```

use axum::body::Body;
use axum::http::{Request, StatusCode};
use chrono::{TimeZone, Utc};
use tower::ServiceExt;

use sentinel_api::routes::create_router;
use sentinel_api::state::AppState;
use sentinel_common::fixed::Fix;
use sentinel_common::types::{CollateralConfig, FeedRound};
use sentinel_engine::book::{CollateralBook, SharedBook};
use sentinel_engine::collateral::Collateral;
use sentinel_engine::oracle::FeedSnapshot;

// ============================================================
// Helpers
// ============================================================

const USDC: &str = "0x833589fcd6edb6e08f4c7c32d4f71b54bda02913";
const NARS: &str = "0x5e40f26e89213660514c51fb61b2d357dbf63c85";

fn config(erc20: &str, target: &str) -> CollateralConfig {
    CollateralConfig {
        erc20: erc20.to_string(),
        target_name: target.to_string(),
        price_timeout: 604_800,
        oracle_timeout: 86_400,
        oracle_error: "0.0025".parse().unwrap(),
        default_threshold: "0.0125".parse().unwrap(),
        delay_until_default: 86_400,
        max_trade_volume: Fix::from_int(1_000_000),
        revenue_hiding: "0.000001".parse().unwrap(),
        target_per_ref: Fix::ONE,
    }
}

/// Book with USDC priced at 1.00 and NARS registered but never refreshed.
fn build_book() -> SharedBook {
    let mut book = CollateralBook::new();
    book.register(Collateral::new(config(USDC, "USD")).unwrap())
        .unwrap();
    book.register(Collateral::new(config(NARS, "ARS")).unwrap())
        .unwrap();

    let now = Utc.with_ymd_and_hms(2024, 3, 1, 0, 0, 0).unwrap();
    let feed = FeedSnapshot(Ok(FeedRound {
        answer: 100_000_000,
        decimals: 8,
        updated_at: now,
    }));
    book.get_mut(USDC)
        .unwrap()
        .refresh(now, &feed, &Fix::ONE);

    book.into_shared()
}

async fn get_json(uri: &str) -> (StatusCode, serde_json::Value) {
    let app = create_router(AppState::new(build_book()));
    let response = app
        .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
        .await
        .unwrap();

    let status = response.status();
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    (status, serde_json::from_slice(&body).unwrap())
}

// ============================================================
// Route tests
// ============================================================

#[tokio::test]
async fn test_health_endpoint() {
    let (status, json) = get_json("/health").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["status"], "ok");
    assert_eq!(json["service"], "peg-sentinel-api");
    assert_eq!(json["assets"], 2);
}

#[tokio::test]
async fn test_list_assets() {
    let (status, json) = get_json("/api/assets").await;
    assert_eq!(status, StatusCode::OK);

    let assets = json.as_array().unwrap();
    assert_eq!(assets.len(), 2);
    assert_eq!(assets[0]["erc20"], NARS);
    assert_eq!(assets[0]["price"], serde_json::Value::Null);
    assert_eq!(assets[1]["erc20"], USDC);
    assert_eq!(assets[1]["status"], "SOUND");
    assert_eq!(assets[1]["ref_per_tok"], "1");
}

#[tokio::test]
async fn test_get_asset_is_case_insensitive() {
    let (status, json) = get_json("/api/assets/0x833589fCD6eDb6E08f4c7C32D4f71b54bdA02913").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["target_name"], "USD");
    assert_eq!(json["when_default"], serde_json::Value::Null);
}

#[tokio::test]
async fn test_unknown_asset_is_404() {
    let (status, json) = get_json("/api/assets/0x0000000000000000000000000000000000000001").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert!(json["error"].as_str().unwrap().contains("not monitored"));
}

#[tokio::test]
async fn test_malformed_address_is_400() {
    let (status, _) = get_json("/api/assets/usdc").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_price_for_refreshed_asset() {
    let (status, json) = get_json(&format!("/api/assets/{}/price", USDC)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["band"]["low"], "0.9975");
    assert_eq!(json["band"]["high"], "1.0025");
    assert_eq!(json["peg_price"], "1");
}

#[tokio::test]
async fn test_price_for_unpriced_asset_is_503() {
    let (status, json) = get_json(&format!("/api/assets/{}/price", NARS)).await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert!(json["error"].is_string());
}
