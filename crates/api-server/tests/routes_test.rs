//! Router-level tests over an in-memory SQLite store.

use std::sync::Arc;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use serde_json::Value;
use sqlx::any::{install_default_drivers, AnyPoolOptions};
use tower::ServiceExt;

use api_server::{app, AppState};
use ranking_service::StockRankingService;
use stock_store::StockStore;

async fn test_app() -> Router {
    install_default_drivers();
    // One connection so every statement shares the same :memory: database.
    let pool = AnyPoolOptions::new()
        .max_connections(1)
        .connect("sqlite::memory:")
        .await
        .unwrap();
    let store = StockStore::new(pool.clone());
    store.init_schema().await.unwrap();

    for (id, ticker, action, date) in [
        (1i64, "AAPL", "upgrade", "2024-01-04"),
        (2, "MSFT", "downgrade", "2024-01-03"),
    ] {
        sqlx::query(
            "INSERT INTO stock_data_points \
             (id, ticker, action, date, company, cluster, target_to, target_from, \
              target_delta, last_close, rating_to, rating_from, final_score) \
             VALUES (?, ?, ?, ?, ?, 0, 0, 0, 0, 0, 'Buy', 'Hold', 0.5)",
        )
        .bind(id)
        .bind(ticker)
        .bind(action)
        .bind(date)
        .bind(format!("{ticker} Inc"))
        .execute(&pool)
        .await
        .unwrap();
    }
    sqlx::query(
        "INSERT INTO numerical_indicators (id, stock_data_point_id, name, value, norm_value) \
         VALUES (1, 1, 'atr', 80.0, 0.8)",
    )
    .execute(&pool)
    .await
    .unwrap();

    app(AppState {
        service: Arc::new(StockRankingService::new(store)),
    })
}

async fn get(app: &Router, uri: &str) -> (StatusCode, Value) {
    let response = app
        .clone()
        .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
        .await
        .unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    (status, serde_json::from_slice(&bytes).unwrap())
}

#[tokio::test]
async fn health_reports_ok() {
    let app = test_app().await;
    let (status, body) = get(&app, "/health").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
}

#[tokio::test]
async fn rank_applies_defaults_and_echoes_them() {
    let app = test_app().await;
    let (status, body) = get(&app, "/api/stocks/cluster/0/rank").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
    assert_eq!(body["total_count"], 2);
    assert_eq!(body["page"], 1);
    assert_eq!(body["per_page"], 20);
    assert_eq!(body["sort_by"], "date");
    assert_eq!(body["order"], "desc");
    // date desc puts AAPL first
    assert_eq!(body["data"][0]["ticker"], "AAPL");
    assert_eq!(body["data"][1]["ticker"], "MSFT");
}

#[tokio::test]
async fn rank_with_weights_drops_stocks_without_factor_rows() {
    let app = test_app().await;
    let weights = "%5B%7B%22indicator_name%22%3A%22atr%22%2C%22weight%22%3A0.5%7D%5D";
    let uri = format!(
        "/api/stocks/cluster/0/rank?sort_by=weighted_score&numerical_weights={weights}&rating_weights={weights}"
    );
    let (status, body) = get(&app, &uri).await;
    assert_eq!(status, StatusCode::OK);
    // Count stays the filter count; only AAPL has factor rows on the page.
    assert_eq!(body["total_count"], 2);
    assert_eq!(body["data"].as_array().unwrap().len(), 1);
    assert_eq!(body["data"][0]["ticker"], "AAPL");
    assert!((body["data"][0]["weighted_score"].as_f64().unwrap() - 0.4).abs() < 1e-9);
}

#[tokio::test]
async fn invalid_sort_column_is_rejected_with_400() {
    let app = test_app().await;
    let (status, body) = get(&app, "/api/stocks/cluster/0/rank?sort_by=company").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["success"], false);
    assert!(body["error"].as_str().unwrap().contains("company"));
}

#[tokio::test]
async fn malformed_weight_json_is_rejected_with_400() {
    let app = test_app().await;
    let (status, body) =
        get(&app, "/api/stocks/cluster/0/rank?numerical_weights=not-json").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"]
        .as_str()
        .unwrap()
        .contains("numerical_weights"));
}

#[tokio::test]
async fn unique_values_enforce_the_grouping_whitelist() {
    let app = test_app().await;
    let (status, body) = get(&app, "/api/stocks/cluster/0/unique/action").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"], serde_json::json!(["downgrade", "upgrade"]));

    let (status, _) = get(&app, "/api/stocks/cluster/0/unique/company").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn missing_ticker_is_404() {
    let app = test_app().await;
    let (status, body) = get(&app, "/api/stocks/ticker/ZZZZ").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["success"], false);

    let (status, body) = get(&app, "/api/stocks/ticker/AAPL").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["ticker"], "AAPL");
    assert_eq!(body["data"]["numerical_indicators"][0]["name"], "atr");
}
