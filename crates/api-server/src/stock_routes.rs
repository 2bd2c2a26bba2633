//! Stock Ranking API Routes
//!
//! Endpoints for ranked cluster queries and the read-only stock lookups.

use axum::{
    extract::{Path, Query, State},
    routing::get,
    Json, Router,
};
use serde::{Deserialize, Serialize};

use ranking_core::{DatabaseStats, RankQuery, StockDataPoint, WeightEntry};

use crate::{ApiResponse, AppError, AppState};

#[derive(Debug, Deserialize)]
pub struct RankParams {
    pub grouping_column: Option<String>,
    pub grouping_value: Option<String>,
    pub sort_by: Option<String>,
    pub order: Option<String>,
    pub page: Option<i64>,
    pub per_page: Option<i64>,
    /// JSON array of `{ "indicator_name": ..., "weight": ... }`.
    pub numerical_weights: Option<String>,
    pub rating_weights: Option<String>,
}

/// Rank endpoint payload: the page plus the effective query parameters, so
/// clients can render pagination controls without re-deriving defaults.
#[derive(Debug, Serialize)]
pub struct RankResponse {
    pub success: bool,
    pub data: Vec<StockDataPoint>,
    pub total_count: i64,
    pub page: i64,
    pub per_page: i64,
    pub cluster: i64,
    pub grouping_column: String,
    pub grouping_value: String,
    pub sort_by: String,
    pub order: String,
}

pub fn stock_routes() -> Router<AppState> {
    Router::new()
        .route("/api/stocks/cluster/:cluster/rank", get(rank_cluster))
        .route("/api/stocks/cluster/:cluster", get(stocks_by_cluster))
        .route(
            "/api/stocks/cluster/:cluster/unique/:column",
            get(unique_grouping_values),
        )
        .route("/api/stocks/clusters", get(unique_clusters))
        .route("/api/stocks/actions", get(unique_actions))
        .route("/api/stocks/companies", get(unique_companies))
        .route("/api/stocks/tickers", get(unique_tickers))
        .route("/api/stocks/ticker/:ticker", get(stock_by_ticker))
        .route("/api/stocks/id/:id", get(stock_by_id))
        .route("/api/stocks/stats", get(database_stats))
}

fn parse_weights(raw: Option<&str>, field: &str) -> Result<Vec<WeightEntry>, AppError> {
    match raw {
        None => Ok(Vec::new()),
        Some(s) if s.trim().is_empty() => Ok(Vec::new()),
        Some(s) => serde_json::from_str(s)
            .map_err(|e| AppError::BadRequest(format!("invalid {field}: {e}"))),
    }
}

async fn rank_cluster(
    State(state): State<AppState>,
    Path(cluster): Path<i64>,
    Query(params): Query<RankParams>,
) -> Result<Json<RankResponse>, AppError> {
    let mut query = RankQuery::for_cluster(cluster);
    if let Some(column) = params.grouping_column {
        query.grouping_column = column;
    }
    if let Some(value) = params.grouping_value {
        query.grouping_value = value;
    }
    if let Some(sort_by) = params.sort_by {
        query.sort_by = sort_by;
    }
    if let Some(order) = params.order {
        query.order = order;
    }
    if let Some(page) = params.page {
        query.page = page;
    }
    if let Some(per_page) = params.per_page {
        query.per_page = per_page;
    }
    query.numerical_weights = parse_weights(params.numerical_weights.as_deref(), "numerical_weights")?;
    query.rating_weights = parse_weights(params.rating_weights.as_deref(), "rating_weights")?;

    let page = state.service.rank(&query).await?;

    Ok(Json(RankResponse {
        success: true,
        data: page.items,
        total_count: page.total_count,
        page: page.page,
        per_page: page.per_page,
        cluster,
        grouping_column: query.grouping_column,
        grouping_value: query.grouping_value,
        sort_by: query.sort_by,
        order: query.order,
    }))
}

async fn stocks_by_cluster(
    State(state): State<AppState>,
    Path(cluster): Path<i64>,
) -> Result<Json<ApiResponse<Vec<StockDataPoint>>>, AppError> {
    let stocks = state.service.stocks_by_cluster(cluster).await?;
    Ok(Json(ApiResponse::success(stocks)))
}

async fn unique_grouping_values(
    State(state): State<AppState>,
    Path((cluster, column)): Path<(i64, String)>,
) -> Result<Json<ApiResponse<Vec<String>>>, AppError> {
    let values = state.service.unique_grouping_values(cluster, &column).await?;
    Ok(Json(ApiResponse::success(values)))
}

async fn unique_clusters(
    State(state): State<AppState>,
) -> Result<Json<ApiResponse<Vec<i64>>>, AppError> {
    Ok(Json(ApiResponse::success(
        state.service.unique_clusters().await?,
    )))
}

async fn unique_actions(
    State(state): State<AppState>,
) -> Result<Json<ApiResponse<Vec<String>>>, AppError> {
    Ok(Json(ApiResponse::success(
        state.service.unique_actions().await?,
    )))
}

async fn unique_companies(
    State(state): State<AppState>,
) -> Result<Json<ApiResponse<Vec<String>>>, AppError> {
    Ok(Json(ApiResponse::success(
        state.service.unique_companies().await?,
    )))
}

async fn unique_tickers(
    State(state): State<AppState>,
) -> Result<Json<ApiResponse<Vec<String>>>, AppError> {
    Ok(Json(ApiResponse::success(
        state.service.unique_tickers().await?,
    )))
}

async fn stock_by_ticker(
    State(state): State<AppState>,
    Path(ticker): Path<String>,
) -> Result<Json<ApiResponse<StockDataPoint>>, AppError> {
    match state.service.stock_by_ticker(&ticker).await? {
        Some(stock) => Ok(Json(ApiResponse::success(stock))),
        None => Err(AppError::NotFound(format!("no stock with ticker {ticker}"))),
    }
}

async fn stock_by_id(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<ApiResponse<StockDataPoint>>, AppError> {
    match state.service.stock_by_id(id).await? {
        Some(stock) => Ok(Json(ApiResponse::success(stock))),
        None => Err(AppError::NotFound(format!("no stock with id {id}"))),
    }
}

async fn database_stats(
    State(state): State<AppState>,
) -> Result<Json<ApiResponse<DatabaseStats>>, AppError> {
    Ok(Json(ApiResponse::success(
        state.service.database_stats().await?,
    )))
}
