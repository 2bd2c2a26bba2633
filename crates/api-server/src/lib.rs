//! HTTP transport for the cluster ranking engine.
//!
//! Thin layer: every route deserializes caller input into the core request
//! types, hands off to [`StockRankingService`], and wraps the result in the
//! uniform [`ApiResponse`] envelope. Whitelist violations come back as 400
//! with the validation message; store failures come back as an opaque 500.

use std::sync::Arc;

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::{routing::get, Json, Router};
use serde::Serialize;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use ranking_core::RankingError;
use ranking_service::StockRankingService;
use stock_store::StockStore;

mod config;
pub mod stock_routes;

pub use config::ServerConfig;

#[derive(Clone)]
pub struct AppState {
    pub service: Arc<StockRankingService<StockStore>>,
}

#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl<T> ApiResponse<T> {
    pub fn success(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(message.into()),
        }
    }
}

#[derive(Debug)]
pub enum AppError {
    /// Caller sent something the whitelists or parsers reject.
    BadRequest(String),
    NotFound(String),
    Ranking(RankingError),
    Internal(anyhow::Error),
}

impl From<RankingError> for AppError {
    fn from(err: RankingError) -> Self {
        Self::Ranking(err)
    }
}

impl From<anyhow::Error> for AppError {
    fn from(err: anyhow::Error) -> Self {
        Self::Internal(err)
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            Self::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            Self::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            Self::Ranking(err) if err.is_validation() => {
                (StatusCode::BAD_REQUEST, err.to_string())
            }
            Self::Ranking(err) => {
                tracing::error!(error = %err, "store failure");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "internal error".to_string(),
                )
            }
            Self::Internal(err) => {
                tracing::error!(error = %err, "unhandled failure");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "internal error".to_string(),
                )
            }
        };
        (status, Json(ApiResponse::<()>::error(message))).into_response()
    }
}

async fn health() -> Json<ApiResponse<&'static str>> {
    Json(ApiResponse::success("ok"))
}

/// Builds the full router. Split out from [`run_server`] so tests can drive
/// it with `tower::ServiceExt::oneshot`.
pub fn app(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .merge(stock_routes::stock_routes())
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

pub async fn run_server() -> anyhow::Result<()> {
    let config = ServerConfig::from_env()?;

    let store = StockStore::connect(&config.database_url).await?;
    store.init_schema().await?;
    let state = AppState {
        service: Arc::new(StockRankingService::new(store)),
    };

    let addr = format!("{}:{}", config.host, config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!(%addr, "ranking API listening");
    axum::serve(listener, app(state)).await?;
    Ok(())
}
