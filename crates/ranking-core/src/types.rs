use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// One stock data point, the unit of ranking. Produced and updated only by
/// the external ingestion pipeline; this engine reads it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StockDataPoint {
    pub id: i64,
    pub ticker: String,
    pub action: String,
    pub date: NaiveDate,
    pub company: String,
    pub cluster: i64,
    pub target_to: f64,
    pub target_from: f64,
    pub target_delta: f64,
    pub last_close: f64,
    pub rating_to: String,
    pub rating_from: String,
    /// Precomputed upstream by the enrichment batch; immutable here.
    pub final_score: f64,
    /// Computed per request from caller weights, never persisted.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub weighted_score: Option<f64>,
    pub rating_sentiments: Vec<RatingSentiment>,
    pub numerical_indicators: Vec<NumericalIndicator>,
}

/// A pre-normalized numerical technical indicator (e.g. atr, obv).
/// At most one row per (stock, name).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NumericalIndicator {
    pub id: i64,
    pub stock_data_point_id: i64,
    pub name: String,
    pub value: f64,
    pub norm_value: f64,
}

/// A rating transition mapped to a numeric sentiment, pre-normalized.
/// At most one row per (stock, name).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RatingSentiment {
    pub id: i64,
    pub stock_data_point_id: i64,
    pub name: String,
    pub rating: String,
    pub rating_score: f64,
    pub norm_rating_score: f64,
}

/// A caller-supplied weight for one factor name. Names that match no factor
/// row are inert; they contribute nothing and are never an error.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeightEntry {
    pub indicator_name: String,
    pub weight: f64,
}

/// One page of ranked stocks plus stable pagination metadata.
/// `total_count` always reflects the base cluster/grouping filter,
/// independent of any scoring join.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RankedPage {
    pub items: Vec<StockDataPoint>,
    pub total_count: i64,
    pub page: i64,
    pub per_page: i64,
}

/// Whole-store counters surfaced by the stats endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseStats {
    pub total_records: i64,
    pub unique_tickers: i64,
    pub unique_companies: i64,
}
