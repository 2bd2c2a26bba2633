//! Internal row types for sqlx deserialization.

use chrono::NaiveDate;
use ranking_core::{NumericalIndicator, RatingSentiment, StockDataPoint};

/// Base columns, selected in this order by every stock query.
pub(crate) const STOCK_COLUMNS: &[&str] = &[
    "id",
    "ticker",
    "action",
    "date",
    "company",
    "cluster",
    "target_to",
    "target_from",
    "target_delta",
    "last_close",
    "rating_to",
    "rating_from",
    "final_score",
];

/// Comma-joined column list, optionally qualified with a table alias.
pub(crate) fn stock_column_list(alias: Option<&str>) -> String {
    match alias {
        Some(a) => STOCK_COLUMNS
            .iter()
            .map(|c| format!("{a}.{c}"))
            .collect::<Vec<_>>()
            .join(", "),
        None => STOCK_COLUMNS.join(", "),
    }
}

#[derive(sqlx::FromRow)]
pub(crate) struct StockRow {
    pub id: i64,
    pub ticker: String,
    pub action: String,
    pub date: String,
    pub company: String,
    pub cluster: i64,
    pub target_to: f64,
    pub target_from: f64,
    pub target_delta: f64,
    pub last_close: f64,
    pub rating_to: String,
    pub rating_from: String,
    pub final_score: f64,
}

impl StockRow {
    /// Factor collections start empty; the hydration stage fills them for
    /// page-sized results only.
    pub(crate) fn into_stock(self, weighted_score: Option<f64>) -> StockDataPoint {
        StockDataPoint {
            id: self.id,
            ticker: self.ticker,
            action: self.action,
            date: NaiveDate::parse_from_str(&self.date, "%Y-%m-%d").unwrap_or_default(),
            company: self.company,
            cluster: self.cluster,
            target_to: self.target_to,
            target_from: self.target_from,
            target_delta: self.target_delta,
            last_close: self.last_close,
            rating_to: self.rating_to,
            rating_from: self.rating_from,
            final_score: self.final_score,
            weighted_score,
            rating_sentiments: Vec::new(),
            numerical_indicators: Vec::new(),
        }
    }
}

#[derive(sqlx::FromRow)]
pub(crate) struct ScoredStockRow {
    #[sqlx(flatten)]
    pub stock: StockRow,
    pub weighted_score: f64,
}

#[derive(sqlx::FromRow)]
pub(crate) struct IndicatorRow {
    pub id: i64,
    pub stock_data_point_id: i64,
    pub name: String,
    pub value: f64,
    pub norm_value: f64,
}

impl IndicatorRow {
    pub(crate) fn into_indicator(self) -> NumericalIndicator {
        NumericalIndicator {
            id: self.id,
            stock_data_point_id: self.stock_data_point_id,
            name: self.name,
            value: self.value,
            norm_value: self.norm_value,
        }
    }
}

#[derive(sqlx::FromRow)]
pub(crate) struct SentimentRow {
    pub id: i64,
    pub stock_data_point_id: i64,
    pub name: String,
    pub rating: String,
    pub rating_score: f64,
    pub norm_rating_score: f64,
}

impl SentimentRow {
    pub(crate) fn into_sentiment(self) -> RatingSentiment {
        RatingSentiment {
            id: self.id,
            stock_data_point_id: self.stock_data_point_id,
            name: self.name,
            rating: self.rating,
            rating_score: self.rating_score,
            norm_rating_score: self.norm_rating_score,
        }
    }
}
