use std::collections::HashMap;

use async_trait::async_trait;
use sqlx::any::{install_default_drivers, AnyPoolOptions};
use sqlx::AnyPool;

use ranking_core::{
    DatabaseStats, RankingError, SortPlan, StockDataPoint, StockRepository, ValidatedQuery,
};

use crate::rows::{stock_column_list, IndicatorRow, ScoredStockRow, SentimentRow, StockRow};
use crate::sql;

/// Read-only access to stock data points and their factor rows.
///
/// Connections are pooled; each request borrows one per statement and holds
/// nothing between requests.
pub struct StockStore {
    pool: AnyPool,
}

impl StockStore {
    pub fn new(pool: AnyPool) -> Self {
        Self { pool }
    }

    /// Connects to the database given a URL (postgres://... in production,
    /// sqlite::memory: in tests).
    pub async fn connect(database_url: &str) -> Result<Self, RankingError> {
        install_default_drivers();
        let pool = AnyPoolOptions::new()
            .max_connections(5)
            .connect(database_url)
            .await
            .map_err(RankingError::store)?;
        tracing::info!("connected to stock store");
        Ok(Self { pool })
    }

    pub fn pool(&self) -> &AnyPool {
        &self.pool
    }

    /// Creates tables and indexes if missing. Row identity comes from the
    /// ingestion pipeline, so primary keys are plain BIGINT columns.
    pub async fn init_schema(&self) -> Result<(), RankingError> {
        let statements = [
            "CREATE TABLE IF NOT EXISTS stock_data_points (
                id BIGINT PRIMARY KEY,
                ticker TEXT NOT NULL,
                action TEXT NOT NULL DEFAULT '',
                date TEXT NOT NULL,
                company TEXT NOT NULL,
                cluster BIGINT NOT NULL,
                target_to DOUBLE PRECISION NOT NULL DEFAULT 0,
                target_from DOUBLE PRECISION NOT NULL DEFAULT 0,
                target_delta DOUBLE PRECISION NOT NULL DEFAULT 0,
                last_close DOUBLE PRECISION NOT NULL DEFAULT 0,
                rating_to TEXT NOT NULL DEFAULT '',
                rating_from TEXT NOT NULL DEFAULT '',
                final_score DOUBLE PRECISION NOT NULL DEFAULT 0
            )",
            "CREATE TABLE IF NOT EXISTS numerical_indicators (
                id BIGINT PRIMARY KEY,
                stock_data_point_id BIGINT NOT NULL,
                name TEXT NOT NULL,
                value DOUBLE PRECISION NOT NULL,
                norm_value DOUBLE PRECISION NOT NULL
            )",
            "CREATE TABLE IF NOT EXISTS rating_sentiments (
                id BIGINT PRIMARY KEY,
                stock_data_point_id BIGINT NOT NULL,
                name TEXT NOT NULL,
                rating TEXT NOT NULL,
                rating_score DOUBLE PRECISION NOT NULL,
                norm_rating_score DOUBLE PRECISION NOT NULL
            )",
            "CREATE UNIQUE INDEX IF NOT EXISTS idx_sdp_ticker ON stock_data_points (ticker)",
            "CREATE INDEX IF NOT EXISTS idx_sdp_cluster ON stock_data_points (cluster)",
            "CREATE INDEX IF NOT EXISTS idx_sdp_date ON stock_data_points (date)",
            "CREATE INDEX IF NOT EXISTS idx_sdp_company ON stock_data_points (company)",
            "CREATE UNIQUE INDEX IF NOT EXISTS idx_ni_stock_name
                ON numerical_indicators (stock_data_point_id, name)",
            "CREATE UNIQUE INDEX IF NOT EXISTS idx_rs_stock_name
                ON rating_sentiments (stock_data_point_id, name)",
        ];
        for stmt in statements {
            sqlx::query(stmt)
                .execute(&self.pool)
                .await
                .map_err(RankingError::store)?;
        }
        Ok(())
    }

    /// Total count over the base filter only, computed before any scoring
    /// join so pagination metadata is independent of the supplied weights.
    async fn count_filtered(&self, query: &ValidatedQuery) -> Result<i64, RankingError> {
        let mut stmt = String::from("SELECT COUNT(*) FROM stock_data_points WHERE cluster = ?");
        if let Some(grouping) = &query.grouping {
            stmt.push_str(&format!(" AND {} = ?", grouping.column));
        }

        let mut q = sqlx::query_scalar::<_, i64>(&stmt).bind(query.cluster);
        if let Some(grouping) = &query.grouping {
            q = q.bind(grouping.value.as_str());
        }
        q.fetch_one(&self.pool).await.map_err(RankingError::store)
    }

    /// Page fetch without a scoring join; `weighted_score` stays absent.
    async fn fetch_plain_page(
        &self,
        query: &ValidatedQuery,
    ) -> Result<Vec<StockDataPoint>, RankingError> {
        let mut stmt = format!(
            "SELECT {} FROM stock_data_points WHERE cluster = ?",
            stock_column_list(None)
        );
        if let Some(grouping) = &query.grouping {
            stmt.push_str(&format!(" AND {} = ?", grouping.column));
        }
        if let SortPlan::Plain { column, order } = query.sort {
            stmt.push_str(&format!(" ORDER BY {} {}", column, order.as_sql()));
        }
        stmt.push_str(" LIMIT ? OFFSET ?");

        let mut q = sqlx::query_as::<_, StockRow>(&stmt).bind(query.cluster);
        if let Some(grouping) = &query.grouping {
            q = q.bind(grouping.value.as_str());
        }
        let rows = q
            .bind(query.per_page)
            .bind(query.offset())
            .fetch_all(&self.pool)
            .await
            .map_err(RankingError::store)?;

        Ok(rows.into_iter().map(|r| r.into_stock(None)).collect())
    }

    /// Page fetch joined against the combined weighted-score subquery.
    /// The score is cast to DOUBLE PRECISION because SQLite returns an
    /// integer when every CASE arm misses (all-literal `0` sum), which
    /// would otherwise fail to decode into the `f64` row field.
    ///
    /// The INNER JOIN drops stocks with zero rows in both factor families;
    /// one row in either family (matching a weight or not) is enough to
    /// survive with a partial score >= 0. The base filter and the count
    /// stage are unaffected by the join.
    async fn fetch_scored_page(
        &self,
        query: &ValidatedQuery,
        combined_subquery: &str,
    ) -> Result<Vec<StockDataPoint>, RankingError> {
        let mut stmt = format!(
            "SELECT {}, CAST(cs.weighted_score AS DOUBLE PRECISION) AS weighted_score \
             FROM stock_data_points s \
             INNER JOIN {} cs ON cs.stock_data_point_id = s.id \
             WHERE s.cluster = ?",
            stock_column_list(Some("s")),
            combined_subquery,
        );
        if let Some(grouping) = &query.grouping {
            stmt.push_str(&format!(" AND s.{} = ?", grouping.column));
        }
        match query.sort {
            SortPlan::Plain { column, order } => {
                stmt.push_str(&format!(" ORDER BY s.{} {}", column, order.as_sql()));
            }
            // Composite ranking is conventionally best-first.
            SortPlan::WeightedScore => stmt.push_str(" ORDER BY cs.weighted_score DESC"),
            SortPlan::Unsorted => {}
        }
        stmt.push_str(" LIMIT ? OFFSET ?");

        let mut q = sqlx::query_as::<_, ScoredStockRow>(&stmt).bind(query.cluster);
        if let Some(grouping) = &query.grouping {
            q = q.bind(grouping.value.as_str());
        }
        let rows = q
            .bind(query.per_page)
            .bind(query.offset())
            .fetch_all(&self.pool)
            .await
            .map_err(RankingError::store)?;

        Ok(rows
            .into_iter()
            .map(|r| {
                let score = r.weighted_score;
                r.stock.into_stock(Some(score))
            })
            .collect())
    }

    /// Loads both factor collections for exactly the given stocks. Runs
    /// against page-sized results only, never the full filtered set.
    async fn hydrate(&self, stocks: &mut [StockDataPoint]) -> Result<(), RankingError> {
        if stocks.is_empty() {
            return Ok(());
        }
        let ids: Vec<i64> = stocks.iter().map(|s| s.id).collect();
        let placeholders = vec!["?"; ids.len()].join(", ");

        let stmt = format!(
            "SELECT id, stock_data_point_id, name, value, norm_value \
             FROM numerical_indicators WHERE stock_data_point_id IN ({placeholders}) \
             ORDER BY name"
        );
        let mut q = sqlx::query_as::<_, IndicatorRow>(&stmt);
        for id in &ids {
            q = q.bind(*id);
        }
        let mut indicators: HashMap<i64, Vec<_>> = HashMap::new();
        for row in q.fetch_all(&self.pool).await.map_err(RankingError::store)? {
            indicators
                .entry(row.stock_data_point_id)
                .or_default()
                .push(row.into_indicator());
        }

        let stmt = format!(
            "SELECT id, stock_data_point_id, name, rating, rating_score, norm_rating_score \
             FROM rating_sentiments WHERE stock_data_point_id IN ({placeholders}) \
             ORDER BY name"
        );
        let mut q = sqlx::query_as::<_, SentimentRow>(&stmt);
        for id in &ids {
            q = q.bind(*id);
        }
        let mut sentiments: HashMap<i64, Vec<_>> = HashMap::new();
        for row in q.fetch_all(&self.pool).await.map_err(RankingError::store)? {
            sentiments
                .entry(row.stock_data_point_id)
                .or_default()
                .push(row.into_sentiment());
        }

        for stock in stocks.iter_mut() {
            stock.numerical_indicators = indicators.remove(&stock.id).unwrap_or_default();
            stock.rating_sentiments = sentiments.remove(&stock.id).unwrap_or_default();
        }
        Ok(())
    }

    async fn hydrate_single(
        &self,
        row: Option<StockRow>,
    ) -> Result<Option<StockDataPoint>, RankingError> {
        match row {
            Some(row) => {
                let mut stocks = vec![row.into_stock(None)];
                self.hydrate(&mut stocks).await?;
                Ok(stocks.pop())
            }
            None => Ok(None),
        }
    }

    async fn distinct_strings(&self, stmt: &str) -> Result<Vec<String>, RankingError> {
        sqlx::query_scalar::<_, String>(stmt)
            .fetch_all(&self.pool)
            .await
            .map_err(RankingError::store)
    }
}

#[async_trait]
impl StockRepository for StockStore {
    async fn fetch_ranked_page(
        &self,
        query: &ValidatedQuery,
    ) -> Result<(Vec<StockDataPoint>, i64), RankingError> {
        let total_count = self.count_filtered(query).await?;

        let mut stocks = match sql::weighted_score_subquery(
            &query.numerical_weights,
            &query.rating_weights,
        ) {
            Some(combined) => self.fetch_scored_page(query, &combined).await?,
            None => self.fetch_plain_page(query).await?,
        };
        self.hydrate(&mut stocks).await?;

        tracing::debug!(
            cluster = query.cluster,
            total_count,
            returned = stocks.len(),
            "ranked page fetched"
        );
        Ok((stocks, total_count))
    }

    async fn stocks_by_cluster(
        &self,
        cluster: i64,
    ) -> Result<Vec<StockDataPoint>, RankingError> {
        let stmt = format!(
            "SELECT {} FROM stock_data_points WHERE cluster = ? ORDER BY id",
            stock_column_list(None)
        );
        let rows = sqlx::query_as::<_, StockRow>(&stmt)
            .bind(cluster)
            .fetch_all(&self.pool)
            .await
            .map_err(RankingError::store)?;
        let mut stocks: Vec<_> = rows.into_iter().map(|r| r.into_stock(None)).collect();
        self.hydrate(&mut stocks).await?;
        Ok(stocks)
    }

    async fn stock_by_ticker(
        &self,
        ticker: &str,
    ) -> Result<Option<StockDataPoint>, RankingError> {
        let stmt = format!(
            "SELECT {} FROM stock_data_points WHERE ticker = ?",
            stock_column_list(None)
        );
        let row = sqlx::query_as::<_, StockRow>(&stmt)
            .bind(ticker)
            .fetch_optional(&self.pool)
            .await
            .map_err(RankingError::store)?;
        self.hydrate_single(row).await
    }

    async fn stock_by_id(&self, id: i64) -> Result<Option<StockDataPoint>, RankingError> {
        let stmt = format!(
            "SELECT {} FROM stock_data_points WHERE id = ?",
            stock_column_list(None)
        );
        let row = sqlx::query_as::<_, StockRow>(&stmt)
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(RankingError::store)?;
        self.hydrate_single(row).await
    }

    async fn unique_clusters(&self) -> Result<Vec<i64>, RankingError> {
        sqlx::query_scalar::<_, i64>(
            "SELECT DISTINCT cluster FROM stock_data_points ORDER BY cluster",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(RankingError::store)
    }

    async fn unique_actions(&self) -> Result<Vec<String>, RankingError> {
        self.distinct_strings("SELECT DISTINCT action FROM stock_data_points ORDER BY action")
            .await
    }

    async fn unique_companies(&self) -> Result<Vec<String>, RankingError> {
        self.distinct_strings("SELECT DISTINCT company FROM stock_data_points ORDER BY company")
            .await
    }

    async fn unique_tickers(&self) -> Result<Vec<String>, RankingError> {
        self.distinct_strings("SELECT DISTINCT ticker FROM stock_data_points ORDER BY ticker")
            .await
    }

    async fn unique_grouping_values(
        &self,
        cluster: i64,
        column: &'static str,
    ) -> Result<Vec<String>, RankingError> {
        let stmt = format!(
            "SELECT DISTINCT {column} FROM stock_data_points WHERE cluster = ? ORDER BY {column}"
        );
        sqlx::query_scalar::<_, String>(&stmt)
            .bind(cluster)
            .fetch_all(&self.pool)
            .await
            .map_err(RankingError::store)
    }

    async fn database_stats(&self) -> Result<DatabaseStats, RankingError> {
        let (total_records, unique_tickers, unique_companies): (i64, i64, i64) =
            sqlx::query_as(
                "SELECT COUNT(*), COUNT(DISTINCT ticker), COUNT(DISTINCT company) \
                 FROM stock_data_points",
            )
            .fetch_one(&self.pool)
            .await
            .map_err(RankingError::store)?;
        Ok(DatabaseStats {
            total_records,
            unique_tickers,
            unique_companies,
        })
    }
}
