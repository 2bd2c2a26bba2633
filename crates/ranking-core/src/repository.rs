use async_trait::async_trait;

use crate::error::RankingError;
use crate::query::ValidatedQuery;
use crate::types::{DatabaseStats, StockDataPoint};

/// Read-only data access seam between the ranking service and the store.
///
/// Implementations must uphold the count/page consistency contract: the
/// total count returned by `fetch_ranked_page` reflects only the cluster
/// and grouping filter, computed before any scoring join, using the same
/// predicate as the returned page.
#[async_trait]
pub trait StockRepository: Send + Sync {
    /// Runs the full filter/score/sort/paginate/hydrate pipeline for an
    /// already validated query. Returns the page items (each with both
    /// factor collections populated) and the stable total count.
    async fn fetch_ranked_page(
        &self,
        query: &ValidatedQuery,
    ) -> Result<(Vec<StockDataPoint>, i64), RankingError>;

    /// All members of a cluster, hydrated. Used by in-memory ranking.
    async fn stocks_by_cluster(&self, cluster: i64)
        -> Result<Vec<StockDataPoint>, RankingError>;

    async fn stock_by_ticker(&self, ticker: &str)
        -> Result<Option<StockDataPoint>, RankingError>;

    async fn stock_by_id(&self, id: i64) -> Result<Option<StockDataPoint>, RankingError>;

    async fn unique_clusters(&self) -> Result<Vec<i64>, RankingError>;

    async fn unique_actions(&self) -> Result<Vec<String>, RankingError>;

    async fn unique_companies(&self) -> Result<Vec<String>, RankingError>;

    async fn unique_tickers(&self) -> Result<Vec<String>, RankingError>;

    /// Distinct values of one grouping column within a cluster, sorted.
    /// `column` is a canonical whitelist entry, never raw caller input.
    async fn unique_grouping_values(
        &self,
        cluster: i64,
        column: &'static str,
    ) -> Result<Vec<String>, RankingError>;

    async fn database_stats(&self) -> Result<DatabaseStats, RankingError>;
}
