//! Ranking service façade.
//!
//! The externally consumed entry point: validates a raw [`RankQuery`]
//! against the column whitelists, delegates the filter/score/sort/paginate
//! pipeline to the repository, and assembles the [`RankedPage`]. Also hosts
//! the in-memory whole-cluster ranking built on the core scoring
//! primitives.

use serde::Serialize;

use ranking_core::{
    canonicalize, scoring, DatabaseStats, RankQuery, RankedPage, RankingError, StockDataPoint,
    StockRepository, WeightEntry, GROUPING_COLUMNS,
};

/// One stock with its in-memory composite score.
#[derive(Debug, Clone, Serialize)]
pub struct ClusterRanking {
    pub stock: StockDataPoint,
    pub score: f64,
}

pub struct StockRankingService<R: StockRepository> {
    repo: R,
}

impl<R: StockRepository> StockRankingService<R> {
    pub fn new(repo: R) -> Self {
        Self { repo }
    }

    /// Runs one ranked, paginated query. Fails fast on any whitelist
    /// violation before the repository is touched; never returns partial
    /// results.
    pub async fn rank(&self, query: &RankQuery) -> Result<RankedPage, RankingError> {
        let validated = query.validate()?;
        let (items, total_count) = self.repo.fetch_ranked_page(&validated).await?;

        tracing::info!(
            cluster = validated.cluster,
            total_count,
            page = validated.page,
            returned = items.len(),
            "rank query served"
        );

        Ok(RankedPage {
            items,
            total_count,
            page: validated.page,
            per_page: validated.per_page,
        })
    }

    /// Scores and ranks every member of a cluster in one pass, in memory.
    /// Unlike the paged query, stocks without any matching factor rows are
    /// kept with a score of zero.
    pub async fn rank_cluster_in_memory(
        &self,
        cluster: i64,
        numerical_weights: &[WeightEntry],
        rating_weights: &[WeightEntry],
    ) -> Result<Vec<ClusterRanking>, RankingError> {
        if cluster < 0 {
            return Err(RankingError::InvalidCluster(cluster));
        }
        let stocks = self.repo.stocks_by_cluster(cluster).await?;

        let numeric_map = scoring::weight_map(numerical_weights);
        let rating_map = scoring::weight_map(rating_weights);

        let numeric = scoring::aggregate(
            stocks.iter().flat_map(|s| {
                s.numerical_indicators
                    .iter()
                    .map(move |i| (s.id, i.name.as_str(), i.norm_value))
            }),
            &numeric_map,
        );
        let rating = scoring::aggregate(
            stocks.iter().flat_map(|s| {
                s.rating_sentiments
                    .iter()
                    .map(move |r| (s.id, r.name.as_str(), r.norm_rating_score))
            }),
            &rating_map,
        );
        let combined = scoring::combine(numeric, rating);

        let mut ranked: Vec<ClusterRanking> = stocks
            .into_iter()
            .map(|stock| {
                let score = combined.get(&stock.id).copied().unwrap_or(0.0);
                ClusterRanking { stock, score }
            })
            .collect();
        ranked.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        Ok(ranked)
    }

    pub async fn stock_by_ticker(
        &self,
        ticker: &str,
    ) -> Result<Option<StockDataPoint>, RankingError> {
        self.repo.stock_by_ticker(ticker).await
    }

    pub async fn stock_by_id(&self, id: i64) -> Result<Option<StockDataPoint>, RankingError> {
        self.repo.stock_by_id(id).await
    }

    pub async fn stocks_by_cluster(
        &self,
        cluster: i64,
    ) -> Result<Vec<StockDataPoint>, RankingError> {
        if cluster < 0 {
            return Err(RankingError::InvalidCluster(cluster));
        }
        self.repo.stocks_by_cluster(cluster).await
    }

    pub async fn unique_clusters(&self) -> Result<Vec<i64>, RankingError> {
        self.repo.unique_clusters().await
    }

    pub async fn unique_actions(&self) -> Result<Vec<String>, RankingError> {
        self.repo.unique_actions().await
    }

    pub async fn unique_companies(&self) -> Result<Vec<String>, RankingError> {
        self.repo.unique_companies().await
    }

    pub async fn unique_tickers(&self) -> Result<Vec<String>, RankingError> {
        self.repo.unique_tickers().await
    }

    /// Distinct values of one grouping column within a cluster. The column
    /// goes through the narrow grouping whitelist before the store sees it.
    pub async fn unique_grouping_values(
        &self,
        cluster: i64,
        column: &str,
    ) -> Result<Vec<String>, RankingError> {
        if cluster < 0 {
            return Err(RankingError::InvalidCluster(cluster));
        }
        let canonical = canonicalize(column, GROUPING_COLUMNS)
            .ok_or_else(|| RankingError::InvalidGroupingColumn(column.to_string()))?;
        self.repo.unique_grouping_values(cluster, canonical).await
    }

    pub async fn database_stats(&self) -> Result<DatabaseStats, RankingError> {
        self.repo.database_stats().await
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;
    use chrono::NaiveDate;
    use ranking_core::{NumericalIndicator, RatingSentiment, ValidatedQuery};

    use super::*;

    fn stock(id: i64, ticker: &str) -> StockDataPoint {
        StockDataPoint {
            id,
            ticker: ticker.to_string(),
            action: "upgrade".to_string(),
            date: NaiveDate::from_ymd_opt(2024, 1, 2).unwrap(),
            company: format!("{ticker} Inc"),
            cluster: 0,
            target_to: 0.0,
            target_from: 0.0,
            target_delta: 0.0,
            last_close: 0.0,
            rating_to: "Buy".to_string(),
            rating_from: "Hold".to_string(),
            final_score: 0.5,
            weighted_score: None,
            rating_sentiments: Vec::new(),
            numerical_indicators: Vec::new(),
        }
    }

    fn indicator(stock_id: i64, name: &str, norm: f64) -> NumericalIndicator {
        NumericalIndicator {
            id: 0,
            stock_data_point_id: stock_id,
            name: name.to_string(),
            value: norm * 100.0,
            norm_value: norm,
        }
    }

    fn sentiment(stock_id: i64, name: &str, norm: f64) -> RatingSentiment {
        RatingSentiment {
            id: 0,
            stock_data_point_id: stock_id,
            name: name.to_string(),
            rating: "Buy".to_string(),
            rating_score: norm * 10.0,
            norm_rating_score: norm,
        }
    }

    fn entries(pairs: &[(&str, f64)]) -> Vec<WeightEntry> {
        pairs
            .iter()
            .map(|(n, w)| WeightEntry {
                indicator_name: n.to_string(),
                weight: *w,
            })
            .collect()
    }

    /// Canned repository recording how often the page pipeline runs.
    struct FakeRepo {
        stocks: Vec<StockDataPoint>,
        page_calls: AtomicUsize,
    }

    impl FakeRepo {
        fn with_stocks(stocks: Vec<StockDataPoint>) -> Self {
            Self {
                stocks,
                page_calls: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl StockRepository for FakeRepo {
        async fn fetch_ranked_page(
            &self,
            query: &ValidatedQuery,
        ) -> Result<(Vec<StockDataPoint>, i64), RankingError> {
            self.page_calls.fetch_add(1, Ordering::SeqCst);
            let total = self.stocks.len() as i64;
            let page = self
                .stocks
                .iter()
                .skip(query.offset() as usize)
                .take(query.per_page as usize)
                .cloned()
                .collect();
            Ok((page, total))
        }

        async fn stocks_by_cluster(
            &self,
            _cluster: i64,
        ) -> Result<Vec<StockDataPoint>, RankingError> {
            Ok(self.stocks.clone())
        }

        async fn stock_by_ticker(
            &self,
            ticker: &str,
        ) -> Result<Option<StockDataPoint>, RankingError> {
            Ok(self.stocks.iter().find(|s| s.ticker == ticker).cloned())
        }

        async fn stock_by_id(&self, id: i64) -> Result<Option<StockDataPoint>, RankingError> {
            Ok(self.stocks.iter().find(|s| s.id == id).cloned())
        }

        async fn unique_clusters(&self) -> Result<Vec<i64>, RankingError> {
            Ok(vec![0])
        }

        async fn unique_actions(&self) -> Result<Vec<String>, RankingError> {
            Ok(vec!["upgrade".to_string()])
        }

        async fn unique_companies(&self) -> Result<Vec<String>, RankingError> {
            Ok(Vec::new())
        }

        async fn unique_tickers(&self) -> Result<Vec<String>, RankingError> {
            Ok(Vec::new())
        }

        async fn unique_grouping_values(
            &self,
            _cluster: i64,
            column: &'static str,
        ) -> Result<Vec<String>, RankingError> {
            Ok(vec![column.to_string()])
        }

        async fn database_stats(&self) -> Result<DatabaseStats, RankingError> {
            Ok(DatabaseStats {
                total_records: self.stocks.len() as i64,
                unique_tickers: self.stocks.len() as i64,
                unique_companies: 0,
            })
        }
    }

    #[tokio::test]
    async fn rank_fails_fast_before_touching_the_repository() {
        let repo = FakeRepo::with_stocks(vec![stock(1, "AAPL")]);
        let service = StockRankingService::new(repo);

        let mut query = RankQuery::for_cluster(0);
        query.sort_by = "not_a_column".into();
        assert!(matches!(
            service.rank(&query).await,
            Err(RankingError::InvalidSortColumn(_))
        ));
        assert_eq!(service.repo.page_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn rank_echoes_clamped_pagination() {
        let repo = FakeRepo::with_stocks(vec![stock(1, "AAPL"), stock(2, "MSFT")]);
        let service = StockRankingService::new(repo);

        let mut query = RankQuery::for_cluster(0);
        query.page = 0;
        query.per_page = -1;
        let page = service.rank(&query).await.unwrap();
        assert_eq!(page.page, 1);
        assert_eq!(page.per_page, 20);
        assert_eq!(page.total_count, 2);
        assert!(page.items.len() <= page.per_page as usize);
    }

    #[tokio::test]
    async fn in_memory_ranking_sorts_desc_and_keeps_unmatched_stocks() {
        let mut a = stock(1, "AAPL");
        a.numerical_indicators = vec![indicator(1, "atr", 0.8), indicator(1, "obv", 0.5)];
        a.rating_sentiments = vec![sentiment(1, "action", 0.6)];
        let mut b = stock(2, "MSFT");
        b.numerical_indicators = vec![indicator(2, "atr", 0.2)];
        let c = stock(3, "TSLA"); // no factor rows at all

        let service = StockRankingService::new(FakeRepo::with_stocks(vec![a, b, c]));
        let ranked = service
            .rank_cluster_in_memory(0, &entries(&[("atr", 0.5)]), &entries(&[("action", 1.0)]))
            .await
            .unwrap();

        assert_eq!(ranked.len(), 3);
        assert_eq!(ranked[0].stock.ticker, "AAPL");
        assert!((ranked[0].score - (0.5 * 0.8 + 0.6)).abs() < 1e-12);
        assert_eq!(ranked[1].stock.ticker, "MSFT");
        assert!((ranked[1].score - 0.1).abs() < 1e-12);
        // Zero factor rows: kept in the in-memory ranking with score 0.
        assert_eq!(ranked[2].stock.ticker, "TSLA");
        assert_eq!(ranked[2].score, 0.0);
    }

    #[tokio::test]
    async fn grouping_value_lookup_enforces_the_narrow_whitelist() {
        let service = StockRankingService::new(FakeRepo::with_stocks(vec![]));
        assert!(matches!(
            service.unique_grouping_values(0, "company").await,
            Err(RankingError::InvalidGroupingColumn(_))
        ));
        assert_eq!(
            service.unique_grouping_values(0, " Action ").await.unwrap(),
            vec!["action"]
        );
        assert!(matches!(
            service.unique_grouping_values(-2, "action").await,
            Err(RankingError::InvalidCluster(-2))
        ));
    }

    #[tokio::test]
    async fn negative_cluster_is_rejected_by_the_in_memory_path() {
        let service = StockRankingService::new(FakeRepo::with_stocks(vec![]));
        assert!(matches!(
            service.rank_cluster_in_memory(-1, &[], &[]).await,
            Err(RankingError::InvalidCluster(-1))
        ));
    }
}
