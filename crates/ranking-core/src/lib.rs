//! Core domain for the cluster ranking engine.
//!
//! Holds the stock/factor data model, the column whitelists every
//! caller-supplied identifier must pass through, request validation, the
//! in-process scoring primitives, and the repository seam the store
//! implements.

pub mod columns;
pub mod error;
pub mod query;
pub mod repository;
pub mod scoring;
pub mod types;

pub use columns::{canonicalize, GROUPING_COLUMNS, SORTABLE_COLUMNS, WEIGHTED_SCORE_COLUMN};
pub use error::RankingError;
pub use query::{Grouping, RankQuery, SortOrder, SortPlan, ValidatedQuery, DEFAULT_PER_PAGE};
pub use repository::StockRepository;
pub use types::{
    DatabaseStats, NumericalIndicator, RankedPage, RatingSentiment, StockDataPoint, WeightEntry,
};
