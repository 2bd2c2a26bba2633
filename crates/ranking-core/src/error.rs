use thiserror::Error;

use crate::columns::GROUPING_COLUMNS;

#[derive(Error, Debug)]
pub enum RankingError {
    #[error("invalid sort column: {0}")]
    InvalidSortColumn(String),

    #[error("invalid grouping column: {0}. Allowed grouping columns: {GROUPING_COLUMNS:?}")]
    InvalidGroupingColumn(String),

    #[error("grouping value is required when grouping by {0}")]
    MissingGroupingValue(String),

    #[error("invalid cluster: {0} (must be >= 0)")]
    InvalidCluster(i64),

    #[error("store error: {0}")]
    Store(String),
}

impl RankingError {
    /// Wraps an underlying data-access failure. The engine never retries
    /// these; they surface to the caller as an opaque store error.
    pub fn store(err: impl std::fmt::Display) -> Self {
        Self::Store(err.to_string())
    }

    /// True for the error classes a caller can fix by changing the request.
    pub fn is_validation(&self) -> bool {
        !matches!(self, Self::Store(_))
    }
}
