//! Rank request validation.
//!
//! A [`RankQuery`] is raw caller input. [`RankQuery::validate`] whitelists
//! every identifier, resolves the sort plan (including the composite-score
//! gating rule) and clamps pagination, producing a [`ValidatedQuery`] —
//! the only form the store accepts. Validation failures are final; nothing
//! is defaulted silently.

use serde::{Deserialize, Serialize};

use crate::columns::{canonicalize, GROUPING_COLUMNS, SORTABLE_COLUMNS, WEIGHTED_SCORE_COLUMN};
use crate::error::RankingError;
use crate::types::WeightEntry;

/// Sentinel meaning "no grouping filter".
pub const NO_GROUPING: &str = "None";

/// Page size applied when the caller sends none or a non-positive value.
pub const DEFAULT_PER_PAGE: i64 = 20;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    Asc,
    Desc,
}

impl SortOrder {
    /// Case-insensitive parse; anything other than "asc" sorts descending,
    /// matching the documented default.
    pub fn parse(raw: &str) -> Self {
        if raw.trim().eq_ignore_ascii_case("asc") {
            Self::Asc
        } else {
            Self::Desc
        }
    }

    pub fn as_sql(self) -> &'static str {
        match self {
            Self::Asc => "ASC",
            Self::Desc => "DESC",
        }
    }
}

/// A rank request as received from the transport layer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RankQuery {
    pub cluster: i64,
    #[serde(default = "default_grouping_column")]
    pub grouping_column: String,
    #[serde(default)]
    pub grouping_value: String,
    #[serde(default = "default_sort_by")]
    pub sort_by: String,
    #[serde(default = "default_order")]
    pub order: String,
    #[serde(default = "default_page")]
    pub page: i64,
    #[serde(default = "default_per_page")]
    pub per_page: i64,
    #[serde(default)]
    pub numerical_weights: Vec<WeightEntry>,
    #[serde(default)]
    pub rating_weights: Vec<WeightEntry>,
}

fn default_grouping_column() -> String {
    NO_GROUPING.to_string()
}
fn default_sort_by() -> String {
    "date".to_string()
}
fn default_order() -> String {
    "desc".to_string()
}
fn default_page() -> i64 {
    1
}
fn default_per_page() -> i64 {
    DEFAULT_PER_PAGE
}

impl RankQuery {
    /// Minimal query for a cluster with everything else defaulted.
    pub fn for_cluster(cluster: i64) -> Self {
        Self {
            cluster,
            grouping_column: default_grouping_column(),
            grouping_value: String::new(),
            sort_by: default_sort_by(),
            order: default_order(),
            page: default_page(),
            per_page: default_per_page(),
            numerical_weights: Vec::new(),
            rating_weights: Vec::new(),
        }
    }

    /// Validates all caller-controlled identifiers and resolves the sort
    /// plan. Fails fast before any query construction.
    pub fn validate(&self) -> Result<ValidatedQuery, RankingError> {
        if self.cluster < 0 {
            return Err(RankingError::InvalidCluster(self.cluster));
        }

        let grouping = if self.grouping_column == NO_GROUPING {
            None
        } else {
            let column = canonicalize(&self.grouping_column, GROUPING_COLUMNS)
                .ok_or_else(|| RankingError::InvalidGroupingColumn(self.grouping_column.clone()))?;
            if self.grouping_value.trim().is_empty() {
                return Err(RankingError::MissingGroupingValue(column.to_string()));
            }
            Some(Grouping {
                column,
                value: self.grouping_value.clone(),
            })
        };

        let sort_column = canonicalize(&self.sort_by, SORTABLE_COLUMNS)
            .ok_or_else(|| RankingError::InvalidSortColumn(self.sort_by.clone()))?;

        let has_both_weights =
            !self.numerical_weights.is_empty() && !self.rating_weights.is_empty();

        // Composite-score ordering is only honored when both weight families
        // are supplied; a weighted_score sort without them falls back to the
        // store's natural order (pagination still applies).
        let sort = if sort_column == WEIGHTED_SCORE_COLUMN {
            if has_both_weights {
                SortPlan::WeightedScore
            } else {
                SortPlan::Unsorted
            }
        } else {
            SortPlan::Plain {
                column: sort_column,
                order: SortOrder::parse(&self.order),
            }
        };

        let page = if self.page < 1 { 1 } else { self.page };
        let per_page = if self.per_page <= 0 {
            DEFAULT_PER_PAGE
        } else {
            self.per_page
        };

        Ok(ValidatedQuery {
            cluster: self.cluster,
            grouping,
            sort,
            page,
            per_page,
            numerical_weights: self.numerical_weights.clone(),
            rating_weights: self.rating_weights.clone(),
        })
    }
}

/// An equality filter on one whitelisted low-cardinality column.
#[derive(Debug, Clone, PartialEq)]
pub struct Grouping {
    pub column: &'static str,
    pub value: String,
}

/// Resolved ordering for one request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortPlan {
    /// No ORDER BY clause; store order.
    Unsorted,
    /// Order by a whitelisted plain column.
    Plain {
        column: &'static str,
        order: SortOrder,
    },
    /// Order by the composite score, always descending (best first).
    WeightedScore,
}

/// A rank request whose identifiers have all passed the whitelists.
#[derive(Debug, Clone)]
pub struct ValidatedQuery {
    pub cluster: i64,
    pub grouping: Option<Grouping>,
    pub sort: SortPlan,
    pub page: i64,
    pub per_page: i64,
    pub numerical_weights: Vec<WeightEntry>,
    pub rating_weights: Vec<WeightEntry>,
}

impl ValidatedQuery {
    pub fn offset(&self) -> i64 {
        (self.page - 1) * self.per_page
    }
}
