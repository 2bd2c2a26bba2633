//! Column whitelists for caller-controlled identifiers.
//!
//! Every sort or grouping column name coming from a request is matched
//! against one of these fixed enumerations and replaced by the canonical
//! `&'static str` before it can influence query shape. Nothing downstream
//! ever formats a raw caller string into SQL.

/// Columns a caller may sort or filter by.
pub const SORTABLE_COLUMNS: &[&str] = &[
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
    "weighted_score",
];

/// Columns a caller may group by. Deliberately narrow: `company` and `date`
/// are excluded because their cardinality would defeat grouping.
pub const GROUPING_COLUMNS: &[&str] = &["action", "rating_to", "rating_from"];

/// The request-scoped composite score pseudo-column.
pub const WEIGHTED_SCORE_COLUMN: &str = "weighted_score";

/// Matches `name` against `allowed` case-insensitively after trimming
/// whitespace, returning the canonical entry on success.
pub fn canonicalize(name: &str, allowed: &[&'static str]) -> Option<&'static str> {
    let name = name.trim();
    allowed
        .iter()
        .find(|col| col.eq_ignore_ascii_case(name))
        .copied()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exact_match_passes() {
        assert_eq!(canonicalize("ticker", SORTABLE_COLUMNS), Some("ticker"));
        assert_eq!(canonicalize("action", GROUPING_COLUMNS), Some("action"));
    }

    #[test]
    fn case_and_whitespace_are_normalized() {
        assert_eq!(canonicalize("  Final_Score ", SORTABLE_COLUMNS), Some("final_score"));
        assert_eq!(canonicalize("RATING_TO", GROUPING_COLUMNS), Some("rating_to"));
    }

    #[test]
    fn unknown_names_are_rejected() {
        assert_eq!(canonicalize("id; DROP TABLE stocks", SORTABLE_COLUMNS), None);
        assert_eq!(canonicalize("", SORTABLE_COLUMNS), None);
    }

    #[test]
    fn grouping_whitelist_excludes_high_cardinality_columns() {
        assert_eq!(canonicalize("company", GROUPING_COLUMNS), None);
        assert_eq!(canonicalize("date", GROUPING_COLUMNS), None);
        // Both are still perfectly sortable.
        assert_eq!(canonicalize("company", SORTABLE_COLUMNS), Some("company"));
    }
}
