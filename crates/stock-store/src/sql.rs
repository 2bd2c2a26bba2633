//! Weighted-score SQL fragments.
//!
//! Weights arrive as an open set of factor names, so the per-family partial
//! score is a grouped conditional sum built per request:
//!
//! ```sql
//! SELECT ni.stock_data_point_id,
//!        COALESCE(SUM(CASE WHEN ni.name = 'atr' THEN ni.norm_value * 0.500000
//!                          ... ELSE 0 END), 0) AS indicator_score
//! FROM numerical_indicators ni
//! GROUP BY ni.stock_data_point_id
//! ```
//!
//! Factor names are escaped string literals; weights are formatted numbers.
//! Column and table names in these fragments are compile-time constants —
//! caller-controlled identifiers never reach this module.

use std::fmt::Write;

use ranking_core::WeightEntry;

const INDICATOR_TABLE: &str = "numerical_indicators";
const SENTIMENT_TABLE: &str = "rating_sentiments";

/// Doubles single quotes for use inside a SQL string literal.
fn escape_string(s: &str) -> String {
    s.replace('\'', "''")
}

/// Grouped conditional-sum subquery for one factor family. Groups the whole
/// factor table by entity id unconditionally, so any entity with at least
/// one row in the family produces an output row (score >= 0) even when no
/// row name matches a weight. Returns `None` for an empty weight map.
fn factor_score_subquery(
    table: &str,
    table_alias: &str,
    value_column: &str,
    score_alias: &str,
    weights: &[WeightEntry],
) -> Option<String> {
    if weights.is_empty() {
        return None;
    }

    let mut case_expr = String::from("COALESCE(SUM(CASE");
    for entry in weights {
        let _ = write!(
            case_expr,
            " WHEN {a}.name = '{name}' THEN {a}.{col} * {weight:.6}",
            a = table_alias,
            name = escape_string(&entry.indicator_name),
            col = value_column,
            weight = entry.weight,
        );
    }
    let _ = write!(case_expr, " ELSE 0 END), 0) AS {score_alias}");

    Some(format!(
        "(SELECT {a}.stock_data_point_id, {case_expr} \
         FROM {table} {a} GROUP BY {a}.stock_data_point_id)",
        a = table_alias,
    ))
}

/// Combined per-entity weighted score across both families. With both
/// families weighted this is a full outer join defaulting a missing side to
/// zero; with one family it degenerates to that family's subquery. `None`
/// when neither family carries weights (the caller skips scoring entirely).
pub fn weighted_score_subquery(
    numerical_weights: &[WeightEntry],
    rating_weights: &[WeightEntry],
) -> Option<String> {
    let indicator = factor_score_subquery(
        INDICATOR_TABLE,
        "ni",
        "norm_value",
        "indicator_score",
        numerical_weights,
    );
    let rating = factor_score_subquery(
        SENTIMENT_TABLE,
        "rs",
        "norm_rating_score",
        "rating_score",
        rating_weights,
    );

    match (indicator, rating) {
        (Some(ind), Some(rat)) => Some(format!(
            "(SELECT COALESCE(i.stock_data_point_id, r.stock_data_point_id) AS stock_data_point_id, \
             COALESCE(i.indicator_score, 0) + COALESCE(r.rating_score, 0) AS weighted_score \
             FROM {ind} i FULL OUTER JOIN {rat} r \
             ON i.stock_data_point_id = r.stock_data_point_id)"
        )),
        (Some(ind), None) => Some(format!(
            "(SELECT i.stock_data_point_id, i.indicator_score AS weighted_score FROM {ind} i)"
        )),
        (None, Some(rat)) => Some(format!(
            "(SELECT r.stock_data_point_id, r.rating_score AS weighted_score FROM {rat} r)"
        )),
        (None, None) => None,
    }
}
