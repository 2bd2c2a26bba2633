//! In-process weighted scoring.
//!
//! The store pushes the same computation down into SQL for paged queries;
//! these functions are the in-memory equivalent used for whole-cluster
//! ranking, where the factor rows already live on the hydrated entities.
//!
//! Factor names are machine-generated, stable strings, so weight lookups
//! are exact-name.

use std::collections::HashMap;

use crate::types::WeightEntry;

/// Sparse per-entity partial scores; entities with no matching factor rows
/// are simply absent (treated as zero downstream).
pub type PartialScores = HashMap<i64, f64>;

/// Builds the name -> weight lookup for one factor family. Later entries
/// win on duplicate names.
pub fn weight_map(entries: &[WeightEntry]) -> HashMap<String, f64> {
    entries
        .iter()
        .map(|e| (e.indicator_name.clone(), e.weight))
        .collect()
}

/// Folds factor rows `(entity_id, name, normalized_value)` into one partial
/// weighted score per entity. Rows whose name carries no weight contribute
/// nothing; an empty weight map yields an empty aggregate.
pub fn aggregate<'a, I>(rows: I, weights: &HashMap<String, f64>) -> PartialScores
where
    I: IntoIterator<Item = (i64, &'a str, f64)>,
{
    let mut scores = PartialScores::new();
    if weights.is_empty() {
        return scores;
    }
    for (entity_id, name, norm_value) in rows {
        if let Some(weight) = weights.get(name) {
            *scores.entry(entity_id).or_insert(0.0) += weight * norm_value;
        }
    }
    scores
}

/// Full-outer-join merge of the two family partials, defaulting a missing
/// side to zero. A single non-empty side passes through unchanged.
pub fn combine(numeric: PartialScores, rating: PartialScores) -> PartialScores {
    if numeric.is_empty() {
        return rating;
    }
    if rating.is_empty() {
        return numeric;
    }
    let mut combined = numeric;
    for (entity_id, score) in rating {
        *combined.entry(entity_id).or_insert(0.0) += score;
    }
    combined
}
