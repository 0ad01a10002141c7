//! Composite risk score computation.
//!
//! risk_index(t) = Σ(w_i × v_i) / Σ(w_i)   over the valid weighted columns
//!
//! A weighted mean rather than a weighted sum, so scores stay on the scale
//! of the inputs whatever the number of selected fields. How a null `v_i`
//! enters the mean is decided by [`MissingValuePolicy`].

use tractrisk_common::{FieldValue, MissingValuePolicy, Result, TractRiskError};

/// A weighted column resolved against the output table.
#[derive(Debug, Clone, PartialEq)]
pub struct WeightedColumn {
    pub name: String,
    pub index: usize,
    pub weight: f64,
}

/// Score one row.
///
/// Returns `Ok(None)` when the row has no usable data under `policy`; a
/// row where every weighted value is null never scores, under any policy.
/// Fails only on a text value in a weighted column that does not read as
/// a number. Weights are scaled by the largest one before summing, so
/// huge finite weights cannot overflow the denominator.
pub fn composite_score(
    tract_id: &str,
    values: &[FieldValue],
    columns: &[WeightedColumn],
    policy: MissingValuePolicy,
) -> Result<Option<f64>> {
    let scale = columns.iter().map(|c| c.weight).fold(0.0, f64::max);
    if !scale.is_finite() || scale <= 0.0 {
        return Ok(None);
    }

    let mut weighted_sum = 0.0;
    let mut total_weight = 0.0;
    let mut present_weight = 0.0;
    let mut present = 0usize;

    for col in columns {
        let weight = col.weight / scale;
        total_weight += weight;
        let cell = values.get(col.index).unwrap_or(&FieldValue::Null);
        if cell.is_null() {
            continue;
        }
        let Some(v) = cell.to_number() else {
            return Err(TractRiskError::NonNumericValue {
                field: col.name.clone(),
                tract_id: tract_id.to_string(),
                value: cell.to_string(),
            });
        };
        weighted_sum += v * weight;
        present_weight += weight;
        present += 1;
    }

    if present == 0 {
        return Ok(None);
    }

    let denominator = match policy {
        MissingValuePolicy::ZeroFill => total_weight,
        MissingValuePolicy::Propagate if present < columns.len() => return Ok(None),
        MissingValuePolicy::Propagate => total_weight,
        MissingValuePolicy::Renormalise => present_weight,
    };

    if denominator <= 0.0 {
        return Ok(None);
    }
    let score = weighted_sum / denominator;
    Ok(score.is_finite().then_some(score))
}
