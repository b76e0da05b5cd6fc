//! Small summary statistics over temperature/percentage columns.

/// Arithmetic mean; `None` for an empty slice.
pub fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    Some(values.iter().sum::<f64>() / values.len() as f64)
}

/// Sum of squares `Σ vᵢ²`.
pub fn sum_of_squares(values: &[f64]) -> f64 {
    values.iter().map(|v| v * v).sum()
}

/// `(min, max)` of the finite values; `None` if there are none.
pub fn finite_range(values: &[f64]) -> Option<(f64, f64)> {
    let mut it = values.iter().copied().filter(|v| v.is_finite());
    let first = it.next()?;
    Some(it.fold((first, first), |(lo, hi), v| (lo.min(v), hi.max(v))))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mean_and_sum_of_squares() {
        assert_eq!(mean(&[]), None);
        assert_eq!(mean(&[30.0, 40.0, 50.0]), Some(40.0));
        assert_eq!(sum_of_squares(&[1.0, 2.0, 3.0]), 14.0);
    }

    #[test]
    fn finite_range_skips_non_finite() {
        assert_eq!(finite_range(&[f64::NAN, 3.0, -1.0, f64::INFINITY]), Some((-1.0, 3.0)));
        assert_eq!(finite_range(&[f64::NAN]), None);
    }
}
