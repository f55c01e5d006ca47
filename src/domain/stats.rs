//! Small numeric helpers shared by signal construction, analytics and sizing.

/// Arithmetic mean; 0 for an empty slice.
pub fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

/// Population standard deviation (divides by n).
pub fn population_std(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let m = mean(values);
    let variance = values.iter().map(|v| (v - m).powi(2)).sum::<f64>() / values.len() as f64;
    variance.sqrt()
}

/// Sample standard deviation (divides by n - 1); 0 with fewer than two values.
pub fn sample_std(values: &[f64]) -> f64 {
    if values.len() < 2 {
        return 0.0;
    }
    let m = mean(values);
    let variance =
        values.iter().map(|v| (v - m).powi(2)).sum::<f64>() / (values.len() - 1) as f64;
    variance.sqrt()
}

/// Period-over-period percent change, first (undefined) entry dropped.
/// Steps that produce a non-finite value are skipped.
pub fn pct_changes(values: &[f64]) -> Vec<f64> {
    values
        .windows(2)
        .map(|w| w[1] / w[0] - 1.0)
        .filter(|r| r.is_finite())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn mean_of_empty_is_zero() {
        assert_eq!(mean(&[]), 0.0);
        assert_abs_diff_eq!(mean(&[1.0, 2.0, 3.0]), 2.0);
    }

    #[test]
    fn population_vs_sample_std() {
        let values = [2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0];
        assert_abs_diff_eq!(population_std(&values), 2.0, epsilon = 1e-12);
        assert_abs_diff_eq!(sample_std(&values), (32.0_f64 / 7.0).sqrt(), epsilon = 1e-12);
    }

    #[test]
    fn sample_std_needs_two_values() {
        assert_eq!(sample_std(&[0.1]), 0.0);
        assert_eq!(sample_std(&[]), 0.0);
    }

    #[test]
    fn pct_changes_drops_first_and_non_finite() {
        let changes = pct_changes(&[100.0, 110.0, 0.0, 50.0]);
        assert_eq!(changes.len(), 2);
        assert_abs_diff_eq!(changes[0], 0.1, epsilon = 1e-12);
        assert_abs_diff_eq!(changes[1], -1.0, epsilon = 1e-12);
    }
}
