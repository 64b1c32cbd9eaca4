/// Computes the arithmetic mean of the defined values. Returns `None` when no
/// value is defined.
pub fn mean(values: &[Option<f64>]) -> Option<f64> {
    let defined = finite_values(values);
    if defined.is_empty() {
        return None;
    }
    Some(defined.iter().sum::<f64>() / defined.len() as f64)
}

/// Computes the sample standard deviation (n - 1 denominator) of the defined
/// values around a pre-computed mean. Returns `None` for fewer than two values.
pub fn sample_stddev(values: &[Option<f64>], mean: f64) -> Option<f64> {
    let defined = finite_values(values);
    if defined.len() < 2 {
        return None;
    }
    let variance =
        defined.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / (defined.len() - 1) as f64;

    Some(variance.sqrt())
}

/// Standard error of the mean: sample stddev / sqrt(count).
pub fn standard_error(values: &[Option<f64>]) -> Option<f64> {
    let count = count_defined(values);
    let avg = mean(values)?;
    let sd = sample_stddev(values, avg)?;
    Some(sd / (count as f64).sqrt())
}

pub fn count_defined(values: &[Option<f64>]) -> usize {
    values.iter().filter(|v| v.is_some_and(f64::is_finite)).count()
}

fn finite_values(values: &[Option<f64>]) -> Vec<f64> {
    values
        .iter()
        .filter_map(|v| *v)
        .filter(|v| v.is_finite())
        .collect()
}
