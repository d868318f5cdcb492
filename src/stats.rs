//! The statistics helpers the Summary Aggregator leans on: sampled
//! standard deviation and the interquartile range over a pre-sorted
//! sequence. Out of scope in spec.md's own terms ("assumed to exist"),
//! but they have no teacher or pack precedent worth imitating, so they're
//! implemented plainly here.

/// Mean and sample standard deviation (Bessel-corrected, `n - 1`) over a
/// sorted sequence of `u64` samples. A single sample yields `stddev = 0`.
pub fn sampled_stddev(sorted: &[u64]) -> (f64, f64) {
    if sorted.is_empty() {
        return (0.0, 0.0);
    }
    let n = sorted.len() as f64;
    let mean = sorted.iter().map(|&v| v as f64).sum::<f64>() / n;
    if sorted.len() < 2 {
        return (mean, 0.0);
    }
    let variance =
        sorted.iter().map(|&v| (v as f64 - mean).powi(2)).sum::<f64>() / (n - 1.0);
    (mean, variance.sqrt())
}

/// `(q1, median, q3)` over an already-sorted sequence, via linear
/// interpolation between the two closest ranks.
pub fn interquartile_range(sorted: &[u64]) -> (f64, f64, f64) {
    if sorted.is_empty() {
        return (0.0, 0.0, 0.0);
    }
    (percentile(sorted, 0.25), percentile(sorted, 0.5), percentile(sorted, 0.75))
}

fn percentile(sorted: &[u64], p: f64) -> f64 {
    if sorted.len() == 1 {
        return sorted[0] as f64;
    }
    let rank = p * (sorted.len() - 1) as f64;
    let lo = rank.floor() as usize;
    let hi = rank.ceil() as usize;
    if lo == hi {
        return sorted[lo] as f64;
    }
    let frac = rank - lo as f64;
    sorted[lo] as f64 + frac * (sorted[hi] as f64 - sorted[lo] as f64)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stddev_of_single_sample_is_zero() {
        let (mean, stddev) = sampled_stddev(&[42]);
        assert_eq!(mean, 42.0);
        assert_eq!(stddev, 0.0);
    }

    #[test]
    fn stddev_matches_known_value() {
        let (mean, stddev) = sampled_stddev(&[2, 4, 4, 4, 5, 5, 7, 9]);
        assert_eq!(mean, 5.0);
        assert!((stddev - 2.138_089).abs() < 1e-3);
    }

    #[test]
    fn median_of_odd_length_sequence() {
        let (_, median, _) = interquartile_range(&[1, 2, 3, 4, 5]);
        assert_eq!(median, 3.0);
    }

    #[test]
    fn empty_input_yields_zero() {
        assert_eq!(sampled_stddev(&[]), (0.0, 0.0));
        assert_eq!(interquartile_range(&[]), (0.0, 0.0, 0.0));
    }
}
