//! Descriptive statistics shared by the analyzers.
//!
//! Empty or too-short inputs return `0.0` instead of NaN so that callers can
//! treat "no data" as an explicit neutral reading.

use statrs::statistics::Statistics;

pub fn mean(data: &[f64]) -> f64 {
    if data.is_empty() {
        return 0.0;
    }
    data.mean()
}

/// Sample standard deviation (n - 1 denominator).
pub fn std_dev(data: &[f64]) -> f64 {
    if data.len() < 2 {
        return 0.0;
    }
    data.std_dev()
}

/// Population standard deviation (n denominator).
pub fn population_std_dev(data: &[f64]) -> f64 {
    if data.is_empty() {
        return 0.0;
    }
    data.population_std_dev()
}

pub fn median(data: &[f64]) -> f64 {
    percentile(data, 50.0)
}

/// Percentile on a 0-100 scale, linearly interpolated between the closest
/// ranks of the sorted data.
pub fn percentile(data: &[f64], pct: f64) -> f64 {
    if data.is_empty() {
        return 0.0;
    }
    let mut sorted: Vec<f64> = data.to_vec();
    sorted.sort_by(|a, b| a.total_cmp(b));

    let rank = (pct.clamp(0.0, 100.0) / 100.0) * (sorted.len() - 1) as f64;
    let lo = rank.floor() as usize;
    let hi = rank.ceil() as usize;
    sorted[lo] + (sorted[hi] - sorted[lo]) * (rank - lo as f64)
}

/// Pearson correlation of two equally long series.
/// Returns `None` when fewer than two points exist or either side has no variance.
pub fn correlation(xs: &[f64], ys: &[f64]) -> Option<f64> {
    if xs.len() != ys.len() || xs.len() < 2 {
        return None;
    }
    let mx = mean(xs);
    let my = mean(ys);

    let mut cov = 0.0;
    let mut vx = 0.0;
    let mut vy = 0.0;
    for (x, y) in xs.iter().zip(ys) {
        cov += (x - mx) * (y - my);
        vx += (x - mx).powi(2);
        vy += (y - my).powi(2);
    }

    if vx < f64::EPSILON || vy < f64::EPSILON {
        return None;
    }
    Some((cov / (vx.sqrt() * vy.sqrt())).clamp(-1.0, 1.0))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_median_odd_and_even() {
        assert!((median(&[3.0, 1.0, 2.0]) - 2.0).abs() < 1e-12);
        assert!((median(&[4.0, 1.0, 3.0, 2.0]) - 2.5).abs() < 1e-12);
        assert_eq!(median(&[]), 0.0);
    }

    #[test]
    fn test_percentile_interpolates() {
        let data: Vec<f64> = (1..=5).map(|i| i as f64).collect();
        // rank = 0.05 * 4 = 0.2 -> 1.0 + 0.2 * (2.0 - 1.0)
        assert!((percentile(&data, 5.0) - 1.2).abs() < 1e-12);
        assert!((percentile(&data, 100.0) - 5.0).abs() < 1e-12);
        assert!((percentile(&data, 0.0) - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_std_dev_variants() {
        let data = [2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0];
        assert!((population_std_dev(&data) - 2.0).abs() < 1e-12);
        assert!(std_dev(&data) > population_std_dev(&data));
        assert_eq!(std_dev(&[1.0]), 0.0);
    }

    #[test]
    fn test_correlation() {
        let xs = [1.0, 2.0, 3.0, 4.0];
        let ys = [2.0, 4.0, 6.0, 8.0];
        let inverse = [8.0, 6.0, 4.0, 2.0];
        assert!((correlation(&xs, &ys).unwrap() - 1.0).abs() < 1e-12);
        assert!((correlation(&xs, &inverse).unwrap() + 1.0).abs() < 1e-12);
        assert!(correlation(&xs, &[1.0, 1.0, 1.0, 1.0]).is_none());
        assert!(correlation(&xs, &ys[..3]).is_none());
    }
}
