//! Descriptive statistics over numeric series.
//!
//! All functions take plain `f64` slices and never mutate their input.
//! NaN values are not expected; callers filter nulls before getting here.

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

/// Count, median and mean of a series.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Summary {
    pub count: usize,
    pub median: f64,
    pub mean: f64,
}

impl Summary {
    /// Summarize a series; `None` when it is empty.
    pub fn of(values: &[f64]) -> Option<Self> {
        Some(Self {
            count: values.len(),
            median: median(values)?,
            mean: mean(values)?,
        })
    }
}

fn sorted(values: &[f64]) -> Vec<f64> {
    let mut v = values.to_vec();
    v.sort_by(|a, b| a.partial_cmp(b).unwrap_or(Ordering::Equal));
    v
}

pub fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    Some(values.iter().sum::<f64>() / values.len() as f64)
}

/// Median; the average of the middle pair for even-length series.
pub fn median(values: &[f64]) -> Option<f64> {
    quantile(values, 0.5)
}

/// Quantile with linear interpolation between closest ranks.
pub fn quantile(values: &[f64], q: f64) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    let v = sorted(values);
    Some(quantile_sorted(&v, q))
}

fn quantile_sorted(sorted: &[f64], q: f64) -> f64 {
    let pos = q.clamp(0.0, 1.0) * (sorted.len() - 1) as f64;
    let lo = pos.floor() as usize;
    let hi = pos.ceil() as usize;
    let frac = pos - lo as f64;
    sorted[lo] + (sorted[hi] - sorted[lo]) * frac
}

/// Sample standard deviation (n - 1 denominator).
pub fn std_dev(values: &[f64]) -> Option<f64> {
    if values.len() < 2 {
        return None;
    }
    let m = mean(values)?;
    let var = values.iter().map(|x| (x - m).powi(2)).sum::<f64>() / (values.len() - 1) as f64;
    Some(var.sqrt())
}

/// Five-number summary used by box plots.
#[derive(Debug, Clone, PartialEq)]
pub struct BoxStats {
    pub q1: f64,
    pub median: f64,
    pub q3: f64,
    /// Lowest datum within `q1 - 1.5 * IQR`.
    pub whisker_low: f64,
    /// Highest datum within `q3 + 1.5 * IQR`.
    pub whisker_high: f64,
    pub outliers: Vec<f64>,
}

impl BoxStats {
    pub fn of(values: &[f64]) -> Option<Self> {
        if values.is_empty() {
            return None;
        }
        let v = sorted(values);
        let q1 = quantile_sorted(&v, 0.25);
        let median = quantile_sorted(&v, 0.5);
        let q3 = quantile_sorted(&v, 0.75);
        let iqr = q3 - q1;
        let low_fence = q1 - 1.5 * iqr;
        let high_fence = q3 + 1.5 * iqr;

        let whisker_low = v.iter().copied().find(|x| *x >= low_fence).unwrap_or(q1);
        let whisker_high = v
            .iter()
            .rev()
            .copied()
            .find(|x| *x <= high_fence)
            .unwrap_or(q3);
        let outliers = v
            .iter()
            .copied()
            .filter(|x| *x < whisker_low || *x > whisker_high)
            .collect();

        Some(Self {
            q1,
            median,
            q3,
            whisker_low,
            whisker_high,
            outliers,
        })
    }
}

/// Equal-width histogram.
#[derive(Debug, Clone, PartialEq)]
pub struct Histogram {
    /// `bins + 1` ascending edges.
    pub edges: Vec<f64>,
    pub counts: Vec<usize>,
}

impl Histogram {
    /// Bin `values` into `bins` equal-width bins spanning `range`.
    ///
    /// The last bin is closed on the right; values outside `range` are
    /// ignored. A degenerate range is widened by 0.5 on each side.
    pub fn with_range(values: &[f64], bins: usize, range: (f64, f64)) -> Self {
        let bins = bins.max(1);
        let (mut lo, mut hi) = range;
        if hi <= lo {
            lo -= 0.5;
            hi += 0.5;
        }
        let width = (hi - lo) / bins as f64;
        let edges: Vec<f64> = (0..=bins).map(|i| lo + width * i as f64).collect();
        let mut counts = vec![0usize; bins];

        for &x in values {
            if x < lo || x > hi {
                continue;
            }
            let idx = (((x - lo) / width) as usize).min(bins - 1);
            counts[idx] += 1;
        }

        Self { edges, counts }
    }

    pub fn max_count(&self) -> usize {
        self.counts.iter().copied().max().unwrap_or(0)
    }

    /// `(left, right, count)` per bin.
    pub fn bins(&self) -> impl Iterator<Item = (f64, f64, usize)> + '_ {
        self.edges
            .windows(2)
            .zip(self.counts.iter())
            .map(|(w, c)| (w[0], w[1], *c))
    }
}

pub fn min_max(values: &[f64]) -> Option<(f64, f64)> {
    let mut iter = values.iter().copied();
    let first = iter.next()?;
    Some(iter.fold((first, first), |(lo, hi), x| (lo.min(x), hi.max(x))))
}

/// Gaussian kernel density estimate with Scott's bandwidth.
#[derive(Debug, Clone, PartialEq)]
pub struct Density {
    /// `(value, density)` samples, ascending by value.
    pub points: Vec<(f64, f64)>,
}

impl Density {
    /// Evaluate the KDE at `samples` evenly spaced points from min to max.
    pub fn estimate(values: &[f64], samples: usize) -> Option<Self> {
        let (lo, hi) = min_max(values)?;
        let n = values.len() as f64;
        let sd = std_dev(values).unwrap_or(0.0);
        // Scott's factor for one dimension.
        let bandwidth = sd * n.powf(-0.2);

        let samples = samples.max(2);
        let points = (0..samples)
            .map(|i| {
                let x = if hi > lo {
                    lo + (hi - lo) * i as f64 / (samples - 1) as f64
                } else {
                    lo
                };
                (x, kde_at(values, x, bandwidth))
            })
            .collect();

        Some(Self { points })
    }

    pub fn max_density(&self) -> f64 {
        self.points.iter().map(|(_, d)| *d).fold(0.0, f64::max)
    }
}

fn kde_at(values: &[f64], x: f64, bandwidth: f64) -> f64 {
    if bandwidth <= 0.0 {
        // Constant series: a unit spike at the single value.
        return 1.0;
    }
    let norm = 1.0 / ((2.0 * std::f64::consts::PI).sqrt() * bandwidth * values.len() as f64);
    values
        .iter()
        .map(|v| {
            let z = (x - v) / bandwidth;
            (-0.5 * z * z).exp()
        })
        .sum::<f64>()
        * norm
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_median_and_mean() {
        let files_changed = [2.0, 5.0, 5.0];
        let summary = Summary::of(&files_changed).unwrap();
        assert_eq!(summary.count, 3);
        assert_eq!(summary.median, 5.0);
        assert_eq!(summary.mean, 4.0);
        assert_eq!(format!("{:.1}", summary.mean), "4.0");
    }

    #[test]
    fn test_even_median() {
        assert_eq!(median(&[10.0, 0.0, 1000.0, 20.0]), Some(15.0));
        assert_eq!(mean(&[10.0, 0.0, 1000.0, 20.0]), Some(257.5));
    }

    #[test]
    fn test_empty_series() {
        assert!(Summary::of(&[]).is_none());
        assert!(BoxStats::of(&[]).is_none());
        assert!(Density::estimate(&[], 10).is_none());
    }

    #[test]
    fn test_quantile_interpolates() {
        let v = [1.0, 2.0, 3.0, 4.0];
        assert_eq!(quantile(&v, 0.25), Some(1.75));
        assert_eq!(quantile(&v, 0.75), Some(3.25));
        assert_eq!(quantile(&v, 0.0), Some(1.0));
        assert_eq!(quantile(&v, 1.0), Some(4.0));
    }

    #[test]
    fn test_box_stats_outliers() {
        let v = [1.0, 2.0, 2.0, 3.0, 3.0, 4.0, 100.0];
        let stats = BoxStats::of(&v).unwrap();
        assert_eq!(stats.median, 3.0);
        assert_eq!(stats.whisker_low, 1.0);
        assert_eq!(stats.whisker_high, 4.0);
        assert_eq!(stats.outliers, vec![100.0]);
    }

    #[test]
    fn test_histogram_counts() {
        let hist = Histogram::with_range(&[0.0, 1.0, 2.0, 3.0, 4.0], 4, (0.0, 4.0));
        assert_eq!(hist.counts, vec![1, 1, 1, 2]);
        assert_eq!(hist.edges.len(), 5);
        assert_eq!(hist.max_count(), 2);
    }

    #[test]
    fn test_histogram_degenerate_range() {
        let hist = Histogram::with_range(&[3.0, 3.0], 10, (3.0, 3.0));
        assert_eq!(hist.counts.iter().sum::<usize>(), 2);
        assert_eq!(hist.edges[0], 2.5);
        assert_eq!(hist.edges[10], 3.5);
    }

    #[test]
    fn test_density_peaks_near_mode() {
        let v = [1.0, 2.0, 2.0, 2.0, 3.0];
        let density = Density::estimate(&v, 21).unwrap();
        let (peak_x, _) = density
            .points
            .iter()
            .copied()
            .fold((0.0, f64::MIN), |best, p| if p.1 > best.1 { p } else { best });
        assert!((peak_x - 2.0).abs() < 0.2);
        assert_eq!(density.points.first().map(|p| p.0), Some(1.0));
        assert_eq!(density.points.last().map(|p| p.0), Some(3.0));
    }
}
