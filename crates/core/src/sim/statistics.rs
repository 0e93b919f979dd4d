//! Sample statistics driving the Monte-Carlo stopping rule.
//!
//! Confidence uses a one-sided Student's-T criterion on the relative error
//! of the mean. Note the stopping rule upstream applies this to fire-size
//! distributions that can be heavy-tailed; the three-statistic combination
//! is a hedge, not a guarantee.

use crate::util::binary_find_checked;

/// Student's T critical values for n = 1..=100 degrees of freedom.
const T_VALUES: [f64; 100] = [
    3.078, 1.886, 1.638, 1.533, 1.476, 1.440, 1.415, 1.397, 1.383, 1.372, 1.363, 1.356, 1.350,
    1.345, 1.341, 1.337, 1.333, 1.330, 1.328, 1.325, 1.323, 1.321, 1.319, 1.318, 1.316, 1.315,
    1.314, 1.313, 1.311, 1.310, 1.309, 1.309, 1.308, 1.307, 1.306, 1.306, 1.305, 1.304, 1.304,
    1.303, 1.303, 1.302, 1.302, 1.301, 1.301, 1.300, 1.300, 1.299, 1.299, 1.299, 1.298, 1.298,
    1.298, 1.297, 1.297, 1.297, 1.297, 1.296, 1.296, 1.296, 1.296, 1.295, 1.295, 1.295, 1.295,
    1.295, 1.294, 1.294, 1.294, 1.294, 1.294, 1.293, 1.293, 1.293, 1.293, 1.293, 1.293, 1.292,
    1.292, 1.292, 1.292, 1.292, 1.292, 1.292, 1.292, 1.291, 1.291, 1.291, 1.291, 1.291, 1.291,
    1.291, 1.291, 1.291, 1.291, 1.290, 1.290, 1.290, 1.290, 1.290,
];

fn t_value(n: usize) -> f64 {
    T_VALUES[n.clamp(1, T_VALUES.len()) - 1]
}

/// Summary statistics over a sorted sample.
#[derive(Debug, Clone)]
pub struct Statistics {
    n: usize,
    mean: f64,
    standard_deviation: f64,
    sample_variance: f64,
    percentiles: [f64; 101],
}

impl Statistics {
    /// Compute from values; they are sorted here.
    #[must_use]
    pub fn new(mut values: Vec<f64>) -> Self {
        assert!(!values.is_empty(), "statistics need at least one value");
        values.sort_by(f64::total_cmp);
        let n = values.len();
        let mean = values.iter().sum::<f64>() / n as f64;
        let total: f64 = values.iter().map(|x| (x - mean) * (x - mean)).sum();
        let standard_deviation = (total / n as f64).sqrt();
        let sample_variance = if n > 1 { total / (n - 1) as f64 } else { 0.0 };
        let mut percentiles = [0.0; 101];
        for (i, slot) in percentiles.iter_mut().enumerate() {
            let pos = (((i as f64) / 100.0) * n as f64).trunc() as usize;
            *slot = values[pos.min(n - 1)];
        }
        Statistics {
            n,
            mean,
            standard_deviation,
            sample_variance,
            percentiles,
        }
    }

    #[inline]
    #[must_use]
    pub fn n(&self) -> usize {
        self.n
    }

    #[inline]
    #[must_use]
    pub fn mean(&self) -> f64 {
        self.mean
    }

    #[inline]
    #[must_use]
    pub fn min(&self) -> f64 {
        self.percentiles[0]
    }

    #[inline]
    #[must_use]
    pub fn max(&self) -> f64 {
        self.percentiles[100]
    }

    #[inline]
    #[must_use]
    pub fn median(&self) -> f64 {
        self.percentiles[50]
    }

    #[inline]
    #[must_use]
    pub fn standard_deviation(&self) -> f64 {
        self.standard_deviation
    }

    #[inline]
    #[must_use]
    pub fn sample_variance(&self) -> f64 {
        self.sample_variance
    }

    #[must_use]
    pub fn percentile(&self, i: u8) -> f64 {
        self.percentiles[usize::from(i).min(100)]
    }

    /// Relative half-width of the mean's confidence interval.
    ///
    /// A single observation carries no variance information, so it is
    /// never confident.
    #[must_use]
    pub fn students_t(&self) -> f64 {
        if self.n < 2 || self.mean == 0.0 {
            return f64::INFINITY;
        }
        t_value(self.n) * (self.sample_variance / self.n as f64).sqrt() / self.mean.abs()
    }

    /// Whether the sample is within the requested relative error.
    #[must_use]
    pub fn is_confident(&self, relative_error: f64) -> bool {
        let re = relative_error / (1.0 + relative_error);
        self.students_t() <= re
    }

    /// Estimate how many further runs reach the requested relative error,
    /// assuming the variance estimate holds.
    #[must_use]
    pub fn runs_required(&self, relative_error: f64) -> usize {
        let re = relative_error / (1.0 + relative_error);
        if self.mean == 0.0 {
            return 0;
        }
        let variance = self.sample_variance;
        let mean = self.mean.abs();
        let projected = |i: usize| t_value(i) * (variance / i as f64).sqrt() / mean;
        binary_find_checked(self.n, 10 * self.n, re, projected) - self.n
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn summary_values() {
        let stats = Statistics::new(vec![4.0, 1.0, 3.0, 2.0, 5.0]);
        assert_eq!(stats.n(), 5);
        assert!((stats.mean() - 3.0).abs() < 1e-9);
        assert_eq!(stats.min(), 1.0);
        assert_eq!(stats.max(), 5.0);
        assert_eq!(stats.median(), 3.0);
    }

    #[test]
    fn tight_samples_are_confident() {
        let tight = Statistics::new(vec![100.0; 50]);
        assert!(tight.is_confident(0.05));
        let loose = Statistics::new(vec![1.0, 200.0, 3.0, 150.0, 90.0]);
        assert!(!loose.is_confident(0.05));
    }

    #[test]
    fn confidence_is_monotone_in_relative_error() {
        let stats = Statistics::new(vec![90.0, 100.0, 110.0, 95.0, 105.0, 98.0, 102.0]);
        let mut was_confident = false;
        for re in [0.001, 0.01, 0.05, 0.1, 0.5, 1.0] {
            let now = stats.is_confident(re);
            // once confident at some error, stays confident at larger ones
            assert!(now || !was_confident, "lost confidence at {re}");
            was_confident = now;
        }
        assert!(was_confident, "never confident even at 100% error");
    }

    #[test]
    fn runs_required_drops_to_zero_when_confident() {
        let tight = Statistics::new(vec![100.0; 40]);
        assert_eq!(tight.runs_required(0.1), 0);
        let loose = Statistics::new(vec![10.0, 500.0, 30.0, 250.0]);
        assert!(loose.runs_required(0.05) > 0);
    }

    #[test]
    fn variance_uses_n_minus_one() {
        let stats = Statistics::new(vec![1.0, 3.0]);
        // mean 2, squared deviations 1 + 1 = 2, sample variance 2/(2-1)
        assert!((stats.sample_variance() - 2.0).abs() < 1e-9);
    }
}
