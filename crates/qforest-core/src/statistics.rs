//! Region statistics
//!
//! [`Statistics`] aggregates the intensity values of a region as
//! `(count, sum, sum_sq)` and caches the derived mean, variance and
//! deviation. The derived values are only ever recomputed from the sums,
//! so two disjoint regions can be merged by adding their sums.

/// Intensity statistics of an image region
///
/// # Examples
///
/// ```
/// use qforest_core::Statistics;
///
/// let a = Statistics::from_sums(2.0, 100.0, 5000.0);
/// let b = Statistics::from_sums(2.0, 400.0, 80000.0);
/// let c = a.merge(&b);
/// assert_eq!(c.count(), 4.0);
/// assert_eq!(c.mean(), 125.0);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Statistics {
    count: f64,
    sum: f64,
    sum_sq: f64,
    mean: f64,
    variance: f64,
    deviation: f64,
}

impl Statistics {
    /// Build statistics from the raw sums of a region.
    ///
    /// A zero count yields all-zero derived values. The variance is
    /// clamped to zero to absorb rounding in `sum_sq / count - mean²`.
    pub fn from_sums(count: f64, sum: f64, sum_sq: f64) -> Self {
        let mut stat = Self {
            count,
            sum,
            sum_sq,
            ..Self::default()
        };
        stat.recompute();
        stat
    }

    /// Statistics of a single sample.
    pub fn single(value: f64) -> Self {
        Self::from_sums(1.0, value, value * value)
    }

    fn recompute(&mut self) {
        if self.count > 0.0 {
            self.mean = self.sum / self.count;
            self.variance = (self.sum_sq / self.count - self.mean * self.mean).max(0.0);
            self.deviation = self.variance.sqrt();
        } else {
            self.mean = 0.0;
            self.variance = 0.0;
            self.deviation = 0.0;
        }
    }

    /// Combine the statistics of two disjoint regions.
    pub fn merge(&self, other: &Statistics) -> Statistics {
        Statistics::from_sums(
            self.count + other.count,
            self.sum + other.sum,
            self.sum_sq + other.sum_sq,
        )
    }

    /// Add the statistics of a disjoint region to this one.
    pub fn merge_assign(&mut self, other: &Statistics) {
        self.count += other.count;
        self.sum += other.sum;
        self.sum_sq += other.sum_sq;
        self.recompute();
    }

    /// Number of samples
    #[inline]
    pub fn count(&self) -> f64 {
        self.count
    }

    /// Sum of samples
    #[inline]
    pub fn sum(&self) -> f64 {
        self.sum
    }

    /// Sum of squared samples
    #[inline]
    pub fn sum_sq(&self) -> f64 {
        self.sum_sq
    }

    #[inline]
    pub fn mean(&self) -> f64 {
        self.mean
    }

    #[inline]
    pub fn variance(&self) -> f64 {
        self.variance
    }

    /// Standard deviation
    #[inline]
    pub fn deviation(&self) -> f64 {
        self.deviation
    }

    /// Check if no samples have been aggregated
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.count <= 0.0
    }

    /// Intensity range `[mean - r, mean + r]` with `r = max(alpha, alpha * deviation)`,
    /// clipped to the 8-bit range.
    pub fn intensity_range(&self, alpha: f64) -> (f64, f64) {
        let r = alpha.max(alpha * self.deviation);
        (
            (self.mean - r).clamp(0.0, 255.0),
            (self.mean + r).clamp(0.0, 255.0),
        )
    }
}
