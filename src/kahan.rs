//! Compensated (Kahan) summation.
//!
//! The eigen-solver chains thousands of matrix-vector products. Naive summation
//! of the long dot products involved lets round-off accumulate into visible error
//! in the backward error estimates, which in turn confuses the convergence
//! criteria. Every inner product in this crate therefore goes through
//! [`KahanSum`], which carries a running compensation term for the low-order bits
//! lost by each addition.

/// A rolling compensated sum of `f64` values.
#[derive(Debug, Default, Clone, Copy, PartialEq)]
pub struct KahanSum {
    sum: f64,
    compensation: f64,
}

impl KahanSum {
    /// Creates an accumulator with a starting sum of zero.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds `value` to the running sum and returns the new sum.
    #[inline]
    pub fn add(&mut self, value: f64) -> f64 {
        let corrected = value - self.compensation;
        let sum = self.sum + corrected;
        self.compensation = (sum - self.sum) - corrected;
        self.sum = sum;
        self.sum
    }

    /// Returns the current sum.
    #[inline]
    pub fn sum(&self) -> f64 {
        self.sum
    }
}

impl Extend<f64> for KahanSum {
    fn extend<I: IntoIterator<Item = f64>>(&mut self, iter: I) {
        for value in iter {
            self.add(value);
        }
    }
}

impl FromIterator<f64> for KahanSum {
    fn from_iter<I: IntoIterator<Item = f64>>(iter: I) -> Self {
        let mut summer = KahanSum::new();
        summer.extend(iter);
        summer
    }
}

/// Sums all values yielded by `values` with compensation.
pub fn sum(values: impl IntoIterator<Item = f64>) -> f64 {
    values.into_iter().collect::<KahanSum>().sum()
}
