//! Online means with explicit sample counts.
//!
//! Every entry of a cached integral matrix is one [`IntegralElement`]: a
//! running mean updated one sample at a time and merged across partitions
//! by sample-count weighting. The incremental update
//! `mean += (sample - mean) / n` keeps the stored value at the magnitude
//! of the samples themselves, so partitions of any length combine without
//! the blow-up a raw sum would accumulate.

use std::ops::{Add, Div, Mul, Sub};

use serde::{Deserialize, Serialize};

use pwa_core::Complex64;

/// Sample types an [`IntegralElement`] can average.
///
/// Closed over the two entry kinds of an integral matrix: real diagonals
/// and complex off-diagonals.
pub trait Averageable:
    Copy
    + Default
    + PartialEq
    + Add<Output = Self>
    + Sub<Output = Self>
    + Mul<f64, Output = Self>
    + Div<f64, Output = Self>
{
}

impl Averageable for f64 {}
impl Averageable for Complex64 {}

/// A running mean over an event sample.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct IntegralElement<T> {
    value: T,
    count: u64,
}

impl<T: Averageable> IntegralElement<T> {
    /// An empty element: zero mean over zero samples.
    pub fn new() -> Self {
        Self {
            value: T::default(),
            count: 0,
        }
    }

    /// The current mean. Zero while no sample has been folded in.
    pub fn value(&self) -> T {
        self.value
    }

    /// Number of samples folded in so far.
    pub fn count(&self) -> u64 {
        self.count
    }

    /// Returns true while no sample has been folded in.
    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    /// Folds one sample into the running mean.
    pub fn accumulate(&mut self, sample: T) {
        self.count += 1;
        self.value = self.value + (sample - self.value) / self.count as f64;
    }

    /// Folds another element in, weighting each side by its sample count.
    ///
    /// Merging an empty element is a no-op; merging into an empty element
    /// copies the other side. The merge order does not matter beyond
    /// floating-point rounding.
    pub fn merge(&mut self, other: &IntegralElement<T>) {
        if other.count == 0 {
            return;
        }
        if self.count == 0 {
            *self = *other;
            return;
        }
        let total = self.count + other.count;
        self.value = (self.value * self.count as f64 + other.value * other.count as f64)
            / total as f64;
        self.count = total;
    }

    /// Discards the mean and the count.
    pub fn reset(&mut self) {
        *self = Self::new();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn running_mean_matches_the_arithmetic_mean() {
        let samples = [0.5, 2.0, -1.25, 4.0, 0.0, 3.5];
        let mut element = IntegralElement::new();
        for sample in samples {
            element.accumulate(sample);
        }
        let mean: f64 = samples.iter().sum::<f64>() / samples.len() as f64;
        assert_eq!(element.count(), samples.len() as u64);
        assert!((element.value() - mean).abs() < 1.0e-12);
    }

    #[test]
    fn merge_weights_by_count() {
        let mut left = IntegralElement::new();
        for sample in [1.0, 2.0, 3.0] {
            left.accumulate(sample);
        }
        let mut right = IntegralElement::new();
        right.accumulate(10.0);

        left.merge(&right);
        assert_eq!(left.count(), 4);
        // (3 * 2 + 1 * 10) / 4, not the midpoint of the two means.
        assert!((left.value() - 4.0).abs() < 1.0e-12);
    }

    #[test]
    fn empty_sides_do_not_disturb_a_merge() {
        let mut filled = IntegralElement::new();
        filled.accumulate(2.5);
        let empty = IntegralElement::<f64>::new();

        let mut copy = filled;
        copy.merge(&empty);
        assert_eq!(copy, filled);

        let mut target = IntegralElement::new();
        target.merge(&filled);
        assert_eq!(target, filled);
    }

    #[test]
    fn complex_elements_average_componentwise() {
        let mut element = IntegralElement::new();
        element.accumulate(Complex64::new(1.0, -2.0));
        element.accumulate(Complex64::new(3.0, 6.0));
        let value = element.value();
        assert!((value.re - 2.0).abs() < 1.0e-12);
        assert!((value.im - 2.0).abs() < 1.0e-12);
    }

    #[test]
    fn reset_returns_to_the_empty_state() {
        let mut element = IntegralElement::new();
        element.accumulate(7.0);
        element.reset();
        assert!(element.is_empty());
        assert_eq!(element.value(), 0.0);
    }
}
