//! Compensated floating-point accumulation.

/// Kahan summation accumulator.
///
/// Log-likelihood sums add millions of terms of similar magnitude; carrying
/// the rounding correction keeps the total stable against accumulation order.
#[derive(Debug, Clone, Copy, Default)]
pub struct KahanSum {
    sum: f64,
    correction: f64,
}

impl KahanSum {
    /// A zeroed accumulator.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds one term, folding the previous rounding error back in.
    pub fn add(&mut self, term: f64) {
        let corrected = term - self.correction;
        let next = self.sum + corrected;
        self.correction = (next - self.sum) - corrected;
        self.sum = next;
    }

    /// The accumulated total.
    pub fn total(&self) -> f64 {
        self.sum
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recovers_precision_lost_to_naive_accumulation() {
        let mut compensated = KahanSum::new();
        let mut naive = 0.0_f64;
        compensated.add(1.0e16);
        naive += 1.0e16;
        for _ in 0..1000 {
            compensated.add(1.0);
            naive += 1.0;
        }
        compensated.add(-1.0e16);
        naive += -1.0e16;
        assert_eq!(compensated.total(), 1000.0);
        // At 1e16 the spacing between floats exceeds 1.0, so the naive sum
        // swallowed every small term.
        assert!((naive - 1000.0).abs() > 1.0);
    }

    #[test]
    fn empty_accumulator_totals_zero() {
        assert_eq!(KahanSum::new().total(), 0.0);
    }
}
