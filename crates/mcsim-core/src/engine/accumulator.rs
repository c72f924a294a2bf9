use serde::{Deserialize, Serialize};

pub const DEFAULT_BLOCK_SIZE: u64 = 100_000;

/// Running average with block averaging for the statistical error of
/// correlated samples.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Accumulator {
    count: u64,
    sum: f64,
    sum_sq: f64,
    block_size: u64,
    block_sum: f64,
    block_count: u64,
    block_averages: Vec<f64>,
}

impl Default for Accumulator {
    fn default() -> Self {
        Self::new(DEFAULT_BLOCK_SIZE)
    }
}

impl Accumulator {
    pub fn new(block_size: u64) -> Self {
        Self {
            count: 0,
            sum: 0.0,
            sum_sq: 0.0,
            block_size: block_size.max(1),
            block_sum: 0.0,
            block_count: 0,
            block_averages: Vec::new(),
        }
    }

    pub fn accumulate(&mut self, value: f64) {
        self.count += 1;
        self.sum += value;
        self.sum_sq += value * value;
        self.block_sum += value;
        self.block_count += 1;
        if self.block_count == self.block_size {
            self.block_averages
                .push(self.block_sum / self.block_size as f64);
            self.block_sum = 0.0;
            self.block_count = 0;
        }
    }

    pub fn reset(&mut self) {
        *self = Self::new(self.block_size);
    }

    /// Changes the block size and discards all values.
    pub fn set_block_size(&mut self, block_size: u64) {
        *self = Self::new(block_size);
    }

    #[inline]
    pub fn count(&self) -> u64 {
        self.count
    }

    #[inline]
    pub fn block_size(&self) -> u64 {
        self.block_size
    }

    pub fn num_blocks(&self) -> usize {
        self.block_averages.len()
    }

    /// Mean of all values, zero when empty.
    pub fn average(&self) -> f64 {
        if self.count == 0 {
            0.0
        } else {
            self.sum / self.count as f64
        }
    }

    /// Sample standard deviation of all values, zero with fewer than two values.
    pub fn stdev(&self) -> f64 {
        if self.count < 2 {
            return 0.0;
        }
        let n = self.count as f64;
        let variance = (self.sum_sq - self.sum * self.sum / n) / (n - 1.0);
        variance.max(0.0).sqrt()
    }

    /// Standard error of the mean estimated from completed block averages.
    pub fn block_stdev(&self) -> Option<f64> {
        let n = self.block_averages.len();
        if n < 2 {
            return None;
        }
        let nf = n as f64;
        let mean = self.block_averages.iter().sum::<f64>() / nf;
        let variance = self
            .block_averages
            .iter()
            .map(|b| (b - mean).powi(2))
            .sum::<f64>()
            / (nf - 1.0);
        Some((variance / nf).sqrt())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TOLERANCE: f64 = 1e-12;

    #[test]
    fn empty_accumulator_reports_zeros() {
        let acc = Accumulator::default();
        assert_eq!(acc.count(), 0);
        assert_eq!(acc.average(), 0.0);
        assert_eq!(acc.stdev(), 0.0);
        assert_eq!(acc.block_stdev(), None);
        assert_eq!(acc.block_size(), DEFAULT_BLOCK_SIZE);
    }

    #[test]
    fn average_and_stdev_match_hand_computation() {
        let mut acc = Accumulator::new(10);
        for x in [2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0] {
            acc.accumulate(x);
        }
        assert!((acc.average() - 5.0).abs() < TOLERANCE);
        assert!((acc.stdev() - (32.0f64 / 7.0).sqrt()).abs() < TOLERANCE);
    }

    #[test]
    fn block_stdev_requires_two_complete_blocks() {
        let mut acc = Accumulator::new(2);
        for x in [1.0, 3.0, 5.0] {
            acc.accumulate(x);
        }
        assert_eq!(acc.num_blocks(), 1);
        assert_eq!(acc.block_stdev(), None);
        acc.accumulate(7.0);
        assert_eq!(acc.num_blocks(), 2);
        // block means 2 and 6: sample variance 8, standard error sqrt(8 / 2)
        assert!((acc.block_stdev().unwrap() - 2.0).abs() < TOLERANCE);
    }

    #[test]
    fn reset_keeps_block_size() {
        let mut acc = Accumulator::new(3);
        acc.accumulate(1.0);
        acc.reset();
        assert_eq!(acc.count(), 0);
        assert_eq!(acc.block_size(), 3);
    }

    #[test]
    fn zero_block_size_is_clamped_to_one() {
        let mut acc = Accumulator::new(0);
        acc.accumulate(1.0);
        acc.accumulate(2.0);
        assert_eq!(acc.num_blocks(), 2);
    }
}
