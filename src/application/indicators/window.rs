use std::collections::VecDeque;

/// Fixed-size sliding window over a numeric stream whose values may be
/// undefined.
///
/// The window only reports statistics once it holds `period` consecutive
/// defined values. Pushing `None` empties it, so a gap in the input makes
/// every statistic undefined until the window has refilled.
///
/// Statistics are recomputed from the buffer instead of a running sum, so a
/// window of zeros yields exactly zero (RSI and CCI rely on that for their
/// divide-by-zero guards).
#[derive(Debug, Clone)]
pub struct RollingWindow {
    period: usize,
    values: VecDeque<f64>,
}

impl RollingWindow {
    pub fn new(period: usize) -> Self {
        Self {
            period: period.max(1),
            values: VecDeque::with_capacity(period.max(1)),
        }
    }

    pub fn push(&mut self, value: Option<f64>) {
        match value {
            Some(v) if v.is_finite() => {
                if self.values.len() == self.period {
                    self.values.pop_front();
                }
                self.values.push_back(v);
            }
            _ => self.values.clear(),
        }
    }

    pub fn is_full(&self) -> bool {
        self.values.len() == self.period
    }

    pub fn sum(&self) -> Option<f64> {
        self.is_full().then(|| self.values.iter().sum())
    }

    pub fn mean(&self) -> Option<f64> {
        self.sum().map(|s| s / self.period as f64)
    }

    /// Sample standard deviation (n - 1 denominator).
    pub fn std_dev(&self) -> Option<f64> {
        let mean = self.mean()?;
        if self.period < 2 {
            return Some(0.0);
        }
        let var = self.values.iter().map(|v| (v - mean).powi(2)).sum::<f64>()
            / (self.period - 1) as f64;
        Some(var.sqrt())
    }

    /// Mean absolute deviation around the window mean.
    pub fn mean_abs_dev(&self) -> Option<f64> {
        let mean = self.mean()?;
        Some(self.values.iter().map(|v| (v - mean).abs()).sum::<f64>() / self.period as f64)
    }

    pub fn min(&self) -> Option<f64> {
        if !self.is_full() {
            return None;
        }
        self.values.iter().copied().reduce(f64::min)
    }

    pub fn max(&self) -> Option<f64> {
        if !self.is_full() {
            return None;
        }
        self.values.iter().copied().reduce(f64::max)
    }

    /// Pushes `value` and returns the window mean, the usual simple moving
    /// average step.
    pub fn next_mean(&mut self, value: Option<f64>) -> Option<f64> {
        self.push(value);
        self.mean()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_undefined_until_full() {
        let mut window = RollingWindow::new(3);
        assert_eq!(window.next_mean(Some(1.0)), None);
        assert_eq!(window.next_mean(Some(2.0)), None);
        assert_eq!(window.next_mean(Some(3.0)), Some(2.0));
        assert_eq!(window.next_mean(Some(4.0)), Some(3.0));
    }

    #[test]
    fn test_gap_restarts_window() {
        let mut window = RollingWindow::new(2);
        window.push(Some(1.0));
        window.push(Some(2.0));
        assert!(window.is_full());

        window.push(None);
        assert_eq!(window.mean(), None);
        window.push(Some(5.0));
        assert_eq!(window.mean(), None);
        window.push(Some(7.0));
        assert_eq!(window.mean(), Some(6.0));
    }

    #[test]
    fn test_nan_counts_as_undefined() {
        let mut window = RollingWindow::new(1);
        window.push(Some(f64::NAN));
        assert_eq!(window.mean(), None);
    }

    #[test]
    fn test_sample_std_dev() {
        let mut window = RollingWindow::new(4);
        for v in [2.0, 4.0, 4.0, 6.0] {
            window.push(Some(v));
        }
        // mean 4, squared deviations 4 + 0 + 0 + 4 = 8, / 3
        let expected = (8.0f64 / 3.0).sqrt();
        assert!((window.std_dev().unwrap() - expected).abs() < 1e-12);
    }

    #[test]
    fn test_mean_abs_dev_and_extremes() {
        let mut window = RollingWindow::new(4);
        for v in [1.0, 3.0, 5.0, 7.0] {
            window.push(Some(v));
        }
        assert_eq!(window.mean_abs_dev(), Some(2.0));
        assert_eq!(window.min(), Some(1.0));
        assert_eq!(window.max(), Some(7.0));

        window.push(Some(0.5));
        assert_eq!(window.min(), Some(0.5));
        assert_eq!(window.max(), Some(7.0));
    }

    #[test]
    fn test_zero_window_sums_to_exact_zero() {
        let mut window = RollingWindow::new(3);
        for v in [0.1, 0.2, 0.3, 0.0, 0.0, 0.0] {
            window.push(Some(v));
        }
        assert_eq!(window.mean(), Some(0.0));
    }
}
