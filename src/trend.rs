//! ═══════════════════════════════════════════════════════════════════════════════
//! TREND — Rolling Peak-Temperature Window
//! ═══════════════════════════════════════════════════════════════════════════════
//!
//! Bounded FIFO of recent per-tick peak temperatures. Derives:
//! - variability: range (max - min) of the stored window, the noise signal
//! - rising: latest sample at or above the previous one
//! - velocity: latest minus previous
//!
//! The window is the only short-history the governor consults; it never sees
//! individual sensor identities, only the per-tick maximum.
//! ═══════════════════════════════════════════════════════════════════════════════

use std::collections::VecDeque;

/// Default window capacity in ticks.
pub const TREND_WINDOW: usize = 10;

/// Rolling window of per-tick `max_temp` values (millidegrees Celsius).
#[derive(Debug, Clone)]
pub struct TrendWindow {
    samples: VecDeque<i64>,
    capacity: usize,
}

impl TrendWindow {
    pub fn new(capacity: usize) -> Self {
        Self {
            samples: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// Append a sample, evicting the oldest past capacity.
    pub fn push(&mut self, max_temp: i64) {
        if self.samples.len() >= self.capacity {
            self.samples.pop_front();
        }
        self.samples.push_back(max_temp);
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Range of the current window, 0 when fewer than two samples.
    pub fn variability(&self) -> i64 {
        let max = self.samples.iter().max();
        let min = self.samples.iter().min();
        match (max, min) {
            (Some(max), Some(min)) => max - min,
            _ => 0,
        }
    }

    /// True iff at least two samples exist and the latest >= the previous.
    pub fn rising(&self) -> bool {
        let n = self.samples.len();
        n >= 2 && self.samples[n - 1] >= self.samples[n - 2]
    }

    /// Latest minus previous, 0 with fewer than two samples.
    pub fn velocity(&self) -> i64 {
        let n = self.samples.len();
        if n >= 2 {
            self.samples[n - 1] - self.samples[n - 2]
        } else {
            0
        }
    }

    /// Most recent sample, if any.
    pub fn latest(&self) -> Option<i64> {
        self.samples.back().copied()
    }
}

impl Default for TrendWindow {
    fn default() -> Self {
        Self::new(TREND_WINDOW)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_window_never_exceeds_capacity() {
        let mut window = TrendWindow::new(TREND_WINDOW);
        for i in 0..50 {
            window.push(40_000 + i * 1000);
            assert!(
                window.len() <= TREND_WINDOW,
                "window grew past capacity at sample {}",
                i
            );
        }
        assert_eq!(window.len(), TREND_WINDOW);
    }

    #[test]
    fn test_variability_is_window_range() {
        let mut window = TrendWindow::new(4);
        for v in [50_000, 53_000, 48_000] {
            window.push(v);
        }
        assert_eq!(window.variability(), 5_000);

        // Evicting the low sample shrinks the range.
        window.push(52_000);
        window.push(51_000); // evicts 50_000
        assert_eq!(window.variability(), 5_000);
        window.push(52_000); // evicts 53_000
        assert_eq!(window.variability(), 4_000);
    }

    #[test]
    fn test_rising_needs_two_samples() {
        let mut window = TrendWindow::default();
        assert!(!window.rising(), "empty window is not rising");
        window.push(50_000);
        assert!(!window.rising(), "one sample is not rising");
        window.push(50_000);
        assert!(window.rising(), "equal latest counts as rising");
        window.push(49_000);
        assert!(!window.rising());
    }

    #[test]
    fn test_velocity() {
        let mut window = TrendWindow::default();
        assert_eq!(window.velocity(), 0);
        window.push(50_000);
        assert_eq!(window.velocity(), 0);
        window.push(52_500);
        assert_eq!(window.velocity(), 2_500);
        window.push(51_000);
        assert_eq!(window.velocity(), -1_500);
    }
}
