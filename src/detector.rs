//! Spike and high-loss detection over the rolling window.

use tracing::{debug, info};

use crate::window::LossWindow;

/// Consecutive-outlier state machine for transient loss spikes.
///
/// A loss at least `outlier_multiplier` times the running average counts as
/// an outlier; a tie counts. Once more than `patience` consecutive outliers
/// are seen the detector signals on that step and on every following outlier
/// step while the streak lasts (the signal is a level, not an edge). A
/// single non-outlier erases the entire streak.
#[derive(Debug, Clone)]
pub struct SpikeDetector {
    outlier_multiplier: f64,
    patience: u32,
    outlier_counter: u32,
}

impl SpikeDetector {
    /// Creates a detector with the given outlier multiplier and patience.
    pub fn new(outlier_multiplier: f64, patience: u32) -> Self {
        Self {
            outlier_multiplier,
            patience,
            outlier_counter: 0,
        }
    }

    /// Feeds one step's loss against the running average computed over the
    /// window before this loss was inserted.
    ///
    /// Returns true iff the consecutive-outlier streak exceeds the patience.
    pub fn observe(&mut self, loss: f64, running_avg: f64) -> bool {
        if loss >= running_avg * self.outlier_multiplier {
            self.outlier_counter += 1;
            info!(
                outlier_counter = self.outlier_counter,
                loss, running_avg, "Potential loss spike detected"
            );
            if self.outlier_counter > self.patience {
                info!(
                    outlier_counter = self.outlier_counter,
                    "Loss spike detected; try lowering the learning rate"
                );
                return true;
            }
        } else if self.outlier_counter > 0 {
            debug!(
                outlier_counter = self.outlier_counter,
                "Not a persistent loss spike; resetting outlier counter"
            );
            self.outlier_counter = 0;
        }
        false
    }

    /// Current length of the consecutive-outlier streak.
    pub fn outlier_counter(&self) -> u32 {
        self.outlier_counter
    }

    /// Multiplier of the running average defining an outlier.
    pub fn outlier_multiplier(&self) -> f64 {
        self.outlier_multiplier
    }

    /// Consecutive outliers tolerated before a spike is declared.
    pub fn patience(&self) -> u32 {
        self.patience
    }
}

/// Fraction-based detector for persistently high loss.
///
/// Stateless given the current window and step index. Only evaluated after
/// a buffer period of twice the window capacity, so window and cap
/// calibration settle before this check can fire.
#[derive(Debug, Clone, Copy, Default)]
pub struct HighLossDetector;

impl HighLossDetector {
    /// Checks whether at least half of the window exceeds the loss cap.
    ///
    /// The half-window threshold uses real-valued division: an odd capacity
    /// of 11 requires 6 qualifying entries, not 5.
    pub fn check(&self, window: &LossWindow, loss_cap: f64, current_step: u64) -> bool {
        if current_step < 2 * window.capacity() as u64 {
            return false;
        }
        let exceeding = window.count_exceeding(loss_cap);
        let triggered = exceeding as f64 >= window.capacity() as f64 / 2.0;
        if triggered {
            info!(
                loss_cap,
                exceeding, "High losses detected: train loss consistently greater than the cap"
            );
        }
        triggered
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn full_window(values: &[f64]) -> LossWindow {
        let mut window = LossWindow::new(values.len());
        for v in values {
            window.push(*v);
        }
        window
    }

    #[test]
    fn test_first_outlier_does_not_trigger() {
        let mut detector = SpikeDetector::new(2.0, 4);
        // 4 >= 2 * 2: an outlier on the inclusive boundary.
        assert!(!detector.observe(4.0, 2.0));
        assert_eq!(detector.outlier_counter(), 1);
    }

    #[test]
    fn test_triggers_past_patience() {
        let mut detector = SpikeDetector::new(2.0, 4);
        detector.outlier_counter = 4; // four prior consecutive outliers
        assert!(detector.observe(4.0, 2.0));
        assert_eq!(detector.outlier_counter(), 5);
    }

    #[test]
    fn test_non_outlier_resets_any_streak() {
        for streak in [1, 4, 17] {
            let mut detector = SpikeDetector::new(2.0, 4);
            detector.outlier_counter = streak;
            assert!(!detector.observe(3.9, 2.0));
            assert_eq!(detector.outlier_counter(), 0);
        }
    }

    #[test]
    fn test_non_outlier_with_zero_counter_is_noop() {
        let mut detector = SpikeDetector::new(2.0, 4);
        assert!(!detector.observe(1.0, 2.0));
        assert_eq!(detector.outlier_counter(), 0);
    }

    #[test]
    fn test_signal_is_level_triggered() {
        let mut detector = SpikeDetector::new(2.0, 1);
        assert!(!detector.observe(10.0, 2.0));
        assert!(detector.observe(10.0, 2.0));
        // No auto-reset after firing: keeps signalling while the streak lasts.
        assert!(detector.observe(10.0, 2.0));
        assert_eq!(detector.outlier_counter(), 3);
    }

    #[test]
    fn test_high_loss_quiet_window() {
        let window = full_window(&[2.0; 10]);
        let detector = HighLossDetector;
        assert!(!detector.check(&window, 10.0, 21));
    }

    #[test]
    fn test_high_loss_half_window_exceeds_cap() {
        let window = full_window(&[9.0, 8.0, 7.0, 6.0, 5.0, 11.0, 12.0, 13.0, 14.0, 15.0]);
        let detector = HighLossDetector;
        // 5 entries exceed the cap; 5 >= 10 / 2.
        assert!(detector.check(&window, 10.0, 21));
    }

    #[test]
    fn test_high_loss_gated_during_buffer_period() {
        let window = full_window(&[15.0; 10]);
        let detector = HighLossDetector;
        assert!(!detector.check(&window, 10.0, 19));
        assert!(detector.check(&window, 10.0, 20));
    }

    #[test]
    fn test_high_loss_odd_window_needs_strict_majority() {
        // Capacity 11: the threshold is 5.5, so 5 qualifying entries lose
        // and 6 win.
        let five = full_window(&[
            1.0, 1.0, 1.0, 1.0, 1.0, 1.0, 11.0, 11.0, 11.0, 11.0, 11.0,
        ]);
        let six = full_window(&[
            1.0, 1.0, 1.0, 1.0, 1.0, 11.0, 11.0, 11.0, 11.0, 11.0, 11.0,
        ]);
        let detector = HighLossDetector;
        assert!(!detector.check(&five, 10.0, 22));
        assert!(detector.check(&six, 10.0, 22));
    }
}
