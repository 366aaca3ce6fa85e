//! Bounded rolling window over recent loss values.

use std::collections::VecDeque;

/// Bounded FIFO buffer holding the most recent loss values.
///
/// Holds at most `capacity` values; pushing to a full window evicts the
/// oldest entry first. Insertion order is significant: the ordered contents
/// feed the one-time loss-cap calibration and diagnostic snapshots.
/// Aggregate queries never mutate the window.
#[derive(Debug, Clone)]
pub struct LossWindow {
    values: VecDeque<f64>,
    capacity: usize,
}

impl LossWindow {
    /// Creates an empty window with the given capacity.
    ///
    /// A zero capacity is rejected upstream by configuration validation.
    pub fn new(capacity: usize) -> Self {
        debug_assert!(capacity >= 1, "window capacity must be at least 1");
        Self {
            values: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// Appends a value, evicting the oldest entry if already at capacity.
    pub fn push(&mut self, value: f64) {
        if self.values.len() == self.capacity {
            self.values.pop_front();
        }
        self.values.push_back(value);
    }

    /// Number of values currently held.
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// True if the window holds no values.
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// True iff the window holds exactly `capacity` values.
    pub fn is_full(&self) -> bool {
        self.values.len() == self.capacity
    }

    /// The maximum number of values the window can hold.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Arithmetic mean over the current contents; None when empty.
    pub fn mean(&self) -> Option<f64> {
        if self.values.is_empty() {
            return None;
        }
        Some(self.values.iter().sum::<f64>() / self.values.len() as f64)
    }

    /// Maximum over the current contents; None when empty.
    pub fn max(&self) -> Option<f64> {
        self.values.iter().copied().reduce(f64::max)
    }

    /// Number of entries strictly greater than the threshold.
    pub fn count_exceeding(&self, threshold: f64) -> usize {
        self.values.iter().filter(|v| **v > threshold).count()
    }

    /// Ordered copy of the current contents, oldest first.
    pub fn snapshot(&self) -> Vec<f64> {
        self.values.iter().copied().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_push_evicts_oldest() {
        let mut window = LossWindow::new(3);
        for v in [1.0, 2.0, 3.0, 4.0] {
            window.push(v);
        }
        assert_eq!(window.snapshot(), vec![2.0, 3.0, 4.0]);
        assert!(window.is_full());
    }

    #[test]
    fn test_len_never_exceeds_capacity() {
        let mut window = LossWindow::new(5);
        for i in 0..100 {
            window.push(i as f64);
            assert!(window.len() <= 5);
        }
        assert_eq!(window.snapshot(), vec![95.0, 96.0, 97.0, 98.0, 99.0]);
    }

    #[test]
    fn test_mean_and_max() {
        let mut window = LossWindow::new(4);
        assert_eq!(window.mean(), None);
        assert_eq!(window.max(), None);

        for v in [1.0, 2.0, 3.0, 6.0] {
            window.push(v);
        }
        assert_eq!(window.mean(), Some(3.0));
        assert_eq!(window.max(), Some(6.0));
    }

    #[test]
    fn test_count_exceeding_is_strict() {
        let mut window = LossWindow::new(4);
        for v in [9.0, 10.0, 10.5, 11.0] {
            window.push(v);
        }
        // 10.0 itself does not count.
        assert_eq!(window.count_exceeding(10.0), 2);
        assert_eq!(window.count_exceeding(100.0), 0);
    }

    #[test]
    fn test_capacity_one() {
        let mut window = LossWindow::new(1);
        window.push(1.0);
        window.push(2.0);
        assert_eq!(window.snapshot(), vec![2.0]);
        assert!(window.is_full());
        assert_eq!(window.mean(), Some(2.0));
    }

    #[test]
    fn test_reads_do_not_mutate() {
        let mut window = LossWindow::new(3);
        for v in [1.0, 2.0, 3.0] {
            window.push(v);
        }
        let before = window.snapshot();
        let _ = window.mean();
        let _ = window.max();
        let _ = window.count_exceeding(1.5);
        assert_eq!(window.snapshot(), before);
    }
}
