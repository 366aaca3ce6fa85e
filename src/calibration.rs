//! One-shot calibration of the window size and loss cap.
//!
//! Both calibrations run at most once per run and only when the caller did
//! not supply an explicit value: the window size is fixed at run start from
//! the planned run length, and the loss cap is fixed at the step where the
//! window first becomes full.

use serde::{Deserialize, Serialize};

use crate::window::LossWindow;

/// Smallest rolling window used when sizing from a run schedule.
pub const MIN_WINDOW_SIZE: usize = 100;

/// Fraction of the planned run length used to size the rolling window.
pub const WINDOW_FRACTION: f64 = 0.05;

/// Hard ceiling applied when deriving the loss cap from the first full window.
pub const DEFAULT_LOSS_CAP: f64 = 10.0;

/// Planned length of a training run, as known before the first step.
///
/// Mirrors the run-length configuration of typical training hosts: either an
/// explicit step budget, or an epoch count with a per-epoch step count.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RunSchedule {
    /// Explicit step budget; wins over the epoch-derived estimate.
    pub max_steps: Option<u64>,

    /// Number of planned epochs.
    pub epochs: Option<u64>,

    /// Number of optimization steps per epoch.
    pub steps_per_epoch: Option<u64>,
}

impl RunSchedule {
    /// Creates a schedule from an explicit step budget.
    pub fn with_max_steps(max_steps: u64) -> Self {
        Self {
            max_steps: Some(max_steps),
            ..Self::default()
        }
    }

    /// Creates a schedule from an epoch count and steps per epoch.
    pub fn with_epochs(epochs: u64, steps_per_epoch: u64) -> Self {
        Self {
            epochs: Some(epochs),
            steps_per_epoch: Some(steps_per_epoch),
            ..Self::default()
        }
    }

    /// Best available estimate of the total planned steps.
    ///
    /// An explicit step budget wins; otherwise `epochs × steps_per_epoch`
    /// when both are known. None means no reliable total exists.
    pub fn total_steps(&self) -> Option<u64> {
        self.max_steps
            .or_else(|| match (self.epochs, self.steps_per_epoch) {
                (Some(epochs), Some(steps)) => epochs.checked_mul(steps),
                _ => None,
            })
    }
}

/// Derives the rolling-window size from the planned run length.
///
/// Returns `max(minimum, round(total_steps × fraction))`; collapses to
/// `minimum` when no reliable total is available.
pub fn window_size_for_run(total_steps: Option<u64>, minimum: usize, fraction: f64) -> usize {
    match total_steps {
        Some(total) => {
            let scaled = (total as f64 * fraction).round() as usize;
            scaled.max(minimum)
        }
        None => minimum,
    }
}

/// Derives the loss cap from the first full window.
///
/// Returns `min(max(window), hard_maximum)`, or None when the window is
/// empty. Invoked exactly once per run, at the step where the window first
/// reaches full capacity.
pub fn loss_cap_from_window(window: &LossWindow, hard_maximum: f64) -> Option<f64> {
    window.max().map(|observed| observed.min(hard_maximum))
}
