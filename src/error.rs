//! Error types for the loss monitor.

use thiserror::Error;

/// Result type for monitor operations.
pub type MonitorResult<T> = Result<T, MonitorError>;

/// Errors raised by the loss monitor.
///
/// [`LossSpike`](MonitorError::LossSpike) and
/// [`HighLoss`](MonitorError::HighLoss) are terminal: they mean "stop the
/// run, do not retry". They are raised only when the monitor is not in
/// log-only mode; in log-only mode the same detections are recorded as
/// diagnostics and the step loop continues.
#[derive(Error, Debug)]
pub enum MonitorError {
    /// The per-step loss was not a single finite scalar.
    #[error("Training loss must be a single finite scalar: {reason}")]
    NonScalarLoss {
        /// What was wrong with the reported loss.
        reason: String,
    },

    /// Consecutive outlier losses exceeded the configured patience.
    #[error(
        "Training stopped due to a loss spike: the loss was at least {outlier_multiplier}x the \
         running average (approx. {running_loss_avg}) for {outlier_counter} consecutive steps"
    )]
    LossSpike {
        /// Multiplier of the running average that defined an outlier.
        outlier_multiplier: f64,
        /// Running average of the loss window when the spike fired, rounded.
        running_loss_avg: f64,
        /// Length of the consecutive-outlier streak.
        outlier_counter: u32,
    },

    /// At least half of the recent losses exceeded the loss cap.
    #[error(
        "Training stopped due to consistently high losses: the loss exceeded {loss_cap} for at \
         least half of the {window_size} most recent steps"
    )]
    HighLoss {
        /// Absolute threshold a loss had to exceed to count as high.
        loss_cap: f64,
        /// Capacity of the rolling window the fraction was taken over.
        window_size: usize,
    },

    /// Invalid configuration or parameters.
    #[error("Invalid configuration: {0}")]
    Config(String),
}

impl MonitorError {
    /// Creates a shape-violation error with the given reason.
    pub fn non_scalar(reason: impl Into<String>) -> Self {
        Self::NonScalarLoss {
            reason: reason.into(),
        }
    }

    /// Creates a configuration error with the given message.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Returns true if this error is terminal for the monitored run.
    ///
    /// Fatal errors are not retryable; the assumption is that continuing
    /// without intervention (such as lowering the learning rate) will not
    /// self-correct.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            MonitorError::LossSpike { .. } | MonitorError::HighLoss { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_loss_spike_display() {
        let err = MonitorError::LossSpike {
            outlier_multiplier: 2.0,
            running_loss_avg: 41.0,
            outlier_counter: 5,
        };
        let message = err.to_string();
        assert!(message.contains("loss spike"));
        assert!(message.contains("5 consecutive steps"));
        assert!(message.contains("41"));
    }

    #[test]
    fn test_high_loss_display() {
        let err = MonitorError::HighLoss {
            loss_cap: 10.0,
            window_size: 100,
        };
        let message = err.to_string();
        assert!(message.contains("consistently high losses"));
        assert!(message.contains("10"));
        assert!(message.contains("100 most recent steps"));
    }

    #[test]
    fn test_is_fatal() {
        assert!(MonitorError::LossSpike {
            outlier_multiplier: 2.0,
            running_loss_avg: 4.0,
            outlier_counter: 5,
        }
        .is_fatal());
        assert!(MonitorError::HighLoss {
            loss_cap: 10.0,
            window_size: 100,
        }
        .is_fatal());
        assert!(!MonitorError::non_scalar("got 2 loss values").is_fatal());
        assert!(!MonitorError::config("window_size must be at least 1").is_fatal());
    }
}
