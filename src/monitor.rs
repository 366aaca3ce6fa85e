//! Per-step orchestration of the loss monitor.
//!
//! [`LossMonitor`] owns the rolling window, the two detectors, and the
//! calibrated thresholds. The host calls [`run_start`](LossMonitor::run_start)
//! once before the first step and [`observe`](LossMonitor::observe) once per
//! step, inline with its own step loop; the monitor has no internal
//! threading or queuing.

use tracing::{debug, info, warn};

use crate::calibration::{self, RunSchedule, DEFAULT_LOSS_CAP, MIN_WINDOW_SIZE, WINDOW_FRACTION};
use crate::detector::{HighLossDetector, SpikeDetector};
use crate::error::{MonitorError, MonitorResult};
use crate::sink::{DiagnosticEvent, DiagnosticKind, DiagnosticSink};
use crate::types::TrainLoss;
use crate::window::LossWindow;

/// Configuration for a [`LossMonitor`].
///
/// Immutable after construction except for the two auto-calibrated fields:
/// a `None` window size is raised once at run start from the run schedule,
/// and a `None` loss cap is fixed once at the step where the window first
/// becomes full. User-supplied values disable the corresponding calibration.
#[derive(Debug, Clone, PartialEq)]
pub struct MonitorConfig {
    /// Record detections without raising terminal errors.
    pub log_only: bool,

    /// Consecutive outlier losses tolerated before a spike is declared, so
    /// `patience + 1` consecutive outliers trigger.
    pub patience: u32,

    /// Multiplier of the running average defining an outlier. Must be
    /// finite and greater than 1.
    pub outlier_multiplier: f64,

    /// Rolling-window capacity; None sizes the window from the run schedule.
    pub window_size: Option<usize>,

    /// Absolute high-loss threshold; None derives the cap from the first
    /// full window.
    pub loss_cap: Option<f64>,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            log_only: true,
            patience: 4,
            outlier_multiplier: 2.0,
            window_size: None,
            loss_cap: None,
        }
    }
}

/// Builder for [`LossMonitor`].
pub struct LossMonitorBuilder {
    config: MonitorConfig,
    coordinator: bool,
    sinks: Vec<Box<dyn DiagnosticSink>>,
}

impl Default for LossMonitorBuilder {
    fn default() -> Self {
        Self {
            config: MonitorConfig::default(),
            coordinator: true,
            sinks: Vec::new(),
        }
    }
}

impl LossMonitorBuilder {
    /// Sets whether detections are diagnostics only.
    pub fn log_only(mut self, log_only: bool) -> Self {
        self.config.log_only = log_only;
        self
    }

    /// Sets the consecutive-outlier patience.
    pub fn patience(mut self, patience: u32) -> Self {
        self.config.patience = patience;
        self
    }

    /// Sets the outlier multiplier.
    pub fn outlier_multiplier(mut self, outlier_multiplier: f64) -> Self {
        self.config.outlier_multiplier = outlier_multiplier;
        self
    }

    /// Sets an explicit window size, disabling run-start calibration.
    pub fn window_size(mut self, window_size: usize) -> Self {
        self.config.window_size = Some(window_size);
        self
    }

    /// Sets an explicit loss cap, disabling first-window calibration.
    pub fn loss_cap(mut self, loss_cap: f64) -> Self {
        self.config.loss_cap = Some(loss_cap);
        self
    }

    /// Replaces the whole configuration.
    pub fn config(mut self, config: MonitorConfig) -> Self {
        self.config = config;
        self
    }

    /// Sets whether this process performs detection.
    ///
    /// In a multi-process run exactly one coordinating process should
    /// detect; the rest short-circuit every step to a no-op so no duplicate
    /// errors or diagnostics are produced. Resolved once here, never
    /// re-evaluated per step.
    pub fn coordinator(mut self, coordinator: bool) -> Self {
        self.coordinator = coordinator;
        self
    }

    /// Convenience over [`coordinator`](Self::coordinator): rank 0 detects.
    pub fn for_rank(self, rank: u64) -> Self {
        self.coordinator(rank == 0)
    }

    /// Attaches a diagnostic sink.
    ///
    /// Any number of sinks may be attached; sinks without structured
    /// metadata support are skipped at dispatch time.
    pub fn add_sink(mut self, sink: Box<dyn DiagnosticSink>) -> Self {
        self.sinks.push(sink);
        self
    }

    /// Validates the configuration and builds the monitor.
    pub fn build(self) -> MonitorResult<LossMonitor> {
        let MonitorConfig {
            log_only,
            patience,
            outlier_multiplier,
            window_size,
            loss_cap,
        } = self.config;

        if !outlier_multiplier.is_finite() || outlier_multiplier <= 1.0 {
            return Err(MonitorError::config(format!(
                "outlier_multiplier must be finite and greater than 1, got {outlier_multiplier}"
            )));
        }
        if window_size == Some(0) {
            return Err(MonitorError::config("window_size must be at least 1"));
        }
        if let Some(cap) = loss_cap {
            if !cap.is_finite() || cap <= 0.0 {
                return Err(MonitorError::config(format!(
                    "loss_cap must be finite and positive, got {cap}"
                )));
            }
        }

        Ok(LossMonitor {
            log_only,
            window: LossWindow::new(window_size.unwrap_or(MIN_WINDOW_SIZE)),
            spike: SpikeDetector::new(outlier_multiplier, patience),
            high_loss: HighLossDetector,
            sinks: self.sinks,
            coordinator: self.coordinator,
            current_step: 0,
            window_user_supplied: window_size.is_some(),
            window_calibrated: false,
            loss_cap,
        })
    }
}

/// Streaming monitor for loss spikes and persistently high loss.
///
/// All state (window, counters, calibrated thresholds) is exclusively owned
/// by one instance; there is no sharing or locking.
pub struct LossMonitor {
    log_only: bool,
    window: LossWindow,
    spike: SpikeDetector,
    high_loss: HighLossDetector,
    sinks: Vec<Box<dyn DiagnosticSink>>,
    coordinator: bool,
    current_step: u64,
    window_user_supplied: bool,
    window_calibrated: bool,
    loss_cap: Option<f64>,
}

impl LossMonitor {
    /// Creates a builder with default configuration.
    pub fn builder() -> LossMonitorBuilder {
        LossMonitorBuilder::default()
    }

    /// Fixes the rolling-window size from the run schedule.
    ///
    /// Must be called once before the first observation. When the window
    /// size was supplied explicitly this leaves it untouched; repeated calls
    /// and calls after the first observation are ignored with a warning.
    pub fn run_start(&mut self, schedule: &RunSchedule) {
        if !self.coordinator {
            return;
        }
        if self.window_calibrated || self.current_step > 0 {
            warn!("Ignoring run_start: the loss window is already calibrated");
            return;
        }
        self.window_calibrated = true;

        if self.window_user_supplied {
            debug!(
                window_size = self.window.capacity(),
                "Using caller-supplied loss window size"
            );
            return;
        }
        let size =
            calibration::window_size_for_run(schedule.total_steps(), MIN_WINDOW_SIZE, WINDOW_FRACTION);
        if size != self.window.capacity() {
            self.window = LossWindow::new(size);
        }
        info!(
            window_size = size,
            total_steps = ?schedule.total_steps(),
            "Calibrated loss window size from run schedule"
        );
    }

    /// Feeds one step's loss to the monitor.
    ///
    /// Returns a terminal error when a detection fires and the monitor is
    /// not in log-only mode; the caller is expected to stop the run without
    /// retry. A shape violation (vector or non-finite loss) also errors, as
    /// the step cannot be evaluated.
    pub fn observe(&mut self, loss: &TrainLoss) -> MonitorResult<()> {
        if !self.coordinator {
            return Ok(());
        }
        let value = self.scalar_value(loss)?;

        // Detection only starts once a full window of loss data exists.
        if !self.window.is_full() {
            self.window.push(value);
            self.current_step += 1;
            return Ok(());
        }

        // One-shot cap calibration at the step where the window first
        // becomes full, unless the caller supplied a cap.
        let loss_cap = match self.loss_cap {
            Some(cap) => cap,
            None => {
                let cap = calibration::loss_cap_from_window(&self.window, DEFAULT_LOSS_CAP)
                    .unwrap_or(DEFAULT_LOSS_CAP);
                self.loss_cap = Some(cap);
                info!(
                    loss_cap = cap,
                    step = self.current_step,
                    "Calibrated loss cap from first full window"
                );
                cap
            }
        };

        // Running mean over the window contents, excluding the new value.
        let Some(running_avg) = self.window.mean() else {
            return Err(MonitorError::config(
                "loss window is empty at evaluation time",
            ));
        };
        debug!(running_loss_avg = running_avg, "Running loss average");

        if self.spike.observe(value, running_avg) {
            self.emit_spike(running_avg);
            if !self.log_only {
                return Err(MonitorError::LossSpike {
                    outlier_multiplier: self.spike.outlier_multiplier(),
                    running_loss_avg: running_avg.round(),
                    outlier_counter: self.spike.outlier_counter(),
                });
            }
        } else if self
            .high_loss
            .check(&self.window, loss_cap, self.current_step)
        {
            self.emit_high_loss(loss_cap);
            if !self.log_only {
                return Err(MonitorError::HighLoss {
                    loss_cap,
                    window_size: self.window.capacity(),
                });
            }
        }

        // The window always reflects the most recent observations,
        // including the one just evaluated.
        self.window.push(value);
        self.current_step += 1;
        Ok(())
    }

    /// Convenience over [`observe`](Self::observe) for scalar losses.
    pub fn observe_scalar(&mut self, loss: f64) -> MonitorResult<()> {
        self.observe(&TrainLoss::Scalar(loss))
    }

    /// Number of observations processed so far.
    pub fn current_step(&self) -> u64 {
        self.current_step
    }

    /// Capacity of the rolling window.
    pub fn window_size(&self) -> usize {
        self.window.capacity()
    }

    /// The loss cap, once user-supplied or calibrated.
    pub fn loss_cap(&self) -> Option<f64> {
        self.loss_cap
    }

    /// Current length of the consecutive-outlier streak.
    pub fn outlier_counter(&self) -> u32 {
        self.spike.outlier_counter()
    }

    /// Whether this instance performs detection.
    pub fn is_coordinator(&self) -> bool {
        self.coordinator
    }

    fn scalar_value(&self, loss: &TrainLoss) -> MonitorResult<f64> {
        match loss {
            TrainLoss::Scalar(v) if v.is_finite() => Ok(*v),
            TrainLoss::Scalar(v) => Err(MonitorError::non_scalar(format!(
                "non-finite loss value {v}"
            ))),
            TrainLoss::Vector(values) => Err(MonitorError::non_scalar(format!(
                "expected one loss value per step, got {}",
                values.len()
            ))),
        }
    }

    fn emit(&self, event: DiagnosticEvent) {
        for sink in &self.sinks {
            if sink.supports_structured_metadata() {
                sink.record(&event);
            }
        }
    }

    fn emit_spike(&self, running_avg: f64) {
        let message = format!(
            "Training loss spike detected for {} consecutive steps. Consider stopping this run \
             and resubmitting with a lower learning rate.",
            self.spike.outlier_counter()
        );
        let event = DiagnosticEvent::new(DiagnosticKind::LossSpike, message, self.window.snapshot())
            .with_detail("outlier_counter", self.spike.outlier_counter().to_string())
            .with_detail(
                "outlier_multiplier",
                self.spike.outlier_multiplier().to_string(),
            )
            .with_detail("running_loss_avg", format!("{running_avg:.4}"));
        self.emit(event);
    }

    fn emit_high_loss(&self, loss_cap: f64) {
        let message = format!(
            "Persistently high (>{loss_cap}) training losses detected. Consider stopping this \
             run and resubmitting with a lower learning rate."
        );
        let event = DiagnosticEvent::new(DiagnosticKind::HighLoss, message, self.window.snapshot())
            .with_detail("loss_cap", loss_cap.to_string())
            .with_detail("window_size", self.window.capacity().to_string());
        self.emit(event);
    }
}
