//! # Loss Guard - Training-Loss Monitoring for Rust
//!
//! Loss Guard is a streaming monitor for the per-step training loss of a
//! long-running optimization process. It maintains a bounded rolling window
//! of recent losses and watches for two failure shapes: a transient **loss
//! spike** (a run of steps far above the recent average) and **persistently
//! high loss** (a sustained fraction of recent steps above an absolute cap).
//! On detection it emits a structured diagnostic to every attached sink and,
//! unless configured as log-only, raises a terminal error the host should
//! treat as "stop the run, do not retry".
//!
//! ## Quick Start
//!
//! ```rust
//! use loss_guard::prelude::*;
//!
//! # fn main() -> Result<(), MonitorError> {
//! let sink = InMemorySink::new();
//! let mut monitor = LossMonitor::builder()
//!     .log_only(true)
//!     .window_size(10)
//!     .add_sink(Box::new(sink.clone()))
//!     .build()?;
//!
//! monitor.run_start(&RunSchedule::with_max_steps(1_000));
//! for step in 0..100 {
//!     let loss = 2.0 - (step as f64 * 0.001);
//!     monitor.observe(&TrainLoss::Scalar(loss))?;
//! }
//! assert!(sink.events().is_empty());
//! # Ok(())
//! # }
//! ```
//!
//! ## Key Features
//!
//! - **Adaptive calibration**: when not configured explicitly, the window
//!   size is derived once from the planned run length and the loss cap once
//!   from the first full window of observed losses.
//! - **Log-only or fail-fast**: detections are always recorded as
//!   diagnostics; with `log_only(false)` they also stop the run through a
//!   typed, non-retryable [`error::MonitorError`].
//! - **Pluggable sinks**: any number of [`sink::DiagnosticSink`]
//!   destinations can be attached; sinks without structured-metadata
//!   support are skipped silently.
//! - **Distributed-aware**: a constructor-time coordinator flag lets every
//!   rank hold a monitor while exactly one performs detection.
//!
//! ## Architecture
//!
//! - **`window`**: bounded FIFO buffer with aggregate queries
//! - **`calibration`**: one-shot window-size and loss-cap derivation
//! - **`detector`**: the consecutive-outlier state machine and the
//!   half-window high-loss check
//! - **`monitor`**: per-step orchestration, configuration, and builder
//! - **`sink`**: diagnostic events and telemetry destinations
//! - **`error`**: the shape-violation and terminal error taxonomy
//! - **`logging`**: optional `tracing` subscriber setup for hosts

pub mod calibration;
pub mod detector;
pub mod error;
pub mod logging;
pub mod monitor;
pub mod prelude;
pub mod sink;
pub mod types;
pub mod window;
