//! Prelude for commonly used types and traits in loss-guard.

pub use crate::calibration::RunSchedule;
pub use crate::error::{MonitorError, MonitorResult};
pub use crate::monitor::{LossMonitor, LossMonitorBuilder, MonitorConfig};
pub use crate::sink::{DiagnosticEvent, DiagnosticKind, DiagnosticSink, InMemorySink, TracingSink};
pub use crate::types::TrainLoss;
