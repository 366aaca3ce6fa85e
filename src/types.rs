//! Types for per-step loss observations.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A single step's training loss as reported by the host.
///
/// The monitor only evaluates scalar losses. Hosts whose models produce
/// several loss terms must reduce them to one value before reporting;
/// handing the monitor a vector is a contract violation surfaced as
/// [`MonitorError::NonScalarLoss`](crate::error::MonitorError::NonScalarLoss)
/// rather than a silently skipped step.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value")]
pub enum TrainLoss {
    /// A single loss value.
    Scalar(f64),

    /// Multiple loss terms. Unsupported; carried so the monitor can fail
    /// fast with a useful diagnostic instead of guessing a reduction.
    Vector(Vec<f64>),
}

impl TrainLoss {
    /// Checks whether this observation is a scalar.
    pub fn is_scalar(&self) -> bool {
        matches!(self, TrainLoss::Scalar(_))
    }

    /// Attempts to get the scalar loss value.
    pub fn as_scalar(&self) -> Option<f64> {
        match self {
            TrainLoss::Scalar(v) => Some(*v),
            TrainLoss::Vector(_) => None,
        }
    }
}

impl From<f64> for TrainLoss {
    fn from(value: f64) -> Self {
        TrainLoss::Scalar(value)
    }
}

impl From<Vec<f64>> for TrainLoss {
    fn from(values: Vec<f64>) -> Self {
        TrainLoss::Vector(values)
    }
}

impl fmt::Display for TrainLoss {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TrainLoss::Scalar(v) => write!(f, "{v}"),
            TrainLoss::Vector(values) => write!(f, "Vector({} elements)", values.len()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scalar_accessors() {
        let loss = TrainLoss::Scalar(2.5);
        assert!(loss.is_scalar());
        assert_eq!(loss.as_scalar(), Some(2.5));
    }

    #[test]
    fn test_vector_is_not_scalar() {
        let loss = TrainLoss::Vector(vec![1.0, 2.0]);
        assert!(!loss.is_scalar());
        assert_eq!(loss.as_scalar(), None);
    }

    #[test]
    fn test_from_impls() {
        assert_eq!(TrainLoss::from(3.0), TrainLoss::Scalar(3.0));
        assert_eq!(
            TrainLoss::from(vec![1.0, 2.0]),
            TrainLoss::Vector(vec![1.0, 2.0])
        );
    }

    #[test]
    fn test_serde_round_trip() {
        let loss = TrainLoss::Scalar(4.25);
        let json = serde_json::to_string(&loss).unwrap();
        assert_eq!(json, r#"{"type":"Scalar","value":4.25}"#);
        let back: TrainLoss = serde_json::from_str(&json).unwrap();
        assert_eq!(back, loss);
    }
}
