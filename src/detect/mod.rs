//! Disaster detection: the detector seam, confidence fusion, and severity
//! classification.

pub mod fusion;
pub mod keywords;
pub mod severity;

use std::collections::{BTreeMap, BTreeSet};

use anyhow::Result;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::alert::Location;

pub use self::keywords::KeywordDetector;

#[derive(Debug, Error, PartialEq)]
pub enum DetectError {
    #[error("disaster probability {0} outside [0, 1]")]
    InvalidProbability(f64),
    #[error("detector returned {got} results for {expected} texts")]
    BatchMismatch { expected: usize, got: usize },
}

/// Scored output for one candidate text.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DetectionResult {
    pub disaster_probability: f64,
    #[serde(default)]
    pub disaster_type: Option<String>,
    #[serde(default)]
    pub keywords: BTreeSet<String>,
    #[serde(default)]
    pub resolved_locations: Vec<Location>,
    #[serde(default)]
    pub entities: BTreeMap<String, String>,
}

impl DetectionResult {
    /// Reject results whose probability is not a number in `[0, 1]`.
    pub fn validate(&self) -> Result<(), DetectError> {
        let p = self.disaster_probability;
        if !p.is_finite() || !(0.0..=1.0).contains(&p) {
            return Err(DetectError::InvalidProbability(p));
        }
        Ok(())
    }

    pub fn disaster_type_or_unknown(&self) -> &str {
        self.disaster_type.as_deref().unwrap_or("unknown")
    }
}

/// Text scorer standing in for the external classification model.
///
/// Implementations must return exactly one result per input text, in order.
#[async_trait::async_trait]
pub trait Detector: Send + Sync {
    async fn score_batch(&self, texts: &[String]) -> Result<Vec<DetectionResult>>;
}
