//! Candidate event collection.
//!
//! Each source sits behind the [`Collector`] trait. [`CollectorSet`] polls all
//! of them concurrently under a shared timeout; a source that errors or hangs
//! contributes nothing to the cycle instead of failing it.

pub mod feed;
pub mod sample;

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};

pub use self::feed::FeedCollector;
pub use self::sample::SampleCollector;

#[derive(Debug, Error)]
pub enum CollectError {
    #[error("source '{source_name}' timed out after {after:?}")]
    Timeout { source_name: String, after: Duration },
    #[error("feed returned HTTP {0}")]
    Status(u16),
    #[error("feed request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("feed body is not a JSON event list: {0}")]
    Decode(#[source] reqwest::Error),
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
    pub lat: f64,
    pub lon: f64,
}

/// A raw, unscored report of a possible disaster.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CandidateEvent {
    pub text: String,
    pub source: String,
    #[serde(alias = "severity", default)]
    pub raw_severity_hint: String,
    #[serde(default)]
    pub coordinates: Option<Coordinates>,
    #[serde(alias = "location", default)]
    pub location_text: Option<String>,
    #[serde(alias = "created_at", default = "Utc::now")]
    pub timestamp: DateTime<Utc>,
}

impl CandidateEvent {
    pub fn new(text: impl Into<String>, source: impl Into<String>, hint: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            source: source.into(),
            raw_severity_hint: hint.into(),
            coordinates: None,
            location_text: None,
            timestamp: Utc::now(),
        }
    }

    pub fn at(mut self, name: impl Into<String>, lat: f64, lon: f64) -> Self {
        self.location_text = Some(name.into());
        self.coordinates = Some(Coordinates { lat, lon });
        self
    }

    /// Whether the text mentions any of `keywords` (case-insensitive).
    /// An empty keyword list matches everything.
    pub fn mentions_any(&self, keywords: &[String]) -> bool {
        if keywords.is_empty() {
            return true;
        }
        let text = self.text.to_lowercase();
        keywords.iter().any(|k| text.contains(&k.to_lowercase()))
    }
}

/// A source of candidate events.
#[async_trait::async_trait]
pub trait Collector: Send + Sync {
    fn name(&self) -> &str;

    /// Events mentioning `keywords` from the last `lookback_hours`.
    async fn fetch(&self, keywords: &[String], lookback_hours: u32) -> Result<Vec<CandidateEvent>>;
}

/// All configured sources, polled together.
#[derive(Clone, Default)]
pub struct CollectorSet {
    collectors: Vec<Arc<dyn Collector>>,
}

impl CollectorSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, collector: impl Collector + 'static) -> Self {
        self.collectors.push(Arc::new(collector));
        self
    }

    pub fn names(&self) -> Vec<String> {
        self.collectors.iter().map(|c| c.name().to_string()).collect()
    }

    pub fn is_empty(&self) -> bool {
        self.collectors.is_empty()
    }

    /// Fetch from every source concurrently. Results keep source order.
    pub async fn fetch_all(
        &self,
        keywords: &[String],
        lookback_hours: u32,
        timeout: Duration,
    ) -> Vec<CandidateEvent> {
        let fetches = self.collectors.iter().map(|c| async move {
            let outcome = match tokio::time::timeout(timeout, c.fetch(keywords, lookback_hours)).await {
                Ok(r) => r,
                Err(_) => Err(CollectError::Timeout {
                    source_name: c.name().to_string(),
                    after: timeout,
                }
                .into()),
            };
            match outcome {
                Ok(events) => {
                    debug!(source = c.name(), count = events.len(), "collected events");
                    events
                }
                Err(e) => {
                    warn!(source = c.name(), error = %e, "collection failed, treating as empty");
                    Vec::new()
                }
            }
        });

        futures::future::join_all(fetches)
            .await
            .into_iter()
            .flatten()
            .collect()
    }
}
