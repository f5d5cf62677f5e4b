//! JSON feed collector.
//!
//! Polls an HTTP endpoint that returns a JSON array of candidate events, such
//! as a relay in front of a weather-service or social-media API.

use std::time::Duration;

use anyhow::{Context, Result};
use chrono::Utc;
use reqwest::Client;

use super::{CandidateEvent, CollectError, Collector};

pub struct FeedCollector {
    name: String,
    url: String,
    client: Client,
}

impl FeedCollector {
    pub fn new(name: impl Into<String>, url: impl Into<String>, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(concat!("quickalert/", env!("CARGO_PKG_VERSION")))
            .build()
            .context("failed to build feed HTTP client")?;
        Ok(Self {
            name: name.into(),
            url: url.into(),
            client,
        })
    }
}

#[async_trait::async_trait]
impl Collector for FeedCollector {
    fn name(&self) -> &str {
        &self.name
    }

    async fn fetch(&self, keywords: &[String], lookback_hours: u32) -> Result<Vec<CandidateEvent>> {
        let resp = self
            .client
            .get(&self.url)
            .send()
            .await
            .map_err(CollectError::from)?;

        if !resp.status().is_success() {
            return Err(CollectError::Status(resp.status().as_u16()).into());
        }

        let events: Vec<CandidateEvent> = resp.json().await.map_err(CollectError::Decode)?;
        let cutoff = Utc::now() - chrono::Duration::hours(lookback_hours as i64);

        Ok(events
            .into_iter()
            .filter(|e| e.timestamp >= cutoff && e.mentions_any(keywords))
            .collect())
    }
}
