//! Built-in demonstration feed.
//!
//! Six representative reports from weather services and social media across
//! US metro areas. Timestamps are scattered randomly inside the lookback
//! window on every fetch so the feed looks live.

use anyhow::Result;
use chrono::{Duration, Utc};
use rand::Rng;

use super::{CandidateEvent, Collector};

struct SampleEvent {
    source: &'static str,
    text: &'static str,
    severity: &'static str,
    location: &'static str,
    lat: f64,
    lon: f64,
}

const SAMPLE_EVENTS: [SampleEvent; 6] = [
    SampleEvent {
        source: "weather",
        text: "Severe thunderstorm warning for Los Angeles County. Potential for heavy rain, hail, and wind gusts up to 60 mph.",
        severity: "Severe",
        location: "Los Angeles County, CA",
        lat: 34.0522,
        lon: -118.2437,
    },
    SampleEvent {
        source: "twitter",
        text: "Multiple reports of flooding in downtown Miami. Ocean Drive and Collins Ave underwater. Vehicles stranded. Avoid area!",
        severity: "Extreme",
        location: "Miami Beach, FL",
        lat: 25.7617,
        lon: -80.1918,
    },
    SampleEvent {
        source: "reddit",
        text: "4.2 magnitude earthquake near San Francisco. Felt across Bay Area. BART temporarily suspended.",
        severity: "Medium",
        location: "San Francisco Bay Area, CA",
        lat: 37.7749,
        lon: -122.4194,
    },
    SampleEvent {
        source: "weather",
        text: "Winter storm warning: Denver metro area expecting 8-12 inches of snow. Strong winds creating blizzard conditions.",
        severity: "Severe",
        location: "Denver Metropolitan Area, CO",
        lat: 39.7392,
        lon: -104.9903,
    },
    SampleEvent {
        source: "twitter",
        text: "Fast-moving wildfire near Phoenix suburbs. Evacuation orders for Cave Creek area. Multiple structures threatened.",
        severity: "Extreme",
        location: "Cave Creek, Phoenix, AZ",
        lat: 33.4484,
        lon: -112.0740,
    },
    SampleEvent {
        source: "weather",
        text: "Flash flood warning issued for Houston metro area. Street flooding reported in multiple locations.",
        severity: "Severe",
        location: "Houston, TX",
        lat: 29.7604,
        lon: -95.3698,
    },
];

/// Sources the sample feed reports under.
pub const SAMPLE_SOURCES: [&str; 3] = ["weather", "twitter", "reddit"];

#[derive(Debug, Clone, Copy, Default)]
pub struct SampleCollector;

impl SampleCollector {
    /// Every sample event, newest first, with timestamps inside `lookback_hours`.
    pub fn events(&self, lookback_hours: u32) -> Vec<CandidateEvent> {
        let now = Utc::now();
        let window_minutes = (lookback_hours.max(1) as i64) * 60;
        let mut rng = rand::thread_rng();

        let mut events: Vec<CandidateEvent> = SAMPLE_EVENTS
            .iter()
            .map(|s| {
                let mut event = CandidateEvent::new(s.text, s.source, s.severity).at(s.location, s.lat, s.lon);
                event.timestamp = now - Duration::minutes(rng.gen_range(0..window_minutes));
                event
            })
            .collect();

        events.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
        events
    }
}

#[async_trait::async_trait]
impl Collector for SampleCollector {
    fn name(&self) -> &str {
        "sample"
    }

    async fn fetch(&self, _keywords: &[String], lookback_hours: u32) -> Result<Vec<CandidateEvent>> {
        Ok(self.events(lookback_hours))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_events_inside_window_newest_first() {
        let now = Utc::now();
        let events = SampleCollector.events(6);
        assert_eq!(events.len(), 6);
        for e in &events {
            assert!(e.timestamp <= now + Duration::seconds(1));
            assert!(e.timestamp >= now - Duration::hours(6) - Duration::seconds(1));
            assert!(e.coordinates.is_some());
            assert!(SAMPLE_SOURCES.contains(&e.source.as_str()));
        }
        assert!(events.windows(2).all(|w| w[0].timestamp >= w[1].timestamp));
    }
}
