//! Model-free keyword detector.
//!
//! Scores text by counting disaster vocabulary hits. Used when no external
//! classification model is wired in, and as the detector for the CLI.

use std::collections::{BTreeMap, BTreeSet};

use anyhow::Result;

use super::{DetectionResult, Detector};

/// Words that indicate a disaster report.
pub const DISASTER_KEYWORDS: [&str; 15] = [
    "earthquake",
    "flood",
    "hurricane",
    "tornado",
    "wildfire",
    "tsunami",
    "landslide",
    "avalanche",
    "volcanic",
    "storm",
    "emergency",
    "evacuation",
    "disaster",
    "catastrophe",
    "crisis",
];

/// The subset of [`DISASTER_KEYWORDS`] that names a disaster type.
pub const DISASTER_TYPES: [&str; 6] = [
    "earthquake",
    "flood",
    "hurricane",
    "tornado",
    "wildfire",
    "tsunami",
];

const NO_MATCH_PROBABILITY: f64 = 0.05;
const MAX_PROBABILITY: f64 = 0.95;

fn tokens(text: &str) -> impl Iterator<Item = String> + '_ {
    text.split(|c: char| !(c.is_alphanumeric() || c == '.'))
        .map(|t| t.trim_matches('.').to_lowercase())
        .filter(|t| !t.is_empty())
}

/// Vocabulary words found in `text`. Inflected forms ("flooding",
/// "earthquakes") count as their stem.
pub fn extract_keywords(text: &str) -> BTreeSet<String> {
    let mut found = BTreeSet::new();
    for token in tokens(text) {
        if let Some(k) = DISASTER_KEYWORDS.iter().find(|k| token.starts_with(*k)) {
            found.insert(k.to_string());
        }
    }
    found
}

/// First disaster type mentioned in `text`, in reading order.
pub fn detect_type(text: &str) -> Option<String> {
    tokens(text).find_map(|token| {
        DISASTER_TYPES
            .iter()
            .find(|t| token.starts_with(*t))
            .map(|t| t.to_string())
    })
}

/// Pull a magnitude figure out of "magnitude 7.2" or "4.2 magnitude".
fn extract_magnitude(text: &str) -> Option<String> {
    let words: Vec<String> = tokens(text).collect();
    let idx = words.iter().position(|w| w == "magnitude")?;
    let after = words.get(idx + 1).filter(|w| w.parse::<f64>().is_ok());
    let before = idx
        .checked_sub(1)
        .and_then(|i| words.get(i))
        .filter(|w| w.parse::<f64>().is_ok());
    after.or(before).cloned()
}

fn probability_for(hits: usize) -> f64 {
    if hits == 0 {
        return NO_MATCH_PROBABILITY;
    }
    (0.45 + 0.2 * hits as f64).min(MAX_PROBABILITY)
}

/// Score a single text.
pub fn score_text(text: &str) -> DetectionResult {
    let keywords = extract_keywords(text);
    let mut entities = BTreeMap::new();
    if let Some(m) = extract_magnitude(text) {
        entities.insert("magnitude".to_string(), m);
    }

    DetectionResult {
        disaster_probability: probability_for(keywords.len()),
        disaster_type: detect_type(text),
        keywords,
        resolved_locations: Vec::new(),
        entities,
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct KeywordDetector;

#[async_trait::async_trait]
impl Detector for KeywordDetector {
    async fn score_batch(&self, texts: &[String]) -> Result<Vec<DetectionResult>> {
        Ok(texts.iter().map(|t| score_text(t)).collect())
    }
}
