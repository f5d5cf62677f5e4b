//! Event-to-alert pipeline: confidence fusion, severity classification, and
//! recommendations for each candidate event.

use std::time::Duration;

use anyhow::{Context, Result};
use tracing::warn;

use crate::alert::recommend::recommend;
use crate::alert::{AlertDraft, Location};
use crate::collect::CandidateEvent;
use crate::detect::fusion::fuse;
use crate::detect::severity::classify;
use crate::detect::{DetectError, DetectionResult, Detector};

/// Build an alert draft from an event and its detection result.
///
/// Fails only when the detector produced an unusable probability.
pub fn build_draft(event: &CandidateEvent, detection: DetectionResult) -> Result<AlertDraft, DetectError> {
    detection.validate()?;
    let disaster_type = detection.disaster_type_or_unknown().to_string();

    let mut locations = detection.resolved_locations;
    if locations.is_empty() {
        if let Some(c) = event.coordinates {
            let name = event.location_text.clone().unwrap_or_else(|| event.source.clone());
            locations.push(Location::new(name, c.lat, c.lon));
        }
    }

    let probability = detection.disaster_probability;
    let confidence = fuse(probability, detection.keywords.len(), locations.len());
    let level = classify(&event.raw_severity_hint, confidence, probability);
    let recommendations = recommend(&disaster_type, level);

    Ok(AlertDraft {
        alert_level: level,
        disaster_type,
        confidence_score: confidence,
        probability,
        locations,
        keywords: detection.keywords,
        entities: detection.entities,
        recommendations,
        source: event.source.clone(),
        text: event.text.clone(),
        created_at: None,
    })
}

/// Score `events` in one detector batch and build drafts, preserving event
/// order. Events with malformed detections are logged and dropped.
pub async fn classify_events(
    detector: &dyn Detector,
    events: &[CandidateEvent],
    timeout: Duration,
) -> Result<Vec<AlertDraft>> {
    if events.is_empty() {
        return Ok(Vec::new());
    }

    let texts: Vec<String> = events.iter().map(|e| e.text.clone()).collect();
    let results = tokio::time::timeout(timeout, detector.score_batch(&texts))
        .await
        .with_context(|| format!("detector timed out after {:?}", timeout))?
        .context("detector failed")?;

    if results.len() != events.len() {
        return Err(DetectError::BatchMismatch {
            expected: events.len(),
            got: results.len(),
        }
        .into());
    }

    let mut drafts = Vec::with_capacity(events.len());
    for (event, detection) in events.iter().zip(results) {
        match build_draft(event, detection) {
            Ok(d) => drafts.push(d),
            Err(e) => warn!(source = %event.source, error = %e, "dropping event with malformed detection"),
        }
    }
    Ok(drafts)
}
