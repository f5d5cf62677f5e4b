//! Recommendation lookup by disaster type and alert level.

use super::AlertLevel;

const EARTHQUAKE: &[&str] = &[
    "Drop, Cover, and Hold On",
    "Stay away from windows and exterior walls",
    "If inside, stay inside; if outside, move to open area",
];

const FLOOD: &[&str] = &[
    "Move to higher ground immediately",
    "Avoid walking or driving through flood waters",
    "Follow evacuation orders from local authorities",
];

const HURRICANE: &[&str] = &[
    "Board up windows and secure loose outdoor items",
    "Prepare emergency supplies and evacuation plan",
    "Follow local authority evacuation orders",
];

const TORNADO: &[&str] = &[
    "Seek shelter in basement or interior room",
    "Stay away from windows and exterior walls",
    "Keep monitoring local weather updates",
];

const WILDFIRE: &[&str] = &[
    "Follow evacuation orders immediately",
    "Prepare emergency supplies",
    "Close all windows and doors",
];

const TSUNAMI: &[&str] = &[
    "Move to higher ground immediately",
    "Follow evacuation routes",
    "Stay away from coastal areas",
];

const CRITICAL_GUIDANCE: &[&str] = &[
    "Take immediate action",
    "Follow all emergency instructions",
    "Contact emergency services if in immediate danger",
];

const HIGH_GUIDANCE: &[&str] = &[
    "Prepare for immediate action",
    "Monitor official communications",
    "Review evacuation plans",
];

/// Disaster types with a dedicated action list.
pub const KNOWN_TYPES: [&str; 6] = [
    "earthquake",
    "flood",
    "hurricane",
    "tornado",
    "wildfire",
    "tsunami",
];

fn base_actions(disaster_type: &str) -> &'static [&'static str] {
    match disaster_type.trim().to_ascii_lowercase().as_str() {
        "earthquake" => EARTHQUAKE,
        "flood" => FLOOD,
        "hurricane" => HURRICANE,
        "tornado" => TORNADO,
        "wildfire" => WILDFIRE,
        "tsunami" => TSUNAMI,
        _ => &[],
    }
}

fn level_guidance(level: AlertLevel) -> &'static [&'static str] {
    match level {
        AlertLevel::Critical => CRITICAL_GUIDANCE,
        AlertLevel::High => HIGH_GUIDANCE,
        AlertLevel::Medium | AlertLevel::Low => &[],
    }
}

/// Ordered action list: per-type actions first, then level guidance.
pub fn recommend(disaster_type: &str, level: AlertLevel) -> Vec<String> {
    base_actions(disaster_type)
        .iter()
        .chain(level_guidance(level))
        .map(|s| s.to_string())
        .collect()
}
