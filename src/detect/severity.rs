//! Severity classification.
//!
//! Model confidence can only raise an alert above the level its source
//! declared. Rules are evaluated top to bottom, first match wins:
//!
//! | confidence | probability | level    |
//! |------------|-------------|----------|
//! | >= 0.9     | >= 0.9      | Critical |
//! | >= 0.8     | >= 0.8      | High     |
//! | >= 0.7     | any         | Medium   |
//! | otherwise  |             | hint     |

use crate::alert::AlertLevel;

pub const CRITICAL_THRESHOLD: f64 = 0.9;
pub const HIGH_THRESHOLD: f64 = 0.8;
pub const MEDIUM_THRESHOLD: f64 = 0.7;

/// Map a source-declared severity string onto an alert level.
///
/// Accepts both weather-service vocabulary (Extreme, Severe, Moderate, Minor)
/// and level names. Anything unrecognized is `Low`.
pub fn level_from_hint(hint: &str) -> AlertLevel {
    match hint.trim().to_ascii_lowercase().as_str() {
        "extreme" | "critical" => AlertLevel::Critical,
        "severe" | "high" => AlertLevel::High,
        "moderate" | "medium" => AlertLevel::Medium,
        _ => AlertLevel::Low,
    }
}

pub fn classify(hint: &str, confidence: f64, probability: f64) -> AlertLevel {
    if confidence >= CRITICAL_THRESHOLD && probability >= CRITICAL_THRESHOLD {
        AlertLevel::Critical
    } else if confidence >= HIGH_THRESHOLD && probability >= HIGH_THRESHOLD {
        AlertLevel::High
    } else if confidence >= MEDIUM_THRESHOLD {
        AlertLevel::Medium
    } else {
        level_from_hint(hint)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_threshold_table() {
        assert_eq!(classify("low", 0.95, 0.95), AlertLevel::Critical);
        assert_eq!(classify("low", 0.85, 0.85), AlertLevel::High);
        assert_eq!(classify("low", 0.75, 0.3), AlertLevel::Medium);
        assert_eq!(classify("low", 0.5, 0.5), AlertLevel::Low);
    }

    #[test]
    fn test_boundaries_inclusive() {
        assert_eq!(classify("", 0.9, 0.9), AlertLevel::Critical);
        assert_eq!(classify("", 0.8, 0.8), AlertLevel::High);
        assert_eq!(classify("", 0.7, 0.0), AlertLevel::Medium);
    }

    #[test]
    fn test_high_confidence_low_probability() {
        // Confidence alone cannot reach High.
        assert_eq!(classify("minor", 1.0, 0.5), AlertLevel::Medium);
    }

    #[test]
    fn test_hint_used_when_uncertain() {
        assert_eq!(classify("Extreme", 0.2, 0.2), AlertLevel::Critical);
        assert_eq!(classify("Severe", 0.2, 0.2), AlertLevel::High);
        assert_eq!(classify("Moderate", 0.2, 0.2), AlertLevel::Medium);
        assert_eq!(classify("whatever", 0.2, 0.2), AlertLevel::Low);
    }

    #[test]
    fn test_medium_rule_precedes_hint() {
        // First match wins, even over an Extreme hint.
        assert_eq!(classify("Extreme", 0.75, 0.3), AlertLevel::Medium);
    }
}
