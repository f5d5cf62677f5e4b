//! Alert entities, severity ordering, and the in-memory lifecycle store.

pub mod geo;
pub mod recommend;
pub mod store;

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

pub use self::store::{AlertQuery, AlertStore, InsertOutcome, StatusUpdate, StoreStats};

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ParseError {
    #[error("unknown alert level '{0}' (expected critical, high, medium or low)")]
    Level(String),
    #[error("unknown alert status '{0}' (expected active, acknowledged or resolved)")]
    Status(String),
}

/// Process-unique alert identifier. Never reused, even after eviction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AlertId(Uuid);

impl AlertId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for AlertId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for AlertId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl FromStr for AlertId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s).map(Self)
    }
}

/// Ordered severity classification, `Low < Medium < High < Critical`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AlertLevel {
    Low,
    Medium,
    High,
    Critical,
}

impl AlertLevel {
    pub const ALL: [AlertLevel; 4] = [
        AlertLevel::Critical,
        AlertLevel::High,
        AlertLevel::Medium,
        AlertLevel::Low,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            AlertLevel::Critical => "critical",
            AlertLevel::High => "high",
            AlertLevel::Medium => "medium",
            AlertLevel::Low => "low",
        }
    }
}

impl fmt::Display for AlertLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AlertLevel {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "critical" => Ok(AlertLevel::Critical),
            "high" => Ok(AlertLevel::High),
            "medium" => Ok(AlertLevel::Medium),
            "low" => Ok(AlertLevel::Low),
            _ => Err(ParseError::Level(s.to_string())),
        }
    }
}

/// Lifecycle status. `Resolved` is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AlertStatus {
    Active,
    Acknowledged,
    Resolved,
}

impl AlertStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            AlertStatus::Active => "active",
            AlertStatus::Acknowledged => "acknowledged",
            AlertStatus::Resolved => "resolved",
        }
    }

    /// Whether moving from `self` to `next` is a legal transition.
    pub fn can_transition_to(&self, next: AlertStatus) -> bool {
        *self != AlertStatus::Resolved || next == AlertStatus::Resolved
    }
}

impl fmt::Display for AlertStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AlertStatus {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "active" => Ok(AlertStatus::Active),
            "acknowledged" => Ok(AlertStatus::Acknowledged),
            "resolved" => Ok(AlertStatus::Resolved),
            _ => Err(ParseError::Status(s.to_string())),
        }
    }
}

/// A resolved place name with WGS84 coordinates.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Location {
    pub name: String,
    pub lat: f64,
    pub lon: f64,
}

impl Location {
    pub fn new(name: impl Into<String>, lat: f64, lon: f64) -> Self {
        Self {
            name: name.into(),
            lat,
            lon,
        }
    }
}

/// A classified alert before the store has given it an identity.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AlertDraft {
    pub alert_level: AlertLevel,
    pub disaster_type: String,
    pub confidence_score: f64,
    pub probability: f64,
    pub locations: Vec<Location>,
    pub keywords: BTreeSet<String>,
    pub entities: BTreeMap<String, String>,
    pub recommendations: Vec<String>,
    pub source: String,
    pub text: String,
    /// Creation time; the store assigns `now` when absent.
    pub created_at: Option<DateTime<Utc>>,
}

/// The canonical, stored, queryable, broadcastable alert.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Alert {
    pub id: AlertId,
    pub created_at: DateTime<Utc>,
    pub alert_level: AlertLevel,
    pub disaster_type: String,
    pub confidence_score: f64,
    pub probability: f64,
    pub locations: Vec<Location>,
    pub keywords: BTreeSet<String>,
    pub entities: BTreeMap<String, String>,
    pub recommendations: Vec<String>,
    pub status: AlertStatus,
    pub source: String,
    pub text: String,
}

impl Alert {
    pub(crate) fn from_draft(draft: AlertDraft, now: DateTime<Utc>) -> Self {
        Self {
            id: AlertId::new(),
            created_at: draft.created_at.unwrap_or(now),
            alert_level: draft.alert_level,
            disaster_type: draft.disaster_type,
            confidence_score: draft.confidence_score,
            probability: draft.probability,
            locations: draft.locations,
            keywords: draft.keywords,
            entities: draft.entities,
            recommendations: draft.recommendations,
            status: AlertStatus::Active,
            source: draft.source,
            text: draft.text,
        }
    }

    pub fn is_active(&self) -> bool {
        self.status == AlertStatus::Active
    }
}
