//! Alert lifecycle store.
//!
//! Holds the authoritative set of alerts behind a `tokio::sync::RwLock`.
//! Alerts are kept ordered by `created_at` (oldest first), which makes FIFO
//! eviction and oldest-to-newest snapshots a matter of slicing.
//!
//! Inserts are deduplicated by fingerprint: same disaster type, same primary
//! location rounded to `dedup_precision` decimal places, and creation times
//! no further apart than `dedup_window_secs`. A duplicate of a still-active
//! alert is a re-confirmation, which can only ever raise the stored level.

use std::collections::BTreeMap;

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use tokio::sync::RwLock;
use tracing::{debug, info};

use super::geo::{distance_km, round_coord};
use super::{Alert, AlertDraft, AlertId, AlertLevel, AlertStatus};
use crate::config::StoreConfig;

/// Result of [`AlertStore::insert`].
#[derive(Debug, Clone, PartialEq)]
pub enum InsertOutcome {
    /// A new alert entity was stored.
    Created(Alert),
    /// An active near-duplicate existed and its level was raised.
    Upgraded(Alert),
    /// An active near-duplicate existed at the same or a higher level.
    Reconfirmed(AlertId),
}

impl InsertOutcome {
    pub fn id(&self) -> AlertId {
        match self {
            InsertOutcome::Created(a) | InsertOutcome::Upgraded(a) => a.id,
            InsertOutcome::Reconfirmed(id) => *id,
        }
    }
}

/// Result of [`AlertStore::update_status`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusUpdate {
    Updated {
        previous: AlertStatus,
        current: AlertStatus,
    },
    NotFound,
    /// The alert is resolved and cannot leave that state.
    Rejected { current: AlertStatus },
}

/// Filter for [`AlertStore::query`]. Unset fields match everything.
#[derive(Debug, Clone, Default)]
pub struct AlertQuery {
    pub level: Option<AlertLevel>,
    pub source: Option<String>,
    pub since: Option<DateTime<Utc>>,
}

impl AlertQuery {
    fn matches(&self, alert: &Alert) -> bool {
        self.level.map_or(true, |l| alert.alert_level == l)
            && self
                .source
                .as_deref()
                .map_or(true, |s| alert.source.eq_ignore_ascii_case(s))
            && self.since.map_or(true, |t| alert.created_at >= t)
    }
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct StoreStats {
    pub total: usize,
    pub active: usize,
    pub capacity: usize,
    /// Active alerts per level.
    pub by_level: BTreeMap<String, usize>,
}

#[derive(Debug, PartialEq, Eq)]
struct Fingerprint {
    disaster_type: String,
    cell: Option<(i64, i64)>,
}

pub struct AlertStore {
    alerts: RwLock<Vec<Alert>>,
    config: StoreConfig,
}

impl AlertStore {
    pub fn new(config: StoreConfig) -> Self {
        Self {
            alerts: RwLock::new(Vec::with_capacity(config.max_stored + 1)),
            config,
        }
    }

    /// The configured window, saturating instead of overflowing chrono's range.
    fn dedup_window(&self) -> Duration {
        i64::try_from(self.config.dedup_window_secs)
            .ok()
            .and_then(Duration::try_seconds)
            .unwrap_or(Duration::MAX)
    }

    fn fingerprint(&self, alert: &Alert) -> Fingerprint {
        Fingerprint {
            disaster_type: alert.disaster_type.to_ascii_lowercase(),
            cell: alert.locations.first().map(|l| {
                (
                    round_coord(l.lat, self.config.dedup_precision),
                    round_coord(l.lon, self.config.dedup_precision),
                )
            }),
        }
    }

    /// Store a classified alert, assigning identity, deduplicating, and
    /// evicting the oldest entries beyond capacity.
    pub async fn insert(&self, draft: AlertDraft) -> InsertOutcome {
        let candidate = Alert::from_draft(draft, Utc::now());
        let fp = self.fingerprint(&candidate);
        let window = self.dedup_window();

        let mut alerts = self.alerts.write().await;

        let duplicate = alerts.iter_mut().rev().find(|a| {
            a.is_active()
                && (a.created_at - candidate.created_at).abs() <= window
                && self.fingerprint(a) == fp
        });

        if let Some(existing) = duplicate {
            if candidate.alert_level > existing.alert_level {
                info!(
                    alert_id = %existing.id,
                    from = %existing.alert_level,
                    to = %candidate.alert_level,
                    "re-confirmed alert upgraded"
                );
                existing.alert_level = candidate.alert_level;
                existing.confidence_score = candidate.confidence_score;
                existing.probability = candidate.probability;
                existing.recommendations = candidate.recommendations;
                existing.keywords.extend(candidate.keywords);
                existing.entities.extend(candidate.entities);
                return InsertOutcome::Upgraded(existing.clone());
            }
            debug!(alert_id = %existing.id, "duplicate alert re-confirmed");
            return InsertOutcome::Reconfirmed(existing.id);
        }

        let pos = alerts.partition_point(|a| a.created_at <= candidate.created_at);
        alerts.insert(pos, candidate.clone());

        while alerts.len() > self.config.max_stored {
            let evicted = alerts.remove(0);
            debug!(
                alert_id = %evicted.id,
                created_at = %evicted.created_at.to_rfc3339(),
                "evicted oldest alert at capacity"
            );
        }

        InsertOutcome::Created(candidate)
    }

    /// All active alerts, oldest first.
    pub async fn get_active(&self) -> Vec<Alert> {
        let alerts = self.alerts.read().await;
        alerts.iter().filter(|a| a.is_active()).cloned().collect()
    }

    pub async fn get_by_id(&self, id: AlertId) -> Option<Alert> {
        let alerts = self.alerts.read().await;
        alerts.iter().find(|a| a.id == id).cloned()
    }

    pub async fn update_status(&self, id: AlertId, status: AlertStatus) -> StatusUpdate {
        let mut alerts = self.alerts.write().await;
        let Some(alert) = alerts.iter_mut().find(|a| a.id == id) else {
            return StatusUpdate::NotFound;
        };

        if !alert.status.can_transition_to(status) {
            debug!(alert_id = %id, current = %alert.status, requested = %status, "status transition rejected");
            return StatusUpdate::Rejected {
                current: alert.status,
            };
        }

        let previous = alert.status;
        alert.status = status;
        info!(alert_id = %id, from = %previous, to = %status, "alert status updated");
        StatusUpdate::Updated {
            previous,
            current: status,
        }
    }

    /// Active alerts at exactly `level`.
    pub async fn get_by_level(&self, level: AlertLevel) -> Vec<Alert> {
        self.query(&AlertQuery {
            level: Some(level),
            ..Default::default()
        })
        .await
    }

    /// Active alerts with any location within `radius_km` (inclusive) of the point.
    pub async fn get_by_radius(&self, lat: f64, lon: f64, radius_km: f64) -> Vec<Alert> {
        let alerts = self.alerts.read().await;
        alerts
            .iter()
            .filter(|a| a.is_active())
            .filter(|a| {
                a.locations
                    .iter()
                    .any(|l| distance_km(lat, lon, l.lat, l.lon) <= radius_km)
            })
            .cloned()
            .collect()
    }

    /// Active alerts matching every set field of `query`, oldest first.
    pub async fn query(&self, query: &AlertQuery) -> Vec<Alert> {
        let alerts = self.alerts.read().await;
        alerts
            .iter()
            .filter(|a| a.is_active() && query.matches(a))
            .cloned()
            .collect()
    }

    pub async fn len(&self) -> usize {
        self.alerts.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.alerts.read().await.is_empty()
    }

    pub async fn stats(&self) -> StoreStats {
        let alerts = self.alerts.read().await;
        let mut by_level: BTreeMap<String, usize> = AlertLevel::ALL
            .iter()
            .map(|l| (l.to_string(), 0))
            .collect();
        let mut active = 0;
        for a in alerts.iter().filter(|a| a.is_active()) {
            active += 1;
            *by_level.entry(a.alert_level.to_string()).or_default() += 1;
        }
        StoreStats {
            total: alerts.len(),
            active,
            capacity: self.config.max_stored,
            by_level,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::alert::Location;
    use std::collections::{BTreeMap, BTreeSet};

    fn config(max_stored: usize) -> StoreConfig {
        StoreConfig {
            max_stored,
            ..StoreConfig::default()
        }
    }

    fn draft(disaster_type: &str, level: AlertLevel, lat: f64, lon: f64) -> AlertDraft {
        AlertDraft {
            alert_level: level,
            disaster_type: disaster_type.to_string(),
            confidence_score: 0.5,
            probability: 0.5,
            locations: vec![Location::new("somewhere", lat, lon)],
            keywords: BTreeSet::new(),
            entities: BTreeMap::new(),
            recommendations: vec![],
            source: "twitter".to_string(),
            text: "test".to_string(),
            created_at: None,
        }
    }

    #[tokio::test]
    async fn test_insert_assigns_identity() {
        let store = AlertStore::new(config(10));
        let outcome = store.insert(draft("flood", AlertLevel::Low, 1.0, 1.0)).await;
        let InsertOutcome::Created(alert) = outcome else {
            panic!("expected a new alert, got {:?}", outcome);
        };
        assert_eq!(alert.status, AlertStatus::Active);
        assert_eq!(store.get_by_id(alert.id).await, Some(alert));
    }

    #[tokio::test]
    async fn test_capacity_evicts_oldest() {
        let store = AlertStore::new(config(100));
        let mut ids = Vec::new();
        for i in 0..=100 {
            let outcome = store
                .insert(draft("flood", AlertLevel::Low, i as f64 * 0.5, 0.0))
                .await;
            ids.push(outcome.id());
        }

        assert_eq!(store.len().await, 100);
        assert!(store.get_by_id(ids[0]).await.is_none());
        for id in &ids[1..] {
            assert!(store.get_by_id(*id).await.is_some());
        }
    }

    #[tokio::test]
    async fn test_ids_not_reused_after_eviction() {
        let store = AlertStore::new(config(2));
        let mut seen = BTreeSet::new();
        for i in 0..20 {
            let id = store
                .insert(draft("storm", AlertLevel::Low, i as f64, 0.0))
                .await
                .id();
            assert!(seen.insert(id), "id {} reused", id);
        }
        assert_eq!(store.len().await, 2);
    }

    #[tokio::test]
    async fn test_duplicate_does_not_grow_store() {
        let store = AlertStore::new(config(10));
        let first = store.insert(draft("flood", AlertLevel::High, 25.76, -80.19)).await;
        // Same ~11km cell, same type, within the window.
        let second = store.insert(draft("flood", AlertLevel::Medium, 25.7601, -80.1899)).await;

        assert_eq!(second, InsertOutcome::Reconfirmed(first.id()));
        assert_eq!(store.len().await, 1);
        let stored = store.get_by_id(first.id()).await.unwrap();
        assert_eq!(stored.alert_level, AlertLevel::High);
    }

    #[tokio::test]
    async fn test_duplicate_upgrades_level_in_place() {
        let store = AlertStore::new(config(10));
        let first = store.insert(draft("flood", AlertLevel::Medium, 25.76, -80.19)).await;

        let mut upgrade = draft("flood", AlertLevel::Critical, 25.76, -80.19);
        upgrade.confidence_score = 0.95;
        upgrade.probability = 0.92;
        upgrade.keywords.insert("evacuation".to_string());
        let second = store.insert(upgrade).await;

        let InsertOutcome::Upgraded(alert) = second else {
            panic!("expected upgrade, got {:?}", second);
        };
        assert_eq!(alert.id, first.id());
        assert_eq!(store.len().await, 1);

        let stored = store.get_by_id(first.id()).await.unwrap();
        assert_eq!(stored.alert_level, AlertLevel::Critical);
        assert_eq!(stored.confidence_score, 0.95);
        assert!(stored.keywords.contains("evacuation"));
    }

    #[tokio::test]
    async fn test_different_type_or_place_is_not_duplicate() {
        let store = AlertStore::new(config(10));
        store.insert(draft("flood", AlertLevel::Low, 25.76, -80.19)).await;
        store.insert(draft("wildfire", AlertLevel::Low, 25.76, -80.19)).await;
        store.insert(draft("flood", AlertLevel::Low, 29.76, -95.37)).await;
        assert_eq!(store.len().await, 3);
    }

    #[tokio::test]
    async fn test_duplicate_outside_window_is_new() {
        let store = AlertStore::new(config(10));
        let mut old = draft("flood", AlertLevel::Low, 25.76, -80.19);
        old.created_at = Some(Utc::now() - Duration::hours(3));
        store.insert(old).await;

        let outcome = store.insert(draft("flood", AlertLevel::Low, 25.76, -80.19)).await;
        assert!(matches!(outcome, InsertOutcome::Created(_)));
        assert_eq!(store.len().await, 2);
    }

    #[tokio::test]
    async fn test_oversized_window_saturates() {
        for secs in [10_000_000_000_000_000, u64::MAX] {
            let store = AlertStore::new(StoreConfig {
                dedup_window_secs: secs,
                ..config(10)
            });
            let mut old = draft("flood", AlertLevel::Low, 25.76, -80.19);
            old.created_at = Some(Utc::now() - Duration::days(400));
            let first = store.insert(old).await;

            let outcome = store.insert(draft("flood", AlertLevel::Low, 25.76, -80.19)).await;
            assert_eq!(outcome, InsertOutcome::Reconfirmed(first.id()));
            assert_eq!(store.len().await, 1);
        }
    }

    #[tokio::test]
    async fn test_resolved_alert_is_not_reconfirmed() {
        let store = AlertStore::new(config(10));
        let first = store.insert(draft("flood", AlertLevel::Low, 25.76, -80.19)).await;
        store.update_status(first.id(), AlertStatus::Resolved).await;

        let outcome = store.insert(draft("flood", AlertLevel::Low, 25.76, -80.19)).await;
        assert!(matches!(outcome, InsertOutcome::Created(_)));
    }

    #[tokio::test]
    async fn test_resolved_cannot_reactivate() {
        let store = AlertStore::new(config(10));
        let id = store.insert(draft("tornado", AlertLevel::High, 35.0, -97.0)).await.id();

        assert_eq!(
            store.update_status(id, AlertStatus::Resolved).await,
            StatusUpdate::Updated {
                previous: AlertStatus::Active,
                current: AlertStatus::Resolved
            }
        );
        assert_eq!(
            store.update_status(id, AlertStatus::Active).await,
            StatusUpdate::Rejected {
                current: AlertStatus::Resolved
            }
        );
        assert_eq!(store.get_by_id(id).await.unwrap().status, AlertStatus::Resolved);
        assert!(store.get_active().await.is_empty());
    }

    #[tokio::test]
    async fn test_update_unknown_id() {
        let store = AlertStore::new(config(10));
        assert_eq!(
            store.update_status(AlertId::new(), AlertStatus::Acknowledged).await,
            StatusUpdate::NotFound
        );
    }

    #[tokio::test]
    async fn test_get_by_level_only_active() {
        let store = AlertStore::new(config(10));
        let a = store.insert(draft("flood", AlertLevel::High, 1.0, 1.0)).await.id();
        store.insert(draft("flood", AlertLevel::High, 5.0, 5.0)).await;
        store.insert(draft("flood", AlertLevel::Low, 9.0, 9.0)).await;
        store.update_status(a, AlertStatus::Acknowledged).await;

        let high = store.get_by_level(AlertLevel::High).await;
        assert_eq!(high.len(), 1);
        assert!(store.get_by_level(AlertLevel::Critical).await.is_empty());
    }

    #[tokio::test]
    async fn test_radius_boundary_inclusive() {
        let store = AlertStore::new(config(10));
        let near = store.insert(draft("earthquake", AlertLevel::High, 0.0, 0.0)).await.id();
        let far = store.insert(draft("earthquake", AlertLevel::High, 0.0, -0.5)).await.id();

        let r = distance_km(0.0, 1.0, 0.0, 0.0);
        let hits = store.get_by_radius(0.0, 1.0, r).await;
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].id, near);

        assert!(store.get_by_radius(0.0, 1.0, r - 1e-6).await.is_empty());
        assert_eq!(store.get_by_radius(0.0, 1.0, r * 2.0).await.len(), 2);
        let _ = far;
    }

    #[tokio::test]
    async fn test_radius_matches_any_location() {
        let store = AlertStore::new(config(10));
        let mut d = draft("hurricane", AlertLevel::High, 50.0, 50.0);
        d.locations.push(Location::new("Miami", 25.7617, -80.1918));
        let id = store.insert(d).await.id();

        let hits = store.get_by_radius(25.77, -80.19, 10.0).await;
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].id, id);
    }

    #[tokio::test]
    async fn test_query_filters() {
        let store = AlertStore::new(config(10));
        let mut weather = draft("flood", AlertLevel::High, 1.0, 1.0);
        weather.source = "weather".to_string();
        store.insert(weather).await;
        let mut old = draft("flood", AlertLevel::Low, 5.0, 5.0);
        old.created_at = Some(Utc::now() - Duration::hours(30));
        store.insert(old).await;

        let by_source = store
            .query(&AlertQuery {
                source: Some("Weather".to_string()),
                ..Default::default()
            })
            .await;
        assert_eq!(by_source.len(), 1);

        let recent = store
            .query(&AlertQuery {
                since: Some(Utc::now() - Duration::hours(24)),
                ..Default::default()
            })
            .await;
        assert_eq!(recent.len(), 1);
        assert_eq!(recent[0].source, "weather");
    }

    #[tokio::test]
    async fn test_active_snapshot_oldest_first() {
        let store = AlertStore::new(config(10));
        let mut newer = draft("flood", AlertLevel::Low, 1.0, 1.0);
        newer.created_at = Some(Utc::now() - Duration::minutes(1));
        let mut older = draft("flood", AlertLevel::Low, 9.0, 9.0);
        older.created_at = Some(Utc::now() - Duration::minutes(5));
        let newer_id = store.insert(newer).await.id();
        let older_id = store.insert(older).await.id();

        let active = store.get_active().await;
        assert_eq!(active[0].id, older_id);
        assert_eq!(active[1].id, newer_id);
    }

    #[tokio::test]
    async fn test_stats() {
        let store = AlertStore::new(config(10));
        store.insert(draft("flood", AlertLevel::High, 1.0, 1.0)).await;
        let id = store.insert(draft("flood", AlertLevel::Low, 5.0, 5.0)).await.id();
        store.update_status(id, AlertStatus::Resolved).await;

        let stats = store.stats().await;
        assert_eq!(stats.total, 2);
        assert_eq!(stats.active, 1);
        assert_eq!(stats.capacity, 10);
        assert_eq!(stats.by_level["high"], 1);
        assert_eq!(stats.by_level["low"], 0);
    }
}
