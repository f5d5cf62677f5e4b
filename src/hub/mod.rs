//! Real-time broadcast hub.
//!
//! Owns the registry of live subscribers. Each subscriber gets a bounded
//! outbound queue; the transport task on the other end drains it onto the
//! socket. Delivery never holds the registry lock while waiting on a queue,
//! and a subscriber that errors or stalls past the send timeout is removed
//! after the delivery pass finishes.
//!
//! Inserting a batch into the store and snapshotting the registry happen under
//! the same lock that [`BroadcastHub::subscribe`] takes. A new subscriber
//! therefore sees each alert exactly once: either in its join snapshot or in
//! the live broadcast, and the snapshot is always queued first.

use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::{mpsc, Mutex};
use tracing::{debug, info};

use crate::alert::{Alert, AlertDraft, AlertStore, InsertOutcome};
use crate::config::HubConfig;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct SubscriberId(u64);

impl fmt::Display for SubscriberId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "sub-{}", self.0)
    }
}

/// A message pushed to subscribers.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum HubMessage {
    /// Active alerts at join time, oldest first.
    Snapshot {
        data: Vec<Alert>,
        timestamp: DateTime<Utc>,
    },
    /// A newly created or upgraded alert.
    Alert {
        data: Alert,
        timestamp: DateTime<Utc>,
    },
}

impl HubMessage {
    fn snapshot(data: Vec<Alert>) -> Self {
        HubMessage::Snapshot {
            data,
            timestamp: Utc::now(),
        }
    }

    fn alert(data: Alert) -> Self {
        HubMessage::Alert {
            data,
            timestamp: Utc::now(),
        }
    }
}

/// The receiving half handed to a transport task.
pub struct Subscription {
    pub id: SubscriberId,
    pub rx: mpsc::Receiver<HubMessage>,
}

/// Outcome of one [`BroadcastHub::publish`] call.
#[derive(Debug, Clone, Default, Serialize)]
pub struct PublishReport {
    pub created: usize,
    pub upgraded: usize,
    pub reconfirmed: usize,
    /// Subscribers that received every message of the batch.
    pub delivered_to: usize,
    /// Subscribers removed after a failed or timed-out send.
    pub dropped: usize,
    /// Alerts pushed to subscribers, in production order.
    pub alerts: Vec<Alert>,
}

pub struct BroadcastHub {
    store: Arc<AlertStore>,
    subscribers: Mutex<HashMap<SubscriberId, mpsc::Sender<HubMessage>>>,
    next_id: AtomicU64,
    config: HubConfig,
}

impl BroadcastHub {
    pub fn new(store: Arc<AlertStore>, config: HubConfig) -> Self {
        Self {
            store,
            subscribers: Mutex::new(HashMap::new()),
            next_id: AtomicU64::new(1),
            config,
        }
    }

    pub fn store(&self) -> &Arc<AlertStore> {
        &self.store
    }

    /// Bound on a single send to a subscriber, in the hub and on its socket.
    pub fn send_timeout(&self) -> Duration {
        self.config.send_timeout()
    }

    pub async fn subscriber_count(&self) -> usize {
        self.subscribers.lock().await.len()
    }

    /// Register a subscriber. The active-alert snapshot is already queued on
    /// the returned receiver.
    pub async fn subscribe(&self) -> Subscription {
        let mut subscribers = self.subscribers.lock().await;

        let snapshot = self.store.get_active().await;
        let (tx, rx) = mpsc::channel(self.config.channel_capacity.max(1));
        let id = SubscriberId(self.next_id.fetch_add(1, Ordering::Relaxed));

        let snapshot_len = snapshot.len();
        // A fresh channel always has room for one message.
        if let Err(e) = tx.try_send(HubMessage::snapshot(snapshot)) {
            debug!(subscriber = %id, error = %e, "failed to queue snapshot");
        }
        subscribers.insert(id, tx);

        info!(
            subscriber = %id,
            snapshot = snapshot_len,
            total = subscribers.len(),
            "subscriber joined"
        );
        Subscription { id, rx }
    }

    /// Remove a subscriber (client disconnect). Unknown ids are ignored.
    pub async fn unsubscribe(&self, id: SubscriberId) {
        let mut subscribers = self.subscribers.lock().await;
        if subscribers.remove(&id).is_some() {
            info!(subscriber = %id, total = subscribers.len(), "subscriber left");
        }
    }

    /// Insert a batch into the store and push every new or upgraded alert to
    /// all subscribers, in batch order.
    pub async fn publish(&self, drafts: Vec<AlertDraft>) -> PublishReport {
        let mut report = PublishReport::default();

        let targets: Vec<(SubscriberId, mpsc::Sender<HubMessage>)> = {
            let subscribers = self.subscribers.lock().await;
            for draft in drafts {
                match self.store.insert(draft).await {
                    InsertOutcome::Created(alert) => {
                        report.created += 1;
                        report.alerts.push(alert);
                    }
                    InsertOutcome::Upgraded(alert) => {
                        report.upgraded += 1;
                        report.alerts.push(alert);
                    }
                    InsertOutcome::Reconfirmed(_) => report.reconfirmed += 1,
                }
            }
            subscribers
                .iter()
                .map(|(id, tx)| (*id, tx.clone()))
                .collect()
        };

        if report.alerts.is_empty() || targets.is_empty() {
            return report;
        }

        let total = targets.len();
        let failed = self.deliver(&report.alerts, targets).await;
        report.delivered_to = total - failed.len();
        report.dropped = failed.len();

        if !failed.is_empty() {
            let mut subscribers = self.subscribers.lock().await;
            for id in &failed {
                subscribers.remove(id);
            }
            info!(
                dropped = failed.len(),
                remaining = subscribers.len(),
                "removed unresponsive subscribers"
            );
        }

        report
    }

    /// Send `alerts` to each target independently. Returns the ids whose
    /// sends failed or timed out.
    async fn deliver(
        &self,
        alerts: &[Alert],
        targets: Vec<(SubscriberId, mpsc::Sender<HubMessage>)>,
    ) -> Vec<SubscriberId> {
        let timeout = self.config.send_timeout();

        let sends = targets.into_iter().map(|(id, tx)| async move {
            for alert in alerts {
                if let Err(e) = tx.send_timeout(HubMessage::alert(alert.clone()), timeout).await {
                    debug!(subscriber = %id, error = %e, "delivery failed");
                    return Some(id);
                }
            }
            None
        });

        futures::future::join_all(sends)
            .await
            .into_iter()
            .flatten()
            .collect()
    }
}
