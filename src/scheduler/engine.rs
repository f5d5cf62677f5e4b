use crate::collect::CollectorSet;
use crate::config::PollConfig;
use crate::detect::Detector;
use crate::hub::BroadcastHub;
use crate::pipeline::classify_events;
use serde::Serialize;
use std::sync::Arc;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

/// Summary of one poll -> classify -> store -> deliver cycle.
#[derive(Debug, Clone, Default, Serialize)]
pub struct CycleReport {
    pub collected: usize,
    /// Events dropped by classification failures.
    pub dropped: usize,
    pub created: usize,
    pub upgraded: usize,
    pub reconfirmed: usize,
    pub delivered_to: usize,
    pub subscribers_dropped: usize,
}

/// The ingestion loop. Sole writer to the alert store.
pub struct Poller {
    collectors: CollectorSet,
    detector: Arc<dyn Detector>,
    hub: Arc<BroadcastHub>,
    config: PollConfig,
}

impl Poller {
    pub fn new(
        collectors: CollectorSet,
        detector: Arc<dyn Detector>,
        hub: Arc<BroadcastHub>,
        config: PollConfig,
    ) -> Self {
        Self {
            collectors,
            detector,
            hub,
            config,
        }
    }

    /// Run a single cycle. Never fails: collection and classification
    /// problems shrink the batch instead.
    pub async fn run_cycle(&self) -> CycleReport {
        let events = self
            .collectors
            .fetch_all(
                &self.config.keywords,
                self.config.lookback_hours,
                self.config.fetch_timeout(),
            )
            .await;

        let mut report = CycleReport {
            collected: events.len(),
            ..Default::default()
        };
        if events.is_empty() {
            return report;
        }

        let drafts = match classify_events(self.detector.as_ref(), &events, self.config.detect_timeout()).await {
            Ok(d) => d,
            Err(e) => {
                warn!(error = %e, events = events.len(), "classification failed, dropping batch");
                Vec::new()
            }
        };
        report.dropped = events.len() - drafts.len();

        let published = self.hub.publish(drafts).await;
        report.created = published.created;
        report.upgraded = published.upgraded;
        report.reconfirmed = published.reconfirmed;
        report.delivered_to = published.delivered_to;
        report.subscribers_dropped = published.dropped;
        report
    }

    /// Run cycles every `interval_secs` until `shutdown` fires. A cycle in
    /// progress is allowed to finish; no new cycle starts afterwards.
    pub async fn run(self, shutdown: CancellationToken) {
        info!(
            interval_secs = self.config.interval_secs,
            sources = ?self.collectors.names(),
            "poller started"
        );
        if self.collectors.is_empty() {
            warn!("no sources configured, every cycle will be empty");
        }

        let mut interval = tokio::time::interval(self.config.interval());
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                biased;
                _ = shutdown.cancelled() => break,
                _ = interval.tick() => {}
            }

            let report = self.run_cycle().await;
            info!(
                collected = report.collected,
                dropped = report.dropped,
                created = report.created,
                upgraded = report.upgraded,
                reconfirmed = report.reconfirmed,
                delivered_to = report.delivered_to,
                subscribers_dropped = report.subscribers_dropped,
                "poll cycle complete"
            );
        }

        info!("poller stopped");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::alert::AlertStore;
    use crate::collect::tests::StaticCollector;
    use crate::collect::CandidateEvent;
    use crate::config::{HubConfig, StoreConfig};
    use crate::detect::{DetectionResult, KeywordDetector};
    use crate::hub::HubMessage;
    use std::time::Duration;

    fn hub() -> Arc<BroadcastHub> {
        Arc::new(BroadcastHub::new(
            Arc::new(AlertStore::new(StoreConfig::default())),
            HubConfig::default(),
        ))
    }

    fn events() -> Vec<CandidateEvent> {
        vec![
            CandidateEvent::new("Flash flood warning for Houston", "weather", "Severe").at("Houston, TX", 29.76, -95.37),
            CandidateEvent::new("Tornado touched down near Moore", "twitter", "Medium").at("Moore, OK", 35.34, -97.49),
        ]
    }

    fn poller(hub: Arc<BroadcastHub>, events: Vec<CandidateEvent>, detector: Arc<dyn Detector>) -> Poller {
        let collectors = CollectorSet::new().with(StaticCollector {
            name: "static".into(),
            events,
        });
        let config = PollConfig {
            interval_secs: 1,
            ..PollConfig::default()
        };
        Poller::new(collectors, detector, hub, config)
    }

    #[tokio::test]
    async fn test_cycle_creates_then_reconfirms() {
        let hub = hub();
        let p = poller(hub.clone(), events(), Arc::new(KeywordDetector));

        let first = p.run_cycle().await;
        assert_eq!(first.collected, 2);
        assert_eq!(first.created, 2);
        assert_eq!(hub.store().len().await, 2);

        let second = p.run_cycle().await;
        assert_eq!(second.created, 0);
        assert_eq!(second.reconfirmed, 2);
        assert_eq!(hub.store().len().await, 2);
    }

    #[tokio::test]
    async fn test_cycle_delivers_in_event_order() {
        let hub = hub();
        let mut sub = hub.subscribe().await;
        assert!(matches!(sub.rx.recv().await, Some(HubMessage::Snapshot { .. })));

        let p = poller(hub.clone(), events(), Arc::new(KeywordDetector));
        let report = p.run_cycle().await;
        assert_eq!(report.delivered_to, 1);

        let mut types = Vec::new();
        for _ in 0..2 {
            match sub.rx.recv().await {
                Some(HubMessage::Alert { data, .. }) => types.push(data.disaster_type),
                other => panic!("unexpected {:?}", other),
            }
        }
        assert_eq!(types, vec!["flood", "tornado"]);
    }

    struct SlowDetector;

    #[async_trait::async_trait]
    impl Detector for SlowDetector {
        async fn score_batch(&self, _texts: &[String]) -> anyhow::Result<Vec<DetectionResult>> {
            tokio::time::sleep(Duration::from_secs(3600)).await;
            Ok(vec![])
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_hung_detector_drops_batch() {
        let hub = hub();
        let p = poller(hub.clone(), events(), Arc::new(SlowDetector));
        let report = p.run_cycle().await;
        assert_eq!(report.collected, 2);
        assert_eq!(report.dropped, 2);
        assert!(hub.store().is_empty().await);
    }

    #[tokio::test]
    async fn test_empty_sources_cycle() {
        let hub = hub();
        let p = poller(hub.clone(), vec![], Arc::new(KeywordDetector));
        let report = p.run_cycle().await;
        assert_eq!(report.collected, 0);
        assert_eq!(report.created, 0);
    }

    #[tokio::test]
    async fn test_run_stops_on_shutdown() {
        let hub = hub();
        let p = poller(hub.clone(), events(), Arc::new(KeywordDetector));
        let shutdown = CancellationToken::new();
        let handle = tokio::spawn(p.run(shutdown.clone()));

        // First tick fires immediately.
        for _ in 0..100 {
            if hub.store().len().await == 2 {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        assert_eq!(hub.store().len().await, 2);

        shutdown.cancel();
        tokio::time::timeout(Duration::from_secs(2), handle)
            .await
            .expect("poller did not stop")
            .unwrap();
    }
}
