//! QuickAlert -- real-time disaster alert pipeline.
//!
//! Candidate events from social media and weather feeds are scored, fused
//! into a confidence, classified into an alert level, enriched with
//! recommendations, stored with dedup and capped retention, and broadcast to
//! live WebSocket subscribers.

pub mod alert;
pub mod api;
pub mod collect;
pub mod config;
pub mod detect;
pub mod hub;
pub mod pipeline;
pub mod scheduler;

use std::sync::Arc;

use anyhow::{Context, Result};
use tokio_util::sync::CancellationToken;

use crate::alert::AlertStore;
use crate::collect::{sample::SAMPLE_SOURCES, CollectorSet, FeedCollector, SampleCollector};
use crate::config::QuickAlertConfig;
use crate::detect::KeywordDetector;
use crate::hub::BroadcastHub;
use crate::scheduler::Poller;

/// Build the collector set described by the `[sources]` section.
pub fn build_collectors(config: &QuickAlertConfig) -> Result<CollectorSet> {
    let mut set = CollectorSet::new();
    if config.sources.sample {
        set = set.with(SampleCollector);
    }
    for feed in &config.sources.feeds {
        let collector = FeedCollector::new(&feed.name, &feed.url, config.poll.fetch_timeout())
            .with_context(|| format!("failed to set up feed '{}'", feed.name))?;
        set = set.with(collector);
    }
    Ok(set)
}

/// Source labels reported to API clients.
fn source_labels(config: &QuickAlertConfig) -> Vec<String> {
    let mut labels: Vec<String> = Vec::new();
    if config.sources.sample {
        labels.extend(SAMPLE_SOURCES.iter().map(|s| s.to_string()));
    }
    labels.extend(config.sources.feeds.iter().map(|f| f.name.clone()));
    labels
}

/// Start the QuickAlert daemon: alert store, broadcast hub, poller, and API
/// server. Returns after `shutdown` fires and both halves have stopped.
pub async fn serve(config: QuickAlertConfig, shutdown: CancellationToken) -> Result<()> {
    // 1. Store and hub
    let store = Arc::new(AlertStore::new(config.store.clone()));
    let hub = Arc::new(BroadcastHub::new(store, config.hub.clone()));

    // 2. Bind before starting background work
    let addr: std::net::SocketAddr = config
        .server
        .bind
        .parse()
        .with_context(|| format!("invalid bind address '{}'", config.server.bind))?;
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {}", addr))?;

    // 3. Poller (background task)
    let collectors = build_collectors(&config)?;
    let poller = Poller::new(collectors, Arc::new(KeywordDetector), hub.clone(), config.poll.clone());
    let poller_task = tokio::spawn(poller.run(shutdown.clone()));

    // 4. API server
    let state = api::state::AppState::new(hub).with_sources(source_labels(&config));
    let app = api::router(state);

    tracing::info!(%addr, "QuickAlert listening");
    let server_shutdown = shutdown.clone();
    let served = axum::serve(listener, app)
        .with_graceful_shutdown(async move { server_shutdown.cancelled().await })
        .await;

    // Stop the poller whether the server exited cleanly or not.
    shutdown.cancel();
    poller_task.await.context("poller task panicked")?;
    served.context("API server failed")?;
    tracing::info!("QuickAlert stopped");
    Ok(())
}
