use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use clap::{Parser, Subcommand};
use quickalert::alert::{AlertDraft, AlertStore};
use quickalert::collect::CandidateEvent;
use quickalert::config::{LogFormat, LoggingConfig, QuickAlertConfig};
use quickalert::detect::KeywordDetector;
use quickalert::hub::BroadcastHub;
use quickalert::scheduler::Poller;
use tokio_util::sync::CancellationToken;

#[derive(Parser)]
#[command(
    name = "quickalert",
    about = "Real-time disaster alert pipeline and broadcast service",
    version,
    long_about = None
)]
struct Cli {
    /// Path to a TOML config file (falls back to $QUICKALERT_CONFIG)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the daemon (API server + WebSocket hub + poller)
    Serve {
        /// Bind address, overrides [server].bind
        #[arg(long)]
        bind: Option<String>,

        /// Seconds between poll cycles, overrides [poll].interval_secs
        #[arg(long)]
        interval: Option<u64>,
    },

    /// Run one report through detection and classification
    Classify {
        /// Report text
        #[arg(long)]
        text: String,

        /// Source label
        #[arg(long, default_value = "cli")]
        source: String,

        /// Source-declared severity (Extreme, Severe, Moderate, Minor)
        #[arg(long, default_value = "")]
        severity: String,

        /// Place name for the coordinates
        #[arg(long, requires = "lat")]
        location: Option<String>,

        #[arg(long, requires = "lon", allow_hyphen_values = true)]
        lat: Option<f64>,

        #[arg(long, requires = "lat", allow_hyphen_values = true)]
        lon: Option<f64>,

        /// JSON output for machine parsing
        #[arg(long)]
        json: bool,
    },

    /// Run a single collection cycle against the configured sources
    PollOnce {
        /// JSON output for machine parsing
        #[arg(long)]
        json: bool,
    },
}

fn init_tracing(logging: &LoggingConfig) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&logging.level));

    match logging.format {
        LogFormat::Json => tracing_subscriber::fmt().json().with_env_filter(filter).init(),
        LogFormat::Pretty => tracing_subscriber::fmt().with_env_filter(filter).init(),
    }
}

fn print_draft(draft: &AlertDraft) {
    println!("\nQuickAlert Classification");
    println!("{:<15} | {}", "Level", draft.alert_level.as_str().to_uppercase());
    println!("{:<15} | {}", "Disaster type", draft.disaster_type);
    println!("{:<15} | {:.2}", "Confidence", draft.confidence_score);
    println!("{:<15} | {:.2}", "Probability", draft.probability);
    let keywords: Vec<&str> = draft.keywords.iter().map(String::as_str).collect();
    println!("{:<15} | {}", "Keywords", keywords.join(", "));
    for loc in &draft.locations {
        println!("{:<15} | {} ({:.4}, {:.4})", "Location", loc.name, loc.lat, loc.lon);
    }
    if !draft.recommendations.is_empty() {
        println!("\nRecommendations:");
        for rec in &draft.recommendations {
            println!(" - {}", rec);
        }
    }
    println!();
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = QuickAlertConfig::load_or_default(cli.config.as_deref())?;
    init_tracing(&config.logging);

    match cli.command {
        Commands::Serve { bind, interval } => {
            let mut config = config;
            if let Some(bind) = bind {
                config.server.bind = bind;
            }
            if let Some(interval) = interval {
                config.poll.interval_secs = interval;
            }
            let config = config.validate()?;

            let shutdown = CancellationToken::new();
            let signal = shutdown.clone();
            tokio::spawn(async move {
                if tokio::signal::ctrl_c().await.is_ok() {
                    tracing::info!("Shutdown signal received");
                    signal.cancel();
                }
            });

            tracing::info!(bind = %config.server.bind, "Starting QuickAlert daemon");
            quickalert::serve(config, shutdown).await?;
        }
        Commands::Classify {
            text,
            source,
            severity,
            location,
            lat,
            lon,
            json,
        } => {
            let mut event = CandidateEvent::new(text, source, severity);
            if let (Some(lat), Some(lon)) = (lat, lon) {
                let name = location.unwrap_or_else(|| event.source.clone());
                event = event.at(name, lat, lon);
            }

            let drafts = quickalert::pipeline::classify_events(
                &KeywordDetector,
                std::slice::from_ref(&event),
                config.poll.detect_timeout(),
            )
            .await?;
            let Some(draft) = drafts.into_iter().next() else {
                anyhow::bail!("report could not be classified");
            };

            if json {
                println!("{}", serde_json::to_string_pretty(&draft)?);
            } else {
                print_draft(&draft);
            }
        }
        Commands::PollOnce { json } => {
            let config = config.validate()?;
            let store = Arc::new(AlertStore::new(config.store.clone()));
            let hub = Arc::new(BroadcastHub::new(store.clone(), config.hub.clone()));
            let collectors = quickalert::build_collectors(&config)?;
            let poller = Poller::new(collectors, Arc::new(KeywordDetector), hub, config.poll.clone());

            let report = poller.run_cycle().await;
            let alerts = store.get_active().await;

            if json {
                println!(
                    "{}",
                    serde_json::to_string_pretty(&serde_json::json!({
                        "report": report,
                        "alerts": alerts
                    }))?
                );
            } else {
                println!("\n=== QuickAlert Poll Cycle ===");
                println!(
                    "Collected: {}  Created: {}  Re-confirmed: {}  Dropped: {}",
                    report.collected, report.created, report.reconfirmed, report.dropped
                );
                println!();
                println!("{:<9} | {:<11} | {:<8} | {:<5} | Location", "Level", "Type", "Source", "Conf");
                println!("{:-<9}-|-{:-<11}-|-{:-<8}-|-{:-<5}-|-{:-<30}", "", "", "", "", "");
                for a in &alerts {
                    let place = a.locations.first().map(|l| l.name.as_str()).unwrap_or("-");
                    println!(
                        "{:<9} | {:<11} | {:<8} | {:<5.2} | {}",
                        a.alert_level.as_str().to_uppercase(),
                        a.disaster_type,
                        a.source,
                        a.confidence_score,
                        place
                    );
                }
                println!("=============================\n");
            }
        }
    }

    Ok(())
}
