//! lifecycle-worker — runs the room lifecycle scheduler.
//!
//! Opens waiting rooms when their window arrives, closes open rooms when
//! their exam duration elapses, and completes schedules whose rooms have
//! all finished. Safe to run alongside another instance against the same
//! database: transitions are conditional writes, so duplicates are no-ops.

use std::sync::Arc;

use clap::Parser;
use tracing::{info, warn};

use proctor_core::config::{load_dotenv, Config};
use proctor_core::SystemClock;
use proctor_lifecycle::{HttpExamSessions, LogExamSessions, RoomLifecycleScheduler};
use proctor_notify::{LogNotifier, Notifier, WebhookNotifier};
use proctor_store::{connect_pg, MemoryStore, PgStore, Store};

// ── CLI ─────────────────────────────────────────────────────────────

/// Room lifecycle worker — periodic open/close reconciliation.
#[derive(Parser, Debug)]
#[command(name = "lifecycle-worker", version, about)]
struct Cli {
    /// Seconds between sweep ticks.
    #[arg(long, env = "SWEEP_INTERVAL_SECS")]
    interval: Option<u64>,

    /// 5-field cron cadence for the monitor sweep.
    #[arg(long, env = "MONITOR_CRON")]
    monitor_cron: Option<String>,

    /// Run a single reconciliation tick and exit.
    #[arg(long)]
    once: bool,
}

// ── main ────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    load_dotenv();
    let cli = Cli::parse();

    let mut config = Config::from_env();
    if let Some(interval) = cli.interval {
        config.scheduler.sweep_interval_secs = interval;
    }
    if let Some(cron) = cli.monitor_cron {
        config.scheduler.monitor_cron = cron;
    }

    let store: Arc<dyn Store> = match connect_pg(&config.postgres).await {
        Some(pool) => Arc::new(PgStore::new(pool)),
        None => {
            warn!("falling back to in-memory store — state will not survive a restart");
            Arc::new(MemoryStore::new())
        }
    };

    let notifier: Arc<dyn Notifier> = match &config.notify.webhook_url {
        Some(url) => Arc::new(WebhookNotifier::new(url.clone())?),
        None => {
            info!("no NOTIFY_WEBHOOK_URL configured — notifications go to the log");
            Arc::new(LogNotifier)
        }
    };

    let sessions: Arc<dyn proctor_lifecycle::ExamSessions> = match &config.notify.auto_submit_url {
        Some(url) => Arc::new(HttpExamSessions::new(url.clone())),
        None => Arc::new(LogExamSessions),
    };

    let scheduler = Arc::new(RoomLifecycleScheduler::new(
        store,
        notifier,
        sessions,
        Arc::new(SystemClock),
        config.scheduler,
    ));

    if cli.once {
        let (opened, closed) = scheduler.tick().await;
        info!(
            opened = opened.opened,
            closed = closed.closed,
            completed_schedules = closed.schedules_completed,
            "single tick complete"
        );
        return Ok(());
    }

    let runner = Arc::clone(&scheduler);
    let handle = tokio::spawn(async move {
        runner.run().await;
    });

    info!("lifecycle-worker starting");
    tokio::signal::ctrl_c().await?;
    scheduler.stop();
    handle.await?;
    info!("lifecycle-worker exited cleanly");
    Ok(())
}
