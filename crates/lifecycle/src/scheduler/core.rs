//! [`RoomLifecycleScheduler`] — the reconciliation tick loop.

use std::str::FromStr;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use chrono::{DateTime, Utc};
use cron::Schedule as CronSchedule;
use tokio::sync::Notify;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

use proctor_core::config::SchedulerConfig;
use proctor_core::Clock;
use proctor_notify::Notifier;
use proctor_store::Store;

use super::cron::{is_cron_due, normalize_cron};
use crate::sessions::ExamSessions;
use crate::sweep::{close_sweep, monitor_sweep, open_sweep, SweepOutcome};

/// Drives room state against the clock on a fixed cadence.
///
/// Safe under overlapping or re-entrant execution: each tick runs as its
/// own task and every transition is a conditional write, so a second
/// scheduler instance against the same store is merely redundant, never
/// incorrect.
pub struct RoomLifecycleScheduler {
    store: Arc<dyn Store>,
    notifier: Arc<dyn Notifier>,
    sessions: Arc<dyn ExamSessions>,
    clock: Arc<dyn Clock>,
    config: SchedulerConfig,
    monitor_cadence: Option<CronSchedule>,
    last_monitor: Mutex<Option<DateTime<Utc>>>,
    shutdown: Arc<Notify>,
}

impl RoomLifecycleScheduler {
    pub fn new(
        store: Arc<dyn Store>,
        notifier: Arc<dyn Notifier>,
        sessions: Arc<dyn ExamSessions>,
        clock: Arc<dyn Clock>,
        config: SchedulerConfig,
    ) -> Self {
        let monitor_cadence = match CronSchedule::from_str(&normalize_cron(&config.monitor_cron)) {
            Ok(cadence) => Some(cadence),
            Err(e) => {
                warn!(cron = %config.monitor_cron, error = %e, "invalid monitor cron — monitor sweep disabled");
                None
            }
        };

        Self {
            store,
            notifier,
            sessions,
            clock,
            config,
            monitor_cadence,
            last_monitor: Mutex::new(None),
            shutdown: Arc::new(Notify::new()),
        }
    }

    /// Signal the run loop to exit after the current tick dispatch.
    pub fn stop(&self) {
        self.shutdown.notify_waiters();
    }

    /// Run the tick loop until [`stop`](Self::stop) is called.
    pub async fn run(self: Arc<Self>) {
        let period = Duration::from_secs(self.config.sweep_interval_secs.max(1));
        let mut interval = tokio::time::interval(period);
        // A late tick must not cause a burst of catch-up ticks; the sweeps
        // reconcile against absolute time anyway.
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

        info!(
            interval_secs = period.as_secs(),
            monitor_cron = %self.config.monitor_cron,
            "room lifecycle scheduler started"
        );

        loop {
            tokio::select! {
                _ = interval.tick() => {
                    let scheduler = Arc::clone(&self);
                    tokio::spawn(async move {
                        scheduler.tick().await;
                    });
                }
                _ = self.shutdown.notified() => {
                    info!("room lifecycle scheduler stopped");
                    break;
                }
            }
        }
    }

    /// One reconciliation pass: open sweep, close sweep, and the monitor
    /// pass when its cadence is due. Store errors are logged; the loop
    /// always reaches the next tick.
    pub async fn tick(&self) -> (SweepOutcome, SweepOutcome) {
        let now = self.clock.now();

        let opened = match open_sweep(self.store.as_ref(), self.notifier.as_ref(), now).await {
            Ok(outcome) => outcome,
            Err(e) => {
                warn!(error = %e, "open sweep failed");
                SweepOutcome::default()
            }
        };

        let closed = match close_sweep(self.store.as_ref(), self.sessions.as_ref(), now).await {
            Ok(outcome) => outcome,
            Err(e) => {
                warn!(error = %e, "close sweep failed");
                SweepOutcome::default()
            }
        };

        if opened.opened > 0 || closed.closed > 0 || closed.schedules_completed > 0 {
            info!(
                opened = opened.opened,
                closed = closed.closed,
                completed_schedules = closed.schedules_completed,
                skipped = opened.skipped + closed.skipped,
                "sweep tick"
            );
        } else {
            debug!(skipped = opened.skipped + closed.skipped, "sweep tick: no transitions");
        }

        if self.claim_monitor(now) {
            match monitor_sweep(
                self.store.as_ref(),
                self.notifier.as_ref(),
                self.sessions.as_ref(),
                now,
            )
            .await
            {
                Ok(Some((m_open, m_close))) => debug!(
                    opened = m_open.opened,
                    closed = m_close.closed,
                    "monitor sweep ran"
                ),
                Ok(None) => debug!("monitor sweep skipped: nothing waiting or open"),
                Err(e) => warn!(error = %e, "monitor sweep failed"),
            }
        }

        (opened, closed)
    }

    /// Claim the monitor cadence slot for `now`. Claiming before running
    /// keeps overlapping ticks from each firing the monitor pass.
    fn claim_monitor(&self, now: DateTime<Utc>) -> bool {
        let Some(cadence) = &self.monitor_cadence else {
            return false;
        };

        let mut last = self.last_monitor.lock().unwrap();
        if is_cron_due(cadence, now, *last) {
            *last = Some(now);
            true
        } else {
            false
        }
    }
}
