use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::time::MissedTickBehavior;

use crate::api::state::AppState;
use crate::services::{pipeline, proxies};

const MARKET_INTERVAL: Duration = Duration::from_secs(5 * 60);
const PROXIES_INTERVAL: Duration = Duration::from_secs(60 * 60);
/// Daily history rollover fires shortly after the UTC day boundary.
const ROLLOVER_UTC: (u32, u32) = (0, 10);

/// At-most-one-in-flight marker for a scheduled job. A tick that fires
/// while the previous run still holds the guard is skipped, not queued.
pub struct JobGuard {
    name: &'static str,
    busy: AtomicBool,
}

impl JobGuard {
    pub fn new(name: &'static str) -> Arc<Self> {
        Arc::new(Self {
            name,
            busy: AtomicBool::new(false),
        })
    }

    /// Claim the guard; None while a previous run is still active.
    pub fn try_start(self: &Arc<Self>) -> Option<RunningJob> {
        if self
            .busy
            .compare_exchange(false, true, Ordering::Acquire, Ordering::Relaxed)
            .is_ok()
        {
            Some(RunningJob(Arc::clone(self)))
        } else {
            None
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }
}

/// Releases the guard when the job run is dropped, panics included.
pub struct RunningJob(Arc<JobGuard>);

impl Drop for RunningJob {
    fn drop(&mut self) {
        self.0.busy.store(false, Ordering::Release);
    }
}

/// Spawn the three background jobs. They are independent of each other;
/// nothing orders them within a tick.
pub fn start(state: Arc<AppState>) {
    spawn_market_job(Arc::clone(&state));
    spawn_proxies_job(Arc::clone(&state));
    spawn_rollover_job(state);
}

fn spawn_market_job(state: Arc<AppState>) {
    let guard = JobGuard::new("market_fetch");
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(MARKET_INTERVAL);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        interval.tick().await; // immediate first tick; startup already synced
        loop {
            interval.tick().await;
            let Some(run) = guard.try_start() else {
                tracing::warn!("{} still running, skipping tick", guard.name());
                continue;
            };
            let state = Arc::clone(&state);
            tokio::spawn(async move {
                let _run = run;
                if let Err(e) =
                    pipeline::run_market_cycle(&state.market, &state.pool, &state.kpi_cache).await
                {
                    tracing::error!("Market fetch job failed: {e:#}");
                }
            });
        }
    });
}

fn spawn_proxies_job(state: Arc<AppState>) {
    let guard = JobGuard::new("proxies_scrape");
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(PROXIES_INTERVAL);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        interval.tick().await;
        loop {
            interval.tick().await;
            let Some(run) = guard.try_start() else {
                tracing::warn!("{} still running, skipping tick", guard.name());
                continue;
            };
            let state = Arc::clone(&state);
            tokio::spawn(async move {
                let _run = run;
                if let Err(e) = proxies::update_proxies(
                    &state.http,
                    &state.config.treasuries_url,
                    &state.curated,
                    &state.pool,
                )
                .await
                {
                    tracing::error!("Proxies scrape job failed: {e:#}");
                }
            });
        }
    });
}

fn spawn_rollover_job(state: Arc<AppState>) {
    let guard = JobGuard::new("history_rollover");
    tokio::spawn(async move {
        loop {
            let wait = until_next_utc(ROLLOVER_UTC.0, ROLLOVER_UTC.1);
            tokio::time::sleep(wait).await;
            let Some(run) = guard.try_start() else {
                tracing::warn!("{} still running, skipping firing", guard.name());
                continue;
            };
            let state = Arc::clone(&state);
            tokio::spawn(async move {
                let _run = run;
                if let Err(e) = pipeline::run_rollover(&state.market, &state.pool).await {
                    tracing::error!("History rollover job failed: {e:#}");
                }
            });
        }
    });
}

/// Duration from now until the next occurrence of hh:mm UTC.
fn until_next_utc(hour: u32, minute: u32) -> Duration {
    let now = Utc::now().naive_utc();
    let at = now.date().and_hms_opt(hour, minute, 0).expect("valid wall-clock time");
    let next = if now < at {
        at
    } else {
        at + chrono::Duration::days(1)
    };
    (next - now).to_std().unwrap_or(Duration::from_secs(60))
}
