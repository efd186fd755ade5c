//! Fixed-interval timers for the liveness tick and the historical refresh.
//!
//! Both timers are optional intervals owned by the scheduler. A timer that
//! is not running never fires; dropping the scheduler cancels both.

use std::time::Duration;

use tokio::time::{interval, Interval, MissedTickBehavior};
use tracing::debug;

/// Default period for both timers.
pub const DEFAULT_PERIOD: Duration = Duration::from_secs(30);

/// Shortest period either timer will run at.
pub const MIN_PERIOD: Duration = Duration::from_secs(1);

/// Which timer fired.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tick {
    /// Polling-mode heartbeat: stamp `last_updated`, fetch nothing.
    Liveness,
    /// Time to refresh the historical buffer.
    Refresh,
}

/// Drives the liveness tick and the periodic historical refresh.
#[derive(Debug)]
pub struct PollScheduler {
    liveness_period: Duration,
    refresh_period: Duration,
    liveness: Option<Interval>,
    refresh: Option<Interval>,
}

impl Default for PollScheduler {
    fn default() -> Self {
        Self::new(DEFAULT_PERIOD, DEFAULT_PERIOD)
    }
}

impl PollScheduler {
    /// Create a scheduler with both timers stopped.
    ///
    /// Periods shorter than [`MIN_PERIOD`] are raised to it.
    pub fn new(liveness_period: Duration, refresh_period: Duration) -> Self {
        Self {
            liveness_period: liveness_period.max(MIN_PERIOD),
            refresh_period: refresh_period.max(MIN_PERIOD),
            liveness: None,
            refresh: None,
        }
    }

    /// Start the refresh timer. The first tick fires immediately.
    pub fn start_refresh(&mut self) {
        if self.refresh.is_none() {
            self.refresh = Some(new_interval(self.refresh_period));
            debug!(period = ?self.refresh_period, "refresh timer started");
        }
    }

    pub fn cancel_refresh(&mut self) {
        self.refresh = None;
    }

    /// Start the liveness timer. The first tick fires immediately.
    pub fn resume_liveness(&mut self) {
        if self.liveness.is_none() {
            self.liveness = Some(new_interval(self.liveness_period));
            debug!(period = ?self.liveness_period, "liveness timer started");
        }
    }

    pub fn pause_liveness(&mut self) {
        if self.liveness.take().is_some() {
            debug!("liveness timer paused");
        }
    }

    /// Cancel both timers.
    pub fn cancel_all(&mut self) {
        self.liveness = None;
        self.refresh = None;
    }

    pub fn is_liveness_active(&self) -> bool {
        self.liveness.is_some()
    }

    pub fn is_refresh_active(&self) -> bool {
        self.refresh.is_some()
    }

    /// Wait for the next timer to fire. Pends forever if neither runs.
    ///
    /// Cancel-safe.
    pub async fn next_tick(&mut self) -> Tick {
        tokio::select! {
            biased;
            _ = tick(&mut self.refresh) => Tick::Refresh,
            _ = tick(&mut self.liveness) => Tick::Liveness,
        }
    }
}

fn new_interval(period: Duration) -> Interval {
    let mut timer = interval(period);
    timer.set_missed_tick_behavior(MissedTickBehavior::Skip);
    timer
}

async fn tick(timer: &mut Option<Interval>) {
    match timer {
        Some(timer) => {
            timer.tick().await;
        }
        None => std::future::pending().await,
    }
}
