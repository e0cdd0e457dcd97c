//! One-second tick source for a single [`TimerEngine`](super::TimerEngine).
//!
//! The ticker is owned by the same task that owns the engine, so disarming it
//! takes effect before the next `select!` iteration: a tick can never arrive
//! after a pause.

use std::time::Duration;

use tokio::time::{interval_at, Instant, Interval, MissedTickBehavior};

pub const TICK_PERIOD: Duration = Duration::from_secs(1);

#[derive(Debug)]
pub struct Ticker {
    period: Duration,
    interval: Option<Interval>,
}

impl Ticker {
    pub fn new() -> Self {
        Self::with_period(TICK_PERIOD)
    }

    pub fn with_period(period: Duration) -> Self {
        Self {
            period,
            interval: None,
        }
    }

    pub fn is_armed(&self) -> bool {
        self.interval.is_some()
    }

    /// Arm when `running`, disarm otherwise. Arming an armed ticker keeps the
    /// existing interval.
    pub fn sync(&mut self, running: bool) {
        if running {
            self.arm();
        } else {
            self.disarm();
        }
    }

    pub fn arm(&mut self) {
        if self.interval.is_some() {
            return;
        }
        // First tick lands one full period after arming.
        let mut interval = interval_at(Instant::now() + self.period, self.period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        self.interval = Some(interval);
    }

    pub fn disarm(&mut self) {
        self.interval = None;
    }

    /// Wait for the next tick. Pends forever while disarmed.
    pub async fn next(&mut self) {
        match self.interval.as_mut() {
            Some(interval) => {
                interval.tick().await;
            }
            None => std::future::pending::<()>().await,
        }
    }
}

impl Default for Ticker {
    fn default() -> Self {
        Self::new()
    }
}
