//! # countdown
//!
//! Remaining-time projection for the schedule list and the cancellable
//! 1-second ticker that drives it.
//!
//! The countdown is a pure function of the local clock; nothing here touches
//! the network.  The ticker only says "recompute now"; the owner reads its
//! own snapshot and re-renders.

use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::{
    sync::mpsc::{self, error::TrySendError},
    task::JoinHandle,
    time::MissedTickBehavior,
};
use tracing::debug;

use crate::interval::{MS_PER_DAY, MS_PER_HOUR, MS_PER_MINUTE, MS_PER_SECOND};

/// Default refresh cadence of the countdown column.
pub const DEFAULT_TICK: Duration = Duration::from_millis(1_000);

// ─── Remaining Time ───────────────────────────────────────────────────────────

/// Countdown from `now` to `start_time`.
///
/// Under one second left (or already past) gives `"0"`; otherwise every
/// non-zero unit is listed, e.g. `"2 days 3 hrs"` or `"1 min 1 sec"`.
pub fn remaining(start_time: DateTime<Utc>, now: DateTime<Utc>) -> String {
    remaining_ms(start_time.signed_duration_since(now).num_milliseconds())
}

/// Same as [`remaining`] on a raw millisecond delta.
pub fn remaining_ms(delta_ms: i64) -> String {
    let delta = match u64::try_from(delta_ms) {
        Ok(delta) if delta >= MS_PER_SECOND => delta,
        _ => return "0".to_string(),
    };

    let days = delta / MS_PER_DAY;
    let hours = (delta % MS_PER_DAY) / MS_PER_HOUR;
    let minutes = (delta % MS_PER_HOUR) / MS_PER_MINUTE;
    let seconds = (delta % MS_PER_MINUTE) / MS_PER_SECOND;

    [(days, "days"), (hours, "hrs"), (minutes, "min"), (seconds, "sec")]
        .into_iter()
        .filter(|(value, _)| *value > 0)
        .map(|(value, unit)| format!("{value} {unit}"))
        .collect::<Vec<_>>()
        .join(" ")
}

// ─── CountdownTicker ──────────────────────────────────────────────────────────

/// Repeating timer with an explicit cancellation handle.
///
/// Ticks carry the wall-clock instant they fired at.  A slow consumer simply
/// misses ticks; the next one recomputes everything anyway.  Dropping the
/// ticker cancels it.
#[derive(Debug)]
pub struct CountdownTicker {
    handle: Option<JoinHandle<()>>,
}

impl CountdownTicker {
    /// Spawns the timer on the current Tokio runtime.  The first tick fires
    /// immediately.
    pub fn start(period: Duration) -> (Self, mpsc::Receiver<DateTime<Utc>>) {
        let (tx, rx) = mpsc::channel(1);

        let handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

            loop {
                ticker.tick().await;
                match tx.try_send(Utc::now()) {
                    Ok(()) => {}
                    Err(TrySendError::Full(_)) => debug!("countdown tick skipped, consumer busy"),
                    Err(TrySendError::Closed(_)) => break,
                }
            }
        });

        (Self { handle: Some(handle) }, rx)
    }

    pub fn is_running(&self) -> bool {
        self.handle.as_ref().is_some_and(|h| !h.is_finished())
    }

    /// Stops the timer.  The receiver drains whatever was queued and then
    /// yields `None`.
    pub fn cancel(mut self) {
        self.abort();
    }

    fn abort(&mut self) {
        if let Some(handle) = self.handle.take() {
            handle.abort();
            debug!("countdown ticker cancelled");
        }
    }
}

impl Drop for CountdownTicker {
    fn drop(&mut self) {
        self.abort();
    }
}

// ─── Tests ────────────────────────────────────────────────────────────────────
