use std::time::Duration;

use anyhow::Result;
use tokio::select;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::{
    store::event_log::EventStorage,
    tracker::reduce::reduce_sessions,
    utils::clock::{local_day, Clock},
};

use super::output::render::{render_sessions, render_status};

const DEFAULT_TICK: Duration = Duration::from_secs(1);

/// Live view of the running session. Once per second the log is replayed
/// with a fresh `now`, so the active session and the gauge move without any
/// state being carried between ticks. Ticking stops as soon as the reduced
/// state is no longer running.
pub struct WatchLoop<S> {
    storage: S,
    clock: Box<dyn Clock>,
    shutdown: CancellationToken,
    goal_hours: f64,
    tick: Duration,
}

impl<S: EventStorage> WatchLoop<S> {
    pub fn new(
        storage: S,
        clock: Box<dyn Clock>,
        shutdown: CancellationToken,
        goal_hours: f64,
    ) -> Self {
        Self {
            storage,
            clock,
            shutdown,
            goal_hours,
            tick: DEFAULT_TICK,
        }
    }

    /// Executes the watch event loop.
    pub async fn run(self) -> Result<()> {
        let mut tick_point = self.clock.instant();
        loop {
            let now = self.clock.time();
            let events = self.storage.events_for(local_day(&*self.clock)).await?;
            let state = reduce_sessions(&events, now, true);

            // Redraw from the top on every tick.
            print!("\x1b[2J\x1b[1;1H");
            print!("{}", render_status(&state, self.goal_hours));
            print!("{}", render_sessions(&state.sessions));

            if !state.running {
                debug!("Session is stopped, no more ticks");
                return Ok(());
            }

            tick_point += self.tick;
            if self.shutdown.is_cancelled() {
                return Ok(());
            }
            select! {
                _ = self.shutdown.cancelled() => {
                    return Ok(())
                }
                _ = self.clock.sleep_until(tick_point) => ()
            }
        }
    }
}

/// Detects signals sent to the process so an interrupted watch still leaves
/// the terminal in a sane state.
pub async fn detect_shutdown(cancelation: CancellationToken) {
    select! {
        _ = tokio::signal::ctrl_c() => {
            cancelation.cancel();
        },
    };
}
