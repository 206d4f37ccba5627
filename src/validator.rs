//! Periodic token validity check.
//!
//! DESIGN
//! ======
//! A background task wakes every `period` and asks the session store whether
//! its token is still valid; an expired token logs the user out. The first
//! check runs one period after start. Missed ticks are skipped rather than
//! burst. The check itself lives in `SessionStore::check_token_validity`, so
//! a timer firing after a 401 already cleared the session finds nothing to do.

#[cfg(test)]
#[path = "validator_test.rs"]
mod tests;

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, info, warn};

use crate::session::SessionStore;

/// Default interval between validity checks.
pub const DEFAULT_TOKEN_CHECK_INTERVAL: Duration = Duration::from_secs(5 * 60);

/// Shortest accepted interval; zero is clamped up to this.
pub const MIN_TOKEN_CHECK_INTERVAL: Duration = Duration::from_secs(1);

/// Handle for a running validity check. Dropping it detaches the task.
#[derive(Debug)]
pub struct ValidityCheckHandle {
    task: JoinHandle<()>,
}

impl ValidityCheckHandle {
    /// Stop future checks.
    pub fn cancel(self) {
        self.task.abort();
        info!("token validity check stopped");
    }

    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }
}

/// Spawn the background check. Must be called inside a tokio runtime.
#[must_use = "dropping the handle detaches the check; keep it to cancel on shutdown"]
pub fn start_token_validity_check(session: Arc<SessionStore>, period: Duration) -> ValidityCheckHandle {
    let period = if period.is_zero() {
        warn!(min_secs = MIN_TOKEN_CHECK_INTERVAL.as_secs(), "zero token check interval; using minimum");
        MIN_TOKEN_CHECK_INTERVAL
    } else {
        period
    };
    info!(period_secs = period.as_secs(), "token validity check started");
    let task = tokio::spawn(async move {
        let mut interval = tokio::time::interval_at(Instant::now() + period, period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
        loop {
            interval.tick().await;
            let valid = session.check_token_validity();
            debug!(valid, "token validity checked");
        }
    });
    ValidityCheckHandle { task }
}
