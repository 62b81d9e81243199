//! Background reaper
//!
//! One thread per `MemoryCache` that sleeps until the earliest pending
//! deadline and then physically removes expired entries. A `put` with an
//! earlier deadline, or `close()`, wakes it early.

use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::{Condvar, Mutex};
use tracing::{debug, error, info};

use super::Shared;
use crate::cache::entry::current_timestamp_ms;

/// Back-off after a failed sweep before trying again.
const RETRY_AFTER_FAILURE: Duration = Duration::from_secs(1);

// == Wake Signal ==
#[derive(Debug, Default)]
struct WakeState {
    /// A put arrived that the reaper has not accounted for yet
    pending: bool,
    /// Deadline the reaper is sleeping towards; None while recomputing or
    /// sleeping with nothing scheduled
    planned: Option<u64>,
    shutdown: bool,
}

/// Interruptible sleep shared by the reaper and the writers.
#[derive(Debug, Default)]
pub(super) struct WakeSignal {
    state: Mutex<WakeState>,
    condvar: Condvar,
}

impl WakeSignal {
    /// Wakes the reaper if `deadline` is earlier than what it is sleeping towards.
    pub fn notify_deadline(&self, deadline: u64) {
        let mut state = self.state.lock();
        if state.shutdown {
            return;
        }
        if state.planned.map_or(true, |planned| deadline < planned) {
            state.pending = true;
            self.condvar.notify_one();
        }
    }

    /// Tells the reaper to exit.
    pub fn shutdown(&self) {
        let mut state = self.state.lock();
        state.shutdown = true;
        self.condvar.notify_all();
    }
}

// == Reaper Loop ==
enum NextWake {
    At(u64),
    Retry(Duration),
    Idle,
}

/// Runs until `shutdown` is signalled.
pub(super) fn run<V>(shared: Arc<Shared<V>>)
where
    V: Send + Sync + 'static,
{
    info!("Cache reaper started");

    loop {
        {
            let mut state = shared.wake.state.lock();
            if state.shutdown {
                break;
            }
            state.pending = false;
            state.planned = None;
        }

        let next = match panic::catch_unwind(AssertUnwindSafe(|| sweep(&shared))) {
            Ok(Some(deadline)) => NextWake::At(deadline),
            Ok(None) => NextWake::Idle,
            Err(_) => {
                error!("Cache reaper sweep panicked; retrying");
                NextWake::Retry(RETRY_AFTER_FAILURE)
            }
        };

        let mut state = shared.wake.state.lock();
        if state.shutdown {
            break;
        }
        if state.pending {
            continue;
        }

        match next {
            NextWake::At(deadline) => {
                let now = current_timestamp_ms();
                if now > deadline {
                    continue;
                }
                state.planned = Some(deadline);
                // Wake one past the deadline, the first instant it counts as expired
                let wait = Duration::from_millis(deadline - now + 1);
                shared.wake.condvar.wait_for(&mut state, wait);
            }
            NextWake::Retry(backoff) => {
                shared.wake.condvar.wait_for(&mut state, backoff);
            }
            NextWake::Idle => {
                shared.wake.condvar.wait(&mut state);
            }
        }
    }

    info!("Cache reaper stopped");
}

/// Purges every section once and returns the earliest remaining deadline.
fn sweep<V>(shared: &Shared<V>) -> Option<u64>
where
    V: Send + Sync + 'static,
{
    let now = current_timestamp_ms();
    let mut purged = 0;
    let mut next: Option<u64> = None;

    for section in shared.sections_snapshot() {
        let result = shared.with_section_locked(&section, |state| {
            (state.purge_expired(now), state.next_deadline())
        });
        if let Some((count, deadline)) = result {
            purged += count;
            next = match (next, deadline) {
                (Some(a), Some(b)) => Some(a.min(b)),
                (a, b) => a.or(b),
            };
        }
    }

    if purged > 0 {
        shared.stats.record_expirations(purged as u64);
        debug!("Cache reaper: removed {} expired entries", purged);
    }
    next
}
