use crate::poller::{TaskPoller, TickOutcome};
use crate::utils::blackbox::{self, EventKind};
use async_trait::async_trait;
use futures::FutureExt;
use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::{Instant, MissedTickBehavior};

/// Unit of periodic work. Must not fail: errors are folded into the outcome.
#[async_trait]
pub trait Tick: Send {
    async fn tick(&mut self) -> TickOutcome;
}

#[async_trait]
impl Tick for TaskPoller {
    async fn tick(&mut self) -> TickOutcome {
        TaskPoller::tick(self).await
    }
}

/// Clears the in-progress flag when dropped, including on unwind.
struct TickGuard<'a> {
    flag: &'a AtomicBool,
}

impl<'a> TickGuard<'a> {
    fn try_acquire(flag: &'a AtomicBool) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| Self { flag })
    }
}

impl Drop for TickGuard<'_> {
    fn drop(&mut self) {
        self.flag.store(false, Ordering::Release);
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(msg) = payload.downcast_ref::<&str>() {
        (*msg).to_string()
    } else if let Some(msg) = payload.downcast_ref::<String>() {
        msg.clone()
    } else {
        "non-string panic payload".to_string()
    }
}

/// Fixed-interval driver with a "tick in progress" gate.
///
/// The first tick runs immediately. A firing that finds a tick still running
/// is dropped, never queued.
#[derive(Clone)]
pub struct PollScheduler {
    interval: Duration,
    in_progress: Arc<AtomicBool>,
}

impl PollScheduler {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            in_progress: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    pub fn tick_in_progress(&self) -> bool {
        self.in_progress.load(Ordering::Acquire)
    }

    /// Runs one tick unless another is in progress. `None` means the firing
    /// was skipped or the tick panicked; a panic is logged and contained so
    /// the schedule keeps going.
    pub async fn fire<T: Tick + ?Sized>(&self, target: &mut T) -> Option<TickOutcome> {
        let Some(_guard) = TickGuard::try_acquire(&self.in_progress) else {
            tracing::debug!("[POLL] previous tick still running; skipping this firing");
            return None;
        };
        match AssertUnwindSafe(target.tick()).catch_unwind().await {
            Ok(outcome) => Some(outcome),
            Err(payload) => {
                let message = panic_message(payload.as_ref());
                tracing::error!("[POLL] tick panicked, schedule continues: {}", message);
                blackbox::record(EventKind::Panic, format!("tick panicked: {message}"));
                None
            }
        }
    }

    /// Drives `target` for the lifetime of the process. Termination is external
    /// (drop the future or stop the runtime).
    pub async fn run<T: Tick + ?Sized>(&self, target: &mut T) {
        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        let mut last_tick_end: Option<Instant> = None;
        loop {
            let scheduled = ticker.tick().await;
            // Firings that came due while the previous tick was still running are dropped.
            if last_tick_end.is_some_and(|end| scheduled < end) {
                tracing::debug!("[POLL] firing overlapped previous tick; skipped");
                continue;
            }
            // Escalation is reported by the classifier inside the tick.
            let _ = self.fire(target).await;
            last_tick_end = Some(Instant::now());
        }
    }
}
