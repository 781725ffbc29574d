//! Cancelable delayed execution.

use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::Instant;

#[derive(Debug, Default)]
struct Slot {
    generation: u64,
    pending: Option<JoinHandle<()>>,
    /// Jobs past their delay; kept so callers can wait for them.
    running: Vec<JoinHandle<()>>,
}

/// Runs the most recently scheduled job once `delay` has passed without a
/// newer one being scheduled.
///
/// A job that has started running is no longer pending and is not aborted by
/// later calls; [`Debouncer::wait_running`] waits for it instead.
#[derive(Debug)]
pub struct Debouncer {
    delay: Duration,
    slot: Arc<Mutex<Slot>>,
}

fn lock(slot: &Mutex<Slot>) -> MutexGuard<'_, Slot> {
    slot.lock().unwrap_or_else(PoisonError::into_inner)
}

impl Debouncer {
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            slot: Arc::new(Mutex::new(Slot::default())),
        }
    }

    pub fn delay(&self) -> Duration {
        self.delay
    }

    /// Replace any pending job with `job`, restarting the delay.
    pub fn schedule<F>(&self, job: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let mut slot = lock(&self.slot);
        if let Some(previous) = slot.pending.take() {
            previous.abort();
        }
        slot.generation += 1;

        let generation = slot.generation;
        let shared = Arc::clone(&self.slot);
        let deadline = Instant::now() + self.delay;
        slot.pending = Some(tokio::spawn(async move {
            tokio::time::sleep_until(deadline).await;
            {
                let mut slot = lock(&shared);
                if slot.generation != generation {
                    return;
                }
                if let Some(handle) = slot.pending.take() {
                    slot.running.retain(|h| !h.is_finished());
                    slot.running.push(handle);
                }
            }
            job.await;
        }));
    }

    /// Drop the pending job. Returns whether there was one.
    pub fn cancel(&self) -> bool {
        let mut slot = lock(&self.slot);
        slot.generation += 1;
        match slot.pending.take() {
            Some(handle) => {
                handle.abort();
                true
            }
            None => false,
        }
    }

    pub fn is_pending(&self) -> bool {
        lock(&self.slot).pending.is_some()
    }

    /// Wait for jobs that already started to finish.
    pub async fn wait_running(&self) {
        let running = std::mem::take(&mut lock(&self.slot).running);
        for handle in running {
            let _ = handle.await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn counting_job(counter: &Arc<AtomicUsize>) -> impl Future<Output = ()> + Send + 'static {
        let counter = Arc::clone(counter);
        async move {
            counter.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_burst_runs_once() {
        let debouncer = Debouncer::new(Duration::from_millis(1000));
        let runs = Arc::new(AtomicUsize::new(0));

        for _ in 0..5 {
            debouncer.schedule(counting_job(&runs));
            tokio::time::sleep(Duration::from_millis(200)).await;
        }
        assert_eq!(runs.load(Ordering::SeqCst), 0);
        assert!(debouncer.is_pending());

        tokio::time::sleep(Duration::from_millis(1100)).await;
        assert_eq!(runs.load(Ordering::SeqCst), 1);
        assert!(!debouncer.is_pending());
    }

    #[tokio::test(start_paused = true)]
    async fn test_wait_running_waits_for_started_job() {
        let debouncer = Debouncer::new(Duration::from_millis(100));
        let runs = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&runs);
        debouncer.schedule(async move {
            tokio::time::sleep(Duration::from_millis(500)).await;
            counter.fetch_add(1, Ordering::SeqCst);
        });

        tokio::time::sleep(Duration::from_millis(150)).await;
        // started, so no longer cancelable
        assert!(!debouncer.cancel());
        assert_eq!(runs.load(Ordering::SeqCst), 0);

        debouncer.wait_running().await;
        assert_eq!(runs.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_prevents_run() {
        let debouncer = Debouncer::new(Duration::from_millis(100));
        let runs = Arc::new(AtomicUsize::new(0));

        debouncer.schedule(counting_job(&runs));
        assert!(debouncer.cancel());
        assert!(!debouncer.cancel());

        tokio::time::sleep(Duration::from_millis(500)).await;
        assert_eq!(runs.load(Ordering::SeqCst), 0);
    }
}
