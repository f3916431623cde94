//! # Background Tasks
//!
//! Periodic jobs run through an explicit handle that owns the timer and
//! the shutdown signal. Tasks are started by the binary at boot and
//! stopped deterministically on shutdown; nothing is fire-and-forget.

use std::future::Future;
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

/// Cooperative stop signal handed to each job invocation
#[derive(Debug, Clone)]
pub struct ShutdownToken {
    rx: watch::Receiver<bool>,
}

impl ShutdownToken {
    /// Whether shutdown has been requested; long jobs check this between
    /// independent work items.
    pub fn is_stopped(&self) -> bool {
        *self.rx.borrow()
    }

    /// Token that never signals; for one-shot invocations in tests.
    /// A watch receiver keeps serving the last value after the sender is
    /// gone, so the dropped sender is fine here.
    pub fn never() -> Self {
        let (_tx, rx) = watch::channel(false);
        Self { rx }
    }
}

/// Handle over a spawned periodic task
pub struct TaskHandle {
    name: &'static str,
    tx: watch::Sender<bool>,
    join: JoinHandle<()>,
}

impl TaskHandle {
    /// Task name for logs
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Signal shutdown and wait for the task to finish its current item
    pub async fn stop(self) {
        let _ = self.tx.send(true);
        if let Err(err) = self.join.await {
            tracing::error!(task = self.name, error = %err, "background task panicked");
        }
    }
}

/// Spawn a job that runs once per period until stopped. The first run
/// happens immediately, which doubles as boot-time reconciliation.
pub fn spawn_periodic<F, Fut>(name: &'static str, period: Duration, mut job: F) -> TaskHandle
where
    F: FnMut(ShutdownToken) -> Fut + Send + 'static,
    Fut: Future<Output = ()> + Send + 'static,
{
    let (tx, rx) = watch::channel(false);
    let join = tokio::spawn({
        let rx = rx.clone();
        async move {
            let mut interval = tokio::time::interval(period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
            let mut stop_rx = rx.clone();
            loop {
                tokio::select! {
                    _ = interval.tick() => {
                        job(ShutdownToken { rx: rx.clone() }).await;
                        if *rx.borrow() {
                            break;
                        }
                    }
                    _ = stop_rx.changed() => break,
                }
            }
            tracing::debug!(task = name, "background task stopped");
        }
    });
    TaskHandle { name, tx, join }
}
