//! Periodic background jobs. Each job runs on its own interval task; the tasks
//! are aborted when the scheduler is dropped.

use std::future::Future;
use std::sync::Mutex as StdMutex;
use std::time::Duration;
use tokio::task::JoinHandle;

use crate::error::ApiError;

#[derive(Default)]
pub struct Scheduler {
    handles: StdMutex<Vec<JoinHandle<()>>>,
}

impl Scheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Runs `job` every `period`, starting one period from now. A failed run is
    /// logged and the next one still happens.
    pub fn every<F, Fut>(&self, name: &'static str, period: Duration, job: F)
    where
        F: Fn() -> Fut + Send + 'static,
        Fut: Future<Output = Result<usize, ApiError>> + Send + 'static,
    {
        let handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            // First tick fires immediately
            ticker.tick().await;
            loop {
                ticker.tick().await;
                match job().await {
                    Ok(0) => {}
                    Ok(processed) => tracing::debug!(job = name, processed, "Scheduled job ran"),
                    Err(e) => tracing::error!(job = name, error = %e, "Scheduled job failed"),
                }
            }
        });

        self.handles
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push(handle);
        tracing::info!(job = name, period_seconds = period.as_secs(), "Scheduled job started");
    }

    pub fn job_count(&self) -> usize {
        self.handles
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .len()
    }
}

impl Drop for Scheduler {
    fn drop(&mut self) {
        let handles = self
            .handles
            .get_mut()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        for handle in handles.drain(..) {
            handle.abort();
        }
    }
}
