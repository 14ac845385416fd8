//! Named periodic jobs using tokio-cron-scheduler.
//!
//! Each agent with a timer period owns one repeated job, registered under a
//! deterministic name. Firing does no work itself: it hands the job payload to
//! the tick channel, where the tick worker evaluates the agent.
//!
//! ```text
//! CronScheduler (every <period>)
//!     │
//!     └─► tick_tx.send(TimerPayload { agent_id })
//!             └─► TickWorker → handle_tick(agent_id) → evaluate(None)
//! ```

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;
use tokio::sync::{mpsc, Mutex};
use tokio_cron_scheduler::{Job, JobScheduler};
use uuid::Uuid;

use super::{BaseScheduler, TimerPayload};

/// Sending half of the tick channel.
pub type TickSender = mpsc::UnboundedSender<TimerPayload>;

/// Receiving half of the tick channel.
pub type TickReceiver = mpsc::UnboundedReceiver<TimerPayload>;

pub fn tick_channel() -> (TickSender, TickReceiver) {
    mpsc::unbounded_channel()
}

/// `BaseScheduler` backed by a process-wide `JobScheduler`.
pub struct CronScheduler {
    inner: JobScheduler,
    /// job name -> scheduler job uuid
    jobs: Mutex<HashMap<String, Uuid>>,
    ticks: TickSender,
    started: AtomicBool,
}

impl CronScheduler {
    pub async fn new(ticks: TickSender) -> Result<Self> {
        Ok(Self {
            inner: JobScheduler::new().await?,
            jobs: Mutex::new(HashMap::new()),
            ticks,
            started: AtomicBool::new(false),
        })
    }

    /// Names of the currently registered jobs.
    pub async fn job_names(&self) -> Vec<String> {
        let mut names: Vec<_> = self.jobs.lock().await.keys().cloned().collect();
        names.sort();
        names
    }
}

#[async_trait]
impl BaseScheduler for CronScheduler {
    async fn start(&self) -> Result<()> {
        if self.started.swap(true, Ordering::SeqCst) {
            return Ok(());
        }
        self.inner.start().await?;
        tracing::info!("Agent timer scheduler started");
        Ok(())
    }

    async fn every(&self, period: Duration, job_name: &str, payload: TimerPayload) -> Result<()> {
        // Held across remove + add so a job name never maps to two firings.
        let mut jobs = self.jobs.lock().await;

        if let Some(previous) = jobs.remove(job_name) {
            self.inner.remove(&previous).await?;
        }

        let ticks = self.ticks.clone();
        let name = job_name.to_string();
        let job = Job::new_repeated_async(period, move |_uuid, _lock| {
            let ticks = ticks.clone();
            let name = name.clone();
            Box::pin(async move {
                if ticks.send(payload).is_err() {
                    tracing::warn!(job_name = %name, "Tick channel closed, dropping timer tick");
                }
            })
        })?;

        let job_id = self.inner.add(job).await?;
        jobs.insert(job_name.to_string(), job_id);

        tracing::debug!(job_name, period_secs = period.as_secs(), "Registered periodic job");
        Ok(())
    }

    async fn cancel(&self, job_name: &str) -> Result<()> {
        let mut jobs = self.jobs.lock().await;
        if let Some(job_id) = jobs.remove(job_name) {
            self.inner.remove(&job_id).await?;
            tracing::debug!(job_name, "Cancelled periodic job");
        }
        Ok(())
    }
}
