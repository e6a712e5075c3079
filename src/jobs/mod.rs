//! Scheduled Jobs
//!
//! Background maintenance. With deferred projections, commands leave the
//! dashboard snapshots behind; the catch-up job replays lagging streams.

use chrono::{DateTime, Utc};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::interval;

use crate::event_store::{StoreError, UserStore};
use crate::projection::ProjectionService;

// =========================================================================
// Projection catch-up job
// =========================================================================

/// Rebuild every snapshot that is missing or out of step with its stream
pub async fn catch_up_projections<S>(
    store: &S,
    projection: &ProjectionService,
) -> Result<CatchUpReport, JobError>
where
    S: UserStore + ?Sized,
{
    let mut report = CatchUpReport::default();

    for stream_id in store.stream_ids().await? {
        let stream_version = match store.read_stream(stream_id).await?.last() {
            Some(last) => last.version,
            None => continue,
        };
        let snapshot_version = store
            .load_snapshot(stream_id)
            .await?
            .map_or(0, |view| view.version);

        if snapshot_version == stream_version {
            report.up_to_date += 1;
            continue;
        }

        match projection.rebuild(store, stream_id).await {
            Ok(_) => report.rebuilt += 1,
            Err(e) => {
                tracing::error!(stream_id = %stream_id, error = %e, "Projection catch-up failed");
                report.errors.push(format!("{stream_id}: {e}"));
            }
        }
    }

    if report.rebuilt > 0 {
        tracing::info!(
            rebuilt = report.rebuilt,
            up_to_date = report.up_to_date,
            "Caught up lagging dashboard snapshots"
        );
    }

    report.completed_at = Some(Utc::now());
    Ok(report)
}

/// Report from one catch-up pass
#[derive(Debug, Clone, Default)]
pub struct CatchUpReport {
    pub rebuilt: usize,
    pub up_to_date: usize,
    pub errors: Vec<String>,
    pub completed_at: Option<DateTime<Utc>>,
}

// =========================================================================
// Job Scheduler
// =========================================================================

/// Configuration for job scheduler
#[derive(Debug, Clone)]
pub struct JobSchedulerConfig {
    /// Interval for projection catch-up (default: 30 seconds)
    pub projection_catch_up_interval: Duration,
}

impl Default for JobSchedulerConfig {
    fn default() -> Self {
        Self {
            projection_catch_up_interval: Duration::from_secs(30),
        }
    }
}

/// Job Scheduler - runs periodic maintenance tasks
pub struct JobScheduler<S: ?Sized> {
    store: Arc<S>,
    projection: ProjectionService,
    config: JobSchedulerConfig,
}

impl<S> JobScheduler<S>
where
    S: UserStore + ?Sized + 'static,
{
    /// Create a new job scheduler
    pub fn new(store: Arc<S>, projection: ProjectionService) -> Self {
        Self {
            store,
            projection,
            config: JobSchedulerConfig::default(),
        }
    }

    /// Create with custom configuration
    pub fn with_config(store: Arc<S>, projection: ProjectionService, config: JobSchedulerConfig) -> Self {
        Self {
            store,
            projection,
            config,
        }
    }

    /// Start the job scheduler in the background
    /// Returns a handle that can be used to abort the scheduler
    pub fn start(self) -> tokio::task::JoinHandle<()> {
        tokio::spawn(async move {
            self.run().await;
        })
    }

    /// Run the scheduler loop
    async fn run(&self) {
        tracing::info!(
            interval_secs = self.config.projection_catch_up_interval.as_secs(),
            "Job scheduler started"
        );

        let mut catch_up_interval = interval(self.config.projection_catch_up_interval);

        loop {
            catch_up_interval.tick().await;
            if let Err(e) = catch_up_projections(self.store.as_ref(), &self.projection).await {
                tracing::error!(error = %e, "Projection catch-up failed");
            }
        }
    }

    /// Run all maintenance jobs once (for manual trigger or testing)
    pub async fn run_all_once(&self) -> CatchUpReport {
        match catch_up_projections(self.store.as_ref(), &self.projection).await {
            Ok(report) => report,
            Err(e) => CatchUpReport {
                errors: vec![format!("Projection catch-up: {e}")],
                completed_at: Some(Utc::now()),
                ..Default::default()
            },
        }
    }
}

/// Job execution errors
#[derive(Debug, thiserror::Error)]
pub enum JobError {
    #[error("Store error: {0}")]
    Store(#[from] StoreError),
}

// =========================================================================
// Tests
// =========================================================================
