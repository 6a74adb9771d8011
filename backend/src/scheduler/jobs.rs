//! Cron wiring for the reconciliation duties

use std::time::Duration;
use thiserror::Error;
use tokio_cron_scheduler::{Job, JobScheduler, JobSchedulerError};

use super::{Duty, Reconciler};
use crate::config::Config;

#[derive(Error, Debug)]
pub enum SchedulerError {
    #[error("Job scheduler error: {0:?}")]
    Cron(JobSchedulerError),
}

impl From<JobSchedulerError> for SchedulerError {
    fn from(err: JobSchedulerError) -> Self {
        SchedulerError::Cron(err)
    }
}

/// Schedules and startup delay for the reconciliation duties
#[derive(Debug, Clone)]
pub struct SchedulerSettings {
    pub startup_delay: Duration,
    pub tour_status_cron: String,
    pub booking_status_cron: String,
    pub booking_cleanup_cron: String,
}

impl SchedulerSettings {
    pub fn from_config(config: &Config) -> Self {
        Self {
            startup_delay: Duration::from_secs(config.scheduler_startup_delay_secs),
            tour_status_cron: config.tour_status_cron.clone(),
            booking_status_cron: config.booking_status_cron.clone(),
            booking_cleanup_cron: config.booking_cleanup_cron.clone(),
        }
    }
}

fn duty_job(cron: &str, reconciler: &Reconciler, duty: Duty) -> Result<Job, SchedulerError> {
    let reconciler = reconciler.clone();
    let job = Job::new_async(cron, move |_uuid, _lock| {
        let reconciler = reconciler.clone();
        Box::pin(async move {
            reconciler.run_duty(duty).await;
        })
    })?;
    tracing::info!(duty = duty.as_str(), cron, "Scheduled reconciliation duty");
    Ok(job)
}

/// Start the cron scheduler and the delayed startup tick
///
/// The returned scheduler must be shut down by the caller.
pub async fn start_scheduler(
    reconciler: Reconciler,
    settings: SchedulerSettings,
) -> Result<JobScheduler, SchedulerError> {
    let sched = JobScheduler::new().await?;

    sched
        .add(duty_job(&settings.tour_status_cron, &reconciler, Duty::TourPhases)?)
        .await?;
    sched
        .add(duty_job(
            &settings.booking_status_cron,
            &reconciler,
            Duty::BookingCompletion,
        )?)
        .await?;
    sched
        .add(duty_job(
            &settings.booking_cleanup_cron,
            &reconciler,
            Duty::StaleBookingExpiry,
        )?)
        .await?;

    sched.start().await?;

    let startup_delay = settings.startup_delay;
    tokio::spawn(async move {
        tokio::time::sleep(startup_delay).await;
        let report = reconciler.run_reconciliation_tick().await;
        tracing::info!(changed = report.changed(), "Startup reconciliation finished");
    });

    tracing::info!("Reconciliation scheduler started");
    Ok(sched)
}
