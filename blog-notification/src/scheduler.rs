use std::sync::Arc;

use tokio_cron_scheduler::{Job, JobScheduler};

use blog_shared::errors::ErrorCode;

use crate::state::AppState;
use crate::types::DigestKind;

/// Register the digest sweeps and the nightly cleanup, then start ticking.
/// The returned scheduler must be shut down by the caller.
pub async fn start_scheduler(state: Arc<AppState>) -> anyhow::Result<JobScheduler> {
    let scheduler = JobScheduler::new().await?;

    scheduler
        .add(sweep_job(state.clone(), DigestKind::Daily, &state.config.daily_sweep_cron)?)
        .await?;
    scheduler
        .add(sweep_job(state.clone(), DigestKind::Weekly, &state.config.weekly_sweep_cron)?)
        .await?;

    let job_state = state.clone();
    let cleanup = Job::new_async(state.config.cleanup_cron.as_str(), move |_uuid, _lock| {
        let state = job_state.clone();
        Box::pin(async move {
            run_cleanup(&state);
        })
    })?;
    scheduler.add(cleanup).await?;

    scheduler.start().await?;

    tracing::info!(
        daily = %state.config.daily_sweep_cron,
        weekly = %state.config.weekly_sweep_cron,
        cleanup = %state.config.cleanup_cron,
        "digest scheduler started"
    );

    Ok(scheduler)
}

fn sweep_job(state: Arc<AppState>, kind: DigestKind, cron: &str) -> anyhow::Result<Job> {
    let job = Job::new_async(cron, move |_uuid, _lock| {
        let state = state.clone();
        Box::pin(async move {
            match state.dispatcher.run_sweep(kind).await {
                Ok(_) => {}
                Err(e) if e.error_code() == ErrorCode::SweepInProgress => {
                    tracing::debug!(digest_type = %kind, "previous sweep still running, skipping tick");
                }
                Err(e) => tracing::error!(digest_type = %kind, error = %e, "digest sweep failed"),
            }
        })
    })?;
    Ok(job)
}

/// Queue cleanup and notification retention. Each half runs even if the
/// other fails.
pub fn run_cleanup(state: &AppState) {
    if let Err(e) = state.dispatcher.cleanup(state.config.digest_retention()) {
        tracing::error!(error = %e, "digest queue cleanup failed");
    }
    if let Err(e) = state.notifications.purge_expired(state.config.notification_retention()) {
        tracing::error!(error = %e, "notification retention purge failed");
    }
}
