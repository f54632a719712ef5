use std::time::Duration;

use tokio_cron_scheduler::{Job, JobScheduler};
use tracing::{error, info};

use super::media_service::MediaService;

/// Schedule the orphan-file sweep. The returned scheduler must be kept alive.
pub async fn start_orphan_sweeper(
    media: MediaService,
    schedule: &str,
    grace: Duration,
) -> Result<JobScheduler, Box<dyn std::error::Error + Send + Sync>> {
    let scheduler = JobScheduler::new().await?;

    let job = Job::new_async(schedule, move |_uuid, _l| {
        let media = media.clone();

        Box::pin(async move {
            match media.sweep_orphans(grace).await {
                Ok(0) => {}
                Ok(removed) => info!("Removed {} orphaned media files", removed),
                Err(e) => error!("Orphan sweep failed: {:?}", e),
            }
        })
    })?;

    scheduler.add(job).await?;
    scheduler.start().await?;

    info!("Orphan sweeper scheduled ({})", schedule);
    Ok(scheduler)
}
