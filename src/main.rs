use anyhow::Result;
use tokio_cron_scheduler::{Job, JobScheduler};
use tracing::{error, info};

use flat_finder::FlatFinder;
use flat_finder::config::Config;

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt::init();

    info!("Starting rental listings finder");

    let config = Config::from_env()?;
    let finder = FlatFinder::new(&config).await?;

    // Run once immediately
    if let Err(e) = finder.check_for_new_listings().await {
        error!("Error during initial check: {:#}", e);
    }

    let mut sched = JobScheduler::new().await?;

    let job_finder = finder.clone();
    sched
        .add(Job::new_async(config.check_schedule.as_str(), move |_uuid, _l| {
            let finder = job_finder.clone();
            Box::pin(async move {
                if let Err(e) = finder.check_for_new_listings().await {
                    error!("Error checking for listings: {:#}", e);
                }
            })
        })?)
        .await?;

    info!("Scheduler started - schedule '{}'", config.check_schedule);
    sched.start().await?;

    tokio::signal::ctrl_c().await?;
    info!("Shutting down");

    sched.shutdown().await?;
    finder.shutdown().await;

    info!("Cleanup completed");
    Ok(())
}
