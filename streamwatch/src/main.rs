use std::path::Path;
use std::sync::Arc;

use anyhow::Context;
use platforms_client::twitch::{HelixCredentials, TwitchHelix};
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use streamwatch::config::AppConfig;
use streamwatch::database::{self, repositories::SqlxWatchlistRepository};
use streamwatch::monitor::{HelixDetector, Poller};
use streamwatch::notification::{DiscordConfig, DiscordDmChannel, NotificationDispatcher};
use streamwatch::registry::WatchlistService;
use streamwatch::scheduler::WatchScheduler;
use streamwatch::snapshot::FileSnapshotStore;
use streamwatch::{logging, panic_hook};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = AppConfig::load(Path::new(".env"))?;

    let (logging_config, _log_guard) =
        logging::init_logging(&config.log_dir, config.log_retention_days)?;
    panic_hook::install(&config.log_dir);
    info!(version = env!("CARGO_PKG_VERSION"), "streamwatch starting");
    info!(?config, "Configuration loaded");

    platforms_client::install_rustls_provider();

    let (pool, write_pool) = database::open(&config.database_url)
        .await
        .with_context(|| format!("failed to open database {}", config.database_url))?;
    let repo = Arc::new(SqlxWatchlistRepository::new(pool.clone(), write_pool.clone()));

    let helix = TwitchHelix::new(
        platforms_client::create_client_builder(Some(config.request_timeout)).build()?,
        HelixCredentials {
            client_id: config.twitch_client_id.clone(),
            access_token: config.twitch_access_token.clone(),
        },
    )?;
    let detector = Arc::new(HelixDetector::new(helix));

    let channel = Arc::new(DiscordDmChannel::new(
        DiscordConfig::new(config.discord_token.clone()),
        platforms_client::create_client_builder(None).build()?,
    ));

    let watchlists = WatchlistService::new(repo.clone(), detector.clone());
    match watchlists.stats().await {
        Ok(stats) => info!(
            subscribers = stats.subscribers,
            targets = stats.targets,
            "Registry loaded"
        ),
        Err(e) => warn!(error = %e, "Failed to read registry stats"),
    }

    let dispatcher = NotificationDispatcher::new(
        repo.clone(),
        detector.clone(),
        channel,
        config.dispatcher_config(),
    );
    let mut scheduler = WatchScheduler::new(
        repo,
        Poller::new(detector, config.poller_config()),
        dispatcher,
        Arc::new(FileSnapshotStore::new(&config.snapshot_path)),
        config.scheduler_config(),
    );

    let cancel = CancellationToken::new();
    logging_config.start_retention_cleanup(cancel.child_token());
    tokio::spawn({
        let cancel = cancel.clone();
        async move {
            if let Err(e) = tokio::signal::ctrl_c().await {
                error!(error = %e, "Failed to listen for shutdown signal");
                return;
            }
            info!("Shutdown signal received");
            cancel.cancel();
        }
    });

    let report = scheduler.run(cancel).await?;
    info!(
        cycles = report.cycles,
        live = report.snapshot_targets,
        "streamwatch stopped"
    );

    write_pool.close().await;
    pool.close().await;
    Ok(())
}
